// HTTP request handlers
use crate::application::dashboard_service::{AnalyticsView, MapView, TableView};
use crate::domain::category::Category;
use crate::domain::filter::ReadingFilter;
use crate::domain::reading::Metric;
use crate::domain::table::{DEFAULT_PAGE_SIZE, TableColumns};
use crate::infrastructure::csv_export;
use crate::infrastructure::ndjson_stream::stream_from_receiver;
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Shared query string of every view. List values are comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub locations: Option<String>,
    pub devices: Option<String>,
    pub categories: Option<String>,
    pub columns: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

fn split_list(value: &Option<String>) -> impl Iterator<Item = &str> {
    value
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

impl ViewQuery {
    pub fn filter(&self) -> ReadingFilter {
        let date_range = match (self.from, self.to) {
            (None, None) => None,
            (from, to) => Some((from.unwrap_or(NaiveDate::MIN), to.unwrap_or(NaiveDate::MAX))),
        };
        ReadingFilter {
            date_range,
            locations: split_list(&self.locations).map(String::from).collect(),
            devices: split_list(&self.devices).map(String::from).collect(),
        }
    }

    /// `None` when no category was given, meaning nothing is dimmed.
    /// Unknown names are ignored.
    pub fn active_categories(&self) -> Option<HashSet<Category>> {
        let active: HashSet<Category> = split_list(&self.categories)
            .filter_map(Category::parse)
            .collect();
        if active.is_empty() {
            None
        } else {
            Some(active)
        }
    }

    pub fn columns(&self) -> TableColumns {
        let metrics: Vec<Metric> = split_list(&self.columns).filter_map(Metric::parse).collect();
        TableColumns::from_metrics(&metrics)
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Reports whether the store answers a trivial query
pub async fn readiness(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.dashboard.ping().await {
        Ok(()) => (StatusCode::OK, "ready".to_string()),
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// Markers and colored route segments
pub async fn map(
    Query(query): Query<ViewQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<MapView>, ApiError> {
    let active = query.active_categories();
    let view = state
        .dashboard
        .map_view(&query.filter(), active.as_ref())
        .await?;
    Ok(Json(view))
}

/// Every analytics section in a single document
pub async fn analytics(
    Query(query): Query<ViewQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsView>, ApiError> {
    Ok(Json(state.dashboard.analytics_view(&query.filter()).await?))
}

/// Analytics sections as they are computed (progressive loading)
pub async fn analytics_stream(
    Query(query): Query<ViewQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.streaming.stream_analytics(query.filter());
    stream_from_receiver(rx)
}

/// One page of formatted rows
pub async fn table(
    Query(query): Query<ViewQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<TableView>, ApiError> {
    let view = state
        .dashboard
        .table_view(
            &query.filter(),
            query.columns(),
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(Json(view))
}

/// Filtered rows as a CSV download
pub async fn export_csv(
    Query(query): Query<ViewQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let export = state
        .dashboard
        .export_csv(&query.filter(), query.columns())
        .await?;
    let disposition = format!("attachment; filename=\"{}\"", export.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, csv_export::CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    ))
}
