// Dashboard service - Use cases behind the map, analytics and table pages
use crate::application::reading_repository::{ReadingRepository, StoreError};
use crate::domain::category::Category;
use crate::domain::filter::ReadingFilter;
use crate::domain::map::{MapPoint, map_points, view_center};
use crate::domain::reading::{GeoPoint, Metric, Reading};
use crate::domain::segment::{Segment, SegmentBuilder, SegmentPolicy};
use crate::domain::stats::{
    DailyStat, DatasetSummary, Highlights, HourlyStat, LocationRank, SeriesPoint,
    category_distribution, daily_stats, dataset_summary, highlights, hourly_stats, location_ranking,
    metric_series,
};
use crate::domain::table::{Page, TableColumns, TableRow, format_rows, paginate};
use crate::domain::zone::DisplayZone;
use crate::infrastructure::config::{AppConfig, QuerySettings};
use crate::infrastructure::csv_export::{encode_rows, export_file_name};
use crate::infrastructure::flux::{FluxQuery, default_fields};
use crate::infrastructure::query_cache::QueryCache;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("csv export failed: {0}")]
    Export(#[from] csv::Error),
}

/// Everything the service needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub bucket: String,
    pub query: QuerySettings,
    pub zone: DisplayZone,
    pub segments: SegmentPolicy,
}

impl ServiceOptions {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            bucket: config.influx.bucket.clone(),
            query: config.query.clone(),
            zone: config.display.zone()?,
            segments: config.segments,
        })
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            bucket: "iotuis".to_string(),
            query: QuerySettings::default(),
            zone: DisplayZone::default(),
            segments: SegmentPolicy::default(),
        }
    }
}

/// Readings of one request: the whole cached result and the filtered subset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub all: Arc<[Reading]>,
    pub filtered: Arc<[Reading]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub total_records: usize,
    pub filtered_records: usize,
    pub last_seen: Option<String>,
    pub center: Option<GeoPoint>,
    pub points: Vec<MapPoint>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsView {
    pub last_seen: Option<String>,
    pub highlights: Highlights,
    pub categories: Vec<CategoryCount>,
    pub locations: Vec<LocationRank>,
    pub daily: Vec<DailyStat>,
    pub hourly: Vec<HourlyStat>,
    pub co2_series: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    pub total_records: usize,
    pub summary: DatasetSummary,
    pub columns: Vec<&'static str>,
    pub page: Page<TableRow>,
}

#[derive(Debug, Clone)]
pub struct CsvExport {
    pub file_name: String,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn ReadingRepository>,
    cache: Arc<QueryCache>,
    options: ServiceOptions,
    segments: SegmentBuilder,
}

impl DashboardService {
    pub fn new(
        repository: Arc<dyn ReadingRepository>,
        cache: Arc<QueryCache>,
        options: ServiceOptions,
    ) -> Self {
        let segments = SegmentBuilder::new(options.segments, options.zone.clone());
        Self {
            repository,
            cache,
            options,
            segments,
        }
    }

    pub fn zone(&self) -> &DisplayZone {
        &self.options.zone
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.repository.ping().await
    }

    pub fn flux(&self) -> String {
        FluxQuery::new(self.options.bucket.clone())
            .start(self.options.query.start.clone())
            .measurement(self.options.query.measurement.clone())
            .fields(default_fields())
            .window_secs(self.options.query.window_secs)
            .build()
    }

    /// Cached query result. Only connectivity failures are errors; a
    /// rejected or malformed result is treated as an empty data set.
    pub async fn load_readings(&self) -> Result<Arc<[Reading]>, StoreError> {
        let flux = self.flux();
        let repository = &self.repository;
        let query = flux.as_str();
        let fetched = self
            .cache
            .get_or_fetch(query, move || async move {
                let readings = repository.fetch_readings(query).await?;
                tracing::debug!("Cached {} readings", readings.len());
                Ok::<Arc<[Reading]>, StoreError>(readings.into())
            })
            .await;

        match fetched {
            Ok(readings) => Ok(readings),
            Err(err) if err.is_connectivity() => {
                tracing::error!("Store unavailable: {}", err);
                Err(err)
            }
            Err(err) => {
                tracing::warn!("Treating failed query as empty result: {}", err);
                Ok(Arc::from(Vec::new()))
            }
        }
    }

    /// Without a filter the cached slice is shared rather than copied.
    pub async fn load(&self, filter: &ReadingFilter) -> Result<Dataset, StoreError> {
        let all = self.load_readings().await?;
        let filtered = if filter.is_empty() {
            all.clone()
        } else {
            filter.apply(&all, self.options.zone.offset()).into()
        };
        tracing::debug!("Showing {} of {} readings", filtered.len(), all.len());
        Ok(Dataset { all, filtered })
    }

    fn last_seen(&self, readings: &[Reading]) -> Option<String> {
        readings
            .iter()
            .map(|r| r.timestamp)
            .max()
            .map(|ts| self.options.zone.format(&ts))
    }

    pub async fn map_view(
        &self,
        filter: &ReadingFilter,
        active: Option<&HashSet<Category>>,
    ) -> Result<MapView, StoreError> {
        let dataset = self.load(filter).await?;
        Ok(MapView {
            total_records: dataset.all.len(),
            filtered_records: dataset.filtered.len(),
            last_seen: self.last_seen(&dataset.all),
            center: view_center(&dataset.filtered),
            points: map_points(&dataset.filtered),
            segments: self.segments.build(&dataset.filtered, active),
        })
    }

    pub fn analytics_from(&self, dataset: &Dataset) -> AnalyticsView {
        let offset = self.options.zone.offset();
        let readings: &[Reading] = &dataset.filtered;
        AnalyticsView {
            last_seen: self.last_seen(&dataset.all),
            highlights: highlights(readings, offset),
            categories: category_counts(readings),
            locations: location_ranking(readings),
            daily: daily_stats(readings, offset),
            hourly: hourly_stats(readings, offset),
            co2_series: metric_series(readings, Metric::Co2),
        }
    }

    pub async fn analytics_view(
        &self,
        filter: &ReadingFilter,
    ) -> Result<AnalyticsView, StoreError> {
        let dataset = self.load(filter).await?;
        Ok(self.analytics_from(&dataset))
    }

    pub async fn table_view(
        &self,
        filter: &ReadingFilter,
        columns: TableColumns,
        page: usize,
        per_page: usize,
    ) -> Result<TableView, StoreError> {
        let dataset = self.load(filter).await?;
        let rows = format_rows(&dataset.filtered, &columns, &self.options.zone);
        Ok(TableView {
            total_records: dataset.all.len(),
            summary: dataset_summary(&dataset.filtered),
            columns: columns.headers(),
            page: paginate(&rows, page, per_page),
        })
    }

    pub async fn export_csv(
        &self,
        filter: &ReadingFilter,
        columns: TableColumns,
    ) -> Result<CsvExport, ServiceError> {
        let dataset = self.load(filter).await?;
        let rows = format_rows(&dataset.filtered, &columns, &self.options.zone);
        Ok(CsvExport {
            file_name: export_file_name(Utc::now()),
            body: encode_rows(&rows, &columns)?,
        })
    }
}

pub fn category_counts(readings: &[Reading]) -> Vec<CategoryCount> {
    category_distribution(readings)
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category,
            count,
            color: category.color().hex(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeRepository {
        result: fn() -> Result<Vec<Reading>, StoreError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReadingRepository for FakeRepository {
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn fetch_readings(&self, _flux: &str) -> Result<Vec<Reading>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn route() -> Result<Vec<Reading>, StoreError> {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 3, 13, 0, 0).unwrap();
        Ok(vec![
            Reading::new(t0, "Ruta1").with_position(7.0, -73.0).with_pm25(5.0).with_device("bus-1"),
            Reading::new(t0 + chrono::Duration::seconds(60), "Ruta1")
                .with_position(7.001, -73.001)
                .with_pm25(40.0)
                .with_device("bus-1"),
            Reading::new(t0, "Ruta2").with_position(7.2, -73.2).with_pm25(80.0).with_co2(700.0),
        ])
    }

    fn service(
        result: fn() -> Result<Vec<Reading>, StoreError>,
    ) -> (DashboardService, Arc<FakeRepository>) {
        let repo = Arc::new(FakeRepository {
            result,
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(QueryCache::new(Duration::from_secs(10)));
        let service = DashboardService::new(repo.clone(), cache, ServiceOptions::default());
        (service, repo)
    }

    #[tokio::test]
    async fn test_map_view() {
        let (service, _) = service(route);
        let view = service.map_view(&ReadingFilter::default(), None).await.unwrap();
        assert_eq!(view.total_records, 3);
        assert_eq!(view.points.len(), 3);
        assert_eq!(view.segments.len(), 1);
        assert_eq!(view.segments[0].category, Category::Good);
        assert_eq!(view.last_seen.as_deref(), Some("2025-03-03 08:01:00 COT"));
    }

    #[tokio::test]
    async fn test_results_are_cached() {
        let (service, repo) = service(route);
        service.analytics_view(&ReadingFilter::default()).await.unwrap();
        service
            .table_view(&ReadingFilter::default(), TableColumns::default(), 1, 25)
            .await
            .unwrap();
        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unfiltered_dataset_shares_cached_readings() {
        let (service, _) = service(route);
        let dataset = service.load(&ReadingFilter::default()).await.unwrap();
        assert!(Arc::ptr_eq(&dataset.all, &dataset.filtered));

        let filter = ReadingFilter {
            locations: ["Ruta1".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let dataset = service.load(&filter).await.unwrap();
        assert_eq!(dataset.filtered.len(), 2);
    }

    #[tokio::test]
    async fn test_filter_applies_to_views() {
        let (service, _) = service(route);
        let filter = ReadingFilter {
            locations: ["Ruta2".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let table = service.table_view(&filter, TableColumns::default(), 1, 25).await.unwrap();
        assert_eq!(table.total_records, 3);
        assert_eq!(table.summary.total_records, 1);
        assert_eq!(table.page.items[0].location, "Ruta2");
        assert_eq!(table.page.items[0].air_quality, Some("Dañina"));
    }

    #[tokio::test]
    async fn test_analytics_view() {
        let (service, _) = service(route);
        let view = service.analytics_view(&ReadingFilter::default()).await.unwrap();
        assert_eq!(
            view.highlights.most_contaminated_location.unwrap().location,
            "Ruta2"
        );
        assert_eq!(view.categories.len(), 3);
        assert_eq!(view.locations[0].location, "Ruta1");
        assert_eq!(view.daily.len(), 1);
        assert_eq!(view.co2_series.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_query_is_empty_data() {
        let (service, _) = service(|| {
            Err(StoreError::Status {
                status: 400,
                body: "compilation failed".into(),
            })
        });
        let view = service.map_view(&ReadingFilter::default(), None).await.unwrap();
        assert_eq!(view.total_records, 0);
        assert!(view.segments.is_empty());
        assert!(view.center.is_none());
    }

    #[tokio::test]
    async fn test_connectivity_failure_is_surfaced() {
        let (service, _) = service(|| Err(StoreError::NotReady("connection refused".into())));
        let err = service.analytics_view(&ReadingFilter::default()).await.unwrap_err();
        assert!(err.is_connectivity());
        let err = service
            .export_csv(&ReadingFilter::default(), TableColumns::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::NotReady(_))));
    }

    #[tokio::test]
    async fn test_export_csv() {
        let (service, _) = service(route);
        let export = service
            .export_csv(&ReadingFilter::default(), TableColumns::default())
            .await
            .unwrap();
        assert!(export.file_name.starts_with("datos_calidad_aire_"));
        let text = String::from_utf8(export.body.to_vec()).unwrap();
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_flux_uses_options() {
        let (service, _) = service(route);
        let flux = service.flux();
        assert!(flux.contains("from(bucket: \"iotuis\")"));
        assert!(flux.contains("range(start: -30d)"));
        assert!(flux.contains("every: 10s"));
    }
}
