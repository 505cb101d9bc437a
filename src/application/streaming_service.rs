// Streaming analytics service - Progressive loading of the analytics page
use crate::application::dashboard_service::{
    CategoryCount, DashboardService, Dataset, category_counts,
};
use crate::domain::filter::ReadingFilter;
use crate::domain::reading::{Metric, Reading};
use crate::domain::stats::{
    DailyStat, Highlights, LocationRank, SeriesPoint, daily_stats, highlights, location_ranking,
    metric_series,
};
use chrono::FixedOffset;
use serde::Serialize;
use std::time::Instant;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 16;

type SectionBuilder = fn(&[Reading], FixedOffset) -> AnalyticsMessage;

/// One line of the analytics stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AnalyticsMessage {
    Highlights(Highlights),
    Categories(Vec<CategoryCount>),
    Locations(Vec<LocationRank>),
    Daily(Vec<DailyStat>),
    Co2Series(Vec<SeriesPoint>),
    NotReady { detail: String },
    Complete { sections: usize, duration_ms: i64 },
}

#[derive(Clone)]
pub struct StreamingAnalyticsService {
    dashboard: DashboardService,
}

impl StreamingAnalyticsService {
    pub fn new(dashboard: DashboardService) -> Self {
        Self { dashboard }
    }

    /// Fetches once, then sends each section as soon as it is computed. The
    /// stream always ends with `Complete`.
    pub fn stream_analytics(&self, filter: ReadingFilter) -> mpsc::Receiver<AnalyticsMessage> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let dashboard = self.dashboard.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();
            let sections = match dashboard.load(&filter).await {
                Ok(dataset) => send_sections(&dashboard, &dataset, &tx).await,
                Err(err) => {
                    let _ = tx
                        .send(AnalyticsMessage::NotReady {
                            detail: err.to_string(),
                        })
                        .await;
                    0
                }
            };

            let duration_ms = start_time.elapsed().as_millis() as i64;
            let _ = tx
                .send(AnalyticsMessage::Complete {
                    sections,
                    duration_ms,
                })
                .await;
        });

        rx
    }
}

async fn send_sections(
    dashboard: &DashboardService,
    dataset: &Dataset,
    tx: &mpsc::Sender<AnalyticsMessage>,
) -> usize {
    let offset = dashboard.zone().offset();
    let readings: &[Reading] = &dataset.filtered;
    let sections: [SectionBuilder; 5] = [
        |readings, offset| AnalyticsMessage::Highlights(highlights(readings, offset)),
        |readings, _| AnalyticsMessage::Categories(category_counts(readings)),
        |readings, _| AnalyticsMessage::Locations(location_ranking(readings)),
        |readings, offset| AnalyticsMessage::Daily(daily_stats(readings, offset)),
        |readings, _| AnalyticsMessage::Co2Series(metric_series(readings, Metric::Co2)),
    ];

    let mut sent = 0;
    for build in sections {
        if tx.send(build(readings, offset)).await.is_err() {
            tracing::debug!("Analytics stream receiver dropped after {} sections", sent);
            break;
        }
        sent += 1;
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_service::ServiceOptions;
    use crate::application::reading_repository::{ReadingRepository, StoreError};
    use crate::infrastructure::query_cache::QueryCache;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    struct StaticRepository(Option<Vec<Reading>>);

    #[async_trait]
    impl ReadingRepository for StaticRepository {
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn fetch_readings(&self, _flux: &str) -> Result<Vec<Reading>, StoreError> {
            self.0
                .clone()
                .ok_or_else(|| StoreError::NotReady("down".into()))
        }
    }

    fn streaming(readings: Option<Vec<Reading>>) -> StreamingAnalyticsService {
        let dashboard = DashboardService::new(
            Arc::new(StaticRepository(readings)),
            Arc::new(QueryCache::new(Duration::from_secs(10))),
            ServiceOptions::default(),
        );
        StreamingAnalyticsService::new(dashboard)
    }

    async fn collect(mut rx: mpsc::Receiver<AnalyticsMessage>) -> Vec<AnalyticsMessage> {
        let mut messages = Vec::new();
        while let Some(msg) = rx.recv().await {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test]
    async fn test_streams_every_section_then_completes() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 3, 13, 0, 0).unwrap();
        let readings = vec![Reading::new(ts, "Ruta1").with_pm25(20.0).with_co2(500.0)];
        let service = streaming(Some(readings));
        let messages = collect(service.stream_analytics(ReadingFilter::default())).await;
        assert_eq!(messages.len(), 6);
        assert!(matches!(messages[0], AnalyticsMessage::Highlights(_)));
        assert!(matches!(messages[5], AnalyticsMessage::Complete { sections: 5, .. }));

        let json = serde_json::to_value(&messages[1]).unwrap();
        assert_eq!(json["type"], "categories");
        assert_eq!(json["data"][0]["category"], "Moderada");
    }

    #[tokio::test]
    async fn test_not_ready_is_reported_in_stream() {
        let messages = collect(streaming(None).stream_analytics(ReadingFilter::default())).await;
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], AnalyticsMessage::NotReady { .. }));
        assert!(matches!(messages[1], AnalyticsMessage::Complete { sections: 0, .. }));
    }
}
