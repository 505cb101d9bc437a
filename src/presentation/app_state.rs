// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::streaming_service::StreamingAnalyticsService;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: DashboardService,
    pub streaming: StreamingAnalyticsService,
}
