// Mapping of service failures onto HTTP responses
use crate::application::dashboard_service::ServiceError;
use crate::application::reading_repository::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(ServiceError::Store(err))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Store(err) if err.is_connectivity() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!("Request failed with {}: {}", status, self.0);
        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "detail": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
