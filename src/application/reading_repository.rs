// Repository trait for air-quality readings
use crate::domain::reading::Reading;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store not ready: {0}")]
    NotReady(String),
    #[error("store request timed out")]
    Timeout,
    #[error("store rejected query with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed result set: {0}")]
    Decode(String),
    #[error("http client error: {0}")]
    Client(String),
}

impl StoreError {
    /// Connectivity problems are surfaced to callers; everything else is
    /// treated as "no data".
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::NotReady(_) | StoreError::Timeout)
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_connect() || err.is_request() {
            StoreError::NotReady(err.to_string())
        } else if err.is_decode() || err.is_body() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Client(err.to_string())
        }
    }
}

impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// Check that the store answers and accepts queries
    async fn ping(&self) -> Result<(), StoreError>;

    /// Run a Flux query and decode the pivoted rows into readings
    async fn fetch_readings(&self, flux: &str) -> Result<Vec<Reading>, StoreError>;
}
