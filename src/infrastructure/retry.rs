use crate::application::reading_repository::{ReadingRepository, StoreError};
use crate::infrastructure::config::ReadinessSettings;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Fixed-interval retry bounded by a deadline.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total time allowed before giving up.
    deadline: Duration,
    /// Pause between attempts.
    interval: Duration,
}

impl RetryConfig {
    pub fn new(deadline: Duration, interval: Duration) -> Self {
        Self { deadline, interval }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            deadline: Duration::from_secs(10),
            interval: Duration::from_secs(1),
        }
    }
}

impl From<&ReadinessSettings> for RetryConfig {
    fn from(settings: &ReadinessSettings) -> Self {
        Self::new(settings.deadline(), settings.interval())
    }
}

/// Runs `func` until it succeeds or the deadline passes. Always makes at
/// least one attempt; the last error is returned on exhaustion.
pub async fn retry_until_deadline<F, Fut, T>(func: F, config: &RetryConfig) -> Result<T, StoreError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let deadline = Instant::now() + config.deadline;
    let mut attempt = 1u32;
    loop {
        match func().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if Instant::now() + config.interval >= deadline {
                    tracing::error!("Giving up after {} attempts: {}", attempt, err);
                    return Err(err);
                }
                tracing::warn!(
                    "Attempt {} failed: {}; retrying in {:?}",
                    attempt,
                    err,
                    config.interval
                );
                sleep(config.interval).await;
                attempt += 1;
            }
        }
    }
}

/// Ping the store until it answers, or report it as not ready.
pub async fn wait_until_ready(
    repository: &dyn ReadingRepository,
    config: &RetryConfig,
) -> Result<(), StoreError> {
    retry_until_deadline(move || repository.ping(), config)
        .await
        .map_err(|err| match err {
            StoreError::NotReady(_) => err,
            other => StoreError::NotReady(other.to_string()),
        })
}
