//! Feed error types
//!
//! Every variant means "this source is unavailable this cycle".

use std::time::Duration;
use thiserror::Error;

pub type FeedResult<T> = Result<T, FeedError>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server returned status {0}")]
    Status(u16),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            FeedError::Status(status.as_u16())
        } else {
            FeedError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Parse(err.to_string())
    }
}

/// Bound a collaborator call by `limit`; elapsed -> `FeedError::Timeout`
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> FeedResult<T>
where
    F: std::future::Future<Output = FeedResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(FeedError::Timeout(limit)),
    }
}
