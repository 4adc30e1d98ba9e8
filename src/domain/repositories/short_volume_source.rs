//! Short-Volume Source Trait
//!
//! Abstraction over the remote file source so the ingestion coordinator
//! can be exercised against a mock in tests.

use async_trait::async_trait;
use thiserror::Error;

/// Common result type for source operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Failure kinds a fetch can end in. `NotFound` is expected on weekends
/// and holidays and degrades to a no-data result upstream; the others
/// surface as failure reports.
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    #[error("no source file published for {date_key}")]
    NotFound { date_key: String },

    #[error("download timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("response body exceeded the {limit} byte ceiling")]
    TooLarge { limit: u64 },

    #[error("network error: {0}")]
    Network(String),
}

/// A source of daily short-sale volume files
#[async_trait]
pub trait ShortVolumeSource: Send + Sync {
    /// Fetch the raw file body for a date key.
    ///
    /// Returns `Ok(None)` when the source responds with an empty body,
    /// which it does for genuinely empty trading days.
    async fn fetch_daily(&self, date_key: &str) -> FetchResult<Option<String>>;
}
