pub mod blockstream;
pub mod error;

use std::time::Duration;

use async_trait::async_trait;
pub use error::UpstreamError;

/// Outcome of one HTTP attempt, before any classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// Parsed `Retry-After` header, seconds form only
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| ct.contains("json"))
    }
}

/// A single-attempt GET against the upstream data API.
///
/// Implementations never retry. Pacing, throttling and backoff belong to the fetcher.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Issue `GET {base}/{path}`. Only transport-level failures are errors,
    /// every HTTP status comes back as a `RawResponse`.
    async fn get(&self, path: &str) -> Result<RawResponse, UpstreamError>;

    /// Drop any cached credential so the next call obtains a fresh one.
    async fn invalidate_credentials(&self);
}
