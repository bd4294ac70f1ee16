use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::client::upstream::{RawResponse, UpstreamClient, UpstreamError};
use crate::core::error::{FetchError, FetchResult};
use crate::types::params::RateBudget;
use crate::worker::pacer::{sleep_or_cancel, PaceOutcome, Pacer};

/// How the body of an endpoint is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Json,
    Text,
    /// Plain-text integer, e.g. a height. Falls back to the raw string if it does not parse.
    Integer,
}

/// Result of an operation that may be cut short by shutdown.
///
/// Cancellation is not an error: callers stop without counting a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Data(T),
    Cancelled,
}

impl<T> FetchOutcome<T> {
    pub fn into_data(self) -> Option<T> {
        match self {
            FetchOutcome::Data(data) => Some(data),
            FetchOutcome::Cancelled => None,
        }
    }
}

/// Paced, retrying GET over an [`UpstreamClient`].
///
/// Every attempt (including retries) first waits on the pacer. Throttled
/// responses wait for the server's cooldown without consuming a retry slot;
/// transient failures back off exponentially until `max_retries` attempts
/// have been made.
pub struct Fetcher {
    upstream: Arc<dyn UpstreamClient>,
    pacer: Pacer,
    budget: RateBudget,
    requests: AtomicU64,
}

enum Attempt {
    Done(Value),
    Throttled(RawResponse),
    Transient(String),
}

impl Fetcher {
    pub fn new(upstream: Arc<dyn UpstreamClient>, budget: RateBudget) -> Self {
        Self { upstream, pacer: Pacer::new(&budget), budget, requests: AtomicU64::new(0) }
    }

    /// Number of upstream requests issued so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub async fn fetch(
        &self,
        path: &str,
        kind: ResponseKind,
        token: &CancellationToken,
    ) -> FetchResult<FetchOutcome<Value>> {
        let mut attempts = 0u32;
        let mut throttle_waits = 0u32;

        loop {
            if token.is_cancelled() {
                return Ok(FetchOutcome::Cancelled);
            }
            let request_index = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
            if self.pacer.wait(request_index, token).await == PaceOutcome::Cancelled {
                return Ok(FetchOutcome::Cancelled);
            }

            let cause = match self.attempt(path, kind).await? {
                Attempt::Done(value) => return Ok(FetchOutcome::Data(value)),
                Attempt::Throttled(response) => {
                    throttle_waits += 1;
                    if throttle_waits > self.budget.max_throttle_waits {
                        return Err(FetchError::ThrottleLimit { endpoint: path.to_string(), waits: throttle_waits - 1 });
                    }
                    let cooldown = response.retry_after.unwrap_or(self.budget.throttle_default);
                    warn!(endpoint = path, retry_after_secs = cooldown.as_secs(), "Rate limited, waiting");
                    if !sleep_or_cancel(cooldown, token).await {
                        return Ok(FetchOutcome::Cancelled);
                    }
                    continue;
                }
                Attempt::Transient(cause) => cause,
            };

            attempts += 1;
            if attempts >= self.budget.max_retries {
                return Err(FetchError::RetriesExhausted { endpoint: path.to_string(), attempts, last_cause: cause });
            }
            let backoff = self.budget.backoff_delay(attempts);
            warn!(
                endpoint = path,
                attempt = attempts,
                backoff_secs = backoff.as_secs_f64(),
                error = %cause,
                "Retrying request"
            );
            if !sleep_or_cancel(backoff, token).await {
                return Ok(FetchOutcome::Cancelled);
            }
        }
    }

    /// One call and its classification. Non-retryable outcomes are returned as errors.
    async fn attempt(&self, path: &str, kind: ResponseKind) -> FetchResult<Attempt> {
        let response = match self.upstream.get(path).await {
            Ok(response) => response,
            Err(UpstreamError::Auth(e)) => return Err(FetchError::Auth(e)),
            Err(e) => return Ok(Attempt::Transient(e.to_string())),
        };
        debug!(endpoint = path, status = response.status, "Upstream response");

        match response.status {
            _ if response.is_success() => parse_body(path, &response, kind).map(Attempt::Done),
            429 => Ok(Attempt::Throttled(response)),
            status if status >= 500 => Ok(Attempt::Transient(format!("status {status}: {}", response.body))),
            status => {
                if status == 401 {
                    self.upstream.invalidate_credentials().await;
                }
                Err(FetchError::NonRetryable { endpoint: path.to_string(), status, body: response.body })
            }
        }
    }
}

fn parse_body(endpoint: &str, response: &RawResponse, kind: ResponseKind) -> FetchResult<Value> {
    if kind == ResponseKind::Json || response.is_json() {
        return serde_json::from_str(&response.body)
            .map_err(|e| FetchError::Parse { endpoint: endpoint.to_string(), message: e.to_string() });
    }
    let text = response.body.trim();
    match kind {
        ResponseKind::Integer => {
            Ok(text.parse::<u64>().map(Value::from).unwrap_or_else(|_| Value::String(text.to_string())))
        }
        _ => Ok(Value::String(text.to_string())),
    }
}
