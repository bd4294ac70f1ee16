use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response};
use url::Url;

use crate::core::client::auth::TokenProvider;
use crate::core::client::upstream::{RawResponse, UpstreamClient, UpstreamError};

/// Esplora-style REST client for the Blockstream Enterprise API.
pub struct BlockstreamClient {
    http: Client,
    base_url: Url,
    token_provider: Arc<dyn TokenProvider>,
}

impl BlockstreamClient {
    /// `http` should carry a request timeout, a stalled call otherwise holds up shutdown.
    pub fn new(base_url: Url, token_provider: Arc<dyn TokenProvider>, http: Client) -> Self {
        Self { http, base_url: with_trailing_slash(base_url), token_provider }
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| UpstreamError::InvalidUrl { path: path.to_string(), message: e.to_string() })
    }
}

/// `Url::join` drops the last path segment of a base without a trailing slash.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn transport_error(path: &str, e: reqwest::Error) -> UpstreamError {
    let message = if e.is_timeout() { format!("request timed out: {e}") } else { e.to_string() };
    UpstreamError::Transport { endpoint: path.to_string(), message }
}

fn get_retry_after(response: &Response) -> Option<Duration> {
    let value = response.headers().get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[async_trait]
impl UpstreamClient for BlockstreamClient {
    async fn get(&self, path: &str) -> Result<RawResponse, UpstreamError> {
        let url = self.endpoint(path)?;
        let token = self.token_provider.token().await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;

        let status = response.status().as_u16();
        let content_type =
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
        let retry_after = get_retry_after(&response);
        let body = response
            .text()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    transport_error(path, e)
                } else {
                    UpstreamError::Body { endpoint: path.to_string(), message: e.to_string() }
                }
            })?;

        Ok(RawResponse { status, content_type, retry_after, body })
    }

    async fn invalidate_credentials(&self) {
        self.token_provider.invalidate().await;
    }
}
