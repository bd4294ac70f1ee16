use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use crate::core::client::auth::{AuthError, TokenProvider};
use crate::types::constant::{DEFAULT_TOKEN_LIFETIME_SECS, TOKEN_REFRESH_MARGIN_SECS};
use crate::types::params::BlockstreamParams;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

/// OAuth2 client-credentials grant with an in-process token cache.
///
/// The cached token is reused until `TOKEN_REFRESH_MARGIN_SECS` before it expires.
pub struct OAuthClientCredentials {
    http: Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<AccessToken>>,
}

impl OAuthClientCredentials {
    pub fn new(params: &BlockstreamParams, http: Client) -> Self {
        Self {
            http,
            token_url: params.token_url.clone(),
            client_id: params.client_id.clone(),
            client_secret: params.client_secret.clone(),
            cached: Mutex::new(None),
        }
    }

    async fn exchange(&self) -> Result<AccessToken, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", "openid"),
        ];
        let response = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { status: status.as_u16(), body });
        }

        let parsed: TokenResponse = response.json().await.map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let value = parsed.access_token.filter(|t| !t.is_empty()).ok_or(AuthError::MissingAccessToken)?;
        let lifetime = parsed.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let refresh_in = lifetime.saturating_sub(TOKEN_REFRESH_MARGIN_SECS);

        info!(expires_in = lifetime, "Obtained upstream access token");
        Ok(AccessToken { value, refresh_at: Instant::now() + Duration::from_secs(refresh_in) })
    }
}

#[async_trait]
impl TokenProvider for OAuthClientCredentials {
    async fn token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
            debug!("Access token close to expiry, refreshing");
        }
        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn invalidate(&self) {
        self.cached.lock().await.take();
    }
}
