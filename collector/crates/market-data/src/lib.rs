//! Reference market data clients.
//!
//! Thin, single-attempt wrappers over the FRED and CoinGecko HTTP APIs. Both
//! authenticate with an API key passed as a query parameter and return the raw
//! JSON document; callers decide where to store it.

pub mod coingecko;
pub mod error;
pub mod fred;

pub use coingecko::CoinGeckoClient;
pub use error::MarketDataError;
pub use fred::{FredClient, ObservationsQuery};

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Upper bound on one market data request, connection included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client() -> Result<Client, MarketDataError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| MarketDataError::Client(e.to_string()))
}

/// Parse `base` and make sure it ends with a slash so relative endpoints join under it.
pub(crate) fn normalize_base_url(base: &str) -> Result<Url, MarketDataError> {
    let mut base = base.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).map_err(|e| MarketDataError::InvalidUrl { url: base, message: e.to_string() })
}

/// Issue a GET for `endpoint` under `base` with the given query parameters and decode the JSON body.
pub(crate) async fn get_json(
    http: &Client,
    base: &Url,
    endpoint: &str,
    params: &[(&str, String)],
) -> Result<Value, MarketDataError> {
    let url = base
        .join(endpoint.trim_start_matches('/'))
        .map_err(|e| MarketDataError::InvalidUrl { url: endpoint.to_string(), message: e.to_string() })?;

    debug!(url = %url, params = ?params.iter().map(|(k, _)| *k).collect::<Vec<_>>(), "Fetching market data");

    let response = http
        .get(url.clone())
        .query(params)
        .send()
        .await
        .map_err(|e| MarketDataError::Request { endpoint: endpoint.to_string(), message: e.to_string() })?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(MarketDataError::Status { endpoint: endpoint.to_string(), status: status.as_u16(), message });
    }

    response.json().await.map_err(|e| MarketDataError::Parse { endpoint: endpoint.to_string(), message: e.to_string() })
}
