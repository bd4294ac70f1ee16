//! CoinGecko public API client.

use reqwest::Client;
use serde_json::Value;
use tracing::info;
use url::Url;

use crate::{get_json, http_client, normalize_base_url, MarketDataError};

pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3/";

pub struct CoinGeckoClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: Option<&str>, api_key: Option<String>) -> Result<Self, MarketDataError> {
        let api_key = api_key.filter(|k| !k.is_empty()).ok_or(MarketDataError::MissingApiKey("CoinGecko"))?;
        let base_url = normalize_base_url(base_url.unwrap_or(DEFAULT_COINGECKO_BASE_URL))?;
        Ok(Self { http: http_client()?, base_url, api_key })
    }

    async fn fetch(&self, endpoint: &str, extra: Vec<(&str, String)>) -> Result<Value, MarketDataError> {
        let mut params = vec![("x_cg_demo_api_key", self.api_key.clone())];
        params.extend(extra);
        get_json(&self.http, &self.base_url, endpoint, &params).await
    }

    pub async fn ping(&self) -> Result<Value, MarketDataError> {
        info!("Pinging CoinGecko");
        self.fetch("ping", vec![]).await
    }

    /// `simple/price` for the given coin ids against the given quote currencies.
    pub async fn simple_price(
        &self,
        ids: &[String],
        vs_currencies: &[String],
        include_market_cap: bool,
        include_24hr_vol: bool,
    ) -> Result<Value, MarketDataError> {
        let mut params = vec![("ids", ids.join(",")), ("vs_currencies", vs_currencies.join(","))];
        if include_market_cap {
            params.push(("include_market_cap", "true".to_string()));
        }
        if include_24hr_vol {
            params.push(("include_24hr_vol", "true".to_string()));
        }
        self.fetch("simple/price", params).await
    }

    pub async fn coins_list(&self, include_platform: bool) -> Result<Value, MarketDataError> {
        let params = if include_platform { vec![("include_platform", "true".to_string())] } else { vec![] };
        self.fetch("coins/list", params).await
    }

    /// Coin detail with market data only; localization, tickers and the rest are switched off.
    pub async fn coin(&self, coin_id: &str) -> Result<Value, MarketDataError> {
        let params = [
            ("localization", false),
            ("tickers", false),
            ("market_data", true),
            ("community_data", false),
            ("developer_data", false),
            ("sparkline", false),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect();
        self.fetch(&format!("coins/{coin_id}"), params).await
    }
}
