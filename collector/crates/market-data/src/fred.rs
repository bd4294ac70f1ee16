//! Federal Reserve Economic Data (FRED) client.

use reqwest::Client;
use serde_json::Value;
use tracing::info;
use url::Url;

use crate::{get_json, http_client, normalize_base_url, MarketDataError};

pub const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred/";

/// Optional arguments for `series/observations`.
#[derive(Debug, Clone)]
pub struct ObservationsQuery {
    pub limit: u32,
    pub offset: u32,
    pub sort_order: String,
    pub observation_start: Option<String>,
    pub observation_end: Option<String>,
}

impl Default for ObservationsQuery {
    fn default() -> Self {
        Self {
            limit: 100_000,
            offset: 0,
            sort_order: "asc".to_string(),
            observation_start: None,
            observation_end: None,
        }
    }
}

pub struct FredClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl FredClient {
    /// Build a client. A missing or empty API key is rejected up front.
    pub fn new(base_url: Option<&str>, api_key: Option<String>) -> Result<Self, MarketDataError> {
        let api_key = api_key.filter(|k| !k.is_empty()).ok_or(MarketDataError::MissingApiKey("FRED"))?;
        let base_url = normalize_base_url(base_url.unwrap_or(DEFAULT_FRED_BASE_URL))?;
        Ok(Self { http: http_client()?, base_url, api_key })
    }

    async fn fetch(&self, endpoint: &str, extra: Vec<(&str, String)>) -> Result<Value, MarketDataError> {
        let mut params = vec![("api_key", self.api_key.clone()), ("file_type", "json".to_string())];
        params.extend(extra);
        get_json(&self.http, &self.base_url, endpoint, &params).await
    }

    pub async fn category(&self, category_id: u64) -> Result<Value, MarketDataError> {
        info!(category_id, "Getting FRED category");
        self.fetch("category", vec![("category_id", category_id.to_string())]).await
    }

    pub async fn category_children(&self, category_id: u64) -> Result<Value, MarketDataError> {
        info!(category_id, "Getting FRED child categories");
        self.fetch("category/children", vec![("category_id", category_id.to_string())]).await
    }

    pub async fn category_series(&self, category_id: u64, limit: u32, offset: u32) -> Result<Value, MarketDataError> {
        self.fetch(
            "category/series",
            vec![
                ("category_id", category_id.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ],
        )
        .await
    }

    pub async fn series(&self, series_id: &str) -> Result<Value, MarketDataError> {
        self.fetch("series", vec![("series_id", series_id.to_string())]).await
    }

    pub async fn series_observations(
        &self,
        series_id: &str,
        query: &ObservationsQuery,
    ) -> Result<Value, MarketDataError> {
        info!(series_id, "Getting FRED observations");
        let mut params = vec![
            ("series_id", series_id.to_string()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
            ("sort_order", query.sort_order.clone()),
        ];
        if let Some(start) = &query.observation_start {
            params.push(("observation_start", start.clone()));
        }
        if let Some(end) = &query.observation_end {
            params.push(("observation_end", end.clone()));
        }
        self.fetch("series/observations", params).await
    }

    pub async fn search_series(&self, search_text: &str, limit: u32) -> Result<Value, MarketDataError> {
        self.fetch(
            "series/search",
            vec![
                ("search_text", search_text.to_string()),
                ("limit", limit.to_string()),
                ("offset", "0".to_string()),
                ("order_by", "popularity".to_string()),
                ("sort_order", "desc".to_string()),
            ],
        )
        .await
    }

    pub async fn sources(&self, limit: u32, offset: u32) -> Result<Value, MarketDataError> {
        self.fetch("sources", vec![("limit", limit.to_string()), ("offset", offset.to_string())]).await
    }
}
