use std::sync::Arc;

use chrono::Utc;
use collector_market_data::{CoinGeckoClient, FredClient, ObservationsQuery};
use tracing::{info, warn};

use crate::core::client::storage::StorageClient;
use crate::types::keys::{coingecko_price_key, fred_observations_key};
use crate::types::params::MarketParams;
use crate::types::summary::SnapshotOutcome;
use crate::worker::snapshot::store_snapshot;

/// One-shot reference data: CoinGecko spot prices and FRED series observations.
///
/// A source without an API key is skipped. Every call is a single attempt.
pub struct MarketCollector {
    storage: Arc<dyn StorageClient>,
    params: MarketParams,
}

impl MarketCollector {
    pub fn new(storage: Arc<dyn StorageClient>, params: MarketParams) -> Self {
        Self { storage, params }
    }

    pub async fn collect(&self) -> Vec<SnapshotOutcome> {
        let mut outcomes = Vec::new();
        outcomes.extend(self.collect_coingecko().await);
        outcomes.extend(self.collect_fred().await);
        outcomes
    }

    async fn collect_coingecko(&self) -> Option<SnapshotOutcome> {
        let base_url = self.params.coingecko_base_url.as_deref();
        let client = match CoinGeckoClient::new(base_url, self.params.coingecko_api_key.clone()) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Skipping CoinGecko prices");
                return None;
            }
        };
        let name = "coingecko_simple_price";
        let prices = match client.simple_price(&self.params.coin_ids, &self.params.vs_currencies, true, true).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!(error = %e, "Failed to fetch CoinGecko prices");
                return Some(SnapshotOutcome::failed(name, e));
            }
        };
        let collected_at = Utc::now();
        let key = coingecko_price_key(collected_at);
        Some(self.store(name, key, collected_at, prices).await)
    }

    async fn collect_fred(&self) -> Vec<SnapshotOutcome> {
        let client = match FredClient::new(self.params.fred_base_url.as_deref(), self.params.fred_api_key.clone()) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Skipping FRED observations");
                return Vec::new();
            }
        };
        let mut outcomes = Vec::with_capacity(self.params.fred_series.len());
        for series_id in &self.params.fred_series {
            let name = format!("fred_{series_id}");
            let observations = match client.series_observations(series_id, &ObservationsQuery::default()).await {
                Ok(observations) => observations,
                Err(e) => {
                    warn!(series_id = %series_id, error = %e, "Failed to fetch FRED observations");
                    outcomes.push(SnapshotOutcome::failed(&name, e));
                    continue;
                }
            };
            let collected_at = Utc::now();
            let key = fred_observations_key(series_id, collected_at);
            outcomes.push(self.store(&name, key, collected_at, observations).await);
        }
        outcomes
    }

    async fn store(
        &self,
        name: &str,
        key: String,
        collected_at: chrono::DateTime<Utc>,
        data: serde_json::Value,
    ) -> SnapshotOutcome {
        match store_snapshot(self.storage.as_ref(), name, key, collected_at, data).await {
            Ok(key) => {
                info!(source = name, key = %key, "Stored market data");
                SnapshotOutcome::stored(name, key)
            }
            Err(e) => {
                warn!(source = name, error = %e, "Failed to store market data");
                SnapshotOutcome::failed(name, e)
            }
        }
    }
}
