use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::error::{FetchError, FetchResult};
use crate::types::constant::{block_path, block_txs_path};
use crate::types::record::CollectionRecord;
use crate::types::work::{WorkKind, WorkUnit};
use crate::worker::fetcher::{FetchOutcome, Fetcher, ResponseKind};
use crate::worker::unit::{fetch_block_hash, UnitCollector};

/// Fee statistics over the transactions returned for a sampled block.
///
/// Coinbase transactions are excluded. Fee rates are in sat/vB, using
/// `weight / 4` as the virtual size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeStats {
    pub tx_count: usize,
    pub fee_min: Option<u64>,
    pub fee_median: Option<f64>,
    pub fee_max: Option<u64>,
    pub fee_rate_min: Option<f64>,
    pub fee_rate_median: Option<f64>,
    pub fee_rate_max: Option<f64>,
}

fn is_coinbase(tx: &Value) -> bool {
    tx.pointer("/vin/0/is_coinbase").and_then(Value::as_bool).unwrap_or(false)
}

fn median(sorted: &[f64]) -> Option<f64> {
    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => None,
        n if n % 2 == 1 => Some(sorted[mid]),
        _ => Some((sorted[mid - 1] + sorted[mid]) / 2.0),
    }
}

impl FeeStats {
    pub fn from_transactions(transactions: &[Value]) -> Self {
        let mut fees = Vec::new();
        let mut rates = Vec::new();
        for tx in transactions.iter().filter(|tx| !is_coinbase(tx)) {
            let Some(fee) = tx.get("fee").and_then(Value::as_u64) else {
                continue;
            };
            fees.push(fee);
            if let Some(weight) = tx.get("weight").and_then(Value::as_u64).filter(|w| *w > 0) {
                rates.push(fee as f64 / (weight as f64 / 4.0));
            }
        }
        fees.sort_unstable();
        rates.sort_by(f64::total_cmp);
        let fees_f64: Vec<f64> = fees.iter().map(|fee| *fee as f64).collect();

        Self {
            tx_count: fees.len(),
            fee_min: fees.first().copied(),
            fee_median: median(&fees_f64),
            fee_max: fees.last().copied(),
            fee_rate_min: rates.first().copied(),
            fee_rate_median: median(&rates),
            fee_rate_max: rates.last().copied(),
        }
    }
}

/// Periodic fee sample: hash by height, block by hash, then the block's first
/// page of transactions, reduced to [`FeeStats`].
pub struct FeeSampleCollector {
    fetcher: Arc<Fetcher>,
}

impl FeeSampleCollector {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl UnitCollector for FeeSampleCollector {
    async fn collect(&self, unit: WorkUnit, token: &CancellationToken) -> FetchResult<FetchOutcome<CollectionRecord>> {
        let Some(hash) = fetch_block_hash(&self.fetcher, unit, token).await?.into_data() else {
            return Ok(FetchOutcome::Cancelled);
        };
        let Some(block) = self.fetcher.fetch(&block_path(&hash), ResponseKind::Json, token).await?.into_data() else {
            return Ok(FetchOutcome::Cancelled);
        };
        let txs_path = block_txs_path(&hash);
        let Some(transactions) = self.fetcher.fetch(&txs_path, ResponseKind::Json, token).await?.into_data() else {
            return Ok(FetchOutcome::Cancelled);
        };
        let Value::Array(transactions) = transactions else {
            return Err(FetchError::Parse { endpoint: txs_path, message: "expected a transaction list".to_string() });
        };

        let stats = FeeStats::from_transactions(&transactions);
        debug!(unit = %unit, block_hash = %hash, sampled = stats.tx_count, "Collected fee sample");

        Ok(FetchOutcome::Data(CollectionRecord {
            work_unit_id: unit,
            kind: WorkKind::FeeSamples,
            derived_subkeys: BTreeMap::from([("block_hash".to_string(), hash)]),
            collected_at: Utc::now(),
            raw_payload: json!({
                "block": block,
                "fee_stats": stats,
                "transactions": transactions,
            }),
        }))
    }
}
