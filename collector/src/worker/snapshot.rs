use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::client::storage::StorageClient;
use crate::core::error::FetchResult;
use crate::error::CollectorResult;
use crate::types::constant::{FEE_ESTIMATES_PATH, MEMPOOL_PATH};
use crate::types::keys::{fee_estimates_key, mempool_key};
use crate::types::record::SnapshotRecord;
use crate::types::summary::SnapshotOutcome;
use crate::worker::fetcher::{FetchOutcome, Fetcher, ResponseKind};

/// Point-in-time state captured once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    Mempool,
    FeeEstimates,
}

impl Snapshot {
    pub const ALL: [Snapshot; 2] = [Snapshot::Mempool, Snapshot::FeeEstimates];

    pub fn name(&self) -> &'static str {
        match self {
            Snapshot::Mempool => "mempool",
            Snapshot::FeeEstimates => "fee_estimates",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            Snapshot::Mempool => MEMPOOL_PATH,
            Snapshot::FeeEstimates => FEE_ESTIMATES_PATH,
        }
    }

    fn key(&self, at: DateTime<Utc>) -> String {
        match self {
            Snapshot::Mempool => mempool_key(at),
            Snapshot::FeeEstimates => fee_estimates_key(at),
        }
    }
}

/// Store a timestamped snapshot envelope and return its key.
pub async fn store_snapshot(
    storage: &dyn StorageClient,
    name: &str,
    key: String,
    collected_at: DateTime<Utc>,
    data: serde_json::Value,
) -> CollectorResult<String> {
    let record = SnapshotRecord { snapshot: name.to_string(), collected_at, data };
    storage.put_data(Bytes::from(serde_json::to_vec(&record)?), &key).await?;
    Ok(key)
}

pub struct SnapshotCollector {
    fetcher: Arc<Fetcher>,
    storage: Arc<dyn StorageClient>,
}

impl SnapshotCollector {
    pub fn new(fetcher: Arc<Fetcher>, storage: Arc<dyn StorageClient>) -> Self {
        Self { fetcher, storage }
    }

    /// Fetch and store `snapshot`.
    ///
    /// Failures are reported in the outcome. Only fatal fetch errors are raised.
    pub async fn collect(&self, snapshot: Snapshot, token: &CancellationToken) -> FetchResult<SnapshotOutcome> {
        let name = snapshot.name();
        let data = match self.fetcher.fetch(snapshot.path(), ResponseKind::Json, token).await {
            Ok(FetchOutcome::Data(data)) => data,
            Ok(FetchOutcome::Cancelled) => return Ok(SnapshotOutcome::failed(name, "cancelled")),
            Err(e) if e.is_fatal() => {
                error!(snapshot = name, error = %e, "Fatal error while fetching snapshot");
                return Err(e);
            }
            Err(e) => {
                warn!(snapshot = name, error = %e, "Failed to fetch snapshot");
                return Ok(SnapshotOutcome::failed(name, e));
            }
        };

        let collected_at = Utc::now();
        let key = snapshot.key(collected_at);
        let outcome = match store_snapshot(self.storage.as_ref(), name, key, collected_at, data).await {
            Ok(key) => {
                info!(snapshot = name, key = %key, "Stored snapshot");
                SnapshotOutcome::stored(name, key)
            }
            Err(e) => {
                warn!(snapshot = name, error = %e, "Failed to store snapshot");
                SnapshotOutcome::failed(name, e)
            }
        };
        Ok(outcome)
    }

    /// Collect every snapshot into `outcomes`, stopping at the first fatal error.
    ///
    /// The snapshot that hit the fatal error is recorded as failed before the
    /// error is returned.
    pub async fn collect_all(&self, outcomes: &mut Vec<SnapshotOutcome>, token: &CancellationToken) -> FetchResult<()> {
        for snapshot in Snapshot::ALL {
            match self.collect(snapshot, token).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    outcomes.push(SnapshotOutcome::failed(snapshot.name(), &e));
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}
