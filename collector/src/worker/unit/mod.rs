pub mod block;
pub mod fee_sample;

use std::sync::Arc;

use async_trait::async_trait;
pub use block::BlockCollector;
pub use fee_sample::FeeSampleCollector;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::error::{FetchError, FetchResult};
use crate::types::constant::block_hash_path;
use crate::types::record::CollectionRecord;
use crate::types::work::WorkUnit;
use crate::worker::fetcher::{FetchOutcome, Fetcher, ResponseKind};

/// The multi-call fetch sequence producing the record of one unit.
///
/// Every call for a unit completes before the record is returned, the caller
/// performs the single write. A cancelled sequence yields no record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UnitCollector: Send + Sync {
    async fn collect(&self, unit: WorkUnit, token: &CancellationToken) -> FetchResult<FetchOutcome<CollectionRecord>>;
}

/// Resolve the block hash at `unit`.
pub(crate) async fn fetch_block_hash(
    fetcher: &Arc<Fetcher>,
    unit: WorkUnit,
    token: &CancellationToken,
) -> FetchResult<FetchOutcome<String>> {
    let path = block_hash_path(unit.height());
    let Some(value) = fetcher.fetch(&path, ResponseKind::Text, token).await?.into_data() else {
        return Ok(FetchOutcome::Cancelled);
    };
    match value {
        Value::String(hash) if !hash.is_empty() => Ok(FetchOutcome::Data(hash)),
        other => Err(FetchError::Parse { endpoint: path, message: format!("expected a block hash, got {other}") }),
    }
}
