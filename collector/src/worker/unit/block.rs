use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::error::FetchResult;
use crate::types::constant::block_path;
use crate::types::record::CollectionRecord;
use crate::types::work::{WorkKind, WorkUnit};
use crate::worker::fetcher::{FetchOutcome, Fetcher, ResponseKind};
use crate::worker::unit::{fetch_block_hash, UnitCollector};

/// Full block header and metadata: hash by height, then block by hash.
pub struct BlockCollector {
    fetcher: Arc<Fetcher>,
}

impl BlockCollector {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl UnitCollector for BlockCollector {
    async fn collect(&self, unit: WorkUnit, token: &CancellationToken) -> FetchResult<FetchOutcome<CollectionRecord>> {
        let Some(hash) = fetch_block_hash(&self.fetcher, unit, token).await?.into_data() else {
            return Ok(FetchOutcome::Cancelled);
        };
        let Some(block) = self.fetcher.fetch(&block_path(&hash), ResponseKind::Json, token).await?.into_data() else {
            return Ok(FetchOutcome::Cancelled);
        };
        debug!(unit = %unit, block_hash = %hash, "Collected block");

        Ok(FetchOutcome::Data(CollectionRecord {
            work_unit_id: unit,
            kind: WorkKind::Blocks,
            derived_subkeys: BTreeMap::from([("block_hash".to_string(), hash)]),
            collected_at: Utc::now(),
            raw_payload: block,
        }))
    }
}
