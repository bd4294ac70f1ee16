use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::client::storage::StorageClient;
use crate::core::config::RunMode;
use crate::core::error::FetchError;
use crate::error::CollectorResult;
use crate::types::constant::TIP_HEIGHT_PATH;
use crate::types::keys::{summary_key, unit_prefix, KeyPattern};
use crate::types::params::{CollectionParams, LoopParams};
use crate::types::summary::CollectionSummary;
use crate::types::work::{WorkKind, WorkUnit};
use crate::worker::checkpoint::CheckpointStore;
use crate::worker::collection::CollectionLoop;
use crate::worker::fetcher::{FetchOutcome, Fetcher, ResponseKind};
use crate::worker::planner::plan;
use crate::worker::scanner::scan_completed;
use crate::worker::snapshot::SnapshotCollector;
use crate::worker::unit::{BlockCollector, FeeSampleCollector, UnitCollector};

/// One invocation: snapshots, then (in full mode) scan, plan and backfill,
/// finishing with a summary object.
pub struct Pipeline {
    storage: Arc<dyn StorageClient>,
    fetcher: Arc<Fetcher>,
    checkpoints: Arc<CheckpointStore>,
    collection: CollectionParams,
    loop_params: LoopParams,
    /// Non-secret settings recorded in the summary
    settings: Value,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn StorageClient>,
        fetcher: Arc<Fetcher>,
        collection: CollectionParams,
        loop_params: LoopParams,
        settings: Value,
    ) -> Self {
        let checkpoints = Arc::new(CheckpointStore::new(Arc::clone(&storage)));
        Self { storage, fetcher, checkpoints, collection, loop_params, settings }
    }

    pub async fn run(&self, mode: RunMode, token: &CancellationToken) -> CollectorResult<CollectionSummary> {
        let started_at = Utc::now();
        let mut summary = CollectionSummary {
            mode: mode.to_string(),
            started_at,
            finished_at: started_at,
            interrupted: false,
            tip_height: None,
            planned_range: None,
            snapshots: Vec::new(),
            backfills: Vec::new(),
            settings: self.settings.clone(),
        };

        let snapshots = SnapshotCollector::new(Arc::clone(&self.fetcher), Arc::clone(&self.storage));
        let result = match snapshots.collect_all(&mut summary.snapshots, token).await {
            Ok(()) if mode == RunMode::Full => self.backfill(&mut summary, token).await,
            Ok(()) => Ok(()),
            Err(e) => Err(e.into()),
        };

        summary.interrupted = token.is_cancelled();
        summary.finished_at = Utc::now();
        self.write_summary(&summary).await;
        result.map(|()| summary)
    }

    async fn backfill(&self, summary: &mut CollectionSummary, token: &CancellationToken) -> CollectorResult<()> {
        for kind in [WorkKind::Blocks, WorkKind::FeeSamples] {
            match self.checkpoints.latest(kind).await {
                Ok(Some(previous)) => info!(
                    kind = %kind,
                    state = ?previous.state,
                    last_completed_unit = ?previous.last_completed_unit,
                    completed = previous.completed_count,
                    failed = previous.failed_count,
                    "Previous run checkpoint"
                ),
                Ok(None) => info!(kind = %kind, "No previous checkpoint"),
                Err(e) => warn!(kind = %kind, error = %e, "Could not read previous checkpoint"),
            }
        }

        let completed_blocks = scan_completed(
            self.storage.as_ref(),
            unit_prefix(WorkKind::Blocks),
            &KeyPattern::for_kind(WorkKind::Blocks),
        )
        .await?;
        let completed_samples = scan_completed(
            self.storage.as_ref(),
            unit_prefix(WorkKind::FeeSamples),
            &KeyPattern::for_kind(WorkKind::FeeSamples),
        )
        .await?;
        info!(blocks = completed_blocks.len(), samples = completed_samples.len(), "Found stored units");

        let Some(tip) = self.tip_height(token).await? else {
            info!("Shutdown requested before planning");
            return Ok(());
        };
        summary.tip_height = Some(tip.height());

        let plan = plan(tip, &self.collection, &completed_blocks, &completed_samples);
        summary.planned_range = Some((plan.start, plan.end));
        info!(
            start = %plan.start,
            end = %plan.end,
            blocks = plan.blocks.len(),
            samples = plan.samples.len(),
            "Planned backfill"
        );

        let collection_loop =
            CollectionLoop::new(Arc::clone(&self.storage), Arc::clone(&self.checkpoints), self.loop_params.clone());
        let blocks = BlockCollector::new(Arc::clone(&self.fetcher));
        let samples = FeeSampleCollector::new(Arc::clone(&self.fetcher));
        let work: [(&dyn UnitCollector, _); 2] = [(&blocks, &plan.blocks), (&samples, &plan.samples)];

        for (collector, work_set) in work {
            if token.is_cancelled() {
                break;
            }
            let run = collection_loop.run(collector, work_set, token).await?;
            summary.backfills.push(run);
        }
        Ok(())
    }

    async fn tip_height(&self, token: &CancellationToken) -> CollectorResult<Option<WorkUnit>> {
        let value = match self.fetcher.fetch(TIP_HEIGHT_PATH, ResponseKind::Integer, token).await? {
            FetchOutcome::Data(value) => value,
            FetchOutcome::Cancelled => return Ok(None),
        };
        let height = value.as_u64().ok_or_else(|| FetchError::Parse {
            endpoint: TIP_HEIGHT_PATH.to_string(),
            message: format!("expected an integer height, got {value}"),
        })?;
        info!(tip_height = height, "Current chain tip");
        Ok(Some(WorkUnit(height)))
    }

    /// Write the summary object, bounded by the shutdown timeout.
    async fn write_summary(&self, summary: &CollectionSummary) {
        let key = summary_key(summary.finished_at);
        let body = match serde_json::to_vec_pretty(summary) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to serialize collection summary");
                return;
            }
        };
        let write = self.storage.put_data(Bytes::from(body), &key);
        match tokio::time::timeout(self.loop_params.shutdown_timeout, write).await {
            Ok(Ok(())) => info!(key = %key, "Stored collection summary"),
            Ok(Err(e)) => error!(error = %e, "Failed to store collection summary"),
            Err(_) => error!("Timed out storing collection summary"),
        }
    }
}
