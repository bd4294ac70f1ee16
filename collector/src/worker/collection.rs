use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::core::client::storage::StorageClient;
use crate::core::error::FetchError;
use crate::error::{CollectorError, CollectorResult};
use crate::types::checkpoint::{Checkpoint, LoopState};
use crate::types::keys::unit_key;
use crate::types::params::LoopParams;
use crate::types::record::CollectionRecord;
use crate::types::summary::RunSummary;
use crate::types::work::{WorkKind, WorkSet, WorkUnit};
use crate::worker::checkpoint::CheckpointStore;
use crate::worker::fetcher::FetchOutcome;
use crate::worker::pacer::sleep_or_cancel;
use crate::worker::unit::UnitCollector;

/// Counters of one loop run.
#[derive(Debug)]
struct Progress {
    total: u64,
    completed: u64,
    failures: Vec<(WorkUnit, String)>,
    /// End of the unbroken run of stored units, stops below the first failure
    last_completed_unit: Option<WorkUnit>,
}

impl Progress {
    fn processed(&self) -> u64 {
        self.completed + self.failed()
    }

    fn failed(&self) -> u64 {
        self.failures.len() as u64
    }

    /// Units arrive in ascending order, so the mark only advances while nothing has failed yet.
    fn record_stored(&mut self, unit: WorkUnit) {
        self.completed += 1;
        if self.failures.is_empty() {
            self.last_completed_unit = Some(unit);
        }
    }

    fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.processed())
    }
}

/// Drives one [`WorkSet`] through a [`UnitCollector`], persisting each record
/// under its unit key and checkpointing progress.
pub struct CollectionLoop {
    storage: Arc<dyn StorageClient>,
    checkpoints: Arc<CheckpointStore>,
    params: LoopParams,
}

impl CollectionLoop {
    pub fn new(storage: Arc<dyn StorageClient>, checkpoints: Arc<CheckpointStore>, params: LoopParams) -> Self {
        Self { storage, checkpoints, params }
    }

    /// Process `work` in ascending order until it is exhausted, shutdown is
    /// requested or the failure ceiling is exceeded.
    ///
    /// Unit failures are counted, never fatal. Only a failed credential
    /// exchange ends the loop with an error, after the final checkpoint.
    pub async fn run(
        &self,
        collector: &dyn UnitCollector,
        work: &WorkSet,
        token: &CancellationToken,
    ) -> CollectorResult<RunSummary> {
        let kind = work.kind();
        let span = info_span!("collection", kind = %kind, units = work.len());
        self.run_inner(collector, work, token).instrument(span).await
    }

    async fn run_inner(
        &self,
        collector: &dyn UnitCollector,
        work: &WorkSet,
        token: &CancellationToken,
    ) -> CollectorResult<RunSummary> {
        let kind = work.kind();
        let started_at = Utc::now();
        let mut progress =
            Progress { total: work.len() as u64, completed: 0, failures: Vec::new(), last_completed_unit: None };
        let mut state = LoopState::Idle;
        let mut fatal: Option<FetchError> = None;

        let (first, last) = (work.units().first(), work.units().last());
        info!(total = progress.total, first = ?first, last = ?last, "Starting collection");
        if !work.is_empty() {
            state = LoopState::Running;
        }

        for unit in work.iter() {
            if token.is_cancelled() {
                state = LoopState::Interrupted;
                break;
            }

            match collector.collect(unit, token).await {
                Ok(FetchOutcome::Cancelled) => {
                    state = LoopState::Interrupted;
                    break;
                }
                Ok(FetchOutcome::Data(record)) => match self.persist(&record).await {
                    Ok(()) => {
                        progress.record_stored(unit);
                        debug!(unit = %unit, "Unit stored");
                    }
                    Err(e) => {
                        warn!(unit = %unit, error = %e, "Failed to store unit");
                        progress.failures.push((unit, e.to_string()));
                    }
                },
                Err(e) if e.is_fatal() => {
                    error!(unit = %unit, error = %e, "Fatal error, stopping collection");
                    progress.failures.push((unit, e.to_string()));
                    fatal = Some(e);
                    state = LoopState::Aborted;
                    break;
                }
                Err(e) => {
                    warn!(unit = %unit, error = %e, "Failed to collect unit");
                    progress.failures.push((unit, e.to_string()));
                }
            }

            if progress.failed() > self.params.max_failures {
                error!(
                    failed = progress.failed(),
                    max_failures = self.params.max_failures,
                    "Too many failed units, aborting collection"
                );
                state = LoopState::Aborted;
                break;
            }

            let processed = progress.processed();
            if processed >= progress.total {
                continue;
            }
            if processed % self.params.checkpoint_every == 0 {
                info!(
                    completed = progress.completed,
                    failed = progress.failed(),
                    remaining = progress.remaining(),
                    "Collection progress"
                );
                self.write_checkpoint(kind, LoopState::Running, &progress, token).await;
            }
            if processed % self.params.batch_size == 0 {
                debug!(pause_secs = self.params.batch_pause.as_secs_f64(), "Batch pause");
                if !sleep_or_cancel(self.params.batch_pause, token).await {
                    state = LoopState::Interrupted;
                    break;
                }
            }
        }

        if matches!(state, LoopState::Idle | LoopState::Running) {
            state = LoopState::Completed;
        }
        self.write_final_checkpoint(kind, state, &progress, token).await;

        let summary = RunSummary {
            kind,
            state,
            total: progress.total,
            completed: progress.completed,
            failed: progress.failed(),
            remaining: progress.remaining(),
            last_completed_unit: progress.last_completed_unit,
            failures: progress.failures,
            started_at,
            finished_at: Utc::now(),
        };
        match state {
            LoopState::Completed => {
                info!(completed = summary.completed, failed = summary.failed, "Collection completed")
            }
            LoopState::Interrupted => {
                info!(completed = summary.completed, remaining = summary.remaining, "Collection interrupted")
            }
            _ => error!(completed = summary.completed, failed = summary.failed, "Collection aborted"),
        }

        match fatal {
            Some(e) => Err(CollectorError::FetchError(e)),
            None => Ok(summary),
        }
    }

    async fn persist(&self, record: &CollectionRecord) -> CollectorResult<()> {
        let key = unit_key(record.kind, record.work_unit_id);
        let body = serde_json::to_vec(record)?;
        self.storage.put_data(Bytes::from(body), &key).await?;
        Ok(())
    }

    fn checkpoint(kind: WorkKind, state: LoopState, progress: &Progress, token: &CancellationToken) -> Checkpoint {
        Checkpoint {
            kind,
            timestamp: Utc::now(),
            state,
            last_completed_unit: progress.last_completed_unit,
            completed_count: progress.completed,
            failed_count: progress.failed(),
            remaining_count: progress.remaining(),
            failed_units: progress.failures.iter().map(|(unit, _)| *unit).collect(),
            shutdown_flag: token.is_cancelled(),
            completed_gracefully: state == LoopState::Completed,
        }
    }

    async fn write_checkpoint(
        &self,
        kind: WorkKind,
        state: LoopState,
        progress: &Progress,
        token: &CancellationToken,
    ) {
        let mut checkpoint = Self::checkpoint(kind, state, progress, token);
        if let Err(e) = self.checkpoints.write(&mut checkpoint).await {
            warn!(error = %e, "Failed to write checkpoint");
        }
    }

    /// The last checkpoint of a run. Bounded by the shutdown timeout so a hung
    /// store cannot hold the process after a shutdown request.
    async fn write_final_checkpoint(
        &self,
        kind: WorkKind,
        state: LoopState,
        progress: &Progress,
        token: &CancellationToken,
    ) {
        let write = self.write_checkpoint(kind, state, progress, token);
        if tokio::time::timeout(self.params.shutdown_timeout, write).await.is_err() {
            error!(timeout_secs = self.params.shutdown_timeout.as_secs(), "Timed out writing final checkpoint");
        }
    }
}
