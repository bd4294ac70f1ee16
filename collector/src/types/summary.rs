use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CollectorError, CollectorResult};
use crate::types::checkpoint::LoopState;
use crate::types::work::{WorkKind, WorkUnit};

/// Outcome of one collection loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub kind: WorkKind,
    pub state: LoopState,
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub remaining: u64,
    pub last_completed_unit: Option<WorkUnit>,
    /// Failed units with the cause reported for each
    pub failures: Vec<(WorkUnit, String)>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOutcome {
    pub name: String,
    pub key: Option<String>,
    pub error: Option<String>,
}

impl SnapshotOutcome {
    pub fn stored(name: &str, key: String) -> Self {
        Self { name: name.to_string(), key: Some(key), error: None }
    }

    pub fn failed(name: &str, error: impl ToString) -> Self {
        Self { name: name.to_string(), key: None, error: Some(error.to_string()) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Invocation-level summary written under `metadata/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub mode: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub interrupted: bool,
    pub tip_height: Option<u64>,
    pub planned_range: Option<(WorkUnit, WorkUnit)>,
    pub snapshots: Vec<SnapshotOutcome>,
    pub backfills: Vec<RunSummary>,
    /// Non-secret configuration in effect
    pub settings: Value,
}

impl CollectionSummary {
    /// Exit status of the invocation: an aborted backfill fails it, interruption does not.
    pub fn ensure_not_aborted(&self) -> CollectorResult<()> {
        match self.backfills.iter().find(|run| run.state == LoopState::Aborted) {
            Some(run) => Err(CollectorError::Aborted { kind: run.kind, failed: run.failed }),
            None => Ok(()),
        }
    }
}
