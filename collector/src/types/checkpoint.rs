use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::work::{WorkKind, WorkUnit};

/// Lifecycle of one collection loop over a work set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    Running,
    /// Every unit was attempted
    Completed,
    /// The shutdown token was observed at a safe point
    Interrupted,
    /// The failure ceiling was exceeded
    Aborted,
}

/// Durable progress snapshot, written every N processed units and once on
/// loop exit. Stored append-only under a timestamped key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub kind: WorkKind,
    pub timestamp: DateTime<Utc>,
    pub state: LoopState,
    /// Low-water mark: every unit of this run at or below it was persisted
    pub last_completed_unit: Option<WorkUnit>,
    pub completed_count: u64,
    pub failed_count: u64,
    pub remaining_count: u64,
    #[serde(default)]
    pub failed_units: Vec<WorkUnit>,
    pub shutdown_flag: bool,
    pub completed_gracefully: bool,
}
