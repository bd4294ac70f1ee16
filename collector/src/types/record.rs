use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::work::{WorkKind, WorkUnit};

/// Payload persisted for one unit. Stored under a key derived only from
/// `kind` and `work_unit_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub work_unit_id: WorkUnit,
    pub kind: WorkKind,
    /// Identifiers resolved while collecting the unit, e.g. `block_hash`
    pub derived_subkeys: BTreeMap<String, String>,
    pub collected_at: DateTime<Utc>,
    pub raw_payload: Value,
}

/// Envelope for point-in-time snapshots (mempool, fee estimates, market data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub snapshot: String,
    pub collected_at: DateTime<Utc>,
    pub data: Value,
}
