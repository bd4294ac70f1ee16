use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One addressable item of backfill work. For both block and fee-sample
/// collection this is a block height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkUnit(pub u64);

impl WorkUnit {
    pub fn height(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two independently tracked backfill streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkKind {
    /// Every block in the lookback window
    Blocks,
    /// Strided fee samples across the lookback window
    FeeSamples,
}

impl WorkKind {
    /// Name used in checkpoint keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkKind::Blocks => "blocks",
            WorkKind::FeeSamples => "fees",
        }
    }
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, duplicate-free list of units for one kind. Iteration is always
/// ascending, oldest height first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSet {
    kind: WorkKind,
    units: Vec<WorkUnit>,
}

impl WorkSet {
    pub fn new(kind: WorkKind, units: BTreeSet<WorkUnit>) -> Self {
        Self { kind, units: units.into_iter().collect() }
    }

    pub fn kind(&self) -> WorkKind {
        self.kind
    }

    pub fn units(&self) -> &[WorkUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = WorkUnit> + '_ {
        self.units.iter().copied()
    }
}
