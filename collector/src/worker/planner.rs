use std::collections::BTreeSet;

use crate::types::params::CollectionParams;
use crate::types::work::{WorkKind, WorkSet, WorkUnit};

/// Work left to do over the historical window ending at the current tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub start: WorkUnit,
    pub end: WorkUnit,
    pub blocks: WorkSet,
    pub samples: WorkSet,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.samples.is_empty()
    }
}

/// Compute the window `[start, tip]` and subtract what storage already holds.
///
/// `start = max(first_valid_height, tip - lookback)`. Blocks cover every unit
/// in the window, samples every `sample_stride`-th unit from `start`. Both sets
/// are tracked independently and come out in ascending order.
pub fn plan(
    tip: WorkUnit,
    params: &CollectionParams,
    completed_blocks: &BTreeSet<WorkUnit>,
    completed_samples: &BTreeSet<WorkUnit>,
) -> Plan {
    let start = WorkUnit(tip.height().saturating_sub(params.lookback_units())).max(params.first_valid_height);
    let stride = usize::try_from(params.sample_stride.max(1)).unwrap_or(usize::MAX);

    // Empty when the first valid height lies beyond the tip.
    let window = start.height()..=tip.height();

    let blocks = window.clone().map(WorkUnit).filter(|unit| !completed_blocks.contains(unit)).collect();
    let samples = window.step_by(stride).map(WorkUnit).filter(|unit| !completed_samples.contains(unit)).collect();

    Plan {
        start,
        end: tip,
        blocks: WorkSet::new(WorkKind::Blocks, blocks),
        samples: WorkSet::new(WorkKind::FeeSamples, samples),
    }
}
