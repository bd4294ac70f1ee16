//! Object store key layout.
//!
//! Unit-addressed keys are a pure function of the unit so that re-collecting a
//! unit overwrites the previous object. Everything else is timestamp-keyed and
//! never overwritten.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::types::constant::{BLOCKS_PREFIX, CHECKPOINTS_PREFIX, FEE_SAMPLES_PREFIX};
use crate::types::work::{WorkKind, WorkUnit};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

static BLOCK_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^blocks/height_(\d+)\.json$").expect("block key pattern"));
static FEE_SAMPLE_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^fees/historical/height_(\d+)_fees\.json$").expect("fee sample key pattern"));

/// Timestamp component used in append-only keys. Millisecond precision and
/// lexicographic order matches chronological order.
pub fn timestamp_component(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn date_path(at: DateTime<Utc>) -> String {
    at.format("%Y/%m/%d").to_string()
}

pub fn block_key(unit: WorkUnit) -> String {
    format!("{BLOCKS_PREFIX}height_{}.json", unit.height())
}

pub fn fee_sample_key(unit: WorkUnit) -> String {
    format!("{FEE_SAMPLES_PREFIX}height_{}_fees.json", unit.height())
}

/// Canonical key for a unit of the given kind.
pub fn unit_key(kind: WorkKind, unit: WorkUnit) -> String {
    match kind {
        WorkKind::Blocks => block_key(unit),
        WorkKind::FeeSamples => fee_sample_key(unit),
    }
}

/// Prefix listed to rebuild the completed set for a kind.
pub fn unit_prefix(kind: WorkKind) -> &'static str {
    match kind {
        WorkKind::Blocks => BLOCKS_PREFIX,
        WorkKind::FeeSamples => FEE_SAMPLES_PREFIX,
    }
}

pub fn mempool_key(at: DateTime<Utc>) -> String {
    format!("mempool/{}/mempool_snapshot_{}.json", date_path(at), timestamp_component(at))
}

pub fn fee_estimates_key(at: DateTime<Utc>) -> String {
    format!("fees/current/{}/fee_estimates_{}.json", date_path(at), timestamp_component(at))
}

pub fn checkpoint_prefix(kind: WorkKind) -> String {
    format!("{CHECKPOINTS_PREFIX}{}_checkpoint_", kind.as_str())
}

pub fn checkpoint_key(kind: WorkKind, at: DateTime<Utc>) -> String {
    format!("{}{}.json", checkpoint_prefix(kind), timestamp_component(at))
}

pub fn summary_key(at: DateTime<Utc>) -> String {
    format!("metadata/collection_summary_{}.json", timestamp_component(at))
}

pub fn coingecko_price_key(at: DateTime<Utc>) -> String {
    format!("market/coingecko/{}/simple_price_{}.json", date_path(at), timestamp_component(at))
}

pub fn fred_observations_key(series_id: &str, at: DateTime<Utc>) -> String {
    format!("market/fred/{series_id}/observations_{}.json", timestamp_component(at))
}

/// A key-name pattern with exactly one capture group holding the unit height.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    regex: Regex,
}

impl KeyPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        if regex.captures_len() != 2 {
            return Err(regex::Error::Syntax(format!("key pattern must have exactly one capture group: {pattern}")));
        }
        Ok(Self { regex })
    }

    /// Pattern matching the canonical key of `kind`.
    pub fn for_kind(kind: WorkKind) -> Self {
        let regex = match kind {
            WorkKind::Blocks => &BLOCK_KEY_PATTERN,
            WorkKind::FeeSamples => &FEE_SAMPLE_KEY_PATTERN,
        };
        Self { regex: Regex::clone(regex) }
    }

    /// Extract the unit embedded in `key`, if the key is well formed.
    pub fn unit_of(&self, key: &str) -> Option<WorkUnit> {
        let captures = self.regex.captures(key)?;
        captures.get(1)?.as_str().parse::<u64>().ok().map(WorkUnit)
    }
}
