use std::time::Duration;

use crate::cli::collection::CollectionCliArgs;
use crate::error::CollectorError;
use crate::types::work::WorkUnit;

/// Shape of the historical window handed to the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionParams {
    pub lookback_days: u64,
    pub blocks_per_day: u64,
    /// Distance between two fee samples, at least 1
    pub sample_stride: u64,
    pub first_valid_height: WorkUnit,
}

impl CollectionParams {
    pub fn lookback_units(&self) -> u64 {
        self.lookback_days.saturating_mul(self.blocks_per_day)
    }
}

/// Cadence of the collection loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopParams {
    pub batch_size: u64,
    pub batch_pause: Duration,
    pub checkpoint_every: u64,
    /// Failed units tolerated before the work set is aborted
    pub max_failures: u64,
    /// Bound on the final writes once shutdown was requested
    pub shutdown_timeout: Duration,
}

impl Default for LoopParams {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_pause: Duration::from_secs(5),
            checkpoint_every: 100,
            max_failures: 50,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl TryFrom<CollectionCliArgs> for CollectionParams {
    type Error = CollectorError;
    fn try_from(args: CollectionCliArgs) -> Result<Self, Self::Error> {
        if args.sample_stride == 0 {
            return Err(CollectorError::ConfigError("COLLECTOR_SAMPLE_STRIDE must be at least 1".to_string()));
        }
        if args.blocks_per_day == 0 {
            return Err(CollectorError::ConfigError("COLLECTOR_BLOCKS_PER_DAY must be at least 1".to_string()));
        }
        Ok(Self {
            lookback_days: args.lookback_days,
            blocks_per_day: args.blocks_per_day,
            sample_stride: args.sample_stride,
            first_valid_height: WorkUnit(args.first_valid_height),
        })
    }
}

impl TryFrom<CollectionCliArgs> for LoopParams {
    type Error = CollectorError;
    fn try_from(args: CollectionCliArgs) -> Result<Self, Self::Error> {
        if args.batch_size == 0 || args.checkpoint_every == 0 {
            return Err(CollectorError::ConfigError(
                "COLLECTOR_BATCH_SIZE and COLLECTOR_CHECKPOINT_EVERY must be at least 1".to_string(),
            ));
        }
        let batch_pause = Duration::try_from_secs_f64(args.batch_pause_secs).map_err(|_| {
            CollectorError::ConfigError(format!(
                "COLLECTOR_BATCH_PAUSE_SECS must be a non-negative number, got {}",
                args.batch_pause_secs
            ))
        })?;
        Ok(Self {
            batch_size: args.batch_size,
            batch_pause,
            checkpoint_every: args.checkpoint_every,
            max_failures: args.max_failures,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
        })
    }
}
