use clap::Args;

use crate::types::constant::DEFAULT_BLOCKS_PER_DAY;

/// Parameters controlling the historical window and the collection loop cadence.
#[derive(Debug, Clone, Args)]
pub struct CollectionCliArgs {
    /// How many days of history to backfill behind the chain tip.
    #[arg(env = "COLLECTOR_LOOKBACK_DAYS", long, default_value_t = 30)]
    pub lookback_days: u64,

    #[arg(env = "COLLECTOR_BLOCKS_PER_DAY", long, default_value_t = DEFAULT_BLOCKS_PER_DAY)]
    pub blocks_per_day: u64,

    /// Distance in blocks between two fee samples.
    #[arg(env = "COLLECTOR_SAMPLE_STRIDE", long, default_value_t = 6)]
    pub sample_stride: u64,

    /// Lowest height the planner will ever schedule.
    #[arg(env = "COLLECTOR_FIRST_VALID_HEIGHT", long, default_value_t = 0)]
    pub first_valid_height: u64,

    /// Units processed between two cooperative batch pauses.
    #[arg(env = "COLLECTOR_BATCH_SIZE", long, default_value_t = 50)]
    pub batch_size: u64,

    #[arg(env = "COLLECTOR_BATCH_PAUSE_SECS", long, default_value_t = 5.0)]
    pub batch_pause_secs: f64,

    /// Units processed between two progress checkpoints.
    #[arg(env = "COLLECTOR_CHECKPOINT_EVERY", long, default_value_t = 100)]
    pub checkpoint_every: u64,

    /// Failed units tolerated before a work set is aborted.
    #[arg(env = "COLLECTOR_MAX_FAILURES", long, default_value_t = 50)]
    pub max_failures: u64,

    /// Upper bound on the final checkpoint and summary writes after a shutdown signal.
    #[arg(env = "COLLECTOR_SHUTDOWN_TIMEOUT_SECS", long, default_value_t = 30)]
    pub shutdown_timeout_secs: u64,
}
