use clap::Args;

use crate::types::constant::DEFAULT_THROTTLE_SECS;

/// Request budget against the upstream API.
#[derive(Debug, Clone, Args)]
pub struct RateLimitCliArgs {
    /// Delay before every upstream call.
    #[arg(env = "COLLECTOR_RATE_LIMIT_DELAY_SECS", long, default_value_t = 1.0)]
    pub rate_limit_delay_secs: f64,

    /// Hourly request budget. When set, the per-call delay becomes 3600 / n seconds.
    #[arg(env = "COLLECTOR_REQUESTS_PER_HOUR", long)]
    pub requests_per_hour: Option<u64>,

    #[arg(env = "COLLECTOR_MAX_RETRIES", long, default_value_t = 3)]
    pub max_retries: u32,

    /// Base of the exponential backoff: attempt n waits base^n seconds.
    #[arg(env = "COLLECTOR_RETRY_BASE_DELAY_SECS", long, default_value_t = 2.0)]
    pub retry_base_delay_secs: f64,

    /// Every n-th request gets an extra burst-protection delay.
    #[arg(env = "COLLECTOR_BURST_INTERVAL", long, default_value_t = 100)]
    pub burst_interval: u64,

    #[arg(env = "COLLECTOR_BURST_DELAY_SECS", long, default_value_t = 10.0)]
    pub burst_delay_secs: f64,

    /// Cooldown used when a throttled response carries no Retry-After header.
    #[arg(env = "COLLECTOR_THROTTLE_DEFAULT_SECS", long, default_value_t = DEFAULT_THROTTLE_SECS)]
    pub throttle_default_secs: u64,

    /// Throttled responses tolerated for a single call before giving up.
    #[arg(env = "COLLECTOR_MAX_THROTTLE_WAITS", long, default_value_t = 20)]
    pub max_throttle_waits: u32,
}
