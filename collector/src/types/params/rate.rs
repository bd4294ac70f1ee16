use std::time::Duration;

use crate::cli::rate_limit::RateLimitCliArgs;
use crate::error::CollectorError;
use crate::types::constant::DEFAULT_THROTTLE_SECS;

/// Process-wide request budget. Read-only once the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RateBudget {
    /// Delay before every upstream call
    pub base_delay: Duration,
    /// Attempts allowed for a call failing with transient errors
    pub max_retries: u32,
    /// Backoff base in seconds, attempt `n` waits `retry_base_delay^n`
    pub retry_base_delay: f64,
    pub burst_extra_delay: Duration,
    /// Every `burst_interval`-th request also waits `burst_extra_delay`. Zero disables it.
    pub burst_interval: u64,
    pub throttle_default: Duration,
    pub max_throttle_waits: u32,
}

impl Default for RateBudget {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_retries: 3,
            retry_base_delay: 2.0,
            burst_extra_delay: Duration::from_secs(10),
            burst_interval: 100,
            throttle_default: Duration::from_secs(DEFAULT_THROTTLE_SECS),
            max_throttle_waits: 20,
        }
    }
}

impl RateBudget {
    /// Backoff before the retry following failed attempt `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::try_from_secs_f64(self.retry_base_delay.powi(exponent)).unwrap_or(Duration::MAX)
    }

    /// Requests per hour this budget allows at most, ignoring burst pauses.
    pub fn max_requests_per_hour(&self) -> Option<u64> {
        let per_call = self.base_delay.as_secs_f64();
        (per_call > 0.0).then(|| (3600.0 / per_call).floor() as u64)
    }
}

/// Delay that spreads `requests_per_hour` calls evenly over an hour.
fn per_call_delay(requests_per_hour: u64) -> Result<Duration, CollectorError> {
    if requests_per_hour == 0 {
        return Err(CollectorError::ConfigError("COLLECTOR_REQUESTS_PER_HOUR must be positive".to_string()));
    }
    Ok(Duration::from_secs(3600).div_f64(requests_per_hour as f64))
}

fn non_negative_secs(name: &str, secs: f64) -> Result<Duration, CollectorError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        CollectorError::ConfigError(format!("{name} must be a non-negative number of seconds, got {secs}"))
    })
}

impl TryFrom<RateLimitCliArgs> for RateBudget {
    type Error = CollectorError;
    fn try_from(args: RateLimitCliArgs) -> Result<Self, Self::Error> {
        let base_delay = match args.requests_per_hour {
            Some(requests_per_hour) => per_call_delay(requests_per_hour)?,
            None => non_negative_secs("COLLECTOR_RATE_LIMIT_DELAY_SECS", args.rate_limit_delay_secs)?,
        };
        if args.max_retries == 0 {
            return Err(CollectorError::ConfigError("COLLECTOR_MAX_RETRIES must be at least 1".to_string()));
        }
        // A base of 1 or less would make the backoff flat or shrinking.
        if !(args.retry_base_delay_secs.is_finite() && args.retry_base_delay_secs > 1.0) {
            return Err(CollectorError::ConfigError(format!(
                "COLLECTOR_RETRY_BASE_DELAY_SECS must be greater than 1, got {}",
                args.retry_base_delay_secs
            )));
        }

        Ok(Self {
            base_delay,
            max_retries: args.max_retries,
            retry_base_delay: args.retry_base_delay_secs,
            burst_extra_delay: non_negative_secs("COLLECTOR_BURST_DELAY_SECS", args.burst_delay_secs)?,
            burst_interval: args.burst_interval,
            throttle_default: Duration::from_secs(args.throttle_default_secs),
            max_throttle_waits: args.max_throttle_waits,
        })
    }
}
