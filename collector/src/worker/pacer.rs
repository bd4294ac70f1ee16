use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::params::RateBudget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceOutcome {
    Elapsed,
    Cancelled,
}

/// Sleep for `duration` unless `token` is cancelled first.
///
/// Returns `false` when the wait was cut short by cancellation.
pub async fn sleep_or_cancel(duration: Duration, token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = token.cancelled() => false,
    }
}

/// Spreads upstream calls out to stay within the request budget.
#[derive(Debug, Clone)]
pub struct Pacer {
    base_delay: Duration,
    burst_interval: u64,
    burst_extra_delay: Duration,
}

impl Pacer {
    pub fn new(budget: &RateBudget) -> Self {
        Self {
            base_delay: budget.base_delay,
            burst_interval: budget.burst_interval,
            burst_extra_delay: budget.burst_extra_delay,
        }
    }

    /// Delay owed before request number `request_index`.
    pub fn delay_for(&self, request_index: u64) -> Duration {
        let burst = self.burst_interval > 0 && request_index > 0 && request_index % self.burst_interval == 0;
        if burst {
            self.base_delay + self.burst_extra_delay
        } else {
            self.base_delay
        }
    }

    /// Block the caller for the delay owed before `request_index`, waking early on cancellation.
    pub async fn wait(&self, request_index: u64, token: &CancellationToken) -> PaceOutcome {
        let delay = self.delay_for(request_index);
        if delay > self.base_delay {
            debug!(request_index, delay_secs = delay.as_secs_f64(), "Burst protection pause");
        }
        if sleep_or_cancel(delay, token).await {
            PaceOutcome::Elapsed
        } else {
            PaceOutcome::Cancelled
        }
    }
}
