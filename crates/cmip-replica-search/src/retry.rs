// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// How discovery reacts when the reconciler cannot write a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts on one paginated page before it is left for the next run.
    pub max_attempts: usize,
    pub transient_delay: Duration,
}

pub trait BackoffPolicy {
    fn delay_for_attempt(&self, attempt: usize) -> Duration;
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transient_delay: Duration::from_secs(600),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.transient_delay = delay;
        self
    }
}

impl BackoffPolicy for RetryPolicy {
    /// Fixed delay: a locked store is usually released by the next scheduled download batch.
    fn delay_for_attempt(&self, _attempt: usize) -> Duration {
        self.transient_delay
    }
}
