use std::time::Duration;

use crate::mutator::RetryConfig;

/// Configuration of the tenant runtime supervisor.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// How long cleanup waits for a cancelled runtime to signal completion.
    pub await_timeout: Duration,
    /// Delay of the follow-up pass after adding the finalizer or starting a runtime.
    pub requeue_after: Duration,
    /// Capacity of each nested controller's trigger input.
    pub trigger_capacity: usize,
    /// Retry schedule for conflicting store writes.
    pub retry: RetryConfig,
}

impl SupervisorConfig {
    pub fn with_await_timeout(mut self, timeout: Duration) -> Self {
        self.await_timeout = timeout;
        self
    }

    pub fn with_requeue_after(mut self, delay: Duration) -> Self {
        self.requeue_after = delay;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SupervisorConfig {
    /// - `await_timeout = 10s`
    /// - `requeue_after = 1s`
    /// - `trigger_capacity = 1`
    /// - `retry = RetryConfig::default()`
    fn default() -> Self {
        Self {
            await_timeout: Duration::from_secs(10),
            requeue_after: Duration::from_secs(1),
            trigger_capacity: 1,
            retry: RetryConfig::default(),
        }
    }
}
