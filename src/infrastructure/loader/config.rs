//! Loader configuration

use std::time::Duration;

/// Configuration shared by every loader created for a scope
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Cooperative yields a waiter performs before flushing its batch window
    pub yield_count: usize,
    /// Flush a window as soon as it holds this many keys
    pub max_batch_size: Option<usize>,
    /// Upper bound for a single batch call
    pub batch_timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            yield_count: 1,
            max_batch_size: None,
            batch_timeout: None,
        }
    }
}

impl LoaderConfig {
    /// Sets the number of yields before a window is flushed
    pub fn with_yield_count(mut self, yield_count: usize) -> Self {
        self.yield_count = yield_count;
        self
    }

    /// Caps the number of keys per batch; zero is treated as one
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size.max(1));
        self
    }

    /// Fails a batch with a cancellation error when it runs longer than `timeout`
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }
}
