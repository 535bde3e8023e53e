use crate::error::{Error, Result};

pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Tunables for a counting run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterConfig {
    /// Number of parsing workers.
    pub workers: usize,
    /// Minimum number of bytes per chunk. Every chunk except the last is
    /// this size plus the tail of the line the block ended in.
    pub block_size: usize,
    /// Chunks allowed in flight between the reader and the workers.
    pub queue_capacity: usize,
    /// Idle buffers kept for reuse. `None` sizes the pool to cover every
    /// buffer that can be alive at once.
    pub pool_capacity: Option<usize>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            block_size: DEFAULT_BLOCK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            pool_capacity: None,
        }
    }
}

impl CounterConfig {
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.pool_capacity = Some(pool_capacity);
        self
    }

    /// Queued chunks, one per busy worker and the one being filled.
    pub fn effective_pool_capacity(&self) -> usize {
        self.pool_capacity
            .unwrap_or(self.queue_capacity + self.workers + 1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be > 0".into()));
        }
        if self.block_size == 0 {
            return Err(Error::InvalidConfig("block_size must be > 0".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CounterConfig::default();
        assert!(config.workers > 0);
        assert_eq!(config.block_size, 256 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_values() {
        let base = CounterConfig::default();
        for config in [
            base.clone().workers(0),
            base.clone().block_size(0),
            base.clone().queue_capacity(0),
        ] {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn pool_capacity_follows_queue() {
        let config = CounterConfig::default().workers(4).queue_capacity(10);
        assert_eq!(config.effective_pool_capacity(), 15);
        assert_eq!(config.pool_capacity(2).effective_pool_capacity(), 2);
    }
}
