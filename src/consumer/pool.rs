//! Fixed-size pool of mock consumers
//!
//! Code under test asks a [`ConsumerFactory`] for consumers; tests hand it a
//! [`ConsumerPool`] preloaded with instances they keep handles to, so they can
//! inject faults and inspect state on exactly the consumer the code got.

use crate::config::{ConsumerOptions, MockConsumerConfig};
use crate::consumer::mock::MockConsumer;
use crate::error::{MockError, Result};
use crate::storage::LogStore;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Creates consumers from application options
pub trait ConsumerFactory: Send + Sync {
    type Consumer;

    fn create_consumer(&self, options: ConsumerOptions) -> Result<Self::Consumer>;
}

/// Free and in-use mock consumers
#[derive(Debug, Default)]
pub struct ConsumerPool {
    free: Mutex<VecDeque<Arc<MockConsumer>>>,
    in_use: Mutex<Vec<Arc<MockConsumer>>>,
}

impl ConsumerPool {
    /// Pool handing out `consumers` in order
    pub fn new(consumers: impl IntoIterator<Item = Arc<MockConsumer>>) -> Self {
        Self {
            free: Mutex::new(consumers.into_iter().collect()),
            in_use: Mutex::new(Vec::new()),
        }
    }

    /// Pool of `size` fresh consumers reading from `store`
    pub fn with_capacity(
        store: Arc<dyn LogStore>,
        config: MockConsumerConfig,
        size: usize,
    ) -> Result<Self> {
        let consumers = (0..size)
            .map(|_| MockConsumer::new(Arc::clone(&store), config.clone()).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(consumers))
    }

    /// Return a consumer to the back of the free list
    pub fn add_consumer(&self, consumer: Arc<MockConsumer>) {
        self.free.lock().push_back(consumer);
    }

    /// Consumers handed out so far, in creation order
    pub fn consumers_in_use(&self) -> Vec<Arc<MockConsumer>> {
        self.in_use.lock().clone()
    }

    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }
}

impl ConsumerFactory for ConsumerPool {
    type Consumer = Arc<MockConsumer>;

    /// Take the first free consumer and configure it with `options`. The pool
    /// never creates instances on demand.
    fn create_consumer(&self, options: ConsumerOptions) -> Result<Arc<MockConsumer>> {
        let consumer = self.free.lock().pop_front().ok_or(MockError::PoolExhausted)?;

        let group_id = options.group_id.clone();
        if let Err(e) = consumer.configure(options) {
            warn!(group_id = %group_id, error = %e, "Failed to configure pooled consumer");
            self.free.lock().push_front(consumer);
            return Err(e);
        }

        self.in_use.lock().push(Arc::clone(&consumer));
        debug!(group_id = %group_id, free = self.free_count(), "Handed out pooled consumer");
        Ok(consumer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SESSION_TIMEOUT_MS_CONFIG;
    use crate::storage::MockCluster;

    fn pool(size: usize, config: MockConsumerConfig) -> ConsumerPool {
        let cluster = Arc::new(MockCluster::new());
        ConsumerPool::with_capacity(cluster, config, size).unwrap()
    }

    #[test]
    fn test_create_takes_first_free_consumer() {
        let cluster = Arc::new(MockCluster::new());
        let first = Arc::new(MockConsumer::new(cluster.clone(), MockConsumerConfig::default()).unwrap());
        let second = Arc::new(MockConsumer::new(cluster, MockConsumerConfig::default()).unwrap());
        let pool = ConsumerPool::new([first.clone(), second.clone()]);

        let got = pool.create_consumer(ConsumerOptions::new("a")).unwrap();
        assert!(Arc::ptr_eq(&got, &first));
        assert_eq!(got.group_id(), "a");
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.consumers_in_use().len(), 1);
    }

    #[test]
    fn test_empty_pool_fails() {
        let pool = pool(1, MockConsumerConfig::default());
        pool.create_consumer(ConsumerOptions::new("a")).unwrap();
        let err = pool.create_consumer(ConsumerOptions::new("b")).unwrap_err();
        assert!(matches!(err, MockError::PoolExhausted));
        assert_eq!(pool.consumers_in_use().len(), 1);
    }

    #[test]
    fn test_add_consumer_returns_to_free_list() {
        let pool = pool(1, MockConsumerConfig::default());
        let consumer = pool.create_consumer(ConsumerOptions::new("a")).unwrap();
        pool.add_consumer(consumer);
        assert_eq!(pool.free_count(), 1);

        let again = pool.create_consumer(ConsumerOptions::new("b")).unwrap();
        assert_eq!(again.group_id(), "b");
        assert_eq!(pool.consumers_in_use().len(), 2);
    }

    #[test]
    fn test_configure_failure_keeps_consumer_free() {
        let pool = pool(1, MockConsumerConfig::manual_heartbeat());
        let options = ConsumerOptions::new("a").with_property(SESSION_TIMEOUT_MS_CONFIG, "soon");

        let err = pool.create_consumer(options).unwrap_err();
        assert!(matches!(err, MockError::Configuration(_)));
        assert_eq!(pool.free_count(), 1);
        assert!(pool.consumers_in_use().is_empty());
    }
}
