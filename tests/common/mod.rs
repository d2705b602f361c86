//! Shared fixtures for mock consumer integration tests
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use streamline_mock::{
    ConsumerOptions, MockCluster, MockConsumer, MockConsumerConfig, RebalanceListener,
    TopicPartition,
};

pub const GROUP: &str = "test-group";
pub const TOPIC: &str = "events";

/// Install a tracing subscriber honouring `RUST_LOG`, once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Cluster with one topic of `partitions` partitions, each holding `records`
pub fn cluster_with(partitions: i32, records: usize) -> Arc<MockCluster> {
    let cluster = Arc::new(MockCluster::new());
    cluster.create_topic(TOPIC, partitions).unwrap();
    for partition in 0..partitions {
        cluster.append_many(&tp(partition), records).unwrap();
    }
    cluster
}

pub fn tp(partition: i32) -> TopicPartition {
    TopicPartition::new(TOPIC, partition)
}

pub fn partitions(n: i32) -> BTreeSet<TopicPartition> {
    (0..n).map(tp).collect()
}

/// Instance config with no artificial latency and a short commit delay
pub fn fast_config() -> MockConsumerConfig {
    MockConsumerConfig::default()
        .with_request_latency(Duration::ZERO)
        .with_commit_delay(Duration::from_millis(5))
}

pub fn earliest() -> ConsumerOptions {
    ConsumerOptions::new(GROUP).with_offset_reset("earliest")
}

/// Configured consumer reading from the start of every partition
pub fn consumer(cluster: &Arc<MockCluster>) -> Arc<MockConsumer> {
    consumer_with(cluster, fast_config(), earliest())
}

pub fn consumer_with(
    cluster: &Arc<MockCluster>,
    config: MockConsumerConfig,
    options: ConsumerOptions,
) -> Arc<MockConsumer> {
    let consumer = MockConsumer::new(cluster.clone(), config).unwrap();
    consumer.configure(options).unwrap();
    Arc::new(consumer)
}

/// Poll once to complete a pending assignment
pub fn join(consumer: &MockConsumer) {
    let batch = consumer.poll(Duration::from_millis(100)).unwrap();
    assert!(batch.is_empty(), "activation poll must return no records");
}

/// Rebalance event seen by [`RecordingListener`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rebalance {
    Revoked(BTreeSet<TopicPartition>),
    Assigned(BTreeSet<TopicPartition>),
}

/// Listener that records every callback in order
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Rebalance>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Rebalance> {
        self.events.lock().clone()
    }
}

impl RebalanceListener for RecordingListener {
    fn on_partitions_revoked(&self, partitions: &BTreeSet<TopicPartition>) {
        self.events.lock().push(Rebalance::Revoked(partitions.clone()));
    }

    fn on_partitions_assigned(&self, partitions: &BTreeSet<TopicPartition>) {
        self.events.lock().push(Rebalance::Assigned(partitions.clone()));
    }
}
