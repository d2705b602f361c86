#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # Streamline Mock
//!
//! An in-process simulation of a partitioned-log consumer client, for testing
//! code that consumes from Streamline (or any Kafka-compatible broker) without
//! running one.
//!
//! ## Features
//!
//! - **Client state machine**: subscribe, assign, pattern subscription,
//!   deferred group join, rebalance callbacks, seek, pause/resume
//! - **Misuse detection**: concurrent or reentrant calls fail fast with
//!   [`MockError::ConcurrentAccess`]
//! - **Session expiry**: assignments lapse when a manual-heartbeat consumer
//!   stops polling
//! - **Fault injection**: queue protocol errors for upcoming polls and commits
//! - **Asynchronous commits**: delayed, on a background worker owned by each
//!   consumer
//! - **Consumer pool**: a fixed set of instances handed out by a factory
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use streamline_mock::{
//!     ConsumerFactory, ConsumerOptions, ConsumerPool, MockCluster, MockConsumerConfig,
//!     Result, TopicPartition,
//! };
//!
//! fn main() -> Result<()> {
//!     let cluster = Arc::new(MockCluster::new());
//!     cluster.create_topic("orders", 3)?;
//!     cluster.append(&TopicPartition::new("orders", 0), None, "first")?;
//!
//!     let pool = ConsumerPool::with_capacity(cluster.clone(), MockConsumerConfig::default(), 1)?;
//!     let consumer = pool.create_consumer(
//!         ConsumerOptions::new("billing").with_offset_reset("earliest"),
//!     )?;
//!
//!     consumer.subscribe(["orders"], None)?;
//!     consumer.poll(Duration::from_millis(100))?; // joins the group
//!     for record in consumer.poll(Duration::from_millis(100))? {
//!         println!("{}@{}: {:?}", record.partition, record.offset, record.value);
//!     }
//!
//!     consumer.commit_async(None)?;
//!     consumer.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - consumer options and per-instance simulation settings
//! - [`consumer`] - the simulated client and its components
//! - [`error`] - error types
//! - [`metrics`] - counters emitted through the `metrics` facade
//! - [`storage`] - the log store interface and an in-memory cluster

pub mod config;
pub mod consumer;
pub mod error;
pub mod metrics;
pub mod storage;

pub use config::{ConsumerOptions, MockConsumerConfig, OffsetResetPolicy};
pub use consumer::{
    CommitCallback, ConsumerFactory, ConsumerPool, ConsumerRecords, MockConsumer, OffsetMap,
    RebalanceListener,
};
pub use error::{InjectedFault, KafkaErrorCode, MockError, Result};
pub use storage::{LogStore, MockCluster, PartitionInfo, Record, TopicPartition};
