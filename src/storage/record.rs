//! Record and partition types shared by the log store and the consumer

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic partition identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicPartition {
    /// Topic name
    pub topic: String,
    /// Partition index within the topic
    pub partition: i32,
}

impl TopicPartition {
    /// Create a new topic partition
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

/// Partition metadata as reported by the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    /// Topic name
    pub topic: String,
    /// Partition index
    pub partition: i32,
    /// Broker currently leading the partition, `None` while offline
    pub leader: Option<i32>,
}

impl PartitionInfo {
    /// Whether the partition currently has a leader
    pub fn is_available(&self) -> bool {
        self.leader.is_some()
    }

    /// The partition key for this metadata entry
    pub fn topic_partition(&self) -> TopicPartition {
        TopicPartition::new(self.topic.clone(), self.partition)
    }
}

/// A single record read from a topic partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Partition the record belongs to
    pub partition: TopicPartition,

    /// Offset of this record within the partition
    pub offset: i64,

    /// Timestamp of the record (milliseconds since epoch)
    pub timestamp: i64,

    /// Optional key for the record
    pub key: Option<Bytes>,

    /// Value of the record
    pub value: Bytes,
}

impl Record {
    /// Create a new record
    pub fn new(
        partition: TopicPartition,
        offset: i64,
        timestamp: i64,
        key: Option<Bytes>,
        value: Bytes,
    ) -> Self {
        Self {
            partition,
            offset,
            timestamp,
            key,
            value,
        }
    }
}
