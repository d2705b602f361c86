//! Log store abstraction consumed by the mock consumer
//!
//! The consumer never owns records or committed offsets. It reads and writes
//! them through the [`LogStore`] trait, which stands in for the broker: an
//! append-only log per partition, topic metadata, and a committed-offset table
//! keyed by consumer group.
//!
//! [`MockCluster`] is the in-memory implementation used by tests.

pub mod cluster;
pub mod record;

pub use cluster::MockCluster;
pub use record::{PartitionInfo, Record, TopicPartition};

use regex::Regex;
use std::collections::BTreeSet;

/// Operations the consumer needs from the broker side.
///
/// Implementations provide their own consistency guarantees; callers never
/// assume atomicity across multiple calls.
pub trait LogStore: Send + Sync {
    /// Current number of records in the partition (the next offset to be written)
    fn log_length(&self, partition: &TopicPartition) -> i64;

    /// Read the record at `offset`, valid only when `offset < log_length`
    fn read_record(&self, partition: &TopicPartition, offset: i64) -> Option<Record>;

    /// Committed offset for a group, if one has been stored
    fn committed_offset(&self, group_id: &str, partition: &TopicPartition) -> Option<i64>;

    /// Store a committed offset for a group
    fn commit_offset(&self, group_id: &str, partition: &TopicPartition, offset: i64);

    /// All known topic names
    fn topics(&self) -> BTreeSet<String>;

    /// Partition metadata for a topic, `None` for unknown topics
    fn partitions_for(&self, topic: &str) -> Option<Vec<PartitionInfo>>;

    /// Topic names matched in full by `pattern`
    fn topics_matching(&self, pattern: &Regex) -> BTreeSet<String> {
        self.topics()
            .into_iter()
            .filter(|topic| matches_fully(pattern, topic))
            .collect()
    }

    /// Partitions of a topic that currently have a leader
    fn available_partitions_for(&self, topic: &str) -> Vec<PartitionInfo> {
        self.partitions_for(topic)
            .unwrap_or_default()
            .into_iter()
            .filter(PartitionInfo::is_available)
            .collect()
    }
}

/// Whole-string match, the semantics pattern subscriptions use
fn matches_fully(pattern: &Regex, topic: &str) -> bool {
    pattern
        .find(topic)
        .is_some_and(|m| m.start() == 0 && m.end() == topic.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_must_match_whole_topic() {
        let cluster = MockCluster::new();
        cluster.create_topic("orders", 1).unwrap();
        cluster.create_topic("orders-dlq", 1).unwrap();
        cluster.create_topic("payments", 1).unwrap();

        let pattern = Regex::new("orders").unwrap();
        let matched = cluster.topics_matching(&pattern);
        assert_eq!(matched.len(), 1);
        assert!(matched.contains("orders"));

        let pattern = Regex::new("orders.*").unwrap();
        assert_eq!(cluster.topics_matching(&pattern).len(), 2);
    }
}
