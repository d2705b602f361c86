//! In-memory cluster backing the mock consumer
//!
//! Holds per-partition record logs, topic metadata with partition leaders, and
//! the committed offsets of every consumer group. All state sits behind
//! `parking_lot` locks so one cluster can be shared by many consumers and by
//! their background commit workers.

use crate::error::{MockError, Result};
use crate::storage::{LogStore, PartitionInfo, Record, TopicPartition};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Broker id reported as leader for every healthy partition
const DEFAULT_LEADER: i32 = 0;

#[derive(Debug, Default)]
struct PartitionState {
    leader: Option<i32>,
    log: Vec<Record>,
}

type Topics = BTreeMap<String, Vec<PartitionState>>;

fn slot<'a>(topics: &'a Topics, partition: &TopicPartition) -> Option<&'a PartitionState> {
    let index = usize::try_from(partition.partition).ok()?;
    topics.get(&partition.topic)?.get(index)
}

fn slot_mut<'a>(topics: &'a mut Topics, partition: &TopicPartition) -> Option<&'a mut PartitionState> {
    let index = usize::try_from(partition.partition).ok()?;
    topics.get_mut(&partition.topic)?.get_mut(index)
}

/// In-memory [`LogStore`]
#[derive(Debug, Default)]
pub struct MockCluster {
    /// Topic name -> partitions, indexed by partition id
    topics: RwLock<Topics>,
    /// (group_id, partition) -> committed offset
    group_offsets: RwLock<HashMap<(String, TopicPartition), i64>>,
}

impl MockCluster {
    /// Create an empty cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a topic with the specified number of partitions, all led by broker 0
    pub fn create_topic(&self, name: &str, partitions: i32) -> Result<()> {
        if name.is_empty() || partitions <= 0 {
            return Err(MockError::config(
                "topic",
                format!("invalid topic '{}' with {} partitions", name, partitions),
            ));
        }
        let mut topics = self.topics.write();
        topics.entry(name.to_string()).or_insert_with(|| {
            (0..partitions)
                .map(|_| PartitionState {
                    leader: Some(DEFAULT_LEADER),
                    log: Vec::new(),
                })
                .collect()
        });
        debug!(topic = %name, partitions, "Created topic");
        Ok(())
    }

    /// Append a record to a partition, returning its offset
    pub fn append(
        &self,
        partition: &TopicPartition,
        key: Option<Bytes>,
        value: impl Into<Bytes>,
    ) -> Result<i64> {
        let mut topics = self.topics.write();
        let state = slot_mut(&mut topics, partition)
            .ok_or_else(|| MockError::UnknownTopicOrPartition(partition.clone()))?;

        let offset = state.log.len() as i64;
        let timestamp = chrono::Utc::now().timestamp_millis();
        state.log.push(Record::new(
            partition.clone(),
            offset,
            timestamp,
            key,
            value.into(),
        ));
        Ok(offset)
    }

    /// Append `count` records with generated keys/values to a partition
    pub fn append_many(&self, partition: &TopicPartition, count: usize) -> Result<i64> {
        let mut last = -1;
        for _ in 0..count {
            let next = self.log_length(partition);
            last = self.append(
                partition,
                Some(Bytes::from(next.to_string())),
                format!("{}-{}", partition, next),
            )?;
        }
        Ok(last)
    }

    /// Set or clear the leader of a partition; a partition without a leader
    /// is left out of topic subscriptions
    pub fn set_leader(&self, partition: &TopicPartition, leader: Option<i32>) -> Result<()> {
        let mut topics = self.topics.write();
        let state = slot_mut(&mut topics, partition)
            .ok_or_else(|| MockError::UnknownTopicOrPartition(partition.clone()))?;
        state.leader = leader;
        debug!(partition = %partition, ?leader, "Updated partition leader");
        Ok(())
    }

    /// Snapshot of every record in a partition
    pub fn log(&self, partition: &TopicPartition) -> Vec<Record> {
        slot(&self.topics.read(), partition)
            .map(|state| state.log.clone())
            .unwrap_or_default()
    }
}

impl LogStore for MockCluster {
    fn log_length(&self, partition: &TopicPartition) -> i64 {
        slot(&self.topics.read(), partition)
            .map(|state| state.log.len() as i64)
            .unwrap_or(0)
    }

    fn read_record(&self, partition: &TopicPartition, offset: i64) -> Option<Record> {
        let index = usize::try_from(offset).ok()?;
        slot(&self.topics.read(), partition).and_then(|state| state.log.get(index).cloned())
    }

    fn committed_offset(&self, group_id: &str, partition: &TopicPartition) -> Option<i64> {
        self.group_offsets
            .read()
            .get(&(group_id.to_string(), partition.clone()))
            .copied()
    }

    fn commit_offset(&self, group_id: &str, partition: &TopicPartition, offset: i64) {
        self.group_offsets
            .write()
            .insert((group_id.to_string(), partition.clone()), offset);
        debug!(group_id = %group_id, partition = %partition, offset, "Committed offset");
    }

    fn topics(&self) -> BTreeSet<String> {
        self.topics.read().keys().cloned().collect()
    }

    fn partitions_for(&self, topic: &str) -> Option<Vec<PartitionInfo>> {
        self.topics.read().get(topic).map(|parts| {
            parts
                .iter()
                .enumerate()
                .map(|(i, state)| PartitionInfo {
                    topic: topic.to_string(),
                    partition: i as i32,
                    leader: state.leader,
                })
                .collect()
        })
    }
}
