//! Per-partition read positions
//!
//! Tracks the next offset a consumer will read for each partition, resolves
//! starting positions for newly activated partitions, and validates seeks
//! against the current log length.

use crate::config::{ConsumerOptions, OffsetResetPolicy};
use crate::error::{MockError, Result};
use crate::storage::{LogStore, TopicPartition};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Next-read offsets keyed by partition
#[derive(Debug, Default)]
pub struct OffsetTracker {
    offsets: HashMap<TopicPartition, i64>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracked offset for a partition, `None` if it was never assigned or sought
    pub fn position(&self, partition: &TopicPartition) -> Option<i64> {
        self.offsets.get(partition).copied()
    }

    /// Move to `offset`, which must lie within `0..=log_length`.
    ///
    /// Partitions outside the current assignment are accepted.
    pub fn seek(&mut self, partition: &TopicPartition, offset: i64, log_length: i64) -> Result<()> {
        if offset < 0 || offset > log_length {
            return Err(MockError::InvalidOffset {
                partition: partition.clone(),
                offset,
                log_length,
            });
        }
        self.offsets.insert(partition.clone(), offset);
        Ok(())
    }

    /// Move to the first offset of a partition
    pub fn seek_to_beginning(&mut self, partition: &TopicPartition) {
        self.offsets.insert(partition.clone(), 0);
    }

    /// Move past the last record currently in the partition
    pub fn seek_to_end(&mut self, partition: &TopicPartition, log_length: i64) {
        self.offsets.insert(partition.clone(), log_length);
    }

    /// Advance a partition by one record
    pub fn advance(&mut self, partition: &TopicPartition) {
        if let Some(offset) = self.offsets.get_mut(partition) {
            *offset += 1;
        }
    }

    /// Give every partition in `assignment` a starting position, leaving
    /// already tracked partitions untouched.
    ///
    /// The group's committed offset wins; otherwise the reset policy decides.
    /// An unsupported policy fails the whole activation.
    pub fn fill_gaps(
        &mut self,
        assignment: &BTreeSet<TopicPartition>,
        store: &dyn LogStore,
        options: &ConsumerOptions,
    ) -> Result<()> {
        for partition in assignment {
            if self.offsets.contains_key(partition) {
                continue;
            }
            let offset = match store.committed_offset(&options.group_id, partition) {
                Some(committed) => committed,
                None => match options.offset_reset()? {
                    OffsetResetPolicy::Earliest => 0,
                    OffsetResetPolicy::Latest => store.log_length(partition),
                },
            };
            debug!(partition = %partition, offset, "Resolved starting offset");
            self.offsets.insert(partition.clone(), offset);
        }
        Ok(())
    }

    /// Offsets of the given partitions, skipping any without a position
    pub fn snapshot<'a>(
        &self,
        partitions: impl IntoIterator<Item = &'a TopicPartition>,
    ) -> HashMap<TopicPartition, i64> {
        partitions
            .into_iter()
            .filter_map(|p| self.position(p).map(|offset| (p.clone(), offset)))
            .collect()
    }

    /// Forget every tracked position
    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    /// Partitions with a tracked position
    pub fn partitions(&self) -> BTreeSet<TopicPartition> {
        self.offsets.keys().cloned().collect()
    }
}
