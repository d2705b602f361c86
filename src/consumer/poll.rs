//! Bounded record batches with injected latency and faults
//!
//! A fetch first blocks for the configured request latency, then surfaces a
//! queued poll fault if there is one, and only then reads at most one record
//! per assigned partition.
//!
//! The batch cap is checked after a record has already been appended, against
//! the count *before* that record: a cap of N yields up to N + 1 records per
//! call. Callers depend on this exact behaviour.

use crate::consumer::faults::FaultQueue;
use crate::consumer::offsets::OffsetTracker;
use crate::error::{MockError, Result};
use crate::storage::{LogStore, Record, TopicPartition};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, trace};

/// Records returned by one poll, grouped by partition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerRecords {
    records: BTreeMap<TopicPartition, Vec<Record>>,
}

impl ConsumerRecords {
    /// A batch with no partitions at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of records across partitions
    pub fn count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Records for one partition; empty if the partition had nothing new
    pub fn records(&self, partition: &TopicPartition) -> &[Record] {
        self.records.get(partition).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Partitions present in the batch, including those with no records
    pub fn partitions(&self) -> impl Iterator<Item = &TopicPartition> {
        self.records.keys()
    }

    /// Every record, partition by partition
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values().flatten()
    }

    pub fn into_inner(self) -> BTreeMap<TopicPartition, Vec<Record>> {
        self.records
    }
}

impl IntoIterator for ConsumerRecords {
    type Item = Record;
    type IntoIter = std::iter::Flatten<std::collections::btree_map::IntoValues<TopicPartition, Vec<Record>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values().flatten()
    }
}

/// Produces one batch per poll
#[derive(Debug)]
pub struct PollEngine {
    request_latency: Duration,
    max_poll_records: usize,
    faults: FaultQueue,
}

impl PollEngine {
    pub fn new(request_latency: Duration, max_poll_records: usize) -> Self {
        Self {
            request_latency,
            max_poll_records,
            faults: FaultQueue::new("poll"),
        }
    }

    /// Queue handle for injecting poll faults
    pub fn faults(&self) -> &FaultQueue {
        &self.faults
    }

    /// Simulate the fetch round trip: block for the request latency, then
    /// fail with the next queued fault, if any. Not cancellable.
    pub fn round_trip(&self) -> Result<()> {
        if !self.request_latency.is_zero() {
            std::thread::sleep(self.request_latency);
        }
        match self.faults.pop() {
            Some(fault) => Err(MockError::Injected(fault)),
            None => Ok(()),
        }
    }

    /// Read the next record of every assigned partition that has one,
    /// advancing its position, until the batch cap trips.
    pub fn collect(
        &self,
        assignment: &BTreeSet<TopicPartition>,
        offsets: &mut OffsetTracker,
        store: &dyn LogStore,
    ) -> ConsumerRecords {
        let mut records: BTreeMap<TopicPartition, Vec<Record>> = assignment
            .iter()
            .map(|partition| (partition.clone(), Vec::new()))
            .collect();

        let mut count = 0usize;
        for partition in assignment {
            let Some(offset) = offsets.position(partition) else {
                trace!(partition = %partition, "No position for assigned partition");
                continue;
            };
            if offset >= store.log_length(partition) {
                continue;
            }
            let Some(record) = store.read_record(partition, offset) else {
                continue;
            };
            if let Some(batch) = records.get_mut(partition) {
                batch.push(record);
            }
            offsets.advance(partition);

            if count == self.max_poll_records {
                break;
            }
            count += 1;
        }

        let batch = ConsumerRecords { records };
        debug!(records = batch.count(), partitions = assignment.len(), "Collected poll batch");
        batch
    }
}
