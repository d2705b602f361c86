//! The simulated consumer client
//!
//! [`MockConsumer`] reproduces the client-side state machine of a group
//! consumer against an in-process [`LogStore`]:
//!
//! - **Access**: every operation takes a non-reentrant [`AccessGuard`]; a
//!   concurrent or reentrant call fails with `ConcurrentAccess` instead of
//!   blocking.
//! - **Assignment**: subscribe/assign changes are pending until the next poll,
//!   which activates them (assign callback, starting offsets) and returns an
//!   empty batch.
//! - **Session**: in manual-heartbeat mode an assignment lapses when polls stop
//!   for longer than the session timeout.
//! - **Polling**: bounded batches after a blocking request latency, with
//!   injectable faults.
//! - **Commits**: asynchronous only, on a background worker, with injectable
//!   faults delivered through the callback.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use streamline_mock::{ConsumerOptions, MockCluster, MockConsumer, MockConsumerConfig, TopicPartition};
//!
//! # fn main() -> streamline_mock::Result<()> {
//! let cluster = Arc::new(MockCluster::new());
//! cluster.create_topic("events", 2)?;
//! cluster.append(&TopicPartition::new("events", 0), None, "hello")?;
//!
//! let config = MockConsumerConfig::default().with_request_latency(Duration::ZERO);
//! let consumer = MockConsumer::new(cluster.clone(), config)?;
//! consumer.configure(ConsumerOptions::new("group").with_offset_reset("earliest"))?;
//!
//! consumer.subscribe(["events"], None)?;
//! assert!(consumer.poll(Duration::from_millis(100))?.is_empty()); // join
//! assert_eq!(consumer.poll(Duration::from_millis(100))?.count(), 1);
//! consumer.close()?;
//! # Ok(())
//! # }
//! ```

use crate::config::{ConsumerOptions, MockConsumerConfig};
use crate::consumer::commit::{CommitCallback, CommitEngine, OffsetMap};
use crate::consumer::guard::{AccessGuard, AccessPermit};
use crate::consumer::offsets::OffsetTracker;
use crate::consumer::poll::{ConsumerRecords, PollEngine};
use crate::consumer::session::SessionTimer;
use crate::consumer::subscription::{resolve_partitions, RebalanceListener, SubscriptionModel};
use crate::error::{InjectedFault, MockError, Result};
use crate::metrics;
use crate::storage::{LogStore, PartitionInfo, TopicPartition};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// State mutated by guarded operations
#[derive(Debug, Default)]
struct ConsumerState {
    options: ConsumerOptions,
    subscription: SubscriptionModel,
    offsets: OffsetTracker,
    session: SessionTimer,
}

/// In-process simulation of a partitioned-log consumer client
pub struct MockConsumer {
    store: Arc<dyn LogStore>,
    config: MockConsumerConfig,
    guard: AccessGuard,
    state: Mutex<ConsumerState>,
    poll_engine: PollEngine,
    commit_engine: CommitEngine,
    closed: AtomicBool,
}

impl MockConsumer {
    /// Create an unconfigured consumer reading from `store`. Starts the
    /// background commit worker.
    pub fn new(store: Arc<dyn LogStore>, config: MockConsumerConfig) -> Result<Self> {
        let commit_engine = CommitEngine::new(config.commit_delay)?;
        let poll_engine = PollEngine::new(config.request_latency, config.max_poll_records);
        Ok(Self {
            store,
            config,
            guard: AccessGuard::new(),
            state: Mutex::new(ConsumerState::default()),
            poll_engine,
            commit_engine,
            closed: AtomicBool::new(false),
        })
    }

    /// Apply application options. In manual-heartbeat mode this reads the
    /// session timeout; with automatic heartbeats the session never expires.
    pub fn configure(&self, options: ConsumerOptions) -> Result<()> {
        let _permit = self.enter()?;
        let session_timeout = if self.config.auto_heartbeat {
            None
        } else {
            Some(options.session_timeout()?)
        };

        let mut state = self.state.lock();
        state.session.configure(session_timeout);
        info!(group_id = %options.group_id, ?session_timeout, "Configured mock consumer");
        state.options = options;
        Ok(())
    }

    /// Acquire the access guard for a guarded operation on an open consumer
    fn enter(&self) -> Result<AccessPermit<'_>> {
        let permit = self.guard.acquire()?;
        if self.is_closed() {
            return Err(MockError::Closed);
        }
        Ok(permit)
    }

    // ── Unguarded inspection and test hooks ──

    /// Instance behaviour fixed at construction
    pub fn config(&self) -> &MockConsumerConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Group id of the current options
    pub fn group_id(&self) -> String {
        self.state.lock().options.group_id.clone()
    }

    /// Snapshot of the current assignment
    pub fn assignment(&self) -> BTreeSet<TopicPartition> {
        self.state.lock().subscription.assignment().clone()
    }

    /// Snapshot of the subscribed topics
    pub fn subscription(&self) -> BTreeSet<String> {
        self.state.lock().subscription.topics()
    }

    /// Snapshot of the paused partitions
    pub fn paused(&self) -> BTreeSet<TopicPartition> {
        self.state.lock().subscription.paused().clone()
    }

    /// Make the next `count` polls fail with `fault`
    pub fn add_poll_fault(&self, fault: InjectedFault, count: usize) {
        self.poll_engine.faults().push(fault, count);
    }

    /// Make the next `count` async commits fail with `fault`
    pub fn add_commit_fault(&self, fault: InjectedFault, count: usize) {
        self.commit_engine.faults().push(fault, count);
    }

    /// Number of scheduled commits that have not completed yet
    pub fn commits_in_flight(&self) -> usize {
        self.commit_engine.in_flight()
    }

    /// No-op; the mock never blocks in a way a wakeup could interrupt
    pub fn wakeup(&self) {}

    // ── Subscription ──

    /// Subscribe to `topics`, replacing any previous subscription or
    /// assignment. The outgoing listener sees the revocation first.
    pub fn subscribe<I, S>(&self, topics: I, listener: Option<Arc<dyn RebalanceListener>>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _permit = self.enter()?;
        let topics = topics.into_iter().map(Into::into).collect();
        self.subscribe_topics(topics, listener);
        Ok(())
    }

    /// Subscribe to every known topic whose whole name matches `pattern`
    pub fn subscribe_pattern(
        &self,
        pattern: &Regex,
        listener: Option<Arc<dyn RebalanceListener>>,
    ) -> Result<()> {
        let _permit = self.enter()?;
        let topics = self.store.topics_matching(pattern);
        debug!(pattern = %pattern, matched = topics.len(), "Resolved subscription pattern");
        self.subscribe_topics(topics, listener);
        Ok(())
    }

    fn subscribe_topics(
        &self,
        topics: BTreeSet<String>,
        listener: Option<Arc<dyn RebalanceListener>>,
    ) {
        self.revoke(true, "subscribe");
        let partitions = resolve_partitions(self.store.as_ref(), &topics);

        let mut state = self.state.lock();
        info!(
            group_id = %state.options.group_id,
            topics = ?topics,
            partitions = partitions.len(),
            "Subscribed"
        );
        state.subscription.subscribe(topics, partitions, listener);
        state.session.touch(Instant::now());
    }

    /// Assign exactly `partitions`, dropping any topic subscription and its
    /// listener. Explicit assignment never notifies a listener.
    pub fn assign<I>(&self, partitions: I) -> Result<()>
    where
        I: IntoIterator<Item = TopicPartition>,
    {
        let _permit = self.enter()?;
        let partitions: BTreeSet<TopicPartition> = partitions.into_iter().collect();
        self.revoke(false, "assign");

        let mut state = self.state.lock();
        info!(group_id = %state.options.group_id, partitions = partitions.len(), "Assigned partitions");
        state.subscription.assign(partitions);
        state.session.touch(Instant::now());
        Ok(())
    }

    /// Revoke the assignment (notifying the listener) and drop the subscription
    pub fn unsubscribe(&self) -> Result<()> {
        let _permit = self.enter()?;
        self.revoke(true, "unsubscribe");
        self.state.lock().subscription.unsubscribe();
        Ok(())
    }

    /// Revoke the current assignment. The listener, when asked for and
    /// present, runs with the state lock released and before anything is
    /// cleared.
    fn revoke(&self, notify: bool, reason: &str) {
        let notice = if notify {
            self.state.lock().subscription.revocation()
        } else {
            None
        };
        if let Some(notice) = notice {
            notice.revoked();
        }

        let mut state = self.state.lock();
        if !state.subscription.assignment().is_empty() {
            debug!(group_id = %state.options.group_id, reason, "Revoking assignment");
            metrics::record_rebalance(&state.options.group_id, reason);
        }
        state.subscription.clear_assignment();
        state.offsets.clear();
    }

    /// Complete a pending assignment: assign callback, then starting offsets
    /// for partitions that have none.
    fn activate(&self) -> Result<()> {
        let notice = self.state.lock().subscription.activation();
        if let Some(notice) = notice {
            notice.assigned();
        }

        let mut state = self.state.lock();
        let ConsumerState {
            options,
            subscription,
            offsets,
            session,
        } = &mut *state;
        offsets.fill_gaps(subscription.assignment(), self.store.as_ref(), options)?;
        subscription.mark_active();
        session.touch(Instant::now());

        info!(
            group_id = %options.group_id,
            partitions = subscription.assignment().len(),
            "Assignment activated"
        );
        metrics::record_rebalance(&options.group_id, "assign");
        Ok(())
    }

    // ── Polling ──

    /// Fetch the next batch.
    ///
    /// A pending assignment is activated first and the call returns an empty
    /// batch. Otherwise an expired session revokes the assignment, the call
    /// blocks for the request latency, surfaces a queued poll fault if any,
    /// and reads at most one record per assigned partition. `_timeout` is a
    /// hint only; the mock never waits for records.
    pub fn poll(&self, _timeout: Duration) -> Result<ConsumerRecords> {
        let _permit = self.enter()?;

        if self.state.lock().subscription.is_pending() {
            self.activate()?;
            return Ok(ConsumerRecords::empty());
        }

        let expired = self.state.lock().session.is_expired(Instant::now());
        if expired {
            warn!(group_id = %self.group_id(), "Session expired, revoking assignment");
            self.revoke(true, "session_expired");
        }

        self.poll_engine.round_trip()?;

        let mut state = self.state.lock();
        let ConsumerState {
            options,
            subscription,
            offsets,
            session,
        } = &mut *state;
        let records = self
            .poll_engine
            .collect(subscription.assignment(), offsets, self.store.as_ref());
        session.touch(Instant::now());
        metrics::record_poll(&options.group_id, records.count());
        Ok(records)
    }

    // ── Commits ──

    /// Commit the current positions of all assigned partitions in the
    /// background. Faults reach the caller only through `callback`.
    pub fn commit_async(&self, callback: Option<CommitCallback>) -> Result<()> {
        let _permit = self.enter()?;
        let (group_id, offsets) = {
            let state = self.state.lock();
            let offsets = state.offsets.snapshot(state.subscription.assignment());
            (state.options.group_id.clone(), offsets)
        };
        self.schedule_commit(group_id, offsets, callback)
    }

    /// Commit explicit offsets in the background
    pub fn commit_offsets_async(
        &self,
        offsets: OffsetMap,
        callback: Option<CommitCallback>,
    ) -> Result<()> {
        let _permit = self.enter()?;
        let group_id = self.group_id();
        self.schedule_commit(group_id, offsets, callback)
    }

    fn schedule_commit(
        &self,
        group_id: String,
        offsets: OffsetMap,
        callback: Option<CommitCallback>,
    ) -> Result<()> {
        debug!(group_id = %group_id, partitions = offsets.len(), "Scheduling async commit");
        self.commit_engine
            .schedule(Arc::clone(&self.store), group_id, offsets, callback)
    }

    /// Synchronous commit is not simulated
    pub fn commit_sync(&self) -> Result<()> {
        Err(MockError::Unsupported("commitSync"))
    }

    /// Synchronous commit is not simulated
    pub fn commit_offsets_sync(&self, _offsets: &OffsetMap) -> Result<()> {
        Err(MockError::Unsupported("commitSync"))
    }

    // ── Positions ──

    /// Move a partition's position; `offset` must be within `0..=log length`.
    /// The partition does not have to be assigned.
    pub fn seek(&self, partition: &TopicPartition, offset: i64) -> Result<()> {
        let _permit = self.enter()?;
        let log_length = self.store.log_length(partition);
        self.state.lock().offsets.seek(partition, offset, log_length)
    }

    pub fn seek_to_beginning<'a>(
        &self,
        partitions: impl IntoIterator<Item = &'a TopicPartition>,
    ) -> Result<()> {
        let _permit = self.enter()?;
        let mut state = self.state.lock();
        for partition in partitions {
            state.offsets.seek_to_beginning(partition);
        }
        Ok(())
    }

    pub fn seek_to_end<'a>(
        &self,
        partitions: impl IntoIterator<Item = &'a TopicPartition>,
    ) -> Result<()> {
        let _permit = self.enter()?;
        let mut state = self.state.lock();
        for partition in partitions {
            let log_length = self.store.log_length(partition);
            state.offsets.seek_to_end(partition, log_length);
        }
        Ok(())
    }

    /// Next offset to be read, `None` until the partition is activated or sought
    pub fn position(&self, partition: &TopicPartition) -> Result<Option<i64>> {
        let _permit = self.enter()?;
        Ok(self.state.lock().offsets.position(partition))
    }

    /// The group's committed offset for a partition
    pub fn committed_offset_for(&self, partition: &TopicPartition) -> Result<Option<i64>> {
        let _permit = self.enter()?;
        let group_id = self.group_id();
        Ok(self.store.committed_offset(&group_id, partition))
    }

    // ── Metadata ──

    pub fn partitions_for(&self, topic: &str) -> Result<Option<Vec<PartitionInfo>>> {
        let _permit = self.enter()?;
        Ok(self.store.partitions_for(topic))
    }

    pub fn list_topics(&self) -> Result<HashMap<String, Vec<PartitionInfo>>> {
        let _permit = self.enter()?;
        Ok(self
            .store
            .topics()
            .into_iter()
            .map(|topic| {
                let partitions = self.store.partitions_for(&topic).unwrap_or_default();
                (topic, partitions)
            })
            .collect())
    }

    // ── Flow control ──

    /// Pause assigned partitions. Polls keep reading paused partitions; the
    /// set is tracked for callers that inspect it.
    pub fn pause<'a>(&self, partitions: impl IntoIterator<Item = &'a TopicPartition>) -> Result<()> {
        let _permit = self.enter()?;
        self.state.lock().subscription.pause(partitions);
        Ok(())
    }

    pub fn resume<'a>(&self, partitions: impl IntoIterator<Item = &'a TopicPartition>) -> Result<()> {
        let _permit = self.enter()?;
        self.state.lock().subscription.resume(partitions);
        Ok(())
    }

    // ── Lifecycle ──

    /// Close using the configured close timeout
    pub fn close(&self) -> Result<()> {
        let timeout = self.state.lock().options.close_timeout;
        self.close_with_timeout(timeout)
    }

    /// Stop accepting commits, wait up to `timeout` for in-flight ones, and
    /// mark the consumer closed. A timed-out wait is logged, not returned;
    /// commits scheduled before the close still complete after their delay.
    /// Closing twice is a no-op; only guard contention is reported.
    pub fn close_with_timeout(&self, timeout: Duration) -> Result<()> {
        let _permit = self.guard.acquire()?;
        if self.is_closed() {
            return Ok(());
        }
        if !self.commit_engine.shutdown(timeout) {
            debug!(?timeout, "Closed with commits still in flight");
        }
        self.closed.store(true, Ordering::Release);
        info!(group_id = %self.group_id(), "Closed mock consumer");
        Ok(())
    }
}

impl fmt::Debug for MockConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockConsumer")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .field("commit_engine", &self.commit_engine)
            .finish_non_exhaustive()
    }
}
