//! Asynchronous offset commits
//!
//! Commits run on a background worker owned by the consumer: a single-threaded
//! tokio runtime created with the instance and shut down by `close`. Each
//! scheduled commit sleeps for a fixed delay, then either surfaces a queued
//! commit fault or writes every offset to the group's committed-offset table,
//! and finally invokes its callback exactly once. That holds across `close`:
//! a close that times out stops new commits but not those already scheduled.
//!
//! Only scheduling happens under the consumer's access guard. The task itself
//! runs unguarded and may race with later operations on the same consumer.

use crate::consumer::faults::FaultQueue;
use crate::error::{MockError, Result};
use crate::metrics;
use crate::storage::{LogStore, TopicPartition};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

/// Offsets to commit, keyed by partition
pub type OffsetMap = HashMap<TopicPartition, i64>;

/// Completion callback: the committed offsets and the outcome
pub type CommitCallback = Box<dyn FnOnce(&OffsetMap, Result<()>) + Send + 'static>;

/// Counts scheduled commits that have not finished yet
#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    drained: Condvar,
}

impl InFlight {
    fn track(self: &Arc<Self>) -> InFlightTicket {
        *self.count.lock() += 1;
        InFlightTicket {
            in_flight: Arc::clone(self),
        }
    }

    /// Wait until no commit is in flight; false if `timeout` elapsed first
    fn wait_drained(&self, timeout: Duration) -> bool {
        let mut count = self.count.lock();
        let result = self.drained.wait_while_for(&mut count, |count| *count > 0, timeout);
        !result.timed_out()
    }

    fn wait_all(&self) {
        let mut count = self.count.lock();
        self.drained.wait_while(&mut count, |count| *count > 0);
    }
}

/// Decrements the in-flight count when the task finishes, even if its
/// callback panics
struct InFlightTicket {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        let mut count = self.in_flight.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.in_flight.drained.notify_all();
        }
    }
}

/// One scheduled commit
struct CommitTask {
    store: Arc<dyn LogStore>,
    group_id: String,
    offsets: OffsetMap,
    callback: CommitCallback,
    faults: FaultQueue,
}

impl CommitTask {
    fn run(self) {
        let result = match self.faults.pop() {
            Some(fault) => Err(MockError::Injected(fault)),
            None => {
                for (partition, offset) in &self.offsets {
                    self.store.commit_offset(&self.group_id, partition, *offset);
                }
                Ok(())
            }
        };

        match &result {
            Ok(()) => {
                debug!(group_id = %self.group_id, partitions = self.offsets.len(), "Async commit completed");
                metrics::record_commit(&self.group_id, "success");
            }
            Err(e) => {
                warn!(group_id = %self.group_id, error = %e, "Async commit failed");
                metrics::record_commit(&self.group_id, "failure");
            }
        }
        (self.callback)(&self.offsets, result);
    }
}

/// Background commit scheduler of one consumer
pub struct CommitEngine {
    runtime: Mutex<Option<Runtime>>,
    delay: Duration,
    faults: FaultQueue,
    in_flight: Arc<InFlight>,
}

impl CommitEngine {
    /// Start the background worker
    pub fn new(delay: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("mock-consumer-commit")
            .enable_time()
            .build()?;
        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            delay,
            faults: FaultQueue::new("commit"),
            in_flight: Arc::new(InFlight::default()),
        })
    }

    /// Queue handle for injecting commit faults
    pub fn faults(&self) -> &FaultQueue {
        &self.faults
    }

    /// Schedule a commit to run after the fixed delay. A missing callback is
    /// replaced by a no-op.
    pub fn schedule(
        &self,
        store: Arc<dyn LogStore>,
        group_id: String,
        offsets: OffsetMap,
        callback: Option<CommitCallback>,
    ) -> Result<()> {
        let runtime = self.runtime.lock();
        let runtime = runtime.as_ref().ok_or(MockError::Closed)?;

        let callback: CommitCallback = match callback {
            Some(callback) => callback,
            None => Box::new(|_: &OffsetMap, _: Result<()>| {}),
        };
        let task = CommitTask {
            store,
            group_id,
            offsets,
            callback,
            faults: self.faults.clone(),
        };
        let ticket = self.in_flight.track();
        let delay = self.delay;
        runtime.spawn(async move {
            let _ticket = ticket;
            tokio::time::sleep(delay).await;
            task.run();
        });
        Ok(())
    }

    /// Number of scheduled commits that have not completed
    pub fn in_flight(&self) -> usize {
        *self.in_flight.count.lock()
    }

    /// Stop accepting commits and wait up to `timeout` for in-flight ones.
    ///
    /// Returns false if the wait timed out. Commits already scheduled still
    /// run after their delay; the worker is stopped once the last one is done.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let Some(runtime) = self.runtime.lock().take() else {
            return true;
        };
        let drained = self.in_flight.wait_drained(timeout);
        if !drained {
            warn!(pending = self.in_flight(), ?timeout, "Timed out waiting for in-flight commits");
        }
        self.retire(runtime);
        drained
    }

    /// Stop the worker now if nothing is in flight, otherwise hand it to a
    /// reaper thread that stops it after the last scheduled commit.
    fn retire(&self, runtime: Runtime) {
        if self.in_flight() == 0 {
            runtime.shutdown_background();
            return;
        }

        let in_flight = Arc::clone(&self.in_flight);
        let handoff = Arc::new(Mutex::new(Some(runtime)));
        let reaper_handoff = Arc::clone(&handoff);
        let spawned = std::thread::Builder::new()
            .name("mock-consumer-commit-reaper".to_string())
            .spawn(move || {
                in_flight.wait_all();
                if let Some(runtime) = reaper_handoff.lock().take() {
                    runtime.shutdown_background();
                }
                debug!("Commit worker stopped after draining");
            });

        if let Err(e) = spawned {
            warn!(error = %e, "Failed to spawn commit reaper, dropping pending commits");
            if let Some(runtime) = handoff.lock().take() {
                runtime.shutdown_background();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.runtime.lock().is_some()
    }
}

impl Drop for CommitEngine {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().take() {
            self.retire(runtime);
        }
    }
}

impl std::fmt::Debug for CommitEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitEngine")
            .field("delay", &self.delay)
            .field("running", &self.is_running())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
