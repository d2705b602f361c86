//! Queues of injected faults
//!
//! Tests enqueue caller-supplied faults; the poll and commit paths dequeue one
//! per call. A fault added with a repeat count of N fires on the next N calls
//! and normal behaviour resumes afterwards.

use crate::error::InjectedFault;
use crate::metrics;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::warn;

/// Shared FIFO of pending faults for one kind of operation
#[derive(Debug, Clone)]
pub struct FaultQueue {
    kind: &'static str,
    pending: Arc<Mutex<VecDeque<InjectedFault>>>,
}

impl FaultQueue {
    /// Create an empty queue; `kind` labels logs and metrics
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            pending: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Enqueue `count` copies of `fault`
    pub fn push(&self, fault: InjectedFault, count: usize) {
        let mut pending = self.pending.lock();
        pending.extend(std::iter::repeat(fault).take(count));
    }

    /// Dequeue the next fault, if any
    pub fn pop(&self) -> Option<InjectedFault> {
        let fault = self.pending.lock().pop_front()?;
        warn!(kind = self.kind, code = ?fault.code, message = %fault.message, "Surfacing injected fault");
        metrics::record_fault(self.kind);
        Some(fault)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
