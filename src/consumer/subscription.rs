//! Subscription and assignment state
//!
//! A consumer is either unassigned, subscribed to a set of topics (with an
//! optional rebalance listener), or explicitly assigned a set of partitions.
//! Whatever the mode, it resolves to one concrete partition set, the
//! assignment, which polls read from.
//!
//! Assignment changes are two-phase. A new assignment is *pending* until the
//! next poll activates it, mirroring a group join. Revocation and activation
//! hand back a [`RebalanceNotice`] so the caller can invoke the listener
//! without holding any consumer lock, then apply the state change.

use crate::storage::{LogStore, TopicPartition};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Callbacks invoked when partitions move to or away from a consumer
pub trait RebalanceListener: Send + Sync {
    /// Called with the full assignment before it is cleared
    fn on_partitions_revoked(&self, partitions: &BTreeSet<TopicPartition>);

    /// Called with the full assignment when it is activated by a poll
    fn on_partitions_assigned(&self, partitions: &BTreeSet<TopicPartition>);
}

/// How the current assignment was obtained
#[derive(Clone, Default)]
pub enum SubscriptionMode {
    /// Nothing subscribed or assigned
    #[default]
    Unassigned,
    /// Topic subscription; partitions come from topic metadata
    Subscribed {
        topics: BTreeSet<String>,
        listener: Option<Arc<dyn RebalanceListener>>,
    },
    /// Explicit partition assignment; never notifies a listener
    Assigned,
}

impl fmt::Debug for SubscriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionMode::Unassigned => write!(f, "Unassigned"),
            SubscriptionMode::Subscribed { topics, listener } => f
                .debug_struct("Subscribed")
                .field("topics", topics)
                .field("listener", &listener.is_some())
                .finish(),
            SubscriptionMode::Assigned => write!(f, "Assigned"),
        }
    }
}

/// Listener call the caller must make before applying a state change
pub struct RebalanceNotice {
    pub listener: Arc<dyn RebalanceListener>,
    pub partitions: BTreeSet<TopicPartition>,
}

impl RebalanceNotice {
    /// Invoke the revoke callback
    pub fn revoked(&self) {
        self.listener.on_partitions_revoked(&self.partitions);
    }

    /// Invoke the assign callback
    pub fn assigned(&self) {
        self.listener.on_partitions_assigned(&self.partitions);
    }
}

/// Subscription state of one consumer
#[derive(Debug, Default)]
pub struct SubscriptionModel {
    mode: SubscriptionMode,
    assignment: BTreeSet<TopicPartition>,
    paused: BTreeSet<TopicPartition>,
    pending: bool,
}

impl SubscriptionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the subscription with `topics`, assigning `partitions`.
    ///
    /// The previous assignment must already have been revoked.
    pub fn subscribe(
        &mut self,
        topics: BTreeSet<String>,
        partitions: BTreeSet<TopicPartition>,
        listener: Option<Arc<dyn RebalanceListener>>,
    ) {
        self.mode = SubscriptionMode::Subscribed { topics, listener };
        self.assignment = partitions;
        self.pending = true;
    }

    /// Switch to an explicit assignment of exactly `partitions`
    pub fn assign(&mut self, partitions: BTreeSet<TopicPartition>) {
        self.mode = SubscriptionMode::Assigned;
        self.assignment = partitions;
        self.pending = true;
    }

    /// Drop the subscription entirely
    pub fn unsubscribe(&mut self) {
        self.clear_assignment();
        self.mode = SubscriptionMode::Unassigned;
        self.pending = false;
    }

    /// Clear the assignment and paused partitions, keeping the mode
    pub fn clear_assignment(&mut self) {
        self.assignment.clear();
        self.paused.clear();
    }

    /// Notice for the revoke callback, if there is anything to revoke and a
    /// listener to tell
    pub fn revocation(&self) -> Option<RebalanceNotice> {
        self.notice()
    }

    /// Notice for the assign callback of a pending activation
    pub fn activation(&self) -> Option<RebalanceNotice> {
        self.notice()
    }

    fn notice(&self) -> Option<RebalanceNotice> {
        if self.assignment.is_empty() {
            return None;
        }
        self.listener().map(|listener| RebalanceNotice {
            listener,
            partitions: self.assignment.clone(),
        })
    }

    /// The rebalance listener, present only for topic subscriptions
    pub fn listener(&self) -> Option<Arc<dyn RebalanceListener>> {
        match &self.mode {
            SubscriptionMode::Subscribed { listener, .. } => listener.clone(),
            _ => None,
        }
    }

    /// Whether an activation is waiting for the next poll
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Mark the pending assignment as activated
    pub fn mark_active(&mut self) {
        self.pending = false;
    }

    pub fn mode(&self) -> &SubscriptionMode {
        &self.mode
    }

    pub fn assignment(&self) -> &BTreeSet<TopicPartition> {
        &self.assignment
    }

    /// Subscribed topic names, empty unless subscribed by topic or pattern
    pub fn topics(&self) -> BTreeSet<String> {
        match &self.mode {
            SubscriptionMode::Subscribed { topics, .. } => topics.clone(),
            _ => BTreeSet::new(),
        }
    }

    pub fn paused(&self) -> &BTreeSet<TopicPartition> {
        &self.paused
    }

    /// Pause partitions; partitions outside the assignment are ignored
    pub fn pause<'a>(&mut self, partitions: impl IntoIterator<Item = &'a TopicPartition>) {
        for partition in partitions {
            if self.assignment.contains(partition) {
                self.paused.insert(partition.clone());
            }
        }
    }

    pub fn resume<'a>(&mut self, partitions: impl IntoIterator<Item = &'a TopicPartition>) {
        for partition in partitions {
            self.paused.remove(partition);
        }
    }
}

/// Resolve topics to their currently available partitions
pub fn resolve_partitions(store: &dyn LogStore, topics: &BTreeSet<String>) -> BTreeSet<TopicPartition> {
    topics
        .iter()
        .flat_map(|topic| store.available_partitions_for(topic))
        .map(|info| info.topic_partition())
        .collect()
}
