//! Rebalance listener and access guard tests
//!
//! Covers:
//! - Revoke/assign callback ordering and payloads
//! - Revoke callbacks seeing the outgoing state before it is cleared
//! - Explicit assignment never notifying a listener
//! - Reentrant and concurrent calls failing with ConcurrentAccess

mod common;

use common::*;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier, OnceLock, Weak};
use std::thread;
use std::time::Duration;
use streamline_mock::{MockConsumer, MockConsumerConfig, MockError, RebalanceListener, TopicPartition};

// =============================================================================
// Callback ordering
// =============================================================================

#[test]
fn test_resubscribe_revokes_previous_assignment_first() {
    let cluster = cluster_with(2, 0);
    cluster.create_topic("other", 1).unwrap();
    let listener = RecordingListener::new();
    let consumer = consumer(&cluster);

    consumer.subscribe([TOPIC], Some(listener.clone())).unwrap();
    join(&consumer);
    consumer.subscribe(["other"], Some(listener.clone())).unwrap();
    join(&consumer);

    let other: BTreeSet<_> = [TopicPartition::new("other", 0)].into();
    assert_eq!(
        listener.events(),
        vec![
            Rebalance::Assigned(partitions(2)),
            Rebalance::Revoked(partitions(2)),
            Rebalance::Assigned(other),
        ]
    );
}

#[test]
fn test_outgoing_listener_sees_revocation() {
    let cluster = cluster_with(1, 0);
    let first = RecordingListener::new();
    let second = RecordingListener::new();
    let consumer = consumer(&cluster);

    consumer.subscribe([TOPIC], Some(first.clone())).unwrap();
    join(&consumer);
    consumer.subscribe([TOPIC], Some(second.clone())).unwrap();

    assert_eq!(
        first.events(),
        vec![
            Rebalance::Assigned(partitions(1)),
            Rebalance::Revoked(partitions(1)),
        ]
    );
    assert!(second.events().is_empty());
}

#[test]
fn test_unsubscribe_revokes_with_listener() {
    let cluster = cluster_with(3, 0);
    let listener = RecordingListener::new();
    let consumer = consumer(&cluster);

    consumer.subscribe([TOPIC], Some(listener.clone())).unwrap();
    join(&consumer);
    consumer.unsubscribe().unwrap();

    assert_eq!(listener.events().last(), Some(&Rebalance::Revoked(partitions(3))));
    assert!(consumer.assignment().is_empty());
    assert!(consumer.subscription().is_empty());
    assert_eq!(consumer.position(&tp(0)).unwrap(), None);
}

#[test]
fn test_assign_drops_listener_without_callback() {
    let cluster = cluster_with(2, 0);
    let listener = RecordingListener::new();
    let consumer = consumer(&cluster);

    consumer.subscribe([TOPIC], Some(listener.clone())).unwrap();
    join(&consumer);
    consumer.assign([tp(1)]).unwrap();
    join(&consumer);
    consumer.unsubscribe().unwrap();

    assert_eq!(listener.events(), vec![Rebalance::Assigned(partitions(2))]);
}

#[test]
fn test_empty_assignment_does_not_notify() {
    let cluster = cluster_with(1, 0);
    let listener = RecordingListener::new();
    let consumer = consumer(&cluster);

    consumer.subscribe(["missing"], Some(listener.clone())).unwrap();
    join(&consumer);
    consumer.unsubscribe().unwrap();

    assert!(listener.events().is_empty());
}

// =============================================================================
// Revocation order
// =============================================================================

/// What the consumer looked like from inside a revoke callback
#[derive(Debug, Clone, PartialEq, Eq)]
struct RevokeView {
    revoked: BTreeSet<TopicPartition>,
    assignment: BTreeSet<TopicPartition>,
    paused: BTreeSet<TopicPartition>,
}

/// Listener that snapshots its consumer's state during revocation
#[derive(Default)]
struct StateCapturingListener {
    consumer: OnceLock<Weak<MockConsumer>>,
    views: Mutex<Vec<RevokeView>>,
}

impl StateCapturingListener {
    fn attach(consumer: &Arc<MockConsumer>) -> Arc<Self> {
        let listener = Arc::new(Self::default());
        listener.consumer.set(Arc::downgrade(consumer)).unwrap();
        listener
    }

    fn views(&self) -> Vec<RevokeView> {
        self.views.lock().clone()
    }
}

impl RebalanceListener for StateCapturingListener {
    fn on_partitions_revoked(&self, partitions: &BTreeSet<TopicPartition>) {
        let Some(consumer) = self.consumer.get().and_then(Weak::upgrade) else {
            return;
        };
        self.views.lock().push(RevokeView {
            revoked: partitions.clone(),
            assignment: consumer.assignment(),
            paused: consumer.paused(),
        });
    }

    fn on_partitions_assigned(&self, _partitions: &BTreeSet<TopicPartition>) {}
}

fn joined_with_pause(consumer: &Arc<MockConsumer>) -> Arc<StateCapturingListener> {
    let listener = StateCapturingListener::attach(consumer);
    consumer.subscribe([TOPIC], Some(listener.clone())).unwrap();
    join(consumer);
    consumer.pause([&tp(1)]).unwrap();
    listener
}

fn expected_view() -> RevokeView {
    RevokeView {
        revoked: partitions(2),
        assignment: partitions(2),
        paused: [tp(1)].into(),
    }
}

#[test]
fn test_unsubscribe_revokes_before_clearing_state() {
    let cluster = cluster_with(2, 0);
    let consumer = consumer(&cluster);
    let listener = joined_with_pause(&consumer);

    consumer.unsubscribe().unwrap();
    assert_eq!(listener.views(), vec![expected_view()]);
    assert!(consumer.assignment().is_empty());
    assert!(consumer.paused().is_empty());
}

#[test]
fn test_resubscribe_revokes_before_clearing_state() {
    let cluster = cluster_with(2, 0);
    cluster.create_topic("other", 1).unwrap();
    let consumer = consumer(&cluster);
    let listener = joined_with_pause(&consumer);

    consumer.subscribe(["other"], None).unwrap();
    assert_eq!(listener.views(), vec![expected_view()]);
    assert_eq!(consumer.assignment(), [TopicPartition::new("other", 0)].into());
    assert!(consumer.paused().is_empty());
}

#[test]
fn test_session_expiry_revokes_before_clearing_state() {
    let cluster = cluster_with(2, 0);
    let consumer = consumer_with(
        &cluster,
        MockConsumerConfig::manual_heartbeat().with_request_latency(Duration::ZERO),
        earliest().with_session_timeout(Duration::from_millis(30)),
    );
    let listener = joined_with_pause(&consumer);

    thread::sleep(Duration::from_millis(80));
    assert!(consumer.poll(Duration::from_millis(10)).unwrap().is_empty());
    assert_eq!(listener.views(), vec![expected_view()]);
    assert!(consumer.assignment().is_empty());
    assert!(consumer.paused().is_empty());
}

// =============================================================================
// Access guard
// =============================================================================

/// Listener that calls back into its own consumer from the assign callback
#[derive(Default)]
struct ReentrantListener {
    consumer: OnceLock<Weak<MockConsumer>>,
    observed: Mutex<Vec<String>>,
}

impl RebalanceListener for ReentrantListener {
    fn on_partitions_revoked(&self, _partitions: &BTreeSet<TopicPartition>) {}

    fn on_partitions_assigned(&self, partitions: &BTreeSet<TopicPartition>) {
        let Some(consumer) = self.consumer.get().and_then(Weak::upgrade) else {
            return;
        };
        let mut observed = self.observed.lock();
        match consumer.position(&tp(0)) {
            Err(MockError::ConcurrentAccess) => observed.push("position:concurrent".to_string()),
            other => observed.push(format!("position:{:?}", other)),
        }
        match consumer.commit_async(None) {
            Err(MockError::ConcurrentAccess) => observed.push("commit:concurrent".to_string()),
            other => observed.push(format!("commit:{:?}", other)),
        }
        // Unguarded inspection works inside callbacks
        observed.push(format!("assignment:{}", consumer.assignment().len()));
        assert_eq!(&consumer.assignment(), partitions);
    }
}

#[test]
fn test_reentrant_call_from_listener_fails() {
    let cluster = cluster_with(2, 1);
    let consumer = consumer(&cluster);
    let listener = Arc::new(ReentrantListener::default());
    listener.consumer.set(Arc::downgrade(&consumer)).unwrap();

    consumer.subscribe([TOPIC], Some(listener.clone())).unwrap();
    join(&consumer);

    assert_eq!(
        *listener.observed.lock(),
        vec!["position:concurrent", "commit:concurrent", "assignment:2"]
    );
    // The guard was released once the activating poll returned
    assert_eq!(consumer.position(&tp(0)).unwrap(), Some(0));
}

#[test]
fn test_concurrent_call_fails_fast() {
    let cluster = cluster_with(1, 1);
    let consumer = consumer_with(
        &cluster,
        MockConsumerConfig::default()
            .with_request_latency(Duration::from_millis(300))
            .with_commit_delay(Duration::ZERO),
        earliest(),
    );
    consumer.assign([tp(0)]).unwrap();
    join(&consumer);

    let barrier = Arc::new(Barrier::new(2));
    let poller = {
        let consumer = consumer.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            consumer.poll(Duration::from_millis(100))
        })
    };

    barrier.wait();
    thread::sleep(Duration::from_millis(100));
    let err = consumer.seek(&tp(0), 0).unwrap_err();
    assert!(matches!(err, MockError::ConcurrentAccess));

    let batch = poller.join().unwrap().unwrap();
    assert_eq!(batch.count(), 1);
    consumer.seek(&tp(0), 0).unwrap();
}
