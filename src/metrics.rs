//! Metrics for the mock consumer
//!
//! Counters are emitted through the `metrics` facade so a test harness can
//! install any recorder and assert on consumer activity. When the `metrics`
//! feature is disabled, all functions become no-ops with the same signatures.

#[cfg(feature = "metrics")]
use ::metrics::counter;

/// Record a completed poll and the number of records it returned
#[cfg(feature = "metrics")]
pub fn record_poll(group_id: &str, records: usize) {
    counter!("streamline_mock_polls_total", "group" => group_id.to_string()).increment(1);
    counter!(
        "streamline_mock_records_polled_total",
        "group" => group_id.to_string()
    )
    .increment(records as u64);
}

/// Record the outcome of an async commit ("success" or "failure")
#[cfg(feature = "metrics")]
pub fn record_commit(group_id: &str, outcome: &str) {
    counter!(
        "streamline_mock_commits_total",
        "group" => group_id.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record an injected fault being surfaced ("poll" or "commit")
#[cfg(feature = "metrics")]
pub fn record_fault(kind: &str) {
    counter!("streamline_mock_faults_total", "kind" => kind.to_string()).increment(1);
}

/// Record an assignment change ("assign", "revoke" or "session_expired")
#[cfg(feature = "metrics")]
pub fn record_rebalance(group_id: &str, reason: &str) {
    counter!(
        "streamline_mock_rebalances_total",
        "group" => group_id.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_poll(_group_id: &str, _records: usize) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_commit(_group_id: &str, _outcome: &str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_fault(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_rebalance(_group_id: &str, _reason: &str) {}
