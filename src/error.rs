//! Error types for the mock consumer
//!
//! Every failure the simulated client can surface is a [`MockError`]. Each
//! variant maps onto the Kafka protocol error code a real client would report,
//! so code under test can branch on codes exactly as it would in production.

use crate::storage::TopicPartition;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for mock consumer operations
pub type Result<T> = std::result::Result<T, MockError>;

/// Kafka protocol error codes surfaced by the mock
/// See: <https://kafka.apache.org/protocol.html#protocol_error_codes>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum KafkaErrorCode {
    /// No error
    None = 0,
    /// Unknown server error
    UnknownServerError = -1,
    /// The requested offset is outside the range of offsets
    OffsetOutOfRange = 1,
    /// Message failed its CRC check or is otherwise corrupt
    CorruptMessage = 2,
    /// Unknown topic or partition
    UnknownTopicOrPartition = 3,
    /// Leader not available
    LeaderNotAvailable = 5,
    /// Not leader for partition
    NotLeaderOrFollower = 6,
    /// Request timed out
    RequestTimedOut = 7,
    /// Broker not available
    BrokerNotAvailable = 8,
    /// Network error talking to the broker
    NetworkException = 13,
    /// Coordinator load in progress
    CoordinatorLoadInProgress = 14,
    /// Coordinator not available
    CoordinatorNotAvailable = 15,
    /// Not coordinator for group
    NotCoordinator = 16,
    /// Illegal generation
    IllegalGeneration = 22,
    /// Unknown member
    UnknownMemberId = 25,
    /// Rebalance in progress
    RebalanceInProgress = 27,
    /// Group authorization failed
    GroupAuthorizationFailed = 30,
    /// Unsupported version
    UnsupportedVersion = 35,
    /// Invalid config
    InvalidConfig = 40,
    /// Invalid request
    InvalidRequest = 42,
    /// Offset not available
    OffsetNotAvailable = 78,
}

impl KafkaErrorCode {
    /// Check if this error code indicates a retriable error
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            KafkaErrorCode::CorruptMessage
                | KafkaErrorCode::UnknownTopicOrPartition
                | KafkaErrorCode::LeaderNotAvailable
                | KafkaErrorCode::NotLeaderOrFollower
                | KafkaErrorCode::RequestTimedOut
                | KafkaErrorCode::NetworkException
                | KafkaErrorCode::CoordinatorLoadInProgress
                | KafkaErrorCode::CoordinatorNotAvailable
                | KafkaErrorCode::NotCoordinator
                | KafkaErrorCode::OffsetNotAvailable
        )
    }

    /// Convert to the i16 error code used in Kafka protocol
    pub fn as_i16(&self) -> i16 {
        *self as i16
    }
}

/// A caller-supplied failure queued through a fault injector.
///
/// Faults are cloned once per requested repetition, so every enqueued copy is
/// surfaced exactly once.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {code:?})")]
pub struct InjectedFault {
    /// Protocol code the fault pretends to carry
    pub code: KafkaErrorCode,
    /// Human readable description
    pub message: String,
}

impl InjectedFault {
    /// Create a new injected fault
    pub fn new(code: KafkaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Whether a real client would retry after this fault
    pub fn is_retriable(&self) -> bool {
        self.code.is_retriable()
    }
}

/// Main error type for the mock consumer
#[derive(Error, Debug)]
pub enum MockError {
    #[error("Consumer is not thread-safe: concurrent or reentrant access rejected")]
    ConcurrentAccess,

    #[error("Invalid offset: {partition}@{offset} (log length {log_length})")]
    InvalidOffset {
        partition: TopicPartition,
        offset: i64,
        log_length: i64,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Injected fault: {0}")]
    Injected(#[from] InjectedFault),

    #[error("Unknown topic or partition: {0}")]
    UnknownTopicOrPartition(TopicPartition),

    #[error("Consumer has been closed")]
    Closed,

    #[error("Consumer pool exhausted: no free consumers")]
    PoolExhausted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MockError {
    /// Create a configuration error for a specific setting
    pub fn config(setting: &str, reason: impl Into<String>) -> Self {
        MockError::Configuration(format!("{}: {}", setting, reason.into()))
    }

    /// Map this error to the Kafka protocol error code a real client would see
    pub fn kafka_error_code(&self) -> KafkaErrorCode {
        match self {
            MockError::ConcurrentAccess => KafkaErrorCode::InvalidRequest,
            MockError::InvalidOffset { .. } => KafkaErrorCode::OffsetOutOfRange,
            MockError::Configuration(_) => KafkaErrorCode::InvalidConfig,
            MockError::Unsupported(_) => KafkaErrorCode::UnsupportedVersion,
            MockError::Injected(fault) => fault.code,
            MockError::UnknownTopicOrPartition(_) => KafkaErrorCode::UnknownTopicOrPartition,
            MockError::Closed => KafkaErrorCode::NetworkException,
            MockError::PoolExhausted | MockError::Io(_) => KafkaErrorCode::UnknownServerError,
        }
    }

    /// Check if this error is retriable
    pub fn is_retriable(&self) -> bool {
        self.kafka_error_code().is_retriable()
    }
}

impl From<&MockError> for i16 {
    fn from(err: &MockError) -> i16 {
        err.kafka_error_code().as_i16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = MockError::InvalidOffset {
            partition: TopicPartition::new("t", 0),
            offset: -1,
            log_length: 0,
        };
        assert_eq!(err.kafka_error_code(), KafkaErrorCode::OffsetOutOfRange);
        assert_eq!(i16::from(&err), 1);

        let err = MockError::Unsupported("commitSync");
        assert_eq!(err.kafka_error_code(), KafkaErrorCode::UnsupportedVersion);
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_injected_fault_keeps_its_code() {
        let fault = InjectedFault::new(KafkaErrorCode::NotCoordinator, "coordinator moved");
        let err = MockError::from(fault.clone());
        assert_eq!(err.kafka_error_code(), KafkaErrorCode::NotCoordinator);
        assert!(err.is_retriable());
        assert!(err.to_string().contains("coordinator moved"));
        assert!(fault.is_retriable());
    }

    #[test]
    fn test_config_error_message() {
        let err = MockError::config("auto.offset.reset", "offset not available");
        assert_eq!(
            err.to_string(),
            "Configuration error: auto.offset.reset: offset not available"
        );
    }
}
