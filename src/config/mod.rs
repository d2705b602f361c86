//! Configuration for the mock consumer
//!
//! Two layers of configuration exist:
//! - [`ConsumerOptions`] - what an application hands to a consumer factory
//!   (group id, timeouts, arbitrary client properties). Read-only to the
//!   consumer and applied through `configure`.
//! - [`MockConsumerConfig`] - how the simulated instance itself behaves
//!   (heartbeat mode, injected latencies, batch cap). Fixed at construction.

mod defaults;

pub use defaults::*;

use crate::error::{MockError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Where to start reading a partition that has no committed offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetResetPolicy {
    /// Start from the first record in the log
    Earliest,
    /// Start after the last record currently in the log
    Latest,
}

impl FromStr for OffsetResetPolicy {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "earliest" => Ok(OffsetResetPolicy::Earliest),
            "latest" => Ok(OffsetResetPolicy::Latest),
            other => Err(MockError::config(
                AUTO_OFFSET_RESET_CONFIG,
                format!("offset not available (unsupported policy '{}')", other),
            )),
        }
    }
}

impl fmt::Display for OffsetResetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetResetPolicy::Earliest => write!(f, "earliest"),
            OffsetResetPolicy::Latest => write!(f, "latest"),
        }
    }
}

/// Options an application passes when creating a consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerOptions {
    /// Consumer group id used for committed offsets
    pub group_id: String,

    /// Maximum time `close` waits for in-flight commits
    #[serde(with = "duration_ms")]
    pub close_timeout: Duration,

    /// Client properties, e.g. `auto.offset.reset` or `session.timeout.ms`
    pub properties: HashMap<String, String>,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID.to_string(),
            close_timeout: Duration::from_millis(DEFAULT_CLOSE_TIMEOUT_MS),
            properties: HashMap::new(),
        }
    }
}

impl ConsumerOptions {
    /// Create options for a consumer group
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            ..Default::default()
        }
    }

    /// Parse options from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MockError::config("options", e.to_string()))
    }

    /// Set the close timeout
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Set an arbitrary client property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set the offset reset policy property
    pub fn with_offset_reset(self, policy: impl Into<String>) -> Self {
        self.with_property(AUTO_OFFSET_RESET_CONFIG, policy)
    }

    /// Set the session timeout property
    pub fn with_session_timeout(self, timeout: Duration) -> Self {
        self.with_property(SESSION_TIMEOUT_MS_CONFIG, timeout.as_millis().to_string())
    }

    /// Session timeout from `session.timeout.ms`, falling back to the default
    /// when the property is absent
    pub fn session_timeout(&self) -> Result<Duration> {
        match self.properties.get(SESSION_TIMEOUT_MS_CONFIG) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| MockError::config(SESSION_TIMEOUT_MS_CONFIG, e.to_string())),
            None => Ok(Duration::from_millis(DEFAULT_SESSION_TIMEOUT_MS)),
        }
    }

    /// Offset reset policy from `auto.offset.reset` (default `latest`).
    ///
    /// Unsupported values are only reported here, when an assignment actually
    /// needs a starting offset.
    pub fn offset_reset(&self) -> Result<OffsetResetPolicy> {
        self.properties
            .get(AUTO_OFFSET_RESET_CONFIG)
            .map(String::as_str)
            .unwrap_or(DEFAULT_AUTO_OFFSET_RESET)
            .parse()
    }
}

/// Behaviour of a simulated consumer instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConsumerConfig {
    /// When true heartbeats are automatic and assignments never expire
    pub auto_heartbeat: bool,

    /// Blocking delay applied to every non-activation poll
    #[serde(with = "duration_ms")]
    pub request_latency: Duration,

    /// Delay between scheduling an async commit and running it
    #[serde(with = "duration_ms")]
    pub commit_delay: Duration,

    /// Per-call batch cap
    pub max_poll_records: usize,
}

impl Default for MockConsumerConfig {
    fn default() -> Self {
        Self {
            auto_heartbeat: true,
            request_latency: Duration::from_millis(DEFAULT_REQUEST_LATENCY_MS),
            commit_delay: Duration::from_millis(DEFAULT_COMMIT_DELAY_MS),
            max_poll_records: DEFAULT_MAX_POLL_RECORDS,
        }
    }
}

impl MockConsumerConfig {
    /// Config for an instance whose session expires unless it keeps polling
    pub fn manual_heartbeat() -> Self {
        Self {
            auto_heartbeat: false,
            ..Default::default()
        }
    }

    /// Set heartbeat mode
    pub fn with_auto_heartbeat(mut self, enabled: bool) -> Self {
        self.auto_heartbeat = enabled;
        self
    }

    /// Set the simulated poll latency
    pub fn with_request_latency(mut self, latency: Duration) -> Self {
        self.request_latency = latency;
        self
    }

    /// Set the async commit delay
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// Set the per-call batch cap
    pub fn with_max_poll_records(mut self, max: usize) -> Self {
        self.max_poll_records = max;
        self
    }
}

/// Serialize durations as integer milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_reset_defaults_to_latest() {
        let options = ConsumerOptions::new("group");
        assert_eq!(options.offset_reset().unwrap(), OffsetResetPolicy::Latest);
    }

    #[test]
    fn test_offset_reset_parsing() {
        let options = ConsumerOptions::new("group").with_offset_reset("earliest");
        assert_eq!(options.offset_reset().unwrap(), OffsetResetPolicy::Earliest);

        let options = ConsumerOptions::new("group").with_offset_reset("none");
        let err = options.offset_reset().unwrap_err();
        assert!(matches!(err, MockError::Configuration(_)));
        assert!(err.to_string().contains("offset not available"));
    }

    #[test]
    fn test_session_timeout() {
        let options = ConsumerOptions::new("group");
        assert_eq!(options.session_timeout().unwrap(), Duration::from_millis(2000));

        let options = options.with_session_timeout(Duration::from_millis(150));
        assert_eq!(options.session_timeout().unwrap(), Duration::from_millis(150));

        let options = options.with_property(SESSION_TIMEOUT_MS_CONFIG, "soon");
        assert!(options.session_timeout().is_err());
    }

    #[test]
    fn test_options_from_json() {
        let options = ConsumerOptions::from_json(
            r#"{"group_id":"g1","close_timeout":500,"properties":{"auto.offset.reset":"earliest"}}"#,
        )
        .unwrap();
        assert_eq!(options.group_id, "g1");
        assert_eq!(options.close_timeout, Duration::from_millis(500));
        assert_eq!(options.offset_reset().unwrap(), OffsetResetPolicy::Earliest);

        let options = ConsumerOptions::from_json(r#"{"group_id":"g2"}"#).unwrap();
        assert_eq!(
            options.close_timeout,
            Duration::from_millis(DEFAULT_CLOSE_TIMEOUT_MS)
        );
        assert!(ConsumerOptions::from_json("not json").is_err());
    }

    #[test]
    fn test_mock_consumer_config_defaults() {
        let config = MockConsumerConfig::default();
        assert!(config.auto_heartbeat);
        assert_eq!(config.max_poll_records, 2);
        assert_eq!(config.request_latency, Duration::from_millis(10));
        assert!(!MockConsumerConfig::manual_heartbeat().auto_heartbeat);
    }
}
