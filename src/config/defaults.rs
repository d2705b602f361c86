//! Default constants for mock consumer configuration
//!
//! These constants define the default values used when an option is not
//! explicitly provided.

/// Property key holding the session timeout in milliseconds
pub const SESSION_TIMEOUT_MS_CONFIG: &str = "session.timeout.ms";

/// Property key holding the offset reset policy
pub const AUTO_OFFSET_RESET_CONFIG: &str = "auto.offset.reset";

/// Default session timeout in milliseconds
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 2000;

/// Default offset reset policy when the property is absent
pub const DEFAULT_AUTO_OFFSET_RESET: &str = "latest";

/// Default time `close` waits for in-flight commits, in milliseconds
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 30_000;

/// Default simulated round-trip latency of a poll, in milliseconds
pub const DEFAULT_REQUEST_LATENCY_MS: u64 = 10;

/// Default delay before a scheduled async commit runs, in milliseconds
pub const DEFAULT_COMMIT_DELAY_MS: u64 = 10;

/// Default per-call batch cap (a poll may return one record more, see `PollEngine`)
pub const DEFAULT_MAX_POLL_RECORDS: usize = 2;

/// Default consumer group id
pub const DEFAULT_GROUP_ID: &str = "";
