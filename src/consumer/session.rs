//! Session expiry for manual-heartbeat consumers
//!
//! When heartbeats are not automatic, an assignment only stays valid while the
//! consumer keeps polling. Every activation and every completed poll pushes the
//! expiry out by the session timeout; a poll that arrives after the expiry
//! finds its assignment revoked.

use std::time::{Duration, Instant};

/// Optional expiry clock
#[derive(Debug, Default)]
pub struct SessionTimer {
    /// `None` in auto-heartbeat mode
    timeout: Option<Duration>,
    expires_at: Option<Instant>,
}

impl SessionTimer {
    /// A timer that never expires
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Set the session timeout; `None` disables expiry entirely
    pub fn configure(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
        self.expires_at = None;
    }

    pub fn is_active(&self) -> bool {
        self.timeout.is_some()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Record a heartbeat at `now`
    pub fn touch(&mut self, now: Instant) {
        if let Some(timeout) = self.timeout {
            self.expires_at = Some(now + timeout);
        }
    }

    /// Whether the session lapsed before `now`. A timer that was never
    /// touched cannot expire.
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if self.timeout.is_some() && now > deadline)
    }
}
