//! Exclusive, non-reentrant access enforcement
//!
//! The simulated client is single-threaded by contract. Instead of making it
//! safe for concurrent use, every public operation takes this guard with a
//! non-blocking try-acquire and fails fast when it is already held, whether
//! by another thread or by a reentrant call from a rebalance callback.

use crate::error::{MockError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// Try-acquire flag guarding a consumer instance
#[derive(Debug, Default)]
pub struct AccessGuard {
    held: AtomicBool,
}

impl AccessGuard {
    /// Create a released guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard or fail with [`MockError::ConcurrentAccess`].
    ///
    /// The returned permit releases the guard when dropped, on every exit path.
    pub fn acquire(&self) -> Result<AccessPermit<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| AccessPermit { guard: self })
            .map_err(|_| MockError::ConcurrentAccess)
    }

    /// Whether an operation currently holds the guard
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }
}

/// RAII permit returned by [`AccessGuard::acquire`]
#[derive(Debug)]
#[must_use = "the guard is released as soon as the permit is dropped"]
pub struct AccessPermit<'a> {
    guard: &'a AccessGuard,
}

impl Drop for AccessPermit<'_> {
    fn drop(&mut self) {
        self.guard.held.store(false, Ordering::Release);
    }
}
