//! Simulated consumer client
//!
//! [`MockConsumer`] composes the pieces below; each one owns a single concern
//! of the client state machine and can be tested on its own.

pub mod commit;
pub mod faults;
pub mod guard;
pub mod mock;
pub mod offsets;
pub mod poll;
pub mod pool;
pub mod session;
pub mod subscription;

pub use commit::{CommitCallback, CommitEngine, OffsetMap};
pub use faults::FaultQueue;
pub use guard::{AccessGuard, AccessPermit};
pub use mock::MockConsumer;
pub use offsets::OffsetTracker;
pub use poll::{ConsumerRecords, PollEngine};
pub use pool::{ConsumerFactory, ConsumerPool};
pub use session::SessionTimer;
pub use subscription::{RebalanceListener, RebalanceNotice, SubscriptionMode, SubscriptionModel};
