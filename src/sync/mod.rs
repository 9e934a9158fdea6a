//! Synchronization primitives of the refresh scheduler.
//!
//! ## Contents
//! - [`MutualExclusionLock`] one refresh body at a time, acquired with a bounded poll
//! - [`BlockAwareToken`] cancellation token that trips when a refresh blocks other work
//! - [`Activity`] tracker of builds and interactive operations running beside refreshes
//!
//! ## Wiring
//! ```text
//! RefreshActor ──► runner::run_once()
//!                    ├─► Activity::is_building()          ─► Postponed(BuildConflict)
//!                    ├─► MutualExclusionLock::acquire_cancellable(token, poll)
//!                    └─► Subscriber::refresh(.., &BlockAwareToken)
//!                              └─► BlockingProbe (Activity) polled by is_cancelled()
//! ```

mod activity;
mod lock;
mod token;

pub use activity::{Activity, ActivityGuard, ActivityKind, BlockingProbe};
pub use lock::{LockGuard, MutualExclusionLock};
pub use token::BlockAwareToken;
