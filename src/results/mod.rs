//! What to do with the results of a refresh.
//!
//! A [`ResultAction`] is produced by a listener when a refresh is done (or by
//! the scheduler when it failed). Depending on the context of the run it is
//! either resolved right away or parked in the task's [`PendingResult`] for a
//! person to invoke later.
//!
//! ## Delivery
//! ```text
//!                      Foreground run    Background run
//! Immediate(action)    resolve now       resolve now
//! Deferred(action)     resolve now       attach to PendingResult
//! Error(cause)         resolve now       User trigger: resolve now (reported)
//!                                        Scheduled:    attach to PendingResult
//! ```

mod action;
mod pending;

pub use action::{Action, ActionFn, ActionRef, ResultAction};
pub use pending::PendingResult;
