//! Refresh events: data model handed to listeners.
//!
//! ## Contents
//! - [`RefreshEvent`] one refresh run: trigger, scope, timestamps, changes, final status
//! - [`Trigger`] why the run happened (user request or schedule)
//! - [`Status`], [`PostponeReason`] classified outcome of a run
//!
//! ## Lifecycle
//! ```text
//! runner::run_once()
//!   ├─► RefreshEvent::start(..)       ─► listeners.on_refresh_started(&ev)
//!   ├─► Subscriber::refresh(..)
//!   └─► ev.finish(changes, status)    ─► listeners.on_refresh_done(&ev)
//! ```
//! An event is finalized exactly once; after [`RefreshEvent::finish`] it is
//! never mutated.

mod refresh;
mod status;

pub use refresh::{RefreshEvent, Trigger};
pub use status::{PostponeReason, Status};
