//! # Refresh lifecycle listeners.
//!
//! This module provides the [`RefreshListener`] trait, the [`ListenerRegistry`]
//! that dispatches refresh notifications to all registered listeners, and the
//! built-in [`LogListener`].
//!
//! ## Architecture
//! ```text
//! runner::run_once()
//!   ├─► registry.notify(&ev, Phase::Started)
//!   │        └─ snapshot ─► l1.on_refresh_started ─► l2 ... ─► lN
//!   └─► registry.notify(&ev, Phase::Done)  ─► Option<ResultAction> (latest wins)
//!            └─ snapshot ─► l1.on_refresh_done   ─► l2 ... ─► lN
//!                           (panic caught, logged, next listener runs)
//! ```
//!
//! ## Implementing custom listeners
//! ```no_run
//! use async_trait::async_trait;
//! use refreshvisor::{RefreshEvent, RefreshListener, ResultAction, Status};
//!
//! struct Badge;
//!
//! #[async_trait]
//! impl RefreshListener for Badge {
//!     async fn on_refresh_done(&self, event: &RefreshEvent) -> Option<ResultAction> {
//!         if let Some(Status::Completed { change_count, .. }) = event.status() {
//!             // update a change counter badge...
//!             let _ = change_count;
//!         }
//!         None
//!     }
//! }
//! ```

mod listener;
#[cfg(feature = "logging")]
mod log;
mod registry;

pub use listener::{ListenerRef, Phase, RefreshListener};
#[cfg(feature = "logging")]
pub use log::LogListener;
pub use registry::ListenerRegistry;
