//! # Core listener trait

use std::sync::Arc;

use async_trait::async_trait;

use crate::{events::RefreshEvent, results::ResultAction};

/// Notification phase of a refresh run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Lock acquired; the subscriber refresh is about to run.
    Started,
    /// Event finalized and lock released.
    Done,
}

/// Contract for refresh lifecycle observers.
///
/// Called on the task's own worker, one listener after another. Listener code
/// may run concurrently with another task's refresh body and must not assume
/// exclusivity. A panicking listener is isolated: the panic is logged and the
/// remaining listeners are still notified.
#[async_trait]
pub trait RefreshListener: Send + Sync + 'static {
    /// A refresh is about to run. The event is not finalized yet.
    async fn on_refresh_started(&self, event: &RefreshEvent) {
        let _ = event;
    }

    /// A refresh finished. May return what to do with its results.
    async fn on_refresh_done(&self, event: &RefreshEvent) -> Option<ResultAction> {
        let _ = event;
        None
    }

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a listener; identity is the `Arc` pointer.
pub type ListenerRef = Arc<dyn RefreshListener>;
