//! # ListenerRegistry: exception-isolated, snapshot-based dispatch
//!
//! ## What it guarantees
//! - `add` is idempotent by identity (`Arc` pointer), `remove` is exact-match.
//! - Dispatch iterates a **snapshot** taken before the first call, so
//!   concurrent `add`/`remove` never affect an in-flight notification.
//! - A panic inside one listener is caught and logged; the loop continues.
//!
//! ## What it does **not** guarantee
//! - No ordering across different refresh tasks.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave a listener's own
//! shared state inconsistent if it panics while holding a lock.

use std::{panic::AssertUnwindSafe, sync::{Arc, PoisonError, RwLock}};

use futures::FutureExt;

use crate::{events::RefreshEvent, listeners::{ListenerRef, Phase}, results::ResultAction};

/// Ordered set of refresh listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<ListenerRef>>,
}

fn same(a: &ListenerRef, b: &ListenerRef) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener`. Returns `false` if that instance was already registered.
    pub fn add(&self, listener: ListenerRef) -> bool {
        let mut list = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        if list.iter().any(|l| same(l, &listener)) {
            return false;
        }
        list.push(listener);
        true
    }

    /// Unregisters exactly that instance. Returns `true` if it was registered.
    pub fn remove(&self, listener: &ListenerRef) -> bool {
        let mut list = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = list.len();
        list.retain(|l| !same(l, listener));
        list.len() != before
    }

    /// Copy of the current listeners in registration order.
    pub fn snapshot(&self) -> Vec<ListenerRef> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notifies every listener of `phase`.
    ///
    /// For [`Phase::Done`], returns the action of the last listener that
    /// produced one (later results replace earlier ones).
    pub async fn notify(&self, event: &RefreshEvent, phase: Phase) -> Option<ResultAction> {
        let mut latest = None;
        for listener in self.snapshot() {
            match phase {
                Phase::Started => {
                    let fut = listener.on_refresh_started(event);
                    if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                        report_panic(listener.name(), phase, event);
                    }
                }
                Phase::Done => {
                    let fut = listener.on_refresh_done(event);
                    match AssertUnwindSafe(fut).catch_unwind().await {
                        Ok(Some(action)) => latest = Some(action),
                        Ok(None) => {}
                        Err(_) => report_panic(listener.name(), phase, event),
                    }
                }
            }
        }
        latest
    }
}

fn report_panic(listener: &str, phase: Phase, event: &RefreshEvent) {
    tracing::warn!(
        listener,
        ?phase,
        task = event.task(),
        seq = event.seq(),
        "refresh listener panicked; notification skipped"
    );
}
