//! # Pending result of a background task.
//!
//! A background run never forces its outcome into focus. Instead the latest
//! [`ResultAction`] is parked in the task's [`PendingResult`], where a person
//! (e.g. through a task list) can inspect and invoke it on demand.
//!
//! ## Rules
//! - Only the **latest** action is kept; attaching replaces, never stacks.
//! - Invoking takes the action out of the slot.

use std::sync::{Arc, Mutex, PoisonError};

use crate::{error::SyncError, results::ResultAction};

/// Slot holding the most recent unresolved result of a task.
#[derive(Debug, Default)]
pub struct PendingResult {
    slot: Mutex<Option<ResultAction>>,
}

impl PendingResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `action`, returning the one it replaced.
    pub fn attach(&self, action: ResultAction) -> Option<ResultAction> {
        self.lock().replace(action)
    }

    /// Current pending action, if any.
    pub fn peek(&self) -> Option<ResultAction> {
        self.lock().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// The error carried by the pending result, if it is an error.
    pub fn error(&self) -> Option<Arc<SyncError>> {
        match &*self.lock() {
            Some(ResultAction::Error(e)) => Some(Arc::clone(e)),
            _ => None,
        }
    }

    /// Takes the pending action and resolves it.
    ///
    /// Returns `None` if nothing was pending.
    pub fn invoke(&self) -> Option<Result<(), Arc<SyncError>>> {
        let action = self.lock().take()?;
        Some(action.resolve())
    }

    /// Discards the pending action.
    pub fn clear(&self) -> Option<ResultAction> {
        self.lock().take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ResultAction>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
