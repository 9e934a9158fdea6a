//! # Result actions.
//!
//! [`Action`] is a deferred piece of work such as "show the changes" that a
//! listener hands back; [`ActionFn`] wraps a closure as an action.
//! [`ResultAction`] tags an action with how it wants to be delivered, or
//! carries a terminal error in place of an action.

use std::{borrow::Cow, fmt, sync::Arc};

use crate::error::SyncError;

/// A deferred action on refresh results.
pub trait Action: Send + Sync + 'static {
    /// Human-readable name (for logs and task lists).
    fn name(&self) -> &str;

    /// Performs the action.
    fn run(&self);
}

/// Shared handle to an action.
pub type ActionRef = Arc<dyn Action>;

/// Function-backed action.
///
/// ## Example
/// ```rust
/// use refreshvisor::{ActionFn, ActionRef};
///
/// let show: ActionRef = ActionFn::arc("show-changes", || println!("3 changes"));
/// assert_eq!(show.name(), "show-changes");
/// ```
pub struct ActionFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ActionFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the action and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Action for ActionFn<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) {
        (self.f)()
    }
}

/// Outcome handed back for a finished refresh.
#[derive(Clone)]
pub enum ResultAction {
    /// Run as soon as the refresh is done, whatever the context.
    Immediate(ActionRef),
    /// Run now in a foreground run, otherwise park until invoked.
    Deferred(ActionRef),
    /// Terminal error to surface instead of an action.
    Error(Arc<SyncError>),
}

impl ResultAction {
    /// Runs the action, or returns the carried error.
    pub fn resolve(&self) -> Result<(), Arc<SyncError>> {
        match self {
            ResultAction::Immediate(action) | ResultAction::Deferred(action) => {
                action.run();
                Ok(())
            }
            ResultAction::Error(err) => Err(Arc::clone(err)),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResultAction::Error(_))
    }

    /// Name of the wrapped action, or the error label.
    pub fn name(&self) -> &str {
        match self {
            ResultAction::Immediate(action) | ResultAction::Deferred(action) => action.name(),
            ResultAction::Error(err) => err.as_label(),
        }
    }
}

impl fmt::Debug for ResultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultAction::Immediate(a) => f.debug_tuple("Immediate").field(&a.name()).finish(),
            ResultAction::Deferred(a) => f.debug_tuple("Deferred").field(&a.name()).finish(),
            ResultAction::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}
