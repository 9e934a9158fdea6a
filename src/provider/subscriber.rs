//! # Subscriber: the external provider of synchronization state.
//!
//! A [`Subscriber`] compares a resource set against some other source
//! (e.g. a remote repository) when asked to [`refresh`](Subscriber::refresh).
//! While refreshing it reports per-resource outcomes to registered
//! [`ChangeListener`]s; the scheduler registers a temporary listener for the
//! duration of each refresh to learn which changes were newly observed.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{error::SyncError, provider::{Depth, ResourceSet, SyncChange}, sync::BlockAwareToken};

/// Opaque, comparable handle identifying a subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(Arc<str>);

impl SubscriberId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Observer of sync-info changes emitted by a subscriber.
pub trait ChangeListener: Send + Sync + 'static {
    /// Called by the subscriber with a batch of changed resources.
    fn sync_changed(&self, changes: &[SyncChange]);
}

/// Shared handle to a change listener; identity is the `Arc` pointer.
pub type ChangeListenerRef = Arc<dyn ChangeListener>;

/// Shared handle to a subscriber.
pub type SubscriberRef = Arc<dyn Subscriber>;

/// # Provider of synchronization state for a resource set.
///
/// Implementations must poll `token` (or await [`BlockAwareToken::cancelled`])
/// frequently enough to stop within the blocking threshold, and should return
/// [`SyncError::Canceled`] when they stop because of it.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use refreshvisor::{
///     BlockAwareToken, ChangeListenerRef, Depth, ResourceSet, Subscriber, SubscriberId, SyncError,
/// };
///
/// struct Noop;
///
/// #[async_trait]
/// impl Subscriber for Noop {
///     fn id(&self) -> SubscriberId { SubscriberId::new("noop") }
///
///     async fn refresh(
///         &self,
///         _resources: &ResourceSet,
///         _depth: Depth,
///         token: &BlockAwareToken,
///     ) -> Result<(), SyncError> {
///         if token.is_cancelled() {
///             return Err(SyncError::Canceled);
///         }
///         Ok(())
///     }
///
///     fn add_change_listener(&self, _listener: ChangeListenerRef) {}
///     fn remove_change_listener(&self, _listener: &ChangeListenerRef) {}
/// }
/// ```
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Stable identity used for family lookup.
    fn id(&self) -> SubscriberId;

    /// Re-synchronizes `resources` to `depth`, honoring `token`.
    async fn refresh(
        &self,
        resources: &ResourceSet,
        depth: Depth,
        token: &BlockAwareToken,
    ) -> Result<(), SyncError>;

    /// Registers a change listener (idempotent by identity).
    fn add_change_listener(&self, listener: ChangeListenerRef);

    /// Unregisters a change listener previously added.
    fn remove_change_listener(&self, listener: &ChangeListenerRef);
}
