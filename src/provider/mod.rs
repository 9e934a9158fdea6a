//! External collaborators consumed by the scheduler.
//!
//! The scheduler does not compute differences between resource trees; it
//! drives a [`Subscriber`] and reads post-refresh state from a
//! [`SyncInfoCollector`]. Both are owned outside the crate.
//!
//! ## Contents
//! - [`Resource`], [`ResourceSet`], [`Depth`] the resource model
//! - [`SyncChange`], [`ChangeKind`] per-resource comparison outcome
//! - [`Subscriber`], [`ChangeListener`] the refresh provider
//! - [`SyncInfoCollector`] the authoritative out-of-sync set

mod collector;
mod resource;
mod subscriber;

pub use collector::SyncInfoCollector;
pub use resource::{ChangeKind, Depth, Resource, ResourceSet, SyncChange};
pub use subscriber::{ChangeListener, ChangeListenerRef, Subscriber, SubscriberId, SubscriberRef};
