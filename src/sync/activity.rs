//! # Activity running beside refreshes.
//!
//! [`Activity`] counts two kinds of work registered by the embedding code:
//! - **builds**: a refresh that starts while a build runs is postponed
//!   instead of contending with it;
//! - **foreground** operations: interactive work waiting on resources a
//!   refresh is using. While any is registered, a running refresh is
//!   considered to be *blocking* (see [`BlockingProbe`]).
//!
//! Registration is scoped: the returned [`ActivityGuard`] unregisters on drop.

use std::sync::{Arc, atomic::{AtomicBool, AtomicUsize, Ordering}};

/// Answers whether the current refresh is holding up other work.
pub trait BlockingProbe: Send + Sync + 'static {
    fn is_blocking(&self) -> bool;
}

impl BlockingProbe for AtomicBool {
    fn is_blocking(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Kind of registered activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    Build,
    Foreground,
}

/// Counters of builds and foreground operations currently in progress.
#[derive(Debug, Default)]
pub struct Activity {
    builds: AtomicUsize,
    foreground: AtomicUsize,
}

/// Keeps one activity registered until dropped.
#[derive(Debug)]
#[must_use = "the activity is unregistered as soon as the guard is dropped"]
pub struct ActivityGuard {
    activity: Arc<Activity>,
    kind: ActivityKind,
}

impl Activity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a running build.
    pub fn build(self: &Arc<Self>) -> ActivityGuard {
        self.enter(ActivityKind::Build)
    }

    /// Registers an interactive operation waiting on refreshed resources.
    pub fn foreground(self: &Arc<Self>) -> ActivityGuard {
        self.enter(ActivityKind::Foreground)
    }

    fn enter(self: &Arc<Self>, kind: ActivityKind) -> ActivityGuard {
        self.counter(kind).fetch_add(1, Ordering::AcqRel);
        ActivityGuard {
            activity: Arc::clone(self),
            kind,
        }
    }

    fn counter(&self, kind: ActivityKind) -> &AtomicUsize {
        match kind {
            ActivityKind::Build => &self.builds,
            ActivityKind::Foreground => &self.foreground,
        }
    }

    /// True while at least one build is registered.
    pub fn is_building(&self) -> bool {
        self.builds.load(Ordering::Acquire) > 0
    }

    /// Number of registered activities of `kind`.
    pub fn count(&self, kind: ActivityKind) -> usize {
        self.counter(kind).load(Ordering::Acquire)
    }
}

impl BlockingProbe for Activity {
    fn is_blocking(&self) -> bool {
        self.foreground.load(Ordering::Acquire) > 0
    }
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.activity.counter(self.kind).fetch_sub(1, Ordering::AcqRel);
    }
}
