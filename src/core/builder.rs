use std::sync::Arc;

use tokio::sync::Semaphore;

use super::{context::SchedulerContext, scheduler::TaskScheduler};
use crate::{
    core::{RefreshSettings, SchedulerConfig},
    listeners::{ListenerRef, ListenerRegistry},
    sync::{Activity, BlockingProbe, MutualExclusionLock},
};

/// Builder for constructing a [`TaskScheduler`] with shared collaborators.
///
/// Every collaborator defaults to a fresh private instance. Share a lock or a
/// listener registry between schedulers by passing the same `Arc`.
pub struct SchedulerBuilder {
    cfg: SchedulerConfig,
    lock: Option<Arc<MutualExclusionLock>>,
    listeners: Option<Arc<ListenerRegistry>>,
    extra_listeners: Vec<ListenerRef>,
    activity: Option<Arc<Activity>>,
    probe: Option<Arc<dyn BlockingProbe>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SchedulerConfig) -> Self {
        Self {
            cfg,
            lock: None,
            listeners: None,
            extra_listeners: Vec::new(),
            activity: None,
            probe: None,
        }
    }

    /// Uses `lock` for mutual exclusion instead of a private one.
    pub fn with_lock(mut self, lock: Arc<MutualExclusionLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Uses an existing listener registry.
    pub fn with_listeners(mut self, listeners: Arc<ListenerRegistry>) -> Self {
        self.listeners = Some(listeners);
        self
    }

    /// Registers one more listener at build time.
    pub fn with_listener(mut self, listener: ListenerRef) -> Self {
        self.extra_listeners.push(listener);
        self
    }

    /// Uses an existing activity tracker (build conflicts and default blocking probe).
    pub fn with_activity(mut self, activity: Arc<Activity>) -> Self {
        self.activity = Some(activity);
        self
    }

    /// Overrides the probe consulted by block-aware tokens.
    ///
    /// Defaults to the activity tracker (blocking while any foreground
    /// operation is registered).
    pub fn with_blocking_probe(mut self, probe: Arc<dyn BlockingProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Builds the scheduler.
    pub fn build(self) -> TaskScheduler {
        let listeners = self.listeners.unwrap_or_default();
        for listener in self.extra_listeners {
            listeners.add(listener);
        }
        let activity = self.activity.unwrap_or_else(Activity::new);
        let probe = self
            .probe
            .unwrap_or_else(|| Arc::clone(&activity) as Arc<dyn BlockingProbe>);
        let workers = self.cfg.worker_limit().map(Semaphore::new).map(Arc::new);

        TaskScheduler::from_context(SchedulerContext {
            settings: RefreshSettings::new(self.cfg.interval),
            lock: self.lock.unwrap_or_default(),
            listeners,
            activity,
            probe,
            workers,
            cfg: self.cfg,
        })
    }
}
