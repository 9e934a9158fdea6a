//! # Scheduler context.
//!
//! Everything a refresh run needs from its scheduler, owned in one place and
//! shared by the scheduler and all of its actors. The lock and the listener
//! registry are injected handles, so several schedulers can share one lock.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::{
    core::{RefreshSettings, SchedulerConfig},
    listeners::ListenerRegistry,
    sync::{Activity, BlockingProbe, MutualExclusionLock},
};

pub(crate) struct SchedulerContext {
    pub cfg: SchedulerConfig,
    pub settings: RefreshSettings,
    pub lock: Arc<MutualExclusionLock>,
    pub listeners: Arc<ListenerRegistry>,
    pub activity: Arc<Activity>,
    pub probe: Arc<dyn BlockingProbe>,
    pub workers: Option<Arc<Semaphore>>,
}
