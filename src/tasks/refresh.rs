//! # Refresh task.
//!
//! A [`RefreshTask`] is the unit of work of the scheduler: a named refresh of
//! one [`Subscriber`](crate::Subscriber) over a [`ResourceSet`]. Besides its
//! identity it owns:
//! - its reschedule policy (`reschedule`, `restart_on_cancel`), mutable at
//!   runtime and read at the next scheduling decision;
//! - its lifecycle [`TaskState`] and the [`Status`] of the last run;
//! - the cancellation token of the current run;
//! - the [`PendingResult`] of background runs.
//!
//! ## Example
//! ```rust,ignore
//! let task = RefreshTask::new("Refresh CVS", subscriber, collector, ResourceSet::new(["/p"]))
//!     .with_reschedule(true)
//!     .with_participant("cvs-participant");
//! scheduler.schedule(Arc::new(task), Duration::ZERO).await?;
//! ```

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, atomic::{AtomicBool, AtomicU64, Ordering}},
};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::{
    events::Status,
    provider::{ResourceSet, SubscriberRef, SyncInfoCollector},
    results::PendingResult,
    tasks::{Family, TaskState},
};

static TASK_IDS: AtomicU64 = AtomicU64::new(1);

/// Process-unique task identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(TASK_IDS.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared handle to a refresh task.
pub type TaskRef = Arc<RefreshTask>;

/// Resource-scoped refresh of one subscriber.
pub struct RefreshTask {
    id: TaskId,
    name: Arc<str>,
    subscriber: SubscriberRef,
    collector: Arc<dyn SyncInfoCollector>,
    resources: ResourceSet,
    participant: Option<Arc<str>>,

    reschedule: AtomicBool,
    restart_on_cancel: AtomicBool,

    state: Mutex<TaskState>,
    last_status: Mutex<Option<Status>>,
    run_token: Mutex<CancellationToken>,
    rerun: AtomicBool,
    pending: PendingResult,
    pub(crate) wake: Notify,
}

impl RefreshTask {
    /// Creates a one-shot task (`reschedule = false`, `restart_on_cancel = true`).
    pub fn new(
        name: impl Into<Arc<str>>,
        subscriber: SubscriberRef,
        collector: Arc<dyn SyncInfoCollector>,
        resources: ResourceSet,
    ) -> Self {
        Self {
            id: TaskId::next(),
            name: name.into(),
            subscriber,
            collector,
            resources,
            participant: None,
            reschedule: AtomicBool::new(false),
            restart_on_cancel: AtomicBool::new(true),
            state: Mutex::new(TaskState::Idle),
            last_status: Mutex::new(None),
            run_token: Mutex::new(CancellationToken::new()),
            rerun: AtomicBool::new(false),
            pending: PendingResult::new(),
            wake: Notify::new(),
        }
    }

    /// Returns a task with updated reschedule flag.
    pub fn with_reschedule(self, reschedule: bool) -> Self {
        self.set_reschedule(reschedule);
        self
    }

    /// Returns a task with updated restart-on-cancel flag.
    pub fn with_restart_on_cancel(self, restart: bool) -> Self {
        self.set_restart_on_cancel(restart);
        self
    }

    /// Returns a task owned by `participant`.
    pub fn with_participant(mut self, participant: impl Into<Arc<str>>) -> Self {
        self.participant = Some(participant.into());
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscriber(&self) -> &SubscriberRef {
        &self.subscriber
    }

    pub fn collector(&self) -> &Arc<dyn SyncInfoCollector> {
        &self.collector
    }

    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    pub fn participant(&self) -> Option<&str> {
        self.participant.as_deref()
    }

    pub fn reschedule(&self) -> bool {
        self.reschedule.load(Ordering::Acquire)
    }

    pub fn set_reschedule(&self, reschedule: bool) {
        self.reschedule.store(reschedule, Ordering::Release);
    }

    pub fn restart_on_cancel(&self) -> bool {
        self.restart_on_cancel.load(Ordering::Acquire)
    }

    pub fn set_restart_on_cancel(&self, restart: bool) {
        self.restart_on_cancel.store(restart, Ordering::Release);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        *lock(&self.state)
    }

    /// Status of the most recent finished run.
    pub fn last_status(&self) -> Option<Status> {
        lock(&self.last_status).clone()
    }

    /// Result parked by background runs.
    pub fn pending_result(&self) -> &PendingResult {
        &self.pending
    }

    /// True if the task is a member of `family`.
    pub fn belongs_to(&self, family: &Family) -> bool {
        match family {
            Family::Refresh => true,
            Family::Subscriber(id) => self.subscriber.id() == *id,
            Family::Participant(p) => self.participant.as_deref() == Some(&**p),
            Family::Task(id) => self.id == *id,
        }
    }

    /// Cancels the current run (or the pending wait before it).
    ///
    /// Whether the task comes back afterwards depends on `restart_on_cancel`.
    /// Returns `false` if the task was idle.
    pub fn cancel(&self) -> bool {
        if !self.state().is_live() {
            return false;
        }
        lock(&self.run_token).cancel();
        true
    }

    /// Cancels the current run and suppresses the restart once.
    ///
    /// The flag is left untouched when the task is idle.
    pub fn cancel_without_restart(&self) -> bool {
        let restart = self.restart_on_cancel.swap(false, Ordering::AcqRel);
        if self.cancel() {
            return true;
        }
        self.set_restart_on_cancel(restart);
        false
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        *lock(&self.state) = state;
    }

    pub(crate) fn record_status(&self, status: Status) {
        *lock(&self.last_status) = Some(status);
    }

    /// Token of the current run.
    pub(crate) fn run_token(&self) -> CancellationToken {
        lock(&self.run_token).clone()
    }

    /// Installs a fresh run token derived from `parent`.
    pub(crate) fn attach_run_token(&self, parent: &CancellationToken) -> CancellationToken {
        let token = parent.child_token();
        *lock(&self.run_token) = token.clone();
        token
    }

    /// Replaces a consumed (cancelled) run token with a fresh child of `parent`.
    ///
    /// A token that was not cancelled is kept, so a cancel that raced the end
    /// of a run is still observed by the next wait.
    pub(crate) fn renew_run_token(&self, parent: &CancellationToken) -> CancellationToken {
        let mut token = lock(&self.run_token);
        if token.is_cancelled() && !parent.is_cancelled() {
            *token = parent.child_token();
        }
        token.clone()
    }

    /// Asks the live actor for one more user-triggered run.
    pub(crate) fn request_rerun(&self) {
        self.rerun.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Consumes a pending rerun request.
    pub(crate) fn take_rerun(&self) -> bool {
        self.rerun.swap(false, Ordering::AcqRel)
    }
}

impl fmt::Debug for RefreshTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTask")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("subscriber", &self.subscriber.id())
            .field("resources", &self.resources)
            .field("participant", &self.participant)
            .field("reschedule", &self.reschedule())
            .field("restart_on_cancel", &self.restart_on_cancel())
            .field("state", &self.state())
            .finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
