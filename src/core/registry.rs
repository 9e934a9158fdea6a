//! # Task registry: the live actors of a scheduler.
//!
//! The registry owns one handle per live task (actor join handle plus its
//! lifetime and done tokens) and is the single place where "is this task
//! live?" is decided.
//!
//! ## Architecture
//! ```text
//! TaskScheduler ──► submit(task, start, on_live)
//!                     ├─ live      → on_live(task)        (wake / no-op)
//!                     └─ not live  → spawn RefreshActor, insert Handle
//! RefreshActor  ──► retire(id, generation)                (on Stop)
//!                     ├─ rerun requested → keep running
//!                     └─ otherwise       → remove own entry, state = Idle
//! TaskScheduler ──► take(family) / drain()                (remove / shutdown)
//! ```
//!
//! ## Rules
//! - Liveness checks and retirement happen under the same write lock, so a
//!   manual trigger never lands on an actor that is about to exit.
//! - An actor only removes the entry carrying its own generation.
//! - Nothing is accepted once the runtime token is cancelled.
//! - An actor that panics is evicted; its task is Idle and can be scheduled again.

use std::{
    collections::HashMap,
    panic::AssertUnwindSafe,
    sync::{Arc, atomic::{AtomicU64, Ordering}},
};

use futures::FutureExt;
use tokio::{sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{actor::{RefreshActor, Start}, context::SchedulerContext},
    error::SchedulerError,
    tasks::{Family, TaskId, TaskRef, TaskState},
};

/// Handle to a live task actor.
pub(crate) struct Handle {
    task: TaskRef,
    join: JoinHandle<()>,
    /// Cancelled to stop the actor for good.
    lifetime: CancellationToken,
    /// Cancelled by the actor when it exits.
    done: CancellationToken,
    generation: u64,
}

impl Handle {
    pub(crate) fn task(&self) -> &TaskRef {
        &self.task
    }

    pub(crate) fn cancel(&self) {
        self.lifetime.cancel();
    }

    pub(crate) fn done(&self) -> &CancellationToken {
        &self.done
    }

    /// Stops the actor and waits for it.
    pub(crate) async fn stop(self) {
        self.lifetime.cancel();
        if let Err(err) = self.join.await {
            tracing::warn!(task = self.task.name(), error = %err, "refresh actor panicked");
        }
    }
}

/// Registry of live refresh tasks.
pub(crate) struct Registry {
    tasks: RwLock<HashMap<TaskId, Handle>>,
    runtime_token: CancellationToken,
    generations: AtomicU64,
}

impl Registry {
    pub(crate) fn new(runtime_token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            tasks: RwLock::new(HashMap::new()),
            runtime_token,
            generations: AtomicU64::new(0),
        })
    }

    /// Spawns an actor for `task` unless one is live; otherwise calls `on_live`.
    ///
    /// Returns `true` if a new actor was spawned.
    pub(crate) async fn submit(
        self: &Arc<Self>,
        ctx: &Arc<SchedulerContext>,
        task: TaskRef,
        start: Start,
        on_live: impl FnOnce(&TaskRef),
    ) -> Result<bool, SchedulerError> {
        let mut tasks = self.tasks.write().await;
        if self.runtime_token.is_cancelled() {
            return Err(SchedulerError::Closed);
        }
        if let Some(handle) = tasks.get(&task.id()) {
            on_live(&handle.task);
            return Ok(false);
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let lifetime = self.runtime_token.child_token();
        let done = CancellationToken::new();
        let run_token = task.attach_run_token(&lifetime);
        task.set_state(if start.delay.is_zero() {
            TaskState::Scheduled
        } else {
            TaskState::Sleeping { delay: start.delay }
        });

        let actor = RefreshActor::new(Arc::clone(ctx), Arc::clone(self), Arc::clone(&task), generation);
        let guard = done.clone().drop_guard();
        let actor_lifetime = lifetime.clone();
        let registry = Arc::clone(self);
        let owner = Arc::clone(&task);
        let join = tokio::spawn(async move {
            let _done = guard;
            let run = AssertUnwindSafe(actor.run(actor_lifetime, run_token, start));
            if run.catch_unwind().await.is_err() {
                tracing::error!(task = owner.name(), "refresh actor panicked");
                registry.evict(&owner, generation).await;
            }
        });

        tracing::debug!(task = task.name(), id = %task.id(), ?start, "refresh task submitted");
        tasks.insert(
            task.id(),
            Handle {
                task,
                join,
                lifetime,
                done,
                generation,
            },
        );
        Ok(true)
    }

    /// Called by an actor that decided to stop.
    ///
    /// Returns `false` if a rerun was requested meanwhile and the actor must keep going.
    pub(crate) async fn retire(&self, task: &TaskRef, generation: u64) -> bool {
        let mut tasks = self.tasks.write().await;
        if task.take_rerun() {
            return false;
        }
        Self::remove_own(&mut tasks, task, generation);
        true
    }

    /// Drops the entry of an actor that died, so the task can be scheduled again.
    async fn evict(&self, task: &TaskRef, generation: u64) {
        let mut tasks = self.tasks.write().await;
        task.take_rerun();
        Self::remove_own(&mut tasks, task, generation);
    }

    fn remove_own(tasks: &mut HashMap<TaskId, Handle>, task: &TaskRef, generation: u64) {
        if tasks
            .get(&task.id())
            .is_some_and(|h| h.generation == generation)
        {
            tasks.remove(&task.id());
        }
        task.set_state(TaskState::Idle);
    }

    /// Live tasks of `family`.
    pub(crate) async fn find(&self, family: &Family) -> Vec<TaskRef> {
        let tasks = self.tasks.read().await;
        let mut found: Vec<TaskRef> = tasks
            .values()
            .filter(|h| h.task.belongs_to(family))
            .map(|h| Arc::clone(&h.task))
            .collect();
        found.sort_unstable_by_key(|t| t.id());
        found
    }

    /// Removes and returns the handles of `family`.
    pub(crate) async fn take(&self, family: &Family) -> Vec<Handle> {
        let mut tasks = self.tasks.write().await;
        let ids: Vec<TaskId> = tasks
            .values()
            .filter(|h| h.task.belongs_to(family))
            .map(|h| h.task.id())
            .collect();
        ids.into_iter().filter_map(|id| tasks.remove(&id)).collect()
    }

    /// Done tokens of the live tasks of `family`.
    pub(crate) async fn done_tokens(&self, family: &Family) -> Vec<CancellationToken> {
        let tasks = self.tasks.read().await;
        tasks
            .values()
            .filter(|h| h.task.belongs_to(family))
            .map(|h| h.done.clone())
            .collect()
    }

    /// Removes every handle.
    pub(crate) async fn drain(&self) -> Vec<Handle> {
        let mut tasks = self.tasks.write().await;
        tasks.drain().map(|(_, h)| h).collect()
    }

    pub(crate) async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }
}
