//! # Example: periodic_refresh
//!
//! Demonstrates a rescheduling refresh task next to interactive work.
//!
//! Shows how to:
//! - Schedule a periodic [`RefreshTask`] with a short interval
//! - Trigger a manual refresh on a sleeping task
//! - Watch a refresh yield while a foreground operation is blocked on it
//! - Shut the scheduler down gracefully
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► schedule(task, 0s)          → Completed, sleeps 2s
//!   ├─► refresh(task)               → USER run, sleeps 2s
//!   ├─► activity.foreground() held  → slow refresh trips after 250ms → Postponed(Blocking)
//!   └─► shutdown()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example periodic_refresh
//! ```

use std::{sync::{Arc, Mutex, PoisonError, atomic::{AtomicUsize, Ordering}}, time::Duration};

use async_trait::async_trait;
use refreshvisor::{
    BlockAwareToken, ChangeKind, ChangeListenerRef, Depth, LogListener, RefreshTask, Resource,
    ResourceSet, SchedulerConfig, Subscriber, SubscriberId, SyncChange, SyncError,
    SyncInfoCollector, TaskScheduler,
};
use tracing_subscriber::EnvFilter;

/// Pretends to compare `/demo` against a remote; every third run is slow.
struct SlowRemote {
    runs: AtomicUsize,
    listeners: Mutex<Vec<ChangeListenerRef>>,
}

#[async_trait]
impl Subscriber for SlowRemote {
    fn id(&self) -> SubscriberId {
        SubscriberId::new("slow-remote")
    }

    async fn refresh(
        &self,
        resources: &ResourceSet,
        _depth: Depth,
        token: &BlockAwareToken,
    ) -> Result<(), SyncError> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        let work = if run % 3 == 0 {
            Duration::from_secs(3)
        } else {
            Duration::from_millis(100)
        };

        tokio::select! {
            _ = token.cancelled() => return Err(SyncError::Canceled),
            _ = tokio::time::sleep(work) => {}
        }

        let changes: Vec<SyncChange> = resources
            .iter()
            .map(|r| SyncChange::new(format!("{}/file{run}.txt", r.path()).as_str(), ChangeKind::Incoming))
            .collect();
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for l in listeners {
            l.sync_changed(&changes);
        }
        Ok(())
    }

    fn add_change_listener(&self, listener: ChangeListenerRef) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn remove_change_listener(&self, listener: &ChangeListenerRef) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|l| !Arc::ptr_eq(l, listener));
    }
}

/// Everything under `/demo` is reported as one incoming change.
struct OneIncoming;

impl SyncInfoCollector for OneIncoming {
    fn count_for(&self, predicate: &dyn Fn(&Resource) -> bool) -> usize {
        usize::from(predicate(&Resource::new("/demo/file.txt")))
    }

    fn sync_infos(&self, _root: &Resource, _depth: Depth) -> Vec<SyncChange> {
        vec![SyncChange::new("/demo/file.txt", ChangeKind::Incoming)]
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = SchedulerConfig {
        interval: Duration::from_secs(2),
        grace: Duration::from_secs(5),
        ..SchedulerConfig::default()
    };
    let scheduler = TaskScheduler::builder(cfg)
        .with_listener(Arc::new(LogListener::new()))
        .build();

    let remote = Arc::new(SlowRemote {
        runs: AtomicUsize::new(0),
        listeners: Mutex::new(Vec::new()),
    });
    let task = Arc::new(
        RefreshTask::new("Refresh demo", remote, Arc::new(OneIncoming), ResourceSet::new(["/demo"]))
            .with_reschedule(true)
            .with_participant("demo"),
    );

    scheduler.schedule(task.clone(), Duration::ZERO).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("after first run: {:?} / {:?}", task.state(), task.last_status());

    scheduler.refresh(task.clone()).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("after manual run: {:?}", task.last_status());

    {
        let _waiting = scheduler.activity().foreground();
        tokio::time::sleep(Duration::from_secs(3)).await;
        println!("while blocked: {:?}", task.last_status());
    }

    tokio::time::sleep(Duration::from_secs(6)).await;
    println!("recovered: {:?}", task.last_status());

    scheduler.shutdown().await?;
    println!("stopped: {:?}", task.state());
    Ok(())
}
