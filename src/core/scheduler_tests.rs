use std::{sync::{Arc, atomic::{AtomicUsize, Ordering}}, time::Duration};

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{SchedulerConfig, TaskScheduler},
    error::{SchedulerError, SyncError},
    events::{PostponeReason, Status, Trigger},
    listeners::Phase,
    provider::{ChangeKind, ResourceSet, SubscriberId, SyncChange},
    results::{ActionFn, ResultAction},
    tasks::{Family, RefreshTask, TaskRef, TaskState},
    testing::{FakeCollector, FakeSubscriber, PanickingListener, RecordingListener},
};

const HOUR: Duration = Duration::from_secs(3600);
const POSTPONE: Duration = Duration::from_secs(5);

struct Harness {
    scheduler: TaskScheduler,
    subscriber: Arc<FakeSubscriber>,
    collector: Arc<FakeCollector>,
    listener: Arc<RecordingListener>,
}

impl Harness {
    fn new(cfg: SchedulerConfig) -> Self {
        let listener = RecordingListener::arc();
        let scheduler = TaskScheduler::builder(cfg)
            .with_listener(listener.clone())
            .build();
        Self {
            scheduler,
            subscriber: FakeSubscriber::arc("cvs"),
            collector: FakeCollector::arc(),
            listener,
        }
    }

    fn task(&self, name: &str, reschedule: bool) -> TaskRef {
        Arc::new(
            RefreshTask::new(
                name,
                self.subscriber.clone(),
                self.collector.clone(),
                ResourceSet::new(["/p"]),
            )
            .with_reschedule(reschedule),
        )
    }
}

fn completed(change_count: usize, new_change_count: usize) -> Status {
    Status::Completed {
        change_count,
        new_change_count,
    }
}

fn sleeping(delay: Duration) -> TaskState {
    TaskState::Sleeping { delay }
}

/// Lets virtual time pass until `cond` holds.
async fn settle_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn scheduled_task_notifies_then_sleeps_for_interval() {
    let h = Harness::new(SchedulerConfig::default());
    let task = h.task("Refresh", true);

    assert!(h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap());
    settle_until(|| h.listener.done().len() == 1).await;

    assert_eq!(h.listener.phases(), vec![Phase::Started, Phase::Done]);
    let (_, started) = &h.listener.seen()[0];
    assert!(!started.is_finished());
    let done = &h.listener.done()[0];
    assert_eq!(done.status(), Some(&completed(0, 0)));
    assert_eq!(done.trigger(), Trigger::Scheduled);
    assert_eq!(done.seq(), started.seq());

    settle_until(|| task.state() == sleeping(HOUR)).await;
    assert_eq!(task.last_status(), Some(completed(0, 0)));
    assert_eq!(h.subscriber.listener_count(), 0);
    assert!(!h.scheduler.lock().is_held());
}

#[tokio::test(start_paused = true)]
async fn schedule_sets_initial_state_and_ignores_one_shot_tasks() {
    let h = Harness::new(SchedulerConfig::default());

    let periodic = h.task("periodic", true);
    assert!(h.scheduler.schedule(periodic.clone(), Duration::from_secs(10)).await.unwrap());
    assert_eq!(periodic.state(), sleeping(Duration::from_secs(10)));
    assert!(h.scheduler.schedule(periodic.clone(), Duration::ZERO).await.unwrap());
    assert_eq!(h.scheduler.len().await, 1);

    let one_shot = h.task("one-shot", false);
    assert!(!h.scheduler.schedule(one_shot.clone(), Duration::ZERO).await.unwrap());
    assert_eq!(one_shot.state(), TaskState::Idle);
}

#[tokio::test(start_paused = true)]
async fn refresh_bodies_never_overlap_across_schedulers() {
    let h = Harness::new(SchedulerConfig::default());
    let other = TaskScheduler::builder(SchedulerConfig::default())
        .with_lock(h.scheduler.lock().clone())
        .build();
    h.subscriber.hold(Duration::from_secs(1));

    let tasks: Vec<TaskRef> = (0..3).map(|i| h.task(&format!("t{i}"), false)).collect();
    h.scheduler.refresh(tasks[0].clone()).await.unwrap();
    h.scheduler.refresh(tasks[1].clone()).await.unwrap();
    other.refresh(tasks[2].clone()).await.unwrap();

    settle_until(|| h.subscriber.calls() == 3 && tasks.iter().all(|t| t.state() == TaskState::Idle))
        .await;
    assert_eq!(h.subscriber.max_in_flight(), 1);
    assert!(tasks.iter().all(|t| t.last_status() == Some(completed(0, 0))));
}

#[tokio::test(start_paused = true)]
async fn build_conflict_postpones_without_touching_the_lock() {
    let h = Harness::new(SchedulerConfig::default());
    let task = h.task("Refresh", true);
    let build = h.scheduler.activity().build();

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| task.last_status().is_some()).await;

    assert_eq!(
        task.last_status(),
        Some(Status::Postponed(PostponeReason::BuildConflict))
    );
    settle_until(|| task.state() == sleeping(POSTPONE)).await;
    assert_eq!(h.scheduler.lock().acquire_attempts(), 0);
    assert!(h.listener.seen().is_empty());
    assert_eq!(h.subscriber.calls(), 0);

    drop(build);
    settle_until(|| h.listener.done().len() == 1).await;
    let done = &h.listener.done()[0];
    assert_eq!(done.status(), Some(&completed(0, 0)));
    assert_eq!(done.trigger(), Trigger::Scheduled);
}

#[tokio::test(start_paused = true)]
async fn continuous_blocking_postpones_rescheduling_task() {
    let h = Harness::new(SchedulerConfig::default());
    h.subscriber.until_cancelled();
    h.subscriber
        .emit(vec![SyncChange::new("/p/a", ChangeKind::Incoming)]);
    let task = h.task("Refresh", true);
    let _waiting = h.scheduler.activity().foreground();

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| h.listener.done().len() == 1).await;

    let done = &h.listener.done()[0];
    assert_eq!(
        done.status(),
        Some(&Status::Postponed(PostponeReason::Blocking))
    );
    assert!(done.changes().is_empty());
    settle_until(|| task.state() == sleeping(POSTPONE)).await;
}

#[tokio::test(start_paused = true)]
async fn one_shot_refresh_does_not_yield_to_blocking() {
    let h = Harness::new(SchedulerConfig::default());
    h.subscriber.hold(Duration::from_secs(2));
    let task = h.task("Refresh", false);
    let _waiting = h.scheduler.activity().foreground();

    h.scheduler.refresh(task.clone()).await.unwrap();
    settle_until(|| task.state() == TaskState::Idle && task.last_status().is_some()).await;
    assert_eq!(task.last_status(), Some(completed(0, 0)));
}

#[tokio::test(start_paused = true)]
async fn cancel_without_restart_stops_and_resets_flag() {
    let h = Harness::new(SchedulerConfig::default());
    h.subscriber.until_cancelled();
    let task = h.task("Refresh", true);

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| h.subscriber.calls() == 1).await;
    assert_eq!(task.state(), TaskState::Running);

    assert_eq!(h.scheduler.cancel_without_restart(&Family::Refresh).await, 1);
    settle_until(|| task.state() == TaskState::Idle).await;

    assert_eq!(task.last_status(), Some(Status::Cancelled));
    assert_eq!(h.listener.done()[0].status(), Some(&Status::Cancelled));
    assert!(task.restart_on_cancel());
    assert!(h.scheduler.find(&Family::Refresh).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_ignored_by_failing_run_is_not_replayed() {
    let h = Harness::new(SchedulerConfig::default());
    h.subscriber.hold(Duration::from_secs(10));
    h.subscriber.ignore_cancel();
    h.subscriber.fail_with(Some(SyncError::recoverable("offline")));
    let task = h.task("Refresh", true);

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| h.subscriber.calls() == 1).await;
    assert!(task.cancel_without_restart());

    settle_until(|| task.state() == sleeping(HOUR)).await;
    time::sleep(Duration::from_millis(50)).await;

    let failed = Status::Failed(Arc::new(SyncError::recoverable("offline")));
    assert_eq!(task.last_status(), Some(failed.clone()));
    assert_eq!(task.state(), sleeping(HOUR));
    assert!(task.restart_on_cancel());

    time::sleep(HOUR).await;
    settle_until(|| h.listener.done().len() == 2).await;
    assert_eq!(h.listener.done()[1].status(), Some(&failed));
}

#[tokio::test(start_paused = true)]
async fn cancel_with_restart_reschedules_at_interval() {
    let h = Harness::new(SchedulerConfig::default());
    h.subscriber.until_cancelled();
    let task = h.task("Refresh", true);

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| h.subscriber.calls() == 1).await;

    assert!(task.cancel());
    settle_until(|| task.state() == sleeping(HOUR)).await;
    assert_eq!(task.last_status(), Some(Status::Cancelled));
    assert_eq!(h.scheduler.find(&Family::Task(task.id())).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_sleep_emits_no_event() {
    let h = Harness::new(SchedulerConfig::default());
    let task = h.task("Refresh", true);

    h.scheduler.schedule(task.clone(), Duration::from_secs(30)).await.unwrap();
    assert_eq!(h.scheduler.cancel_without_restart(&Family::Task(task.id())).await, 1);
    settle_until(|| task.state() == TaskState::Idle).await;

    assert_eq!(task.last_status(), Some(Status::Cancelled));
    assert!(h.listener.seen().is_empty());
    assert_eq!(h.subscriber.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_while_waiting_for_lock_skips_refresh() {
    let h = Harness::new(SchedulerConfig::default());
    let task = h.task("Refresh", false);
    let held = h.scheduler.lock().acquire(Duration::ZERO).await.unwrap();

    h.scheduler.refresh(task.clone()).await.unwrap();
    settle_until(|| h.scheduler.lock().acquire_attempts() >= 4).await;
    assert_eq!(task.state(), TaskState::Running);

    assert!(task.cancel());
    settle_until(|| task.state() == TaskState::Idle).await;
    assert_eq!(task.last_status(), Some(Status::Cancelled));
    assert!(h.listener.seen().is_empty());
    assert_eq!(h.subscriber.calls(), 0);
    held.release();
}

#[tokio::test(start_paused = true)]
async fn completion_counts_come_from_collector_and_change_stream() {
    let h = Harness::new(SchedulerConfig::default());
    h.collector.set_out_of_sync(["/p/a", "/p/b/c", "/p/d", "/q/x"]);
    h.subscriber.emit(vec![
        SyncChange::new("/p/a", ChangeKind::Outgoing),
        SyncChange::new("/p/e", ChangeKind::InSync),
    ]);
    let task = h.task("Refresh", true);

    let outcome = h
        .scheduler
        .refresh_now(&task, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, completed(3, 1));
    let event = outcome.event.expect("refresh body ran");
    assert_eq!(event.changes().len(), 1);
    assert_eq!(event.trigger(), Trigger::User);
    assert_eq!(task.last_status(), Some(completed(3, 1)));
    assert_eq!(task.state(), TaskState::Idle);
}

#[tokio::test(start_paused = true)]
async fn nothing_out_of_sync_is_no_changes() {
    let h = Harness::new(SchedulerConfig::default());
    h.subscriber
        .emit(vec![SyncChange::new("/p/a", ChangeKind::Incoming)]);
    let task = h.task("Refresh", false);

    let outcome = h
        .scheduler
        .refresh_now(&task, &CancellationToken::new())
        .await
        .unwrap();
    assert!(outcome.status.is_no_changes());
}

#[tokio::test(start_paused = true)]
async fn scheduled_failure_is_parked_and_still_reschedules() {
    let h = Harness::new(SchedulerConfig::default());
    h.subscriber.fail_with(Some(SyncError::recoverable("offline")));
    let task = h.task("Refresh", true);

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| task.state() == sleeping(HOUR)).await;

    let cause = Arc::new(SyncError::recoverable("offline"));
    assert_eq!(task.last_status(), Some(Status::Failed(cause.clone())));
    assert_eq!(task.pending_result().error(), Some(cause));
}

#[tokio::test(start_paused = true)]
async fn user_triggered_failure_is_reported_not_parked() {
    let h = Harness::new(SchedulerConfig::default());
    h.subscriber.fail_with(Some(SyncError::unrecoverable("auth")));
    let task = h.task("Refresh", false);

    h.scheduler.refresh(task.clone()).await.unwrap();
    settle_until(|| task.state() == TaskState::Idle && task.last_status().is_some()).await;

    assert!(matches!(task.last_status(), Some(Status::Failed(_))));
    assert!(!task.pending_result().is_pending());
}

#[tokio::test(start_paused = true)]
async fn subscriber_panic_becomes_failure() {
    let h = Harness::new(SchedulerConfig::default());
    h.subscriber.panics();
    let task = h.task("Refresh", false);

    let outcome = h
        .scheduler
        .refresh_now(&task, &CancellationToken::new())
        .await
        .unwrap();

    let cause = outcome.status.error().expect("failed");
    assert!(!cause.is_recoverable());
    assert!(matches!(outcome.action, Some(ResultAction::Error(_))));
    assert!(!h.scheduler.lock().is_held());
    assert_eq!(h.subscriber.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn listener_actions_follow_delivery_rules() {
    let h = Harness::new(SchedulerConfig::default());
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    h.listener.returning(ResultAction::Deferred(ActionFn::arc("show", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })));

    let background = h.task("background", false);
    h.scheduler.refresh(background.clone()).await.unwrap();
    settle_until(|| background.state() == TaskState::Idle && background.last_status().is_some())
        .await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(background.pending_result().is_pending());
    assert_eq!(background.pending_result().invoke(), Some(Ok(())));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let foreground = h.task("foreground", false);
    h.scheduler
        .refresh_now(&foreground, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(!foreground.pending_result().is_pending());
}

#[tokio::test(start_paused = true)]
async fn immediate_action_runs_for_unattended_run() {
    let h = Harness::new(SchedulerConfig::default());
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    h.listener.returning(ResultAction::Immediate(ActionFn::arc("notify", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })));
    let task = h.task("Refresh", true);

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| task.state() == sleeping(HOUR)).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!task.pending_result().is_pending());
}

#[tokio::test(start_paused = true)]
async fn panicking_action_keeps_task_scheduled() {
    let h = Harness::new(SchedulerConfig::default());
    h.listener.returning(ResultAction::Immediate(ActionFn::arc("boom", || {
        panic!("action exploded");
    })));
    let task = h.task("Refresh", true);

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| task.state() == sleeping(HOUR)).await;
    assert_eq!(task.last_status(), Some(completed(0, 0)));

    time::sleep(HOUR).await;
    settle_until(|| h.subscriber.calls() == 2 && task.state() == sleeping(HOUR)).await;
    assert_eq!(h.listener.done().len(), 2);
    assert_eq!(h.scheduler.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn collector_panic_becomes_failure() {
    let h = Harness::new(SchedulerConfig::default());
    h.collector.panics();
    let task = h.task("Refresh", true);

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| task.state() == sleeping(HOUR)).await;

    let cause = Arc::new(SyncError::unrecoverable("sync info collector panicked"));
    assert_eq!(task.last_status(), Some(Status::Failed(cause.clone())));
    assert_eq!(h.listener.done()[0].status(), Some(&Status::Failed(cause.clone())));
    assert_eq!(task.pending_result().error(), Some(cause));
}

#[tokio::test(start_paused = true)]
async fn panicking_listener_does_not_break_refresh() {
    let listener = RecordingListener::arc();
    let scheduler = TaskScheduler::builder(SchedulerConfig::default())
        .with_listener(Arc::new(PanickingListener))
        .with_listener(listener.clone())
        .build();
    let task = Arc::new(RefreshTask::new(
        "Refresh",
        FakeSubscriber::arc("cvs"),
        FakeCollector::arc(),
        ResourceSet::new(["/p"]),
    ));

    let outcome = scheduler
        .refresh_now(&task, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, completed(0, 0));
    assert_eq!(listener.phases(), vec![Phase::Started, Phase::Done]);
}

#[tokio::test(start_paused = true)]
async fn interval_change_restarts_sleep_only_when_asked() {
    let h = Harness::new(SchedulerConfig::default());
    let task = h.task("Refresh", true);

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| task.state() == sleeping(HOUR)).await;

    let minute = Duration::from_secs(60);
    h.scheduler.settings().set_interval(minute, false);
    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(task.state(), sleeping(HOUR));

    h.scheduler.settings().set_interval(minute, true);
    settle_until(|| task.state() == sleeping(minute)).await;

    time::sleep(Duration::from_secs(61)).await;
    settle_until(|| h.subscriber.calls() == 2 && task.state() == sleeping(minute)).await;
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_wakes_sleeping_task() {
    let h = Harness::new(SchedulerConfig::default());
    let task = h.task("Refresh", true);

    h.scheduler.schedule(task.clone(), Duration::ZERO).await.unwrap();
    settle_until(|| task.state() == sleeping(HOUR)).await;

    h.scheduler.refresh(task.clone()).await.unwrap();
    settle_until(|| h.listener.done().len() == 2).await;
    assert_eq!(h.listener.done()[1].trigger(), Trigger::User);
    settle_until(|| task.state() == sleeping(HOUR)).await;
    assert_eq!(h.scheduler.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn refresh_while_running_queues_one_follow_up() {
    let h = Harness::new(SchedulerConfig::default());
    h.subscriber.hold(Duration::from_secs(1));
    let task = h.task("Refresh", false);

    h.scheduler.refresh(task.clone()).await.unwrap();
    settle_until(|| h.subscriber.calls() == 1).await;
    h.scheduler.refresh(task.clone()).await.unwrap();
    h.scheduler.refresh(task.clone()).await.unwrap();

    settle_until(|| task.state() == TaskState::Idle).await;
    assert_eq!(h.subscriber.calls(), 2);
    assert!(h.scheduler.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn bounded_workers_queue_tasks() {
    let h = Harness::new(SchedulerConfig {
        max_workers: 1,
        ..SchedulerConfig::default()
    });
    h.subscriber.hold(Duration::from_secs(1));
    let first = h.task("first", false);
    let second = h.task("second", false);

    h.scheduler.refresh(first.clone()).await.unwrap();
    settle_until(|| first.state() == TaskState::Running).await;
    h.scheduler.refresh(second.clone()).await.unwrap();
    time::sleep(Duration::from_millis(20)).await;
    assert_eq!(second.state(), TaskState::Scheduled);

    settle_until(|| h.subscriber.calls() == 2 && second.state() == TaskState::Idle).await;
}

#[tokio::test(start_paused = true)]
async fn family_operations() {
    let h = Harness::new(SchedulerConfig::default());
    let git = FakeSubscriber::arc("git");
    let t1 = Arc::new(
        RefreshTask::new("cvs", h.subscriber.clone(), h.collector.clone(), ResourceSet::new(["/a"]))
            .with_reschedule(true)
            .with_participant("p1"),
    );
    let t2 = Arc::new(
        RefreshTask::new("git", git.clone(), h.collector.clone(), ResourceSet::new(["/b"]))
            .with_reschedule(true)
            .with_participant("p2"),
    );
    let delay = Duration::from_secs(10);
    h.scheduler.schedule(t1.clone(), delay).await.unwrap();
    h.scheduler.schedule(t2.clone(), delay).await.unwrap();

    assert_eq!(h.scheduler.find(&Family::Refresh).await.len(), 2);
    let by_subscriber = h.scheduler.find(&Family::Subscriber(SubscriberId::new("git"))).await;
    assert_eq!(by_subscriber.len(), 1);
    assert_eq!(by_subscriber[0].id(), t2.id());
    let by_participant = h.scheduler.find(&Family::participant("p1")).await;
    assert_eq!(by_participant[0].id(), t1.id());

    assert_eq!(h.scheduler.cancel(&Family::participant("p1")).await, 1);
    settle_until(|| t1.last_status() == Some(Status::Cancelled)).await;
    settle_until(|| t1.state() == sleeping(HOUR)).await;

    assert_eq!(h.scheduler.remove(&Family::participant("p2")).await, 1);
    assert_eq!(t2.state(), TaskState::Idle);
    assert_eq!(h.scheduler.find(&Family::Refresh).await.len(), 1);

    h.scheduler.cancel_without_restart(&Family::Refresh).await;
    h.scheduler.join(&Family::Refresh).await;
    assert_eq!(t1.state(), TaskState::Idle);
    assert!(h.scheduler.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_sleeping_tasks() {
    let h = Harness::new(SchedulerConfig::default());
    let task = h.task("Refresh", true);
    h.scheduler.schedule(task.clone(), Duration::from_secs(10)).await.unwrap();

    h.scheduler.shutdown().await.unwrap();
    assert_eq!(task.state(), TaskState::Idle);
    assert!(h.scheduler.is_closed());
    assert!(matches!(
        h.scheduler.schedule(task.clone(), Duration::ZERO).await,
        Err(SchedulerError::Closed)
    ));
    assert!(matches!(
        h.scheduler.refresh_now(&task, &CancellationToken::new()).await,
        Err(SchedulerError::Closed)
    ));
}

#[tokio::test(start_paused = true)]
async fn shutdown_reports_tasks_exceeding_grace() {
    let h = Harness::new(SchedulerConfig {
        grace: Duration::from_secs(1),
        ..SchedulerConfig::default()
    });
    h.subscriber.hold(Duration::from_secs(30));
    h.subscriber.ignore_cancel();
    let task = h.task("stuck", false);

    h.scheduler.refresh(task.clone()).await.unwrap();
    settle_until(|| h.subscriber.calls() == 1).await;

    match h.scheduler.shutdown().await {
        Err(SchedulerError::GraceExceeded { grace, stuck }) => {
            assert_eq!(grace, Duration::from_secs(1));
            assert_eq!(stuck, vec!["stuck".to_string()]);
        }
        other => panic!("unexpected shutdown result: {other:?}"),
    }
}
