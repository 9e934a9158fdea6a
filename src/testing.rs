//! Crate-private fakes shared by unit and scheduler tests.

use std::{sync::{Arc, Mutex, atomic::{AtomicBool, AtomicUsize, Ordering}}, time::Duration};

use async_trait::async_trait;

use crate::{
    error::SyncError,
    events::RefreshEvent,
    listeners::{Phase, RefreshListener},
    provider::{
        ChangeListenerRef, Depth, Resource, ResourceSet, Subscriber, SubscriberId, SyncChange,
        SyncInfoCollector,
    },
    results::ResultAction,
    sync::BlockAwareToken,
};

/// Scriptable subscriber.
pub(crate) struct FakeSubscriber {
    id: SubscriberId,
    listeners: Mutex<Vec<ChangeListenerRef>>,
    emit: Mutex<Vec<SyncChange>>,
    fail_with: Mutex<Option<SyncError>>,
    hold: Mutex<Duration>,
    until_cancelled: AtomicBool,
    ignore_cancel: AtomicBool,
    panics: AtomicBool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSubscriber {
    pub(crate) fn arc(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: SubscriberId::new(id),
            listeners: Mutex::new(Vec::new()),
            emit: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
            hold: Mutex::new(Duration::ZERO),
            until_cancelled: AtomicBool::new(false),
            ignore_cancel: AtomicBool::new(false),
            panics: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Changes reported to listeners on every refresh.
    pub(crate) fn emit(&self, changes: Vec<SyncChange>) {
        *self.emit.lock().unwrap() = changes;
    }

    pub(crate) fn fail_with(&self, err: Option<SyncError>) {
        *self.fail_with.lock().unwrap() = err;
    }

    /// Time each refresh takes; cancellation ends it early unless ignored.
    pub(crate) fn hold(&self, d: Duration) {
        *self.hold.lock().unwrap() = d;
    }

    /// Refresh only ends when its token reports cancelled.
    pub(crate) fn until_cancelled(&self) {
        self.until_cancelled.store(true, Ordering::SeqCst);
    }

    pub(crate) fn ignore_cancel(&self) {
        self.ignore_cancel.store(true, Ordering::SeqCst);
    }

    pub(crate) fn panics(&self) {
        self.panics.store(true, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    async fn body(&self, token: &BlockAwareToken) -> Result<(), SyncError> {
        if self.panics.load(Ordering::SeqCst) {
            panic!("subscriber exploded");
        }

        let changes = self.emit.lock().unwrap().clone();
        if !changes.is_empty() {
            let listeners = self.listeners.lock().unwrap().clone();
            for l in listeners {
                l.sync_changed(&changes);
            }
        }

        if self.until_cancelled.load(Ordering::SeqCst) {
            token.cancelled().await;
            return Err(SyncError::Canceled);
        }

        let hold = *self.hold.lock().unwrap();
        if !hold.is_zero() {
            if self.ignore_cancel.load(Ordering::SeqCst) {
                tokio::time::sleep(hold).await;
            } else {
                tokio::select! {
                    _ = token.cancelled() => return Err(SyncError::Canceled),
                    _ = tokio::time::sleep(hold) => {}
                }
            }
        }

        match self.fail_with.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Subscriber for FakeSubscriber {
    fn id(&self) -> SubscriberId {
        self.id.clone()
    }

    async fn refresh(
        &self,
        _resources: &ResourceSet,
        _depth: Depth,
        token: &BlockAwareToken,
    ) -> Result<(), SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let res = self.body(token).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }

    fn add_change_listener(&self, listener: ChangeListenerRef) {
        let mut list = self.listeners.lock().unwrap();
        if !list.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            list.push(listener);
        }
    }

    fn remove_change_listener(&self, listener: &ChangeListenerRef) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }
}

/// Collector over a fixed list of out-of-sync resources.
#[derive(Default)]
pub(crate) struct FakeCollector {
    out_of_sync: Mutex<Vec<Resource>>,
    panics: AtomicBool,
}

impl FakeCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub(crate) fn set_out_of_sync<I, R>(&self, resources: I)
    where
        I: IntoIterator<Item = R>,
        R: Into<Resource>,
    {
        *self.out_of_sync.lock().unwrap() = resources.into_iter().map(Into::into).collect();
    }

    pub(crate) fn panics(&self) {
        self.panics.store(true, Ordering::SeqCst);
    }
}

impl SyncInfoCollector for FakeCollector {
    fn count_for(&self, predicate: &dyn Fn(&Resource) -> bool) -> usize {
        if self.panics.load(Ordering::SeqCst) {
            panic!("collector exploded");
        }
        self.out_of_sync
            .lock()
            .unwrap()
            .iter()
            .filter(|r| predicate(r))
            .count()
    }

    fn sync_infos(&self, root: &Resource, depth: Depth) -> Vec<SyncChange> {
        let scope = ResourceSet::new([root.clone()]);
        self.out_of_sync
            .lock()
            .unwrap()
            .iter()
            .filter(|r| scope.covers(r, depth))
            .map(|r| SyncChange::new(r.clone(), crate::provider::ChangeKind::Incoming))
            .collect()
    }
}

/// Listener recording every notification it receives.
#[derive(Default)]
pub(crate) struct RecordingListener {
    seen: Mutex<Vec<(Phase, RefreshEvent)>>,
    action: Mutex<Option<ResultAction>>,
}

impl RecordingListener {
    pub(crate) fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Action returned from every `on_refresh_done`.
    pub(crate) fn returning(&self, action: ResultAction) {
        *self.action.lock().unwrap() = Some(action);
    }

    pub(crate) fn seen(&self) -> Vec<(Phase, RefreshEvent)> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn phases(&self) -> Vec<Phase> {
        self.seen().into_iter().map(|(p, _)| p).collect()
    }

    /// Finalized events, in notification order.
    pub(crate) fn done(&self) -> Vec<RefreshEvent> {
        self.seen()
            .into_iter()
            .filter(|(p, _)| *p == Phase::Done)
            .map(|(_, e)| e)
            .collect()
    }
}

#[async_trait]
impl RefreshListener for RecordingListener {
    async fn on_refresh_started(&self, event: &RefreshEvent) {
        self.seen.lock().unwrap().push((Phase::Started, event.clone()));
    }

    async fn on_refresh_done(&self, event: &RefreshEvent) -> Option<ResultAction> {
        self.seen.lock().unwrap().push((Phase::Done, event.clone()));
        self.action.lock().unwrap().clone()
    }
}

/// Listener that panics on every notification.
pub(crate) struct PanickingListener;

#[async_trait]
impl RefreshListener for PanickingListener {
    async fn on_refresh_started(&self, _event: &RefreshEvent) {
        panic!("listener exploded");
    }

    async fn on_refresh_done(&self, _event: &RefreshEvent) -> Option<ResultAction> {
        panic!("listener exploded");
    }
}
