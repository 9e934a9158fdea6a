//! # LogListener: refresh notifications as tracing records
//!
//! A listener that writes every refresh notification through `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO refresh started task="Refresh cvs" seq=4 trigger=Scheduled roots=2
//! INFO refresh done task="Refresh cvs" seq=4 status="completed" changes=3 new_changes=1
//! WARN refresh postponed task="Refresh cvs" seq=5 status="postponed_blocking"
//! ERROR refresh failed task="Refresh cvs" seq=6 err=refresh failed: offline
//! ```

use async_trait::async_trait;

use crate::{events::{RefreshEvent, Status}, listeners::RefreshListener, results::ResultAction};

/// Tracing-backed listener.
#[derive(Debug, Default)]
pub struct LogListener;

impl LogListener {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RefreshListener for LogListener {
    async fn on_refresh_started(&self, e: &RefreshEvent) {
        tracing::info!(
            task = e.task(),
            seq = e.seq(),
            trigger = ?e.trigger(),
            subscriber = %e.subscriber(),
            roots = e.resources().len(),
            "refresh started"
        );
    }

    async fn on_refresh_done(&self, e: &RefreshEvent) -> Option<ResultAction> {
        let elapsed_ms = e.elapsed().map(|d| d.as_millis() as u64);
        match e.status() {
            Some(
                st @ Status::Completed {
                    change_count,
                    new_change_count,
                },
            ) => {
                tracing::info!(
                    task = e.task(),
                    seq = e.seq(),
                    status = st.as_label(),
                    changes = change_count,
                    new_changes = new_change_count,
                    elapsed_ms,
                    "refresh done"
                );
            }
            Some(Status::Failed(err)) => {
                tracing::error!(task = e.task(), seq = e.seq(), err = %err, "refresh failed");
            }
            Some(st @ Status::Postponed(_)) => {
                tracing::warn!(task = e.task(), seq = e.seq(), status = st.as_label(), "refresh postponed");
            }
            Some(Status::Cancelled) => {
                tracing::info!(task = e.task(), seq = e.seq(), "refresh cancelled");
            }
            None => {}
        }
        None
    }

    fn name(&self) -> &'static str {
        "LogListener"
    }
}
