//! # Authoritative out-of-sync state.

use crate::provider::{Depth, Resource, SyncChange};

/// Exposes the current out-of-sync set maintained outside the scheduler.
///
/// Used after every refresh to count out-of-sync resources within the
/// refreshed scope. The count is read from this collector rather than from the
/// changes observed during the refresh, since a refresh can leave pre-existing
/// out-of-sync resources untouched.
pub trait SyncInfoCollector: Send + Sync + 'static {
    /// Number of out-of-sync resources matching `predicate`.
    fn count_for(&self, predicate: &dyn Fn(&Resource) -> bool) -> usize;

    /// Out-of-sync entries at or below `resource` to `depth`.
    fn sync_infos(&self, resource: &Resource, depth: Depth) -> Vec<SyncChange>;
}
