//! # Task families.
//!
//! A [`Family`] groups tasks so external code can find, cancel or join all
//! refresh tasks of a subscriber or participant without holding the tasks.

use std::{fmt, sync::Arc};

use crate::{provider::SubscriberId, tasks::TaskId};

/// Tag used to select a group of tasks.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// Every refresh task.
    Refresh,
    /// Tasks refreshing the given subscriber.
    Subscriber(SubscriberId),
    /// Tasks owned by the given participant.
    Participant(Arc<str>),
    /// Exactly one task.
    Task(TaskId),
}

impl Family {
    pub fn participant(id: impl Into<Arc<str>>) -> Self {
        Family::Participant(id.into())
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Refresh => f.write_str("refresh"),
            Family::Subscriber(id) => write!(f, "subscriber:{id}"),
            Family::Participant(id) => write!(f, "participant:{id}"),
            Family::Task(id) => write!(f, "task:{id}"),
        }
    }
}
