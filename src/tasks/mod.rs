//! # Refresh tasks.
//!
//! This module provides the task-related types:
//! - [`RefreshTask`] - named, resource-scoped refresh of one subscriber with its reschedule policy
//! - [`TaskState`] - lifecycle state of a task
//! - [`Family`] - tag grouping tasks for bulk lookup and cancellation
//! - [`TaskId`] - process-unique task identity

mod family;
mod refresh;
mod state;

pub use family::Family;
pub use refresh::{RefreshTask, TaskId, TaskRef};
pub use state::TaskState;
