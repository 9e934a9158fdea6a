//! Scheduler core: orchestration and lifecycle.
//!
//! The public API of this module is [`TaskScheduler`] (built through
//! [`SchedulerBuilder`]), its [`SchedulerConfig`], the runtime-mutable
//! [`RefreshSettings`] and the [`RefreshOutcome`] of a foreground run.
//!
//! Internal modules:
//! - [`runner`]: executes one refresh under the lock and classifies it;
//! - [`classify`]: maps the facts of a run to its status;
//! - [`transition`]: decides what happens after a run;
//! - [`actor`]: drives one task through sleep / run / reschedule;
//! - [`registry`]: tracks live actors.

mod actor;
mod builder;
mod classify;
mod config;
mod context;
mod registry;
mod runner;
mod scheduler;
mod settings;
mod transition;

#[cfg(test)]
mod scheduler_tests;

pub use builder::SchedulerBuilder;
pub use config::{
    DEFAULT_BLOCKING_THRESHOLD, DEFAULT_INTERVAL, DEFAULT_LOCK_POLL, DEFAULT_POSTPONE_DELAY,
    SchedulerConfig,
};
pub use runner::RefreshOutcome;
pub use scheduler::TaskScheduler;
pub use settings::RefreshSettings;
