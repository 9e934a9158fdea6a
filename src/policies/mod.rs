//! Scheduling policies.
//!
//! ## Contents
//! - [`JitterPolicy`] randomization of the normal refresh interval
//!
//! ## Quick wiring
//! ```text
//! SchedulerConfig { interval, jitter, .. }
//!      └─► core::transition::on_task_finished()
//!           - Postponed → postpone_delay (never jittered)
//!           - otherwise → jitter.apply(settings.interval())
//! ```

mod jitter;

pub use jitter::JitterPolicy;
