#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

pub mod alarm;
pub mod audio;
pub mod communication;
pub mod config;
/// the thread that owns the scheduler
pub mod daemon;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod notify;
pub mod registry;
/// the alarm state machine
pub mod scheduler;
pub mod store;
pub mod ticker;
pub mod weekday;

#[cfg(test)]
mod testing;

pub use alarm::{Alarm, AlarmSpec, RANDOM_MELODY};
pub use communication::Handle;
pub use config::Config;
pub use events::{AlarmEvent, EventBus};
pub use scheduler::{Scheduler, SessionState, Settings};
