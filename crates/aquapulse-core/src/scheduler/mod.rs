//! Reminder scheduling: the engine, its timers, and work-hours clamping.

mod engine;
mod timer;
mod work_hours;

pub use engine::{
    FireOutcome, ReminderScheduler, RunState, SchedulerDeps, ERROR_RETRY_MINUTES,
    MIN_FIRE_DELAY_MINUTES, SUPPRESSED_RETRY_MINUTES,
};
pub use work_hours::next_work_start;
