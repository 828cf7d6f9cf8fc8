mod escalation;
mod messages;
mod state;

pub use escalation::EscalationLevel;
pub use messages::{bucket_for, overdue_threshold_minutes, reminder_message, ElapsedBucket};
pub use state::{
    ReminderState, DEFAULT_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES,
};
