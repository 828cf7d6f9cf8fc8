//! # AquaPulse Core Library
//!
//! Core logic for the AquaPulse hydration reminder. The CLI binary and any
//! desktop shell are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Reminder state**: the adaptive interval and escalation level, updated
//!   by explicit transitions (`record_intake`, `record_missed`, `pause`, ...)
//! - **Scheduler**: an async engine that owns the state and drives a main
//!   timer plus an auto-escalation timer on the tokio runtime
//! - **Suppression**: idle / presenting / night signals consulted before a
//!   reminder is shown
//! - **Stats**: derived daily hydration metrics
//! - **Storage**: SQLite intake log and state, TOML configuration
//!
//! ## Key Components
//!
//! - [`ReminderScheduler`]: the engine
//! - [`ReminderState`]: persisted adaptive state
//! - [`DailyStats`]: per-day report
//! - [`Database`]: intake log and state persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod collaborators;
pub mod error;
pub mod reminder;
pub mod scheduler;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod suppression;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{
    ChannelSink, NeverSuppress, NotificationSink, ReminderDue, SettingsProvider,
    StatePersistence, SuppressionOracle, SuppressionQuery,
};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use reminder::{EscalationLevel, ReminderState};
pub use scheduler::{FireOutcome, ReminderScheduler, RunState, SchedulerDeps};
pub use settings::ReminderSettings;
pub use stats::{DailyStats, IntakeEvent, IntakeSource};
pub use storage::{Config, Database};
pub use suppression::{CircadianWindow, FocusDetector, IdleDetector, SmartSuppression};
