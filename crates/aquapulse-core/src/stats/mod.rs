//! Statistics module for AquaPulse
//!
//! Derived hydration metrics. Nothing here is persisted; every report is
//! recomputed from the intake log and the reminder counters.

mod daily;

pub use daily::{DailyStats, IntakeEvent, IntakeSource};
