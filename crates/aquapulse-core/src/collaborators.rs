//! Interfaces the reminder engine consumes.
//!
//! The engine never renders notifications, stores data, or probes the OS
//! itself. Callers inject implementations of these traits at construction.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{CoreError, Result};
use crate::reminder::{EscalationLevel, ReminderState};
use crate::settings::ReminderSettings;

/// Source of scheduler settings.
pub trait SettingsProvider: Send + Sync {
    fn load(&self) -> Result<ReminderSettings>;
}

/// Fixed settings handed in by the caller.
impl SettingsProvider for ReminderSettings {
    fn load(&self) -> Result<ReminderSettings> {
        Ok(self.clone())
    }
}

/// Inputs handed to the suppression oracle on every timer fire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuppressionQuery {
    pub now: DateTime<Local>,
    /// Idle and focus signals apply only when set
    pub smart_pause_enabled: bool,
    pub circadian_enabled: bool,
    pub weather_enabled: bool,
}

/// Decides whether now is a bad moment to interrupt (idle, presenting,
/// night). The engine treats the answer as opaque; an `Err` counts as
/// "do not suppress".
pub trait SuppressionOracle: Send + Sync {
    fn should_suppress(&self, query: &SuppressionQuery) -> Result<bool>;
}

/// Oracle that never suppresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSuppress;

impl SuppressionOracle for NeverSuppress {
    fn should_suppress(&self, _query: &SuppressionQuery) -> Result<bool> {
        Ok(false)
    }
}

/// Payload emitted when a reminder becomes due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderDue {
    pub message: String,
    /// Disruption level to render at (already capped by settings)
    pub escalation_level: EscalationLevel,
    pub minutes_since_intake: i64,
    pub at: DateTime<Local>,
}

/// Receives "reminder due" signals. Delivery is fire-and-forget from the
/// engine's point of view; an `Err` makes the engine retry later.
pub trait NotificationSink: Send + Sync {
    fn on_reminder_due(&self, reminder: &ReminderDue) -> Result<()>;
}

/// Forwards reminders into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ReminderDue>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReminderDue>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn on_reminder_due(&self, reminder: &ReminderDue) -> Result<()> {
        self.tx
            .send(reminder.clone())
            .map_err(|_| CoreError::Notification("reminder receiver dropped".into()))
    }
}

/// Durable home for the reminder state.
pub trait StatePersistence: Send + Sync {
    fn save(&self, state: &ReminderState) -> Result<()>;
    fn load(&self) -> Result<Option<ReminderState>>;
}
