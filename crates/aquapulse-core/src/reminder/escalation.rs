//! Reminder escalation levels.
//!
//! Escalation encodes how disruptive the next reminder should be. It rises
//! when reminders are ignored and drops back to [`EscalationLevel::Gentle`]
//! on every logged intake.
//!
//! | level | name   | next-fire factor | auto-escalation grace |
//! |-------|--------|------------------|-----------------------|
//! | 1     | Gentle | 1.0              | 10 min                |
//! | 2     | Nudge  | 0.8              | 7 min                 |
//! | 3     | Firm   | 0.6              | 5 min                 |
//! | 4     | Urgent | 0.5              | 3 min                 |

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Reminder escalation level (1 = gentle, 4 = urgent).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationLevel {
    #[default]
    Gentle,
    Nudge,
    Firm,
    Urgent,
}

impl EscalationLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    /// Numeric level value (1-4)
    pub fn as_u8(self) -> u8 {
        match self {
            EscalationLevel::Gentle => 1,
            EscalationLevel::Nudge => 2,
            EscalationLevel::Firm => 3,
            EscalationLevel::Urgent => 4,
        }
    }

    /// Convert from a numeric level, clamping into 1-4.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 | 1 => EscalationLevel::Gentle,
            2 => EscalationLevel::Nudge,
            3 => EscalationLevel::Firm,
            _ => EscalationLevel::Urgent,
        }
    }

    /// One level more urgent, saturating at `Urgent`.
    pub fn raised(self) -> Self {
        Self::from_u8(self.as_u8() + 1)
    }

    /// Multiplier applied to the adaptive interval when computing the next fire time.
    pub fn interval_factor(self) -> f64 {
        match self {
            EscalationLevel::Gentle => 1.0,
            EscalationLevel::Nudge => 0.8,
            EscalationLevel::Firm => 0.6,
            EscalationLevel::Urgent => 0.5,
        }
    }

    /// How long a shown reminder may go unanswered before it counts as missed.
    pub fn grace_period(self) -> Duration {
        match self {
            EscalationLevel::Gentle => Duration::minutes(10),
            EscalationLevel::Nudge => Duration::minutes(7),
            EscalationLevel::Firm => Duration::minutes(5),
            EscalationLevel::Urgent => Duration::minutes(3),
        }
    }

    /// Level as delivered to the notification sink, limited by the user's
    /// maximum disruption setting.
    pub fn capped_at(self, max_disruption_level: u8) -> Self {
        Self::from_u8(self.as_u8().min(max_disruption_level.max(Self::MIN)))
    }

    pub fn label(self) -> &'static str {
        match self {
            EscalationLevel::Gentle => "gentle",
            EscalationLevel::Nudge => "nudge",
            EscalationLevel::Firm => "firm",
            EscalationLevel::Urgent => "urgent",
        }
    }
}
