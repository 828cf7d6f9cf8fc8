//! Scheduler settings as consumed by the reminder engine.
//!
//! These are the validated, typed values the engine works with. The on-disk
//! representation lives in [`crate::storage::Config`].

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::reminder::{EscalationLevel, DEFAULT_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES};

pub const DEFAULT_DAILY_GOAL_ML: u32 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderSettings {
    /// Seed interval for a fresh reminder state (20-120 minutes)
    pub base_interval_minutes: u32,
    pub work_hours_start: NaiveTime,
    pub work_hours_end: NaiveTime,
    /// Highest escalation level delivered to the notification sink (1-4)
    pub max_disruption_level: u8,
    /// Consult the suppression oracle before showing a reminder
    pub smart_pause_enabled: bool,
    pub circadian_enabled: bool,
    pub weather_enabled: bool,
    pub daily_goal_ml: u32,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            base_interval_minutes: DEFAULT_INTERVAL_MINUTES,
            work_hours_start: hm(9, 0),
            work_hours_end: hm(17, 0),
            max_disruption_level: EscalationLevel::MAX,
            smart_pause_enabled: true,
            circadian_enabled: true,
            weather_enabled: false,
            daily_goal_ml: DEFAULT_DAILY_GOAL_ML,
        }
    }
}

impl ReminderSettings {
    /// Reject values the engine cannot honor.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&self.base_interval_minutes) {
            return Err(ValidationError::invalid(
                "base_interval_minutes",
                format!(
                    "{} is outside {}-{}",
                    self.base_interval_minutes, MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES
                ),
            ));
        }
        if self.work_hours_start >= self.work_hours_end {
            return Err(ValidationError::InvalidWorkHours {
                start: self.work_hours_start,
                end: self.work_hours_end,
            });
        }
        if !(EscalationLevel::MIN..=EscalationLevel::MAX).contains(&self.max_disruption_level) {
            return Err(ValidationError::invalid(
                "max_disruption_level",
                format!("{} is outside 1-4", self.max_disruption_level),
            ));
        }
        if self.daily_goal_ml == 0 {
            return Err(ValidationError::invalid("daily_goal_ml", "must be positive"));
        }
        Ok(())
    }

    pub fn is_within_work_hours(&self, time: NaiveTime) -> bool {
        time >= self.work_hours_start && time < self.work_hours_end
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Format a time the way the config file stores it ("HH:MM").
pub fn format_hhmm(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}
