//! Built-in suppression oracle.
//!
//! `SmartSuppression` aggregates three signals:
//! - **Idle**: the user has been away from the keyboard for a while
//! - **Focus**: a presentation or fullscreen app is in the foreground
//! - **Circadian**: the local time falls inside the night window
//!
//! Idle and focus detection are platform-specific and injected, and only
//! consulted when smart pause is on. A detector that fails is logged and
//! counted as "not suppressing"; the other signals are still consulted.

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::collaborators::{SuppressionOracle, SuppressionQuery};
use crate::error::Result;

/// Reports how long the system has been idle.
pub trait IdleDetector: Send + Sync {
    fn idle_duration(&self) -> Result<Duration>;
}

/// Reports whether the user is presenting or in a fullscreen app.
pub trait FocusDetector: Send + Sync {
    fn is_presenting(&self) -> Result<bool>;
}

/// Night window during which reminders are held back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircadianWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl Default for CircadianWindow {
    fn default() -> Self {
        Self {
            start_hour: 22,
            end_hour: 7,
        }
    }
}

impl CircadianWindow {
    pub fn contains(&self, time: NaiveTime) -> bool {
        let hour = time.hour();
        let (start, end) = (self.start_hour as u32, self.end_hour as u32);

        // Overnight window (e.g., 22:00 - 07:00)
        if start > end {
            return hour >= start || hour < end;
        }

        hour >= start && hour < end
    }
}

pub struct SmartSuppression {
    idle: Option<Box<dyn IdleDetector>>,
    focus: Option<Box<dyn FocusDetector>>,
    idle_threshold: Duration,
    night: CircadianWindow,
}

impl Default for SmartSuppression {
    fn default() -> Self {
        Self {
            idle: None,
            focus: None,
            idle_threshold: Duration::minutes(5),
            night: CircadianWindow::default(),
        }
    }
}

impl SmartSuppression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_detector(mut self, detector: impl IdleDetector + 'static, threshold: Duration) -> Self {
        self.idle = Some(Box::new(detector));
        self.idle_threshold = threshold;
        self
    }

    pub fn with_focus_detector(mut self, detector: impl FocusDetector + 'static) -> Self {
        self.focus = Some(Box::new(detector));
        self
    }

    pub fn with_night_window(mut self, night: CircadianWindow) -> Self {
        self.night = night;
        self
    }

    fn user_idle(&self) -> bool {
        let Some(detector) = &self.idle else {
            return false;
        };
        match detector.idle_duration() {
            Ok(idle) => idle >= self.idle_threshold,
            Err(e) => {
                tracing::warn!("idle detection failed, not suppressing: {e}");
                false
            }
        }
    }

    fn user_presenting(&self) -> bool {
        let Some(detector) = &self.focus else {
            return false;
        };
        match detector.is_presenting() {
            Ok(presenting) => presenting,
            Err(e) => {
                tracing::warn!("focus detection failed, not suppressing: {e}");
                false
            }
        }
    }
}

impl SuppressionOracle for SmartSuppression {
    fn should_suppress(&self, query: &SuppressionQuery) -> Result<bool> {
        if query.circadian_enabled && self.night.contains(query.now.time()) {
            tracing::debug!("suppressed: night window");
            return Ok(true);
        }
        if !query.smart_pause_enabled {
            return Ok(false);
        }
        if self.user_presenting() {
            tracing::debug!("suppressed: presenting");
            return Ok(true);
        }
        if self.user_idle() {
            tracing::debug!("suppressed: idle");
            return Ok(true);
        }
        Ok(false)
    }
}
