//! Adaptive reminder state.
//!
//! `ReminderState` is the single mutable record behind the scheduler. All
//! transitions are pure functions of the current value and an explicit `now`,
//! so they can be driven by a simulated clock.
//!
//! ## Transitions
//!
//! ```text
//! record_intake  -> level 1, streak +1, interval +5 once the streak reaches 3
//! record_missed  -> miss streak +1, level +1 and interval -10 once it reaches 2
//! pause / resume -> pause window set / cleared together
//! ```

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

use super::escalation::EscalationLevel;
use crate::error::ValidationError;

pub const MIN_INTERVAL_MINUTES: u32 = 20;
pub const MAX_INTERVAL_MINUTES: u32 = 120;
pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

/// Compliance streak needed before the interval is lengthened.
const COMPLIANCE_STREAK_FOR_REWARD: u32 = 3;
const COMPLIANCE_REWARD_MINUTES: u32 = 5;
/// Miss streak needed before escalation kicks in.
const MISS_STREAK_FOR_ESCALATION: u32 = 2;
const ESCALATION_PENALTY_MINUTES: u32 = 10;
/// EMA smoothing for weekly adherence (span of 7 days).
const WEEKLY_ADHERENCE_ALPHA: f64 = 2.0 / (7.0 + 1.0);

/// Persistent reminder state, one instance per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderState {
    pub last_intake_at: DateTime<Local>,
    pub next_reminder_at: DateTime<Local>,
    pub escalation_level: EscalationLevel,
    pub consecutive_missed: u32,
    pub consecutive_complied: u32,
    pub current_interval_minutes: u32,
    pub paused: bool,
    #[serde(default)]
    pub paused_at: Option<DateTime<Local>>,
    /// Length of the pause window in seconds.
    #[serde(default)]
    pub pause_duration_secs: Option<i64>,
    #[serde(default)]
    pub pause_reason: Option<String>,
    pub today_shown: u32,
    pub today_complied: u32,
    /// Exponential moving average of daily compliance (0.0-1.0).
    pub weekly_adherence: f64,
    /// Last time any field changed; its date drives the daily counter reset.
    pub last_updated_at: DateTime<Local>,
}

impl ReminderState {
    /// Fresh state for a first run: last intake assumed one hour ago, level 1.
    pub fn new(now: DateTime<Local>, base_interval_minutes: u32) -> Self {
        let mut state = Self {
            last_intake_at: now - Duration::hours(1),
            next_reminder_at: now,
            escalation_level: EscalationLevel::Gentle,
            consecutive_missed: 0,
            consecutive_complied: 0,
            current_interval_minutes: clamp_interval(base_interval_minutes),
            paused: false,
            paused_at: None,
            pause_duration_secs: None,
            pause_reason: None,
            today_shown: 0,
            today_complied: 0,
            weekly_adherence: 1.0,
            last_updated_at: now,
        };
        state.next_reminder_at = state.compute_next_fire_time(now);
        state
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Delay until the next reminder: interval scaled by the escalation factor.
    pub fn next_delay(&self) -> Duration {
        let secs = self.current_interval_minutes as f64 * 60.0 * self.escalation_level.interval_factor();
        Duration::seconds(secs.round() as i64)
    }

    pub fn compute_next_fire_time(&self, now: DateTime<Local>) -> DateTime<Local> {
        now + self.next_delay()
    }

    pub fn pause_ends_at(&self) -> Option<DateTime<Local>> {
        match (self.paused, self.paused_at, self.pause_duration_secs) {
            (true, Some(at), Some(secs)) => {
                Duration::try_seconds(secs).and_then(|d| at.checked_add_signed(d))
            }
            _ => None,
        }
    }

    /// A pause whose end cannot be computed counts as expired.
    pub fn is_pause_expired(&self, now: DateTime<Local>) -> bool {
        self.paused && self.pause_ends_at().map(|end| now >= end).unwrap_or(true)
    }

    /// Time left in the pause window, zero when expired or not paused.
    pub fn pause_remaining(&self, now: DateTime<Local>) -> Duration {
        self.pause_ends_at()
            .map(|end| (end - now).max(Duration::zero()))
            .unwrap_or_else(Duration::zero)
    }

    pub fn minutes_since_intake(&self, now: DateTime<Local>) -> i64 {
        (now - self.last_intake_at).num_minutes().max(0)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Log a drink. Always de-escalates; sustained compliance lengthens the interval.
    pub fn record_intake(&mut self, amount_ml: u32, now: DateTime<Local>) {
        self.roll_daily_counters(now);
        self.last_intake_at = now;
        self.escalation_level = EscalationLevel::Gentle;
        self.consecutive_missed = 0;
        self.consecutive_complied += 1;
        self.today_complied += 1;
        if self.consecutive_complied >= COMPLIANCE_STREAK_FOR_REWARD {
            self.current_interval_minutes =
                clamp_interval(self.current_interval_minutes + COMPLIANCE_REWARD_MINUTES);
        }
        tracing::debug!(
            amount_ml,
            streak = self.consecutive_complied,
            interval = self.current_interval_minutes,
            "intake recorded"
        );
        self.touch(now);
    }

    /// Count an ignored or dismissed reminder. From the second miss in a row,
    /// urgency rises on both axes: level up and interval down.
    pub fn record_missed(&mut self, now: DateTime<Local>) {
        self.roll_daily_counters(now);
        self.consecutive_missed += 1;
        self.consecutive_complied = 0;
        self.today_shown += 1;
        if self.consecutive_missed >= MISS_STREAK_FOR_ESCALATION {
            self.escalation_level = self.escalation_level.raised();
            self.current_interval_minutes = clamp_interval(
                self.current_interval_minutes
                    .saturating_sub(ESCALATION_PENALTY_MINUTES),
            );
        }
        tracing::debug!(
            missed = self.consecutive_missed,
            level = self.escalation_level.as_u8(),
            interval = self.current_interval_minutes,
            "reminder missed"
        );
        self.touch(now);
    }

    /// Count a reminder that was actually delivered.
    pub fn mark_shown(&mut self, now: DateTime<Local>) {
        self.roll_daily_counters(now);
        self.today_shown += 1;
        self.touch(now);
    }

    pub fn pause(
        &mut self,
        duration: Duration,
        reason: Option<String>,
        now: DateTime<Local>,
    ) -> Result<(), ValidationError> {
        if duration <= Duration::zero() {
            return Err(ValidationError::invalid("pause_duration", "must be positive"));
        }
        if now.checked_add_signed(duration).is_none() {
            return Err(ValidationError::invalid("pause_duration", "too long"));
        }
        self.roll_daily_counters(now);
        self.paused = true;
        self.paused_at = Some(now);
        self.pause_duration_secs = Some(duration.num_seconds());
        self.pause_reason = reason;
        self.last_updated_at = now;
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Local>) {
        self.roll_daily_counters(now);
        self.paused = false;
        self.paused_at = None;
        self.pause_duration_secs = None;
        self.pause_reason = None;
        self.touch(now);
    }

    /// Reset `today_*` counters when the calendar day changed since the last
    /// update. Returns true if a rollover happened.
    pub fn roll_daily_counters(&mut self, now: DateTime<Local>) -> bool {
        if self.last_updated_at.date_naive() == now.date_naive() {
            return false;
        }
        if self.today_shown > 0 {
            let ratio = (self.today_complied as f64 / self.today_shown as f64).min(1.0);
            self.weekly_adherence = (WEEKLY_ADHERENCE_ALPHA * ratio
                + (1.0 - WEEKLY_ADHERENCE_ALPHA) * self.weekly_adherence)
                .clamp(0.0, 1.0);
        }
        self.today_shown = 0;
        self.today_complied = 0;
        self.last_updated_at = now;
        true
    }

    fn touch(&mut self, now: DateTime<Local>) {
        self.last_updated_at = now;
        self.next_reminder_at = self.compute_next_fire_time(now);
    }
}

fn clamp_interval(minutes: u32) -> u32 {
    minutes.clamp(MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    #[test]
    fn new_state_defaults() {
        let now = at(10, 0);
        let state = ReminderState::new(now, 60);
        assert_eq!(state.last_intake_at, at(9, 0));
        assert_eq!(state.escalation_level, EscalationLevel::Gentle);
        assert_eq!(state.current_interval_minutes, 60);
        assert_eq!(state.next_reminder_at, at(11, 0));
        assert!(!state.paused);
    }

    #[test]
    fn new_state_clamps_base_interval() {
        assert_eq!(ReminderState::new(at(10, 0), 5).current_interval_minutes, 20);
        assert_eq!(ReminderState::new(at(10, 0), 500).current_interval_minutes, 120);
    }

    #[test]
    fn intake_resets_escalation() {
        let mut state = ReminderState::new(at(10, 0), 60);
        state.record_missed(at(10, 5));
        state.record_missed(at(10, 10));
        assert_eq!(state.escalation_level, EscalationLevel::Nudge);

        state.record_intake(250, at(10, 20));
        assert_eq!(state.escalation_level, EscalationLevel::Gentle);
        assert_eq!(state.consecutive_missed, 0);
        assert_eq!(state.consecutive_complied, 1);
        assert_eq!(state.last_intake_at, at(10, 20));
    }

    #[test]
    fn third_consecutive_intake_lengthens_interval() {
        let mut state = ReminderState::new(at(10, 0), 60);
        state.record_intake(200, at(10, 1));
        state.record_intake(200, at(10, 2));
        assert_eq!(state.current_interval_minutes, 60);
        state.record_intake(200, at(10, 3));
        assert_eq!(state.current_interval_minutes, 65);
        state.record_intake(200, at(10, 4));
        assert_eq!(state.current_interval_minutes, 70);
        assert_eq!(state.today_complied, 4);
    }

    #[test]
    fn two_misses_escalate_and_shorten() {
        let mut state = ReminderState::new(at(10, 0), 60);
        state.record_missed(at(10, 1));
        assert_eq!(state.escalation_level, EscalationLevel::Gentle);
        assert_eq!(state.current_interval_minutes, 60);
        state.record_missed(at(10, 2));
        assert_eq!(state.escalation_level, EscalationLevel::Nudge);
        assert_eq!(state.current_interval_minutes, 50);
        assert_eq!(state.today_shown, 2);
        assert_eq!(state.consecutive_complied, 0);
    }

    #[test]
    fn interval_floor_at_twenty() {
        let mut state = ReminderState::new(at(10, 0), 25);
        state.record_missed(at(10, 1));
        state.record_missed(at(10, 2));
        assert_eq!(state.current_interval_minutes, 20);
        state.record_missed(at(10, 3));
        assert_eq!(state.current_interval_minutes, 20);
    }

    #[test]
    fn next_fire_time_follows_escalation_factor() {
        let now = at(10, 0);
        let mut state = ReminderState::new(now, 60);
        assert_eq!(state.compute_next_fire_time(now), at(11, 0));
        state.escalation_level = EscalationLevel::Nudge;
        assert_eq!(state.compute_next_fire_time(now), at(10, 48));
        state.escalation_level = EscalationLevel::Firm;
        assert_eq!(state.compute_next_fire_time(now), at(10, 36));
        state.escalation_level = EscalationLevel::Urgent;
        assert_eq!(state.compute_next_fire_time(now), at(10, 30));
    }

    #[test]
    fn transitions_recompute_next_reminder() {
        let mut state = ReminderState::new(at(10, 0), 60);
        state.record_missed(at(10, 30));
        assert_eq!(state.next_reminder_at, at(11, 30));
        state.record_intake(300, at(10, 45));
        assert_eq!(state.next_reminder_at, at(11, 45));
    }

    #[test]
    fn pause_expiry() {
        let mut state = ReminderState::new(at(10, 0), 60);
        state
            .pause(Duration::minutes(30), Some("meeting".into()), at(10, 0))
            .unwrap();
        assert!(state.paused);
        assert!(!state.is_pause_expired(at(10, 0)));
        assert_eq!(state.pause_remaining(at(10, 10)), Duration::minutes(20));
        assert!(state.is_pause_expired(at(10, 31)));
    }

    #[test]
    fn pause_rejects_non_positive_duration() {
        let mut state = ReminderState::new(at(10, 0), 60);
        assert!(state.pause(Duration::zero(), None, at(10, 0)).is_err());
        assert!(!state.paused);
    }

    #[test]
    fn pause_rejects_out_of_range_duration() {
        let mut state = ReminderState::new(at(10, 0), 60);
        let err = state.pause(Duration::days(365 * 500_000), None, at(10, 0));
        assert!(err.is_err());
        assert!(!state.paused);
        assert!(!state.is_pause_expired(at(10, 0)));
    }

    #[test]
    fn unreachable_pause_end_counts_as_expired() {
        let mut state = ReminderState::new(at(10, 0), 60);
        state.pause(Duration::minutes(30), None, at(10, 0)).unwrap();
        // As if loaded from a hand-edited state file.
        state.pause_duration_secs = Some(i64::MAX);
        assert!(state.pause_ends_at().is_none());
        assert!(state.is_pause_expired(at(10, 0)));
        assert_eq!(state.pause_remaining(at(10, 0)), Duration::zero());
    }

    #[test]
    fn resume_clears_pause_fields_together() {
        let mut state = ReminderState::new(at(10, 0), 60);
        state.pause(Duration::minutes(15), Some("lunch".into()), at(10, 0)).unwrap();
        state.resume(at(10, 5));
        assert!(!state.paused);
        assert!(state.paused_at.is_none());
        assert!(state.pause_duration_secs.is_none());
        assert!(state.pause_reason.is_none());
        assert_eq!(state.next_reminder_at, at(11, 5));
        assert!(!state.is_pause_expired(at(23, 0)));
    }

    #[test]
    fn daily_counters_reset_on_new_day() {
        let mut state = ReminderState::new(at(10, 0), 60);
        state.mark_shown(at(10, 0));
        state.mark_shown(at(11, 0));
        state.record_intake(250, at(11, 5));
        assert_eq!((state.today_shown, state.today_complied), (2, 1));

        let tomorrow = Local.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        assert!(state.roll_daily_counters(tomorrow));
        assert_eq!((state.today_shown, state.today_complied), (0, 0));
        // 0.25 * 0.5 + 0.75 * 1.0
        assert!((state.weekly_adherence - 0.875).abs() < 1e-9);
        assert!(!state.roll_daily_counters(tomorrow));
    }

    #[test]
    fn serde_roundtrip_preserves_pause() {
        let mut state = ReminderState::new(at(10, 0), 60);
        state.pause(Duration::minutes(45), None, at(10, 0)).unwrap();
        let json = serde_json::to_string(&state).unwrap();
        let parsed: ReminderState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
        assert!(json.contains("\"escalation_level\":\"gentle\""));
    }
}
