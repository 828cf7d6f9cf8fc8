//! Daily hydration quality metrics.
//!
//! `DailyStats` is always derived from a day's intake events plus the goal
//! and reminder counters; it is never stored as the source of truth.
//!
//! The quality score blends three 0.0-1.0 components:
//! - **Goal completion** (weight 0.4): volume relative to the daily goal
//! - **Consistency** (weight 0.3): short gaps and intake spread over many hours
//! - **Compliance** (weight 0.3): reminders answered with a drink

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const GOAL_WEIGHT: f64 = 0.4;
const CONSISTENCY_WEIGHT: f64 = 0.3;
const COMPLIANCE_WEIGHT: f64 = 0.3;
/// A gap this long (or longer) zeroes the gap component.
const GAP_PENALTY_HOURS: f64 = 12.0;
/// Distinct drinking hours needed for a full distribution score.
const DISTRIBUTION_TARGET_HOURS: f64 = 12.0;

/// Where an intake entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeSource {
    /// Logged by hand
    Manual,
    /// Logged in response to a reminder
    Reminder,
    /// One-tap preset amount
    QuickAdd,
    /// Imported from another tracker
    Import,
}

impl IntakeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            IntakeSource::Manual => "manual",
            IntakeSource::Reminder => "reminder",
            IntakeSource::QuickAdd => "quick_add",
            IntakeSource::Import => "import",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(IntakeSource::Manual),
            "reminder" => Some(IntakeSource::Reminder),
            "quick_add" => Some(IntakeSource::QuickAdd),
            "import" => Some(IntakeSource::Import),
            _ => None,
        }
    }
}

/// A single logged drink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeEvent {
    pub at: DateTime<Local>,
    pub amount_ml: u32,
    pub source: IntakeSource,
}

impl IntakeEvent {
    pub fn new(at: DateTime<Local>, amount_ml: u32, source: IntakeSource) -> Self {
        Self {
            at,
            amount_ml,
            source,
        }
    }
}

/// Derived hydration metrics for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: Option<NaiveDate>,
    pub goal_ml: u32,
    pub total_intake_ml: u64,
    pub entry_count: u32,
    pub average_intake_ml: f64,
    pub first_intake: Option<NaiveTime>,
    pub last_intake: Option<NaiveTime>,
    /// Hour of day (0-23) with the most volume; earliest hour wins ties
    pub peak_hour: Option<u32>,
    pub longest_gap_hours: f64,
    /// Volume per hour of day
    pub by_hour: BTreeMap<u32, u64>,
    /// Volume per intake source
    pub by_source: BTreeMap<IntakeSource, u64>,
    pub reminders_shown: u32,
    pub reminders_complied: u32,
    /// Total relative to goal, capped at 1.0
    pub goal_completion_percentage: f64,
    pub goal_achieved: bool,
    pub consistency_score: f64,
    pub compliance_rate: f64,
    pub quality_score: f64,
}

impl DailyStats {
    /// Compute stats from a day's intake events.
    ///
    /// Events may arrive in any order. An empty slice yields zero totals with
    /// the given goal.
    pub fn calculate(
        date: NaiveDate,
        events: &[IntakeEvent],
        goal_ml: u32,
        reminders_shown: u32,
        reminders_complied: u32,
    ) -> Self {
        let compliance_rate = compliance_rate(reminders_shown, reminders_complied);
        let mut stats = DailyStats {
            date: Some(date),
            goal_ml,
            reminders_shown,
            reminders_complied,
            compliance_rate,
            ..Default::default()
        };

        if events.is_empty() {
            stats.quality_score = COMPLIANCE_WEIGHT * compliance_rate;
            return stats;
        }

        let mut times: Vec<NaiveTime> = events.iter().map(|e| e.at.time()).collect();
        times.sort();

        // Sums are u64 so a day of maximal u32 amounts cannot overflow.
        for event in events {
            let ml = u64::from(event.amount_ml);
            stats.total_intake_ml = stats.total_intake_ml.saturating_add(ml);
            let hour = stats.by_hour.entry(event.at.hour()).or_insert(0);
            *hour = hour.saturating_add(ml);
            let source = stats.by_source.entry(event.source).or_insert(0);
            *source = source.saturating_add(ml);
        }
        stats.entry_count = events.len() as u32;
        stats.average_intake_ml = stats.total_intake_ml as f64 / events.len() as f64;
        stats.first_intake = times.first().copied();
        stats.last_intake = times.last().copied();
        stats.peak_hour = stats
            .by_hour
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(hour, _)| *hour);
        stats.longest_gap_hours = longest_gap_hours(&times);

        stats.goal_completion_percentage = if goal_ml == 0 {
            0.0
        } else {
            (stats.total_intake_ml as f64 / goal_ml as f64).min(1.0)
        };
        stats.goal_achieved = goal_ml > 0 && stats.total_intake_ml >= u64::from(goal_ml);

        let gap_score = (1.0 - stats.longest_gap_hours / GAP_PENALTY_HOURS).max(0.0);
        let distinct_hours = stats.by_hour.len() as f64;
        let distribution_score = (distinct_hours / DISTRIBUTION_TARGET_HOURS).min(1.0);
        stats.consistency_score = (gap_score + distribution_score) / 2.0;

        stats.quality_score = GOAL_WEIGHT * stats.goal_completion_percentage
            + CONSISTENCY_WEIGHT * stats.consistency_score
            + COMPLIANCE_WEIGHT * compliance_rate;
        stats
    }
}

fn compliance_rate(shown: u32, complied: u32) -> f64 {
    if shown == 0 {
        0.0
    } else {
        (complied as f64 / shown as f64).min(1.0)
    }
}

/// Largest delta between consecutive sorted times. A negative delta is
/// treated as crossing midnight once.
fn longest_gap_hours(sorted: &[NaiveTime]) -> f64 {
    sorted
        .windows(2)
        .map(|pair| {
            let mut secs = (pair[1] - pair[0]).num_seconds();
            if secs < 0 {
                secs += 24 * 3600;
            }
            secs as f64 / 3600.0
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(h: u32, m: u32, ml: u32, source: IntakeSource) -> IntakeEvent {
        IntakeEvent::new(
            Local.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap(),
            ml,
            source,
        )
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_empty_events() {
        let stats = DailyStats::calculate(day(), &[], 2000, 0, 0);
        assert_eq!(stats.total_intake_ml, 0);
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.goal_ml, 2000);
        assert!(!stats.goal_achieved);
        assert!(stats.peak_hour.is_none());
        assert_eq!(stats.quality_score, 0.0);
    }

    #[test]
    fn test_goal_reached_exactly() {
        let events = vec![
            event(9, 0, 300, IntakeSource::Manual),
            event(11, 0, 300, IntakeSource::Manual),
            event(13, 0, 300, IntakeSource::Reminder),
        ];
        let stats = DailyStats::calculate(day(), &events, 900, 3, 3);
        assert_eq!(stats.total_intake_ml, 900);
        assert_eq!(stats.goal_completion_percentage, 1.0);
        assert!(stats.goal_achieved);
        assert_eq!(stats.average_intake_ml, 300.0);
    }

    #[test]
    fn test_longest_gap() {
        let events = vec![
            event(14, 0, 200, IntakeSource::Manual),
            event(8, 0, 200, IntakeSource::Manual),
            event(8, 30, 200, IntakeSource::Manual),
        ];
        let stats = DailyStats::calculate(day(), &events, 2000, 0, 0);
        assert!((stats.longest_gap_hours - 5.5).abs() < 1e-9);
        assert_eq!(stats.first_intake, NaiveTime::from_hms_opt(8, 0, 0));
        assert_eq!(stats.last_intake, NaiveTime::from_hms_opt(14, 0, 0));
    }

    #[test]
    fn test_negative_delta_wraps_once() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        // Unsorted input exercises the midnight wrap: 23:00 -> 01:00 is 2h.
        assert!((longest_gap_hours(&[t(23, 0), t(1, 0)]) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_event_has_no_gap() {
        let stats = DailyStats::calculate(day(), &[event(10, 0, 250, IntakeSource::Manual)], 2000, 0, 0);
        assert_eq!(stats.longest_gap_hours, 0.0);
        assert_eq!(stats.peak_hour, Some(10));
    }

    #[test]
    fn test_breakdowns() {
        let events = vec![
            event(9, 0, 200, IntakeSource::Manual),
            event(9, 45, 300, IntakeSource::QuickAdd),
            event(15, 0, 400, IntakeSource::Reminder),
        ];
        let stats = DailyStats::calculate(day(), &events, 2000, 0, 0);
        assert_eq!(stats.by_hour.get(&9), Some(&500));
        assert_eq!(stats.by_hour.get(&15), Some(&400));
        assert_eq!(stats.by_source.get(&IntakeSource::QuickAdd), Some(&300));
        assert_eq!(stats.by_source.get(&IntakeSource::Import), None);
        assert_eq!(stats.peak_hour, Some(9));
    }

    #[test]
    fn test_peak_hour_tie_prefers_earlier() {
        let events = vec![
            event(16, 0, 250, IntakeSource::Manual),
            event(10, 0, 250, IntakeSource::Manual),
        ];
        let stats = DailyStats::calculate(day(), &events, 2000, 0, 0);
        assert_eq!(stats.peak_hour, Some(10));
    }

    #[test]
    fn test_quality_score_weights() {
        // 12 distinct hours, 1h gaps, goal met, every reminder answered.
        let events: Vec<IntakeEvent> = (8..20)
            .map(|h| event(h, 0, 200, IntakeSource::Reminder))
            .collect();
        let stats = DailyStats::calculate(day(), &events, 2000, 4, 4);
        let expected_consistency = ((1.0 - 1.0 / 12.0) + 1.0) / 2.0;
        assert!((stats.consistency_score - expected_consistency).abs() < 1e-9);
        assert_eq!(stats.compliance_rate, 1.0);
        let expected = 0.4 + 0.3 * expected_consistency + 0.3;
        assert!((stats.quality_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zero_goal_never_achieved() {
        let stats = DailyStats::calculate(day(), &[event(10, 0, 250, IntakeSource::Manual)], 0, 0, 0);
        assert_eq!(stats.goal_completion_percentage, 0.0);
        assert!(!stats.goal_achieved);
    }

    #[test]
    fn test_huge_amounts_do_not_overflow() {
        let events = vec![
            event(9, 0, u32::MAX, IntakeSource::Import),
            event(9, 30, 2, IntakeSource::Import),
        ];
        let stats = DailyStats::calculate(day(), &events, 2000, 0, 0);
        let expected = u64::from(u32::MAX) + 2;
        assert_eq!(stats.total_intake_ml, expected);
        assert_eq!(stats.by_hour.get(&9), Some(&expected));
        assert_eq!(stats.by_source.get(&IntakeSource::Import), Some(&expected));
        assert!(stats.goal_achieved);
        assert_eq!(stats.goal_completion_percentage, 1.0);
    }

    #[test]
    fn test_serialization() {
        let stats = DailyStats::calculate(day(), &[event(10, 0, 250, IntakeSource::Manual)], 2000, 1, 1);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("total_intake_ml"));
        let parsed: DailyStats = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_intake_ml, 250);
    }
}
