//! Reminder message selection.
//!
//! Messages are picked from a fixed table indexed by escalation level and by
//! whether the time since the last drink is below or above that level's
//! threshold. `{minutes}` is filled in with the elapsed minutes and `{hours}`
//! with whole elapsed hours including the unit ("1 hour", "3 hours").

use super::escalation::EscalationLevel;

/// Whether the user drank recently relative to the level's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElapsedBucket {
    Recent,
    Overdue,
}

/// Minutes since last intake at which each level switches to its "overdue" wording.
const OVERDUE_THRESHOLD_MINUTES: [i64; 4] = [60, 90, 120, 150];

const MESSAGE_TABLE: [[&str; 2]; 4] = [
    [
        "Time for a sip of water.",
        "It's been {minutes} minutes since your last drink. Grab some water.",
    ],
    [
        "Quick reminder: your water is waiting.",
        "Over {hours} without water. Take a proper drink now.",
    ],
    [
        "You've skipped a few reminders. Please drink some water.",
        "{hours} without a drink. Stop for a glass of water.",
    ],
    [
        "Hydration check! Drink a full glass now.",
        "Urgent: {hours} without water. Drink before you continue.",
    ],
];

pub fn overdue_threshold_minutes(level: EscalationLevel) -> i64 {
    OVERDUE_THRESHOLD_MINUTES[(level.as_u8() - 1) as usize]
}

pub fn bucket_for(level: EscalationLevel, minutes_since_intake: i64) -> ElapsedBucket {
    if minutes_since_intake >= overdue_threshold_minutes(level) {
        ElapsedBucket::Overdue
    } else {
        ElapsedBucket::Recent
    }
}

/// Build the reminder text for a level and elapsed time.
pub fn reminder_message(level: EscalationLevel, minutes_since_intake: i64) -> String {
    let row = &MESSAGE_TABLE[(level.as_u8() - 1) as usize];
    let template = match bucket_for(level, minutes_since_intake) {
        ElapsedBucket::Recent => row[0],
        ElapsedBucket::Overdue => row[1],
    };
    template
        .replace("{minutes}", &minutes_since_intake.to_string())
        .replace("{hours}", &hours_phrase(minutes_since_intake / 60))
}

fn hours_phrase(hours: i64) -> String {
    if hours == 1 {
        "1 hour".to_string()
    } else {
        format!("{hours} hours")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gentle_recent_uses_short_wording() {
        assert_eq!(
            reminder_message(EscalationLevel::Gentle, 30),
            "Time for a sip of water."
        );
    }

    #[test]
    fn gentle_overdue_mentions_minutes() {
        assert_eq!(
            reminder_message(EscalationLevel::Gentle, 75),
            "It's been 75 minutes since your last drink. Grab some water."
        );
    }

    #[test]
    fn threshold_is_per_level() {
        assert_eq!(bucket_for(EscalationLevel::Gentle, 90), ElapsedBucket::Overdue);
        assert_eq!(bucket_for(EscalationLevel::Firm, 90), ElapsedBucket::Recent);
        assert_eq!(bucket_for(EscalationLevel::Urgent, 150), ElapsedBucket::Overdue);
    }

    #[test]
    fn urgent_overdue_mentions_hours() {
        let msg = reminder_message(EscalationLevel::Urgent, 200);
        assert!(msg.starts_with("Urgent: 3 hours"));
    }

    #[test]
    fn single_hour_is_singular() {
        assert_eq!(
            reminder_message(EscalationLevel::Nudge, 90),
            "Over 1 hour without water. Take a proper drink now."
        );
        assert_eq!(
            reminder_message(EscalationLevel::Firm, 120),
            "2 hours without a drink. Stop for a glass of water."
        );
    }

    #[test]
    fn every_cell_is_distinct() {
        let mut all: Vec<&str> = MESSAGE_TABLE.iter().flatten().copied().collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 8);
    }
}
