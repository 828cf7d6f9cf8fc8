//! Work-hours clamping.
//!
//! Outside the configured window reminders are deferred to the next window
//! start: later today if the window has not opened yet, otherwise tomorrow.
//! Weekends are not skipped.

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone};

use crate::settings::ReminderSettings;

/// Start of the next work-hours window strictly relevant to `now`.
pub fn next_work_start(now: DateTime<Local>, settings: &ReminderSettings) -> DateTime<Local> {
    let start = settings.work_hours_start;
    let day = if now.time() < start {
        now.date_naive()
    } else {
        now.date_naive() + Duration::days(1)
    };
    to_local(day.and_time(start)).unwrap_or_else(|| now + Duration::hours(1))
}

fn to_local(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&naive).earliest()
}
