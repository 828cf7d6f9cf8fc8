pub mod completions;
pub mod config;
pub mod reminder;
pub mod run;
pub mod stats;

use std::sync::Arc;

use aquapulse_core::storage::ConfigSettings;
use aquapulse_core::{
    Database, NotificationSink, ReminderDue, ReminderScheduler, SchedulerDeps, SmartSuppression,
};

/// Prints each due reminder as one JSON line on stdout.
pub struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn on_reminder_due(&self, reminder: &ReminderDue) -> aquapulse_core::Result<()> {
        println!("{}", serde_json::to_string(reminder)?);
        Ok(())
    }
}

pub fn build_scheduler(db: Arc<Database>) -> ReminderScheduler {
    let deps = SchedulerDeps::new(
        Arc::new(ConfigSettings::new()),
        Arc::new(SmartSuppression::new()),
        Arc::new(StdoutSink),
        db,
    );
    ReminderScheduler::new(deps)
}

pub fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
