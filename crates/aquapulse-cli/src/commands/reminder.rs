use std::sync::Arc;

use chrono::{Duration, Local};
use clap::Subcommand;
use serde::Serialize;

use aquapulse_core::reminder::reminder_message;
use aquapulse_core::{Database, IntakeEvent, IntakeSource, ReminderScheduler};

use super::{build_scheduler, runtime};

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Print the reminder state as JSON
    Status,
    /// When the next reminder is due and what it will say
    Next,
    /// Log a drink
    Intake {
        /// Amount in milliliters
        amount_ml: u32,
        /// manual, reminder, quick_add or import
        #[arg(long, default_value = "manual")]
        source: String,
    },
    /// Dismiss the current reminder without drinking
    Dismiss,
    /// Hold reminders for a while
    Pause {
        /// Pause length in minutes
        minutes: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    /// End a pause early
    Resume,
}

#[derive(Serialize)]
struct NextReminder {
    next_reminder_at: chrono::DateTime<Local>,
    minutes_until: i64,
    interval_minutes: u32,
    escalation_level: u8,
    paused: bool,
    message: String,
}

pub fn run(action: ReminderAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(Database::open()?);
    let scheduler = build_scheduler(db.clone());
    runtime()?.block_on(execute(action, &scheduler, &db))
}

async fn execute(
    action: ReminderAction,
    scheduler: &ReminderScheduler,
    db: &Database,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = match action {
        ReminderAction::Status => scheduler.get_state().await,
        ReminderAction::Next => {
            let state = scheduler.get_state().await;
            let next = NextReminder {
                next_reminder_at: state.next_reminder_at,
                minutes_until: (state.next_reminder_at - Local::now()).num_minutes().max(0),
                interval_minutes: state.current_interval_minutes,
                escalation_level: state.escalation_level.as_u8(),
                paused: state.paused,
                message: reminder_message(
                    state.escalation_level,
                    state.minutes_since_intake(state.next_reminder_at),
                ),
            };
            println!("{}", serde_json::to_string_pretty(&next)?);
            return Ok(());
        }
        ReminderAction::Intake { amount_ml, source } => {
            if amount_ml == 0 {
                return Err("amount must be positive".into());
            }
            let source = IntakeSource::parse(&source)
                .ok_or_else(|| format!("unknown intake source: {source}"))?;
            let state = scheduler.record_intake(amount_ml).await?;
            db.record_intake(&IntakeEvent::new(state.last_intake_at, amount_ml, source))?;
            state
        }
        ReminderAction::Dismiss => scheduler.record_dismissed().await?,
        ReminderAction::Pause { minutes, reason } => {
            let duration = Duration::try_minutes(minutes).ok_or("pause length out of range")?;
            scheduler.pause(duration, reason).await?;
            scheduler.get_state().await
        }
        ReminderAction::Resume => {
            scheduler.resume().await?;
            scheduler.get_state().await
        }
    };
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
