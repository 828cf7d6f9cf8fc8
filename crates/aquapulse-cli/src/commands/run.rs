//! Foreground engine.
//!
//! Starts the scheduler, prints each due reminder as a JSON line, and reads
//! commands from stdin until `quit`, EOF or Ctrl-C:
//!
//! ```text
//! drink <ml>               log a drink
//! dismiss                  dismiss the current reminder
//! pause <minutes> [reason] hold reminders
//! resume                   end a pause early
//! status                   print the reminder state
//! fire                     run the due-check now
//! quit
//! ```

use std::sync::Arc;

use chrono::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use aquapulse_core::{CoreError, Database, IntakeEvent, IntakeSource, ReminderScheduler};

use super::{build_scheduler, runtime};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let rt = runtime()?;
    let result = rt.block_on(run_loop());
    // A pending stdin read would otherwise keep the runtime alive on Ctrl-C.
    rt.shutdown_background();
    result
}

async fn run_loop() -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(Database::open()?);
    let scheduler = build_scheduler(db.clone());
    scheduler.start().await?;
    eprintln!("reminder engine running; type 'quit' to stop");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_line(&scheduler, &db, line.trim()).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    scheduler.stop().await?;
    Ok(())
}

/// Returns false when the loop should end.
async fn handle_line(
    scheduler: &ReminderScheduler,
    db: &Database,
    line: &str,
) -> Result<bool, CoreError> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };

    match command {
        "drink" => {
            let amount_ml = parse_arg::<u32>(parts.next(), "drink <ml>")?;
            if amount_ml == 0 {
                return Err(CoreError::Custom("amount must be positive".into()));
            }
            let state = scheduler.record_intake(amount_ml).await?;
            db.record_intake(&IntakeEvent::new(
                state.last_intake_at,
                amount_ml,
                IntakeSource::Reminder,
            ))?;
            eprintln!("logged {amount_ml} ml; next reminder at {}", state.next_reminder_at);
        }
        "dismiss" => {
            let state = scheduler.record_dismissed().await?;
            eprintln!("dismissed; next reminder at {}", state.next_reminder_at);
        }
        "pause" => {
            let minutes = parse_arg::<i64>(parts.next(), "pause <minutes> [reason]")?;
            let reason: Vec<&str> = parts.collect();
            let reason = (!reason.is_empty()).then(|| reason.join(" "));
            let duration = Duration::try_minutes(minutes)
                .ok_or_else(|| CoreError::Custom("pause length out of range".into()))?;
            scheduler.pause(duration, reason).await?;
            eprintln!("paused for {minutes} minutes");
        }
        "resume" => {
            scheduler.resume().await?;
            eprintln!("resumed");
        }
        "status" => {
            let state = scheduler.get_state().await;
            println!("{}", serde_json::to_string(&state)?);
        }
        "fire" => {
            let outcome = scheduler.fire_now().await?;
            eprintln!("{outcome:?}");
        }
        "quit" | "exit" => return Ok(false),
        other => eprintln!("unknown command: {other}"),
    }
    Ok(true)
}

fn parse_arg<T: std::str::FromStr>(arg: Option<&str>, usage: &str) -> Result<T, CoreError> {
    arg.and_then(|a| a.parse().ok())
        .ok_or_else(|| CoreError::Custom(format!("usage: {usage}")))
}
