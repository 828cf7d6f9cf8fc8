use chrono::{Local, NaiveDate};
use clap::Subcommand;

use aquapulse_core::{Config, Database};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Daily hydration report
    Today {
        /// Report another day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();

    match action {
        StatsAction::Today { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let stats = db.daily_stats(date, config.goal.daily_ml)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
