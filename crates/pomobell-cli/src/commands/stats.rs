use chrono::{Local, NaiveDate, Utc};
use clap::Subcommand;
use pomobell_core::{DateRange, PomodoroStats, SessionTracker};

use super::open_store;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// The last seven days, today included
    Week,
    /// Stats for local calendar days FROM..=TO
    Range {
        /// First day (YYYY-MM-DD)
        from: NaiveDate,
        /// Last day (YYYY-MM-DD), defaults to FROM
        to: Option<NaiveDate>,
    },
    /// Recorded sessions, newest first
    History {
        /// How many sessions to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store()?;
    let history = SessionTracker::read_history(store.as_ref())?;

    let range = match action {
        StatsAction::Today => DateRange::local_day(Local::now().date_naive()),
        StatsAction::Week => DateRange::trailing_week(Utc::now()),
        StatsAction::Range { from, to } => {
            let to = to.unwrap_or(from);
            if to < from {
                return Err(format!("range ends before it starts: {from} > {to}").into());
            }
            DateRange::local_days(from, to)
        }
        StatsAction::History { limit } => {
            let recent: Vec<_> = history.iter().rev().take(limit).collect();
            println!("{}", serde_json::to_string_pretty(&recent)?);
            return Ok(());
        }
    };

    let stats = PomodoroStats::compute(&history, &range);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
