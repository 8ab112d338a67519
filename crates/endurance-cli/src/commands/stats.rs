use clap::Subcommand;
use endurance_core::Period;
use serde_json::json;
use uuid::Uuid;

use crate::app::App;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals for a calendar period
    Period {
        /// day, week, month or year
        period: Period,
        /// 0 for the current period, -1 for the previous one, ...
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i32,
        /// Include the matching records
        #[arg(long)]
        records: bool,
    },
    /// Today's stats and daily goal progress
    Today,
    /// Today, the last seven days and all-time totals
    Summary,
    /// Most recent sessions
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete a session record
    Delete { id: Uuid },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let mut log = app.log.borrow_mut();

    match action {
        StatsAction::Period {
            period,
            offset,
            records,
        } => {
            let stats = log.statistics_for(period, offset)?;
            if records {
                let list = log.records_for(period, offset)?;
                let output = json!({ "stats": stats, "records": list });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
        }
        StatsAction::Today => {
            let summary = log.summary();
            let output = json!({
                "today": summary.today,
                "formatted_time": summary.today.formatted_time(),
                "daily_goal_minutes": log.daily_goal_minutes(),
                "daily_progress": log.daily_progress(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        StatsAction::Summary => {
            println!("{}", serde_json::to_string_pretty(log.summary())?);
        }
        StatsAction::Recent { limit } => {
            let recent = log.recent(limit)?;
            println!("{}", serde_json::to_string_pretty(&recent)?);
        }
        StatsAction::Delete { id } => {
            if !log.delete(id)? {
                return Err(format!("session not found: {id}").into());
            }
            println!("Session deleted: {id}");
        }
    }
    Ok(())
}
