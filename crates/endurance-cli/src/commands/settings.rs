use clap::Subcommand;

use crate::app::App;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Get a setting by field name
    Get {
        /// Field (e.g. "auto_start_breaks", "daily_goal_minutes")
        field: String,
    },
    /// Set a setting by field name
    Set {
        field: String,
        /// New value; presets are given as JSON
        value: String,
    },
    /// Print all settings as JSON
    Show,
}

pub fn run(action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let mut settings = app.settings.clone();

    match action {
        SettingsAction::Get { field } => match settings.get(&field) {
            Some(value) => println!("{value}"),
            None => return Err(format!("unknown setting: {field}").into()),
        },
        SettingsAction::Set { field, value } => {
            settings.set(&field, &value)?;
            settings.save(app.db.as_ref())?;
            println!("ok");
        }
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}
