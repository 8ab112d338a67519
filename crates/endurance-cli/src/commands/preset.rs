use clap::{Args, Subcommand};
use endurance_core::{Preset, PresetIcon};
use serde_json::json;
use uuid::Uuid;

use crate::app::App;

#[derive(Subcommand)]
pub enum PresetAction {
    /// List built-in and custom presets as JSON
    List,
    /// Add a custom preset
    Add {
        /// Display name
        name: String,
        #[command(flatten)]
        fields: PresetFields,
    },
    /// Change a preset; omitted fields keep their value
    Update {
        id: Uuid,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: PresetFields,
    },
    /// Remove a custom preset
    Remove { id: Uuid },
    /// Restore a built-in preset to its shipped values
    Reset { id: Uuid },
}

/// Durations are given in minutes.
#[derive(Args)]
pub struct PresetFields {
    /// Focus length in minutes
    #[arg(long)]
    focus: Option<u64>,
    /// Break length in minutes
    #[arg(long = "break")]
    break_minutes: Option<u64>,
    /// Focus segments per cycle
    #[arg(long)]
    sessions: Option<u32>,
    /// Long break length in minutes
    #[arg(long)]
    long_break: Option<u64>,
    /// Every N-th focus segment earns the long break
    #[arg(long)]
    long_break_every: Option<u32>,
    #[arg(long)]
    icon: Option<PresetIcon>,
}

impl PresetFields {
    fn apply_to(&self, preset: &mut Preset) {
        if let Some(minutes) = self.focus {
            preset.focus_duration = minutes * 60;
        }
        if let Some(minutes) = self.break_minutes {
            preset.break_duration = minutes * 60;
        }
        if let Some(sessions) = self.sessions {
            preset.number_of_sessions = sessions;
        }
        if let Some(minutes) = self.long_break {
            preset.long_break_duration = minutes * 60;
        }
        if let Some(every) = self.long_break_every {
            preset.long_break_interval = Some(every);
        }
        if let Some(icon) = self.icon {
            preset.icon = icon;
        }
    }
}

fn describe(preset: &Preset) -> serde_json::Value {
    json!({
        "preset": preset,
        "summary": preset.summary(),
        "total_duration": preset.total_duration(),
    })
}

pub fn run(action: PresetAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::open()?;

    match action {
        PresetAction::List => {
            let list: Vec<_> = app.catalog.list().iter().map(describe).collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        PresetAction::Add { name, fields } => {
            let mut preset = Preset::new(name, 25 * 60, 5 * 60, 4);
            fields.apply_to(&mut preset);
            let id = app.catalog.add(preset)?;
            println!("Preset created: {id}");
        }
        PresetAction::Update { id, name, fields } => {
            let mut preset = app
                .catalog
                .get(id)
                .cloned()
                .ok_or_else(|| format!("preset not found: {id}"))?;
            if let Some(name) = name {
                preset.name = name;
            }
            fields.apply_to(&mut preset);
            preset.validate()?;
            app.catalog.update(preset);
            println!("Preset updated: {id}");
        }
        PresetAction::Remove { id } => {
            if app.catalog.builtins().iter().any(|p| p.id == id) {
                return Err("built-in presets cannot be removed".into());
            }
            if !app.catalog.remove(id) {
                return Err(format!("preset not found: {id}").into());
            }
            println!("Preset removed: {id}");
        }
        PresetAction::Reset { id } => {
            if !app.catalog.reset_to_factory(id) {
                return Err(format!("not a built-in preset: {id}").into());
            }
            println!("Preset reset: {id}");
        }
    }
    Ok(())
}
