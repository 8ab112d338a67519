use clap::Subcommand;
use endurance_core::{Command, Event, EventLog, TimerMode};
use serde_json::json;
use uuid::Uuid;

use crate::app::App;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the current phase (or resume if paused)
    Start,
    /// Pause the running timer
    Pause,
    /// Resume a paused timer
    Resume,
    /// Start, pause or resume depending on state
    Toggle,
    /// Rewind the current phase without logging it
    Reset,
    /// Cancel the current segment and log how long it ran
    Stop,
    /// Jump to the next phase
    Skip,
    /// Begin the break that is waiting for confirmation
    StartBreak,
    /// Drop the pending break and go back to focus
    SkipBreak,
    /// Print current timer state as JSON
    Status,
    /// Switch between pomodoro and quick timer
    Mode {
        /// "pomodoro" or "quick"
        mode: TimerMode,
    },
    /// Quick timer length
    Quick {
        #[command(subcommand)]
        action: QuickAction,
    },
    /// Switch to a preset by id
    Use {
        id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum QuickAction {
    /// Set the length in seconds
    Set { secs: u64 },
    /// Change the length by a number of seconds (never below one minute)
    Adjust {
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let mut core = app.timer();
    let events = EventLog::new();
    core.subscribe(events.clone());

    // Catch up with the time that passed since the last invocation.
    core.tick();

    let command = match action {
        TimerAction::Start => Command::Start,
        TimerAction::Pause => Command::Pause,
        TimerAction::Resume => Command::Resume,
        TimerAction::Toggle => Command::Toggle,
        TimerAction::Reset => Command::Reset,
        TimerAction::Stop => Command::Stop,
        TimerAction::Skip => Command::Skip,
        TimerAction::StartBreak => Command::StartBreak,
        TimerAction::SkipBreak => Command::SkipBreak,
        TimerAction::Status => Command::Status,
        TimerAction::Mode { mode } => Command::SetMode(mode),
        TimerAction::Quick { action } => match action {
            QuickAction::Set { secs } => Command::SetQuickDuration(secs),
            QuickAction::Adjust { delta } => Command::AdjustQuickDuration(delta),
        },
        TimerAction::Use { id } => {
            let preset = app
                .catalog
                .get(id)
                .cloned()
                .ok_or_else(|| format!("preset not found: {id}"))?;
            Command::Configure(preset)
        }
    };
    core.apply(command);

    let emitted: Vec<Event> = events
        .take()
        .into_iter()
        .filter(|e| !matches!(e, Event::Tick { .. }))
        .collect();
    let output = json!({
        "snapshot": core.snapshot(),
        "events": emitted,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    app.save_timer(&core)?;
    Ok(())
}
