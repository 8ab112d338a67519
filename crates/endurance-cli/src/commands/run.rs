use std::error::Error;

use endurance_core::driver;
use endurance_core::timer::ChannelObserver;
use endurance_core::{Command, Config, Preset};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use uuid::Uuid;

use crate::app::App;

/// Live loop: the timer ticks on its own, commands come from stdin one per
/// line (`start`, `pause`, `mode quick`, `quick +60`, `use <id>`, `status`,
/// `quit`, ...) and every event is printed as one JSON line.
pub fn run() -> Result<(), Box<dyn Error>> {
    let app = App::open()?;
    let config = Config::load_or_default();
    let mut core = app.timer();
    let presets = app.catalog.list();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async {
        let (command_tx, command_rx) = unbounded_channel();
        let (event_tx, mut event_rx) = unbounded_channel();
        let (status_tx, mut status_rx) = unbounded_channel();
        core.subscribe(ChannelObserver::new(event_tx, false));

        tokio::spawn(read_commands(command_tx, presets));

        let driver = driver::run(core, command_rx, status_tx, &config.timer);
        tokio::pin!(driver);
        let core = loop {
            tokio::select! {
                core = &mut driver => break core,
                Some(event) = event_rx.recv() => println!("{}", serde_json::to_string(&event)?),
                Some(snapshot) = status_rx.recv() => println!("{}", serde_json::to_string(&snapshot)?),
            }
        };
        while let Ok(event) = event_rx.try_recv() {
            println!("{}", serde_json::to_string(&event)?);
        }
        while let Ok(snapshot) = status_rx.try_recv() {
            println!("{}", serde_json::to_string(&snapshot)?);
        }
        Ok::<_, Box<dyn Error>>(core)
    });

    // The stdin reader may still be blocked on a read.
    runtime.shutdown_background();
    let core = result?;
    app.save_timer(&core)
}

async fn read_commands(tx: UnboundedSender<Command>, presets: Vec<Preset>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line, &presets) {
            Ok(command) => {
                if tx.send(command).is_err() {
                    break;
                }
            }
            Err(message) => eprintln!("error: {message}"),
        }
    }
}

fn parse_line(line: &str, presets: &[Preset]) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    if words.next() == Some("use") {
        let id: Uuid = words
            .next()
            .ok_or("usage: use <preset-id>")?
            .parse()
            .map_err(|e| format!("invalid preset id: {e}"))?;
        return presets
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .map(Command::Configure)
            .ok_or_else(|| format!("preset not found: {id}"));
    }
    line.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use endurance_core::timer::builtin_presets;

    #[test]
    fn use_resolves_preset_ids() {
        let presets = builtin_presets();
        let line = format!("use {}", presets[1].id);
        assert_eq!(
            parse_line(&line, &presets).unwrap(),
            Command::Configure(presets[1].clone())
        );
        assert!(parse_line("use", &presets).is_err());
        assert!(parse_line(&format!("use {}", Uuid::nil()), &presets).is_err());
        assert_eq!(parse_line("toggle", &presets).unwrap(), Command::Toggle);
    }
}
