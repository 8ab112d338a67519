use std::str::FromStr;

use super::engine::TimerCore;
use super::preset::Preset;
use super::state::TimerMode;

/// A request to the timer, as issued by a host event loop or a text console.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Toggle,
    Reset,
    Stop,
    Skip,
    StartBreak,
    SkipBreak,
    SetMode(TimerMode),
    SetQuickDuration(u64),
    AdjustQuickDuration(i64),
    Configure(Preset),
    Sleep,
    Wake,
    Tick,
    Status,
    Shutdown,
}

impl FromStr for Command {
    type Err = String;

    /// Parses console lines such as `start`, `mode quick`, `quick 600` or
    /// `quick +60`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err("empty command".into());
        };
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments for '{head}'"));
        }

        let command = match (head.to_ascii_lowercase().as_str(), arg) {
            ("start", None) => Command::Start,
            ("pause", None) => Command::Pause,
            ("resume", None) => Command::Resume,
            ("toggle", None) => Command::Toggle,
            ("reset", None) => Command::Reset,
            ("stop", None) => Command::Stop,
            ("skip", None) => Command::Skip,
            ("start-break", None) => Command::StartBreak,
            ("skip-break", None) => Command::SkipBreak,
            ("sleep", None) => Command::Sleep,
            ("wake", None) => Command::Wake,
            ("tick", None) => Command::Tick,
            ("status", None) => Command::Status,
            ("quit" | "exit" | "shutdown", None) => Command::Shutdown,
            ("mode", Some(mode)) => Command::SetMode(mode.parse()?),
            ("quick", Some(value)) if value.starts_with(['+', '-']) => Command::AdjustQuickDuration(
                value
                    .parse()
                    .map_err(|e| format!("invalid adjustment '{value}': {e}"))?,
            ),
            ("quick", Some(value)) => Command::SetQuickDuration(
                value
                    .parse()
                    .map_err(|e| format!("invalid duration '{value}': {e}"))?,
            ),
            (other, _) => return Err(format!("unknown command: {other}")),
        };
        Ok(command)
    }
}

impl TimerCore {
    /// Dispatch a command. `Status` and `Shutdown` are for the host loop and
    /// leave the timer untouched.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Toggle => self.toggle(),
            Command::Reset => self.reset(),
            Command::Stop => self.stop(),
            Command::Skip => self.skip_to_next_phase(),
            Command::StartBreak => self.start_break(),
            Command::SkipBreak => self.skip_break(),
            Command::SetMode(mode) => self.set_mode(mode),
            Command::SetQuickDuration(secs) => self.set_quick_timer_duration(secs),
            Command::AdjustQuickDuration(delta) => self.adjust_quick_timer_duration(delta),
            Command::Configure(preset) => self.set_configuration(preset),
            Command::Sleep => {
                let now = self.now();
                self.handle_sleep(now);
            }
            Command::Wake => {
                let now = self.now();
                self.handle_wake(now);
            }
            Command::Tick => self.tick(),
            Command::Status | Command::Shutdown => {}
        }
    }
}
