use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::preset::{Phase, Preset};
use crate::events::Segment;

/// Selects whether phase cycling applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    #[default]
    Pomodoro,
    QuickTimer,
}

impl std::str::FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pomodoro" => Ok(TimerMode::Pomodoro),
            "quick" | "quick_timer" | "quicktimer" => Ok(TimerMode::QuickTimer),
            other => Err(format!("unknown timer mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// Wall-clock instant plus the remaining time captured at that instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub at: DateTime<Utc>,
    pub remaining_ms: u64,
}

/// The persistable part of the timer: everything except injected wiring.
///
/// While `run_state` is `Running` the authoritative remaining time is derived
/// from `anchor`; otherwise `remaining_ms` is frozen and authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub configuration: Preset,
    pub mode: TimerMode,
    pub run_state: RunState,
    pub phase: Phase,
    /// Completed focus segments in the current cycle.
    pub session_index: u32,
    pub awaiting_break_start: bool,
    pub remaining_ms: u64,
    #[serde(default)]
    pub anchor: Option<Anchor>,
    /// Set between a sleep signal and the matching wake.
    #[serde(default)]
    pub sleeping_since: Option<DateTime<Utc>>,
    /// The countable segment currently started and not yet finished.
    #[serde(default)]
    pub active_segment: Option<Segment>,
}

impl TimerState {
    pub fn new(configuration: Preset, mode: TimerMode, quick_timer_secs: u64) -> Self {
        let remaining_ms = match mode {
            TimerMode::Pomodoro => configuration.focus_duration,
            TimerMode::QuickTimer => quick_timer_secs,
        }
        .saturating_mul(1000);
        Self {
            configuration,
            mode,
            run_state: RunState::Idle,
            phase: Phase::Focus,
            session_index: 0,
            awaiting_break_start: false,
            remaining_ms,
            anchor: None,
            sleeping_since: None,
            active_segment: None,
        }
    }
}

/// Read-only view handed to presentation and tick observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: TimerMode,
    pub run_state: RunState,
    pub phase: Phase,
    pub preset_name: String,
    pub session_index: u32,
    pub number_of_sessions: u32,
    pub awaiting_break_start: bool,
    pub remaining_ms: u64,
    pub total_ms: u64,
    pub progress: f64,
    pub formatted_time: String,
    pub at: DateTime<Utc>,
}

/// "MM:SS" for the main display. Partial seconds round up so a running
/// timer never shows 00:00 before it completes.
pub fn format_clock(remaining_ms: u64) -> String {
    let secs = remaining_ms.div_ceil(1000);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// "M:SS" for compact displays such as a menu bar.
pub fn format_menu_bar(remaining_ms: u64) -> String {
    let secs = remaining_ms.div_ceil(1000);
    format!("{}:{:02}", secs / 60, secs % 60)
}
