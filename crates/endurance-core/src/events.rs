use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{Phase, Snapshot, TimerMode};

/// One countable timed interval: a focus run or a quick-timer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub mode: TimerMode,
    pub phase: Phase,
    /// Denormalised preset name, or "Quick Timer".
    pub preset_name: String,
    pub target_secs: u64,
    /// Zero-based focus index within the cycle.
    pub session_index: u32,
    pub started_at: DateTime<Utc>,
}

/// Every observable change of the timer produces an Event.
/// Observers receive them in emission order on the timer's own thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Tick {
        snapshot: Snapshot,
    },
    SegmentStarted {
        segment: Segment,
    },
    SegmentCompleted {
        segment: Segment,
        at: DateTime<Utc>,
    },
    SegmentCancelled {
        segment: Segment,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        phase: Phase,
        session_index: u32,
        at: DateTime<Utc>,
    },
    /// All focus segments of the active preset are done.
    CycleCompleted {
        sessions: u32,
        at: DateTime<Utc>,
    },
    Reset {
        at: DateTime<Utc>,
    },
    /// Emitted before the skipped phase is left, so observers see it
    /// ahead of anything the following phase starts.
    Skipped {
        from: Phase,
        at: DateTime<Utc>,
    },
    ConfigurationChanged {
        preset_id: Uuid,
        preset_name: String,
        at: DateTime<Utc>,
    },
    ModeChanged {
        mode: TimerMode,
        at: DateTime<Utc>,
    },
    /// Host reported the end of a suspension while running.
    Woke {
        slept_ms: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Tick { .. } => "tick",
            Event::SegmentStarted { .. } => "segment_started",
            Event::SegmentCompleted { .. } => "segment_completed",
            Event::SegmentCancelled { .. } => "segment_cancelled",
            Event::PhaseChanged { .. } => "phase_changed",
            Event::CycleCompleted { .. } => "cycle_completed",
            Event::Reset { .. } => "reset",
            Event::Skipped { .. } => "skipped",
            Event::ConfigurationChanged { .. } => "configuration_changed",
            Event::ModeChanged { .. } => "mode_changed",
            Event::Woke { .. } => "woke",
        }
    }
}
