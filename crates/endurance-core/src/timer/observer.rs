use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::AlertError;
use crate::events::{Event, Segment};
use crate::timer::{Phase, Snapshot};

/// Anything that wants to react to the timer implements this trait.
///
/// `on_event` sees every event; its default implementation routes the
/// lifecycle events to the narrower hooks below, which all default to no-ops.
pub trait TimerObserver {
    fn on_event(&mut self, event: &Event) {
        match event {
            Event::Tick { snapshot } => self.on_tick(snapshot),
            Event::SegmentStarted { segment } => self.on_segment_started(segment),
            Event::SegmentCompleted { segment, .. } => self.on_segment_complete(segment),
            Event::SegmentCancelled {
                segment,
                elapsed_ms,
                ..
            } => self.on_segment_cancelled(segment, Duration::from_millis(*elapsed_ms)),
            Event::PhaseChanged {
                phase,
                session_index,
                ..
            } => self.on_phase_changed(*phase, *session_index),
            Event::Reset { .. } | Event::Skipped { .. } | Event::ConfigurationChanged { .. } => {
                self.on_rewind(event)
            }
            _ => {}
        }
    }

    fn on_tick(&mut self, _snapshot: &Snapshot) {}

    fn on_segment_started(&mut self, _segment: &Segment) {}

    fn on_segment_complete(&mut self, _segment: &Segment) {}

    fn on_segment_cancelled(&mut self, _segment: &Segment, _elapsed: Duration) {}

    fn on_phase_changed(&mut self, _phase: Phase, _session_index: u32) {}

    /// The timer discarded its current position without completing or
    /// cancelling it (reset, skip, configuration swap).
    fn on_rewind(&mut self, _event: &Event) {}
}

/// Handle returned by `TimerCore::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Records every event. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.borrow().iter().filter(|e| e.name() == name).count()
    }
}

impl TimerObserver for EventLog {
    fn on_event(&mut self, event: &Event) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Forwards events into a tokio channel, skipping ticks unless asked.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: UnboundedSender<Event>,
    include_ticks: bool,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<Event>, include_ticks: bool) -> Self {
        Self { tx, include_ticks }
    }
}

impl TimerObserver for ChannelObserver {
    fn on_event(&mut self, event: &Event) {
        if matches!(event, Event::Tick { .. }) && !self.include_ticks {
            return;
        }
        // A closed receiver just means nobody is listening any more.
        let _ = self.tx.send(event.clone());
    }
}

/// Side-effect sink for completion alerts. Delivery is best-effort.
pub trait AlertSink {
    fn play_sound(&self) -> Result<(), AlertError>;

    fn notify(&self, title: &str, body: &str) -> Result<(), AlertError>;
}
