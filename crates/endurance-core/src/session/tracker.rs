use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Local, TimeZone, Utc};

use super::log::SessionLog;
use super::record::RecordHandle;
use crate::events::Event;
use crate::timer::TimerObserver;

/// Bridges timer events into the session log.
///
/// Opens a record when a countable segment starts, completes or cancels it
/// when the timer reports so, and closes it as not completed when the timer
/// rewinds past it (reset, skip, configuration swap).
pub struct SessionTracker<Tz: TimeZone = Local> {
    log: Rc<RefCell<SessionLog<Tz>>>,
    open: Option<RecordHandle>,
}

impl<Tz: TimeZone> SessionTracker<Tz> {
    /// Picks up a record a previous process left open, so a host that saves
    /// and restores the timer keeps accounting for the running segment.
    pub fn new(log: Rc<RefCell<SessionLog<Tz>>>) -> Self {
        let open = log.borrow().latest_open();
        if let Some(handle) = &open {
            tracing::debug!(id = %handle.id(), "resuming open session");
        }
        Self { log, open }
    }

    pub fn open_record(&self) -> Option<&RecordHandle> {
        self.open.as_ref()
    }

    fn close(&mut self, at: DateTime<Utc>, completed: bool) {
        let Some(handle) = self.open.take() else {
            return;
        };
        let mut log = self.log.borrow_mut();
        if completed {
            log.complete_segment(handle, at);
        } else {
            log.cancel_segment(handle, at);
        }
    }
}

impl<Tz: TimeZone> TimerObserver for SessionTracker<Tz> {
    fn on_event(&mut self, event: &Event) {
        match event {
            Event::SegmentStarted { segment } => {
                // A record still open here was abandoned without a terminal event.
                self.close(segment.started_at, false);
                let handle = self.log.borrow_mut().start_segment(
                    segment.target_secs,
                    &segment.preset_name,
                    segment.started_at,
                );
                self.open = Some(handle);
            }
            Event::SegmentCompleted { at, .. } => self.close(*at, true),
            Event::SegmentCancelled { at, .. }
            | Event::Reset { at }
            | Event::Skipped { at, .. }
            | Event::ConfigurationChanged { at, .. } => self.close(*at, false),
            _ => {}
        }
    }
}
