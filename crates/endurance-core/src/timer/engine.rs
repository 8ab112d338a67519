//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the host calls `tick()` periodically (about every
//! 100 ms) and feeds commands on the same thread.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused -> Running)* -> Idle
//! ```
//!
//! Phases cycle `Focus -> (ShortBreak | LongBreak) -> Focus ...` in Pomodoro
//! mode; QuickTimer mode runs a single countdown.
//!
//! ## Usage
//!
//! ```ignore
//! let mut core = TimerCore::new(settings, SystemClock);
//! core.subscribe(EventLog::new());
//! core.start();
//! // In the event loop:
//! core.tick();
//! ```

use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::observer::{AlertSink, SubscriptionId, TimerObserver};
use super::preset::{Phase, Preset};
use super::state::{format_clock, format_menu_bar, Anchor, RunState, Snapshot, TimerMode, TimerState};
use crate::clock::{elapsed_ms, Clock};
use crate::events::{Event, Segment};
use crate::storage::{KvStore, Settings};

/// Smallest quick-timer length reachable through `adjust_quick_timer_duration`.
pub const QUICK_TIMER_FLOOR_SECS: u64 = 60;

const QUICK_TIMER_NAME: &str = "Quick Timer";

/// How a segment reached its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Natural,
    Skipped,
}

/// Core timer state machine.
///
/// Operates on wall-clock deltas -- no internal thread.
/// Invalid commands for the current state are silent no-ops.
pub struct TimerCore {
    state: TimerState,
    settings: Settings,
    clock: Box<dyn Clock>,
    observers: Vec<(SubscriptionId, Box<dyn TimerObserver>)>,
    alerts: Option<Box<dyn AlertSink>>,
    store: Option<Rc<dyn KvStore>>,
    next_subscription: u64,
}

impl TimerCore {
    /// Create an idle timer from injected settings.
    ///
    /// Uses the last configuration and mode recorded in `settings`, falling
    /// back to the first built-in preset.
    pub fn new(settings: Settings, clock: impl Clock + 'static) -> Self {
        let configuration = settings.last_configuration.clone().unwrap_or_default();
        let state = TimerState::new(
            configuration,
            settings.last_used_mode,
            settings.quick_timer_duration,
        );
        Self::from_parts(state, settings, Box::new(clock))
    }

    /// Rebuild a timer from a previously saved `TimerState`.
    ///
    /// Elapsed time since the save is accounted for by the anchor; call
    /// `tick()` afterwards to catch up.
    pub fn restore(mut state: TimerState, settings: Settings, clock: impl Clock + 'static) -> Self {
        if state.configuration.validate().is_err() {
            tracing::warn!("restored configuration is invalid, falling back to default");
            state = TimerState::new(
                Preset::default(),
                state.mode,
                settings.quick_timer_duration,
            );
        }
        let mut core = Self::from_parts(state, settings, Box::new(clock));
        core.repair();
        core
    }

    fn from_parts(state: TimerState, settings: Settings, clock: Box<dyn Clock>) -> Self {
        Self {
            state,
            settings,
            clock,
            observers: Vec::new(),
            alerts: None,
            store: None,
            next_subscription: 0,
        }
    }

    /// Re-establish the invariants on a state that came from outside.
    fn repair(&mut self) {
        if self.state.mode == TimerMode::QuickTimer {
            self.state.phase = Phase::Focus;
            self.state.awaiting_break_start = false;
        }
        let total = self.total_ms();
        self.state.remaining_ms = match self.state.run_state {
            RunState::Idle => total,
            _ => self.state.remaining_ms.min(total),
        };
        if let Some(anchor) = self.state.anchor.as_mut() {
            anchor.remaining_ms = anchor.remaining_ms.min(total);
        }
        if self.state.run_state == RunState::Running
            && self.state.anchor.is_none()
            && self.state.sleeping_since.is_none()
        {
            let now = self.clock.now();
            self.state.anchor = Some(Anchor {
                at: now,
                remaining_ms: self.state.remaining_ms,
            });
        }
        if self.state.run_state != RunState::Running {
            self.state.anchor = None;
            self.state.sleeping_since = None;
        }
    }

    /// Persist settings changes made by the timer (last configuration, mode,
    /// quick-timer length) through this store.
    pub fn with_store(mut self, store: Rc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_alerts(mut self, alerts: impl AlertSink + 'static) -> Self {
        self.alerts = Some(Box::new(alerts));
        self
    }

    pub fn subscribe(&mut self, observer: impl TimerObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The persistable machine state, with remaining time as of the last
    /// tick or command.
    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn configuration(&self) -> &Preset {
        &self.state.configuration
    }

    pub fn mode(&self) -> TimerMode {
        self.state.mode
    }

    pub fn run_state(&self) -> RunState {
        self.state.run_state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn session_index(&self) -> u32 {
        self.state.session_index
    }

    pub fn awaiting_break_start(&self) -> bool {
        self.state.awaiting_break_start
    }

    pub fn is_running(&self) -> bool {
        self.state.run_state == RunState::Running
    }

    /// Whether the periodic tick should currently be delivered.
    pub fn is_ticking(&self) -> bool {
        self.is_running() && self.state.sleeping_since.is_none()
    }

    /// Remaining time right now, in milliseconds.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_at(self.clock.now())
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_ms().div_ceil(1000)
    }

    /// Full length of the current phase (or quick timer), in milliseconds.
    pub fn total_ms(&self) -> u64 {
        let secs = match self.state.mode {
            TimerMode::QuickTimer => self.settings.quick_timer_duration,
            TimerMode::Pomodoro => self.state.configuration.phase_duration(self.state.phase),
        };
        secs.saturating_mul(1000)
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        progress(self.remaining_ms(), self.total_ms())
    }

    pub fn formatted_time(&self) -> String {
        format_clock(self.remaining_ms())
    }

    pub fn menu_bar_time(&self) -> String {
        format_menu_bar(self.remaining_ms())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(self.clock.now())
    }

    fn snapshot_at(&self, now: DateTime<Utc>) -> Snapshot {
        let remaining_ms = self.remaining_at(now);
        let total_ms = self.total_ms();
        Snapshot {
            mode: self.state.mode,
            run_state: self.state.run_state,
            phase: self.state.phase,
            preset_name: self.segment_name(),
            session_index: self.state.session_index,
            number_of_sessions: self.state.configuration.number_of_sessions,
            awaiting_break_start: self.state.awaiting_break_start,
            remaining_ms,
            total_ms,
            progress: progress(remaining_ms, total_ms),
            formatted_time: format_clock(remaining_ms),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) {
        match self.state.run_state {
            RunState::Running => {}
            RunState::Paused => self.resume(),
            RunState::Idle => {
                let now = self.clock.now();
                self.state.remaining_ms = self.total_ms();
                self.state.awaiting_break_start = false;
                if self.is_countable() {
                    let segment = self.segment_at(now);
                    self.state.active_segment = Some(segment.clone());
                    self.emit(Event::SegmentStarted { segment });
                }
                self.run_from(now);
                tracing::debug!(phase = ?self.state.phase, mode = ?self.state.mode, "timer started");
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state.run_state != RunState::Running {
            return;
        }
        let now = self.clock.now();
        self.state.remaining_ms = self.observe_remaining(now);
        self.halt();
        self.state.run_state = RunState::Paused;
        tracing::debug!(remaining_ms = self.state.remaining_ms, "timer paused");
    }

    pub fn resume(&mut self) {
        if self.state.run_state != RunState::Paused {
            return;
        }
        let now = self.clock.now();
        self.run_from(now);
        tracing::debug!(remaining_ms = self.state.remaining_ms, "timer resumed");
    }

    pub fn toggle(&mut self) {
        match self.state.run_state {
            RunState::Idle => self.start(),
            RunState::Running => self.pause(),
            RunState::Paused => self.resume(),
        }
    }

    /// Rewind the current phase to its full length without logging anything.
    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.halt();
        self.state.run_state = RunState::Idle;
        self.state.remaining_ms = self.total_ms();
        self.state.awaiting_break_start = false;
        self.state.active_segment = None;
        self.emit(Event::Reset { at: now });
    }

    /// Cancel the current segment, reporting how long it ran.
    pub fn stop(&mut self) {
        let now = self.clock.now();
        let total = self.total_ms();
        let remaining = self.observe_remaining(now);
        let elapsed = total.saturating_sub(remaining);

        self.halt();
        self.state.run_state = RunState::Idle;
        self.state.remaining_ms = total;
        let segment = self.state.active_segment.take();

        if elapsed > 0 {
            let segment = segment.unwrap_or_else(|| self.segment_at(now));
            tracing::info!(elapsed_ms = elapsed, "segment cancelled");
            self.emit(Event::SegmentCancelled {
                segment,
                elapsed_ms: elapsed,
                at: now,
            });
        }
    }

    /// Jump straight to the next phase. Pomodoro mode only.
    pub fn skip_to_next_phase(&mut self) {
        if self.state.mode != TimerMode::Pomodoro {
            return;
        }
        let now = self.clock.now();
        let from = self.state.phase;
        self.halt();
        self.state.run_state = RunState::Idle;
        self.emit(Event::Skipped { from, at: now });
        self.complete(now, Completion::Skipped);
    }

    /// Begin the break that is waiting for confirmation.
    pub fn start_break(&mut self) {
        if !self.state.awaiting_break_start {
            return;
        }
        self.state.awaiting_break_start = false;
        self.start();
    }

    /// Drop the break that is waiting for confirmation and go back to an
    /// idle focus phase.
    pub fn skip_break(&mut self) {
        if !self.state.awaiting_break_start {
            return;
        }
        let now = self.clock.now();
        self.state.awaiting_break_start = false;
        self.state.phase = Phase::Focus;
        self.state.remaining_ms = self.total_ms();
        self.emit(Event::PhaseChanged {
            phase: Phase::Focus,
            session_index: self.state.session_index,
            at: now,
        });
    }

    /// Swap the active preset. The cycle starts over from an idle focus phase.
    pub fn set_configuration(&mut self, configuration: Preset) {
        if let Err(e) = configuration.validate() {
            tracing::warn!(error = %e, "ignoring invalid configuration");
            return;
        }
        if self.state.run_state == RunState::Running {
            self.pause();
        }
        let now = self.clock.now();
        self.halt();
        self.state.configuration = configuration.clone();
        self.state.run_state = RunState::Idle;
        self.state.phase = Phase::Focus;
        self.state.session_index = 0;
        self.state.awaiting_break_start = false;
        self.state.active_segment = None;
        self.state.remaining_ms = self.total_ms();

        self.emit(Event::ConfigurationChanged {
            preset_id: configuration.id,
            preset_name: configuration.name.clone(),
            at: now,
        });
        self.settings.last_configuration = Some(configuration);
        self.persist_settings();
    }

    /// Switch between Pomodoro and QuickTimer. Only while idle.
    pub fn set_mode(&mut self, mode: TimerMode) {
        if self.state.run_state != RunState::Idle {
            return;
        }
        let now = self.clock.now();
        self.state.mode = mode;
        self.state.phase = Phase::Focus;
        self.state.session_index = 0;
        self.state.awaiting_break_start = false;
        self.state.active_segment = None;
        self.state.remaining_ms = self.total_ms();

        self.emit(Event::ModeChanged { mode, at: now });
        self.settings.last_used_mode = mode;
        self.persist_settings();
    }

    /// Set the quick-timer length in seconds.
    ///
    /// Ignored while a quick timer is running or paused, since the running
    /// countdown must never exceed its own total.
    pub fn set_quick_timer_duration(&mut self, secs: u64) {
        if secs == 0 {
            return;
        }
        if self.state.mode == TimerMode::QuickTimer && self.state.run_state != RunState::Idle {
            return;
        }
        self.settings.quick_timer_duration = secs;
        if self.state.mode == TimerMode::QuickTimer {
            self.state.remaining_ms = self.total_ms();
        }
        self.persist_settings();
    }

    /// Nudge the quick-timer length, never below one minute.
    pub fn adjust_quick_timer_duration(&mut self, delta_secs: i64) {
        let current = i64::try_from(self.settings.quick_timer_duration).unwrap_or(i64::MAX);
        let next = current
            .saturating_add(delta_secs)
            .max(QUICK_TIMER_FLOOR_SECS as i64);
        self.set_quick_timer_duration(next as u64);
    }

    /// Replace the injected settings (auto-start flags, alerts, goal).
    ///
    /// An active countdown keeps its position unless the new total is
    /// shorter, in which case it is cut down to the new total.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings;
        let total = self.total_ms();
        if self.state.run_state == RunState::Idle {
            self.state.remaining_ms = total;
        } else {
            self.state.remaining_ms = self.state.remaining_ms.min(total);
            if let Some(anchor) = self.state.anchor.as_mut() {
                anchor.remaining_ms = anchor.remaining_ms.min(total);
            }
        }
        self.persist_settings();
    }

    /// Periodic tick. Recomputes remaining time from the anchor, notifies
    /// observers, and completes the segment once it reaches zero.
    pub fn tick(&mut self) {
        if !self.is_ticking() {
            return;
        }
        let now = self.clock.now();
        self.state.remaining_ms = self.observe_remaining(now);
        let snapshot = self.snapshot_at(now);
        self.emit(Event::Tick { snapshot });
        if self.state.remaining_ms == 0 {
            self.complete(now, Completion::Natural);
        }
    }

    // ── Suspension ───────────────────────────────────────────────────

    /// The host is about to suspend. Ticking stops; the time spent asleep is
    /// charged on wake.
    pub fn handle_sleep(&mut self, at: DateTime<Utc>) {
        if !self.is_ticking() {
            return;
        }
        self.state.remaining_ms = self.observe_remaining(at);
        self.state.anchor = None;
        self.state.sleeping_since = Some(at);
        tracing::debug!(remaining_ms = self.state.remaining_ms, "sleeping");
    }

    /// The host resumed. Deducts the real time slept and completes at once
    /// if the segment ran out while suspended.
    pub fn handle_wake(&mut self, at: DateTime<Utc>) {
        let Some(since) = self.state.sleeping_since.take() else {
            return;
        };
        if self.state.run_state != RunState::Running {
            return;
        }
        let slept_ms = elapsed_ms(since, at);
        self.state.remaining_ms = self.state.remaining_ms.saturating_sub(slept_ms);
        tracing::info!(slept_ms, remaining_ms = self.state.remaining_ms, "woke");
        self.emit(Event::Woke { slept_ms, at });

        if self.state.remaining_ms == 0 {
            self.complete(at, Completion::Natural);
        } else {
            // A wake stamped before the sleep means the clock stepped back.
            self.state.anchor = Some(Anchor {
                at: at.max(since),
                remaining_ms: self.state.remaining_ms,
            });
        }
    }

    /// A discontinuity in wall-clock time detected by the host, reported as
    /// one interval.
    pub fn handle_clock_gap(&mut self, slept_from: DateTime<Utc>, slept_until: DateTime<Utc>) {
        if self.state.run_state != RunState::Running {
            return;
        }
        if self.state.sleeping_since.is_none() {
            self.handle_sleep(slept_from);
        }
        self.handle_wake(slept_until);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        if self.state.run_state != RunState::Running {
            return self.state.remaining_ms;
        }
        if let Some(since) = self.state.sleeping_since {
            return self
                .state
                .remaining_ms
                .saturating_sub(elapsed_ms(since, now));
        }
        match self.state.anchor {
            Some(anchor) => anchor
                .remaining_ms
                .saturating_sub(elapsed_ms(anchor.at, now))
                .min(self.state.remaining_ms),
            None => self.state.remaining_ms,
        }
    }

    /// Like `remaining_at`, and never above what was last observed, so a
    /// clock stepping backward cannot wind the timer up.
    fn observe_remaining(&self, now: DateTime<Utc>) -> u64 {
        self.remaining_at(now).min(self.state.remaining_ms)
    }

    fn run_from(&mut self, now: DateTime<Utc>) {
        self.state.anchor = Some(Anchor {
            at: now,
            remaining_ms: self.state.remaining_ms,
        });
        self.state.sleeping_since = None;
        self.state.run_state = RunState::Running;
    }

    /// Stop ticking. Safe to call when nothing is running.
    fn halt(&mut self) {
        self.state.anchor = None;
        self.state.sleeping_since = None;
    }

    fn is_countable(&self) -> bool {
        self.state.mode == TimerMode::QuickTimer || self.state.phase == Phase::Focus
    }

    fn segment_name(&self) -> String {
        match self.state.mode {
            TimerMode::QuickTimer => QUICK_TIMER_NAME.to_string(),
            TimerMode::Pomodoro => self.state.configuration.name.clone(),
        }
    }

    fn segment_at(&self, now: DateTime<Utc>) -> Segment {
        Segment {
            mode: self.state.mode,
            phase: self.state.phase,
            preset_name: self.segment_name(),
            target_secs: self.total_ms() / 1000,
            session_index: self.state.session_index,
            started_at: now,
        }
    }

    fn complete(&mut self, now: DateTime<Utc>, how: Completion) {
        self.halt();
        self.state.run_state = RunState::Idle;
        self.state.remaining_ms = 0;
        let finished = self.state.phase;
        let segment = self.state.active_segment.take();

        if how == Completion::Natural {
            if self.is_countable() {
                let segment = segment.unwrap_or_else(|| self.segment_at(now));
                tracing::info!(preset = %segment.preset_name, "segment completed");
                self.emit(Event::SegmentCompleted { segment, at: now });
            }
            self.fire_alerts(finished);
        }

        self.advance(now);
    }

    fn advance(&mut self, now: DateTime<Utc>) {
        match (self.state.mode, self.state.phase) {
            (TimerMode::QuickTimer, _) => {
                self.state.remaining_ms = self.total_ms();
            }
            (TimerMode::Pomodoro, Phase::Focus) => {
                self.state.session_index += 1;
                let sessions = self.state.configuration.number_of_sessions;
                if self.state.session_index >= sessions {
                    self.state.session_index = 0;
                    self.state.phase = Phase::Focus;
                    self.state.awaiting_break_start = false;
                    self.state.remaining_ms = self.total_ms();
                    tracing::info!(sessions, "cycle completed");
                    self.emit(Event::CycleCompleted { sessions, at: now });
                    return;
                }

                let (phase, secs) = self.state.configuration.break_after(self.state.session_index);
                if secs == 0 {
                    self.enter_focus(now);
                    return;
                }
                self.state.phase = phase;
                self.state.remaining_ms = self.total_ms();
                self.emit(Event::PhaseChanged {
                    phase,
                    session_index: self.state.session_index,
                    at: now,
                });
                if self.settings.auto_start_breaks {
                    self.start();
                } else {
                    self.state.awaiting_break_start = true;
                }
            }
            (TimerMode::Pomodoro, Phase::ShortBreak | Phase::LongBreak) => self.enter_focus(now),
        }
    }

    fn enter_focus(&mut self, now: DateTime<Utc>) {
        self.state.phase = Phase::Focus;
        self.state.awaiting_break_start = false;
        self.state.remaining_ms = self.total_ms();
        self.emit(Event::PhaseChanged {
            phase: Phase::Focus,
            session_index: self.state.session_index,
            at: now,
        });
        if self.settings.auto_start_focus {
            self.start();
        }
    }

    fn fire_alerts(&self, finished: Phase) {
        let Some(alerts) = &self.alerts else {
            return;
        };
        if self.settings.sound_enabled {
            if let Err(e) = alerts.play_sound() {
                tracing::warn!(error = %e, "completion sound failed");
            }
        }
        if self.settings.notifications_enabled {
            let (title, body) = match (self.state.mode, finished) {
                (TimerMode::QuickTimer, _) => ("Timer complete", "Your quick timer is done."),
                (TimerMode::Pomodoro, Phase::Focus) => ("Focus complete", "Time for a break."),
                (TimerMode::Pomodoro, _) => ("Break over", "Ready to focus again?"),
            };
            if let Err(e) = alerts.notify(title, body) {
                tracing::warn!(error = %e, "completion notification failed");
            }
        }
    }

    fn persist_settings(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = self.settings.save(store.as_ref()) {
                tracing::warn!(error = %e, "failed to persist settings");
            }
        }
    }

    fn emit(&mut self, event: Event) {
        for (_, observer) in self.observers.iter_mut() {
            observer.on_event(&event);
        }
    }
}

fn progress(remaining_ms: u64, total_ms: u64) -> f64 {
    if total_ms == 0 {
        return 0.0;
    }
    (1.0 - remaining_ms as f64 / total_ms as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timer::EventLog;
    use chrono::TimeZone;
    use std::cell::Cell;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 29, 9, 0, 0).unwrap())
    }

    fn core_with(settings: Settings) -> (TimerCore, ManualClock, EventLog) {
        let clock = clock();
        let log = EventLog::new();
        let mut core = TimerCore::new(settings, clock.clone());
        core.subscribe(log.clone());
        (core, clock, log)
    }

    fn manual_settings() -> Settings {
        Settings {
            auto_start_breaks: false,
            auto_start_focus: false,
            last_configuration: Some(Preset::new("Work", 1500, 300, 4)),
            ..Settings::default()
        }
    }

    #[test]
    fn start_pause_resume() {
        let (mut core, clock, _) = core_with(manual_settings());
        assert_eq!(core.run_state(), RunState::Idle);

        core.start();
        assert_eq!(core.run_state(), RunState::Running);
        clock.advance_secs(60);

        core.pause();
        assert_eq!(core.run_state(), RunState::Paused);
        clock.advance_secs(600);
        assert_eq!(core.remaining_ms(), 1_440_000);

        core.resume();
        assert_eq!(core.run_state(), RunState::Running);
        clock.advance_secs(40);
        assert_eq!(core.remaining_ms(), 1_400_000);
    }

    #[test]
    fn pause_twice_is_same_as_once() {
        let (mut core, clock, log) = core_with(manual_settings());
        core.start();
        clock.advance_secs(10);
        core.pause();
        let once = core.state().clone();
        clock.advance_secs(10);
        core.pause();
        assert_eq!(core.state(), &once);
        assert_eq!(log.count("segment_started"), 1);
    }

    #[test]
    fn commands_in_wrong_state_are_noops() {
        let (mut core, _, log) = core_with(manual_settings());
        let before = core.state().clone();
        core.pause();
        core.resume();
        core.start_break();
        core.skip_break();
        core.stop();
        core.tick();
        assert_eq!(core.state(), &before);
        assert!(log.events().is_empty());
    }

    #[test]
    fn resume_does_not_restart_segment() {
        let (mut core, clock, log) = core_with(manual_settings());
        core.toggle();
        clock.advance_secs(5);
        core.toggle();
        core.toggle();
        assert_eq!(core.run_state(), RunState::Running);
        assert_eq!(log.count("segment_started"), 1);
        assert_eq!(core.remaining_ms(), 1_495_000);
    }

    #[test]
    fn reset_rewinds_silently() {
        let (mut core, clock, log) = core_with(manual_settings());
        core.start();
        clock.advance_secs(100);
        core.reset();
        assert_eq!(core.run_state(), RunState::Idle);
        assert_eq!(core.remaining_ms(), 1_500_000);
        assert_eq!(log.count("segment_cancelled"), 0);
        assert_eq!(log.count("reset"), 1);
    }

    #[test]
    fn stop_right_after_start_logs_nothing() {
        let (mut core, _, log) = core_with(manual_settings());
        core.start();
        core.stop();
        assert_eq!(log.count("segment_cancelled"), 0);
    }

    #[test]
    fn backward_clock_never_increases_remaining() {
        let (mut core, clock, _) = core_with(manual_settings());
        core.start();
        clock.advance_secs(30);
        core.tick();
        assert_eq!(core.remaining_ms(), 1_470_000);
        clock.advance_secs(-20);
        core.tick();
        assert_eq!(core.remaining_ms(), 1_470_000);
        assert!(core.progress() >= 0.0);
    }

    #[test]
    fn quick_timer_cycles_without_phases() {
        let mut settings = manual_settings();
        settings.quick_timer_duration = 120;
        let (mut core, clock, log) = core_with(settings);
        core.set_mode(TimerMode::QuickTimer);
        core.start();
        clock.advance_secs(120);
        core.tick();
        assert_eq!(log.count("segment_completed"), 1);
        assert_eq!(core.phase(), Phase::Focus);
        assert_eq!(core.run_state(), RunState::Idle);
        assert_eq!(core.remaining_ms(), 120_000);

        // skipping is a Pomodoro-only command
        core.skip_to_next_phase();
        assert_eq!(log.count("skipped"), 0);
    }

    #[test]
    fn set_mode_only_while_idle() {
        let (mut core, _, _) = core_with(manual_settings());
        core.start();
        core.set_mode(TimerMode::QuickTimer);
        assert_eq!(core.mode(), TimerMode::Pomodoro);
    }

    #[test]
    fn adjust_quick_timer_respects_floor() {
        let mut settings = manual_settings();
        settings.quick_timer_duration = 300;
        let (mut core, _, _) = core_with(settings);
        core.set_mode(TimerMode::QuickTimer);
        core.adjust_quick_timer_duration(-5 * 60);
        assert_eq!(core.settings().quick_timer_duration, 60);
        assert_eq!(core.remaining_ms(), 60_000);
        core.adjust_quick_timer_duration(15 * 60);
        assert_eq!(core.settings().quick_timer_duration, 960);
    }

    #[test]
    fn quick_duration_change_waits_for_idle() {
        let (mut core, _, _) = core_with(manual_settings());
        core.set_mode(TimerMode::QuickTimer);
        core.start();
        core.set_quick_timer_duration(60);
        assert_eq!(core.settings().quick_timer_duration, 1500);
    }

    #[test]
    fn shorter_settings_cut_an_active_countdown() {
        let (mut core, clock, log) = core_with(manual_settings());
        core.set_mode(TimerMode::QuickTimer);
        core.start();
        clock.advance_secs(10);

        let mut settings = core.settings().clone();
        settings.quick_timer_duration = 60;
        core.apply_settings(settings);
        assert_eq!(core.total_ms(), 60_000);
        assert_eq!(core.remaining_ms(), 50_000);
        assert!(core.progress() > 0.0);

        core.pause();
        assert!(core.remaining_ms() <= core.total_ms());
        core.resume();
        clock.advance_secs(50);
        core.tick();
        assert_eq!(log.count("segment_completed"), 1);
        assert_eq!(core.run_state(), RunState::Idle);
    }

    #[test]
    fn longer_settings_keep_an_active_countdown() {
        let (mut core, clock, _) = core_with(manual_settings());
        core.set_mode(TimerMode::QuickTimer);
        core.start();
        clock.advance_secs(10);

        let mut settings = core.settings().clone();
        settings.quick_timer_duration = 3600;
        core.apply_settings(settings);
        assert_eq!(core.remaining_ms(), 1_490_000);
    }

    #[test]
    fn long_break_follows_interval() {
        let mut settings = manual_settings();
        settings.last_configuration = Some(Preset::new("Sprint", 60, 10, 4).with_long_break(30, 2));
        let (mut core, clock, _) = core_with(settings);

        core.start();
        clock.advance_secs(60);
        core.tick();
        assert_eq!(core.phase(), Phase::ShortBreak);
        core.skip_to_next_phase();
        core.start();
        clock.advance_secs(60);
        core.tick();
        assert_eq!(core.phase(), Phase::LongBreak);
        assert_eq!(core.remaining_ms(), 30_000);
    }

    #[test]
    fn zero_length_break_is_elided() {
        let mut settings = manual_settings();
        settings.last_configuration = Some(Preset::new("Stack", 60, 0, 3));
        let (mut core, clock, _) = core_with(settings);
        core.start();
        clock.advance_secs(60);
        core.tick();
        assert_eq!(core.phase(), Phase::Focus);
        assert_eq!(core.session_index(), 1);
        assert!(!core.awaiting_break_start());
    }

    #[test]
    fn skip_break_returns_to_idle_focus() {
        let (mut core, clock, _) = core_with(manual_settings());
        core.start();
        clock.advance_secs(1500);
        core.tick();
        assert!(core.awaiting_break_start());
        core.skip_break();
        assert_eq!(core.phase(), Phase::Focus);
        assert_eq!(core.run_state(), RunState::Idle);
        assert_eq!(core.remaining_ms(), 1_500_000);
        assert_eq!(core.session_index(), 1);
    }

    #[test]
    fn invalid_configuration_is_ignored() {
        let (mut core, _, log) = core_with(manual_settings());
        core.set_configuration(Preset::new("Broken", 0, 0, 1));
        assert_eq!(core.configuration().name, "Work");
        assert!(log.events().is_empty());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let (mut core, _, _) = core_with(manual_settings());
        let extra = EventLog::new();
        let id = core.subscribe(extra.clone());
        core.start();
        assert!(core.unsubscribe(id));
        assert!(!core.unsubscribe(id));
        core.reset();
        assert_eq!(extra.events().len(), 1);
    }

    struct CountingAlerts {
        sounds: Rc<Cell<u32>>,
        fail: bool,
    }

    impl AlertSink for CountingAlerts {
        fn play_sound(&self) -> Result<(), crate::error::AlertError> {
            self.sounds.set(self.sounds.get() + 1);
            if self.fail {
                Err(crate::error::AlertError("no audio device".into()))
            } else {
                Ok(())
            }
        }

        fn notify(&self, _title: &str, _body: &str) -> Result<(), crate::error::AlertError> {
            Err(crate::error::AlertError("no notification daemon".into()))
        }
    }

    #[test]
    fn alert_failures_do_not_disturb_transitions() {
        let sounds = Rc::new(Cell::new(0));
        let clock = clock();
        let mut core = TimerCore::new(manual_settings(), clock.clone()).with_alerts(CountingAlerts {
            sounds: sounds.clone(),
            fail: true,
        });
        core.start();
        clock.advance_secs(1500);
        core.tick();
        assert_eq!(sounds.get(), 1);
        assert!(core.awaiting_break_start());

        // skipping is not a natural completion
        core.start_break();
        core.skip_to_next_phase();
        assert_eq!(sounds.get(), 1);
    }

    #[test]
    fn sound_respects_setting() {
        let sounds = Rc::new(Cell::new(0));
        let clock = clock();
        let mut settings = manual_settings();
        settings.sound_enabled = false;
        let mut core = TimerCore::new(settings, clock.clone()).with_alerts(CountingAlerts {
            sounds: sounds.clone(),
            fail: false,
        });
        core.start();
        clock.advance_secs(1500);
        core.tick();
        assert_eq!(sounds.get(), 0);
    }

    #[test]
    fn restore_clamps_and_reanchors() {
        let clock = clock();
        let mut state = TimerState::new(Preset::new("Work", 100, 10, 2), TimerMode::Pomodoro, 60);
        state.remaining_ms = 999_999;
        state.run_state = RunState::Running;
        let core = TimerCore::restore(state, manual_settings(), clock.clone());
        assert_eq!(core.remaining_ms(), 100_000);
        clock.advance_secs(10);
        assert_eq!(core.remaining_ms(), 90_000);
    }

    #[test]
    fn settings_changes_are_persisted() {
        let store = Rc::new(crate::storage::MemoryStore::new());
        let (core, _, _) = core_with(manual_settings());
        let mut core = core.with_store(store.clone());
        core.set_configuration(Preset::new("Short", 600, 120, 2));
        core.set_mode(TimerMode::QuickTimer);

        let saved = Settings::load(store.as_ref());
        assert_eq!(saved.last_configuration.unwrap().name, "Short");
        assert_eq!(saved.last_used_mode, TimerMode::QuickTimer);
    }

    #[test]
    fn failed_persistence_keeps_memory_state() {
        let store = Rc::new(crate::storage::MemoryStore::new());
        store.fail_writes(true);
        let (core, _, _) = core_with(manual_settings());
        let mut core = core.with_store(store);
        core.set_configuration(Preset::new("Short", 600, 120, 2));
        assert_eq!(core.configuration().name, "Short");
        assert_eq!(core.remaining_ms(), 600_000);
    }
}
