//! Async host loop for the timer.
//!
//! Runs the core on a single task: commands from a channel and the periodic
//! tick are serialised through one `tokio::select!`, so a command and a tick
//! never interleave. The core is not `Send`; drive this future on a
//! current-thread runtime or a `LocalSet`.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{self, MissedTickBehavior};

use crate::clock::elapsed_ms;
use crate::storage::TimerConfig;
use crate::timer::{Command, Snapshot, TimerCore};

/// Drive `core` until `Command::Shutdown` arrives or every command sender is
/// dropped, then hand the core back for saving.
///
/// `Command::Status` replies with a snapshot on `status`. Between two ticks a
/// wall-clock jump larger than `clock_gap_threshold_ms` is reported to the
/// core as a suspension.
pub async fn run(
    mut core: TimerCore,
    mut commands: UnboundedReceiver<Command>,
    status: UnboundedSender<Snapshot>,
    config: &TimerConfig,
) -> TimerCore {
    let mut ticker = time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let gap_threshold = config.clock_gap_threshold_ms;
    let mut last_seen: Option<DateTime<Utc>> = None;

    tracing::debug!(tick_ms = config.tick_interval_ms, "timer loop started");
    loop {
        tokio::select! {
            biased;

            command = commands.recv() => {
                last_seen = None;
                match command {
                    None | Some(Command::Shutdown) => break,
                    Some(Command::Status) => {
                        // The requester may have gone away; nothing to do then.
                        let _ = status.send(core.snapshot());
                    }
                    Some(command) => core.apply(command),
                }
            }
            _ = ticker.tick() => {
                if !core.is_ticking() {
                    last_seen = None;
                    continue;
                }
                let now = core.now();
                if let Some(prev) = last_seen {
                    let gap = elapsed_ms(prev, now);
                    if gap > gap_threshold {
                        tracing::info!(gap_ms = gap, "clock gap detected");
                        core.handle_clock_gap(prev, now);
                    }
                }
                core.tick();
                last_seen = core.is_ticking().then_some(now);
            }
        }
    }
    tracing::debug!("timer loop stopped");
    core
}
