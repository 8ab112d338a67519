mod command;
mod engine;
mod observer;
mod preset;
mod state;

pub use command::Command;
pub use engine::{TimerCore, QUICK_TIMER_FLOOR_SECS};
pub use observer::{AlertSink, ChannelObserver, EventLog, SubscriptionId, TimerObserver};
pub use preset::{builtin_presets, Phase, Preset, PresetIcon};
pub use state::{format_clock, format_menu_bar, Anchor, RunState, Snapshot, TimerMode, TimerState};
