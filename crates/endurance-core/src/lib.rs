//! # Endurance Core Library
//!
//! Core logic for the Endurance focus timer. Every operation is available
//! through the standalone `endurance` CLI, which is a thin layer over this
//! crate.
//!
//! ## Architecture
//!
//! - **Timer Core**: A wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()` for progress updates
//! - **Preset Catalog**: Shipped and user-defined timer configurations
//! - **Session Log**: Focus records and period statistics fed by timer events
//! - **Storage**: SQLite key-value and record storage, TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerCore`]: Core timer state machine
//! - [`PresetCatalog`]: Preset CRUD over a [`KvStore`]
//! - [`SessionLog`] and [`SessionTracker`]: Session persistence and statistics
//! - [`Database`]: SQLite implementation of both store traits
//! - [`driver::run`]: Async tick loop for long-running hosts

pub mod catalog;
pub mod clock;
pub mod driver;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod timer;

pub use catalog::PresetCatalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AlertError, ConfigError, CoreError, StoreError, ValidationError};
pub use events::{Event, Segment};
pub use session::{
    DailyStats, Period, PeriodStats, RecordHandle, SessionLog, SessionRecord, SessionTracker,
    Summary,
};
pub use storage::{Config, Database, KvStore, MemoryStore, RecordStore, Settings};
pub use timer::{
    AlertSink, Command, EventLog, Phase, Preset, PresetIcon, RunState, Snapshot, TimerCore,
    TimerMode, TimerObserver, TimerState,
};
