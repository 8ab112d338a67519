//! Session log: persisted focus records and the statistics built on them.

mod log;
mod record;
mod stats;
mod tracker;

pub use log::SessionLog;
pub use record::{RecordHandle, SessionRecord};
pub use stats::{DailyStats, Period, PeriodStats, Summary};
pub use tracker::SessionTracker;
