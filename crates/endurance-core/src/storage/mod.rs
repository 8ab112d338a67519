mod config;
pub mod database;
mod memory;
pub mod migrations;
mod settings;

pub use config::{Config, LoggingConfig, TimerConfig};
pub use database::Database;
pub use memory::MemoryStore;
pub use settings::Settings;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::session::SessionRecord;

/// Returns the data directory, creating it if needed.
///
/// `ENDURANCE_DATA_DIR` wins when set. Otherwise `~/.config/endurance[-dev]/`
/// based on `ENDURANCE_ENV` (set it to `dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let dir = data_dir_location();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Where `data_dir` points, without touching the filesystem.
pub fn data_dir_location() -> PathBuf {
    match std::env::var_os("ENDURANCE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ENDURANCE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("endurance-dev")
            } else {
                base_dir.join("endurance")
            }
        }
    }
}

/// Key to scalar store used for settings and the preset catalog.
pub trait KvStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn kv_remove(&self, key: &str) -> Result<(), StoreError>;

    /// Write several keys. Implementations that can should make this a
    /// single transaction; each individual key is always written whole.
    fn kv_set_many(&self, entries: &[(String, String)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.kv_set(key, value)?;
        }
        Ok(())
    }
}

/// Append-mostly store of session records.
///
/// Every listing is sorted by start time, newest first.
pub trait RecordStore {
    fn upsert_record(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Returns whether a record was removed.
    fn delete_record(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Records whose start lies in `[start, end)`.
    fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>, StoreError>;

    fn recent_records(&self, limit: usize) -> Result<Vec<SessionRecord>, StoreError>;

    fn all_records(&self) -> Result<Vec<SessionRecord>, StoreError>;

    /// The newest record that was started but never finalised.
    fn latest_open_record(&self) -> Result<Option<SessionRecord>, StoreError>;
}
