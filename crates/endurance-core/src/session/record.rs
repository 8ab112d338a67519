use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One logged focus or quick-timer segment.
///
/// The preset name and target duration are snapshots taken at start, so
/// editing or deleting the preset later leaves the history untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub target_secs: u64,
    pub actual_secs: Option<u64>,
    pub completed: bool,
    pub preset_name: String,
}

impl SessionRecord {
    pub fn open(target_secs: u64, preset_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            ended_at: None,
            target_secs,
            actual_secs: None,
            completed: false,
            preset_name: preset_name.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    pub(crate) fn finish(&mut self, ended_at: DateTime<Utc>, completed: bool) {
        self.ended_at = Some(ended_at);
        self.completed = completed;
        self.actual_secs = Some((ended_at - self.started_at).num_seconds().max(0) as u64);
    }

    /// "25 min" as shown in history lists.
    pub fn formatted_duration(&self) -> String {
        format!("{} min", self.target_secs / 60)
    }
}

/// Handle to a record opened by the session log and not yet finalised.
///
/// It owns the in-memory copy of the record, which stays authoritative even
/// if persisting it failed; finalising writes the whole record again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHandle {
    pub(crate) record: SessionRecord,
}

impl RecordHandle {
    pub fn id(&self) -> Uuid {
        self.record.id
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }
}
