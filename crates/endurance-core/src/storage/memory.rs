use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{KvStore, RecordStore};
use crate::error::StoreError;
use crate::session::SessionRecord;

/// Volatile store for ephemeral runs and tests.
///
/// `fail_writes` makes every write fail, which is how callers exercise their
/// persistence-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    kv: RefCell<HashMap<String, String>>,
    records: RefCell<Vec<SessionRecord>>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            Err(StoreError::Locked)
        } else {
            Ok(())
        }
    }

    fn sorted(mut records: Vec<SessionRecord>) -> Vec<SessionRecord> {
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }
}

impl KvStore for MemoryStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.kv.borrow().get(key).cloned())
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.kv.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn kv_remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.kv.borrow_mut().remove(key);
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn upsert_record(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut records = self.records.borrow_mut();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    fn delete_record(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut records = self.records.borrow_mut();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        let hits = self
            .records
            .borrow()
            .iter()
            .filter(|r| r.started_at >= start && r.started_at < end)
            .cloned()
            .collect();
        Ok(Self::sorted(hits))
    }

    fn recent_records(&self, limit: usize) -> Result<Vec<SessionRecord>, StoreError> {
        let mut all = Self::sorted(self.records.borrow().clone());
        all.truncate(limit);
        Ok(all)
    }

    fn all_records(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(Self::sorted(self.records.borrow().clone()))
    }

    fn latest_open_record(&self) -> Result<Option<SessionRecord>, StoreError> {
        Ok(Self::sorted(self.records.borrow().clone())
            .into_iter()
            .find(SessionRecord::is_open))
    }
}
