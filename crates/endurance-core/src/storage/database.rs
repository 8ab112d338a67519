//! SQLite-based storage.
//!
//! Provides persistent storage for:
//! - Session records (start/end, target and actual duration, outcome)
//! - Key-value store for settings and the preset catalog

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{data_dir, migrations, KvStore, RecordStore};
use crate::error::StoreError;
use crate::session::SessionRecord;

const SESSION_COLUMNS: &str =
    "id, started_at, ended_at, target_secs, actual_secs, completed, preset_name";

/// SQLite database for records and key-value state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/endurance.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("endurance.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        migrations::migrate(&self.conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

/// Fixed-width UTC form so lexical order in SQLite equals time order.
fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    let started_at: String = row.get(1)?;
    let ended_at: Option<String> = row.get(2)?;
    let target_secs: i64 = row.get(3)?;
    let actual_secs: Option<i64> = row.get(4)?;
    Ok(SessionRecord {
        id,
        started_at: decode_time(1, &started_at)?,
        ended_at: ended_at.map(|raw| decode_time(2, &raw)).transpose()?,
        target_secs: target_secs.max(0) as u64,
        actual_secs: actual_secs.map(|s| s.max(0) as u64),
        completed: row.get::<_, i64>(5)? != 0,
        preset_name: row.get(6)?,
    })
}

impl KvStore for Database {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn kv_remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn kv_set_many(&self, entries: &[(String, String)]) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl RecordStore for Database {
    fn upsert_record(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sessions
                (id, started_at, ended_at, target_secs, actual_secs, completed, preset_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                encode_time(record.started_at),
                record.ended_at.map(encode_time),
                record.target_secs as i64,
                record.actual_secs.map(|s| s as i64),
                record.completed as i64,
                record.preset_name,
            ],
        )?;
        Ok(())
    }

    fn delete_record(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }

    fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        self.query_records(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE started_at >= ?1 AND started_at < ?2
                 ORDER BY started_at DESC"
            ),
            params![encode_time(start), encode_time(end)],
        )
    }

    fn recent_records(&self, limit: usize) -> Result<Vec<SessionRecord>, StoreError> {
        self.query_records(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY started_at DESC LIMIT ?1"),
            params![limit as i64],
        )
    }

    fn all_records(&self) -> Result<Vec<SessionRecord>, StoreError> {
        self.query_records(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY started_at DESC"),
            [],
        )
    }

    fn latest_open_record(&self) -> Result<Option<SessionRecord>, StoreError> {
        let mut records = self.query_records(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE ended_at IS NULL
                 ORDER BY started_at DESC LIMIT 1"
            ),
            [],
        )?;
        Ok(records.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let mut record = SessionRecord::open(1500, "Focus", at(9));
        db.upsert_record(&record).unwrap();
        assert_eq!(db.latest_open_record().unwrap().unwrap().id, record.id);

        record.finish(at(9) + Duration::minutes(25), true);
        db.upsert_record(&record).unwrap();
        let all = db.all_records().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], record);
        assert!(db.latest_open_record().unwrap().is_none());
    }

    #[test]
    fn range_scan_is_half_open_and_newest_first() {
        let db = Database::open_memory().unwrap();
        for hour in [8, 9, 10, 11] {
            db.upsert_record(&SessionRecord::open(60, "Focus", at(hour))).unwrap();
        }
        let hits = db.records_between(at(9), at(11)).unwrap();
        let hours: Vec<_> = hits.iter().map(|r| r.started_at).collect();
        assert_eq!(hours, vec![at(10), at(9)]);

        let recent = db.recent_records(2).unwrap();
        assert_eq!(recent[0].started_at, at(11));
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn delete_reports_whether_removed() {
        let db = Database::open_memory().unwrap();
        let record = SessionRecord::open(60, "Focus", at(9));
        db.upsert_record(&record).unwrap();
        assert!(db.delete_record(record.id).unwrap());
        assert!(!db.delete_record(record.id).unwrap());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_set_many(&[("a".into(), "1".into()), ("test".into(), "bye".into())])
            .unwrap();
        assert_eq!(db.kv_get("test").unwrap().as_deref(), Some("bye"));
        db.kv_remove("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn reopening_a_file_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("endurance.db");
        let record = SessionRecord::open(900, "Sprint", at(7));
        {
            let db = Database::open_at(&path).unwrap();
            db.upsert_record(&record).unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.all_records().unwrap(), vec![record]);
    }
}
