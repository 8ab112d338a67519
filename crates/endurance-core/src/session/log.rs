use std::rc::Rc;

use chrono::{DateTime, Local, TimeZone, Utc};
use uuid::Uuid;

use super::record::{RecordHandle, SessionRecord};
use super::stats::{Period, PeriodStats, Summary};
use crate::error::{CoreError, StoreError, ValidationError};
use crate::storage::RecordStore;

/// Owns the session records: opens and finalises them on behalf of the
/// timer and aggregates them into statistics.
///
/// Writes are fire-and-forget. A failed write is logged and the in-memory
/// handle stays authoritative; finalising rewrites the whole record.
pub struct SessionLog<Tz: TimeZone = Local> {
    store: Rc<dyn RecordStore>,
    tz: Tz,
    daily_goal_minutes: u32,
    summary: Summary,
}

impl SessionLog<Local> {
    pub fn new(store: Rc<dyn RecordStore>, daily_goal_minutes: u32) -> Self {
        Self::with_timezone(store, daily_goal_minutes, Local)
    }
}

impl<Tz: TimeZone> SessionLog<Tz> {
    /// A log whose calendar periods are computed in `tz`.
    pub fn with_timezone(store: Rc<dyn RecordStore>, daily_goal_minutes: u32, tz: Tz) -> Self {
        let today = Utc::now().with_timezone(&tz).date_naive();
        let mut log = Self {
            store,
            tz,
            daily_goal_minutes,
            summary: Summary::empty(today),
        };
        log.refresh();
        log
    }

    pub fn daily_goal_minutes(&self) -> u32 {
        self.daily_goal_minutes
    }

    /// Zero means "unset" and is ignored.
    pub fn set_daily_goal(&mut self, minutes: u32) {
        if minutes > 0 {
            self.daily_goal_minutes = minutes;
        }
    }

    /// Create and persist an open record for a segment that just started.
    pub fn start_segment(
        &mut self,
        target_secs: u64,
        preset_name: &str,
        at: DateTime<Utc>,
    ) -> RecordHandle {
        let record = SessionRecord::open(target_secs, preset_name, at);
        tracing::debug!(id = %record.id, preset = preset_name, "session opened");
        self.write(&record);
        RecordHandle { record }
    }

    pub fn complete_segment(&mut self, handle: RecordHandle, at: DateTime<Utc>) {
        self.finish(handle, at, true);
    }

    pub fn cancel_segment(&mut self, handle: RecordHandle, at: DateTime<Utc>) {
        self.finish(handle, at, false);
    }

    fn finish(&mut self, handle: RecordHandle, at: DateTime<Utc>, completed: bool) {
        let mut record = handle.record;
        record.finish(at, completed);
        tracing::info!(
            id = %record.id,
            completed,
            actual_secs = record.actual_secs.unwrap_or(0),
            "session finalised"
        );
        self.write(&record);
        self.refresh_at(at);
    }

    fn write(&self, record: &SessionRecord) {
        if let Err(e) = self.store.upsert_record(record) {
            tracing::warn!(id = %record.id, error = %e, "failed to persist session record");
        }
    }

    /// The newest record left open, e.g. by a previous process.
    pub fn latest_open(&self) -> Option<RecordHandle> {
        match self.store.latest_open_record() {
            Ok(record) => record.map(|record| RecordHandle { record }),
            Err(e) => {
                tracing::warn!(error = %e, "failed to look up open session");
                None
            }
        }
    }

    /// Delete a record by id.
    ///
    /// # Errors
    /// Returns an error if the store rejects the delete.
    pub fn delete(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.store.delete_record(id)?;
        if removed {
            self.refresh();
        }
        Ok(removed)
    }

    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>, StoreError> {
        self.store.recent_records(limit)
    }

    /// Records started in the given period, newest first.
    ///
    /// # Errors
    /// Returns an error if the offset leaves the calendar or the store
    /// cannot be read.
    pub fn records_for(&self, period: Period, offset: i32) -> Result<Vec<SessionRecord>, CoreError> {
        self.records_for_at(period, offset, Utc::now())
    }

    pub fn records_for_at(
        &self,
        period: Period,
        offset: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>, CoreError> {
        let (start, end) = self.range(period, offset, now)?;
        Ok(self.store.records_between(start, end)?)
    }

    /// Completed focus totals for a calendar period.
    ///
    /// # Errors
    /// Returns an error if the offset leaves the calendar or the store
    /// cannot be read.
    pub fn statistics_for(&self, period: Period, offset: i32) -> Result<PeriodStats, CoreError> {
        self.statistics_for_at(period, offset, Utc::now())
    }

    pub fn statistics_for_at(
        &self,
        period: Period,
        offset: i32,
        now: DateTime<Utc>,
    ) -> Result<PeriodStats, CoreError> {
        let bounds = self.range(period, offset, now)?;
        let records = self.store.records_between(bounds.0, bounds.1)?;
        Ok(PeriodStats::from_records(period, bounds, &records))
    }

    fn range(
        &self,
        period: Period,
        offset: i32,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), CoreError> {
        period
            .range(&now.with_timezone(&self.tz), offset)
            .ok_or_else(|| {
                ValidationError::invalid("offset", format!("{offset} is out of range")).into()
            })
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Today's completed focus time over the daily goal, capped at 1.
    pub fn daily_progress(&self) -> f64 {
        if self.daily_goal_minutes == 0 {
            return 0.0;
        }
        let goal_secs = f64::from(self.daily_goal_minutes) * 60.0;
        (self.summary.today.total_focus_secs as f64 / goal_secs).min(1.0)
    }

    pub fn refresh(&mut self) {
        self.refresh_at(Utc::now());
    }

    /// Recompute the summary as seen at `now`. A failed read keeps the
    /// previous summary.
    pub fn refresh_at(&mut self, now: DateTime<Utc>) {
        match self.store.all_records() {
            Ok(records) => {
                self.summary = Summary::compute(&now.with_timezone(&self.tz), &records);
            }
            Err(e) => tracing::warn!(error = %e, "failed to refresh session statistics"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{Duration, FixedOffset};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 29, 9, 0, 0).unwrap()
    }

    fn log() -> (SessionLog<FixedOffset>, Rc<MemoryStore>) {
        let store = Rc::new(MemoryStore::new());
        let log = SessionLog::with_timezone(store.clone(), 120, FixedOffset::east_opt(0).unwrap());
        (log, store)
    }

    #[test]
    fn start_then_complete() {
        let (mut log, store) = log();
        let handle = log.start_segment(1500, "Focus", t0());
        assert!(store.latest_open_record().unwrap().is_some());

        log.complete_segment(handle, t0() + Duration::seconds(1500));
        let all = store.all_records().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].completed);
        assert_eq!(all[0].actual_secs, Some(1500));
        assert!(store.latest_open_record().unwrap().is_none());

        let summary = log.summary();
        assert_eq!(summary.today.total_focus_secs, 1500);
        assert_eq!(summary.today.sessions_completed, 1);
        assert_eq!(summary.week.len(), 7);
        assert_eq!(summary.week[6].date, summary.today.date);
        assert_eq!(summary.completion_rate, 1.0);
    }

    #[test]
    fn cancelled_records_do_not_count() {
        let (mut log, _) = log();
        let handle = log.start_segment(1500, "Focus", t0());
        log.cancel_segment(handle, t0() + Duration::seconds(10));
        let stats = log.statistics_for_at(Period::Day, 0, t0()).unwrap();
        assert_eq!(stats.sessions, 0);
        assert_eq!(stats.total_focus_secs, 0);
        assert_eq!(log.summary().total_sessions, 1);
        assert_eq!(log.summary().completion_rate, 0.0);
    }

    #[test]
    fn daily_progress_caps_at_one() {
        let (mut log, _) = log();
        for i in 0..3 {
            let start = t0() + Duration::hours(i);
            let handle = log.start_segment(3000, "Deep Work", start);
            log.complete_segment(handle, start + Duration::seconds(3000));
        }
        assert_eq!(log.daily_progress(), 1.0);

        log.set_daily_goal(0);
        assert_eq!(log.daily_goal_minutes(), 120);
        log.set_daily_goal(600);
        assert_eq!(log.daily_progress(), 0.25);
    }

    #[test]
    fn periods_use_half_open_ranges() {
        let (mut log, _) = log();
        let midnight = Utc.with_ymd_and_hms(2026, 1, 30, 0, 0, 0).unwrap();
        for start in [midnight - Duration::seconds(1), midnight] {
            let handle = log.start_segment(600, "Focus", start);
            log.complete_segment(handle, start + Duration::seconds(600));
        }
        let today = log.statistics_for_at(Period::Day, 0, midnight).unwrap();
        let yesterday = log.statistics_for_at(Period::Day, -1, midnight).unwrap();
        assert_eq!(today.sessions, 1);
        assert_eq!(yesterday.sessions, 1);
        assert_eq!(log.records_for_at(Period::Week, 0, midnight).unwrap().len(), 2);
    }

    #[test]
    fn delete_refreshes_summary() {
        let (mut log, _) = log();
        let handle = log.start_segment(600, "Focus", t0());
        let id = handle.id();
        log.complete_segment(handle, t0() + Duration::seconds(600));
        assert_eq!(log.summary().total_sessions, 1);

        assert!(log.delete(id).unwrap());
        assert!(!log.delete(id).unwrap());
        assert_eq!(log.summary().total_sessions, 0);
    }

    #[test]
    fn write_failures_leave_handle_usable() {
        let (mut log, store) = log();
        store.fail_writes(true);
        let handle = log.start_segment(600, "Focus", t0());
        assert_eq!(handle.record().target_secs, 600);
        log.complete_segment(handle.clone(), t0() + Duration::seconds(600));
        assert!(store.all_records().unwrap().is_empty());

        // the next successful write persists the whole record
        store.fail_writes(false);
        log.complete_segment(handle, t0() + Duration::seconds(600));
        assert_eq!(store.all_records().unwrap().len(), 1);
    }

    #[test]
    fn absurd_offset_is_an_error() {
        let (log, _) = log();
        assert!(log.statistics_for_at(Period::Year, i32::MIN, t0()).is_err());
    }
}
