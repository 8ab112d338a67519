//! Calendar periods and focus statistics.
//!
//! Boundaries are computed on local calendar dates (weeks start on Monday)
//! and converted to UTC half-open ranges for querying the record store.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::record::SessionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "today" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

impl Period {
    /// First local date of the period containing `today`, shifted by `offset`
    /// whole periods (0 = current, -1 = previous).
    fn first_day(self, today: NaiveDate, offset: i32) -> Option<NaiveDate> {
        match self {
            Period::Day => shift_days(today, i64::from(offset)),
            Period::Week => {
                let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
                shift_days(monday, i64::from(offset) * 7)
            }
            Period::Month => shift_months(today.with_day(1)?, offset),
            Period::Year => NaiveDate::from_ymd_opt(today.year().checked_add(offset)?, 1, 1),
        }
    }

    fn next_first_day(self, first: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Day => first.checked_add_days(Days::new(1)),
            Period::Week => first.checked_add_days(Days::new(7)),
            Period::Month => first.checked_add_months(Months::new(1)),
            Period::Year => first.checked_add_months(Months::new(12)),
        }
    }

    /// Half-open `[start, end)` UTC range of the period containing `now` in
    /// `now`'s time zone, shifted by `offset` periods. `None` when the shift
    /// leaves the representable calendar.
    pub fn range<Tz: TimeZone>(
        self,
        now: &DateTime<Tz>,
        offset: i32,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let tz = now.timezone();
        let first = self.first_day(now.date_naive(), offset)?;
        let next = self.next_first_day(first)?;
        Some((local_midnight(&tz, first)?, local_midnight(&tz, next)?))
    }
}

fn shift_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

fn shift_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

/// Start of `date` in `tz`. When midnight falls in a DST gap the first
/// instant of the day that exists is used.
pub(crate) fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    (0..=2)
        .filter_map(|hour| {
            let candidate = midnight + chrono::Duration::hours(hour);
            tz.from_local_datetime(&candidate).earliest()
        })
        .next()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Aggregate over one calendar period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub period: Period,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Sum of target durations of completed records.
    pub total_focus_secs: u64,
    pub sessions: u32,
    pub average_secs: u64,
}

impl PeriodStats {
    pub(crate) fn from_records(
        period: Period,
        (start, end): (DateTime<Utc>, DateTime<Utc>),
        records: &[SessionRecord],
    ) -> Self {
        let (total_focus_secs, sessions) = completed_totals(records);
        Self {
            period,
            start,
            end,
            total_focus_secs,
            sessions,
            average_secs: if sessions > 0 {
                total_focus_secs / u64::from(sessions)
            } else {
                0
            },
        }
    }

    pub fn formatted_total(&self) -> String {
        format_hours_minutes(self.total_focus_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_focus_secs: u64,
    pub sessions_completed: u32,
}

impl DailyStats {
    pub(crate) fn from_records(date: NaiveDate, records: &[SessionRecord]) -> Self {
        let (total_focus_secs, sessions_completed) = completed_totals(records);
        Self {
            date,
            total_focus_secs,
            sessions_completed,
        }
    }

    /// "1h 5m" or "45m".
    pub fn formatted_time(&self) -> String {
        format_hours_minutes(self.total_focus_secs)
    }

    /// Abbreviated weekday, e.g. "Mon".
    pub fn day_label(&self) -> String {
        self.date.format("%a").to_string()
    }
}

/// Snapshot recomputed whenever a record is finalised or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub today: DailyStats,
    /// The last seven days including today, oldest first.
    pub week: Vec<DailyStats>,
    pub total_focus_secs: u64,
    /// Every record, completed or not.
    pub total_sessions: u32,
    /// Completed records over all records, 0 when there are none.
    pub completion_rate: f64,
}

impl Summary {
    pub(crate) fn empty(today: NaiveDate) -> Self {
        Self {
            today: DailyStats::from_records(today, &[]),
            week: Vec::new(),
            total_focus_secs: 0,
            total_sessions: 0,
            completion_rate: 0.0,
        }
    }

    /// Build from every stored record, as seen at `now`.
    pub(crate) fn compute<Tz: TimeZone>(now: &DateTime<Tz>, records: &[SessionRecord]) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();

        let day_stats = |date: NaiveDate| {
            let bounds = local_midnight(&tz, date).zip(
                date.succ_opt()
                    .and_then(|next| local_midnight(&tz, next)),
            );
            let in_day: Vec<SessionRecord> = match bounds {
                Some((start, end)) => records
                    .iter()
                    .filter(|r| r.started_at >= start && r.started_at < end)
                    .cloned()
                    .collect(),
                None => Vec::new(),
            };
            DailyStats::from_records(date, &in_day)
        };

        let week = (0..7u64)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .map(day_stats)
            .collect();

        let (total_focus_secs, completed) = completed_totals(records);
        let total_sessions = u32::try_from(records.len()).unwrap_or(u32::MAX);
        Self {
            today: day_stats(today),
            week,
            total_focus_secs,
            total_sessions,
            completion_rate: if total_sessions > 0 {
                f64::from(completed) / f64::from(total_sessions)
            } else {
                0.0
            },
        }
    }
}

fn completed_totals(records: &[SessionRecord]) -> (u64, u32) {
    records
        .iter()
        .filter(|r| r.completed)
        .fold((0, 0), |(secs, count), r| {
            (secs + r.target_secs, count + 1)
        })
}

fn format_hours_minutes(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(tz: &FixedOffset, y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        tz.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn week_starts_on_monday() {
        let utc = FixedOffset::east_opt(0).unwrap();
        // 2026-01-29 is a Thursday
        let now = at(&utc, 2026, 1, 29, 15);
        let (start, end) = Period::Week.range(&now, 0).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 1, 26, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap());

        let (prev, _) = Period::Week.range(&now, -1).unwrap();
        assert_eq!(prev, Utc.with_ymd_and_hms(2026, 1, 19, 0, 0, 0).unwrap());
    }

    #[test]
    fn ranges_follow_local_midnight() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = at(&tokyo, 2026, 3, 1, 1);
        let (start, end) = Period::Day.range(&now, 0).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 28, 15, 0, 0).unwrap());
        assert_eq!(end - start, chrono::Duration::days(1));
    }

    #[test]
    fn month_and_year_offsets() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let now = at(&utc, 2026, 1, 15, 12);
        let (start, end) = Period::Month.range(&now, -1).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());

        let (start, end) = Period::Year.range(&now, 1).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2028, 1, 1, 0, 0, 0).unwrap());

        assert!(Period::Year.range(&now, i32::MAX).is_none());
    }

    #[test]
    fn period_stats_count_only_completed() {
        let t = Utc.with_ymd_and_hms(2026, 1, 29, 9, 0, 0).unwrap();
        let mut done = SessionRecord::open(1500, "Focus", t);
        done.finish(t + chrono::Duration::seconds(1600), true);
        let mut dropped = SessionRecord::open(1500, "Focus", t);
        dropped.finish(t + chrono::Duration::seconds(60), false);
        let mut short = SessionRecord::open(900, "Sprint", t);
        short.finish(t + chrono::Duration::seconds(900), true);

        let stats = PeriodStats::from_records(Period::Day, (t, t), &[done, dropped, short]);
        assert_eq!(stats.total_focus_secs, 2400);
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.average_secs, 1200);
        assert_eq!(stats.formatted_total(), "40m");
    }

    #[test]
    fn parses_periods() {
        assert_eq!("Week".parse::<Period>().unwrap(), Period::Week);
        assert!("fortnight".parse::<Period>().is_err());
    }
}
