//! Day and week aggregates over session history.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::Session;

/// Half-open `[start, end)` interval matched against session end times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The local calendar day `date`, midnight to midnight.
    pub fn local_day(date: NaiveDate) -> Self {
        Self::local_days(date, date)
    }

    /// Local calendar days `first..=last`.
    pub fn local_days(first: NaiveDate, last: NaiveDate) -> Self {
        let after_last = last.succ_opt().unwrap_or(last);
        Self {
            start: local_midnight(first),
            end: local_midnight(after_last),
        }
    }

    /// The seven local days ending with the day containing `now`.
    pub fn trailing_week(now: DateTime<Utc>) -> Self {
        let today = now.with_timezone(&Local).date_naive();
        let first = today - Duration::days(6);
        Self::local_days(first, today)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date, |t| {
        Local
            .from_local_datetime(&t)
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// First whole hour of `date` that exists in the zone behind `resolve`.
///
/// Some zones skip midnight on DST days; their day then starts at the first
/// hour after the jump.
fn start_of_day(
    date: NaiveDate,
    resolve: impl Fn(NaiveDateTime) -> LocalResult<DateTime<Utc>>,
) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|t| resolve(t).earliest())
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Aggregates for a set of sessions.
///
/// Focus time counts every work session, cancelled partials included.
/// Averages and rates are over all work sessions, 0 when there are none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PomodoroStats {
    pub completed_work_sessions: u32,
    pub total_work_sessions: u32,
    pub total_focus_secs: i64,
    pub total_break_secs: i64,
    pub average_session_secs: f64,
    /// 0.0 to 1.0
    pub completion_rate: f64,
}

impl PomodoroStats {
    /// Reduce the ended sessions whose end time falls in `range`.
    pub fn compute<'a>(sessions: impl IntoIterator<Item = &'a Session>, range: &DateRange) -> Self {
        let mut stats = Self::default();
        for session in sessions {
            let Some(ended_at) = session.ended_at else {
                continue;
            };
            if !range.contains(ended_at) {
                continue;
            }
            let secs = session.actual_duration(ended_at).num_seconds();
            if session.session_type.is_work() {
                stats.total_work_sessions += 1;
                stats.total_focus_secs += secs;
                if session.completed {
                    stats.completed_work_sessions += 1;
                }
            } else {
                stats.total_break_secs += secs;
            }
        }
        if stats.total_work_sessions > 0 {
            let total = stats.total_work_sessions as f64;
            stats.average_session_secs = stats.total_focus_secs as f64 / total;
            stats.completion_rate = stats.completed_work_sessions as f64 / total;
        }
        stats
    }

    pub fn total_focus_time(&self) -> Duration {
        Duration::seconds(self.total_focus_secs)
    }

    pub fn total_break_time(&self) -> Duration {
        Duration::seconds(self.total_break_secs)
    }
}
