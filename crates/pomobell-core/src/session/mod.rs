//! Session accounting.
//!
//! One [`Session`] is recorded per work or break interval attempt. The
//! [`SessionTracker`] owns the active slot, the history and the
//! work-interval counter; [`PomodoroStats`] are always derived from history.

mod stats;
mod tracker;

pub use stats::{DateRange, PomodoroStats};
pub use tracker::{SessionTracker, ACTIVE_KEY, COUNTER_KEY, HISTORY_KEY, HISTORY_LIMIT};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::BreakKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_work(self) -> bool {
        self == SessionType::Work
    }
}

impl From<BreakKind> for SessionType {
    fn from(kind: BreakKind) -> Self {
        match kind {
            BreakKind::Short => SessionType::ShortBreak,
            BreakKind::Long => SessionType::LongBreak,
        }
    }
}

/// A single work or break interval attempt.
///
/// `ended_at` is set exactly once, together with exactly one of `completed`
/// or `cancelled`. Only [`SessionTracker`] mutates sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub session_type: SessionType,
    pub started_at: DateTime<Utc>,
    /// Planned length in seconds.
    pub expected_secs: i64,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub cancelled: bool,
}

impl Session {
    pub(crate) fn begin(session_type: SessionType, started_at: DateTime<Utc>, expected: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_type,
            started_at,
            expected_secs: expected.num_seconds(),
            ended_at: None,
            completed: false,
            cancelled: false,
        }
    }

    pub(crate) fn finish(&mut self, at: DateTime<Utc>, completed: bool) {
        debug_assert!(self.ended_at.is_none(), "session finished twice");
        self.ended_at = Some(at);
        self.completed = completed;
        self.cancelled = !completed;
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn expected_duration(&self) -> Duration {
        Duration::seconds(self.expected_secs)
    }

    /// `end - start`, or `now - start` while still active. Never negative.
    pub fn actual_duration(&self, now: DateTime<Utc>) -> Duration {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).max(Duration::zero())
    }

    /// `actual / expected`, capped at 1.0.
    pub fn completion_percentage(&self, now: DateTime<Utc>) -> f64 {
        if self.expected_secs <= 0 {
            return 0.0;
        }
        let actual = self.actual_duration(now).num_milliseconds() as f64 / 1000.0;
        (actual / self.expected_secs as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap() + Duration::minutes(min)
    }

    #[test]
    fn active_session_measures_against_now() {
        let session = Session::begin(SessionType::Work, at(0), Duration::minutes(25));
        assert!(session.is_active());
        assert_eq!(session.actual_duration(at(10)), Duration::minutes(10));
        assert!((session.completion_percentage(at(10)) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn finished_session_ignores_now() {
        let mut session = Session::begin(SessionType::ShortBreak, at(0), Duration::minutes(5));
        session.finish(at(5), true);
        assert!(session.completed && !session.cancelled);
        assert_eq!(session.actual_duration(at(60)), Duration::minutes(5));
    }

    #[test]
    fn completion_is_capped_at_one() {
        let mut session = Session::begin(SessionType::Work, at(0), Duration::minutes(25));
        session.finish(at(40), true);
        assert_eq!(session.completion_percentage(at(40)), 1.0);
    }

    #[test]
    fn cancelled_is_exclusive_with_completed() {
        let mut session = Session::begin(SessionType::Work, at(0), Duration::minutes(25));
        session.finish(at(3), false);
        assert!(session.cancelled && !session.completed);
    }

    #[test]
    fn break_kinds_map_to_session_types() {
        assert_eq!(SessionType::from(BreakKind::Short), SessionType::ShortBreak);
        assert_eq!(SessionType::from(BreakKind::Long), SessionType::LongBreak);
        assert!(!SessionType::LongBreak.is_work());
    }
}
