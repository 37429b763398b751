//! The session tracker: active slot, history, counter, statistics.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use serde::de::DeserializeOwned;

use super::{DateRange, PomodoroStats, Session, SessionType};
use crate::clock::Clock;
use crate::error::{report, CoreError, Result};
use crate::storage::{ConfigStore, KeyValueStore};
use crate::timer::BreakKind;

/// Persisted history keeps only this many of the most recent sessions.
pub const HISTORY_LIMIT: usize = 100;

pub const HISTORY_KEY: &str = "session_history";
/// Holds the in-flight session so a crash can be recorded on next load.
pub const ACTIVE_KEY: &str = "active_session";
pub const COUNTER_KEY: &str = "work_intervals_done";
const LAST_RESET_KEY: &str = "last_reset_date";

/// Records sessions and owns the canonical work-interval counter.
///
/// At most one session is active at a time. Starting a second one fails with
/// `SessionAlreadyActive` and leaves the first untouched.
pub struct SessionTracker {
    store: Arc<dyn KeyValueStore>,
    config: Arc<ConfigStore>,
    clock: Arc<dyn Clock>,
    history: Vec<Session>,
    active: Option<Session>,
    work_intervals_done: u32,
    today: PomodoroStats,
    last_reset: Option<NaiveDate>,
}

impl SessionTracker {
    /// Load persisted state.
    ///
    /// A session left active by a previous process is recorded as cancelled
    /// at load time.
    ///
    /// # Errors
    /// Returns an error if the store fails. Undecodable values are logged
    /// and treated as absent.
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        config: Arc<ConfigStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let history: Vec<Session> = read_json(store.as_ref(), HISTORY_KEY)?.unwrap_or_default();
        let work_intervals_done = match store.get(COUNTER_KEY)? {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "work interval counter unreadable, starting at 0");
                0
            }),
            None => 0,
        };
        let last_reset = store
            .get(LAST_RESET_KEY)?
            .and_then(|raw| raw.parse::<NaiveDate>().ok());
        let leftover: Option<Session> = read_json(store.as_ref(), ACTIVE_KEY)?;

        let mut tracker = Self {
            store,
            config,
            clock,
            history,
            active: None,
            work_intervals_done,
            today: PomodoroStats::default(),
            last_reset,
        };

        if let Some(mut session) = leftover.filter(Session::is_active) {
            tracing::warn!(id = %session.id, kind = ?session.session_type, "recording interrupted session as cancelled");
            // Downtime isn't focus time: the interval can't have run past its planned end.
            let planned_end = session.started_at + session.expected_duration();
            session.finish(tracker.clock.now().min(planned_end), false);
            tracker.history.push(session);
            tracker.persist_history();
        }
        tracker.store.remove(ACTIVE_KEY)?;
        tracker.recompute_today();
        tracker.refresh_daily();
        Ok(tracker)
    }

    /// Read persisted history without touching any other state.
    pub fn read_history(store: &dyn KeyValueStore) -> Result<Vec<Session>> {
        Ok(read_json(store, HISTORY_KEY)?.unwrap_or_default())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn active_session(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    /// In-memory history, oldest first. May exceed [`HISTORY_LIMIT`].
    pub fn history(&self) -> &[Session] {
        &self.history
    }

    pub fn work_intervals_done(&self) -> u32 {
        self.work_intervals_done
    }

    /// True once the counter reaches the configured set size.
    pub fn should_take_long_break(&self) -> bool {
        self.work_intervals_done >= self.config.get().work_intervals_in_set
    }

    /// Today's statistics, recomputed from scratch on the first call of a
    /// new local calendar day.
    pub fn today_stats(&mut self) -> PomodoroStats {
        self.refresh_daily();
        self.today.clone()
    }

    pub fn stats_for_range(&self, range: &DateRange) -> PomodoroStats {
        PomodoroStats::compute(&self.history, range)
    }

    pub fn weekly_stats(&self) -> PomodoroStats {
        self.stats_for_range(&DateRange::trailing_week(self.clock.now()))
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start_work_session(&mut self) -> Result<&Session> {
        let expected = self.config.get().work_duration();
        self.start(SessionType::Work, expected)
    }

    pub fn start_break_session(&mut self, kind: BreakKind) -> Result<&Session> {
        let expected = self.config.get().break_duration(kind);
        self.start(kind.into(), expected)
    }

    pub fn complete_current_session(&mut self) -> Result<Session> {
        self.finish(true)
    }

    pub fn cancel_current_session(&mut self) -> Result<Session> {
        self.finish(false)
    }

    pub fn reset_cycle(&mut self) -> Result<()> {
        self.work_intervals_done = 0;
        self.store.set(COUNTER_KEY, "0")
    }

    /// Wipe history, counter, active session and their persisted copies.
    pub fn clear_all_data(&mut self) -> Result<()> {
        self.history.clear();
        self.active = None;
        self.work_intervals_done = 0;
        self.today = PomodoroStats::default();
        for key in [HISTORY_KEY, ACTIVE_KEY, COUNTER_KEY, LAST_RESET_KEY] {
            self.store.remove(key)?;
        }
        self.last_reset = None;
        tracing::info!("session data cleared");
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start(&mut self, session_type: SessionType, expected: Duration) -> Result<&Session> {
        if self.active.is_some() {
            return Err(CoreError::SessionAlreadyActive);
        }
        let session = Session::begin(session_type, self.clock.now(), expected);
        tracing::debug!(id = %session.id, kind = ?session_type, expected_secs = session.expected_secs, "session started");
        if let Err(e) = write_json(self.store.as_ref(), ACTIVE_KEY, &session) {
            report("session_tracker.persist_active", &e);
        }
        Ok(self.active.insert(session))
    }

    fn finish(&mut self, completed: bool) -> Result<Session> {
        let mut session = self.active.take().ok_or(CoreError::NoActiveSession)?;
        session.finish(self.clock.now(), completed);
        tracing::debug!(id = %session.id, completed, "session finished");

        if completed && session.session_type.is_work() {
            self.work_intervals_done += 1;
            if let Err(e) = self
                .store
                .set(COUNTER_KEY, &self.work_intervals_done.to_string())
            {
                report("session_tracker.persist_counter", &e);
            }
        }

        self.history.push(session.clone());
        self.persist_history();
        if let Err(e) = self.store.remove(ACTIVE_KEY) {
            report("session_tracker.clear_active", &e);
        }
        self.recompute_today();
        Ok(session)
    }

    fn persist_history(&self) {
        let keep_from = self.history.len().saturating_sub(HISTORY_LIMIT);
        if let Err(e) = write_json(self.store.as_ref(), HISTORY_KEY, &self.history[keep_from..]) {
            report("session_tracker.persist_history", &e);
        }
    }

    fn recompute_today(&mut self) {
        let today = self.clock.now().with_timezone(&Local).date_naive();
        self.today = PomodoroStats::compute(&self.history, &DateRange::local_day(today));
    }

    fn refresh_daily(&mut self) {
        let today = self.clock.now().with_timezone(&Local).date_naive();
        if self.last_reset == Some(today) {
            return;
        }
        tracing::info!(%today, "new day, resetting daily statistics");
        self.recompute_today();
        self.last_reset = Some(today);
        if let Err(e) = self.store.set(LAST_RESET_KEY, &today.to_string()) {
            report("session_tracker.persist_last_reset", &e);
        }
    }
}

fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding undecodable stored value");
            Ok(None)
        }
    }
}

fn write_json<T: serde::Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.set(key, &serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{DateTime, TimeZone, Utc};

    struct Fixture {
        store: Arc<MemoryStore>,
        config: Arc<ConfigStore>,
        clock: ManualClock,
    }

    fn local_noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let config = Arc::new(ConfigStore::load(store.clone()).unwrap());
            Self {
                store,
                config,
                clock: ManualClock::new(local_noon(2026, 6, 1)),
            }
        }

        fn tracker(&self) -> SessionTracker {
            SessionTracker::load(
                self.store.clone(),
                self.config.clone(),
                Arc::new(self.clock.clone()),
            )
            .unwrap()
        }
    }

    #[test]
    fn only_one_session_can_be_active() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        let first = tracker.start_work_session().unwrap().id;
        assert!(matches!(
            tracker.start_work_session(),
            Err(CoreError::SessionAlreadyActive)
        ));
        assert!(matches!(
            tracker.start_break_session(BreakKind::Short),
            Err(CoreError::SessionAlreadyActive)
        ));
        assert_eq!(tracker.active_session().unwrap().id, first);
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn expected_duration_comes_from_config() {
        let fx = Fixture::new();
        fx.config.update(|c| c.long_break_minutes = 20).unwrap();
        let mut tracker = fx.tracker();
        let session = tracker.start_break_session(BreakKind::Long).unwrap();
        assert_eq!(session.session_type, SessionType::LongBreak);
        assert_eq!(session.expected_secs, 20 * 60);
    }

    #[test]
    fn completing_work_increments_and_persists_counter() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        tracker.start_work_session().unwrap();
        fx.clock.advance(Duration::minutes(25));
        let done = tracker.complete_current_session().unwrap();
        assert!(done.completed);
        assert_eq!(tracker.work_intervals_done(), 1);
        assert_eq!(fx.store.get(COUNTER_KEY).unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn cancelling_work_leaves_counter_alone() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        tracker.start_work_session().unwrap();
        fx.clock.advance(Duration::minutes(3));
        let cancelled = tracker.cancel_current_session().unwrap();
        assert!(cancelled.cancelled);
        assert_eq!(cancelled.ended_at, Some(fx.clock.now()));
        assert_eq!(tracker.work_intervals_done(), 0);
        assert_eq!(tracker.history().len(), 1);
    }

    #[test]
    fn completing_a_break_does_not_count() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        tracker.start_break_session(BreakKind::Short).unwrap();
        tracker.complete_current_session().unwrap();
        assert_eq!(tracker.work_intervals_done(), 0);
    }

    #[test]
    fn finishing_without_active_session_fails() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        assert!(matches!(
            tracker.complete_current_session(),
            Err(CoreError::NoActiveSession)
        ));
        assert!(matches!(
            tracker.cancel_current_session(),
            Err(CoreError::NoActiveSession)
        ));
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn long_break_threshold_follows_config() {
        let fx = Fixture::new();
        fx.config.update(|c| c.work_intervals_in_set = 2).unwrap();
        let mut tracker = fx.tracker();
        for _ in 0..2 {
            assert!(!tracker.should_take_long_break());
            tracker.start_work_session().unwrap();
            tracker.complete_current_session().unwrap();
        }
        assert!(tracker.should_take_long_break());

        fx.config.update(|c| c.work_intervals_in_set = 3).unwrap();
        assert!(!tracker.should_take_long_break());

        tracker.reset_cycle().unwrap();
        assert_eq!(tracker.work_intervals_done(), 0);
        assert_eq!(fx.store.get(COUNTER_KEY).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn persisted_history_keeps_most_recent_hundred() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        let mut ids = Vec::new();
        for _ in 0..150 {
            ids.push(tracker.start_work_session().unwrap().id);
            fx.clock.advance(Duration::seconds(30));
            tracker.complete_current_session().unwrap();
        }
        assert_eq!(tracker.history().len(), 150);

        let persisted = SessionTracker::read_history(fx.store.as_ref()).unwrap();
        assert_eq!(persisted.len(), HISTORY_LIMIT);
        let persisted_ids: Vec<_> = persisted.iter().map(|s| s.id).collect();
        assert_eq!(persisted_ids, ids[50..].to_vec());
    }

    #[test]
    fn counter_and_history_survive_restart() {
        let fx = Fixture::new();
        {
            let mut tracker = fx.tracker();
            tracker.start_work_session().unwrap();
            tracker.complete_current_session().unwrap();
        }
        let tracker = fx.tracker();
        assert_eq!(tracker.work_intervals_done(), 1);
        assert_eq!(tracker.history().len(), 1);
    }

    #[test]
    fn interrupted_session_is_recorded_cancelled_on_load() {
        let fx = Fixture::new();
        {
            let mut tracker = fx.tracker();
            tracker.start_work_session().unwrap();
        }
        fx.clock.advance(Duration::minutes(7));
        let tracker = fx.tracker();
        assert!(tracker.active_session().is_none());
        let recovered = &tracker.history()[0];
        assert!(recovered.cancelled);
        assert_eq!(recovered.actual_duration(fx.clock.now()), Duration::minutes(7));
        assert_eq!(tracker.work_intervals_done(), 0);
        assert!(fx.store.get(ACTIVE_KEY).unwrap().is_none());
    }

    #[test]
    fn long_downtime_is_not_counted_as_focus() {
        let fx = Fixture::new();
        let started = fx.clock.now();
        {
            let mut tracker = fx.tracker();
            tracker.start_work_session().unwrap();
        }
        fx.clock.advance(Duration::hours(23));
        let mut tracker = fx.tracker();

        let recovered = &tracker.history()[0];
        assert!(recovered.cancelled);
        assert_eq!(recovered.ended_at, Some(started + Duration::minutes(25)));
        assert_eq!(recovered.actual_duration(fx.clock.now()), Duration::minutes(25));

        let week = tracker.weekly_stats();
        assert_eq!(week.total_focus_secs, 25 * 60);
        assert!((week.average_session_secs - 1500.0).abs() < 1e-9);
        // Ended yesterday; nothing lands on the recovering day.
        assert_eq!(tracker.today_stats().total_focus_secs, 0);
    }

    #[test]
    fn today_stats_roll_over_at_local_midnight() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        tracker.start_work_session().unwrap();
        fx.clock.advance(Duration::minutes(25));
        tracker.complete_current_session().unwrap();
        assert_eq!(tracker.today_stats().completed_work_sessions, 1);
        assert_eq!(
            fx.store.get(LAST_RESET_KEY).unwrap().as_deref(),
            Some("2026-06-01")
        );

        fx.clock.set(local_noon(2026, 6, 2));
        assert_eq!(tracker.today_stats(), PomodoroStats::default());
        assert_eq!(
            fx.store.get(LAST_RESET_KEY).unwrap().as_deref(),
            Some("2026-06-02")
        );
        assert_eq!(tracker.weekly_stats().completed_work_sessions, 1);
    }

    #[test]
    fn clear_all_data_is_a_hard_reset() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        tracker.start_work_session().unwrap();
        tracker.complete_current_session().unwrap();
        tracker.start_work_session().unwrap();

        tracker.clear_all_data().unwrap();
        assert!(tracker.history().is_empty());
        assert!(tracker.active_session().is_none());
        assert_eq!(tracker.work_intervals_done(), 0);
        for key in [HISTORY_KEY, ACTIVE_KEY, COUNTER_KEY, LAST_RESET_KEY] {
            assert!(fx.store.get(key).unwrap().is_none(), "{key} survived");
        }

        let reloaded = fx.tracker();
        assert!(reloaded.history().is_empty());
    }

    #[test]
    fn corrupt_values_are_treated_as_absent() {
        let fx = Fixture::new();
        fx.store.set(HISTORY_KEY, "{not json").unwrap();
        fx.store.set(COUNTER_KEY, "many").unwrap();
        let tracker = fx.tracker();
        assert!(tracker.history().is_empty());
        assert_eq!(tracker.work_intervals_done(), 0);
    }
}
