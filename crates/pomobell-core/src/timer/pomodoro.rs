use std::sync::Arc;

use chrono::Duration;

use super::{TickOutcome, TimerEngine, TimerEvent, TimerOptions, TimerState, Transition};
use crate::clock::Clock;
use crate::error::Result;
use crate::mode::{format_countdown, Effect, ModeTimer, TimerMode};
use crate::session::SessionTracker;
use crate::storage::ConfigStore;

/// The Pomodoro side of the mode coordinator: the engine plus the tracker
/// whose sessions it drives.
pub struct PomodoroTimer {
    engine: TimerEngine,
    tracker: SessionTracker,
    config: Arc<ConfigStore>,
}

impl PomodoroTimer {
    pub fn new(config: Arc<ConfigStore>, clock: Arc<dyn Clock>, tracker: SessionTracker) -> Self {
        Self {
            engine: TimerEngine::new(config.clone(), clock),
            tracker,
            config,
        }
    }

    pub fn with_options(mut self, options: TimerOptions) -> Self {
        self.engine = self.engine.with_options(options);
        self
    }

    pub fn state(&self) -> TimerState {
        self.engine.state()
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    #[cfg(test)]
    pub(crate) fn engine_mut(&mut self) -> &mut TimerEngine {
        &mut self.engine
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut SessionTracker {
        &mut self.tracker
    }

    pub fn handle(&mut self, event: TimerEvent) -> Result<Transition> {
        self.engine.handle(event, &mut self.tracker)
    }

    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.engine.tick(&mut self.tracker)
    }

    pub fn force_stop(&mut self) -> Option<Transition> {
        self.engine.force_stop(&mut self.tracker)
    }
}

impl ModeTimer for PomodoroTimer {
    fn mode(&self) -> TimerMode {
        TimerMode::Pomodoro
    }

    fn is_running(&self) -> bool {
        self.state() != TimerState::Idle
    }

    /// Time left while running, otherwise the length of the next work interval.
    fn current_time(&self) -> Duration {
        self.engine
            .time_left()
            .unwrap_or_else(|| self.config.get().work_duration())
    }

    fn display_text(&self) -> String {
        format_countdown(self.current_time())
    }

    fn start(&mut self) -> Result<Effect> {
        if self.is_running() {
            return Ok(Effect::None);
        }
        self.handle(TimerEvent::StartStop).map(Effect::Pomodoro)
    }

    /// A Pomodoro can't be suspended. Pausing stops it.
    fn pause(&mut self) -> Result<Effect> {
        self.stop()
    }

    fn stop(&mut self) -> Result<Effect> {
        if !self.is_running() {
            return Ok(Effect::None);
        }
        self.handle(TimerEvent::StartStop).map(Effect::Pomodoro)
    }

    fn reset(&mut self) -> Result<Effect> {
        let stopped = self.force_stop();
        self.tracker.reset_cycle()?;
        Ok(stopped.map_or(Effect::None, Effect::Pomodoro))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use crate::timer::{Exit, ExitReason};
    use chrono::{TimeZone, Utc};

    fn pomodoro() -> (PomodoroTimer, ManualClock) {
        let store = Arc::new(MemoryStore::new());
        let config = Arc::new(ConfigStore::load(store.clone()).unwrap());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0).unwrap());
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let tracker = SessionTracker::load(store, config.clone(), shared.clone()).unwrap();
        (PomodoroTimer::new(config, shared, tracker), clock)
    }

    #[test]
    fn idle_shows_full_work_length() {
        let (timer, _) = pomodoro();
        assert!(!timer.is_running());
        assert_eq!(timer.current_time(), Duration::minutes(25));
        assert_eq!(timer.display_text(), "25:00");
    }

    #[test]
    fn start_twice_only_starts_once() {
        let (mut timer, clock) = pomodoro();
        assert!(matches!(timer.start().unwrap(), Effect::Pomodoro(_)));
        clock.advance(Duration::seconds(30));
        assert_eq!(timer.start().unwrap(), Effect::None);
        assert_eq!(timer.display_text(), "24:30");
    }

    #[test]
    fn pause_stops_the_interval() {
        let (mut timer, _) = pomodoro();
        timer.start().unwrap();
        match timer.pause().unwrap() {
            Effect::Pomodoro(t) => {
                assert_eq!(t.exited, Some(Exit::WorkEnded(ExitReason::Stopped)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!timer.is_running());
        assert_eq!(timer.stop().unwrap(), Effect::None);
    }

    #[test]
    fn reset_force_stops_and_clears_cycle() {
        let (mut timer, clock) = pomodoro();
        timer.start().unwrap();
        clock.advance(Duration::minutes(25));
        timer.tick().unwrap();
        assert_eq!(timer.tracker().work_intervals_done(), 1);

        let effect = timer.reset().unwrap();
        assert!(matches!(effect, Effect::Pomodoro(t) if t.exited == Some(Exit::BreakEnded(ExitReason::Forced))));
        assert_eq!(timer.tracker().work_intervals_done(), 0);
        assert_eq!(timer.reset().unwrap(), Effect::None);
    }
}
