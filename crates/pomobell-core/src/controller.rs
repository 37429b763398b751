//! Composition root and side-effect dispatcher.
//!
//! Every state change funnels through `dispatch` (Pomodoro transitions) or
//! `dispatch_stopwatch`, which push cues to the collaborators, publish
//! [`Event`]s and apply the tick-source directive.
//! Nothing else touches the ticker.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use crate::clock::{Clock, TickToken, Ticker};
use crate::error::{report, CoreError, Result};
use crate::events::{Event, EventBus};
use crate::mode::{Effect, ModeCoordinator, ModeTimer, Stopwatch, StopwatchEffect, TimerMode};
use crate::services::{AudioPlayer, IconKind, NotificationCategory, Notifier, Silent, StatusDisplay};
use crate::session::{DateRange, PomodoroStats, SessionTracker};
use crate::storage::{ConfigStore, KeyValueStore};
use crate::timer::{
    BreakKind, Exit, PomodoroTimer, TickOutcome, TimerDirective, TimerEvent, TimerOptions, TimerState,
    Transition, TransitionOutcome,
};

/// The collaborators side effects go to.
#[derive(Clone)]
pub struct Services {
    pub notifier: Arc<dyn Notifier>,
    pub audio: Arc<dyn AudioPlayer>,
    pub display: Arc<dyn StatusDisplay>,
}

impl Services {
    pub fn silent() -> Self {
        Self {
            notifier: Arc::new(Silent),
            audio: Arc::new(Silent),
            display: Arc::new(Silent),
        }
    }
}

/// Read-only view for UIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub mode: TimerMode,
    pub state: TimerState,
    pub running: bool,
    pub display: String,
    pub current_secs: i64,
    pub break_kind: Option<BreakKind>,
    pub work_intervals_done: u32,
    pub work_intervals_in_set: u32,
}

pub struct Controller {
    modes: ModeCoordinator,
    config: Arc<ConfigStore>,
    services: Services,
    ticker: Box<dyn Ticker>,
    events: EventBus,
}

impl Controller {
    pub fn new(
        modes: ModeCoordinator,
        config: Arc<ConfigStore>,
        services: Services,
        ticker: Box<dyn Ticker>,
        events: EventBus,
    ) -> Self {
        let controller = Self {
            modes,
            config,
            services,
            ticker,
            events,
        };
        controller.render_rest_state();
        controller
    }

    /// Build every component over `store` with default timer options.
    ///
    /// # Errors
    /// Returns an error if loading configuration, history or mode fails.
    pub fn assemble(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        services: Services,
        ticker: Box<dyn Ticker>,
    ) -> Result<Self> {
        Self::assemble_with_options(store, clock, services, ticker, TimerOptions::default())
    }

    /// Build every component over `store` and wire configuration changes
    /// into a fresh event bus.
    pub fn assemble_with_options(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        services: Services,
        ticker: Box<dyn Ticker>,
        options: TimerOptions,
    ) -> Result<Self> {
        let events = EventBus::new();
        let config = Arc::new(ConfigStore::load(store.clone())?.with_events(events.clone()));
        let tracker = SessionTracker::load(store.clone(), config.clone(), clock.clone())?;
        let pomodoro = PomodoroTimer::new(config.clone(), clock.clone(), tracker).with_options(options);
        let modes = ModeCoordinator::load(store, pomodoro, Stopwatch::new(clock))?;
        Ok(Self::new(modes, config, services, ticker, events))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn modes(&self) -> &ModeCoordinator {
        &self.modes
    }

    pub fn snapshot(&self) -> Snapshot {
        let active = self.modes.active();
        let pomodoro = self.modes.pomodoro();
        Snapshot {
            mode: self.modes.mode(),
            state: pomodoro.state(),
            running: active.is_running(),
            display: active.display_text(),
            current_secs: active.current_time().num_seconds(),
            break_kind: pomodoro.engine().break_kind(),
            work_intervals_done: pomodoro.tracker().work_intervals_done(),
            work_intervals_in_set: self.config.get().work_intervals_in_set,
        }
    }

    pub fn today_stats(&mut self) -> PomodoroStats {
        self.modes.pomodoro_mut().tracker_mut().today_stats()
    }

    pub fn weekly_stats(&self) -> PomodoroStats {
        self.modes.pomodoro().tracker().weekly_stats()
    }

    pub fn stats_for_range(&self, range: &DateRange) -> PomodoroStats {
        self.modes.pomodoro().tracker().stats_for_range(range)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Feed a state machine event to the Pomodoro timer.
    ///
    /// # Errors
    /// `InvalidState` when the event doesn't apply, including any event while
    /// the stopwatch is the active mode. Other failures leave the timer idle.
    pub fn handle_event(&mut self, event: TimerEvent) -> Result<Transition> {
        if self.modes.mode() != TimerMode::Pomodoro {
            let err = CoreError::InvalidState {
                state: self.modes.pomodoro().state(),
                event,
            };
            report("controller.handle_event", &err);
            return Err(err);
        }
        match self.modes.pomodoro_mut().handle(event) {
            Ok(transition) => {
                self.dispatch(&transition)?;
                Ok(transition)
            }
            Err(e) => Err(self.fail("controller.handle_event", e)),
        }
    }

    /// The single primary button: start the active timer, or stop it.
    pub fn start_stop(&mut self) -> Result<()> {
        if self.modes.active().is_running() {
            self.stop()
        } else {
            self.start()
        }
    }

    pub fn skip_rest(&mut self) -> Result<()> {
        self.handle_event(TimerEvent::SkipRest).map(|_| ())
    }

    pub fn start(&mut self) -> Result<()> {
        let effect = self.modes.active_mut().start();
        self.apply("controller.start", effect)
    }

    pub fn pause(&mut self) -> Result<()> {
        let effect = self.modes.active_mut().pause();
        self.apply("controller.pause", effect)
    }

    pub fn stop(&mut self) -> Result<()> {
        let effect = self.modes.active_mut().stop();
        self.apply("controller.stop", effect)
    }

    pub fn reset(&mut self) -> Result<()> {
        let effect = self.modes.active_mut().reset();
        self.apply("controller.reset", effect)
    }

    pub fn switch_mode(&mut self, to: TimerMode) -> Result<()> {
        let switch = match self.modes.switch_to(to) {
            Ok(Some(switch)) => switch,
            Ok(None) => return Ok(()),
            Err(e) => return Err(self.fail("controller.switch_mode", e)),
        };
        self.apply_effect(&switch.stopped)?;
        self.events.publish(Event::TimerModeChanged {
            from: switch.from,
            to: switch.to,
        });
        self.render_rest_state();
        Ok(())
    }

    /// Start the next set from its first work interval.
    pub fn reset_cycle(&mut self) -> Result<()> {
        match self.modes.pomodoro_mut().tracker_mut().reset_cycle() {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail("controller.reset_cycle", e)),
        }
    }

    /// Stop whatever is running, then wipe history and the counter.
    pub fn clear_all_data(&mut self) -> Result<()> {
        self.force_stop();
        match self.modes.pomodoro_mut().tracker_mut().clear_all_data() {
            Ok(()) => {
                self.render_rest_state();
                Ok(())
            }
            Err(e) => Err(self.fail("controller.clear_all_data", e)),
        }
    }

    /// Drive everything to idle. Never fails; repeated calls do nothing more.
    pub fn force_stop(&mut self) {
        if let Some(transition) = self.modes.pomodoro_mut().force_stop() {
            if let Err(e) = self.dispatch(&transition) {
                report("controller.force_stop", &e);
            }
        }
        if self.modes.stopwatch().is_running() {
            match self.modes.active_mut().stop() {
                Ok(effect) => {
                    if let Err(e) = self.apply_effect(&effect) {
                        report("controller.force_stop", &e);
                    }
                }
                Err(e) => report("controller.force_stop", &e),
            }
        }
        self.ticker.cancel();
    }

    /// Handle one tick from the tick source. Ticks from a cancelled or
    /// replaced arming are dropped.
    pub fn on_tick(&mut self, token: TickToken) {
        if !self.ticker.is_current(token) {
            tracing::trace!(token = token.0, "dropping stale tick");
            return;
        }
        match self.modes.mode() {
            TimerMode::Pomodoro => match self.modes.pomodoro_mut().tick() {
                Ok(TickOutcome::Ignored) => {}
                Ok(TickOutcome::Remaining(left)) => self.publish_update(left, true),
                Ok(TickOutcome::Fired(transition)) | Ok(TickOutcome::Overrun(transition)) => {
                    if let Err(e) = self.dispatch(&transition) {
                        report("controller.on_tick", &e);
                    }
                }
                Err(e) => {
                    self.fail("controller.on_tick", e);
                }
            },
            TimerMode::Stopwatch => {
                let elapsed = self.modes.active().current_time();
                self.publish_update(elapsed, false);
            }
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    fn apply(&mut self, context: &str, effect: Result<Effect>) -> Result<()> {
        match effect {
            Ok(effect) => self.apply_effect(&effect),
            Err(e) => Err(self.fail(context, e)),
        }
    }

    fn apply_effect(&mut self, effect: &Effect) -> Result<()> {
        match effect {
            Effect::None => Ok(()),
            Effect::Pomodoro(transition) => self.dispatch(transition),
            Effect::Stopwatch(change) => self.dispatch_stopwatch(*change),
        }
    }

    fn dispatch(&mut self, transition: &Transition) -> Result<()> {
        let Services {
            notifier,
            audio,
            display,
        } = &self.services;

        if let Some(exit) = transition.exited {
            match exit {
                Exit::WorkEnded(reason) => {
                    audio.stop_ticking();
                    if reason.completes_session() {
                        audio.play_ding();
                        self.events.publish(Event::PomodoroCompleted);
                    }
                }
                Exit::BreakEnded(reason) => {
                    if reason.completes_session() {
                        notifier.send(
                            "Break is over",
                            "Keep up the good work!",
                            NotificationCategory::RestFinished,
                        );
                        self.events.publish(Event::BreakCompleted);
                    }
                }
            }
        }

        match transition.outcome {
            TransitionOutcome::EnteredWork => {
                audio.play_windup();
                audio.start_ticking();
                display.set_icon(IconKind::Work);
            }
            TransitionOutcome::EnteredRest(kind) => {
                let (length, icon) = match kind {
                    BreakKind::Short => ("short", IconKind::ShortRest),
                    BreakKind::Long => ("long", IconKind::LongRest),
                };
                notifier.send(
                    "Time's up",
                    &format!("It's time for a {length} break!"),
                    NotificationCategory::RestStarted,
                );
                display.set_icon(icon);
            }
            TransitionOutcome::EnteredIdle => {
                display.set_title(None);
                display.set_icon(IconKind::Idle);
            }
        }
        self.events.publish(Event::TimerStateChanged {
            state: transition.to,
        });
        if transition.to != TimerState::Idle {
            let left = self.modes.active().current_time();
            self.publish_update(left, true);
        }
        self.apply_directive(transition.timer)
    }

    fn dispatch_stopwatch(&mut self, change: StopwatchEffect) -> Result<()> {
        match change {
            StopwatchEffect::Started => {
                self.services.display.set_icon(IconKind::Stopwatch);
                self.events.publish(Event::StopwatchStarted);
            }
            StopwatchEffect::Paused { elapsed } => self.publish_update(elapsed, false),
            StopwatchEffect::Stopped { elapsed } => {
                self.services.display.set_title(None);
                self.events.publish(Event::StopwatchStopped {
                    elapsed_secs: elapsed.num_seconds(),
                });
            }
            StopwatchEffect::Reset => self.services.display.set_title(None),
        }
        self.apply_directive(Effect::Stopwatch(change).timer_directive())
    }

    fn apply_directive(&mut self, directive: TimerDirective) -> Result<()> {
        match directive {
            TimerDirective::Keep => Ok(()),
            TimerDirective::Cancel => {
                self.ticker.cancel();
                Ok(())
            }
            TimerDirective::Arm(schedule) => match self.ticker.arm(schedule) {
                Ok(_) => Ok(()),
                Err(e) => Err(self.fail("controller.arm_ticker", e)),
            },
        }
    }

    /// Report `err`, then recover to idle unless it was a rejected event.
    fn fail(&mut self, context: &str, err: CoreError) -> CoreError {
        report(context, &err);
        if !matches!(err, CoreError::InvalidState { .. }) {
            self.recover();
        }
        err
    }

    /// Announces idle even when the engine got there without a transition.
    fn recover(&mut self) {
        tracing::warn!("recovering to idle");
        self.ticker.cancel();
        self.modes.pomodoro_mut().force_stop();
        self.events.publish(Event::TimerStateChanged {
            state: TimerState::Idle,
        });
        self.services.audio.stop_ticking();
        self.services.display.set_title(None);
        self.services.display.set_icon(IconKind::Idle);
    }

    fn publish_update(&self, time: Duration, countdown: bool) {
        let secs = if countdown {
            (time.num_milliseconds().max(0) + 999) / 1000
        } else {
            time.num_seconds()
        };
        self.events.publish(Event::TimerUpdated { seconds: secs });
        self.render_title();
    }

    fn render_title(&self) {
        let active = self.modes.active();
        if active.is_running() && self.config.get().show_timer_in_menu_bar {
            self.services.display.set_title(Some(&active.display_text()));
        } else if !active.is_running() {
            self.services.display.set_title(None);
        }
    }

    /// Icon and title for whatever is showing when nothing is transitioning.
    fn render_rest_state(&self) {
        let icon = match (self.modes.mode(), self.modes.pomodoro().state()) {
            (TimerMode::Stopwatch, _) => IconKind::Stopwatch,
            (TimerMode::Pomodoro, TimerState::Idle) => IconKind::Idle,
            (TimerMode::Pomodoro, TimerState::Work) => IconKind::Work,
            (TimerMode::Pomodoro, TimerState::Rest) => match self.modes.pomodoro().engine().break_kind() {
                Some(BreakKind::Long) => IconKind::LongRest,
                _ => IconKind::ShortRest,
            },
        };
        self.services.display.set_icon(icon);
        self.render_title();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::{ManualClock, ManualTicker, TickSchedule};
    use crate::services::ActionHandler;
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::broadcast::Receiver;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Notify(String, String, NotificationCategory),
        Windup,
        Ding,
        StartTicking,
        StopTicking,
        Title(Option<String>),
        Icon(IconKind),
    }

    /// Records every collaborator call in order.
    #[derive(Default)]
    pub(crate) struct Recorder {
        calls: Mutex<Vec<Call>>,
    }

    impl Recorder {
        fn push(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        pub(crate) fn take(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    impl Notifier for Recorder {
        fn send(&self, title: &str, body: &str, category: NotificationCategory) {
            self.push(Call::Notify(title.into(), body.into(), category));
        }

        fn register_action_handler(&self, _handler: ActionHandler) {}
    }

    impl AudioPlayer for Recorder {
        fn play_windup(&self) {
            self.push(Call::Windup);
        }
        fn play_ding(&self) {
            self.push(Call::Ding);
        }
        fn start_ticking(&self) {
            self.push(Call::StartTicking);
        }
        fn stop_ticking(&self) {
            self.push(Call::StopTicking);
        }
    }

    impl StatusDisplay for Recorder {
        fn set_title(&self, title: Option<&str>) {
            self.push(Call::Title(title.map(str::to_string)));
        }
        fn set_icon(&self, icon: IconKind) {
            self.push(Call::Icon(icon));
        }
    }

    struct Rig {
        controller: Controller,
        recorder: Arc<Recorder>,
        ticker: ManualTicker,
        clock: ManualClock,
        events: Receiver<Event>,
    }

    fn rig() -> Rig {
        rig_with(TimerOptions::default())
    }

    fn rig_with(options: TimerOptions) -> Rig {
        let recorder = Arc::new(Recorder::default());
        let services = Services {
            notifier: recorder.clone(),
            audio: recorder.clone(),
            display: recorder.clone(),
        };
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 8, 3, 9, 0, 0).unwrap());
        let ticker = ManualTicker::new();
        let controller = Controller::assemble_with_options(
            Arc::new(MemoryStore::new()),
            Arc::new(clock.clone()),
            services,
            Box::new(ticker.clone()),
            options,
        )
        .unwrap();
        let events = controller.events().subscribe();
        recorder.take();
        Rig {
            controller,
            recorder,
            ticker,
            clock,
            events,
        }
    }

    impl Rig {
        fn drain(&mut self) -> Vec<Event> {
            let mut seen = Vec::new();
            loop {
                match self.events.try_recv() {
                    Ok(event) => seen.push(event),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return seen,
                    Err(TryRecvError::Lagged(_)) => continue,
                }
            }
        }

        fn tick(&mut self) {
            let token = self.ticker.current().expect("ticker armed");
            self.controller.on_tick(token);
        }

        fn finish_interval(&mut self) {
            let left = self.controller.modes().pomodoro().engine().time_left().unwrap();
            self.clock.advance(left);
            self.tick();
        }
    }

    #[test]
    fn starting_work_plays_cues_and_arms() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        let calls = r.recorder.take();
        assert_eq!(
            &calls[..3],
            &[Call::Windup, Call::StartTicking, Call::Icon(IconKind::Work)]
        );
        assert!(calls.contains(&Call::Title(Some("25:00".into()))));
        assert_eq!(r.ticker.arm_count(), 1);
        assert_eq!(r.ticker.last_schedule(), Some(TickSchedule::every_second()));
        assert!(r
            .drain()
            .contains(&Event::TimerStateChanged { state: TimerState::Work }));
    }

    #[test]
    fn completing_work_dings_and_announces_break() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.recorder.take();
        r.drain();

        r.finish_interval();
        let calls = r.recorder.take();
        assert_eq!(calls[0], Call::StopTicking);
        assert_eq!(calls[1], Call::Ding);
        assert_eq!(
            calls[2],
            Call::Notify(
                "Time's up".into(),
                "It's time for a short break!".into(),
                NotificationCategory::RestStarted
            )
        );
        assert_eq!(calls[3], Call::Icon(IconKind::ShortRest));
        let events = r.drain();
        assert!(events.contains(&Event::PomodoroCompleted));
        assert!(events.contains(&Event::TimerStateChanged { state: TimerState::Rest }));
        assert_eq!(r.ticker.arm_count(), 2);
    }

    #[test]
    fn finished_break_notifies() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.finish_interval();
        r.recorder.take();
        r.drain();

        r.finish_interval();
        let calls = r.recorder.take();
        assert_eq!(
            calls[0],
            Call::Notify(
                "Break is over".into(),
                "Keep up the good work!".into(),
                NotificationCategory::RestFinished
            )
        );
        assert!(r.drain().contains(&Event::BreakCompleted));
        assert_eq!(r.controller.snapshot().state, TimerState::Work);
    }

    #[test]
    fn tick_updates_title_unless_hidden() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.recorder.take();
        r.clock.advance(Duration::seconds(65));
        r.tick();
        assert_eq!(r.recorder.take(), vec![Call::Title(Some("23:55".into()))]);
        assert!(r.drain().contains(&Event::TimerUpdated { seconds: 23 * 60 + 55 }));

        r.controller
            .config()
            .update(|c| c.show_timer_in_menu_bar = false)
            .unwrap();
        r.clock.advance(Duration::seconds(1));
        r.tick();
        assert!(r.recorder.take().is_empty());
    }

    #[test]
    fn stale_ticks_are_dropped() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        let stale = r.ticker.current().unwrap();
        r.controller.start_stop().unwrap();
        r.recorder.take();
        r.drain();

        r.clock.advance(Duration::minutes(30));
        r.controller.on_tick(stale);
        assert!(r.recorder.take().is_empty());
        assert!(r.drain().is_empty());
        assert_eq!(r.controller.snapshot().state, TimerState::Idle);
    }

    #[test]
    fn stopping_cancels_ticker_and_clears_display() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.recorder.take();
        r.controller.start_stop().unwrap();
        assert_eq!(
            r.recorder.take(),
            vec![
                Call::StopTicking,
                Call::Title(None),
                Call::Icon(IconKind::Idle)
            ]
        );
        assert!(r.ticker.current().is_none());
    }

    #[test]
    fn arm_failure_recovers_to_idle() {
        let mut r = rig();
        r.ticker.fail_next_arm();
        let err = r.controller.start_stop().unwrap_err();
        assert!(matches!(err, CoreError::TimerCreationFailed(_)));
        let snapshot = r.controller.snapshot();
        assert_eq!(snapshot.state, TimerState::Idle);
        assert!(!snapshot.running);
        let history = r.controller.modes().pomodoro().tracker().history();
        assert_eq!(history.len(), 1);
        assert!(history[0].cancelled);
        assert_eq!(r.recorder.take().last(), Some(&Call::Icon(IconKind::Idle)));
    }

    #[test]
    fn rejected_event_changes_nothing() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.recorder.take();
        r.drain();
        let arms = r.ticker.arm_count();

        assert!(matches!(
            r.controller.skip_rest(),
            Err(CoreError::InvalidState { .. })
        ));
        assert_eq!(r.controller.snapshot().state, TimerState::Work);
        assert!(r.recorder.take().is_empty());
        assert!(r.drain().is_empty());
        assert_eq!(r.ticker.arm_count(), arms);
    }

    #[test]
    fn force_stop_twice_has_one_effect() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.recorder.take();
        r.drain();

        r.controller.force_stop();
        assert!(!r.recorder.take().is_empty());
        assert_eq!(
            r.drain(),
            vec![Event::TimerStateChanged { state: TimerState::Idle }]
        );

        r.controller.force_stop();
        assert!(r.recorder.take().is_empty());
        assert!(r.drain().is_empty());
        assert!(r.ticker.current().is_none());
    }

    #[test]
    fn mode_switch_stops_pomodoro_and_announces() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.drain();

        r.controller.switch_mode(TimerMode::Stopwatch).unwrap();
        let events = r.drain();
        assert!(events.contains(&Event::TimerStateChanged { state: TimerState::Idle }));
        assert_eq!(
            events.last(),
            Some(&Event::TimerModeChanged {
                from: TimerMode::Pomodoro,
                to: TimerMode::Stopwatch
            })
        );
        assert!(r.ticker.current().is_none());
        assert!(matches!(
            r.controller.handle_event(TimerEvent::StartStop),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn stopwatch_round_trip_through_controller() {
        let mut r = rig();
        r.controller.switch_mode(TimerMode::Stopwatch).unwrap();
        r.drain();

        r.controller.start_stop().unwrap();
        assert!(r.ticker.current().is_some());
        r.clock.advance(Duration::seconds(75));
        r.tick();
        assert_eq!(r.controller.snapshot().display, "1:15");

        r.controller.start_stop().unwrap();
        let events = r.drain();
        assert_eq!(events[0], Event::StopwatchStarted);
        assert_eq!(
            events.last(),
            Some(&Event::StopwatchStopped { elapsed_secs: 75 })
        );
        assert!(r.ticker.current().is_none());
    }

    #[test]
    fn config_changes_are_published() {
        let mut r = rig();
        r.controller.config().update(|c| c.work_minutes = 50).unwrap();
        assert_eq!(r.drain(), vec![Event::ConfigurationChanged]);
        assert_eq!(r.controller.snapshot().display, "50:00");
    }

    #[test]
    fn failed_interval_entry_still_announces_idle() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.recorder.take();
        r.drain();

        r.controller
            .modes
            .pomodoro_mut()
            .engine_mut()
            .set_length_override(Some(Duration::zero()));
        r.finish_interval();

        assert_eq!(
            r.drain(),
            vec![Event::TimerStateChanged { state: TimerState::Idle }]
        );
        assert_eq!(r.controller.snapshot().state, TimerState::Idle);
        assert!(r.ticker.current().is_none());
        let history = r.controller.modes().pomodoro().tracker().history();
        assert_eq!(history.len(), 1);
        assert!(history[0].completed);
        let calls = r.recorder.take();
        assert!(calls.contains(&Call::StopTicking));
        assert_eq!(calls.last(), Some(&Call::Icon(IconKind::Idle)));
    }

    #[test]
    fn overrun_limit_comes_from_options() {
        let mut r = rig_with(TimerOptions::default().with_overrun_limit(Duration::seconds(300)));
        r.controller.start_stop().unwrap();
        r.clock.advance(Duration::minutes(25) + Duration::seconds(90));
        r.tick();
        assert_eq!(r.controller.snapshot().state, TimerState::Rest);

        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.clock.advance(Duration::minutes(25) + Duration::seconds(90));
        r.tick();
        assert_eq!(r.controller.snapshot().state, TimerState::Idle);
    }

    #[test]
    fn stats_queries_see_recorded_sessions() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.finish_interval();
        r.controller.start_stop().unwrap();

        let week = r.controller.weekly_stats();
        assert_eq!(week.completed_work_sessions, 1);
        assert_eq!(week.total_focus_secs, 25 * 60);
        let now = r.clock.now();
        let range = DateRange::new(now - Duration::hours(1), now + Duration::seconds(1));
        assert_eq!(r.controller.stats_for_range(&range), week);
        let before = DateRange::new(now - Duration::days(2), now - Duration::days(1));
        assert_eq!(r.controller.stats_for_range(&before).total_work_sessions, 0);
    }

    #[test]
    fn reset_cycle_clears_the_counter_only() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.finish_interval();
        assert_eq!(r.controller.snapshot().work_intervals_done, 1);

        r.controller.reset_cycle().unwrap();
        let snapshot = r.controller.snapshot();
        assert_eq!(snapshot.work_intervals_done, 0);
        assert_eq!(snapshot.state, TimerState::Rest);
        assert_eq!(r.controller.modes().pomodoro().tracker().history().len(), 1);
    }

    #[test]
    fn clearing_data_stops_the_running_interval_first() {
        let mut r = rig();
        r.controller.start_stop().unwrap();
        r.finish_interval();
        r.drain();

        r.controller.clear_all_data().unwrap();
        let snapshot = r.controller.snapshot();
        assert_eq!(snapshot.state, TimerState::Idle);
        assert_eq!(snapshot.work_intervals_done, 0);
        let tracker = r.controller.modes().pomodoro().tracker();
        assert!(tracker.history().is_empty());
        assert!(tracker.active_session().is_none());
        assert!(r.ticker.current().is_none());
        assert!(r
            .drain()
            .contains(&Event::TimerStateChanged { state: TimerState::Idle }));
        assert_eq!(r.controller.weekly_stats(), PomodoroStats::default());
    }
}
