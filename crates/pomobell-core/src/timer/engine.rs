//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads or timers: transitions return a [`TimerDirective`] telling
//! the caller to arm or cancel its tick source, and the caller invokes
//! `tick()` whenever that source fires.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --startStop--> Work --timerFired--> Rest
//! Work --startStop--> Idle
//! Rest --startStop--> Idle
//! Rest --timerFired--> Idle   (stop after break)
//! Rest --timerFired--> Work   (otherwise)
//! Rest --skipRest---> Work
//! ```
//!
//! Session bookkeeping happens inside the transition, in order: the exited
//! interval's session is completed or cancelled first, then the entered
//! interval resolves its length (and for rest, its [`BreakKind`]) and opens a
//! new session.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::{
    BreakKind, Exit, ExitReason, TickOutcome, TimerDirective, TimerEvent, TimerState, Transition,
    TransitionOutcome,
};
use crate::clock::{Clock, TickSchedule};
use crate::error::{report, CoreError, Result};
use crate::session::SessionTracker;
use crate::storage::ConfigStore;

/// A tick later than this past the deadline forces the timer to idle instead
/// of firing, so a sleeping machine doesn't wake into a stale break.
pub const DEFAULT_OVERRUN_LIMIT_SECS: i64 = 60;

/// Engine tuning that isn't part of the user's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerOptions {
    /// How late a tick may arrive before the interval is stopped instead
    /// of fired.
    pub overrun_limit: Duration,
    /// Schedule requested whenever an interval starts.
    pub tick_schedule: TickSchedule,
}

impl TimerOptions {
    pub fn with_overrun_limit(mut self, limit: Duration) -> Self {
        self.overrun_limit = limit;
        self
    }
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            overrun_limit: Duration::seconds(DEFAULT_OVERRUN_LIMIT_SECS),
            tick_schedule: TickSchedule::every_second(),
        }
    }
}

/// Core timer engine.
pub struct TimerEngine {
    state: TimerState,
    /// Absolute deadline of the running interval. The single timer slot.
    finish_at: Option<DateTime<Utc>>,
    break_kind: Option<BreakKind>,
    config: Arc<ConfigStore>,
    clock: Arc<dyn Clock>,
    overrun_limit: Duration,
    schedule: TickSchedule,
    /// Replaces every configured interval length when set.
    length_override: Option<Duration>,
}

impl TimerEngine {
    /// Starts in `Idle` with nothing armed.
    pub fn new(config: Arc<ConfigStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: TimerState::Idle,
            finish_at: None,
            break_kind: None,
            config,
            clock,
            overrun_limit: Duration::seconds(DEFAULT_OVERRUN_LIMIT_SECS),
            schedule: TickSchedule::every_second(),
            length_override: None,
        }
    }

    pub fn with_options(self, options: TimerOptions) -> Self {
        self.with_overrun_limit(options.overrun_limit)
            .with_tick_schedule(options.tick_schedule)
    }

    pub fn with_overrun_limit(mut self, limit: Duration) -> Self {
        self.overrun_limit = limit;
        self
    }

    pub fn with_tick_schedule(mut self, schedule: TickSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Kind of the current rest period, if resting.
    pub fn break_kind(&self) -> Option<BreakKind> {
        self.break_kind
    }

    pub fn finish_at(&self) -> Option<DateTime<Utc>> {
        self.finish_at
    }

    /// Remaining time of the running interval, clamped at zero.
    pub fn time_left(&self) -> Option<Duration> {
        self.finish_at
            .map(|finish| (finish - self.clock.now()).max(Duration::zero()))
    }

    pub fn overrun_limit(&self) -> Duration {
        self.overrun_limit
    }

    pub fn tick_schedule(&self) -> TickSchedule {
        self.schedule
    }

    #[cfg(test)]
    pub(crate) fn set_length_override(&mut self, length: Option<Duration>) {
        self.length_override = length;
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply `event`.
    ///
    /// # Errors
    /// - `InvalidState` if `event` isn't accepted in the current state. Nothing
    ///   changes.
    /// - `InvalidDuration` if the entered interval has no positive length. The
    ///   exited interval is still closed out and the engine ends up idle.
    pub fn handle(&mut self, event: TimerEvent, tracker: &mut SessionTracker) -> Result<Transition> {
        self.transition(event, None, tracker)
    }

    /// Compare the deadline against the clock.
    pub fn tick(&mut self, tracker: &mut SessionTracker) -> Result<TickOutcome> {
        let Some(finish_at) = self.finish_at else {
            return Ok(TickOutcome::Ignored);
        };
        let time_left = finish_at - self.clock.now();
        if time_left > Duration::zero() {
            return Ok(TickOutcome::Remaining(time_left));
        }
        if time_left < -self.overrun_limit {
            tracing::warn!(
                overrun_secs = -time_left.num_seconds(),
                limit_secs = self.overrun_limit.num_seconds(),
                "deadline missed, stopping instead of firing"
            );
            return self
                .transition(TimerEvent::StartStop, Some(ExitReason::Overrun), tracker)
                .map(TickOutcome::Overrun);
        }
        self.transition(TimerEvent::TimerFired, None, tracker)
            .map(TickOutcome::Fired)
    }

    /// Unconditionally go idle, cancelling any active session.
    ///
    /// Returns `None` when there was nothing to stop, so repeated calls have
    /// no further effect.
    pub fn force_stop(&mut self, tracker: &mut SessionTracker) -> Option<Transition> {
        let from = self.state;
        let had_session = tracker.active_session().is_some();
        if from == TimerState::Idle && !had_session && self.finish_at.is_none() {
            return None;
        }
        if had_session {
            if let Err(e) = tracker.cancel_current_session() {
                report("timer_engine.force_stop", &e);
            }
        }
        let exited = match from {
            TimerState::Idle => None,
            TimerState::Work => Some(Exit::WorkEnded(ExitReason::Forced)),
            TimerState::Rest => Some(Exit::BreakEnded(ExitReason::Forced)),
        };
        self.enter_idle();
        tracing::info!(?from, "force-stopped");
        Some(Transition {
            from,
            to: TimerState::Idle,
            event: None,
            exited,
            outcome: TransitionOutcome::EnteredIdle,
            timer: TimerDirective::Cancel,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn transition(
        &mut self,
        event: TimerEvent,
        reason_override: Option<ExitReason>,
        tracker: &mut SessionTracker,
    ) -> Result<Transition> {
        let from = self.state;
        let (to, reason) = match (from, event) {
            (TimerState::Idle, TimerEvent::StartStop) => (TimerState::Work, None),
            (TimerState::Work, TimerEvent::StartStop) => (TimerState::Idle, Some(ExitReason::Stopped)),
            (TimerState::Rest, TimerEvent::StartStop) => (TimerState::Idle, Some(ExitReason::Stopped)),
            (TimerState::Work, TimerEvent::TimerFired) => (TimerState::Rest, Some(ExitReason::Completed)),
            (TimerState::Rest, TimerEvent::TimerFired) => {
                if self.config.get().stop_after_break {
                    (TimerState::Idle, Some(ExitReason::Completed))
                } else {
                    (TimerState::Work, Some(ExitReason::Completed))
                }
            }
            (TimerState::Rest, TimerEvent::SkipRest) => (TimerState::Work, Some(ExitReason::Skipped)),
            (state, event) => return Err(CoreError::InvalidState { state, event }),
        };

        let exited = reason
            .map(|r| reason_override.unwrap_or(r))
            .map(|r| self.exit(from, r, tracker));

        let outcome = match self.enter(to, tracker) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.enter_idle();
                return Err(e);
            }
        };

        tracing::info!(?from, ?to, ?event, ?exited, "transition");
        Ok(Transition {
            from,
            to,
            event: Some(event),
            exited,
            outcome,
            timer: match to {
                TimerState::Idle => TimerDirective::Cancel,
                TimerState::Work | TimerState::Rest => TimerDirective::Arm(self.schedule),
            },
        })
    }

    fn exit(&mut self, from: TimerState, reason: ExitReason, tracker: &mut SessionTracker) -> Exit {
        let closed = if reason.completes_session() {
            tracker.complete_current_session()
        } else {
            tracker.cancel_current_session()
        };
        if let Err(e) = closed {
            report("timer_engine.exit", &e);
        }
        self.finish_at = None;
        self.break_kind = None;
        match from {
            TimerState::Work => Exit::WorkEnded(reason),
            _ => Exit::BreakEnded(reason),
        }
    }

    fn enter(&mut self, to: TimerState, tracker: &mut SessionTracker) -> Result<TransitionOutcome> {
        match to {
            TimerState::Work => {
                self.begin_countdown(self.config.get().work_duration())?;
                if let Err(e) = tracker.start_work_session() {
                    report("timer_engine.enter_work", &e);
                }
                self.state = TimerState::Work;
                Ok(TransitionOutcome::EnteredWork)
            }
            TimerState::Rest => {
                let kind = if tracker.should_take_long_break() {
                    if let Err(e) = tracker.reset_cycle() {
                        report("timer_engine.reset_cycle", &e);
                    }
                    BreakKind::Long
                } else {
                    BreakKind::Short
                };
                self.begin_countdown(self.config.get().break_duration(kind))?;
                if let Err(e) = tracker.start_break_session(kind) {
                    report("timer_engine.enter_rest", &e);
                }
                self.state = TimerState::Rest;
                self.break_kind = Some(kind);
                Ok(TransitionOutcome::EnteredRest(kind))
            }
            TimerState::Idle => {
                self.enter_idle();
                Ok(TransitionOutcome::EnteredIdle)
            }
        }
    }

    fn enter_idle(&mut self) {
        self.state = TimerState::Idle;
        self.finish_at = None;
        self.break_kind = None;
    }

    fn begin_countdown(&mut self, duration: Duration) -> Result<()> {
        let duration = self.length_override.unwrap_or(duration);
        if duration <= Duration::zero() {
            return Err(CoreError::InvalidDuration {
                seconds: duration.num_seconds(),
            });
        }
        self.finish_at = Some(self.clock.now() + duration);
        Ok(())
    }
}
