mod engine;
mod pomodoro;

pub use engine::{TimerEngine, TimerOptions, DEFAULT_OVERRUN_LIMIT_SECS};
pub use pomodoro::PomodoroTimer;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::TickSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Work,
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerEvent {
    StartStop,
    TimerFired,
    SkipRest,
}

/// Resolved when a rest period begins, from the work-interval counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

/// Why a work or rest interval ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Timer expired normally. The session is completed.
    Completed,
    /// User pressed start/stop.
    Stopped,
    /// Rest skipped.
    Skipped,
    /// Tick arrived too late after the deadline (e.g. the system slept).
    Overrun,
    /// Force-stop.
    Forced,
}

impl ExitReason {
    pub fn completes_session(self) -> bool {
        self == ExitReason::Completed
    }
}

/// The generic "interval ended" hook, fired on every exit from work or rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    WorkEnded(ExitReason),
    BreakEnded(ExitReason),
}

impl Exit {
    pub fn reason(self) -> ExitReason {
        match self {
            Exit::WorkEnded(r) | Exit::BreakEnded(r) => r,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    EnteredWork,
    EnteredRest(BreakKind),
    EnteredIdle,
}

/// What the dispatcher must do with the tick source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDirective {
    Arm(TickSchedule),
    Cancel,
    Keep,
}

/// Result of one accepted transition, returned synchronously.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: TimerState,
    pub to: TimerState,
    /// `None` for force-stop.
    pub event: Option<TimerEvent>,
    pub exited: Option<Exit>,
    pub outcome: TransitionOutcome,
    pub timer: TimerDirective,
}

/// Result of handling one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No countdown armed; the tick was stale.
    Ignored,
    /// Still counting down. Never negative.
    Remaining(Duration),
    /// Deadline reached; `timerFired` was handled.
    Fired(Transition),
    /// Deadline missed by more than the overrun limit; forced to idle.
    Overrun(Transition),
}
