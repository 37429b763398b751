//! Pomodoro and stopwatch behind one interface.
//!
//! Exactly one [`ModeTimer`] is active at a time. The [`ModeCoordinator`]
//! stops the running timer before switching, so the two modes never tick
//! concurrently.

mod coordinator;
mod stopwatch;

pub use coordinator::{ModeCoordinator, ModeSwitch, MODE_KEY};
pub use stopwatch::Stopwatch;

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timer::{TimerDirective, Transition};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    #[default]
    Pomodoro,
    Stopwatch,
}

impl TimerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Pomodoro => "pomodoro",
            TimerMode::Stopwatch => "stopwatch",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pomodoro" => Ok(TimerMode::Pomodoro),
            "stopwatch" => Ok(TimerMode::Stopwatch),
            other => Err(format!("unknown timer mode: {other}")),
        }
    }
}

/// What a stopwatch command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopwatchEffect {
    Started,
    Paused { elapsed: Duration },
    Stopped { elapsed: Duration },
    Reset,
}

/// Outcome of a [`ModeTimer`] command, for the controller to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nothing changed.
    None,
    Pomodoro(Transition),
    Stopwatch(StopwatchEffect),
}

impl Effect {
    /// What should happen to the tick source.
    pub fn timer_directive(&self) -> TimerDirective {
        match self {
            Effect::None => TimerDirective::Keep,
            Effect::Pomodoro(transition) => transition.timer,
            Effect::Stopwatch(StopwatchEffect::Started) => {
                TimerDirective::Arm(crate::clock::TickSchedule::every_second())
            }
            Effect::Stopwatch(_) => TimerDirective::Cancel,
        }
    }
}

/// The uniform timer interface.
pub trait ModeTimer: Send {
    fn mode(&self) -> TimerMode;

    fn is_running(&self) -> bool;

    fn current_time(&self) -> Duration;

    fn display_text(&self) -> String {
        format_clock(self.current_time())
    }

    fn start(&mut self) -> Result<Effect>;

    fn pause(&mut self) -> Result<Effect>;

    fn stop(&mut self) -> Result<Effect>;

    fn reset(&mut self) -> Result<Effect>;
}

/// `M:SS` under an hour, `H:MM:SS` from an hour up. Partial seconds are
/// dropped; negative input shows as zero.
pub fn format_clock(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Like [`format_clock`] but partial seconds round up, so a countdown shows
/// its full length until the first whole second has passed.
pub fn format_countdown(remaining: Duration) -> String {
    let millis = remaining.num_milliseconds().max(0);
    format_clock(Duration::seconds((millis + 999) / 1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_format_switches_at_one_hour() {
        assert_eq!(format_clock(Duration::zero()), "0:00");
        assert_eq!(format_clock(Duration::seconds(5)), "0:05");
        assert_eq!(format_clock(Duration::seconds(25 * 60)), "25:00");
        assert_eq!(format_clock(Duration::seconds(3599)), "59:59");
        assert_eq!(format_clock(Duration::seconds(3600)), "1:00:00");
        assert_eq!(format_clock(Duration::seconds(3600 + 61)), "1:01:01");
        assert_eq!(format_clock(Duration::seconds(-3)), "0:00");
    }

    #[test]
    fn countdown_rounds_partial_seconds_up() {
        assert_eq!(format_countdown(Duration::milliseconds(1)), "0:01");
        assert_eq!(format_countdown(Duration::milliseconds(59_001)), "1:00");
        assert_eq!(format_countdown(Duration::seconds(90)), "1:30");
        assert_eq!(format_clock(Duration::milliseconds(59_999)), "0:59");
    }

    #[test]
    fn mode_parses_and_prints() {
        assert_eq!("Stopwatch".parse::<TimerMode>(), Ok(TimerMode::Stopwatch));
        assert_eq!(TimerMode::Pomodoro.to_string(), "pomodoro");
        assert!("lap".parse::<TimerMode>().is_err());
        assert_eq!(TimerMode::default(), TimerMode::Pomodoro);
    }

    #[test]
    fn stopwatch_effects_map_to_directives() {
        assert_eq!(Effect::None.timer_directive(), TimerDirective::Keep);
        assert!(matches!(
            Effect::Stopwatch(StopwatchEffect::Started).timer_directive(),
            TimerDirective::Arm(_)
        ));
        assert_eq!(
            Effect::Stopwatch(StopwatchEffect::Reset).timer_directive(),
            TimerDirective::Cancel
        );
    }
}
