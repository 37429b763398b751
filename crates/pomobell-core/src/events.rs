use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::mode::TimerMode;
use crate::timer::TimerState;

/// Observable change notifications.
///
/// Consumers re-read derived state when one arrives. Only `TimerModeChanged`
/// and `StopwatchStopped` carry a payload contract; the other payloads are
/// informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Remaining seconds of a Pomodoro interval, or stopwatch elapsed time.
    TimerUpdated {
        seconds: i64,
    },
    TimerStateChanged {
        state: TimerState,
    },
    TimerModeChanged {
        from: TimerMode,
        to: TimerMode,
    },
    PomodoroCompleted,
    BreakCompleted,
    StopwatchStarted,
    StopwatchStopped {
        elapsed_secs: i64,
    },
    ConfigurationChanged,
}

const EVENT_CAPACITY: usize = 64;

/// Fan-out channel for [`Event`]s. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Send to current subscribers. Having none is not an error.
    pub fn publish(&self, event: Event) {
        tracing::trace!(?event, "publish");
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
