use std::sync::Arc;

use super::{Effect, ModeTimer, Stopwatch, TimerMode};
use crate::error::{report, Result};
use crate::storage::KeyValueStore;
use crate::timer::PomodoroTimer;

/// Store key of the selected mode.
pub const MODE_KEY: &str = "timer_mode";

/// Result of an actual mode change.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSwitch {
    pub from: TimerMode,
    pub to: TimerMode,
    /// What stopping the previously active timer did.
    pub stopped: Effect,
}

/// Owns both timers and routes the uniform interface to the active one.
pub struct ModeCoordinator {
    mode: TimerMode,
    pomodoro: PomodoroTimer,
    stopwatch: Stopwatch,
    store: Arc<dyn KeyValueStore>,
}

impl ModeCoordinator {
    /// Restore the persisted mode. Unknown values fall back to Pomodoro.
    pub fn load(store: Arc<dyn KeyValueStore>, pomodoro: PomodoroTimer, stopwatch: Stopwatch) -> Result<Self> {
        let mode = match store.get(MODE_KEY)? {
            Some(raw) => raw.parse::<TimerMode>().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "ignoring stored timer mode");
                TimerMode::default()
            }),
            None => TimerMode::default(),
        };
        Ok(Self {
            mode,
            pomodoro,
            stopwatch,
            store,
        })
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn active(&self) -> &dyn ModeTimer {
        match self.mode {
            TimerMode::Pomodoro => &self.pomodoro,
            TimerMode::Stopwatch => &self.stopwatch,
        }
    }

    pub fn active_mut(&mut self) -> &mut dyn ModeTimer {
        match self.mode {
            TimerMode::Pomodoro => &mut self.pomodoro,
            TimerMode::Stopwatch => &mut self.stopwatch,
        }
    }

    pub fn pomodoro(&self) -> &PomodoroTimer {
        &self.pomodoro
    }

    pub fn pomodoro_mut(&mut self) -> &mut PomodoroTimer {
        &mut self.pomodoro
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    /// Make `to` the active mode, stopping the current timer first if it is
    /// running. Returns `None` if `to` is already active.
    pub fn switch_to(&mut self, to: TimerMode) -> Result<Option<ModeSwitch>> {
        let from = self.mode;
        if from == to {
            return Ok(None);
        }
        let stopped = if self.active().is_running() {
            self.active_mut().stop()?
        } else {
            Effect::None
        };
        self.mode = to;
        if let Err(e) = self.store.set(MODE_KEY, to.as_str()) {
            report("mode_coordinator.persist_mode", &e);
        }
        tracing::info!(%from, %to, "timer mode changed");
        Ok(Some(ModeSwitch { from, to, stopped }))
    }
}
