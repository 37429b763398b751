use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::{Effect, ModeTimer, StopwatchEffect, TimerMode};
use crate::clock::Clock;
use crate::error::Result;

/// Free-running count-up timer.
///
/// Elapsed time is `base` plus the current run, if any. Pausing folds the
/// run into `base`.
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    base: Duration,
    started_at: Option<DateTime<Utc>>,
}

impl Stopwatch {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            base: Duration::zero(),
            started_at: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        let run = self
            .started_at
            .map(|at| (self.clock.now() - at).max(Duration::zero()))
            .unwrap_or_else(Duration::zero);
        self.base + run
    }
}

impl ModeTimer for Stopwatch {
    fn mode(&self) -> TimerMode {
        TimerMode::Stopwatch
    }

    fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    fn current_time(&self) -> Duration {
        self.elapsed()
    }

    fn start(&mut self) -> Result<Effect> {
        if self.is_running() {
            return Ok(Effect::None);
        }
        self.started_at = Some(self.clock.now());
        tracing::debug!(base_secs = self.base.num_seconds(), "stopwatch started");
        Ok(Effect::Stopwatch(StopwatchEffect::Started))
    }

    fn pause(&mut self) -> Result<Effect> {
        if !self.is_running() {
            return Ok(Effect::None);
        }
        self.base = self.elapsed();
        self.started_at = None;
        Ok(Effect::Stopwatch(StopwatchEffect::Paused { elapsed: self.base }))
    }

    fn stop(&mut self) -> Result<Effect> {
        let elapsed = self.elapsed();
        if !self.is_running() && elapsed.is_zero() {
            return Ok(Effect::None);
        }
        self.base = Duration::zero();
        self.started_at = None;
        tracing::debug!(elapsed_secs = elapsed.num_seconds(), "stopwatch stopped");
        Ok(Effect::Stopwatch(StopwatchEffect::Stopped { elapsed }))
    }

    fn reset(&mut self) -> Result<Effect> {
        self.base = Duration::zero();
        self.started_at = None;
        Ok(Effect::Stopwatch(StopwatchEffect::Reset))
    }
}
