//! Wall-clock and tick-source abstractions.
//!
//! The state machine never sleeps or spawns. It reads time from a [`Clock`]
//! and asks the controller to arm or cancel a [`Ticker`], which delivers
//! periodic [`TickToken`]s back to the processing context.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{CoreError, Result};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// When and how often a tick source fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    /// Delay before the first tick. Zero means "now".
    pub delay: StdDuration,
    pub period: StdDuration,
    /// Lateness tolerated before a tick counts as delayed.
    pub leeway: StdDuration,
}

impl TickSchedule {
    /// First tick immediately, then once per second with 100 ms slack.
    pub const fn every_second() -> Self {
        Self {
            delay: StdDuration::ZERO,
            period: StdDuration::from_secs(1),
            leeway: StdDuration::from_millis(100),
        }
    }
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self::every_second()
    }
}

/// Identifies one arming of a tick source.
///
/// Ticks carrying a token other than the ticker's current one are stale and
/// must be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickToken(pub u64);

/// A single-slot periodic tick source.
pub trait Ticker: Send {
    /// Replace any armed schedule with `schedule`.
    fn arm(&mut self, schedule: TickSchedule) -> Result<TickToken>;

    /// Stop ticking. Safe to call when nothing is armed.
    fn cancel(&mut self);

    fn is_current(&self, token: TickToken) -> bool;
}

/// Tick source backed by a spawned tokio interval task.
pub struct TokioTicker {
    on_tick: Arc<dyn Fn(TickToken) + Send + Sync>,
    task: Option<JoinHandle<()>>,
    current: Option<TickToken>,
    issued: u64,
}

impl TokioTicker {
    pub fn new(on_tick: impl Fn(TickToken) + Send + Sync + 'static) -> Self {
        Self {
            on_tick: Arc::new(on_tick),
            task: None,
            current: None,
            issued: 0,
        }
    }
}

impl Ticker for TokioTicker {
    fn arm(&mut self, schedule: TickSchedule) -> Result<TickToken> {
        self.cancel();
        if schedule.period.is_zero() {
            return Err(CoreError::TimerCreationFailed(
                "tick period must be non-zero".into(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::TimerCreationFailed(e.to_string()))?;

        self.issued += 1;
        let token = TickToken(self.issued);
        let on_tick = self.on_tick.clone();
        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + schedule.delay, schedule.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                let scheduled = interval.tick().await;
                let late = Instant::now().saturating_duration_since(scheduled);
                if late > schedule.leeway {
                    tracing::trace!(?late, "tick delivered late");
                }
                on_tick(token);
            }
        });

        self.task = Some(task);
        self.current = Some(token);
        tracing::debug!(token = token.0, ?schedule, "tick source armed");
        Ok(token)
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("tick source cancelled");
        }
        self.current = None;
    }

    fn is_current(&self, token: TickToken) -> bool {
        self.current == Some(token)
    }
}

impl Drop for TokioTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Default)]
struct ManualTickerState {
    armed: Vec<TickSchedule>,
    current: Option<TickToken>,
    issued: u64,
    fail_next_arm: bool,
}

/// Ticker that never fires on its own. Clones share state, so a test can
/// keep one handle while the controller owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    state: Arc<Mutex<ManualTickerState>>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualTickerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn arm_count(&self) -> usize {
        self.lock().armed.len()
    }

    pub fn current(&self) -> Option<TickToken> {
        self.lock().current
    }

    pub fn last_schedule(&self) -> Option<TickSchedule> {
        self.lock().armed.last().copied()
    }

    /// Make the next `arm` fail with `TimerCreationFailed`.
    pub fn fail_next_arm(&self) {
        self.lock().fail_next_arm = true;
    }
}

impl Ticker for ManualTicker {
    fn arm(&mut self, schedule: TickSchedule) -> Result<TickToken> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_arm) {
            state.current = None;
            return Err(CoreError::TimerCreationFailed("manual failure".into()));
        }
        state.issued += 1;
        let token = TickToken(state.issued);
        state.armed.push(schedule);
        state.current = Some(token);
        Ok(token)
    }

    fn cancel(&mut self) {
        self.lock().current = None;
    }

    fn is_current(&self, token: TickToken) -> bool {
        self.lock().current == Some(token)
    }
}
