//! Single processing context for the controller.
//!
//! A spawned tokio task owns the [`Controller`]. UI commands, ticks from the
//! [`TokioTicker`] and notification actions all arrive as [`Command`]s on one
//! channel, so no reader ever sees a transition half-applied.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::clock::{Clock, TickToken, TokioTicker};
use crate::controller::{Controller, Services, Snapshot};
use crate::error::{CoreError, Result};
use crate::events::{Event, EventBus};
use crate::mode::TimerMode;
use crate::services::NotificationAction;
use crate::session::{DateRange, PomodoroStats};
use crate::storage::KeyValueStore;
use crate::timer::TimerOptions;

#[derive(Debug)]
pub enum Command {
    StartStop,
    SkipRest,
    ForceStop,
    Start,
    Pause,
    Stop,
    Reset,
    SwitchMode(TimerMode),
    Tick(TickToken),
    Snapshot(oneshot::Sender<Snapshot>),
    TodayStats(oneshot::Sender<PomodoroStats>),
    WeeklyStats(oneshot::Sender<PomodoroStats>),
    RangeStats(DateRange, oneshot::Sender<PomodoroStats>),
    ResetCycle(oneshot::Sender<Result<()>>),
    /// Force-stops first, so no active session outlives the wipe.
    ClearData(oneshot::Sender<Result<()>>),
    Shutdown,
}

/// Cheap, cloneable front door to a running controller.
#[derive(Clone)]
pub struct RuntimeHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: EventBus,
}

impl RuntimeHandle {
    /// Queue `command`. Returns false once the runtime has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// # Errors
    /// `RuntimeStopped` if the processing task has ended.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (tx, rx) = oneshot::channel();
        self.request(Command::Snapshot(tx), rx).await
    }

    pub async fn today_stats(&self) -> Result<PomodoroStats> {
        let (tx, rx) = oneshot::channel();
        self.request(Command::TodayStats(tx), rx).await
    }

    pub async fn weekly_stats(&self) -> Result<PomodoroStats> {
        let (tx, rx) = oneshot::channel();
        self.request(Command::WeeklyStats(tx), rx).await
    }

    pub async fn stats_for_range(&self, range: DateRange) -> Result<PomodoroStats> {
        let (tx, rx) = oneshot::channel();
        self.request(Command::RangeStats(range, tx), rx).await
    }

    pub async fn reset_cycle(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.request(Command::ResetCycle(tx), rx).await?
    }

    /// # Errors
    /// `RuntimeStopped`, or the storage error that stopped the wipe.
    pub async fn clear_all_data(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.request(Command::ClearData(tx), rx).await?
    }

    /// Force-stop and end the processing task.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    async fn request<T>(&self, command: Command, reply: oneshot::Receiver<T>) -> Result<T> {
        if !self.send(command) {
            return Err(CoreError::RuntimeStopped);
        }
        reply.await.map_err(|_| CoreError::RuntimeStopped)
    }
}

/// [`spawn_with_options`] with default timer options.
pub fn spawn(
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    services: Services,
) -> Result<(RuntimeHandle, JoinHandle<()>)> {
    spawn_with_options(store, clock, services, TimerOptions::default())
}

/// Assemble a controller over `store` and spawn its processing task.
///
/// Must be called from within a tokio runtime. The task ends after
/// [`RuntimeHandle::shutdown`] or once every handle has been dropped.
///
/// # Errors
/// Returns an error if loading persisted state fails.
pub fn spawn_with_options(
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    services: Services,
    options: TimerOptions,
) -> Result<(RuntimeHandle, JoinHandle<()>)> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let ticks = tx.downgrade();
    let ticker = TokioTicker::new(move |token| {
        if let Some(tx) = ticks.upgrade() {
            let _ = tx.send(Command::Tick(token));
        }
    });

    let actions = tx.downgrade();
    services
        .notifier
        .register_action_handler(Box::new(move |action| {
            let Some(tx) = actions.upgrade() else {
                return;
            };
            match action {
                NotificationAction::SkipRest => {
                    let _ = tx.send(Command::SkipRest);
                }
            }
        }));

    let mut controller =
        Controller::assemble_with_options(store, clock, services, Box::new(ticker), options)?;
    let handle = RuntimeHandle {
        commands: tx,
        events: controller.events().clone(),
    };

    let task = tokio::spawn(async move {
        tracing::debug!("runtime started");
        while let Some(command) = rx.recv().await {
            if !process(&mut controller, command) {
                break;
            }
        }
        controller.force_stop();
        tracing::debug!("runtime stopped");
    });

    Ok((handle, task))
}

/// Returns false when the loop should end. Command errors were already
/// reported by the controller.
fn process(controller: &mut Controller, command: Command) -> bool {
    let result = match command {
        Command::StartStop => controller.start_stop(),
        Command::SkipRest => controller.skip_rest(),
        Command::ForceStop => {
            controller.force_stop();
            Ok(())
        }
        Command::Start => controller.start(),
        Command::Pause => controller.pause(),
        Command::Stop => controller.stop(),
        Command::Reset => controller.reset(),
        Command::SwitchMode(mode) => controller.switch_mode(mode),
        Command::Tick(token) => {
            controller.on_tick(token);
            Ok(())
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(controller.snapshot());
            Ok(())
        }
        Command::TodayStats(reply) => {
            let _ = reply.send(controller.today_stats());
            Ok(())
        }
        Command::WeeklyStats(reply) => {
            let _ = reply.send(controller.weekly_stats());
            Ok(())
        }
        Command::RangeStats(range, reply) => {
            let _ = reply.send(controller.stats_for_range(&range));
            Ok(())
        }
        Command::ResetCycle(reply) => {
            let _ = reply.send(controller.reset_cycle());
            Ok(())
        }
        Command::ClearData(reply) => {
            let _ = reply.send(controller.clear_all_data());
            Ok(())
        }
        Command::Shutdown => return false,
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "command failed");
    }
    true
}
