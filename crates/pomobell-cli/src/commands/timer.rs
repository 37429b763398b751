use std::io::BufRead;
use std::sync::Arc;

use chrono::Duration;
use clap::Subcommand;
use pomobell_core::runtime::{self, Command, RuntimeHandle};
use pomobell_core::session;
use pomobell_core::storage::ConfigStore;
use pomobell_core::timer::DEFAULT_OVERRUN_LIMIT_SECS;
use pomobell_core::{NotificationAction, SessionTracker, SystemClock, TimerMode, TimerOptions};
use tokio::sync::broadcast::error::RecvError;

use super::open_store;
use crate::terminal::{self, TerminalNotifier};

const HELP: &str = "\
enter/s  start or stop
k        skip the break
p        pause
x        stop
r        reset
f        force stop
m MODE   switch to pomodoro or stopwatch
?        status
q        quit";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the timer in this terminal, reading commands from stdin
    Run {
        /// Switch to this mode before starting
        #[arg(long)]
        mode: Option<TimerMode>,
        /// Start the active timer immediately
        #[arg(long)]
        start: bool,
        /// Print every event as a JSON line
        #[arg(long)]
        events: bool,
        /// Seconds a tick may arrive past the deadline before the interval
        /// is stopped instead of completed
        #[arg(long, default_value_t = DEFAULT_OVERRUN_LIMIT_SECS)]
        overrun_limit: i64,
    },
    /// Print persisted timer state as JSON
    Status,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Run {
            mode,
            start,
            events,
            overrun_limit,
        } => {
            let options =
                TimerOptions::default().with_overrun_limit(Duration::seconds(overrun_limit.max(0)));
            run_interactive(mode, start, events, options)
        }
        TimerAction::Status => status(),
    }
}

fn run_interactive(
    mode: Option<TimerMode>,
    start: bool,
    print_events: bool,
    options: TimerOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store()?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        let notifier = Arc::new(TerminalNotifier::default());
        let (handle, task) = runtime::spawn_with_options(
            store,
            Arc::new(SystemClock),
            terminal::services(notifier.clone()),
            options,
        )?;

        if let Some(mode) = mode {
            handle.send(Command::SwitchMode(mode));
        }
        if start {
            handle.send(Command::Start);
        }

        let mut events = handle.subscribe();
        let printer = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if print_events => {
                        if let Ok(line) = serde_json::to_string(&event) {
                            println!("\r{line}");
                        }
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });

        eprintln!("{HELP}");
        let input = handle.clone();
        std::thread::spawn(move || read_commands(input, notifier));
        drop(handle);

        task.await?;
        printer.abort();
        println!();
        Ok::<_, Box<dyn std::error::Error>>(())
    })
}

fn read_commands(handle: RuntimeHandle, notifier: Arc<TerminalNotifier>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let mut words = line.split_whitespace();
        let command = match words.next().unwrap_or("s") {
            "s" => Command::StartStop,
            "k" => {
                if !notifier.trigger(NotificationAction::SkipRest) {
                    handle.send(Command::SkipRest);
                }
                continue;
            }
            "p" => Command::Pause,
            "x" => Command::Stop,
            "r" => Command::Reset,
            "f" => Command::ForceStop,
            "m" => match words.next().map(str::parse::<TimerMode>) {
                Some(Ok(mode)) => Command::SwitchMode(mode),
                Some(Err(e)) => {
                    eprintln!("{e}");
                    continue;
                }
                None => {
                    eprintln!("usage: m pomodoro|stopwatch");
                    continue;
                }
            },
            "?" => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                if handle.send(Command::Snapshot(tx)) {
                    if let Ok(snapshot) = rx.blocking_recv() {
                        if let Ok(json) = serde_json::to_string_pretty(&snapshot) {
                            println!("\r{json}");
                        }
                    }
                }
                continue;
            }
            "q" => break,
            other => {
                eprintln!("unknown command: {other}\n{HELP}");
                continue;
            }
        };
        if !handle.send(command) {
            return;
        }
    }
    handle.shutdown();
}

/// What another process would resume with. Reads without loading the
/// tracker, so an interval running elsewhere isn't recorded as interrupted.
fn status() -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store()?;
    let config = ConfigStore::load(store.clone())?.get();
    let mode = store
        .get(pomobell_core::mode::MODE_KEY)?
        .and_then(|raw| raw.parse::<TimerMode>().ok())
        .unwrap_or_default();
    let counter: u32 = store
        .get(session::COUNTER_KEY)?
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0);
    let active = store.get(session::ACTIVE_KEY)?.is_some();
    let history = SessionTracker::read_history(store.as_ref())?;

    let status = serde_json::json!({
        "mode": mode,
        "running_elsewhere": active,
        "work_intervals_done": counter,
        "work_intervals_in_set": config.work_intervals_in_set,
        "sessions_recorded": history.len(),
        "config": config,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
