//! # Pomobell Core Library
//!
//! This library provides the core logic for the Pomobell menu-bar timer: a
//! Pomodoro state machine with session accounting, plus a stopwatch mode.
//! The `pomobell` CLI and any GUI shell are thin layers over the same core.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based idle/work/rest state machine. It
//!   never spawns; transitions tell the caller what to do with the tick source
//! - **Session Tracker**: One session per interval, the work-interval
//!   counter, bounded history and day/week statistics
//! - **Mode Coordinator**: Pomodoro and stopwatch behind one interface
//! - **Controller / Runtime**: Turns transitions into notifications, audio
//!   cues and status updates, on a single tokio task
//! - **Storage**: Key-value persistence (SQLite or in-memory) and the
//!   clamped TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`SessionTracker`]: Session history and statistics
//! - [`Controller`]: Side-effect dispatcher
//! - [`Config`]: Application configuration

pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod mode;
pub mod policy;
pub mod runtime;
pub mod services;
pub mod session;
pub mod storage;
pub mod timer;

pub use clock::{Clock, SystemClock, TickSchedule, TickToken, Ticker, TokioTicker};
pub use controller::{Controller, Services, Snapshot};
pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::{Event, EventBus};
pub use mode::{format_clock, ModeCoordinator, ModeTimer, Stopwatch, TimerMode};
pub use policy::PolicyBundle;
pub use runtime::{Command, RuntimeHandle};
pub use services::{AudioPlayer, IconKind, NotificationAction, NotificationCategory, Notifier, StatusDisplay};
pub use session::{DateRange, PomodoroStats, Session, SessionTracker, SessionType};
pub use storage::{Config, ConfigStore, Database, KeyValueStore, MemoryStore};
pub use timer::{
    BreakKind, PomodoroTimer, TimerEngine, TimerEvent, TimerOptions, TimerState, Transition,
};
