//! Core error types for pomobell-core.
//!
//! Every failure inside the core is expressed as a [`CoreError`]. Errors are
//! caught where they happen and handed to [`report`], which is the single
//! place they get logged. Nothing leaves the core un-logged.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::{TimerEvent, TimerState};

/// Core error type for pomobell-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Event not accepted in the current state, or the machine isn't ready.
    #[error("Invalid state: cannot handle {event:?} while {state:?}")]
    InvalidState { state: TimerState, event: TimerEvent },

    /// A computed timer duration was zero or negative.
    #[error("Invalid duration: {seconds}s (must be positive)")]
    InvalidDuration { seconds: i64 },

    /// The tick source could not be scheduled.
    #[error("Timer creation failed: {0}")]
    TimerCreationFailed(String),

    /// A session operation needed an active session.
    #[error("No active session")]
    NoActiveSession,

    /// A session was started while another one was still active.
    #[error("A session is already active")]
    SessionAlreadyActive,

    /// The processing task behind a runtime handle has ended.
    #[error("Timer runtime is not running")]
    RuntimeStopped,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persistent store errors
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
///
/// Out-of-range values loaded at runtime are clamped and never produce one of
/// these. Only explicit imports are strict.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An imported bundle lacks required fields.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    /// An imported bundle has values outside their documented ranges.
    #[error("Invalid values: {}", .0.join("; "))]
    InvalidValues(Vec<String>),

    /// Unknown configuration key for get/set.
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Centralized error sink. Logs the error with the operation it came from.
pub fn report(context: &str, err: &CoreError) {
    match err {
        CoreError::InvalidState { .. }
        | CoreError::NoActiveSession
        | CoreError::SessionAlreadyActive => {
            tracing::warn!(context, error = %err, "rejected operation");
        }
        _ => {
            tracing::error!(context, error = %err, "operation failed");
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
