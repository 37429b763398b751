//! Timer configuration and the store that guards it.
//!
//! Stores user preferences:
//! - Work, short break and long break lengths (minutes)
//! - Work intervals per set (how many before a long break)
//! - Whether to stop after a break instead of starting the next interval
//! - Whether the remaining time is shown in the status display
//!
//! The configuration is persisted as a TOML document under the `config` key
//! of the key-value store. Numeric fields are clamped into their documented
//! ranges on load and on every write; bad values are never rejected here.

use std::sync::{Arc, RwLock};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::KeyValueStore;
use crate::error::{ConfigError, Result};
use crate::events::{Event, EventBus};
use crate::policy::{
    PolicyBundle, LONG_BREAK_MINUTES, SHORT_BREAK_MINUTES, WORK_INTERVALS_IN_SET, WORK_MINUTES,
};
use crate::timer::BreakKind;

const CONFIG_KEY: &str = "config";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub work_intervals_in_set: u32,
    pub stop_after_break: bool,
    pub show_timer_in_menu_bar: bool,
}

/// Loosely typed mirror of [`Config`] used for loading.
///
/// Accepts negative and oversized numbers so they can be clamped instead of
/// failing deserialization. Missing fields fall back to defaults.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    work_minutes: Option<i64>,
    short_break_minutes: Option<i64>,
    long_break_minutes: Option<i64>,
    work_intervals_in_set: Option<i64>,
    stop_after_break: Option<bool>,
    show_timer_in_menu_bar: Option<bool>,
}

impl RawConfig {
    fn clamped(self) -> Config {
        let defaults = Config::default();
        Config {
            work_minutes: WORK_MINUTES
                .clamp(self.work_minutes.unwrap_or(defaults.work_minutes as i64)),
            short_break_minutes: SHORT_BREAK_MINUTES.clamp(
                self.short_break_minutes
                    .unwrap_or(defaults.short_break_minutes as i64),
            ),
            long_break_minutes: LONG_BREAK_MINUTES.clamp(
                self.long_break_minutes
                    .unwrap_or(defaults.long_break_minutes as i64),
            ),
            work_intervals_in_set: WORK_INTERVALS_IN_SET.clamp(
                self.work_intervals_in_set
                    .unwrap_or(defaults.work_intervals_in_set as i64),
            ),
            stop_after_break: self.stop_after_break.unwrap_or(defaults.stop_after_break),
            show_timer_in_menu_bar: self
                .show_timer_in_menu_bar
                .unwrap_or(defaults.show_timer_in_menu_bar),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            work_intervals_in_set: 4,
            stop_after_break: false,
            show_timer_in_menu_bar: true,
        }
    }
}

impl Config {
    /// Parse a TOML document, clamping every numeric field.
    ///
    /// # Errors
    /// Returns `ParseFailed` if the document isn't valid TOML or a field has
    /// the wrong type.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Ok(raw.clamped())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Return a copy with every numeric field inside its range.
    pub fn clamped(&self) -> Self {
        Self {
            work_minutes: WORK_MINUTES.clamp(self.work_minutes as i64),
            short_break_minutes: SHORT_BREAK_MINUTES.clamp(self.short_break_minutes as i64),
            long_break_minutes: LONG_BREAK_MINUTES.clamp(self.long_break_minutes as i64),
            work_intervals_in_set: WORK_INTERVALS_IN_SET.clamp(self.work_intervals_in_set as i64),
            ..self.clone()
        }
    }

    pub fn work_duration(&self) -> Duration {
        Duration::minutes(self.work_minutes as i64)
    }

    pub fn break_duration(&self, kind: BreakKind) -> Duration {
        match kind {
            BreakKind::Short => Duration::minutes(self.short_break_minutes as i64),
            BreakKind::Long => Duration::minutes(self.long_break_minutes as i64),
        }
    }

    /// Get a config value as string by key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = json.get(key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Return a copy with `key` set from its string form, clamped.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or the value has the wrong type.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Self, ConfigError> {
        let mut json = serde_json::to_value(self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        let obj = json
            .as_object_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let existing = obj
            .get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|_| ConfigError::ParseFailed(format!("cannot parse '{value}' as bool")))?,
            ),
            serde_json::Value::Number(_) => serde_json::Value::Number(
                value
                    .parse::<i64>()
                    .map_err(|_| {
                        ConfigError::ParseFailed(format!("cannot parse '{value}' as integer"))
                    })?
                    .into(),
            ),
            _ => serde_json::Value::String(value.into()),
        };
        obj.insert(key.to_string(), new_value);

        let raw: RawConfig =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Ok(raw.clamped())
    }
}

/// Shared, validated configuration.
///
/// Readers get a snapshot via [`ConfigStore::get`] and must not assume two
/// snapshots agree. Writers clamp under the write lock, so a read that starts
/// after a write returns sees the normalized value.
pub struct ConfigStore {
    current: RwLock<Config>,
    store: Arc<dyn KeyValueStore>,
    events: Option<EventBus>,
}

impl ConfigStore {
    /// Load from the key-value store, clamping whatever is there.
    ///
    /// A missing document is replaced by the defaults. An unreadable one is
    /// logged and also replaced.
    ///
    /// # Errors
    /// Returns an error if the store itself fails.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let config = match store.get(CONFIG_KEY)? {
            Some(content) => match Config::from_toml(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(error = %e, "stored configuration unreadable, using defaults");
                    Config::default()
                }
            },
            None => Config::default(),
        };
        store.set(CONFIG_KEY, &config.to_toml()?)?;
        Ok(Self {
            current: RwLock::new(config),
            store,
            events: None,
        })
    }

    /// Publish `ConfigurationChanged` on `events` after every write.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn get(&self) -> Config {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Apply `f`, clamp, persist and notify. Returns the stored result.
    ///
    /// # Errors
    /// Returns an error if persisting fails; the in-memory value is left
    /// unchanged in that case.
    pub fn update(&self, f: impl FnOnce(&mut Config)) -> Result<Config> {
        let updated = {
            let mut guard = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut candidate = guard.clone();
            f(&mut candidate);
            let candidate = candidate.clamped();
            self.store.set(CONFIG_KEY, &candidate.to_toml()?)?;
            *guard = candidate.clone();
            candidate
        };
        tracing::debug!(?updated, "configuration changed");
        if let Some(events) = &self.events {
            events.publish(Event::ConfigurationChanged);
        }
        Ok(updated)
    }

    pub fn replace(&self, config: Config) -> Result<Config> {
        self.update(|cfg| *cfg = config)
    }

    /// Set a single key from its string form.
    pub fn set_value(&self, key: &str, value: &str) -> Result<Config> {
        let next = self.get().with_value(key, value)?;
        self.replace(next)
    }

    /// Reset every field to its default.
    pub fn reset(&self) -> Result<Config> {
        self.replace(Config::default())
    }

    pub fn export(&self) -> PolicyBundle {
        PolicyBundle::from_config(&self.get())
    }

    /// Strict import: missing or out-of-range fields are errors.
    pub fn import(&self, json: &str) -> Result<Config> {
        let bundle = PolicyBundle::from_json(json)?;
        self.replace(bundle.to_config())
    }
}
