//! Policy bundle for import/export functionality.
//!
//! A policy bundle wraps the timer configuration in a versioned JSON document.
//! Unlike runtime loads, imports are strict: every field must be present and
//! inside its documented range.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NUMERIC_RANGES;
use crate::error::ConfigError;
use crate::storage::Config;

/// Current policy format version (semver).
pub const POLICY_VERSION: &str = "1.0.0";

const BOOL_FIELDS: [&str; 2] = ["stop_after_break", "show_timer_in_menu_bar"];

/// A complete policy bundle ready for export/import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyBundle {
    /// Policy format version (semver).
    pub version: String,
    /// When the bundle was produced.
    pub exported_at: DateTime<Utc>,
    /// The timer settings.
    pub config: Config,
}

impl PolicyBundle {
    pub fn from_config(config: &Config) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            exported_at: Utc::now(),
            config: config.clone(),
        }
    }

    /// Serialize the bundle to a JSON string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse and validate a bundle.
    ///
    /// # Errors
    /// - `ParseFailed` if the text isn't a JSON object with a `config` object
    /// - `MissingRequiredFields` listing every absent setting
    /// - `InvalidValues` listing every setting of the wrong type or out of range,
    ///   and an incompatible major version
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let root: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        let config = root
            .get("config")
            .and_then(|c| c.as_object())
            .ok_or_else(|| ConfigError::ParseFailed("bundle has no 'config' object".into()))?;

        let missing: Vec<String> = NUMERIC_RANGES
            .iter()
            .map(|r| r.field)
            .chain(BOOL_FIELDS)
            .filter(|field| !config.contains_key(*field))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequiredFields(missing));
        }

        let mut invalid = Vec::new();
        if let Some(version) = root.get("version").and_then(|v| v.as_str()) {
            if major(version) != major(POLICY_VERSION) {
                invalid.push(format!(
                    "version: {version} is incompatible with {POLICY_VERSION}"
                ));
            }
        }
        for range in NUMERIC_RANGES {
            match config.get(range.field).and_then(|v| v.as_i64()) {
                Some(value) if range.contains(value) => {}
                Some(value) => invalid.push(format!(
                    "{}: {} is outside {}..={}",
                    range.field, value, range.min, range.max
                )),
                None => invalid.push(format!("{}: expected an integer", range.field)),
            }
        }
        for field in BOOL_FIELDS {
            if !config.get(field).is_some_and(|v| v.is_boolean()) {
                invalid.push(format!("{field}: expected true or false"));
            }
        }
        if !invalid.is_empty() {
            return Err(ConfigError::InvalidValues(invalid));
        }

        serde_json::from_value(root).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn to_config(&self) -> Config {
        self.config.clone()
    }
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}
