//! User settings persisted in the key-value store.
//!
//! `Settings` is a plain value owned by the application root and handed to
//! the timer and session log at construction. Each field lives under its own
//! `settings.<field>` key as JSON, so a bad or missing key only resets that
//! one field to its default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::KvStore;
use crate::error::{ConfigError, StoreError};
use crate::timer::{Preset, TimerMode};

const KEY_PREFIX: &str = "settings.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub auto_start_breaks: bool,
    #[serde(default = "default_true")]
    pub auto_start_focus: bool,
    #[serde(default)]
    pub last_used_mode: TimerMode,
    /// Snapshot of the preset in use when the app last ran.
    #[serde(default)]
    pub last_configuration: Option<Preset>,
    /// Seconds.
    #[serde(default = "default_quick_timer_duration")]
    pub quick_timer_duration: u64,
    #[serde(default = "default_daily_goal_minutes")]
    pub daily_goal_minutes: u32,
}

fn default_true() -> bool {
    true
}
fn default_quick_timer_duration() -> u64 {
    25 * 60
}
fn default_daily_goal_minutes() -> u32 {
    120
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            notifications_enabled: true,
            auto_start_breaks: true,
            auto_start_focus: true,
            last_used_mode: TimerMode::Pomodoro,
            last_configuration: None,
            quick_timer_duration: default_quick_timer_duration(),
            daily_goal_minutes: default_daily_goal_minutes(),
        }
    }
}

fn storage_key(field: &str) -> String {
    format!("{KEY_PREFIX}{field}")
}

impl Settings {
    fn fields() -> Map<String, Value> {
        match serde_json::to_value(Settings::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Load from the store. Never fails: unreadable fields fall back to defaults.
    pub fn load(store: &dyn KvStore) -> Self {
        let mut merged = Self::fields();
        let names: Vec<String> = merged.keys().cloned().collect();

        for field in names {
            let raw = match store.kv_get(&storage_key(&field)) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(%field, error = %e, "failed to read setting, using default");
                    continue;
                }
            };
            let parsed: Value = match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(%field, error = %e, "unparsable setting, using default");
                    continue;
                }
            };
            let mut candidate = merged.clone();
            candidate.insert(field.clone(), parsed);
            if serde_json::from_value::<Settings>(Value::Object(candidate.clone())).is_ok() {
                merged = candidate;
            } else {
                tracing::warn!(%field, "setting has the wrong shape, using default");
            }
        }

        let mut settings: Settings =
            serde_json::from_value(Value::Object(merged)).unwrap_or_default();
        settings.sanitize();
        settings
    }

    fn sanitize(&mut self) {
        if self.quick_timer_duration == 0 {
            self.quick_timer_duration = default_quick_timer_duration();
        }
        if self.daily_goal_minutes == 0 {
            self.daily_goal_minutes = default_daily_goal_minutes();
        }
        if let Some(preset) = &self.last_configuration {
            if preset.validate().is_err() {
                self.last_configuration = None;
            }
        }
    }

    /// Persist every field.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub fn save(&self, store: &dyn KvStore) -> Result<(), StoreError> {
        let json = serde_json::to_value(self).map_err(|e| StoreError::Corrupt {
            key: KEY_PREFIX.trim_end_matches('.').to_string(),
            message: e.to_string(),
        })?;
        let entries: Vec<(String, String)> = match json {
            Value::Object(map) => map
                .into_iter()
                .map(|(field, value)| (storage_key(&field), value.to_string()))
                .collect(),
            _ => Vec::new(),
        };
        store.kv_set_many(&entries)
    }

    /// Get a field as a string by name.
    pub fn get(&self, field: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match json.get(field)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a field by name, parsing `value` according to the field's type.
    ///
    /// # Errors
    /// Returns an error if the field is unknown or the value does not parse.
    pub fn set(&mut self, field: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(field, e))?;
        let obj = json
            .as_object_mut()
            .ok_or_else(|| ConfigError::UnknownKey(field.to_string()))?;
        let existing = obj
            .get(field)
            .ok_or_else(|| ConfigError::UnknownKey(field.to_string()))?;

        let new_value = match existing {
            Value::Bool(_) => Value::Bool(value.parse::<bool>().map_err(|e| invalid(field, e))?),
            Value::Number(_) => Value::Number(
                value
                    .parse::<u64>()
                    .map_err(|e| invalid(field, e))?
                    .into(),
            ),
            Value::String(_) => Value::String(value.to_string()),
            _ => serde_json::from_str(value).map_err(|e| invalid(field, e))?,
        };
        obj.insert(field.to_string(), new_value);

        let mut updated: Settings = serde_json::from_value(json).map_err(|e| invalid(field, e))?;
        updated.sanitize();
        *self = updated;
        Ok(())
    }
}

fn invalid(field: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: field.to_string(),
        message: err.to_string(),
    }
}
