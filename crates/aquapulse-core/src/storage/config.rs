//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Reminder interval and the highest disruption level to show
//! - Work-hours window (`"HH:MM"` strings)
//! - Which suppression signals are consulted
//! - Daily hydration goal
//!
//! Configuration is stored at `~/.config/aquapulse/config.toml`.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::collaborators::SettingsProvider;
use crate::error::{ConfigError, Result};
use crate::reminder::{EscalationLevel, DEFAULT_INTERVAL_MINUTES};
use crate::settings::{format_hhmm, ReminderSettings, DEFAULT_DAILY_GOAL_ML};

/// Reminder cadence configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemindersConfig {
    #[serde(default = "default_interval")]
    pub base_interval_minutes: u32,
    #[serde(default = "default_max_level")]
    pub max_disruption_level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkHoursConfig {
    #[serde(default = "default_work_start")]
    pub start: String,
    #[serde(default = "default_work_end")]
    pub end: String,
}

/// Suppression signal toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionConfig {
    /// Ask the oracle before showing a reminder at all
    #[serde(default = "default_true")]
    pub smart_pause: bool,
    #[serde(default = "default_true")]
    pub circadian: bool,
    #[serde(default)]
    pub weather: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalConfig {
    #[serde(default = "default_goal")]
    pub daily_ml: u32,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub work_hours: WorkHoursConfig,
    #[serde(default)]
    pub suppression: SuppressionConfig,
    #[serde(default)]
    pub goal: GoalConfig,
}

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_MINUTES
}
fn default_max_level() -> u8 {
    EscalationLevel::MAX
}
fn default_work_start() -> String {
    "09:00".to_string()
}
fn default_work_end() -> String {
    "17:00".to_string()
}
fn default_true() -> bool {
    true
}
fn default_goal() -> u32 {
    DEFAULT_DAILY_GOAL_ML
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            base_interval_minutes: default_interval(),
            max_disruption_level: default_max_level(),
        }
    }
}

impl Default for WorkHoursConfig {
    fn default() -> Self {
        Self {
            start: default_work_start(),
            end: default_work_end(),
        }
    }
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            smart_pause: true,
            circadian: true,
            weather: false,
        }
    }
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            daily_ml: default_goal(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reminders: RemindersConfig::default(),
            work_hours: WorkHoursConfig::default(),
            suppression: SuppressionConfig::default(),
            goal: GoalConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent) = parent {
            for part in parent.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
            ),
            serde_json::Value::Number(_) => serde_json::Value::Number(
                value
                    .parse::<u64>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                    .into(),
            ),
            serde_json::Value::Object(_) => return Err(unknown()),
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the default file on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key, in memory only. The result must
    /// still describe valid reminder settings or nothing changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated
            .to_settings()
            .and_then(|s| s.validate().map_err(|e| invalid(e.to_string())))?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// All leaf keys with their values, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            flatten("", &json, &mut out);
        }
        out
    }

    /// Typed settings for the scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if a work-hours entry is not `HH:MM`. Range checks
    /// are left to [`ReminderSettings::validate`].
    pub fn to_settings(&self) -> Result<ReminderSettings, ConfigError> {
        Ok(ReminderSettings {
            base_interval_minutes: self.reminders.base_interval_minutes,
            work_hours_start: parse_hhmm("work_hours.start", &self.work_hours.start)?,
            work_hours_end: parse_hhmm("work_hours.end", &self.work_hours.end)?,
            max_disruption_level: self.reminders.max_disruption_level,
            smart_pause_enabled: self.suppression.smart_pause,
            circadian_enabled: self.suppression.circadian,
            weather_enabled: self.suppression.weather,
            daily_goal_ml: self.goal.daily_ml,
        })
    }

    pub fn from_settings(settings: &ReminderSettings) -> Self {
        Self {
            reminders: RemindersConfig {
                base_interval_minutes: settings.base_interval_minutes,
                max_disruption_level: settings.max_disruption_level,
            },
            work_hours: WorkHoursConfig {
                start: format_hhmm(settings.work_hours_start),
                end: format_hhmm(settings.work_hours_end),
            },
            suppression: SuppressionConfig {
                smart_pause: settings.smart_pause_enabled,
                circadian: settings.circadian_enabled,
                weather: settings.weather_enabled,
            },
            goal: GoalConfig {
                daily_ml: settings.daily_goal_ml,
            },
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&key, v, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

fn parse_hhmm(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{value}' is not HH:MM"),
    })
}

/// Settings provider backed by the TOML file; re-read on every load.
#[derive(Debug, Clone, Default)]
pub struct ConfigSettings {
    path: Option<PathBuf>,
}

impl ConfigSettings {
    /// Use the default config location.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl SettingsProvider for ConfigSettings {
    fn load(&self) -> Result<ReminderSettings> {
        let config = match &self.path {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        Ok(config.to_settings()?)
    }
}
