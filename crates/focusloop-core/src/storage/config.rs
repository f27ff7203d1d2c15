//! TOML-based application configuration.
//!
//! Stores user preferences:
//! - Session durations (work, short break, long break)
//! - Cycle behavior (long-break interval, auto-start, visibility handling)
//! - Notification master switch
//! - Time display format
//!
//! Configuration is stored at `~/.config/focusloop/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::Mode;

/// Session lengths in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationsConfig {
    #[serde(default = "default_work_secs")]
    pub work: u32,
    #[serde(default = "default_short_secs")]
    pub short: u32,
    #[serde(default = "default_long_secs")]
    pub long: u32,
}

/// Cycle and visibility behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Completed work sessions between long breaks.
    #[serde(default = "default_long_interval")]
    pub long_interval: u32,
    /// Auto-start the next session on every completion transition.
    #[serde(default)]
    pub auto_start_next: bool,
    /// Pause a running timer when the surface goes to the background.
    #[serde(default)]
    pub auto_pause_on_blur: bool,
    /// Resume a blur-paused timer when the surface is foregrounded again.
    #[serde(default)]
    pub auto_resume_on_focus: bool,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusloop/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub durations: DurationsConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Display preference only; the engine never reads it.
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

// Default functions
fn default_work_secs() -> u32 {
    25 * 60
}
fn default_short_secs() -> u32 {
    5 * 60
}
fn default_long_secs() -> u32 {
    15 * 60
}
fn default_long_interval() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_time_format() -> String {
    "24h".into()
}

impl Default for DurationsConfig {
    fn default() -> Self {
        Self {
            work: default_work_secs(),
            short: default_short_secs(),
            long: default_long_secs(),
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            long_interval: default_long_interval(),
            auto_start_next: false,
            auto_pause_on_blur: false,
            auto_resume_on_focus: false,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            durations: DurationsConfig::default(),
            behavior: BehaviorConfig::default(),
            notifications: NotificationsConfig::default(),
            time_format: default_time_format(),
        }
    }
}

impl Config {
    /// Configured length in seconds for a session kind. Total over [`Mode`].
    pub fn duration_for(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Work => self.durations.work,
            Mode::ShortBreak => self.durations.short,
            Mode::LongBreak => self.durations.long,
        }
    }

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
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::UnknownKey(key.into()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.into()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.into()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|_| ConfigError::InvalidValue {
                            key: key.into(),
                            message: format!("cannot parse '{value}' as bool"),
                        })?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                            key: key.into(),
                            message: format!("cannot parse '{value}' as number"),
                        })?;
                        serde_json::Value::Number(n.into())
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.into()))?;
        }

        Err(ConfigError::UnknownKey(key.into()))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/focusloop"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error. Never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, validate, and save.
    ///
    /// This is the settings-editing boundary: values that would put the
    /// engine in a nonsensical state (zero durations, `long_interval < 2`)
    /// are rejected here.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// the result fails validation, or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        self.save()?;
        Ok(())
    }

    /// Reject values the engine must never see.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, secs) in [
            ("durations.work", self.durations.work),
            ("durations.short", self.durations.short),
            ("durations.long", self.durations.long),
        ] {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "duration must be at least 1 second".into(),
                });
            }
        }
        if self.behavior.long_interval < 2 {
            return Err(ConfigError::InvalidValue {
                key: "behavior.long_interval".into(),
                message: "long-break interval must be at least 2".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.durations.work, 25 * 60);
        assert_eq!(parsed.behavior.long_interval, 4);
    }

    #[test]
    fn empty_toml_fills_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn duration_for_is_total() {
        let cfg = Config::default();
        assert_eq!(cfg.duration_for(Mode::Work), 1500);
        assert_eq!(cfg.duration_for(Mode::ShortBreak), 300);
        assert_eq!(cfg.duration_for(Mode::LongBreak), 900);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("durations.work").as_deref(), Some("1500"));
        assert_eq!(cfg.get("behavior.auto_start_next").as_deref(), Some("false"));
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("time_format").as_deref(), Some("24h"));
        assert!(cfg.get("durations.nap").is_none());
    }

    #[test]
    fn set_json_value_by_path_updates_nested_number() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "durations.short", "240").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "durations.short").unwrap(),
            &serde_json::Value::Number(240.into())
        );
    }

    #[test]
    fn set_json_value_by_path_updates_nested_bool() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "behavior.auto_start_next", "true").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "behavior.auto_start_next").unwrap(),
            &serde_json::Value::Bool(true)
        );
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "behavior.snooze", "true");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_json_value_by_path_rejects_invalid_type() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result =
            Config::set_json_value_by_path(&mut json, "behavior.auto_start_next", "not_a_bool");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn validate_rejects_small_long_interval() {
        let mut cfg = Config::default();
        cfg.behavior.long_interval = 1;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_duration() {
        let mut cfg = Config::default();
        cfg.durations.short = 0;
        assert!(cfg.validate().is_err());
    }
}
