//! TOML-based application configuration.
//!
//! Stores:
//! - Backend URL and request timeout
//! - Calendar form defaults and the upcoming-events horizon
//! - Session action-gate lifetime
//! - Log filter
//!
//! Configuration is stored at `~/.config/itdesk/config.toml`.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::calendar::FormDefaults;
use crate::error::ConfigError;

/// Env var that overrides the configured backend URL.
pub const BACKEND_URL_ENV: &str = "ITDESK_BACKEND_URL";
/// Fallback env var name kept for existing deployments.
pub const LEGACY_BACKEND_URL_ENV: &str = "BACKEND_URL";

/// Longest accepted `calendar.upcoming_days`.
pub const MAX_UPCOMING_DAYS: i64 = 3650;
/// Longest accepted `session.action_gate_minutes` (one day).
pub const MAX_ACTION_GATE_MINUTES: i64 = 24 * 60;

/// Returns `~/.config/itdesk[-dev]/` based on ITDESK_ENV, or `$ITDESK_HOME`.
///
/// Set ITDESK_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("ITDESK_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ITDESK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("itdesk-dev")
            } else {
                base_dir.join("itdesk")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DirectoryUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Calendar behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Start time for timed events entered as a bare date (`HH:MM`).
    #[serde(default = "default_start_time")]
    pub default_start_time: String,
    /// End time for timed events entered as a bare date (`HH:MM`).
    #[serde(default = "default_end_time")]
    pub default_end_time: String,
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a confirmed action gate stays open.
    #[serde(default = "default_gate_minutes")]
    pub action_gate_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/itdesk/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_backend_url() -> String {
    "http://localhost:3001".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_start_time() -> String {
    "09:00".into()
}
fn default_end_time() -> String {
    "10:00".into()
}
fn default_upcoming_days() -> i64 {
    7
}
fn default_gate_minutes() -> i64 {
    10
}
fn default_log_filter() -> String {
    "info".into()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            default_start_time: default_start_time(),
            default_end_time: default_end_time(),
            upcoming_days: default_upcoming_days(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            action_gate_minutes: default_gate_minutes(),
        }
    }
}

impl SessionConfig {
    /// Action-gate lifetime as a duration.
    pub fn gate_ttl(&self) -> Result<Duration, ConfigError> {
        check_range(
            "session.action_gate_minutes",
            self.action_gate_minutes,
            1,
            MAX_ACTION_GATE_MINUTES,
        )?;
        Duration::try_minutes(self.action_gate_minutes).ok_or_else(|| ConfigError::InvalidValue {
            key: "session.action_gate_minutes".into(),
            message: "out of range".into(),
        })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn parse_time(key: &str, raw: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        })
}

fn check_range(key: &str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value} is outside {min}..={max}"),
        })
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

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            current = current.get_mut(part).ok_or_else(unknown)?;
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(format!("cannot parse '{value}' as bool: {e}")))?,
            ),
            serde_json::Value::Number(_) => {
                let n = value
                    .parse::<i64>()
                    .map_err(|e| invalid(format!("cannot parse '{value}' as number: {e}")))?;
                serde_json::Value::Number(n.into())
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                return Err(invalid("not a leaf value".into()));
            }
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, creating it with defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, creating it with defaults if absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
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

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
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
            other => Some(other.to_string()),
        }
    }

    /// Every leaf value as `(dotted.key, value)`, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (name, child) in map {
                        let key = if prefix.is_empty() {
                            name.clone()
                        } else {
                            format!("{prefix}.{name}")
                        };
                        walk(&key, child, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// into the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check value ranges and time formats.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "calendar.upcoming_days",
            self.calendar.upcoming_days,
            0,
            MAX_UPCOMING_DAYS,
        )?;
        self.session.gate_ttl()?;
        self.form_defaults()?;
        Ok(())
    }

    /// Backend settings with env var overrides applied.
    pub fn effective_backend(&self) -> BackendConfig {
        self.backend_with(|name| std::env::var(name).ok())
    }

    fn backend_with(&self, lookup: impl Fn(&str) -> Option<String>) -> BackendConfig {
        let url = lookup(BACKEND_URL_ENV)
            .or_else(|| lookup(LEGACY_BACKEND_URL_ENV))
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.backend.url.clone());
        BackendConfig {
            url,
            timeout_secs: self.backend.timeout_secs,
        }
    }

    /// Default times applied to date-only form input.
    pub fn form_defaults(&self) -> Result<FormDefaults, ConfigError> {
        Ok(FormDefaults {
            start_time: parse_time(
                "calendar.default_start_time",
                &self.calendar.default_start_time,
            )?,
            end_time: parse_time("calendar.default_end_time", &self.calendar.default_end_time)?,
        })
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
        assert_eq!(parsed.backend.url, "http://localhost:3001");
        assert_eq!(parsed.session.action_gate_minutes, 10);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[backend]\nurl = \"https://it.example.com\"\n").unwrap();
        assert_eq!(parsed.backend.url, "https://it.example.com");
        assert_eq!(parsed.backend.timeout_secs, 30);
        assert_eq!(parsed.calendar.upcoming_days, 7);
    }

    #[test]
    fn get_and_set_by_dotted_key() {
        let mut cfg = Config::default();
        assert_eq!(cfg.get("backend.timeout_secs").as_deref(), Some("30"));
        cfg.set("backend.timeout_secs", "5").unwrap();
        cfg.set("calendar.default_start_time", "08:30").unwrap();
        assert_eq!(cfg.backend.timeout_secs, 5);
        assert_eq!(cfg.get("calendar.default_start_time").as_deref(), Some("08:30"));
        assert_eq!(
            cfg.form_defaults().unwrap().start_time,
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
    }

    #[test]
    fn entries_list_every_settable_key() {
        let cfg = Config::default();
        let entries = cfg.entries();
        assert!(entries.contains(&("backend.url".into(), "http://localhost:3001".into())));
        assert!(entries.contains(&("session.action_gate_minutes".into(), "10".into())));
        assert_eq!(entries.len(), 7);
        let mut copy = cfg.clone();
        for (key, value) in &entries {
            copy.set(key, value).unwrap();
        }
        assert_eq!(copy, cfg);
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("backend.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("backend.timeout_secs", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("calendar.default_end_time", "25:99"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(cfg.set("backend", "x"), Err(ConfigError::InvalidValue { .. })));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn set_rejects_out_of_range_numbers() {
        let mut cfg = Config::default();
        for (key, value) in [
            ("calendar.upcoming_days", "-1"),
            ("calendar.upcoming_days", "100000000"),
            ("session.action_gate_minutes", "0"),
            ("session.action_gate_minutes", "-5"),
            ("session.action_gate_minutes", "200000000000"),
        ] {
            assert!(
                matches!(cfg.set(key, value), Err(ConfigError::InvalidValue { .. })),
                "{key} = {value}"
            );
        }
        assert_eq!(cfg, Config::default());

        cfg.set("session.action_gate_minutes", "30").unwrap();
        assert_eq!(cfg.session.gate_ttl().unwrap(), Duration::minutes(30));
        cfg.set("calendar.upcoming_days", "0").unwrap();
    }

    #[test]
    fn gate_ttl_rejects_huge_minutes() {
        let session = SessionConfig {
            action_gate_minutes: 200_000_000_000,
        };
        assert!(session.gate_ttl().is_err());
        assert_eq!(SessionConfig::default().gate_ttl().unwrap(), Duration::minutes(10));
    }

    #[test]
    fn load_from_rejects_out_of_range_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\naction_gate_minutes = -3\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn env_overrides_backend_url() {
        let cfg = Config::default();
        let backend = cfg.backend_with(|name| {
            (name == LEGACY_BACKEND_URL_ENV).then(|| "https://legacy.example.com".to_string())
        });
        assert_eq!(backend.url, "https://legacy.example.com");

        let backend = cfg.backend_with(|name| match name {
            BACKEND_URL_ENV => Some("https://new.example.com".into()),
            _ => Some("https://legacy.example.com".into()),
        });
        assert_eq!(backend.url, "https://new.example.com");

        assert_eq!(cfg.backend_with(|_| None).url, "http://localhost:3001");
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("log.filter", "debug").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().log.filter, "debug");
    }

    #[test]
    fn load_from_reports_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
