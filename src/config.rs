// SPDX-License-Identifier: MPL-2.0

//! Settings persistence.
//!
//! Settings live in `~/.netstat-monitor/config.json` as a flat JSON object.
//! Loading merges the file over the defaults, so keys added in newer versions
//! pick up their default values and keys this version does not know about
//! survive a save untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Name of the dot-directory under `$HOME` holding settings and history.
pub const DATA_DIR_NAME: &str = ".netstat-monitor";

pub const MIN_CHECK_INTERVAL: u64 = 1;
pub const MAX_CHECK_INTERVAL: u64 = 60;

/// Keys understood by this version, in display order.
pub const KNOWN_KEYS: [&str; 4] = [
    "check_interval",
    "notifications_enabled",
    "bandwidth_enabled",
    "auto_start",
];

// ============================================================================
// Paths
// ============================================================================

/// Location of the files the monitor persists.
#[derive(Debug, Clone)]
pub struct DataPaths {
    dir: PathBuf,
}

impl DataPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.netstat-monitor`
    pub fn from_home() -> Result<Self> {
        let base = BaseDirs::new().ok_or(Error::NoHomeDir)?;
        Ok(Self::new(base.home_dir().join(DATA_DIR_NAME)))
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    pub fn history_file(&self) -> PathBuf {
        self.dir.join("history.json")
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between ticks.
    pub check_interval: u64,
    pub notifications_enabled: bool,
    pub bandwidth_enabled: bool,
    pub auto_start: bool,
    /// Keys found in the file that this version does not recognise.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            check_interval: 5,
            notifications_enabled: true,
            bandwidth_enabled: true,
            auto_start: false,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Tick period, clamped to the range the settings editor accepts.
    pub fn check_period(&self) -> Duration {
        Duration::from_secs(
            self.check_interval
                .clamp(MIN_CHECK_INTERVAL, MAX_CHECK_INTERVAL),
        )
    }

    fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// JSON-file backed settings.
///
/// Every mutation is written through to disk immediately. A failed write
/// leaves the in-memory value updated and reports the error to the caller.
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Open the store at `path`, loading it if the file exists.
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            settings: Settings::default(),
        };
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload from disk, falling back to defaults on any error.
    pub fn load(&mut self) -> &Settings {
        self.settings = match read_settings(&self.path) {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                log::warn!("Error loading settings: {}. Using defaults.", e);
                Settings::default()
            }
        };
        &self.settings
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&self.settings)
            .map_err(|e| Error::json(&self.path, e))?;
        fs::write(&self.path, json).map_err(|e| Error::io(&self.path, e))?;
        log::debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Raw JSON value for `key`, including unrecognised keys.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.settings.to_map().remove(key)
    }

    /// All settings as a flat JSON object.
    pub fn get_all(&self) -> Map<String, Value> {
        self.settings.to_map()
    }

    /// Set one key and save.
    ///
    /// A value of the wrong type for a recognised key is rejected and nothing
    /// changes.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut updates = Map::new();
        updates.insert(key.to_owned(), value);
        self.update(updates)
    }

    /// Shallow-merge `updates` into the settings and save.
    pub fn update(&mut self, updates: Map<String, Value>) -> Result<()> {
        let mut map = self.settings.to_map();
        let keys: Vec<String> = updates.keys().cloned().collect();
        map.extend(updates);
        self.settings =
            serde_json::from_value(Value::Object(map)).map_err(|e| Error::InvalidSetting {
                key: keys.join(", "),
                reason: e.to_string(),
            })?;
        self.save()
    }

    /// Restore the defaults and save. Unrecognised keys are dropped too.
    pub fn reset(&mut self) -> Result<()> {
        self.settings = Settings::default();
        self.save()
    }
}

fn read_settings(path: &Path) -> Result<Option<Settings>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let map: Map<String, Value> =
        serde_json::from_str(&contents).map_err(|e| Error::json(path, e))?;
    Ok(Some(merge_over_defaults(map)))
}

/// Apply each stored key over the defaults.
///
/// A recognised key holding the wrong type keeps its default and is dropped,
/// every other key is kept.
fn merge_over_defaults(map: Map<String, Value>) -> Settings {
    let mut settings = Settings::default();
    for (key, value) in map {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            settings.extra.insert(key, value);
            continue;
        }

        let applied = match key.as_str() {
            "check_interval" => {
                serde_json::from_value::<u64>(value).map(|v| settings.check_interval = v)
            }
            "notifications_enabled" => {
                serde_json::from_value::<bool>(value).map(|v| settings.notifications_enabled = v)
            }
            "bandwidth_enabled" => {
                serde_json::from_value::<bool>(value).map(|v| settings.bandwidth_enabled = v)
            }
            "auto_start" => serde_json::from_value::<bool>(value).map(|v| settings.auto_start = v),
            _ => Ok(()),
        };
        if let Err(e) = applied {
            log::warn!("Invalid value for setting '{}': {}. Using default.", key, e);
        }
    }
    settings
}

// ============================================================================
// Input validation
// ============================================================================

/// Validate user input for `check_interval`.
pub fn parse_check_interval(input: &str) -> Result<u64> {
    let invalid = |reason: &str| Error::InvalidSetting {
        key: "check_interval".into(),
        reason: reason.into(),
    };

    let interval: i64 = input
        .trim()
        .parse()
        .map_err(|_| invalid("Please enter a valid number."))?;

    match u64::try_from(interval) {
        Ok(secs) if (MIN_CHECK_INTERVAL..=MAX_CHECK_INTERVAL).contains(&secs) => Ok(secs),
        _ => Err(invalid("Please enter a value between 1 and 60.")),
    }
}

fn parse_flag(key: &str, input: &str) -> Result<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::InvalidSetting {
            key: key.into(),
            reason: "expected true or false".into(),
        }),
    }
}

/// Turn command-line text into the JSON value stored for `key`.
///
/// Only keys in [`KNOWN_KEYS`] can be edited from the command line.
pub fn parse_setting_value(key: &str, input: &str) -> Result<Value> {
    match key {
        "check_interval" => parse_check_interval(input).map(Value::from),
        "notifications_enabled" | "bandwidth_enabled" | "auto_start" => {
            parse_flag(key, input).map(Value::Bool)
        }
        other => Err(Error::UnknownSetting(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::open(dir.path().join("config.json"))
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(store.get("check_interval"), Some(json!(5)));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set("check_interval", json!(10)).unwrap();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.get("check_interval"), Some(json!(10)));
        assert_eq!(reloaded.settings().check_interval, 10);
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"bandwidth_enabled": false, "theme": "dark"}"#).unwrap();

        let store = SettingsStore::open(&path);
        assert!(!store.settings().bandwidth_enabled);
        assert_eq!(store.settings().check_interval, 5);
        assert_eq!(store.get("theme"), Some(json!("dark")));
    }

    #[test]
    fn test_unknown_keys_survive_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let mut store = SettingsStore::open(&path);
        store.set("auto_start", json!(true)).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], json!("dark"));
        assert_eq!(raw["auto_start"], json!(true));
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::open(&path);
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn test_wrong_typed_key_keeps_the_rest_of_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"check_interval": 10, "notifications_enabled": false, "theme": "dark", "auto_start": "yes"}"#,
        )
        .unwrap();

        let mut store = SettingsStore::open(&path);
        assert_eq!(store.settings().check_interval, 10);
        assert!(!store.settings().notifications_enabled);
        assert!(!store.settings().auto_start);
        assert_eq!(store.get("theme"), Some(json!("dark")));
        assert!(!store.settings().extra.contains_key("auto_start"));

        store.set("bandwidth_enabled", json!(false)).unwrap();
        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["check_interval"], json!(10));
        assert_eq!(raw["notifications_enabled"], json!(false));
        assert_eq!(raw["bandwidth_enabled"], json!(false));
        assert_eq!(raw["auto_start"], json!(false));
        assert_eq!(raw["theme"], json!("dark"));
    }

    #[test]
    fn test_wrong_type_is_rejected_without_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let err = store.set("check_interval", json!("soon")).unwrap_err();
        assert!(matches!(err, Error::InvalidSetting { .. }));
        assert_eq!(store.settings().check_interval, 5);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set("notifications_enabled", json!(false)).unwrap();
        store.reset().unwrap();
        assert!(store_in(&dir).settings().notifications_enabled);
    }

    #[test]
    fn test_parse_check_interval_bounds() {
        assert_eq!(parse_check_interval("1").unwrap(), 1);
        assert_eq!(parse_check_interval(" 60 ").unwrap(), 60);
        assert!(parse_check_interval("0").is_err());
        assert!(parse_check_interval("61").is_err());
        assert!(parse_check_interval("-3").is_err());

        let err = parse_check_interval("five").unwrap_err();
        assert!(err.to_string().contains("valid number"));
    }

    #[test]
    fn test_check_period_is_clamped() {
        let mut settings = Settings::default();
        settings.check_interval = 0;
        assert_eq!(settings.check_period(), Duration::from_secs(1));
        settings.check_interval = 600;
        assert_eq!(settings.check_period(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_setting_value() {
        assert_eq!(parse_setting_value("auto_start", "yes").unwrap(), json!(true));
        assert_eq!(parse_setting_value("check_interval", "30").unwrap(), json!(30));
        assert!(matches!(
            parse_setting_value("colour", "red"),
            Err(Error::UnknownSetting(_))
        ));
    }
}
