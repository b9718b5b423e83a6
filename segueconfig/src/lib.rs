//! # Segue Settings Store
//!
//! Persistent settings for the Segue codec adapters, including:
//! - Loading settings from a YAML file
//! - Typed getters that fall back to a caller-supplied default
//! - Dotted-path access to nested values (`encoder.bitrate`)
//! - An in-memory implementation for tests and embedders
//!
//! A missing or unreadable settings file is never an error: getters
//! return their default and setters recreate the file on next save.
//!
//! ## Usage
//!
//! ```no_run
//! use segueconfig::{FileSettings, Settings};
//!
//! let settings = FileSettings::discover()?;
//! let bitrate = settings.get_int("bitrate", 448_000);
//! settings.set_int("bitrate", 256_000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, info, warn};

/// Environment variable overriding the settings file location.
const ENV_SETTINGS_FILE: &str = "SEGUE_SETTINGS";

/// File name used when discovering the settings location.
const SETTINGS_FILE_NAME: &str = "settings.yaml";

/// Application directory under the platform config directory.
const APP_DIR: &str = "segue";

/// Typed access to persistent settings.
///
/// Every getter takes a default and returns it whenever the key is
/// missing or holds a value of the wrong type. Lookups never fail;
/// only setters can report an error, and callers that treat settings
/// as advisory are free to ignore it.
pub trait Settings: Send + Sync {
    fn get_int(&self, key: &str, default: i64) -> i64;
    fn set_int(&self, key: &str, value: i64) -> Result<()>;

    fn get_bool(&self, key: &str, default: bool) -> bool;
    fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    fn get_str(&self, key: &str, default: &str) -> String;
    fn set_str(&self, key: &str, value: &str) -> Result<()>;
}

/// Settings backed by a YAML file.
///
/// Keys are dotted paths into the YAML tree: `get_int("encoder.bitrate", d)`
/// reads `encoder:` / `bitrate:`. The whole tree is kept in memory and
/// written back on every set.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    data: Mutex<Value>,
}

impl FileSettings {
    /// Opens the settings file at `path`, creating an empty store if the
    /// file does not exist or cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read(&path) {
            Ok(raw) => match serde_yaml::from_slice::<Value>(&raw) {
                Ok(Value::Mapping(map)) => Value::Mapping(map),
                Ok(_) => {
                    warn!(file=%path.display(), "settings file is not a mapping, starting empty");
                    Value::Mapping(Mapping::new())
                }
                Err(err) => {
                    warn!(file=%path.display(), error=%err, "settings file unreadable, starting empty");
                    Value::Mapping(Mapping::new())
                }
            },
            Err(_) => {
                debug!(file=%path.display(), "settings file not found, starting empty");
                Value::Mapping(Mapping::new())
            }
        };
        FileSettings {
            path,
            data: Mutex::new(data),
        }
    }

    /// Opens the settings file at its default location.
    ///
    /// The location is searched in the following order:
    /// 1. The `SEGUE_SETTINGS` environment variable
    /// 2. `segue/settings.yaml` under the platform config directory
    /// 3. `.segue/settings.yaml` in the current directory
    pub fn discover() -> Result<Self> {
        let path = Self::find_settings_file()?;
        info!(file=%path.display(), "using settings file");
        Ok(Self::open(path))
    }

    fn find_settings_file() -> Result<PathBuf> {
        if let Ok(env_path) = env::var(ENV_SETTINGS_FILE) {
            info!(env_var = ENV_SETTINGS_FILE, path = %env_path, "settings location from env");
            return Ok(PathBuf::from(env_path));
        }

        if let Some(config) = dirs::config_dir() {
            return Ok(config.join(APP_DIR).join(SETTINGS_FILE_NAME));
        }

        Ok(Path::new(".segue").join(SETTINGS_FILE_NAME))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let data = self.data.lock().unwrap();
        let yaml = serde_yaml::to_string(&*data)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    fn get_value(&self, key: &str) -> Option<Value> {
        let data = self.data.lock().unwrap();
        let mut current = &*data;
        for segment in key.split('.') {
            match current {
                Value::Mapping(map) => {
                    current = map.get(&Value::String(segment.to_string()))?;
                }
                _ => return None,
            }
        }
        Some(current.clone())
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        {
            let mut data = self.data.lock().unwrap();
            let segments: Vec<&str> = key.split('.').collect();
            Self::set_value_internal(&mut data, &segments, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_string());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("settings node at {} is not a mapping", path[0]))
        }
    }
}

impl Settings for FileSettings {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get_value(key) {
            Some(Value::Number(n)) if n.is_i64() => n.as_i64().unwrap_or(default),
            Some(other) => {
                debug!(key, value=?other, "settings value is not an integer, using default");
                default
            }
            None => default,
        }
    }

    fn set_int(&self, key: &str, value: i64) -> Result<()> {
        self.set_value(key, Value::Number(Number::from(value)))
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_value(key) {
            Some(Value::Bool(b)) => b,
            Some(other) => {
                debug!(key, value=?other, "settings value is not a bool, using default");
                default
            }
            None => default,
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, Value::Bool(value))
    }

    fn get_str(&self, key: &str, default: &str) -> String {
        match self.get_value(key) {
            Some(Value::String(s)) => s,
            Some(other) => {
                debug!(key, value=?other, "settings value is not a string, using default");
                default.to_string()
            }
            None => default.to_string(),
        }
    }

    fn set_str(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, Value::String(value.to_string()))
    }
}

/// In-memory settings with no persistence.
///
/// Useful for tests and for hosts that manage their own storage.
#[derive(Debug, Default)]
pub struct MemorySettings {
    data: Mutex<Mapping>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<Value> {
        let data = self.data.lock().unwrap();
        data.get(&Value::String(key.to_string())).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut data = self.data.lock().unwrap();
        data.insert(Value::String(key.to_string()), value);
    }
}

impl Settings for MemorySettings {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(Value::Number(n)) if n.is_i64() => n.as_i64().unwrap_or(default),
            _ => default,
        }
    }

    fn set_int(&self, key: &str, value: i64) -> Result<()> {
        self.set(key, Value::Number(Number::from(value)));
        Ok(())
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => b,
            _ => default,
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set(key, Value::Bool(value));
        Ok(())
    }

    fn get_str(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s,
            _ => default.to_string(),
        }
    }

    fn set_str(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, Value::String(value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let settings = FileSettings::open(dir.path().join("absent.yaml"));
        assert_eq!(settings.get_int("bitrate", 448_000), 448_000);
        assert!(settings.get_bool("enabled", true));
        assert_eq!(settings.get_str("label", "none"), "none");
    }

    #[test]
    fn set_then_get_roundtrip() -> Result<()> {
        let dir = tempdir().unwrap();
        let settings = FileSettings::open(dir.path().join("settings.yaml"));
        settings.set_int("bitrate", 256_000)?;
        settings.set_bool("enabled", true)?;
        settings.set_str("label", "main")?;
        assert_eq!(settings.get_int("bitrate", 0), 256_000);
        assert!(settings.get_bool("enabled", false));
        assert_eq!(settings.get_str("label", ""), "main");
        Ok(())
    }

    #[test]
    fn values_persist_across_reopen() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        {
            let settings = FileSettings::open(&path);
            settings.set_int("bitrate", 640_000)?;
        }
        let reopened = FileSettings::open(&path);
        assert_eq!(reopened.get_int("bitrate", 0), 640_000);
        Ok(())
    }

    #[test]
    fn nested_keys_use_dotted_paths() -> Result<()> {
        let dir = tempdir().unwrap();
        let settings = FileSettings::open(dir.path().join("settings.yaml"));
        settings.set_int("encoder.bitrate", 192_000)?;
        assert_eq!(settings.get_int("encoder.bitrate", 0), 192_000);
        assert_eq!(settings.get_int("encoder.missing", 7), 7);

        let raw = fs::read_to_string(settings.path())?;
        assert!(raw.contains("encoder:"));
        Ok(())
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, ": not [ valid yaml\n\t??")?;
        let settings = FileSettings::open(&path);
        assert_eq!(settings.get_int("bitrate", 448_000), 448_000);

        // The store stays usable and the next set repairs the file.
        settings.set_int("bitrate", 128_000)?;
        let reopened = FileSettings::open(&path);
        assert_eq!(reopened.get_int("bitrate", 0), 128_000);
        Ok(())
    }

    #[test]
    fn wrong_type_returns_default() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "bitrate: fast\n")?;
        let settings = FileSettings::open(&path);
        assert_eq!(settings.get_int("bitrate", 448_000), 448_000);
        Ok(())
    }

    #[test]
    fn memory_settings_roundtrip() -> Result<()> {
        let settings = MemorySettings::new();
        assert_eq!(settings.get_int("bitrate", 448_000), 448_000);
        settings.set_int("bitrate", 320_000)?;
        assert_eq!(settings.get_int("bitrate", 0), 320_000);
        settings.set_str("label", "aux")?;
        assert_eq!(settings.get_str("label", ""), "aux");
        Ok(())
    }
}
