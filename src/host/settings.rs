//! JSON-file settings backend.
//!
//! Default implementation of [`SettingsStore`], backing the shared editor
//! settings with a single JSON file. Values are cached in memory and written
//! to disk on every modification.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;
use tracing::warn;

use crate::editor::SettingsStore;

/// Settings persisted as one pretty-printed JSON object.
pub struct JsonSettings {
    path: PathBuf,
    cache: Mutex<HashMap<String, Value>>,
}

impl JsonSettings {
    /// Open the settings file at `path`, loading any existing content.
    ///
    /// A corrupt or unreadable file starts an empty cache; the file is
    /// rewritten on the next set.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let cache = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(values) => values,
                    Err(e) => {
                        warn!("invalid settings file {}: {e}", path.display());
                        HashMap::new()
                    }
                },
                Err(e) => {
                    warn!("failed to read settings file {}: {e}", path.display());
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Self {
            path,
            cache: Mutex::new(cache),
        }
    }

    fn flush(&self, cache: &HashMap<String, Value>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(cache)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl SettingsStore for JsonSettings {
    fn get(&self, key: &str) -> Option<Value> {
        let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache.insert(key.to_string(), value);
        self.flush(&cache)
    }
}
