use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application configuration, loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extensions: ExtensionsConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Override for the extensions data directory. Defaults to
    /// `<data_dir>/quill/extensions` when unset.
    pub directory: Option<PathBuf>,

    /// Whether enabled extensions are loaded automatically at startup.
    pub autoload: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Default status-bar message timeout in milliseconds.
    pub status_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extensions: ExtensionsConfig::default(),
            behavior: BehaviorConfig::default(),
        }
    }
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            directory: None,
            autoload: true,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            status_timeout_ms: 3000,
        }
    }
}

impl ExtensionsConfig {
    /// Root directory holding installed extensions and the registry file.
    pub fn root(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| data_dir().join("extensions"))
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                // Fallback: ~ is not expanded by PathBuf, so use dirs::home_dir
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("quill")
            .join("config.toml")
    }

    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults on any failure.
    pub fn load_from(path: &Path) -> Self {
        let mut config = if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("failed to parse config {}: {e}", path.display());
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("failed to read config {}: {e}", path.display());
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.validate();
        config
    }

    /// Validate and clamp config values to acceptable ranges
    fn validate(&mut self) {
        self.behavior.status_timeout_ms = self.behavior.status_timeout_ms.clamp(500, 60_000);
    }

    /// Save config to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {e}"))?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;

        fs::write(path, content).map_err(|e| format!("Failed to write config: {e}"))?;

        Ok(())
    }

    /// Path of the host settings file exposed to extensions.
    pub fn settings_path(&self) -> PathBuf {
        data_dir().join("settings.json")
    }
}

/// Application data directory (`<data_dir>/quill`).
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local").join("share"))
                .unwrap_or_else(|| PathBuf::from("/tmp"))
        })
        .join("quill")
}
