//! Extension manifest parsing.
//!
//! Each extension directory holds a `package.json` manifest describing the
//! extension's metadata, entry file, and declared contributions. A corrupt or
//! missing manifest never fails hard: loading falls back to an all-defaults
//! manifest so the editor stays usable.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::error::ExtensionResult;

/// Manifest file name expected at the root of every extension directory.
pub const MANIFEST_FILE: &str = "package.json";

/// Execution strategy of an extension, derived from its `main` entry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    /// Injected into the script context of every open editor view.
    Script,
    /// Executed in the host's embedded runtime.
    Native,
    Unknown,
}

impl std::fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Script => write!(f, "script"),
            Self::Native => write!(f, "native"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One extension's declarative description, parsed from `package.json`.
///
/// All keys are optional on read (defaults applied); all keys are present on
/// write. Unknown keys are ignored and not round-tripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtensionManifest {
    /// Unique identifier, also the storage-directory key.
    pub name: String,

    pub version: String,

    pub description: String,

    pub author: String,

    /// Entry file, relative to the extension directory.
    pub main: String,

    /// Optional icon, relative to the extension directory.
    pub icon: Option<String>,

    /// Persisted enable flag; disabled extensions stay registered but unloaded.
    pub enabled: bool,

    /// Declared dependencies on other extensions. Not enforced.
    pub dependencies: BTreeMap<String, String>,

    /// Declared contribution points (commands, menus, views). Not yet wired
    /// to the UI.
    pub contributes: BTreeMap<String, Value>,

    /// Declared activation triggers. Not yet consumed.
    pub activation_events: Vec<String>,

    /// Absolute path this manifest was loaded from. In-memory only.
    #[serde(skip)]
    pub manifest_path: PathBuf,
}

impl Default for ExtensionManifest {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            author: "Unknown".to_string(),
            main: "main.js".to_string(),
            icon: None,
            enabled: true,
            dependencies: BTreeMap::new(),
            contributes: BTreeMap::new(),
            activation_events: Vec::new(),
            manifest_path: PathBuf::new(),
        }
    }
}

impl ExtensionManifest {
    /// Load a manifest from `path`.
    ///
    /// Read or parse failures produce an all-defaults manifest bound to the
    /// same path, with a warning logged.
    pub fn load(path: &Path) -> Self {
        let mut manifest = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Self>(&content) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!("invalid manifest {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                warn!("failed to read manifest {}: {e}", path.display());
                Self::default()
            }
        };
        manifest.manifest_path = path.to_path_buf();
        manifest
    }

    /// Serialize the whole manifest back to its path.
    pub fn save(&self) -> ExtensionResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&self.manifest_path, content)?;
        Ok(())
    }

    /// Execution kind, derived purely from the `main` suffix.
    pub fn kind(&self) -> ExtensionKind {
        if self.main.ends_with(".js") {
            ExtensionKind::Script
        } else if self.main.ends_with(".rhai") {
            ExtensionKind::Native
        } else {
            ExtensionKind::Unknown
        }
    }

    /// Directory containing this extension.
    pub fn extension_dir(&self) -> PathBuf {
        self.manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Absolute path of the entry file.
    pub fn main_path(&self) -> PathBuf {
        self.extension_dir().join(&self.main)
    }

    /// Absolute path of the icon, if one is declared.
    pub fn icon_path(&self) -> Option<PathBuf> {
        self.icon
            .as_ref()
            .map(|icon| self.extension_dir().join(icon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_minimal_manifest() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        fs::write(&path, r#"{"name": "hello", "main": "hello.js"}"#).unwrap();

        let manifest = ExtensionManifest::load(&path);
        assert_eq!(manifest.name, "hello");
        assert_eq!(manifest.main, "hello.js");
        assert_eq!(manifest.version, "1.0.0");
        assert_eq!(manifest.author, "Unknown");
        assert!(manifest.enabled);
        assert!(manifest.dependencies.is_empty());
        assert_eq!(manifest.kind(), ExtensionKind::Script);
        assert_eq!(manifest.manifest_path, path);
    }

    #[test]
    fn test_parse_full_manifest() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        fs::write(
            &path,
            r#"{
                "name": "linter",
                "version": "2.1.0",
                "description": "Lints things",
                "author": "someone",
                "main": "linter.rhai",
                "icon": "icon.png",
                "enabled": false,
                "dependencies": {"formatter": "^1.0"},
                "contributes": {"commands": [{"id": "lint.run"}]},
                "activationEvents": ["onLanguage:rust"],
                "unknownField": 42
            }"#,
        )
        .unwrap();

        let manifest = ExtensionManifest::load(&path);
        assert_eq!(manifest.name, "linter");
        assert_eq!(manifest.kind(), ExtensionKind::Native);
        assert!(!manifest.enabled);
        assert_eq!(manifest.dependencies.get("formatter").unwrap(), "^1.0");
        assert_eq!(manifest.activation_events, vec!["onLanguage:rust"]);
        assert_eq!(manifest.icon_path(), Some(temp.path().join("icon.png")));
        assert_eq!(manifest.main_path(), temp.path().join("linter.rhai"));
    }

    #[test]
    fn test_corrupt_manifest_falls_back_to_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        fs::write(&path, "{not json").unwrap();

        let manifest = ExtensionManifest::load(&path);
        assert_eq!(manifest.name, "unknown");
        assert_eq!(manifest.main, "main.js");
        assert!(manifest.enabled);
        // The path is still bound so a later save() can repair the file
        assert_eq!(manifest.manifest_path, path);
    }

    #[test]
    fn test_missing_manifest_falls_back_to_defaults() {
        let temp = tempdir().unwrap();
        let manifest = ExtensionManifest::load(&temp.path().join("nope.json"));
        assert_eq!(manifest.name, "unknown");
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(MANIFEST_FILE);

        let mut manifest = ExtensionManifest {
            name: "roundtrip".to_string(),
            version: "0.3.1".to_string(),
            description: "test".to_string(),
            author: "me".to_string(),
            main: "main.rhai".to_string(),
            icon: Some("logo.svg".to_string()),
            enabled: false,
            manifest_path: path.clone(),
            ..Default::default()
        };
        manifest
            .dependencies
            .insert("other".to_string(), "*".to_string());
        manifest
            .contributes
            .insert("menus".to_string(), serde_json::json!({}));
        manifest.activation_events.push("onStartup".to_string());

        manifest.save().unwrap();
        let loaded = ExtensionManifest::load(&path);
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_kind_detection() {
        let mut manifest = ExtensionManifest::default();
        manifest.main = "a.js".to_string();
        assert_eq!(manifest.kind(), ExtensionKind::Script);
        manifest.main = "a.rhai".to_string();
        assert_eq!(manifest.kind(), ExtensionKind::Native);
        manifest.main = "a.wasm".to_string();
        assert_eq!(manifest.kind(), ExtensionKind::Unknown);
        manifest.main = "js".to_string();
        assert_eq!(manifest.kind(), ExtensionKind::Unknown);
    }
}
