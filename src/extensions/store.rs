//! On-disk extension store and persisted registry.
//!
//! Installed extensions live in `<root>/installed/<name>/`, each with a
//! `package.json` at its top. The registry (`<root>/registry.json`) caches the
//! last-known manifest snapshot per manifest path for fast listing; it is
//! advisory only - the authoritative state after startup is the manager's
//! in-memory map, and the registry is rebuilt from a live scan on every
//! discovery pass.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::ExtensionResult;
use super::manifest::{ExtensionKind, ExtensionManifest, MANIFEST_FILE};

/// Cached manifest snapshot persisted per registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub enabled: bool,
    pub kind: ExtensionKind,
    pub main: String,
    pub path: PathBuf,
}

impl RegistryEntry {
    pub fn from_manifest(manifest: &ExtensionManifest) -> Self {
        Self {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            description: manifest.description.clone(),
            author: manifest.author.clone(),
            enabled: manifest.enabled,
            kind: manifest.kind(),
            main: manifest.main.clone(),
            path: manifest.extension_dir(),
        }
    }
}

/// File-system layout of installed extensions plus the persisted registry.
#[derive(Debug, Clone)]
pub struct ExtensionStore {
    installed: PathBuf,
    registry_path: PathBuf,
}

impl ExtensionStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            installed: root.join("installed"),
            registry_path: root.join("registry.json"),
        }
    }

    /// Directory that holds one subdirectory per installed extension.
    pub fn installed_root(&self) -> &Path {
        &self.installed
    }

    /// Create the on-disk layout if it does not exist yet.
    pub fn ensure_layout(&self) -> ExtensionResult<()> {
        fs::create_dir_all(&self.installed)?;
        Ok(())
    }

    /// Enumerate installed extensions.
    ///
    /// Every immediate subdirectory of the installed root with a
    /// `package.json` at its top yields a manifest; directories without one
    /// are silently skipped.
    pub fn scan(&self) -> Vec<ExtensionManifest> {
        let mut found = Vec::new();

        let entries = match fs::read_dir(&self.installed) {
            Ok(entries) => entries,
            // No installed root yet - that's fine, just no extensions
            Err(_) => return found,
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let manifest_path = dir.join(MANIFEST_FILE);
            if !manifest_path.exists() {
                continue;
            }
            found.push(ExtensionManifest::load(&manifest_path));
        }

        found
    }

    /// Restore manifests from the persisted registry.
    ///
    /// Entries whose backing manifest path no longer exists are dropped; the
    /// manifests themselves are re-read from disk rather than trusted from
    /// the cached snapshot.
    pub fn load_registry(&self) -> Vec<ExtensionManifest> {
        if !self.registry_path.exists() {
            return Vec::new();
        }

        let entries: HashMap<String, RegistryEntry> = match fs::read_to_string(&self.registry_path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()))
        {
            Ok(entries) => entries,
            Err(e) => {
                warn!("failed to load extension registry: {e}");
                return Vec::new();
            }
        };

        let mut manifests = Vec::new();
        for path in entries.into_keys() {
            let path = PathBuf::from(path);
            if path.exists() {
                manifests.push(ExtensionManifest::load(&path));
            }
        }
        manifests
    }

    /// Persist the current extension map, keyed by absolute manifest path.
    ///
    /// The registry is a cache: callers log failures and continue.
    pub fn save_registry(
        &self,
        extensions: &HashMap<String, ExtensionManifest>,
    ) -> ExtensionResult<()> {
        let mut entries: BTreeMap<String, RegistryEntry> = BTreeMap::new();
        for manifest in extensions.values() {
            entries.insert(
                manifest.manifest_path.display().to_string(),
                RegistryEntry::from_manifest(manifest),
            );
        }

        if let Some(parent) = self.registry_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.registry_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_extension(root: &Path, name: &str, main: &str) -> PathBuf {
        let dir = root.join("installed").join(name);
        fs::create_dir_all(&dir).unwrap();
        let manifest_path = dir.join(MANIFEST_FILE);
        fs::write(
            &manifest_path,
            format!(r#"{{"name": "{name}", "main": "{main}"}}"#),
        )
        .unwrap();
        fs::write(dir.join(main), "").unwrap();
        manifest_path
    }

    #[test]
    fn test_scan_finds_extensions() {
        let temp = tempdir().unwrap();
        let store = ExtensionStore::new(temp.path());
        write_extension(temp.path(), "one", "one.js");
        write_extension(temp.path(), "two", "two.rhai");

        let mut names: Vec<String> = store.scan().into_iter().map(|m| m.name).collect();
        names.sort();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn test_scan_skips_dirs_without_manifest() {
        let temp = tempdir().unwrap();
        let store = ExtensionStore::new(temp.path());
        write_extension(temp.path(), "real", "real.js");
        fs::create_dir_all(temp.path().join("installed").join("junk")).unwrap();
        fs::write(temp.path().join("installed").join("stray-file"), "x").unwrap();

        let found = store.scan();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "real");
    }

    #[test]
    fn test_scan_nonexistent_root() {
        let store = ExtensionStore::new("/nonexistent/quill-store");
        assert!(store.scan().is_empty());
    }

    #[test]
    fn test_registry_round_trip() {
        let temp = tempdir().unwrap();
        let store = ExtensionStore::new(temp.path());
        let manifest_path = write_extension(temp.path(), "keeper", "keeper.js");

        let mut extensions = HashMap::new();
        let manifest = ExtensionManifest::load(&manifest_path);
        extensions.insert(manifest.name.clone(), manifest);
        store.save_registry(&extensions).unwrap();

        let restored = store.load_registry();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].name, "keeper");
        assert_eq!(restored[0].manifest_path, manifest_path);
    }

    #[test]
    fn test_registry_drops_dead_paths() {
        let temp = tempdir().unwrap();
        let store = ExtensionStore::new(temp.path());
        let keeper_path = write_extension(temp.path(), "keeper", "keeper.js");
        let goner_path = write_extension(temp.path(), "goner", "goner.js");

        let mut extensions = HashMap::new();
        for path in [&keeper_path, &goner_path] {
            let manifest = ExtensionManifest::load(path);
            extensions.insert(manifest.name.clone(), manifest);
        }
        store.save_registry(&extensions).unwrap();

        fs::remove_dir_all(goner_path.parent().unwrap()).unwrap();

        let restored = store.load_registry();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].name, "keeper");
    }

    #[test]
    fn test_corrupt_registry_is_ignored() {
        let temp = tempdir().unwrap();
        let store = ExtensionStore::new(temp.path());
        fs::create_dir_all(temp.path()).unwrap();
        fs::write(temp.path().join("registry.json"), "{broken").unwrap();

        assert!(store.load_registry().is_empty());
    }
}
