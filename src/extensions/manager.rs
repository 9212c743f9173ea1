//! Extension lifecycle management.
//!
//! [`ExtensionManager`] owns the full lifecycle state machine. Per extension
//! name the states are: unregistered, registered (disabled), registered
//! (enabled, unloaded), and loaded; uninstall removes from any state. All
//! state lives in the manager's in-memory maps and is mutated only on the
//! owner thread, so there is no internal locking. Every public operation
//! returns a success flag; errors from extension code or the file system are
//! caught at this boundary, logged, and reported through lifecycle events.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::editor::{EditorHost, EditorView, SettingsStore};
use crate::host::EditorApi;

use super::error::{ExtensionError, ExtensionResult};
use super::events::{EventCallback, ExtensionEvent};
use super::installer::Installer;
use super::manifest::{ExtensionKind, ExtensionManifest};
use super::runtime::{injection_script, removal_script, ExtensionRuntime, NativeModule};
use super::store::ExtensionStore;

/// In-memory record of one currently loaded extension.
struct LoadedExtension {
    /// Manifest snapshot taken at load time.
    manifest: ExtensionManifest,
    kind: ExtensionKind,
    runtime: ExtensionRuntime,
}

/// Outcome of a load attempt that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadOutcome {
    Loaded,
    AlreadyLoaded,
    Disabled,
}

/// Listing entry for one registered extension.
#[derive(Debug, Clone)]
pub struct ExtensionInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub enabled: bool,
    pub loaded: bool,
    pub kind: ExtensionKind,
    pub icon: Option<PathBuf>,
    pub path: PathBuf,
}

/// Owner of all extension state and lifecycle transitions.
pub struct ExtensionManager {
    store: ExtensionStore,
    installer: Installer,
    host: Arc<dyn EditorHost>,
    api: EditorApi,
    /// All registered extensions, keyed by name. Authoritative after startup.
    extensions: HashMap<String, ExtensionManifest>,
    /// Currently loaded extensions, keyed by name.
    loaded: HashMap<String, LoadedExtension>,
    subscribers: Vec<EventCallback>,
}

impl ExtensionManager {
    /// Create a manager over the extension store rooted at `root`.
    ///
    /// Registered extensions are pre-populated from the persisted registry
    /// for fast listing; the next [`discover`](Self::discover) pass replaces
    /// this with a live scan. Nothing is loaded yet.
    pub fn new(
        root: impl Into<PathBuf>,
        host: Arc<dyn EditorHost>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let store = ExtensionStore::new(root);
        if let Err(e) = store.ensure_layout() {
            warn!("failed to create extension store layout: {e}");
        }
        let installer = Installer::new(store.installed_root());
        let api = EditorApi::new(host.clone(), settings);

        let mut extensions = HashMap::new();
        for manifest in store.load_registry() {
            extensions.insert(manifest.name.clone(), manifest);
        }

        Self {
            store,
            installer,
            host,
            api,
            extensions,
            loaded: HashMap::new(),
            subscribers: Vec::new(),
        }
    }

    /// Create a manager from the application configuration.
    pub fn from_config(
        config: &Config,
        host: Arc<dyn EditorHost>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let mut manager = Self::new(config.extensions.root(), host, settings);
        manager.api = manager.api.with_status_timeout(config.behavior.status_timeout_ms);
        manager
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&mut self, callback: EventCallback) {
        self.subscribers.push(callback);
    }

    /// Convenience wrapper around [`subscribe`](Self::subscribe).
    pub fn on_event(&mut self, callback: impl Fn(&ExtensionEvent) + Send + Sync + 'static) {
        self.subscribe(Arc::new(callback));
    }

    fn emit(&self, event: ExtensionEvent) {
        debug!("extension event: {event:?}");
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
    }

    /// Scan the store, register everything found, and load every extension
    /// whose manifest enables it.
    ///
    /// A scan result wins over an earlier registration with the same name;
    /// registrations whose manifest is gone from disk are dropped, the rest
    /// (including ones living outside the installed root) are kept. One
    /// extension failing to load does not stop the others. Returns the
    /// number of registered extensions.
    pub fn discover(&mut self) -> usize {
        let manifests = self.store.scan();
        info!("discovered {} extension(s)", manifests.len());

        self.extensions
            .retain(|_, manifest| manifest.manifest_path.exists());
        for manifest in manifests {
            self.extensions.insert(manifest.name.clone(), manifest);
        }
        self.persist_registry();

        let enabled: Vec<String> = self
            .extensions
            .values()
            .filter(|m| m.enabled)
            .map(|m| m.name.clone())
            .collect();
        for name in enabled {
            self.load(&name);
        }

        self.extensions.len()
    }

    /// Load a registered extension.
    ///
    /// Success includes two no-op cases: an extension that is already loaded,
    /// and one whose manifest disables it. An unregistered name or any error
    /// from the extension's own code returns false and fires an error event.
    pub fn load(&mut self, name: &str) -> bool {
        match self.try_load(name) {
            Ok(LoadOutcome::Loaded) => {
                info!("loaded extension '{name}'");
                self.emit(ExtensionEvent::Loaded {
                    name: name.to_string(),
                });
                true
            }
            Ok(LoadOutcome::AlreadyLoaded) => {
                debug!("extension '{name}' already loaded");
                true
            }
            Ok(LoadOutcome::Disabled) => {
                debug!("extension '{name}' is disabled, not loading");
                true
            }
            Err(e) => {
                error!("failed to load extension '{name}': {e}");
                // The error event is reserved for failures of the extension's
                // own code or entry file; an unregistered name or unsupported
                // kind is just a false return with the log line.
                if matches!(
                    e,
                    ExtensionError::Execution { .. }
                        | ExtensionError::EntryNotFound(_)
                        | ExtensionError::Io(_)
                ) {
                    self.emit(ExtensionEvent::Error {
                        name: name.to_string(),
                        message: e.to_string(),
                    });
                }
                false
            }
        }
    }

    fn try_load(&mut self, name: &str) -> ExtensionResult<LoadOutcome> {
        let manifest = self
            .extensions
            .get(name)
            .cloned()
            .ok_or_else(|| ExtensionError::NotFound(name.to_string()))?;

        if !manifest.enabled {
            return Ok(LoadOutcome::Disabled);
        }
        if self.loaded.contains_key(name) {
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        let kind = manifest.kind();
        let runtime = match kind {
            ExtensionKind::Script => {
                let main_path = manifest.main_path();
                if !main_path.exists() {
                    return Err(ExtensionError::EntryNotFound(main_path));
                }
                let source = fs::read_to_string(&main_path)?;

                // Fire-and-forget: script failures stay in the view's console
                let wrapper = injection_script(name, &source);
                for view in self.host.views() {
                    view.run_script(&wrapper);
                }
                ExtensionRuntime::Script { source }
            }
            ExtensionKind::Native => {
                let module = NativeModule::load(name, &manifest, self.api.clone())?;
                ExtensionRuntime::Native { module }
            }
            ExtensionKind::Unknown => {
                return Err(ExtensionError::UnsupportedKind(manifest.main.clone()));
            }
        };

        self.loaded.insert(
            name.to_string(),
            LoadedExtension {
                manifest,
                kind,
                runtime,
            },
        );
        Ok(LoadOutcome::Loaded)
    }

    /// Unload a loaded extension. Returns false if it is not loaded.
    ///
    /// Unload always completes: native deactivation errors are logged and
    /// swallowed, script removal is fire-and-forget.
    pub fn unload(&mut self, name: &str) -> bool {
        let Some(record) = self.loaded.remove(name) else {
            warn!("extension '{name}' is not loaded");
            return false;
        };

        match record.runtime {
            ExtensionRuntime::Script { .. } => {
                let script = removal_script(name);
                for view in self.host.views() {
                    view.run_script(&script);
                }
            }
            ExtensionRuntime::Native { mut module } => {
                module.deactivate();
            }
        }

        info!(
            "unloaded extension '{name}' v{} ({})",
            record.manifest.version, record.kind
        );
        self.emit(ExtensionEvent::Unloaded {
            name: name.to_string(),
        });
        true
    }

    /// Flip the persisted `enabled` flag and load or unload to match.
    ///
    /// The flag is persisted before the follow-up operation and is not
    /// rolled back if that operation fails, so a broken extension can end up
    /// enabled but unloaded. Returns the follow-up operation's result.
    pub fn toggle(&mut self, name: &str) -> bool {
        let enabled = {
            let Some(manifest) = self.extensions.get_mut(name) else {
                warn!("cannot toggle unknown extension '{name}'");
                return false;
            };
            manifest.enabled = !manifest.enabled;
            if let Err(e) = manifest.save() {
                warn!("failed to persist manifest for '{name}': {e}");
            }
            manifest.enabled
        };
        self.persist_registry();

        if enabled {
            self.load(name)
        } else {
            self.unload(name)
        }
    }

    /// Re-read an extension from disk.
    ///
    /// A loaded extension is unloaded and, if still enabled, loaded again; an
    /// unloaded one is just loaded. Picks up entry-file changes without a
    /// restart.
    pub fn reload(&mut self, name: &str) -> bool {
        if self.loaded.contains_key(name) {
            if !self.unload(name) {
                return false;
            }
            let enabled = self.extensions.get(name).map(|m| m.enabled).unwrap_or(false);
            if !enabled {
                return true;
            }
        }
        self.load(name)
    }

    /// Unload everything, then load every enabled registered extension.
    pub fn reload_all(&mut self) {
        let loaded: Vec<String> = self.loaded.keys().cloned().collect();
        for name in loaded {
            self.unload(&name);
        }
        let enabled: Vec<String> = self
            .extensions
            .values()
            .filter(|m| m.enabled)
            .map(|m| m.name.clone())
            .collect();
        for name in enabled {
            self.load(&name);
        }
    }

    /// Install an extension from an archive, single entry file, or directory.
    ///
    /// A prior extension with the same name is replaced entirely; if it was
    /// loaded, it is unloaded first so the new code takes effect. When the
    /// installed manifest enables the extension, the result of loading it is
    /// returned.
    pub fn install(&mut self, source: &Path) -> bool {
        let manifest = match self.installer.install(source) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!("install from {} failed: {e}", source.display());
                return false;
            }
        };

        let name = manifest.name.clone();
        let enabled = manifest.enabled;

        if self.loaded.contains_key(&name) {
            self.unload(&name);
        }
        self.extensions.insert(name.clone(), manifest);
        self.persist_registry();
        self.emit(ExtensionEvent::Installed { name: name.clone() });

        if enabled {
            self.load(&name)
        } else {
            true
        }
    }

    /// Remove an extension entirely: unload, delete its directory, forget it.
    ///
    /// Directory deletion is best-effort; a failure is logged and the
    /// extension is still deregistered.
    pub fn uninstall(&mut self, name: &str) -> bool {
        let Some(manifest) = self.extensions.remove(name) else {
            warn!("cannot uninstall unknown extension '{name}'");
            return false;
        };

        if self.loaded.contains_key(name) {
            self.unload(name);
        }

        // Only delete directories we manage; externally registered paths stay
        let dir = manifest.extension_dir();
        if dir.starts_with(self.store.installed_root()) && dir.exists() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!("failed to delete {}: {e}", dir.display());
            }
        }

        self.persist_registry();
        info!("uninstalled extension '{name}'");
        self.emit(ExtensionEvent::Uninstalled {
            name: name.to_string(),
        });
        true
    }

    /// Bring a newly created editor view up to date: inject every loaded
    /// script-kind extension's cached source into it.
    pub fn handle_new_view(&self, view: &dyn EditorView) {
        for (name, record) in &self.loaded {
            if let ExtensionRuntime::Script { source } = &record.runtime {
                view.run_script(&injection_script(name, source));
            }
        }
    }

    /// Whether `name` is currently loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Whether `name` is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    /// Listing of all registered extensions, sorted by name.
    pub fn get_extension_list(&self) -> Vec<ExtensionInfo> {
        let mut list: Vec<ExtensionInfo> = self
            .extensions
            .values()
            .map(|manifest| ExtensionInfo {
                name: manifest.name.clone(),
                version: manifest.version.clone(),
                description: manifest.description.clone(),
                author: manifest.author.clone(),
                enabled: manifest.enabled,
                loaded: self.loaded.contains_key(&manifest.name),
                kind: manifest.kind(),
                icon: manifest.icon_path(),
                path: manifest.extension_dir(),
            })
            .collect();
        list.sort_by_key(|info| info.name.to_lowercase());
        list
    }

    /// Write the registry cache. Failures are logged, never propagated.
    fn persist_registry(&self) {
        if let Err(e) = self.store.save_registry(&self.extensions) {
            warn!("failed to persist extension registry: {e}");
        }
    }
}
