//! Extension system for Quill.
//!
//! This module provides installation, discovery, and lifecycle management
//! for third-party extensions. Extensions come in two kinds: script
//! extensions are injected into every editor view's script context, native
//! extensions run in an embedded engine with access to the host capability
//! surface.
//!
//! # Architecture
//!
//! ```text
//! ExtensionManager
//! ├── store: ExtensionStore          (installed/ layout + registry.json)
//! ├── installer: Installer           (archive | single file | directory)
//! ├── extensions: HashMap<name, ExtensionManifest>
//! ├── loaded: HashMap<name, LoadedExtension>
//! │       └── ExtensionRuntime::Script { source }
//! │           ExtensionRuntime::Native { module }
//! └── subscribers: Vec<EventCallback>
//! ```
//!
//! The installer writes into the store, the manager discovers and loads from
//! it, and loaded extensions call back into the editor through the
//! capability surface in [`crate::host`]. All manager state is owned by a
//! single thread; operations invoked elsewhere must marshal onto it.

mod error;
mod events;
mod installer;
mod manager;
mod manifest;
mod runtime;
mod store;

pub use error::{ExtensionError, ExtensionResult};
pub use events::{EventCallback, ExtensionEvent};
pub use installer::Installer;
pub use manager::{ExtensionInfo, ExtensionManager};
pub use manifest::{ExtensionKind, ExtensionManifest, MANIFEST_FILE};
pub use runtime::{ExtensionRuntime, NativeModule, SCRIPT_REGISTRY_GLOBAL};
pub use store::{ExtensionStore, RegistryEntry};
