//! Quill - extensible code editor host.
//!
//! Quill loads third-party extensions into the running editor process,
//! manages their lifecycle, and hands them a capability surface for talking
//! back to the editor.
//!
//! # Architecture
//!
//! The library is organized into these main modules:
//!
//! - [`config`] - Configuration loading and management
//! - [`editor`] - Interfaces to the editor collaborators (views, host window, settings)
//! - [`extensions`] - Extension manifest, store, installer, and lifecycle controller
//! - [`host`] - The capability surface handed to extensions
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quill::{Config, ExtensionManager, JsonSettings};
//!
//! let config = Config::load();
//! let settings = Arc::new(JsonSettings::open(config.settings_path()));
//! let mut manager = ExtensionManager::from_config(&config, editor, settings);
//! if config.extensions.autoload {
//!     manager.discover();
//! }
//! ```

pub mod config;
pub mod editor;
pub mod extensions;
pub mod host;

// Re-export commonly used types for convenience
pub use config::Config;
pub use editor::{EditorHost, EditorView, LogLevel, MessageKind, SettingsStore};
pub use extensions::{
    ExtensionError, ExtensionEvent, ExtensionInfo, ExtensionKind, ExtensionManager,
    ExtensionManifest, ExtensionResult, ExtensionStore, Installer,
};
pub use host::{CommandOutput, EditorApi, HostHandle, JsonSettings};

/// Host application name, visible to extensions through the host handle.
pub const APP_NAME: &str = "Quill";

/// Host application version, visible to extensions through the host handle.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
