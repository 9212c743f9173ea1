//! Interfaces to the editor collaborators.
//!
//! The text-editing surface, window chrome, and settings persistence are not
//! part of this crate. They are consumed through the narrow traits defined
//! here; the extension subsystem never talks to the editor in any other way.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

/// Severity for messages logged through the capability surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parse a level name, defaulting to `Info` for anything unrecognized.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "debug" => Self::Debug,
            "warning" | "warn" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// Icon shown with a modal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Information,
    Warning,
    Critical,
}

/// One open editor view.
///
/// Views hold a script context of their own; `run_script` is fire-and-forget
/// from the host's perspective - completion and script exceptions are not
/// observable here.
pub trait EditorView: Send + Sync {
    fn text(&self) -> String;
    fn set_text(&self, text: &str);
    fn run_script(&self, script: &str);
}

/// The editor window and document surface.
pub trait EditorHost: Send + Sync {
    /// Write a line to the editor's log terminal.
    fn log(&self, level: LogLevel, message: &str);

    /// Show a modal message dialog.
    fn show_message(&self, title: &str, message: &str, kind: MessageKind);

    /// Show a transient status-bar message.
    fn status_message(&self, message: &str, timeout_ms: u64);

    /// Path of the file backing the active view, if any.
    fn current_file(&self) -> Option<PathBuf>;

    /// Text of the active view.
    fn current_code(&self) -> String;

    /// Replace the text of the active view.
    fn set_current_code(&self, code: &str);

    /// Save the active view to its backing file.
    fn save_current_file(&self);

    /// Open `path` in a new view.
    fn open_file(&self, path: &Path);

    /// All currently open views.
    fn views(&self) -> Vec<Arc<dyn EditorView>>;
}

/// Key/value settings persistence.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;
}
