//! Error types for the extension system.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the extension system.
///
/// None of these ever escape the manager or installer boundary: every public
/// lifecycle operation catches them, logs, and returns a success indicator.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("extension '{0}' is not registered")]
    NotFound(String),

    #[error("no package.json found in {0}")]
    NoManifestFound(PathBuf),

    #[error("entry file not found: {0}")]
    EntryNotFound(PathBuf),

    #[error("unsupported extension kind for entry '{0}'")]
    UnsupportedKind(String),

    #[error("extension '{name}' failed: {message}")]
    Execution { name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtensionError {
    /// Wrap an error raised by extension code itself.
    pub(crate) fn execution(name: &str, err: impl std::fmt::Display) -> Self {
        Self::Execution {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;
