//! Lifecycle event notifications.
//!
//! Subscribers (typically a UI panel listing extensions) receive an event for
//! every lifecycle transition. Delivery is synchronous on the owner thread.

use std::sync::Arc;

/// A lifecycle transition observed by the extension manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionEvent {
    Loaded { name: String },
    Unloaded { name: String },
    Error { name: String, message: String },
    Installed { name: String },
    Uninstalled { name: String },
}

impl ExtensionEvent {
    /// Name of the extension this event concerns.
    pub fn name(&self) -> &str {
        match self {
            Self::Loaded { name }
            | Self::Unloaded { name }
            | Self::Error { name, .. }
            | Self::Installed { name }
            | Self::Uninstalled { name } => name,
        }
    }
}

/// Callback type for lifecycle event subscribers.
pub type EventCallback = Arc<dyn Fn(&ExtensionEvent) + Send + Sync + 'static>;
