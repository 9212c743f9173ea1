//! Host-side services handed to extensions.
//!
//! [`EditorApi`] is the capability surface: every interaction an extension
//! may have with the editor goes through it. [`JsonSettings`] is the default
//! on-disk settings backend. [`HostHandle`] identifies the host application
//! to extension code.

mod api;
mod settings;

pub use api::{CommandOutput, EditorApi, HostHandle};
pub use settings::JsonSettings;
