//! The capability surface extensions program against.
//!
//! Every method delegates to the [`EditorHost`] and [`SettingsStore`] traits;
//! the surface itself holds no editor state. It is cheap to clone and is
//! handed by value into every extension runtime.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::editor::{EditorHost, LogLevel, MessageKind, SettingsStore};

/// Default duration of a status-bar message.
const DEFAULT_STATUS_TIMEOUT_MS: u64 = 3000;

/// Identity of the host application, exposed to extension code.
#[derive(Debug, Clone)]
pub struct HostHandle {
    pub name: String,
    pub version: String,
}

impl HostHandle {
    pub fn new() -> Self {
        Self {
            name: crate::APP_NAME.to_string(),
            version: crate::APP_VERSION.to_string(),
        }
    }
}

impl Default for HostHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a shell command run through the capability surface.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// The capability surface handed to extensions.
#[derive(Clone)]
pub struct EditorApi {
    host: Arc<dyn EditorHost>,
    settings: Arc<dyn SettingsStore>,
    status_timeout_ms: u64,
}

impl EditorApi {
    pub fn new(host: Arc<dyn EditorHost>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            host,
            settings,
            status_timeout_ms: DEFAULT_STATUS_TIMEOUT_MS,
        }
    }

    /// Override the status-bar message duration.
    pub fn with_status_timeout(mut self, timeout_ms: u64) -> Self {
        self.status_timeout_ms = timeout_ms;
        self
    }

    /// Write a line to the editor's log terminal.
    pub fn log(&self, level: LogLevel, message: &str) {
        self.host.log(level, message);
    }

    /// Show a modal information dialog.
    pub fn show_message(&self, title: &str, message: &str) {
        self.host.show_message(title, message, MessageKind::Information);
    }

    /// Show a transient status-bar message.
    pub fn status_message(&self, message: &str) {
        self.host.status_message(message, self.status_timeout_ms);
    }

    /// Path of the file backing the active view, if any.
    pub fn current_file(&self) -> Option<PathBuf> {
        self.host.current_file()
    }

    /// Text of the active view.
    pub fn current_code(&self) -> String {
        self.host.current_code()
    }

    /// Replace the text of the active view.
    pub fn set_current_code(&self, code: &str) {
        self.host.set_current_code(code);
    }

    /// Save the active view to its backing file.
    pub fn save_current_file(&self) {
        self.host.save_current_file();
    }

    /// Open `path` in a new editor view.
    pub fn open_file(&self, path: &Path) {
        self.host.open_file(path);
    }

    /// Write `content` to `path` and open it in a new view.
    ///
    /// Returns false (with the failure logged) if the file cannot be
    /// written; nothing is opened in that case.
    pub fn create_file(&self, path: &Path, content: &str) -> bool {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!("failed to create {}: {e}", parent.display());
                return false;
            }
        }
        if let Err(e) = std::fs::write(path, content) {
            error!("failed to create {}: {e}", path.display());
            return false;
        }
        self.host.open_file(path);
        true
    }

    /// Run a shell command and wait for it to finish.
    ///
    /// The command string is passed to the platform shell. Failures to spawn
    /// are folded into the output rather than returned as errors, so
    /// extension code always gets the same shape back.
    pub fn run_command(&self, command: &str, cwd: Option<&Path>) -> CommandOutput {
        debug!("running command: {command}");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        match cmd.output() {
            Ok(output) => CommandOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput {
                success: false,
                stdout: String::new(),
                stderr: e.to_string(),
                exit_code: -1,
            },
        }
    }

    /// Read a persisted setting.
    pub fn get_setting(&self, key: &str) -> Option<serde_json::Value> {
        self.settings.get(key)
    }

    /// Persist a setting. Returns false (with the failure logged) if the
    /// backend rejects the write.
    pub fn set_setting(&self, key: &str, value: serde_json::Value) -> bool {
        match self.settings.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("failed to persist setting '{key}': {e}");
                false
            }
        }
    }

    /// Declare a command contribution.
    ///
    /// Accepted and logged; command palette wiring is not in place yet, so
    /// nothing is invocable afterwards.
    pub fn register_command(&self, id: &str, title: &str) -> bool {
        info!("extension registered command '{id}' ({title})");
        true
    }

    /// Declare a menu-item contribution. Accepted and logged only.
    pub fn add_menu_item(&self, menu_path: &str, title: &str) -> bool {
        info!("extension added menu item '{title}' under {menu_path}");
        true
    }

    /// Declare a toolbar-button contribution. Accepted and logged only.
    pub fn add_toolbar_button(&self, icon: &str, tooltip: &str) -> bool {
        info!("extension added toolbar button '{tooltip}' ({icon})");
        true
    }
}
