//! Kind-specific extension runtimes.
//!
//! Script-kind extensions are injected into the script context of every open
//! editor view through a guarded wrapper; the host never observes their
//! completion or failures beyond the view's own console. Native-kind
//! extensions run in an embedded engine owned by the host: the entry file is
//! compiled under a synthetic module id, the extension directory is put on
//! the module search path so sibling files can be imported, and the
//! capability surface plus a host handle are bound into the top-level scope
//! before the entry's top-level code runs.

use rhai::module_resolvers::FileModuleResolver;
use rhai::{CallFnOptions, Dynamic, Engine, Scope, AST};
use tracing::{debug, warn};

use crate::editor::LogLevel;
use crate::host::{CommandOutput, EditorApi, HostHandle};

use super::error::{ExtensionError, ExtensionResult};
use super::manifest::ExtensionManifest;

/// Well-known global object holding raw script-kind sources per view.
pub const SCRIPT_REGISTRY_GLOBAL: &str = "__quillExtensions";

/// Kind-specific runtime state of one loaded extension.
pub enum ExtensionRuntime {
    /// Raw entry source, cached so new views can converge to the same
    /// extension set.
    Script { source: String },
    /// Handle to the executed code unit.
    Native { module: NativeModule },
}

/// Wrap a script-kind source for injection into a view.
///
/// The wrapper registers the raw source under the well-known global keyed by
/// extension name, evaluates the source, and logs a load-success line - all
/// inside a guard that reports failures to the view's console instead of
/// raising into the host.
pub fn injection_script(name: &str, source: &str) -> String {
    let name_json = json_string(name);
    let source_json = json_string(source);
    format!(
        r#"(function() {{
    try {{
        if (!window.{SCRIPT_REGISTRY_GLOBAL}) {{
            window.{SCRIPT_REGISTRY_GLOBAL} = {{}};
        }}
        window.{SCRIPT_REGISTRY_GLOBAL}[{name_json}] = {source_json};
        {source}
        console.log('extension loaded: ' + {name_json});
    }} catch (e) {{
        console.error('extension error (' + {name_json} + '):', e);
    }}
}})();"#
    )
}

/// Script run in every view on unload, removing the extension's entry from
/// the well-known global.
pub fn removal_script(name: &str) -> String {
    let name_json = json_string(name);
    format!(
        r#"if (window.{SCRIPT_REGISTRY_GLOBAL} && window.{SCRIPT_REGISTRY_GLOBAL}[{name_json}]) {{
    delete window.{SCRIPT_REGISTRY_GLOBAL}[{name_json}];
    console.log('extension unloaded: ' + {name_json});
}}"#
    )
}

fn json_string(raw: &str) -> String {
    serde_json::to_string(raw).unwrap_or_else(|_| "\"\"".to_string())
}

/// A native-kind extension executed in the host's embedded engine.
pub struct NativeModule {
    engine: Engine,
    ast: AST,
    scope: Scope<'static>,
    name: String,
}

impl NativeModule {
    /// Compile and execute the extension's entry file, then call its
    /// optional `activate(api)` entry point.
    ///
    /// Any engine error - compile, top-level execution, or `activate` - is
    /// returned as an [`ExtensionError::Execution`] and the module is not
    /// handed back.
    pub fn load(
        name: &str,
        manifest: &ExtensionManifest,
        api: EditorApi,
    ) -> ExtensionResult<Self> {
        let main_path = manifest.main_path();
        if !main_path.exists() {
            return Err(ExtensionError::EntryNotFound(main_path));
        }

        let mut engine = Engine::new();
        register_host_api(&mut engine);
        engine.set_module_resolver(FileModuleResolver::new_with_path(manifest.extension_dir()));

        let mut ast = engine
            .compile_file(main_path)
            .map_err(|e| ExtensionError::execution(name, e))?;
        ast.set_source(module_id(name));

        // Plain variables, not constants: the registered capability methods
        // take &mut receivers and would be rejected on a constant.
        let mut scope = Scope::new();
        scope.push("api", api.clone());
        scope.push("host", HostHandle::new());

        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| ExtensionError::execution(name, e))?;

        let mut module = Self {
            engine,
            ast,
            scope,
            name: name.to_string(),
        };

        if module.has_fn("activate") {
            module
                .call_entry("activate", (api,))
                .map_err(|e| ExtensionError::execution(name, e))?;
            debug!("extension '{name}' activated");
        }

        Ok(module)
    }

    /// Call the optional `deactivate()` entry point.
    ///
    /// Errors are logged, never propagated: unload must always complete.
    pub fn deactivate(&mut self) {
        if !self.has_fn("deactivate") {
            return;
        }
        if let Err(e) = self.call_entry("deactivate", ()) {
            warn!("extension '{}' deactivate failed: {e}", self.name);
        }
    }

    fn has_fn(&self, name: &str) -> bool {
        self.ast.iter_functions().any(|f| f.name == name)
    }

    fn call_entry(
        &mut self,
        name: &str,
        args: impl rhai::FuncArgs,
    ) -> Result<(), Box<rhai::EvalAltResult>> {
        // Top-level code already ran during load; don't evaluate it again,
        // and keep the scope so state survives between entry points.
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(false);
        self.engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, name, args)
            .map(|_| ())
    }
}

/// Synthetic, collision-resistant module identifier for an extension.
fn module_id(name: &str) -> String {
    format!("quill_ext_{}", name.replace(['-', ' ', '.'], "_"))
}

/// Register the capability surface on an engine.
///
/// Native-kind extensions call these as methods on the injected `api` and
/// `host` bindings.
fn register_host_api(engine: &mut Engine) {
    engine
        .register_type_with_name::<EditorApi>("EditorApi")
        .register_fn("log", |api: &mut EditorApi, level: &str, message: &str| {
            api.log(LogLevel::parse(level), message);
        })
        .register_fn("log", |api: &mut EditorApi, message: &str| {
            api.log(LogLevel::Info, message);
        })
        .register_fn(
            "show_message",
            |api: &mut EditorApi, title: &str, message: &str| {
                api.show_message(title, message);
            },
        )
        .register_fn("status_message", |api: &mut EditorApi, message: &str| {
            api.status_message(message);
        })
        .register_fn("current_file", |api: &mut EditorApi| -> String {
            api.current_file()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        })
        .register_fn("current_code", |api: &mut EditorApi| api.current_code())
        .register_fn("set_current_code", |api: &mut EditorApi, code: &str| {
            api.set_current_code(code);
        })
        .register_fn("save_current_file", |api: &mut EditorApi| {
            api.save_current_file();
        })
        .register_fn("open_file", |api: &mut EditorApi, path: &str| {
            api.open_file(std::path::Path::new(path));
        })
        .register_fn(
            "create_file",
            |api: &mut EditorApi, path: &str, content: &str| {
                api.create_file(std::path::Path::new(path), content)
            },
        )
        .register_fn("run_command", |api: &mut EditorApi, command: &str| {
            api.run_command(command, None)
        })
        .register_fn(
            "run_command_in",
            |api: &mut EditorApi, command: &str, cwd: &str| {
                api.run_command(command, Some(std::path::Path::new(cwd)))
            },
        )
        .register_fn("get_setting", |api: &mut EditorApi, key: &str| -> Dynamic {
            match api.get_setting(key) {
                Some(value) => rhai::serde::to_dynamic(&value).unwrap_or(Dynamic::UNIT),
                None => Dynamic::UNIT,
            }
        })
        .register_fn(
            "set_setting",
            |api: &mut EditorApi, key: &str, value: Dynamic| {
                let value = rhai::serde::from_dynamic(&value)
                    .unwrap_or(serde_json::Value::Null);
                api.set_setting(key, value);
            },
        )
        .register_fn(
            "register_command",
            |api: &mut EditorApi, id: &str, title: &str| api.register_command(id, title),
        )
        .register_fn(
            "add_menu_item",
            |api: &mut EditorApi, menu_path: &str, title: &str| {
                api.add_menu_item(menu_path, title)
            },
        )
        .register_fn(
            "add_toolbar_button",
            |api: &mut EditorApi, icon: &str, tooltip: &str| {
                api.add_toolbar_button(icon, tooltip)
            },
        );

    engine
        .register_type_with_name::<CommandOutput>("CommandOutput")
        .register_get("success", |o: &mut CommandOutput| o.success)
        .register_get("stdout", |o: &mut CommandOutput| o.stdout.clone())
        .register_get("stderr", |o: &mut CommandOutput| o.stderr.clone())
        .register_get("exit_code", |o: &mut CommandOutput| o.exit_code as i64);

    engine
        .register_type_with_name::<HostHandle>("HostHandle")
        .register_get("name", |h: &mut HostHandle| h.name.clone())
        .register_get("version", |h: &mut HostHandle| h.version.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::mock::{MemorySettings, MockHost};
    use crate::extensions::manifest::MANIFEST_FILE;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_injection_script_registers_and_guards() {
        let wrapped = injection_script("hello", "console.log('hi')");
        assert!(wrapped.contains("window.__quillExtensions[\"hello\"]"));
        assert!(wrapped.contains("console.log('hi')"));
        assert!(wrapped.contains("try {"));
        assert!(wrapped.contains("catch (e)"));
        // Raw source is stored JSON-escaped
        assert!(wrapped.contains(r#""console.log('hi')""#));
    }

    #[test]
    fn test_removal_script_deletes_registry_entry() {
        let script = removal_script("hello");
        assert!(script.contains("delete window.__quillExtensions[\"hello\"]"));
    }

    #[test]
    fn test_module_id_is_sanitized() {
        assert_eq!(module_id("my-cool.ext"), "quill_ext_my_cool_ext");
    }

    fn native_manifest(dir: &Path, name: &str, body: &str) -> ExtensionManifest {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            format!(r#"{{"name": "{name}", "main": "{name}.rhai"}}"#),
        )
        .unwrap();
        fs::write(dir.join(format!("{name}.rhai")), body).unwrap();
        ExtensionManifest::load(&dir.join(MANIFEST_FILE))
    }

    fn api_with_host() -> (EditorApi, Arc<MockHost>) {
        let host = MockHost::with_views(0);
        let api = EditorApi::new(host.clone(), Arc::new(MemorySettings::default()));
        (api, host)
    }

    #[test]
    fn test_native_module_runs_top_level_and_activate() {
        let temp = tempdir().unwrap();
        let manifest = native_manifest(
            temp.path(),
            "greeter",
            r#"
api.log("info", "top-level ran");

fn activate(api) {
    api.log("info", "activated " + host.name);
}
"#,
        );

        let (api, host) = api_with_host();
        let module = NativeModule::load("greeter", &manifest, api).unwrap();
        drop(module);

        let logs = host.logs.lock().unwrap();
        assert_eq!(logs[0], "top-level ran");
        assert_eq!(logs[1], "activated Quill");
    }

    #[test]
    fn test_native_module_activate_failure() {
        let temp = tempdir().unwrap();
        let manifest = native_manifest(
            temp.path(),
            "broken",
            r#"
fn activate(api) {
    throw "activation exploded";
}
"#,
        );

        let (api, _host) = api_with_host();
        let Err(err) = NativeModule::load("broken", &manifest, api) else {
            panic!("load should fail");
        };
        match err {
            ExtensionError::Execution { name, message } => {
                assert_eq!(name, "broken");
                assert!(message.contains("activation exploded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_native_module_compile_failure() {
        let temp = tempdir().unwrap();
        let manifest = native_manifest(temp.path(), "syntax", "fn {{{{");

        let (api, _host) = api_with_host();
        assert!(matches!(
            NativeModule::load("syntax", &manifest, api),
            Err(ExtensionError::Execution { .. })
        ));
    }

    #[test]
    fn test_native_module_missing_entry() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("ghost");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            r#"{"name": "ghost", "main": "ghost.rhai"}"#,
        )
        .unwrap();
        let manifest = ExtensionManifest::load(&dir.join(MANIFEST_FILE));

        let (api, _host) = api_with_host();
        assert!(matches!(
            NativeModule::load("ghost", &manifest, api),
            Err(ExtensionError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_native_module_deactivate_errors_are_swallowed() {
        let temp = tempdir().unwrap();
        let manifest = native_manifest(
            temp.path(),
            "grumpy",
            r#"
fn deactivate() {
    throw "refusing to leave";
}
"#,
        );

        let (api, _host) = api_with_host();
        let mut module = NativeModule::load("grumpy", &manifest, api).unwrap();
        // Must not panic or propagate
        module.deactivate();
    }

    #[test]
    fn test_native_module_imports_sibling_files() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("composite");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("util.rhai"),
            r#"export const GREETING = "hello from util";"#,
        )
        .unwrap();
        let manifest = native_manifest(
            &dir,
            "composite",
            r#"
import "util" as util;

api.log("info", util::GREETING);
"#,
        );

        let (api, host) = api_with_host();
        NativeModule::load("composite", &manifest, api).unwrap();
        assert_eq!(host.logs.lock().unwrap()[0], "hello from util");
    }

    #[test]
    fn test_native_module_uses_settings() {
        let temp = tempdir().unwrap();
        let manifest = native_manifest(
            temp.path(),
            "prefs",
            r#"
api.set_setting("prefs.theme", "dark");
api.log("info", api.get_setting("prefs.theme"));
"#,
        );

        let (api, host) = api_with_host();
        NativeModule::load("prefs", &manifest, api).unwrap();
        assert_eq!(host.logs.lock().unwrap()[0], "dark");
    }
}
