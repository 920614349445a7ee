//! debugpy driver for Python.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use scout_config::DebugpyConfig;
use scout_dap::{AdapterProcess, Language};

use crate::error::AdapterError;
use crate::spawn::{
    adapter_command, apply_cwd_and_env, arg_bool, arg_i64, arg_str, arg_string_vec,
    find_available_port,
};
use crate::{Adapter, AdapterConnection, SpawnedAdapter, TransportKind};

/// Driver for the debugpy debug adapter (`python -m debugpy.adapter`).
pub struct DebugpyAdapter {
    python_path: String,
}

impl DebugpyAdapter {
    /// Create a debugpy driver from its configuration.
    pub fn new(config: DebugpyConfig) -> Self {
        let python_path = if config.python_path.is_empty() {
            "python3".into()
        } else {
            config.python_path
        };
        Self { python_path }
    }

    /// The interpreter to run the adapter with. Caller args win so virtual
    /// environments picked per-launch are honored; both the editor-style
    /// `python` key and debugpy's legacy `pythonPath` are accepted.
    fn python_path<'a>(&'a self, args: &'a Value) -> &'a str {
        arg_str(args, "python")
            .or_else(|| arg_str(args, "pythonPath"))
            .unwrap_or(&self.python_path)
    }
}

/// If `python_path` lives inside a virtual environment, return the venv
/// root. The marker is the `pyvenv.cfg` file `python -m venv` writes.
fn detect_venv_root(python_path: &str) -> Option<PathBuf> {
    let bin_dir = Path::new(python_path).parent()?;
    let venv_root = bin_dir.parent()?;
    if venv_root.join("pyvenv.cfg").is_file() {
        Some(venv_root.to_path_buf())
    } else {
        None
    }
}

impl Adapter for DebugpyAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn spawn(&self, _program: &str, args: &Value) -> Result<SpawnedAdapter, AdapterError> {
        let port = find_available_port()?;
        let address = format!("127.0.0.1:{port}");
        let python = self.python_path(args).to_string();

        let mut cmd = adapter_command(&python);
        cmd.arg("-m")
            .arg("debugpy.adapter")
            .arg("--host")
            .arg("127.0.0.1")
            .arg("--port")
            .arg(port.to_string());

        // Venv auto-detection: running the adapter inside the venv makes
        // `import` resolution match what the debuggee will see. Explicit
        // caller env vars are applied afterwards and win.
        if let Some(venv_root) = detect_venv_root(&python) {
            cmd.env("VIRTUAL_ENV", &venv_root);
            if let Some(bin_dir) = Path::new(&python).parent() {
                let path_var = std::env::var("PATH").unwrap_or_default();
                let mut prefixed = bin_dir.as_os_str().to_os_string();
                prefixed.push(if cfg!(windows) { ";" } else { ":" });
                prefixed.push(&path_var);
                cmd.env("PATH", prefixed);
            }
        }
        apply_cwd_and_env(&mut cmd, args);

        let child = cmd.spawn().map_err(|e| AdapterError::SpawnFailed {
            adapter: format!("{python} -m debugpy.adapter"),
            source: e,
        })?;

        Ok(SpawnedAdapter {
            connection: AdapterConnection::Tcp(address),
            process: AdapterProcess::new(child),
        })
    }

    fn build_launch_args(&self, program: &str, args: &Value) -> Value {
        let mut launch = Map::new();
        launch.insert("type".into(), json!("python"));
        launch.insert("request".into(), json!("launch"));
        launch.insert("program".into(), json!(program));
        launch.insert("console".into(), json!("internalConsole"));

        if let Some(program_args) = arg_string_vec(args, "args") {
            launch.insert("args".into(), json!(program_args));
        }
        if let Some(cwd) = arg_str(args, "cwd") {
            launch.insert("cwd".into(), json!(cwd));
        }
        if let Some(env) = args.get("env").and_then(Value::as_object) {
            launch.insert("env".into(), Value::Object(env.clone()));
        }
        if let Some(stop_on_entry) = arg_bool(args, "stopOnEntry") {
            launch.insert("stopOnEntry".into(), json!(stop_on_entry));
        }

        // Module mode replaces the program path.
        if let Some(module) = arg_str(args, "module") {
            launch.remove("program");
            launch.insert("module".into(), json!(module));
        }
        if let Some(python_path) = arg_str(args, "pythonPath") {
            launch.insert("pythonPath".into(), json!(python_path));
        }
        if let Some(python) = arg_str(args, "python") {
            launch.insert("python".into(), json!(python));
        }
        if let Some(just_my_code) = arg_bool(args, "justMyCode") {
            launch.insert("justMyCode".into(), json!(just_my_code));
        }
        if arg_bool(args, "django") == Some(true) {
            launch.insert("django".into(), json!(true));
        }
        if arg_bool(args, "jinja") == Some(true) {
            launch.insert("jinja".into(), json!(true));
        }
        if arg_bool(args, "redirectOutput") == Some(true) {
            launch.insert("redirectOutput".into(), json!(true));
        }

        Value::Object(launch)
    }

    fn build_attach_args(&self, args: &Value) -> Value {
        let mut attach = Map::new();
        attach.insert("type".into(), json!("python"));
        attach.insert("request".into(), json!("attach"));

        attach.insert(
            "host".into(),
            json!(arg_str(args, "host").unwrap_or("127.0.0.1")),
        );
        if let Some(port) = arg_i64(args, "port") {
            attach.insert("port".into(), json!(port));
        }
        if let Some(pid) = arg_i64(args, "pid") {
            attach.insert("processId".into(), json!(pid));
        }

        Value::Object(attach)
    }
}
