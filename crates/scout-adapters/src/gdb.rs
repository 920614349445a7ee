//! GDB driver using GDB's native DAP mode (GDB 14.1+).

use std::process::Stdio;

use serde_json::{json, Map, Value};

use scout_config::GdbConfig;
use scout_dap::{AdapterProcess, DapClient, DapTransport, Language};

use crate::error::AdapterError;
use crate::spawn::{arg_bool, arg_i64, arg_str, arg_string_vec};
use crate::{Adapter, AdapterConnection, SpawnedAdapter, TransportKind};

/// Driver for `gdb --interpreter=dap`, speaking DAP over stdio.
pub struct GdbAdapter {
    gdb_path: String,
}

impl GdbAdapter {
    /// Create a GDB driver from its configuration.
    pub fn new(config: GdbConfig) -> Self {
        let gdb_path = if config.path.is_empty() {
            "gdb".into()
        } else {
            config.path
        };
        Self { gdb_path }
    }
}

impl Adapter for GdbAdapter {
    fn language(&self) -> Language {
        Language::C
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    fn spawn(&self, _program: &str, args: &Value) -> Result<SpawnedAdapter, AdapterError> {
        let mut cmd = tokio::process::Command::new(&self.gdb_path);
        cmd.arg("--interpreter=dap");
        cmd.arg("--eval-command").arg("set print pretty on");
        // Quiet mode keeps startup banners off the DAP channel.
        cmd.arg("--quiet");
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());
        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(cwd) = arg_str(args, "cwd") {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| AdapterError::SpawnFailed {
            adapter: self.gdb_path.clone(),
            source: e,
        })?;

        let stdin = child.stdin.take().ok_or_else(|| AdapterError::SpawnFailed {
            adapter: self.gdb_path.clone(),
            source: std::io::Error::other("could not capture stdin"),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| AdapterError::SpawnFailed {
            adapter: self.gdb_path.clone(),
            source: std::io::Error::other("could not capture stdout"),
        })?;

        let client = DapClient::new(DapTransport::from_child_stdio(stdin, stdout));
        Ok(SpawnedAdapter {
            connection: AdapterConnection::Stdio(client),
            process: AdapterProcess::new(child),
        })
    }

    fn build_launch_args(&self, program: &str, args: &Value) -> Value {
        let mut launch = Map::new();
        launch.insert("program".into(), json!(program));

        if let Some(program_args) = arg_string_vec(args, "args") {
            launch.insert("args".into(), json!(program_args));
        }
        if let Some(cwd) = arg_str(args, "cwd") {
            launch.insert("cwd".into(), json!(cwd));
        }
        // GDB's DAP expects env as an object.
        if let Some(env) = args.get("env").and_then(Value::as_object) {
            launch.insert("env".into(), Value::Object(env.clone()));
        }
        if let Some(stop_on_entry) = arg_bool(args, "stopOnEntry") {
            launch.insert("stopOnEntry".into(), json!(stop_on_entry));
        }
        if let Some(stop_at_main) = arg_bool(args, "stopAtBeginningOfMainSubprogram") {
            launch.insert("stopAtBeginningOfMainSubprogram".into(), json!(stop_at_main));
        }

        Value::Object(launch)
    }

    fn build_attach_args(&self, args: &Value) -> Value {
        let mut attach = Map::new();

        if let Some(pid) = arg_i64(args, "pid") {
            attach.insert("pid".into(), json!(pid));
        }
        if let Some(program) = arg_str(args, "program") {
            attach.insert("program".into(), json!(program));
        }
        // Remote target connection string for gdbserver, e.g.
        // "localhost:1234" or "/dev/ttyUSB0".
        if let Some(target) = arg_str(args, "target") {
            attach.insert("target".into(), json!(target));
        }

        Value::Object(attach)
    }
}
