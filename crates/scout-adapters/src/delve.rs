//! Delve driver for Go.

use serde_json::{json, Map, Value};

use scout_config::DelveConfig;
use scout_dap::{AdapterProcess, Language};

use crate::error::AdapterError;
use crate::spawn::{
    adapter_command, apply_cwd_and_env, arg_bool, arg_i64, arg_str, arg_string_vec,
    find_available_port,
};
use crate::{Adapter, AdapterConnection, SpawnedAdapter, TransportKind};

/// Driver for the Delve debug adapter (`dlv dap`).
pub struct DelveAdapter {
    dlv_path: String,
    build_flags: String,
}

impl DelveAdapter {
    /// Create a Delve driver from its configuration.
    pub fn new(config: DelveConfig) -> Self {
        let dlv_path = if config.path.is_empty() {
            "dlv".into()
        } else {
            config.path
        };
        Self {
            dlv_path,
            build_flags: config.build_flags,
        }
    }
}

impl Adapter for DelveAdapter {
    fn language(&self) -> Language {
        Language::Go
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn spawn(&self, _program: &str, args: &Value) -> Result<SpawnedAdapter, AdapterError> {
        let port = find_available_port()?;
        let address = format!("127.0.0.1:{port}");

        let mut cmd = adapter_command(&self.dlv_path);
        cmd.arg("dap").arg("--listen").arg(&address);
        if !self.build_flags.is_empty() {
            cmd.arg("--build-flags").arg(&self.build_flags);
        }
        apply_cwd_and_env(&mut cmd, args);

        let child = cmd.spawn().map_err(|e| AdapterError::SpawnFailed {
            adapter: self.dlv_path.clone(),
            source: e,
        })?;

        Ok(SpawnedAdapter {
            connection: AdapterConnection::Tcp(address),
            process: AdapterProcess::new(child),
        })
    }

    fn build_launch_args(&self, program: &str, args: &Value) -> Value {
        let mut launch = Map::new();
        launch.insert("mode".into(), json!("debug"));
        launch.insert("program".into(), json!(program));

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
        if let Some(build_flags) = arg_str(args, "buildFlags") {
            launch.insert("buildFlags".into(), json!(build_flags));
        }

        Value::Object(launch)
    }

    fn build_attach_args(&self, args: &Value) -> Value {
        let mut attach = Map::new();
        attach.insert("mode".into(), json!("local"));
        if let Some(pid) = arg_i64(args, "pid") {
            attach.insert("processId".into(), json!(pid));
        }
        Value::Object(attach)
    }
}
