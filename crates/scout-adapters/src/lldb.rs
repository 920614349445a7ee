//! lldb-dap driver for C, C++, and Rust.

use std::process::Stdio;

use serde_json::{json, Map, Value};

use scout_config::LldbConfig;
use scout_dap::{AdapterProcess, DapClient, DapTransport, Language};

use crate::error::AdapterError;
use crate::spawn::{arg_bool, arg_i64, arg_str, arg_string_vec};
use crate::{Adapter, AdapterConnection, SpawnedAdapter, TransportKind};

/// Driver for lldb-dap (formerly lldb-vscode), speaking DAP over stdio.
pub struct LldbAdapter {
    lldb_dap_path: String,
}

impl LldbAdapter {
    /// Create an lldb-dap driver from its configuration.
    pub fn new(config: LldbConfig) -> Self {
        let lldb_dap_path = if config.path.is_empty() {
            "lldb-dap".into()
        } else {
            config.path
        };
        Self { lldb_dap_path }
    }
}

impl Adapter for LldbAdapter {
    fn language(&self) -> Language {
        Language::C
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    fn spawn(&self, _program: &str, args: &Value) -> Result<SpawnedAdapter, AdapterError> {
        // Auto REPL mode lets `evaluate` carry both expressions and CLI
        // commands; commands can still be forced with a backtick prefix.
        let mut cmd = tokio::process::Command::new(&self.lldb_dap_path);
        cmd.arg("--repl-mode=auto");
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());
        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(cwd) = arg_str(args, "cwd") {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| AdapterError::SpawnFailed {
            adapter: self.lldb_dap_path.clone(),
            source: e,
        })?;

        let stdin = child.stdin.take().ok_or_else(|| AdapterError::SpawnFailed {
            adapter: self.lldb_dap_path.clone(),
            source: std::io::Error::other("could not capture stdin"),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| AdapterError::SpawnFailed {
            adapter: self.lldb_dap_path.clone(),
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
        // lldb-dap expects env as a KEY=VALUE list.
        if let Some(env) = args.get("env").and_then(Value::as_object) {
            let env_list: Vec<String> = env
                .iter()
                .map(|(k, v)| format!("{k}={}", crate::spawn::value_to_string(v)))
                .collect();
            launch.insert("env".into(), json!(env_list));
        }
        if let Some(stop_on_entry) = arg_bool(args, "stopOnEntry") {
            launch.insert("stopOnEntry".into(), json!(stop_on_entry));
        }

        for key in ["initCommands", "preRunCommands", "stopCommands"] {
            if let Some(cmds) = arg_string_vec(args, key) {
                launch.insert(key.into(), json!(cmds));
            }
        }
        if let Some(source_map) = args.get("sourceMap") {
            if !source_map.is_null() {
                launch.insert("sourceMap".into(), source_map.clone());
            }
        }

        Value::Object(launch)
    }

    fn build_attach_args(&self, args: &Value) -> Value {
        let mut attach = Map::new();

        if let Some(pid) = arg_i64(args, "pid") {
            attach.insert("pid".into(), json!(pid));
        }
        // Wait for the process to appear (debugging startup).
        if let Some(wait_for) = arg_bool(args, "waitFor") {
            attach.insert("waitFor".into(), json!(wait_for));
        }
        // Post-mortem debugging against a core dump.
        if let Some(core_file) = arg_str(args, "coreFile") {
            attach.insert("coreFile".into(), json!(core_file));
        }
        // Program path for symbol resolution.
        if let Some(program) = arg_str(args, "program") {
            attach.insert("program".into(), json!(program));
        }
        // Remote debugging via the gdb-server protocol.
        if let Some(port) = arg_i64(args, "gdb-remote-port") {
            attach.insert("gdb-remote-port".into(), json!(port));
        }
        if let Some(hostname) = arg_str(args, "gdb-remote-hostname") {
            attach.insert("gdb-remote-hostname".into(), json!(hostname));
        }
        if let Some(cmds) = arg_string_vec(args, "attachCommands") {
            attach.insert("attachCommands".into(), json!(cmds));
        }

        Value::Object(attach)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> LldbAdapter {
        LldbAdapter::new(LldbConfig { path: String::new() })
    }

    #[test]
    fn lldb_is_stdio() {
        assert_eq!(adapter().transport_kind(), TransportKind::Stdio);
    }

    #[test]
    fn lldb_launch_args_env_as_list() {
        let args = adapter().build_launch_args(
            "/bin/app",
            &json!({"env": {"RUST_LOG": "debug"}, "stopOnEntry": true}),
        );
        assert_eq!(args["program"], "/bin/app");
        assert_eq!(args["env"], json!(["RUST_LOG=debug"]));
        assert_eq!(args["stopOnEntry"], true);
    }

    #[test]
    fn lldb_launch_args_command_hooks() {
        let args = adapter().build_launch_args(
            "/bin/app",
            &json!({
                "initCommands": ["settings set target.run-args x"],
                "preRunCommands": ["b main"],
                "stopCommands": ["bt"],
                "sourceMap": [["/build", "/src"]]
            }),
        );
        assert_eq!(args["initCommands"], json!(["settings set target.run-args x"]));
        assert_eq!(args["preRunCommands"], json!(["b main"]));
        assert_eq!(args["stopCommands"], json!(["bt"]));
        assert_eq!(args["sourceMap"], json!([["/build", "/src"]]));
    }

    #[test]
    fn lldb_attach_args_variants() {
        let by_pid = adapter().build_attach_args(&json!({"pid": 1234.0, "waitFor": true}));
        assert_eq!(by_pid["pid"], 1234);
        assert_eq!(by_pid["waitFor"], true);

        let core = adapter()
            .build_attach_args(&json!({"coreFile": "/tmp/core.1234", "program": "/bin/app"}));
        assert_eq!(core["coreFile"], "/tmp/core.1234");
        assert_eq!(core["program"], "/bin/app");

        let remote = adapter().build_attach_args(
            &json!({"gdb-remote-port": 1234, "gdb-remote-hostname": "dev-box"}),
        );
        assert_eq!(remote["gdb-remote-port"], 1234);
        assert_eq!(remote["gdb-remote-hostname"], "dev-box");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn lldb_spawn_wires_stdio_client() {
        // `cat` stands in for the adapter binary: the pipes wire up the
        // same way and the child is killable as a group.
        let adapter = LldbAdapter::new(LldbConfig { path: "cat".into() });
        let spawned = adapter.spawn("/bin/app", &json!({})).unwrap();
        let mut process = spawned.process;
        assert!(process.pid > 0);
        match spawned.connection {
            AdapterConnection::Stdio(client) => client.close().await,
            AdapterConnection::Tcp(_) => panic!("expected stdio connection"),
        }
        scout_dap::process::kill_process_group(&mut process).unwrap();
        let _ = process.child.wait().await;
    }
}
