//! Shared process-spawning plumbing for adapter drivers.

use std::process::Stdio;

use serde_json::Value;
use tokio::process::Command;

use crate::error::AdapterError;

/// Find a free ephemeral TCP port by binding port 0.
pub fn find_available_port() -> Result<u16, AdapterError> {
    let listener =
        std::net::TcpListener::bind("127.0.0.1:0").map_err(AdapterError::PortUnavailable)?;
    let port = listener
        .local_addr()
        .map_err(AdapterError::PortUnavailable)?
        .port();
    Ok(port)
}

/// Build the base command for an adapter child process.
///
/// The child inherits the server's environment, gets its own process group
/// (so the whole subtree can be killed at once), and forwards stderr to the
/// server's own stderr for operator visibility. stdin is disconnected; the
/// stdio drivers re-pipe it themselves.
pub fn adapter_command(path: &str) -> Command {
    let mut cmd = Command::new(path);
    cmd.stdin(Stdio::null());
    cmd.stderr(Stdio::inherit());
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// Apply the `cwd` and `env` entries of a launch-arg object to a command.
/// Caller-supplied env vars are applied last so they win over anything the
/// driver synthesized.
pub fn apply_cwd_and_env(cmd: &mut Command, args: &Value) {
    if let Some(cwd) = arg_str(args, "cwd") {
        if !cwd.is_empty() {
            cmd.current_dir(cwd);
        }
    }
    if let Some(env) = args.get("env").and_then(Value::as_object) {
        for (key, value) in env {
            cmd.env(key, value_to_string(value));
        }
    }
}

/// String field accessor on a launch-arg object.
pub fn arg_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Bool field accessor on a launch-arg object.
pub fn arg_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

/// Integer field accessor on a launch-arg object (tolerates floats, the
/// way numbers arrive from JSON tool parameters).
pub fn arg_i64(args: &Value, key: &str) -> Option<i64> {
    let v = args.get(key)?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

/// String-array accessor: every element stringified.
pub fn arg_string_vec(args: &Value, key: &str) -> Option<Vec<String>> {
    let items = args.get(key)?.as_array()?;
    Some(items.iter().map(value_to_string).collect())
}

/// Render a JSON value the way a command line or env var expects it.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
