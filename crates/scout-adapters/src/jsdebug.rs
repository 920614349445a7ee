//! vscode-js-debug driver for JavaScript and TypeScript.
//!
//! Serves both Node.js debugging (`pwa-node`) and browser debugging
//! (`pwa-chrome` / `pwa-msedge`), where the spawned adapter doubles as a
//! DAP↔Chrome-DevTools-Protocol bridge.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use scout_config::NodeConfig;
use scout_dap::{AdapterProcess, Language};

use crate::error::AdapterError;
use crate::spawn::{
    adapter_command, apply_cwd_and_env, arg_bool, arg_i64, arg_str, arg_string_vec,
    find_available_port,
};
use crate::{Adapter, AdapterConnection, SpawnedAdapter, TransportKind};

/// Default Node.js inspector port.
const DEFAULT_NODE_INSPECT_PORT: i64 = 9229;
/// Default Chrome remote-debugging port.
const DEFAULT_CDP_PORT: i64 = 9222;

/// Driver for vscode-js-debug's dapDebugServer.
pub struct JsDebugAdapter {
    node_path: String,
    js_debug_path: String,
    source_map_path_overrides: HashMap<String, String>,
}

impl JsDebugAdapter {
    /// Create a js-debug driver from its configuration.
    pub fn new(config: NodeConfig) -> Self {
        let node_path = if config.node_path.is_empty() {
            "node".into()
        } else {
            config.node_path
        };
        Self {
            node_path,
            js_debug_path: config.js_debug_path,
            source_map_path_overrides: config.source_map_path_overrides,
        }
    }

    fn build_node_launch_args(&self, program: &str, args: &Value) -> Value {
        let mut launch = Map::new();
        launch.insert("type".into(), json!("pwa-node"));
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
        if let Some(runtime) = arg_str(args, "runtimeExecutable") {
            launch.insert("runtimeExecutable".into(), json!(runtime));
        }
        if let Some(runtime_args) = arg_string_vec(args, "runtimeArgs") {
            launch.insert("runtimeArgs".into(), json!(runtime_args));
        }
        if let Some(out_files) = arg_string_vec(args, "outFiles") {
            launch.insert("outFiles".into(), json!(out_files));
        }
        launch.insert(
            "sourceMaps".into(),
            json!(arg_bool(args, "sourceMaps").unwrap_or(true)),
        );

        Value::Object(launch)
    }

    fn build_browser_launch_args(&self, debug_type: &str, url: &str, args: &Value) -> Value {
        let mut launch = Map::new();
        launch.insert("type".into(), json!(debug_type));
        launch.insert("request".into(), json!("launch"));
        launch.insert("url".into(), json!(url));

        // webRoot drives all source-map resolution; cwd is the fallback.
        let web_root = arg_str(args, "webRoot").or_else(|| arg_str(args, "cwd"));
        if let Some(web_root) = web_root {
            launch.insert("webRoot".into(), json!(web_root));
            launch.insert(
                "resolveSourceMapLocations".into(),
                json!([format!("{web_root}/**"), "!**/node_modules/**"]),
            );
            launch.insert(
                "sourceMapPathOverrides".into(),
                self.source_map_overrides(web_root),
            );
        }

        launch.insert(
            "sourceMaps".into(),
            json!(arg_bool(args, "sourceMaps").unwrap_or(true)),
        );
        if let Some(pause) = arg_bool(args, "pauseForSourceMap") {
            launch.insert("pauseForSourceMap".into(), json!(pause));
        }
        // A temp profile avoids colliding with the user's running browser.
        launch.insert("userDataDir".into(), json!(true));

        Value::Object(launch)
    }

    /// Source-map path overrides, with `${webRoot}` expanded in custom
    /// entries and bundler defaults (Vite, Webpack/CRA, Meteor) otherwise.
    fn source_map_overrides(&self, web_root: &str) -> Value {
        if !self.source_map_path_overrides.is_empty() {
            let mut overrides = Map::new();
            for (pattern, replacement) in &self.source_map_path_overrides {
                let expanded = replacement.replace("${webRoot}", web_root);
                overrides.insert(pattern.clone(), json!(expanded));
            }
            return Value::Object(overrides);
        }

        json!({
            // Vite serves files with their original paths.
            "/*": format!("{web_root}/*"),
            // Webpack / Create React App patterns.
            "webpack:///src/*": format!("{web_root}/src/*"),
            "webpack:///./*": format!("{web_root}/*"),
            "webpack:///*": "*",
            "webpack:///./~/*": format!("{web_root}/node_modules/*"),
            // Meteor pattern.
            "meteor://💻app/*": format!("{web_root}/*"),
        })
    }

    fn build_node_attach_args(&self, args: &Value) -> Value {
        let mut attach = Map::new();
        attach.insert("type".into(), json!("pwa-node"));
        attach.insert("request".into(), json!("attach"));
        attach.insert(
            "address".into(),
            json!(arg_str(args, "host").unwrap_or("127.0.0.1")),
        );
        attach.insert(
            "port".into(),
            json!(arg_i64(args, "port").unwrap_or(DEFAULT_NODE_INSPECT_PORT)),
        );
        if let Some(pid) = arg_i64(args, "pid") {
            attach.insert("processId".into(), json!(pid));
        }
        Value::Object(attach)
    }

    fn build_browser_attach_args(&self, debug_type: &str, args: &Value) -> Value {
        let mut attach = Map::new();
        attach.insert("type".into(), json!(debug_type));
        attach.insert("request".into(), json!("attach"));

        if let Some(url) = arg_str(args, "url") {
            attach.insert("url".into(), json!(url));
        }
        if let Some(web_root) = arg_str(args, "webRoot") {
            attach.insert("webRoot".into(), json!(web_root));
            attach.insert(
                "resolveSourceMapLocations".into(),
                json!([format!("{web_root}/**"), "!**/node_modules/**"]),
            );
            attach.insert(
                "sourceMapPathOverrides".into(),
                self.source_map_overrides(web_root),
            );
        }
        attach.insert(
            "port".into(),
            json!(arg_i64(args, "port").unwrap_or(DEFAULT_CDP_PORT)),
        );
        attach.insert("sourceMaps".into(), json!(true));

        Value::Object(attach)
    }
}

impl Adapter for JsDebugAdapter {
    fn language(&self) -> Language {
        Language::Javascript
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn spawn(&self, _program: &str, args: &Value) -> Result<SpawnedAdapter, AdapterError> {
        if self.js_debug_path.is_empty() {
            return Err(AdapterError::MissingConfig(
                "jsDebugPath not configured: vscode-js-debug is required for JavaScript/TypeScript \
                 debugging. Install it and set adapters.node.jsDebugPath in the server config"
                    .into(),
            ));
        }

        let port = find_available_port()?;
        let address = format!("127.0.0.1:{port}");

        // Usage: node dapDebugServer.js <port> [host]
        let mut cmd = adapter_command(&self.node_path);
        cmd.arg(&self.js_debug_path)
            .arg(port.to_string())
            .arg("127.0.0.1");
        apply_cwd_and_env(&mut cmd, args);

        let child = cmd.spawn().map_err(|e| AdapterError::SpawnFailed {
            adapter: format!("{} {}", self.node_path, self.js_debug_path),
            source: e,
        })?;

        Ok(SpawnedAdapter {
            connection: AdapterConnection::Tcp(address),
            process: AdapterProcess::new(child),
        })
    }

    fn build_launch_args(&self, program: &str, args: &Value) -> Value {
        match arg_str(args, "target").unwrap_or("node") {
            "chrome" => self.build_browser_launch_args("pwa-chrome", program, args),
            "edge" => self.build_browser_launch_args("pwa-msedge", program, args),
            _ => self.build_node_launch_args(program, args),
        }
    }

    fn build_attach_args(&self, args: &Value) -> Value {
        match arg_str(args, "target").unwrap_or("node") {
            "chrome" => self.build_browser_attach_args("pwa-chrome", args),
            "edge" => self.build_browser_attach_args("pwa-msedge", args),
            _ => self.build_node_attach_args(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> JsDebugAdapter {
        JsDebugAdapter::new(NodeConfig::default())
    }

    #[test]
    fn js_node_launch_defaults() {
        let args = adapter().build_launch_args("/app/index.js", &json!({}));
        assert_eq!(args["type"], "pwa-node");
        assert_eq!(args["program"], "/app/index.js");
        assert_eq!(args["sourceMaps"], true);
    }

    #[test]
    fn js_chrome_launch_uses_url_and_web_root() {
        let args = adapter().build_launch_args(
            "http://localhost:5173",
            &json!({"target": "chrome", "webRoot": "/ws/frontend"}),
        );
        assert_eq!(args["type"], "pwa-chrome");
        assert_eq!(args["url"], "http://localhost:5173");
        assert_eq!(args["webRoot"], "/ws/frontend");
        assert_eq!(
            args["resolveSourceMapLocations"],
            json!(["/ws/frontend/**", "!**/node_modules/**"])
        );
        assert_eq!(args["sourceMapPathOverrides"]["/*"], "/ws/frontend/*");
        assert_eq!(
            args["sourceMapPathOverrides"]["webpack:///src/*"],
            "/ws/frontend/src/*"
        );
        assert_eq!(args["userDataDir"], true);
    }

    #[test]
    fn js_browser_web_root_falls_back_to_cwd() {
        let args = adapter()
            .build_launch_args("http://x", &json!({"target": "edge", "cwd": "/proj"}));
        assert_eq!(args["type"], "pwa-msedge");
        assert_eq!(args["webRoot"], "/proj");
    }

    #[test]
    fn js_custom_source_map_overrides_expand_web_root() {
        let adapter = JsDebugAdapter::new(NodeConfig {
            source_map_path_overrides: HashMap::from([(
                "app:///*".to_string(),
                "${webRoot}/dist/*".to_string(),
            )]),
            ..Default::default()
        });
        let args = adapter
            .build_launch_args("http://x", &json!({"target": "chrome", "webRoot": "/ws"}));
        assert_eq!(args["sourceMapPathOverrides"]["app:///*"], "/ws/dist/*");
    }

    #[test]
    fn js_node_attach_default_port() {
        let args = adapter().build_attach_args(&json!({}));
        assert_eq!(args["type"], "pwa-node");
        assert_eq!(args["address"], "127.0.0.1");
        assert_eq!(args["port"], 9229);
    }

    #[test]
    fn js_browser_attach_default_port() {
        let args = adapter().build_attach_args(&json!({"target": "chrome", "webRoot": "/w"}));
        assert_eq!(args["type"], "pwa-chrome");
        assert_eq!(args["port"], 9222);
        assert_eq!(args["sourceMaps"], true);
    }

    #[test]
    fn js_spawn_without_js_debug_path_is_rejected() {
        let err = adapter().spawn("x", &json!({})).unwrap_err();
        assert!(matches!(err, AdapterError::MissingConfig(_)));
        assert!(err.to_string().contains("jsDebugPath"));
    }
}
