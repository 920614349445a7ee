//! Session management tools: launch, attach, disconnect, listings.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use scout_adapters::{connect, AdapterConnection, TransportKind};
use scout_dap::{Language, SessionStatus};

use crate::error::DebugError;
use crate::request::ToolRequest;
use crate::server::{DebugServer, BRINGUP_TIMEOUT};

impl DebugServer {
    /// Launch a new debug session, either from direct arguments or from a
    /// named launch.json configuration.
    pub(crate) async fn handle_launch(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        if request.opt_str("configName").is_some() {
            return self.handle_config_launch(request).await;
        }

        let lang_str = request.require_str(
            "language",
            "Specify the programming language: 'go', 'python', 'javascript', 'typescript', 'c', \
             'cpp', or 'rust'. Alternatively, use configName to load from launch.json.",
        )?;
        let program = request.require_str(
            "program",
            "Specify the path to the program to debug. For Go: path to the main package. For \
             Python/JS: path to the script file. Alternatively, use configName to load from \
             launch.json.",
        )?;

        let language = Language::parse(lang_str)
            .ok_or_else(|| DebugError::adapter_not_supported(lang_str))?;
        let adapter = self
            .registry()
            .get(language)
            .map_err(|_| DebugError::adapter_not_supported(lang_str))?;

        // Direct launch arguments; the driver shapes them further.
        let mut args = Map::new();
        if let Some(cwd) = request.opt_str("cwd") {
            args.insert("cwd".into(), json!(cwd));
        }
        if request.bool_or("stopOnEntry", false) {
            args.insert("stopOnEntry".into(), json!(true));
        }
        // Browser debugging options.
        if let Some(target) = request.opt_str("target") {
            args.insert("target".into(), json!(target));
        }
        if let Some(web_root) = request.opt_str("webRoot") {
            args.insert("webRoot".into(), json!(web_root));
        }
        // Interpreter aliases: either spelling populates both.
        if let Some(python_path) = request.opt_str("pythonPath") {
            args.insert("pythonPath".into(), json!(python_path));
            args.insert("python".into(), json!(python_path));
        }
        if let Some(python) = request.opt_str("python") {
            args.insert("python".into(), json!(python));
            args.insert("pythonPath".into(), json!(python));
        }
        let args = Value::Object(args);

        let (session_id, pid) = self
            .launch_session(language, adapter.as_ref(), program, &args)
            .await?;

        let mut result = json!({
            "sessionId": session_id,
            "status": "launched",
            "language": language.as_str(),
            "program": program,
        });
        if let Some(pid) = pid {
            result["pid"] = json!(pid);
        }
        Ok(result)
    }

    /// Attach to an already-running target.
    ///
    /// Two shapes: network attach connects straight to the target's debug
    /// port (the Node.js default); browser targets spawn the js-debug
    /// adapter as a DAP↔CDP bridge and attach through it, with the same
    /// deferred-response pattern launch uses.
    pub(crate) async fn handle_attach(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let lang_str = request.require_str(
            "language",
            "Specify the programming language of the process to attach to: 'go', 'python', \
             'javascript', 'typescript'.",
        )?;

        if !self.config().can_attach() {
            return Err(DebugError::permission_denied("attach", self.mode_str()));
        }

        let language = Language::parse(lang_str)
            .ok_or_else(|| DebugError::adapter_not_supported(lang_str))?;
        let adapter = self
            .registry()
            .get(language)
            .map_err(|_| DebugError::adapter_not_supported(lang_str))?;

        let session = self
            .manager()
            .create(language, "attached")
            .await
            .map_err(DebugError::from_dap)?;
        let session_id = session.id.clone();

        match self.attach_steps(&session_id, adapter.as_ref(), request).await {
            Ok(()) => Ok(json!({
                "sessionId": session_id,
                "status": "attached",
                "language": language.as_str(),
            })),
            Err(error) => {
                if let Err(cleanup) = self.manager().terminate(&session_id, false).await {
                    tracing::warn!(session = %session_id, "cleanup after failed attach: {cleanup}");
                }
                Err(error)
            }
        }
    }

    async fn attach_steps(
        &self,
        session_id: &str,
        adapter: &dyn scout_adapters::Adapter,
        request: &ToolRequest,
    ) -> Result<(), DebugError> {
        let host = request.opt_str("host").unwrap_or("127.0.0.1").to_string();
        let port = request.require_i64(
            "port",
            "Provide the debug port the target is listening on (e.g. 9229 for Node.js started \
             with --inspect, 9222 for Chrome with --remote-debugging-port).",
        )?;

        let mut args = Map::new();
        args.insert("host".into(), json!(host));
        args.insert("port".into(), json!(port));
        if let Some(pid) = request.opt_i64("pid") {
            args.insert("pid".into(), json!(pid));
        }
        let target = request.opt_str("target").unwrap_or("").to_string();
        if !target.is_empty() {
            args.insert("target".into(), json!(target));
        }
        if let Some(url) = request.opt_str("url") {
            args.insert("url".into(), json!(url));
        }
        if let Some(web_root) = request.opt_str("webRoot") {
            args.insert("webRoot".into(), json!(web_root));
        }
        let args = Value::Object(args);

        let is_browser = target == "chrome" || target == "edge";

        let client = if is_browser {
            // Chrome speaks CDP, not DAP: spawn vscode-js-debug as the
            // translator and attach through it.
            if !self.config().can_spawn() {
                return Err(DebugError::permission_denied("spawn", self.mode_str()));
            }
            if adapter.transport_kind() != TransportKind::Tcp {
                return Err(DebugError::dap_attach_failed(&"browser attach requires the js-debug adapter"));
            }
            let spawned = adapter
                .spawn("", &args)
                .map_err(|e| DebugError::adapter_spawn_failed("javascript", &e))?;
            let AdapterConnection::Tcp(address) = spawned.connection else {
                return Err(DebugError::dap_attach_failed(&"unexpected stdio connection"));
            };
            self.manager()
                .set_process(session_id, spawned.process)
                .await
                .map_err(DebugError::from_dap)?;

            let client = connect(&address, 20)
                .await
                .map_err(|e| DebugError::adapter_connect_failed(&address, &e))?;
            Arc::new(client)
        } else {
            // The target's debug port already speaks DAP; connect directly.
            let address = format!("{host}:{port}");
            let client = connect(&address, 10)
                .await
                .map_err(|e| DebugError::adapter_connect_failed(&address, &e))?;
            Arc::new(client)
        };

        self.manager()
            .set_client(session_id, client.clone())
            .await
            .map_err(DebugError::from_dap)?;

        client
            .initialize("scout", "Scout Debug Server")
            .await
            .map_err(|e| DebugError::dap_init_failed(&e))?;

        let attach_args = adapter.build_attach_args(&args);

        if is_browser {
            // Deferred-response pattern, same as launch.
            let pending = client
                .attach_async(attach_args)
                .map_err(|e| DebugError::dap_attach_failed(&e))?;
            client
                .wait_initialized(BRINGUP_TIMEOUT)
                .await
                .map_err(|_| DebugError::dap_timeout("waiting for initialized event", 10))?;
            client
                .configuration_done()
                .await
                .map_err(|e| DebugError::dap_attach_failed(&e))?;
            client
                .wait_for_response(pending, BRINGUP_TIMEOUT)
                .await
                .map_err(|e| DebugError::dap_attach_failed(&e))?;
        } else {
            client
                .attach(attach_args)
                .await
                .map_err(|e| DebugError::dap_attach_failed(&e))?;
            client
                .configuration_done()
                .await
                .map_err(|e| DebugError::dap_attach_failed(&e))?;
        }

        self.manager()
            .update_status(session_id, SessionStatus::Running)
            .await
            .map_err(DebugError::from_dap)
    }

    /// Terminate a session.
    pub(crate) async fn handle_disconnect(
        &self,
        request: &ToolRequest,
    ) -> Result<Value, DebugError> {
        let session_id = request.require_str(
            "sessionId",
            "Provide the sessionId to disconnect. Use debug_list_sessions to see active sessions.",
        )?;
        let terminate_debuggee = request.bool_or("terminateDebuggee", false);

        self.manager()
            .terminate(session_id, terminate_debuggee)
            .await
            .map_err(DebugError::from_dap)?;

        Ok(json!({
            "sessionId": session_id,
            "status": "disconnected",
        }))
    }

    /// List active sessions.
    pub(crate) async fn handle_list_sessions(&self) -> Result<Value, DebugError> {
        let sessions = self.manager().list().await;
        Ok(json!({ "sessions": sessions }))
    }

    /// List compound session groups.
    pub(crate) async fn handle_list_compound_sessions(&self) -> Result<Value, DebugError> {
        let compounds = self.manager().list_compounds().await;
        Ok(json!({ "compounds": compounds }))
    }
}
