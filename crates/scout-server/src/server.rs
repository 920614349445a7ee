//! The debug server: tool routing, capability gating, and the shared
//! launch machinery handlers compose.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::time::Duration;

use scout_adapters::{spawn_and_connect, Adapter, AdapterError, Registry};
use scout_config::{CapabilityMode, Config};
use scout_dap::{DapClient, Language, Session, SessionManager, SessionStatus};

use crate::error::DebugError;
use crate::request::ToolRequest;

/// Timeout for the initialized event and the deferred launch/attach
/// responses during session bring-up.
pub(crate) const BRINGUP_TIMEOUT: Duration = Duration::from_secs(10);

/// A tool exposed to the host protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
}

/// Tools available in every mode.
const BASE_TOOLS: &[ToolInfo] = &[
    ToolInfo { name: "debug_launch", description: "Launch a program under a debugger" },
    ToolInfo { name: "debug_attach", description: "Attach to a running process or browser" },
    ToolInfo { name: "debug_disconnect", description: "Terminate a debug session" },
    ToolInfo { name: "debug_list_sessions", description: "List active debug sessions" },
    ToolInfo { name: "debug_list_compound_sessions", description: "List compound session groups" },
    ToolInfo { name: "debug_snapshot", description: "Threads, stacks, scopes, and variables in one call" },
    ToolInfo { name: "debug_evaluate", description: "Evaluate one expression or a batch" },
    ToolInfo { name: "debug_threads", description: "List debuggee threads" },
    ToolInfo { name: "debug_stack", description: "Stack trace for a thread" },
    ToolInfo { name: "debug_scopes", description: "Scopes for a stack frame" },
    ToolInfo { name: "debug_variables", description: "Expand a variables reference" },
    ToolInfo { name: "debug_source", description: "Fetch source content" },
    ToolInfo { name: "debug_modules", description: "List loaded modules" },
    ToolInfo { name: "debug_list_configs", description: "List launch.json configurations" },
];

/// Tools that require full mode.
const CONTROL_TOOLS: &[ToolInfo] = &[
    ToolInfo { name: "debug_breakpoints", description: "Replace the breakpoint set for a file" },
    ToolInfo { name: "debug_function_breakpoints", description: "Replace the function breakpoint set" },
    ToolInfo { name: "debug_step", description: "Step over, into, or out" },
    ToolInfo { name: "debug_continue", description: "Resume execution" },
    ToolInfo { name: "debug_pause", description: "Pause execution" },
    ToolInfo { name: "debug_set_variable", description: "Modify a variable value" },
    ToolInfo { name: "debug_run_to_line", description: "Run to a line and snapshot the stop" },
    ToolInfo { name: "debug_execute_command", description: "Run a native debugger CLI command" },
    ToolInfo { name: "debug_launch_compound", description: "Launch a compound configuration" },
];

/// The debug-session orchestration server.
pub struct DebugServer {
    config: Config,
    manager: SessionManager,
    registry: Registry,
}

impl DebugServer {
    /// Build a server from configuration: session manager, adapter
    /// registry, and capability gate.
    pub fn new(config: Config) -> Self {
        let registry = Registry::new(&config);
        Self::with_registry(config, registry)
    }

    /// Build a server with a caller-supplied adapter registry (custom or
    /// overridden drivers).
    pub fn with_registry(config: Config, registry: Registry) -> Self {
        let manager = SessionManager::new(config.max_sessions, config.session_timeout());
        Self {
            config,
            manager,
            registry,
        }
    }

    /// The server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The session manager.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// The adapter registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The tools visible under the current capability mode.
    pub fn tools(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<ToolInfo> = BASE_TOOLS.to_vec();
        if self.config.can_use_control_tools() {
            tools.extend_from_slice(CONTROL_TOOLS);
        }
        tools
    }

    /// Shut down: terminate every session and stop the sweep.
    pub async fn close(&self) {
        self.manager.close().await;
    }

    pub(crate) fn mode_str(&self) -> &'static str {
        match self.config.mode {
            CapabilityMode::Readonly => "readonly",
            CapabilityMode::Full => "full",
        }
    }

    /// Handle one tool invocation. Errors become result payloads; the tool
    /// protocol itself never fails.
    pub async fn dispatch(&self, request: &ToolRequest) -> Value {
        match self.route(request).await {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(tool = %request.name, code = ?error.code, "tool error: {error}");
                error.to_payload()
            }
        }
    }

    async fn route(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let is_control = CONTROL_TOOLS.iter().any(|t| t.name == request.name);
        if is_control && !self.config.can_use_control_tools() {
            return Err(DebugError::permission_denied("control", self.mode_str()));
        }

        match request.name.as_str() {
            "debug_launch" => self.handle_launch(request).await,
            "debug_attach" => self.handle_attach(request).await,
            "debug_disconnect" => self.handle_disconnect(request).await,
            "debug_list_sessions" => self.handle_list_sessions().await,
            "debug_list_compound_sessions" => self.handle_list_compound_sessions().await,
            "debug_snapshot" => self.handle_snapshot(request).await,
            "debug_evaluate" => self.handle_evaluate(request).await,
            "debug_threads" => self.handle_threads(request).await,
            "debug_stack" => self.handle_stack(request).await,
            "debug_scopes" => self.handle_scopes(request).await,
            "debug_variables" => self.handle_variables(request).await,
            "debug_source" => self.handle_source(request).await,
            "debug_modules" => self.handle_modules(request).await,
            "debug_breakpoints" => self.handle_breakpoints(request).await,
            "debug_function_breakpoints" => self.handle_function_breakpoints(request).await,
            "debug_step" => self.handle_step(request).await,
            "debug_continue" => self.handle_continue(request).await,
            "debug_pause" => self.handle_pause(request).await,
            "debug_set_variable" => self.handle_set_variable(request).await,
            "debug_run_to_line" => self.handle_run_to_line(request).await,
            "debug_execute_command" => self.handle_execute_command(request).await,
            "debug_list_configs" => self.handle_list_configs(request).await,
            "debug_launch_compound" => self.handle_launch_compound(request).await,
            other => Err(DebugError::invalid_parameter(
                "tool",
                &json!(other),
                "one of the debug_* tools; list them with the host's tool listing",
            )),
        }
    }

    /// Resolve the session and its client for a request carrying a
    /// `sessionId` parameter.
    pub(crate) async fn session_client(
        &self,
        request: &ToolRequest,
    ) -> Result<(Arc<Session>, Arc<DapClient>), DebugError> {
        let session_id = request.require_str(
            "sessionId",
            "Provide the sessionId returned from debug_launch or debug_attach. Use \
             debug_list_sessions to see active sessions.",
        )?;
        let session = self
            .manager
            .get(session_id)
            .await
            .map_err(|_| DebugError::session_not_found(session_id))?;
        let client = session
            .client()
            .await
            .ok_or_else(|| DebugError::session_no_client(session_id))?;
        Ok((session, client))
    }

    /// Allocate a session and run the full launch protocol against it.
    /// The session is terminated on any failure; leaked sessions are bugs.
    pub(crate) async fn launch_session(
        &self,
        language: Language,
        adapter: &dyn Adapter,
        program: &str,
        args: &Value,
    ) -> Result<(String, Option<u32>), DebugError> {
        if !self.config.can_spawn() {
            return Err(DebugError::permission_denied("spawn", self.mode_str()));
        }

        let session = self
            .manager
            .create(language, program)
            .await
            .map_err(DebugError::from_dap)?;
        let session_id = session.id.clone();

        match self.launch_steps(&session_id, language, adapter, program, args).await {
            Ok(pid) => Ok((session_id, pid)),
            Err(error) => {
                if let Err(cleanup) = self.manager.terminate(&session_id, true).await {
                    tracing::warn!(session = %session_id, "cleanup after failed launch: {cleanup}");
                }
                Err(error)
            }
        }
    }

    /// The launch dance: spawn, connect, initialize, launch, wait for the
    /// initialized event, configurationDone, then collect the deferred
    /// launch response — in that exact order.
    async fn launch_steps(
        &self,
        session_id: &str,
        language: Language,
        adapter: &dyn Adapter,
        program: &str,
        args: &Value,
    ) -> Result<Option<u32>, DebugError> {
        let (client, process) =
            spawn_and_connect(adapter, program, args)
                .await
                .map_err(|e| match e {
                    AdapterError::ConnectFailed { ref address, ref message } => {
                        DebugError::adapter_connect_failed(address, message)
                    }
                    other => DebugError::adapter_spawn_failed(language.as_str(), &other),
                })?;
        let pid = (process.pid > 0).then_some(process.pid);

        self.manager
            .set_process(session_id, process)
            .await
            .map_err(DebugError::from_dap)?;
        let client = Arc::new(client);
        self.manager
            .set_client(session_id, client.clone())
            .await
            .map_err(DebugError::from_dap)?;

        client
            .initialize("scout", "Scout Debug Server")
            .await
            .map_err(|e| DebugError::dap_init_failed(&e))?;

        let launch_args = adapter.build_launch_args(program, args);
        let pending = client
            .launch_async(launch_args)
            .map_err(|e| DebugError::dap_launch_failed(program, &e))?;

        client
            .wait_initialized(BRINGUP_TIMEOUT)
            .await
            .map_err(|_| DebugError::dap_timeout("waiting for initialized event", 10))?;

        client.configuration_done().await.map_err(|e| {
            DebugError::dap_protocol_error(
                format!("configuration done failed: {e}"),
                "The debug adapter rejected the configuration. Try launching with simpler options.",
            )
        })?;

        client
            .wait_for_response(pending, BRINGUP_TIMEOUT)
            .await
            .map_err(|e| DebugError::dap_launch_failed(program, &e))?;

        self.manager
            .update_status(session_id, SessionStatus::Running)
            .await
            .map_err(DebugError::from_dap)?;

        Ok(pid)
    }
}

impl std::fmt::Debug for DebugServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugServer")
            .field("mode", &self.mode_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn request(name: &str, args: Value) -> ToolRequest {
        ToolRequest::new(name, args.as_object().cloned().unwrap_or_else(Map::new))
    }

    #[tokio::test]
    async fn tools_listing_gated_by_mode() {
        let full = DebugServer::new(Config::default());
        let names: Vec<&str> = full.tools().iter().map(|t| t.name).collect();
        assert!(names.contains(&"debug_breakpoints"));
        assert!(names.contains(&"debug_snapshot"));
        full.close().await;

        let readonly = DebugServer::new(Config {
            mode: CapabilityMode::Readonly,
            ..Config::default()
        });
        let names: Vec<&str> = readonly.tools().iter().map(|t| t.name).collect();
        assert!(!names.contains(&"debug_breakpoints"));
        assert!(!names.contains(&"debug_step"));
        assert!(names.contains(&"debug_snapshot"));
        readonly.close().await;
    }

    #[tokio::test]
    async fn control_tools_denied_in_readonly() {
        let server = DebugServer::new(Config {
            mode: CapabilityMode::Readonly,
            ..Config::default()
        });
        let result = server
            .dispatch(&request("debug_step", json!({"sessionId": "x", "threadId": 1, "type": "over"})))
            .await;
        assert_eq!(result["error"]["code"], "PERMISSION_DENIED");
        server.close().await;
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_parameter() {
        let server = DebugServer::new(Config::default());
        let result = server.dispatch(&request("debug_frobnicate", json!({}))).await;
        assert_eq!(result["error"]["code"], "INVALID_PARAMETER");
        server.close().await;
    }

    #[tokio::test]
    async fn session_tools_report_not_found() {
        let server = DebugServer::new(Config::default());
        let result = server
            .dispatch(&request("debug_snapshot", json!({"sessionId": "ghost"})))
            .await;
        assert_eq!(result["error"]["code"], "SESSION_NOT_FOUND");
        server.close().await;
    }

    #[tokio::test]
    async fn missing_session_id_reported() {
        let server = DebugServer::new(Config::default());
        let result = server.dispatch(&request("debug_threads", json!({}))).await;
        assert_eq!(result["error"]["code"], "MISSING_PARAMETER");
        server.close().await;
    }
}
