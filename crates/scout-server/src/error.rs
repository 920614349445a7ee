//! Structured tool-boundary errors.
//!
//! Every failure a tool call can produce carries a stable machine code, a
//! readable message, an actionable hint, and a details map with the
//! offending values. Errors are returned to the tool protocol as result
//! payloads; the protocol itself never fails.

use serde::Serialize;
use serde_json::{json, Map, Value};

use scout_dap::DapError;
use scout_launch::LaunchConfigError;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Session errors.
    SessionNotFound,
    SessionLimitReached,
    SessionNoClient,
    SessionTerminated,
    // Adapter errors.
    AdapterNotSupported,
    AdapterSpawnFailed,
    AdapterConnectFailed,
    // DAP protocol errors.
    DapInitFailed,
    DapLaunchFailed,
    DapAttachFailed,
    DapTimeout,
    DapProtocolError,
    // Request-shape errors.
    MissingParameter,
    InvalidParameter,
    InvalidJson,
    // Permission errors.
    PermissionDenied,
    // Launch-configuration errors.
    ConfigNotFound,
    ConfigInvalid,
    MissingInputs,
    // Runtime errors.
    BreakpointFailed,
    EvaluationFailed,
    StepFailed,
    NoThreads,
}

/// A structured error with guidance for the caller.
#[derive(Debug, Clone, Serialize)]
pub struct DebugError {
    /// Machine-readable category.
    pub code: ErrorCode,
    /// What went wrong.
    pub message: String,
    /// Actionable guidance on how to fix it.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hint: String,
    /// Offending values and extra context.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl std::fmt::Display for DebugError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        if !self.hint.is_empty() {
            write!(f, " | Hint: {}", self.hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for DebugError {}

impl DebugError {
    /// Build an error with just a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: String::new(),
            details: Map::new(),
        }
    }

    /// Attach a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    /// Attach a detail value.
    pub fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Serialize into the tool-result error payload.
    pub fn to_payload(&self) -> Value {
        json!({ "error": self })
    }

    // -- session errors ------------------------------------------------------

    /// The session id is not in the table.
    pub fn session_not_found(session_id: &str) -> Self {
        Self::new(
            ErrorCode::SessionNotFound,
            format!("session '{session_id}' not found"),
        )
        .with_hint(
            "Use debug_list_sessions to see active sessions, or debug_launch to create a new one.",
        )
        .with_detail("sessionId", json!(session_id))
    }

    /// The session table is at its configured bound.
    pub fn session_limit_reached(max_sessions: usize) -> Self {
        Self::new(
            ErrorCode::SessionLimitReached,
            format!("maximum number of sessions ({max_sessions}) reached"),
        )
        .with_hint("Use debug_disconnect to terminate an existing session before creating a new one.")
        .with_detail("maxSessions", json!(max_sessions))
    }

    /// The session exists but has no live client.
    pub fn session_no_client(session_id: &str) -> Self {
        Self::new(
            ErrorCode::SessionNoClient,
            format!("session '{session_id}' has no active debug client"),
        )
        .with_hint(
            "The session may have failed to initialize. Use debug_disconnect to clean up and \
             debug_launch to create a new session.",
        )
        .with_detail("sessionId", json!(session_id))
    }

    // -- adapter errors ------------------------------------------------------

    /// No driver serves the requested language.
    pub fn adapter_not_supported(language: &str) -> Self {
        const SUPPORTED: &str = "go, python, javascript, typescript, c, cpp, rust";
        Self::new(
            ErrorCode::AdapterNotSupported,
            format!("no debug adapter available for language: {language}"),
        )
        .with_hint(format!(
            "Supported languages are: {SUPPORTED}. Check that the language parameter is correct."
        ))
        .with_detail("requestedLanguage", json!(language))
    }

    /// Starting the adapter failed.
    pub fn adapter_spawn_failed(language: &str, cause: &dyn std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::AdapterSpawnFailed,
            format!("failed to spawn debug adapter for {language}: {cause}"),
        )
        .with_hint(
            "Ensure the debug adapter is installed. For Go: install Delve. For Python: pip \
             install debugpy. For JavaScript: configure adapters.node.jsDebugPath. For native \
             code: install lldb-dap or GDB 14.1+.",
        )
        .with_detail("language", json!(language))
    }

    /// The adapter never accepted a connection.
    pub fn adapter_connect_failed(address: &str, cause: &dyn std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::AdapterConnectFailed,
            format!("failed to connect to debug adapter at {address}: {cause}"),
        )
        .with_hint(
            "The debug adapter may have failed to start or crashed. Check that the program path \
             is correct and the file exists.",
        )
        .with_detail("address", json!(address))
    }

    // -- DAP protocol errors -------------------------------------------------

    /// The `initialize` request failed.
    pub fn dap_init_failed(cause: &dyn std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::DapInitFailed,
            format!("debug adapter initialization failed: {cause}"),
        )
        .with_hint(
            "The adapter may be incompatible or crashed during startup. Disconnect and launch a \
             new session.",
        )
    }

    /// The launch sequence failed.
    pub fn dap_launch_failed(program: &str, cause: &dyn std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::DapLaunchFailed,
            format!("failed to launch program: {cause}"),
        )
        .with_hint(
            "Check that the program path is correct and the file exists. For compiled languages, \
             ensure the program builds cleanly.",
        )
        .with_detail("program", json!(program))
    }

    /// The attach sequence failed.
    pub fn dap_attach_failed(cause: &dyn std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::DapAttachFailed,
            format!("failed to attach to process: {cause}"),
        )
        .with_hint(
            "Ensure the target process is running and listening on the given port. Node.js \
             targets must be started with --inspect.",
        )
    }

    /// A DAP operation timed out.
    pub fn dap_timeout(operation: &str, timeout_seconds: u64) -> Self {
        Self::new(
            ErrorCode::DapTimeout,
            format!("{operation} timed out after {timeout_seconds} seconds"),
        )
        .with_hint(
            "The program may be stuck, in an infinite loop, or waiting for input. Try \
             debug_pause to interrupt execution.",
        )
        .with_detail("operation", json!(operation))
        .with_detail("timeoutSeconds", json!(timeout_seconds))
    }

    /// A protocol-level surprise from the adapter.
    pub fn dap_protocol_error(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::new(ErrorCode::DapProtocolError, message).with_hint(hint)
    }

    // -- request-shape errors ------------------------------------------------

    /// A required parameter was not supplied.
    pub fn missing_parameter(name: &str, description: &str) -> Self {
        Self::new(
            ErrorCode::MissingParameter,
            format!("required parameter '{name}' is missing"),
        )
        .with_hint(description)
        .with_detail("parameter", json!(name))
    }

    /// A parameter value is invalid.
    pub fn invalid_parameter(name: &str, value: &Value, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidParameter,
            format!("invalid value for parameter '{name}': {value}"),
        )
        .with_hint(format!("Expected: {expected}"))
        .with_detail("parameter", json!(name))
        .with_detail("value", value.clone())
    }

    /// A JSON-encoded string parameter failed to parse.
    pub fn invalid_json(name: &str, cause: &dyn std::fmt::Display, example: &str) -> Self {
        Self::new(
            ErrorCode::InvalidJson,
            format!("invalid JSON in parameter '{name}': {cause}"),
        )
        .with_hint(format!("Provide valid JSON. Example: {example}"))
        .with_detail("parameter", json!(name))
        .with_detail("example", json!(example))
    }

    // -- permission errors ---------------------------------------------------

    /// The capability gate refused the operation.
    pub fn permission_denied(operation: &str, mode: &str) -> Self {
        let hint = match operation {
            "spawn" => {
                "The server disallows spawning debug adapters. Enable 'allowSpawn' in the \
                 configuration."
            }
            "attach" => {
                "The server disallows attaching to processes. Enable 'allowAttach' in the \
                 configuration."
            }
            "evaluate" => "Expression evaluation is disabled in the current server mode.",
            "modify" => "Variable modification is disabled; the server may be in readonly mode.",
            _ => "This operation is not allowed in the current server mode.",
        };
        Self::new(
            ErrorCode::PermissionDenied,
            format!("{operation} is not allowed in current server mode"),
        )
        .with_hint(hint)
        .with_detail("operation", json!(operation))
        .with_detail("mode", json!(mode))
    }

    // -- launch-configuration errors -----------------------------------------

    /// A named configuration does not exist.
    pub fn config_not_found(config_name: &str, available: &[String]) -> Self {
        let hint = if available.is_empty() {
            "No configurations found in launch.json. Create a launch configuration first.".to_string()
        } else {
            format!("Available configurations: {}", available.join(", "))
        };
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("configuration '{config_name}' not found in launch.json"),
        )
        .with_hint(hint)
        .with_detail("configName", json!(config_name))
        .with_detail("availableConfigs", json!(available))
    }

    /// A configuration exists but is unusable.
    pub fn config_invalid(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, reason)
            .with_hint("Check the launch.json file for syntax errors and required fields.")
    }

    /// Required `${input:}` values are missing.
    pub fn missing_inputs(inputs: &[String]) -> Self {
        Self::new(
            ErrorCode::MissingInputs,
            format!("missing required input values: {}", inputs.join(", ")),
        )
        .with_hint(
            "Provide the missing values via the inputValues parameter as a JSON object, e.g. \
             {\"inputName\": \"value\"}",
        )
        .with_detail("missingInputs", json!(inputs))
    }

    // -- runtime errors ------------------------------------------------------

    /// A breakpoint could not be placed.
    pub fn breakpoint_failed(path: &str, cause: &dyn std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::BreakpointFailed,
            format!("failed to set breakpoints in {path}: {cause}"),
        )
        .with_hint(
            "Ensure the file path is correct and the line numbers contain executable code.",
        )
        .with_detail("path", json!(path))
    }

    /// An expression failed to evaluate.
    pub fn evaluation_failed(expression: &str, cause: &dyn std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::EvaluationFailed,
            format!("failed to evaluate expression '{expression}': {cause}"),
        )
        .with_hint(
            "Check that the expression syntax is correct for the target language and that \
             referenced variables are in scope.",
        )
        .with_detail("expression", json!(expression))
    }

    /// A step operation failed.
    pub fn step_failed(step_type: &str, cause: &dyn std::fmt::Display) -> Self {
        let hint = match step_type {
            "over" => "Step over failed. The program may have terminated. Use debug_snapshot to check state.",
            "into" => "Step into failed. There may be no call on the current line, or the program terminated.",
            "out" => "Step out failed. You may already be at the top of the call stack.",
            _ => "The step operation failed. Use debug_snapshot to check the program state.",
        };
        Self::new(
            ErrorCode::StepFailed,
            format!("step {step_type} failed: {cause}"),
        )
        .with_hint(hint)
        .with_detail("stepType", json!(step_type))
    }

    /// No threads are reported by the adapter.
    pub fn no_threads() -> Self {
        Self::new(ErrorCode::NoThreads, "no threads available").with_hint(
            "The program may have terminated or not started yet. Use debug_snapshot to check \
             the session status.",
        )
    }

    /// Map a DAP-layer error to its tool-boundary category.
    pub fn from_dap(err: DapError) -> Self {
        match err {
            DapError::SessionNotFound(id) => Self::session_not_found(&id),
            DapError::SessionLimitReached(max) => Self::session_limit_reached(max),
            DapError::Timeout { operation, seconds } => Self::dap_timeout(&operation, seconds),
            other => Self::dap_protocol_error(
                other.to_string(),
                "The adapter rejected or mishandled the request. Use debug_snapshot to check state.",
            ),
        }
    }

    /// Map a launch-configuration error to its tool-boundary category.
    pub fn from_launch_config(err: LaunchConfigError) -> Self {
        match err {
            LaunchConfigError::MissingInputs(inputs) => Self::missing_inputs(&inputs),
            LaunchConfigError::ConfigurationNotFound(name) => Self::config_not_found(&name, &[]),
            other => Self::config_invalid(other.to_string()),
        }
    }
}
