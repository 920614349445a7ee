//! DAP protocol message types.
//!
//! Implements the Debug Adapter Protocol message structures with serde
//! Serialize/Deserialize support. Launch and attach arguments are kept as
//! raw JSON maps because their shape is adapter-specific; the drivers own
//! that policy.

use serde::{Deserialize, Serialize};

use crate::error::DapError;

// ---------------------------------------------------------------------------
// Message envelope
// ---------------------------------------------------------------------------

/// A DAP request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Sequence number.
    pub seq: i64,
    /// Always "request".
    #[serde(rename = "type")]
    pub message_type: String,
    /// The command to execute.
    pub command: String,
    /// Command arguments (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

impl Request {
    /// Build a request for `command` with the given sequence number.
    pub fn new(seq: i64, command: &str, arguments: Option<serde_json::Value>) -> Self {
        Self {
            seq,
            message_type: "request".into(),
            command: command.into(),
            arguments,
        }
    }
}

/// A DAP response message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Sequence number.
    pub seq: i64,
    /// Always "response".
    #[serde(rename = "type")]
    pub message_type: String,
    /// Sequence number of the corresponding request.
    pub request_seq: i64,
    /// Whether the request was successful.
    pub success: bool,
    /// The command this response is for.
    pub command: String,
    /// Error message if `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response body (command-specific).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Response {
    /// Deserialize the body into a typed struct, checking success and
    /// command first.
    ///
    /// A `success: false` response becomes [`DapError::RequestFailed`]; a
    /// response for a different command becomes
    /// [`DapError::UnexpectedResponse`].
    pub fn into_body<T: serde::de::DeserializeOwned>(self, command: &str) -> Result<T, DapError> {
        self.check(command)?;
        // Some adapters omit bodies that are all-optional (e.g. continue);
        // an absent body parses as an empty object.
        let body = self
            .body
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        serde_json::from_value(body)
            .map_err(|e| DapError::InvalidMessage(format!("{command} response body: {e}")))
    }

    /// Check that this response answers `command` and succeeded.
    pub fn check(&self, command: &str) -> Result<(), DapError> {
        if self.command != command {
            return Err(DapError::UnexpectedResponse {
                expected: command.into(),
                actual: self.command.clone(),
            });
        }
        if !self.success {
            return Err(DapError::RequestFailed {
                command: command.into(),
                message: self
                    .message
                    .clone()
                    .unwrap_or_else(|| "no error message".into()),
            });
        }
        Ok(())
    }
}

/// A DAP event message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sequence number.
    pub seq: i64,
    /// Always "event".
    #[serde(rename = "type")]
    pub message_type: String,
    /// The event type.
    pub event: String,
    /// Event body (event-specific).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// A decoded incoming message, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum DapMessage {
    /// A response to one of our requests.
    Response(Response),
    /// An event from the adapter.
    Event(Event),
    /// A reverse request from the adapter (e.g. runInTerminal).
    Request(Request),
}

/// Classify a raw JSON value as a DAP message.
pub fn classify(value: serde_json::Value) -> Result<DapMessage, DapError> {
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| DapError::InvalidMessage("message has no type field".into()))?;

    match kind {
        "response" => serde_json::from_value(value)
            .map(DapMessage::Response)
            .map_err(|e| DapError::InvalidMessage(format!("bad response: {e}"))),
        "event" => serde_json::from_value(value)
            .map(DapMessage::Event)
            .map_err(|e| DapError::InvalidMessage(format!("bad event: {e}"))),
        "request" => serde_json::from_value(value)
            .map(DapMessage::Request)
            .map_err(|e| DapError::InvalidMessage(format!("bad request: {e}"))),
        other => Err(DapError::InvalidMessage(format!(
            "unknown message type: {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Initialize
// ---------------------------------------------------------------------------

/// Arguments for the `initialize` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequestArguments {
    /// ID of the client.
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Human-readable name of the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// ID of the debug adapter.
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    /// Client locale (e.g. "en-US").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Whether lines are 1-based.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_start_at1: Option<bool>,
    /// Whether columns are 1-based.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns_start_at1: Option<bool>,
    /// Path format: "path" or "uri".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_format: Option<String>,
    /// Whether the client accepts variable type information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_variable_type: Option<bool>,
    /// Whether the client supports variable paging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_variable_paging: Option<bool>,
    /// Whether the client supports the `runInTerminal` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_run_in_terminal_request: Option<bool>,
}

/// Capabilities returned by the debug adapter in the `initialize` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Capabilities {
    /// The adapter supports the `configurationDone` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_configuration_done_request: Option<bool>,
    /// The adapter supports conditional breakpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_conditional_breakpoints: Option<bool>,
    /// The adapter supports hit-count conditional breakpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_hit_conditional_breakpoints: Option<bool>,
    /// The adapter supports function breakpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_function_breakpoints: Option<bool>,
    /// The adapter supports `evaluate` for hovers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_evaluate_for_hovers: Option<bool>,
    /// The adapter supports setting variable values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_set_variable: Option<bool>,
    /// The adapter supports the `modules` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_modules_request: Option<bool>,
    /// The adapter supports the `terminate` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_terminate_request: Option<bool>,
}

// ---------------------------------------------------------------------------
// Runtime types
// ---------------------------------------------------------------------------

/// A thread in the debuggee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Unique identifier of the thread.
    pub id: i64,
    /// Human-readable name of the thread.
    pub name: String,
}

/// A source location.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Short name of the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// File system path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Source reference (for sources without a file path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<i64>,
}

/// A stack frame in the call stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Unique identifier for the stack frame.
    pub id: i64,
    /// Name of the frame (function name).
    pub name: String,
    /// Source location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Line within the source.
    pub line: i64,
    /// Column within the source.
    #[serde(default)]
    pub column: i64,
}

/// A scope (container for variables).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Name of the scope (e.g. "Locals", "Globals").
    pub name: String,
    /// Variables reference for this scope.
    pub variables_reference: i64,
    /// Number of named variables, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    /// Number of indexed variables, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
    /// Whether fetching this scope is expensive.
    #[serde(default)]
    pub expensive: bool,
}

/// A variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Name of the variable.
    pub name: String,
    /// Value of the variable as a string.
    pub value: String,
    /// Type of the variable.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<String>,
    /// If > 0, the variable has children accessed via this reference.
    #[serde(default)]
    pub variables_reference: i64,
    /// Number of named child variables, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    /// Number of indexed child variables, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
}

/// A loaded module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Unique identifier (number or string per the DAP spec).
    pub id: serde_json::Value,
    /// Name of the module.
    pub name: String,
    /// File system path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Module version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ---------------------------------------------------------------------------
// Breakpoints
// ---------------------------------------------------------------------------

/// A source breakpoint (client-side request).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakpoint {
    /// The source line of the breakpoint.
    pub line: i64,
    /// Optional column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    /// Condition expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Hit condition expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_condition: Option<String>,
    /// Log message (logpoint).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,
}

/// A function breakpoint (client-side request).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionBreakpoint {
    /// Name of the function.
    pub name: String,
    /// Condition expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// A breakpoint as verified by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointInfo {
    /// Unique identifier for the breakpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Whether the breakpoint has been verified.
    pub verified: bool,
    /// Optional message (e.g. why verification failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Actual source of the breakpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Actual line of the breakpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
}

/// Arguments for the `setBreakpoints` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsArguments {
    /// The source to set breakpoints in. The request is total: the given
    /// set replaces all breakpoints previously set for this source.
    pub source: Source,
    /// Breakpoints to set.
    pub breakpoints: Vec<SourceBreakpoint>,
}

/// Arguments for the `setFunctionBreakpoints` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFunctionBreakpointsArguments {
    /// Function breakpoints to set (total replacement).
    pub breakpoints: Vec<FunctionBreakpoint>,
}

/// Response body for `setBreakpoints` / `setFunctionBreakpoints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointsResponseBody {
    /// Information about the breakpoints, in request order.
    pub breakpoints: Vec<BreakpointInfo>,
}

// ---------------------------------------------------------------------------
// Inspection request/response bodies
// ---------------------------------------------------------------------------

/// Response body for `threads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadsResponseBody {
    /// All threads of the debuggee.
    pub threads: Vec<Thread>,
}

/// Arguments for the `stackTrace` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceArguments {
    /// The thread to inspect.
    pub thread_id: i64,
    /// Index of the first frame to return.
    pub start_frame: i64,
    /// Maximum number of frames to return (0 = all).
    pub levels: i64,
}

/// Response body for `stackTrace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceResponseBody {
    /// The requested frames.
    pub stack_frames: Vec<StackFrame>,
    /// Total number of frames available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<i64>,
}

/// Arguments for the `scopes` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesArguments {
    /// The frame to inspect.
    pub frame_id: i64,
}

/// Response body for `scopes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesResponseBody {
    /// The frame's scopes.
    pub scopes: Vec<Scope>,
}

/// Arguments for the `variables` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesArguments {
    /// The variables reference to expand.
    pub variables_reference: i64,
    /// Filter: "named" or "indexed".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Index of the first variable to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    /// Maximum number of variables to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

/// Response body for `variables`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesResponseBody {
    /// The child variables.
    pub variables: Vec<Variable>,
}

/// Arguments for the `evaluate` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    /// The expression to evaluate.
    pub expression: String,
    /// Stack frame in whose context to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    /// Context: "watch", "repl", "hover", "clipboard".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Response body for `evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponseBody {
    /// The result string.
    pub result: String,
    /// Type of the result.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    /// If > 0, the result has children.
    #[serde(default)]
    pub variables_reference: i64,
}

/// Arguments for the `setVariable` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableArguments {
    /// Container of the variable.
    pub variables_reference: i64,
    /// Name of the variable to set.
    pub name: String,
    /// New value expression.
    pub value: String,
}

/// Response body for `setVariable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableResponseBody {
    /// The new value as rendered by the adapter.
    pub value: String,
    /// Type of the new value.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// If > 0, the new value has children.
    #[serde(default)]
    pub variables_reference: i64,
}

/// Arguments for the `source` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceArguments {
    /// The source to fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Source reference (legacy duplicate of source.sourceReference).
    pub source_reference: i64,
}

/// Response body for `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResponseBody {
    /// The source text.
    pub content: String,
    /// MIME type of the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Arguments for the `modules` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulesArguments {
    /// Index of the first module to return.
    pub start_module: i64,
    /// Maximum number of modules to return (0 = all).
    pub module_count: i64,
}

/// Response body for `modules`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulesResponseBody {
    /// The requested modules.
    pub modules: Vec<Module>,
    /// Total number of modules available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_modules: Option<i64>,
}

// ---------------------------------------------------------------------------
// Flow control
// ---------------------------------------------------------------------------

/// Arguments for the `continue` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueArguments {
    /// The thread to continue.
    pub thread_id: i64,
}

/// Response body for `continue`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinueResponseBody {
    /// Whether all threads were continued.
    pub all_threads_continued: bool,
}

/// Arguments for `next`, `stepIn`, `stepOut`, and `pause`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadArguments {
    /// The thread to operate on.
    pub thread_id: i64,
}

/// Arguments for the `disconnect` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
    /// Whether to terminate the debuggee.
    pub terminate_debuggee: bool,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Body of the `stopped` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    /// The reason for the stop ("breakpoint", "step", "exception", ...).
    pub reason: String,
    /// Description of the stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Thread that stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    /// Whether all threads are stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_threads_stopped: Option<bool>,
}
