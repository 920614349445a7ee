//! Control tools: breakpoints, stepping, execution, and the run-to-line
//! composite.

use serde_json::{json, Value};
use tokio::time::Duration;

use scout_dap::{Source, SourceBreakpoint, FunctionBreakpoint, SessionStatus};

use super::inspect::auto_frame_id;
use crate::error::DebugError;
use crate::request::ToolRequest;
use crate::server::DebugServer;

/// How long run-to-line waits for the program to reach the breakpoint.
const RUN_TO_LINE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(serde::Deserialize)]
struct BreakpointParam {
    line: i64,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default, rename = "hitCondition")]
    hit_condition: Option<String>,
    #[serde(default, rename = "logMessage")]
    log_message: Option<String>,
}

#[derive(serde::Deserialize)]
struct FunctionBreakpointParam {
    name: String,
    #[serde(default)]
    condition: Option<String>,
}

impl DebugServer {
    /// Replace the complete breakpoint set for one source file. Zero
    /// breakpoints clears the file; the DAP contract is total replacement
    /// and that is surfaced honestly here.
    pub(crate) async fn handle_breakpoints(
        &self,
        request: &ToolRequest,
    ) -> Result<Value, DebugError> {
        let (_session, client) = self.session_client(request).await?;
        let path = request.require_str("path", "Provide the source file path for the breakpoints.")?;
        let params: Vec<BreakpointParam> = request
            .json_str(
                "breakpoints",
                r#"[{"line": 10}, {"line": 20, "condition": "x > 5"}]"#,
            )?
            .ok_or_else(|| {
                DebugError::missing_parameter(
                    "breakpoints",
                    "Provide a JSON array of breakpoints, e.g. [{\"line\": 10}]. An empty array \
                     clears all breakpoints for the file.",
                )
            })?;

        let breakpoints: Vec<SourceBreakpoint> = params
            .iter()
            .map(|bp| SourceBreakpoint {
                line: bp.line,
                column: None,
                condition: bp.condition.clone(),
                hit_condition: bp.hit_condition.clone(),
                log_message: bp.log_message.clone(),
            })
            .collect();

        let source = Source {
            name: None,
            path: Some(path.into()),
            source_reference: None,
        };
        let verified = client
            .set_breakpoints(source, breakpoints)
            .await
            .map_err(|e| DebugError::breakpoint_failed(path, &e))?;

        let list: Vec<Value> = verified
            .iter()
            .map(|bp| {
                let mut entry = json!({
                    "id": bp.id,
                    "verified": bp.verified,
                    "line": bp.line,
                });
                if let Some(message) = &bp.message {
                    entry["message"] = json!(message);
                }
                entry
            })
            .collect();
        Ok(json!({ "breakpoints": list }))
    }

    /// Replace the function breakpoint set.
    pub(crate) async fn handle_function_breakpoints(
        &self,
        request: &ToolRequest,
    ) -> Result<Value, DebugError> {
        let (_session, client) = self.session_client(request).await?;
        let params: Vec<FunctionBreakpointParam> = request
            .json_str("breakpoints", r#"[{"name": "main.run"}]"#)?
            .ok_or_else(|| {
                DebugError::missing_parameter(
                    "breakpoints",
                    "Provide a JSON array of function breakpoints, e.g. [{\"name\": \"main\"}].",
                )
            })?;

        let breakpoints: Vec<FunctionBreakpoint> = params
            .iter()
            .map(|bp| FunctionBreakpoint {
                name: bp.name.clone(),
                condition: bp.condition.clone(),
            })
            .collect();

        let verified = client
            .set_function_breakpoints(breakpoints)
            .await
            .map_err(|e| DebugError::breakpoint_failed("function breakpoints", &e))?;

        let list: Vec<Value> = verified
            .iter()
            .map(|bp| {
                let mut entry = json!({"id": bp.id, "verified": bp.verified});
                if let Some(message) = &bp.message {
                    entry["message"] = json!(message);
                }
                entry
            })
            .collect();
        Ok(json!({ "breakpoints": list }))
    }

    /// Step over, into, or out, selected by the `type` parameter.
    pub(crate) async fn handle_step(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let (_session, client) = self.session_client(request).await?;
        let thread_id = request.require_i64("threadId", "Provide the threadId to step.")?;
        let step_type = request.require_str("type", "Provide the step type: 'over', 'into', or 'out'.")?;

        match step_type {
            "over" => client
                .next(thread_id)
                .await
                .map_err(|e| DebugError::step_failed("over", &e))?,
            "into" => client
                .step_in(thread_id)
                .await
                .map_err(|e| DebugError::step_failed("into", &e))?,
            "out" => client
                .step_out(thread_id)
                .await
                .map_err(|e| DebugError::step_failed("out", &e))?,
            other => {
                return Err(DebugError::invalid_parameter(
                    "type",
                    &json!(other),
                    "'over', 'into', or 'out'",
                ))
            }
        }

        Ok(json!({"status": "stepped", "type": step_type}))
    }

    /// Resume execution.
    pub(crate) async fn handle_continue(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let (session, client) = self.session_client(request).await?;
        let thread_id = request.require_i64("threadId", "Provide the threadId to continue.")?;

        let all_continued = client
            .continue_execution(thread_id)
            .await
            .map_err(DebugError::from_dap)?;

        self.manager()
            .update_status(&session.id, SessionStatus::Running)
            .await
            .map_err(DebugError::from_dap)?;

        Ok(json!({ "allThreadsContinued": all_continued }))
    }

    /// Pause a running thread.
    pub(crate) async fn handle_pause(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let (session, client) = self.session_client(request).await?;
        let thread_id = request.require_i64("threadId", "Provide the threadId to pause.")?;

        client.pause(thread_id).await.map_err(DebugError::from_dap)?;

        self.manager()
            .update_status(&session.id, SessionStatus::Stopped)
            .await
            .map_err(DebugError::from_dap)?;

        Ok(json!({"status": "paused"}))
    }

    /// Modify a variable value.
    pub(crate) async fn handle_set_variable(
        &self,
        request: &ToolRequest,
    ) -> Result<Value, DebugError> {
        if !self.config().can_modify_variables() {
            return Err(DebugError::permission_denied("modify", self.mode_str()));
        }

        let (_session, client) = self.session_client(request).await?;
        let variables_reference = request.require_i64(
            "variablesReference",
            "Provide the variablesReference containing the variable (from debug_scopes).",
        )?;
        let name = request.require_str("name", "Provide the variable name to modify.")?;
        let value = request.require_str("value", "Provide the new value expression.")?;

        let result = client
            .set_variable(variables_reference, name, value)
            .await
            .map_err(DebugError::from_dap)?;

        Ok(json!({
            "value": result.value,
            "type": result.value_type,
            "variablesReference": result.variables_reference,
        }))
    }

    /// Run to a specific line: set a breakpoint there, continue until the
    /// stop, and return a compact snapshot of where execution landed.
    pub(crate) async fn handle_run_to_line(
        &self,
        request: &ToolRequest,
    ) -> Result<Value, DebugError> {
        let (session, client) = self.session_client(request).await?;
        let path = request.require_str("path", "Provide the source file path to run to.")?;
        let line = request.require_i64("line", "Provide the line number to run to.")?;

        let source = Source {
            name: None,
            path: Some(path.into()),
            source_reference: None,
        };
        let breakpoints = client
            .set_breakpoints(
                source,
                vec![SourceBreakpoint {
                    line,
                    column: None,
                    condition: None,
                    hit_condition: None,
                    log_message: None,
                }],
            )
            .await
            .map_err(|e| DebugError::breakpoint_failed(path, &e))?;

        if breakpoints.first().map(|bp| bp.verified) != Some(true) {
            return Err(DebugError::breakpoint_failed(
                path,
                &"could not set breakpoint at the specified line",
            ));
        }
        let stopped_line = breakpoints[0].line.unwrap_or(line);

        let threads = client.threads().await.map_err(|e| {
            DebugError::dap_protocol_error(
                format!("failed to get threads: {e}"),
                "The program may have terminated. Use debug_snapshot to check session status.",
            )
        })?;
        let first_thread = threads.first().ok_or_else(DebugError::no_threads)?;

        let stopped = client
            .continue_and_wait(first_thread.id, RUN_TO_LINE_TIMEOUT)
            .await
            .map_err(|e| DebugError::from_dap(e).with_detail("operation", json!("runToLine")))?;

        self.manager()
            .update_status(&session.id, SessionStatus::Stopped)
            .await
            .map_err(DebugError::from_dap)?;

        let mut snapshot = json!({
            "sessionId": session.id,
            "status": "stopped",
            "stoppedAt": stopped_line,
            "reason": stopped.reason,
            "path": path,
        });

        // Compact context around the stop: a short stack and the locals of
        // the top frame. Failures here degrade the snapshot, not the tool.
        if let Ok((frames, _)) = client.stack_trace(stopped.thread_id, 0, 5).await {
            if !frames.is_empty() {
                let stack: Vec<Value> = frames
                    .iter()
                    .map(|f| {
                        let mut frame = json!({"id": f.id, "name": f.name, "line": f.line});
                        if let Some(source) = &f.source {
                            frame["source"] = json!(source.path);
                        }
                        frame
                    })
                    .collect();
                snapshot["stack"] = json!(stack);

                if let Ok(scopes) = client.scopes(frames[0].id).await {
                    for scope in scopes {
                        if scope.name == "Locals" && scope.variables_reference > 0 {
                            if let Ok(vars) = client
                                .variables(scope.variables_reference, None, Some(0), Some(20))
                                .await
                            {
                                let locals: Vec<Value> = vars
                                    .iter()
                                    .map(|v| {
                                        json!({
                                            "name": v.name,
                                            "value": v.value,
                                            "type": v.variable_type,
                                        })
                                    })
                                    .collect();
                                snapshot["locals"] = json!(locals);
                            }
                            break;
                        }
                    }
                }
            }
        }

        Ok(snapshot)
    }

    /// Execute a native debugger CLI command. Only valid for LLDB/GDB
    /// sessions; the backtick prefix forces lldb-dap's command mode.
    pub(crate) async fn handle_execute_command(
        &self,
        request: &ToolRequest,
    ) -> Result<Value, DebugError> {
        let (session, client) = self.session_client(request).await?;

        if !session.language.is_native() {
            return Err(DebugError::invalid_parameter(
                "sessionId",
                &json!(session.id),
                format!(
                    "a GDB/LLDB session (c, cpp, rust); this session is {}. Use debug_evaluate \
                     for Go/Python/JavaScript.",
                    session.language
                )
                .as_str(),
            ));
        }

        let command = request.require_str("command", "Provide the debugger CLI command to run.")?;
        let frame_id = match request.opt_i64("frameId") {
            Some(id) => id,
            None => auto_frame_id(&client).await,
        };

        let escaped = format!("`{command}");
        let result = client
            .evaluate(&escaped, Some(frame_id), Some("repl"))
            .await
            .map_err(|e| DebugError::evaluation_failed(command, &e))?;

        Ok(json!({
            "output": result.result,
            "type": result.result_type,
            "variablesReference": result.variables_reference,
        }))
    }
}
