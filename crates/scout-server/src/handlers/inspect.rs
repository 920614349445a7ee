//! Inspection tools: snapshot, evaluate, and the thin per-request wrappers.

use serde_json::{json, Map, Value};

use scout_dap::DapClient;

use crate::error::DebugError;
use crate::request::ToolRequest;
use crate::server::DebugServer;

/// Default stack depth captured by a snapshot.
const SNAPSHOT_STACK_DEPTH: i64 = 10;
/// Scopes are collected for this many top frames.
const SNAPSHOT_SCOPE_FRAMES: usize = 3;
/// Variables captured per scope.
const SNAPSHOT_VARIABLE_LIMIT: i64 = 50;

/// Pick the top frame of the first thread, for handlers that accept an
/// optional frameId.
pub(super) async fn auto_frame_id(client: &DapClient) -> i64 {
    let Ok(threads) = client.threads().await else {
        return 0;
    };
    let Some(first) = threads.first() else {
        return 0;
    };
    match client.stack_trace(first.id, 0, 1).await {
        Ok((frames, _)) if !frames.is_empty() => frames[0].id,
        _ => 0,
    }
}

impl DebugServer {
    /// One call returning threads, per-thread stacks, scopes for the top
    /// frames, and variables for cheap scopes — the token-optimized
    /// primitive the simple wrappers decompose.
    pub(crate) async fn handle_snapshot(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let (session, client) = self.session_client(request).await?;

        let max_stack_depth = request.opt_i64("maxStackDepth").unwrap_or(SNAPSHOT_STACK_DEPTH);
        let expand_variables = request.bool_or("expandVariables", true);
        let target_thread = request.opt_i64("threadId");

        let threads = client
            .threads()
            .await
            .map_err(|e| DebugError::from_dap(e).with_detail("operation", json!("threads")))?;

        let mut threads_info = Vec::new();
        let mut stacks = Map::new();
        let mut scopes_map = Map::new();
        let mut variables_map = Map::new();

        for thread in &threads {
            if let Some(target) = target_thread {
                if thread.id != target {
                    continue;
                }
            }
            threads_info.push(json!({"id": thread.id, "name": thread.name}));

            // A thread that cannot be walked is skipped, not fatal.
            let Ok((frames, _)) = client.stack_trace(thread.id, 0, max_stack_depth).await else {
                continue;
            };

            let mut frames_list = Vec::with_capacity(frames.len());
            for (index, frame) in frames.iter().enumerate() {
                let mut frame_value = json!({
                    "id": frame.id,
                    "name": frame.name,
                    "line": frame.line,
                });
                if let Some(source) = &frame.source {
                    frame_value["source"] = json!({
                        "path": source.path,
                        "name": source.name,
                    });
                }
                frames_list.push(frame_value);

                if index >= SNAPSHOT_SCOPE_FRAMES {
                    continue;
                }
                let Ok(frame_scopes) = client.scopes(frame.id).await else {
                    continue;
                };

                let mut scopes_list = Vec::with_capacity(frame_scopes.len());
                for scope in &frame_scopes {
                    scopes_list.push(json!({
                        "name": scope.name,
                        "variablesReference": scope.variables_reference,
                    }));

                    if expand_variables && scope.variables_reference > 0 && !scope.expensive {
                        if let Ok(vars) = client
                            .variables(
                                scope.variables_reference,
                                None,
                                Some(0),
                                Some(SNAPSHOT_VARIABLE_LIMIT),
                            )
                            .await
                        {
                            let vars_list: Vec<Value> = vars
                                .iter()
                                .map(|v| {
                                    json!({
                                        "name": v.name,
                                        "value": v.value,
                                        "type": v.variable_type,
                                        "variablesReference": v.variables_reference,
                                    })
                                })
                                .collect();
                            variables_map
                                .insert(scope.variables_reference.to_string(), json!(vars_list));
                        }
                    }
                }
                scopes_map.insert(frame.id.to_string(), json!(scopes_list));
            }
            stacks.insert(thread.id.to_string(), json!(frames_list));
        }

        let mut snapshot = json!({
            "sessionId": session.id,
            "status": session.status().await.as_str(),
            "threads": threads_info,
            "stacks": stacks,
            "scopes": scopes_map,
        });
        if expand_variables {
            snapshot["variables"] = Value::Object(variables_map);
        }
        Ok(snapshot)
    }

    /// Evaluate a single expression or a batch. In batch mode each
    /// per-expression failure is reported inline rather than aborting the
    /// batch; an empty batch yields an empty result.
    pub(crate) async fn handle_evaluate(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        if !self.config().can_evaluate() {
            return Err(DebugError::permission_denied("evaluate", self.mode_str()));
        }

        let (_session, client) = self.session_client(request).await?;

        if let Some(expressions) =
            request.json_str::<Vec<String>>("expressions", r#"["x", "y", "len(arr)"]"#)?
        {
            let frame_id = match request.opt_i64("frameId") {
                Some(id) => id,
                None => auto_frame_id(&client).await,
            };

            let mut evaluations = Vec::with_capacity(expressions.len());
            for expression in &expressions {
                match client.evaluate(expression, Some(frame_id), Some("watch")).await {
                    Ok(result) => evaluations.push(json!({
                        "expression": expression,
                        "result": result.result,
                        "type": result.result_type,
                        "variablesReference": result.variables_reference,
                    })),
                    Err(e) => evaluations.push(json!({
                        "expression": expression,
                        "error": e.to_string(),
                    })),
                }
            }

            return Ok(json!({
                "evaluations": evaluations,
                "frameId": frame_id,
            }));
        }

        let expression = request.require_str(
            "expression",
            "Provide either 'expression' for a single evaluation (e.g. \"x + y\") or \
             'expressions' for batch evaluation (e.g. [\"x\", \"y\"]).",
        )?;
        let frame_id = request.opt_i64("frameId").unwrap_or(0);
        let context = request.opt_str("context").unwrap_or("watch");

        let result = client
            .evaluate(expression, Some(frame_id), Some(context))
            .await
            .map_err(|e| DebugError::evaluation_failed(expression, &e))?;

        Ok(json!({
            "result": result.result,
            "type": result.result_type,
            "variablesReference": result.variables_reference,
        }))
    }

    /// List debuggee threads.
    pub(crate) async fn handle_threads(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let (_session, client) = self.session_client(request).await?;
        let threads = client.threads().await.map_err(DebugError::from_dap)?;
        let list: Vec<Value> = threads
            .iter()
            .map(|t| json!({"id": t.id, "name": t.name}))
            .collect();
        Ok(json!({ "threads": list }))
    }

    /// Stack trace for one thread.
    pub(crate) async fn handle_stack(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let (_session, client) = self.session_client(request).await?;
        let thread_id = request.require_i64("threadId", "Provide the threadId to inspect.")?;
        let start_frame = request.opt_i64("startFrame").unwrap_or(0);
        let levels = request.opt_i64("levels").unwrap_or(20);

        let (frames, total_frames) = client
            .stack_trace(thread_id, start_frame, levels)
            .await
            .map_err(DebugError::from_dap)?;

        let list: Vec<Value> = frames
            .iter()
            .map(|f| {
                let mut frame = json!({"id": f.id, "name": f.name, "line": f.line});
                if f.column > 0 {
                    frame["column"] = json!(f.column);
                }
                if let Some(source) = &f.source {
                    frame["source"] = json!({
                        "name": source.name,
                        "path": source.path,
                        "sourceReference": source.source_reference,
                    });
                }
                frame
            })
            .collect();

        Ok(json!({
            "stackFrames": list,
            "totalFrames": total_frames,
        }))
    }

    /// Scopes of a stack frame.
    pub(crate) async fn handle_scopes(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let (_session, client) = self.session_client(request).await?;
        let frame_id = request.require_i64("frameId", "Provide the frameId from debug_stack.")?;

        let scopes = client.scopes(frame_id).await.map_err(DebugError::from_dap)?;
        let list: Vec<Value> = scopes
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "variablesReference": s.variables_reference,
                    "expensive": s.expensive,
                    "namedVariables": s.named_variables,
                    "indexedVariables": s.indexed_variables,
                })
            })
            .collect();
        Ok(json!({ "scopes": list }))
    }

    /// Expand a variables reference.
    pub(crate) async fn handle_variables(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let (_session, client) = self.session_client(request).await?;
        let variables_reference = request.require_i64(
            "variablesReference",
            "Provide the variablesReference from debug_scopes or a parent variable.",
        )?;
        let filter = request.opt_str("filter");
        let start = request.opt_i64("start");
        let count = request.opt_i64("count");

        let variables = client
            .variables(variables_reference, filter, start, count)
            .await
            .map_err(DebugError::from_dap)?;

        let list: Vec<Value> = variables
            .iter()
            .map(|v| {
                json!({
                    "name": v.name,
                    "value": v.value,
                    "type": v.variable_type,
                    "variablesReference": v.variables_reference,
                    "namedVariables": v.named_variables,
                    "indexedVariables": v.indexed_variables,
                })
            })
            .collect();
        Ok(json!({ "variables": list }))
    }

    /// Fetch source content by path or reference.
    pub(crate) async fn handle_source(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let (_session, client) = self.session_client(request).await?;
        let source_reference = request.opt_i64("sourceReference").unwrap_or(0);
        let path = request.opt_str("path");

        let body = client
            .source(source_reference, path)
            .await
            .map_err(DebugError::from_dap)?;
        Ok(json!({
            "content": body.content,
            "mimeType": body.mime_type,
        }))
    }

    /// List loaded modules.
    pub(crate) async fn handle_modules(&self, request: &ToolRequest) -> Result<Value, DebugError> {
        let (_session, client) = self.session_client(request).await?;
        let start = request.opt_i64("startModule").unwrap_or(0);
        let count = request.opt_i64("moduleCount").unwrap_or(100);

        let (modules, total) = client
            .modules(start, count)
            .await
            .map_err(DebugError::from_dap)?;
        let list: Vec<Value> = modules
            .iter()
            .map(|m| {
                json!({
                    "id": m.id,
                    "name": m.name,
                    "path": m.path,
                    "version": m.version,
                })
            })
            .collect();
        Ok(json!({
            "modules": list,
            "totalModules": total,
        }))
    }
}
