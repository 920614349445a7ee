//! End-to-end tool-handler tests against a scripted in-process adapter.
//!
//! The fake adapter speaks real framed DAP over a duplex pipe, including the
//! deferred launch response (no answer until after configurationDone), so
//! the full launch dance and the inspection/control tools are exercised
//! without any real debugger installed.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use scout_adapters::{Adapter, AdapterConnection, Registry, SpawnedAdapter, TransportKind};
use scout_config::{CapabilityMode, Config};
use scout_dap::{AdapterProcess, DapClient, DapTransport, Language};
use scout_server::{DebugServer, ToolRequest};

/// A driver whose "adapter" is an in-process task scripted to behave like a
/// typical debugger: deferred launch response, one thread stopped at a
/// breakpoint, locals x=10 and y=20.
struct FakeDriver {
    language: Language,
    source_path: String,
}

impl FakeDriver {
    fn new(language: Language, source_path: &str) -> Self {
        Self {
            language,
            source_path: source_path.into(),
        }
    }
}

impl Adapter for FakeDriver {
    fn language(&self) -> Language {
        self.language
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    fn spawn(&self, _program: &str, _args: &Value) -> Result<SpawnedAdapter, scout_adapters::AdapterError> {
        let (client_end, adapter_end) = tokio::io::duplex(64 * 1024);
        let (cr, cw) = tokio::io::split(client_end);
        let (ar, aw) = tokio::io::split(adapter_end);

        let source_path = self.source_path.clone();
        tokio::spawn(async move {
            run_fake_adapter(
                DapTransport::from_parts(Box::new(ar), Box::new(aw)),
                source_path,
            )
            .await;
        });

        // A real (inert) child stands in for the adapter process so the
        // group-kill cleanup path runs for real.
        let mut cmd = tokio::process::Command::new("sleep");
        cmd.arg("60");
        #[cfg(unix)]
        cmd.process_group(0);
        let child = cmd.spawn().map_err(|e| scout_adapters::AdapterError::SpawnFailed {
            adapter: "sleep".into(),
            source: e,
        })?;

        let client = DapClient::new(DapTransport::from_parts(Box::new(cr), Box::new(cw)));
        Ok(SpawnedAdapter {
            connection: AdapterConnection::Stdio(client),
            process: AdapterProcess::new(child),
        })
    }

    fn build_launch_args(&self, program: &str, _args: &Value) -> Value {
        json!({"program": program})
    }

    fn build_attach_args(&self, args: &Value) -> Value {
        args.clone()
    }
}

async fn respond(transport: &DapTransport, request: &Value, body: Value) {
    let reply = json!({
        "seq": 10_000 + request["seq"].as_i64().unwrap_or(0),
        "type": "response",
        "request_seq": request["seq"],
        "success": true,
        "command": request["command"],
        "body": body,
    });
    let _ = transport.send(&reply).await;
}

async fn respond_error(transport: &DapTransport, request: &Value, message: &str) {
    let reply = json!({
        "seq": 10_000 + request["seq"].as_i64().unwrap_or(0),
        "type": "response",
        "request_seq": request["seq"],
        "success": false,
        "command": request["command"],
        "message": message,
    });
    let _ = transport.send(&reply).await;
}

async fn emit(transport: &DapTransport, event: &str, body: Value) {
    let message = json!({
        "seq": 99_000,
        "type": "event",
        "event": event,
        "body": body,
    });
    let _ = transport.send(&message).await;
}

async fn run_fake_adapter(transport: DapTransport, source_path: String) {
    let mut pending_launch: Option<Value> = None;

    loop {
        let Ok(message) = transport.receive().await else {
            return;
        };
        let command = message["command"].as_str().unwrap_or_default().to_string();

        match command.as_str() {
            "initialize" => {
                respond(
                    &transport,
                    &message,
                    json!({"supportsConfigurationDoneRequest": true, "supportsSetVariable": true}),
                )
                .await;
            }
            "launch" => {
                // Deferred: the response is held until configurationDone.
                emit(&transport, "initialized", json!({})).await;
                pending_launch = Some(message);
            }
            "configurationDone" => {
                respond(&transport, &message, json!({})).await;
                if let Some(launch) = pending_launch.take() {
                    respond(&transport, &launch, json!({})).await;
                }
            }
            "threads" => {
                respond(
                    &transport,
                    &message,
                    json!({"threads": [{"id": 1, "name": "main"}]}),
                )
                .await;
            }
            "stackTrace" => {
                respond(
                    &transport,
                    &message,
                    json!({
                        "stackFrames": [{
                            "id": 100,
                            "name": "main",
                            "line": 42,
                            "column": 1,
                            "source": {"name": "main", "path": source_path},
                        }],
                        "totalFrames": 1,
                    }),
                )
                .await;
            }
            "scopes" => {
                respond(
                    &transport,
                    &message,
                    json!({"scopes": [
                        {"name": "Locals", "variablesReference": 200, "expensive": false},
                        {"name": "Globals", "variablesReference": 201, "expensive": true},
                    ]}),
                )
                .await;
            }
            "variables" => {
                respond(
                    &transport,
                    &message,
                    json!({"variables": [
                        {"name": "x", "value": "10", "type": "int", "variablesReference": 0},
                        {"name": "y", "value": "20", "type": "int", "variablesReference": 0},
                    ]}),
                )
                .await;
            }
            "evaluate" => {
                let expression = message["arguments"]["expression"].as_str().unwrap_or("");
                let result = match expression {
                    "x" => Some("10"),
                    "y" => Some("20"),
                    "x+y" => Some("30"),
                    other if other.starts_with('`') => Some("frame #0: main"),
                    _ => None,
                };
                match result {
                    Some(value) => {
                        respond(
                            &transport,
                            &message,
                            json!({"result": value, "type": "int", "variablesReference": 0}),
                        )
                        .await;
                    }
                    None => respond_error(&transport, &message, "invalid expression").await,
                }
            }
            "setBreakpoints" => {
                let verified: Vec<Value> = message["arguments"]["breakpoints"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .enumerate()
                    .map(|(i, bp)| json!({"id": i + 1, "verified": true, "line": bp["line"]}))
                    .collect();
                respond(&transport, &message, json!({"breakpoints": verified})).await;
            }
            "continue" => {
                respond(&transport, &message, json!({"allThreadsContinued": true})).await;
                emit(
                    &transport,
                    "stopped",
                    json!({"reason": "breakpoint", "threadId": 1, "allThreadsStopped": true}),
                )
                .await;
            }
            "next" | "stepIn" | "stepOut" | "pause" => {
                respond(&transport, &message, json!({})).await;
            }
            "setVariable" => {
                let value = message["arguments"]["value"].clone();
                respond(
                    &transport,
                    &message,
                    json!({"value": value, "type": "int", "variablesReference": 0}),
                )
                .await;
            }
            "disconnect" => {
                respond(&transport, &message, json!({})).await;
                return;
            }
            _ => {
                respond(&transport, &message, json!({})).await;
            }
        }
    }
}

/// A server whose go/python drivers are the scripted fake.
fn fake_server(config: Config) -> DebugServer {
    let mut registry = Registry::new(&config);
    registry.register(Language::Go, Arc::new(FakeDriver::new(Language::Go, "/proj/main.go")));
    registry.register(
        Language::Python,
        Arc::new(FakeDriver::new(Language::Python, "/abs/script.py")),
    );
    DebugServer::with_registry(config, registry)
}

fn request(name: &str, args: Value) -> ToolRequest {
    ToolRequest::new(name, args.as_object().cloned().unwrap_or_else(Map::new))
}

async fn launch_go(server: &DebugServer) -> String {
    let result = server
        .dispatch(&request(
            "debug_launch",
            json!({"language": "go", "program": "./main.go", "stopOnEntry": true}),
        ))
        .await;
    assert_eq!(result["status"], "launched", "launch failed: {result}");
    result["sessionId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn launch_reports_session_and_snapshot_walks_stack() {
    let server = fake_server(Config::default());
    let session_id = launch_go(&server).await;

    let snapshot = server
        .dispatch(&request("debug_snapshot", json!({"sessionId": session_id})))
        .await;
    assert_eq!(snapshot["threads"].as_array().unwrap().len(), 1);

    let frames = &snapshot["stacks"]["1"];
    assert!(frames.as_array().unwrap().len() >= 1);
    let top_path = frames[0]["source"]["path"].as_str().unwrap();
    assert!(top_path.ends_with("main.go"), "got {top_path}");

    // Locals for the cheap scope were expanded; the expensive one was not.
    assert!(snapshot["variables"]["200"].is_array());
    assert!(snapshot["variables"]["201"].is_null());

    server.close().await;
}

#[tokio::test]
async fn launch_lists_then_disconnect_removes() {
    let server = fake_server(Config::default());
    let session_id = launch_go(&server).await;

    let listed = server.dispatch(&request("debug_list_sessions", json!({}))).await;
    assert_eq!(listed["sessions"].as_array().unwrap().len(), 1);
    assert_eq!(listed["sessions"][0]["language"], "go");
    assert_eq!(listed["sessions"][0]["status"], "running");

    let result = server
        .dispatch(&request("debug_disconnect", json!({"sessionId": session_id})))
        .await;
    assert_eq!(result["status"], "disconnected");

    let listed = server.dispatch(&request("debug_list_sessions", json!({}))).await;
    assert!(listed["sessions"].as_array().unwrap().is_empty());

    // Disconnecting again is a clean not-found.
    let again = server
        .dispatch(&request("debug_disconnect", json!({"sessionId": session_id})))
        .await;
    assert_eq!(again["error"]["code"], "SESSION_NOT_FOUND");

    server.close().await;
}

#[tokio::test]
async fn run_to_line_returns_stop_snapshot_with_locals() {
    let server = fake_server(Config::default());
    let session_id = launch_go(&server).await;

    let result = server
        .dispatch(&request(
            "debug_run_to_line",
            json!({"sessionId": session_id, "path": "/proj/main.go", "line": 42}),
        ))
        .await;
    assert_eq!(result["status"], "stopped", "got {result}");
    assert_eq!(result["stoppedAt"], 42);
    assert_eq!(result["reason"], "breakpoint");
    assert!(result["locals"].as_array().unwrap().len() >= 2);
    assert_eq!(result["stack"][0]["line"], 42);

    server.close().await;
}

#[tokio::test]
async fn batch_evaluate_reports_inline_errors_in_order() {
    let server = fake_server(Config::default());
    let session_id = launch_go(&server).await;

    let result = server
        .dispatch(&request(
            "debug_evaluate",
            json!({
                "sessionId": session_id,
                "expressions": "[\"x\", \"y\", \"x+y\", \"bogus!\"]",
            }),
        ))
        .await;

    let evaluations = result["evaluations"].as_array().unwrap();
    assert_eq!(evaluations.len(), 4);
    assert_eq!(evaluations[0]["result"], "10");
    assert_eq!(evaluations[1]["result"], "20");
    assert_eq!(evaluations[2]["result"], "30");
    assert!(evaluations[3]["error"].as_str().unwrap().contains("invalid expression"));
    // The auto-selected frame is the fake's top frame.
    assert_eq!(result["frameId"], 100);

    server.close().await;
}

#[tokio::test]
async fn empty_expression_batch_is_not_an_error() {
    let server = fake_server(Config::default());
    let session_id = launch_go(&server).await;

    let result = server
        .dispatch(&request(
            "debug_evaluate",
            json!({"sessionId": session_id, "expressions": "[]"}),
        ))
        .await;
    assert!(result["evaluations"].as_array().unwrap().is_empty());

    server.close().await;
}

#[tokio::test]
async fn breakpoints_replace_and_clear() {
    let server = fake_server(Config::default());
    let session_id = launch_go(&server).await;

    let result = server
        .dispatch(&request(
            "debug_breakpoints",
            json!({
                "sessionId": session_id,
                "path": "/proj/main.go",
                "breakpoints": "[{\"line\": 10}, {\"line\": 20}]",
            }),
        ))
        .await;
    let bps = result["breakpoints"].as_array().unwrap();
    assert_eq!(bps.len(), 2);
    assert_eq!(bps[0]["line"], 10);
    assert_eq!(bps[1]["line"], 20);

    // Zero breakpoints clears the file.
    let cleared = server
        .dispatch(&request(
            "debug_breakpoints",
            json!({"sessionId": session_id, "path": "/proj/main.go", "breakpoints": "[]"}),
        ))
        .await;
    assert!(cleared["breakpoints"].as_array().unwrap().is_empty());

    server.close().await;
}

#[tokio::test]
async fn step_continue_pause_and_set_variable() {
    let server = fake_server(Config::default());
    let session_id = launch_go(&server).await;

    for step_type in ["over", "into", "out"] {
        let result = server
            .dispatch(&request(
                "debug_step",
                json!({"sessionId": session_id, "threadId": 1, "type": step_type}),
            ))
            .await;
        assert_eq!(result["status"], "stepped");
        assert_eq!(result["type"], step_type);
    }

    let bad = server
        .dispatch(&request(
            "debug_step",
            json!({"sessionId": session_id, "threadId": 1, "type": "sideways"}),
        ))
        .await;
    assert_eq!(bad["error"]["code"], "INVALID_PARAMETER");

    let cont = server
        .dispatch(&request(
            "debug_continue",
            json!({"sessionId": session_id, "threadId": 1}),
        ))
        .await;
    assert_eq!(cont["allThreadsContinued"], true);

    let paused = server
        .dispatch(&request(
            "debug_pause",
            json!({"sessionId": session_id, "threadId": 1}),
        ))
        .await;
    assert_eq!(paused["status"], "paused");

    let set = server
        .dispatch(&request(
            "debug_set_variable",
            json!({"sessionId": session_id, "variablesReference": 200, "name": "x", "value": "99"}),
        ))
        .await;
    assert_eq!(set["value"], "99");

    server.close().await;
}

#[tokio::test]
async fn execute_command_rejects_non_native_sessions() {
    let server = fake_server(Config::default());
    let session_id = launch_go(&server).await;

    let result = server
        .dispatch(&request(
            "debug_execute_command",
            json!({"sessionId": session_id, "command": "bt"}),
        ))
        .await;
    assert_eq!(result["error"]["code"], "INVALID_PARAMETER");
    assert!(result["error"]["hint"]
        .as_str()
        .unwrap()
        .contains("debug_evaluate"));

    server.close().await;
}

#[tokio::test]
async fn execute_command_backticks_through_repl_for_native() {
    let config = Config::default();
    let mut registry = Registry::new(&config);
    registry.register(
        Language::Rust,
        Arc::new(FakeDriver::new(Language::Rust, "/proj/src/main.rs")),
    );
    let server = DebugServer::with_registry(config, registry);

    let launched = server
        .dispatch(&request(
            "debug_launch",
            json!({"language": "rust", "program": "./target/debug/app"}),
        ))
        .await;
    let session_id = launched["sessionId"].as_str().unwrap();

    let result = server
        .dispatch(&request(
            "debug_execute_command",
            json!({"sessionId": session_id, "command": "bt"}),
        ))
        .await;
    assert_eq!(result["output"], "frame #0: main");

    server.close().await;
}

#[tokio::test]
async fn session_limit_zero_rejects_launch() {
    let server = fake_server(Config {
        max_sessions: 0,
        ..Config::default()
    });
    let result = server
        .dispatch(&request(
            "debug_launch",
            json!({"language": "go", "program": "./main.go"}),
        ))
        .await;
    assert_eq!(result["error"]["code"], "SESSION_LIMIT_REACHED");
    server.close().await;
}

#[tokio::test]
async fn launch_denied_without_spawn_permission() {
    let server = fake_server(Config {
        allow_spawn: false,
        ..Config::default()
    });
    let result = server
        .dispatch(&request(
            "debug_launch",
            json!({"language": "go", "program": "./main.go"}),
        ))
        .await;
    assert_eq!(result["error"]["code"], "PERMISSION_DENIED");

    // Nothing leaked.
    let listed = server.dispatch(&request("debug_list_sessions", json!({}))).await;
    assert!(listed["sessions"].as_array().unwrap().is_empty());
    server.close().await;
}

#[tokio::test]
async fn evaluate_denied_without_execute_permission() {
    let server = fake_server(Config {
        allow_execute: false,
        ..Config::default()
    });
    let result = server
        .dispatch(&request(
            "debug_evaluate",
            json!({"sessionId": "any", "expression": "x"}),
        ))
        .await;
    assert_eq!(result["error"]["code"], "PERMISSION_DENIED");
    server.close().await;
}

#[tokio::test]
async fn modify_denied_in_readonly_mode() {
    let server = fake_server(Config {
        mode: CapabilityMode::Readonly,
        ..Config::default()
    });
    let result = server
        .dispatch(&request(
            "debug_set_variable",
            json!({"sessionId": "any", "variablesReference": 1, "name": "x", "value": "1"}),
        ))
        .await;
    assert_eq!(result["error"]["code"], "PERMISSION_DENIED");
    server.close().await;
}

#[tokio::test]
async fn unsupported_language_is_reported() {
    let server = fake_server(Config::default());
    let result = server
        .dispatch(&request(
            "debug_launch",
            json!({"language": "cobol", "program": "main.cbl"}),
        ))
        .await;
    assert_eq!(result["error"]["code"], "ADAPTER_NOT_SUPPORTED");
    server.close().await;
}

// -- launch.json driven flows ------------------------------------------------

fn write_workspace(launch_json: &str) -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    let vscode = dir.path().join(".vscode");
    std::fs::create_dir_all(&vscode).unwrap();
    std::fs::write(vscode.join("launch.json"), launch_json).unwrap();
    dir
}

#[tokio::test]
async fn config_launch_resolves_and_launches() {
    let workspace = write_workspace(
        r#"{
            "version": "0.2.0",
            "configurations": [{
                "type": "go",
                "request": "launch",
                "name": "Run API",
                "program": "${workspaceFolder}/cmd/api",
                "customFlag": true
            }]
        }"#,
    );
    let server = fake_server(Config::default());

    let result = server
        .dispatch(&request(
            "debug_launch",
            json!({
                "configName": "Run API",
                "workspace": workspace.path().to_string_lossy(),
            }),
        ))
        .await;
    assert_eq!(result["status"], "launched", "got {result}");
    assert_eq!(result["configName"], "Run API");
    let program = result["program"].as_str().unwrap();
    assert!(program.ends_with("/cmd/api"));
    assert!(!program.contains("${workspaceFolder}"));

    server.close().await;
}

#[tokio::test]
async fn config_launch_missing_inputs_lists_them_once() {
    let workspace = write_workspace(
        r#"{
            "version": "0.2.0",
            "configurations": [{
                "type": "python",
                "request": "launch",
                "name": "serve",
                "program": "${workspaceFolder}/app.py",
                "args": ["--port", "${input:port}", "--alt", "${input:port}"]
            }],
            "inputs": [{"id": "port", "type": "promptString", "default": "8080"}]
        }"#,
    );
    let server = fake_server(Config::default());

    let result = server
        .dispatch(&request(
            "debug_launch",
            json!({"configName": "serve", "workspace": workspace.path().to_string_lossy()}),
        ))
        .await;
    assert_eq!(result["error"]["code"], "MISSING_INPUTS");
    assert_eq!(result["error"]["details"]["missingInputs"], json!(["port"]));

    // Supplying the input makes the same launch go through.
    let result = server
        .dispatch(&request(
            "debug_launch",
            json!({
                "configName": "serve",
                "workspace": workspace.path().to_string_lossy(),
                "inputValues": "{\"port\": \"9000\"}",
            }),
        ))
        .await;
    assert_eq!(result["status"], "launched", "got {result}");

    server.close().await;
}

#[tokio::test]
async fn config_launch_unknown_name_lists_available() {
    let workspace = write_workspace(
        r#"{"version": "0.2.0", "configurations": [
            {"type": "go", "request": "launch", "name": "api"}
        ]}"#,
    );
    let server = fake_server(Config::default());
    let result = server
        .dispatch(&request(
            "debug_launch",
            json!({"configName": "ghost", "workspace": workspace.path().to_string_lossy()}),
        ))
        .await;
    assert_eq!(result["error"]["code"], "CONFIG_NOT_FOUND");
    assert_eq!(result["error"]["details"]["availableConfigs"], json!(["api"]));
    server.close().await;
}

#[tokio::test]
async fn list_configs_reports_warnings() {
    let workspace = write_workspace(
        r#"{
            "version": "0.2.0",
            "configurations": [
                {"type": "go", "request": "launch", "name": "api"},
                {"type": "node", "request": "attach", "name": "web", "port": 9229}
            ],
            "compounds": [{"name": "all", "configurations": ["api", "ghost"], "stopAll": true}]
        }"#,
    );
    let server = fake_server(Config::default());
    let result = server
        .dispatch(&request(
            "debug_list_configs",
            json!({"workspace": workspace.path().to_string_lossy()}),
        ))
        .await;

    assert_eq!(result["configurations"].as_array().unwrap().len(), 2);
    assert_eq!(result["compounds"][0]["name"], "all");
    let warnings = result["validationWarnings"].as_array().unwrap();
    assert!(warnings.iter().any(|w| w.as_str().unwrap().contains("ghost")));
    server.close().await;
}

#[tokio::test]
async fn compound_launch_and_stop_all_cascade() {
    let workspace = write_workspace(
        r#"{
            "version": "0.2.0",
            "configurations": [
                {"type": "go", "request": "launch", "name": "api", "program": "${workspaceFolder}/cmd/api"},
                {"type": "python", "request": "launch", "name": "worker", "program": "${workspaceFolder}/worker.py"}
            ],
            "compounds": [{"name": "stack", "configurations": ["api", "worker"], "stopAll": true}]
        }"#,
    );
    let server = fake_server(Config::default());

    let result = server
        .dispatch(&request(
            "debug_launch_compound",
            json!({
                "compoundName": "stack",
                "workspace": workspace.path().to_string_lossy(),
            }),
        ))
        .await;
    assert_eq!(result["compoundName"], "stack", "got {result}");
    assert_eq!(result["stopAll"], true);
    let members = result["sessions"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    let first_id = members[0]["sessionId"].as_str().unwrap().to_string();

    let compounds = server
        .dispatch(&request("debug_list_compound_sessions", json!({})))
        .await;
    assert_eq!(compounds["compounds"].as_array().unwrap().len(), 1);

    // Terminating one member takes the whole group down.
    let result = server
        .dispatch(&request("debug_disconnect", json!({"sessionId": first_id})))
        .await;
    assert_eq!(result["status"], "disconnected");

    let listed = server.dispatch(&request("debug_list_sessions", json!({}))).await;
    assert!(listed["sessions"].as_array().unwrap().is_empty(), "got {listed}");
    let compounds = server
        .dispatch(&request("debug_list_compound_sessions", json!({})))
        .await;
    assert!(compounds["compounds"].as_array().unwrap().is_empty());

    server.close().await;
}

#[tokio::test]
async fn compound_launch_skips_attach_members() {
    let workspace = write_workspace(
        r#"{
            "version": "0.2.0",
            "configurations": [
                {"type": "go", "request": "launch", "name": "api", "program": "${workspaceFolder}/cmd/api"},
                {"type": "node", "request": "attach", "name": "web", "port": 9229}
            ],
            "compounds": [{"name": "mixed", "configurations": ["api", "web"]}]
        }"#,
    );
    let server = fake_server(Config::default());

    let result = server
        .dispatch(&request(
            "debug_launch_compound",
            json!({"compoundName": "mixed", "workspace": workspace.path().to_string_lossy()}),
        ))
        .await;
    let members = result["sessions"].as_array().unwrap();
    assert_eq!(members[0]["status"], "launched");
    assert_eq!(members[1]["status"], "skipped");

    server.close().await;
}

#[tokio::test]
async fn inspection_wrappers_return_typed_payloads() {
    let server = fake_server(Config::default());
    let session_id = launch_go(&server).await;

    let threads = server
        .dispatch(&request("debug_threads", json!({"sessionId": session_id})))
        .await;
    assert_eq!(threads["threads"][0]["name"], "main");

    let stack = server
        .dispatch(&request(
            "debug_stack",
            json!({"sessionId": session_id, "threadId": 1}),
        ))
        .await;
    assert_eq!(stack["stackFrames"][0]["id"], 100);
    assert_eq!(stack["totalFrames"], 1);

    let scopes = server
        .dispatch(&request(
            "debug_scopes",
            json!({"sessionId": session_id, "frameId": 100}),
        ))
        .await;
    assert_eq!(scopes["scopes"][0]["name"], "Locals");

    let variables = server
        .dispatch(&request(
            "debug_variables",
            json!({"sessionId": session_id, "variablesReference": 200}),
        ))
        .await;
    assert_eq!(variables["variables"][0]["name"], "x");

    server.close().await;
}
