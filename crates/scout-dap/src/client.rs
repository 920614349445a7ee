//! High-level DAP client.
//!
//! Turns the message-oriented transport into a request/response + event API.
//! One reader task per client pulls frames off the transport and routes them:
//! responses are matched to waiting callers through a pending-request table
//! keyed by sequence number, the `initialized` event fulfills a one-shot
//! latch, `stopped` events feed an optional single-slot waiter, and all other
//! events go to an optional subscriber callback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{timeout, Duration};

use crate::error::DapError;
use crate::protocol::{
    classify, BreakpointInfo, BreakpointsResponseBody, Capabilities, ContinueArguments,
    ContinueResponseBody, DapMessage, DisconnectArguments, EvaluateArguments,
    EvaluateResponseBody, Event, FunctionBreakpoint, InitializeRequestArguments, Module,
    ModulesArguments, ModulesResponseBody, Request, Response, Scope, ScopesArguments,
    ScopesResponseBody, SetBreakpointsArguments, SetFunctionBreakpointsArguments,
    SetVariableArguments, SetVariableResponseBody, Source, SourceArguments, SourceBreakpoint,
    SourceResponseBody, StackFrame, StackTraceArguments, StackTraceResponseBody,
    StoppedEventBody, Thread, ThreadArguments, ThreadsResponseBody, Variable,
    VariablesArguments, VariablesResponseBody,
};
use crate::transport::DapTransport;

/// Default timeout for ordinary requests.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for launch/attach, which several adapters defer until after
/// `configurationDone`.
pub const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

/// The reader gives up after this many consecutive transport errors.
const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Why the debuggee stopped, snapshotted from a `stopped` event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoppedInfo {
    /// The stop reason ("breakpoint", "step", "exception", ...).
    pub reason: String,
    /// The thread that stopped, if reported.
    pub thread_id: i64,
    /// Free-form description.
    pub description: Option<String>,
    /// Whether all threads stopped.
    pub all_stopped: bool,
}

/// Callback invoked for events nothing in the core consumes.
pub type EventHandler = Box<dyn Fn(Event) + Send + Sync>;

/// A delivery slot for a response that arrives later (launch/attach).
pub struct PendingResponse {
    command: &'static str,
    rx: oneshot::Receiver<Response>,
}

struct ClientInner {
    transport: Arc<DapTransport>,
    /// Pending-request table: request seq → delivery slot. Delivery happens
    /// under this lock so a timing-out caller cannot lose a response.
    pending: Mutex<HashMap<i64, oneshot::Sender<Response>>>,
    /// Single-slot waiter for the next `stopped` event.
    stopped: Mutex<Option<mpsc::Sender<StoppedInfo>>>,
    /// Latch set when the `initialized` event arrives.
    initialized_tx: watch::Sender<bool>,
    event_handler: Mutex<Option<EventHandler>>,
    closed: AtomicBool,
}

impl ClientInner {
    fn handle_message(&self, value: serde_json::Value) {
        let message = match classify(value) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("unparseable DAP message: {e}");
                return;
            }
        };

        match message {
            DapMessage::Response(resp) => {
                let mut pending = self.pending.lock().unwrap();
                match pending.remove(&resp.request_seq) {
                    // A dropped receiver means the caller timed out; fine.
                    Some(tx) => {
                        let _ = tx.send(resp);
                    }
                    None => {
                        tracing::warn!(
                            request_seq = resp.request_seq,
                            "response for unknown request, dropping"
                        );
                    }
                }
            }
            DapMessage::Event(event) => self.handle_event(event),
            DapMessage::Request(req) => {
                tracing::debug!(command = %req.command, "reverse request from adapter (unhandled)");
            }
        }
    }

    fn handle_event(&self, event: Event) {
        match event.event.as_str() {
            "initialized" => {
                // Idempotent: adapters send this once, but a repeat is ignored.
                self.initialized_tx.send_replace(true);
            }
            "stopped" => {
                let body: StoppedEventBody = match event
                    .body
                    .clone()
                    .map(serde_json::from_value)
                    .transpose()
                {
                    Ok(Some(b)) => b,
                    _ => {
                        tracing::warn!("stopped event with missing or malformed body");
                        return;
                    }
                };
                let info = StoppedInfo {
                    reason: body.reason,
                    thread_id: body.thread_id.unwrap_or(0),
                    description: body.description,
                    all_stopped: body.all_threads_stopped.unwrap_or(false),
                };
                let slot = self.stopped.lock().unwrap();
                if let Some(tx) = slot.as_ref() {
                    // Non-blocking: only the caller that armed the waiter
                    // cares about the first event; a full slot means it has
                    // not drained yet and the extra event is dropped.
                    let _ = tx.try_send(info);
                }
            }
            _ => {}
        }

        let handler = self.event_handler.lock().unwrap();
        if let Some(handler) = handler.as_ref() {
            handler(event);
        }
    }

    /// Drop every pending slot so blocked callers fail fast.
    fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().unwrap();
        pending.clear();
    }
}

/// A DAP client bound to one adapter connection.
pub struct DapClient {
    inner: Arc<ClientInner>,
    initialized_rx: watch::Receiver<bool>,
    capabilities: Mutex<Capabilities>,
    reader: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl DapClient {
    /// Create a client over the given transport and start its reader task.
    pub fn new(transport: DapTransport) -> Self {
        let transport = Arc::new(transport);
        let (initialized_tx, initialized_rx) = watch::channel(false);
        let inner = Arc::new(ClientInner {
            transport: transport.clone(),
            pending: Mutex::new(HashMap::new()),
            stopped: Mutex::new(None),
            initialized_tx,
            event_handler: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let reader = tokio::spawn(Self::read_loop(inner.clone()));

        Self {
            inner,
            initialized_rx,
            capabilities: Mutex::new(Capabilities::default()),
            reader: Mutex::new(Some(reader)),
        }
    }

    async fn read_loop(inner: Arc<ClientInner>) {
        let mut consecutive_errors: u32 = 0;
        loop {
            if inner.closed.load(Ordering::Acquire) {
                return;
            }
            match inner.transport.receive().await {
                Ok(value) => {
                    consecutive_errors = 0;
                    inner.handle_message(value);
                }
                Err(e) => {
                    if inner.closed.load(Ordering::Acquire) {
                        return;
                    }
                    consecutive_errors += 1;
                    tracing::warn!(
                        attempt = consecutive_errors,
                        max = MAX_CONSECUTIVE_ERRORS,
                        "DAP transport error: {e}"
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        tracing::warn!("too many consecutive transport errors, stopping reader");
                        inner.fail_all_pending();
                        return;
                    }
                }
            }
        }
    }

    /// Install a subscriber for events the core does not consume.
    pub fn set_event_handler(&self, handler: EventHandler) {
        *self.inner.event_handler.lock().unwrap() = Some(handler);
    }

    /// The capabilities reported by the adapter's `initialize` response.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities.lock().unwrap().clone()
    }

    fn register_pending(&self, seq: i64) -> oneshot::Receiver<Response> {
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().unwrap().insert(seq, tx);
        rx
    }

    fn remove_pending(&self, seq: i64) {
        self.inner.pending.lock().unwrap().remove(&seq);
    }

    /// Send a request and wait for its response within `dur`.
    async fn send_request(
        &self,
        command: &str,
        arguments: Option<serde_json::Value>,
        dur: Duration,
    ) -> Result<Response, DapError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(DapError::Closed);
        }

        let seq = self.inner.transport.next_seq();
        let request = Request::new(seq, command, arguments);
        let rx = self.register_pending(seq);

        let value = serde_json::to_value(&request)
            .map_err(|e| DapError::Serialization(e.to_string()))?;
        if let Err(e) = self.inner.transport.send(&value).await {
            self.remove_pending(seq);
            return Err(e);
        }

        match timeout(dur, rx).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => Err(DapError::Closed),
            Err(_) => {
                // Caller owns cleanup of its own slot; a late response is
                // dropped by the reader.
                self.remove_pending(seq);
                Err(DapError::Timeout {
                    operation: command.into(),
                    seconds: dur.as_secs(),
                })
            }
        }
    }

    /// Send a request without waiting; the response arrives on the slot.
    fn send_request_async(
        &self,
        command: &'static str,
        arguments: Option<serde_json::Value>,
    ) -> Result<PendingResponse, DapError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(DapError::Closed);
        }
        let seq = self.inner.transport.next_seq();
        let request = Request::new(seq, command, arguments);
        let rx = self.register_pending(seq);

        let value = serde_json::to_value(&request)
            .map_err(|e| DapError::Serialization(e.to_string()))?;

        let inner = self.inner.clone();
        let this_seq = seq;
        // Flush on a detached task so the caller can immediately go wait for
        // the initialized event.
        let send_fut = async move {
            if let Err(e) = inner.transport.send(&value).await {
                tracing::warn!("async {command} send failed: {e}");
                inner.pending.lock().unwrap().remove(&this_seq);
            }
        };
        tokio::spawn(send_fut);

        Ok(PendingResponse { command, rx })
    }

    /// Wait for a deferred launch/attach response collected from
    /// [`PendingResponse`].
    pub async fn wait_for_response(
        &self,
        pending: PendingResponse,
        dur: Duration,
    ) -> Result<(), DapError> {
        match timeout(dur, pending.rx).await {
            Ok(Ok(resp)) => resp.check(pending.command),
            Ok(Err(_)) => Err(DapError::Closed),
            Err(_) => Err(DapError::Timeout {
                operation: format!("{} response", pending.command),
                seconds: dur.as_secs(),
            }),
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Send the `initialize` request and store the adapter's capabilities.
    pub async fn initialize(
        &self,
        client_id: &str,
        client_name: &str,
    ) -> Result<Capabilities, DapError> {
        let args = InitializeRequestArguments {
            client_id: Some(client_id.into()),
            client_name: Some(client_name.into()),
            adapter_id: "scout".into(),
            locale: Some("en-US".into()),
            lines_start_at1: Some(true),
            columns_start_at1: Some(true),
            path_format: Some("path".into()),
            supports_variable_type: Some(true),
            supports_variable_paging: Some(true),
            supports_run_in_terminal_request: Some(false),
        };
        let resp = self
            .send_request(
                "initialize",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        let caps: Capabilities = resp.into_body("initialize")?;
        *self.capabilities.lock().unwrap() = caps.clone();
        Ok(caps)
    }

    /// Wait for the `initialized` event.
    pub async fn wait_initialized(&self, dur: Duration) -> Result<(), DapError> {
        let mut rx = self.initialized_rx.clone();
        timeout(dur, rx.wait_for(|ready| *ready))
            .await
            .map_err(|_| DapError::Timeout {
                operation: "initialized event".into(),
                seconds: dur.as_secs(),
            })?
            .map_err(|_| DapError::Closed)?;
        Ok(())
    }

    /// Send `launch` without waiting for the response.
    ///
    /// Several adapters (notably debugpy) do not answer until after
    /// `configurationDone`, so the protocol is: `launch_async`, then
    /// [`wait_initialized`](Self::wait_initialized), then
    /// [`configuration_done`](Self::configuration_done), then collect the
    /// response with [`wait_for_response`](Self::wait_for_response).
    pub fn launch_async(&self, args: serde_json::Value) -> Result<PendingResponse, DapError> {
        self.send_request_async("launch", Some(args))
    }

    /// Send `attach` without waiting for the response (browser targets defer
    /// the response the same way launch does).
    pub fn attach_async(&self, args: serde_json::Value) -> Result<PendingResponse, DapError> {
        self.send_request_async("attach", Some(args))
    }

    /// Send `attach` and wait for the response (network attach path).
    pub async fn attach(&self, args: serde_json::Value) -> Result<(), DapError> {
        let resp = self.send_request("attach", Some(args), LAUNCH_TIMEOUT).await?;
        resp.check("attach")
    }

    /// Signal that breakpoint configuration is complete.
    pub async fn configuration_done(&self) -> Result<(), DapError> {
        let resp = self
            .send_request("configurationDone", None, REQUEST_TIMEOUT)
            .await?;
        resp.check("configurationDone")
    }

    /// End the debug session, optionally terminating the debuggee.
    pub async fn disconnect(&self, terminate_debuggee: bool) -> Result<(), DapError> {
        let args = DisconnectArguments { terminate_debuggee };
        let resp = self
            .send_request(
                "disconnect",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        resp.check("disconnect")
    }

    // -- inspection ---------------------------------------------------------

    /// Fetch all threads.
    pub async fn threads(&self) -> Result<Vec<Thread>, DapError> {
        let resp = self.send_request("threads", None, REQUEST_TIMEOUT).await?;
        let body: ThreadsResponseBody = resp.into_body("threads")?;
        Ok(body.threads)
    }

    /// Fetch a slice of a thread's stack. Returns the frames and the total
    /// frame count if the adapter reports one.
    pub async fn stack_trace(
        &self,
        thread_id: i64,
        start_frame: i64,
        levels: i64,
    ) -> Result<(Vec<StackFrame>, Option<i64>), DapError> {
        let args = StackTraceArguments {
            thread_id,
            start_frame,
            levels,
        };
        let resp = self
            .send_request(
                "stackTrace",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        let body: StackTraceResponseBody = resp.into_body("stackTrace")?;
        Ok((body.stack_frames, body.total_frames))
    }

    /// Fetch the scopes of a frame.
    pub async fn scopes(&self, frame_id: i64) -> Result<Vec<Scope>, DapError> {
        let args = ScopesArguments { frame_id };
        let resp = self
            .send_request(
                "scopes",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        let body: ScopesResponseBody = resp.into_body("scopes")?;
        Ok(body.scopes)
    }

    /// Expand a variables reference.
    pub async fn variables(
        &self,
        variables_reference: i64,
        filter: Option<&str>,
        start: Option<i64>,
        count: Option<i64>,
    ) -> Result<Vec<Variable>, DapError> {
        let args = VariablesArguments {
            variables_reference,
            filter: filter.map(Into::into),
            start,
            count,
        };
        let resp = self
            .send_request(
                "variables",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        let body: VariablesResponseBody = resp.into_body("variables")?;
        Ok(body.variables)
    }

    /// Evaluate an expression in the given frame and context.
    pub async fn evaluate(
        &self,
        expression: &str,
        frame_id: Option<i64>,
        context: Option<&str>,
    ) -> Result<EvaluateResponseBody, DapError> {
        let args = EvaluateArguments {
            expression: expression.into(),
            frame_id,
            context: context.map(Into::into),
        };
        let resp = self
            .send_request(
                "evaluate",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        resp.into_body("evaluate")
    }

    /// Fetch source content by reference or path.
    pub async fn source(
        &self,
        source_reference: i64,
        path: Option<&str>,
    ) -> Result<SourceResponseBody, DapError> {
        let args = SourceArguments {
            source: Some(Source {
                name: None,
                path: path.map(Into::into),
                source_reference: Some(source_reference),
            }),
            source_reference,
        };
        let resp = self
            .send_request(
                "source",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        resp.into_body("source")
    }

    /// Fetch loaded modules.
    pub async fn modules(
        &self,
        start_module: i64,
        module_count: i64,
    ) -> Result<(Vec<Module>, Option<i64>), DapError> {
        let args = ModulesArguments {
            start_module,
            module_count,
        };
        let resp = self
            .send_request(
                "modules",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        let body: ModulesResponseBody = resp.into_body("modules")?;
        Ok((body.modules, body.total_modules))
    }

    // -- control ------------------------------------------------------------

    /// Replace the breakpoint set for a source file. The set sent here is
    /// total: it becomes the complete set active for that file.
    pub async fn set_breakpoints(
        &self,
        source: Source,
        breakpoints: Vec<SourceBreakpoint>,
    ) -> Result<Vec<BreakpointInfo>, DapError> {
        let args = SetBreakpointsArguments {
            source,
            breakpoints,
        };
        let resp = self
            .send_request(
                "setBreakpoints",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        let body: BreakpointsResponseBody = resp.into_body("setBreakpoints")?;
        Ok(body.breakpoints)
    }

    /// Replace the function breakpoint set.
    pub async fn set_function_breakpoints(
        &self,
        breakpoints: Vec<FunctionBreakpoint>,
    ) -> Result<Vec<BreakpointInfo>, DapError> {
        let args = SetFunctionBreakpointsArguments { breakpoints };
        let resp = self
            .send_request(
                "setFunctionBreakpoints",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        let body: BreakpointsResponseBody = resp.into_body("setFunctionBreakpoints")?;
        Ok(body.breakpoints)
    }

    /// Continue execution. Returns whether all threads were continued.
    pub async fn continue_execution(&self, thread_id: i64) -> Result<bool, DapError> {
        let args = ContinueArguments { thread_id };
        let resp = self
            .send_request(
                "continue",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        let body: ContinueResponseBody = resp.into_body("continue")?;
        Ok(body.all_threads_continued)
    }

    /// Step over.
    pub async fn next(&self, thread_id: i64) -> Result<(), DapError> {
        self.thread_command("next", thread_id).await
    }

    /// Step into.
    pub async fn step_in(&self, thread_id: i64) -> Result<(), DapError> {
        self.thread_command("stepIn", thread_id).await
    }

    /// Step out.
    pub async fn step_out(&self, thread_id: i64) -> Result<(), DapError> {
        self.thread_command("stepOut", thread_id).await
    }

    /// Pause a running thread.
    pub async fn pause(&self, thread_id: i64) -> Result<(), DapError> {
        self.thread_command("pause", thread_id).await
    }

    async fn thread_command(&self, command: &str, thread_id: i64) -> Result<(), DapError> {
        let args = ThreadArguments { thread_id };
        let resp = self
            .send_request(
                command,
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        resp.check(command)
    }

    /// Set a variable's value within a container.
    pub async fn set_variable(
        &self,
        variables_reference: i64,
        name: &str,
        value: &str,
    ) -> Result<SetVariableResponseBody, DapError> {
        let args = SetVariableArguments {
            variables_reference,
            name: name.into(),
            value: value.into(),
        };
        let resp = self
            .send_request(
                "setVariable",
                Some(serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))?),
                REQUEST_TIMEOUT,
            )
            .await?;
        resp.into_body("setVariable")
    }

    // -- stopped-event rendezvous ------------------------------------------

    /// Arm a single-slot waiter for the next `stopped` event.
    fn arm_stopped_waiter(&self) -> mpsc::Receiver<StoppedInfo> {
        let (tx, rx) = mpsc::channel(1);
        *self.inner.stopped.lock().unwrap() = Some(tx);
        rx
    }

    fn disarm_stopped_waiter(&self) {
        *self.inner.stopped.lock().unwrap() = None;
    }

    /// Wait for the next `stopped` event.
    pub async fn wait_for_stopped(&self, dur: Duration) -> Result<StoppedInfo, DapError> {
        let mut rx = self.arm_stopped_waiter();
        let result = timeout(dur, rx.recv()).await;
        self.disarm_stopped_waiter();
        match result {
            Ok(Some(info)) => Ok(info),
            Ok(None) => Err(DapError::Closed),
            Err(_) => Err(DapError::Timeout {
                operation: "stopped event".into(),
                seconds: dur.as_secs(),
            }),
        }
    }

    /// Continue execution and wait for the next stop.
    ///
    /// The waiter is armed before `continue` is issued, so a fast stop
    /// cannot be lost to the race.
    pub async fn continue_and_wait(
        &self,
        thread_id: i64,
        dur: Duration,
    ) -> Result<StoppedInfo, DapError> {
        let mut rx = self.arm_stopped_waiter();

        if let Err(e) = self.continue_execution(thread_id).await {
            self.disarm_stopped_waiter();
            return Err(e);
        }

        let result = timeout(dur, rx.recv()).await;
        self.disarm_stopped_waiter();
        match result {
            Ok(Some(info)) => Ok(info),
            Ok(None) => Err(DapError::Closed),
            Err(_) => Err(DapError::Timeout {
                operation: "stopped event after continue".into(),
                seconds: dur.as_secs(),
            }),
        }
    }

    /// Shut down the client: stop the reader, close the transport, and fail
    /// any pending requests.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        if let Some(handle) = self.reader.lock().unwrap().take() {
            handle.abort();
        }
        self.inner.transport.close().await;
        self.inner.fail_all_pending();
    }
}

impl std::fmt::Debug for DapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DapClient")
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .field("pending", &self.inner.pending.lock().unwrap().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::encode_message;
    use tokio::io::AsyncWriteExt;

    /// A scripted adapter on the far end of a duplex pipe. Replies to every
    /// request with a success response (echoing the command), and can emit
    /// events on demand.
    struct FakeAdapter {
        transport: Arc<DapTransport>,
    }

    fn pair() -> (DapClient, FakeAdapter) {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let (cr, cw) = tokio::io::split(client_end);
        let (sr, sw) = tokio::io::split(server_end);
        let client = DapClient::new(DapTransport::from_parts(Box::new(cr), Box::new(cw)));
        let adapter = FakeAdapter {
            transport: Arc::new(DapTransport::from_parts(Box::new(sr), Box::new(sw))),
        };
        (client, adapter)
    }

    impl FakeAdapter {
        async fn recv(&self) -> serde_json::Value {
            self.transport.receive().await.unwrap()
        }

        async fn respond(&self, request: &serde_json::Value, body: serde_json::Value) {
            let resp = serde_json::json!({
                "seq": 1000 + request["seq"].as_i64().unwrap(),
                "type": "response",
                "request_seq": request["seq"],
                "success": true,
                "command": request["command"],
                "body": body,
            });
            self.transport.send(&resp).await.unwrap();
        }

        async fn respond_error(&self, request: &serde_json::Value, message: &str) {
            let resp = serde_json::json!({
                "seq": 1000 + request["seq"].as_i64().unwrap(),
                "type": "response",
                "request_seq": request["seq"],
                "success": false,
                "command": request["command"],
                "message": message,
            });
            self.transport.send(&resp).await.unwrap();
        }

        async fn emit(&self, event: &str, body: serde_json::Value) {
            let evt = serde_json::json!({
                "seq": 9999,
                "type": "event",
                "event": event,
                "body": body,
            });
            self.transport.send(&evt).await.unwrap();
        }
    }

    #[tokio::test]
    async fn client_threads_roundtrip() {
        let (client, adapter) = pair();
        let server = tokio::spawn(async move {
            let req = adapter.recv().await;
            assert_eq!(req["command"], "threads");
            adapter
                .respond(&req, serde_json::json!({"threads": [{"id": 1, "name": "main"}]}))
                .await;
        });

        let threads = client.threads().await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, 1);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn client_error_response_surfaces_message() {
        let (client, adapter) = pair();
        let server = tokio::spawn(async move {
            let req = adapter.recv().await;
            adapter.respond_error(&req, "thread is running").await;
        });

        let err = client.scopes(7).await.unwrap_err();
        assert!(matches!(err, DapError::RequestFailed { .. }));
        assert!(err.to_string().contains("thread is running"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn client_request_timeout_removes_slot() {
        let (client, adapter) = pair();
        // The adapter reads the request but never answers.
        let server = tokio::spawn(async move {
            let _req = adapter.recv().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let err = client
            .send_request("threads", None, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, DapError::Timeout { .. }));
        assert_eq!(client.inner.pending.lock().unwrap().len(), 0);
        server.abort();
    }

    #[tokio::test]
    async fn client_unknown_request_seq_is_dropped() {
        let (client, adapter) = pair();
        adapter
            .transport
            .send(&serde_json::json!({
                "seq": 1, "type": "response", "request_seq": 777,
                "success": true, "command": "threads", "body": {"threads": []}
            }))
            .await
            .unwrap();

        // Give the reader a beat; the orphan response must not disturb a
        // later legitimate exchange.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let server = tokio::spawn(async move {
            let req = adapter.recv().await;
            adapter
                .respond(&req, serde_json::json!({"threads": []}))
                .await;
        });
        let threads = client.threads().await.unwrap();
        assert!(threads.is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn client_wait_initialized_latch() {
        let (client, adapter) = pair();
        adapter.emit("initialized", serde_json::json!({})).await;
        client
            .wait_initialized(Duration::from_secs(1))
            .await
            .unwrap();
        // A second wait observes the same latch.
        client
            .wait_initialized(Duration::from_millis(10))
            .await
            .unwrap();
        // A duplicate event is ignored.
        adapter.emit("initialized", serde_json::json!({})).await;
        client
            .wait_initialized(Duration::from_millis(10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn client_wait_initialized_times_out() {
        let (client, _adapter) = pair();
        let err = client
            .wait_initialized(Duration::from_millis(30))
            .await
            .unwrap_err();
        assert!(matches!(err, DapError::Timeout { .. }));
    }

    #[tokio::test]
    async fn client_continue_and_wait_catches_fast_stop() {
        let (client, adapter) = pair();
        let server = tokio::spawn(async move {
            let req = adapter.recv().await;
            assert_eq!(req["command"], "continue");
            // Emit the stopped event before the continue response: the
            // armed waiter must still catch it.
            adapter
                .emit(
                    "stopped",
                    serde_json::json!({"reason": "breakpoint", "threadId": 3, "allThreadsStopped": true}),
                )
                .await;
            adapter
                .respond(&req, serde_json::json!({"allThreadsContinued": true}))
                .await;
        });

        let info = client
            .continue_and_wait(3, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(info.reason, "breakpoint");
        assert_eq!(info.thread_id, 3);
        assert!(info.all_stopped);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn client_stopped_event_without_waiter_is_dropped() {
        let (client, adapter) = pair();
        adapter
            .emit("stopped", serde_json::json!({"reason": "pause", "threadId": 1}))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        // No waiter armed: the event vanishes and a later wait times out.
        let err = client
            .wait_for_stopped(Duration::from_millis(30))
            .await
            .unwrap_err();
        assert!(matches!(err, DapError::Timeout { .. }));
    }

    #[tokio::test]
    async fn client_subscriber_sees_other_events() {
        let (client, adapter) = pair();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        client.set_event_handler(Box::new(move |event| {
            seen_clone.lock().unwrap().push(event.event);
        }));

        adapter
            .emit("output", serde_json::json!({"category": "stdout", "output": "hi\n"}))
            .await;
        adapter.emit("terminated", serde_json::json!({})).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let events = seen.lock().unwrap().clone();
        assert_eq!(events, vec!["output".to_string(), "terminated".to_string()]);
    }

    #[tokio::test]
    async fn client_launch_deferred_response_sequence() {
        let (client, adapter) = pair();
        let server = tokio::spawn(async move {
            // launch arrives first but is not answered yet.
            let launch_req = adapter.recv().await;
            assert_eq!(launch_req["command"], "launch");
            adapter.emit("initialized", serde_json::json!({})).await;

            let config_req = adapter.recv().await;
            assert_eq!(config_req["command"], "configurationDone");
            adapter.respond(&config_req, serde_json::json!({})).await;

            // Only now answer the launch, as debugpy does.
            adapter.respond(&launch_req, serde_json::json!({})).await;
        });

        let pending = client
            .launch_async(serde_json::json!({"program": "/tmp/app.py"}))
            .unwrap();
        client
            .wait_initialized(Duration::from_secs(1))
            .await
            .unwrap();
        client.configuration_done().await.unwrap();
        client
            .wait_for_response(pending, Duration::from_secs(1))
            .await
            .unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn client_reader_gives_up_after_garbage() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        let (cr, cw) = tokio::io::split(client_end);
        let client = DapClient::new(DapTransport::from_parts(Box::new(cr), Box::new(cw)));
        let (_sr, mut sw) = tokio::io::split(server_end);

        // Garbage framing followed by EOF: reader hits its error budget.
        sw.write_all(b"not a dap frame at all\r\n\r\n").await.unwrap();
        drop(sw);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Slot map was drained, so an in-flight request would fail fast; new
        // ones still time out cleanly rather than hanging forever.
        assert!(client.inner.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn client_close_fails_pending() {
        let (client, adapter) = pair();
        let fut = tokio::spawn(async move {
            let _req = adapter.recv().await;
            // Never respond.
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let client = Arc::new(client);
        let c2 = client.clone();
        let waiter = tokio::spawn(async move {
            c2.send_request("threads", None, Duration::from_secs(5)).await
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        client.close().await;

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, DapError::Closed));

        // Requests after close are rejected outright.
        let err = client.threads().await.unwrap_err();
        assert!(matches!(err, DapError::Closed));
        fut.abort();
    }

    #[tokio::test]
    async fn client_set_breakpoints_total_replacement_shape() {
        let (client, adapter) = pair();
        let server = tokio::spawn(async move {
            let req = adapter.recv().await;
            assert_eq!(req["command"], "setBreakpoints");
            let lines: Vec<i64> = req["arguments"]["breakpoints"]
                .as_array()
                .unwrap()
                .iter()
                .map(|b| b["line"].as_i64().unwrap())
                .collect();
            assert_eq!(lines, vec![10, 20]);
            adapter
                .respond(
                    &req,
                    serde_json::json!({"breakpoints": [
                        {"id": 1, "verified": true, "line": 10},
                        {"id": 2, "verified": true, "line": 20},
                    ]}),
                )
                .await;
        });

        let bps = client
            .set_breakpoints(
                Source {
                    name: None,
                    path: Some("/src/main.go".into()),
                    source_reference: None,
                },
                vec![
                    SourceBreakpoint {
                        line: 10,
                        column: None,
                        condition: None,
                        hit_condition: None,
                        log_message: None,
                    },
                    SourceBreakpoint {
                        line: 20,
                        column: None,
                        condition: None,
                        hit_condition: None,
                        log_message: None,
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(bps.len(), 2);
        assert!(bps.iter().all(|b| b.verified));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn client_wire_order_matches_submission() {
        let (client, adapter) = pair();
        let client = Arc::new(client);

        let server = tokio::spawn(async move {
            let first = adapter.recv().await;
            let second = adapter.recv().await;
            assert!(first["seq"].as_i64().unwrap() < second["seq"].as_i64().unwrap());
            // Answer out of order; correlation is by request_seq.
            adapter
                .respond(&second, serde_json::json!({"scopes": []}))
                .await;
            adapter
                .respond(&first, serde_json::json!({"threads": []}))
                .await;
        });

        let c1 = client.clone();
        let t1 = tokio::spawn(async move { c1.threads().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let c2 = client.clone();
        let t2 = tokio::spawn(async move { c2.scopes(1).await });

        assert!(t1.await.unwrap().unwrap().is_empty());
        assert!(t2.await.unwrap().unwrap().is_empty());
        server.await.unwrap();
    }

    #[test]
    fn stopped_info_fields() {
        let info = StoppedInfo {
            reason: "step".into(),
            thread_id: 4,
            description: None,
            all_stopped: false,
        };
        assert_eq!(info.reason, "step");
        assert_eq!(info.thread_id, 4);
    }

    #[test]
    fn encode_is_reused_by_transport() {
        // Spot check that the codec the client rides on frames correctly.
        let v = serde_json::json!({"seq": 1, "type": "request", "command": "x"});
        let bytes = encode_message(&v);
        assert!(bytes.starts_with(b"Content-Length: "));
    }
}
