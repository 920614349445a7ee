//! Debug session lifecycle and the session/compound manager.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::client::DapClient;
use crate::error::DapError;
use crate::process::{kill_process_group, AdapterProcess};

/// A supported debuggee language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Go (Delve).
    Go,
    /// Python (debugpy).
    Python,
    /// JavaScript (vscode-js-debug).
    Javascript,
    /// TypeScript (vscode-js-debug).
    Typescript,
    /// C (lldb-dap / gdb).
    C,
    /// C++ (lldb-dap / gdb).
    Cpp,
    /// Rust (lldb-dap / gdb).
    Rust,
}

impl Language {
    /// Parse a language identifier.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "go" => Some(Self::Go),
            "python" => Some(Self::Python),
            "javascript" => Some(Self::Javascript),
            "typescript" => Some(Self::Typescript),
            "c" => Some(Self::C),
            "cpp" => Some(Self::Cpp),
            "rust" => Some(Self::Rust),
            _ => None,
        }
    }

    /// The canonical lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Python => "python",
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Rust => "rust",
        }
    }

    /// Whether this language is debugged through a native (LLDB/GDB) adapter.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::C | Self::Cpp | Self::Rust)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status of a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created; launch/attach protocol not yet complete.
    Initializing,
    /// The debuggee is running.
    Running,
    /// The debuggee is stopped (breakpoint, step, pause).
    Stopped,
    /// Terminated. A terminated session is removed from the table and its
    /// id is never reused.
    Terminated,
}

impl SessionStatus {
    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
        }
    }
}

/// Mutable per-session state, guarded by the session's own lock.
#[derive(Debug, Default)]
struct SessionState {
    status: Option<SessionStatus>,
    client: Option<Arc<DapClient>>,
    process: Option<AdapterProcess>,
}

/// A live debugger attached to one debuggee.
#[derive(Debug)]
pub struct Session {
    /// Opaque unique id, stable for the session's life.
    pub id: String,
    /// The debuggee language.
    pub language: Language,
    /// The debuggee path, URL, or "attached".
    pub program: String,
    /// Monotonic creation timestamp (drives the timeout sweep).
    pub created_at: Instant,
    state: Mutex<SessionState>,
}

impl Session {
    /// The session's DAP client, if one has been attached.
    pub async fn client(&self) -> Option<Arc<DapClient>> {
        self.state.lock().await.client.clone()
    }

    /// The session's current status.
    pub async fn status(&self) -> SessionStatus {
        self.state
            .lock()
            .await
            .status
            .unwrap_or(SessionStatus::Initializing)
    }

    /// The adapter's pid, if the adapter was spawned locally.
    pub async fn pid(&self) -> Option<u32> {
        self.state.lock().await.process.as_ref().map(|p| p.pid)
    }

    /// Summarize the session for listings.
    pub async fn info(&self) -> SessionInfo {
        let state = self.state.lock().await;
        SessionInfo {
            session_id: self.id.clone(),
            language: self.language,
            status: state.status.unwrap_or(SessionStatus::Initializing),
            pid: state.process.as_ref().map(|p| p.pid),
            program: self.program.clone(),
        }
    }
}

/// Session summary exposed to tool callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// The session id.
    pub session_id: String,
    /// The debuggee language.
    pub language: Language,
    /// The session status.
    pub status: SessionStatus,
    /// Adapter pid, when spawned locally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// The debuggee program.
    pub program: String,
}

/// A named group of sessions launched together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundSession {
    /// The compound's name.
    pub name: String,
    /// Member session ids.
    pub session_ids: Vec<String>,
    /// Whether terminating any member terminates all.
    pub stop_all: bool,
}

#[derive(Debug, Default)]
struct ManagerState {
    sessions: HashMap<String, Arc<Session>>,
    compounds: HashMap<String, CompoundSession>,
    /// session id → compound name, for O(1) lookup on termination.
    session_to_compound: HashMap<String, String>,
}

/// Manages concurrent debug sessions: creation against a bounded table,
/// late binding of clients and processes, compound grouping, and the
/// timeout sweep.
pub struct SessionManager {
    state: Arc<Mutex<ManagerState>>,
    max_sessions: usize,
    session_timeout: Duration,
    sweeper: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// How often the expiry sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

impl SessionManager {
    /// Create a manager and start its background expiry sweep.
    pub fn new(max_sessions: usize, session_timeout: Duration) -> Self {
        let state: Arc<Mutex<ManagerState>> = Arc::default();

        let sweep_state = state.clone();
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                Self::sweep_expired(&sweep_state, session_timeout).await;
            }
        });

        Self {
            state,
            max_sessions,
            session_timeout,
            sweeper: std::sync::Mutex::new(Some(sweeper)),
        }
    }

    /// The configured per-session lifetime.
    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// The configured table bound.
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Create a session with a fresh id in `Initializing` state.
    ///
    /// Does not start an adapter; the caller does that so failures can be
    /// correlated with the returned id.
    pub async fn create(&self, language: Language, program: &str) -> Result<Arc<Session>, DapError> {
        let mut state = self.state.lock().await;
        if state.sessions.len() >= self.max_sessions {
            return Err(DapError::SessionLimitReached(self.max_sessions));
        }

        let session = Arc::new(Session {
            id: uuid::Uuid::new_v4().to_string(),
            language,
            program: program.into(),
            created_at: Instant::now(),
            state: Mutex::new(SessionState {
                status: Some(SessionStatus::Initializing),
                client: None,
                process: None,
            }),
        });
        state.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Look up a session by id.
    pub async fn get(&self, id: &str) -> Result<Arc<Session>, DapError> {
        let state = self.state.lock().await;
        state
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| DapError::SessionNotFound(id.into()))
    }

    /// All live sessions, summarized.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<Session>> = {
            let state = self.state.lock().await;
            state.sessions.values().cloned().collect()
        };
        let mut infos = Vec::with_capacity(sessions.len());
        for session in sessions {
            infos.push(session.info().await);
        }
        infos.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        infos
    }

    /// Attach the DAP client after a successful spawn + connect.
    pub async fn set_client(&self, id: &str, client: Arc<DapClient>) -> Result<(), DapError> {
        let session = self.get(id).await?;
        session.state.lock().await.client = Some(client);
        Ok(())
    }

    /// Attach the spawned adapter process.
    pub async fn set_process(&self, id: &str, process: AdapterProcess) -> Result<(), DapError> {
        let session = self.get(id).await?;
        session.state.lock().await.process = Some(process);
        Ok(())
    }

    /// Update a session's status.
    pub async fn update_status(&self, id: &str, status: SessionStatus) -> Result<(), DapError> {
        let session = self.get(id).await?;
        session.state.lock().await.status = Some(status);
        Ok(())
    }

    /// Terminate a session: compound peers first (when stopAll), then
    /// disconnect, close the client, kill the adapter's process group, and
    /// remove the id from the table.
    ///
    /// Terminating an unknown or already-terminated id returns
    /// [`DapError::SessionNotFound`].
    pub async fn terminate(&self, id: &str, terminate_debuggee: bool) -> Result<(), DapError> {
        let mut state = self.state.lock().await;
        if !state.sessions.contains_key(id) {
            return Err(DapError::SessionNotFound(id.into()));
        }

        // Compound cascade: when any member of a stopAll compound dies, all
        // siblings die with it and the compound record goes away atomically.
        if let Some(compound_name) = state.session_to_compound.get(id).cloned() {
            let stop_all = state
                .compounds
                .get(&compound_name)
                .map(|c| c.stop_all)
                .unwrap_or(false);
            if stop_all {
                let siblings: Vec<String> = state
                    .compounds
                    .get(&compound_name)
                    .map(|c| c.session_ids.clone())
                    .unwrap_or_default();
                for sibling in siblings {
                    if sibling != id {
                        Self::terminate_locked(&mut state, &sibling, true).await;
                        state.session_to_compound.remove(&sibling);
                    }
                }
                state.compounds.remove(&compound_name);
            }
            state.session_to_compound.remove(id);
        }

        Self::terminate_locked(&mut state, id, terminate_debuggee).await;
        Ok(())
    }

    /// Terminate one session while holding the table lock.
    async fn terminate_locked(state: &mut ManagerState, id: &str, terminate_debuggee: bool) {
        let Some(session) = state.sessions.get(id).cloned() else {
            return;
        };

        let mut session_state = session.state.lock().await;

        if let Some(client) = session_state.client.take() {
            if let Err(e) = client.disconnect(terminate_debuggee).await {
                tracing::warn!(session = %id, "disconnect failed (continuing cleanup): {e}");
            }
            client.close().await;
        }

        // Signal the process group before the id leaves the table.
        if let Some(process) = session_state.process.as_mut() {
            if let Err(e) = kill_process_group(process) {
                tracing::warn!(session = %id, pid = process.pid, "failed to kill process group: {e}");
            }
        }
        session_state.process = None;
        session_state.status = Some(SessionStatus::Terminated);
        drop(session_state);

        state.sessions.remove(id);
    }

    async fn sweep_expired(state: &Arc<Mutex<ManagerState>>, session_timeout: Duration) {
        let mut state = state.lock().await;
        let now = Instant::now();
        let expired: Vec<String> = state
            .sessions
            .values()
            .filter(|s| now.duration_since(s.created_at) > session_timeout)
            .map(|s| s.id.clone())
            .collect();
        for id in expired {
            tracing::info!(session = %id, "reaping expired session");
            // Expired compound members take their stopAll siblings with
            // them on their own sweep ticks; here each is reaped directly.
            Self::terminate_locked(&mut state, &id, true).await;
            state.session_to_compound.remove(&id);
        }
    }

    /// Register a compound group over existing sessions.
    pub async fn track_compound(&self, name: &str, session_ids: Vec<String>, stop_all: bool) {
        let mut state = self.state.lock().await;
        for id in &session_ids {
            state.session_to_compound.insert(id.clone(), name.into());
        }
        state.compounds.insert(
            name.into(),
            CompoundSession {
                name: name.into(),
                session_ids,
                stop_all,
            },
        );
    }

    /// Look up a compound by name.
    pub async fn get_compound(&self, name: &str) -> Option<CompoundSession> {
        self.state.lock().await.compounds.get(name).cloned()
    }

    /// All live compound groups.
    pub async fn list_compounds(&self) -> Vec<CompoundSession> {
        let state = self.state.lock().await;
        let mut compounds: Vec<CompoundSession> = state.compounds.values().cloned().collect();
        compounds.sort_by(|a, b| a.name.cmp(&b.name));
        compounds
    }

    /// Shut down: stop the sweep and terminate every session.
    pub async fn close(&self) {
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
        }
        let mut state = self.state.lock().await;
        let ids: Vec<String> = state.sessions.keys().cloned().collect();
        for id in ids {
            Self::terminate_locked(&mut state, &id, true).await;
        }
        state.compounds.clear();
        state.session_to_compound.clear();
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("max_sessions", &self.max_sessions)
            .field("session_timeout", &self.session_timeout)
            .finish()
    }
}
