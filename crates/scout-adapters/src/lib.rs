//! scout-adapters — language-specific debug adapter drivers.
//!
//! Each driver knows how to start its debugger's DAP adapter, which
//! transport the adapter speaks, and how to shape launch/attach argument
//! objects for it. The registry maps debuggee languages to drivers:
//!
//! - Go → Delve (`dlv dap`, TCP)
//! - Python → debugpy (`python -m debugpy.adapter`, TCP)
//! - JavaScript/TypeScript → vscode-js-debug (TCP; also the DAP↔CDP bridge
//!   for Chrome/Edge targets)
//! - C/C++/Rust → lldb-dap (stdio), with GDB's native DAP mode available
//!   as an explicit alternative

pub mod debugpy;
pub mod delve;
pub mod error;
pub mod gdb;
pub mod jsdebug;
pub mod lldb;
pub mod spawn;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::time::{sleep, Duration};

use scout_config::Config;
use scout_dap::{AdapterProcess, DapClient, DapTransport, Language};

pub use debugpy::DebugpyAdapter;
pub use delve::DelveAdapter;
pub use error::AdapterError;
pub use gdb::GdbAdapter;
pub use jsdebug::JsDebugAdapter;
pub use lldb::LldbAdapter;

/// How a driver's adapter process is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The adapter listens on a TCP port.
    Tcp,
    /// The adapter speaks DAP over its stdin/stdout.
    Stdio,
}

/// The result of spawning an adapter process.
///
/// A tagged connection lets one call site handle both transport families
/// without downcasting.
#[derive(Debug)]
pub enum AdapterConnection {
    /// Poll-connect to this address.
    Tcp(String),
    /// Already connected over the child's pipes.
    Stdio(DapClient),
}

/// A spawned adapter: its connection plus the process handle used for
/// group-kill cleanup.
#[derive(Debug)]
pub struct SpawnedAdapter {
    /// How to reach the adapter.
    pub connection: AdapterConnection,
    /// The adapter child process.
    pub process: AdapterProcess,
}

/// A language-specific debug adapter driver.
pub trait Adapter: Send + Sync {
    /// The primary language this driver serves.
    fn language(&self) -> Language;

    /// Which transport the adapter speaks.
    fn transport_kind(&self) -> TransportKind;

    /// Start the adapter process.
    fn spawn(&self, program: &str, args: &Value) -> Result<SpawnedAdapter, AdapterError>;

    /// Shape the DAP `launch` argument object for this adapter.
    fn build_launch_args(&self, program: &str, args: &Value) -> Value;

    /// Shape the DAP `attach` argument object for this adapter.
    fn build_attach_args(&self, args: &Value) -> Value;
}

/// Registry of drivers keyed by language.
pub struct Registry {
    adapters: HashMap<Language, Arc<dyn Adapter>>,
}

impl Registry {
    /// Build the standard registry from the server configuration.
    ///
    /// LLDB serves the native languages by default; GDB is available via
    /// [`Registry::gdb_adapter`] for callers that explicitly select it.
    pub fn new(config: &Config) -> Self {
        let mut adapters: HashMap<Language, Arc<dyn Adapter>> = HashMap::new();

        adapters.insert(
            Language::Go,
            Arc::new(DelveAdapter::new(config.adapters.go.clone())),
        );
        adapters.insert(
            Language::Python,
            Arc::new(DebugpyAdapter::new(config.adapters.python.clone())),
        );

        let js: Arc<dyn Adapter> = Arc::new(JsDebugAdapter::new(config.adapters.node.clone()));
        adapters.insert(Language::Javascript, js.clone());
        adapters.insert(Language::Typescript, js);

        let lldb: Arc<dyn Adapter> = Arc::new(LldbAdapter::new(config.adapters.lldb.clone()));
        adapters.insert(Language::C, lldb.clone());
        adapters.insert(Language::Cpp, lldb.clone());
        adapters.insert(Language::Rust, lldb);

        Self { adapters }
    }

    /// Look up the driver for a language.
    pub fn get(&self, language: Language) -> Result<Arc<dyn Adapter>, AdapterError> {
        self.adapters
            .get(&language)
            .cloned()
            .ok_or_else(|| AdapterError::NotSupported(language.as_str().into()))
    }

    /// Replace the driver for a language.
    pub fn register(&mut self, language: Language, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(language, adapter);
    }

    /// A GDB driver for callers that explicitly prefer it over LLDB.
    pub fn gdb_adapter(config: &Config) -> Arc<dyn Adapter> {
        Arc::new(GdbAdapter::new(config.adapters.gdb.clone()))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("languages", &self.adapters.len())
            .finish()
    }
}

/// Poll-connect to a TCP adapter with backoff. Each failed attempt waits
/// 200 ms; `max_retries` attempts bound the wait at a few seconds.
pub async fn connect(address: &str, max_retries: u32) -> Result<DapClient, AdapterError> {
    let mut last_error = String::new();
    for attempt in 0..max_retries {
        match DapTransport::connect_tcp(address).await {
            Ok(transport) => return Ok(DapClient::new(transport)),
            Err(e) => {
                last_error = e.to_string();
                tracing::debug!(address, attempt, "adapter not accepting yet: {e}");
            }
        }
        sleep(Duration::from_millis(200)).await;
    }
    Err(AdapterError::ConnectFailed {
        address: address.into(),
        message: last_error,
    })
}

/// Spawn an adapter and return a connected client plus the process handle.
///
/// Stdio drivers hand back their client directly; TCP drivers are polled
/// until the first connection succeeds, and the child is killed if it never
/// does.
pub async fn spawn_and_connect(
    adapter: &dyn Adapter,
    program: &str,
    args: &Value,
) -> Result<(DapClient, AdapterProcess), AdapterError> {
    let spawned = adapter.spawn(program, args)?;
    match spawned.connection {
        AdapterConnection::Stdio(client) => Ok((client, spawned.process)),
        AdapterConnection::Tcp(address) => {
            let mut process = spawned.process;
            match connect(&address, 20).await {
                Ok(client) => Ok((client, process)),
                Err(e) => {
                    if let Err(kill_err) = scout_dap::process::kill_process_group(&mut process) {
                        tracing::warn!("failed to kill unconnectable adapter: {kill_err}");
                    }
                    Err(e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_serves_all_seven_languages() {
        let config = Config::default();
        let registry = Registry::new(&config);
        for lang in [
            Language::Go,
            Language::Python,
            Language::Javascript,
            Language::Typescript,
            Language::C,
            Language::Cpp,
            Language::Rust,
        ] {
            let adapter = registry.get(lang).unwrap();
            // JS/TS share a driver; native languages share LLDB.
            let _ = adapter.transport_kind();
        }
    }

    #[test]
    fn registry_transport_kinds() {
        let config = Config::default();
        let registry = Registry::new(&config);
        assert_eq!(
            registry.get(Language::Go).unwrap().transport_kind(),
            TransportKind::Tcp
        );
        assert_eq!(
            registry.get(Language::Python).unwrap().transport_kind(),
            TransportKind::Tcp
        );
        assert_eq!(
            registry.get(Language::Rust).unwrap().transport_kind(),
            TransportKind::Stdio
        );
    }

    #[test]
    fn registry_register_overrides() {
        let config = Config::default();
        let mut registry = Registry::new(&config);
        let gdb = Registry::gdb_adapter(&config);
        registry.register(Language::C, gdb);
        assert_eq!(
            registry.get(Language::C).unwrap().transport_kind(),
            TransportKind::Stdio
        );
    }

    #[tokio::test]
    async fn connect_gives_up_against_dead_port() {
        // Bind then drop to get a port nothing listens on.
        let port = spawn::find_available_port().unwrap();
        let address = format!("127.0.0.1:{port}");
        let err = connect(&address, 2).await.unwrap_err();
        assert!(matches!(err, AdapterError::ConnectFailed { .. }));
    }

    #[tokio::test]
    async fn connect_succeeds_against_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move { listener.accept().await });

        let client = connect(&address, 5).await.unwrap();
        accept.await.unwrap().unwrap();
        client.close().await;
    }
}
