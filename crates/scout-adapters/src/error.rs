//! Adapter driver error types.

use scout_dap::DapError;

/// Errors from spawning or connecting to debug adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// No driver registered for the requested language.
    #[error("no debug adapter registered for language: {0}")]
    NotSupported(String),

    /// Starting the adapter process failed.
    #[error("failed to start {adapter}: {source}")]
    SpawnFailed {
        /// The adapter binary or family that failed.
        adapter: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The adapter never accepted a TCP connection.
    #[error("failed to connect to debug adapter at {address}: {message}")]
    ConnectFailed {
        /// The address that was polled.
        address: String,
        /// The last connection error observed.
        message: String,
    },

    /// A required configuration value is absent.
    #[error("adapter misconfigured: {0}")]
    MissingConfig(String),

    /// No ephemeral port could be allocated.
    #[error("failed to find available port: {0}")]
    PortUnavailable(std::io::Error),

    /// Wrapped DAP-level failure.
    #[error(transparent)]
    Dap(#[from] DapError),
}
