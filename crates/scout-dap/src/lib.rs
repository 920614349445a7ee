//! scout-dap — Debug Adapter Protocol client runtime.
//!
//! This crate implements the DAP side of the server: Content-Length message
//! framing over TCP or child stdio, a request/response client with
//! asynchronous event routing, and the session/compound lifecycle manager.

pub mod client;
pub mod error;
pub mod process;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-export key types for convenience.
pub use client::{DapClient, PendingResponse, StoppedInfo, LAUNCH_TIMEOUT, REQUEST_TIMEOUT};
pub use error::DapError;
pub use process::AdapterProcess;
pub use protocol::*;
pub use session::{CompoundSession, Language, Session, SessionInfo, SessionManager, SessionStatus};
pub use transport::DapTransport;
