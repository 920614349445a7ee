//! scout-server — tool handlers over the debug core.
//!
//! Maps incoming tool invocations (delivered by a host protocol as parsed
//! name + parameters) onto DAP sequences: session launch/attach, inspection
//! snapshots, breakpoints and stepping, launch-configuration resolution, and
//! compound session orchestration. Errors are returned as structured result
//! payloads with stable codes and actionable hints.

mod handlers;

pub mod error;
pub mod request;
pub mod server;

pub use error::{DebugError, ErrorCode};
pub use request::ToolRequest;
pub use server::{DebugServer, ToolInfo};
