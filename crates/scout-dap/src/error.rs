//! DAP client error types.

/// Errors from DAP transport and client operations.
#[derive(Debug, thiserror::Error)]
pub enum DapError {
    /// Message framing or wire-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The adapter sent something that does not parse as a DAP message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A request did not receive its response in time.
    #[error("{operation} timed out after {seconds} seconds")]
    Timeout {
        /// What was being waited on.
        operation: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// The adapter answered with `success: false`.
    #[error("{command} failed: {message}")]
    RequestFailed {
        /// The DAP command that failed.
        command: String,
        /// The adapter's error message.
        message: String,
    },

    /// A response arrived for the right seq but the wrong command.
    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        /// Command we sent.
        expected: String,
        /// Command the response claims to answer.
        actual: String,
    },

    /// The client has been closed; no further requests are possible.
    #[error("client is closed")]
    Closed,

    /// Session lookup failed.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The session table is at its configured bound.
    #[error("maximum number of sessions ({0}) reached")]
    SessionLimitReached(usize),

    /// I/O error from the underlying socket or pipes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure building a request.
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_transport_display() {
        let err = DapError::Transport("broken pipe".into());
        assert_eq!(err.to_string(), "transport error: broken pipe");
    }

    #[test]
    fn error_timeout_display() {
        let err = DapError::Timeout {
            operation: "initialize".into(),
            seconds: 10,
        };
        assert_eq!(err.to_string(), "initialize timed out after 10 seconds");
    }

    #[test]
    fn error_request_failed_display() {
        let err = DapError::RequestFailed {
            command: "launch".into(),
            message: "program not found".into(),
        };
        assert_eq!(err.to_string(), "launch failed: program not found");
    }

    #[test]
    fn error_unexpected_response_display() {
        let err = DapError::UnexpectedResponse {
            expected: "launch".into(),
            actual: "attach".into(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected response: expected launch, got attach"
        );
    }

    #[test]
    fn error_session_limit_display() {
        let err = DapError::SessionLimitReached(10);
        assert_eq!(err.to_string(), "maximum number of sessions (10) reached");
    }

    #[test]
    fn error_io_from() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = DapError::from(io);
        assert!(err.to_string().contains("pipe closed"));
    }
}
