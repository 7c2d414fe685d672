//! Transport error type for retry classification.

/// Coarse error code reported by a transport adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorCode {
    /// The adapter's own deadline expired.
    TimedOut,
    /// The connection was aborted. Only a timeout when the message says so.
    ConnectionAborted,
    /// Anything else (DNS, refused connection, TLS, bad URL, ...).
    Other,
}

/// Error returned by a single transport call.
/// Kept separate from [`CallError`](crate::request::CallError) so the scheduler
/// can classify it before deciding whether to requeue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub code: TransportErrorCode,
    pub message: String,
}

impl TransportError {
    pub fn new(code: TransportErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::TimedOut, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::ConnectionAborted, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::Other, message)
    }
}
