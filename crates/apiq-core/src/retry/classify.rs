//! Classify transport errors into retry policy error kinds.

use crate::retry::policy::ErrorKind;
use crate::transport::{TransportError, TransportErrorCode};

/// Classify a transport error for retry decisions.
///
/// A dedicated timeout code is always transient. A connection abort only counts
/// when the adapter attributes it to an expired deadline; aborts can happen for
/// plenty of other reasons.
pub fn classify(e: &TransportError) -> ErrorKind {
    match e.code {
        TransportErrorCode::TimedOut => ErrorKind::Timeout,
        TransportErrorCode::ConnectionAborted
            if e.message.to_ascii_lowercase().contains("timeout") =>
        {
            ErrorKind::Timeout
        }
        TransportErrorCode::ConnectionAborted | TransportErrorCode::Other => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_code_is_timeout() {
        assert_eq!(
            classify(&TransportError::timed_out("operation timed out")),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn abort_with_deadline_message_is_timeout() {
        assert_eq!(
            classify(&TransportError::aborted("timeout of 10000ms exceeded")),
            ErrorKind::Timeout
        );
        assert_eq!(
            classify(&TransportError::aborted("Timeout waiting for body")),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn other_aborts_and_errors_are_permanent() {
        assert_eq!(
            classify(&TransportError::aborted("aborted by caller")),
            ErrorKind::Other
        );
        assert_eq!(
            classify(&TransportError::other("connection refused")),
            ErrorKind::Other
        );
        // The word alone does not matter outside of aborts.
        assert_eq!(
            classify(&TransportError::other("timeout")),
            ErrorKind::Other
        );
    }
}
