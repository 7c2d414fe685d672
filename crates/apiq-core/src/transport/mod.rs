//! Transport adapter contract.
//!
//! The scheduler never speaks HTTP itself. It resolves a [`ResolvedCall`] and
//! hands it to a [`Transport`], then classifies whatever comes back. The
//! production adapter is [`CurlTransport`]; tests plug in scripted ones.

mod curl_transport;
mod error;

pub use curl_transport::CurlTransport;
pub use error::{TransportError, TransportErrorCode};

use async_trait::async_trait;
use std::time::Duration;

use crate::method::Method;

/// Fully resolved call handed to the transport: absolute URL, merged headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCall {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// `None` means the transport applies no deadline of its own.
    pub timeout: Option<Duration>,
}

/// A response that made it back from the server, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// JSON when the body parses as JSON, a string otherwise, `Null` when empty.
    pub body: serde_json::Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    /// 2xx only; anything else is still a completed call.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one network call.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn execute(&self, call: ResolvedCall) -> Result<TransportResponse, TransportError>;
}

/// Decode a raw response body: JSON if possible, else lossy UTF-8 text.
pub(crate) fn decode_body(raw: &[u8]) -> serde_json::Value {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(raw)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(raw).into_owned()))
}
