//! Result value delivered through every completion signal.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::method::UnsupportedMethod;
use crate::transport::{TransportError, TransportResponse};

/// Why a call did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// Rejected before it was queued.
    #[error(transparent)]
    UnsupportedMethod(#[from] UnsupportedMethod),
    /// Permanent transport failure, or a timeout with the budget exhausted.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The scheduler went away before resolving the call.
    #[error("scheduler stopped before the request completed")]
    SchedulerGone,
}

impl Serialize for CallError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Response data: a decoded body for single calls, keyed child results for groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    #[default]
    Empty,
    Body(serde_json::Value),
    /// Keyed by child alias, or by the child's position when it has none.
    Children(BTreeMap<String, CallResult>),
}

impl Payload {
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Body(v) => Some(v),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, CallResult>> {
        match self {
            Payload::Children(map) => Some(map),
            _ => None,
        }
    }
}

/// Outcome of one call or one bulk group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallResult {
    /// 2xx response (single call) or group not failed (bulk).
    pub success: bool,
    /// Attempts consumed, including retries.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    pub data: Payload,
    /// Present only on failure.
    pub error: Option<CallError>,
    /// Human readable error summary, empty on success.
    pub error_info: String,
    pub alias: Option<String>,
}

impl CallResult {
    pub fn failure(error: CallError) -> Self {
        Self {
            success: false,
            error_info: error.to_string(),
            error: Some(error),
            ..Self::default()
        }
    }

    /// A response always completes the call; `success` just reflects the status.
    pub fn from_response(resp: TransportResponse) -> Self {
        Self {
            success: resp.is_success(),
            status: Some(resp.status),
            headers: resp.headers,
            data: Payload::Body(resp.body),
            ..Self::default()
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
