//! Request and bulk group data model.
//!
//! A [`Request`] is one unit of work owned by the scheduler from submission to
//! resolution. A [`BulkGroup`] aggregates a fixed set of child requests under a
//! [`CompletionPolicy`]. Only children ever reach the transport.

mod group;
mod handle;
mod result;

pub use group::{BulkGroup, BulkOptions, CompletionPolicy, ProgressFn};
pub use handle::CallHandle;
pub use result::{CallError, CallResult, Payload};

pub(crate) use handle::Completion;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::method::Method;

/// Opaque request identifier, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a request or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Waiting,
    Executing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

/// Per-call configuration accepted by `submit`.
///
/// `method` stays a string until submission so an unsupported verb surfaces as
/// a failed result instead of a construction error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallOptions {
    pub method: String,
    /// Relative to the configured base URL unless it is an absolute http(s) URL.
    pub path: String,
    #[serde(alias = "data")]
    pub body: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
    /// Extra headers; these override configured defaults with the same name.
    pub headers: Vec<(String, String)>,
    /// Overrides the configured per-call deadline.
    #[serde(with = "opt_millis")]
    pub timeout: Option<Duration>,
    /// Overrides the configured attempt budget.
    pub attempts: Option<u32>,
    pub alias: Option<String>,
}

impl CallOptions {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("get", path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new("post", path).body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new("put", path).body(body)
    }

    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new("patch", path).body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new("delete", path)
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Position of a child inside its owning group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GroupLink {
    pub group: RequestId,
    pub index: usize,
}

/// One unit of work under scheduler control.
#[derive(Debug)]
pub struct Request {
    pub(crate) id: RequestId,
    pub(crate) method: Method,
    pub(crate) options: CallOptions,
    pub(crate) max_attempts: u32,
    pub(crate) attempts: u32,
    pub(crate) status: RequestStatus,
    pub(crate) owner: Option<GroupLink>,
    completion: Completion,
}

impl Request {
    /// Builds a waiting request with `max_attempts` clamped to at least one.
    pub(crate) fn new(method: Method, options: CallOptions, max_attempts: u32) -> (Self, CallHandle) {
        let (completion, handle) = CallHandle::channel();
        let req = Self {
            id: RequestId::new(),
            method,
            options,
            max_attempts: max_attempts.max(1),
            attempts: 0,
            status: RequestStatus::Waiting,
            owner: None,
            completion,
        };
        (req, handle)
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn alias(&self) -> Option<&str> {
        self.options.alias.as_deref()
    }

    pub fn is_bulk_child(&self) -> bool {
        self.owner.is_some()
    }

    /// Stamps alias and attempt count onto `result` and fires the completion
    /// signal. Consumes the request, so it can only happen once.
    /// Returns the stamped result for group bookkeeping.
    pub(crate) fn resolve(self, mut result: CallResult) -> CallResult {
        result.alias = self.options.alias.clone();
        result.attempts = self.attempts;
        // A bulk child's handle is usually dropped; nobody listening is fine.
        let _ = self.completion.send(result.clone());
        result
    }
}

mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
