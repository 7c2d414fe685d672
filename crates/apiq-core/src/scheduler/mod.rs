//! Request scheduler.
//!
//! Bounds concurrent outbound calls, retries timed-out calls by requeueing
//! them, and aggregates bulk groups into a single completion. A [`Scheduler`]
//! is a cheap, cloneable handle; the queues live in one driver task spawned by
//! [`Scheduler::start`].

mod activity;
mod driver;
mod resolve;

pub use resolve::{compose_url, is_absolute};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::ApiqConfig;
use crate::method::{Method, UnsupportedMethod};
use crate::request::{BulkGroup, BulkOptions, CallHandle, CallOptions, CallResult, Request};
use crate::sink::{NoopSink, StateSink};
use crate::transport::{CurlTransport, Transport};

use self::driver::{Command, Driver};
use self::resolve::{authorization_value, CallDefaults};

/// Handle to a running scheduler.
#[derive(Clone)]
pub struct Scheduler {
    tx: mpsc::UnboundedSender<Command>,
    default_attempts: u32,
    driver: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("default_attempts", &self.default_attempts)
            .field("running", &!self.tx.is_closed())
            .finish()
    }
}

/// Empty verbs default to GET; anything else must be in the supported set.
fn parse_method(method: &str) -> Result<Method, UnsupportedMethod> {
    if method.trim().is_empty() {
        return Ok(Method::Get);
    }
    method.parse()
}

impl Scheduler {
    /// Spawns the driver task. Must be called from within a Tokio runtime.
    pub fn start(cfg: &ApiqConfig, transport: Arc<dyn Transport>, sink: Arc<dyn StateSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Driver::new(cfg.concurrency(), CallDefaults::from_config(cfg), transport, sink);
        let handle = tokio::spawn(driver.run(rx));
        tracing::debug!(
            ceiling = cfg.concurrency(),
            attempts = cfg.attempts(),
            base_url = %cfg.base_url,
            "scheduler started"
        );
        Self {
            tx,
            default_attempts: cfg.attempts(),
            driver: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Scheduler over libcurl with no state sink.
    pub fn with_curl(cfg: &ApiqConfig) -> Self {
        Self::start(cfg, Arc::new(CurlTransport::new()), Arc::new(NoopSink))
    }

    fn send(&self, cmd: Command) {
        if self.tx.send(cmd).is_err() {
            // The command (and any completion sender in it) is dropped, so
            // waiting handles resolve as `SchedulerGone`.
            tracing::warn!("scheduler is stopped; command dropped");
        }
    }

    fn attempts_for(&self, options: &CallOptions) -> u32 {
        options.attempts.unwrap_or(self.default_attempts)
    }

    /// Queue one call. An unsupported verb yields an already-resolved failure
    /// and never touches the queue.
    pub fn submit(&self, options: CallOptions) -> CallHandle {
        let method = match parse_method(&options.method) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("{}", e);
                return CallHandle::ready(CallResult::failure(e.into()));
            }
        };
        let attempts = self.attempts_for(&options);
        let (req, handle) = Request::new(method, options, attempts);
        self.send(Command::Submit(req));
        handle
    }

    /// Queue a bulk group. Every verb is validated first; one bad verb rejects
    /// the whole group with nothing queued and no child results.
    pub fn submit_bulk(&self, calls: Vec<CallOptions>, options: BulkOptions) -> CallHandle {
        let mut methods = Vec::with_capacity(calls.len());
        for call in &calls {
            match parse_method(&call.method) {
                Ok(m) => methods.push(m),
                Err(e) => {
                    tracing::warn!("bulk rejected: {}", e);
                    return CallHandle::ready(CallResult::failure(e.into()));
                }
            }
        }

        let (mut group, handle) = BulkGroup::new(options);
        let children: Vec<Request> = calls
            .into_iter()
            .zip(methods)
            .map(|(call, method)| {
                let attempts = self.attempts_for(&call);
                let (mut req, _child_handle) = Request::new(method, call, attempts);
                group.add_child(&mut req);
                req
            })
            .collect();
        self.send(Command::SubmitBulk { group, children });
        handle
    }

    pub fn get(&self, path: impl Into<String>) -> CallHandle {
        self.submit(CallOptions::get(path))
    }

    pub fn post(&self, path: impl Into<String>, body: serde_json::Value) -> CallHandle {
        self.submit(CallOptions::post(path, body))
    }

    pub fn put(&self, path: impl Into<String>, body: serde_json::Value) -> CallHandle {
        self.submit(CallOptions::put(path, body))
    }

    pub fn patch(&self, path: impl Into<String>, body: serde_json::Value) -> CallHandle {
        self.submit(CallOptions::patch(path, body))
    }

    pub fn delete(&self, path: impl Into<String>) -> CallHandle {
        self.submit(CallOptions::delete(path))
    }

    /// Bulk call with the same verb forced onto every child.
    pub fn bulk(&self, method: &str, calls: Vec<CallOptions>, options: BulkOptions) -> CallHandle {
        let calls = calls
            .into_iter()
            .map(|mut c| {
                c.method = method.to_string();
                c
            })
            .collect();
        self.submit_bulk(calls, options)
    }

    /// Sets `Authorization: <kind> <token>` for calls admitted from now on.
    /// An empty token clears the header.
    pub fn set_authorization(&self, token: &str, kind: &str) {
        let value = (!token.trim().is_empty()).then(|| authorization_value(token, kind));
        self.send(Command::SetAuthorization(value));
    }

    /// Content type sent with POST, PUT and PATCH calls admitted from now on.
    pub fn set_content_type(&self, content_type: &str) {
        self.send(Command::SetContentType(content_type.to_string()));
    }

    /// Deadline for calls admitted from now on that carry no timeout of their
    /// own. `None` removes the deadline.
    pub fn set_timeout(&self, timeout: Option<Duration>) {
        self.send(Command::SetTimeout(timeout));
    }

    /// Stops accepting work and waits for everything already queued to finish.
    /// Calls submitted afterwards resolve as `SchedulerGone`.
    pub async fn shutdown(&self) {
        self.send(Command::Shutdown);
        let handle = self.driver.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("scheduler driver join: {}", e);
            }
        }
    }
}
