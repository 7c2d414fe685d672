//! The driver task: sole owner of the pending, executing and bulk-group sets.
//!
//! Every queue mutation happens here, one command or one transport outcome at
//! a time, so the transitions around a single dispatch or completion never
//! interleave. Transport calls are the only concurrent part; they run in a
//! `JoinSet` and report back to this loop.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::request::{BulkGroup, CallError, CallResult, GroupLink, Request, RequestId, RequestStatus};
use crate::retry::{classify, RetryDecision, RetryPolicy};
use crate::sink::StateSink;
use crate::transport::{Transport, TransportError, TransportResponse};

use super::activity::Activity;
use super::resolve::CallDefaults;

type Outcome = Result<TransportResponse, TransportError>;

/// Messages from [`Scheduler`](super::Scheduler) handles.
pub(super) enum Command {
    Submit(Request),
    SubmitBulk {
        group: BulkGroup,
        children: Vec<Request>,
    },
    SetAuthorization(Option<String>),
    SetContentType(String),
    SetTimeout(Option<Duration>),
    /// Stop accepting commands; drain what is already queued.
    Shutdown,
}

pub(super) struct Driver {
    pending: VecDeque<Request>,
    executing: HashMap<RequestId, Request>,
    groups: HashMap<RequestId, BulkGroup>,
    ceiling: usize,
    defaults: CallDefaults,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn StateSink>,
    activity: Activity,
    in_flight: JoinSet<(RequestId, Outcome)>,
}

impl Driver {
    pub(super) fn new(
        ceiling: usize,
        defaults: CallDefaults,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        Self {
            pending: VecDeque::new(),
            executing: HashMap::new(),
            groups: HashMap::new(),
            ceiling: ceiling.max(1),
            defaults,
            transport,
            sink,
            activity: Activity::default(),
            in_flight: JoinSet::new(),
        }
    }

    /// Runs until shutdown (or every handle is dropped) and all work has drained.
    pub(super) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut accepting = true;
        loop {
            if !accepting && self.pending.is_empty() && self.in_flight.is_empty() {
                break;
            }
            // Commands first: everything a caller has already submitted is
            // queued before the next outcome is classified.
            tokio::select! {
                biased;
                cmd = rx.recv(), if accepting => match cmd {
                    Some(Command::Shutdown) | None => {
                        accepting = false;
                        tracing::debug!(
                            pending = self.pending.len(),
                            in_flight = self.in_flight.len(),
                            "scheduler draining"
                        );
                    }
                    Some(cmd) => self.handle(cmd),
                },
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    match joined {
                        Ok((id, outcome)) => self.on_outcome(id, outcome),
                        Err(e) => tracing::warn!("transport task join: {}", e),
                    }
                }
                else => break,
            }
            self.admit_next();
        }
        tracing::debug!("scheduler stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Submit(req) => {
                tracing::debug!(id = %req.id, method = %req.method, path = %req.options.path, "queued");
                self.pending.push_back(req);
                self.publish_counts();
            }
            Command::SubmitBulk { group, children } => self.register_group(group, children),
            Command::SetAuthorization(value) => self.defaults.set_authorization(value),
            Command::SetContentType(ct) => self.defaults.set_content_type(ct),
            Command::SetTimeout(timeout) => self.defaults.set_timeout(timeout),
            Command::Shutdown => {}
        }
    }

    fn register_group(&mut self, mut group: BulkGroup, children: Vec<Request>) {
        tracing::debug!(id = %group.id(), children = children.len(), "bulk group queued");
        if group.is_empty() {
            group.reevaluate();
            group.resolve();
            return;
        }
        for child in children {
            self.pending.push_back(child);
            self.publish_counts();
        }
        self.groups.insert(group.id(), group);
    }

    /// Admit pending work until the ceiling is reached. Admission does not wait
    /// for the calls it starts, so the ceiling bounds concurrency, not batches.
    fn admit_next(&mut self) {
        while self.executing.len() < self.ceiling {
            let Some(mut req) = self.pending.pop_front() else {
                break;
            };
            req.status = RequestStatus::Executing;
            req.attempts += 1;
            self.mark_child(req.owner, RequestStatus::Executing);

            let call = self.defaults.resolve(&req);
            let id = req.id;
            tracing::debug!(
                id = %id,
                method = %call.method,
                url = %call.url,
                attempt = req.attempts,
                "dispatching"
            );
            self.executing.insert(id, req);
            self.publish_counts();
            self.refresh_activity();

            let transport = Arc::clone(&self.transport);
            self.in_flight.spawn(async move {
                // Inner task so a panicking adapter becomes an ordinary error.
                let outcome = tokio::spawn(async move { transport.execute(call).await })
                    .await
                    .unwrap_or_else(|e| Err(TransportError::other(format!("transport task failed: {}", e))));
                (id, outcome)
            });
        }
    }

    fn on_outcome(&mut self, id: RequestId, outcome: Outcome) {
        let Some(mut req) = self.executing.remove(&id) else {
            // Purged when its fail-fast group resolved early.
            tracing::debug!(id = %id, "ignoring outcome of purged request");
            return;
        };

        match outcome {
            Ok(resp) => {
                req.status = RequestStatus::Completed;
                self.complete(req, CallResult::from_response(resp));
            }
            Err(err) => {
                let kind = classify(&err);
                match RetryPolicy::new(req.max_attempts).decide(req.attempts, kind) {
                    RetryDecision::Requeue => {
                        tracing::info!(
                            id = %id,
                            attempt = req.attempts,
                            max_attempts = req.max_attempts,
                            "timed out; requeueing: {}",
                            err
                        );
                        req.status = RequestStatus::Waiting;
                        self.mark_child(req.owner, RequestStatus::Waiting);
                        self.pending.push_back(req);
                        self.publish_counts();
                        self.refresh_activity();
                    }
                    RetryDecision::GiveUp => {
                        tracing::warn!(id = %id, attempt = req.attempts, "request failed: {}", err);
                        req.status = RequestStatus::Failed;
                        self.complete(req, CallResult::failure(CallError::Transport(err)));
                    }
                }
            }
        }
    }

    /// Resolve a terminal request, then let its group (if any) re-evaluate.
    fn complete(&mut self, req: Request, result: CallResult) {
        let status = req.status;
        let owner = req.owner;
        self.remove_from_lists(req.id);
        tracing::debug!(id = %req.id, status = ?status, attempts = req.attempts, "resolved");
        let stamped = req.resolve(result);

        if let Some(link) = owner {
            self.settle_child(link, status, stamped);
        }
        self.publish_counts();
        self.refresh_activity();
    }

    fn settle_child(&mut self, link: GroupLink, status: RequestStatus, result: CallResult) {
        let Some(group) = self.groups.get_mut(&link.group) else {
            return;
        };
        group.settle_child(link.index, status, result);
        if !group.reevaluate().is_terminal() {
            return;
        }

        let Some(group) = self.groups.remove(&link.group) else {
            return;
        };
        let children: Vec<RequestId> = group.child_ids().collect();
        let id = group.id();
        let status = group.status();
        let result = group.resolve();
        tracing::info!(
            id = %id,
            status = ?status,
            success = result.success,
            children = children.len(),
            "bulk group resolved"
        );
        for child in children {
            self.remove_from_lists(child);
        }
    }

    fn mark_child(&mut self, owner: Option<GroupLink>, status: RequestStatus) {
        if let Some(link) = owner {
            if let Some(group) = self.groups.get_mut(&link.group) {
                group.mark_child(link.index, status);
            }
        }
    }

    fn remove_from_lists(&mut self, id: RequestId) {
        self.pending.retain(|r| r.id != id);
        self.executing.remove(&id);
    }

    fn publish_counts(&self) {
        self.sink
            .set_requests_count(self.pending.len() + self.executing.len());
        self.sink.set_executing_count(self.executing.len());
    }

    fn refresh_activity(&mut self) {
        let next = Activity::scan(self.executing.values());
        self.activity.publish(next, self.sink.as_ref());
    }
}
