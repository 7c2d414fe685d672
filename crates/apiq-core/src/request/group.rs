//! Bulk groups: fan-out of child requests, fan-in into one result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::handle::{CallHandle, Completion};
use super::result::{CallResult, Payload};
use super::{GroupLink, Request, RequestId, RequestStatus};

/// Progress callback, called with the ratio of settled children in [0, 1].
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// How a child failure affects the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy {
    /// The first failed child fails the group, even while siblings are pending.
    #[default]
    FailFast,
    /// Wait for every child to settle, then fail if any child failed.
    ContinueWithFailure,
}

impl CompletionPolicy {
    pub fn from_continue_flag(continue_with_failure: bool) -> Self {
        if continue_with_failure {
            CompletionPolicy::ContinueWithFailure
        } else {
            CompletionPolicy::FailFast
        }
    }
}

/// Options for `submit_bulk`.
#[derive(Clone, Default)]
pub struct BulkOptions {
    pub policy: CompletionPolicy,
    pub on_progress: Option<ProgressFn>,
    pub alias: Option<String>,
}

impl BulkOptions {
    pub fn fail_fast() -> Self {
        Self::default()
    }

    pub fn continue_with_failure() -> Self {
        Self {
            policy: CompletionPolicy::ContinueWithFailure,
            ..Self::default()
        }
    }

    pub fn on_progress(mut self, f: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl fmt::Debug for BulkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkOptions")
            .field("policy", &self.policy)
            .field("on_progress", &self.on_progress.is_some())
            .field("alias", &self.alias)
            .finish()
    }
}

/// Scheduler-side view of one child: its state and last settled result.
#[derive(Debug)]
struct ChildSlot {
    id: RequestId,
    alias: Option<String>,
    status: RequestStatus,
    result: CallResult,
}

/// A set of child requests resolved together.
pub struct BulkGroup {
    id: RequestId,
    policy: CompletionPolicy,
    status: RequestStatus,
    progress: f64,
    on_progress: Option<ProgressFn>,
    alias: Option<String>,
    children: Vec<ChildSlot>,
    completion: Completion,
}

impl fmt::Debug for BulkGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkGroup")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("status", &self.status)
            .field("progress", &self.progress)
            .field("children", &self.children)
            .finish()
    }
}

impl BulkGroup {
    pub(crate) fn new(options: BulkOptions) -> (Self, CallHandle) {
        let (completion, handle) = CallHandle::channel();
        let group = Self {
            id: RequestId::new(),
            policy: options.policy,
            status: RequestStatus::Waiting,
            progress: 0.0,
            on_progress: options.on_progress,
            alias: options.alias,
            children: Vec::new(),
            completion,
        };
        (group, handle)
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn child_ids(&self) -> impl Iterator<Item = RequestId> + '_ {
        self.children.iter().map(|c| c.id)
    }

    /// Attaches `child` to this group. The child keeps its own retry budget.
    pub(crate) fn add_child(&mut self, child: &mut Request) {
        debug_assert!(child.owner.is_none(), "child already owned by a group");
        child.owner = Some(GroupLink {
            group: self.id,
            index: self.children.len(),
        });
        self.children.push(ChildSlot {
            id: child.id,
            alias: child.options.alias.clone(),
            status: child.status,
            result: CallResult::default(),
        });
    }

    /// Mirrors a non-terminal child transition (admitted, requeued).
    pub(crate) fn mark_child(&mut self, index: usize, status: RequestStatus) {
        if let Some(slot) = self.children.get_mut(index) {
            slot.status = status;
        }
    }

    /// Records a settled child and its stamped result.
    pub(crate) fn settle_child(&mut self, index: usize, status: RequestStatus, result: CallResult) {
        if let Some(slot) = self.children.get_mut(index) {
            slot.status = status;
            slot.result = result;
        }
    }

    /// Aggregate status over the current child states.
    ///
    /// Fail-fast: any failed child fails the group, even while siblings are
    /// still pending. Continue-with-failure waits until nothing is pending,
    /// then fails if any child failed.
    pub fn compute_status(&self) -> RequestStatus {
        match self.policy {
            CompletionPolicy::FailFast => {
                if self.children.iter().any(|c| c.status == RequestStatus::Failed) {
                    RequestStatus::Failed
                } else if self.children.iter().any(|c| !c.status.is_terminal()) {
                    RequestStatus::Waiting
                } else {
                    RequestStatus::Completed
                }
            }
            CompletionPolicy::ContinueWithFailure => {
                let mut failed = false;
                for child in &self.children {
                    match child.status {
                        RequestStatus::Failed => failed = true,
                        RequestStatus::Completed => {}
                        RequestStatus::Waiting | RequestStatus::Executing => {
                            return RequestStatus::Waiting;
                        }
                    }
                }
                if failed {
                    RequestStatus::Failed
                } else {
                    RequestStatus::Completed
                }
            }
        }
    }

    /// Ratio of settled children. An empty group counts as fully settled.
    pub fn compute_progress(&self) -> f64 {
        if self.children.is_empty() {
            return 1.0;
        }
        let settled = self
            .children
            .iter()
            .filter(|c| c.status.is_terminal())
            .count();
        settled as f64 / self.children.len() as f64
    }

    /// Recomputes status and progress and reports progress to the callback.
    /// The callback fires on every call, including ones that leave the group
    /// waiting at an unchanged ratio.
    pub(crate) fn reevaluate(&mut self) -> RequestStatus {
        self.status = self.compute_status();
        self.progress = self.compute_progress();
        if let Some(cb) = &self.on_progress {
            cb(self.progress);
        }
        self.status
    }

    /// Child results keyed by alias, or by index when a child has no alias.
    pub fn payload(&self) -> BTreeMap<String, CallResult> {
        self.children
            .iter()
            .enumerate()
            .map(|(i, child)| {
                let key = child.alias.clone().unwrap_or_else(|| i.to_string());
                let mut result = child.result.clone();
                result.alias = Some(key.clone());
                (key, result)
            })
            .collect()
    }

    /// Fires the group's completion signal. Consumes the group.
    pub(crate) fn resolve(self) -> CallResult {
        let result = CallResult {
            success: self.status != RequestStatus::Failed,
            data: Payload::Children(self.payload()),
            alias: self.alias.clone(),
            ..CallResult::default()
        };
        let _ = self.completion.send(result.clone());
        result
    }
}
