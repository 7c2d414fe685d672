//! Completion signal: a single-fire, single-consumer future per request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use super::result::{CallError, CallResult};

/// Sending half, owned by the scheduler until the request resolves.
pub(crate) type Completion = oneshot::Sender<CallResult>;

/// Resolves to the request's [`CallResult`]. Never fails: if the scheduler
/// disappears first, the result is a [`CallError::SchedulerGone`] failure.
#[derive(Debug)]
pub struct CallHandle {
    rx: oneshot::Receiver<CallResult>,
}

impl CallHandle {
    pub(crate) fn channel() -> (Completion, CallHandle) {
        let (tx, rx) = oneshot::channel();
        (tx, CallHandle { rx })
    }

    /// A handle that is already resolved (validation failures).
    pub(crate) fn ready(result: CallResult) -> CallHandle {
        let (tx, handle) = Self::channel();
        let _ = tx.send(result);
        handle
    }

    /// Non-blocking peek: `Some` once the result has been delivered.
    /// Consumes the result; later polls yield a `SchedulerGone` failure.
    pub fn try_result(&mut self) -> Option<CallResult> {
        match self.rx.try_recv() {
            Ok(r) => Some(r),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(CallResult::failure(CallError::SchedulerGone))
            }
        }
    }
}

impl Future for CallHandle {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or_else(|_| CallResult::failure(CallError::SchedulerGone)))
    }
}
