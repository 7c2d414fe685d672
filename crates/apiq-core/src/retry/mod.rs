//! Retry policy.
//!
//! Classifies transport errors (only deadline expiry is transient) and decides
//! whether a request goes back to the pending queue or fails for good.
//! There is no backoff: a retried request simply rejoins the back of the queue.

mod classify;
mod policy;

pub use classify::classify;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
