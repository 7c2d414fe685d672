pub mod config;
pub mod logging;

pub mod method;
pub mod request;
pub mod retry;
pub mod scheduler;
pub mod sink;
pub mod transport;

pub use config::ApiqConfig;
pub use method::Method;
pub use request::{BulkOptions, CallError, CallHandle, CallOptions, CallResult, CompletionPolicy, Payload};
pub use scheduler::Scheduler;
pub use sink::{NoopSink, StateSink, WrapperState};
