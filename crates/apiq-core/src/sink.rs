//! Scheduler-wide counters pushed to an external observer.
//!
//! The scheduler calls into a [`StateSink`] after every queue change. It is
//! push-only: nothing a sink does feeds back into scheduling.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Receives queue counters and activity flags.
pub trait StateSink: Send + Sync + 'static {
    /// Pending plus executing.
    fn set_requests_count(&self, count: usize);
    fn set_executing_count(&self, count: usize);
    /// Uploading or downloading.
    fn set_working(&self, working: bool);
    /// Some executing request uses a verb other than GET.
    fn set_uploading(&self, uploading: bool);
    /// Some executing request uses GET.
    fn set_downloading(&self, downloading: bool);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl StateSink for NoopSink {
    fn set_requests_count(&self, _count: usize) {}
    fn set_executing_count(&self, _count: usize) {}
    fn set_working(&self, _working: bool) {}
    fn set_uploading(&self, _uploading: bool) {}
    fn set_downloading(&self, _downloading: bool) {}
}

/// Point-in-time copy of [`WrapperState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StateSnapshot {
    pub request_count: usize,
    pub executing_count: usize,
    pub working: bool,
    pub uploading: bool,
    pub downloading: bool,
}

/// Sink that keeps the latest values for anyone to read.
#[derive(Debug, Default)]
pub struct WrapperState {
    request_count: AtomicUsize,
    executing_count: AtomicUsize,
    working: AtomicBool,
    uploading: AtomicBool,
    downloading: AtomicBool,
}

impl WrapperState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            request_count: self.request_count.load(Ordering::Acquire),
            executing_count: self.executing_count.load(Ordering::Acquire),
            working: self.working.load(Ordering::Acquire),
            uploading: self.uploading.load(Ordering::Acquire),
            downloading: self.downloading.load(Ordering::Acquire),
        }
    }
}

impl StateSink for WrapperState {
    fn set_requests_count(&self, count: usize) {
        self.request_count.store(count, Ordering::Release);
    }

    fn set_executing_count(&self, count: usize) {
        self.executing_count.store(count, Ordering::Release);
    }

    fn set_working(&self, working: bool) {
        self.working.store(working, Ordering::Release);
    }

    fn set_uploading(&self, uploading: bool) {
        self.uploading.store(uploading, Ordering::Release);
    }

    fn set_downloading(&self, downloading: bool) {
        self.downloading.store(downloading, Ordering::Release);
    }
}
