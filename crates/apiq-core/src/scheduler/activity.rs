//! Working / uploading / downloading flags derived from the executing set.

use crate::request::Request;
use crate::sink::StateSink;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct Activity {
    pub working: bool,
    pub uploading: bool,
    pub downloading: bool,
}

impl Activity {
    /// Scan executing requests; stops once both directions have been seen.
    pub(super) fn scan<'a>(executing: impl IntoIterator<Item = &'a Request>) -> Self {
        let mut uploading = false;
        let mut downloading = false;
        for req in executing {
            if req.method().is_read() {
                downloading = true;
            } else {
                uploading = true;
            }
            if uploading && downloading {
                break;
            }
        }
        Self {
            working: uploading || downloading,
            uploading,
            downloading,
        }
    }

    /// Push only the flags that differ from `self`, then adopt `next`.
    pub(super) fn publish(&mut self, next: Activity, sink: &dyn StateSink) {
        if self.working != next.working {
            sink.set_working(next.working);
        }
        if self.uploading != next.uploading {
            sink.set_uploading(next.uploading);
        }
        if self.downloading != next.downloading {
            sink.set_downloading(next.downloading);
        }
        *self = next;
    }
}
