//! Progress reporting seam between the executor and the terminal.

use crate::core::executor::{RunSummary, TaskOutcome};
use std::time::{Duration, Instant};

/// Minimum interval between two transfer updates.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(200);

/// Receives execution events.
///
/// All methods default to no-ops so implementations only handle what they
/// display.
pub trait ProgressSink: Send + Sync {
    fn run_started(&self, _roots: usize, _total_bytes: u64) {}

    /// A stream payload above the size threshold started.
    fn transfer_started(&self, _path: &str, _size: u64) -> Box<dyn TransferProgress> {
        Box::new(NoProgress)
    }

    fn task_finished(&self, _outcome: &TaskOutcome) {}

    fn root_finished(&self, _root: &str) {}

    fn run_finished(&self, _summary: &RunSummary) {}
}

/// Live view of one transfer.
pub trait TransferProgress: Send {
    /// `bytes` is cumulative; `throughput` is in bytes per second.
    fn update(&mut self, bytes: u64, throughput: f64);

    fn finish(&mut self) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

impl TransferProgress for NoProgress {
    fn update(&mut self, _bytes: u64, _throughput: f64) {}
}

/// Rate-limits updates to a [`TransferProgress`].
pub struct Throttled {
    inner: Box<dyn TransferProgress>,
    started: Instant,
    last: Option<Instant>,
    bytes: u64,
}

impl Throttled {
    pub fn new(inner: Box<dyn TransferProgress>) -> Self {
        Self {
            inner,
            started: Instant::now(),
            last: None,
            bytes: 0,
        }
    }

    /// Record the cumulative byte count, forwarding at most every
    /// [`REFRESH_INTERVAL`].
    pub fn report(&mut self, bytes: u64) {
        self.bytes = bytes;
        let now = Instant::now();
        if let Some(last) = self.last {
            if now.duration_since(last) < REFRESH_INTERVAL {
                return;
            }
        }
        self.last = Some(now);
        self.inner.update(bytes, self.throughput(now));
    }

    /// Flush the last count and close the view.
    pub fn finish(mut self) {
        let now = Instant::now();
        self.inner.update(self.bytes, self.throughput(now));
        self.inner.finish();
    }

    fn throughput(&self, now: Instant) -> f64 {
        let secs = now.duration_since(self.started).as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }
}
