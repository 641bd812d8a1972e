use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Supplies monotonic time measured from an arbitrary fixed origin.
pub trait TimeSource {
    fn now(&self) -> Duration;
}

/// Wall-clock time source backed by `Instant`.
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Synthetic time source advanced explicitly by the host.
///
/// Clones share the same timeline, so a harness can keep one handle while the
/// clock owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Rc<Cell<Duration>>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_secs(&self, secs: f32) {
        self.advance(Duration::from_secs_f32(secs));
    }

    /// Jumps to `to`. Moving backwards is ignored to keep the source monotonic.
    pub fn set(&self, to: Duration) {
        if to >= self.now.get() {
            self.now.set(to);
        }
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
