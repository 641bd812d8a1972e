use std::time::Duration;

use super::{MonotonicTime, TimeSource};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f64,

    /// Timestamp taken at the tick, relative to the source origin.
    pub now: Duration,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// One clock per render loop. Delta time is not clamped: a stalled frame yields a
/// large `dt`, and downstream systems are expected to absorb it (the particle
/// spawner catches up by spawning several shapes in one tick).
#[derive(Debug, Clone)]
pub struct FrameClock<S: TimeSource = MonotonicTime> {
    source: S,
    last: Duration,
    frame_index: u64,
}

impl FrameClock<MonotonicTime> {
    /// Creates a wall-clock frame clock whose baseline is "now".
    pub fn new() -> Self {
        Self::with_source(MonotonicTime::new())
    }
}

impl<S: TimeSource> FrameClock<S> {
    /// Creates a clock reading from `source`, with the baseline at the current time.
    pub fn with_source(source: S) -> Self {
        let last = source.now();
        Self {
            source,
            last,
            frame_index: 0,
        }
    }

    /// Resets the clock baseline.
    ///
    /// Useful when resuming from suspension, where the gap should not count as frame time.
    pub fn reset(&mut self) {
        self.last = self.source.now();
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of ticks taken so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_index
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let now = self.source.now();
        let dt = now.saturating_sub(self.last);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f64(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock<MonotonicTime> {
    fn default() -> Self {
        Self::new()
    }
}
