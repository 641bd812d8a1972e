//! Time subsystem.
//!
//! Provides frame timing decoupled from any particular host:
//! - a `TimeSource` supplies monotonic time (wall clock or synthetic)
//! - one `FrameClock` per render loop turns it into per-frame `FrameTime`

mod frame_clock;
mod source;

pub use frame_clock::{FrameClock, FrameTime};
pub use source::{ManualTime, MonotonicTime, TimeSource};
