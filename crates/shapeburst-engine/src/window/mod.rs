//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the window, and drives one `FrameDriver`
//! against a `WgpuDevice` bound to that window.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
