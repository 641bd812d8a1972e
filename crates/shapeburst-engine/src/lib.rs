//! Shapeburst engine crate.
//!
//! A fixed-budget particle loop: short-lived triangles are spawned at a
//! time-accumulated rate, moved every frame, evicted when expired or over the
//! population cap, and drawn with one program and one draw per shape.
//!
//! Setup runs once (`frame::ShapeScene`); every frame runs through
//! `frame::FrameDriver` against any `device::RenderDevice`.

pub mod binding;
pub mod coords;
pub mod device;
pub mod diagnostics;
pub mod frame;
pub mod geometry;
pub mod logging;
pub mod paint;
pub mod particles;
pub mod pipeline;
pub mod time;
pub mod window;
