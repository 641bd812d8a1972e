//! Coordinate and size types shared by the simulation and the renderers.
//!
//! Canonical CPU space:
//! - surface pixels
//! - origin bottom-left (matches the clip-space mapping in the shape shader)
//! - +X right, +Y up

mod size;
mod vec2;
mod viewport;

pub use size::SurfaceSize;
pub use vec2::Vec2;
pub use viewport::Viewport;
