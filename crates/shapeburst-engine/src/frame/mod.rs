//! Frame driving.
//!
//! - `scene`: one-time setup of geometry, program and variants
//! - `driver`: the per-frame update and draw sequence
//! - `host`: the display surface a host reports its size through

mod driver;
mod host;
mod scene;

pub use driver::{DriverSetupError, DriverState, FrameDriver, FrameReport, CLEAR_DEPTH};
pub use host::{DisplaySurface, FixedSurface};
pub use scene::{SceneConfig, ShapeScene, DEFAULT_CLEAR_COLOR};
