//! Color values shared between configuration and renderers.

pub mod color;

pub use color::Color;
