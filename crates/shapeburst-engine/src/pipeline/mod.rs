//! Shape shader program.
//!
//! WGSL sources live in `shaders/` and are embedded at build time.

mod program;

pub use program::{
    shade_vertex, ShaderSources, ShapeProgram, CANVAS_SIZE_UNIFORM, COLOR_ATTRIBUTE,
    POSITION_ATTRIBUTE, SHAPE_LOCATION_UNIFORM, SHAPE_SIZE_UNIFORM,
};
