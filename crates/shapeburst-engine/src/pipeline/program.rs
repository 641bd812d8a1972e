use std::borrow::Cow;

use crate::coords::Vec2;
use crate::device::{
    AttributeLocation, ProgramHandle, RenderDevice, SetupError, ShaderStage, UniformKind,
    UniformLocation,
};

// ── interface names ───────────────────────────────────────────────────────

pub const POSITION_ATTRIBUTE: &str = "vertex_position";
pub const COLOR_ATTRIBUTE: &str = "vertex_color";

pub const CANVAS_SIZE_UNIFORM: &str = "canvas_size";
pub const SHAPE_LOCATION_UNIFORM: &str = "shape_location";
pub const SHAPE_SIZE_UNIFORM: &str = "shape_size";

// ── sources ───────────────────────────────────────────────────────────────

/// WGSL source of each stage of the shape program.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSources {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self {
            vertex: Cow::Borrowed(include_str!("shaders/shape_vertex.wgsl")),
            fragment: Cow::Borrowed(include_str!("shaders/shape_fragment.wgsl")),
        }
    }
}

impl ShaderSources {
    pub fn new(vertex: impl Into<Cow<'static, str>>, fragment: impl Into<Cow<'static, str>>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

// ── program ───────────────────────────────────────────────────────────────

/// Linked shape program with every slot the frame loop needs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShapeProgram {
    pub program: ProgramHandle,
    pub position_attribute: AttributeLocation,
    pub color_attribute: AttributeLocation,
    pub canvas_size: UniformLocation,
    pub shape_location: UniformLocation,
    pub shape_size: UniformLocation,
}

impl ShapeProgram {
    /// Compiles both stages, links them, and resolves attribute and uniform slots.
    ///
    /// Stops at the first failing step. A uniform whose declared type does not
    /// match its use counts as unresolved.
    pub fn build<D: RenderDevice + ?Sized>(
        device: &mut D,
        sources: &ShaderSources,
    ) -> Result<Self, SetupError> {
        let vertex = device.compile_shader(ShaderStage::Vertex, &sources.vertex)?;
        let fragment = device.compile_shader(ShaderStage::Fragment, &sources.fragment)?;
        let program = device.link_program(vertex, fragment)?;
        log::debug!("shape program linked");

        let position = device.attribute_location(program, POSITION_ATTRIBUTE);
        let color = device.attribute_location(program, COLOR_ATTRIBUTE);
        let (Some(position_attribute), Some(color_attribute)) = (position, color) else {
            return Err(SetupError::ResourceBinding {
                interface: "attribute",
                report: format!(
                    "{POSITION_ATTRIBUTE}={}, {COLOR_ATTRIBUTE}={}",
                    position.is_some(),
                    color.is_some()
                ),
            });
        };

        let uniform = |name: &str, kind: UniformKind| {
            device
                .uniform_location(program, name)
                .filter(|location| location.kind() == kind)
        };
        let canvas = uniform(CANVAS_SIZE_UNIFORM, UniformKind::Vec2);
        let location = uniform(SHAPE_LOCATION_UNIFORM, UniformKind::Vec2);
        let size = uniform(SHAPE_SIZE_UNIFORM, UniformKind::Float);
        let (Some(canvas_size), Some(shape_location), Some(shape_size)) = (canvas, location, size)
        else {
            return Err(SetupError::ResourceBinding {
                interface: "uniform",
                report: format!(
                    "{CANVAS_SIZE_UNIFORM}={}, {SHAPE_LOCATION_UNIFORM}={}, {SHAPE_SIZE_UNIFORM}={}",
                    canvas.is_some(),
                    location.is_some(),
                    size.is_some()
                ),
            });
        };

        log::debug!(
            "shape program slots: position={} color={}",
            position_attribute.0,
            color_attribute.0
        );

        Ok(Self {
            program,
            position_attribute,
            color_attribute,
            canvas_size,
            shape_location,
            shape_size,
        })
    }
}

/// CPU evaluation of the vertex stage: model space to clip space.
pub fn shade_vertex(model: Vec2, location: Vec2, size: f32, canvas: Vec2) -> Vec2 {
    let final_position = model * size + location;
    (final_position / canvas) * 2.0 - 1.0
}
