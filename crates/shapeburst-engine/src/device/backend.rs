use crate::coords::{SurfaceSize, Viewport};

use super::{
    AttributeLocation, BufferHandle, ClearValues, PresentStatus, ProgramHandle, SetupError,
    ShaderHandle, ShaderStage, UniformLocation, UniformValue, VertexAttributeBinding,
    VertexLayoutHandle,
};

/// GPU context contract used by setup code and the frame driver.
///
/// Setup operations allocate immutable resources and may fail; frame operations
/// record state changes and draws, and `present` submits them.
///
/// Uniform values are program state: they persist across draws and frames until
/// overwritten, and each draw observes the values current at the time it was issued.
pub trait RenderDevice {
    // ── setup ─────────────────────────────────────────────────────────────

    /// Uploads write-once vertex data.
    fn create_vertex_buffer(&mut self, label: &str, contents: &[u8])
        -> Result<BufferHandle, SetupError>;

    /// Compiles one WGSL shader stage.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str)
        -> Result<ShaderHandle, SetupError>;

    /// Links a vertex and a fragment stage into a program.
    fn link_program(&mut self, vertex: ShaderHandle, fragment: ShaderHandle)
        -> Result<ProgramHandle, SetupError>;

    /// Looks up a vertex input by name.
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<AttributeLocation>;

    /// Looks up a uniform by name (a member of any uniform block of the program).
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Creates a reusable association of buffers with attribute slots.
    fn create_vertex_layout(
        &mut self,
        label: &str,
        attributes: &[VertexAttributeBinding],
    ) -> Result<VertexLayoutHandle, SetupError>;

    // ── frame ─────────────────────────────────────────────────────────────

    /// Current drawable size of the render surface.
    fn surface_size(&self) -> SurfaceSize;

    /// Resizes the drawable surface. A no-op when the size is unchanged.
    fn resize_surface(&mut self, size: SurfaceSize);

    fn clear(&mut self, values: ClearValues);

    fn set_viewport(&mut self, viewport: Viewport);

    fn use_program(&mut self, program: ProgramHandle);

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn bind_vertex_layout(&mut self, layout: VertexLayoutHandle);

    /// Draws `vertex_count` vertices as a triangle list, without indexing or instancing.
    fn draw(&mut self, first_vertex: u32, vertex_count: u32);

    /// Submits everything recorded since the previous `present`.
    fn present(&mut self) -> PresentStatus;
}
