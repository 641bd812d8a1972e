use std::collections::HashMap;

use crate::coords::{SurfaceSize, Viewport};

use super::shader::{self, CompiledStage, LinkedProgram};
use super::{
    AttributeLocation, BufferHandle, ClearValues, PresentStatus, ProgramHandle, RenderDevice,
    SetupError, ShaderHandle, ShaderStage, UniformLocation, UniformValue, VertexAttributeBinding,
    VertexLayoutHandle,
};

/// Frames kept by a [`HeadlessDevice`] unless configured otherwise.
pub const DEFAULT_FRAME_HISTORY: usize = 120;

/// Command recorded by [`HeadlessDevice`], in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    ResizeSurface(SurfaceSize),
    Clear(ClearValues),
    SetViewport(Viewport),
    UseProgram(ProgramHandle),
    SetUniform(UniformLocation, UniformValue),
    BindVertexLayout(VertexLayoutHandle),
    Draw { first_vertex: u32, vertex_count: u32 },
    Present,
}

/// A draw as the GPU would have seen it.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramHandle,
    pub layout: VertexLayoutHandle,
    pub first_vertex: u32,
    pub vertex_count: u32,
    /// Decoded `(x, y, z, w)` per drawn vertex, keyed by attribute location.
    pub attributes: HashMap<AttributeLocation, Vec<[f32; 4]>>,
    /// Snapshot of every uniform block of `program` at draw time.
    pub uniform_blocks: Vec<Vec<u8>>,
}

impl DrawRecord {
    pub fn attribute(&self, location: AttributeLocation) -> Option<&[[f32; 4]]> {
        self.attributes.get(&location).map(Vec::as_slice)
    }

    /// Reads a uniform value as it was when the draw was issued.
    pub fn uniform(&self, location: UniformLocation) -> Option<UniformValue> {
        if location.program != self.program {
            return None;
        }
        let block = self.uniform_blocks.get(location.block as usize)?;
        UniformValue::read_from(location.kind, block.get(location.offset as usize..)?)
    }
}

/// Everything recorded between two `present` calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameRecord {
    pub surface: SurfaceSize,
    pub clear: Option<ClearValues>,
    pub viewport: Option<Viewport>,
    pub draws: Vec<DrawRecord>,
}

struct Buffer {
    label: String,
    data: Vec<u8>,
}

struct Layout {
    attributes: Vec<VertexAttributeBinding>,
}

struct Program {
    linked: LinkedProgram,
    /// Current uniform values, one byte block per uniform block.
    uniforms: Vec<Vec<u8>>,
}

/// Software render device.
///
/// Compiles and links real WGSL through the shared naga front end, keeps buffer
/// contents on the CPU, records every command, and captures each draw with its
/// decoded vertex attributes and uniform state. Optional budgets make allocation
/// failures reproducible.
///
/// Only the most recent presented frames are kept, together with their commands,
/// so a long headless loop runs in bounded memory.
pub struct HeadlessDevice {
    buffers: Vec<Buffer>,
    shaders: Vec<CompiledStage>,
    programs: Vec<Program>,
    layouts: Vec<Layout>,

    buffer_budget: Option<usize>,
    layout_budget: Option<usize>,

    surface: SurfaceSize,
    current_program: Option<ProgramHandle>,
    current_layout: Option<VertexLayoutHandle>,

    commands: Vec<DeviceCommand>,
    /// Number of commands of each kept frame, oldest first.
    frame_commands: Vec<usize>,
    /// Index in `commands` where the unpresented frame starts.
    pending_start: usize,
    pending: FrameRecord,
    frames: Vec<FrameRecord>,
    frame_history: usize,
    presented: u64,
}

impl HeadlessDevice {
    pub fn new(surface: SurfaceSize) -> Self {
        Self {
            buffers: Vec::new(),
            shaders: Vec::new(),
            programs: Vec::new(),
            layouts: Vec::new(),
            buffer_budget: None,
            layout_budget: None,
            surface,
            current_program: None,
            current_layout: None,
            commands: Vec::new(),
            frame_commands: Vec::new(),
            pending_start: 0,
            pending: FrameRecord {
                surface,
                ..FrameRecord::default()
            },
            frames: Vec::new(),
            frame_history: DEFAULT_FRAME_HISTORY,
            presented: 0,
        }
    }

    /// Allows at most `count` buffer allocations; later ones fail.
    pub fn with_buffer_budget(mut self, count: usize) -> Self {
        self.buffer_budget = Some(count);
        self
    }

    /// Allows at most `count` vertex layout allocations; later ones fail.
    pub fn with_layout_budget(mut self, count: usize) -> Self {
        self.layout_budget = Some(count);
        self
    }

    /// Keeps at most `frames` presented frames (at least one); older frames and
    /// their commands are dropped.
    pub fn with_frame_history(mut self, frames: usize) -> Self {
        self.frame_history = frames.max(1);
        self
    }

    /// Commands of the kept frames and of the frame in progress.
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drains recorded commands.
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        self.frame_commands.iter_mut().for_each(|n| *n = 0);
        self.pending_start = 0;
        std::mem::take(&mut self.commands)
    }

    /// Kept frames, oldest first.
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    /// Drains kept frames together with their commands.
    pub fn take_frames(&mut self) -> Vec<FrameRecord> {
        let kept: usize = self.frame_commands.drain(..).sum();
        self.commands.drain(..kept);
        self.pending_start = 0;
        std::mem::take(&mut self.frames)
    }

    /// Frames presented over the device's lifetime, kept or not.
    pub fn presented_frames(&self) -> u64 {
        self.presented
    }

    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    /// Contents and label of a buffer created by this device.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<(&str, &[u8])> {
        self.buffers
            .get(buffer.index())
            .map(|b| (b.label.as_str(), b.data.as_slice()))
    }

    fn decode_attributes(&self, layout: &Layout, first: u32, count: u32) -> HashMap<AttributeLocation, Vec<[f32; 4]>> {
        let mut out = HashMap::new();

        for attr in &layout.attributes {
            let data = self
                .buffers
                .get(attr.buffer.index())
                .map_or(&[][..], |b| b.data.as_slice());
            let stride = attr.effective_stride() as usize;
            let size = attr.format.byte_size() as usize;

            let values = (first..first + count)
                .map(|vertex| {
                    let start = attr.offset as usize + vertex as usize * stride;
                    match data.get(start..start + size) {
                        Some(bytes) => attr.format.decode(bytes),
                        None => {
                            log::warn!("headless: vertex {vertex} reads past the end of its buffer");
                            [0.0, 0.0, 0.0, 1.0]
                        }
                    }
                })
                .collect();

            out.insert(attr.location, values);
        }

        out
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_vertex_buffer(&mut self, label: &str, contents: &[u8]) -> Result<BufferHandle, SetupError> {
        if contents.is_empty() {
            return Err(SetupError::allocation(label, "buffer contents are empty"));
        }
        if self.buffer_budget.is_some_and(|n| self.buffers.len() >= n) {
            return Err(SetupError::allocation(label, "device buffer budget exhausted"));
        }

        self.buffers.push(Buffer {
            label: label.to_owned(),
            data: contents.to_vec(),
        });
        Ok(BufferHandle(self.buffers.len() as u32 - 1))
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, SetupError> {
        let compiled = shader::compile(stage, source)?;
        self.shaders.push(compiled);
        Ok(ShaderHandle(self.shaders.len() as u32 - 1))
    }

    fn link_program(&mut self, vertex: ShaderHandle, fragment: ShaderHandle) -> Result<ProgramHandle, SetupError> {
        let (Some(vs), Some(fs)) = (self.shaders.get(vertex.index()), self.shaders.get(fragment.index()))
        else {
            return Err(SetupError::ShaderLink {
                log: "unknown shader handle".to_owned(),
            });
        };

        let linked = shader::link(vs, fs)?;
        let uniforms = linked
            .blocks
            .iter()
            .map(|b| vec![0u8; b.size as usize])
            .collect();

        self.programs.push(Program { linked, uniforms });
        Ok(ProgramHandle(self.programs.len() as u32 - 1))
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<AttributeLocation> {
        self.programs.get(program.index())?.linked.attribute(name)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs.get(program.index())?.linked.uniform(program, name)
    }

    fn create_vertex_layout(
        &mut self,
        label: &str,
        attributes: &[VertexAttributeBinding],
    ) -> Result<VertexLayoutHandle, SetupError> {
        if self.layout_budget.is_some_and(|n| self.layouts.len() >= n) {
            return Err(SetupError::allocation(label, "device vertex layout budget exhausted"));
        }
        for attr in attributes {
            if !attr.format.is_valid() {
                return Err(SetupError::allocation(label, "attribute must have 1 to 4 components"));
            }
            if attr.buffer.index() >= self.buffers.len() {
                return Err(SetupError::allocation(label, "attribute references an unknown buffer"));
            }
        }

        self.layouts.push(Layout {
            attributes: attributes.to_vec(),
        });
        Ok(VertexLayoutHandle(self.layouts.len() as u32 - 1))
    }

    fn surface_size(&self) -> SurfaceSize {
        self.surface
    }

    fn resize_surface(&mut self, size: SurfaceSize) {
        self.commands.push(DeviceCommand::ResizeSurface(size));
        self.surface = size;
        self.pending.surface = size;
    }

    fn clear(&mut self, values: ClearValues) {
        self.commands.push(DeviceCommand::Clear(values));
        self.pending.clear = Some(values);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(DeviceCommand::SetViewport(viewport));
        self.pending.viewport = Some(viewport);
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.commands.push(DeviceCommand::UseProgram(program));
        self.current_program = Some(program);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.commands.push(DeviceCommand::SetUniform(location, value));

        if value.kind() != location.kind {
            log::warn!("headless: uniform type mismatch ({:?} <- {:?})", location.kind, value.kind());
            return;
        }
        let Some(block) = self
            .programs
            .get_mut(location.program.index())
            .and_then(|p| p.uniforms.get_mut(location.block as usize))
        else {
            log::warn!("headless: uniform location does not belong to a live program");
            return;
        };
        if !block
            .get_mut(location.offset as usize..)
            .is_some_and(|dst| value.write_to(dst))
        {
            log::warn!("headless: uniform write outside its block");
        }
    }

    fn bind_vertex_layout(&mut self, layout: VertexLayoutHandle) {
        self.commands.push(DeviceCommand::BindVertexLayout(layout));
        self.current_layout = Some(layout);
    }

    fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        self.commands.push(DeviceCommand::Draw {
            first_vertex,
            vertex_count,
        });

        let (Some(program), Some(layout)) = (self.current_program, self.current_layout) else {
            log::warn!("headless: draw issued without a program and vertex layout bound");
            return;
        };
        let (Some(p), Some(l)) = (self.programs.get(program.index()), self.layouts.get(layout.index()))
        else {
            log::warn!("headless: draw references unknown resources");
            return;
        };

        let record = DrawRecord {
            program,
            layout,
            first_vertex,
            vertex_count,
            attributes: self.decode_attributes(l, first_vertex, vertex_count),
            uniform_blocks: p.uniforms.clone(),
        };
        self.pending.draws.push(record);
    }

    fn present(&mut self) -> PresentStatus {
        self.commands.push(DeviceCommand::Present);

        let next = FrameRecord {
            surface: self.surface,
            ..FrameRecord::default()
        };
        let frame = std::mem::replace(&mut self.pending, next);
        self.frames.push(frame);
        self.frame_commands.push(self.commands.len() - self.pending_start);
        self.presented += 1;

        if self.frames.len() > self.frame_history {
            let excess = self.frames.len() - self.frame_history;
            self.frames.drain(..excess);
            let dropped: usize = self.frame_commands.drain(..excess).sum();
            self.commands.drain(..dropped);
        }
        self.pending_start = self.commands.len();

        if self.surface.is_empty() {
            PresentStatus::Skipped
        } else {
            PresentStatus::Presented
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::device::AttributeFormat;
    use crate::paint::Color;

    const VS: &str = r#"
struct Params {
    offset: vec2<f32>,
    scale: f32,
}

@group(0) @binding(0) var<uniform> params: Params;

struct Out {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(@location(0) pos: vec2<f32>, @location(1) color: vec4<f32>) -> Out {
    var out: Out;
    out.clip = vec4<f32>(pos * params.scale + params.offset, 0.0, 1.0);
    out.color = color.rgb;
    return out;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
"#;

    fn positions() -> Vec<u8> {
        bytemuck::cast_slice(&[0.0f32, 1.0, -1.0, -1.0, 1.0, -1.0]).to_vec()
    }

    fn program(device: &mut HeadlessDevice) -> ProgramHandle {
        let vs = device.compile_shader(ShaderStage::Vertex, VS).unwrap();
        let fs = device.compile_shader(ShaderStage::Fragment, FS).unwrap();
        device.link_program(vs, fs).unwrap()
    }

    // ── allocation ────────────────────────────────────────────────────────

    #[test]
    fn buffer_budget_is_enforced() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8)).with_buffer_budget(1);
        assert!(device.create_vertex_buffer("a", &[1]).is_ok());
        match device.create_vertex_buffer("b", &[1]) {
            Err(SetupError::ResourceAllocation { resource, .. }) => assert_eq!(resource, "b"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_buffer_is_rejected() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8));
        assert!(matches!(
            device.create_vertex_buffer("empty", &[]),
            Err(SetupError::ResourceAllocation { .. })
        ));
    }

    #[test]
    fn layout_rejects_unknown_buffer() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8));
        let binding = VertexAttributeBinding::packed(
            BufferHandle(9),
            AttributeLocation(0),
            AttributeFormat::FLOAT32X2,
        );
        assert!(device.create_vertex_layout("bad", &[binding]).is_err());
    }

    // ── draws ─────────────────────────────────────────────────────────────

    #[test]
    fn draw_captures_attributes_and_uniforms() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8));
        let program = program(&mut device);
        let pos = device.create_vertex_buffer("pos", &positions()).unwrap();
        let col = device.create_vertex_buffer("col", &[255, 0, 0, 0, 255, 0, 0, 0, 255]).unwrap();

        let pos_loc = device.attribute_location(program, "pos").unwrap();
        let col_loc = device.attribute_location(program, "color").unwrap();
        let layout = device
            .create_vertex_layout(
                "tri",
                &[
                    VertexAttributeBinding::packed(pos, pos_loc, AttributeFormat::FLOAT32X2),
                    VertexAttributeBinding::packed(col, col_loc, AttributeFormat::UNORM8X3),
                ],
            )
            .unwrap();
        let scale = device.uniform_location(program, "scale").unwrap();

        device.use_program(program);
        device.set_uniform(scale, UniformValue::Float(2.5));
        device.bind_vertex_layout(layout);
        device.draw(0, 3);
        device.set_uniform(scale, UniformValue::Float(4.0));
        device.draw(0, 3);
        assert_eq!(device.present(), PresentStatus::Presented);

        let frame = device.last_frame().unwrap();
        assert_eq!(frame.draws.len(), 2);
        let first = &frame.draws[0];
        assert_eq!(first.uniform(scale), Some(UniformValue::Float(2.5)));
        assert_eq!(frame.draws[1].uniform(scale), Some(UniformValue::Float(4.0)));
        assert_eq!(first.attribute(pos_loc).unwrap()[0], [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(first.attribute(col_loc).unwrap()[2], [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn mismatched_uniform_kind_is_ignored() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8));
        let program = program(&mut device);
        let offset = device.uniform_location(program, "offset").unwrap();
        device.use_program(program);
        device.set_uniform(offset, UniformValue::Float(1.0));
        assert_eq!(device.programs[0].uniforms[0][..8], [0u8; 8]);

        device.set_uniform(offset, UniformValue::Vec2(Vec2::new(1.0, 2.0)));
        assert_eq!(
            UniformValue::read_from(offset.kind(), &device.programs[0].uniforms[0]),
            Some(UniformValue::Vec2(Vec2::new(1.0, 2.0)))
        );
    }

    #[test]
    fn draw_without_bindings_records_nothing() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8));
        device.draw(0, 3);
        device.present();
        assert!(device.last_frame().unwrap().draws.is_empty());
    }

    #[test]
    fn present_splits_frames_and_reports_empty_surface() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8));
        device.clear(ClearValues {
            color: Color::opaque(0.1, 0.1, 0.1),
            depth: Some(1.0),
        });
        assert_eq!(device.present(), PresentStatus::Presented);
        device.resize_surface(SurfaceSize::new(0, 8));
        assert_eq!(device.present(), PresentStatus::Skipped);

        assert_eq!(device.frames().len(), 2);
        assert!(device.frames()[0].clear.is_some());
        assert!(device.frames()[1].clear.is_none());
        assert_eq!(device.frames()[1].surface, SurfaceSize::new(0, 8));
    }

    // ── history ───────────────────────────────────────────────────────────

    fn draw_frame(device: &mut HeadlessDevice, program: ProgramHandle, layout: VertexLayoutHandle) {
        device.clear(ClearValues {
            color: Color::opaque(0.08, 0.08, 0.08),
            depth: Some(1.0),
        });
        device.use_program(program);
        device.bind_vertex_layout(layout);
        for _ in 0..8 {
            device.draw(0, 3);
        }
        device.present();
    }

    fn triangle_layout(device: &mut HeadlessDevice, program: ProgramHandle) -> VertexLayoutHandle {
        let pos = device.create_vertex_buffer("pos", &positions()).unwrap();
        let pos_loc = device.attribute_location(program, "pos").unwrap();
        device
            .create_vertex_layout(
                "tri",
                &[VertexAttributeBinding::packed(pos, pos_loc, AttributeFormat::FLOAT32X2)],
            )
            .unwrap()
    }

    #[test]
    fn long_loop_keeps_bounded_history() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8)).with_frame_history(4);
        let program = program(&mut device);
        let layout = triangle_layout(&mut device, program);

        for _ in 0..10_000 {
            draw_frame(&mut device, program, layout);
        }

        // clear, use_program, bind, 8 draws, present
        assert_eq!(device.presented_frames(), 10_000);
        assert_eq!(device.frames().len(), 4);
        assert_eq!(device.commands().len(), 4 * 12);
        assert!(matches!(device.commands()[0], DeviceCommand::Clear(_)));
        assert_eq!(device.last_frame().unwrap().draws.len(), 8);
    }

    #[test]
    fn default_history_is_bounded() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8));
        for _ in 0..DEFAULT_FRAME_HISTORY + 30 {
            device.present();
        }
        assert_eq!(device.frames().len(), DEFAULT_FRAME_HISTORY);
        assert_eq!(device.commands().len(), DEFAULT_FRAME_HISTORY);
    }

    #[test]
    fn take_frames_drains_frames_and_their_commands() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8));
        let program = program(&mut device);
        let layout = triangle_layout(&mut device, program);

        draw_frame(&mut device, program, layout);
        draw_frame(&mut device, program, layout);
        device.clear(ClearValues {
            color: Color::opaque(0.0, 0.0, 0.0),
            depth: None,
        });

        let frames = device.take_frames();
        assert_eq!(frames.len(), 2);
        assert!(device.frames().is_empty());
        assert_eq!(device.commands().len(), 1);

        device.present();
        assert_eq!(device.frames().len(), 1);
        assert_eq!(device.commands().len(), 2);
        assert_eq!(device.presented_frames(), 3);
    }

    #[test]
    fn take_commands_keeps_history_consistent() {
        let mut device = HeadlessDevice::new(SurfaceSize::new(8, 8)).with_frame_history(1);
        device.present();
        device.take_commands();
        device.present();
        device.present();
        assert_eq!(device.commands(), [DeviceCommand::Present].as_slice());
    }
}
