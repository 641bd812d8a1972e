use anyhow::Result;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::coords::{SurfaceSize, Viewport};
use crate::device::shader::{self, CompiledStage};
use crate::device::{
    AttributeLocation, BufferHandle, ClearValues, PresentStatus, ProgramHandle, RenderDevice,
    SetupError, ShaderHandle, ShaderStage, UniformLocation, UniformValue, VertexAttributeBinding,
    VertexLayoutHandle,
};

use super::context::GpuContext;
use super::layout::{map_format, widen_u8};
use super::program::{GpuProgram, PipelineKey};
use super::GpuInit;

/// Required alignment of vertex strides and vertex buffer offsets.
const VERTEX_ALIGNMENT: u64 = 4;

struct GpuBuffer {
    label: String,
    buffer: wgpu::Buffer,
    /// CPU copy, kept so 8-bit attributes can be repacked for wgpu.
    contents: Vec<u8>,
}

struct GpuShader {
    compiled: CompiledStage,
    module: wgpu::ShaderModule,
}

enum SlotSource {
    Shared(BufferHandle),
    /// Repacked copy of a buffer, owned by the layout.
    Widened(wgpu::Buffer),
}

struct VertexSlot {
    source: SlotSource,
    offset: u64,
}

struct GpuVertexLayout {
    key: PipelineKey,
    slots: Vec<VertexSlot>,
}

struct RecordedDraw {
    program: ProgramHandle,
    layout: VertexLayoutHandle,
    first_vertex: u32,
    vertex_count: u32,
    /// Dynamic offsets into each uniform block of `program`.
    offsets: Vec<u32>,
}

#[derive(Default)]
struct RecordedFrame {
    clear: Option<ClearValues>,
    viewport: Option<Viewport>,
    draws: Vec<RecordedDraw>,
}

/// Render device backed by wgpu and a window surface.
///
/// Frame operations are recorded on the CPU; `present` uploads the uniform
/// snapshots of every draw, acquires the surface texture and encodes one
/// render pass.
pub struct WgpuDevice<'w> {
    ctx: GpuContext<'w>,

    buffers: Vec<GpuBuffer>,
    shaders: Vec<GpuShader>,
    programs: Vec<GpuProgram>,
    layouts: Vec<GpuVertexLayout>,

    current_program: Option<ProgramHandle>,
    current_layout: Option<VertexLayoutHandle>,
    frame: RecordedFrame,
}

impl<'w> WgpuDevice<'w> {
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let ctx = GpuContext::new(window, init).await?;
        Ok(Self::from_context(ctx))
    }

    pub fn from_context(ctx: GpuContext<'w>) -> Self {
        Self {
            ctx,
            buffers: Vec::new(),
            shaders: Vec::new(),
            programs: Vec::new(),
            layouts: Vec::new(),
            current_program: None,
            current_layout: None,
            frame: RecordedFrame::default(),
        }
    }

    pub fn context(&self) -> &GpuContext<'w> {
        &self.ctx
    }

    fn reset_staging(&mut self) {
        for program in &mut self.programs {
            program.reset_staging();
        }
    }

    fn build_slot(
        &self,
        label: &str,
        attr: &VertexAttributeBinding,
    ) -> Result<((u32, wgpu::VertexFormat, u64), VertexSlot), SetupError> {
        let limits = self.ctx.device().limits();

        if !attr.format.is_valid() {
            return Err(SetupError::allocation(label, "attribute must have 1 to 4 components"));
        }
        if attr.location.0 >= limits.max_vertex_attributes {
            return Err(SetupError::allocation(
                label,
                format!("attribute location {} exceeds the device limit", attr.location.0),
            ));
        }
        let Some(mapped) = map_format(attr.format) else {
            return Err(SetupError::allocation(label, format!("unsupported attribute format {:?}", attr.format)));
        };
        let Some(source) = self.buffers.get(attr.buffer.index()) else {
            return Err(SetupError::allocation(label, "attribute references an unknown buffer"));
        };

        if mapped.widen_to_four {
            let repacked = widen_u8(
                &source.contents,
                attr.format,
                attr.effective_stride() as usize,
                attr.offset as usize,
            );
            if repacked.is_empty() {
                return Err(SetupError::allocation(label, "attribute buffer holds no complete vertex"));
            }
            let buffer = self.ctx.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} (widened)", source.label)),
                contents: &repacked,
                usage: wgpu::BufferUsages::VERTEX,
            });
            let key = (attr.location.0, mapped.format, 4);
            let slot = VertexSlot {
                source: SlotSource::Widened(buffer),
                offset: 0,
            };
            return Ok((key, slot));
        }

        let stride = attr.effective_stride() as u64;
        if stride % VERTEX_ALIGNMENT != 0 || attr.offset as u64 % VERTEX_ALIGNMENT != 0 {
            return Err(SetupError::allocation(label, "vertex stride and offset must be multiples of 4"));
        }
        if stride > limits.max_vertex_buffer_array_stride as u64 {
            return Err(SetupError::allocation(label, "vertex stride exceeds the device limit"));
        }

        let key = (attr.location.0, mapped.format, stride);
        let slot = VertexSlot {
            source: SlotSource::Shared(attr.buffer),
            offset: attr.offset as u64,
        };
        Ok((key, slot))
    }

    fn slot_buffer<'a>(&'a self, slot: &'a VertexSlot) -> Option<&'a wgpu::Buffer> {
        match &slot.source {
            SlotSource::Shared(handle) => self.buffers.get(handle.index()).map(|b| &b.buffer),
            SlotSource::Widened(buffer) => Some(buffer),
        }
    }

    /// Uploads uniform snapshots and builds missing pipelines for recorded draws.
    fn prepare(&mut self, draws: &[RecordedDraw]) {
        let format = self.ctx.surface_format();
        let device = self.ctx.device();

        for program in self.programs.iter_mut().filter(|p| p.has_staged_draws()) {
            program.upload(device, self.ctx.queue());
        }

        for draw in draws {
            let (Some(program), Some(layout)) = (
                self.programs.get_mut(draw.program.index()),
                self.layouts.get(draw.layout.index()),
            ) else {
                continue;
            };
            let (Some(vs), Some(fs)) = (
                self.shaders.get(program.vertex_shader),
                self.shaders.get(program.fragment_shader),
            ) else {
                continue;
            };
            program.ensure_pipeline(device, &layout.key, &vs.module, &fs.module, format);
        }
    }

    fn clamp_viewport(&self, viewport: Viewport) -> Option<Viewport> {
        let size = self.ctx.size();
        let x = viewport.x.min(size.width);
        let y = viewport.y.min(size.height);
        let clamped = Viewport::new(
            x,
            y,
            viewport.width.min(size.width - x),
            viewport.height.min(size.height - y),
        );
        clamped.is_valid().then_some(clamped)
    }
}

impl RenderDevice for WgpuDevice<'_> {
    fn create_vertex_buffer(&mut self, label: &str, contents: &[u8]) -> Result<BufferHandle, SetupError> {
        if contents.is_empty() {
            return Err(SetupError::allocation(label, "buffer contents are empty"));
        }
        let max = self.ctx.device().limits().max_buffer_size;
        if contents.len() as u64 > max {
            return Err(SetupError::allocation(
                label,
                format!("{} bytes exceed the device maximum of {max}", contents.len()),
            ));
        }

        let buffer = self.ctx.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::VERTEX,
        });

        log::debug!("vertex buffer \"{label}\" uploaded ({} bytes)", contents.len());
        self.buffers.push(GpuBuffer {
            label: label.to_owned(),
            buffer,
            contents: contents.to_vec(),
        });
        Ok(BufferHandle(self.buffers.len() as u32 - 1))
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, SetupError> {
        let compiled = shader::compile(stage, source)?;
        let module = self.ctx.device().create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("shapeburst {stage} shader")),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        self.shaders.push(GpuShader { compiled, module });
        Ok(ShaderHandle(self.shaders.len() as u32 - 1))
    }

    fn link_program(&mut self, vertex: ShaderHandle, fragment: ShaderHandle) -> Result<ProgramHandle, SetupError> {
        let (Some(vs), Some(fs)) = (self.shaders.get(vertex.index()), self.shaders.get(fragment.index()))
        else {
            return Err(SetupError::ShaderLink {
                log: "unknown shader handle".to_owned(),
            });
        };

        let linked = shader::link(&vs.compiled, &fs.compiled)?;

        let limits = self.ctx.device().limits();
        if linked.group_count() > limits.max_bind_groups {
            return Err(SetupError::allocation("shader program", "too many uniform groups for the device"));
        }
        if linked.blocks.len() as u32 > limits.max_dynamic_uniform_buffers_per_pipeline_layout {
            return Err(SetupError::allocation("shader program", "too many uniform blocks for the device"));
        }
        if let Some(block) = linked
            .blocks
            .iter()
            .find(|b| b.size as u64 > limits.max_uniform_buffer_binding_size as u64)
        {
            return Err(SetupError::allocation(
                "shader program",
                format!("uniform block `{}` exceeds the device binding size", block.name),
            ));
        }

        let program = GpuProgram::new(self.ctx.device(), linked, vertex.index(), fragment.index());
        self.programs.push(program);
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
        let max_buffers = self.ctx.device().limits().max_vertex_buffers as usize;
        if attributes.len() > max_buffers {
            return Err(SetupError::allocation(label, "too many vertex buffers for the device"));
        }

        let mut key = Vec::with_capacity(attributes.len());
        let mut slots = Vec::with_capacity(attributes.len());
        for attr in attributes {
            let (k, slot) = self.build_slot(label, attr)?;
            key.push(k);
            slots.push(slot);
        }

        self.layouts.push(GpuVertexLayout {
            key: PipelineKey(key),
            slots,
        });
        Ok(VertexLayoutHandle(self.layouts.len() as u32 - 1))
    }

    fn surface_size(&self) -> SurfaceSize {
        self.ctx.size()
    }

    fn resize_surface(&mut self, size: SurfaceSize) {
        if size != self.ctx.size() {
            log::debug!("surface resized to {}x{}", size.width, size.height);
            self.ctx.resize(size);
        }
    }

    fn clear(&mut self, values: ClearValues) {
        self.frame.clear = Some(values);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.frame.viewport = Some(viewport);
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if value.kind() != location.kind {
            log::warn!("uniform type mismatch ({:?} <- {:?})", location.kind, value.kind());
            return;
        }
        let Some(block) = self
            .programs
            .get_mut(location.program.index())
            .and_then(|p| p.blocks.get_mut(location.block as usize))
        else {
            log::warn!("uniform location does not belong to a live program");
            return;
        };
        if !block
            .current
            .get_mut(location.offset as usize..)
            .is_some_and(|dst| value.write_to(dst))
        {
            log::warn!("uniform write outside its block");
        }
    }

    fn bind_vertex_layout(&mut self, layout: VertexLayoutHandle) {
        self.current_layout = Some(layout);
    }

    fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        let (Some(program), Some(layout)) = (self.current_program, self.current_layout) else {
            log::warn!("draw issued without a program and vertex layout bound");
            return;
        };
        let Some(p) = self.programs.get_mut(program.index()) else {
            log::warn!("draw references an unknown program");
            return;
        };

        let offsets = p.stage_draw();
        self.frame.draws.push(RecordedDraw {
            program,
            layout,
            first_vertex,
            vertex_count,
            offsets,
        });
    }

    fn present(&mut self) -> PresentStatus {
        let frame = std::mem::take(&mut self.frame);

        if self.ctx.size().is_empty() {
            self.reset_staging();
            return PresentStatus::Skipped;
        }

        self.prepare(&frame.draws);

        let mut gpu_frame = match self.ctx.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                self.reset_staging();
                return self.ctx.handle_surface_error(err);
            }
        };

        {
            let load = match frame.clear {
                Some(values) => wgpu::LoadOp::Clear(values.color.to_wgpu()),
                None => wgpu::LoadOp::Load,
            };

            let mut rpass = gpu_frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shapeburst main pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &gpu_frame.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some(vp) = frame.viewport.and_then(|vp| self.clamp_viewport(vp)) {
                rpass.set_viewport(
                    vp.x as f32,
                    vp.y as f32,
                    vp.width as f32,
                    vp.height as f32,
                    0.0,
                    1.0,
                );
            }

            for draw in &frame.draws {
                let (Some(program), Some(layout)) = (
                    self.programs.get(draw.program.index()),
                    self.layouts.get(draw.layout.index()),
                ) else {
                    continue;
                };
                let Some(pipeline) = program.pipeline(&layout.key) else {
                    log::warn!("no pipeline for draw; skipped");
                    continue;
                };

                rpass.set_pipeline(pipeline);
                for (group, bind_group) in program.bind_groups().iter().enumerate() {
                    let offsets = program.group_offsets(group as u32, &draw.offsets);
                    rpass.set_bind_group(group as u32, bind_group, &offsets);
                }
                for (index, slot) in layout.slots.iter().enumerate() {
                    if let Some(buffer) = self.slot_buffer(slot) {
                        rpass.set_vertex_buffer(index as u32, buffer.slice(slot.offset..));
                    }
                }
                rpass.draw(draw.first_vertex..draw.first_vertex + draw.vertex_count, 0..1);
            }
        }

        self.ctx.submit(gpu_frame);
        self.reset_staging();
        PresentStatus::Presented
    }
}
