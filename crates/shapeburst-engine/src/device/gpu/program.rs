use std::collections::HashMap;
use std::num::NonZeroU64;

use crate::device::shader::LinkedProgram;

/// Vertex input signature a pipeline was built for: `(location, format, stride)` per buffer slot.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub(super) struct PipelineKey(pub Vec<(u32, wgpu::VertexFormat, u64)>);

/// One `var<uniform>` block with CPU-side state and its dynamic-offset GPU buffer.
///
/// `current` holds the values set through `set_uniform`; each draw appends a copy
/// to `staging` at a `stride`-aligned offset, and the whole staging area is
/// uploaded once per frame.
pub(super) struct UniformBlockState {
    pub group: u32,
    pub binding: u32,
    pub size: u64,
    pub stride: u64,
    pub current: Vec<u8>,
    staging: Vec<u8>,
    buffer: Option<wgpu::Buffer>,
    capacity: u64,
}

/// GPU side of a linked program.
pub(super) struct GpuProgram {
    pub linked: LinkedProgram,
    pub vertex_shader: usize,
    pub fragment_shader: usize,
    pub blocks: Vec<UniformBlockState>,

    bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
    bind_groups: Vec<wgpu::BindGroup>,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl GpuProgram {
    pub fn new(
        device: &wgpu::Device,
        linked: LinkedProgram,
        vertex_shader: usize,
        fragment_shader: usize,
    ) -> Self {
        let align = device.limits().min_uniform_buffer_offset_alignment.max(1) as u64;

        let blocks: Vec<UniformBlockState> = linked
            .blocks
            .iter()
            .map(|b| UniformBlockState {
                group: b.group,
                binding: b.binding,
                size: b.size as u64,
                stride: (b.size as u64).div_ceil(align) * align,
                current: vec![0; b.size as usize],
                staging: Vec::new(),
                buffer: None,
                capacity: 0,
            })
            .collect();

        let bind_group_layouts: Vec<wgpu::BindGroupLayout> = (0..linked.group_count())
            .map(|group| {
                let entries: Vec<wgpu::BindGroupLayoutEntry> = blocks
                    .iter()
                    .filter(|b| b.group == group)
                    .map(|b| wgpu::BindGroupLayoutEntry {
                        binding: b.binding,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: true,
                            min_binding_size: NonZeroU64::new(b.size),
                        },
                        count: None,
                    })
                    .collect();

                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("shapeburst uniform bgl"),
                    entries: &entries,
                })
            })
            .collect();

        let layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shapeburst pipeline layout"),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });

        Self {
            linked,
            vertex_shader,
            fragment_shader,
            blocks,
            bind_group_layouts,
            pipeline_layout,
            bind_groups: Vec::new(),
            pipeline_format: None,
            pipelines: HashMap::new(),
        }
    }

    /// Snapshots the current uniform values for one draw and returns the
    /// dynamic offset of each block.
    pub fn stage_draw(&mut self) -> Vec<u32> {
        self.blocks
            .iter_mut()
            .map(|block| {
                let offset = block.staging.len();
                block.staging.extend_from_slice(&block.current);
                block.staging.resize(offset + block.stride as usize, 0);
                offset as u32
            })
            .collect()
    }

    pub fn has_staged_draws(&self) -> bool {
        self.blocks.iter().any(|b| !b.staging.is_empty())
    }

    pub fn reset_staging(&mut self) {
        for block in &mut self.blocks {
            block.staging.clear();
        }
    }

    /// Grows uniform buffers as needed, uploads staged values, and rebuilds the
    /// bind groups when a buffer was replaced.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let mut rebuilt = self.bind_groups.is_empty() && !self.blocks.is_empty();

        for block in &mut self.blocks {
            let required = (block.staging.len() as u64).max(block.stride);
            if block.buffer.is_none() || required > block.capacity {
                let slots = required.div_ceil(block.stride).next_power_of_two().max(16);
                block.capacity = slots * block.stride;
                block.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("shapeburst uniform ubo"),
                    size: block.capacity,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }));
                rebuilt = true;
            }

            if let Some(buffer) = block.buffer.as_ref() {
                if !block.staging.is_empty() {
                    queue.write_buffer(buffer, 0, &block.staging);
                }
            }
        }

        if rebuilt {
            self.rebuild_bind_groups(device);
        }
    }

    fn rebuild_bind_groups(&mut self, device: &wgpu::Device) {
        self.bind_groups = self
            .bind_group_layouts
            .iter()
            .enumerate()
            .map(|(group, layout)| {
                let entries: Vec<wgpu::BindGroupEntry> = self
                    .blocks
                    .iter()
                    .filter(|b| b.group == group as u32)
                    .filter_map(|b| {
                        let buffer = b.buffer.as_ref()?;
                        Some(wgpu::BindGroupEntry {
                            binding: b.binding,
                            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                buffer,
                                offset: 0,
                                size: NonZeroU64::new(b.size),
                            }),
                        })
                    })
                    .collect();

                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("shapeburst uniform bind group"),
                    layout,
                    entries: &entries,
                })
            })
            .collect();
    }

    pub fn bind_groups(&self) -> &[wgpu::BindGroup] {
        &self.bind_groups
    }

    /// Dynamic offsets for `group`, in binding order.
    pub fn group_offsets(&self, group: u32, draw_offsets: &[u32]) -> Vec<u32> {
        self.blocks
            .iter()
            .zip(draw_offsets)
            .filter(|(b, _)| b.group == group)
            .map(|(_, offset)| *offset)
            .collect()
    }

    /// Builds the render pipeline for a vertex signature unless cached.
    ///
    /// The cache is dropped when the surface format changes.
    pub fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        key: &PipelineKey,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
    ) {
        if self.pipeline_format != Some(format) {
            self.pipelines.clear();
            self.pipeline_format = Some(format);
        }
        if self.pipelines.contains_key(key) {
            return;
        }

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .0
            .iter()
            .map(|(location, format, _)| {
                [wgpu::VertexAttribute {
                    format: *format,
                    offset: 0,
                    shader_location: *location,
                }]
            })
            .collect();

        let buffers: Vec<wgpu::VertexBufferLayout> = key
            .0
            .iter()
            .zip(&attributes)
            .map(|((_, _, stride), attrs)| wgpu::VertexBufferLayout {
                array_stride: *stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shapeburst shape pipeline"),
            layout: Some(&self.pipeline_layout),

            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some(&self.linked.vertex_entry),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some(&self.linked.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("built render pipeline for vertex signature {:?}", key.0);
        self.pipelines.insert(key.clone(), pipeline);
    }

    pub fn pipeline(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }
}
