use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::window::Window;

use crate::coords::SurfaceSize;
use crate::device::PresentStatus;

use super::GpuInit;
use super::surface;

/// Owns the wgpu core objects and the surface configuration.
///
/// - picks an adapter and stores Device/Queue
/// - creates and configures the Surface (swapchain)
/// - acquires surface textures and submits encoded work
pub struct GpuContext<'w> {
    /// Surface bound to the window; the window must outlive the context.
    surface: wgpu::Surface<'w>,

    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,
    /// Format of the per-frame texture views and of every render pipeline.
    view_format: wgpu::TextureFormat,

    /// Current drawable size in physical pixels.
    size: SurfaceSize,
}

/// A single acquired surface texture with an encoder ready for recording.
///
/// Short-lived: holding the surface texture prevents acquiring the next one.
pub(super) struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

impl<'w> GpuContext<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let inner = window.inner_size();
        anyhow::ensure!(inner.width > 0 && inner.height > 0, "window has zero size");
        let size = SurfaceSize::new(inner.width, inner.height);

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            power_preference,
            required_limits,
            desired_maximum_frame_latency,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("shapeburst device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps.formats, prefer_srgb)
            .context("no supported surface formats")?;
        let view_format = surface::render_view_format(format, prefer_srgb);
        let alpha_mode = surface::choose_alpha_mode(&surface_caps, alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: if view_format == format { vec![] } else { vec![view_format] },
            desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);

        let info = adapter.get_info();
        log::info!(
            "gpu ready: adapter=\"{}\" backend={:?} format={:?} view={:?} size={}x{}",
            info.name,
            info.backend,
            format,
            view_format,
            size.width,
            size.height
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            view_format,
            size,
        })
    }

    /// Format render pipelines target.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.view_format
    }

    /// Current drawable size (physical pixels).
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Reconfigures the surface after a resize.
    pub fn resize(&mut self, new_size: SurfaceSize) {
        surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            new_size,
        );
    }

    /// Acquires the next surface texture and creates an encoder.
    pub(super) fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.view_format),
                ..Default::default()
            });

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("shapeburst frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the recorded commands; presentation happens when the surface
    /// texture is released.
    pub(super) fn submit(&self, frame: GpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        drop(frame.view);
        frame.surface_texture.present();
    }

    /// Converts a `SurfaceError` into a present outcome, reconfiguring when possible.
    pub(super) fn handle_surface_error(&mut self, err: SurfaceError) -> PresentStatus {
        surface::map_surface_error(&self.surface, &self.device, &self.config, self.size, err)
    }
}
