use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::SurfaceSize;
use crate::device::{GpuInit, PresentStatus, WgpuDevice};
use crate::diagnostics::{Diagnostics, LogDiagnostics};
use crate::frame::{DisplaySurface, FrameDriver, SceneConfig};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "shapeburst".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

impl DisplaySurface for Window {
    fn display_size(&self) -> SurfaceSize {
        let size = self.inner_size();
        SurfaceSize::new(size.width, size.height)
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and drives the shape scene until the window closes.
    ///
    /// Returns the setup or presentation failure that stopped the loop, if any.
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit, scene: SceneConfig) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, scene);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct WindowRenderer<'w> {
    device: WgpuDevice<'w>,
    driver: FrameDriver,
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    renderer: WindowRenderer<'this>,
}

/// Every error returned here has already been sent to `diagnostics`.
fn create_renderer<'w>(
    window: &'w Window,
    gpu_init: GpuInit,
    scene: &SceneConfig,
    diagnostics: &mut dyn Diagnostics,
) -> Result<WindowRenderer<'w>> {
    let mut device = match pollster::block_on(WgpuDevice::new(window, gpu_init)) {
        Ok(device) => device,
        Err(err) => {
            let err = err.context("GPU initialization failed for window");
            diagnostics.report(&format!("{err:#}"));
            return Err(err);
        }
    };

    let driver = FrameDriver::setup(&mut device, scene, diagnostics).context("shape scene setup failed")?;

    Ok(WindowRenderer { device, driver })
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    scene: SceneConfig,
    diagnostics: LogDiagnostics,

    entry: Option<WindowEntry>,
    failure: Option<anyhow::Error>,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, scene: SceneConfig) -> Self {
        Self {
            config,
            gpu_init,
            scene,
            diagnostics: LogDiagnostics,
            entry: None,
            failure: None,
        }
    }

    /// Stops the loop with `err`, which must already have been reported.
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.entry = None;
        self.failure.get_or_insert(err);
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let Self {
            config,
            gpu_init,
            scene,
            diagnostics,
            ..
        } = self;

        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size);

        let window = match event_loop.create_window(attrs) {
            Ok(window) => window,
            Err(err) => {
                let err = anyhow::Error::new(err).context("failed to create window");
                diagnostics.report(&format!("{err:#}"));
                return Err(err);
            }
        };

        let gpu_init = gpu_init.clone();
        let scene = &*scene;

        WindowEntryTryBuilder {
            window,
            renderer_builder: |w| create_renderer(w, gpu_init, scene, diagnostics),
        }
        .try_build()
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        let report = entry.with_mut(|fields| {
            let WindowRenderer { device, driver } = fields.renderer;
            driver.run_frame(device, fields.window)
        });

        match report.status {
            PresentStatus::Presented | PresentStatus::Skipped => {}
            PresentStatus::Reconfigured => {
                log::debug!("surface reconfigured on frame {}", report.frame_index);
            }
            PresentStatus::Fatal => {
                let err = anyhow::anyhow!("surface presentation failed irrecoverably");
                self.diagnostics.report(&format!("{err:#}"));
                self.fail(event_loop, err);
            }
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(entry) = self.entry.as_mut() {
            // Time spent suspended is not frame time.
            entry.with_renderer_mut(|r| r.driver.reset_clock());
            entry.with_window(|w| w.request_redraw());
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.entry = Some(entry);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw stands in for a per-frame callback.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let ours = self
            .entry
            .as_ref()
            .is_some_and(|e| e.with_window(|w| w.id()) == window_id);
        if !ours {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.entry = None;
                event_loop.exit();
            }

            // The driver resizes the surface to the window size every frame.
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.entry.as_ref() {
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
