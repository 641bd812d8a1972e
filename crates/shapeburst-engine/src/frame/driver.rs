use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;

use crate::coords::{SurfaceSize, Viewport};
use crate::device::{ClearValues, PresentStatus, RenderDevice, SetupError, UniformValue};
use crate::diagnostics::Diagnostics;
use crate::paint::Color;
use crate::particles::{ConfigError, ParticleSystem};
use crate::time::{FrameClock, MonotonicTime, TimeSource};

use super::{DisplaySurface, SceneConfig, ShapeScene};

/// Depth the frame is cleared to.
pub const CLEAR_DEPTH: f32 = 1.0;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DriverState {
    /// No frame has run yet.
    Idle,
    Running,
}

/// Why a driver could not be set up.
#[derive(Debug, Error)]
pub enum DriverSetupError {
    #[error(transparent)]
    Scene(#[from] SetupError),

    #[error(transparent)]
    Particles(#[from] ConfigError),
}

/// Outcome of one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub dt: f64,
    pub spawned: usize,
    pub reaped: usize,
    pub drawn: usize,
    pub status: PresentStatus,
}

/// Runs the per-frame update and draw sequence of a shape scene.
///
/// The driver does not schedule itself: a host calls [`FrameDriver::run_frame`]
/// from its frame callback, or [`FrameDriver::step`] with a synthetic `dt`.
pub struct FrameDriver<S: TimeSource = MonotonicTime, R: Rng = StdRng> {
    scene: ShapeScene,
    particles: ParticleSystem<R>,
    clock: FrameClock<S>,
    clear: ClearValues,

    state: DriverState,
    frame_index: u64,

    /// Surface size in effect since the last resize; spawns are centered on it.
    surface_size: SurfaceSize,
}

impl FrameDriver {
    /// Sets up the scene on `device` and a wall-clock driver for it.
    ///
    /// Each failure is sent to `diagnostics` exactly once before it is returned.
    pub fn setup<D: RenderDevice + ?Sized>(
        device: &mut D,
        config: &SceneConfig,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Self, DriverSetupError> {
        let scene = ShapeScene::build(device, config, diagnostics)?;
        Self::from_config(scene, config, device.surface_size()).map_err(|err| {
            diagnostics.report(&err.to_string());
            DriverSetupError::from(err)
        })
    }

    /// Creates a wall-clock driver with an entropy-seeded particle system.
    pub fn from_config(
        scene: ShapeScene,
        config: &SceneConfig,
        surface_size: SurfaceSize,
    ) -> Result<Self, ConfigError> {
        let particles = ParticleSystem::new(config.particles, scene.variants().len())?;
        Ok(Self::new(scene, particles, FrameClock::new(), config.clear_color, surface_size))
    }
}

impl<S: TimeSource, R: Rng> FrameDriver<S, R> {
    pub fn new(
        scene: ShapeScene,
        particles: ParticleSystem<R>,
        clock: FrameClock<S>,
        clear_color: Color,
        surface_size: SurfaceSize,
    ) -> Self {
        Self {
            scene,
            particles,
            clock,
            clear: ClearValues {
                color: clear_color,
                depth: Some(CLEAR_DEPTH),
            },
            state: DriverState::Idle,
            frame_index: 0,
            surface_size,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn scene(&self) -> &ShapeScene {
        &self.scene
    }

    pub fn particles(&self) -> &ParticleSystem<R> {
        &self.particles
    }

    pub fn surface_size(&self) -> SurfaceSize {
        self.surface_size
    }

    /// Restarts frame timing, e.g. after the host was suspended.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
    }

    /// Measures the time since the previous frame and runs one step with it.
    pub fn run_frame<D, H>(&mut self, device: &mut D, surface: &H) -> FrameReport
    where
        D: RenderDevice + ?Sized,
        H: DisplaySurface + ?Sized,
    {
        let time = self.clock.tick();
        self.step(time.dt, device, surface)
    }

    /// Runs one frame with an explicit `dt` in seconds.
    ///
    /// Order: spawn, advance and reap with the same `dt`; resize the surface;
    /// clear; full-surface viewport; program and canvas size; one draw per live
    /// shape in population order; present.
    pub fn step<D, H>(&mut self, dt: f64, device: &mut D, surface: &H) -> FrameReport
    where
        D: RenderDevice + ?Sized,
        H: DisplaySurface + ?Sized,
    {
        if self.state == DriverState::Idle {
            log::debug!("frame driver running");
            self.state = DriverState::Running;
        }

        self.particles.set_spawn_origin(self.surface_size.center());
        let spawned = self.particles.spawn_tick(dt);
        self.particles.advance(dt);
        let reaped = self.particles.reap();

        device.resize_surface(surface.display_size());
        self.surface_size = device.surface_size();

        device.clear(self.clear);
        device.set_viewport(Viewport::full(self.surface_size));

        let program = self.scene.program();
        device.use_program(program.program);
        device.set_uniform(program.canvas_size, UniformValue::Vec2(self.surface_size.as_vec2()));

        let mut drawn = 0;
        for shape in self.particles.shapes().iter().filter(|s| s.is_alive()) {
            let Some(variant) = self.scene.variants().get(shape.variant) else {
                continue;
            };

            device.set_uniform(program.shape_size, UniformValue::Float(shape.size));
            device.set_uniform(program.shape_location, UniformValue::Vec2(shape.position));
            device.bind_vertex_layout(variant.layout);
            device.draw(0, variant.vertex_count);
            drawn += 1;
        }

        let status = device.present();

        let report = FrameReport {
            frame_index: self.frame_index,
            dt,
            spawned,
            reaped,
            drawn,
            status,
        };
        self.frame_index += 1;

        log::trace!(
            "frame {}: dt={:.4} spawned={} reaped={} drawn={} status={:?}",
            report.frame_index,
            report.dt,
            report.spawned,
            report.reaped,
            report.drawn,
            report.status
        );

        report
    }
}
