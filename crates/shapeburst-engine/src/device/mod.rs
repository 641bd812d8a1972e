//! Render device layer.
//!
//! The rest of the engine talks to the GPU exclusively through [`RenderDevice`]:
//! - setup operations (buffers, shaders, programs, vertex layouts) are fallible and
//!   report [`SetupError`]
//! - per-frame operations (clear, viewport, uniforms, draws) are infallible; the
//!   outcome of presenting the frame is reported as [`PresentStatus`]
//!
//! Two implementations ship with the crate:
//! - [`HeadlessDevice`]: software device that records every command and evaluates
//!   draws on the CPU (tests, tools, headless loops)
//! - [`WgpuDevice`]: wgpu-backed device bound to a window surface

mod backend;
mod error;
mod handles;
mod headless;
pub(crate) mod shader;

pub mod gpu;

pub use backend::RenderDevice;
pub use error::{SetupError, ShaderStage};
pub use handles::{
    AttributeFormat, AttributeLocation, BufferHandle, ClearValues, ComponentType, PresentStatus,
    ProgramHandle, ShaderHandle, UniformKind, UniformLocation, UniformValue,
    VertexAttributeBinding, VertexLayoutHandle,
};
pub use headless::{DeviceCommand, DrawRecord, FrameRecord, HeadlessDevice, DEFAULT_FRAME_HISTORY};
pub use gpu::{GpuInit, WgpuDevice};
