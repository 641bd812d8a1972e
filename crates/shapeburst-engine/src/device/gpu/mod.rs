//! wgpu-backed render device.
//!
//! - `context`: Instance/Adapter/Device/Queue and the window surface (swapchain)
//! - `layout`: mapping of attribute formats onto wgpu vertex formats
//! - `program`: pipelines, bind groups and per-frame uniform staging of linked programs
//! - `device`: the `RenderDevice` implementation recording and submitting frames

mod context;
mod device;
mod init;
mod layout;
mod program;
mod surface;

pub use context::GpuContext;
pub use device::WgpuDevice;
pub use init::GpuInit;
