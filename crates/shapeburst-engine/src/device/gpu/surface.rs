use crate::coords::SurfaceSize;
use crate::device::PresentStatus;

/// Picks the swapchain format. Without `prefer_srgb` a linear (`*Unorm`) format
/// is taken when one exists, so shader outputs reach the display unencoded.
pub(super) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| f.is_srgb() == prefer_srgb)
        .or_else(|| formats.first().copied())
}

/// Format of the views the frame renders into. An sRGB-only surface is drawn
/// through its linear view format unless sRGB encoding was asked for.
pub(super) fn render_view_format(surface_format: wgpu::TextureFormat, prefer_srgb: bool) -> wgpu::TextureFormat {
    if prefer_srgb {
        surface_format
    } else {
        surface_format.remove_srgb_suffix()
    }
}

pub(super) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Applies a new drawable size. Zero-sized surfaces cannot be configured; only
/// the tracked size changes and configuration waits for a non-zero size.
pub(super) fn apply_resize(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &mut wgpu::SurfaceConfiguration,
    size: &mut SurfaceSize,
    new_size: SurfaceSize,
) {
    *size = new_size;
    if new_size.is_empty() {
        return;
    }

    config.width = new_size.width;
    config.height = new_size.height;
    surface.configure(device, config);
}

pub(super) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: SurfaceSize,
    err: wgpu::SurfaceError,
) -> PresentStatus {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if !size.is_empty() {
                surface.configure(device, config);
            }
            PresentStatus::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => PresentStatus::Fatal,
        wgpu::SurfaceError::Timeout => PresentStatus::Skipped,
        wgpu::SurfaceError::Other => PresentStatus::Skipped,
    }
}
