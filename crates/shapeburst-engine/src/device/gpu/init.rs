/// Initialization parameters for the wgpu device.
///
/// Keep this structure small. Add flags only when a concrete platform or backend
/// requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Encode shader outputs to sRGB on store.
    ///
    /// Off by default: palette bytes and the clear color are display values and
    /// are written to the surface as-is.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). FIFO is supported everywhere and paces the
    /// loop to the display refresh rate.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference; an unsupported request falls back to a
    /// supported mode.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub power_preference: wgpu::PowerPreference,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface (a hint).
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
