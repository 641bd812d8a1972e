use super::SurfaceSize;

/// Rasterization rectangle in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport covering the whole surface.
    #[inline]
    pub const fn full(size: SurfaceSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }
}
