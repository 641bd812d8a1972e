use super::Vec2;

/// Drawable surface size in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` when either dimension is zero (e.g. a minimized window).
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size as a float vector, the value uploaded to the canvas-size uniform.
    #[inline]
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Center of the surface in surface pixels.
    #[inline]
    pub fn center(self) -> Vec2 {
        self.as_vec2() / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_half_extent() {
        assert_eq!(SurfaceSize::new(800, 600).center(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn zero_dimension_is_empty() {
        assert!(SurfaceSize::new(0, 600).is_empty());
        assert!(SurfaceSize::new(800, 0).is_empty());
        assert!(!SurfaceSize::new(1, 1).is_empty());
    }
}
