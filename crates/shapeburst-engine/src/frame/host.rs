use crate::coords::SurfaceSize;

/// Reports the size the render surface should have, queried once per frame.
pub trait DisplaySurface {
    fn display_size(&self) -> SurfaceSize;
}

impl<T: DisplaySurface + ?Sized> DisplaySurface for &T {
    fn display_size(&self) -> SurfaceSize {
        (**self).display_size()
    }
}

/// Display surface with a size set by the host.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FixedSurface {
    size: SurfaceSize,
}

impl FixedSurface {
    pub const fn new(size: SurfaceSize) -> Self {
        Self { size }
    }

    pub fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
    }
}

impl DisplaySurface for FixedSurface {
    fn display_size(&self) -> SurfaceSize {
        self.size
    }
}
