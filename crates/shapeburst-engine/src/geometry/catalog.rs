use bytemuck::{Pod, Zeroable};

/// Model-space vertex position.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 2],
}

impl ModelVertex {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { position: [x, y] }
    }
}

/// Shared model-space geometry, drawn as a non-indexed triangle list.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
}

impl Geometry {
    pub fn new(name: impl Into<String>, vertices: Vec<ModelVertex>) -> Self {
        Self {
            name: name.into(),
            vertices,
        }
    }

    /// Unit triangle pointing up: `(0, 1)`, `(-1, -1)`, `(1, -1)`.
    pub fn triangle() -> Self {
        Self::new(
            "triangle",
            vec![
                ModelVertex::new(0.0, 1.0),
                ModelVertex::new(-1.0, -1.0),
                ModelVertex::new(1.0, -1.0),
            ],
        )
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }
}

/// Per-vertex 8-bit rgb colors for one visual variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub name: String,
    pub colors: Vec<[u8; 3]>,
}

impl Palette {
    pub fn new(name: impl Into<String>, colors: Vec<[u8; 3]>) -> Self {
        Self {
            name: name.into(),
            colors,
        }
    }

    /// Pure red, green and blue corners.
    pub fn rgb() -> Self {
        Self::new("rgb", vec![[255, 0, 0], [0, 255, 0], [0, 0, 255]])
    }

    /// Warm red, yellow and orange corners.
    pub fn fiery() -> Self {
        Self::new("fiery", vec![[229, 47, 15], [246, 206, 29], [233, 154, 26]])
    }
}

/// Geometry plus the palettes that become draw variants.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeCatalog {
    pub geometry: Geometry,
    pub palettes: Vec<Palette>,
}

impl Default for ShapeCatalog {
    fn default() -> Self {
        Self {
            geometry: Geometry::triangle(),
            palettes: vec![Palette::rgb(), Palette::fiery()],
        }
    }
}

impl ShapeCatalog {
    pub fn new(geometry: Geometry, palettes: Vec<Palette>) -> Self {
        Self { geometry, palettes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_two_matching_palettes() {
        let catalog = ShapeCatalog::default();
        assert_eq!(catalog.geometry.vertex_count(), 3);
        assert_eq!(catalog.palettes.len(), 2);
        for palette in &catalog.palettes {
            assert_eq!(palette.colors.len(), catalog.geometry.vertices.len());
        }
    }

    #[test]
    fn vertices_are_tightly_packed() {
        let geometry = Geometry::triangle();
        let bytes: &[u8] = bytemuck::cast_slice(&geometry.vertices);
        assert_eq!(bytes.len(), 3 * 8);
        assert_eq!(&bytes[..4], &0.0f32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &1.0f32.to_ne_bytes());
    }
}
