//! Shape geometry and palettes, and their upload to device buffers.

mod catalog;
mod store;

pub use catalog::{Geometry, ModelVertex, Palette, ShapeCatalog};
pub use store::{upload_vertex_data, GeometryStore, PaletteBuffer};
