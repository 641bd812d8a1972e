use crate::device::{BufferHandle, RenderDevice, SetupError};

use super::ShapeCatalog;

/// Uploads write-once vertex data and returns its device buffer.
pub fn upload_vertex_data<D: RenderDevice + ?Sized>(
    device: &mut D,
    label: &str,
    bytes: &[u8],
) -> Result<BufferHandle, SetupError> {
    let buffer = device.create_vertex_buffer(label, bytes)?;
    log::debug!("uploaded \"{label}\" ({} bytes)", bytes.len());
    Ok(buffer)
}

/// Device buffer holding one palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteBuffer {
    pub name: String,
    pub buffer: BufferHandle,
}

/// Device-resident geometry: one shared position buffer and one color buffer
/// per palette. Immutable after upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryStore {
    geometry_name: String,
    positions: BufferHandle,
    vertex_count: u32,
    palettes: Vec<PaletteBuffer>,
}

impl GeometryStore {
    /// Uploads the catalog.
    ///
    /// Every buffer is attempted. On any failure the error names each buffer
    /// and whether it was created, and carries the first failure reason.
    pub fn upload<D: RenderDevice + ?Sized>(
        device: &mut D,
        catalog: &ShapeCatalog,
    ) -> Result<Self, SetupError> {
        let geometry = &catalog.geometry;
        let vertex_count = geometry.vertex_count();

        let mut report: Vec<String> = Vec::new();
        let mut first_failure: Option<String> = None;
        let mut note = |label: &str, result: &Result<BufferHandle, SetupError>| {
            report.push(format!("{label}={}", result.is_ok()));
            if let Err(err) = result {
                first_failure.get_or_insert_with(|| failure_reason(err));
            }
        };

        let positions_label = format!("{} positions", geometry.name);
        let positions = upload_vertex_data(device, &positions_label, bytemuck::cast_slice(&geometry.vertices));
        note(&positions_label, &positions);

        let mut palettes = Vec::with_capacity(catalog.palettes.len());
        for palette in &catalog.palettes {
            let label = format!("{} colors", palette.name);
            let result = if palette.colors.len() != geometry.vertices.len() {
                Err(SetupError::allocation(
                    label.as_str(),
                    format!(
                        "palette has {} colors for {} vertices",
                        palette.colors.len(),
                        geometry.vertices.len()
                    ),
                ))
            } else {
                upload_vertex_data(device, &label, palette.colors.as_flattened())
            };
            note(&label, &result);
            if let Ok(buffer) = result {
                palettes.push(PaletteBuffer {
                    name: palette.name.clone(),
                    buffer,
                });
            }
        }

        if catalog.palettes.is_empty() {
            first_failure.get_or_insert_with(|| "catalog has no palettes".to_owned());
        }

        match (positions, first_failure) {
            (Ok(positions), None) => {
                log::debug!("geometry uploaded ({})", report.join(", "));
                Ok(Self {
                    geometry_name: geometry.name.clone(),
                    positions,
                    vertex_count,
                    palettes,
                })
            }
            (_, reason) => Err(SetupError::allocation(
                format!("vertex buffers ({})", report.join(", ")),
                reason.unwrap_or_default(),
            )),
        }
    }

    pub fn geometry_name(&self) -> &str {
        &self.geometry_name
    }

    pub fn positions(&self) -> BufferHandle {
        self.positions
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn palettes(&self) -> &[PaletteBuffer] {
        &self.palettes
    }
}

fn failure_reason(err: &SetupError) -> String {
    match err {
        SetupError::ResourceAllocation { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::SurfaceSize;
    use crate::device::HeadlessDevice;
    use crate::geometry::{Geometry, Palette};

    fn device() -> HeadlessDevice {
        HeadlessDevice::new(SurfaceSize::new(64, 64))
    }

    // ── upload ────────────────────────────────────────────────────────────

    #[test]
    fn default_catalog_uploads_three_buffers() {
        let mut device = device();
        let store = GeometryStore::upload(&mut device, &ShapeCatalog::default()).unwrap();

        assert_eq!(device.buffer_count(), 3);
        assert_eq!(store.vertex_count(), 3);
        assert_eq!(store.palettes().len(), 2);

        let (label, bytes) = device.buffer_contents(store.positions()).unwrap();
        assert_eq!(label, "triangle positions");
        assert_eq!(bytes.len(), 24);

        let (label, bytes) = device.buffer_contents(store.palettes()[1].buffer).unwrap();
        assert_eq!(label, "fiery colors");
        assert_eq!(bytes, &[229, 47, 15, 246, 206, 29, 233, 154, 26]);
    }

    #[test]
    fn budget_failure_names_every_buffer() {
        let mut device = device().with_buffer_budget(2);

        match GeometryStore::upload(&mut device, &ShapeCatalog::default()) {
            Err(SetupError::ResourceAllocation { resource, reason }) => {
                assert_eq!(
                    resource,
                    "vertex buffers (triangle positions=true, rgb colors=true, fiery colors=false)"
                );
                assert_eq!(reason, "device buffer budget exhausted");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn palette_length_mismatch_fails_that_variant() {
        let mut device = device();
        let catalog = ShapeCatalog::new(
            Geometry::triangle(),
            vec![Palette::rgb(), Palette::new("short", vec![[1, 2, 3]])],
        );

        let err = GeometryStore::upload(&mut device, &catalog).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to allocate vertex buffers (triangle positions=true, rgb colors=true, short colors=false): \
             palette has 1 colors for 3 vertices"
        );
    }

    #[test]
    fn empty_geometry_is_an_allocation_error() {
        let mut device = device();
        let catalog = ShapeCatalog::new(Geometry::new("nothing", vec![]), vec![Palette::new("none", vec![])]);

        assert!(matches!(
            GeometryStore::upload(&mut device, &catalog),
            Err(SetupError::ResourceAllocation { .. })
        ));
    }

    #[test]
    fn catalog_without_palettes_is_rejected() {
        let mut device = device();
        let catalog = ShapeCatalog::new(Geometry::triangle(), vec![]);
        let err = GeometryStore::upload(&mut device, &catalog).unwrap_err();
        assert!(err.to_string().ends_with("catalog has no palettes"));
    }

    #[test]
    fn single_upload_rejects_empty_data() {
        let mut device = device();
        assert!(upload_vertex_data(&mut device, "empty", &[]).is_err());
        assert!(upload_vertex_data(&mut device, "one", &[1, 2, 3]).is_ok());
    }
}
