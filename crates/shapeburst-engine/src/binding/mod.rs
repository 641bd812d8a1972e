//! Vertex format binding.
//!
//! Associates the shared position buffer and one palette buffer with the
//! program's attribute slots. Each association is created once at setup and
//! reused by every draw of that variant.

use crate::device::{
    AttributeFormat, AttributeLocation, BufferHandle, RenderDevice, SetupError,
    VertexAttributeBinding, VertexLayoutHandle,
};
use crate::geometry::GeometryStore;
use crate::pipeline::ShapeProgram;

/// Index of a registered draw variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct VariantId(pub usize);

/// A draw-ready (geometry, palette) association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub layout: VertexLayoutHandle,
    pub vertex_count: u32,
}

/// Registered variants, owned for the lifetime of the scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantTable {
    variants: Vec<Variant>,
}

impl VariantTable {
    pub fn new(variants: Vec<Variant>) -> Self {
        Self { variants }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn get(&self, id: VariantId) -> Option<&Variant> {
        self.variants.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariantId, &Variant)> {
        self.variants.iter().enumerate().map(|(i, v)| (VariantId(i), v))
    }
}

/// Builds vertex layouts in the shape vertex format:
/// - position: 2 × f32, not normalized
/// - color: 3 × u8, normalized to `[0, 1]` when read
pub struct VertexFormatBinding;

impl VertexFormatBinding {
    pub const POSITION_FORMAT: AttributeFormat = AttributeFormat::FLOAT32X2;
    pub const COLOR_FORMAT: AttributeFormat = AttributeFormat::UNORM8X3;

    pub fn bind<D: RenderDevice + ?Sized>(
        device: &mut D,
        position_buffer: BufferHandle,
        color_buffer: BufferHandle,
        position_slot: AttributeLocation,
        color_slot: AttributeLocation,
    ) -> Result<VertexLayoutHandle, SetupError> {
        Self::bind_labeled(
            device,
            "shape vertex layout",
            position_buffer,
            color_buffer,
            position_slot,
            color_slot,
        )
    }

    /// Creates exactly one layout per palette of `store`.
    ///
    /// Every variant is attempted; a failure names each variant and whether its
    /// layout was created.
    pub fn bind_variants<D: RenderDevice + ?Sized>(
        device: &mut D,
        store: &GeometryStore,
        program: &ShapeProgram,
    ) -> Result<VariantTable, SetupError> {
        let mut variants = Vec::with_capacity(store.palettes().len());
        let mut report = Vec::with_capacity(store.palettes().len());
        let mut first_failure = None;

        for palette in store.palettes() {
            let label = format!("{} {} layout", store.geometry_name(), palette.name);
            let result = Self::bind_labeled(
                device,
                &label,
                store.positions(),
                palette.buffer,
                program.position_attribute,
                program.color_attribute,
            );
            report.push(format!("{}={}", palette.name, result.is_ok()));

            match result {
                Ok(layout) => variants.push(Variant {
                    name: palette.name.clone(),
                    layout,
                    vertex_count: store.vertex_count(),
                }),
                Err(SetupError::ResourceAllocation { reason, .. }) => {
                    first_failure.get_or_insert(reason);
                }
                Err(other) => {
                    first_failure.get_or_insert(other.to_string());
                }
            }
        }

        if let Some(reason) = first_failure {
            return Err(SetupError::allocation(
                format!("vertex layouts ({})", report.join(", ")),
                reason,
            ));
        }

        log::debug!("bound {} shape variants ({})", variants.len(), report.join(", "));
        Ok(VariantTable::new(variants))
    }

    fn bind_labeled<D: RenderDevice + ?Sized>(
        device: &mut D,
        label: &str,
        position_buffer: BufferHandle,
        color_buffer: BufferHandle,
        position_slot: AttributeLocation,
        color_slot: AttributeLocation,
    ) -> Result<VertexLayoutHandle, SetupError> {
        device.create_vertex_layout(
            label,
            &[
                VertexAttributeBinding::packed(position_buffer, position_slot, Self::POSITION_FORMAT),
                VertexAttributeBinding::packed(color_buffer, color_slot, Self::COLOR_FORMAT),
            ],
        )
    }
}
