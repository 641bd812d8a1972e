use crate::device::{AttributeFormat, ComponentType};

/// How an attribute format is fed to wgpu.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(super) struct WgpuAttribute {
    pub format: wgpu::VertexFormat,
    /// Source data must be widened to four components first (wgpu has no
    /// 1- or 3-component 8-bit vertex formats, and strides must be 4-byte aligned).
    pub widen_to_four: bool,
}

pub(super) fn map_format(format: AttributeFormat) -> Option<WgpuAttribute> {
    use wgpu::VertexFormat as F;

    let direct = |format| Some(WgpuAttribute { format, widen_to_four: false });
    let widened = |format| Some(WgpuAttribute { format, widen_to_four: true });

    match (format.component_type, format.components, format.normalized) {
        (ComponentType::F32, 1, false) => direct(F::Float32),
        (ComponentType::F32, 2, false) => direct(F::Float32x2),
        (ComponentType::F32, 3, false) => direct(F::Float32x3),
        (ComponentType::F32, 4, false) => direct(F::Float32x4),
        (ComponentType::U8, 2, true) => direct(F::Unorm8x2),
        (ComponentType::U8, 4, true) => direct(F::Unorm8x4),
        (ComponentType::U8, 1 | 3, true) => widened(F::Unorm8x4),
        (ComponentType::U8, 2, false) => direct(F::Uint8x2),
        (ComponentType::U8, 4, false) => direct(F::Uint8x4),
        (ComponentType::U8, 1 | 3, false) => widened(F::Uint8x4),
        _ => None,
    }
}

/// Repacks 8-bit vertex data to four components per vertex.
///
/// Missing components are filled like a GPU fills absent attribute components:
/// `0` for y/z and "one" for w (`255` when normalized, `1` otherwise).
pub(super) fn widen_u8(data: &[u8], format: AttributeFormat, stride: usize, offset: usize) -> Vec<u8> {
    let components = format.components as usize;
    let one = if format.normalized { 255 } else { 1 };
    let stride = stride.max(1);

    let available = data.len().saturating_sub(offset);
    let vertices = if available >= components {
        (available - components) / stride + 1
    } else {
        0
    };

    let mut out = Vec::with_capacity(vertices * 4);
    for v in 0..vertices {
        let start = offset + v * stride;
        let src = &data[start..start + components];
        let mut packed = [0, 0, 0, one];
        packed[..components].copy_from_slice(src);
        out.extend_from_slice(&packed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_bytes_widen_with_opaque_alpha() {
        let out = widen_u8(&[1, 2, 3, 4, 5, 6], AttributeFormat::UNORM8X3, 3, 0);
        assert_eq!(out, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn widening_honors_offset_and_stride() {
        let format = AttributeFormat {
            components: 1,
            component_type: ComponentType::U8,
            normalized: false,
        };
        let out = widen_u8(&[9, 7, 0, 8, 0], format, 2, 1);
        assert_eq!(out, vec![7, 0, 0, 1, 8, 0, 0, 1]);
    }

    #[test]
    fn float_formats_map_directly() {
        let mapped = map_format(AttributeFormat::FLOAT32X2).unwrap();
        assert_eq!(mapped.format, wgpu::VertexFormat::Float32x2);
        assert!(!mapped.widen_to_four);
    }

    #[test]
    fn three_byte_color_is_widened() {
        let mapped = map_format(AttributeFormat::UNORM8X3).unwrap();
        assert_eq!(mapped.format, wgpu::VertexFormat::Unorm8x4);
        assert!(mapped.widen_to_four);
    }

    #[test]
    fn normalized_floats_are_unsupported() {
        let format = AttributeFormat {
            components: 2,
            component_type: ComponentType::F32,
            normalized: true,
        };
        assert_eq!(map_format(format), None);
    }
}
