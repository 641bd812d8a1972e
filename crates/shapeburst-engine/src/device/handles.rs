//! Opaque resource handles and the small value types passed to a `RenderDevice`.

use crate::coords::Vec2;
use crate::paint::Color;

/// Device-resident vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferHandle(pub(crate) u32);

/// Compiled shader stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShaderHandle(pub(crate) u32);

/// Linked vertex + fragment program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramHandle(pub(crate) u32);

/// Draw-ready association of vertex buffers with attribute slots.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexLayoutHandle(pub(crate) u32);

impl BufferHandle {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl ShaderHandle {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl ProgramHandle {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl VertexLayoutHandle {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Shader input slot of a vertex attribute (`@location(n)`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct AttributeLocation(pub u32);

/// Scalar type of one vertex attribute component as stored in the buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComponentType {
    F32,
    U8,
}

impl ComponentType {
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            ComponentType::F32 => 4,
            ComponentType::U8 => 1,
        }
    }
}

/// How one attribute is read from its buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AttributeFormat {
    /// Components per vertex, `1..=4`.
    pub components: u8,
    pub component_type: ComponentType,
    /// Integer components are mapped to `[0, 1]` at read time.
    pub normalized: bool,
}

impl AttributeFormat {
    /// Two floats per vertex, read as-is.
    pub const FLOAT32X2: Self = Self {
        components: 2,
        component_type: ComponentType::F32,
        normalized: false,
    };

    /// Three bytes per vertex, normalized to `[0, 1]`.
    pub const UNORM8X3: Self = Self {
        components: 3,
        component_type: ComponentType::U8,
        normalized: true,
    };

    /// Bytes per vertex when tightly packed.
    #[inline]
    pub const fn byte_size(self) -> u32 {
        self.components as u32 * self.component_type.size()
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        (1..=4).contains(&self.components)
    }

    /// Decodes one vertex worth of bytes into `(x, y, z, w)`.
    ///
    /// Components missing from the format read as `0`, except `w` which reads as `1`.
    pub fn decode(self, bytes: &[u8]) -> [f32; 4] {
        let mut out = [0.0, 0.0, 0.0, 1.0];
        let size = self.component_type.size() as usize;

        for (i, slot) in out.iter_mut().enumerate().take(self.components as usize) {
            let Some(raw) = bytes.get(i * size..(i + 1) * size) else { break };
            *slot = match self.component_type {
                ComponentType::F32 => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
                ComponentType::U8 if self.normalized => raw[0] as f32 / 255.0,
                ComponentType::U8 => raw[0] as f32,
            };
        }

        out
    }
}

/// One attribute sourced from one buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttributeBinding {
    pub buffer: BufferHandle,
    pub location: AttributeLocation,
    pub format: AttributeFormat,
    /// Distance between consecutive vertices in bytes; `0` means tightly packed.
    pub stride: u32,
    /// Byte offset of the first vertex.
    pub offset: u32,
}

impl VertexAttributeBinding {
    /// Tightly packed attribute starting at the beginning of `buffer`.
    pub fn packed(buffer: BufferHandle, location: AttributeLocation, format: AttributeFormat) -> Self {
        Self {
            buffer,
            location,
            format,
            stride: 0,
            offset: 0,
        }
    }

    #[inline]
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            self.format.byte_size()
        } else {
            self.stride
        }
    }
}

/// Type of a resolved uniform slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
}

/// Resolved uniform slot: a byte range inside one uniform block of a program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation {
    pub(crate) program: ProgramHandle,
    pub(crate) block: u32,
    pub(crate) offset: u32,
    pub(crate) kind: UniformKind,
}

impl UniformLocation {
    #[inline]
    pub fn kind(&self) -> UniformKind {
        self.kind
    }

    #[inline]
    pub fn program(&self) -> ProgramHandle {
        self.program
    }
}

/// Value written to a uniform slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
}

impl UniformValue {
    #[inline]
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
        }
    }

    /// Writes the value into `dst` as little-endian `f32`s.
    ///
    /// Returns `false` (leaving `dst` untouched) when `dst` is too small.
    pub(crate) fn write_to(&self, dst: &mut [u8]) -> bool {
        match self {
            UniformValue::Float(v) => copy_into(dst, bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => copy_into(dst, bytemuck::bytes_of(&v.to_array())),
        }
    }

    /// Reads a value of `kind` from little-endian bytes.
    pub(crate) fn read_from(kind: UniformKind, src: &[u8]) -> Option<Self> {
        let f = |i: usize| -> Option<f32> {
            let raw = src.get(i * 4..i * 4 + 4)?;
            Some(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
        };
        match kind {
            UniformKind::Float => Some(UniformValue::Float(f(0)?)),
            UniformKind::Vec2 => Some(UniformValue::Vec2(Vec2::new(f(0)?, f(1)?))),
        }
    }
}

fn copy_into(dst: &mut [u8], bytes: &[u8]) -> bool {
    let Some(target) = dst.get_mut(..bytes.len()) else { return false };
    target.copy_from_slice(bytes);
    true
}

/// Values used to clear the render target at the start of a frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearValues {
    pub color: Color,
    /// Depth clear value; ignored by devices without a depth attachment.
    pub depth: Option<f32>,
}

/// Outcome of presenting a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentStatus {
    /// The frame reached the surface.
    Presented,
    /// The surface was lost or outdated and has been reconfigured; rendering resumes next frame.
    Reconfigured,
    /// Transient condition (timeout, zero-sized surface); the frame was dropped.
    Skipped,
    /// Unrecoverable surface failure (commonly out of memory); the host should stop.
    Fatal,
}
