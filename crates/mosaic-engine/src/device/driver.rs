use crate::coords::PixelRect;

use super::GpuError;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

gpu_handle!(
    /// Linked shader program.
    ProgramId
);
gpu_handle!(
    /// RGBA8 2D texture.
    TextureId
);
gpu_handle!(
    /// Vertex buffer.
    BufferId
);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Float,
    Uint,
    Sint,
}

impl ScalarKind {
    #[inline]
    pub fn is_integral(self) -> bool {
        !matches!(self, ScalarKind::Float)
    }
}

/// Per-vertex attribute layout: 1 to 4 components of 32-bit scalars.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttributeFormat {
    pub scalar: ScalarKind,
    pub components: u32,
}

impl AttributeFormat {
    #[inline]
    pub const fn new(scalar: ScalarKind, components: u32) -> Self {
        Self { scalar, components }
    }

    /// Bytes per vertex.
    #[inline]
    pub const fn byte_size(self) -> u64 {
        self.components as u64 * 4
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeDecl<'a> {
    pub name: &'a str,
    pub location: u32,
    pub format: AttributeFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec4,
    Mat4,
}

impl UniformKind {
    /// WGSL uniform-buffer `(align, size)` in bytes.
    #[inline]
    pub const fn layout(self) -> (u64, u64) {
        match self {
            UniformKind::Float => (4, 4),
            UniformKind::Vec2 => (8, 8),
            UniformKind::Vec4 => (16, 16),
            UniformKind::Mat4 => (16, 64),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    #[inline]
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v),
            UniformValue::Mat4(v) => bytemuck::bytes_of(v),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UniformDecl<'a> {
    pub name: &'a str,
    pub kind: UniformKind,
}

/// Program description.
///
/// WGSL binding convention: `@group(0) @binding(0)` is a uniform struct
/// holding `uniforms` in declaration order (skipped when empty); texture
/// slot `n` uses binding `1 + 2n` for the texture and `2 + 2n` for its
/// sampler.
#[derive(Debug, Copy, Clone)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub wgsl: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub attributes: &'a [AttributeDecl<'a>],
    pub uniforms: &'a [UniformDecl<'a>],
    pub texture_slots: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Source overwrites destination.
    #[default]
    Replace,
    /// Straight-alpha "over".
    Alpha,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Lines,
}

/// Capability interface over the graphics API.
///
/// The shape follows a classic bind-then-draw state machine: bind a program,
/// attach attributes, textures and uniforms, then draw. Resource deletion is
/// idempotent; deleting an unknown or already deleted handle is a no-op.
pub trait GpuDriver {
    /// Largest width or height a single texture may have.
    fn max_texture_dimension(&self) -> u32;

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, GpuError>;
    fn delete_program(&mut self, program: ProgramId);

    /// Allocates zeroed RGBA8 storage.
    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, GpuError>;
    /// Reallocates storage under the same handle; contents are undefined afterwards.
    fn resize_texture(&mut self, texture: TextureId, width: u32, height: u32) -> Result<(), GpuError>;
    /// Uploads tightly packed RGBA8 rows into `region` (texture-local coordinates).
    fn upload_texture(&mut self, texture: TextureId, region: PixelRect, rgba: &[u8]) -> Result<(), GpuError>;
    fn delete_texture(&mut self, texture: TextureId);

    fn create_buffer(&mut self) -> Result<BufferId, GpuError>;
    /// Replaces the whole buffer store with `bytes`.
    fn buffer_data(&mut self, buffer: BufferId, bytes: &[u8]) -> Result<(), GpuError>;
    /// Overwrites `bytes.len()` bytes at `offset` inside the existing store.
    fn buffer_sub_data(&mut self, buffer: BufferId, offset: u64, bytes: &[u8]) -> Result<(), GpuError>;
    fn delete_buffer(&mut self, buffer: BufferId);

    fn use_program(&mut self, program: ProgramId) -> Result<(), GpuError>;
    fn bind_texture(&mut self, slot: u32, texture: TextureId) -> Result<(), GpuError>;
    /// Binds a float attribute of the current program.
    fn bind_attribute(&mut self, name: &str, buffer: BufferId, format: AttributeFormat) -> Result<(), GpuError>;
    /// Binds an integer attribute of the current program.
    fn bind_int_attribute(&mut self, name: &str, buffer: BufferId, format: AttributeFormat) -> Result<(), GpuError>;
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), GpuError>;
    fn set_blend_mode(&mut self, mode: BlendMode);
    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) -> Result<(), GpuError>;
}

/// Shared validation for texture uploads.
pub(crate) fn check_upload(
    region: PixelRect,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> Result<(), GpuError> {
    if region.right() > width || region.bottom() > height {
        return Err(GpuError::RegionOutOfBounds { region, width, height });
    }
    let expected = region.area() as usize * 4;
    if rgba.len() != expected {
        return Err(GpuError::DataSizeMismatch { expected, actual: rgba.len() });
    }
    Ok(())
}
