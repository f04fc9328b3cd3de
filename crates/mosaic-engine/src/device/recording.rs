use std::collections::HashMap;

use crate::coords::PixelRect;

use super::driver::check_upload;
use super::{
    AttributeFormat, BlendMode, BufferId, GpuDriver, GpuError, ProgramDesc, ProgramId, TextureId,
    Topology, UniformKind, UniformValue,
};

/// One facade call as observed by [`RecordingDriver`].
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateProgram { program: ProgramId, label: String },
    DeleteProgram(ProgramId),
    CreateTexture { texture: TextureId, width: u32, height: u32 },
    ResizeTexture { texture: TextureId, width: u32, height: u32 },
    UploadTexture { texture: TextureId, region: PixelRect },
    DeleteTexture(TextureId),
    CreateBuffer(BufferId),
    BufferData { buffer: BufferId, len: usize },
    BufferSubData { buffer: BufferId, offset: u64, len: usize },
    DeleteBuffer(BufferId),
    UseProgram(ProgramId),
    BindTexture { slot: u32, texture: TextureId },
    BindAttribute { name: String, buffer: BufferId, format: AttributeFormat, integer: bool },
    SetUniform { name: String, value: UniformValue },
    SetBlendMode(BlendMode),
    DrawArrays { topology: Topology, first: u32, count: u32 },
}

#[derive(Debug)]
struct RecordedProgram {
    attributes: HashMap<String, AttributeFormat>,
    uniforms: HashMap<String, UniformKind>,
}

#[derive(Debug)]
struct RecordedTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// In-memory [`GpuDriver`] that records every call.
///
/// Textures and buffers keep their contents so tests can compare uploaded
/// data against the CPU side. Validation mirrors the real driver: unknown
/// handles, out-of-range uploads and wrongly typed uniforms are errors.
#[derive(Debug)]
pub struct RecordingDriver {
    max_texture_dimension: u32,
    next_id: u32,
    calls: Vec<GpuCall>,
    programs: HashMap<ProgramId, RecordedProgram>,
    textures: HashMap<TextureId, RecordedTexture>,
    buffers: HashMap<BufferId, Vec<u8>>,
    current_program: Option<ProgramId>,
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new(8192)
    }
}

impl RecordingDriver {
    pub fn new(max_texture_dimension: u32) -> Self {
        Self {
            max_texture_dimension: max_texture_dimension.max(1),
            next_id: 1,
            calls: Vec::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            buffers: HashMap::new(),
            current_program: None,
        }
    }

    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    /// Returns and forgets the calls recorded so far.
    pub fn take_calls(&mut self) -> Vec<GpuCall> {
        std::mem::take(&mut self.calls)
    }

    /// `(texture, region)` for every texture upload in `calls`.
    pub fn texture_uploads(calls: &[GpuCall]) -> Vec<(TextureId, PixelRect)> {
        calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::UploadTexture { texture, region } => Some((*texture, *region)),
                _ => None,
            })
            .collect()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).map(|t| (t.width, t.height))
    }

    /// RGBA8 contents of a texture.
    pub fn texture_pixels(&self, texture: TextureId) -> Option<&[u8]> {
        self.textures.get(&texture).map(|t| t.pixels.as_slice())
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check_size(&self, width: u32, height: u32) -> Result<(), GpuError> {
        if width > self.max_texture_dimension || height > self.max_texture_dimension {
            return Err(GpuError::TextureTooLarge { width, height, max: self.max_texture_dimension });
        }
        Ok(())
    }

    fn current(&self) -> Result<&RecordedProgram, GpuError> {
        let id = self.current_program.ok_or(GpuError::NoProgramBound)?;
        self.programs.get(&id).ok_or(GpuError::UnknownProgram(id))
    }

    fn bind_attribute_impl(
        &mut self,
        name: &str,
        buffer: BufferId,
        format: AttributeFormat,
        integer: bool,
    ) -> Result<(), GpuError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(GpuError::UnknownBuffer(buffer));
        }
        let declared = *self
            .current()?
            .attributes
            .get(name)
            .ok_or_else(|| GpuError::UnknownAttribute(name.to_string()))?;
        if declared.scalar.is_integral() != integer || declared != format {
            return Err(GpuError::AttributePathMismatch { name: name.to_string(), integer });
        }
        self.calls.push(GpuCall::BindAttribute { name: name.to_string(), buffer, format, integer });
        Ok(())
    }
}

impl GpuDriver for RecordingDriver {
    fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, GpuError> {
        let program = ProgramId(self.alloc_id());
        self.programs.insert(
            program,
            RecordedProgram {
                attributes: desc.attributes.iter().map(|a| (a.name.to_string(), a.format)).collect(),
                uniforms: desc.uniforms.iter().map(|u| (u.name.to_string(), u.kind)).collect(),
            },
        );
        self.calls.push(GpuCall::CreateProgram { program, label: desc.label.to_string() });
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() {
            if self.current_program == Some(program) {
                self.current_program = None;
            }
            self.calls.push(GpuCall::DeleteProgram(program));
        }
    }

    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, GpuError> {
        self.check_size(width, height)?;
        let texture = TextureId(self.alloc_id());
        let pixels = vec![0; width as usize * height as usize * 4];
        self.textures.insert(texture, RecordedTexture { width, height, pixels });
        self.calls.push(GpuCall::CreateTexture { texture, width, height });
        Ok(texture)
    }

    fn resize_texture(&mut self, texture: TextureId, width: u32, height: u32) -> Result<(), GpuError> {
        self.check_size(width, height)?;
        let tex = self.textures.get_mut(&texture).ok_or(GpuError::UnknownTexture(texture))?;
        tex.width = width;
        tex.height = height;
        tex.pixels = vec![0; width as usize * height as usize * 4];
        self.calls.push(GpuCall::ResizeTexture { texture, width, height });
        Ok(())
    }

    fn upload_texture(&mut self, texture: TextureId, region: PixelRect, rgba: &[u8]) -> Result<(), GpuError> {
        let tex = self.textures.get_mut(&texture).ok_or(GpuError::UnknownTexture(texture))?;
        check_upload(region, tex.width, tex.height, rgba)?;

        let row_bytes = region.width as usize * 4;
        for row in 0..region.height as usize {
            let dst = ((region.y as usize + row) * tex.width as usize + region.x as usize) * 4;
            tex.pixels[dst..dst + row_bytes]
                .copy_from_slice(&rgba[row * row_bytes..(row + 1) * row_bytes]);
        }
        self.calls.push(GpuCall::UploadTexture { texture, region });
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_some() {
            self.calls.push(GpuCall::DeleteTexture(texture));
        }
    }

    fn create_buffer(&mut self) -> Result<BufferId, GpuError> {
        let buffer = BufferId(self.alloc_id());
        self.buffers.insert(buffer, Vec::new());
        self.calls.push(GpuCall::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn buffer_data(&mut self, buffer: BufferId, bytes: &[u8]) -> Result<(), GpuError> {
        let store = self.buffers.get_mut(&buffer).ok_or(GpuError::UnknownBuffer(buffer))?;
        store.clear();
        store.extend_from_slice(bytes);
        self.calls.push(GpuCall::BufferData { buffer, len: bytes.len() });
        Ok(())
    }

    fn buffer_sub_data(&mut self, buffer: BufferId, offset: u64, bytes: &[u8]) -> Result<(), GpuError> {
        let store = self.buffers.get_mut(&buffer).ok_or(GpuError::UnknownBuffer(buffer))?;
        let end = offset as usize + bytes.len();
        if end > store.len() {
            return Err(GpuError::BufferOverrun {
                offset,
                len: bytes.len(),
                capacity: store.len() as u64,
            });
        }
        store[offset as usize..end].copy_from_slice(bytes);
        self.calls.push(GpuCall::BufferSubData { buffer, offset, len: bytes.len() });
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() {
            self.calls.push(GpuCall::DeleteBuffer(buffer));
        }
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), GpuError> {
        if !self.programs.contains_key(&program) {
            return Err(GpuError::UnknownProgram(program));
        }
        self.current_program = Some(program);
        self.calls.push(GpuCall::UseProgram(program));
        Ok(())
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) -> Result<(), GpuError> {
        if !self.textures.contains_key(&texture) {
            return Err(GpuError::UnknownTexture(texture));
        }
        self.calls.push(GpuCall::BindTexture { slot, texture });
        Ok(())
    }

    fn bind_attribute(&mut self, name: &str, buffer: BufferId, format: AttributeFormat) -> Result<(), GpuError> {
        self.bind_attribute_impl(name, buffer, format, false)
    }

    fn bind_int_attribute(&mut self, name: &str, buffer: BufferId, format: AttributeFormat) -> Result<(), GpuError> {
        self.bind_attribute_impl(name, buffer, format, true)
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), GpuError> {
        let kind = *self
            .current()?
            .uniforms
            .get(name)
            .ok_or_else(|| GpuError::UnknownUniform(name.to_string()))?;
        if kind != value.kind() {
            return Err(GpuError::UniformKindMismatch(name.to_string()));
        }
        self.calls.push(GpuCall::SetUniform { name: name.to_string(), value });
        Ok(())
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.calls.push(GpuCall::SetBlendMode(mode));
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) -> Result<(), GpuError> {
        self.current()?;
        self.calls.push(GpuCall::DrawArrays { topology, first, count });
        Ok(())
    }
}
