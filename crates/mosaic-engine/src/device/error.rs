use thiserror::Error;

use crate::coords::PixelRect;

use super::{BufferId, ProgramId, TextureId};

/// Failures reported by a [`GpuDriver`](super::GpuDriver).
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("program {0:?} does not exist")]
    UnknownProgram(ProgramId),

    #[error("texture {0:?} does not exist")]
    UnknownTexture(TextureId),

    #[error("buffer {0:?} does not exist")]
    UnknownBuffer(BufferId),

    #[error("no program is bound")]
    NoProgramBound,

    #[error("bound program has no attribute named `{0}`")]
    UnknownAttribute(String),

    #[error("attribute `{name}` was bound through the wrong path (integer: {integer})")]
    AttributePathMismatch { name: String, integer: bool },

    #[error("bound program has no uniform named `{0}`")]
    UnknownUniform(String),

    #[error("uniform `{0}` was given a value of the wrong kind")]
    UniformKindMismatch(String),

    #[error("texture slot {0} is not bound")]
    TextureSlotUnbound(u32),

    #[error("attribute `{0}` has no buffer bound")]
    AttributeUnbound(String),

    #[error("region {region:?} exceeds {width}x{height} texture")]
    RegionOutOfBounds { region: PixelRect, width: u32, height: u32 },

    #[error("expected {expected} bytes, got {actual}")]
    DataSizeMismatch { expected: usize, actual: usize },

    #[error("write of {len} bytes at offset {offset} overruns a {capacity} byte buffer")]
    BufferOverrun { offset: u64, len: usize, capacity: u64 },

    #[error("write at offset {offset} with {len} bytes is not 4-byte aligned")]
    Misaligned { offset: u64, len: usize },

    #[error("texture size {width}x{height} exceeds the {max} pixel limit")]
    TextureTooLarge { width: u32, height: u32, max: u32 },
}
