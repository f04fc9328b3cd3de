//! Graphics API facade.
//!
//! Everything above this module talks to the GPU through [`GpuDriver`]:
//! programs, RGBA8 textures, vertex buffers and array draws. Two
//! implementations exist:
//! - [`WgpuDriver`]: headless wgpu device rendering into an offscreen target
//! - [`RecordingDriver`]: in-memory driver that records calls, used by tests

mod driver;
mod error;
mod gpu;
mod recording;

pub use driver::{
    AttributeDecl, AttributeFormat, BlendMode, BufferId, GpuDriver, ProgramDesc, ProgramId,
    ScalarKind, TextureId, Topology, UniformDecl, UniformKind, UniformValue,
};
pub use error::GpuError;
pub use gpu::{WgpuDriver, WgpuDriverInit};
pub use recording::{GpuCall, RecordingDriver};
