use thiserror::Error;

use crate::device::GpuError;
use crate::scene::NodeId;

/// Errors surfaced by the compositing core.
///
/// The geometry and tracking variants are caller bugs: the operation is
/// abandoned and nothing is retried.
#[derive(Debug, Error)]
pub enum MosaicError {
    #[error("{0} is not tracked")]
    UntrackedNode(NodeId),

    #[error("{0} is already present")]
    DuplicateNode(NodeId),

    #[error("geometry slot {0} does not exist")]
    UnknownGeometry(usize),

    #[error("geometry declared {declared} vertices but its generator emitted {emitted}")]
    VertexCountMismatch { declared: usize, emitted: usize },

    #[error("mask data is {len} bytes, expected {width}x{height} RGBA8")]
    MaskSize { width: u32, height: u32, len: usize },

    #[error("mask image codec failed: {0}")]
    MaskImage(#[from] image::ImageError),

    #[error("failed to start worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

pub type Result<T> = std::result::Result<T, MosaicError>;
