//! Incremental mask-atlas compositing for annotation overlays.
//!
//! Nodes from a scene graph are composited into one CPU raster, split into
//! GPU-sized tiles, and re-uploaded only where something changed. Line
//! geometry for links between nodes lives in growable vertex buffers with
//! dirty-range uploads.
//!
//! The GPU is reached only through [`device::GpuDriver`]; [`device::WgpuDriver`]
//! renders offscreen, [`device::RecordingDriver`] records calls for tests.

pub mod atlas;
pub mod coords;
pub mod device;
pub mod geometry;
pub mod logging;
pub mod overlay;
pub mod paint;
pub mod raster;
pub mod render;
pub mod scene;
pub mod spatial;

mod error;

pub use error::{MosaicError, Result};
