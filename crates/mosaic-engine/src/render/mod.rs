//! Frame driving.
//!
//! Drawables own their GPU resources and issue draws through the
//! [`GpuDriver`](crate::device::GpuDriver) facade. The host computes the
//! projection once per frame.
//!
//! Convention:
//! - geometry is in surface pixels (top-left origin, +Y down)
//! - shaders map to clip space with the `projection` uniform

mod host;

pub use host::{Drawable, FrameContext, RenderHost, SharedDrawable};
