//! Coordinate and geometry types shared across the engine.
//!
//! Canonical surface space:
//! - integer pixels of the composited mask surface
//! - origin top-left
//! - +X right, +Y down
//!
//! `ViewTransform` maps surface space to the screen; drawables receive the
//! resulting projection matrix once per frame.

mod rect;
mod viewport;

pub use rect::PixelRect;
pub use viewport::{ViewTransform, Viewport};
