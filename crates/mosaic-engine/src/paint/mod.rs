//! Color model for the composited mask surface.
//!
//! Scope:
//! - straight-alpha colors and the Porter-Duff "over" operator
//! - deterministic per-class hues and the shared fill style
//!
//! Geometry types remain in `coords`.

pub mod color;
pub mod hue;

pub use color::{Color, Rgba8};
pub use hue::{class_hue, FillStyle};
