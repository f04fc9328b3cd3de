//! Dynamic vertex storage.
//!
//! A [`GeometryBuffer`] packs many independently addressable geometries in
//! one GPU buffer and re-uploads only the dirty span on flush.

mod buffer;
mod links;
mod vertex;

pub use buffer::{GeometryBuffer, GeometryRecord};
pub use links::{LinkLayer, LinkSegment};
pub use vertex::{GeometrySource, VertexElement};
