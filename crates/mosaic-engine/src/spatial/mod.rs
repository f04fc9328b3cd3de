//! Spatial index over node bounding boxes.
//!
//! The compositor asks one question of it: which nodes touch this dirty
//! rectangle?

mod index;

pub use index::SpatialIndex;
