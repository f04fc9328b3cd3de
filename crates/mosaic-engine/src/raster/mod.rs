//! CPU-side compositing surface.
//!
//! The client buffer is the source of truth for every GPU tile. Dirty
//! regions are recomposited here before any upload happens.

mod buffer;
mod composite;
mod dirty;

pub use buffer::ClientRasterBuffer;
pub use composite::{composite_region, PaintLayer};
pub use dirty::DirtyRegionTracker;
