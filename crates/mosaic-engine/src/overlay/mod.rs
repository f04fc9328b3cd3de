//! Off-thread overlay rendering for node masks.
//!
//! A worker thread turns masks into hue-tinted PNG images. The cache keeps
//! the latest image per node and follows scene changes.

mod cache;
mod worker;

pub use cache::OverlayCache;
pub use worker::{render_overlay, DecodeRequest, DecodeResponse, OverlayImage, OverlayWorker};
