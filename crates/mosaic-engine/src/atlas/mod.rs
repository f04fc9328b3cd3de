//! Mask atlas: the composited node surface and its GPU tiles.
//!
//! The surface may exceed the GPU's texture limit, so it is split into a
//! grid of tiles, each backed by its own texture.

mod config;
mod renderer;
mod tiles;

pub use config::{AtlasConfig, Sizing};
pub use renderer::{FlushStats, MaskAtlasRenderer};
pub use tiles::{RangeTexture, TileGrid};
