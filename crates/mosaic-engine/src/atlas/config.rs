use crate::coords::PixelRect;
use crate::paint::FillStyle;

/// How the composited surface is sized.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Sizing {
    /// Explicit surface size. Nodes outside it are clipped.
    Fixed { width: u32, height: u32 },
    /// Smallest rect covering every node, plus padding.
    ///
    /// `padding = padding_multiplier * min(min_left, min_top) + padding_extra_pixels`,
    /// added past the right-most and bottom-most node edges.
    Auto {
        padding_multiplier: f32,
        padding_extra_pixels: u32,
    },
}

impl Default for Sizing {
    fn default() -> Self {
        Sizing::Auto { padding_multiplier: 0.1, padding_extra_pixels: 32 }
    }
}

impl Sizing {
    /// Surface size for the given node boxes. Never smaller than 1x1.
    pub fn surface_size(&self, boxes: impl IntoIterator<Item = PixelRect>) -> (u32, u32) {
        match *self {
            Sizing::Fixed { width, height } => (width.max(1), height.max(1)),
            Sizing::Auto { padding_multiplier, padding_extra_pixels } => {
                let mut min_x = u32::MAX;
                let mut min_y = u32::MAX;
                let mut max_x = 0u32;
                let mut max_y = 0u32;
                for b in boxes {
                    min_x = min_x.min(b.x);
                    min_y = min_y.min(b.y);
                    max_x = max_x.max(b.right());
                    max_y = max_y.max(b.bottom());
                }
                let min_coord = if min_x == u32::MAX { 0 } else { min_x.min(min_y) };

                let scaled = (padding_multiplier.max(0.0) * min_coord as f32).round() as u32;
                let padding = scaled.saturating_add(padding_extra_pixels);
                (
                    max_x.saturating_add(padding).max(1),
                    max_y.saturating_add(padding).max(1),
                )
            }
        }
    }

    #[inline]
    pub fn is_auto(&self) -> bool {
        matches!(self, Sizing::Auto { .. })
    }
}

/// Construction parameters for [`MaskAtlasRenderer`](super::MaskAtlasRenderer).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AtlasConfig {
    pub sizing: Sizing,
    /// Node fill opacity. Kept low so overlaps stay visible.
    pub fill_alpha: f32,
    pub saturation: f32,
    pub lightness: f32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        let fill = FillStyle::default();
        Self {
            sizing: Sizing::default(),
            fill_alpha: fill.alpha,
            saturation: fill.saturation,
            lightness: fill.lightness,
        }
    }
}

impl AtlasConfig {
    pub fn with_sizing(mut self, sizing: Sizing) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_fill_alpha(mut self, alpha: f32) -> Self {
        self.fill_alpha = alpha;
        self
    }

    pub fn fill_style(&self) -> FillStyle {
        FillStyle {
            saturation: self.saturation,
            lightness: self.lightness,
            alpha: self.fill_alpha,
        }
    }
}
