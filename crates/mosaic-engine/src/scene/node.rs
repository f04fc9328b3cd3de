use std::fmt;
use std::sync::Arc;

use crate::coords::PixelRect;
use crate::error::{MosaicError, Result};

/// Stable identifier assigned by the scene graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Decoded per-pixel shape of a node.
///
/// Pixels are RGBA8, row-major, tightly packed. Only the alpha channel is
/// consulted: a pixel belongs to the shape when its alpha is nonzero.
#[derive(Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mask")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Mask {
    /// Wraps raw RGBA8 pixels. `rgba` must hold exactly `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(MosaicError::MaskSize { width, height, len: rgba.len() });
        }
        Ok(Self { width, height, rgba })
    }

    /// Builds a mask from a predicate over mask-relative coordinates.
    pub fn from_fn(width: u32, height: u32, mut inside: impl FnMut(u32, u32) -> bool) -> Self {
        let mut rgba = vec![0u8; width as usize * height as usize * 4];
        for y in 0..height {
            for x in 0..width {
                if inside(x, y) {
                    let i = (y as usize * width as usize + x as usize) * 4;
                    rgba[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
                }
            }
        }
        Self { width, height, rgba }
    }

    /// Decodes an encoded image (PNG) into a mask.
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self { width, height, rgba: img.into_raw() })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Alpha at mask-relative `(x, y)`; zero outside the mask.
    #[inline]
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.rgba[(y as usize * self.width as usize + x as usize) * 4 + 3]
    }
}

/// One annotation region as published by the scene graph.
///
/// Nodes are immutable values: an edit produces a new `Node` that replaces
/// the old one wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub class_name: Arc<str>,
    pub bbox: PixelRect,
    pub mask: Option<Arc<Mask>>,
}

impl Node {
    pub fn new(id: NodeId, class_name: impl Into<Arc<str>>, bbox: PixelRect) -> Self {
        Self { id, class_name: class_name.into(), bbox, mask: None }
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(Arc::new(mask));
        self
    }

    /// Whether this node paints the surface pixel `(px, py)`.
    #[inline]
    pub fn covers(&self, px: u32, py: u32) -> bool {
        if !self.bbox.contains(px, py) {
            return false;
        }
        match &self.mask {
            None => true,
            Some(mask) => mask.alpha_at(px - self.bbox.x, py - self.bbox.y) != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_without_mask_covers_its_box() {
        let n = Node::new(NodeId(1), "TextRegion", PixelRect::new(2, 2, 3, 3));
        assert!(n.covers(2, 2));
        assert!(n.covers(4, 4));
        assert!(!n.covers(5, 4));
        assert!(!n.covers(1, 2));
    }

    #[test]
    fn mask_alpha_restricts_coverage() {
        // Diagonal mask.
        let mask = Mask::from_fn(3, 3, |x, y| x == y);
        let n = Node::new(NodeId(1), "Word", PixelRect::new(10, 10, 3, 3)).with_mask(mask);
        assert!(n.covers(10, 10));
        assert!(n.covers(12, 12));
        assert!(!n.covers(11, 10));
    }

    #[test]
    fn mask_smaller_than_box_is_transparent_outside() {
        let mask = Mask::from_fn(1, 1, |_, _| true);
        let n = Node::new(NodeId(1), "Word", PixelRect::new(0, 0, 4, 4)).with_mask(mask);
        assert!(n.covers(0, 0));
        assert!(!n.covers(3, 3));
    }

    #[test]
    fn png_mask_round_trips_alpha() {
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(1, 0, image::Rgba([0, 0, 0, 200]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let mask = Mask::from_png_bytes(&bytes).unwrap();
        assert_eq!((mask.width(), mask.height()), (2, 1));
        assert_eq!(mask.alpha_at(0, 0), 0);
        assert_eq!(mask.alpha_at(1, 0), 200);
    }

    #[test]
    fn raw_mask_checks_its_length() {
        let mask = Mask::from_rgba(2, 1, vec![0, 0, 0, 0, 9, 9, 9, 128]).unwrap();
        assert_eq!(mask.alpha_at(1, 0), 128);

        let err = Mask::from_rgba(2, 2, vec![0; 12]).unwrap_err();
        assert!(matches!(err, MosaicError::MaskSize { width: 2, height: 2, len: 12 }));
    }

    #[test]
    fn garbage_png_is_an_error() {
        assert!(Mask::from_png_bytes(b"not a png").is_err());
    }
}
