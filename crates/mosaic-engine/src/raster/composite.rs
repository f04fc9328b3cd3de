use crate::coords::PixelRect;
use crate::paint::Color;
use crate::scene::Node;

use super::ClientRasterBuffer;

/// One node to paint, with its resolved fill color.
#[derive(Debug, Copy, Clone)]
pub struct PaintLayer<'a> {
    pub node: &'a Node,
    pub color: Color,
}

/// Recomposites `region` of `target` from scratch.
///
/// `layers` must already be sorted back-to-front. Every pixel of the region
/// starts transparent and each layer is blended "over" it where the layer's
/// box (and mask, when present) covers the pixel. Blending runs in `f32` and
/// is quantized once per pixel at the end.
pub fn composite_region(target: &mut ClientRasterBuffer, region: PixelRect, layers: &[PaintLayer<'_>]) {
    let Some(region) = region.clamp_to(target.width(), target.height()) else {
        return;
    };

    let stride = region.width as usize;
    let mut scratch = vec![Color::transparent(); region.area() as usize];

    for layer in layers {
        let Some(hit) = layer.node.bbox.intersect(region) else {
            continue;
        };
        for y in hit.y..hit.bottom() {
            let row = (y - region.y) as usize * stride;
            for x in hit.x..hit.right() {
                if layer.node.covers(x, y) {
                    let px = &mut scratch[row + (x - region.x) as usize];
                    *px = layer.color.over(*px);
                }
            }
        }
    }

    for (row, y) in (region.y..region.bottom()).enumerate() {
        let src = &scratch[row * stride..(row + 1) * stride];
        for (dst, color) in target.span_mut(y, region.x, region.right()).iter_mut().zip(src) {
            *dst = color.to_rgba8();
        }
    }
}
