use crate::coords::PixelRect;
use crate::paint::Rgba8;

/// CPU-resident RGBA8 mirror of the whole composited surface.
///
/// Row-major, tightly packed, straight alpha. The GPU tiles are always
/// uploaded from this buffer, never the other way round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl ClientRasterBuffer {
    /// Allocates a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba8::TRANSPARENT; width as usize * height as usize],
        }
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
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn bounds(&self) -> PixelRect {
        PixelRect::from_size(self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Pixel at `(x, y)`, `None` outside the surface.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[self.index(x, y)])
    }

    /// Writes one pixel. Out-of-range writes are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, px: Rgba8) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.pixels[i] = px;
        }
    }

    pub fn pixels(&self) -> &[Rgba8] {
        &self.pixels
    }

    /// Raw bytes, `width * height * 4` long.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Mutable view of the pixels of row `y` in `[x0, x1)`.
    pub(crate) fn span_mut(&mut self, y: u32, x0: u32, x1: u32) -> &mut [Rgba8] {
        let start = self.index(x0, y);
        let end = self.index(x1, y);
        &mut self.pixels[start..end]
    }

    /// Resets `rect` (clipped to the surface) to transparent.
    pub fn clear_region(&mut self, rect: PixelRect) {
        let Some(rect) = rect.clamp_to(self.width, self.height) else {
            return;
        };
        for y in rect.y..rect.bottom() {
            self.span_mut(y, rect.x, rect.right()).fill(Rgba8::TRANSPARENT);
        }
    }

    /// Copies `rect` out as tightly packed RGBA8 rows.
    ///
    /// The rect is clipped to the surface; the returned data matches the
    /// clipped size, which is returned alongside.
    pub fn copy_region(&self, rect: PixelRect) -> (PixelRect, Vec<u8>) {
        let Some(rect) = rect.clamp_to(self.width, self.height) else {
            return (PixelRect::new(rect.x, rect.y, 0, 0), Vec::new());
        };
        let mut out = Vec::with_capacity(rect.area() as usize * 4);
        for y in rect.y..rect.bottom() {
            let start = self.index(rect.x, y);
            let end = self.index(rect.right(), y);
            out.extend_from_slice(bytemuck::cast_slice(&self.pixels[start..end]));
        }
        (rect, out)
    }

    /// Reallocates to `width` x `height`.
    ///
    /// The overlapping top-left block keeps its pixels; newly exposed area is
    /// transparent. Returns `false` when the size did not change.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if (width, height) == (self.width, self.height) {
            return false;
        }

        let mut next = vec![Rgba8::TRANSPARENT; width as usize * height as usize];
        let keep_w = self.width.min(width) as usize;
        let keep_h = self.height.min(height) as usize;
        for y in 0..keep_h {
            let src = y * self.width as usize;
            let dst = y * width as usize;
            next[dst..dst + keep_w].copy_from_slice(&self.pixels[src..src + keep_w]);
        }

        log::debug!(
            "raster buffer resized {}x{} -> {width}x{height}",
            self.width,
            self.height
        );
        self.width = width;
        self.height = height;
        self.pixels = next;
        true
    }
}
