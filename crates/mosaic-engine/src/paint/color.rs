/// Straight (unpremultiplied) RGBA color with `f32` channels in `[0, 1]`.
///
/// The compositing surface stores straight alpha, so blending happens in this
/// representation and is quantized to [`Rgba8`] on write.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[inline]
    pub const fn transparent() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 }
    }

    /// Creates a color from straight components, clamping each to `[0, 1]`.
    #[inline]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Builds a color from hue (degrees), saturation and lightness in `[0, 1]`.
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
        let (r1, g1, b1) = match h as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = l - chroma / 2.0;
        Self::new(r1 + m, g1 + m, b1 + m, alpha)
    }

    #[inline]
    pub fn from_rgba8(px: Rgba8) -> Self {
        Self {
            r: px.r as f32 / 255.0,
            g: px.g as f32 / 255.0,
            b: px.b as f32 / 255.0,
            a: px.a as f32 / 255.0,
        }
    }

    #[inline]
    pub fn to_rgba8(self) -> Rgba8 {
        #[inline]
        fn q(v: f32) -> u8 {
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        Rgba8::new(q(self.r), q(self.g), q(self.b), q(self.a))
    }

    /// Porter-Duff "source over destination" for straight-alpha storage.
    ///
    /// `out_a = src_a + dst_a * (1 - src_a)`; color channels are weighted by
    /// their alpha contribution and divided back out. A fully transparent
    /// result has zero color.
    #[inline]
    pub fn over(self, dst: Color) -> Color {
        let dst_weight = dst.a * (1.0 - self.a);
        let out_a = self.a + dst_weight;
        if out_a <= 0.0 {
            return Color::transparent();
        }
        let inv = 1.0 / out_a;
        Color {
            r: (self.r * self.a + dst.r * dst_weight) * inv,
            g: (self.g * self.a + dst.g * dst_weight) * inv,
            b: (self.b * self.a + dst.b * dst_weight) * inv,
            a: out_a,
        }
    }
}

/// One surface pixel as stored in the client raster buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}
