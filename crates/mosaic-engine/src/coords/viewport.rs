use glam::{Mat4, Vec2, Vec4};

/// Output size in physical pixels of the render target.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// Pan/zoom applied to surface coordinates before projection.
///
/// A surface point `p` lands on screen at `p * zoom + pan`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewTransform {
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { pan: Vec2::ZERO, zoom: 1.0 }
    }
}

impl ViewTransform {
    /// Zoom is clamped to `[0.01, 64.0]`.
    pub fn new(pan: Vec2, zoom: f32) -> Self {
        Self { pan, zoom: zoom.clamp(0.01, 64.0) }
    }

    pub fn surface_to_screen(&self, p: Vec2) -> Vec2 {
        p * self.zoom + self.pan
    }

    pub fn screen_to_surface(&self, p: Vec2) -> Vec2 {
        (p - self.pan) / self.zoom
    }

    /// Matrix taking surface pixels to NDC (top-left origin, +Y down on screen).
    ///
    /// Degenerate viewports are treated as 1x1.
    pub fn projection(&self, viewport: Viewport) -> Mat4 {
        let vw = viewport.width.max(1.0);
        let vh = viewport.height.max(1.0);

        let sx = 2.0 * self.zoom / vw;
        let sy = -2.0 * self.zoom / vh;
        let tx = 2.0 * self.pan.x / vw - 1.0;
        let ty = 1.0 - 2.0 * self.pan.y / vh;

        Mat4::from_cols(
            Vec4::new(sx, 0.0, 0.0, 0.0),
            Vec4::new(0.0, sy, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(tx, ty, 0.0, 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_projects(t: &ViewTransform, vp: Viewport, p: (f32, f32), ndc: (f32, f32)) {
        let v = t.projection(vp) * Vec4::new(p.0, p.1, 0.0, 1.0);
        assert!((v.x - ndc.0).abs() < 1e-5, "x: {} vs {}", v.x, ndc.0);
        assert!((v.y - ndc.1).abs() < 1e-5, "y: {} vs {}", v.y, ndc.1);
    }

    #[test]
    fn identity_maps_corners_to_ndc() {
        let t = ViewTransform::default();
        let vp = Viewport::new(200.0, 100.0);
        assert_projects(&t, vp, (0.0, 0.0), (-1.0, 1.0));
        assert_projects(&t, vp, (200.0, 100.0), (1.0, -1.0));
    }

    #[test]
    fn pan_and_zoom_shift_the_origin() {
        let t = ViewTransform::new(Vec2::new(100.0, 50.0), 2.0);
        let vp = Viewport::new(200.0, 100.0);
        // Surface origin lands at the screen centre.
        assert_projects(&t, vp, (0.0, 0.0), (0.0, 0.0));
        // 50 surface px at zoom 2 cover the remaining half.
        assert_projects(&t, vp, (50.0, 25.0), (1.0, -1.0));
    }

    #[test]
    fn screen_surface_round_trip() {
        let t = ViewTransform::new(Vec2::new(-30.0, 12.0), 4.0);
        let p = Vec2::new(7.0, 9.0);
        assert_eq!(t.screen_to_surface(t.surface_to_screen(p)), p);
    }
}
