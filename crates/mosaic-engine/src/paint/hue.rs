use super::Color;

/// Stable hue in `[0, 360)` derived from a class name.
///
/// FNV-1a (32 bit) over the UTF-8 bytes, so the mapping is identical across
/// runs and platforms.
pub fn class_hue(class_name: &str) -> u16 {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let hash = class_name
        .bytes()
        .fold(OFFSET, |h, b| (h ^ b as u32).wrapping_mul(PRIME));
    (hash % 360) as u16
}

/// Fill parameters shared by every node of the mask surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FillStyle {
    pub saturation: f32,
    pub lightness: f32,
    /// Kept low so overlapping regions stay distinguishable.
    pub alpha: f32,
}

impl Default for FillStyle {
    fn default() -> Self {
        Self { saturation: 0.7, lightness: 0.5, alpha: 0.35 }
    }
}

impl FillStyle {
    pub fn color_for_hue(&self, hue: u16) -> Color {
        Color::from_hsl(hue as f32, self.saturation, self.lightness, self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_is_deterministic_and_in_range() {
        for name in ["TextRegion", "TextLine", "Word", "Glyph", ""] {
            let h = class_hue(name);
            assert!(h < 360);
            assert_eq!(h, class_hue(name));
        }
    }

    #[test]
    fn empty_name_hashes_to_offset_basis() {
        assert_eq!(class_hue(""), (0x811c_9dc5u32 % 360) as u16);
    }

    #[test]
    fn fill_uses_configured_alpha() {
        let style = FillStyle { alpha: 0.25, ..FillStyle::default() };
        assert_eq!(style.color_for_hue(10).a, 0.25);
    }
}
