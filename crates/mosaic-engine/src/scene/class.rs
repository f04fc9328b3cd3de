use std::collections::HashMap;

use crate::paint::class_hue;

/// Layer assigned to classes missing from the table; sorts above everything.
pub const UNKNOWN_LAYER: i32 = i32::MAX;

/// Class metadata consumed by the compositor.
///
/// The scene graph owns the ontology; the compositor only needs a draw layer
/// and a hue per class name.
pub trait ClassStyle {
    /// Layer bucket for `class_name`. Higher layers draw on top.
    fn z_layer(&self, class_name: &str) -> i32;

    /// Hue in degrees `[0, 360)`.
    fn hue(&self, class_name: &str) -> u16 {
        class_hue(class_name)
    }
}

/// Fixed class-name to layer lookup.
#[derive(Debug, Clone)]
pub struct LayerTable {
    layers: HashMap<String, i32>,
}

impl LayerTable {
    pub fn empty() -> Self {
        Self { layers: HashMap::new() }
    }

    pub fn with_layer(mut self, class_name: impl Into<String>, layer: i32) -> Self {
        self.layers.insert(class_name.into(), layer);
        self
    }

    pub fn set_layer(&mut self, class_name: impl Into<String>, layer: i32) {
        self.layers.insert(class_name.into(), layer);
    }
}

impl Default for LayerTable {
    /// Page-layout hierarchy: containers at the back, glyphs at the front.
    fn default() -> Self {
        Self::empty()
            .with_layer("Page", 0)
            .with_layer("PrintSpace", 2)
            .with_layer("TableRegion", 5)
            .with_layer("TextRegion", 10)
            .with_layer("ImageRegion", 10)
            .with_layer("GraphicRegion", 10)
            .with_layer("SeparatorRegion", 10)
            .with_layer("TableCell", 15)
            .with_layer("TextLine", 20)
            .with_layer("Word", 30)
            .with_layer("Glyph", 40)
    }
}

impl ClassStyle for LayerTable {
    fn z_layer(&self, class_name: &str) -> i32 {
        self.layers.get(class_name).copied().unwrap_or(UNKNOWN_LAYER)
    }
}
