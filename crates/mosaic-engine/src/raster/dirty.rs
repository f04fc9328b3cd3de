use crate::coords::PixelRect;

/// Queue of rectangles awaiting recomposition.
///
/// Regions are kept exactly as pushed: overlapping or duplicate regions are
/// not merged, so each one is recomposited and uploaded on its own.
#[derive(Debug, Default, Clone)]
pub struct DirtyRegionTracker {
    regions: Vec<PixelRect>,
}

impl DirtyRegionTracker {
    pub fn new() -> Self {
        Self { regions: Vec::with_capacity(16) }
    }

    /// Queues a region. Empty rects carry no pixels and are dropped.
    pub fn push(&mut self, rect: PixelRect) {
        if !rect.is_empty() {
            self.regions.push(rect);
        }
    }

    pub fn regions(&self) -> &[PixelRect] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Takes every queued region, leaving the tracker empty.
    pub fn take(&mut self) -> Vec<PixelRect> {
        std::mem::take(&mut self.regions)
    }
}
