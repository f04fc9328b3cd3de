use core::cmp::{Ordering, Reverse};

use super::NodeId;

/// Back-to-front sort key for compositing.
///
/// Ordering rules:
/// 1) `layer`: ascending (class layer bucket)
/// 2) `area`: descending, so smaller boxes of the same layer land on top
/// 3) `id`: ascending, to keep the order total
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SceneOrder {
    pub layer: i32,
    pub area: Reverse<u64>,
    pub id: NodeId,
}

impl SceneOrder {
    #[inline]
    pub const fn new(layer: i32, area: u64, id: NodeId) -> Self {
        Self { layer, area: Reverse(area), id }
    }
}

impl Ord for SceneOrder {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.layer
            .cmp(&other.layer)
            .then(self.area.cmp(&other.area))
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for SceneOrder {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
