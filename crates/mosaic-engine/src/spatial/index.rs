use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};

use crate::coords::PixelRect;
use crate::scene::NodeId;

type Corner = [i64; 2];
type Entry<T> = GeomWithData<Rectangle<Corner>, (PixelRect, T)>;

fn corners(rect: PixelRect) -> (Corner, Corner) {
    (
        [rect.x as i64, rect.y as i64],
        [rect.right() as i64, rect.bottom() as i64],
    )
}

fn entry<T>(rect: PixelRect, item: T) -> Entry<T> {
    let (lo, hi) = corners(rect);
    GeomWithData::new(Rectangle::from_corners(lo, hi), (rect, item))
}

/// Bounding-box index backed by an `rstar` R-tree.
///
/// Items are addressed by `(rect, item)` pairs; the same item may appear
/// under several rects. The tree works on closed boxes, so every hit is
/// re-checked against half-open pixel coverage: rects that merely touch are
/// not reported, nor are zero-area rects.
#[derive(Debug, Clone)]
pub struct SpatialIndex<T = NodeId> {
    tree: RTree<Entry<T>>,
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self { tree: RTree::new() }
    }
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packs `entries` with the bulk-loading algorithm; cheaper and better
    /// balanced than inserting one by one.
    pub fn bulk_load(entries: impl IntoIterator<Item = (PixelRect, T)>) -> Self {
        let entries = entries.into_iter().map(|(rect, item)| entry(rect, item)).collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Envelope of every stored rect.
    pub fn bounds(&self) -> Option<PixelRect> {
        if self.is_empty() {
            return None;
        }
        let env = self.tree.root().envelope();
        let ([x0, y0], [x1, y1]) = (env.lower(), env.upper());
        Some(PixelRect::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    pub fn insert(&mut self, rect: PixelRect, item: T) {
        self.tree.insert(entry(rect, item));
    }

    /// Calls `f` for every entry whose rect shares at least one pixel with `rect`.
    pub fn for_each_intersecting(&self, rect: PixelRect, mut f: impl FnMut(PixelRect, &T)) {
        if rect.is_empty() {
            return;
        }
        let (lo, hi) = corners(rect);
        for hit in self.tree.locate_in_envelope_intersecting(&AABB::from_corners(lo, hi)) {
            let (stored, item) = &hit.data;
            if stored.intersects(rect) {
                f(*stored, item);
            }
        }
    }

    /// Items intersecting `rect`, in unspecified order.
    pub fn search(&self, rect: PixelRect) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = Vec::new();
        self.for_each_intersecting(rect, |_, item| out.push(item.clone()));
        out
    }
}

impl<T: PartialEq> SpatialIndex<T> {
    /// Removes the entry stored under exactly `rect`. Returns whether it existed.
    pub fn remove(&mut self, rect: PixelRect, item: T) -> bool {
        self.tree.remove(&entry(rect, item)).is_some()
    }
}
