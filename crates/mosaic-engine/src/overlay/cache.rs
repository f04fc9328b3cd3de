use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::paint::FillStyle;
use crate::scene::{ClassStyle, Node, NodeId, SceneEvent};

use super::{DecodeRequest, DecodeResponse, OverlayImage, OverlayWorker};

/// Overlay images by node id, fed by an [`OverlayWorker`].
///
/// Entries are dropped when a node's mask or class changes and a new
/// request is submitted. Responses carry no generation: if two requests for
/// the same node are in flight, whichever response is applied last wins,
/// even if it belongs to the older request.
pub struct OverlayCache {
    worker: OverlayWorker,
    fill: FillStyle,
    entries: HashMap<NodeId, OverlayImage>,
    /// Nodes currently carrying a mask; results for other ids are discarded.
    live: HashSet<NodeId>,
}

impl OverlayCache {
    /// Starts the worker. Overlays are tinted with `fill`'s saturation and
    /// lightness, normally the atlas fill (`AtlasConfig::fill_style`).
    pub fn new(fill: FillStyle) -> Result<Self> {
        Ok(Self {
            worker: OverlayWorker::spawn()?,
            fill,
            entries: HashMap::new(),
            live: HashSet::new(),
        })
    }

    pub fn get(&self, id: NodeId) -> Option<&OverlayImage> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Submits a decode for `node` if it has a mask.
    pub fn request(&mut self, node: &Node, style: &dyn ClassStyle) {
        let Some(mask) = node.mask.as_ref() else {
            return;
        };
        self.live.insert(node.id);
        let submitted = self.worker.submit(DecodeRequest {
            node_id: node.id,
            mask: Arc::clone(mask),
            hue: style.hue(&node.class_name),
            fill: self.fill,
        });
        if !submitted {
            log::warn!("overlay worker unavailable; {} not decoded", node.id);
        }
    }

    fn forget(&mut self, id: NodeId) {
        self.entries.remove(&id);
        self.live.remove(&id);
    }

    /// Reacts to a scene change: invalidates and resubmits as needed.
    pub fn observe(&mut self, event: &SceneEvent, style: &dyn ClassStyle) {
        match event {
            SceneEvent::Inserted(node) => self.request(node, style),
            SceneEvent::Removed(node) => self.forget(node.id),
            SceneEvent::Updated { is_link_update: true, .. } => {}
            SceneEvent::Updated { node_id, old, new, .. } => {
                let mask_changed = match (&old.mask, &new.mask) {
                    (Some(a), Some(b)) => !Arc::ptr_eq(a, b) && a != b,
                    (None, None) => false,
                    _ => true,
                };
                if mask_changed || old.class_name != new.class_name {
                    self.forget(*node_id);
                    self.request(new, style);
                }
            }
        }
    }

    /// Stores one response. Failed decodes leave the entry empty.
    pub fn apply(&mut self, response: DecodeResponse) {
        if !self.live.contains(&response.node_id) {
            log::trace!("dropping stale overlay for {}", response.node_id);
            return;
        }
        match response.result {
            Ok(image) => {
                self.entries.insert(response.node_id, image);
            }
            Err(err) => {
                log::warn!("overlay for {} unavailable: {err}", response.node_id);
                self.entries.remove(&response.node_id);
            }
        }
    }

    /// Applies every finished response. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Some(response) = self.worker.try_recv() {
            self.apply(response);
            applied += 1;
        }
        applied
    }

    /// Like [`poll`](Self::poll), but first waits up to `timeout` for one response.
    pub fn poll_timeout(&mut self, timeout: Duration) -> usize {
        match self.worker.recv_timeout(timeout) {
            Some(response) => {
                self.apply(response);
                1 + self.poll()
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::PixelRect;
    use crate::overlay::render_overlay;
    use crate::scene::{LayerTable, Mask};

    const WAIT: Duration = Duration::from_secs(5);

    fn masked(id: u64, class: &str, fill: bool) -> Arc<Node> {
        let mask = Mask::from_fn(2, 2, move |x, _| fill || x == 0);
        Arc::new(Node::new(NodeId(id), class, PixelRect::new(0, 0, 2, 2)).with_mask(mask))
    }

    fn drain(cache: &mut OverlayCache, expected: usize) {
        let mut got = 0;
        while got < expected {
            let n = cache.poll_timeout(WAIT);
            assert!(n > 0, "timed out waiting for overlays");
            got += n;
        }
    }

    #[test]
    fn insert_populates_cache() {
        let style = LayerTable::default();
        let mut cache = OverlayCache::new(FillStyle::default()).unwrap();
        cache.observe(&SceneEvent::Inserted(masked(1, "Word", true)), &style);
        cache.observe(
            &SceneEvent::Inserted(Arc::new(Node::new(NodeId(2), "Word", PixelRect::new(0, 0, 1, 1)))),
            &style,
        );
        drain(&mut cache, 1);

        assert!(cache.get(NodeId(1)).is_some());
        assert!(cache.get(NodeId(2)).is_none());
    }

    #[test]
    fn requests_carry_configured_fill() {
        let style = LayerTable::default();
        let fill = FillStyle { saturation: 0.1, lightness: 0.9, alpha: 0.5 };
        let mut cache = OverlayCache::new(fill).unwrap();
        let node = masked(1, "Word", true);
        cache.request(&node, &style);
        drain(&mut cache, 1);

        let expected = render_overlay(node.mask.as_ref().unwrap(), style.hue("Word"), fill).unwrap();
        assert_eq!(cache.get(NodeId(1)), Some(&expected));
    }

    #[test]
    fn mask_change_replaces_entry() {
        let style = LayerTable::default();
        let mut cache = OverlayCache::new(FillStyle::default()).unwrap();
        let old = masked(1, "Word", true);
        cache.observe(&SceneEvent::Inserted(Arc::clone(&old)), &style);
        drain(&mut cache, 1);
        let first = cache.get(NodeId(1)).cloned().unwrap();

        let new = masked(1, "Word", false);
        cache.observe(
            &SceneEvent::Updated { node_id: NodeId(1), old, new, is_link_update: false },
            &style,
        );
        assert!(cache.get(NodeId(1)).is_none());
        drain(&mut cache, 1);
        assert_ne!(cache.get(NodeId(1)).unwrap(), &first);
    }

    #[test]
    fn unchanged_update_keeps_entry() {
        let style = LayerTable::default();
        let mut cache = OverlayCache::new(FillStyle::default()).unwrap();
        let node = masked(1, "Word", true);
        cache.observe(&SceneEvent::Inserted(Arc::clone(&node)), &style);
        drain(&mut cache, 1);

        cache.observe(
            &SceneEvent::Updated {
                node_id: NodeId(1),
                old: Arc::clone(&node),
                new: node,
                is_link_update: true,
            },
            &style,
        );
        assert!(cache.get(NodeId(1)).is_some());
    }

    #[test]
    fn removed_node_ignores_late_result() {
        let style = LayerTable::default();
        let mut cache = OverlayCache::new(FillStyle::default()).unwrap();
        let node = masked(1, "Word", true);
        cache.observe(&SceneEvent::Inserted(Arc::clone(&node)), &style);
        cache.observe(&SceneEvent::Removed(node), &style);
        drain(&mut cache, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn late_result_overwrites_newer_one() {
        let style = LayerTable::default();
        let mut cache = OverlayCache::new(FillStyle::default()).unwrap();
        let node = masked(1, "Word", true);
        cache.request(&node, &style);
        drain(&mut cache, 1);

        let older = masked(1, "Word", false);
        let stale = render_overlay(older.mask.as_ref().unwrap(), 0, FillStyle::default()).unwrap();
        cache.apply(DecodeResponse { node_id: NodeId(1), result: Ok(stale.clone()) });
        assert_eq!(cache.get(NodeId(1)), Some(&stale));
    }
}
