use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::coords::PixelRect;
use crate::device::{
    AttributeDecl, AttributeFormat, BlendMode, GpuDriver, ProgramDesc, ProgramId, ScalarKind,
    Topology, UniformDecl, UniformKind, UniformValue,
};
use crate::error::{MosaicError, Result};
use crate::geometry::{GeometryBuffer, GeometrySource};
use crate::paint::FillStyle;
use crate::raster::{composite_region, ClientRasterBuffer, DirtyRegionTracker, PaintLayer};
use crate::render::{Drawable, FrameContext};
use crate::scene::{ClassStyle, LayerTable, Node, NodeId, SceneEvent, SceneGraph, SceneOrder, Subscription};
use crate::spatial::SpatialIndex;

use super::{AtlasConfig, RangeTexture, TileGrid};

const QUAD_VERTICES: usize = 6;

/// Screen quad for one tile: `[x, y, u, v]` per vertex, two triangles.
#[derive(Debug, Copy, Clone, PartialEq)]
struct TileQuad {
    rect: PixelRect,
}

impl GeometrySource<[f32; 4]> for TileQuad {
    fn vertex_count(&self) -> usize {
        QUAD_VERTICES
    }

    fn write_vertices(&self, out: &mut Vec<[f32; 4]>) {
        let x0 = self.rect.x as f32;
        let y0 = self.rect.y as f32;
        let x1 = self.rect.right() as f32;
        let y1 = self.rect.bottom() as f32;
        out.extend_from_slice(&[
            [x0, y0, 0.0, 0.0],
            [x1, y0, 1.0, 0.0],
            [x0, y1, 0.0, 1.0],
            [x0, y1, 0.0, 1.0],
            [x1, y0, 1.0, 0.0],
            [x1, y1, 1.0, 1.0],
        ]);
    }
}

/// Counters for one [`MaskAtlasRenderer::flush`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub resized: bool,
    pub regions: usize,
    pub sub_uploads: usize,
    pub full_uploads: usize,
}

/// Keeps a composited RGBA surface of every visible node in sync with a set
/// of GPU tiles.
///
/// Scene edits only update the spatial index and queue dirty regions. The
/// actual work happens in [`flush`](Self::flush), once per frame:
/// 1. apply a pending resize (buffer, tile grid)
/// 2. recomposite every dirty region on the CPU
/// 3. sub-upload each region into the tiles it touches
/// 4. fully upload tiles whose storage was reallocated
pub struct MaskAtlasRenderer<S = LayerTable> {
    config: AtlasConfig,
    fill: FillStyle,
    style: S,

    /// Tracked nodes; each node's bbox is its last known range.
    nodes: HashMap<NodeId, Arc<Node>>,
    hidden: HashSet<NodeId>,
    index: SpatialIndex,

    raster: ClientRasterBuffer,
    dirty: DirtyRegionTracker,
    resize_pending: bool,

    tiles: TileGrid,
    quads: GeometryBuffer<[f32; 4], TileQuad>,
    program: Option<ProgramId>,

    events: Option<Subscription<SceneEvent>>,
}

impl<S: ClassStyle> MaskAtlasRenderer<S> {
    /// Builds the renderer over an initial node snapshot and composites it once.
    pub fn new(
        nodes: impl IntoIterator<Item = Arc<Node>>,
        style: S,
        config: AtlasConfig,
    ) -> Result<Self> {
        let mut tracked = HashMap::new();
        for node in nodes {
            let id = node.id;
            if tracked.insert(id, node).is_some() {
                return Err(MosaicError::DuplicateNode(id));
            }
        }

        let (width, height) = config.sizing.surface_size(tracked.values().map(|n| n.bbox));
        let index = SpatialIndex::bulk_load(tracked.values().map(|n| (n.bbox, n.id)));

        let mut renderer = Self {
            config,
            fill: config.fill_style(),
            style,
            nodes: tracked,
            hidden: HashSet::new(),
            index,
            raster: ClientRasterBuffer::new(width, height),
            dirty: DirtyRegionTracker::new(),
            resize_pending: false,
            tiles: TileGrid::new(),
            quads: GeometryBuffer::new(),
            program: None,
            events: None,
        };
        renderer.recompose(PixelRect::from_size(width, height));

        log::debug!(
            "mask atlas {width}x{height} over {} nodes",
            renderer.nodes.len()
        );
        Ok(renderer)
    }

    /// Snapshots `graph` and subscribes to its changes.
    ///
    /// Pending events are applied at the start of every [`draw`](Drawable::draw),
    /// or explicitly through [`process_events`](Self::process_events).
    pub fn from_graph(graph: &mut SceneGraph, style: S, config: AtlasConfig) -> Result<Self> {
        let mut renderer = Self::new(graph.nodes().cloned(), style, config)?;
        renderer.events = Some(graph.subscribe());
        Ok(renderer)
    }

    // ── inspection ────────────────────────────────────────────────────────

    /// Surface size `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        self.raster.size()
    }

    /// The CPU-side composited surface.
    pub fn pixels(&self) -> &ClientRasterBuffer {
        &self.raster
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Last known range of every tracked node.
    pub fn tracked_ranges(&self) -> impl Iterator<Item = (NodeId, PixelRect)> + '_ {
        self.nodes.values().map(|n| (n.id, n.bbox))
    }

    pub fn is_tracked(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        !self.hidden.contains(&id)
    }

    /// Regions queued since the last flush.
    pub fn pending_regions(&self) -> &[PixelRect] {
        self.dirty.regions()
    }

    // ── scene changes ─────────────────────────────────────────────────────

    /// Applies one scene notification.
    ///
    /// Updates and removals of ids that are not tracked are caller bugs and
    /// fail with [`MosaicError::UntrackedNode`].
    pub fn handle_event(&mut self, event: &SceneEvent) -> Result<()> {
        match event {
            SceneEvent::Inserted(node) => self.insert_node(Arc::clone(node)),
            SceneEvent::Removed(node) => self.remove_node(node.id),
            SceneEvent::Updated { is_link_update: true, .. } => Ok(()),
            SceneEvent::Updated { node_id, new, .. } => self.update_node(*node_id, Arc::clone(new)),
        }
    }

    /// Drains the subscription set up by [`from_graph`](Self::from_graph).
    /// Returns the number of events applied.
    pub fn process_events(&mut self) -> Result<usize> {
        let Some(events) = self.events.as_ref() else {
            return Ok(0);
        };
        let pending = events.drain();
        for event in &pending {
            self.handle_event(event)?;
        }
        Ok(pending.len())
    }

    pub fn insert_node(&mut self, node: Arc<Node>) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(MosaicError::DuplicateNode(node.id));
        }
        self.index.insert(node.bbox, node.id);
        self.dirty.push(node.bbox);
        self.grow_for(node.bbox);
        self.nodes.insert(node.id, node);
        Ok(())
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.remove(&id).ok_or(MosaicError::UntrackedNode(id))?;
        self.index.remove(node.bbox, id);
        self.dirty.push(node.bbox);
        Ok(())
    }

    pub fn update_node(&mut self, id: NodeId, node: Arc<Node>) -> Result<()> {
        let Some(slot) = self.nodes.get_mut(&id) else {
            return Err(MosaicError::UntrackedNode(id));
        };
        let old = std::mem::replace(slot, Arc::clone(&node));

        self.index.remove(old.bbox, id);
        self.index.insert(node.bbox, id);
        self.dirty.push(old.bbox);
        self.dirty.push(node.bbox);
        self.grow_for(node.bbox);
        Ok(())
    }

    /// Shows or hides a node. Hidden nodes stay indexed but are skipped when
    /// compositing.
    pub fn set_node_visible(&mut self, id: NodeId, visible: bool) {
        let changed = if visible { self.hidden.remove(&id) } else { self.hidden.insert(id) };
        if !changed {
            return;
        }
        if let Some(node) = self.nodes.get(&id) {
            self.dirty.push(node.bbox);
        }
    }

    /// Recomputes the surface size from the current nodes on the next flush.
    pub fn request_resize(&mut self) {
        self.resize_pending = true;
    }

    fn grow_for(&mut self, bbox: PixelRect) {
        let (w, h) = self.raster.size();
        if self.config.sizing.is_auto() && (bbox.right() > w || bbox.bottom() > h) {
            self.resize_pending = true;
        }
    }

    // ── compositing ───────────────────────────────────────────────────────

    /// Recomposites `region` of the client buffer from the visible nodes.
    fn recompose(&mut self, region: PixelRect) {
        let mut candidates: Vec<(SceneOrder, &Arc<Node>)> = Vec::new();
        self.index.for_each_intersecting(region, |_, id| {
            if self.hidden.contains(id) {
                return;
            }
            if let Some(node) = self.nodes.get(id) {
                let layer = self.style.z_layer(&node.class_name);
                candidates.push((SceneOrder::new(layer, node.bbox.area(), node.id), node));
            }
        });
        candidates.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let layers: Vec<PaintLayer<'_>> = candidates
            .iter()
            .map(|(_, node)| PaintLayer {
                node: node.as_ref(),
                color: self.fill.color_for_hue(self.style.hue(&node.class_name)),
            })
            .collect();
        composite_region(&mut self.raster, region, &layers);
    }

    /// Returns whether the surface size actually changed.
    fn apply_resize(&mut self, gpu: &mut dyn GpuDriver) -> Result<bool> {
        self.resize_pending = false;
        let (width, height) = self.config.sizing.surface_size(self.nodes.values().map(|n| n.bbox));
        if !self.raster.resize(width, height) {
            return Ok(false);
        }
        if !self.tiles.is_empty() {
            self.tiles.regrid(gpu, width, height)?;
            self.sync_quads()?;
        }
        Ok(true)
    }

    /// Makes the tile quads match the grid, one slot per tile.
    fn sync_quads(&mut self) -> Result<()> {
        let rects: Vec<PixelRect> = self.tiles.tiles().iter().map(RangeTexture::rect).collect();
        for (i, rect) in rects.iter().enumerate() {
            match self.quads.source_mut(i) {
                Some(quad) => {
                    if quad.rect != *rect {
                        quad.rect = *rect;
                        self.quads.update_geometry(i)?;
                    }
                }
                None => {
                    self.quads.add_geometry(TileQuad { rect: *rect })?;
                }
            }
        }
        while self.quads.len() > rects.len() {
            self.quads.remove_geometry(self.quads.len() - 1)?;
        }
        Ok(())
    }

    /// Brings every tile up to date with the scene.
    pub fn flush(&mut self, gpu: &mut dyn GpuDriver) -> Result<FlushStats> {
        let mut stats = FlushStats::default();

        if self.resize_pending {
            stats.resized = self.apply_resize(gpu)?;
        }
        if self.tiles.is_empty() {
            let (width, height) = self.raster.size();
            self.tiles.regrid(gpu, width, height)?;
            self.sync_quads()?;
        }

        for region in self.dirty.take() {
            stats.regions += 1;
            let Some(region) = region.clamp_to(self.raster.width(), self.raster.height()) else {
                continue;
            };
            self.recompose(region);

            for tile in self.tiles.tiles() {
                if tile.needs_resize {
                    continue;
                }
                let Some(hit) = region.intersect(tile.rect()) else {
                    continue;
                };
                let (hit, bytes) = self.raster.copy_region(hit);
                let local = PixelRect::new(hit.x - tile.start_x, hit.y - tile.start_y, hit.width, hit.height);
                gpu.upload_texture(tile.texture, local, &bytes)?;
                stats.sub_uploads += 1;
            }
        }

        for tile in self.tiles.tiles_mut() {
            if !tile.needs_resize {
                continue;
            }
            let (_, bytes) = self.raster.copy_region(tile.rect());
            gpu.upload_texture(tile.texture, PixelRect::from_size(tile.width, tile.height), &bytes)?;
            tile.needs_resize = false;
            stats.full_uploads += 1;
        }

        if stats != FlushStats::default() {
            log::debug!(
                "atlas flush: {} regions, {} sub-uploads, {} full uploads{}",
                stats.regions,
                stats.sub_uploads,
                stats.full_uploads,
                if stats.resized { ", resized" } else { "" }
            );
        }
        Ok(stats)
    }

    fn ensure_program(&mut self, gpu: &mut dyn GpuDriver) -> Result<ProgramId> {
        if let Some(program) = self.program {
            return Ok(program);
        }
        let program = gpu.create_program(&ProgramDesc {
            label: "mosaic tile program",
            wgsl: include_str!("shaders/tile.wgsl"),
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            attributes: &[AttributeDecl {
                name: "vertex",
                location: 0,
                format: AttributeFormat::new(ScalarKind::Float, 4),
            }],
            uniforms: &[UniformDecl { name: "projection", kind: UniformKind::Mat4 }],
            texture_slots: 1,
        })?;
        self.program = Some(program);
        Ok(program)
    }
}

impl<S: ClassStyle> Drawable for MaskAtlasRenderer<S> {
    /// Creates the program and the tile grid. Every tile uploads in full on
    /// the next flush.
    fn attach(&mut self, gpu: &mut dyn GpuDriver) -> Result<()> {
        self.ensure_program(gpu)?;
        let (width, height) = self.raster.size();
        self.tiles.regrid(gpu, width, height)?;
        self.sync_quads()
    }

    fn release(&mut self, gpu: &mut dyn GpuDriver) {
        self.tiles.release(gpu);
        self.quads.release(gpu);
        if let Some(program) = self.program.take() {
            gpu.delete_program(program);
        }
    }

    fn draw(&mut self, gpu: &mut dyn GpuDriver, frame: &FrameContext) -> Result<()> {
        self.process_events()?;
        self.flush(gpu)?;
        let program = self.ensure_program(gpu)?;

        gpu.use_program(program)?;
        gpu.set_uniform("projection", UniformValue::Mat4(frame.projection.to_cols_array_2d()))?;
        gpu.set_blend_mode(BlendMode::Alpha);
        self.quads.bind(gpu, "vertex")?;

        for (i, tile) in self.tiles.tiles().iter().enumerate() {
            gpu.bind_texture(0, tile.texture)?;
            gpu.draw_arrays(Topology::Triangles, (i * QUAD_VERTICES) as u32, QUAD_VERTICES as u32)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::Sizing;
    use crate::coords::{ViewTransform, Viewport};
    use crate::device::{GpuCall, RecordingDriver};
    use crate::paint::{class_hue, Rgba8};
    use crate::scene::Mask;

    fn r(x: u32, y: u32, w: u32, h: u32) -> PixelRect { PixelRect::new(x, y, w, h) }

    fn node(id: u64, class: &str, bbox: PixelRect) -> Arc<Node> {
        Arc::new(Node::new(NodeId(id), class, bbox))
    }

    /// Opaque fill so expected colors are exact.
    fn fixed(width: u32, height: u32) -> AtlasConfig {
        AtlasConfig::default()
            .with_sizing(Sizing::Fixed { width, height })
            .with_fill_alpha(1.0)
    }

    fn color_of(config: &AtlasConfig, class: &str) -> Rgba8 {
        config.fill_style().color_for_hue(class_hue(class)).to_rgba8()
    }

    fn atlas(nodes: Vec<Arc<Node>>, config: AtlasConfig) -> MaskAtlasRenderer {
        MaskAtlasRenderer::new(nodes, LayerTable::default(), config).unwrap()
    }

    fn frame() -> FrameContext {
        let viewport = Viewport::new(64.0, 64.0);
        let transform = ViewTransform::default();
        FrameContext { projection: transform.projection(viewport), viewport, transform }
    }

    /// Asserts every tile texture mirrors the client buffer.
    fn assert_tiles_match(atlas: &MaskAtlasRenderer, gpu: &RecordingDriver) {
        for tile in atlas.tiles().tiles() {
            let (_, expected) = atlas.pixels().copy_region(tile.rect());
            assert_eq!(
                gpu.texture_pixels(tile.texture).unwrap(),
                expected.as_slice(),
                "tile at ({}, {})",
                tile.start_x,
                tile.start_y
            );
        }
    }

    fn ids(atlas: &MaskAtlasRenderer) -> Vec<NodeId> {
        let mut v: Vec<NodeId> = atlas.tracked_ranges().map(|(id, _)| id).collect();
        v.sort();
        v
    }

    // ── compositing ───────────────────────────────────────────────────────

    #[test]
    fn disjoint_nodes_keep_their_colors() {
        let config = fixed(20, 10);
        let a = atlas(
            vec![node(1, "TextRegion", r(0, 0, 5, 5)), node(2, "Word", r(10, 0, 5, 5))],
            config,
        );
        let px = a.pixels();
        assert_eq!(px.pixel(2, 2), Some(color_of(&config, "TextRegion")));
        assert_eq!(px.pixel(12, 2), Some(color_of(&config, "Word")));
        assert_eq!(px.pixel(7, 2), Some(Rgba8::TRANSPARENT));
    }

    #[test]
    fn higher_layer_wins_overlap_in_any_insert_order() {
        let config = fixed(20, 20);
        let a_color = color_of(&config, "TextRegion");
        let b_color = color_of(&config, "TextLine");

        for order in [[1u64, 2], [2, 1]] {
            let mut a = atlas(vec![], config);
            for id in order {
                let n = if id == 1 {
                    node(1, "TextRegion", r(0, 0, 10, 10))
                } else {
                    node(2, "TextLine", r(5, 5, 10, 10))
                };
                a.insert_node(n).unwrap();
            }
            a.flush(&mut RecordingDriver::default()).unwrap();

            let px = a.pixels();
            assert_eq!(px.pixel(2, 2), Some(a_color));
            assert_eq!(px.pixel(7, 2), Some(a_color));
            assert_eq!(px.pixel(2, 7), Some(a_color));
            assert_eq!(px.pixel(7, 7), Some(b_color), "overlap, order {order:?}");
            assert_eq!(px.pixel(12, 12), Some(b_color));
            assert_eq!(px.pixel(16, 16), Some(Rgba8::TRANSPARENT));
        }
    }

    #[test]
    fn smaller_node_draws_on_top_within_layer() {
        // TextRegion and ImageRegion share a layer; only area decides.
        let config = fixed(20, 20);
        let mut a = atlas(vec![node(1, "TextRegion", r(2, 2, 3, 3))], config);
        a.insert_node(node(2, "ImageRegion", r(0, 0, 20, 20))).unwrap();
        a.flush(&mut RecordingDriver::default()).unwrap();

        assert_eq!(a.pixels().pixel(3, 3), Some(color_of(&config, "TextRegion")));
        assert_eq!(a.pixels().pixel(10, 10), Some(color_of(&config, "ImageRegion")));
    }

    #[test]
    fn translucent_fill_blends_overlaps() {
        let config = AtlasConfig::default().with_sizing(Sizing::Fixed { width: 4, height: 4 });
        let a = atlas(
            vec![node(1, "TextRegion", r(0, 0, 2, 2)), node(2, "TextLine", r(0, 0, 2, 2))],
            config,
        );
        let single = color_of(&config, "TextRegion").a;
        let overlap = a.pixels().pixel(0, 0).unwrap().a;
        assert!(overlap > single);
    }

    // ── events ────────────────────────────────────────────────────────────

    #[test]
    fn remove_clears_hole() {
        let config = fixed(10, 10);
        let mut a = atlas(vec![node(1, "Word", r(2, 2, 3, 3))], config);
        a.remove_node(NodeId(1)).unwrap();
        a.flush(&mut RecordingDriver::default()).unwrap();
        assert!(a.pixels().pixels().iter().all(|p| *p == Rgba8::TRANSPARENT));
        assert!(ids(&a).is_empty());
    }

    #[test]
    fn update_moves_node() {
        let config = fixed(10, 10);
        let mut a = atlas(vec![node(1, "Word", r(0, 0, 2, 2))], config);
        a.update_node(NodeId(1), node(1, "Word", r(6, 6, 2, 2))).unwrap();
        assert_eq!(a.pending_regions(), &[r(0, 0, 2, 2), r(6, 6, 2, 2)]);

        a.flush(&mut RecordingDriver::default()).unwrap();
        assert_eq!(a.pixels().pixel(0, 0), Some(Rgba8::TRANSPARENT));
        assert_eq!(a.pixels().pixel(7, 7), Some(color_of(&config, "Word")));
    }

    #[test]
    fn untracked_update_and_remove_fail() {
        let mut a = atlas(vec![], fixed(4, 4));
        assert!(matches!(a.remove_node(NodeId(9)), Err(MosaicError::UntrackedNode(NodeId(9)))));
        assert!(matches!(
            a.update_node(NodeId(9), node(9, "Word", r(0, 0, 1, 1))),
            Err(MosaicError::UntrackedNode(NodeId(9)))
        ));
    }

    #[test]
    fn duplicate_insert_fails() {
        let mut a = atlas(vec![node(1, "Word", r(0, 0, 1, 1))], fixed(4, 4));
        assert!(matches!(
            a.insert_node(node(1, "Word", r(1, 1, 1, 1))),
            Err(MosaicError::DuplicateNode(NodeId(1)))
        ));
    }

    #[test]
    fn link_updates_are_ignored() {
        let mut graph = SceneGraph::from_nodes([
            Node::new(NodeId(1), "Word", r(0, 0, 2, 2)),
            Node::new(NodeId(2), "Word", r(4, 4, 2, 2)),
        ])
        .unwrap();
        let mut a = MaskAtlasRenderer::from_graph(&mut graph, LayerTable::default(), fixed(8, 8)).unwrap();

        graph.add_link(NodeId(1), NodeId(2), 0).unwrap();
        assert_eq!(a.process_events().unwrap(), 2);
        assert!(a.pending_regions().is_empty());
    }

    #[test]
    fn graph_events_drive_the_atlas() {
        let mut graph = SceneGraph::new();
        let config = fixed(10, 10);
        let mut a = MaskAtlasRenderer::from_graph(&mut graph, LayerTable::default(), config).unwrap();

        graph.insert(Node::new(NodeId(1), "Word", r(1, 1, 2, 2))).unwrap();
        graph.insert(Node::new(NodeId(2), "Word", r(5, 5, 2, 2))).unwrap();
        graph.update(Node::new(NodeId(2), "Word", r(6, 6, 2, 2))).unwrap();
        graph.remove(NodeId(1)).unwrap();

        let mut gpu = RecordingDriver::default();
        a.attach(&mut gpu).unwrap();
        a.draw(&mut gpu, &frame()).unwrap();

        assert_eq!(ids(&a), vec![NodeId(2)]);
        assert_eq!(a.pixels().pixel(1, 1), Some(Rgba8::TRANSPARENT));
        assert_eq!(a.pixels().pixel(5, 5), Some(Rgba8::TRANSPARENT));
        assert_eq!(a.pixels().pixel(7, 7), Some(color_of(&config, "Word")));
        assert_tiles_match(&a, &gpu);
    }

    #[test]
    fn tracked_ranges_follow_operation_sequence() {
        let mut a = atlas(vec![], fixed(64, 64));
        let mut expected: Vec<NodeId> = Vec::new();
        let mut seed = 0x2545_f491u32;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed
        };

        for step in 0..200u64 {
            let roll = next() % 3;
            let bbox = r(next() % 60, next() % 60, 1 + next() % 8, 1 + next() % 8);
            if roll == 0 || expected.is_empty() {
                let id = NodeId(step);
                a.insert_node(node(step, "Word", bbox)).unwrap();
                expected.push(id);
            } else {
                let pick = expected[(next() as usize) % expected.len()];
                if roll == 1 {
                    a.update_node(pick, node(pick.0, "Word", bbox)).unwrap();
                } else {
                    a.remove_node(pick).unwrap();
                    expected.retain(|id| *id != pick);
                }
            }
            if step % 17 == 0 {
                a.set_node_visible(NodeId(step / 2), step % 2 == 0);
            }
        }
        expected.sort();
        assert_eq!(ids(&a), expected);
    }

    /// Random edits with interleaved flushes must leave the surface and every
    /// tile exactly as a from-scratch composite of the visible nodes.
    fn check_incremental_matches_rebuild(sizing: Sizing, seed: u32) {
        const CLASSES: [&str; 4] = ["TextRegion", "ImageRegion", "TextLine", "Word"];
        let config = AtlasConfig::default().with_sizing(sizing);
        let mut gpu = RecordingDriver::new(8);
        let mut a = atlas(vec![], config);
        a.attach(&mut gpu).unwrap();

        let mut live: HashMap<u64, Arc<Node>> = HashMap::new();
        let mut hidden: HashSet<u64> = HashSet::new();
        let mut state = seed;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };

        for step in 0..600u64 {
            let bbox = r(next() % 40, next() % 30, 1 + next() % 12, 1 + next() % 12);
            let class = CLASSES[next() as usize % CLASSES.len()];
            let masked = next() % 4 == 0;
            let make = |id: u64| {
                let n = Node::new(NodeId(id), class, bbox);
                if masked {
                    Arc::new(n.with_mask(Mask::from_fn(bbox.width, bbox.height, |x, y| (x + y) % 2 == 0)))
                } else {
                    Arc::new(n)
                }
            };
            let pick = if live.is_empty() {
                None
            } else {
                let mut keys: Vec<u64> = live.keys().copied().collect();
                keys.sort_unstable();
                Some(keys[next() as usize % keys.len()])
            };

            match (next() % 8, pick) {
                (0..=2, _) | (_, None) => {
                    a.insert_node(make(step)).unwrap();
                    live.insert(step, make(step));
                }
                (3, Some(id)) => {
                    a.update_node(NodeId(id), make(id)).unwrap();
                    live.insert(id, make(id));
                }
                (4, Some(id)) => {
                    a.remove_node(NodeId(id)).unwrap();
                    live.remove(&id);
                }
                (5, Some(id)) => {
                    let visible = next() % 2 == 0;
                    a.set_node_visible(NodeId(id), visible);
                    if visible { hidden.remove(&id); } else { hidden.insert(id); }
                }
                (6, _) => a.request_resize(),
                _ => {
                    a.flush(&mut gpu).unwrap();
                }
            }
        }
        a.flush(&mut gpu).unwrap();

        let (width, height) = a.size();
        let visible: Vec<Arc<Node>> = live
            .iter()
            .filter(|(id, _)| !hidden.contains(*id))
            .map(|(_, n)| Arc::clone(n))
            .collect();
        let rebuilt = atlas(visible, config.with_sizing(Sizing::Fixed { width, height }));

        assert_eq!(a.pixels(), rebuilt.pixels(), "{sizing:?}");
        assert_eq!(ids(&a).len(), live.len());
        assert_tiles_match(&a, &gpu);
    }

    #[test]
    fn incremental_edits_match_rebuild_at_fixed_size() {
        check_incremental_matches_rebuild(Sizing::Fixed { width: 48, height: 48 }, 0x1234_5678);
    }

    #[test]
    fn incremental_edits_match_rebuild_with_auto_size() {
        check_incremental_matches_rebuild(
            Sizing::Auto { padding_multiplier: 0.3, padding_extra_pixels: 3 },
            0x0bad_cafe,
        );
    }

    // ── visibility ────────────────────────────────────────────────────────

    #[test]
    fn toggling_visibility_round_trips_pixels() {
        let config = AtlasConfig::default().with_sizing(Sizing::Fixed { width: 20, height: 20 });
        let mut a = atlas(
            vec![node(1, "TextRegion", r(0, 0, 10, 10)), node(2, "TextLine", r(5, 5, 10, 10))],
            config,
        );
        let before = a.pixels().clone();
        let mut gpu = RecordingDriver::default();

        a.set_node_visible(NodeId(2), false);
        a.flush(&mut gpu).unwrap();
        assert_ne!(a.pixels(), &before);
        assert_eq!(a.pixels().pixel(12, 12), Some(Rgba8::TRANSPARENT));

        a.set_node_visible(NodeId(2), true);
        a.flush(&mut gpu).unwrap();
        assert_eq!(a.pixels(), &before);
        assert!(a.is_tracked(NodeId(2)));
    }

    #[test]
    fn redundant_visibility_change_queues_nothing() {
        let mut a = atlas(vec![node(1, "Word", r(0, 0, 2, 2))], fixed(4, 4));
        a.set_node_visible(NodeId(1), true);
        assert!(a.pending_regions().is_empty());
        a.set_node_visible(NodeId(1), false);
        a.set_node_visible(NodeId(1), false);
        assert_eq!(a.pending_regions().len(), 1);
    }

    // ── tiling / uploads ──────────────────────────────────────────────────

    #[test]
    fn surface_larger_than_texture_limit_is_tiled() {
        let mut gpu = RecordingDriver::new(8);
        let mut a = atlas(vec![node(1, "Word", r(3, 3, 12, 12))], fixed(20, 20));
        a.attach(&mut gpu).unwrap();
        let stats = a.flush(&mut gpu).unwrap();

        assert_eq!(a.tiles().dimensions(), (3, 3));
        assert_eq!(stats.full_uploads, 9);
        assert_eq!(stats.sub_uploads, 0);
        assert_tiles_match(&a, &gpu);
    }

    #[test]
    fn dirty_region_uploads_only_touched_tiles() {
        let mut gpu = RecordingDriver::new(8);
        let mut a = atlas(vec![], fixed(20, 20));
        a.attach(&mut gpu).unwrap();
        a.flush(&mut gpu).unwrap();
        gpu.take_calls();

        // Straddles tiles (0,0), (0,1), (1,0), (1,1).
        a.insert_node(node(1, "Word", r(6, 6, 4, 4))).unwrap();
        let stats = a.flush(&mut gpu).unwrap();

        let uploads = RecordingDriver::texture_uploads(gpu.calls());
        assert_eq!(stats.sub_uploads, 4);
        assert_eq!(stats.full_uploads, 0);
        let t00 = a.tiles().get(0, 0).unwrap().texture;
        let t11 = a.tiles().get(1, 1).unwrap().texture;
        assert!(uploads.contains(&(t00, r(6, 6, 2, 2))));
        assert!(uploads.contains(&(t11, r(0, 0, 2, 2))));
        assert_tiles_match(&a, &gpu);
    }

    #[test]
    fn overlapping_regions_are_uploaded_separately() {
        let mut gpu = RecordingDriver::default();
        let mut a = atlas(vec![node(1, "Word", r(0, 0, 4, 4))], fixed(10, 10));
        a.attach(&mut gpu).unwrap();
        a.flush(&mut gpu).unwrap();

        a.update_node(NodeId(1), node(1, "Word", r(1, 1, 4, 4))).unwrap();
        let stats = a.flush(&mut gpu).unwrap();
        assert_eq!(stats.regions, 2);
        assert_eq!(stats.sub_uploads, 2);
    }

    #[test]
    fn nothing_dirty_uploads_nothing() {
        let mut gpu = RecordingDriver::default();
        let mut a = atlas(vec![node(1, "Word", r(0, 0, 4, 4))], fixed(10, 10));
        a.attach(&mut gpu).unwrap();
        a.flush(&mut gpu).unwrap();
        gpu.take_calls();

        assert_eq!(a.flush(&mut gpu).unwrap(), FlushStats::default());
        assert!(gpu.calls().is_empty());
    }

    #[test]
    fn first_flush_without_attach_builds_tiles() {
        let mut gpu = RecordingDriver::new(16);
        let mut a = atlas(vec![node(1, "Word", r(0, 0, 4, 4))], fixed(20, 10));
        let stats = a.flush(&mut gpu).unwrap();
        assert_eq!(a.tiles().dimensions(), (2, 1));
        assert_eq!(stats.full_uploads, 2);
        assert_tiles_match(&a, &gpu);
    }

    // ── sizing / resize ───────────────────────────────────────────────────

    #[test]
    fn zero_nodes_get_padding_only_canvas() {
        let config = AtlasConfig::default()
            .with_sizing(Sizing::Auto { padding_multiplier: 0.1, padding_extra_pixels: 32 });
        let a = atlas(vec![], config);
        assert_eq!(a.size(), (32, 32));
    }

    #[test]
    fn auto_size_covers_nodes_plus_padding() {
        let config = AtlasConfig::default()
            .with_sizing(Sizing::Auto { padding_multiplier: 0.5, padding_extra_pixels: 2 });
        let a = atlas(vec![node(1, "Word", r(4, 6, 10, 10))], config);
        // padding = 0.5 * 4 + 2
        assert_eq!(a.size(), (18, 20));
    }

    #[test]
    fn growing_past_surface_resizes_and_preserves_pixels() {
        let config = AtlasConfig::default()
            .with_sizing(Sizing::Auto { padding_multiplier: 0.0, padding_extra_pixels: 0 })
            .with_fill_alpha(1.0);
        let mut gpu = RecordingDriver::new(8);
        let mut a = atlas(vec![node(1, "Word", r(0, 0, 10, 10))], config);
        a.attach(&mut gpu).unwrap();
        a.flush(&mut gpu).unwrap();
        let old = a.pixels().clone();
        let t00 = a.tiles().get(0, 0).unwrap().texture;

        a.insert_node(node(2, "TextLine", r(12, 12, 6, 6))).unwrap();
        let stats = a.flush(&mut gpu).unwrap();

        assert!(stats.resized);
        assert_eq!(a.size(), (18, 18));
        for y in 0..10 {
            for x in 0..10 {
                assert_eq!(a.pixels().pixel(x, y), old.pixel(x, y));
            }
        }
        assert_eq!(a.pixels().pixel(11, 11), Some(Rgba8::TRANSPARENT));
        assert_eq!(a.pixels().pixel(15, 15), Some(color_of(&config, "TextLine")));

        // (0,0) keeps its handle; the grid grew from 2x2 to 3x3.
        assert_eq!(a.tiles().get(0, 0).unwrap().texture, t00);
        assert_eq!(a.tiles().dimensions(), (3, 3));
        assert_eq!(stats.full_uploads, 9);
        assert_eq!(stats.sub_uploads, 0);
        assert_eq!(gpu.live_textures(), 9);
        assert_tiles_match(&a, &gpu);
    }

    #[test]
    fn requested_resize_shrinks_to_current_nodes() {
        let config = AtlasConfig::default()
            .with_sizing(Sizing::Auto { padding_multiplier: 0.0, padding_extra_pixels: 0 });
        let mut gpu = RecordingDriver::new(8);
        let mut a = atlas(
            vec![node(1, "Word", r(0, 0, 4, 4)), node(2, "Word", r(16, 16, 4, 4))],
            config,
        );
        a.attach(&mut gpu).unwrap();
        a.flush(&mut gpu).unwrap();
        assert_eq!(gpu.live_textures(), 9);

        a.remove_node(NodeId(2)).unwrap();
        a.request_resize();
        a.flush(&mut gpu).unwrap();
        assert_eq!(a.size(), (4, 4));
        assert_eq!(a.tiles().dimensions(), (1, 1));
        assert_eq!(gpu.live_textures(), 1);
        assert_tiles_match(&a, &gpu);
    }

    #[test]
    fn resize_request_without_size_change_is_not_reported() {
        let config = AtlasConfig::default()
            .with_sizing(Sizing::Auto { padding_multiplier: 0.0, padding_extra_pixels: 0 });
        let mut gpu = RecordingDriver::new(8);
        let mut a = atlas(vec![node(1, "Word", r(0, 0, 12, 12))], config);
        a.attach(&mut gpu).unwrap();
        a.flush(&mut gpu).unwrap();
        let created = gpu.live_textures();

        a.request_resize();
        let stats = a.flush(&mut gpu).unwrap();
        assert!(!stats.resized);
        assert_eq!(stats.full_uploads, 0);
        assert_eq!(gpu.live_textures(), created);
    }

    #[test]
    fn fixed_size_clips_instead_of_growing() {
        let mut a = atlas(vec![], fixed(8, 8));
        a.insert_node(node(1, "Word", r(6, 6, 10, 10))).unwrap();
        a.flush(&mut RecordingDriver::default()).unwrap();
        assert_eq!(a.size(), (8, 8));
        assert!(a.pixels().pixel(7, 7).unwrap().a > 0);
    }

    // ── drawing ───────────────────────────────────────────────────────────

    #[test]
    fn draw_issues_one_quad_per_tile() {
        let mut gpu = RecordingDriver::new(8);
        let mut a = atlas(vec![node(1, "Word", r(0, 0, 4, 4))], fixed(16, 8));
        a.attach(&mut gpu).unwrap();
        a.draw(&mut gpu, &frame()).unwrap();

        let draws: Vec<&GpuCall> = gpu
            .calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::DrawArrays { .. }))
            .collect();
        assert_eq!(
            draws,
            vec![
                &GpuCall::DrawArrays { topology: Topology::Triangles, first: 0, count: 6 },
                &GpuCall::DrawArrays { topology: Topology::Triangles, first: 6, count: 6 },
            ]
        );
    }

    #[test]
    fn release_then_draw_reallocates() {
        let mut gpu = RecordingDriver::new(8);
        let mut a = atlas(vec![node(1, "Word", r(0, 0, 4, 4))], fixed(16, 16));
        a.attach(&mut gpu).unwrap();
        a.draw(&mut gpu, &frame()).unwrap();
        a.release(&mut gpu);
        assert_eq!(gpu.live_textures(), 0);
        assert_eq!(gpu.live_buffers(), 0);

        a.draw(&mut gpu, &frame()).unwrap();
        assert_eq!(gpu.live_textures(), 4);
        assert_tiles_match(&a, &gpu);
    }
}
