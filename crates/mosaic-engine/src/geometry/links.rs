use std::collections::HashMap;

use crate::device::{
    AttributeDecl, AttributeFormat, BlendMode, GpuDriver, ProgramDesc, ProgramId, ScalarKind,
    Topology, UniformDecl, UniformKind, UniformValue,
};
use crate::error::Result;
use crate::render::{Drawable, FrameContext};
use crate::scene::{Link, LinkId, SceneEvent, SceneGraph};

use super::{GeometryBuffer, GeometrySource};

/// One line segment between two node centers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LinkSegment {
    pub from: [f32; 2],
    pub to: [f32; 2],
    pub kind: u32,
}

impl LinkSegment {
    /// Segment joining the box centers of the link's endpoints, if both exist.
    pub fn for_link(graph: &SceneGraph, link: &Link) -> Option<Self> {
        let center = |id| {
            graph.get(id).map(|n| {
                let b = n.bbox;
                [b.x as f32 + b.width as f32 * 0.5, b.y as f32 + b.height as f32 * 0.5]
            })
        };
        Some(Self { from: center(link.from)?, to: center(link.to)?, kind: link.kind })
    }
}

impl GeometrySource<[f32; 2]> for LinkSegment {
    fn vertex_count(&self) -> usize {
        2
    }

    fn write_vertices(&self, out: &mut Vec<[f32; 2]>) {
        out.push(self.from);
        out.push(self.to);
    }
}

impl GeometrySource<u32> for LinkSegment {
    fn vertex_count(&self) -> usize {
        2
    }

    fn write_vertices(&self, out: &mut Vec<u32>) {
        out.push(self.kind);
        out.push(self.kind);
    }
}

/// Draws scene links as colored lines.
///
/// Positions and kinds live in two parallel geometry buffers, one slot per
/// link. The kind attribute goes through the integer binding path so the
/// shader can index its palette with it.
pub struct LinkLayer {
    /// Link id of each slot, in slot order.
    slots: Vec<LinkId>,
    positions: GeometryBuffer<[f32; 2], LinkSegment>,
    kinds: GeometryBuffer<u32, LinkSegment>,
    program: Option<ProgramId>,
    alpha: f32,
}

impl Default for LinkLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkLayer {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            positions: GeometryBuffer::new(),
            kinds: GeometryBuffer::new(),
            program: None,
            alpha: 0.9,
        }
    }

    /// Builds a layer holding every link of `graph`.
    pub fn from_graph(graph: &SceneGraph) -> Result<Self> {
        let mut layer = Self::new();
        layer.sync(graph)?;
        Ok(layer)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: LinkId) -> bool {
        self.slots.contains(&id)
    }

    fn slot_of(&self, id: LinkId) -> Option<usize> {
        self.slots.iter().position(|s| *s == id)
    }

    pub fn segment(&self, id: LinkId) -> Option<LinkSegment> {
        let slot = self.slot_of(id)?;
        self.positions.record(slot).map(|r| r.source)
    }

    /// Inserts a link, or moves it in place when already present.
    pub fn set_link(&mut self, id: LinkId, segment: LinkSegment) -> Result<()> {
        match self.slot_of(id) {
            Some(slot) => {
                if self.segment(id) == Some(segment) {
                    return Ok(());
                }
                if let Some(source) = self.positions.source_mut(slot) {
                    *source = segment;
                }
                if let Some(source) = self.kinds.source_mut(slot) {
                    *source = segment;
                }
                self.positions.update_geometry(slot)?;
                self.kinds.update_geometry(slot)?;
            }
            None => {
                self.positions.add_geometry(segment)?;
                self.kinds.add_geometry(segment)?;
                self.slots.push(id);
            }
        }
        Ok(())
    }

    /// Drops a link. Returns `false` when it was not present.
    pub fn remove_link(&mut self, id: LinkId) -> Result<bool> {
        let Some(slot) = self.slot_of(id) else {
            return Ok(false);
        };
        self.positions.remove_geometry(slot)?;
        self.kinds.remove_geometry(slot)?;
        self.slots.remove(slot);
        Ok(true)
    }

    /// Reconciles the layer with the links currently in `graph`.
    pub fn sync(&mut self, graph: &SceneGraph) -> Result<()> {
        let mut wanted: HashMap<LinkId, LinkSegment> = graph
            .links()
            .filter_map(|(id, link)| LinkSegment::for_link(graph, link).map(|s| (id, s)))
            .collect();

        // Back to front keeps the shifted tail short.
        for slot in (0..self.slots.len()).rev() {
            if !wanted.contains_key(&self.slots[slot]) {
                self.remove_link(self.slots[slot])?;
            }
        }

        let mut ordered: Vec<(LinkId, LinkSegment)> = wanted.drain().collect();
        ordered.sort_by_key(|(id, _)| *id);
        for (id, segment) in ordered {
            self.set_link(id, segment)?;
        }
        Ok(())
    }

    /// Applies a scene change. Node moves drag their links along.
    pub fn handle_event(&mut self, event: &SceneEvent, graph: &SceneGraph) -> Result<()> {
        match event {
            SceneEvent::Inserted(_) => Ok(()),
            SceneEvent::Removed(_) | SceneEvent::Updated { .. } => self.sync(graph),
        }
    }

    fn ensure_program(&mut self, gpu: &mut dyn GpuDriver) -> Result<ProgramId> {
        if let Some(program) = self.program {
            return Ok(program);
        }
        let program = gpu.create_program(&ProgramDesc {
            label: "mosaic link program",
            wgsl: include_str!("shaders/link.wgsl"),
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            attributes: &[
                AttributeDecl {
                    name: "position",
                    location: 0,
                    format: AttributeFormat::new(ScalarKind::Float, 2),
                },
                AttributeDecl {
                    name: "kind",
                    location: 1,
                    format: AttributeFormat::new(ScalarKind::Uint, 1),
                },
            ],
            uniforms: &[
                UniformDecl { name: "projection", kind: UniformKind::Mat4 },
                UniformDecl { name: "alpha", kind: UniformKind::Float },
            ],
            texture_slots: 0,
        })?;
        self.program = Some(program);
        Ok(program)
    }
}

impl Drawable for LinkLayer {
    fn attach(&mut self, gpu: &mut dyn GpuDriver) -> Result<()> {
        self.ensure_program(gpu)?;
        self.positions.flush(gpu)?;
        self.kinds.flush(gpu)?;
        Ok(())
    }

    fn release(&mut self, gpu: &mut dyn GpuDriver) {
        if let Some(program) = self.program.take() {
            gpu.delete_program(program);
        }
        self.positions.release(gpu);
        self.kinds.release(gpu);
    }

    fn draw(&mut self, gpu: &mut dyn GpuDriver, frame: &FrameContext) -> Result<()> {
        let program = self.ensure_program(gpu)?;
        if self.is_empty() {
            return Ok(());
        }

        gpu.use_program(program)?;
        gpu.set_uniform("projection", UniformValue::Mat4(frame.projection.to_cols_array_2d()))?;
        gpu.set_uniform("alpha", UniformValue::Float(self.alpha))?;
        gpu.set_blend_mode(BlendMode::Alpha);
        self.positions.bind(gpu, "position")?;
        self.kinds.bind(gpu, "kind")?;
        gpu.draw_arrays(Topology::Lines, 0, self.positions.num_vertices() as u32)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{PixelRect, ViewTransform, Viewport};
    use crate::device::{GpuCall, RecordingDriver};
    use crate::scene::{Node, NodeId};

    fn graph() -> SceneGraph {
        SceneGraph::from_nodes([
            Node::new(NodeId(1), "TextLine", PixelRect::new(0, 0, 10, 10)),
            Node::new(NodeId(2), "TextLine", PixelRect::new(20, 0, 10, 10)),
            Node::new(NodeId(3), "TextLine", PixelRect::new(40, 0, 10, 10)),
        ])
        .unwrap()
    }

    fn frame() -> FrameContext {
        let viewport = Viewport::new(64.0, 64.0);
        let transform = ViewTransform::default();
        FrameContext { projection: transform.projection(viewport), viewport, transform }
    }

    #[test]
    fn segments_join_box_centers() {
        let mut g = graph();
        let id = g.add_link(NodeId(1), NodeId(2), 3).unwrap();
        let layer = LinkLayer::from_graph(&g).unwrap();

        assert_eq!(
            layer.segment(id),
            Some(LinkSegment { from: [5.0, 5.0], to: [25.0, 5.0], kind: 3 })
        );
    }

    #[test]
    fn node_move_updates_only_touching_links() {
        let mut g = graph();
        let sub = g.subscribe();
        let a = g.add_link(NodeId(1), NodeId(2), 0).unwrap();
        let b = g.add_link(NodeId(2), NodeId(3), 0).unwrap();
        let mut layer = LinkLayer::from_graph(&g).unwrap();
        let mut gpu = RecordingDriver::default();
        layer.attach(&mut gpu).unwrap();
        sub.drain();

        g.update(Node::new(NodeId(3), "TextLine", PixelRect::new(40, 40, 10, 10))).unwrap();
        for event in sub.drain() {
            layer.handle_event(&event, &g).unwrap();
        }

        assert_eq!(layer.segment(a).unwrap().to, [25.0, 5.0]);
        assert_eq!(layer.segment(b).unwrap().to, [45.0, 45.0]);
        assert_eq!(layer.positions.dirty_range(), Some((1, 1)));
    }

    #[test]
    fn removing_node_drops_its_links() {
        let mut g = graph();
        let sub = g.subscribe();
        let a = g.add_link(NodeId(1), NodeId(2), 0).unwrap();
        let b = g.add_link(NodeId(2), NodeId(3), 0).unwrap();
        let mut layer = LinkLayer::from_graph(&g).unwrap();
        sub.drain();

        g.remove(NodeId(1)).unwrap();
        for event in sub.drain() {
            layer.handle_event(&event, &g).unwrap();
        }

        assert!(!layer.contains(a));
        assert!(layer.contains(b));
        assert_eq!(layer.positions.num_vertices(), 2);
        assert_eq!(layer.kinds.num_vertices(), 2);
    }

    #[test]
    fn draw_binds_kind_as_integer_and_draws_lines() {
        let mut g = graph();
        g.add_link(NodeId(1), NodeId(2), 1).unwrap();
        g.add_link(NodeId(1), NodeId(3), 2).unwrap();
        let mut layer = LinkLayer::from_graph(&g).unwrap();

        let mut gpu = RecordingDriver::default();
        layer.attach(&mut gpu).unwrap();
        layer.draw(&mut gpu, &frame()).unwrap();

        let calls = gpu.calls();
        assert!(calls.iter().any(|c| matches!(
            c,
            GpuCall::BindAttribute { name, integer: true, .. } if name == "kind"
        )));
        assert!(calls.iter().any(|c| matches!(
            c,
            GpuCall::BindAttribute { name, integer: false, .. } if name == "position"
        )));
        assert_eq!(
            calls.last(),
            Some(&GpuCall::DrawArrays { topology: Topology::Lines, first: 0, count: 4 })
        );
    }

    #[test]
    fn release_frees_gpu_resources() {
        let mut g = graph();
        g.add_link(NodeId(1), NodeId(2), 0).unwrap();
        let mut layer = LinkLayer::from_graph(&g).unwrap();

        let mut gpu = RecordingDriver::default();
        layer.attach(&mut gpu).unwrap();
        assert_eq!(gpu.live_buffers(), 2);
        layer.release(&mut gpu);
        assert_eq!(gpu.live_buffers(), 0);
    }
}
