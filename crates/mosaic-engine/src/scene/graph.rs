use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MosaicError, Result};

use super::{EventBus, Node, NodeId, Subscription};

/// Change notification published by [`SceneGraph`].
#[derive(Debug, Clone)]
pub enum SceneEvent {
    Inserted(Arc<Node>),
    Removed(Arc<Node>),
    /// A node was replaced, or one of its links changed.
    ///
    /// For link updates `old` and `new` are the same value and
    /// `is_link_update` is set.
    Updated {
        node_id: NodeId,
        old: Arc<Node>,
        new: Arc<Node>,
        is_link_update: bool,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

/// Directed relation between two nodes (reading order, grouping, ...).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: u32,
}

/// In-memory node and link store.
///
/// This is the collaborator the compositor observes: it owns node values and
/// publishes a [`SceneEvent`] for every mutation.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: HashMap<NodeId, Arc<Node>>,
    links: HashMap<LinkId, Link>,
    next_link: u64,
    events: EventBus<SceneEvent>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from an initial node set without publishing events.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self> {
        let mut graph = Self::new();
        for node in nodes {
            let id = node.id;
            if graph.nodes.insert(id, Arc::new(node)).is_some() {
                return Err(MosaicError::DuplicateNode(id));
            }
        }
        Ok(graph)
    }

    pub fn subscribe(&mut self) -> Subscription<SceneEvent> {
        self.events.subscribe()
    }

    /// Snapshot of current nodes, in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<Node>> + '_ {
        self.nodes.values()
    }

    pub fn get(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insert(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(MosaicError::DuplicateNode(node.id));
        }
        let node = Arc::new(node);
        self.nodes.insert(node.id, Arc::clone(&node));
        self.events.publish(SceneEvent::Inserted(node));
        Ok(())
    }

    /// Replaces the stored value for `node.id`.
    pub fn update(&mut self, node: Node) -> Result<()> {
        let Some(slot) = self.nodes.get_mut(&node.id) else {
            return Err(MosaicError::UntrackedNode(node.id));
        };
        let new = Arc::new(node);
        let old = std::mem::replace(slot, Arc::clone(&new));
        self.events.publish(SceneEvent::Updated {
            node_id: new.id,
            old,
            new,
            is_link_update: false,
        });
        Ok(())
    }

    /// Removes a node together with every link touching it.
    pub fn remove(&mut self, id: NodeId) -> Result<Arc<Node>> {
        let node = self.nodes.remove(&id).ok_or(MosaicError::UntrackedNode(id))?;
        let dangling: Vec<LinkId> = self
            .links
            .iter()
            .filter(|(_, l)| l.from == id || l.to == id)
            .map(|(k, _)| *k)
            .collect();
        for link in dangling {
            self.remove_link(link);
        }
        self.events.publish(SceneEvent::Removed(Arc::clone(&node)));
        Ok(node)
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> + '_ {
        self.links.iter().map(|(k, v)| (*k, v))
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn add_link(&mut self, from: NodeId, to: NodeId, kind: u32) -> Result<LinkId> {
        for end in [from, to] {
            if !self.nodes.contains_key(&end) {
                return Err(MosaicError::UntrackedNode(end));
            }
        }
        let id = LinkId(self.next_link);
        self.next_link += 1;
        self.links.insert(id, Link { from, to, kind });
        self.publish_link_update(from);
        self.publish_link_update(to);
        Ok(id)
    }

    pub fn remove_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.links.remove(&id)?;
        self.publish_link_update(link.from);
        self.publish_link_update(link.to);
        Some(link)
    }

    fn publish_link_update(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get(&id) {
            self.events.publish(SceneEvent::Updated {
                node_id: id,
                old: Arc::clone(node),
                new: Arc::clone(node),
                is_link_update: true,
            });
        }
    }
}
