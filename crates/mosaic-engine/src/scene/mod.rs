//! Scene collaborator types.
//!
//! Responsibilities:
//! - node values (id, class, bounding box, optional mask)
//! - class metadata (draw layer, hue) and the derived back-to-front order
//! - change notification through a typed publish/subscribe bus

mod bus;
mod class;
mod graph;
mod node;
mod order;

pub use bus::{EventBus, Subscription};
pub use class::{ClassStyle, LayerTable, UNKNOWN_LAYER};
pub use graph::{Link, LinkId, SceneEvent, SceneGraph};
pub use node::{Mask, Node, NodeId};
pub use order::SceneOrder;
