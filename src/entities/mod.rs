//! Entities module - graph data model.
//!
//! - `NodeGraph`: nodes + attributes + connections, JSON IO
//! - `Node` / `NodeState`: structure vs. thread-shared runtime state
//! - `Attribute` / `AttrValue`: endpoints and their values
//! - `ProgressState`: lifecycle label of executable nodes

pub mod attribute;
pub mod attrs;
pub mod graph;
pub mod keys;
pub mod node;
pub mod progress;
pub mod traits;

pub use attribute::{AttrId, Attribute, AttributeType, Direction};
pub use attrs::AttrValue;
pub use graph::NodeGraph;
pub use node::{Node, NodeId, NodeRef, NodeState};
pub use progress::ProgressState;
pub use traits::{ExecContext, Execute};
