//! Dependency collector: which executable nodes a run touches.
//!
//! Depth-first, pre-order walk over (inputs ∪ children) starting at the
//! target. Two guards:
//! - `visited` (node identity): bounds the walk to |nodes| on cycles and
//!   diamonds, independent of the result
//! - the result set itself: only nodes tagged executable, each once
//!
//! The order is plain pre-order, not a topological sort: a node is appended
//! before the upstream nodes it reaches through its own inputs.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::trace;

use crate::core::error::GraphError;
use crate::entities::{Node, NodeGraph, NodeId, NodeRef};

/// Insertion-ordered, de-duplicated weak node handles.
///
/// Owned by exactly one run and dropped after it; never keeps a node alive.
#[derive(Debug, Clone, Default)]
pub struct WalkSet {
    nodes: IndexMap<NodeId, NodeRef>,
}

impl WalkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless the same node is already present.
    /// Returns true if inserted.
    pub fn push(&mut self, node: NodeRef) -> bool {
        if self.nodes.contains_key(&node.id()) {
            return false;
        }
        self.nodes.insert(node.id(), node);
        true
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRef> {
        self.nodes.values()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }
}

/// Collect the executable nodes reachable from `target` through input
/// connections and child nodes, target included when executable.
///
/// Iterative: successors are pushed in reverse so they pop in input, then
/// child order, which reproduces the recursive pre-order on any depth.
pub fn collect(graph: &NodeGraph, target: NodeId) -> Result<WalkSet, GraphError> {
    if graph.node(target).is_none() {
        return Err(GraphError::NodeNotFound(target));
    }
    let mut visited = HashSet::new();
    let mut result = WalkSet::new();
    let mut stack = vec![target];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let node = graph
            .node(id)
            .ok_or_else(|| GraphError::Integrity(format!("walk reached missing node {}", id)))?;

        if node.is_executable() {
            result.push(node.node_ref());
        }

        let upstream = upstream_nodes(graph, node)?;
        let next = upstream.into_iter().chain(node.children().iter().copied());
        let start = stack.len();
        stack.extend(next);
        stack[start..].reverse();
    }

    trace!("collect {}: {} executable node(s)", target, result.len());
    Ok(result)
}

/// Owners of the attributes feeding `node`'s inputs, in input order.
fn upstream_nodes(graph: &NodeGraph, node: &Node) -> Result<Vec<NodeId>, GraphError> {
    let mut owners = Vec::new();
    for attr_id in node.inputs() {
        let attr = graph.attribute(*attr_id).ok_or_else(|| {
            GraphError::Integrity(format!("node '{}' lists missing attribute {}", node.name(), attr_id))
        })?;
        let Some(upstream) = attr.input() else {
            continue;
        };
        let source = graph.attribute(upstream).ok_or_else(|| {
            GraphError::Integrity(format!(
                "'{}.{}' connected to missing attribute {}",
                node.name(),
                attr.name(),
                upstream
            ))
        })?;
        owners.push(source.parent());
    }
    Ok(owners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::keys::{T_EXECUTABLE, T_NODE};
    use crate::entities::{AttrId, AttrValue, AttributeType};

    fn add(g: &mut NodeGraph, name: &str, executable: bool) -> (NodeId, AttrId, AttrId) {
        let tags: &[&str] = if executable { &[T_NODE, T_EXECUTABLE] } else { &[T_NODE] };
        let n = g.add_node(name, "Test", tags);
        let i = g
            .add_input_attribute(n, "in", AttributeType::Numeric, AttrValue::Empty)
            .unwrap();
        let o = g
            .add_output_attribute(n, "out", AttributeType::Numeric, AttrValue::Empty)
            .unwrap();
        (n, i, o)
    }

    #[test]
    fn test_chain_is_preorder() {
        // A -> B -> C, run from C
        let mut g = NodeGraph::new();
        let (a, _, a_out) = add(&mut g, "A", true);
        let (b, b_in, b_out) = add(&mut g, "B", true);
        let (c, c_in, _) = add(&mut g, "C", false);
        g.connect(a_out, b_in).unwrap();
        g.connect(b_out, c_in).unwrap();

        let walk = collect(&g, c).unwrap();
        assert_eq!(walk.ids(), vec![b, a]);
    }

    #[test]
    fn test_target_first_when_executable() {
        let mut g = NodeGraph::new();
        let (a, _, a_out) = add(&mut g, "A", true);
        let (b, b_in, _) = add(&mut g, "B", true);
        g.connect(a_out, b_in).unwrap();

        assert_eq!(collect(&g, b).unwrap().ids(), vec![b, a]);
    }

    #[test]
    fn test_diamond_visits_shared_ancestor_once() {
        //   A
        //  / \
        // B   C
        //  \ /
        //   D (two inputs)
        let mut g = NodeGraph::new();
        let (a, _, a_out) = add(&mut g, "A", true);
        let (b, b_in, b_out) = add(&mut g, "B", true);
        let (c, c_in, c_out) = add(&mut g, "C", true);
        let (d, d_in, _) = add(&mut g, "D", true);
        let d_in2 = g
            .add_input_attribute(d, "in2", AttributeType::Numeric, AttrValue::Empty)
            .unwrap();
        g.connect(a_out, b_in).unwrap();
        g.connect(a_out, c_in).unwrap();
        g.connect(b_out, d_in).unwrap();
        g.connect(c_out, d_in2).unwrap();

        assert_eq!(collect(&g, d).unwrap().ids(), vec![d, b, a, c]);
    }

    #[test]
    fn test_only_executable_nodes_collected() {
        let mut g = NodeGraph::new();
        let (_, _, plain_out) = add(&mut g, "plain", false);
        let (e, e_in, _) = add(&mut g, "exec", true);
        g.connect(plain_out, e_in).unwrap();

        assert_eq!(collect(&g, e).unwrap().ids(), vec![e]);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut g = NodeGraph::new();
        let (a, a_in, a_out) = add(&mut g, "A", true);
        let (b, b_in, b_out) = add(&mut g, "B", true);
        g.connect(a_out, b_in).unwrap();
        g.connect(b_out, a_in).unwrap();

        assert_eq!(collect(&g, a).unwrap().ids(), vec![a, b]);
    }

    #[test]
    fn test_children_walked_after_inputs() {
        let mut g = NodeGraph::new();
        let (up, _, up_out) = add(&mut g, "up", true);
        let (boxed, box_in, _) = add(&mut g, "box", true);
        g.connect(up_out, box_in).unwrap();
        let inner = g
            .add_child_node(boxed, "inner", "Test", &[T_NODE, T_EXECUTABLE])
            .unwrap();
        let _plain = g.add_child_node(boxed, "plain", "Test", &[T_NODE]).unwrap();

        assert_eq!(collect(&g, boxed).unwrap().ids(), vec![boxed, up, inner]);
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let mut g = NodeGraph::new();
        let (first, _, mut prev_out) = add(&mut g, "n0", true);
        let mut last = first;
        for i in 1..50_000 {
            let (n, n_in, n_out) = add(&mut g, &format!("n{}", i), true);
            g.connect(prev_out, n_in).unwrap();
            prev_out = n_out;
            last = n;
        }

        let ids = collect(&g, last).unwrap().ids();
        assert_eq!(ids.len(), 50_000);
        assert_eq!(ids[0], last);
        assert_eq!(ids[ids.len() - 1], first);
    }

    #[test]
    fn test_missing_target() {
        let g = NodeGraph::new();
        assert!(matches!(collect(&g, NodeId::new()), Err(GraphError::NodeNotFound(_))));
    }

    #[test]
    fn test_dangling_child_is_integrity_error() {
        let mut g = NodeGraph::new();
        let (a, _, _) = add(&mut g, "A", true);
        g.node_mut(a).unwrap().children.push(NodeId::new());
        assert!(matches!(collect(&g, a), Err(GraphError::Integrity(_))));
    }

    #[test]
    fn test_walkset_holds_weak_refs() {
        let mut g = NodeGraph::new();
        let (a, _, _) = add(&mut g, "A", true);
        let walk = collect(&g, a).unwrap();
        g.remove_node(a).unwrap();
        assert!(walk.iter().all(|r| r.is_expired()));
    }

    #[test]
    fn test_walkset_push_dedupes() {
        let mut g = NodeGraph::new();
        let (a, _, _) = add(&mut g, "A", true);
        let mut set = WalkSet::new();
        assert!(set.push(g.node_ref(a).unwrap()));
        assert!(!set.push(g.node_ref(a).unwrap()));
        assert_eq!(set.len(), 1);
    }
}
