//! Pass-through resolver.
//!
//! A pass-through attribute has no concrete type of its own; UI code asks
//! for the first concretely typed attribute it is wired to (for hook colours
//! and inspector fields).

use std::collections::HashSet;

use log::warn;

use crate::entities::{AttrId, NodeGraph};

/// First non-pass-through attribute reachable from `attr`.
///
/// A concrete `attr` is returned as is. Otherwise the upstream connection is
/// searched first, then each downstream connection in order. One visited set
/// spans the whole search, so cyclic and diamond chains terminate.
pub fn resolve_concrete(graph: &NodeGraph, attr: AttrId) -> Option<AttrId> {
    let mut visited = HashSet::new();
    let mut stack = vec![attr];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(a) = graph.attribute(id) else {
            warn!("pass-through search reached missing attribute {}", id);
            continue;
        };
        if !a.is_pass_through() {
            return Some(id);
        }
        // Popped next: upstream, then outputs in connection order
        stack.extend(a.outputs().iter().rev().copied());
        stack.extend(a.input());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::keys::T_NODE;
    use crate::entities::{AttrValue, AttributeType, NodeId};

    fn pass(g: &mut NodeGraph, node: NodeId, name: &str) -> AttrId {
        g.add_input_attribute(node, name, AttributeType::PassThrough, AttrValue::Empty)
            .unwrap()
    }

    #[test]
    fn test_concrete_returns_itself() {
        let mut g = NodeGraph::new();
        let n = g.add_node("n", "Node", &[T_NODE]);
        let a = g
            .add_output_attribute(n, "out", AttributeType::Numeric, AttrValue::Float(1.0))
            .unwrap();
        assert_eq!(resolve_concrete(&g, a), Some(a));
    }

    #[test]
    fn test_follows_upstream_first() {
        let mut g = NodeGraph::new();
        let n = g.add_node("n", "Node", &[T_NODE]);
        let up = g
            .add_output_attribute(n, "up", AttributeType::Numeric, AttrValue::Int(0))
            .unwrap();
        let down = g
            .add_input_attribute(n, "down", AttributeType::String, AttrValue::Empty)
            .unwrap();
        let p = pass(&mut g, n, "p");
        g.connect(up, p).unwrap();
        g.connect(p, down).unwrap();

        assert_eq!(resolve_concrete(&g, p), Some(up));
    }

    #[test]
    fn test_falls_back_to_downstream() {
        let mut g = NodeGraph::new();
        let n = g.add_node("n", "Node", &[T_NODE]);
        let p1 = pass(&mut g, n, "p1");
        let p2 = pass(&mut g, n, "p2");
        let concrete = g
            .add_input_attribute(n, "bool", AttributeType::Bool, AttrValue::Bool(true))
            .unwrap();
        g.connect(p1, p2).unwrap();
        g.connect(p2, concrete).unwrap();

        assert_eq!(resolve_concrete(&g, p1), Some(concrete));
    }

    #[test]
    fn test_cyclic_pass_through_chain_is_none() {
        let mut g = NodeGraph::new();
        let n = g.add_node("n", "Node", &[T_NODE]);
        let p1 = pass(&mut g, n, "p1");
        let p2 = pass(&mut g, n, "p2");
        let p3 = pass(&mut g, n, "p3");
        g.connect(p1, p2).unwrap();
        g.connect(p2, p3).unwrap();
        g.connect(p3, p1).unwrap();

        assert_eq!(resolve_concrete(&g, p2), None);
    }

    #[test]
    fn test_long_pass_through_chain() {
        let mut g = NodeGraph::new();
        let n = g.add_node("n", "Node", &[T_NODE]);
        let src = g
            .add_output_attribute(n, "src", AttributeType::Numeric, AttrValue::Int(1))
            .unwrap();
        let mut prev = src;
        for i in 0..50_000 {
            let p = pass(&mut g, n, &format!("p{}", i));
            g.connect(prev, p).unwrap();
            prev = p;
        }
        assert_eq!(resolve_concrete(&g, prev), Some(src));
    }

    #[test]
    fn test_unconnected_pass_through_is_none() {
        let mut g = NodeGraph::new();
        let n = g.add_node("n", "Node", &[T_NODE]);
        let p = pass(&mut g, n, "p");
        assert_eq!(resolve_concrete(&g, p), None);
    }
}
