//! NodeGraph: the in-memory dataflow graph.
//!
//! Holds nodes and attributes keyed by id (insertion ordered) and is the unit
//! of serialization: graphs are saved and loaded via `NodeGraph::to_json` /
//! `NodeGraph::from_json`. Executors and progress/log state are runtime only.
//!
//! The graph is owned by the UI thread. Workers never see it, they only get
//! `NodeRef` handles to per-node state.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::attribute::{AttrId, Attribute, AttributeType, Direction};
use super::attrs::AttrValue;
use super::node::{Node, NodeId, NodeRef};
use super::progress::ProgressState;
use super::traits::Execute;
use crate::core::error::GraphError;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NodeGraph {
    #[serde(default)]
    nodes: IndexMap<NodeId, Node>,
    #[serde(default)]
    attributes: IndexMap<AttrId, Attribute>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // === Lookup ===

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn attribute(&self, id: AttrId) -> Option<&Attribute> {
        self.attributes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First node with the given name
    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name() == name)
    }

    /// Attribute of `node` named `name`
    pub fn attribute_named(&self, node: NodeId, name: &str) -> Option<&Attribute> {
        let node = self.nodes.get(&node)?;
        node.inputs()
            .iter()
            .chain(node.outputs())
            .filter_map(|id| self.attributes.get(id))
            .find(|a| a.name() == name)
    }

    /// Attribute by full name "node.attr"
    pub fn find_attribute(&self, full_name: &str) -> Option<&Attribute> {
        let (node_name, attr_name) = full_name.split_once('.')?;
        let node = self.find_node(node_name)?;
        self.attribute_named(node.id(), attr_name)
    }

    /// "node.attr"
    pub fn full_name(&self, attr: AttrId) -> Option<String> {
        let a = self.attributes.get(&attr)?;
        let n = self.nodes.get(&a.parent())?;
        Some(format!("{}.{}", n.name(), a.name()))
    }

    /// Weak handle for moving a node reference to a worker thread
    pub fn node_ref(&self, id: NodeId) -> Result<NodeRef, GraphError> {
        self.nodes
            .get(&id)
            .map(Node::node_ref)
            .ok_or(GraphError::NodeNotFound(id))
    }

    // === Structure ===

    pub fn add_node(&mut self, name: &str, type_name: &str, tags: &[&str]) -> NodeId {
        let node = Node::new(name, type_name, tags);
        let id = node.id();
        trace!("add_node {} ({}) {}", name, type_name, id);
        self.nodes.insert(id, node);
        id
    }

    /// Add a node nested inside a container node
    pub fn add_child_node(
        &mut self,
        parent: NodeId,
        name: &str,
        type_name: &str,
        tags: &[&str],
    ) -> Result<NodeId, GraphError> {
        if !self.nodes.contains_key(&parent) {
            return Err(GraphError::NodeNotFound(parent));
        }
        let id = self.add_node(name, type_name, tags);
        if let Some(child) = self.nodes.get_mut(&id) {
            child.parent = Some(parent);
        }
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Remove a node, its children, its attributes and every connection
    /// touching them. Drops the only strong handle to each node state.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::NodeNotFound(id));
        }

        let mut doomed = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if !seen.insert(n) {
                continue;
            }
            if let Some(node) = self.nodes.get(&n) {
                stack.extend(node.children().iter().copied());
                doomed.push(n);
            }
        }

        for n in doomed {
            let Some(node) = self.nodes.shift_remove(&n) else {
                continue;
            };
            for attr in node.inputs().iter().chain(node.outputs()) {
                self.remove_attribute(*attr);
            }
            if let Some(p) = node.parent().and_then(|p| self.nodes.get_mut(&p)) {
                p.children.retain(|c| *c != n);
            }
            debug!("removed node {}", n);
        }
        Ok(())
    }

    fn remove_attribute(&mut self, id: AttrId) {
        let Some(attr) = self.attributes.shift_remove(&id) else {
            return;
        };
        if let Some(src) = attr.input.and_then(|s| self.attributes.get_mut(&s)) {
            src.outputs.retain(|o| *o != id);
        }
        for dst in attr.outputs {
            if let Some(d) = self.attributes.get_mut(&dst) {
                d.input = None;
            }
        }
    }

    pub fn add_input_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        kind: AttributeType,
        value: AttrValue,
    ) -> Result<AttrId, GraphError> {
        self.add_attribute(node, name, kind, Direction::Input, value)
    }

    pub fn add_output_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        kind: AttributeType,
        value: AttrValue,
    ) -> Result<AttrId, GraphError> {
        self.add_attribute(node, name, kind, Direction::Output, value)
    }

    fn add_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        kind: AttributeType,
        direction: Direction,
        value: AttrValue,
    ) -> Result<AttrId, GraphError> {
        let owner = self.nodes.get_mut(&node).ok_or(GraphError::NodeNotFound(node))?;
        let attr = Attribute::new(name, node, kind, direction, value);
        let id = attr.id();
        match direction {
            Direction::Input => owner.inputs.push(id),
            Direction::Output => owner.outputs.push(id),
        }
        self.attributes.insert(id, attr);
        Ok(id)
    }

    fn attribute_mut(&mut self, id: AttrId) -> Result<&mut Attribute, GraphError> {
        self.attributes
            .get_mut(&id)
            .ok_or(GraphError::AttributeNotFound(id))
    }

    pub fn set_pass_through(&mut self, attr: AttrId, pass_through: bool) -> Result<(), GraphError> {
        self.attribute_mut(attr)?.pass_through = pass_through;
        Ok(())
    }

    pub fn set_specialization<S: Into<String>>(
        &mut self,
        attr: AttrId,
        specialization: impl IntoIterator<Item = S>,
    ) -> Result<(), GraphError> {
        self.attribute_mut(attr)?.specialization =
            specialization.into_iter().map(Into::into).collect();
        Ok(())
    }

    /// Store a value without notifying downstream nodes.
    /// Call [`NodeGraph::value_changed`] to propagate.
    pub fn set_value(&mut self, attr: AttrId, value: AttrValue) -> Result<(), GraphError> {
        self.attribute_mut(attr)?.value = value;
        Ok(())
    }

    /// Connect `src` to `dst`; `dst` keeps a single upstream, an existing
    /// one is replaced.
    pub fn connect(&mut self, src: AttrId, dst: AttrId) -> Result<(), GraphError> {
        if src == dst {
            return Err(GraphError::InvalidConnection(format!(
                "attribute {} connected to itself",
                src
            )));
        }
        if !self.attributes.contains_key(&src) {
            return Err(GraphError::AttributeNotFound(src));
        }
        self.disconnect(dst)?;
        self.attribute_mut(dst)?.input = Some(src);
        self.attribute_mut(src)?.outputs.push(dst);
        trace!("connected {} -> {}", src, dst);
        Ok(())
    }

    /// Drop the upstream connection of `dst`, returning the old source
    pub fn disconnect(&mut self, dst: AttrId) -> Result<Option<AttrId>, GraphError> {
        let old = self.attribute_mut(dst)?.input.take();
        if let Some(src) = old.and_then(|s| self.attributes.get_mut(&s)) {
            src.outputs.retain(|o| *o != dst);
        }
        Ok(old)
    }

    /// Attach the execute step of an executable node
    pub fn set_executor<E: Execute + 'static>(&self, node: NodeId, executor: E) -> Result<(), GraphError> {
        let node = self.nodes.get(&node).ok_or(GraphError::NodeNotFound(node))?;
        let executor: Arc<dyn Execute> = Arc::new(executor);
        node.state().set_executor(Some(executor));
        Ok(())
    }

    // === Dirty propagation ===

    /// Notify that the value of `attr` changed.
    ///
    /// Every executable node reachable downstream (the owner of the
    /// attribute, owners of connected attributes, and through an input to
    /// every output of its node) becomes `Dirty`. Returns the nodes whose
    /// state actually changed, in discovery order.
    pub fn value_changed(&self, attr: AttrId) -> Result<Vec<NodeId>, GraphError> {
        if !self.attributes.contains_key(&attr) {
            return Err(GraphError::AttributeNotFound(attr));
        }
        let mut visited = HashSet::new();
        let mut dirtied = Vec::new();
        let mut stack = vec![attr];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(a) = self.attributes.get(&id) else {
                continue;
            };
            if let Some(node) = self.nodes.get(&a.parent()) {
                if node.is_executable()
                    && node.state().set_progress(ProgressState::Dirty) != ProgressState::Dirty
                    && !dirtied.contains(&node.id())
                {
                    dirtied.push(node.id());
                }
                if a.is_input() {
                    stack.extend(node.outputs().iter().rev().copied());
                }
            }
            stack.extend(a.outputs().iter().rev().copied());
        }

        if !dirtied.is_empty() {
            debug!("value_changed {} dirtied {} node(s)", attr, dirtied.len());
        }
        Ok(dirtied)
    }

    // === Integrity ===

    /// Check every id reference in the graph.
    pub fn validate(&self) -> Result<(), GraphError> {
        for node in self.nodes.values() {
            for a in node.inputs().iter().chain(node.outputs()) {
                let attr = self.attributes.get(a).ok_or_else(|| {
                    GraphError::Integrity(format!("node '{}' lists missing attribute {}", node.name(), a))
                })?;
                if attr.parent() != node.id() {
                    return Err(GraphError::Integrity(format!(
                        "attribute '{}' listed on '{}' but owned by {}",
                        attr.name(),
                        node.name(),
                        attr.parent()
                    )));
                }
            }
            if let Some(p) = node.parent() {
                let listed = self.nodes.get(&p).is_some_and(|p| p.children().contains(&node.id()));
                if !listed {
                    return Err(GraphError::Integrity(format!(
                        "node '{}' has parent {} that does not list it",
                        node.name(),
                        p
                    )));
                }
            }
            let mut seen = HashSet::new();
            for c in node.children() {
                let Some(child) = self.nodes.get(c) else {
                    return Err(GraphError::Integrity(format!(
                        "node '{}' lists missing child {}",
                        node.name(),
                        c
                    )));
                };
                if child.parent() != Some(node.id()) || !seen.insert(*c) {
                    return Err(GraphError::Integrity(format!(
                        "node '{}' lists child '{}' it does not own",
                        node.name(),
                        child.name()
                    )));
                }
            }
        }
        self.check_acyclic_hierarchy()?;
        for attr in self.attributes.values() {
            if !self.nodes.contains_key(&attr.parent()) {
                return Err(GraphError::Integrity(format!(
                    "attribute '{}' has no owner",
                    attr.name()
                )));
            }
            for linked in attr.input().iter().chain(attr.outputs()) {
                if !self.attributes.contains_key(linked) {
                    return Err(GraphError::Integrity(format!(
                        "attribute '{}' connected to missing {}",
                        attr.name(),
                        linked
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parent chains must end at a root. Each chain is walked once; nodes
    /// already known to reach a root stop the walk early.
    fn check_acyclic_hierarchy(&self) -> Result<(), GraphError> {
        let mut rooted = HashSet::new();
        for start in self.nodes.keys() {
            let mut path = HashSet::new();
            let mut cur = Some(*start);
            while let Some(id) = cur {
                if rooted.contains(&id) {
                    break;
                }
                if !path.insert(id) {
                    let name = self.nodes.get(&id).map(|n| n.name()).unwrap_or_default();
                    return Err(GraphError::Integrity(format!(
                        "node '{}' is its own ancestor",
                        name
                    )));
                }
                cur = self.nodes.get(&id).and_then(|n| n.parent());
            }
            rooted.extend(path);
        }
        Ok(())
    }

    // === Serialization ===

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Serialize graph")
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let graph: NodeGraph = serde_json::from_str(json).context("Parse graph")?;
        graph.validate().context("Validate graph")?;
        Ok(graph)
    }

    /// Serialize graph to JSON file.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = self.to_json_string()?;
        fs::write(path, json).with_context(|| format!("Write graph: {}", path.display()))
    }

    /// Load graph from JSON file. Runtime state starts fresh (dirty, empty
    /// logs, no executors).
    pub fn from_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Read graph: {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Test-only escape hatch for building malformed graphs
    #[cfg(test)]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }
}
