//! Node - graph vertex plus its shared runtime state.
//!
//! Structure (attributes, children, tags) lives in [`Node`] and is only
//! touched from the UI thread through `NodeGraph`. Everything a worker
//! thread may read or write (log text, progress, executor) lives in
//! [`NodeState`], shared as `Arc<NodeState>`.
//!
//! ## Handles
//!
//! The graph holds the only strong reference to a node's state. Runs hold
//! [`NodeRef`] (a `Weak`); once a node is removed mid-run the worker sees an
//! expired handle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, Weak};
use uuid::Uuid;

use super::attribute::AttrId;
use super::keys::T_EXECUTABLE;
use super::progress::ProgressState;
use super::traits::Execute;

/// Node identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable per-node fields guarded together.
#[derive(Debug, Default)]
struct NodeRuntime {
    log: String,
    progress: ProgressState,
}

/// Runtime state shared between the UI thread and run workers.
#[derive(Default)]
pub struct NodeState {
    runtime: Mutex<NodeRuntime>,
    executor: RwLock<Option<Arc<dyn Execute>>>,
}

impl fmt::Debug for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rt = self.runtime.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("NodeState")
            .field("progress", &rt.progress)
            .field("log_len", &rt.log.len())
            .field("has_executor", &self.has_executor())
            .finish()
    }
}

impl NodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> String {
        self.runtime.lock().unwrap_or_else(|e| e.into_inner()).log.clone()
    }

    /// Replace log text, keeping at most `max_len` trailing bytes.
    pub fn set_log(&self, text: &str, max_len: usize) {
        let mut rt = self.runtime.lock().unwrap_or_else(|e| e.into_inner());
        rt.log = tail(text, max_len).to_string();
    }

    /// Append one line, trimming the oldest text beyond `max_len` bytes.
    pub fn append_log(&self, line: &str, max_len: usize) {
        let mut rt = self.runtime.lock().unwrap_or_else(|e| e.into_inner());
        if !rt.log.is_empty() && !rt.log.ends_with('\n') {
            rt.log.push('\n');
        }
        rt.log.push_str(line);
        if rt.log.len() > max_len {
            rt.log = tail(&rt.log, max_len).to_string();
        }
    }

    pub fn progress(&self) -> ProgressState {
        self.runtime.lock().unwrap_or_else(|e| e.into_inner()).progress
    }

    /// Set progress, returning the previous state.
    pub fn set_progress(&self, state: ProgressState) -> ProgressState {
        let mut rt = self.runtime.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut rt.progress, state)
    }

    /// Set progress only if the current state satisfies `pred`.
    /// Returns true when the state changed.
    pub fn transition_if(&self, pred: impl Fn(ProgressState) -> bool, to: ProgressState) -> bool {
        let mut rt = self.runtime.lock().unwrap_or_else(|e| e.into_inner());
        if pred(rt.progress) && rt.progress != to {
            rt.progress = to;
            true
        } else {
            false
        }
    }

    pub fn executor(&self) -> Option<Arc<dyn Execute>> {
        self.executor.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_executor(&self, executor: Option<Arc<dyn Execute>>) {
        *self.executor.write().unwrap_or_else(|e| e.into_inner()) = executor;
    }

    pub fn has_executor(&self) -> bool {
        self.executor.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

/// Last `max_len` bytes of `text`, cut on a char boundary.
fn tail(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut start = text.len() - max_len;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Non-owning node handle, safe to move to worker threads.
#[derive(Clone, Debug)]
pub struct NodeRef {
    id: NodeId,
    state: Weak<NodeState>,
}

impl NodeRef {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Strong access to the state, `None` once the node was removed.
    pub fn upgrade(&self) -> Option<Arc<NodeState>> {
        self.state.upgrade()
    }

    pub fn is_expired(&self) -> bool {
        self.state.strong_count() == 0
    }
}

/// A graph vertex.
#[derive(Debug, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    name: String,
    type_name: String,
    /// Type tags, base first ("Node", ..., most derived)
    tags: Vec<String>,
    #[serde(default)]
    pub(crate) inputs: Vec<AttrId>,
    #[serde(default)]
    pub(crate) outputs: Vec<AttrId>,
    #[serde(default)]
    pub(crate) children: Vec<NodeId>,
    #[serde(default)]
    pub(crate) parent: Option<NodeId>,
    #[serde(skip)]
    state: Arc<NodeState>,
}

impl Node {
    pub fn new(name: &str, type_name: &str, tags: &[&str]) -> Self {
        Self {
            id: NodeId::new(),
            name: name.to_string(),
            type_name: type_name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            children: Vec::new(),
            parent: None,
            state: Arc::new(NodeState::new()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host type name ("BuildArray", "Time", ...)
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Capability query: does the tag set include `tag`
    pub fn has_tag(&self, tag: &str) -> bool {
        self.type_name == tag || self.tags.iter().any(|t| t == tag)
    }

    pub fn is_executable(&self) -> bool {
        self.has_tag(T_EXECUTABLE)
    }

    pub fn inputs(&self) -> &[AttrId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[AttrId] {
        &self.outputs
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    /// Weak handle to this node's runtime state
    pub fn node_ref(&self) -> NodeRef {
        NodeRef {
            id: self.id,
            state: Arc::downgrade(&self.state),
        }
    }

    pub fn log(&self) -> String {
        self.state.log()
    }

    pub fn progress(&self) -> ProgressState {
        self.state.progress()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags() {
        let node = Node::new("proc", "ProcessSimulation", &["Node", "ExecutableNode"]);
        assert!(node.is_executable());
        assert!(node.has_tag("ProcessSimulation"));
        assert!(!node.has_tag("CollapsedNode"));
    }

    #[test]
    fn test_node_ref_expires_with_node() {
        let node = Node::new("a", "Node", &["Node"]);
        let r = node.node_ref();
        assert!(r.upgrade().is_some());
        drop(node);
        assert!(r.is_expired());
        assert!(r.upgrade().is_none());
    }

    #[test]
    fn test_log_trimming() {
        let state = NodeState::new();
        state.append_log("first", 64);
        state.append_log("second", 64);
        assert_eq!(state.log(), "first\nsecond");

        state.set_log("0123456789", 4);
        assert_eq!(state.log(), "6789");
    }

    #[test]
    fn test_transition_if() {
        let state = NodeState::new();
        assert!(state.transition_if(|s| s == ProgressState::Dirty, ProgressState::Queued));
        assert!(!state.transition_if(|s| s == ProgressState::Dirty, ProgressState::Clean));
        assert_eq!(state.progress(), ProgressState::Queued);
    }
}
