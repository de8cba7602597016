//! Run lifecycle events (worker -> UI).

use std::fmt;
use uuid::Uuid;

use crate::entities::{NodeId, ProgressState};

/// Identity of one `Runner::run` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough for thread names and logs
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}

/// A run was accepted; `nodes` is its walk set in collection order
#[derive(Clone, Debug)]
pub struct RunStartedEvent {
    pub run: RunId,
    pub target: NodeId,
    pub nodes: Vec<NodeId>,
}

/// A node's progress state changed
#[derive(Clone, Debug)]
pub struct NodeProgressChangedEvent {
    pub node: NodeId,
    pub state: ProgressState,
}

/// Target executed successfully
#[derive(Clone, Debug)]
pub struct RunFinishedEvent {
    pub run: RunId,
    pub target: NodeId,
    pub nodes: Vec<NodeId>,
}

/// Target failed or vanished; `error` is the captured report
#[derive(Clone, Debug)]
pub struct RunFailedEvent {
    pub run: RunId,
    pub target: NodeId,
    pub nodes: Vec<NodeId>,
    pub error: String,
}
