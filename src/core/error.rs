//! Error taxonomy for graph access and runs.
//!
//! All of these are recoverable: the UI shows an error state plus the log
//! text and the user re-triggers the run. Nothing here aborts the host.

use thiserror::Error;

use crate::entities::{AttrId, NodeId};

/// Graph navigation / mutation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("attribute {0} not found")]
    AttributeNotFound(AttrId),

    /// Malformed graph: dangling id or missing owner
    #[error("graph integrity: {0}")]
    Integrity(String),

    #[error("invalid connection: {0}")]
    InvalidConnection(String),
}

/// Failures of a single run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("node {0} has no execute step")]
    NotExecutable(NodeId),

    /// The node's own execute step failed; `report` is what went to its log
    #[error("execution of '{node}' failed")]
    Execution { node: String, report: String },

    /// Node removed while the run was in flight
    #[error("node {0} was removed before the run could use it")]
    StaleReference(NodeId),

    #[error("failed to spawn run worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// Worker vanished without reporting (should not happen)
    #[error("run worker disconnected")]
    Disconnected,
}
