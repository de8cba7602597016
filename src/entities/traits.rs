//! Abstract traits for dependency inversion.
//!
//! The execution entry point of an executable node belongs to the host
//! engine. Entities only know this interface; the runner in `core/`
//! calls it on a worker thread.

use super::node::{NodeId, NodeState};

/// Execution entry point of an executable node.
///
/// Called on a run's worker thread, never on the UI thread.
/// Errors are captured into the node log by the runner.
pub trait Execute: Send + Sync {
    fn execute(&self, ctx: &mut ExecContext<'_>) -> anyhow::Result<()>;
}

/// Closures work as executors
impl<F> Execute for F
where
    F: Fn(&mut ExecContext<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn execute(&self, ctx: &mut ExecContext<'_>) -> anyhow::Result<()> {
        self(ctx)
    }
}

/// What an executor may see and touch while running.
pub struct ExecContext<'a> {
    node: NodeId,
    name: &'a str,
    state: &'a NodeState,
    max_log_len: usize,
}

impl<'a> ExecContext<'a> {
    pub fn new(node: NodeId, name: &'a str, state: &'a NodeState, max_log_len: usize) -> Self {
        Self {
            node,
            name,
            state,
            max_log_len,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Append a line to the node log
    pub fn log(&mut self, line: impl AsRef<str>) {
        self.state.append_log(line.as_ref(), self.max_log_len);
    }
}
