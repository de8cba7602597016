//! Threaded runner for executable nodes.
//!
//! `run()` collects the walk set on the calling (UI) thread, marks every
//! collected node queued, then executes the target on a dedicated worker
//! thread. Outcome reaches the UI two ways:
//! - events on the bus (`RunStarted`, `NodeProgressChanged`, `RunFinished`,
//!   `RunFailed`), drained by `EventBus::poll()`
//! - the run's own channel, read through [`RunHandle`]
//!
//! No lock is taken across runs. Two runs over overlapping nodes may
//! interleave their state transitions; the UI is expected not to start them.
//! Runs cannot be cancelled and have no timeout.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, error, info, trace, warn};

use super::collector::{collect, WalkSet};
use super::error::{GraphError, RunError};
use super::event_bus::RunEventEmitter;
use super::run_events::{
    NodeProgressChangedEvent, RunFailedEvent, RunFinishedEvent, RunId, RunStartedEvent,
};
use crate::config::Settings;
use crate::entities::{ExecContext, NodeGraph, NodeId, NodeRef, NodeState, ProgressState};

/// Starts runs and tracks how many are in flight.
#[derive(Debug, Clone)]
pub struct Runner {
    emitter: RunEventEmitter,
    settings: Settings,
    active: Arc<AtomicUsize>,
}

impl Runner {
    pub fn new(emitter: RunEventEmitter, settings: Settings) -> Self {
        Self {
            emitter,
            settings,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Runner without an event bus (tests, batch use)
    pub fn headless() -> Self {
        Self::new(RunEventEmitter::dummy(), Settings::default())
    }

    /// Runs started and not yet finished. UI keeps redrawing while > 0.
    pub fn active_runs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Execute `target` off the calling thread.
    ///
    /// Fails synchronously (no state touched) when the target is unknown,
    /// has no execute step, or the graph is malformed.
    pub fn run(&self, graph: &NodeGraph, target: NodeId) -> Result<RunHandle, RunError> {
        let node = graph.node(target).ok_or(GraphError::NodeNotFound(target))?;
        if !node.state().has_executor() {
            return Err(RunError::NotExecutable(target));
        }
        let walk = collect(graph, target)?;
        let run = RunId::new();
        let nodes = walk.ids();
        info!("run {}: '{}' with {} collected node(s)", run, node.name(), nodes.len());

        self.emitter.emit(RunStartedEvent {
            run,
            target,
            nodes: nodes.clone(),
        });
        // The target is owned by the run even when the walk skipped it
        let owned = owned_nodes(&walk, node.node_ref());
        for r in &owned {
            if let Some(state) = r.upgrade() {
                set_state(&self.emitter, r.id(), &state, ProgressState::Queued);
            }
        }

        let job = RunJob {
            run,
            target: node.node_ref(),
            name: node.name().to_string(),
            owned: owned.clone(),
            nodes: nodes.clone(),
            emitter: self.emitter.clone(),
            max_log_len: self.settings.max_log_len,
            active: Arc::clone(&self.active),
        };

        let (tx, rx) = crossbeam_channel::bounded(1);
        self.active.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.settings.worker_name_prefix, run))
            .spawn(move || {
                let outcome = job.execute();
                let _ = tx.send(outcome);
            });

        if let Err(e) = spawned {
            self.active.fetch_sub(1, Ordering::SeqCst);
            error!("run {}: worker spawn failed: {}", run, e);
            // Nothing ran: give the queued nodes back
            release_all(&self.emitter, &owned, ProgressState::Dirty);
            return Err(RunError::Spawn(e));
        }

        Ok(RunHandle {
            run,
            target,
            nodes,
            rx,
            outcome: None,
        })
    }
}

/// Everything a worker needs, owned; only weak node handles inside.
struct RunJob {
    run: RunId,
    target: NodeRef,
    name: String,
    /// Walk set plus the target
    owned: Vec<NodeRef>,
    /// Walk set ids, as reported in events
    nodes: Vec<NodeId>,
    emitter: RunEventEmitter,
    max_log_len: usize,
    active: Arc<AtomicUsize>,
}

impl RunJob {
    fn execute(self) -> Result<(), RunError> {
        trace!("run {}: worker started", self.run);
        let target = self.target.id();

        let result = match self.target.upgrade() {
            Some(state) => {
                set_state(&self.emitter, target, &state, ProgressState::Processing);
                invoke(target, &self.name, &state, self.max_log_len)
            }
            None => Err(ExecFailure::Stale),
        };

        // Re-check: the node may have been removed while it executed
        let outcome = match (result, self.target.upgrade()) {
            (_, None) | (Err(ExecFailure::Stale), _) => {
                warn!("run {}: node '{}' was removed", self.run, self.name);
                release_all(&self.emitter, &self.owned, ProgressState::Dirty);
                Err(RunError::StaleReference(target))
            }
            (Ok(()), Some(_)) => {
                release_all(&self.emitter, &self.owned, ProgressState::Clean);
                info!("run {}: '{}' finished", self.run, self.name);
                Ok(())
            }
            (Err(ExecFailure::Failed(report)), Some(state)) => {
                state.set_log(&report, self.max_log_len);
                set_state(&self.emitter, target, &state, ProgressState::Error);
                release_all(&self.emitter, &self.owned, ProgressState::Dirty);
                error!("run {}: '{}' failed: {}", self.run, self.name, first_line(&report));
                Err(RunError::Execution {
                    node: self.name.clone(),
                    report,
                })
            }
        };

        // Count the run as done before the UI hears about it
        self.active.fetch_sub(1, Ordering::SeqCst);

        let nodes = self.nodes.clone();
        match &outcome {
            Ok(()) => self.emitter.emit(RunFinishedEvent {
                run: self.run,
                target,
                nodes,
            }),
            Err(e) => self.emitter.emit(RunFailedEvent {
                run: self.run,
                target,
                nodes,
                error: match e {
                    RunError::Execution { report, .. } => report.clone(),
                    other => other.to_string(),
                },
            }),
        }
        outcome
    }
}

enum ExecFailure {
    Stale,
    Failed(String),
}

/// Call the node's execute step; errors and panics become a report.
fn invoke(node: NodeId, name: &str, state: &NodeState, max_log_len: usize) -> Result<(), ExecFailure> {
    let Some(executor) = state.executor() else {
        return Err(ExecFailure::Failed(format!("node '{}' has no execute step", name)));
    };
    let mut ctx = ExecContext::new(node, name, state, max_log_len);
    match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(&mut ctx))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ExecFailure::Failed(format!("{:?}", e))),
        Err(payload) => Err(ExecFailure::Failed(format!(
            "execute of '{}' panicked: {}",
            name,
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn set_state(emitter: &RunEventEmitter, node: NodeId, state: &NodeState, to: ProgressState) {
    let from = state.set_progress(to);
    if from != to {
        debug!("node {}: {} -> {}", node, from, to);
        emitter.emit(NodeProgressChangedEvent { node, state: to });
    }
}

/// Collected nodes, then the target if the walk did not collect it.
fn owned_nodes(walk: &WalkSet, target: NodeRef) -> Vec<NodeRef> {
    let mut owned: Vec<NodeRef> = walk.iter().cloned().collect();
    if !walk.contains(target.id()) {
        owned.push(target);
    }
    owned
}

/// Move every node still owned by a run to `to`.
/// Nodes dirtied mid-run (or already failed) keep their state.
fn release_all(emitter: &RunEventEmitter, owned: &[NodeRef], to: ProgressState) {
    for r in owned {
        if let Some(state) = r.upgrade() {
            release(emitter, r.id(), &state, to);
        }
    }
}

fn release(emitter: &RunEventEmitter, node: NodeId, state: &NodeState, to: ProgressState) {
    if state.transition_if(|s| s.is_busy(), to) {
        debug!("node {}: released -> {}", node, to);
        emitter.emit(NodeProgressChangedEvent { node, state: to });
    }
}

/// UI-side handle of one run.
#[derive(Debug)]
pub struct RunHandle {
    run: RunId,
    target: NodeId,
    nodes: Vec<NodeId>,
    rx: Receiver<Result<(), RunError>>,
    outcome: Option<Result<(), RunError>>,
}

impl RunHandle {
    pub fn id(&self) -> RunId {
        self.run
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Collected nodes, in walk order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Non-blocking: the outcome once the worker reported it.
    pub fn try_outcome(&mut self) -> Option<&Result<(), RunError>> {
        if self.outcome.is_none() {
            match self.rx.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => self.outcome = Some(Err(RunError::Disconnected)),
            }
        }
        self.outcome.as_ref()
    }

    pub fn is_finished(&mut self) -> bool {
        self.try_outcome().is_some()
    }

    /// Block until the worker reports.
    pub fn wait(mut self) -> Result<(), RunError> {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        self.rx.recv().unwrap_or(Err(RunError::Disconnected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::{downcast_event, EventBus};
    use crate::entities::keys::{T_EXECUTABLE, T_NODE};
    use crate::entities::{AttrValue, AttributeType};
    use anyhow::bail;

    fn exec_node(g: &mut NodeGraph, name: &str) -> NodeId {
        let n = g.add_node(name, "ExecutableNode", &[T_NODE, T_EXECUTABLE]);
        g.add_input_attribute(n, "in", AttributeType::Numeric, AttrValue::Int(0))
            .unwrap();
        g.add_output_attribute(n, "out", AttributeType::Numeric, AttrValue::Int(0))
            .unwrap();
        n
    }

    fn link(g: &mut NodeGraph, from: NodeId, to: NodeId) {
        let out = g.attribute_named(from, "out").unwrap().id();
        let inp = g.attribute_named(to, "in").unwrap().id();
        g.connect(out, inp).unwrap();
    }

    #[test]
    fn test_success_cleans_collected_nodes() {
        let mut g = NodeGraph::new();
        let a = exec_node(&mut g, "a");
        let b = exec_node(&mut g, "b");
        link(&mut g, a, b);
        g.set_executor(b, |_: &mut ExecContext<'_>| -> anyhow::Result<()> { Ok(()) }).unwrap();

        let runner = Runner::headless();
        let handle = runner.run(&g, b).unwrap();
        assert_eq!(handle.nodes(), &[b, a]);
        handle.wait().unwrap();

        assert_eq!(g.node(a).unwrap().progress(), ProgressState::Clean);
        assert_eq!(g.node(b).unwrap().progress(), ProgressState::Clean);
        assert_eq!(g.node(b).unwrap().log(), "");
        assert_eq!(runner.active_runs(), 0);
    }

    #[test]
    fn test_failure_captures_report() {
        let mut g = NodeGraph::new();
        let a = exec_node(&mut g, "a");
        let b = exec_node(&mut g, "b");
        link(&mut g, a, b);
        g.set_executor(b, |_: &mut ExecContext<'_>| -> anyhow::Result<()> {
            bail!("disk full")
        })
        .unwrap();

        let err = Runner::headless().run(&g, b).unwrap().wait().unwrap_err();
        match err {
            RunError::Execution { node, report } => {
                assert_eq!(node, "b");
                assert!(report.contains("disk full"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(g.node(b).unwrap().log().contains("disk full"));
        assert_eq!(g.node(b).unwrap().progress(), ProgressState::Error);
        assert_eq!(g.node(a).unwrap().progress(), ProgressState::Dirty);
    }

    #[test]
    fn test_panic_does_not_cross_thread() {
        let mut g = NodeGraph::new();
        let a = exec_node(&mut g, "a");
        g.set_executor(a, |_: &mut ExecContext<'_>| -> anyhow::Result<()> {
            panic!("boom")
        })
        .unwrap();

        let err = Runner::headless().run(&g, a).unwrap().wait().unwrap_err();
        assert!(matches!(err, RunError::Execution { .. }));
        assert!(g.node(a).unwrap().log().contains("boom"));
    }

    /// A -> B -> C where only A and B carry the executable tag.
    fn chain_to_plain_target(g: &mut NodeGraph) -> (NodeId, NodeId, NodeId) {
        let a = exec_node(g, "a");
        let b = exec_node(g, "b");
        let c = g.add_node("c", "Node", &[T_NODE]);
        g.add_input_attribute(c, "in", AttributeType::Numeric, AttrValue::Int(0))
            .unwrap();
        link(g, a, b);
        link(g, b, c);
        (a, b, c)
    }

    #[test]
    fn test_untagged_target_is_released() {
        let mut g = NodeGraph::new();
        let (a, b, c) = chain_to_plain_target(&mut g);
        g.set_executor(c, |_: &mut ExecContext<'_>| -> anyhow::Result<()> { Ok(()) }).unwrap();

        let handle = Runner::headless().run(&g, c).unwrap();
        assert_eq!(handle.nodes(), &[b, a]);
        handle.wait().unwrap();

        for id in [a, b, c] {
            assert_eq!(g.node(id).unwrap().progress(), ProgressState::Clean);
        }
    }

    #[test]
    fn test_untagged_target_failure_marks_error() {
        let mut g = NodeGraph::new();
        let (a, b, c) = chain_to_plain_target(&mut g);
        g.set_executor(c, |_: &mut ExecContext<'_>| -> anyhow::Result<()> { bail!("no input") })
            .unwrap();

        let err = Runner::headless().run(&g, c).unwrap().wait().unwrap_err();
        assert!(matches!(err, RunError::Execution { .. }));
        assert_eq!(g.node(c).unwrap().progress(), ProgressState::Error);
        assert_eq!(g.node(a).unwrap().progress(), ProgressState::Dirty);
        assert_eq!(g.node(b).unwrap().progress(), ProgressState::Dirty);
    }

    #[test]
    fn test_active_runs_dropped_before_end_event() {
        let mut g = NodeGraph::new();
        let a = exec_node(&mut g, "a");
        g.set_executor(a, |_: &mut ExecContext<'_>| -> anyhow::Result<()> { Ok(()) }).unwrap();

        let bus = EventBus::new();
        let runner = Runner::new(RunEventEmitter::from_emitter(bus.emitter()), Settings::default());
        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        let (watch_runner, watch_seen) = (runner.clone(), Arc::clone(&seen));
        bus.subscribe::<RunFinishedEvent, _>(move |_| {
            watch_seen.store(watch_runner.active_runs(), Ordering::SeqCst);
        });

        runner.run(&g, a).unwrap().wait().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_not_executable_touches_nothing() {
        let mut g = NodeGraph::new();
        let a = exec_node(&mut g, "a");
        let err = Runner::headless().run(&g, a).unwrap_err();
        assert!(matches!(err, RunError::NotExecutable(id) if id == a));
        assert_eq!(g.node(a).unwrap().progress(), ProgressState::Dirty);
    }

    #[test]
    fn test_removed_mid_run_is_stale() {
        let mut g = NodeGraph::new();
        let a = exec_node(&mut g, "a");
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
        let (go_tx, go_rx) = crossbeam_channel::bounded::<()>(1);
        g.set_executor(a, move |_: &mut ExecContext<'_>| -> anyhow::Result<()> {
            started_tx.send(()).ok();
            go_rx.recv().ok();
            Ok(())
        })
        .unwrap();

        let handle = Runner::headless().run(&g, a).unwrap();
        started_rx.recv().unwrap();
        g.remove_node(a).unwrap();
        go_tx.send(()).unwrap();

        assert!(matches!(handle.wait(), Err(RunError::StaleReference(id)) if id == a));
    }

    #[test]
    fn test_events_in_order() {
        let mut g = NodeGraph::new();
        let a = exec_node(&mut g, "a");
        g.set_executor(a, |ctx: &mut ExecContext<'_>| -> anyhow::Result<()> {
            ctx.log("working");
            Ok(())
        })
        .unwrap();

        let bus = EventBus::new();
        let runner = Runner::new(RunEventEmitter::from_emitter(bus.emitter()), Settings::default());
        runner.run(&g, a).unwrap().wait().unwrap();

        let events = bus.poll();
        assert!(downcast_event::<RunStartedEvent>(&events[0]).is_some());
        let states: Vec<ProgressState> = events
            .iter()
            .filter_map(|e| downcast_event::<NodeProgressChangedEvent>(e))
            .map(|e| e.state)
            .collect();
        assert_eq!(
            states,
            vec![ProgressState::Queued, ProgressState::Processing, ProgressState::Clean]
        );
        assert!(downcast_event::<RunFinishedEvent>(events.last().unwrap()).is_some());
        assert_eq!(g.node(a).unwrap().log(), "working");
    }

    #[test]
    fn test_dirtied_mid_run_stays_dirty() {
        let mut g = NodeGraph::new();
        let a = exec_node(&mut g, "a");
        let b = exec_node(&mut g, "b");
        link(&mut g, a, b);
        let a_in = g.attribute_named(a, "in").unwrap().id();
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
        let (go_tx, go_rx) = crossbeam_channel::bounded::<()>(1);
        g.set_executor(b, move |_: &mut ExecContext<'_>| -> anyhow::Result<()> {
            started_tx.send(()).ok();
            go_rx.recv().ok();
            Ok(())
        })
        .unwrap();

        let handle = Runner::headless().run(&g, b).unwrap();
        started_rx.recv().unwrap();
        g.value_changed(a_in).unwrap();
        go_tx.send(()).unwrap();
        handle.wait().unwrap();

        // Host dirty-propagation wins over the run's clean
        assert_eq!(g.node(a).unwrap().progress(), ProgressState::Dirty);
        assert_eq!(g.node(b).unwrap().progress(), ProgressState::Dirty);
    }
}
