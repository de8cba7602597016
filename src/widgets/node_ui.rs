//! Node UIs: per-node colour, tooltip and progress bar view-models.
//!
//! Executable node UIs follow runs through bus events instead of a
//! redraw timer: they animate between `RunStarted` and
//! `RunFinished`/`RunFailed` and refresh on `NodeProgressChanged`.

use enum_dispatch::enum_dispatch;

use super::color::Color;
use crate::core::{
    downcast_event, BoxedEvent, NodeProgressChangedEvent, RunFailedEvent, RunFinishedEvent, RunStartedEvent,
};
use crate::entities::{Node, NodeGraph, NodeId, NodeRef, ProgressState};

pub const TOOLTIP_OPEN_HINT: &str = "(double click to open)";

/// Bar drawn at the bottom of executable nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressBar {
    pub color: Color,
    pub text: String,
}

impl ProgressBar {
    pub const CLEAN: Color = Color::rgb(0, 255, 191);
    pub const DIRTY: Color = Color::rgb(255, 204, 102);
    pub const QUEUED: Color = Color::rgb(230, 255, 102);
    pub const BUSY: Color = Color::rgb(189, 0, 47);

    pub fn for_state(state: ProgressState) -> Self {
        let color = match state {
            ProgressState::Clean => Self::CLEAN,
            ProgressState::Dirty => Self::DIRTY,
            ProgressState::Queued => Self::QUEUED,
            ProgressState::Processing | ProgressState::Error => Self::BUSY,
        };
        Self {
            color,
            text: state.message().to_string(),
        }
    }
}

#[enum_dispatch]
pub trait NodeUi {
    /// Body colour; `None` keeps the editor default
    fn color(&self) -> Option<Color> {
        None
    }

    /// Double click opens the node's inner graph
    fn can_open(&self) -> bool {
        false
    }

    fn tooltip(&self, base: &str) -> String {
        base.to_string()
    }

    fn progress_bar(&self) -> Option<&ProgressBar> {
        None
    }

    /// React to a bus event. Returns true when the node needs a redraw.
    fn handle_event(&mut self, _graph: &NodeGraph, _event: &BoxedEvent) -> bool {
        false
    }
}

fn open_hint(base: &str) -> String {
    format!("{}\n\n{}", base, TOOLTIP_OPEN_HINT)
}

#[derive(Debug, Clone)]
pub struct ForLoopNodeUi;

impl NodeUi for ForLoopNodeUi {
    fn color(&self) -> Option<Color> {
        Some(Color::rgb(245, 181, 118))
    }

    fn can_open(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct CollapsedNodeUi;

impl NodeUi for CollapsedNodeUi {
    fn color(&self) -> Option<Color> {
        Some(Color::rgb(0, 204, 255))
    }

    fn can_open(&self) -> bool {
        true
    }

    fn tooltip(&self, base: &str) -> String {
        open_hint(base)
    }
}

/// What a run event means for one node.
enum RunPhase {
    Started,
    Progress(NodeId),
    Ended,
}

fn run_phase(event: &BoxedEvent, id: NodeId) -> Option<RunPhase> {
    if let Some(e) = downcast_event::<RunStartedEvent>(event) {
        return e.nodes.contains(&id).then_some(RunPhase::Started);
    }
    if let Some(e) = downcast_event::<NodeProgressChangedEvent>(event) {
        return Some(RunPhase::Progress(e.node));
    }
    if let Some(e) = downcast_event::<RunFinishedEvent>(event) {
        return e.nodes.contains(&id).then_some(RunPhase::Ended);
    }
    if let Some(e) = downcast_event::<RunFailedEvent>(event) {
        return e.nodes.contains(&id).then_some(RunPhase::Ended);
    }
    None
}

#[derive(Debug, Clone)]
pub struct ExecutableNodeUi {
    node: NodeRef,
    bar: ProgressBar,
    animating: bool,
}

impl ExecutableNodeUi {
    pub fn new(node: &Node) -> Self {
        Self {
            node: node.node_ref(),
            bar: ProgressBar::for_state(node.progress()),
            animating: false,
        }
    }

    /// Re-read the node's progress into the bar.
    pub fn executable_node_changed(&mut self) {
        if let Some(state) = self.node.upgrade() {
            self.bar = ProgressBar::for_state(state.progress());
        }
    }

    pub fn start_process(&mut self) {
        self.animating = true;
        self.executable_node_changed();
    }

    pub fn end_process(&mut self) {
        self.animating = false;
        self.executable_node_changed();
    }

    /// Between start and end of a run covering this node
    pub fn is_animating(&self) -> bool {
        self.animating
    }
}

impl NodeUi for ExecutableNodeUi {
    fn progress_bar(&self) -> Option<&ProgressBar> {
        Some(&self.bar)
    }

    fn handle_event(&mut self, _graph: &NodeGraph, event: &BoxedEvent) -> bool {
        match run_phase(event, self.node.id()) {
            Some(RunPhase::Started) => self.start_process(),
            Some(RunPhase::Progress(id)) if id == self.node.id() => self.executable_node_changed(),
            Some(RunPhase::Ended) => self.end_process(),
            _ => return false,
        }
        true
    }
}

/// Collapsed container that is itself executable. The bar summarises the
/// executable nodes directly inside it.
#[derive(Debug, Clone)]
pub struct CollapsedExecutableNodeUi {
    node: NodeRef,
    bar: ProgressBar,
    animating: bool,
    children: Vec<NodeRef>,
}

impl CollapsedExecutableNodeUi {
    pub fn new(graph: &NodeGraph, node: &Node) -> Self {
        let mut ui = Self {
            node: node.node_ref(),
            bar: ProgressBar::for_state(ProgressState::Dirty),
            animating: false,
            children: Vec::new(),
        };
        ui.collect_child_nodes(graph);
        ui.node_changed();
        ui
    }

    pub fn collect_child_nodes(&mut self, graph: &NodeGraph) {
        self.children = graph
            .node(self.node.id())
            .map(|n| {
                n.children()
                    .iter()
                    .filter_map(|c| graph.node(*c))
                    .filter(|c| c.is_executable())
                    .map(|c| c.node_ref())
                    .collect()
            })
            .unwrap_or_default();
    }

    /// Recompute the summary bar from the children's states.
    pub fn node_changed(&mut self) {
        let (mut dirty, mut busy) = (0usize, 0usize);
        for state in self.children.iter().filter_map(|c| c.upgrade()) {
            match state.progress() {
                ProgressState::Clean => {}
                ProgressState::Dirty => dirty += 1,
                _ => busy += 1,
            }
        }
        self.bar = if busy > 0 {
            ProgressBar {
                color: ProgressBar::BUSY,
                text: format!("nodes {}", dirty + busy),
            }
        } else if dirty == 0 {
            ProgressBar::for_state(ProgressState::Clean)
        } else {
            ProgressBar::for_state(ProgressState::Dirty)
        };
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    fn is_child(&self, id: NodeId) -> bool {
        self.children.iter().any(|c| c.id() == id)
    }
}

impl NodeUi for CollapsedExecutableNodeUi {
    fn color(&self) -> Option<Color> {
        Some(Color::rgb(73, 153, 115))
    }

    fn can_open(&self) -> bool {
        true
    }

    fn tooltip(&self, base: &str) -> String {
        open_hint(base)
    }

    fn progress_bar(&self) -> Option<&ProgressBar> {
        Some(&self.bar)
    }

    fn handle_event(&mut self, graph: &NodeGraph, event: &BoxedEvent) -> bool {
        match run_phase(event, self.node.id()) {
            Some(RunPhase::Started) => {
                self.animating = true;
                self.collect_child_nodes(graph);
            }
            Some(RunPhase::Progress(id)) if self.is_child(id) => {}
            Some(RunPhase::Ended) => self.animating = false,
            _ => return false,
        }
        self.node_changed();
        true
    }
}

#[enum_dispatch(NodeUi)]
#[derive(Debug, Clone)]
pub enum NodeUiKind {
    ForLoopNodeUi,
    CollapsedNodeUi,
    ExecutableNodeUi,
    CollapsedExecutableNodeUi,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunId;
    use crate::entities::keys::{T_COLLAPSED, T_COLLAPSED_EXECUTABLE, T_EXECUTABLE, T_NODE};

    #[test]
    fn test_progress_bar_colors() {
        assert_eq!(ProgressBar::for_state(ProgressState::Clean).color, Color::rgb(0, 255, 191));
        assert_eq!(ProgressBar::for_state(ProgressState::Queued).color, Color::rgb(230, 255, 102));
        let err = ProgressBar::for_state(ProgressState::Error);
        assert_eq!(err.color, Color::rgb(189, 0, 47));
        assert_eq!(err.text, "error");
    }

    #[test]
    fn test_executable_ui_follows_events() {
        let mut g = NodeGraph::new();
        let n = g.add_node("exe", "ExecutableNode", &[T_NODE, T_EXECUTABLE]);
        let mut ui = ExecutableNodeUi::new(g.node(n).unwrap());
        assert_eq!(ui.progress_bar().unwrap().text, "dirty");

        let run = RunId::new();
        let started: BoxedEvent = Box::new(RunStartedEvent {
            run,
            target: n,
            nodes: vec![n],
        });
        g.node(n).unwrap().state().set_progress(ProgressState::Queued);
        assert!(ui.handle_event(&g, &started));
        assert!(ui.is_animating());
        assert_eq!(ui.progress_bar().unwrap().text, "queued");

        // Other nodes' progress is ignored
        let other: BoxedEvent = Box::new(NodeProgressChangedEvent {
            node: NodeId::new(),
            state: ProgressState::Clean,
        });
        assert!(!ui.handle_event(&g, &other));

        g.node(n).unwrap().state().set_progress(ProgressState::Clean);
        let finished: BoxedEvent = Box::new(RunFinishedEvent {
            run,
            target: n,
            nodes: vec![n],
        });
        assert!(ui.handle_event(&g, &finished));
        assert!(!ui.is_animating());
        assert_eq!(ui.progress_bar().unwrap().color, ProgressBar::CLEAN);
    }

    #[test]
    fn test_collapsed_executable_summary() {
        let mut g = NodeGraph::new();
        let boxed = g.add_node("box", "CollapsedExecutableNode", &[T_NODE, T_COLLAPSED, T_COLLAPSED_EXECUTABLE]);
        let a = g
            .add_child_node(boxed, "a", "ExecutableNode", &[T_NODE, T_EXECUTABLE])
            .unwrap();
        let b = g
            .add_child_node(boxed, "b", "ExecutableNode", &[T_NODE, T_EXECUTABLE])
            .unwrap();
        g.add_child_node(boxed, "plain", "Node", &[T_NODE]).unwrap();

        let mut ui = CollapsedExecutableNodeUi::new(&g, g.node(boxed).unwrap());
        assert_eq!(ui.progress_bar().unwrap().text, "dirty");

        g.node(a).unwrap().state().set_progress(ProgressState::Processing);
        ui.node_changed();
        let bar = ui.progress_bar().unwrap();
        assert_eq!(bar.text, "nodes 2");
        assert_eq!(bar.color, ProgressBar::BUSY);

        g.node(a).unwrap().state().set_progress(ProgressState::Clean);
        g.node(b).unwrap().state().set_progress(ProgressState::Clean);
        ui.node_changed();
        assert_eq!(ui.progress_bar().unwrap().text, "clean");
    }

    #[test]
    fn test_tooltips_and_colors() {
        assert_eq!(CollapsedNodeUi.tooltip("box"), "box\n\n(double click to open)");
        assert!(ForLoopNodeUi.can_open());
        assert_eq!(ForLoopNodeUi.tooltip("loop"), "loop");
        assert_eq!(CollapsedNodeUi.color(), Some(Color::rgb(0, 204, 255)));
    }
}
