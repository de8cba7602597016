//! Shared shell for the binary: logging setup, graph loading, run driving.
//!
//! Holds everything a host editor would own on its UI thread: the graph,
//! the event bus, the runner and the UI registry.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

use crate::config::{self, PathConfig, Settings};
use crate::core::{downcast_event, BoxedEvent, EventBus, NodeProgressChangedEvent, RunEventEmitter, Runner};
use crate::entities::keys::A_FAIL;
use crate::entities::{ExecContext, NodeGraph, NodeId};
use crate::widgets::{builtin_uis, PluginUi};

pub struct Shell {
    pub graph: NodeGraph,
    pub event_bus: EventBus,
    pub runner: Runner,
    pub settings: Settings,
    pub registry: &'static PluginUi,
}

impl Shell {
    pub fn new(settings: Settings) -> Self {
        let event_bus = EventBus::new();
        let runner = Runner::new(RunEventEmitter::from_emitter(event_bus.emitter()), settings.clone());
        Self {
            graph: NodeGraph::new(),
            event_bus,
            runner,
            settings,
            registry: builtin_uis(),
        }
    }

    /// Load a graph document and give its executable nodes the demo
    /// execute step.
    pub fn load_graph(&mut self, path: &Path) -> Result<()> {
        self.graph = NodeGraph::from_json(path)?;
        let n = attach_demo_executors(&self.graph)?;
        info!("Loaded {} ({} nodes, {} executable)", path.display(), self.graph.len(), n);
        Ok(())
    }

    pub fn node_named(&self, name: &str) -> Result<NodeId> {
        self.graph
            .find_node(name)
            .map(|n| n.id())
            .with_context(|| format!("no node named '{}'", name))
    }

    /// Run `target` and block until the worker reports.
    pub fn run_and_wait(&mut self, target: NodeId) -> Result<()> {
        let handle = self.runner.run(&self.graph, target)?;
        debug!("run {} started with {} node(s)", handle.id(), handle.nodes().len());
        handle.wait()?;
        Ok(())
    }

    /// Drain queued bus events, oldest first.
    pub fn process_events(&mut self) -> Vec<BoxedEvent> {
        let events = self.event_bus.poll();
        for event in &events {
            if let Some(e) = downcast_event::<NodeProgressChangedEvent>(event) {
                let name = self.graph.node(e.node).map(|n| n.name()).unwrap_or("<removed>");
                debug!("{} -> {}", name, e.state);
            }
        }
        events
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

/// Demo execute step: logs one line, fails when the node's `fail` input is true.
fn demo_executor(fail: bool) -> impl Fn(&mut ExecContext<'_>) -> Result<()> + Send + Sync {
    move |ctx: &mut ExecContext<'_>| {
        if fail {
            return Err(anyhow!("'{}' has its '{}' flag set", ctx.name(), A_FAIL))
                .with_context(|| format!("processing {}", ctx.name()));
        }
        ctx.log(format!("processed {}", ctx.name()));
        Ok(())
    }
}

/// Attach [`demo_executor`] to every executable node. Returns how many.
pub fn attach_demo_executors(graph: &NodeGraph) -> Result<usize> {
    let targets: Vec<(NodeId, bool)> = graph
        .nodes()
        .filter(|n| n.is_executable())
        .map(|n| {
            let fail = graph
                .attribute_named(n.id(), A_FAIL)
                .and_then(|a| a.value().as_bool())
                .unwrap_or(false);
            (n.id(), fail)
        })
        .collect();
    for (id, fail) in &targets {
        graph.set_executor(*id, demo_executor(*fail))?;
    }
    Ok(targets.len())
}

/// Initialize env_logger from `-v` count and `--log [FILE]`.
///
/// 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace.
/// Console logging respects RUST_LOG when set.
pub fn init_logger(verbosity: u8, log_file: Option<&Option<PathBuf>>, paths: &PathConfig) -> Result<()> {
    let log_level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = log_file {
        let log_path = log_path_opt
            .clone()
            .unwrap_or_else(|| paths.data_file(config::LOG_FILE));
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        let default_level = log_level.to_string().to_lowercase();
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

/// Load settings from the config dir, falling back to defaults on error.
pub fn load_settings(paths: &PathConfig) -> Settings {
    let path = paths.config_file(config::SETTINGS_FILE);
    Settings::load(&path).unwrap_or_else(|e| {
        warn!("Ignoring settings {}: {:#}", path.display(), e);
        Settings::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunError;
    use crate::entities::keys::{T_EXECUTABLE, T_NODE};
    use crate::entities::{AttrValue, AttributeType, ProgressState};

    fn shell_with(fail: bool) -> (Shell, NodeId) {
        let mut shell = Shell::default();
        let n = shell.graph.add_node("proc", "ExecutableNode", &[T_NODE, T_EXECUTABLE]);
        shell
            .graph
            .add_input_attribute(n, A_FAIL, AttributeType::Bool, AttrValue::Bool(fail))
            .unwrap();
        assert_eq!(attach_demo_executors(&shell.graph).unwrap(), 1);
        (shell, n)
    }

    #[test]
    fn test_demo_run_logs() {
        let (mut shell, n) = shell_with(false);
        shell.run_and_wait(n).unwrap();
        assert_eq!(shell.graph.node(n).unwrap().log(), "processed proc");
        assert!(!shell.process_events().is_empty());
    }

    #[test]
    fn test_demo_run_failure_report() {
        let (mut shell, n) = shell_with(true);
        let err = shell.run_and_wait(n).unwrap_err();
        assert!(matches!(err.downcast_ref::<RunError>(), Some(RunError::Execution { .. })));

        let node = shell.graph.node(n).unwrap();
        assert_eq!(node.progress(), ProgressState::Error);
        assert!(node.log().contains("processing proc"));
        assert!(node.log().contains("flag set"));
    }
}
