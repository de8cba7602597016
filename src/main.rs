use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};

use coraline::cli::{Args, Command};
use coraline::config;
use coraline::core::{collect, downcast_event, resolve_concrete, NodeProgressChangedEvent, RunFailedEvent};
use coraline::shell::{self, Shell};
use coraline::widgets::attribute_hooks_color;

fn main() -> Result<()> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());

    if let Err(e) = path_config.ensure_dirs() {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    shell::init_logger(args.verbosity, args.log_file.as_ref(), &path_config)?;
    debug!("Command-line args: {:?}", args);
    info!(
        "Config path: {}",
        path_config.config_file(config::SETTINGS_FILE).display()
    );

    let mut shell = Shell::new(shell::load_settings(&path_config));

    match args.command {
        Command::Collect { graph, node } => {
            shell.load_graph(&graph)?;
            let target = shell.node_named(&node)?;
            let walk = collect(&shell.graph, target)?;
            for id in walk.ids() {
                if let Some(n) = shell.graph.node(id) {
                    println!("{}", n.name());
                }
            }
        }
        Command::Resolve { graph, attribute } => {
            shell.load_graph(&graph)?;
            let attr = shell
                .graph
                .find_attribute(&attribute)
                .map(|a| a.id())
                .with_context(|| format!("no attribute '{}'", attribute))?;
            let color = attribute_hooks_color(&shell.graph, shell.registry, attr)
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            match resolve_concrete(&shell.graph, attr).and_then(|id| shell.graph.full_name(id)) {
                Some(name) => println!("{} -> {} (hooks {})", attribute, name, color),
                None => println!("{} -> (unresolved, hooks {})", attribute, color),
            }
        }
        Command::Run { graph, node } => {
            shell.load_graph(&graph)?;
            let target = shell.node_named(&node)?;
            let result = shell.run_and_wait(target);

            for event in shell.process_events() {
                if let Some(e) = downcast_event::<NodeProgressChangedEvent>(&event) {
                    let name = shell.graph.node(e.node).map(|n| n.name()).unwrap_or("?");
                    println!("{:<24} {}", name, e.state);
                } else if let Some(e) = downcast_event::<RunFailedEvent>(&event) {
                    warn!("run {} failed", e.run);
                }
            }
            if let Some(n) = shell.graph.node(target) {
                let log = n.log();
                if !log.is_empty() {
                    println!("--- {} log ---\n{}", n.name(), log);
                }
            }
            result?;
        }
        Command::Registry => {
            let reg = shell.registry;
            println!("{}", reg.name());
            println!("  attribute UIs:");
            for key in reg.attribute_ui_keys() {
                println!("    {}", key);
            }
            println!("  node UIs:");
            for key in reg.node_ui_keys() {
                println!("    {}", key);
            }
            println!("  inspectors:");
            for key in reg.inspector_keys() {
                println!("    {}", key);
            }
        }
    }

    Ok(())
}
