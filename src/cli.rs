use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run executable nodes of a graph document and inspect its UI registry
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging to file (default: coraline.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE", global = true)]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the executable nodes a run of NODE would touch, in walk order
    Collect {
        /// Graph document (JSON)
        graph: PathBuf,
        /// Target node name
        node: String,
    },
    /// Resolve a pass-through attribute to the first concrete one
    Resolve {
        /// Graph document (JSON)
        graph: PathBuf,
        /// Attribute as NODE.ATTR
        attribute: String,
    },
    /// Run NODE on a worker thread with the demo execute step
    Run {
        /// Graph document (JSON)
        graph: PathBuf,
        /// Target node name
        node: String,
    },
    /// List the builtin UI registrations
    Registry,
}
