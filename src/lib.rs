//! CORALINE - executable node runner and builtin UI plugin for node graphs
//!
//! Re-exports all modules for use by the binary target.

// Core engine (collector, resolver, runner, events)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod shell;
pub mod widgets;

// Re-export commonly used types from core
pub use core::event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter, RunEventEmitter};
pub use core::{collect, resolve_concrete, GraphError, RunError, RunHandle, Runner, WalkSet};

// Re-export entities
pub use entities::{AttrValue, ExecContext, Execute, NodeGraph, NodeId, ProgressState};
