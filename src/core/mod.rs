//! Core engine modules - collector, resolver, runner, events
//!
//! These modules drive execution of a node graph, independent of UI.

pub mod collector;
pub mod error;
pub mod event_bus;
pub mod resolver;
pub mod run_events;
pub mod runner;

// Re-exports for convenience
pub use collector::{collect, WalkSet};
pub use error::{GraphError, RunError};
pub use event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter, RunEventEmitter};
pub use resolver::resolve_concrete;
pub use run_events::{NodeProgressChangedEvent, RunFailedEvent, RunFinishedEvent, RunId, RunStartedEvent};
pub use runner::{RunHandle, Runner};
