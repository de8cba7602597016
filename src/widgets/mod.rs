//! UI view-models - hook colours, node UIs, inspectors
//!
//! Toolkit-independent: each view-model reads the graph and reacts to
//! EventBus events; drawing is left to the host editor.

pub mod attribute_ui;
pub mod color;
pub mod inspector;
pub mod node_ui;
pub mod registry;

pub use attribute_ui::{attribute_hooks_color, AttributeUi, AttributeUiKind, HookContext};
pub use color::Color;
pub use inspector::{
    Action, AttributeInspector, AttributeInspectorKind, Control, FieldKind, InspectorContext, NodeInspector,
    NodeInspectorKind, RefreshMode, Response,
};
pub use node_ui::{NodeUi, NodeUiKind, ProgressBar};
pub use registry::{builtin_uis, load_plugin_ui, InspectorKey, NodeUiKey, PluginUi};
