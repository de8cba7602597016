//! Plugin UI registration table.
//!
//! Maps host type identifiers to UI constructors in three tables:
//! attribute UIs, node UIs and inspectors. Keys are enums parsed from the
//! host's type names; names without a variant simply have no registration.
//! The builtin table ("builtinUis") is built once on first use.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use log::{debug, warn};

use super::attribute_ui::{
    AttributeUiKind, BoolAttributeUi, EnumAttributeUi, GeoAttributeUi, GeoInstanceArrayAttributeUi,
    NumericAttributeUi, PassThroughAttributeUi, StringAttributeUi,
};
use super::inspector::{
    AttributeInspectorKind, BoolAttributeInspector, BuildArrayInspector, BuildArrayStringInspector,
    EnumAttributeInspector, ExecutableNodeInspector, GeoInstanceGeneratorInspector, NodeInspectorKind,
    NumericAttributeInspector, ProcessSimulationInspector, RegexInspector, StringAttributeInspector, TimeInspector,
};
use super::node_ui::{CollapsedExecutableNodeUi, CollapsedNodeUi, ExecutableNodeUi, ForLoopNodeUi, NodeUiKind};
use crate::entities::{AttrId, AttributeType, Node, NodeGraph, NodeId};

/// Defines a key enum with its host type names.
macro_rules! ui_keys {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $host:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Host type name
            pub fn host_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $host),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.host_name())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|k| k.host_name() == s)
                    .ok_or_else(|| format!("no {} for '{}'", stringify!($name), s))
            }
        }
    };
}

ui_keys! {
    /// Node types with a custom node UI
    NodeUiKey {
        CollapsedNode => "CollapsedNode",
        ForLoop => "ForLoop",
        ForLoopString => "ForLoop (String)",
        ExecutableNode => "ExecutableNode",
        CollapsedExecutableNode => "CollapsedExecutableNode",
    }
}

ui_keys! {
    /// Attribute classes and node types with a custom inspector
    InspectorKey {
        NumericAttribute => "NumericAttribute",
        StringAttribute => "StringAttribute",
        BoolAttribute => "BoolAttribute",
        EnumAttribute => "EnumAttribute",
        BuildArray => "BuildArray",
        BuildArrayString => "BuildArray (String)",
        Regex => "Regex",
        Time => "Time",
        ProcessSimulation => "ProcessSimulation",
        GeoInstanceGenerator => "GeoInstanceGenerator",
        ExecutableNode => "ExecutableNode",
    }
}

pub type AttributeUiCtor = fn() -> AttributeUiKind;
pub type NodeUiCtor = fn(&NodeGraph, &Node) -> NodeUiKind;

#[derive(Clone, Copy)]
pub enum InspectorCtor {
    Attribute(fn(AttrId) -> AttributeInspectorKind),
    Node(fn(NodeId) -> NodeInspectorKind),
}

impl fmt::Debug for InspectorCtor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectorCtor::Attribute(_) => f.write_str("Attribute(..)"),
            InspectorCtor::Node(_) => f.write_str("Node(..)"),
        }
    }
}

/// A named set of UI registrations.
#[derive(Debug)]
pub struct PluginUi {
    name: String,
    attribute_uis: IndexMap<AttributeType, AttributeUiCtor>,
    node_uis: IndexMap<NodeUiKey, NodeUiCtor>,
    inspectors: IndexMap<InspectorKey, InspectorCtor>,
}

impl PluginUi {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_uis: IndexMap::new(),
            node_uis: IndexMap::new(),
            inspectors: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // === Registration (last one wins) ===

    pub fn register_attribute_ui(&mut self, key: AttributeType, ctor: AttributeUiCtor) {
        if self.attribute_uis.insert(key, ctor).is_some() {
            warn!("{}: attribute UI for {} registered twice", self.name, key);
        }
    }

    pub fn register_node_ui(&mut self, key: NodeUiKey, ctor: NodeUiCtor) {
        if self.node_uis.insert(key, ctor).is_some() {
            warn!("{}: node UI for {} registered twice", self.name, key);
        }
    }

    pub fn register_inspector(&mut self, key: InspectorKey, ctor: InspectorCtor) {
        if self.inspectors.insert(key, ctor).is_some() {
            warn!("{}: inspector for {} registered twice", self.name, key);
        }
    }

    // === Lookup ===

    pub fn attribute_ui(&self, kind: AttributeType) -> Option<AttributeUiKind> {
        self.attribute_uis.get(&kind).map(|ctor| ctor())
    }

    /// Node UI for `node`: its type name first, then its tags from most
    /// derived to base.
    pub fn node_ui(&self, graph: &NodeGraph, node: &Node) -> Option<NodeUiKind> {
        let key = lookup_names(node).find_map(|name| {
            name.parse::<NodeUiKey>()
                .ok()
                .filter(|k| self.node_uis.contains_key(k))
        })?;
        debug!("node UI for '{}': {}", node.name(), key);
        self.node_uis.get(&key).map(|ctor| ctor(graph, node))
    }

    pub fn attribute_inspector(&self, kind: AttributeType, attr: AttrId) -> Option<AttributeInspectorKind> {
        let key = kind.class_name().parse::<InspectorKey>().ok()?;
        match self.inspectors.get(&key)? {
            InspectorCtor::Attribute(ctor) => Some(ctor(attr)),
            InspectorCtor::Node(_) => None,
        }
    }

    /// Node inspector for `node`, same lookup order as [`PluginUi::node_ui`].
    pub fn node_inspector(&self, node: &Node) -> Option<NodeInspectorKind> {
        lookup_names(node).find_map(|name| {
            let key = name.parse::<InspectorKey>().ok()?;
            match self.inspectors.get(&key)? {
                InspectorCtor::Node(ctor) => Some(ctor(node.id())),
                InspectorCtor::Attribute(_) => None,
            }
        })
    }

    // === Listing ===

    pub fn attribute_ui_keys(&self) -> impl Iterator<Item = AttributeType> + '_ {
        self.attribute_uis.keys().copied()
    }

    pub fn node_ui_keys(&self) -> impl Iterator<Item = NodeUiKey> + '_ {
        self.node_uis.keys().copied()
    }

    pub fn inspector_keys(&self) -> impl Iterator<Item = InspectorKey> + '_ {
        self.inspectors.keys().copied()
    }
}

fn lookup_names(node: &Node) -> impl Iterator<Item = &str> {
    std::iter::once(node.type_name()).chain(node.tags().iter().rev().map(String::as_str))
}

/// Build the builtin registration table.
pub fn load_plugin_ui() -> PluginUi {
    let mut plugin = PluginUi::new("builtinUis");

    plugin.register_attribute_ui(AttributeType::GeoInstanceArray, || GeoInstanceArrayAttributeUi.into());
    plugin.register_attribute_ui(AttributeType::Geo, || GeoAttributeUi.into());
    plugin.register_attribute_ui(AttributeType::Numeric, || NumericAttributeUi.into());
    plugin.register_attribute_ui(AttributeType::PassThrough, || PassThroughAttributeUi.into());
    plugin.register_attribute_ui(AttributeType::String, || StringAttributeUi.into());
    plugin.register_attribute_ui(AttributeType::Bool, || BoolAttributeUi.into());
    plugin.register_attribute_ui(AttributeType::Enum, || EnumAttributeUi.into());

    plugin.register_node_ui(NodeUiKey::CollapsedNode, |_, _| CollapsedNodeUi.into());
    plugin.register_node_ui(NodeUiKey::ForLoop, |_, _| ForLoopNodeUi.into());
    plugin.register_node_ui(NodeUiKey::ForLoopString, |_, _| ForLoopNodeUi.into());
    plugin.register_node_ui(NodeUiKey::ExecutableNode, |_, node| ExecutableNodeUi::new(node).into());
    plugin.register_node_ui(NodeUiKey::CollapsedExecutableNode, |graph, node| {
        CollapsedExecutableNodeUi::new(graph, node).into()
    });

    use InspectorCtor as Ctor;
    plugin.register_inspector(
        InspectorKey::NumericAttribute,
        Ctor::Attribute(|a| NumericAttributeInspector::new(a).into()),
    );
    plugin.register_inspector(
        InspectorKey::StringAttribute,
        Ctor::Attribute(|a| StringAttributeInspector::new(a).into()),
    );
    plugin.register_inspector(InspectorKey::BoolAttribute, Ctor::Attribute(|a| BoolAttributeInspector::new(a).into()));
    plugin.register_inspector(InspectorKey::BuildArray, Ctor::Node(|n| BuildArrayInspector::new(n).into()));
    plugin.register_inspector(InspectorKey::BuildArrayString, Ctor::Node(|n| BuildArrayStringInspector::new(n).into()));
    plugin.register_inspector(InspectorKey::Regex, Ctor::Node(|n| RegexInspector::new(n).into()));
    plugin.register_inspector(InspectorKey::Time, Ctor::Node(|n| TimeInspector::new(n).into()));
    plugin.register_inspector(InspectorKey::EnumAttribute, Ctor::Attribute(|a| EnumAttributeInspector::new(a).into()));
    plugin.register_inspector(
        InspectorKey::ProcessSimulation,
        Ctor::Node(|n| ProcessSimulationInspector::new(n).into()),
    );
    plugin.register_inspector(
        InspectorKey::GeoInstanceGenerator,
        Ctor::Node(|n| GeoInstanceGeneratorInspector::new(n).into()),
    );
    plugin.register_inspector(InspectorKey::ExecutableNode, Ctor::Node(|n| ExecutableNodeInspector::new(n).into()));

    plugin
}

static BUILTIN_UIS: LazyLock<PluginUi> = LazyLock::new(load_plugin_ui);

/// The builtin table, built on first access.
pub fn builtin_uis() -> &'static PluginUi {
    &BUILTIN_UIS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::keys::{T_COLLAPSED, T_COLLAPSED_EXECUTABLE, T_EXECUTABLE, T_NODE};
    use crate::widgets::inspector::NodeInspector;
    use crate::widgets::node_ui::NodeUi;

    #[test]
    fn test_builtin_table_contents() {
        let reg = builtin_uis();
        assert_eq!(reg.name(), "builtinUis");
        assert_eq!(reg.attribute_ui_keys().count(), 7);
        assert_eq!(reg.node_ui_keys().count(), 5);
        assert_eq!(reg.inspector_keys().count(), 11);
        assert!(reg.attribute_ui(AttributeType::Enum).is_some());
    }

    #[test]
    fn test_host_names_parse() {
        assert_eq!("ForLoop (String)".parse::<NodeUiKey>(), Ok(NodeUiKey::ForLoopString));
        assert_eq!("BuildArray (String)".parse::<InspectorKey>(), Ok(InspectorKey::BuildArrayString));
        assert!("Shader".parse::<InspectorKey>().is_err());
        assert_eq!(InspectorKey::Time.to_string(), "Time");
    }

    #[test]
    fn test_node_ui_lookup_prefers_most_derived() {
        let mut g = NodeGraph::new();
        let boxed = g.add_node(
            "box",
            "CollapsedExecutableNode",
            &[T_NODE, T_COLLAPSED, T_EXECUTABLE, T_COLLAPSED_EXECUTABLE],
        );
        let plain = g.add_node("loop", "ForLoop (String)", &[T_NODE]);
        let custom = g.add_node("sim", "MySim", &[T_NODE, T_EXECUTABLE]);
        let none = g.add_node("add", "Add", &[T_NODE]);

        let reg = builtin_uis();
        let ui = reg.node_ui(&g, g.node(boxed).unwrap()).unwrap();
        assert!(matches!(ui, NodeUiKind::CollapsedExecutableNodeUi(_)));
        let ui = reg.node_ui(&g, g.node(plain).unwrap()).unwrap();
        assert!(ui.can_open());
        let ui = reg.node_ui(&g, g.node(custom).unwrap()).unwrap();
        assert!(matches!(ui, NodeUiKind::ExecutableNodeUi(_)));
        assert!(reg.node_ui(&g, g.node(none).unwrap()).is_none());
    }

    #[test]
    fn test_inspector_lookup() {
        let mut g = NodeGraph::new();
        let regex = g.add_node("re", "Regex", &[T_NODE]);
        let exe = g.add_node("proc", "ProcessSimulation", &[T_NODE, T_EXECUTABLE]);

        let reg = builtin_uis();
        let inspector = reg.node_inspector(g.node(regex).unwrap()).unwrap();
        assert_eq!(inspector.node(), regex);
        // Type name beats the executable tag
        assert!(matches!(
            reg.node_inspector(g.node(exe).unwrap()),
            Some(NodeInspectorKind::ProcessSimulationInspector(_))
        ));
        assert!(reg.attribute_inspector(AttributeType::Geo, AttrId::new()).is_none());
        assert!(reg.attribute_inspector(AttributeType::Enum, AttrId::new()).is_some());
    }

    #[test]
    fn test_duplicate_registration_replaces() {
        let mut plugin = PluginUi::new("test");
        plugin.register_attribute_ui(AttributeType::Geo, || GeoAttributeUi.into());
        plugin.register_attribute_ui(AttributeType::Geo, || StringAttributeUi.into());
        assert_eq!(plugin.attribute_ui_keys().count(), 1);
        assert_eq!(
            plugin.attribute_ui(AttributeType::Geo),
            Some(AttributeUiKind::StringAttributeUi(StringAttributeUi))
        );
    }
}
