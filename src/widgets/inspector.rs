//! Inspector view-models: the controls shown for a selected node and the
//! actions behind its buttons.
//!
//! A node inspector lists one control per input attribute (built by the
//! registered attribute inspector for its class) followed by its own
//! buttons. Controls are rebuilt from the graph on every `build()`, so a
//! changed specialization shows up on the next rebuild.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use enum_dispatch::enum_dispatch;
use log::{debug, info};

use super::registry::PluginUi;
use crate::config::Settings;
use crate::core::{downcast_event, resolve_concrete, BoxedEvent, RunFailedEvent, RunFinishedEvent, RunHandle, Runner};
use crate::entities::keys::{A_GROUP, A_PLAY, A_SUB, A_TYPE, S_PATH, S_STRING};
use crate::entities::{AttrId, AttrValue, AttributeType, NodeGraph, NodeId};

/// Edit field flavour for a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Color,
    Bool,
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Field { attr: AttrId, kind: FieldKind },
    Label(String),
    Combo {
        attr: AttrId,
        label: String,
        entries: Vec<String>,
        current: usize,
    },
    Button { action: Action, label: &'static str },
    Toggle { label: &'static str, checked: bool },
    /// Read-only node log
    Log(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    AddInput,
    Play(bool),
    Process,
    Reset,
    SelectEnum { attr: AttrId, index: usize },
}

/// How often the host redraws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Redraw on change only
    Immediate,
    /// Fixed-interval redraw (Time node playing)
    Timed(Duration),
}

#[derive(Debug, Default)]
pub struct Response {
    /// Controls changed; call `build()` again
    pub rebuild: bool,
    pub refresh: Option<RefreshMode>,
}

impl Response {
    fn rebuild() -> Self {
        Self {
            rebuild: true,
            refresh: None,
        }
    }
}

/// Host services an inspector action may use.
pub struct InspectorContext<'a> {
    pub graph: &'a mut NodeGraph,
    pub runner: &'a Runner,
    pub settings: &'a Settings,
}

// === Attribute inspectors ===

#[enum_dispatch]
pub trait AttributeInspector {
    fn attr(&self) -> AttrId;

    fn control(&self, graph: &NodeGraph) -> Control;
}

fn short_label(graph: &NodeGraph, attr: AttrId) -> Control {
    let name = graph.attribute(attr).map(|a| a.short_name()).unwrap_or_default();
    Control::Label(name.to_string())
}

/// Field type follows the value of the resolved concrete attribute;
/// arrays only get a field when they hold a single element.
#[derive(Debug, Clone)]
pub struct NumericAttributeInspector {
    attr: AttrId,
}

impl NumericAttributeInspector {
    pub fn new(attr: AttrId) -> Self {
        Self { attr }
    }

    fn field_kind(value: &AttrValue) -> Option<FieldKind> {
        match value {
            AttrValue::Int(_) => Some(FieldKind::Int),
            AttrValue::Float(_) => Some(FieldKind::Float),
            AttrValue::Col4(_) => Some(FieldKind::Color),
            AttrValue::IntArray(v) if v.len() == 1 => Some(FieldKind::Int),
            AttrValue::FloatArray(v) if v.len() == 1 => Some(FieldKind::Float),
            AttrValue::Col4Array(v) if v.len() == 1 => Some(FieldKind::Color),
            _ => None,
        }
    }
}

impl AttributeInspector for NumericAttributeInspector {
    fn attr(&self) -> AttrId {
        self.attr
    }

    fn control(&self, graph: &NodeGraph) -> Control {
        let kind = resolve_concrete(graph, self.attr)
            .and_then(|id| graph.attribute(id))
            .and_then(|a| Self::field_kind(a.value()));
        match kind {
            // The field edits this attribute, not the one it resolved to
            Some(kind) => Control::Field { attr: self.attr, kind },
            None => short_label(graph, self.attr),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoolAttributeInspector {
    attr: AttrId,
}

impl BoolAttributeInspector {
    pub fn new(attr: AttrId) -> Self {
        Self { attr }
    }
}

impl AttributeInspector for BoolAttributeInspector {
    fn attr(&self) -> AttrId {
        self.attr
    }

    fn control(&self, graph: &NodeGraph) -> Control {
        match graph.attribute(self.attr) {
            Some(a) if a.value().size() == 1 => Control::Field {
                attr: self.attr,
                kind: FieldKind::Bool,
            },
            Some(a) => Control::Label(a.name().to_string()),
            None => Control::Label(String::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StringAttributeInspector {
    attr: AttrId,
}

impl StringAttributeInspector {
    pub fn new(attr: AttrId) -> Self {
        Self { attr }
    }
}

impl AttributeInspector for StringAttributeInspector {
    fn attr(&self) -> AttrId {
        self.attr
    }

    fn control(&self, _graph: &NodeGraph) -> Control {
        Control::Field {
            attr: self.attr,
            kind: FieldKind::String,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumAttributeInspector {
    attr: AttrId,
}

impl EnumAttributeInspector {
    pub fn new(attr: AttrId) -> Self {
        Self { attr }
    }
}

impl AttributeInspector for EnumAttributeInspector {
    fn attr(&self) -> AttrId {
        self.attr
    }

    fn control(&self, graph: &NodeGraph) -> Control {
        let Some(a) = graph.attribute(self.attr) else {
            return Control::Label(String::new());
        };
        Control::Combo {
            attr: self.attr,
            label: format!("{} ", a.name()),
            entries: a.value().enum_entries().to_vec(),
            current: a.value().enum_index().unwrap_or(0),
        }
    }
}

#[enum_dispatch(AttributeInspector)]
#[derive(Debug, Clone)]
pub enum AttributeInspectorKind {
    NumericAttributeInspector,
    BoolAttributeInspector,
    StringAttributeInspector,
    EnumAttributeInspector,
}

/// Write the selected enum index and notify downstream nodes.
pub fn select_enum(graph: &mut NodeGraph, attr: AttrId, index: usize) -> Result<()> {
    let a = graph.attribute(attr).context("select_enum: unknown attribute")?;
    let AttrValue::Enum { entries, .. } = a.value() else {
        bail!("'{}' is not an enum attribute", a.name());
    };
    if index >= entries.len() {
        bail!("enum index {} out of range for '{}' ({} entries)", index, a.name(), entries.len());
    }
    let value = AttrValue::Enum {
        entries: entries.clone(),
        current: index,
    };
    graph.set_value(attr, value)?;
    graph.value_changed(attr)?;
    Ok(())
}

/// One control per input attribute of `node`.
pub fn attribute_controls(graph: &NodeGraph, registry: &PluginUi, node: NodeId) -> Vec<Control> {
    let Some(n) = graph.node(node) else {
        return Vec::new();
    };
    n.inputs()
        .iter()
        .filter_map(|id| graph.attribute(*id))
        .map(|a| match registry.attribute_inspector(a.kind(), a.id()) {
            Some(inspector) => inspector.control(graph),
            None => Control::Label(a.short_name().to_string()),
        })
        .collect()
}

fn control_attr(control: &Control) -> Option<AttrId> {
    match control {
        Control::Field { attr, .. } | Control::Combo { attr, .. } => Some(*attr),
        _ => None,
    }
}

// === Node inspectors ===

#[enum_dispatch]
pub trait NodeInspector {
    fn node(&self) -> NodeId;

    fn build(&mut self, graph: &NodeGraph, registry: &PluginUi) -> Vec<Control> {
        attribute_controls(graph, registry, self.node())
    }

    fn trigger(&mut self, ctx: &mut InspectorContext<'_>, action: Action) -> Result<Response> {
        common_action(ctx, self.node(), action)
    }

    /// React to a bus event; true when controls need a rebuild.
    fn handle_event(&mut self, _graph: &NodeGraph, _event: &BoxedEvent) -> bool {
        false
    }
}

/// Actions every node inspector handles the same way: enum selection.
/// Anything else is ignored.
fn common_action(ctx: &mut InspectorContext<'_>, node: NodeId, action: Action) -> Result<Response> {
    match action {
        Action::SelectEnum { attr, index } => {
            select_enum(ctx.graph, attr, index)?;
            Ok(Response::default())
        }
        other => {
            debug!("inspector for {}: ignored {:?}", node, other);
            Ok(Response::default())
        }
    }
}

/// Add an input named `{prefix}{n}`, n = current input count.
fn add_numbered_input(
    graph: &mut NodeGraph,
    node: NodeId,
    prefix: &str,
    kind: AttributeType,
    value: AttrValue,
) -> Result<AttrId> {
    let n = graph
        .node(node)
        .with_context(|| format!("node {} not found", node))?
        .inputs()
        .len();
    let name = format!("{}{}", prefix, n);
    let id = graph.add_input_attribute(node, &name, kind, value)?;
    info!("added input '{}'", graph.full_name(id).unwrap_or(name));
    Ok(id)
}

/// Builds a numeric array from a growing list of `in{n}` inputs.
#[derive(Debug, Clone)]
pub struct BuildArrayInspector {
    node: NodeId,
}

impl BuildArrayInspector {
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }
}

impl NodeInspector for BuildArrayInspector {
    fn node(&self) -> NodeId {
        self.node
    }

    fn build(&mut self, graph: &NodeGraph, registry: &PluginUi) -> Vec<Control> {
        let mut controls = attribute_controls(graph, registry, self.node);
        controls.push(Control::Button {
            action: Action::AddInput,
            label: "Add Input",
        });
        controls
    }

    fn trigger(&mut self, ctx: &mut InspectorContext<'_>, action: Action) -> Result<Response> {
        match action {
            Action::AddInput => {
                add_numbered_input(ctx.graph, self.node, "in", AttributeType::Numeric, AttrValue::Empty)?;
                Ok(Response::rebuild())
            }
            other => common_action(ctx, self.node, other),
        }
    }
}

/// String flavour: inputs accept String or Path.
#[derive(Debug, Clone)]
pub struct BuildArrayStringInspector {
    node: NodeId,
}

impl BuildArrayStringInspector {
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }
}

impl NodeInspector for BuildArrayStringInspector {
    fn node(&self) -> NodeId {
        self.node
    }

    fn build(&mut self, graph: &NodeGraph, registry: &PluginUi) -> Vec<Control> {
        let mut controls = attribute_controls(graph, registry, self.node);
        controls.push(Control::Button {
            action: Action::AddInput,
            label: "Add Input",
        });
        controls
    }

    fn trigger(&mut self, ctx: &mut InspectorContext<'_>, action: Action) -> Result<Response> {
        if action != Action::AddInput {
            return common_action(ctx, self.node, action);
        }
        let attr = add_numbered_input(
            ctx.graph,
            self.node,
            "in",
            AttributeType::String,
            AttrValue::Str(String::new()),
        )?;
        ctx.graph.set_specialization(attr, [S_STRING, S_PATH])?;
        Ok(Response::rebuild())
    }
}

#[derive(Debug, Clone)]
pub struct ProcessSimulationInspector {
    node: NodeId,
}

impl ProcessSimulationInspector {
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }
}

impl NodeInspector for ProcessSimulationInspector {
    fn node(&self) -> NodeId {
        self.node
    }

    fn build(&mut self, graph: &NodeGraph, registry: &PluginUi) -> Vec<Control> {
        let mut controls = attribute_controls(graph, registry, self.node);
        controls.push(Control::Button {
            action: Action::AddInput,
            label: "Add Input Data",
        });
        controls
    }

    fn trigger(&mut self, ctx: &mut InspectorContext<'_>, action: Action) -> Result<Response> {
        if action != Action::AddInput {
            return common_action(ctx, self.node, action);
        }
        add_numbered_input(ctx.graph, self.node, "data", AttributeType::Numeric, AttrValue::Empty)?;
        Ok(Response::rebuild())
    }
}

#[derive(Debug, Clone)]
pub struct GeoInstanceGeneratorInspector {
    node: NodeId,
}

impl GeoInstanceGeneratorInspector {
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }
}

impl NodeInspector for GeoInstanceGeneratorInspector {
    fn node(&self) -> NodeId {
        self.node
    }

    fn build(&mut self, graph: &NodeGraph, registry: &PluginUi) -> Vec<Control> {
        let mut controls = attribute_controls(graph, registry, self.node);
        controls.push(Control::Button {
            action: Action::AddInput,
            label: "add input geo",
        });
        controls
    }

    fn trigger(&mut self, ctx: &mut InspectorContext<'_>, action: Action) -> Result<Response> {
        if action != Action::AddInput {
            return common_action(ctx, self.node, action);
        }
        add_numbered_input(ctx.graph, self.node, "geo", AttributeType::Geo, AttrValue::Geo)?;
        Ok(Response::rebuild())
    }
}

/// Shows "group" only for match (index 0) and "sub" only for
/// substitute (index 1); index 2 hides both.
#[derive(Debug, Clone)]
pub struct RegexInspector {
    node: NodeId,
    group_visible: bool,
    sub_visible: bool,
}

impl RegexInspector {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            group_visible: true,
            sub_visible: false,
        }
    }

    pub fn group_visible(&self) -> bool {
        self.group_visible
    }

    pub fn sub_visible(&self) -> bool {
        self.sub_visible
    }

    fn update_visibility(&mut self, graph: &NodeGraph) {
        let index = graph
            .attribute_named(self.node, A_TYPE)
            .and_then(|a| a.value().enum_index())
            .unwrap_or(0);
        self.group_visible = index == 0;
        self.sub_visible = index == 1;
    }
}

impl NodeInspector for RegexInspector {
    fn node(&self) -> NodeId {
        self.node
    }

    fn build(&mut self, graph: &NodeGraph, registry: &PluginUi) -> Vec<Control> {
        self.update_visibility(graph);
        let hidden: Vec<AttrId> = [(A_GROUP, self.group_visible), (A_SUB, self.sub_visible)]
            .into_iter()
            .filter(|(_, visible)| !visible)
            .filter_map(|(name, _)| graph.attribute_named(self.node, name).map(|a| a.id()))
            .collect();
        attribute_controls(graph, registry, self.node)
            .into_iter()
            .filter(|c| control_attr(c).is_none_or(|a| !hidden.contains(&a)))
            .collect()
    }

    fn trigger(&mut self, ctx: &mut InspectorContext<'_>, action: Action) -> Result<Response> {
        let Action::SelectEnum { attr, index } = action else {
            return common_action(ctx, self.node, action);
        };
        select_enum(ctx.graph, attr, index)?;
        let is_type = ctx
            .graph
            .attribute_named(self.node, A_TYPE)
            .is_some_and(|a| a.id() == attr);
        if !is_type {
            return Ok(Response::default());
        }
        self.update_visibility(ctx.graph);
        Ok(Response::rebuild())
    }
}

/// Play toggle: a playing Time node needs fixed-interval redraws.
#[derive(Debug, Clone)]
pub struct TimeInspector {
    node: NodeId,
}

impl TimeInspector {
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }

    fn is_playing(&self, graph: &NodeGraph) -> bool {
        graph
            .attribute_named(self.node, A_PLAY)
            .and_then(|a| a.value().as_bool())
            .unwrap_or(false)
    }
}

impl NodeInspector for TimeInspector {
    fn node(&self) -> NodeId {
        self.node
    }

    fn build(&mut self, graph: &NodeGraph, registry: &PluginUi) -> Vec<Control> {
        let mut controls = attribute_controls(graph, registry, self.node);
        controls.push(Control::Toggle {
            label: "Play",
            checked: self.is_playing(graph),
        });
        controls
    }

    fn trigger(&mut self, ctx: &mut InspectorContext<'_>, action: Action) -> Result<Response> {
        let Action::Play(play) = action else {
            return common_action(ctx, self.node, action);
        };
        let attr = ctx
            .graph
            .attribute_named(self.node, A_PLAY)
            .map(|a| a.id())
            .with_context(|| format!("node {} has no '{}' attribute", self.node, A_PLAY))?;
        ctx.graph.set_value(attr, AttrValue::Bool(play))?;
        ctx.graph.value_changed(attr)?;

        let refresh = if play {
            RefreshMode::Timed(ctx.settings.timed_refresh())
        } else {
            RefreshMode::Immediate
        };
        debug!("time node {}: play={} refresh={:?}", self.node, play, refresh);
        Ok(Response {
            rebuild: false,
            refresh: Some(refresh),
        })
    }
}

/// Process and reset buttons plus the node log.
#[derive(Debug)]
pub struct ExecutableNodeInspector {
    node: NodeId,
    log: String,
    run: Option<RunHandle>,
}

impl ExecutableNodeInspector {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            log: String::new(),
            run: None,
        }
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    /// Run started from the process button, until its end event arrives
    pub fn run(&self) -> Option<&RunHandle> {
        self.run.as_ref()
    }

    fn reload_log(&mut self, graph: &NodeGraph) {
        self.log = graph.node(self.node).map(|n| n.log()).unwrap_or_default();
    }
}

impl NodeInspector for ExecutableNodeInspector {
    fn node(&self) -> NodeId {
        self.node
    }

    fn build(&mut self, graph: &NodeGraph, registry: &PluginUi) -> Vec<Control> {
        self.reload_log(graph);
        let mut controls = attribute_controls(graph, registry, self.node);
        controls.push(Control::Button {
            action: Action::Process,
            label: "process",
        });
        controls.push(Control::Button {
            action: Action::Reset,
            label: "reset",
        });
        controls.push(Control::Log(self.log.clone()));
        controls
    }

    fn trigger(&mut self, ctx: &mut InspectorContext<'_>, action: Action) -> Result<Response> {
        match action {
            Action::Process => {
                self.run = Some(ctx.runner.run(ctx.graph, self.node)?);
                Ok(Response::default())
            }
            Action::Reset => {
                let outputs = ctx
                    .graph
                    .node(self.node)
                    .with_context(|| format!("node {} not found", self.node))?
                    .outputs()
                    .to_vec();
                for out in outputs {
                    ctx.graph.value_changed(out)?;
                }
                self.reload_log(ctx.graph);
                Ok(Response::rebuild())
            }
            other => common_action(ctx, self.node, other),
        }
    }

    fn handle_event(&mut self, graph: &NodeGraph, event: &BoxedEvent) -> bool {
        let target = downcast_event::<RunFinishedEvent>(event)
            .map(|e| e.target)
            .or_else(|| downcast_event::<RunFailedEvent>(event).map(|e| e.target));
        if target != Some(self.node) {
            return false;
        }
        if self.run.as_ref().is_some_and(|r| r.target() == self.node) {
            self.run = None;
        }
        self.reload_log(graph);
        true
    }
}

#[enum_dispatch(NodeInspector)]
#[derive(Debug)]
pub enum NodeInspectorKind {
    BuildArrayInspector,
    BuildArrayStringInspector,
    ProcessSimulationInspector,
    GeoInstanceGeneratorInspector,
    RegexInspector,
    TimeInspector,
    ExecutableNodeInspector,
}
