//! Attribute UIs: colour and visibility of an attribute's connection hooks.

use enum_dispatch::enum_dispatch;

use super::color::Color;
use super::registry::PluginUi;
use crate::core::resolve_concrete;
use crate::entities::keys::ARRAY_SUFFIX;
use crate::entities::{AttrId, NodeGraph};

/// What a hook colour may depend on.
pub struct HookContext<'a> {
    pub graph: &'a NodeGraph,
    pub registry: &'a PluginUi,
    pub attr: AttrId,
}

#[enum_dispatch]
pub trait AttributeUi {
    /// Hook colour for an attribute carrying `specialization`.
    fn hooks_color(&self, ctx: &HookContext<'_>, specialization: &[String]) -> Color;

    fn hooks_visible(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoInstanceArrayAttributeUi;

impl AttributeUi for GeoInstanceArrayAttributeUi {
    fn hooks_color(&self, _ctx: &HookContext<'_>, _specialization: &[String]) -> Color {
        Color::rgb(240, 230, 250)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoAttributeUi;

impl AttributeUi for GeoAttributeUi {
    fn hooks_color(&self, _ctx: &HookContext<'_>, _specialization: &[String]) -> Color {
        Color::rgb(200, 200, 250)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericAttributeUi;

impl NumericAttributeUi {
    pub const ANY: Color = Color::rgb(255, 255, 95);

    /// Colour of a numeric type prefix ("Int", "Vec3", ...)
    pub fn type_color(prefix: &str) -> Option<Color> {
        match prefix {
            "Any" => Some(Self::ANY),
            "Int" => Some(Color::rgb(255, 107, 109)),
            "Float" => Some(Color::rgb(5, 247, 176)),
            "Vec3" => Some(Color::rgb(0, 120, 255)),
            "Col4" => Some(Color::rgb(88, 228, 255)),
            "Quat" => Some(Color::rgb(0, 255, 0)),
            "Matrix44" => Some(Color::rgb(179, 102, 255)),
            _ => None,
        }
    }
}

impl AttributeUi for NumericAttributeUi {
    fn hooks_color(&self, _ctx: &HookContext<'_>, specialization: &[String]) -> Color {
        match specialization {
            [a, b] => {
                let (pa, pb) = (a.replace(ARRAY_SUFFIX, ""), b.replace(ARRAY_SUFFIX, ""));
                if pa == pb {
                    Self::type_color(&pa).unwrap_or(Self::ANY)
                } else {
                    Self::ANY
                }
            }
            [single] => {
                let prefix = single.replace(ARRAY_SUFFIX, "");
                let color = Self::type_color(&prefix).unwrap_or(Self::ANY);
                if single.ends_with(ARRAY_SUFFIX) {
                    color.lighter(110)
                } else {
                    color
                }
            }
            _ => Self::ANY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringAttributeUi;

impl AttributeUi for StringAttributeUi {
    fn hooks_color(&self, _ctx: &HookContext<'_>, _specialization: &[String]) -> Color {
        Color::rgb(204, 255, 102)
    }
}

/// Bool hooks keep one colour for scalars and arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolAttributeUi;

impl AttributeUi for BoolAttributeUi {
    fn hooks_color(&self, _ctx: &HookContext<'_>, _specialization: &[String]) -> Color {
        Color::rgb(255, 160, 130)
    }
}

/// Enums are edited in the inspector only; no hooks on the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumAttributeUi;

impl AttributeUi for EnumAttributeUi {
    fn hooks_color(&self, _ctx: &HookContext<'_>, _specialization: &[String]) -> Color {
        PassThroughAttributeUi::UNRESOLVED
    }

    fn hooks_visible(&self) -> bool {
        false
    }
}

/// Borrows the colour of the first concrete attribute it is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassThroughAttributeUi;

impl PassThroughAttributeUi {
    pub const UNRESOLVED: Color = Color::rgb(100, 100, 100);
}

impl AttributeUi for PassThroughAttributeUi {
    fn hooks_color(&self, ctx: &HookContext<'_>, _specialization: &[String]) -> Color {
        let Some(own) = ctx.graph.attribute(ctx.attr) else {
            return Self::UNRESOLVED;
        };
        let Some(concrete) = resolve_concrete(ctx.graph, ctx.attr).and_then(|id| ctx.graph.attribute(id)) else {
            return Self::UNRESOLVED;
        };
        let Some(ui) = ctx.registry.attribute_ui(concrete.kind()) else {
            return Self::UNRESOLVED;
        };
        // The concrete UI colours the pass-through's own specialization
        let inner = HookContext {
            graph: ctx.graph,
            registry: ctx.registry,
            attr: concrete.id(),
        };
        ui.hooks_color(&inner, own.specialization())
    }
}

/// Every attribute UI the builtin table can hand out.
#[enum_dispatch(AttributeUi)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeUiKind {
    GeoInstanceArrayAttributeUi,
    GeoAttributeUi,
    NumericAttributeUi,
    PassThroughAttributeUi,
    StringAttributeUi,
    BoolAttributeUi,
    EnumAttributeUi,
}

/// Hook colour of `attr` using the registered UI for its class.
/// `None` when the class has no UI or the attribute is unknown.
pub fn attribute_hooks_color(graph: &NodeGraph, registry: &PluginUi, attr: AttrId) -> Option<Color> {
    let a = graph.attribute(attr)?;
    let ui = registry.attribute_ui(a.kind())?;
    let ctx = HookContext { graph, registry, attr };
    Some(ui.hooks_color(&ctx, a.specialization()))
}
