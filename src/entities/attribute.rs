//! Attribute - graph edge endpoint owned by a node.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::attrs::AttrValue;
use super::node::NodeId;

/// Attribute identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrId(pub Uuid);

impl AttrId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttrId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attribute class, the key the UI registry is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    Numeric,
    String,
    Bool,
    Enum,
    Geo,
    GeoInstanceArray,
    PassThrough,
}

impl AttributeType {
    pub const ALL: [AttributeType; 7] = [
        AttributeType::Numeric,
        AttributeType::String,
        AttributeType::Bool,
        AttributeType::Enum,
        AttributeType::Geo,
        AttributeType::GeoInstanceArray,
        AttributeType::PassThrough,
    ];

    /// Host class name ("NumericAttribute", ...)
    pub fn class_name(&self) -> &'static str {
        match self {
            AttributeType::Numeric => "NumericAttribute",
            AttributeType::String => "StringAttribute",
            AttributeType::Bool => "BoolAttribute",
            AttributeType::Enum => "EnumAttribute",
            AttributeType::Geo => "GeoAttribute",
            AttributeType::GeoInstanceArray => "GeoInstanceArrayAttribute",
            AttributeType::PassThrough => "PassThroughAttribute",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

impl FromStr for AttributeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributeType::ALL
            .into_iter()
            .find(|t| t.class_name() == s)
            .ok_or_else(|| format!("unknown attribute class: {}", s))
    }
}

/// Which side of the node the attribute sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

/// Graph edge endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    id: AttrId,
    name: String,
    parent: NodeId,
    kind: AttributeType,
    direction: Direction,
    /// Upstream connection (at most one)
    #[serde(default)]
    pub(crate) input: Option<AttrId>,
    /// Downstream connections, in connection order
    #[serde(default)]
    pub(crate) outputs: Vec<AttrId>,
    #[serde(default)]
    pub(crate) pass_through: bool,
    #[serde(default)]
    pub(crate) specialization: Vec<String>,
    #[serde(default)]
    pub(crate) value: AttrValue,
}

impl Attribute {
    pub(crate) fn new(
        name: &str,
        parent: NodeId,
        kind: AttributeType,
        direction: Direction,
        value: AttrValue,
    ) -> Self {
        Self {
            id: AttrId::new(),
            name: name.to_string(),
            parent,
            kind,
            direction,
            input: None,
            outputs: Vec::new(),
            pass_through: kind == AttributeType::PassThrough,
            specialization: Vec::new(),
            value,
        }
    }

    pub fn id(&self) -> AttrId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without any "namespace:" prefix
    pub fn short_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Owning node
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn kind(&self) -> AttributeType {
        self.kind
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn input(&self) -> Option<AttrId> {
        self.input
    }

    pub fn outputs(&self) -> &[AttrId] {
        &self.outputs
    }

    pub fn is_pass_through(&self) -> bool {
        self.pass_through
    }

    pub fn specialization(&self) -> &[String] {
        &self.specialization
    }

    pub fn value(&self) -> &AttrValue {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_roundtrip() {
        for t in AttributeType::ALL {
            assert_eq!(t.class_name().parse::<AttributeType>(), Ok(t));
        }
        assert!("VectorAttribute".parse::<AttributeType>().is_err());
    }

    #[test]
    fn test_pass_through_default() {
        let node = NodeId::new();
        let a = Attribute::new("in", node, AttributeType::PassThrough, Direction::Input, AttrValue::Empty);
        let b = Attribute::new("in", node, AttributeType::Numeric, Direction::Input, AttrValue::Int(0));
        assert!(a.is_pass_through());
        assert!(!b.is_pass_through());
    }

    #[test]
    fn test_short_name() {
        let a = Attribute::new(
            "proxy:value",
            NodeId::new(),
            AttributeType::Numeric,
            Direction::Output,
            AttrValue::Empty,
        );
        assert_eq!(a.short_name(), "value");
    }
}
