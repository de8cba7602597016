//! Attribute values carried by graph attributes.
//!
//! Values are only stored and inspected here; computing them is the
//! host engine's job. Inspectors use [`AttrValue::size`] and the variant to
//! decide which edit field to show.

use serde::{Deserialize, Serialize};

/// Generic attribute value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum AttrValue {
    /// Unspecialized / no value yet
    #[default]
    Empty,
    Bool(bool),
    Int(i32),
    Float(f32),
    Str(String),
    Path(String),
    Col4([f32; 4]),
    BoolArray(Vec<bool>),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    Col4Array(Vec<[f32; 4]>),
    StringArray(Vec<String>),
    /// Enumeration: entries plus the selected index
    Enum { entries: Vec<String>, current: usize },
    /// Opaque geometry handle (never inspected)
    Geo,
}

impl AttrValue {
    /// Number of elements held by the value.
    ///
    /// Scalars report 1, arrays their length, `Empty`/`Geo` report 0.
    pub fn size(&self) -> usize {
        use AttrValue::*;
        match self {
            Empty | Geo => 0,
            Bool(_) | Int(_) | Float(_) | Str(_) | Path(_) | Col4(_) | Enum { .. } => 1,
            BoolArray(v) => v.len(),
            IntArray(v) => v.len(),
            FloatArray(v) => v.len(),
            Col4Array(v) => v.len(),
            StringArray(v) => v.len(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            AttrValue::BoolArray(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// Current index of an enum value
    pub fn enum_index(&self) -> Option<usize> {
        match self {
            AttrValue::Enum { current, .. } => Some(*current),
            _ => None,
        }
    }

    /// Entries of an enum value (empty for non-enums)
    pub fn enum_entries(&self) -> &[String] {
        match self {
            AttrValue::Enum { entries, .. } => entries,
            _ => &[],
        }
    }

    /// Build an enum value selecting the first entry
    pub fn enumeration<S: Into<String>>(entries: impl IntoIterator<Item = S>) -> Self {
        AttrValue::Enum {
            entries: entries.into_iter().map(Into::into).collect(),
            current: 0,
        }
    }
}
