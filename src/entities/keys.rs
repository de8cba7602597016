//! Type tag and attribute name constants.
//!
//! Avoid string typos, enable IDE autocomplete.
//! Usage: `node.has_tag(T_EXECUTABLE)`

// === Node type tags ===
/// Base tag carried by every node
pub const T_NODE: &str = "Node";
/// Nodes whose execute step must be explicitly triggered
pub const T_EXECUTABLE: &str = "ExecutableNode";
/// Container node created by collapsing a selection
pub const T_COLLAPSED: &str = "CollapsedNode";
/// Collapsed container that is itself executable
pub const T_COLLAPSED_EXECUTABLE: &str = "CollapsedExecutableNode";

// === Well-known attribute names ===
/// Regex node: operation selector (enum)
pub const A_TYPE: &str = "type";
/// Regex node: capture group (visible for "match")
pub const A_GROUP: &str = "group";
/// Regex node: substitution (visible for "sub")
pub const A_SUB: &str = "sub";
/// Time node: playback toggle
pub const A_PLAY: &str = "play";
/// Demo executor: fail the run when true
pub const A_FAIL: &str = "fail";

// === Specialization names ===
/// Suffix appended to array specializations ("IntArray", "PathArray")
pub const ARRAY_SUFFIX: &str = "Array";
/// String specialization
pub const S_STRING: &str = "String";
/// Path specialization
pub const S_PATH: &str = "Path";
