// SPDX-License-Identifier: MIT OR Apache-2.0
//! Components of the ownership tree.

use crate::error::GraphError;
use crate::node::NodeData;
use crate::plug::PlugData;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub Uuid);

/// Identifier of a component known to be a node
pub type NodeId = ComponentId;

/// Identifier of a component known to be a plug
pub type PlugId = ComponentId;

impl ComponentId {
    /// Create a new random component ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a component can be observed yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Created but never parented under a live component.
    ///
    /// Edits apply directly: nothing is recorded, emitted or dirtied.
    #[default]
    Constructing,
    /// Part of (or once part of) the document tree
    Live,
}

/// What a component is
#[derive(Debug)]
pub enum ComponentKind {
    /// The document root
    Root,
    /// A node owning plugs
    Node(NodeData),
    /// A connection endpoint
    Plug(PlugData),
}

/// A named entry in the ownership tree
#[derive(Debug)]
pub struct Component {
    pub(crate) id: ComponentId,
    pub(crate) name: String,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<ComponentId>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) kind: ComponentKind,
}

impl Component {
    pub(crate) fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            id: ComponentId::new(),
            name: name.into(),
            parent: None,
            children: Vec::new(),
            lifecycle: Lifecycle::Constructing,
            kind,
        }
    }

    /// Component ID
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Name, unique among siblings
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current parent
    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    /// Children in order
    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    /// Lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Whether the component has been parented into the live tree
    pub fn is_live(&self) -> bool {
        self.lifecycle == Lifecycle::Live
    }

    /// Kind-specific data
    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    /// Plug data, if this is a plug
    pub fn as_plug(&self) -> Option<&PlugData> {
        match &self.kind {
            ComponentKind::Plug(plug) => Some(plug),
            _ => None,
        }
    }

    pub(crate) fn as_plug_mut(&mut self) -> Option<&mut PlugData> {
        match &mut self.kind {
            ComponentKind::Plug(plug) => Some(plug),
            _ => None,
        }
    }

    /// Node data, if this is a node
    pub fn as_node(&self) -> Option<&NodeData> {
        match &self.kind {
            ComponentKind::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Whether this is a plug
    pub fn is_plug(&self) -> bool {
        matches!(self.kind, ComponentKind::Plug(_))
    }

    /// Whether this is a node
    pub fn is_node(&self) -> bool {
        matches!(self.kind, ComponentKind::Node(_))
    }

    /// Whether this is the document root
    pub fn is_root(&self) -> bool {
        matches!(self.kind, ComponentKind::Root)
    }
}

/// Check a name against `^[A-Za-z_][A-Za-z_0-9]*$`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split trailing digits off a name.
///
/// Names without a numeric suffix get `default`.
pub(crate) fn numeric_suffix(name: &str, default: u64) -> (&str, u64) {
    let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[prefix.len()..];
    match digits.parse() {
        Ok(suffix) => (prefix, suffix),
        Err(_) => (name, default),
    }
}

/// Make `name` unique among `siblings` by adjusting its numeric suffix.
///
/// Fails when the suffix a unique name needs does not fit in a `u64`.
pub(crate) fn uniquify<'a>(
    name: &str,
    siblings: impl Iterator<Item = &'a str> + Clone,
) -> Result<String, GraphError> {
    if !siblings.clone().any(|s| s == name) {
        return Ok(name.to_string());
    }

    let (prefix, mut suffix) = numeric_suffix(name, 1);
    for sibling in siblings {
        let Some(rest) = sibling.strip_prefix(prefix) else {
            continue;
        };
        // A bare prefix counts as suffix 0
        if rest.is_empty() {
            suffix = suffix.max(1);
        } else if rest.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = rest.parse::<u64>() {
                let next = n
                    .checked_add(1)
                    .ok_or_else(|| GraphError::NameExhausted(name.to_string()))?;
                suffix = suffix.max(next);
            }
        }
    }
    Ok(format!("{prefix}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("op1"));
        assert!(is_valid_name("_private"));
        assert!(is_valid_name("In"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1op"));
        assert!(!is_valid_name("a.b"));
        assert!(!is_valid_name("with space"));
    }

    #[test]
    fn test_numeric_suffix() {
        assert_eq!(numeric_suffix("op12", 1), ("op", 12));
        assert_eq!(numeric_suffix("op", 1), ("op", 1));
        assert_eq!(numeric_suffix("a1b", 0), ("a1b", 0));
    }

    #[test]
    fn test_uniquify() {
        let unique =
            |name: &str, siblings: &[&str]| uniquify(name, siblings.iter().copied()).unwrap();
        assert_eq!(unique("op", &[]), "op");
        assert_eq!(unique("op", &["op"]), "op1");
        assert_eq!(unique("op", &["op", "op1", "op7", "other"]), "op8");
        assert_eq!(unique("op3", &["op3"]), "op4");
        // Non-numeric remainders are ignored
        assert_eq!(unique("node", &["node", "nodeA"]), "node1");
    }

    #[test]
    fn test_uniquify_suffix_overflow() {
        let max = format!("op{}", u64::MAX);
        let siblings = [max.as_str()];
        assert!(matches!(
            uniquify(&max, siblings.iter().copied()),
            Err(GraphError::NameExhausted(name)) if name == max
        ));
        // Suffixes too long to parse cannot collide with the one chosen
        let siblings = ["op", "op99999999999999999999999"];
        assert_eq!(uniquify("op", siblings.iter().copied()).unwrap(), "op1");
    }

    #[test]
    fn test_new_component_is_constructing() {
        let component = Component::new("root", ComponentKind::Root);
        assert_eq!(component.lifecycle(), Lifecycle::Constructing);
        assert!(component.is_root());
        assert!(component.parent().is_none());
        assert!(component.children().is_empty());
    }
}
