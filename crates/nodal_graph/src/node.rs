// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::component::{NodeId, PlugId};
use crate::document::Document;
use crate::plug::PlugSpec;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Error returned by a failing [`DependencyProvider::affects`]
pub type AffectsError = Box<dyn std::error::Error + Send + Sync>;

/// Declares how a node's plugs depend on each other.
///
/// Implementations must not mutate the document; they are called while
/// dirtiness is being propagated.
pub trait DependencyProvider: Send + Sync {
    /// Leaf output plugs of `node` whose computed value depends on `plug`.
    ///
    /// May be called with any plug of the node, including outputs.
    fn affects(&self, doc: &Document, node: NodeId, plug: PlugId)
        -> Result<Vec<PlugId>, AffectsError>;

    /// Veto a connection to one of the node's plugs
    fn accepts_input(&self, doc: &Document, node: NodeId, plug: PlugId, input: PlugId) -> bool {
        let _ = (doc, node, plug, input);
        true
    }
}

/// Provider for nodes whose plugs affect nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

impl DependencyProvider for NoDependencies {
    fn affects(&self, _: &Document, _: NodeId, _: PlugId) -> Result<Vec<PlugId>, AffectsError> {
        Ok(Vec::new())
    }
}

/// Node-specific component data
#[derive(Clone)]
pub struct NodeData {
    pub(crate) type_id: String,
    pub(crate) provider: Arc<dyn DependencyProvider>,
}

impl NodeData {
    pub(crate) fn new(type_id: impl Into<String>, provider: Arc<dyn DependencyProvider>) -> Self {
        Self {
            type_id: type_id.into(),
            provider,
        }
    }

    /// Node type ID
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Dependency provider
    pub fn provider(&self) -> &Arc<dyn DependencyProvider> {
        &self.provider
    }
}

impl fmt::Debug for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeData")
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

/// Node type definition
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Plugs created on every instance
    pub plugs: Vec<PlugSpec>,
    /// Creates the provider for a new instance
    pub provider: fn() -> Arc<dyn DependencyProvider>,
}

/// Registry of available node types
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a node type, replacing any type with the same ID
    pub fn register(&mut self, node_type: NodeType) {
        if let Some(previous) = self.types.insert(node_type.id.clone(), node_type) {
            tracing::debug!("Replaced node type \"{}\"", previous.id);
        }
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plug::PlugType;

    fn no_dependencies() -> Arc<dyn DependencyProvider> {
        Arc::new(NoDependencies)
    }

    fn node_type(id: &str, plugs: usize) -> NodeType {
        NodeType {
            id: id.to_string(),
            plugs: (0..plugs)
                .map(|i| PlugSpec::input(format!("in{i}"), PlugType::Any))
                .collect(),
            provider: no_dependencies,
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = NodeRegistry::new();
        assert!(registry.is_empty());
        registry.register(node_type("Sink", 1));
        registry.register(node_type("Gate", 2));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Sink").map(|t| t.plugs.len()), Some(1));
        assert!(registry.get("Missing").is_none());
        let ids: Vec<_> = registry.types().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["Sink", "Gate"]);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = NodeRegistry::new();
        registry.register(node_type("Sink", 1));
        registry.register(node_type("Sink", 3));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Sink").map(|t| t.plugs.len()), Some(3));
    }
}
