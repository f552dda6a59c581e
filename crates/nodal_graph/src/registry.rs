// SPDX-License-Identifier: MIT OR Apache-2.0
//! Process-wide node type registry.
//!
//! The registry is created on first use with the built-in node types
//! already registered. Types added later stay registered for the lifetime
//! of the process; nothing clears it.

use crate::node::{NodeRegistry, NodeType};
use crate::nodes;
use parking_lot::RwLock;
use std::sync::LazyLock;

static GLOBAL: LazyLock<RwLock<NodeRegistry>> = LazyLock::new(|| {
    let mut registry = NodeRegistry::new();
    nodes::register_builtin(&mut registry);
    tracing::debug!("Node registry created with {} built-in types", registry.len());
    RwLock::new(registry)
});

/// The process-wide registry
pub fn global() -> &'static RwLock<NodeRegistry> {
    &GLOBAL
}

/// Register a node type with the process-wide registry
pub fn register(node_type: NodeType) {
    GLOBAL.write().register(node_type);
}

/// Whether a type is registered with the process-wide registry
pub fn contains(type_id: &str) -> bool {
    GLOBAL.read().get(type_id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{DependencyProvider, NoDependencies};
    use crate::plug::{PlugSpec, PlugType};
    use std::sync::Arc;

    fn sink_provider() -> Arc<dyn DependencyProvider> {
        Arc::new(NoDependencies)
    }

    #[test]
    fn test_builtins_registered() {
        assert!(contains("Add"));
        assert!(contains("Dot"));
        assert!(contains("Switch"));
    }

    #[test]
    fn test_register_custom_type() {
        register(NodeType {
            id: "RegistryTestSink".to_string(),
            plugs: vec![PlugSpec::input("in", PlugType::Any)],
            provider: sink_provider,
        });
        assert!(contains("RegistryTestSink"));
    }
}
