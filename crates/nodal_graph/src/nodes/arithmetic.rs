// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arithmetic nodes.

use crate::component::{NodeId, PlugId};
use crate::document::Document;
use crate::node::{AffectsError, DependencyProvider, NodeType};
use crate::plug::{PlugSpec, PlugType, PlugValue};
use std::sync::Arc;

/// Type ID of the add node
pub const ADD: &str = "Add";

/// `sum` depends on `op1` and `op2`
#[derive(Debug, Clone, Copy, Default)]
pub struct AddProvider;

impl DependencyProvider for AddProvider {
    fn affects(&self, doc: &Document, node: NodeId, plug: PlugId) -> Result<Vec<PlugId>, AffectsError> {
        if doc.parent(plug) != Some(node) || !matches!(doc.name(plug)?, "op1" | "op2") {
            return Ok(Vec::new());
        }
        let sum = doc.child(node, "sum").ok_or("add node has no \"sum\" plug")?;
        Ok(vec![sum])
    }
}

fn add_provider() -> Arc<dyn DependencyProvider> {
    Arc::new(AddProvider)
}

/// Add node type: `op1 + op2 -> sum`
pub fn add_type() -> NodeType {
    NodeType {
        id: ADD.to_string(),
        plugs: vec![
            PlugSpec::input("op1", PlugType::Int).with_default(PlugValue::Int(0)),
            PlugSpec::input("op2", PlugType::Int).with_default(PlugValue::Int(0)),
            PlugSpec::output("sum", PlugType::Int).with_default(PlugValue::Int(0)),
        ],
        provider: add_provider,
    }
}
