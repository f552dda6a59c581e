// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pass-through node.
//!
//! A dot forwards `in` to `out`. When the plugs are compounds, each leaf
//! under `in` affects the leaf at the same relative path under `out`.

use crate::component::{NodeId, PlugId};
use crate::document::Document;
use crate::node::{AffectsError, DependencyProvider, NodeType};
use crate::plug::{Direction, PlugSpec, PlugType};
use std::sync::Arc;

/// Type ID of the dot node
pub const DOT: &str = "Dot";

/// `out` (or its matching leaf) depends on `in` (or its leaf)
#[derive(Debug, Clone, Copy, Default)]
pub struct DotProvider;

impl DependencyProvider for DotProvider {
    fn affects(&self, doc: &Document, node: NodeId, plug: PlugId) -> Result<Vec<PlugId>, AffectsError> {
        let (Some(input), Some(output)) = (doc.child(node, "in"), doc.child(node, "out")) else {
            return Ok(Vec::new());
        };
        if plug == input {
            return Ok(vec![output]);
        }
        if !doc.is_ancestor_of(input, plug) {
            return Ok(Vec::new());
        }
        let path = doc.relative_name(plug, Some(input));
        Ok(doc.descendant(output, &path).into_iter().collect())
    }
}

fn dot_provider() -> Arc<dyn DependencyProvider> {
    Arc::new(DotProvider)
}

/// `in` and `out` plugs shaped like `template`
pub fn dot_plugs(template: &PlugSpec) -> Vec<PlugSpec> {
    let mirror = |name: &str, direction: Direction| {
        let mut spec = if template.children.is_empty() {
            PlugSpec::new(name, template.plug_type, direction)
        } else {
            PlugSpec::compound(name, direction, template.children.iter().cloned())
        };
        spec.default_value = template.default_value.clone();
        spec
    };
    vec![mirror("in", Direction::In), mirror("out", Direction::Out)]
}

/// Dot node type passing through any value
pub fn dot_type() -> NodeType {
    NodeType {
        id: DOT.to_string(),
        plugs: dot_plugs(&PlugSpec::input("value", PlugType::Any)),
        provider: dot_provider,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_dot() {
        let mut doc = Document::new();
        let root = doc.root();
        let dot = doc.create_node(DOT, "dot", Some(root)).unwrap();
        let input = doc.child(dot, "in").unwrap();
        let output = doc.child(dot, "out").unwrap();

        assert_eq!(DotProvider.affects(&doc, dot, input).unwrap(), [output]);
        assert!(DotProvider.affects(&doc, dot, output).unwrap().is_empty());
    }

    #[test]
    fn test_compound_dot_maps_by_relative_name() {
        let mut doc = Document::new();
        let root = doc.root();
        let template = PlugSpec::compound(
            "color",
            Direction::In,
            [
                PlugSpec::input("r", PlugType::Float),
                PlugSpec::input("g", PlugType::Float),
            ],
        );
        let dot = doc
            .add_node("dot", Arc::new(DotProvider), &dot_plugs(&template), Some(root))
            .unwrap();
        let in_g = doc.descendant(dot, "in.g").unwrap();
        let out_g = doc.descendant(dot, "out.g").unwrap();

        assert_eq!(DotProvider.affects(&doc, dot, in_g).unwrap(), [out_g]);
        assert_eq!(doc.direction(out_g).unwrap(), Direction::Out);
    }
}
