// SPDX-License-Identifier: MIT OR Apache-2.0
//! Switch node.

use crate::component::{NodeId, PlugId};
use crate::document::Document;
use crate::node::{AffectsError, DependencyProvider, NodeType};
use crate::plug::{PlugSpec, PlugType, PlugValue};
use std::sync::Arc;

/// Type ID of the switch node
pub const SWITCH: &str = "Switch";

/// `out` depends on `index` and on every `inN`
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchProvider;

impl SwitchProvider {
    fn is_selector(name: &str) -> bool {
        if name == "index" {
            return true;
        }
        name.strip_prefix("in")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl DependencyProvider for SwitchProvider {
    fn affects(&self, doc: &Document, node: NodeId, plug: PlugId) -> Result<Vec<PlugId>, AffectsError> {
        if doc.parent(plug) != Some(node) || !Self::is_selector(doc.name(plug)?) {
            return Ok(Vec::new());
        }
        Ok(doc.child(node, "out").into_iter().collect())
    }
}

fn switch_provider() -> Arc<dyn DependencyProvider> {
    Arc::new(SwitchProvider)
}

/// Plugs of a switch with `inputs` inputs of `plug_type`
pub fn switch_plugs(inputs: usize, plug_type: PlugType) -> Vec<PlugSpec> {
    let mut plugs = vec![PlugSpec::input("index", PlugType::Int).with_default(PlugValue::Int(0))];
    plugs.extend((0..inputs).map(|i| PlugSpec::input(format!("in{i}"), plug_type)));
    plugs.push(PlugSpec::output("out", plug_type));
    plugs
}

/// Switch node type choosing between `inputs` values of any type
pub fn switch_type(inputs: usize) -> NodeType {
    NodeType {
        id: SWITCH.to_string(),
        plugs: switch_plugs(inputs, PlugType::Any),
        provider: switch_provider,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_names() {
        assert!(SwitchProvider::is_selector("index"));
        assert!(SwitchProvider::is_selector("in0"));
        assert!(SwitchProvider::is_selector("in12"));
        assert!(!SwitchProvider::is_selector("in"));
        assert!(!SwitchProvider::is_selector("out"));
        assert!(!SwitchProvider::is_selector("inner"));
    }

    #[test]
    fn test_inputs_and_index_affect_out() {
        let mut doc = Document::new();
        let root = doc.root();
        let switch = doc
            .add_node("switch", Arc::new(SwitchProvider), &switch_plugs(3, PlugType::Float), Some(root))
            .unwrap();
        let out = doc.child(switch, "out").unwrap();

        for name in ["index", "in0", "in2"] {
            let plug = doc.child(switch, name).unwrap();
            assert_eq!(SwitchProvider.affects(&doc, switch, plug).unwrap(), [out]);
        }
        assert!(SwitchProvider.affects(&doc, switch, out).unwrap().is_empty());
    }
}
