// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.

pub mod arithmetic;
pub mod dot;
pub mod switch;

pub use arithmetic::AddProvider;
pub use dot::DotProvider;
pub use switch::SwitchProvider;

use crate::node::NodeRegistry;

/// Register every built-in node type
pub fn register_builtin(registry: &mut NodeRegistry) {
    // ========================================================================
    // Math
    // ========================================================================

    registry.register(arithmetic::add_type());

    // ========================================================================
    // Utility
    // ========================================================================

    registry.register(dot::dot_type());

    // ========================================================================
    // Logic
    // ========================================================================

    registry.register(switch::switch_type(2));
}
