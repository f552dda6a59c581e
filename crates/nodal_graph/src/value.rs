// SPDX-License-Identifier: MIT OR Apache-2.0
//! Static plug values.

use crate::component::PlugId;
use crate::document::{Document, DocumentAction};
use crate::error::{GraphError, ValueError};
use crate::plug::{PlugFlags, PlugValue};
use crate::signal::PlugSet;

impl Document {
    /// Static value of a plug, or its default.
    ///
    /// Connected plugs report their own static value; following the input
    /// is left to whoever computes values.
    pub fn value(&self, plug: PlugId) -> Result<Option<&PlugValue>, GraphError> {
        Ok(self.plug(plug)?.value())
    }

    /// Default value of a plug
    pub fn default_value(&self, plug: PlugId) -> Result<Option<&PlugValue>, GraphError> {
        Ok(self.plug(plug)?.default_value())
    }

    /// Set the static value of an unconnected leaf plug.
    ///
    /// Consecutive edits of the same plug inside one merge group undo as
    /// one.
    pub fn set_value(&mut self, plug: PlugId, value: PlugValue) -> Result<(), GraphError> {
        self.check_settable(plug, Some(&value))?;
        self.store_value(plug, Some(value))
    }

    /// Clear the static value so the default applies again
    pub fn reset_value(&mut self, plug: PlugId) -> Result<(), GraphError> {
        self.check_settable(plug, None)?;
        self.store_value(plug, None)
    }

    fn check_settable(&self, plug: PlugId, value: Option<&PlugValue>) -> Result<(), GraphError> {
        let data = self.plug(plug)?;
        if !self.children(plug).is_empty() {
            return Err(ValueError::Compound(self.full_name(plug)).into());
        }
        if data.input().is_some() {
            return Err(ValueError::HasInput(self.full_name(plug)).into());
        }
        if data.flags().contains(PlugFlags::READ_ONLY) {
            return Err(ValueError::ReadOnly(self.full_name(plug)).into());
        }
        if let Some(value) = value {
            if !value.plug_type().can_connect_to(&data.plug_type()) {
                return Err(ValueError::TypeMismatch {
                    plug: self.full_name(plug),
                    expected: data.plug_type(),
                    found: value.plug_type(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn store_value(&mut self, plug: PlugId, value: Option<PlugValue>) -> Result<(), GraphError> {
        let previous = self.plug(plug)?.value.clone();
        if previous == value {
            return Ok(());
        }
        self.enact(
            plug,
            DocumentAction::new(
                "Set value",
                move |doc: &mut Document| doc.set_value_internal(plug, value.clone()),
                move |doc: &mut Document| doc.set_value_internal(plug, previous.clone()),
            )
            .with_merge_key(format!("set_value:{plug}")),
        )
    }

    fn set_value_internal(&mut self, plug: PlugId, value: Option<PlugValue>) -> Result<(), GraphError> {
        self.plug_mut(plug)?.value = value;
        if self.is_live(plug) {
            self.signals().plug_set.emit(&PlugSet {
                plug,
                node: self.node_of(plug),
                name: self.full_name(plug),
            });
            self.propagate_dirtiness(plug);
        }
        Ok(())
    }
}
