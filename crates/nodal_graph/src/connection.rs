// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plug connections.
//!
//! A plug has at most one input and any number of outputs. Compound plugs
//! keep their children's connections in step with their own: connecting a
//! compound connects each child to the matching child of the input, and a
//! compound counts as connected only while every child is connected to the
//! matching child of one common input.

use crate::component::{ComponentId, PlugId};
use crate::dirty::DirtyPropagationScope;
use crate::document::{Document, DocumentAction};
use crate::error::{ConnectionError, GraphError, Rejection};
use crate::plug::{Direction, InputSync, PlugData, PlugFlags};
use crate::signal::PlugInputChanged;
use nodal_history::UndoState;
use std::collections::{HashMap, HashSet};
use tracing::{trace, warn};

/// Results of `check_input`, keyed by (plug, input, arriving indirectly)
type InputMemo = HashMap<(PlugId, PlugId, bool), Result<(), Rejection>>;

impl Document {
    /// Input of a plug
    pub fn input(&self, plug: PlugId) -> Option<PlugId> {
        self.plug(plug).ok().and_then(PlugData::input)
    }

    /// Plugs using `plug` as their input
    pub fn outputs(&self, plug: PlugId) -> Vec<PlugId> {
        self.plug(plug)
            .map(|data| data.outputs().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Follow inputs back to the plug that originates the value
    pub fn source(&self, plug: PlugId) -> PlugId {
        let mut visited = HashSet::new();
        let mut current = plug;
        while let Some(input) = self.input(current) {
            if !visited.insert(current) {
                break;
            }
            current = input;
        }
        current
    }

    /// Direction of a plug
    pub fn direction(&self, plug: PlugId) -> Result<Direction, GraphError> {
        Ok(self.plug(plug)?.direction())
    }

    /// Flags of a plug
    pub fn flags(&self, plug: PlugId) -> Result<PlugFlags, GraphError> {
        Ok(self.plug(plug)?.flags())
    }

    /// Replace the flags of a plug
    pub fn set_flags(&mut self, plug: PlugId, flags: PlugFlags) -> Result<(), GraphError> {
        let old = self.flags(plug)?;
        if old == flags {
            return Ok(());
        }
        self.enact(
            plug,
            DocumentAction::new(
                "Set flags",
                move |doc: &mut Document| doc.set_flags_internal(plug, flags),
                move |doc: &mut Document| doc.set_flags_internal(plug, old),
            ),
        )
    }

    /// Turn individual flags on or off
    pub fn set_flag(&mut self, plug: PlugId, flag: PlugFlags, enabled: bool) -> Result<(), GraphError> {
        let mut flags = self.flags(plug)?;
        flags.set(flag, enabled);
        self.set_flags(plug, flags)
    }

    fn set_flags_internal(&mut self, plug: PlugId, flags: PlugFlags) -> Result<(), GraphError> {
        self.plug_mut(plug)?.flags = flags;
        Ok(())
    }

    /// Check whether `plug` would accept `input` without changing anything
    pub fn accepts_input(&self, plug: PlugId, input: Option<PlugId>) -> Result<(), ConnectionError> {
        let mut memo = InputMemo::new();
        self.check_input(plug, input, false, &mut memo)
            .map_err(|reason| ConnectionError {
                plug: self.full_name(plug),
                input: input.map_or_else(|| "<none>".to_string(), |i| self.full_name(i)),
                reason,
            })
    }

    /// `indirect` is set when the input would reach `plug` through one of
    /// its inputs rather than being connected to it directly
    fn check_input(
        &self,
        plug: PlugId,
        input: Option<PlugId>,
        indirect: bool,
        memo: &mut InputMemo,
    ) -> Result<(), Rejection> {
        let data = self.plug(plug).map_err(|_| Rejection::NotAPlug)?;
        if !data.flags().contains(PlugFlags::ACCEPTS_INPUTS) {
            return Err(Rejection::NotAcceptingInputs);
        }
        let Some(input) = input else {
            return Ok(());
        };
        if input == plug {
            return Err(Rejection::SelfConnection);
        }
        // Accepted once already
        if data.input() == Some(input) {
            return Ok(());
        }

        let key = (plug, input, indirect);
        if let Some(result) = memo.get(&key) {
            return result.clone();
        }
        memo.insert(key, Err(Rejection::Cycle));
        let result = self.check_new_input(plug, data, input, indirect, memo);
        memo.insert(key, result.clone());
        result
    }

    fn check_new_input(
        &self,
        plug: PlugId,
        data: &PlugData,
        input: PlugId,
        indirect: bool,
        memo: &mut InputMemo,
    ) -> Result<(), Rejection> {
        if data.flags().contains(PlugFlags::READ_ONLY) {
            return Err(Rejection::ReadOnly);
        }
        let input_data = self.plug(input).map_err(|_| Rejection::NotAPlug)?;
        if !indirect && input_data.direction() == data.direction() {
            return Err(Rejection::SameDirection(data.direction()));
        }
        if !input_data.plug_type().can_connect_to(&data.plug_type()) {
            return Err(Rejection::IncompatibleTypes {
                plug: data.plug_type(),
                input: input_data.plug_type(),
            });
        }

        if let Some(node) = self.node_of(plug) {
            if let Ok(node_data) = self.node(node) {
                if !node_data.provider().accepts_input(self, node, plug, input) {
                    return Err(Rejection::NodeVeto(self.full_name(node)));
                }
            }
        }

        for &output in data.outputs() {
            self.check_input(output, Some(input), true, memo)
                .map_err(|reason| Rejection::OutputVeto {
                    output: self.full_name(output),
                    reason: Box::new(reason),
                })?;
        }

        let children = self.children(plug);
        let input_children = self.children(input);
        if children.len() > input_children.len() {
            return Err(Rejection::ChildCountMismatch {
                plug: children.len(),
                input: input_children.len(),
            });
        }
        for (&child, &input_child) in children.iter().zip(input_children) {
            self.check_input(child, Some(input_child), indirect, memo)
                .map_err(|reason| Rejection::ChildRejected {
                    child: self.full_name(child),
                    input: self.full_name(input_child),
                    reason: Box::new(reason),
                })?;
        }
        Ok(())
    }

    /// Connect `plug` to `input`, or disconnect it with `None`.
    ///
    /// Children are connected to the matching children of the input, and a
    /// parent plug's input is recomputed from its children afterwards.
    /// Connections are validated before anything changes; disconnecting is
    /// never refused.
    pub fn set_input(&mut self, plug: PlugId, input: Option<PlugId>) -> Result<(), GraphError> {
        self.set_input_ext(plug, input, true, true)
    }

    pub(crate) fn set_input_ext(
        &mut self,
        plug: PlugId,
        input: Option<PlugId>,
        set_child_inputs: bool,
        update_parent_input: bool,
    ) -> Result<(), GraphError> {
        let current = self.plug(plug)?.input();
        if input == current
            && (input.is_some() || !set_child_inputs || self.all_descendant_inputs_none(plug))
        {
            return Ok(());
        }
        if input.is_some() {
            self.accepts_input(plug, input)?;
        }

        let _scope = DirtyPropagationScope::new();

        if set_child_inputs {
            let children = self.children(plug).to_vec();
            match input {
                Some(input) => {
                    let input_children = self.children(input).to_vec();
                    for (child, input_child) in children.into_iter().zip(input_children) {
                        self.set_input_ext(child, Some(input_child), true, false)?;
                    }
                }
                None => {
                    for child in children {
                        self.set_input_ext(child, None, true, false)?;
                    }
                }
            }
        }

        if input != current {
            self.enact(
                plug,
                DocumentAction::new(
                    "Set input",
                    move |doc: &mut Document| doc.set_input_internal(plug, input),
                    move |doc: &mut Document| doc.set_input_internal(plug, current),
                ),
            )?;
        }

        if update_parent_input {
            if let Some(parent) = self.parent(plug).filter(|&p| self.is_plug(p)) {
                self.update_input_from_child_inputs(parent, Some(plug))?;
            }
        }
        Ok(())
    }

    fn set_input_internal(&mut self, plug: PlugId, input: Option<PlugId>) -> Result<(), GraphError> {
        if let Some(input) = input {
            self.plug(input)?;
        }
        let previous = std::mem::replace(&mut self.plug_mut(plug)?.input, input);
        if let Some(previous) = previous {
            if let Ok(data) = self.plug_mut(previous) {
                data.outputs.shift_remove(&plug);
            }
        }
        if let Some(input) = input {
            self.plug_mut(input)?.outputs.insert(plug);
        }

        if self.is_live(plug) {
            self.emit_input_changed(plug);
            self.propagate_dirtiness(plug);
        }
        Ok(())
    }

    /// Report an input change on `plug` and on everything downstream of it
    fn emit_input_changed(&self, plug: PlugId) {
        let mut visited = HashSet::new();
        let mut pending = vec![plug];
        while let Some(plug) = pending.pop() {
            if !visited.insert(plug) {
                continue;
            }
            let Ok(data) = self.plug(plug) else {
                continue;
            };
            self.signals().plug_input_changed.emit(&PlugInputChanged {
                plug,
                input: data.input(),
                node: self.node_of(plug),
                name: self.full_name(plug),
            });
            pending.extend(data.outputs().iter().rev());
        }
    }

    fn all_descendant_inputs_none(&self, plug: PlugId) -> bool {
        self.descendants(plug)
            .into_iter()
            .all(|child| self.input(child).is_none())
    }

    /// Connect a compound to the common parent of its children's inputs, or
    /// disconnect it if there is none.
    ///
    /// `check_first` is the child whose input is looked at to find the
    /// candidate parent; it may be a plug about to become a child.
    fn update_input_from_child_inputs(
        &mut self,
        plug: PlugId,
        check_first: Option<PlugId>,
    ) -> Result<(), GraphError> {
        let data = self.plug_mut(plug)?;
        if data.input_sync == InputSync::SkipNext {
            data.input_sync = InputSync::Auto;
            return Ok(());
        }

        let children = self.children(plug).to_vec();
        if children.is_empty() {
            return Ok(());
        }
        let Some(first) = check_first.or_else(|| children.first().copied()) else {
            return Ok(());
        };

        let common = self
            .input(first)
            .and_then(|input| self.parent(input))
            .filter(|&parent| self.is_plug(parent))
            .filter(|&parent| {
                let candidates = self.children(parent);
                candidates.len() == children.len()
                    && children
                        .iter()
                        .zip(candidates)
                        .all(|(&child, &candidate)| self.input(child) == Some(candidate))
            })
            .filter(|&parent| self.accepts_input(plug, Some(parent)).is_ok());

        self.set_input_ext(plug, common, false, true)
    }

    /// Disconnect every output of `plug` and of its descendants
    pub fn remove_outputs(&mut self, plug: PlugId) -> Result<(), GraphError> {
        for output in self.outputs(plug) {
            self.set_input(output, None)?;
        }
        for child in self.children(plug).to_vec() {
            self.remove_outputs(child)?;
        }
        Ok(())
    }

    /// Apply `f` with the plug's input sync set to skip, restoring it after
    fn without_input_sync<R>(
        &mut self,
        plug: PlugId,
        f: impl FnOnce(&mut Self) -> Result<R, GraphError>,
    ) -> Result<R, GraphError> {
        self.plug_mut(plug)?.input_sync = InputSync::SkipNext;
        let result = f(self);
        self.plug_mut(plug)?.input_sync = InputSync::Auto;
        result
    }

    /// Keep connections consistent as a plug moves in the tree.
    ///
    /// Leaving a parent disconnects the plug, removes the counterparts
    /// mirroring it on outputs of the old parent, and disconnects its
    /// outputs. Joining a compound parent adds a counterpart to every
    /// output of the new parent so the parent's connections survive.
    /// Replay skips all of this; the consequences were recorded as
    /// separate actions the first time.
    pub(crate) fn plug_parent_changing(
        &mut self,
        plug: PlugId,
        new_parent: Option<ComponentId>,
    ) -> Result<(), GraphError> {
        if self.node_of(plug).is_some() {
            self.propagate_dirtiness_at_leaves(plug);
        }
        if self.current_action_stage().is_replay() {
            return Ok(());
        }

        match new_parent {
            None => {
                self.set_input(plug, None)?;
                if let Some(old_parent) = self.parent(plug).filter(|&p| self.is_plug(p)) {
                    for output in self.outputs(plug) {
                        let Some(output_parent) = self.parent(output).filter(|&p| self.is_plug(p))
                        else {
                            continue;
                        };
                        if self.input(output_parent) == Some(old_parent) {
                            self.without_input_sync(output_parent, |doc| {
                                doc.remove_child(output_parent, output)
                            })?;
                        }
                    }
                }
                self.remove_outputs(plug)
            }
            Some(parent) if self.is_plug(parent) => {
                self.update_input_from_child_inputs(parent, Some(plug))?;

                let name = self.name(plug)?.to_string();
                for output in self.outputs(parent) {
                    let counterpart = self.create_counterpart(plug, &name, self.direction(output)?)?;
                    if !self.accepts_child(output, counterpart) {
                        trace!(
                            "\"{}\" does not accept a counterpart of \"{}\"",
                            self.full_name(output),
                            self.full_name(plug)
                        );
                        continue;
                    }
                    self.without_input_sync(output, |doc| doc.add_child(output, counterpart))?;
                    self.set_input_ext(counterpart, Some(plug), true, false)?;
                }
                Ok(())
            }
            Some(_) => Ok(()),
        }
    }

    /// Mirror a new child order onto every output and dirty the leaves.
    ///
    /// `original_indices[i]` is the old position of the child now at `i`.
    pub(crate) fn plug_children_reordered(
        &mut self,
        plug: PlugId,
        original_indices: &[usize],
    ) -> Result<(), GraphError> {
        // The outputs are reordered again by replay, so none of this is
        // recorded
        self.history.push_state(UndoState::Disabled, None);
        let result = self.reorder_outputs(plug, original_indices);
        self.history.pop_state()?;
        result?;

        self.propagate_dirtiness_at_leaves(plug);
        Ok(())
    }

    fn reorder_outputs(&mut self, plug: PlugId, original_indices: &[usize]) -> Result<(), GraphError> {
        for output in self.outputs(plug) {
            let children = self.children(output).to_vec();
            if children.len() != original_indices.len() {
                warn!(
                    "Not reordering children of \"{}\" to match \"{}\": different number of children",
                    self.full_name(output),
                    self.full_name(plug)
                );
                continue;
            }
            let order: Vec<ComponentId> = original_indices
                .iter()
                .filter_map(|&index| children.get(index).copied())
                .collect();
            self.reorder_children(output, &order)?;
        }
        Ok(())
    }
}
