// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ownership tree queries and edits.

use crate::component::{is_valid_name, uniquify, ComponentId, ComponentKind, NodeId, PlugId};
use crate::document::{Document, DocumentAction};
use crate::error::GraphError;
use crate::plug::PlugType;
use crate::signal::{ChildEvent, NameChanged};
use std::collections::HashSet;
use std::iter;

impl Document {
    /// Name of a component
    pub fn name(&self, id: ComponentId) -> Result<&str, GraphError> {
        Ok(self.get(id)?.name())
    }

    /// Dot-separated path from the topmost ancestor down to `id`
    pub fn full_name(&self, id: ComponentId) -> String {
        self.relative_name(id, None)
    }

    /// Dot-separated path from below `ancestor` down to `id`.
    ///
    /// Without an ancestor (or if `ancestor` is not one) this is the full
    /// name.
    pub fn relative_name(&self, id: ComponentId, ancestor: Option<ComponentId>) -> String {
        let Some(component) = self.component(id) else {
            return id.to_string();
        };
        let mut names = vec![component.name()];
        for parent in self.ancestors(id) {
            if Some(parent) == ancestor {
                break;
            }
            if let Some(parent) = self.component(parent) {
                names.push(parent.name());
            }
        }
        names.reverse();
        names.join(".")
    }

    /// Parent of a component
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.component(id).and_then(|c| c.parent())
    }

    /// Ancestors of a component, nearest first
    pub fn ancestors(&self, id: ComponentId) -> impl Iterator<Item = ComponentId> + '_ {
        iter::successors(self.parent(id), move |&parent| self.parent(parent))
    }

    /// Children of a component, in order
    pub fn children(&self, id: ComponentId) -> &[ComponentId] {
        self.component(id).map_or(&[], |c| c.children())
    }

    /// Child with the given name
    pub fn child(&self, parent: ComponentId, name: &str) -> Option<ComponentId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.component(c).is_some_and(|c| c.name() == name))
    }

    /// Descendant at a dot-separated relative path such as `"color.r"`
    pub fn descendant(&self, ancestor: ComponentId, path: &str) -> Option<ComponentId> {
        path.split('.')
            .filter(|name| !name.is_empty())
            .try_fold(ancestor, |current, name| self.child(current, name))
    }

    /// All descendants, depth first, parents before children
    pub fn descendants(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut result = Vec::new();
        let mut pending: Vec<ComponentId> = self.children(id).iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            result.push(id);
            pending.extend(self.children(id).iter().rev());
        }
        result
    }

    /// Position of a component among its siblings
    pub fn index(&self, id: ComponentId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Whether `ancestor` is a strict ancestor of `id`
    pub fn is_ancestor_of(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Nearest node above `id`
    pub fn node_of(&self, id: ComponentId) -> Option<NodeId> {
        self.ancestors(id).find(|&a| self.is_node(a))
    }

    /// Nearest component that is `a` or `b` or an ancestor of both
    pub fn common_ancestor(&self, a: ComponentId, b: ComponentId) -> Option<ComponentId> {
        let lineage: HashSet<ComponentId> = iter::once(a).chain(self.ancestors(a)).collect();
        iter::once(b)
            .chain(self.ancestors(b))
            .find(|c| lineage.contains(c))
    }

    /// Plugs directly owned by a component
    pub fn plugs(&self, id: ComponentId) -> Vec<PlugId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_plug(c))
            .collect()
    }

    /// Whether `parent` would accept `child`
    pub fn accepts_child(&self, parent: ComponentId, child: ComponentId) -> bool {
        let (Some(parent), Some(child)) = (self.component(parent), self.component(child)) else {
            return false;
        };
        match (parent.kind(), child.kind()) {
            (ComponentKind::Root, ComponentKind::Node(_)) => true,
            (ComponentKind::Node(_), ComponentKind::Node(_) | ComponentKind::Plug(_)) => true,
            (ComponentKind::Plug(parent), ComponentKind::Plug(child)) => {
                parent.plug_type() == PlugType::Compound && parent.direction() == child.direction()
            }
            _ => false,
        }
    }

    /// Whether `child` would accept `parent`
    pub fn accepts_parent(&self, child: ComponentId, parent: ComponentId) -> bool {
        let (Some(child), Some(parent)) = (self.component(child), self.component(parent)) else {
            return false;
        };
        matches!(
            (child.kind(), parent.kind()),
            (ComponentKind::Plug(_), ComponentKind::Node(_) | ComponentKind::Plug(_))
                | (ComponentKind::Node(_), ComponentKind::Root | ComponentKind::Node(_))
        )
    }

    fn check_child_accepted(&self, parent: ComponentId, child: ComponentId) -> Result<(), GraphError> {
        self.get(parent)?;
        self.get(child)?;
        if parent == child {
            return Err(GraphError::ParentedToSelf(self.full_name(child)));
        }
        if self.is_ancestor_of(child, parent) {
            return Err(GraphError::AncestorCycle {
                child: self.full_name(child),
                parent: self.full_name(parent),
            });
        }
        if !self.accepts_child(parent, child) {
            return Err(GraphError::ParentRejectsChild {
                parent: self.full_name(parent),
                child: self.full_name(child),
            });
        }
        if !self.accepts_parent(child, parent) {
            return Err(GraphError::ChildRejectsParent {
                child: self.full_name(child),
                parent: self.full_name(parent),
            });
        }
        Ok(())
    }

    fn not_a_child(&self, parent: ComponentId, child: ComponentId) -> GraphError {
        GraphError::NotAChild {
            parent: self.full_name(parent),
            child: self.full_name(child),
        }
    }

    /// Rename a component.
    ///
    /// The name is made unique among its siblings; the name actually used
    /// is returned.
    pub fn set_name(&mut self, id: ComponentId, name: &str) -> Result<String, GraphError> {
        if !is_valid_name(name) {
            return Err(GraphError::InvalidName(name.to_string()));
        }
        let component = self.get(id)?;
        let unique = match component.parent() {
            Some(parent) => uniquify(
                name,
                self.children(parent)
                    .iter()
                    .filter(|&&sibling| sibling != id)
                    .filter_map(|&sibling| self.component(sibling))
                    .map(|sibling| sibling.name()),
            )?,
            None => name.to_string(),
        };
        if unique == component.name() {
            return Ok(unique);
        }

        let old = component.name().to_string();
        let new = unique.clone();
        self.enact(
            id,
            DocumentAction::new(
                "Rename",
                move |doc: &mut Document| doc.set_name_internal(id, &new),
                move |doc: &mut Document| doc.set_name_internal(id, &old),
            ),
        )?;
        Ok(unique)
    }

    fn set_name_internal(&mut self, id: ComponentId, name: &str) -> Result<(), GraphError> {
        let component = self.get_mut(id)?;
        let old_name = std::mem::replace(&mut component.name, name.to_string());
        let live = component.is_live();
        let is_plug = component.is_plug();

        if live {
            self.signals().name_changed.emit(&NameChanged {
                component: id,
                old_name,
                new_name: name.to_string(),
            });
        }
        if is_plug && self.node_of(id).is_some() {
            self.propagate_dirtiness_at_leaves(id);
        }
        Ok(())
    }

    /// Parent `child` under `parent`, moving it from any previous parent
    pub fn add_child(&mut self, parent: ComponentId, child: ComponentId) -> Result<(), GraphError> {
        if self.parent(child) == Some(parent) {
            return Ok(());
        }
        self.check_child_accepted(parent, child)?;

        let index = self.children(parent).len();
        let action = match self.parent(child) {
            Some(previous) => {
                let previous_index = self.index(child).unwrap_or(0);
                DocumentAction::new(
                    "Add child",
                    move |doc: &mut Document| doc.add_child_internal(parent, child, index),
                    move |doc: &mut Document| {
                        doc.add_child_internal(previous, child, previous_index)
                    },
                )
            }
            None => DocumentAction::new(
                "Add child",
                move |doc: &mut Document| doc.add_child_internal(parent, child, index),
                move |doc: &mut Document| doc.remove_child_internal(parent, child, true),
            ),
        };
        self.enact(parent, action)
    }

    /// Unparent `child` from `parent`.
    ///
    /// The child stays in the document, detached, so history can restore it.
    pub fn remove_child(&mut self, parent: ComponentId, child: ComponentId) -> Result<(), GraphError> {
        if self.parent(child) != Some(parent) {
            return Err(self.not_a_child(parent, child));
        }
        let index = self.index(child).unwrap_or(0);
        self.enact(
            parent,
            DocumentAction::new(
                "Remove child",
                move |doc: &mut Document| doc.remove_child_internal(parent, child, true),
                move |doc: &mut Document| doc.add_child_internal(parent, child, index),
            ),
        )
    }

    /// Unparent a component from whatever parent it has
    pub fn remove(&mut self, id: ComponentId) -> Result<(), GraphError> {
        match self.parent(id) {
            Some(parent) => self.remove_child(parent, id),
            None => Ok(()),
        }
    }

    /// Parent `child` under `parent` as `name`, replacing any existing child
    /// of that name
    pub fn set_child(
        &mut self,
        parent: ComponentId,
        name: &str,
        child: ComponentId,
    ) -> Result<(), GraphError> {
        if !is_valid_name(name) {
            return Err(GraphError::InvalidName(name.to_string()));
        }
        let existing = self.child(parent, name);
        if existing == Some(child) {
            return Ok(());
        }
        self.check_child_accepted(parent, child)?;

        if let Some(existing) = existing {
            self.remove_child(parent, existing)?;
        }
        self.set_name(child, name)?;
        self.add_child(parent, child)
    }

    /// Reorder the children of `parent`.
    ///
    /// `order` must hold exactly the current children.
    pub fn reorder_children(
        &mut self,
        parent: ComponentId,
        order: &[ComponentId],
    ) -> Result<(), GraphError> {
        let current = self.get(parent)?.children().to_vec();
        let wanted: HashSet<ComponentId> = order.iter().copied().collect();
        let is_permutation = order.len() == current.len()
            && wanted.len() == order.len()
            && current.iter().all(|c| wanted.contains(c));
        if !is_permutation {
            return Err(GraphError::InvalidOrder(self.full_name(parent)));
        }
        if order == current.as_slice() {
            return Ok(());
        }

        let new = order.to_vec();
        self.enact(
            parent,
            DocumentAction::new(
                "Reorder children",
                move |doc: &mut Document| doc.reorder_children_internal(parent, &new),
                move |doc: &mut Document| doc.reorder_children_internal(parent, &current),
            ),
        )
    }

    fn reorder_children_internal(
        &mut self,
        parent: ComponentId,
        order: &[ComponentId],
    ) -> Result<(), GraphError> {
        let previous = std::mem::replace(&mut self.get_mut(parent)?.children, order.to_vec());
        let original_indices: Vec<usize> = order
            .iter()
            .filter_map(|c| previous.iter().position(|p| p == c))
            .collect();
        if self.is_plug(parent) {
            self.plug_children_reordered(parent, &original_indices)?;
        }
        Ok(())
    }

    pub(crate) fn add_child_internal(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
        index: usize,
    ) -> Result<(), GraphError> {
        self.parent_changing(child, Some(parent))?;

        let previous = self.parent(child);
        if let Some(previous) = previous {
            self.remove_child_internal(previous, child, false)?;
        }

        let siblings = &mut self.get_mut(parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.get_mut(child)?.parent = Some(parent);

        let live = self.is_live(parent);
        if live {
            self.mark_live(child);
        }
        let name = self.name(child)?.to_string();
        self.set_name(child, &name)?;

        if live {
            self.signals().child_added.emit(&ChildEvent { parent, child });
        }
        self.parent_changed(child);
        Ok(())
    }

    /// Detach `child` from `parent`.
    ///
    /// `notify` is false when the child is only being moved, in which case
    /// the new parent has already been announced.
    pub(crate) fn remove_child_internal(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
        notify: bool,
    ) -> Result<(), GraphError> {
        if self.parent(child) != Some(parent) {
            return Err(self.not_a_child(parent, child));
        }
        if notify {
            self.parent_changing(child, None)?;
        }

        self.get_mut(parent)?.children.retain(|&c| c != child);
        self.get_mut(child)?.parent = None;

        if self.is_live(parent) {
            self.signals().child_removed.emit(&ChildEvent { parent, child });
        }
        if notify {
            self.parent_changed(child);
        }
        Ok(())
    }

    fn parent_changing(
        &mut self,
        child: ComponentId,
        new_parent: Option<ComponentId>,
    ) -> Result<(), GraphError> {
        match self.get(child)?.kind() {
            ComponentKind::Plug(_) => self.plug_parent_changing(child, new_parent),
            ComponentKind::Node(_) => self.node_parent_changing(child, new_parent),
            ComponentKind::Root => Ok(()),
        }
    }

    fn parent_changed(&self, child: ComponentId) {
        if self.is_plug(child) && self.node_of(child).is_some() {
            self.propagate_dirtiness_at_leaves(child);
        }
    }

    /// Sever connections between the node's plugs and the outside when it
    /// leaves the tree
    fn node_parent_changing(
        &mut self,
        node: NodeId,
        new_parent: Option<ComponentId>,
    ) -> Result<(), GraphError> {
        if new_parent.is_some() || self.current_action_stage().is_replay() {
            return Ok(());
        }

        for plug in self.descendants(node) {
            let Ok(data) = self.plug(plug) else {
                continue;
            };
            let input = data.input();
            let outputs: Vec<PlugId> = data.outputs().iter().copied().collect();

            if let Some(input) = input {
                if !self.is_ancestor_of(node, input) {
                    self.set_input(plug, None)?;
                }
            }
            for output in outputs {
                if !self.is_ancestor_of(node, output) {
                    self.set_input(output, None)?;
                }
            }
        }
        Ok(())
    }
}
