// SPDX-License-Identifier: MIT OR Apache-2.0
//! The document: component arena, undo history and signals.

use crate::component::{
    is_valid_name, Component, ComponentId, ComponentKind, Lifecycle, NodeId, PlugId,
};
use crate::config::DocumentConfig;
use crate::dirty::{self, DirtyPropagationScope};
use crate::error::GraphError;
use crate::node::{DependencyProvider, NodeData};
use crate::plug::{Direction, PlugData, PlugSpec};
use crate::registry;
use crate::signal::{ActionPerformed, DocumentSignals};
use indexmap::IndexMap;
use nodal_history::{Action, Batch, History, ReplayFailure, Stage, UndoState};
use std::collections::HashSet;
use std::iter;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Action recorded against a document
pub type DocumentAction = Action<Document, GraphError>;

/// A tree of nodes and plugs with undoable editing.
///
/// Components live in an arena owned by the document and are addressed by
/// [`ComponentId`]. Components removed from the tree stay in the arena so
/// that recorded history can put them back.
pub struct Document {
    config: DocumentConfig,
    root: ComponentId,
    components: IndexMap<ComponentId, Component>,
    pub(crate) history: History<Document, GraphError>,
    signals: Arc<DocumentSignals>,
}

impl Document {
    /// Create an empty document with the default configuration
    pub fn new() -> Self {
        Self::build(DocumentConfig::default())
    }

    /// Create an empty document from a configuration
    pub fn with_config(config: DocumentConfig) -> Result<Self, GraphError> {
        if !is_valid_name(&config.name) {
            return Err(GraphError::InvalidName(config.name));
        }
        Ok(Self::build(config))
    }

    fn build(config: DocumentConfig) -> Self {
        let mut root = Component::new(config.name.clone(), ComponentKind::Root);
        root.lifecycle = Lifecycle::Live;
        let root_id = root.id;

        let mut components = IndexMap::new();
        components.insert(root_id, root);

        debug!("Created document \"{}\"", config.name);
        Self {
            history: History::with_config(config.history.clone()),
            config,
            root: root_id,
            components,
            signals: Arc::new(DocumentSignals::default()),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// The root component; nodes are parented under it
    pub fn root(&self) -> ComponentId {
        self.root
    }

    /// Signals emitted by this document
    pub fn signals(&self) -> &DocumentSignals {
        &self.signals
    }

    pub(crate) fn shared_signals(&self) -> Arc<DocumentSignals> {
        Arc::clone(&self.signals)
    }

    /// Number of times `plug` has been dirtied
    pub fn dirty_count(&self, plug: PlugId) -> u64 {
        self.signals.dirty_count(plug)
    }

    /// Look up a component
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Look up a component, failing if it does not exist
    pub fn get(&self, id: ComponentId) -> Result<&Component, GraphError> {
        self.components
            .get(&id)
            .ok_or(GraphError::ComponentNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: ComponentId) -> Result<&mut Component, GraphError> {
        self.components
            .get_mut(&id)
            .ok_or(GraphError::ComponentNotFound(id))
    }

    /// Plug data of a component
    pub fn plug(&self, id: PlugId) -> Result<&PlugData, GraphError> {
        self.get(id)?
            .as_plug()
            .ok_or_else(|| GraphError::NotAPlug(self.full_name(id)))
    }

    pub(crate) fn plug_mut(&mut self, id: PlugId) -> Result<&mut PlugData, GraphError> {
        if self.component(id).is_some_and(|c| !c.is_plug()) {
            return Err(GraphError::NotAPlug(self.full_name(id)));
        }
        self.get_mut(id)?
            .as_plug_mut()
            .ok_or(GraphError::ComponentNotFound(id))
    }

    /// Node data of a component
    pub fn node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.get(id)?
            .as_node()
            .ok_or_else(|| GraphError::NotANode(self.full_name(id)))
    }

    /// Whether `id` is a plug
    pub fn is_plug(&self, id: ComponentId) -> bool {
        self.component(id).is_some_and(Component::is_plug)
    }

    /// Whether `id` is a node
    pub fn is_node(&self, id: ComponentId) -> bool {
        self.component(id).is_some_and(Component::is_node)
    }

    /// Whether `id` has been parented into the live tree
    pub fn is_live(&self, id: ComponentId) -> bool {
        self.component(id).is_some_and(Component::is_live)
    }

    /// All components, attached or not, in creation order
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Number of components in the arena
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    fn allocate(&mut self, name: &str, kind: ComponentKind) -> Result<ComponentId, GraphError> {
        if !is_valid_name(name) {
            return Err(GraphError::InvalidName(name.to_string()));
        }
        let component = Component::new(name, kind);
        let id = component.id;
        self.components.insert(id, component);
        Ok(id)
    }

    pub(crate) fn mark_live(&mut self, id: ComponentId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if let Some(component) = self.components.get_mut(&id) {
                component.lifecycle = Lifecycle::Live;
                pending.extend_from_slice(&component.children);
            }
        }
    }

    /// Create a detached plug hierarchy.
    ///
    /// The plug stays under construction until it is parented into the
    /// live tree.
    pub fn create_plug(&mut self, spec: &PlugSpec) -> Result<PlugId, GraphError> {
        let plug = self.allocate(&spec.name, ComponentKind::Plug(PlugData::from_spec(spec)))?;
        for child in &spec.children {
            let child = self.create_plug(child)?;
            self.add_child(plug, child)?;
        }
        Ok(plug)
    }

    /// Create a detached plug with the same shape, type and flags as `plug`
    pub fn create_counterpart(
        &mut self,
        plug: PlugId,
        name: &str,
        direction: Direction,
    ) -> Result<PlugId, GraphError> {
        let spec = self.counterpart_spec(plug, name, direction)?;
        self.create_plug(&spec)
    }

    fn counterpart_spec(
        &self,
        plug: PlugId,
        name: &str,
        direction: Direction,
    ) -> Result<PlugSpec, GraphError> {
        let data = self.plug(plug)?;
        let children = self
            .get(plug)?
            .children()
            .iter()
            .map(|&child| self.counterpart_spec(child, self.name(child)?, direction))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PlugSpec {
            name: name.to_string(),
            direction,
            plug_type: data.plug_type(),
            flags: data.flags(),
            default_value: data.default_value().cloned(),
            children,
        })
    }

    /// Build a node from a provider and plug specs, optionally parenting it
    pub fn add_node(
        &mut self,
        name: &str,
        provider: Arc<dyn DependencyProvider>,
        plugs: &[PlugSpec],
        parent: Option<ComponentId>,
    ) -> Result<NodeId, GraphError> {
        self.build_node("Node", name, provider, plugs, parent)
    }

    /// Instantiate a registered node type, optionally parenting it
    pub fn create_node(
        &mut self,
        type_id: &str,
        name: &str,
        parent: Option<ComponentId>,
    ) -> Result<NodeId, GraphError> {
        let node_type = registry::global()
            .read()
            .get(type_id)
            .cloned()
            .ok_or_else(|| GraphError::UnknownNodeType(type_id.to_string()))?;
        let provider = (node_type.provider)();
        self.build_node(&node_type.id, name, provider, &node_type.plugs, parent)
    }

    fn build_node(
        &mut self,
        type_id: &str,
        name: &str,
        provider: Arc<dyn DependencyProvider>,
        plugs: &[PlugSpec],
        parent: Option<ComponentId>,
    ) -> Result<NodeId, GraphError> {
        let node = self.allocate(name, ComponentKind::Node(NodeData::new(type_id, provider)))?;
        for spec in plugs {
            let plug = self.create_plug(spec)?;
            self.add_child(node, plug)?;
        }
        if let Some(parent) = parent {
            self.add_child(parent, node)?;
        }
        trace!("Created {type_id} node \"{}\"", self.full_name(node));
        Ok(node)
    }

    /// Run `f` inside a dirty propagation scope.
    ///
    /// Dirtied plugs are reported once, when the outermost scope closes.
    pub fn with_dirty_propagation_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let _scope = DirtyPropagationScope::new();
        f(self)
    }

    pub(crate) fn propagate_dirtiness(&self, plug: PlugId) {
        dirty::propagate(self, plug);
    }

    /// Dirty every leaf plug below (or at) `plug`
    pub(crate) fn propagate_dirtiness_at_leaves(&self, plug: PlugId) {
        let _scope = DirtyPropagationScope::new();
        let mut pending = vec![plug];
        while let Some(plug) = pending.pop() {
            let children = self.children(plug);
            if children.is_empty() {
                self.propagate_dirtiness(plug);
            } else {
                pending.extend(children.iter().rev());
            }
        }
    }

    /// Perform an action, recording it if `subject` is live and an enabled
    /// undo scope is open
    pub(crate) fn enact(
        &mut self,
        subject: ComponentId,
        action: DocumentAction,
    ) -> Result<(), GraphError> {
        action.perform(self)?;
        if self.is_live(subject) && self.history.record(action) {
            trace!("Recorded action on \"{}\"", self.full_name(subject));
        }
        Ok(())
    }

    /// Open an undo scope.
    ///
    /// Batches committed under the same non-empty `merge_group` as the
    /// previous batch are folded into it.
    pub fn begin_undo_scope(&mut self, state: UndoState, merge_group: Option<&str>) {
        self.history.push_state(state, merge_group);
    }

    /// Close the innermost undo scope, committing the batch if it was the
    /// outermost one
    pub fn end_undo_scope(&mut self) -> Result<(), GraphError> {
        if let Some(commit) = self.history.pop_state()? {
            self.signals.action_performed.emit(&ActionPerformed {
                stage: Stage::Do,
                descriptions: commit.batch.descriptions(),
                merge_group: commit.batch.merge_group().map(str::to_string),
                merged: commit.merged,
            });
        }
        Ok(())
    }

    /// Run `f` inside an undo scope.
    ///
    /// The scope is closed even if `f` fails; anything `f` changed before
    /// failing stays recorded.
    pub fn with_undo_scope<R>(
        &mut self,
        state: UndoState,
        merge_group: Option<&str>,
        f: impl FnOnce(&mut Self) -> Result<R, GraphError>,
    ) -> Result<R, GraphError> {
        self.begin_undo_scope(state, merge_group);
        let result = f(self);
        self.end_undo_scope()?;
        result
    }

    /// Revert the last batch
    pub fn undo(&mut self) -> Result<(), GraphError> {
        let batch = self.history.begin_undo()?;
        let result = {
            let _scope = DirtyPropagationScope::new();
            batch.revert(self, |_, action| trace!("Undid \"{}\"", action.description()))
        };
        self.history.finish_undo(result.is_ok());
        self.replayed(&batch, Stage::Undo, result)
    }

    /// Perform the next reverted batch again
    pub fn redo(&mut self) -> Result<(), GraphError> {
        let batch = self.history.begin_redo()?;
        let result = {
            let _scope = DirtyPropagationScope::new();
            batch.perform(self, |_, action| trace!("Redid \"{}\"", action.description()))
        };
        self.history.finish_redo(result.is_ok());
        self.replayed(&batch, Stage::Redo, result)
    }

    fn replayed(
        &self,
        batch: &Batch<Document, GraphError>,
        stage: Stage,
        result: Result<(), ReplayFailure<GraphError>>,
    ) -> Result<(), GraphError> {
        match result {
            Ok(()) => {
                self.signals.action_performed.emit(&ActionPerformed {
                    stage,
                    descriptions: batch.descriptions(),
                    merge_group: batch.merge_group().map(str::to_string),
                    merged: false,
                });
                Ok(())
            }
            Err(failure) => {
                error!("{failure}");
                Err(GraphError::HistoryDiverged(Box::new(failure)))
            }
        }
    }

    /// Whether [`Document::undo`] would do anything
    pub fn undo_available(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether [`Document::redo`] would do anything
    pub fn redo_available(&self) -> bool {
        self.history.can_redo()
    }

    /// Stage in which actions are currently being performed
    pub fn current_action_stage(&self) -> Stage {
        self.history.stage()
    }

    /// Drop all recorded history.
    ///
    /// Components removed from the tree can no longer be restored once the
    /// history is gone, so they leave the arena along with their dirty
    /// counts. Their ids stop resolving.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.reclaim_detached();
    }

    /// Drop live components that are no longer reachable from the root.
    ///
    /// Components still under construction are kept.
    fn reclaim_detached(&mut self) {
        if self.history.scope_depth() > 0 {
            // The open batch may still refer to them
            return;
        }
        let attached: HashSet<ComponentId> = iter::once(self.root)
            .chain(self.descendants(self.root))
            .collect();
        let detached: HashSet<ComponentId> = self
            .components
            .values()
            .filter(|c| c.is_live() && !attached.contains(&c.id))
            .map(|c| c.id)
            .collect();
        if detached.is_empty() {
            return;
        }

        for component in self.components.values_mut() {
            if detached.contains(&component.id) {
                continue;
            }
            let ComponentKind::Plug(plug) = &mut component.kind else {
                continue;
            };
            plug.outputs.retain(|output| !detached.contains(output));
            if plug.input.is_some_and(|input| detached.contains(&input)) {
                warn!("Disconnecting \"{}\" from a reclaimed input", component.name);
                plug.input = None;
            }
        }
        self.components.retain(|id, _| !detached.contains(id));
        self.signals.forget(&detached);
        debug!("Reclaimed {} detached components", detached.len());
    }

    /// The undo history
    pub fn history(&self) -> &History<Document, GraphError> {
        &self.history
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.config.name)
            .field("components", &self.components.len())
            .field("history", &self.history.stats())
            .finish_non_exhaustive()
    }
}
