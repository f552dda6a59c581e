// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dirty propagation.
//!
//! Each thread owns one [`DirtyPlugs`] engine. Mutations insert the plug they
//! changed; the engine expands that into every plug whose value depends on
//! it, through three relations:
//!
//! - a plug dirties its parent plugs,
//! - a leaf plug dirties every plug connected to it as an input,
//! - a leaf plug dirties whatever its node's [`DependencyProvider::affects`]
//!   names.
//!
//! Nothing is emitted until the outermost [`DirtyPropagationScope`] on the
//! thread closes. The episode is then ordered causes first and every plug in
//! it is reported exactly once.
//!
//! [`DependencyProvider::affects`]: crate::node::DependencyProvider::affects

use crate::component::{NodeId, PlugId};
use crate::document::Document;
use crate::plug::PlugFlags;
use crate::signal::{DocumentSignals, PlugDirtied};
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{error, trace, warn};

thread_local! {
    static DIRTY_PLUGS: RefCell<DirtyPlugs> = RefCell::new(DirtyPlugs::default());
}

/// State of the thread's propagation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// No scope is open
    #[default]
    Idle,
    /// Scopes are open and plugs are being collected
    Accumulating,
    /// Notifications are being emitted; insertions are ignored
    Emitting,
    /// The finished episode is being dropped; insertions are ignored
    TearingDown,
}

/// Current phase of this thread's propagation engine
pub fn phase() -> Phase {
    DIRTY_PLUGS.with(|dirty| dirty.borrow().phase)
}

/// Number of scopes currently open on this thread
pub fn scope_depth() -> usize {
    DIRTY_PLUGS.with(|dirty| dirty.borrow().depth)
}

/// Batches dirty notifications until the outermost scope on the thread
/// is dropped.
///
/// Scopes belong to the thread that opened them.
#[must_use = "notifications are emitted when the scope is dropped"]
pub struct DirtyPropagationScope {
    _thread_bound: PhantomData<*const ()>,
}

impl DirtyPropagationScope {
    /// Open a scope
    pub fn new() -> Self {
        DIRTY_PLUGS.with(|dirty| dirty.borrow_mut().push_scope());
        Self {
            _thread_bound: PhantomData,
        }
    }
}

impl Default for DirtyPropagationScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DirtyPropagationScope {
    fn drop(&mut self) {
        let Some(episode) = DIRTY_PLUGS.with(|dirty| dirty.borrow_mut().pop_scope()) else {
            return;
        };

        // The engine is not borrowed while slots run, so they may open
        // scopes of their own; their insertions are ignored
        episode.emit();

        DIRTY_PLUGS.with(|dirty| dirty.borrow_mut().phase = Phase::TearingDown);
        // Dropping the vertices can release the last reference to a
        // document's signals, and with it arbitrary slot state
        drop(episode);
        DIRTY_PLUGS.with(|dirty| dirty.borrow_mut().finish_teardown());
    }
}

/// Insert `plug` and everything depending on it into the current episode
pub(crate) fn propagate(doc: &Document, plug: PlugId) {
    let _scope = DirtyPropagationScope::new();
    if !DIRTY_PLUGS.with(|dirty| dirty.borrow_mut().insert(doc, plug)) {
        return;
    }

    let mut pending = vec![plug];
    while let Some(cause) = pending.pop() {
        // Node code runs here, so the engine must not be borrowed
        let effects = dependents(doc, cause);
        DIRTY_PLUGS.with(|dirty| {
            dirty
                .borrow_mut()
                .link(doc, cause, &effects, &mut pending);
        });
    }
}

struct Vertex {
    plug: PlugId,
    node: Option<NodeId>,
    name: String,
    signals: Arc<DocumentSignals>,
}

/// Plugs collected for one propagation episode.
///
/// Edges point from an effect to the cause that dirtied it.
#[derive(Default)]
struct DirtyPlugs {
    graph: DiGraph<Vertex, ()>,
    vertices: HashMap<PlugId, NodeIndex>,
    depth: usize,
    phase: Phase,
}

impl DirtyPlugs {
    fn push_scope(&mut self) {
        self.depth += 1;
        if self.phase == Phase::Idle {
            self.phase = Phase::Accumulating;
        }
    }

    /// Close a scope, handing back the finished episode when it was the
    /// outermost one
    fn pop_scope(&mut self) -> Option<Episode> {
        let Some(depth) = self.depth.checked_sub(1) else {
            warn!("Dirty propagation scope closed without being opened");
            return None;
        };
        self.depth = depth;
        if depth > 0 || self.phase != Phase::Accumulating {
            return None;
        }

        self.phase = Phase::Emitting;
        self.vertices.clear();
        Some(Episode {
            graph: std::mem::take(&mut self.graph),
        })
    }

    fn finish_teardown(&mut self) {
        self.phase = if self.depth > 0 {
            Phase::Accumulating
        } else {
            Phase::Idle
        };
    }

    /// Add `plug` to the episode, returning whether its dependents still
    /// need visiting
    fn insert(&mut self, doc: &Document, plug: PlugId) -> bool {
        if matches!(self.phase, Phase::Emitting | Phase::TearingDown) {
            trace!("Ignoring dirtied plug {plug} while in {:?}", self.phase);
            return false;
        }
        matches!(self.insert_vertex(doc, plug), Some((_, true)))
    }

    /// Record that `cause` dirties `effects`, queueing effects seen for the
    /// first time
    fn link(
        &mut self,
        doc: &Document,
        cause: PlugId,
        effects: &[PlugId],
        pending: &mut Vec<PlugId>,
    ) {
        let Some(&cause_index) = self.vertices.get(&cause) else {
            return;
        };
        for &effect in effects {
            let Some((index, inserted)) = self.insert_vertex(doc, effect) else {
                continue;
            };
            let accepts_cycles = doc
                .plug(effect)
                .is_ok_and(|p| p.flags().contains(PlugFlags::ACCEPTS_DEPENDENCY_CYCLES));
            if !accepts_cycles {
                self.graph.update_edge(index, cause_index, ());
            }
            if inserted {
                pending.push(effect);
            }
        }
    }

    /// Add a vertex for `plug` and its parent plugs.
    ///
    /// Returns the vertex and whether it was newly added, or `None` if the
    /// plug cannot be observed yet.
    fn insert_vertex(&mut self, doc: &Document, plug: PlugId) -> Option<(NodeIndex, bool)> {
        if let Some(&index) = self.vertices.get(&plug) {
            return Some((index, false));
        }

        let component = doc.component(plug)?;
        if !component.is_live() {
            trace!("Skipping plug \"{}\" under construction", component.name());
            return None;
        }

        let index = self.graph.add_node(Vertex {
            plug,
            node: doc.node_of(plug),
            name: doc.full_name(plug),
            signals: doc.shared_signals(),
        });
        self.vertices.insert(plug, index);

        if let Some(parent) = component.parent().filter(|&p| doc.is_plug(p)) {
            if let Some((parent_index, _)) = self.insert_vertex(doc, parent) {
                self.graph.update_edge(parent_index, index, ());
            }
        }
        Some((index, true))
    }
}

/// Plugs dirtied directly by a change to `plug`
fn dependents(doc: &Document, plug: PlugId) -> Vec<PlugId> {
    let Some(component) = doc.component(plug) else {
        return Vec::new();
    };
    // Compound plugs only dirty through their leaves
    if !component.children().is_empty() {
        return Vec::new();
    }
    let Some(data) = component.as_plug() else {
        return Vec::new();
    };

    let mut dependents: Vec<PlugId> = data.outputs().iter().copied().collect();

    let Some(node) = doc.node_of(plug) else {
        return dependents;
    };
    let Some(provider) = doc
        .component(node)
        .and_then(|c| c.as_node())
        .map(|n| Arc::clone(n.provider()))
    else {
        return dependents;
    };
    match provider.affects(doc, node, plug) {
        Ok(affected) => dependents.extend(affected),
        Err(err) => error!(
            "Failed to compute plugs affected by \"{}\" on node \"{}\": {err}",
            doc.full_name(plug),
            doc.full_name(node)
        ),
    }
    dependents
}

struct Episode {
    graph: DiGraph<Vertex, ()>,
}

impl Episode {
    /// Vertices ordered causes first
    fn order(&self) -> Vec<NodeIndex> {
        match toposort(&self.graph, None) {
            Ok(mut order) => {
                order.reverse();
                order
            }
            Err(cycle) => {
                self.report_cycle(cycle.node_id());
                // Post-order over effect -> cause edges still puts causes
                // first wherever the graph is acyclic
                let mut order = Vec::with_capacity(self.graph.node_count());
                let mut dfs = DfsPostOrder::empty(&self.graph);
                for start in self.graph.node_indices() {
                    dfs.move_to(start);
                    while let Some(index) = dfs.next(&self.graph) {
                        order.push(index);
                    }
                }
                order
            }
        }
    }

    fn report_cycle(&self, at: NodeIndex) {
        let partner = self
            .graph
            .neighbors(at)
            .find(|&n| has_path_connecting(&self.graph, n, at, None))
            .unwrap_or(at);
        error!(
            "Cycle detected between \"{}\" and \"{}\"",
            self.graph[at].name, self.graph[partner].name
        );
    }

    fn emit(&self) {
        let order = self.order();
        for &index in &order {
            let vertex = &self.graph[index];
            vertex.signals.mark_dirty(vertex.plug);
        }
        for &index in &order {
            let vertex = &self.graph[index];
            // Dirtiness is only announced through a node
            let Some(node) = vertex.node else {
                continue;
            };
            vertex.signals.plug_dirtied.emit(&PlugDirtied {
                plug: vertex.plug,
                node,
                name: vertex.name.clone(),
            });
        }
        trace!("Emitted {} dirtied plugs", order.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_nest() {
        assert_eq!(phase(), Phase::Idle);
        {
            let _outer = DirtyPropagationScope::new();
            assert_eq!(phase(), Phase::Accumulating);
            {
                let _inner = DirtyPropagationScope::new();
                assert_eq!(scope_depth(), 2);
            }
            assert_eq!(phase(), Phase::Accumulating);
            assert_eq!(scope_depth(), 1);
        }
        assert_eq!(phase(), Phase::Idle);
        assert_eq!(scope_depth(), 0);
    }

    #[test]
    fn test_unbalanced_pop_is_tolerated() {
        let mut dirty = DirtyPlugs::default();
        assert!(dirty.pop_scope().is_none());
        assert_eq!(dirty.phase, Phase::Idle);
    }

    #[test]
    fn test_empty_episode() {
        let mut dirty = DirtyPlugs::default();
        dirty.push_scope();
        let episode = dirty.pop_scope();
        assert_eq!(episode.map(|e| e.graph.node_count()), Some(0));
        assert_eq!(dirty.phase, Phase::Emitting);
        dirty.finish_teardown();
        assert_eq!(dirty.phase, Phase::Idle);
    }

    #[test]
    fn test_order_puts_causes_first() {
        let signals = Arc::new(DocumentSignals::default());
        let vertex = |name: &str| Vertex {
            plug: PlugId::new(),
            node: None,
            name: name.to_string(),
            signals: Arc::clone(&signals),
        };
        let mut graph = DiGraph::new();
        let a = graph.add_node(vertex("a"));
        let b = graph.add_node(vertex("b"));
        let c = graph.add_node(vertex("c"));
        // c is dirtied by b, which is dirtied by a
        graph.add_edge(c, b, ());
        graph.add_edge(b, a, ());

        let order = Episode { graph }.order();
        assert_eq!(order, [a, b, c]);
    }

    #[test]
    fn test_cycle_falls_back_to_post_order() {
        let signals = Arc::new(DocumentSignals::default());
        let vertex = |name: &str| Vertex {
            plug: PlugId::new(),
            node: None,
            name: name.to_string(),
            signals: Arc::clone(&signals),
        };
        let mut graph = DiGraph::new();
        let a = graph.add_node(vertex("a"));
        let b = graph.add_node(vertex("b"));
        graph.add_edge(a, b, ());
        graph.add_edge(b, a, ());

        let order = Episode { graph }.order();
        assert_eq!(order.len(), 2);
        assert!(order.contains(&a) && order.contains(&b));
    }

    #[test]
    fn test_nodeless_plugs_are_counted_but_not_announced() {
        let signals = Arc::new(DocumentSignals::default());
        let announced = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = Arc::clone(&announced);
        signals.plug_dirtied.connect(move |e| seen.lock().push(e.plug));

        let owned = PlugId::new();
        let loose = PlugId::new();
        let mut graph = DiGraph::new();
        for (plug, node) in [(owned, Some(NodeId::new())), (loose, None)] {
            graph.add_node(Vertex {
                plug,
                node,
                name: "plug".to_string(),
                signals: Arc::clone(&signals),
            });
        }
        Episode { graph }.emit();

        assert_eq!(*announced.lock(), [owned]);
        assert_eq!(signals.dirty_count(loose), 1);
    }
}
