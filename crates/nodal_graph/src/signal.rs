// SPDX-License-Identifier: MIT OR Apache-2.0
//! Document signals.
//!
//! Slots receive event values only. They cannot reach back into the
//! document while it is being mutated, which keeps emission free of
//! borrow conflicts.

use crate::component::{ComponentId, NodeId, PlugId};
use nodal_history::Stage;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Signal::connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

/// A list of callbacks invoked with each emitted value
pub struct Signal<T> {
    slots: Mutex<Vec<(SlotId, Slot<T>)>>,
    next_id: AtomicU64,
}

impl<T> Signal<T> {
    /// Create a signal with no slots
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Add a slot, called after all previously connected slots
    pub fn connect(&self, slot: impl Fn(&T) + Send + Sync + 'static) -> SlotId {
        let id = SlotId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.lock().push((id, Arc::new(slot)));
        id
    }

    /// Remove a slot. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: SlotId) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    /// Call every slot with `value`.
    ///
    /// The slot list is snapshotted first, so slots may connect or
    /// disconnect while being called.
    pub fn emit(&self, value: &T) {
        let slots: Vec<Slot<T>> = self.slots.lock().iter().map(|(_, s)| Arc::clone(s)).collect();
        for slot in slots {
            slot(value);
        }
    }

    /// Number of connected slots
    pub fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slot_count())
            .finish()
    }
}

/// A plug's value may have changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlugDirtied {
    /// The dirtied plug
    pub plug: PlugId,
    /// Node owning the plug
    pub node: NodeId,
    /// Full name of the plug at the time it was dirtied
    pub name: String,
}

/// A plug was connected or disconnected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlugInputChanged {
    /// The plug whose input (or whose input's input) changed
    pub plug: PlugId,
    /// Its input after the change
    pub input: Option<PlugId>,
    /// Node owning the plug
    pub node: Option<NodeId>,
    /// Full name of the plug
    pub name: String,
}

/// A plug's static value was set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlugSet {
    /// The plug
    pub plug: PlugId,
    /// Node owning the plug
    pub node: Option<NodeId>,
    /// Full name of the plug
    pub name: String,
}

/// A child was added to or removed from a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildEvent {
    /// The parent
    pub parent: ComponentId,
    /// The child
    pub child: ComponentId,
}

/// A component was renamed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameChanged {
    /// The renamed component
    pub component: ComponentId,
    /// Name before the change
    pub old_name: String,
    /// Name after the change
    pub new_name: String,
}

/// A batch was committed, undone or redone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPerformed {
    /// Stage the batch was performed in
    pub stage: Stage,
    /// Descriptions of the batch's actions
    pub descriptions: Vec<String>,
    /// Merge group of the batch
    pub merge_group: Option<String>,
    /// Whether a commit was folded into the previous batch
    pub merged: bool,
}

/// Signals emitted by a document, plus the per-plug dirty counters.
///
/// Held behind an `Arc` so pending dirty notifications can outlive the
/// borrow of the document that queued them.
#[derive(Debug, Default)]
pub struct DocumentSignals {
    /// Emitted once per plug per propagation episode, causes first
    pub plug_dirtied: Signal<PlugDirtied>,
    /// Emitted when a plug's input changes, and for every output downstream
    pub plug_input_changed: Signal<PlugInputChanged>,
    /// Emitted when a plug's static value is set
    pub plug_set: Signal<PlugSet>,
    /// Emitted after a child is parented
    pub child_added: Signal<ChildEvent>,
    /// Emitted after a child is unparented
    pub child_removed: Signal<ChildEvent>,
    /// Emitted after a rename
    pub name_changed: Signal<NameChanged>,
    /// Emitted after a batch is committed, undone or redone
    pub action_performed: Signal<ActionPerformed>,
    dirty_counts: Mutex<HashMap<PlugId, u64>>,
}

impl DocumentSignals {
    /// Number of times `plug` has been marked stale
    pub fn dirty_count(&self, plug: PlugId) -> u64 {
        self.dirty_counts.lock().get(&plug).copied().unwrap_or(0)
    }

    pub(crate) fn mark_dirty(&self, plug: PlugId) {
        *self.dirty_counts.lock().entry(plug).or_insert(0) += 1;
    }

    /// Drop the counters of reclaimed plugs
    pub(crate) fn forget(&self, plugs: &HashSet<PlugId>) {
        self.dirty_counts.lock().retain(|plug, _| !plugs.contains(plug));
    }
}
