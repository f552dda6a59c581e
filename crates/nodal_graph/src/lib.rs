// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dependency graph of nodes and plugs.
//!
//! A [`Document`] owns a tree of components: nodes under the root, plugs
//! under nodes, child plugs under compound plugs. Plugs connect to each
//! other through inputs; nodes declare through a [`DependencyProvider`]
//! which of their outputs depend on which plugs.
//!
//! ## Architecture
//!
//! - Every edit that changes what a plug would compute dirties it. The
//!   thread-local engine in [`dirty`] expands that to every dependent plug
//!   and reports each once, causes first, when the outermost
//!   [`DirtyPropagationScope`] closes.
//! - Every edit is an [`Action`](nodal_history::Action) with a forward and
//!   a reverse effect. Actions performed inside an undo scope are recorded
//!   in the document's history and can be undone and redone.
//! - Observers subscribe to the [`DocumentSignals`]; they receive plain
//!   event values and never borrow the document.

mod connection;
mod hierarchy;
mod value;

pub mod component;
pub mod config;
pub mod dirty;
pub mod document;
pub mod error;
pub mod node;
pub mod nodes;
pub mod plug;
pub mod registry;
pub mod signal;

pub use component::{Component, ComponentId, ComponentKind, Lifecycle, NodeId, PlugId};
pub use config::{ConfigError, DocumentConfig};
pub use dirty::{DirtyPropagationScope, Phase};
pub use document::{Document, DocumentAction};
pub use error::{ConnectionError, GraphError, Rejection, ValueError};
pub use node::{AffectsError, DependencyProvider, NoDependencies, NodeData, NodeRegistry, NodeType};
pub use plug::{Direction, PlugData, PlugFlags, PlugSpec, PlugType, PlugValue};
pub use signal::{
    ActionPerformed, ChildEvent, DocumentSignals, NameChanged, PlugDirtied, PlugInputChanged,
    PlugSet, Signal, SlotId,
};

pub use nodal_history::{HistoryConfig, Stage, UndoState};
