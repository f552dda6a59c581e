// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reversible actions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Closure applied to the subject of an action
pub type ActionFn<S, E> = Arc<dyn Fn(&mut S) -> Result<(), E> + Send + Sync>;

/// The stage in which actions are currently being performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stage {
    /// Nothing is being performed
    #[default]
    Invalid,
    /// Actions are being performed for the first time
    Do,
    /// Recorded actions are being reverted
    Undo,
    /// Reverted actions are being replayed
    Redo,
}

impl Stage {
    /// Whether this stage replays recorded history
    pub fn is_replay(self) -> bool {
        matches!(self, Self::Undo | Self::Redo)
    }
}

/// Recording state pushed by an undo scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UndoState {
    /// Actions are recorded
    Enabled,
    /// Actions are performed but not recorded
    Disabled,
    /// Placeholder state; nothing is recorded
    Invalid,
}

/// An operation with a forward and a reverse effect
pub struct Action<S, E> {
    description: String,
    merge_key: Option<String>,
    redo: ActionFn<S, E>,
    undo: ActionFn<S, E>,
}

impl<S, E> Action<S, E> {
    /// Create a new action from its forward and reverse closures
    pub fn new(
        description: impl Into<String>,
        redo: impl Fn(&mut S) -> Result<(), E> + Send + Sync + 'static,
        undo: impl Fn(&mut S) -> Result<(), E> + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            merge_key: None,
            redo: Arc::new(redo),
            undo: Arc::new(undo),
        }
    }

    /// Allow this action to merge with later actions carrying the same key
    pub fn with_merge_key(mut self, key: impl Into<String>) -> Self {
        self.merge_key = Some(key.into());
        self
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Merge key, if the action can be coalesced
    pub fn merge_key(&self) -> Option<&str> {
        self.merge_key.as_deref()
    }

    /// Apply the forward effect
    pub fn perform(&self, subject: &mut S) -> Result<(), E> {
        (self.redo)(subject)
    }

    /// Apply the reverse effect
    pub fn revert(&self, subject: &mut S) -> Result<(), E> {
        (self.undo)(subject)
    }

    /// Whether `other` can be folded into this action
    pub fn can_merge(&self, other: &Self) -> bool {
        matches!((&self.merge_key, &other.merge_key), (Some(a), Some(b)) if a == b)
    }

    /// Fold `other` into this action.
    ///
    /// The merged action reverts to the state before `self` and performs to
    /// the state after `other`.
    pub fn merge(&mut self, other: &Self) {
        self.redo = Arc::clone(&other.redo);
    }
}

impl<S, E> Clone for Action<S, E> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            merge_key: self.merge_key.clone(),
            redo: Arc::clone(&self.redo),
            undo: Arc::clone(&self.undo),
        }
    }
}

impl<S, E> fmt::Debug for Action<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("description", &self.description)
            .field("merge_key", &self.merge_key)
            .finish_non_exhaustive()
    }
}
