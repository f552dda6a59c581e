// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history built from batches of reversible actions.

use crate::action::{Action, Stage, UndoState};
use crate::config::HistoryConfig;
use crate::error::{HistoryError, ReplayFailure};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// Group of actions that are undone/redone together
pub struct Batch<S, E> {
    merge_group: Option<String>,
    actions: Vec<Action<S, E>>,
    created: Instant,
    touched: Instant,
}

impl<S, E> Batch<S, E> {
    fn new(merge_group: Option<String>) -> Self {
        let now = Instant::now();
        Self {
            merge_group,
            actions: Vec::new(),
            created: now,
            touched: now,
        }
    }

    /// Merge group this batch was recorded under
    pub fn merge_group(&self) -> Option<&str> {
        self.merge_group.as_deref()
    }

    /// Actions in the order they were performed
    pub fn actions(&self) -> &[Action<S, E>] {
        &self.actions
    }

    /// Number of actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the batch holds no actions
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Descriptions of all actions
    pub fn descriptions(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.description().to_string()).collect()
    }

    /// Summary used for undo/redo menu entries
    pub fn description(&self) -> &str {
        self.actions.last().map_or("", |a| a.description())
    }

    /// When the batch was first committed
    pub fn created(&self) -> Instant {
        self.created
    }

    /// Replay every action forwards.
    ///
    /// `on_action` is called after each action succeeds.
    pub fn perform(
        &self,
        subject: &mut S,
        mut on_action: impl FnMut(&mut S, &Action<S, E>),
    ) -> Result<(), ReplayFailure<E>> {
        for action in &self.actions {
            action.perform(subject).map_err(|source| ReplayFailure {
                description: action.description().to_string(),
                stage: Stage::Redo,
                source,
            })?;
            on_action(subject, action);
        }
        Ok(())
    }

    /// Revert every action, last first.
    ///
    /// `on_action` is called after each action succeeds.
    pub fn revert(
        &self,
        subject: &mut S,
        mut on_action: impl FnMut(&mut S, &Action<S, E>),
    ) -> Result<(), ReplayFailure<E>> {
        for action in self.actions.iter().rev() {
            action.revert(subject).map_err(|source| ReplayFailure {
                description: action.description().to_string(),
                stage: Stage::Undo,
                source,
            })?;
            on_action(subject, action);
        }
        Ok(())
    }

    fn can_merge(&self, other: &Self, window: Option<Duration>) -> bool {
        let same_group = matches!(
            (&self.merge_group, &other.merge_group),
            (Some(a), Some(b)) if !a.is_empty() && a == b
        );
        if !same_group {
            return false;
        }
        match window {
            Some(window) => other.created.saturating_duration_since(self.touched) <= window,
            None => true,
        }
    }

    fn merge(&mut self, other: Batch<S, E>) {
        let pairwise = self.actions.len() == other.actions.len()
            && self
                .actions
                .iter()
                .zip(other.actions.iter())
                .all(|(a, b)| a.can_merge(b));

        if pairwise {
            for (action, later) in self.actions.iter_mut().zip(other.actions.iter()) {
                action.merge(later);
            }
        } else {
            self.actions.extend(other.actions);
        }
        self.touched = other.created;
    }
}

impl<S, E> Clone for Batch<S, E> {
    fn clone(&self) -> Self {
        Self {
            merge_group: self.merge_group.clone(),
            actions: self.actions.clone(),
            created: self.created,
            touched: self.touched,
        }
    }
}

impl<S, E> fmt::Debug for Batch<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("merge_group", &self.merge_group)
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

/// Result of closing the outermost undo scope with recorded actions
#[derive(Debug)]
pub struct Commit<S, E> {
    /// The batch now at the end of the undo list
    pub batch: Arc<Batch<S, E>>,
    /// Whether the recorded actions were folded into the previous batch
    pub merged: bool,
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Batches available to undo
    pub undo_count: usize,
    /// Batches available to redo
    pub redo_count: usize,
    /// Actions held across all batches
    pub action_count: usize,
    /// Maximum history depth
    pub max_depth: Option<usize>,
}

/// Undo/redo history manager
pub struct History<S, E> {
    config: HistoryConfig,
    /// Pushed and popped by undo scopes
    states: Vec<UndoState>,
    /// Actions accumulate here until the state stack is empty again
    accumulator: Option<Batch<S, E>>,
    /// Committed batches
    batches: VecDeque<Arc<Batch<S, E>>>,
    /// Index of the next batch to redo
    cursor: usize,
    stage: Stage,
}

impl<S, E> History<S, E> {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self::with_config(HistoryConfig {
            max_depth: Some(max_depth),
            ..HistoryConfig::default()
        })
    }

    /// Create from a configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            states: Vec::new(),
            accumulator: None,
            batches: VecDeque::new(),
            cursor: 0,
            stage: Stage::Invalid,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Stage in which actions are currently performed
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Number of open undo scopes
    pub fn scope_depth(&self) -> usize {
        self.states.len()
    }

    /// Open an undo scope
    pub fn push_state(&mut self, state: UndoState, merge_group: Option<&str>) {
        if self.states.is_empty() && !self.stage.is_replay() {
            self.accumulator = Some(Batch::new(merge_group.map(str::to_string)));
            self.stage = Stage::Do;
        }
        self.states.push(state);
    }

    /// Close the innermost undo scope.
    ///
    /// Closing the outermost scope commits the accumulated batch, if it holds
    /// any actions.
    pub fn pop_state(&mut self) -> Result<Option<Commit<S, E>>, HistoryError> {
        if self.states.pop().is_none() {
            tracing::warn!("Bad undo stack nesting detected");
            return Err(HistoryError::BadNesting);
        }
        if !self.states.is_empty() {
            return Ok(None);
        }

        let Some(batch) = self.accumulator.take() else {
            return Ok(None);
        };
        self.stage = Stage::Invalid;
        if batch.is_empty() {
            return Ok(None);
        }

        Ok(self.commit(batch))
    }

    fn commit(&mut self, batch: Batch<S, E>) -> Option<Commit<S, E>> {
        // Discard the redo branch
        self.batches.truncate(self.cursor);

        let window = self.config.merge_window();
        let pending = match self.batches.back_mut() {
            Some(last) if last.can_merge(&batch, window) => {
                // Batches handed out earlier keep their old contents
                Arc::make_mut(last).merge(batch);
                None
            }
            _ => Some(batch),
        };
        let merged = pending.is_none();
        if let Some(batch) = pending {
            self.batches.push_back(Arc::new(batch));
        }

        if let Some(max_depth) = self.config.max_depth {
            while self.batches.len() > max_depth.max(1) {
                self.batches.pop_front();
            }
        }
        self.cursor = self.batches.len();

        let batch = Arc::clone(self.batches.back()?);
        tracing::trace!(
            "Committed \"{}\" ({} actions, merged: {})",
            batch.description(),
            batch.len(),
            merged
        );
        Some(Commit { batch, merged })
    }

    /// Whether actions performed now would be recorded
    pub fn is_recording(&self) -> bool {
        self.accumulator.is_some() && self.states.last() == Some(&UndoState::Enabled)
    }

    /// Record an already performed action.
    ///
    /// Returns `false` (dropping the action) when no enabled scope is open.
    pub fn record(&mut self, action: Action<S, E>) -> bool {
        if !self.is_recording() {
            return false;
        }
        match self.accumulator.as_mut() {
            Some(batch) => {
                batch.actions.push(action);
                true
            }
            None => false,
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.stage == Stage::Invalid && self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.stage == Stage::Invalid && self.cursor < self.batches.len()
    }

    /// Enter the undo stage and borrow the batch to revert
    pub fn begin_undo(&mut self) -> Result<Arc<Batch<S, E>>, HistoryError> {
        if self.stage != Stage::Invalid {
            return Err(HistoryError::ReplayInProgress(self.stage));
        }
        let index = self.cursor.checked_sub(1).ok_or(HistoryError::NothingToUndo)?;
        let batch = self
            .batches
            .get(index)
            .cloned()
            .ok_or(HistoryError::NothingToUndo)?;
        self.stage = Stage::Undo;
        Ok(batch)
    }

    /// Leave the undo stage, moving the cursor back if the batch was reverted
    pub fn finish_undo(&mut self, reverted: bool) {
        if reverted && self.stage == Stage::Undo {
            self.cursor -= 1;
        }
        self.stage = Stage::Invalid;
    }

    /// Enter the redo stage and borrow the batch to perform
    pub fn begin_redo(&mut self) -> Result<Arc<Batch<S, E>>, HistoryError> {
        if self.stage != Stage::Invalid {
            return Err(HistoryError::ReplayInProgress(self.stage));
        }
        let batch = self
            .batches
            .get(self.cursor)
            .cloned()
            .ok_or(HistoryError::NothingToRedo)?;
        self.stage = Stage::Redo;
        Ok(batch)
    }

    /// Leave the redo stage, advancing the cursor if the batch was performed
    pub fn finish_redo(&mut self, performed: bool) {
        if performed && self.stage == Stage::Redo {
            self.cursor += 1;
        }
        self.stage = Stage::Invalid;
    }

    /// Number of batches that can be undone
    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    /// Number of batches that can be redone
    pub fn redo_depth(&self) -> usize {
        self.batches.len() - self.cursor
    }

    /// Committed batches, oldest first
    pub fn batches(&self) -> impl Iterator<Item = &Arc<Batch<S, E>>> {
        self.batches.iter()
    }

    /// Clear all history.
    ///
    /// Open scopes are left alone; their actions are still committed when
    /// they close.
    pub fn clear(&mut self) {
        self.batches.clear();
        self.cursor = 0;
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_depth(),
            redo_count: self.redo_depth(),
            action_count: self.batches.iter().map(|b| b.len()).sum(),
            max_depth: self.config.max_depth,
        }
    }

    /// Get description of next undo batch
    pub fn undo_description(&self) -> Option<&str> {
        let index = self.cursor.checked_sub(1)?;
        self.batches.get(index).map(|b| b.description())
    }

    /// Get description of next redo batch
    pub fn redo_description(&self) -> Option<&str> {
        self.batches.get(self.cursor).map(|b| b.description())
    }
}

impl<S, E> Default for History<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, E> fmt::Debug for History<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("config", &self.config)
            .field("states", &self.states)
            .field("batches", &self.batches.len())
            .field("cursor", &self.cursor)
            .field("stage", &self.stage)
            .finish()
    }
}
