// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history for nodal documents.
//!
//! This crate knows nothing about graphs. It records [`Action`]s - pairs of
//! forward and reverse closures over some subject `S` - while an undo scope
//! is open, groups them into [`Batch`]es and keeps the batches on a linear
//! list with a redo cursor.
//!
//! ## Architecture
//!
//! - Undo scopes push an [`UndoState`] onto a stack. Actions performed while
//!   the top of the stack is [`UndoState::Enabled`] are accumulated.
//! - When the outermost scope closes, the accumulated batch is committed,
//!   discarding any redo branch and possibly coalescing with the previous
//!   batch when both share a merge group.
//! - Replaying a batch is driven by the owner of the subject, which
//!   borrows the batch via [`History::begin_undo`] / [`History::begin_redo`].

pub mod action;
pub mod config;
pub mod error;
pub mod history;

pub use action::{Action, ActionFn, Stage, UndoState};
pub use config::HistoryConfig;
pub use error::{HistoryError, ReplayFailure};
pub use history::{Batch, Commit, History, HistoryStats, MAX_HISTORY};
