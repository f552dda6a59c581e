// SPDX-License-Identifier: MIT OR Apache-2.0
//! History errors.

use crate::action::Stage;
use std::fmt;
use thiserror::Error;

/// History errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// An undo scope was closed without being opened
    #[error("Bad undo scope nesting detected")]
    BadNesting,

    /// Undo or redo was requested while actions are being performed
    #[error("Actions are being performed ({0:?})")]
    ReplayInProgress(Stage),
}

/// An action failed while history was being replayed.
///
/// The subject no longer matches its own history when this happens, so the
/// failure is reported to the caller rather than recovered from.
#[derive(Debug)]
pub struct ReplayFailure<E> {
    /// Description of the failing action
    pub description: String,
    /// Stage during which the action failed
    pub stage: Stage,
    /// Error raised by the action
    pub source: E,
}

impl<E: fmt::Display> fmt::Display for ReplayFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Action \"{}\" failed during {:?}: {}",
            self.description, self.stage, self.source
        )
    }
}

impl<E> std::error::Error for ReplayFailure<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
