// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised by document operations.

use crate::component::ComponentId;
use crate::plug::{Direction, PlugType};
use nodal_history::{HistoryError, ReplayFailure};
use thiserror::Error;

/// Document errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// No component with this id exists in the document
    #[error("Component not found: {0}")]
    ComponentNotFound(ComponentId),

    /// The component is not a plug
    #[error("\"{0}\" is not a plug")]
    NotAPlug(String),

    /// The component is not a node
    #[error("\"{0}\" is not a node")]
    NotANode(String),

    /// Names must start with a letter or underscore
    #[error("Invalid name \"{0}\"")]
    InvalidName(String),

    /// No numeric suffix is left to make a sibling name unique
    #[error("No unique name left for \"{0}\"")]
    NameExhausted(String),

    /// No node type with this id is registered
    #[error("Unknown node type \"{0}\"")]
    UnknownNodeType(String),

    /// A component cannot be its own parent
    #[error("\"{0}\" cannot be parented to itself")]
    ParentedToSelf(String),

    /// Parenting would make a component its own descendant
    #[error("\"{child}\" cannot be parented to \"{parent}\" as it is an ancestor of it")]
    AncestorCycle {
        /// Full name of the child
        child: String,
        /// Full name of the rejected parent
        parent: String,
    },

    /// `accepts_child` returned false
    #[error("\"{parent}\" rejects child \"{child}\"")]
    ParentRejectsChild {
        /// Full name of the parent
        parent: String,
        /// Full name of the child
        child: String,
    },

    /// `accepts_parent` returned false
    #[error("\"{child}\" rejects parent \"{parent}\"")]
    ChildRejectsParent {
        /// Full name of the child
        child: String,
        /// Full name of the parent
        parent: String,
    },

    /// The component is not a child of the given parent
    #[error("\"{child}\" is not a child of \"{parent}\"")]
    NotAChild {
        /// Full name of the parent
        parent: String,
        /// Full name of the supposed child
        child: String,
    },

    /// A new child order is not a permutation of the current children
    #[error("Invalid child order for \"{0}\"")]
    InvalidOrder(String),

    /// A connection was rejected
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A static value could not be set
    #[error(transparent)]
    Value(#[from] ValueError),

    /// Undo scope or history misuse
    #[error(transparent)]
    History(#[from] HistoryError),

    /// An action failed during undo or redo
    #[error("Document has diverged from its history: {0}")]
    HistoryDiverged(Box<ReplayFailure<GraphError>>),
}

/// Why a plug refused an input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The plug does not have `ACCEPTS_INPUTS`
    #[error("plug does not accept inputs")]
    NotAcceptingInputs,

    /// The plug is read-only
    #[error("plug is read-only")]
    ReadOnly,

    /// The input is the plug itself
    #[error("plug cannot be its own input")]
    SelfConnection,

    /// The input is missing or is not a plug
    #[error("input is not a plug")]
    NotAPlug,

    /// Input and plug share a direction
    #[error("input has the same direction ({0:?})")]
    SameDirection(Direction),

    /// The input's type cannot convert to the plug's type
    #[error("{input:?} cannot be connected to {plug:?}")]
    IncompatibleTypes {
        /// Type of the plug
        plug: PlugType,
        /// Type of the input
        input: PlugType,
    },

    /// The owning node vetoed the input
    #[error("node \"{0}\" rejects the input")]
    NodeVeto(String),

    /// An existing output of the plug refused the input
    #[error("output \"{output}\" rejects it: {reason}")]
    OutputVeto {
        /// Full name of the output
        output: String,
        /// The output's own rejection
        reason: Box<Rejection>,
    },

    /// The input has fewer children than the plug
    #[error("input has {input} children but {plug} are required")]
    ChildCountMismatch {
        /// Children on the plug
        plug: usize,
        /// Children on the input
        input: usize,
    },

    /// A child of the plug refused the matching child of the input
    #[error("child \"{child}\" rejects \"{input}\": {reason}")]
    ChildRejected {
        /// Full name of the child plug
        child: String,
        /// Full name of the child input
        input: String,
        /// The child's own rejection
        reason: Box<Rejection>,
    },

    /// Validation came back around to a pair already being checked
    #[error("connection would form a cycle")]
    Cycle,
}

/// A connection was refused before anything was changed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{plug}\" rejects input \"{input}\": {reason}")]
pub struct ConnectionError {
    /// Full name of the plug
    pub plug: String,
    /// Full name of the input
    pub input: String,
    /// Why it was refused
    pub reason: Rejection,
}

/// A static value could not be set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Values of connected plugs come from their input
    #[error("\"{0}\" has an input")]
    HasInput(String),

    /// The plug is read-only
    #[error("\"{0}\" is read-only")]
    ReadOnly(String),

    /// Compound plugs hold no value of their own
    #[error("\"{0}\" has children")]
    Compound(String),

    /// The value type does not match the plug type
    #[error("\"{plug}\" of type {expected:?} cannot hold {found:?}")]
    TypeMismatch {
        /// Full name of the plug
        plug: String,
        /// Type of the plug
        expected: PlugType,
        /// Type of the value
        found: PlugType,
    },
}
