//! Errors raised on contract violations.
//!
//! Equations never fail through this type: a malformed equation degrades to a
//! null value and records a [`FailureCause`][crate::equation::FailureCause].
//! The variants below are reserved for misuse detected at the call site.

use thiserror::Error;

use crate::types::{StateId, TransitionId, VariableId};

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bit index outside of a value.
    #[error("bit index {index} is out of range for a value of size {size}")]
    OutOfRange { index: usize, size: usize },

    /// Character other than `0`/`1` in a binary string.
    #[error("unsupported character {0:?} in binary string")]
    UnsupportedChar(char),

    /// Variables are at least one bit wide.
    #[error("invalid size {0}")]
    InvalidSize(usize),

    #[error("size mismatch: expected {expected} bits, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    /// Operation not available for this kind of object.
    #[error("illegal operation: {0}")]
    IllegalOperation(&'static str),

    /// Action type not allowed for the addressed bits.
    #[error("illegal action type: {0}")]
    IllegalType(&'static str),

    /// The action value is implied by the action type.
    #[error("action value is read-only for this action type")]
    ReadOnly,

    #[error("illegal action value: {0}")]
    IllegalValue(String),

    #[error("illegal range [{left}:{right}] for a variable of size {size}")]
    IllegalRange { left: usize, right: usize, size: usize },

    #[error("unknown variable {0}")]
    UnknownVariable(VariableId),

    #[error("unknown state {0}")]
    UnknownState(StateId),

    #[error("unknown transition {0}")]
    UnknownTransition(TransitionId),

    /// The machine declares no initial state.
    #[error("machine has no initial state")]
    MissingInitialState,

    /// Simulator operation not allowed in the current status.
    #[error("operation `{operation}` is not allowed while the simulator is {status}")]
    InvalidStatus { operation: &'static str, status: &'static str },
}
