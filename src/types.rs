//! Type-safe identifiers for machine components.
//!
//! Every variable, state and transition of a [`Machine`][crate::machine::Machine]
//! gets an id from an [`IdAllocator`] owned by the machine (or, for variables,
//! by its [`VariableTable`][crate::variable::VariableTable]). Ids are never reused, so
//! a stale id held by an operand or an action simply fails to resolve once the
//! component it named is gone.
use std::fmt;

/// Identifier of a variable (input, output, internal variable or constant).
///
/// Operands and actions refer to variables through this id only; they do not
/// own the variable and must tolerate its disappearance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VariableId(u32);

impl VariableId {
    pub const fn new(id: u32) -> Self {
        VariableId(id)
    }

    /// Returns the raw id.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<VariableId> for u32 {
    fn from(id: VariableId) -> Self {
        id.0
    }
}

/// Identifier of a state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateId(u32);

impl StateId {
    pub const fn new(id: u32) -> Self {
        StateId(id)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Identifier of a transition.
///
/// Transitions leaving the same state are ordered by id, which is also their
/// declaration order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TransitionId(u32);

impl TransitionId {
    pub const fn new(id: u32) -> Self {
        TransitionId(id)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Monotonically increasing id counter owned by a machine.
///
/// # Invariants
///
/// - Ids start at 1 (0 is never handed out)
/// - An id is handed out at most once
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator { next: 1 }
    }

    fn bump(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn variable(&mut self) -> VariableId {
        VariableId(self.bump())
    }

    pub fn state(&mut self) -> StateId {
        StateId(self.bump())
    }

    pub fn transition(&mut self) -> TransitionId {
        TransitionId(self.bump())
    }

    /// Makes sure ids handed out later are greater than `raw`.
    ///
    /// Used when components are restored with ids chosen elsewhere.
    pub fn reserve(&mut self, raw: u32) {
        if raw >= self.next {
            self.next = raw + 1;
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
