//! Change notifications.
//!
//! A [`Machine`](crate::machine::Machine) reports every observable change
//! through an [`Event`]. Observers subscribe with a callback; callbacks run
//! synchronously, in subscription order, after the change is complete.

use std::fmt;

use crate::equation::Change;
use crate::types::{StateId, TransitionId, VariableId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    VariableAdded(VariableId),
    VariableRenamed(VariableId),
    VariableResized(VariableId),
    VariableInitialValueChanged(VariableId),
    VariableCurrentValueChanged(VariableId),
    VariableRemoved(VariableId),
    StateAdded(StateId),
    StateRenamed(StateId),
    StateRemoved(StateId),
    InitialStateChanged(Option<StateId>),
    TransitionAdded(TransitionId),
    TransitionRemoved(TransitionId),
    /// The condition of a transition was edited, or its value or size moved.
    ConditionChanged { transition: TransitionId, change: Change },
    StateActionsChanged(StateId),
    TransitionActionsChanged(TransitionId),
    ActiveStateChanged { previous: Option<StateId>, current: Option<StateId> },
    TransitionCrossed(TransitionId),
}

type Callback = Box<dyn FnMut(&Event)>;

/// List of subscribed callbacks.
#[derive(Default)]
pub struct Notifier {
    callbacks: Vec<Callback>,
    muted: bool,
}

impl Notifier {
    pub fn subscribe(&mut self, callback: impl FnMut(&Event) + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn emit(&mut self, event: Event) {
        if self.muted {
            return;
        }
        for callback in self.callbacks.iter_mut() {
            callback(&event);
        }
    }

    /// While muted, events are dropped.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("callbacks", &self.callbacks.len())
            .field("muted", &self.muted)
            .finish()
    }
}
