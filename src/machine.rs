//! The machine: variables, states and transitions.
//!
//! A [`Machine`] owns every component and is the only way to mutate them, so
//! that the cached value of every transition condition stays in sync with the
//! current values of the variables it reads. Every successful mutation is
//! reported to the subscribers (see [`Machine::subscribe`]) before the call
//! returns.
//!
//! Transitions leaving a state are considered in declaration order, which is
//! the order of their ids.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::action::{Action, ActionType};
use crate::equation::{Change, Equation};
use crate::error::{Error, Result};
use crate::event::{Event, Notifier};
use crate::types::{IdAllocator, StateId, TransitionId, VariableId};
use crate::value::LogicValue;
use crate::variable::{Valuation, Variable, VariableKind, VariableTable};

/// A state, with its Moore actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    id: StateId,
    name: String,
    actions: Vec<Action>,
}

impl State {
    pub fn id(&self) -> StateId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// A transition, with its condition and Mealy actions.
///
/// A transition without a condition is always crossable.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    id: TransitionId,
    source: StateId,
    target: StateId,
    condition: Option<Equation>,
    actions: Vec<Action>,
}

impl Transition {
    pub fn id(&self) -> TransitionId {
        self.id
    }
    pub fn source(&self) -> StateId {
        self.source
    }
    pub fn target(&self) -> StateId {
        self.target
    }
    pub fn condition(&self) -> Option<&Equation> {
        self.condition.as_ref()
    }
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Returns true if the condition is absent or currently `1`.
    pub fn is_crossable(&self) -> bool {
        self.condition.as_ref().map_or(true, |c| c.is_true())
    }

    pub fn condition_text(&self, variables: &VariableTable) -> String {
        match &self.condition {
            Some(condition) => condition.text(variables),
            None => "1".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Machine {
    name: String,
    variables: VariableTable,
    states: BTreeMap<StateId, State>,
    transitions: BTreeMap<TransitionId, Transition>,
    initial_state: Option<StateId>,
    ids: IdAllocator,
    notifier: Notifier,
}

impl Machine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Registers a callback receiving every event of this machine.
    pub fn subscribe(&mut self, callback: impl FnMut(&Event) + 'static) {
        self.notifier.subscribe(callback);
    }

    pub(crate) fn notify(&mut self, event: Event) {
        self.notifier.emit(event);
    }

    // Variables

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id)
    }

    pub fn add_variable(&mut self, name: impl Into<String>, kind: VariableKind, size: usize) -> Result<VariableId> {
        let id = self.variables.add(name, kind, size)?;
        self.notify(Event::VariableAdded(id));
        Ok(id)
    }

    pub fn add_variable_with_value(
        &mut self,
        name: impl Into<String>,
        kind: VariableKind,
        initial_value: LogicValue,
    ) -> Result<VariableId> {
        let id = self.variables.add_with_value(name, kind, initial_value)?;
        self.notify(Event::VariableAdded(id));
        Ok(id)
    }

    /// Re-creates a saved variable with its saved id.
    pub fn restore_variable(
        &mut self,
        id: VariableId,
        name: impl Into<String>,
        kind: VariableKind,
        initial_value: LogicValue,
    ) -> Result<()> {
        self.variables.restore(id, name, kind, initial_value)?;
        self.notify(Event::VariableAdded(id));
        Ok(())
    }

    pub fn rename_variable(&mut self, id: VariableId, name: impl Into<String>) -> Result<()> {
        self.variables.get_mut(id)?.set_name(name);
        self.notify(Event::VariableRenamed(id));
        Ok(())
    }

    /// Changes the width of a variable.
    ///
    /// Actions on the variable are clamped to the new width, conditions are
    /// recomputed.
    pub fn resize_variable(&mut self, id: VariableId, size: usize) -> Result<()> {
        let before = self.variables.get(id).map(|v| v.current_value().clone());
        self.variables.get_mut(id)?.resize(size)?;
        debug!("resize {} to {} bits", id, size);

        let mut touched_states = Vec::new();
        for state in self.states.values_mut() {
            let mut touched = false;
            for action in state.actions.iter_mut().filter(|a| a.variable() == id) {
                action.on_variable_resized(&self.variables)?;
                touched = true;
            }
            if touched {
                touched_states.push(state.id);
            }
        }
        let mut touched_transitions = Vec::new();
        for transition in self.transitions.values_mut() {
            let mut touched = false;
            for action in transition.actions.iter_mut().filter(|a| a.variable() == id) {
                action.on_variable_resized(&self.variables)?;
                touched = true;
            }
            if touched {
                touched_transitions.push(transition.id);
            }
        }

        self.refresh_conditions();
        self.notify(Event::VariableResized(id));
        if before.as_ref() != self.variables.get(id).map(|v| v.current_value()) {
            self.notify(Event::VariableCurrentValueChanged(id));
        }
        for state in touched_states {
            self.notify(Event::StateActionsChanged(state));
        }
        for transition in touched_transitions {
            self.notify(Event::TransitionActionsChanged(transition));
        }
        Ok(())
    }

    pub fn set_initial_value(&mut self, id: VariableId, value: LogicValue) -> Result<()> {
        self.variables.get_mut(id)?.set_initial_value(value)?;
        self.notify(Event::VariableInitialValueChanged(id));
        Ok(())
    }

    /// Writes the live value of a variable and recomputes the conditions.
    pub fn set_current_value(&mut self, id: VariableId, value: LogicValue) -> Result<()> {
        self.write_variables(|machine| machine.variables.get_mut(id)?.set_current_value(value))
    }

    /// Restores every current value to its initial value.
    pub fn reset_current_values(&mut self) -> Result<()> {
        self.write_variables(|machine| {
            machine.variables.reset_current_values();
            Ok(())
        })
    }

    /// Removes a variable.
    ///
    /// Operand slots using it are emptied and actions on it are dropped.
    pub fn remove_variable(&mut self, id: VariableId) -> Result<Variable> {
        let variable = self.variables.remove(id)?;

        let mut changed_conditions = Vec::new();
        for transition in self.transitions.values_mut() {
            if let Some(condition) = transition.condition.as_mut() {
                if condition.references(id) {
                    let change = condition.forget_variable(id, &self.variables.current());
                    changed_conditions.push((transition.id, change));
                }
            }
        }

        let mut touched_states = Vec::new();
        for state in self.states.values_mut() {
            let count = state.actions.len();
            state.actions.retain(|a| a.variable() != id);
            if state.actions.len() != count {
                touched_states.push(state.id);
            }
        }
        let mut touched_transitions = Vec::new();
        for transition in self.transitions.values_mut() {
            let count = transition.actions.len();
            transition.actions.retain(|a| a.variable() != id);
            if transition.actions.len() != count {
                touched_transitions.push(transition.id);
            }
        }

        self.notify(Event::VariableRemoved(id));
        for (transition, change) in changed_conditions {
            self.notify(Event::ConditionChanged { transition, change });
        }
        for state in touched_states {
            self.notify(Event::StateActionsChanged(state));
        }
        for transition in touched_transitions {
            self.notify(Event::TransitionActionsChanged(transition));
        }
        Ok(variable)
    }

    // States

    pub fn add_state(&mut self, name: impl Into<String>) -> StateId {
        let id = self.ids.state();
        self.insert_state(id, name.into());
        id
    }

    /// Re-creates a saved state with its saved id.
    pub fn restore_state(&mut self, id: StateId, name: impl Into<String>) {
        self.ids.reserve(id.raw());
        self.insert_state(id, name.into());
    }

    fn insert_state(&mut self, id: StateId, name: String) {
        debug!("add state `{}` ({})", name, id);
        self.states.insert(
            id,
            State {
                id,
                name,
                actions: Vec::new(),
            },
        );
        self.notify(Event::StateAdded(id));
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(&id)
    }

    /// States in creation order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    pub fn find_state(&self, name: &str) -> Option<StateId> {
        self.states().find(|s| s.name == name).map(|s| s.id)
    }

    pub fn rename_state(&mut self, id: StateId, name: impl Into<String>) -> Result<()> {
        self.state_mut(id)?.name = name.into();
        self.notify(Event::StateRenamed(id));
        Ok(())
    }

    /// Removes a state and every transition entering or leaving it.
    pub fn remove_state(&mut self, id: StateId) -> Result<State> {
        let state = self.states.remove(&id).ok_or(Error::UnknownState(id))?;
        debug!("remove state `{}` ({})", state.name, id);

        let connected: Vec<TransitionId> = self
            .transitions
            .values()
            .filter(|t| t.source == id || t.target == id)
            .map(|t| t.id)
            .collect();
        for transition in &connected {
            self.transitions.remove(transition);
        }

        self.notify(Event::StateRemoved(id));
        for transition in connected {
            self.notify(Event::TransitionRemoved(transition));
        }
        if self.initial_state == Some(id) {
            self.initial_state = None;
            self.notify(Event::InitialStateChanged(None));
        }
        Ok(state)
    }

    pub fn initial_state(&self) -> Option<StateId> {
        self.initial_state
    }

    pub fn set_initial_state(&mut self, id: Option<StateId>) -> Result<()> {
        if let Some(id) = id {
            self.state(id).ok_or(Error::UnknownState(id))?;
        }
        if self.initial_state != id {
            self.initial_state = id;
            self.notify(Event::InitialStateChanged(id));
        }
        Ok(())
    }

    pub fn add_state_action(&mut self, state: StateId, action: Action) -> Result<usize> {
        let actions = &mut self.state_mut(state)?.actions;
        actions.push(action);
        let index = actions.len() - 1;
        self.notify(Event::StateActionsChanged(state));
        Ok(index)
    }

    pub fn remove_state_action(&mut self, state: StateId, index: usize) -> Result<Action> {
        let actions = &mut self.state_mut(state)?.actions;
        if index >= actions.len() {
            return Err(Error::OutOfRange {
                index,
                size: actions.len(),
            });
        }
        let action = actions.remove(index);
        self.notify(Event::StateActionsChanged(state));
        Ok(action)
    }

    /// Edits a Moore action in place.
    pub fn update_state_action<T>(
        &mut self,
        state: StateId,
        index: usize,
        f: impl FnOnce(&mut Action, &VariableTable) -> Result<T>,
    ) -> Result<T> {
        let actions = &mut self.states.get_mut(&state).ok_or(Error::UnknownState(state))?.actions;
        let size = actions.len();
        let action = actions.get_mut(index).ok_or(Error::OutOfRange { index, size })?;
        let result = f(action, &self.variables)?;
        self.notify(Event::StateActionsChanged(state));
        Ok(result)
    }

    fn state_mut(&mut self, id: StateId) -> Result<&mut State> {
        self.states.get_mut(&id).ok_or(Error::UnknownState(id))
    }

    // Transitions

    /// Adds a transition; `None` as condition means "always".
    pub fn add_transition(
        &mut self,
        source: StateId,
        target: StateId,
        condition: Option<Equation>,
    ) -> Result<TransitionId> {
        self.check_endpoints(source, target)?;
        let id = self.ids.transition();
        self.insert_transition(id, source, target, condition);
        Ok(id)
    }

    /// Re-creates a saved transition with its saved id.
    pub fn restore_transition(
        &mut self,
        id: TransitionId,
        source: StateId,
        target: StateId,
        condition: Option<Equation>,
    ) -> Result<()> {
        self.check_endpoints(source, target)?;
        self.ids.reserve(id.raw());
        self.insert_transition(id, source, target, condition);
        Ok(())
    }

    fn check_endpoints(&self, source: StateId, target: StateId) -> Result<()> {
        for id in [source, target] {
            self.state(id).ok_or(Error::UnknownState(id))?;
        }
        Ok(())
    }

    fn insert_transition(
        &mut self,
        id: TransitionId,
        source: StateId,
        target: StateId,
        mut condition: Option<Equation>,
    ) {
        if let Some(condition) = condition.as_mut() {
            condition.refresh(&self.variables.current());
        }
        debug!("add transition {} ({} -> {})", id, source, target);
        self.transitions.insert(
            id,
            Transition {
                id,
                source,
                target,
                condition,
                actions: Vec::new(),
            },
        );
        self.notify(Event::TransitionAdded(id));
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(&id)
    }

    /// Transitions in declaration order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    /// Transitions leaving `state`, in declaration order.
    pub fn outgoing(&self, state: StateId) -> impl Iterator<Item = &Transition> {
        self.transitions.values().filter(move |t| t.source == state)
    }

    pub fn remove_transition(&mut self, id: TransitionId) -> Result<Transition> {
        let transition = self.transitions.remove(&id).ok_or(Error::UnknownTransition(id))?;
        debug!("remove transition {}", id);
        self.notify(Event::TransitionRemoved(id));
        Ok(transition)
    }

    /// Replaces the condition of a transition.
    pub fn set_condition(&mut self, id: TransitionId, condition: Option<Equation>) -> Result<Change> {
        let valuation = self.variables.current();
        let transition = self.transitions.get_mut(&id).ok_or(Error::UnknownTransition(id))?;
        let old = transition.condition.as_ref().map(|c| c.value().clone());
        transition.condition = condition;
        let new = match transition.condition.as_mut() {
            Some(condition) => {
                condition.refresh(&valuation);
                Some(condition.value().clone())
            }
            None => None,
        };
        let change = Change {
            value: old != new,
            size: old.map_or(0, |v| v.size()) != new.map_or(0, |v| v.size()),
        };
        self.notify(Event::ConditionChanged { transition: id, change });
        Ok(change)
    }

    /// Edits the condition of a transition in place.
    ///
    /// The closure receives the live valuation to pass to the equation
    /// mutators.
    pub fn update_condition<T>(
        &mut self,
        id: TransitionId,
        f: impl FnOnce(&mut Equation, &dyn Valuation) -> T,
    ) -> Result<T> {
        let valuation = self.variables.current();
        let transition = self.transitions.get_mut(&id).ok_or(Error::UnknownTransition(id))?;
        let condition = transition
            .condition
            .as_mut()
            .ok_or(Error::IllegalOperation("transition has no condition"))?;
        let old = condition.value().clone();
        let result = f(condition, &valuation);
        let change = Change {
            value: condition.value() != &old,
            size: condition.size() != old.size(),
        };
        self.notify(Event::ConditionChanged { transition: id, change });
        Ok(result)
    }

    pub fn add_transition_action(&mut self, transition: TransitionId, action: Action) -> Result<usize> {
        let actions = &mut self.transition_mut(transition)?.actions;
        actions.push(action);
        let index = actions.len() - 1;
        self.notify(Event::TransitionActionsChanged(transition));
        Ok(index)
    }

    pub fn remove_transition_action(&mut self, transition: TransitionId, index: usize) -> Result<Action> {
        let actions = &mut self.transition_mut(transition)?.actions;
        if index >= actions.len() {
            return Err(Error::OutOfRange {
                index,
                size: actions.len(),
            });
        }
        let action = actions.remove(index);
        self.notify(Event::TransitionActionsChanged(transition));
        Ok(action)
    }

    /// Edits a Mealy action in place.
    pub fn update_transition_action<T>(
        &mut self,
        transition: TransitionId,
        index: usize,
        f: impl FnOnce(&mut Action, &VariableTable) -> Result<T>,
    ) -> Result<T> {
        let actions = &mut self
            .transitions
            .get_mut(&transition)
            .ok_or(Error::UnknownTransition(transition))?
            .actions;
        let size = actions.len();
        let action = actions.get_mut(index).ok_or(Error::OutOfRange { index, size })?;
        let result = f(action, &self.variables)?;
        self.notify(Event::TransitionActionsChanged(transition));
        Ok(result)
    }

    fn transition_mut(&mut self, id: TransitionId) -> Result<&mut Transition> {
        self.transitions.get_mut(&id).ok_or(Error::UnknownTransition(id))
    }

    // Loading

    /// Repairs a machine built through the `restore_*` and [`Action::raw`] paths.
    ///
    /// Every action is checked against its variable and fixed if needed;
    /// actions on missing variables are dropped. Every condition is recomputed.
    /// Returns the number of actions fixed or dropped.
    pub fn finalize_loading(&mut self) -> usize {
        let mut count = 0;
        let variables = &self.variables;
        let lists = self
            .states
            .values_mut()
            .map(|s| &mut s.actions)
            .chain(self.transitions.values_mut().map(|t| &mut t.actions));
        for actions in lists {
            actions.retain_mut(|action| match action.check_and_fix(variables) {
                Ok(fixed) => {
                    count += usize::from(fixed);
                    true
                }
                Err(e) => {
                    warn!("dropping action: {}", e);
                    count += 1;
                    false
                }
            });
        }
        for transition in self.transitions.values_mut() {
            if let Some(condition) = transition.condition.as_mut() {
                condition.refresh(&self.variables.current());
            }
        }
        if let Some(initial) = self.initial_state {
            if !self.states.contains_key(&initial) {
                warn!("initial state {} does not exist", initial);
                self.initial_state = None;
            }
        }
        debug!("loading finalized, {} actions fixed", count);
        count
    }

    // Simulation support

    /// Recomputes every condition, reporting the ones that moved.
    pub(crate) fn refresh_conditions(&mut self) {
        let valuation = self.variables.current();
        for transition in self.transitions.values_mut() {
            if let Some(condition) = transition.condition.as_mut() {
                let change = condition.refresh(&valuation);
                if !change.is_empty() {
                    self.notifier.emit(Event::ConditionChanged {
                        transition: transition.id,
                        change,
                    });
                }
            }
        }
    }

    /// Runs `f`, then recomputes the conditions and reports the variables
    /// whose current value moved.
    fn write_variables(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let before: Vec<(VariableId, LogicValue)> = self
            .variables
            .iter()
            .map(|v| (v.id(), v.current_value().clone()))
            .collect();
        let result = f(self);
        let changed: Vec<VariableId> = before
            .into_iter()
            .filter(|(id, value)| self.variables.get(*id).is_some_and(|v| v.current_value() != value))
            .map(|(id, _)| id)
            .collect();
        if !changed.is_empty() {
            self.refresh_conditions();
            for id in changed {
                self.notify(Event::VariableCurrentValueChanged(id));
            }
        }
        result
    }

    pub(crate) fn begin_state_actions(&mut self, state: StateId) -> Result<()> {
        self.write_variables(|machine| {
            let state = machine.states.get_mut(&state).ok_or(Error::UnknownState(state))?;
            for action in state.actions.iter_mut() {
                action.begin(&mut machine.variables)?;
            }
            Ok(())
        })
    }

    pub(crate) fn end_state_actions(&mut self, state: StateId) -> Result<()> {
        self.write_variables(|machine| {
            let state = machine.states.get_mut(&state).ok_or(Error::UnknownState(state))?;
            for action in state.actions.iter_mut() {
                action.end(&mut machine.variables)?;
            }
            Ok(())
        })
    }

    /// Ends the acting pulses of a state that stays active.
    pub(crate) fn end_state_pulses(&mut self, state: StateId) -> Result<()> {
        self.write_variables(|machine| {
            let state = machine.states.get_mut(&state).ok_or(Error::UnknownState(state))?;
            for action in state.actions.iter_mut() {
                if action.action_type() == ActionType::Pulse {
                    action.end(&mut machine.variables)?;
                }
            }
            Ok(())
        })
    }

    /// Begins then ends every Mealy action of a transition.
    pub(crate) fn fire_transition_actions(&mut self, transition: TransitionId) -> Result<()> {
        self.write_variables(|machine| {
            let transition = machine
                .transitions
                .get_mut(&transition)
                .ok_or(Error::UnknownTransition(transition))?;
            for action in transition.actions.iter_mut() {
                action.begin(&mut machine.variables)?;
            }
            for action in transition.actions.iter_mut() {
                action.end(&mut machine.variables)?;
            }
            Ok(())
        })
    }

    /// Forgets which actions are acting, without writing anything.
    pub(crate) fn clear_acting(&mut self) {
        let lists = self
            .states
            .values_mut()
            .map(|s| &mut s.actions)
            .chain(self.transitions.values_mut().map(|t| &mut t.actions));
        for actions in lists {
            for action in actions.iter_mut() {
                action.clear_acting();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::equation::{FailureCause, Operator};

    fn recorder(machine: &mut Machine) -> Rc<RefCell<Vec<Event>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        machine.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        events
    }

    #[test]
    fn test_outgoing_in_declaration_order() {
        let mut m = Machine::new("m");
        let s0 = m.add_state("S0");
        let s1 = m.add_state("S1");
        let s2 = m.add_state("S2");
        let t1 = m.add_transition(s0, s1, None).unwrap();
        let t2 = m.add_transition(s1, s2, None).unwrap();
        let t3 = m.add_transition(s0, s2, None).unwrap();

        let out: Vec<TransitionId> = m.outgoing(s0).map(|t| t.id()).collect();
        assert_eq!(out, vec![t1, t3]);
        assert_eq!(m.outgoing(s1).next().map(|t| t.id()), Some(t2));
        assert!(m.add_transition(s0, StateId::new(99), None).is_err());
    }

    #[test]
    fn test_conditions_follow_current_values() {
        let mut m = Machine::new("m");
        let x = m.add_variable("x", VariableKind::Input, 1).unwrap();
        let s0 = m.add_state("S0");
        let t = m
            .add_transition(s0, s0, Some(Equation::identity(x, &m.variables().current())))
            .unwrap();
        let events = recorder(&mut m);

        assert!(!m.transition(t).unwrap().is_crossable());
        m.set_current_value(x, LogicValue::ones(1)).unwrap();
        assert!(m.transition(t).unwrap().is_crossable());

        let events = events.borrow();
        assert!(events.contains(&Event::VariableCurrentValueChanged(x)));
        assert!(events.iter().any(|e| matches!(
            e,
            Event::ConditionChanged { transition, change } if *transition == t && change.value
        )));
    }

    #[test]
    fn test_reset_current_values() {
        let mut m = Machine::new("m");
        let x = m.add_variable("x", VariableKind::Input, 1).unwrap();
        let s0 = m.add_state("S0");
        let t = m
            .add_transition(s0, s0, Some(Equation::identity(x, &m.variables().current())))
            .unwrap();
        m.set_current_value(x, LogicValue::ones(1)).unwrap();
        let events = recorder(&mut m);

        m.reset_current_values().unwrap();
        assert_eq!(m.variable(x).unwrap().current_value(), &LogicValue::zeros(1));
        assert!(!m.transition(t).unwrap().is_crossable());
        assert!(events.borrow().contains(&Event::VariableCurrentValueChanged(x)));

        events.borrow_mut().clear();
        m.reset_current_values().unwrap();
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_unchanged_write_emits_nothing() {
        let mut m = Machine::new("m");
        let x = m.add_variable("x", VariableKind::Input, 1).unwrap();
        let s0 = m.add_state("S0");
        m.add_transition(s0, s0, Some(Equation::identity(x, &m.variables().current())))
            .unwrap();
        let events = recorder(&mut m);
        m.set_current_value(x, LogicValue::zeros(1)).unwrap();
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_remove_variable_invalidates_users() {
        let mut m = Machine::new("m");
        let x = m.add_variable("x", VariableKind::Input, 1).unwrap();
        let y = m.add_variable("y", VariableKind::Output, 1).unwrap();
        let s0 = m.add_state("S0");
        let vals = m.variables().current();
        let condition = Equation::from_operands(Operator::And, vec![x.into(), y.into()], &vals).unwrap();
        let t = m.add_transition(s0, s0, Some(condition)).unwrap();
        let action = Action::new(y, ActionType::Pulse, m.variables()).unwrap();
        m.add_state_action(s0, action.clone()).unwrap();
        m.add_transition_action(t, action).unwrap();

        m.remove_variable(y).unwrap();

        let transition = m.transition(t).unwrap();
        let condition = transition.condition().unwrap();
        assert!(condition.operand(1).is_none());
        assert_eq!(condition.failure_cause(), FailureCause::NullOperand);
        assert!(transition.actions().is_empty());
        assert!(m.state(s0).unwrap().actions().is_empty());
        assert_eq!(m.remove_variable(y).unwrap_err(), Error::UnknownVariable(y));
    }

    #[test]
    fn test_remove_state_cascades() {
        let mut m = Machine::new("m");
        let s0 = m.add_state("S0");
        let s1 = m.add_state("S1");
        m.set_initial_state(Some(s1)).unwrap();
        let t = m.add_transition(s0, s1, None).unwrap();
        let events = recorder(&mut m);

        m.remove_state(s1).unwrap();
        assert!(m.transition(t).is_none());
        assert_eq!(m.initial_state(), None);
        assert_eq!(
            *events.borrow(),
            vec![
                Event::StateRemoved(s1),
                Event::TransitionRemoved(t),
                Event::InitialStateChanged(None),
            ]
        );
    }

    #[test]
    fn test_resize_clamps_actions_and_conditions() {
        let mut m = Machine::new("m");
        let c = m.add_variable("c", VariableKind::Internal, 4).unwrap();
        let s0 = m.add_state("S0");
        let vals = m.variables().current();
        let t = m
            .add_transition(s0, s0, Some(Equation::extract(c, 3, None, &vals)))
            .unwrap();
        let action = Action::with_range(c, ActionType::Assign, crate::value::BitRange::slice(3, 1), m.variables())
            .unwrap();
        m.add_state_action(s0, action).unwrap();

        m.resize_variable(c, 2).unwrap();
        let condition = m.transition(t).unwrap().condition().unwrap();
        assert_eq!(condition.failure_cause(), FailureCause::IncorrectParameter);
        let action = &m.state(s0).unwrap().actions()[0];
        assert_eq!(action.action_size(m.variables()), 1);
        assert_eq!(action.action_type(), ActionType::Set);
        assert_eq!(m.resize_variable(c, 0), Err(Error::InvalidSize(0)));
    }

    #[test]
    fn test_update_condition() {
        let mut m = Machine::new("m");
        let x = m.add_variable("x", VariableKind::Input, 1).unwrap();
        let s0 = m.add_state("S0");
        let t = m.add_transition(s0, s0, None).unwrap();
        assert!(m.update_condition(t, |_, _| ()).is_err());

        m.set_condition(t, Some(Equation::new(Operator::Not))).unwrap();
        let change = m
            .update_condition(t, |condition, vals| condition.set_operand(0, x, vals))
            .unwrap()
            .unwrap();
        assert!(change.size);
        assert!(m.transition(t).unwrap().is_crossable());
        assert_eq!(m.transition(t).unwrap().condition_text(m.variables()), "/x");
    }

    #[test]
    fn test_update_actions() {
        let mut m = Machine::new("m");
        let c = m.add_variable("c", VariableKind::Output, 3).unwrap();
        let s0 = m.add_state("S0");
        let action = Action::new(c, ActionType::Set, m.variables()).unwrap();
        let index = m.add_state_action(s0, action).unwrap();
        m.update_state_action(s0, index, |action, vars| action.set_action_type(ActionType::Assign, vars))
            .unwrap();
        assert_eq!(
            m.state(s0).unwrap().actions()[0].action_value(m.variables()).to_string(),
            "111"
        );
        assert!(m.update_state_action(s0, 3, |_, _| Ok(())).is_err());
        assert!(m.remove_state_action(s0, 0).is_ok());
        assert!(m.remove_state_action(s0, 0).is_err());
    }

    #[test]
    fn test_finalize_loading() {
        let mut m = Machine::new("m");
        m.restore_variable(VariableId::new(3), "c", VariableKind::Internal, LogicValue::zeros(4))
            .unwrap();
        let c = VariableId::new(3);
        m.restore_state(StateId::new(10), "S0");
        let s0 = StateId::new(10);
        m.set_initial_state(Some(s0)).unwrap();
        m.add_state_action(
            s0,
            Action::raw(c, ActionType::Assign, crate::value::BitRange::Bit(9), Some(LogicValue::ones(1))),
        )
        .unwrap();
        m.add_state_action(s0, Action::raw(VariableId::new(42), ActionType::Set, crate::value::BitRange::Whole, None))
            .unwrap();

        assert_eq!(m.finalize_loading(), 2);
        let actions = m.state(s0).unwrap().actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_value(m.variables()).to_string(), "0001");
        assert_eq!(m.finalize_loading(), 0);

        // Restored ids are never handed out again.
        assert_eq!(m.add_state("S1").raw(), 11);
        assert_eq!(m.add_variable("d", VariableKind::Input, 1).unwrap().raw(), 4);
    }
}
