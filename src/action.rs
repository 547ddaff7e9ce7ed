//! Actions on variables.
//!
//! An [`Action`] is one effect on a variable, or on a range of its bits,
//! attached to a state (Moore action) or to a transition (Mealy action).
//!
//! ## Implicit and explicit values
//!
//! The value written by `Set`, `Reset`, `Increment` and `Decrement` is implied
//! by the type. So is the value of `Pulse` and `ActiveOnState` on a single bit.
//! `Assign`, and `Pulse`/`ActiveOnState` on several bits, carry an explicit,
//! stored value. An action stores a value if and only if its value is
//! explicit.
//!
//! `Assign` is never used on a single bit (`Set`/`Reset` are used instead).
//!
//! ## Loading
//!
//! [`Action::raw`] builds an action from saved fields without any check.
//! [`Action::check_and_fix`] must then be called once every variable exists,
//! to repair ranges and values that no longer fit.

use std::fmt;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::types::VariableId;
use crate::value::{BitRange, LogicValue};
use crate::variable::{Variable, VariableTable};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// Value written on activation, zero again after one step.
    Pulse,
    /// Value held while the owning state is active.
    ActiveOnState,
    Set,
    Reset,
    Assign,
    Increment,
    Decrement,
}

impl ActionType {
    /// Returns true if the effect outlives the activation.
    pub fn is_memorized(self) -> bool {
        match self {
            ActionType::Set
            | ActionType::Reset
            | ActionType::Assign
            | ActionType::Increment
            | ActionType::Decrement => true,
            ActionType::Pulse | ActionType::ActiveOnState => false,
        }
    }

    /// Returns true if an action of this type on `size` bits stores its value.
    pub fn has_explicit_value(self, size: usize) -> bool {
        match self {
            ActionType::Assign => true,
            ActionType::Pulse | ActionType::ActiveOnState => size > 1,
            ActionType::Set | ActionType::Reset | ActionType::Increment | ActionType::Decrement => false,
        }
    }

    /// Explicit value standing for what an action of this type used to write.
    fn materialize(self, size: usize) -> LogicValue {
        match self {
            ActionType::Reset => LogicValue::zeros(size),
            _ => LogicValue::ones(size),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::Pulse => "pulse",
            ActionType::ActiveOnState => "active on state",
            ActionType::Set => "set",
            ActionType::Reset => "reset",
            ActionType::Assign => "assign",
            ActionType::Increment => "increment",
            ActionType::Decrement => "decrement",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    variable: VariableId,
    action_type: ActionType,
    range: BitRange,
    /// Stored value, present iff the value is explicit.
    value: Option<LogicValue>,
    /// Set between `begin` and `end` of a non-memorized action.
    acting: bool,
}

impl Action {
    /// Creates an action on the whole variable.
    pub fn new(variable: VariableId, action_type: ActionType, variables: &VariableTable) -> Result<Self> {
        Self::with_range(variable, action_type, BitRange::Whole, variables)
    }

    /// Creates an action on a range of the variable.
    ///
    /// `Assign` on a single bit becomes `Set`.
    pub fn with_range(
        variable: VariableId,
        action_type: ActionType,
        range: BitRange,
        variables: &VariableTable,
    ) -> Result<Self> {
        let var = variables.get(variable).ok_or(Error::UnknownVariable(variable))?;
        if !var.kind().is_writable_by_actions() {
            return Err(Error::IllegalType("only outputs and internal variables can be acted on"));
        }
        let range = checked_range(var, range)?;
        let size = range.width(var.size());
        let action_type = coerce_assign(action_type, size);
        let value = action_type
            .has_explicit_value(size)
            .then(|| match action_type {
                ActionType::Assign => LogicValue::zeros(size),
                other => other.materialize(size),
            });
        Ok(Self {
            variable,
            action_type,
            range,
            value,
            acting: false,
        })
    }

    /// Builds an action from trusted fields, without any check.
    pub fn raw(variable: VariableId, action_type: ActionType, range: BitRange, value: Option<LogicValue>) -> Self {
        Self {
            variable,
            action_type,
            range,
            value,
            acting: false,
        }
    }

    pub fn variable(&self) -> VariableId {
        self.variable
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn range(&self) -> BitRange {
        self.range
    }

    /// Left bound in flat form (`-1` when unset).
    pub fn range_l(&self) -> i64 {
        self.range.bounds().0
    }

    /// Right bound in flat form (`-1` when unset).
    pub fn range_r(&self) -> i64 {
        self.range.bounds().1
    }

    pub fn is_memorized(&self) -> bool {
        self.action_type.is_memorized()
    }

    /// Returns true if the value can be edited with [`set_action_value`](Self::set_action_value).
    pub fn has_explicit_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_acting(&self) -> bool {
        self.acting
    }

    /// Number of bits written by the action, 0 if the variable is gone.
    pub fn action_size(&self, variables: &VariableTable) -> usize {
        match variables.get(self.variable) {
            Some(var) if var.size() == 1 => 1,
            Some(var) => self.range.width(var.size()),
            None => 0,
        }
    }

    /// Value written when the action begins.
    pub fn action_value(&self, variables: &VariableTable) -> LogicValue {
        if let Some(value) = &self.value {
            return value.clone();
        }
        let size = self.action_size(variables);
        match self.action_type {
            ActionType::Reset => LogicValue::zeros(size),
            ActionType::Set | ActionType::Pulse | ActionType::ActiveOnState | ActionType::Assign => {
                LogicValue::ones(size)
            }
            ActionType::Increment | ActionType::Decrement => {
                let Some(var) = variables.get(self.variable) else {
                    return LogicValue::null();
                };
                let mut value = var.current_value().read_range(self.range).unwrap_or_default();
                if self.action_type == ActionType::Increment {
                    value.increment();
                } else {
                    value.decrement();
                }
                value
            }
        }
    }

    /// Changes the type, converting between implicit and explicit values.
    pub fn set_action_type(&mut self, action_type: ActionType, variables: &VariableTable) -> Result<()> {
        let size = self.action_size(variables);
        if action_type == ActionType::Assign && size == 1 {
            return Err(Error::IllegalType("assign needs a target of more than one bit"));
        }
        if action_type.has_explicit_value(size) {
            if self.value.is_none() {
                self.value = Some(self.action_type.materialize(size));
            }
        } else {
            self.value = None;
        }
        debug!("action on {}: {} -> {}", self.variable, self.action_type, action_type);
        self.action_type = action_type;
        Ok(())
    }

    /// Sets the explicit value. Narrower values are zero-extended.
    pub fn set_action_value(&mut self, value: LogicValue, variables: &VariableTable) -> Result<()> {
        if self.value.is_none() {
            return Err(Error::ReadOnly);
        }
        let value = fit_value(value, self.action_size(variables))?;
        self.value = Some(value);
        Ok(())
    }

    /// Moves the action to another range, optionally with a new explicit value.
    pub fn set_action_range(
        &mut self,
        range: BitRange,
        value: Option<LogicValue>,
        variables: &VariableTable,
    ) -> Result<()> {
        let var = variables
            .get(self.variable)
            .ok_or(Error::UnknownVariable(self.variable))?;
        let range = checked_range(var, range)?;
        let size = range.width(var.size());
        let action_type = coerce_assign(self.action_type, size);

        let stored = if action_type.has_explicit_value(size) {
            match value {
                Some(value) => Some(fit_value(value, size)?),
                None => Some(match &self.value {
                    Some(previous) => previous.resized(size),
                    None => self.action_type.materialize(size),
                }),
            }
        } else {
            None
        };

        self.range = range;
        self.action_type = action_type;
        self.value = stored;
        Ok(())
    }

    /// Writes the action value into the variable.
    pub fn begin(&mut self, variables: &mut VariableTable) -> Result<()> {
        let value = self.action_value(variables);
        let var = variables.get_mut(self.variable)?;
        let range = if var.size() == 1 { BitRange::Whole } else { self.range };
        var.set_current_value_sub_range(&value, range)?;
        if !self.is_memorized() {
            self.acting = true;
        }
        Ok(())
    }

    /// Writes zero back if the action is acting. No-op for memorized actions.
    pub fn end(&mut self, variables: &mut VariableTable) -> Result<()> {
        if !self.acting {
            return Ok(());
        }
        self.acting = false;
        let size = self.action_size(variables);
        let var = variables.get_mut(self.variable)?;
        let range = if var.size() == 1 { BitRange::Whole } else { self.range };
        var.set_current_value_sub_range(&LogicValue::zeros(size), range)
    }

    /// Forgets the acting status without touching the variable.
    pub(crate) fn clear_acting(&mut self) {
        self.acting = false;
    }

    /// Adapts range and value to the current size of the variable.
    pub fn on_variable_resized(&mut self, variables: &VariableTable) -> Result<()> {
        for fix in self.normalize(variables)? {
            debug!("action on {} adjusted after resize: {}", self.variable, fix);
        }
        Ok(())
    }

    /// Repairs an action built with [`raw`](Self::raw). Returns true if anything changed.
    pub fn check_and_fix(&mut self, variables: &VariableTable) -> Result<bool> {
        let fixes = self.normalize(variables)?;
        for fix in &fixes {
            warn!("action on {}: {}", self.variable, fix);
        }
        Ok(!fixes.is_empty())
    }

    fn normalize(&mut self, variables: &VariableTable) -> Result<Vec<&'static str>> {
        let var = variables
            .get(self.variable)
            .ok_or(Error::UnknownVariable(self.variable))?;
        let mut fixes = Vec::new();

        let range = clamp_range(self.range, var.size());
        if range != self.range {
            fixes.push("range clamped to the variable size");
            self.range = range;
        }

        let size = self.range.width(var.size());
        let action_type = coerce_assign(self.action_type, size);
        if action_type != self.action_type {
            fixes.push("assign on a single bit replaced by set");
            self.action_type = action_type;
        }

        if self.action_type.has_explicit_value(size) {
            match &self.value {
                None => {
                    fixes.push("missing value replaced by default");
                    self.value = Some(self.action_type.materialize(size));
                }
                Some(value) if value.size() != size => {
                    fixes.push("value resized to the action size");
                    self.value = Some(value.resized(size));
                }
                Some(_) => {}
            }
        } else if self.value.is_some() {
            fixes.push("value dropped as implied by the action type");
            self.value = None;
        }
        Ok(fixes)
    }

    /// Short description such as `count[3:0] ← 0101`.
    pub fn text(&self, variables: &VariableTable) -> String {
        let name = variables.name(self.variable).unwrap_or("?");
        let target = format!("{}{}", name, self.range);
        match self.action_type {
            ActionType::Set | ActionType::Reset | ActionType::Assign => {
                format!("{} ← {}", target, self.action_value(variables))
            }
            ActionType::Increment => format!("{}++", target),
            ActionType::Decrement => format!("{}--", target),
            ActionType::Pulse | ActionType::ActiveOnState => match &self.value {
                Some(value) => format!("{} = {} ({})", target, value, self.action_type),
                None => format!("{} ({})", target, self.action_type),
            },
        }
    }
}

/// Validates a range for `var`, using whole-variable addressing for single bits.
fn checked_range(var: &Variable, range: BitRange) -> Result<BitRange> {
    range.bounds_in(var.size())?;
    Ok(if var.size() == 1 { BitRange::Whole } else { range })
}

fn coerce_assign(action_type: ActionType, size: usize) -> ActionType {
    if action_type == ActionType::Assign && size == 1 {
        debug!("assign on a single bit, using set instead");
        ActionType::Set
    } else {
        action_type
    }
}

/// Zero-extends narrower values, rejects null or wider ones.
fn fit_value(value: LogicValue, size: usize) -> Result<LogicValue> {
    if value.is_null() || value.size() > size {
        return Err(Error::IllegalValue(format!(
            "value of size {} does not fit an action of size {}",
            value.size(),
            size
        )));
    }
    Ok(value.resized(size))
}

/// Shrinks a range to fit `size` bits, falling back to the whole variable.
fn clamp_range(range: BitRange, size: usize) -> BitRange {
    if size <= 1 {
        return BitRange::Whole;
    }
    match range {
        BitRange::Whole => BitRange::Whole,
        BitRange::Bit(i) if i < size => range,
        BitRange::Slice { left, right } if left > right && left < size => range,
        BitRange::Slice { left, right } if left > right && right < size => BitRange::slice(size - 1, right),
        _ => BitRange::Whole,
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::variable::VariableKind;

    fn v(s: &str) -> LogicValue {
        s.parse().unwrap()
    }

    fn setup() -> (VariableTable, VariableId, VariableId) {
        let mut vars = VariableTable::new();
        let y = vars.add("y", VariableKind::Output, 1).unwrap();
        let count = vars.add("count", VariableKind::Internal, 4).unwrap();
        (vars, y, count)
    }

    fn current(vars: &VariableTable, id: VariableId) -> String {
        vars.get(id).unwrap().current_value().to_string()
    }

    #[test]
    fn test_implicit_values() {
        let (vars, y, count) = setup();
        let set = Action::new(count, ActionType::Set, &vars).unwrap();
        let reset = Action::new(count, ActionType::Reset, &vars).unwrap();
        let pulse = Action::new(y, ActionType::Pulse, &vars).unwrap();
        assert!(!set.has_explicit_value());
        assert_eq!(set.action_value(&vars), v("1111"));
        assert_eq!(reset.action_value(&vars), v("0000"));
        assert!(!pulse.has_explicit_value());
        assert_eq!(pulse.action_value(&vars), v("1"));
        assert_eq!(pulse.action_size(&vars), 1);
    }

    #[test]
    fn test_explicit_values() {
        let (vars, _, count) = setup();
        let mut pulse = Action::new(count, ActionType::Pulse, &vars).unwrap();
        assert!(pulse.has_explicit_value());
        pulse.set_action_value(v("11"), &vars).unwrap();
        assert_eq!(pulse.action_value(&vars), v("0011"));
        assert!(matches!(
            pulse.set_action_value(v("10101"), &vars),
            Err(Error::IllegalValue(_))
        ));
        assert!(pulse.set_action_value(LogicValue::null(), &vars).is_err());

        let mut set = Action::new(count, ActionType::Set, &vars).unwrap();
        assert_eq!(set.set_action_value(v("1"), &vars), Err(Error::ReadOnly));
    }

    #[test]
    fn test_assign_on_single_bit() {
        let (vars, y, count) = setup();
        let action = Action::new(y, ActionType::Assign, &vars).unwrap();
        assert_eq!(action.action_type(), ActionType::Set);
        assert!(!action.has_explicit_value());

        let action = Action::with_range(count, ActionType::Assign, BitRange::Bit(2), &vars).unwrap();
        assert_eq!(action.action_type(), ActionType::Set);

        let mut action = Action::new(y, ActionType::Reset, &vars).unwrap();
        assert!(matches!(
            action.set_action_type(ActionType::Assign, &vars),
            Err(Error::IllegalType(_))
        ));
        assert_eq!(action.action_type(), ActionType::Reset);
        assert!(!action.has_explicit_value());
    }

    #[test]
    fn test_type_change_converts_value() {
        let (vars, _, count) = setup();
        let mut action = Action::new(count, ActionType::Reset, &vars).unwrap();
        action.set_action_type(ActionType::Pulse, &vars).unwrap();
        assert_eq!(action.action_value(&vars), v("0000"));

        let mut action = Action::new(count, ActionType::Set, &vars).unwrap();
        action.set_action_type(ActionType::Assign, &vars).unwrap();
        assert_eq!(action.action_value(&vars), v("1111"));
        action.set_action_value(v("0110"), &vars).unwrap();
        action.set_action_type(ActionType::ActiveOnState, &vars).unwrap();
        assert_eq!(action.action_value(&vars), v("0110"));

        action.set_action_type(ActionType::Increment, &vars).unwrap();
        assert!(!action.has_explicit_value());
        assert_eq!(action.action_value(&vars), v("0001"));
    }

    #[test]
    fn test_range_changes() {
        let (vars, _, count) = setup();
        let mut action = Action::new(count, ActionType::Assign, &vars).unwrap();
        action.set_action_value(v("1011"), &vars).unwrap();

        assert!(matches!(
            action.set_action_range(BitRange::slice(4, 1), None, &vars),
            Err(Error::IllegalRange { .. })
        ));
        assert_eq!(action.range(), BitRange::Whole);

        action.set_action_range(BitRange::slice(2, 1), None, &vars).unwrap();
        assert_eq!(action.action_size(&vars), 2);
        assert_eq!(action.action_value(&vars), v("11"));
        assert_eq!((action.range_l(), action.range_r()), (2, 1));

        action
            .set_action_range(BitRange::slice(3, 0), Some(v("1")), &vars)
            .unwrap();
        assert_eq!(action.action_value(&vars), v("0001"));

        action.set_action_range(BitRange::Bit(3), None, &vars).unwrap();
        assert_eq!(action.action_type(), ActionType::Set);
        assert!(!action.has_explicit_value());
    }

    #[test]
    fn test_pulse_begin_end() {
        let (mut vars, y, _) = setup();
        let mut pulse = Action::new(y, ActionType::Pulse, &vars).unwrap();
        pulse.begin(&mut vars).unwrap();
        assert!(pulse.is_acting());
        assert_eq!(current(&vars, y), "1");
        pulse.end(&mut vars).unwrap();
        assert!(!pulse.is_acting());
        assert_eq!(current(&vars, y), "0");
    }

    #[test]
    fn test_memorized_actions_persist() {
        let (mut vars, y, count) = setup();
        let mut set = Action::new(y, ActionType::Set, &vars).unwrap();
        set.begin(&mut vars).unwrap();
        assert!(!set.is_acting());
        set.end(&mut vars).unwrap();
        assert_eq!(current(&vars, y), "1");

        let mut inc = Action::with_range(count, ActionType::Increment, BitRange::slice(1, 0), &vars).unwrap();
        for _ in 0..5 {
            inc.begin(&mut vars).unwrap();
            inc.end(&mut vars).unwrap();
        }
        assert_eq!(current(&vars, count), "0001");

        let mut dec = Action::new(count, ActionType::Decrement, &vars).unwrap();
        dec.begin(&mut vars).unwrap();
        dec.begin(&mut vars).unwrap();
        assert_eq!(current(&vars, count), "1111");
    }

    #[test]
    fn test_active_on_state_sub_range() {
        let (mut vars, _, count) = setup();
        let mut action =
            Action::with_range(count, ActionType::ActiveOnState, BitRange::slice(3, 2), &vars).unwrap();
        action.set_action_value(v("10"), &vars).unwrap();
        action.begin(&mut vars).unwrap();
        assert_eq!(current(&vars, count), "1000");
        action.end(&mut vars).unwrap();
        assert_eq!(current(&vars, count), "0000");
    }

    #[test]
    fn test_constants_and_inputs_are_not_acted_on() {
        let (mut vars, _, _) = setup();
        let k = vars.add("k", VariableKind::Constant, 2).unwrap();
        let i = vars.add("i", VariableKind::Input, 2).unwrap();
        assert!(matches!(Action::new(k, ActionType::Set, &vars), Err(Error::IllegalType(_))));
        assert!(matches!(Action::new(i, ActionType::Set, &vars), Err(Error::IllegalType(_))));
    }

    #[test]
    fn test_resize_clamps_range() {
        let (mut vars, _, count) = setup();
        let mut action =
            Action::with_range(count, ActionType::Pulse, BitRange::slice(3, 1), &vars).unwrap();
        action.set_action_value(v("101"), &vars).unwrap();

        vars.get_mut(count).unwrap().resize(3).unwrap();
        action.on_variable_resized(&vars).unwrap();
        assert_eq!(action.range(), BitRange::slice(2, 1));
        assert_eq!(action.action_value(&vars), v("01"));

        vars.get_mut(count).unwrap().resize(1).unwrap();
        action.on_variable_resized(&vars).unwrap();
        assert_eq!(action.range(), BitRange::Whole);
        assert!(!action.has_explicit_value());
    }

    #[test]
    fn test_check_and_fix() {
        let (vars, y, count) = setup();
        let mut broken = Action::raw(count, ActionType::Assign, BitRange::Bit(7), Some(v("1")));
        assert!(broken.check_and_fix(&vars).unwrap());
        assert_eq!(broken.range(), BitRange::Whole);
        assert_eq!(broken.action_value(&vars), v("0001"));
        assert!(!broken.check_and_fix(&vars).unwrap());

        let mut on_bit = Action::raw(y, ActionType::Assign, BitRange::Whole, Some(v("1")));
        assert!(on_bit.check_and_fix(&vars).unwrap());
        assert_eq!(on_bit.action_type(), ActionType::Set);
        assert!(!on_bit.has_explicit_value());

        let mut orphan = Action::raw(VariableId::new(99), ActionType::Set, BitRange::Whole, None);
        assert!(orphan.check_and_fix(&vars).is_err());
    }

    #[test]
    fn test_text() {
        let (vars, y, count) = setup();
        let set = Action::new(y, ActionType::Set, &vars).unwrap();
        assert_eq!(set.text(&vars), "y ← 1");
        let inc = Action::with_range(count, ActionType::Increment, BitRange::slice(2, 0), &vars).unwrap();
        assert_eq!(inc.text(&vars), "count[2:0]++");
        let pulse = Action::new(count, ActionType::Pulse, &vars).unwrap();
        assert_eq!(pulse.text(&vars), "count = 1111 (pulse)");
    }
}
