//! Variables and the variable registry.
//!
//! A [`Variable`] is named, sized storage with an initial value and a live
//! *current* value used during simulation. All variables of a machine live in
//! a [`VariableTable`]; everything else refers to them by [`VariableId`].
//!
//! Equations read variables through the [`Valuation`] trait, which lets the
//! same equation be evaluated against the live simulation values, the initial
//! values, or a temporary [`Assignment`] (as truth tables do).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::debug;

use crate::error::{Error, Result};
use crate::types::{IdAllocator, VariableId};
use crate::value::{BitRange, LogicValue};

/// Role of a variable in the machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Driven from outside the machine.
    Input,
    /// Written by actions, visible outside.
    Output,
    /// Written by actions, internal to the machine.
    Internal,
    /// Fixed value, never written by actions.
    Constant,
}

impl VariableKind {
    /// Returns true if actions may write this kind of variable.
    pub fn is_writable_by_actions(self) -> bool {
        matches!(self, VariableKind::Output | VariableKind::Internal)
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VariableKind::Input => "input",
            VariableKind::Output => "output",
            VariableKind::Internal => "variable",
            VariableKind::Constant => "constant",
        };
        f.write_str(s)
    }
}

/// A named, sized piece of machine storage.
///
/// # Invariants
///
/// - `size() > 0`
/// - the initial and the current value are both `size()` bits wide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    id: VariableId,
    name: String,
    kind: VariableKind,
    initial_value: LogicValue,
    current_value: LogicValue,
}

impl Variable {
    fn new(id: VariableId, name: String, kind: VariableKind, initial_value: LogicValue) -> Self {
        Self {
            id,
            name,
            kind,
            current_value: initial_value.clone(),
            initial_value,
        }
    }

    pub fn id(&self) -> VariableId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> VariableKind {
        self.kind
    }
    pub fn size(&self) -> usize {
        self.initial_value.size()
    }
    pub fn initial_value(&self) -> &LogicValue {
        &self.initial_value
    }
    pub fn current_value(&self) -> &LogicValue {
        &self.current_value
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Changes the width, truncating or zero-extending both values.
    pub fn resize(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidSize(size));
        }
        self.initial_value.resize(size);
        self.current_value.resize(size);
        Ok(())
    }

    pub fn set_initial_value(&mut self, value: LogicValue) -> Result<()> {
        self.check_size(&value)?;
        self.initial_value = value;
        Ok(())
    }

    pub fn set_current_value(&mut self, value: LogicValue) -> Result<()> {
        self.check_size(&value)?;
        self.current_value = value;
        Ok(())
    }

    /// Overwrites the bits of the current value addressed by `range`.
    pub fn set_current_value_sub_range(&mut self, value: &LogicValue, range: BitRange) -> Result<()> {
        self.current_value.write_range(range, value)
    }

    /// Restores the current value to the initial value.
    pub fn reset_current_value(&mut self) {
        self.current_value = self.initial_value.clone();
    }

    fn check_size(&self, value: &LogicValue) -> Result<()> {
        if value.size() != self.size() {
            return Err(Error::SizeMismatch {
                expected: self.size(),
                found: value.size(),
            });
        }
        Ok(())
    }
}

/// Resolves variables to values.
pub trait Valuation {
    /// Value of the variable, or `None` if it does not exist.
    fn value(&self, id: VariableId) -> Option<LogicValue>;
}

/// Owner of every variable of a machine.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    variables: BTreeMap<VariableId, Variable>,
    ids: IdAllocator,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable whose initial value is all zeros.
    pub fn add(&mut self, name: impl Into<String>, kind: VariableKind, size: usize) -> Result<VariableId> {
        if size == 0 {
            return Err(Error::InvalidSize(size));
        }
        self.add_with_value(name, kind, LogicValue::zeros(size))
    }

    /// Adds a variable with the given initial value (whose size sets the width).
    pub fn add_with_value(
        &mut self,
        name: impl Into<String>,
        kind: VariableKind,
        initial_value: LogicValue,
    ) -> Result<VariableId> {
        if initial_value.is_null() {
            return Err(Error::InvalidSize(0));
        }
        let id = self.ids.variable();
        let name = name.into();
        debug!("add {} `{}` ({}, size = {})", kind, name, id, initial_value.size());
        self.variables
            .insert(id, Variable::new(id, name, kind, initial_value));
        Ok(id)
    }

    /// Restores a variable with an id chosen elsewhere (e.g. a saved file).
    ///
    /// No legality check is done besides the non-null initial value.
    pub fn restore(
        &mut self,
        id: VariableId,
        name: impl Into<String>,
        kind: VariableKind,
        initial_value: LogicValue,
    ) -> Result<()> {
        if initial_value.is_null() {
            return Err(Error::InvalidSize(0));
        }
        self.ids.reserve(id.raw());
        self.variables
            .insert(id, Variable::new(id, name.into(), kind, initial_value));
        Ok(())
    }

    pub fn remove(&mut self, id: VariableId) -> Result<Variable> {
        let variable = self.variables.remove(&id).ok_or(Error::UnknownVariable(id))?;
        debug!("remove `{}` ({})", variable.name, id);
        Ok(variable)
    }

    pub fn get(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(&id)
    }

    pub fn get_mut(&mut self, id: VariableId) -> Result<&mut Variable> {
        self.variables.get_mut(&id).ok_or(Error::UnknownVariable(id))
    }

    pub fn contains(&self, id: VariableId) -> bool {
        self.variables.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Variables of one kind, in creation order.
    pub fn of_kind(&self, kind: VariableKind) -> impl Iterator<Item = &Variable> {
        self.iter().filter(move |v| v.kind == kind)
    }

    pub fn find(&self, name: &str) -> Option<VariableId> {
        self.iter().find(|v| v.name == name).map(|v| v.id)
    }

    pub fn name(&self, id: VariableId) -> Option<&str> {
        self.get(id).map(|v| v.name())
    }

    pub fn size(&self, id: VariableId) -> Option<usize> {
        self.get(id).map(|v| v.size())
    }

    /// Restores every current value to its initial value.
    pub fn reset_current_values(&mut self) {
        for variable in self.variables.values_mut() {
            variable.reset_current_value();
        }
    }

    /// View resolving variables to their live simulation value.
    pub fn current(&self) -> CurrentValues<'_> {
        CurrentValues(self)
    }

    /// View resolving variables to their initial value.
    pub fn initial(&self) -> InitialValues<'_> {
        InitialValues(self)
    }
}

/// See [`VariableTable::current`].
#[derive(Debug, Copy, Clone)]
pub struct CurrentValues<'a>(&'a VariableTable);

impl Valuation for CurrentValues<'_> {
    fn value(&self, id: VariableId) -> Option<LogicValue> {
        self.0.get(id).map(|v| v.current_value.clone())
    }
}

/// See [`VariableTable::initial`].
#[derive(Debug, Copy, Clone)]
pub struct InitialValues<'a>(&'a VariableTable);

impl Valuation for InitialValues<'_> {
    fn value(&self, id: VariableId) -> Option<LogicValue> {
        self.0.get(id).map(|v| v.initial_value.clone())
    }
}

/// Temporary values for a set of variables.
///
/// Variables missing from the assignment do not resolve.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    values: HashMap<VariableId, LogicValue>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: VariableId, value: LogicValue) {
        self.values.insert(id, value);
    }
}

impl Valuation for Assignment {
    fn value(&self, id: VariableId) -> Option<LogicValue> {
        self.values.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut vars = VariableTable::new();
        let x = vars.add("x", VariableKind::Input, 1).unwrap();
        let y = vars
            .add_with_value("y", VariableKind::Output, "0101".parse().unwrap())
            .unwrap();
        assert_ne!(x, y);
        assert_eq!(vars.find("y"), Some(y));
        assert_eq!(vars.size(y), Some(4));
        assert_eq!(vars.name(x), Some("x"));
        assert_eq!(vars.get(y).unwrap().current_value().to_string(), "0101");
        assert_eq!(vars.add("z", VariableKind::Internal, 0), Err(Error::InvalidSize(0)));
    }

    #[test]
    fn test_resize() {
        let mut vars = VariableTable::new();
        let y = vars
            .add_with_value("y", VariableKind::Output, "1101".parse().unwrap())
            .unwrap();
        let var = vars.get_mut(y).unwrap();
        var.resize(2).unwrap();
        assert_eq!(var.initial_value().to_string(), "01");
        assert_eq!(var.current_value().size(), 2);
        assert_eq!(var.resize(0), Err(Error::InvalidSize(0)));
    }

    #[test]
    fn test_values_keep_declared_size() {
        let mut vars = VariableTable::new();
        let y = vars.add("y", VariableKind::Output, 3).unwrap();
        let var = vars.get_mut(y).unwrap();
        assert_eq!(
            var.set_initial_value(LogicValue::ones(2)),
            Err(Error::SizeMismatch { expected: 3, found: 2 })
        );
        assert!(var.set_current_value(LogicValue::ones(4)).is_err());
        var.set_current_value_sub_range(&LogicValue::ones(2), BitRange::slice(2, 1))
            .unwrap();
        assert_eq!(var.current_value().to_string(), "110");
        var.reset_current_value();
        assert_eq!(var.current_value().to_string(), "000");
    }

    #[test]
    fn test_valuations() {
        let mut vars = VariableTable::new();
        let x = vars.add("x", VariableKind::Input, 1).unwrap();
        vars.get_mut(x).unwrap().set_current_value(LogicValue::ones(1)).unwrap();
        assert_eq!(vars.current().value(x), Some(LogicValue::ones(1)));
        assert_eq!(vars.initial().value(x), Some(LogicValue::zeros(1)));

        vars.remove(x).unwrap();
        assert_eq!(vars.current().value(x), None);
        assert_eq!(vars.remove(x), Err(Error::UnknownVariable(x)));
    }

    #[test]
    fn test_restore_reserves_id() {
        let mut vars = VariableTable::new();
        vars.restore(VariableId::new(7), "a", VariableKind::Input, LogicValue::zeros(1))
            .unwrap();
        let b = vars.add("b", VariableKind::Input, 1).unwrap();
        assert_eq!(b.raw(), 8);
    }
}
