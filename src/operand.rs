//! Equation operands.
//!
//! An [`Operand`] is exactly one of: a reference to a variable, an owned
//! sub-equation, or a literal constant. Variable references are non-owning:
//! when the variable is gone the operand resolves to the null value.

use crate::equation::Equation;
use crate::types::VariableId;
use crate::value::LogicValue;
use crate::variable::{Valuation, VariableTable};

/// Which payload an [`Operand`] carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OperandSource {
    Variable,
    Equation,
    Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Variable(VariableId),
    Equation(Box<Equation>),
    Constant(LogicValue),
}

impl Operand {
    pub fn source(&self) -> OperandSource {
        match self {
            Operand::Variable(_) => OperandSource::Variable,
            Operand::Equation(_) => OperandSource::Equation,
            Operand::Constant(_) => OperandSource::Constant,
        }
    }

    pub fn variable_id(&self) -> Option<VariableId> {
        match self {
            Operand::Variable(id) => Some(*id),
            _ => None,
        }
    }

    pub fn equation(&self) -> Option<&Equation> {
        match self {
            Operand::Equation(equation) => Some(equation),
            _ => None,
        }
    }

    pub fn constant(&self) -> Option<&LogicValue> {
        match self {
            Operand::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Value under `valuation`, evaluating sub-equations from scratch.
    pub fn value(&self, valuation: &dyn Valuation) -> LogicValue {
        match self {
            Operand::Variable(id) => valuation.value(*id).unwrap_or_default(),
            Operand::Equation(equation) => equation.evaluate(valuation).value,
            Operand::Constant(value) => value.clone(),
        }
    }

    pub fn initial_value(&self, variables: &VariableTable) -> LogicValue {
        self.value(&variables.initial())
    }

    pub fn current_value(&self, variables: &VariableTable) -> LogicValue {
        self.value(&variables.current())
    }

    /// Width of the operand, 0 when it cannot be resolved.
    pub fn size(&self, variables: &VariableTable) -> usize {
        match self {
            Operand::Variable(id) => variables.size(*id).unwrap_or(0),
            Operand::Equation(equation) => equation.size(),
            Operand::Constant(value) => value.size(),
        }
    }

    /// Variable name, nested equation text, or literal bits.
    pub fn text(&self, variables: &VariableTable) -> String {
        match self {
            Operand::Variable(id) => variables.name(*id).unwrap_or("?").to_string(),
            Operand::Equation(equation) => equation.text(variables),
            Operand::Constant(value) if value.is_null() => "?".to_string(),
            Operand::Constant(value) => value.to_string(),
        }
    }

    /// Returns true if the operand uses the variable, directly or through a sub-equation.
    pub fn references(&self, id: VariableId) -> bool {
        match self {
            Operand::Variable(v) => *v == id,
            Operand::Equation(equation) => equation.references(id),
            Operand::Constant(_) => false,
        }
    }

    pub(crate) fn collect_variables(&self, out: &mut Vec<VariableId>) {
        match self {
            Operand::Variable(id) => {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
            Operand::Equation(equation) => equation.collect_variables(out),
            Operand::Constant(_) => {}
        }
    }
}

impl From<VariableId> for Operand {
    fn from(id: VariableId) -> Self {
        Operand::Variable(id)
    }
}

impl From<Equation> for Operand {
    fn from(equation: Equation) -> Self {
        Operand::Equation(Box::new(equation))
    }
}

impl From<LogicValue> for Operand {
    fn from(value: LogicValue) -> Self {
        Operand::Constant(value)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::equation::Operator;
    use crate::variable::VariableKind;

    #[test]
    fn test_sources() {
        let mut vars = VariableTable::new();
        let x = vars.add("x", VariableKind::Input, 2).unwrap();

        let by_var = Operand::from(x);
        let by_const = Operand::from(LogicValue::ones(3));
        let by_eq = Operand::from(Equation::new(Operator::Not));

        assert_eq!(by_var.source(), OperandSource::Variable);
        assert_eq!(by_const.source(), OperandSource::Constant);
        assert_eq!(by_eq.source(), OperandSource::Equation);

        assert_eq!(by_var.text(&vars), "x");
        assert_eq!(by_const.text(&vars), "111");
        assert_eq!(by_var.size(&vars), 2);
        assert_eq!(by_eq.size(&vars), 0);
    }

    #[test]
    fn test_initial_and_current_values() {
        let mut vars = VariableTable::new();
        let x = vars.add("x", VariableKind::Input, 2).unwrap();
        vars.get_mut(x)
            .unwrap()
            .set_current_value("10".parse().unwrap())
            .unwrap();

        let operand = Operand::from(x);
        assert_eq!(operand.initial_value(&vars).to_string(), "00");
        assert_eq!(operand.current_value(&vars).to_string(), "10");
    }

    #[test]
    fn test_deleted_variable_resolves_to_null() {
        let mut vars = VariableTable::new();
        let x = vars.add("x", VariableKind::Input, 1).unwrap();
        let operand = Operand::from(x);
        vars.remove(x).unwrap();

        assert!(operand.current_value(&vars).is_null());
        assert_eq!(operand.size(&vars), 0);
        assert_eq!(operand.text(&vars), "?");
    }
}
