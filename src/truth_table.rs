//! Truth tables of equations.
//!
//! A [`TruthTable`] enumerates every combination of values of the leaf
//! variables of one or more equations and records the value of each equation
//! for each combination.
//!
//! # Row ordering
//!
//! Rows count in binary over the leaf variables: the first leaf variable is the
//! most significant position. Row `r` gives leaf `p` (0-based, in order of
//! first use across the equations) the value of bit `n - 1 - p` of `r`. So row
//! 0 has every leaf at 0 and the last row has every leaf at 1.
//!
//! Variables of kind [`Constant`][VariableKind::Constant] are not leaves:
//! they keep their initial value in every row.
//!
//! A leaf wider than one bit gets its all-zero value for a 0 and its all-one
//! value for a 1.
//!
//! Tables are snapshots: later edits of the equations or of the variables
//! are not reflected.

use std::fmt;

use log::debug;

use crate::equation::Equation;
use crate::error::{Error, Result};
use crate::types::VariableId;
use crate::value::LogicValue;
use crate::variable::{Assignment, VariableKind, VariableTable};

#[derive(Debug, Clone)]
pub struct TruthTable {
    variables: Vec<VariableId>,
    variable_names: Vec<String>,
    equation_texts: Vec<String>,
    /// Output values, `outputs[row][column]`.
    outputs: Vec<Vec<LogicValue>>,
}

impl TruthTable {
    /// Tables over more leaf variables are refused.
    pub const MAX_VARIABLES: usize = 20;

    pub fn new(equations: &[&Equation], variables: &VariableTable) -> Result<Self> {
        let mut leaves = Vec::new();
        for equation in equations {
            equation.collect_variables(&mut leaves);
        }
        let mut fixed = Assignment::new();
        leaves.retain(|&id| match variables.get(id) {
            Some(var) if var.kind() == VariableKind::Constant => {
                fixed.set(id, var.initial_value().clone());
                false
            }
            Some(_) => true,
            None => false,
        });

        if leaves.len() > Self::MAX_VARIABLES {
            return Err(Error::IllegalOperation("too many variables for a truth table"));
        }

        let n = leaves.len();
        let rows = 1usize << n;
        debug!("truth table: {} equations, {} variables, {} rows", equations.len(), n, rows);

        let sizes: Vec<usize> = leaves
            .iter()
            .map(|id| variables.size(*id).unwrap_or(0))
            .collect();

        let mut outputs = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut assignment = fixed.clone();
            for (p, (&id, &size)) in leaves.iter().zip(&sizes).enumerate() {
                let value = if row_bit(row, n, p) {
                    LogicValue::ones(size)
                } else {
                    LogicValue::zeros(size)
                };
                assignment.set(id, value);
            }
            outputs.push(
                equations
                    .iter()
                    .map(|equation| equation.evaluate(&assignment).value)
                    .collect(),
            );
        }

        Ok(Self {
            variable_names: leaves
                .iter()
                .map(|id| variables.name(*id).unwrap_or("?").to_string())
                .collect(),
            equation_texts: equations.iter().map(|e| e.text(variables)).collect(),
            variables: leaves,
            outputs,
        })
    }

    pub fn from_equation(equation: &Equation, variables: &VariableTable) -> Result<Self> {
        Self::new(&[equation], variables)
    }

    /// `2^n` for `n` leaf variables.
    pub fn rows_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn columns_count(&self) -> usize {
        self.equation_texts.len()
    }

    /// Leaf variables, most significant first.
    pub fn variables(&self) -> &[VariableId] {
        &self.variables
    }

    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    pub fn equation_texts(&self) -> &[String] {
        &self.equation_texts
    }

    /// Value given to the leaf at `position` in `row`.
    pub fn input_value(&self, row: usize, position: usize) -> Result<bool> {
        self.check_row(row)?;
        if position >= self.variables.len() {
            return Err(Error::OutOfRange {
                index: position,
                size: self.variables.len(),
            });
        }
        Ok(row_bit(row, self.variables.len(), position))
    }

    pub fn output_value(&self, row: usize, column: usize) -> Result<&LogicValue> {
        self.check_row(row)?;
        let size = self.columns_count();
        self.outputs[row]
            .get(column)
            .ok_or(Error::OutOfRange { index: column, size })
    }

    /// Rows in which equation `column` is the 1-bit value `1`.
    pub fn true_rows(&self, column: usize) -> Vec<usize> {
        self.outputs
            .iter()
            .enumerate()
            .filter(|(_, row)| row.get(column).is_some_and(|v| v.is_true()))
            .map(|(i, _)| i)
            .collect()
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.rows_count() {
            return Err(Error::OutOfRange {
                index: row,
                size: self.rows_count(),
            });
        }
        Ok(())
    }
}

fn row_bit(row: usize, n: usize, position: usize) -> bool {
    (row >> (n - 1 - position)) & 1 == 1
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<&str> = self
            .variable_names
            .iter()
            .chain(&self.equation_texts)
            .map(String::as_str)
            .collect();
        writeln!(f, "{}", header.join(" | "))?;
        for (row, outputs) in self.outputs.iter().enumerate() {
            let mut cells = Vec::with_capacity(header.len());
            for (p, name) in self.variable_names.iter().enumerate() {
                let bit = if row_bit(row, self.variables.len(), p) { "1" } else { "0" };
                cells.push(format!("{:>width$}", bit, width = name.chars().count()));
            }
            for (value, text) in outputs.iter().zip(&self.equation_texts) {
                let value = if value.is_null() { "-".to_string() } else { value.to_string() };
                cells.push(format!("{:>width$}", value, width = text.chars().count()));
            }
            writeln!(f, "{}", cells.join(" | "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::equation::Operator;
    use crate::variable::VariableKind;

    fn setup() -> (VariableTable, VariableId, VariableId, VariableId) {
        let mut vars = VariableTable::new();
        let a = vars.add("a", VariableKind::Input, 1).unwrap();
        let b = vars.add("b", VariableKind::Input, 1).unwrap();
        let c = vars.add("c", VariableKind::Input, 1).unwrap();
        (vars, a, b, c)
    }

    #[test]
    fn test_rows_count_and_order() {
        let (vars, a, b, c) = setup();
        let vals = vars.current();
        let inner = Equation::from_operands(Operator::Or, vec![b.into(), c.into()], &vals).unwrap();
        let eq = Equation::from_operands(Operator::And, vec![a.into(), inner.into()], &vals).unwrap();
        let table = TruthTable::from_equation(&eq, &vars).unwrap();

        assert_eq!(table.rows_count(), 8);
        assert_eq!(table.variables(), &[a, b, c]);
        for p in 0..3 {
            assert!(!table.input_value(0, p).unwrap());
            assert!(table.input_value(7, p).unwrap());
        }
        // Row 4 = 100: a = 1, b = 0, c = 0.
        assert!(table.input_value(4, 0).unwrap());
        assert!(!table.input_value(4, 1).unwrap());
        assert_eq!(table.true_rows(0), vec![5, 6, 7]);
    }

    #[test]
    fn test_literals_are_not_leaves() {
        let (vars, a, _, _) = setup();
        let vals = vars.current();
        let eq = Equation::from_operands(
            Operator::Xor,
            vec![a.into(), LogicValue::ones(1).into(), a.into()],
            &vals,
        )
        .unwrap();
        let table = TruthTable::from_equation(&eq, &vars).unwrap();
        assert_eq!(table.rows_count(), 2);
        assert_eq!(table.output_value(0, 0).unwrap(), &LogicValue::ones(1));
        assert_eq!(table.output_value(1, 0).unwrap(), &LogicValue::ones(1));
    }

    #[test]
    fn test_constant_variables_are_not_leaves() {
        let (mut vars, a, _, _) = setup();
        let k = vars.add_with_value("K", VariableKind::Constant, LogicValue::ones(1)).unwrap();
        let vals = vars.current();
        let eq = Equation::from_operands(Operator::Equal, vec![a.into(), k.into()], &vals).unwrap();
        let table = TruthTable::from_equation(&eq, &vars).unwrap();

        assert_eq!(table.variables(), &[a]);
        assert_eq!(table.rows_count(), 2);
        assert_eq!(table.true_rows(0), vec![1]);
    }

    #[test]
    fn test_several_equations_share_leaves() {
        let (vars, a, b, _) = setup();
        let vals = vars.current();
        let first = Equation::identity(a, &vals);
        let second = Equation::from_operands(Operator::And, vec![b.into(), a.into()], &vals).unwrap();
        let table = TruthTable::new(&[&first, &second], &vars).unwrap();
        assert_eq!(table.rows_count(), 4);
        assert_eq!(table.columns_count(), 2);
        assert_eq!(table.true_rows(0), vec![2, 3]);
        assert_eq!(table.true_rows(1), vec![3]);
        assert!(table.output_value(4, 0).is_err());
        assert!(table.output_value(0, 2).is_err());
    }

    #[test]
    fn test_does_not_touch_live_values() {
        let (mut vars, a, b, _) = setup();
        vars.get_mut(a).unwrap().set_current_value(LogicValue::ones(1)).unwrap();
        let vals = vars.current();
        let eq = Equation::from_operands(Operator::Or, vec![a.into(), b.into()], &vals).unwrap();
        let table = TruthTable::from_equation(&eq, &vars).unwrap();
        assert_eq!(table.output_value(0, 0).unwrap(), &LogicValue::zeros(1));
        assert_eq!(vars.get(a).unwrap().current_value(), &LogicValue::ones(1));
        assert!(eq.is_true());
    }

    #[test]
    fn test_wide_leaves() {
        let mut vars = VariableTable::new();
        let w = vars.add("w", VariableKind::Input, 3).unwrap();
        let eq = Equation::extract(w, 1, None, &vars.current());
        let table = TruthTable::from_equation(&eq, &vars).unwrap();
        assert_eq!(table.rows_count(), 2);
        assert_eq!(table.true_rows(0), vec![1]);
    }

    #[test]
    fn test_display() {
        let (vars, a, b, _) = setup();
        let vals = vars.current();
        let eq = Equation::from_operands(Operator::And, vec![a.into(), b.into()], &vals).unwrap();
        let table = TruthTable::from_equation(&eq, &vars).unwrap();
        let text = table.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "a | b | a • b");
        assert_eq!(lines[4], "1 | 1 |     1");
    }
}
