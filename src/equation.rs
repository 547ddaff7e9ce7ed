//! Logic equations.
//!
//! An [`Equation`] is an expression tree node: an [`Operator`] applied to an
//! ordered list of operand slots. Each node caches its value and the reason,
//! if any, it could not compute one ([`FailureCause`]).
//!
//! ## Propagation
//!
//! Every mutation takes the [`Valuation`] the tree is evaluated against and
//! recomputes the mutated node before returning. Sub-equations are owned by
//! their parent and are only reachable for mutation through
//! [`Equation::update_operand`], which recomputes the parent once the child
//! has been changed. A change therefore always travels bottom-up to the root
//! before the mutating call returns, and the returned [`Change`] tells the
//! caller whether the root value or size actually moved.
//!
//! When variable values change underneath a tree, [`Equation::refresh`]
//! recomputes the whole tree, children first.
//!
//! Since operands own their sub-equations, a tree can never contain itself.
//!
//! ## Failures
//!
//! Evaluation never raises an error. A node with an empty slot, a null
//! operand, mismatched operand sizes or a bad extraction range has the null
//! value and records why. Errors are only returned for misuse of the API, such
//! as an operand index past the end.

use std::fmt;
use std::ops::BitOrAssign;

use log::trace;

use crate::error::{Error, Result};
use crate::operand::Operand;
use crate::types::VariableId;
use crate::value::LogicValue;
use crate::variable::{Valuation, VariableTable};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Single operand passed through unchanged.
    Identity,
    Not,
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Xnor,
    Equal,
    Different,
    /// Bit or bit range of a single operand.
    Extract,
    /// Concatenation, first operand most significant.
    Concat,
}

impl Operator {
    pub const ALL: [Operator; 12] = [
        Operator::Identity,
        Operator::Not,
        Operator::And,
        Operator::Or,
        Operator::Xor,
        Operator::Nand,
        Operator::Nor,
        Operator::Xnor,
        Operator::Equal,
        Operator::Different,
        Operator::Extract,
        Operator::Concat,
    ];

    /// Operand count for fixed-arity operators, `None` for n-ary ones.
    pub fn fixed_arity(self) -> Option<usize> {
        match self {
            Operator::Identity | Operator::Not | Operator::Extract => Some(1),
            Operator::Equal | Operator::Different => Some(2),
            Operator::And
            | Operator::Or
            | Operator::Xor
            | Operator::Nand
            | Operator::Nor
            | Operator::Xnor
            | Operator::Concat => None,
        }
    }

    /// Returns true for operators taking two or more operands.
    pub fn is_associative(self) -> bool {
        self.fixed_arity().is_none()
    }

    pub fn is_inverted(self) -> bool {
        matches!(
            self,
            Operator::Not | Operator::Nand | Operator::Nor | Operator::Xnor
        )
    }

    /// Returns true if all operands must have the same width.
    fn requires_equal_sizes(self) -> bool {
        !matches!(
            self,
            Operator::Concat | Operator::Extract | Operator::Not | Operator::Identity
        )
    }

    /// Infix symbol, empty for operators rendered without one.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::And | Operator::Nand => "•",
            Operator::Or | Operator::Nor => "+",
            Operator::Xor | Operator::Xnor => "⊕",
            Operator::Equal => "=",
            Operator::Different => "≠",
            Operator::Concat => ":",
            Operator::Identity | Operator::Not | Operator::Extract => "",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Identity => "identity",
            Operator::Not => "not",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Xor => "xor",
            Operator::Nand => "nand",
            Operator::Nor => "nor",
            Operator::Xnor => "xnor",
            Operator::Equal => "equal",
            Operator::Different => "different",
            Operator::Extract => "extract",
            Operator::Concat => "concat",
        };
        f.write_str(s)
    }
}

/// Why an equation has no value.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum FailureCause {
    #[default]
    NoFail,
    /// An operand slot is empty, here or in a sub-equation.
    NullOperand,
    /// An operand exists but has no value.
    IncompleteOperand,
    /// Operands have different widths.
    SizeMismatch,
    /// Extraction without a range.
    MissingParameter,
    /// Extraction range does not fit the operand.
    IncorrectParameter,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureCause::NoFail => "equation is valid",
            FailureCause::NullOperand => "one of the operands is missing",
            FailureCause::IncompleteOperand => "one of the operands has no value",
            FailureCause::SizeMismatch => "operands do not have the same size",
            FailureCause::MissingParameter => "the extracted range is not set",
            FailureCause::IncorrectParameter => "the extracted range does not fit the operand",
        };
        f.write_str(s)
    }
}

/// Result of evaluating an equation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub value: LogicValue,
    pub failure: FailureCause,
}

impl Evaluation {
    fn defined(value: LogicValue) -> Self {
        Self {
            value,
            failure: FailureCause::NoFail,
        }
    }

    fn failed(failure: FailureCause) -> Self {
        Self {
            value: LogicValue::null(),
            failure,
        }
    }
}

/// What moved during a recomputation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Change {
    pub value: bool,
    pub size: bool,
}

impl Change {
    pub const NONE: Change = Change {
        value: false,
        size: false,
    };

    pub fn is_empty(self) -> bool {
        !self.value && !self.size
    }
}

impl BitOrAssign for Change {
    fn bitor_assign(&mut self, rhs: Self) {
        self.value |= rhs.value;
        self.size |= rhs.size;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    operator: Operator,
    operands: Vec<Option<Operand>>,
    /// Extraction bounds, only meaningful for [`Operator::Extract`].
    range_l: Option<usize>,
    range_r: Option<usize>,
    value: LogicValue,
    failure: FailureCause,
}

impl Equation {
    /// Creates an equation with empty operand slots (two for n-ary operators).
    pub fn new(operator: Operator) -> Self {
        Self::with_operand_count(operator, 2)
    }

    /// Creates an equation with empty operand slots.
    ///
    /// `count` is only used by n-ary operators, and raised to 2 if lower.
    pub fn with_operand_count(operator: Operator, count: usize) -> Self {
        let count = operator.fixed_arity().unwrap_or(count.max(2));
        Self {
            operator,
            operands: vec![None; count],
            range_l: None,
            range_r: None,
            value: LogicValue::null(),
            failure: FailureCause::NullOperand,
        }
    }

    /// Creates an equation filled with the given operands.
    pub fn from_operands(
        operator: Operator,
        operands: Vec<Operand>,
        valuation: &dyn Valuation,
    ) -> Result<Self> {
        let operands: Vec<Option<Operand>> = operands.into_iter().map(Some).collect();
        match operator.fixed_arity() {
            Some(n) if n != operands.len() => {
                return Err(Error::IllegalOperation("wrong operand count for operator"));
            }
            None if operands.len() < 2 => {
                return Err(Error::IllegalOperation("n-ary operators need at least two operands"));
            }
            _ => {}
        }
        let mut equation = Self::with_operand_count(operator, operands.len());
        equation.operands = operands;
        equation.refresh(valuation);
        Ok(equation)
    }

    /// Wraps a single operand so that it can be used where an equation is expected.
    pub fn identity(operand: impl Into<Operand>, valuation: &dyn Valuation) -> Self {
        let mut equation = Self::new(Operator::Identity);
        equation.operands[0] = Some(operand.into());
        equation.refresh(valuation);
        equation
    }

    /// Bits `right..=left` (or bit `left` alone) of `operand`.
    pub fn extract(
        operand: impl Into<Operand>,
        left: usize,
        right: Option<usize>,
        valuation: &dyn Valuation,
    ) -> Self {
        let mut equation = Self::new(Operator::Extract);
        equation.operands[0] = Some(operand.into());
        equation.range_l = Some(left);
        equation.range_r = right;
        equation.refresh(valuation);
        equation
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    /// Operand in slot `index`, `None` if the slot is empty or out of range.
    pub fn operand(&self, index: usize) -> Option<&Operand> {
        self.operands.get(index).and_then(|o| o.as_ref())
    }

    pub fn operands(&self) -> &[Option<Operand>] {
        &self.operands
    }

    pub fn range_l(&self) -> Option<usize> {
        self.range_l
    }

    pub fn range_r(&self) -> Option<usize> {
        self.range_r
    }

    /// Cached value (null on failure).
    pub fn value(&self) -> &LogicValue {
        &self.value
    }

    /// Width of the cached value, 0 on failure.
    pub fn size(&self) -> usize {
        self.value.size()
    }

    pub fn failure_cause(&self) -> FailureCause {
        self.failure
    }

    pub fn is_valid(&self) -> bool {
        self.failure == FailureCause::NoFail
    }

    pub fn is_inverted(&self) -> bool {
        self.operator.is_inverted()
    }

    /// Returns true only for the 1-bit value `1`.
    pub fn is_true(&self) -> bool {
        self.value.is_true()
    }

    /// Replaces the operand in slot `index`.
    pub fn set_operand(
        &mut self,
        index: usize,
        operand: impl Into<Operand>,
        valuation: &dyn Valuation,
    ) -> Result<Change> {
        self.check_index(index)?;
        let mut operand = operand.into();
        if let Operand::Equation(equation) = &mut operand {
            equation.refresh(valuation);
        }
        self.operands[index] = Some(operand);
        Ok(self.recompute(valuation))
    }

    /// Empties slot `index`.
    pub fn clear_operand(&mut self, index: usize, valuation: &dyn Valuation) -> Result<Change> {
        self.check_index(index)?;
        self.operands[index] = None;
        Ok(self.recompute(valuation))
    }

    /// Mutates the sub-equation in slot `index`, then recomputes this node.
    pub fn update_operand<T>(
        &mut self,
        index: usize,
        valuation: &dyn Valuation,
        f: impl FnOnce(&mut Equation) -> T,
    ) -> Result<(T, Change)> {
        self.check_index(index)?;
        let result = match &mut self.operands[index] {
            Some(Operand::Equation(equation)) => f(equation),
            _ => return Err(Error::IllegalOperation("operand is not an equation")),
        };
        Ok((result, self.recompute(valuation)))
    }

    /// Adds an empty slot at the end. N-ary operators only.
    pub fn increase_operand_count(&mut self, valuation: &dyn Valuation) -> Result<Change> {
        if !self.operator.is_associative() {
            return Err(Error::IllegalOperation("operator has a fixed operand count"));
        }
        self.operands.push(None);
        Ok(self.recompute(valuation))
    }

    /// Drops the last slot. N-ary operators only, never below two slots.
    pub fn decrease_operand_count(&mut self, valuation: &dyn Valuation) -> Result<Change> {
        if !self.operator.is_associative() {
            return Err(Error::IllegalOperation("operator has a fixed operand count"));
        }
        if self.operands.len() <= 2 {
            return Err(Error::IllegalOperation("n-ary operators need at least two operands"));
        }
        self.operands.pop();
        Ok(self.recompute(valuation))
    }

    /// Sets the extraction range. Ignored unless the operator is [`Operator::Extract`].
    pub fn set_range(&mut self, left: usize, right: Option<usize>, valuation: &dyn Valuation) -> Change {
        if self.operator != Operator::Extract {
            return Change::NONE;
        }
        self.range_l = Some(left);
        self.range_r = right;
        self.recompute(valuation)
    }

    /// Changes the operator, keeping as many operands as the new arity allows.
    pub fn set_operator(&mut self, operator: Operator, valuation: &dyn Valuation) -> Change {
        let count = operator
            .fixed_arity()
            .unwrap_or(self.operands.len().max(2));
        self.operator = operator;
        self.operands.resize(count, None);
        self.recompute(valuation)
    }

    /// Empties every slot (at any depth) referencing `id`.
    pub fn forget_variable(&mut self, id: VariableId, valuation: &dyn Valuation) -> Change {
        for slot in self.operands.iter_mut() {
            if matches!(slot, Some(Operand::Variable(v)) if *v == id) {
                *slot = None;
            } else if let Some(Operand::Equation(equation)) = slot {
                equation.forget_variable(id, valuation);
            }
        }
        self.recompute(valuation)
    }

    /// Recomputes the whole tree, children first.
    pub fn refresh(&mut self, valuation: &dyn Valuation) -> Change {
        for operand in self.operands.iter_mut().flatten() {
            if let Operand::Equation(equation) = operand {
                equation.refresh(valuation);
            }
        }
        self.recompute(valuation)
    }

    /// Evaluates the tree from scratch without touching the cache.
    pub fn evaluate(&self, valuation: &dyn Valuation) -> Evaluation {
        self.compute(|operand| match operand {
            Operand::Equation(equation) => equation.evaluate(valuation),
            other => Evaluation::defined(other.value(valuation)),
        })
    }

    /// Recomputes this node from the cached values of its children.
    fn recompute(&mut self, valuation: &dyn Valuation) -> Change {
        let Evaluation { value, failure } = self.compute(|operand| match operand {
            Operand::Equation(equation) => Evaluation {
                value: equation.value.clone(),
                failure: equation.failure,
            },
            other => Evaluation::defined(other.value(valuation)),
        });
        let change = Change {
            value: value != self.value,
            size: value.size() != self.value.size(),
        };
        if !change.is_empty() {
            trace!(
                "{} changed: {:?} -> {:?} ({:?})",
                self.operator,
                self.value,
                value,
                failure
            );
        }
        self.value = value;
        self.failure = failure;
        change
    }

    fn compute(&self, operand_value: impl Fn(&Operand) -> Evaluation) -> Evaluation {
        let mut values = Vec::with_capacity(self.operands.len());
        let mut empty_below = false;
        for slot in &self.operands {
            match slot {
                None => return Evaluation::failed(FailureCause::NullOperand),
                Some(operand) => {
                    let Evaluation { value, failure } = operand_value(operand);
                    empty_below |= failure == FailureCause::NullOperand;
                    values.push(value);
                }
            }
        }

        if values.iter().any(|v| v.is_null()) {
            return Evaluation::failed(if empty_below {
                FailureCause::NullOperand
            } else {
                FailureCause::IncompleteOperand
            });
        }

        if self.operator.requires_equal_sizes() && values.windows(2).any(|w| w[0].size() != w[1].size()) {
            return Evaluation::failed(FailureCause::SizeMismatch);
        }

        let value = match self.operator {
            Operator::Identity => values[0].clone(),
            Operator::Not => !&values[0],
            Operator::Equal => LogicValue::from_bool(values[0] == values[1]),
            Operator::Different => LogicValue::from_bool(values[0] != values[1]),
            Operator::Extract => {
                let Some(left) = self.range_l else {
                    return Evaluation::failed(FailureCause::MissingParameter);
                };
                let right = self.range_r.unwrap_or(left);
                match values[0].extract(left, right) {
                    Ok(value) => value,
                    Err(_) => return Evaluation::failed(FailureCause::IncorrectParameter),
                }
            }
            Operator::Concat => values
                .iter()
                .skip(1)
                .fold(values[0].clone(), |acc, v| acc.concat(v)),
            Operator::And | Operator::Nand => fold(&values, |a, b| a & b),
            Operator::Or | Operator::Nor => fold(&values, |a, b| a | b),
            Operator::Xor | Operator::Xnor => fold(&values, |a, b| a ^ b),
        };

        let value = match self.operator {
            Operator::Nand | Operator::Nor | Operator::Xnor => !value,
            _ => value,
        };

        Evaluation {
            value,
            failure: FailureCause::NoFail,
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.operands.len() {
            return Err(Error::OutOfRange {
                index,
                size: self.operands.len(),
            });
        }
        Ok(())
    }

    /// Returns true if the tree uses the variable anywhere.
    pub fn references(&self, id: VariableId) -> bool {
        self.operands.iter().flatten().any(|o| o.references(id))
    }

    /// Distinct variables of the tree, in left-to-right order of first use.
    pub fn variables(&self) -> Vec<VariableId> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    pub(crate) fn collect_variables(&self, out: &mut Vec<VariableId>) {
        for operand in self.operands.iter().flatten() {
            operand.collect_variables(out);
        }
    }

    /// Human-readable infix rendering.
    pub fn text(&self, variables: &VariableTable) -> String {
        self.render(variables, &mut |_, text| text)
    }

    /// HTML rendering with failing nodes in red.
    ///
    /// Unless `raw` is set, the failing nodes also carry a `title` attribute
    /// explaining the failure.
    pub fn colored_text(&self, variables: &VariableTable, raw: bool) -> String {
        self.render(variables, &mut |equation, text| {
            if equation.is_valid() {
                text
            } else if raw {
                format!("<span style=\"color:red;\">{}</span>", text)
            } else {
                format!(
                    "<span style=\"color:red;\" title=\"{}\">{}</span>",
                    equation.failure, text
                )
            }
        })
    }

    fn render(&self, variables: &VariableTable, decorate: &mut dyn FnMut(&Equation, String) -> String) -> String {
        let mut parts = Vec::with_capacity(self.operands.len());
        for slot in &self.operands {
            parts.push(match slot {
                None => "?".to_string(),
                Some(Operand::Equation(equation)) => {
                    let text = equation.render(variables, decorate);
                    if equation.needs_parentheses() {
                        format!("({})", text)
                    } else {
                        text
                    }
                }
                Some(operand) => operand.text(variables),
            });
        }

        let text = match self.operator {
            Operator::Identity => parts.swap_remove(0),
            Operator::Not => format!("/{}", parts[0]),
            Operator::Extract => {
                let range = match (self.range_l, self.range_r) {
                    (None, _) => "?".to_string(),
                    (Some(l), None) => l.to_string(),
                    (Some(l), Some(r)) => format!("{}:{}", l, r),
                };
                format!("{}[{}]", parts[0], range)
            }
            operator => {
                let joined = parts.join(&format!(" {} ", operator.symbol()));
                if operator.is_inverted() {
                    format!("/({})", joined)
                } else {
                    joined
                }
            }
        };
        decorate(self, text)
    }

    /// Returns true if the rendering must be parenthesized when nested.
    fn needs_parentheses(&self) -> bool {
        match self.operator {
            Operator::Identity | Operator::Not | Operator::Extract => false,
            operator => !operator.is_inverted(),
        }
    }
}

fn fold(values: &[LogicValue], f: impl Fn(&LogicValue, &LogicValue) -> LogicValue) -> LogicValue {
    values.iter().skip(1).fold(values[0].clone(), |acc, v| f(&acc, v))
}
