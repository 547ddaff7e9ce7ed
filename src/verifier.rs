//! Structural checks of a machine.
//!
//! [`verify`] looks for problems that would make a simulation misbehave
//! without being errors: missing initial state, malformed conditions,
//! transitions that can never be crossed, states whose outgoing conditions
//! can be true at the same time (only the first declared one would be taken),
//! and states that cannot be reached.
//!
//! Conditions leaving a state are laid side by side in one [`TruthTable`];
//! every row index reported below refers to that table.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use log::{debug, warn};

use crate::equation::{Equation, FailureCause};
use crate::machine::{Machine, Transition};
use crate::truth_table::TruthTable;
use crate::types::{StateId, TransitionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// The simulation cannot start.
    MissingInitialState,
    /// The condition has no value and is never true.
    FailingCondition {
        transition: TransitionId,
        cause: FailureCause,
    },
    /// The condition is several bits wide and is never true.
    WideCondition { transition: TransitionId, size: usize },
    /// The condition is `0` in every row.
    AlwaysFalse { transition: TransitionId },
    /// Whenever the condition is true, an earlier transition is too.
    Shadowed {
        transition: TransitionId,
        by: Vec<TransitionId>,
    },
    /// Both conditions are true in the given truth table rows.
    NonDeterministic {
        state: StateId,
        first: TransitionId,
        second: TransitionId,
        rows: Vec<usize>,
    },
    /// Conditions leaving the state read too many variables to be enumerated.
    TooComplex { state: StateId },
    /// No path leads from the initial state to this state.
    Unreachable { state: StateId },
}

impl Issue {
    /// Returns true if the simulation cannot run at all.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Issue::MissingInitialState)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingInitialState => write!(f, "the machine has no initial state"),
            Issue::FailingCondition { transition, cause } => {
                write!(f, "{} will never be crossed: {}", transition, cause)
            }
            Issue::WideCondition { transition, size } => write!(
                f,
                "{} will never be crossed: its condition is {} bits wide",
                transition, size
            ),
            Issue::AlwaysFalse { transition } => {
                write!(f, "{} will never be crossed: its condition is always false", transition)
            }
            Issue::Shadowed { transition, by } => {
                let by: Vec<String> = by.iter().map(|t| t.to_string()).collect();
                write!(
                    f,
                    "{} will never be crossed: {} is always taken first",
                    transition,
                    by.join(", ")
                )
            }
            Issue::NonDeterministic {
                state,
                first,
                second,
                rows,
            } => write!(
                f,
                "{} is not deterministic: {} and {} can both be crossed (rows {:?})",
                state, first, second, rows
            ),
            Issue::TooComplex { state } => {
                write!(f, "{} has too many inputs to be checked", state)
            }
            Issue::Unreachable { state } => write!(f, "{} can never be reached", state),
        }
    }
}

/// Checks the whole machine. Issues come state by state, in creation order.
pub fn verify(machine: &Machine) -> Vec<Issue> {
    let mut issues = Vec::new();
    if machine.initial_state().is_none() {
        issues.push(Issue::MissingInitialState);
    }
    for state in machine.states() {
        verify_state(machine, state.id(), &mut issues);
    }
    if let Some(initial) = machine.initial_state() {
        let reached = reachable(machine, initial);
        for state in machine.states().filter(|s| !reached.contains(&s.id())) {
            issues.push(Issue::Unreachable { state: state.id() });
        }
    }
    debug!("verified `{}`: {} issues", machine.name(), issues.len());
    issues
}

/// Whether a condition may be true, and if so under which rows.
enum Column {
    Always,
    Never,
    Table(usize),
}

fn verify_state(machine: &Machine, state: StateId, issues: &mut Vec<Issue>) {
    let outgoing: Vec<&Transition> = machine.outgoing(state).collect();
    if outgoing.is_empty() {
        return;
    }

    let mut equations: Vec<&Equation> = Vec::new();
    let mut columns = Vec::with_capacity(outgoing.len());
    for transition in &outgoing {
        let column = match transition.condition() {
            None => Column::Always,
            Some(condition) if !condition.is_valid() => {
                issues.push(Issue::FailingCondition {
                    transition: transition.id(),
                    cause: condition.failure_cause(),
                });
                Column::Never
            }
            Some(condition) if condition.size() != 1 => {
                issues.push(Issue::WideCondition {
                    transition: transition.id(),
                    size: condition.size(),
                });
                Column::Never
            }
            Some(condition) => {
                equations.push(condition);
                Column::Table(equations.len() - 1)
            }
        };
        columns.push(column);
    }

    let table = match TruthTable::new(&equations, machine.variables()) {
        Ok(table) => table,
        Err(e) => {
            warn!("skipping {}: {}", state, e);
            issues.push(Issue::TooComplex { state });
            return;
        }
    };

    // truth[i][row]: transition i can be crossed in row
    let truth: Vec<Vec<bool>> = columns
        .iter()
        .map(|column| {
            let true_rows = match column {
                Column::Table(c) => table.true_rows(*c),
                _ => Vec::new(),
            };
            (0..table.rows_count())
                .map(|row| match column {
                    Column::Always => true,
                    Column::Never => false,
                    Column::Table(_) => true_rows.binary_search(&row).is_ok(),
                })
                .collect()
        })
        .collect();

    for (i, transition) in outgoing.iter().enumerate() {
        if let Column::Table(_) = columns[i] {
            if !truth[i].contains(&true) {
                issues.push(Issue::AlwaysFalse {
                    transition: transition.id(),
                });
                continue;
            }
        }
        if matches!(columns[i], Column::Never) {
            continue;
        }
        let shadowed = (0..table.rows_count())
            .filter(|&row| truth[i][row])
            .all(|row| (0..i).any(|j| truth[j][row]));
        if shadowed {
            let by = (0..i)
                .filter(|&j| (0..table.rows_count()).any(|row| truth[i][row] && truth[j][row]))
                .map(|j| outgoing[j].id())
                .collect();
            issues.push(Issue::Shadowed {
                transition: transition.id(),
                by,
            });
        }
    }

    for i in 0..outgoing.len() {
        for j in (i + 1)..outgoing.len() {
            let rows: Vec<usize> = (0..table.rows_count())
                .filter(|&row| truth[i][row] && truth[j][row])
                .collect();
            if !rows.is_empty() {
                issues.push(Issue::NonDeterministic {
                    state,
                    first: outgoing[i].id(),
                    second: outgoing[j].id(),
                    rows,
                });
            }
        }
    }
}

fn reachable(machine: &Machine, initial: StateId) -> BTreeSet<StateId> {
    let mut seen = BTreeSet::from([initial]);
    let mut queue = VecDeque::from([initial]);
    while let Some(state) = queue.pop_front() {
        for transition in machine.outgoing(state) {
            if seen.insert(transition.target()) {
                queue.push_back(transition.target());
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::equation::Operator;
    use crate::value::LogicValue;
    use crate::variable::VariableKind;

    #[test]
    fn test_missing_initial_state() {
        let mut m = Machine::new("m");
        m.add_state("S0");
        let issues = verify(&m);
        assert_eq!(issues, vec![Issue::MissingInitialState]);
        assert!(issues[0].is_blocking());
    }

    #[test]
    fn test_first_match_hazard() {
        let mut m = Machine::new("m");
        let x = m.add_variable("X", VariableKind::Input, 1).unwrap();
        let s0 = m.add_state("S0");
        let s1 = m.add_state("S1");
        let s2 = m.add_state("S2");
        m.set_initial_state(Some(s0)).unwrap();
        let vals = m.variables().current();
        let t1 = m.add_transition(s0, s1, Some(Equation::identity(x, &vals))).unwrap();
        let t2 = m.add_transition(s0, s2, None).unwrap();

        assert_eq!(
            verify(&m),
            vec![Issue::NonDeterministic {
                state: s0,
                first: t1,
                second: t2,
                rows: vec![1],
            }]
        );
    }

    #[test]
    fn test_exclusive_conditions_are_deterministic() {
        let mut m = Machine::new("m");
        let x = m.add_variable("X", VariableKind::Input, 1).unwrap();
        let s0 = m.add_state("S0");
        let s1 = m.add_state("S1");
        m.set_initial_state(Some(s0)).unwrap();
        let vals = m.variables().current();
        let not_x = Equation::from_operands(Operator::Not, vec![x.into()], &vals).unwrap();
        m.add_transition(s0, s1, Some(Equation::identity(x, &vals))).unwrap();
        m.add_transition(s0, s0, Some(not_x)).unwrap();
        m.add_transition(s1, s0, None).unwrap();
        assert!(verify(&m).is_empty());
    }

    #[test]
    fn test_constants_are_not_enumerated() {
        let mut m = Machine::new("m");
        let x = m.add_variable("X", VariableKind::Input, 1).unwrap();
        let k = m
            .add_variable_with_value("K", VariableKind::Constant, LogicValue::ones(1))
            .unwrap();
        let s0 = m.add_state("S0");
        let s1 = m.add_state("S1");
        m.set_initial_state(Some(s0)).unwrap();
        let vals = m.variables().current();
        let x_is_k = Equation::from_operands(Operator::Equal, vec![x.into(), k.into()], &vals).unwrap();
        let not_x = Equation::from_operands(Operator::Not, vec![x.into()], &vals).unwrap();
        m.add_transition(s0, s1, Some(x_is_k)).unwrap();
        m.add_transition(s0, s0, Some(not_x)).unwrap();
        m.add_transition(s1, s0, None).unwrap();
        assert!(verify(&m).is_empty());
    }

    #[test]
    fn test_never_crossed() {
        let mut m = Machine::new("m");
        let x = m.add_variable("X", VariableKind::Input, 1).unwrap();
        let w = m.add_variable("W", VariableKind::Input, 2).unwrap();
        let s0 = m.add_state("S0");
        let s1 = m.add_state("S1");
        m.set_initial_state(Some(s0)).unwrap();
        let vals = m.variables().current();

        let contradiction = Equation::from_operands(
            Operator::And,
            vec![x.into(), Equation::from_operands(Operator::Not, vec![x.into()], &vals).unwrap().into()],
            &vals,
        )
        .unwrap();
        let mismatch = Equation::from_operands(Operator::And, vec![x.into(), w.into()], &vals).unwrap();
        let wide = Equation::identity(w, &vals);
        let shadow = Equation::identity(x, &vals);
        let always = m.add_transition(s0, s1, None).unwrap();
        let t_false = m.add_transition(s0, s1, Some(contradiction)).unwrap();
        let t_fail = m.add_transition(s0, s1, Some(mismatch)).unwrap();
        let t_wide = m.add_transition(s0, s1, Some(wide)).unwrap();
        let t_shadow = m.add_transition(s0, s1, Some(shadow)).unwrap();

        let issues = verify(&m);
        assert!(issues.contains(&Issue::AlwaysFalse { transition: t_false }));
        assert!(issues.contains(&Issue::FailingCondition {
            transition: t_fail,
            cause: FailureCause::SizeMismatch,
        }));
        assert!(issues.contains(&Issue::WideCondition {
            transition: t_wide,
            size: 2,
        }));
        assert!(issues.contains(&Issue::Shadowed {
            transition: t_shadow,
            by: vec![always],
        }));
        assert!(issues
            .iter()
            .all(|issue| !matches!(issue, Issue::Shadowed { transition, .. } if *transition == t_false)));
    }

    #[test]
    fn test_unreachable() {
        let mut m = Machine::new("m");
        let s0 = m.add_state("S0");
        let s1 = m.add_state("S1");
        let s2 = m.add_state("S2");
        m.set_initial_state(Some(s0)).unwrap();
        m.add_transition(s0, s1, Some(Equation::identity(LogicValue::ones(1), &m.variables().current())))
            .unwrap();
        m.add_transition(s2, s0, None).unwrap();
        assert_eq!(verify(&m), vec![Issue::Unreachable { state: s2 }]);
    }

    #[test]
    fn test_display() {
        let issue = Issue::FailingCondition {
            transition: TransitionId::new(4),
            cause: FailureCause::NullOperand,
        };
        assert_eq!(issue.to_string(), "t4 will never be crossed: one of the operands is missing");
    }
}
