//! # logic-fsm: Logic equations and finite state machine simulation
//!
//! **`logic-fsm`** is the evaluation and simulation core of a finite state machine design tool.
//! Machines are graphs of states and transitions; transitions carry logic conditions, and both
//! states and transitions carry actions on variables.
//!
//! ## Key Features
//!
//! - **Bit-vector values**: [`LogicValue`][crate::value::LogicValue] is an unsigned bit vector of any width, with bitwise operators, slicing, concatenation, wrapping increment/decrement and numeric views.
//! - **Self-maintaining equations**: an [`Equation`][crate::equation::Equation] caches its value and recomputes it on every edit. A malformed equation never panics or errors: it yields the null value and records a [`FailureCause`][crate::equation::FailureCause].
//! - **Weak variable references**: operands and actions name variables by [`VariableId`][crate::types::VariableId]. Removing a variable degrades its users, it never leaves them dangling.
//! - **Moore and Mealy actions**: pulses, levels held while a state is active, set/reset/assign, increment/decrement, on whole variables or bit ranges.
//! - **Deterministic simulation**: the first declared crossable transition wins, and the [`verifier`] tells you when that rule hides a problem.
//!
//! ## Basic Usage
//!
//! ```rust
//! use logic_fsm::action::{Action, ActionType};
//! use logic_fsm::equation::Equation;
//! use logic_fsm::machine::Machine;
//! use logic_fsm::simulator::Simulator;
//! use logic_fsm::value::LogicValue;
//! use logic_fsm::variable::VariableKind;
//!
//! // 1. Describe the machine
//! let mut machine = Machine::new("blink");
//! let go = machine.add_variable("go", VariableKind::Input, 1).unwrap();
//! let led = machine.add_variable("led", VariableKind::Output, 1).unwrap();
//! let off = machine.add_state("Off");
//! let on = machine.add_state("On");
//! machine.set_initial_state(Some(off)).unwrap();
//!
//! // 2. Conditions and actions
//! let condition = Equation::identity(go, &machine.variables().current());
//! machine.add_transition(off, on, Some(condition)).unwrap();
//! machine.add_transition(on, off, None).unwrap();
//! let action = Action::new(led, ActionType::ActiveOnState, machine.variables()).unwrap();
//! machine.add_state_action(on, action).unwrap();
//!
//! // 3. Simulate
//! let mut sim = Simulator::new(machine);
//! sim.build().unwrap();
//! sim.step().unwrap(); // `go` is 0: holds in Off
//! assert_eq!(sim.active_state(), Some(off));
//!
//! sim.set_input(go, LogicValue::ones(1)).unwrap();
//! sim.step().unwrap();
//! assert_eq!(sim.active_state(), Some(on));
//! assert_eq!(sim.value(led), Some(&LogicValue::ones(1)));
//! ```
//!
//! ## Core Components
//!
//! - **[`value`]**: Bit-vector values and bit ranges.
//! - **[`variable`]**: Variables, the variable registry and valuations.
//! - **[`equation`]** and **[`operand`]**: Logic equations.
//! - **[`action`]**: Actions on variables.
//! - **[`truth_table`]**: Exhaustive enumeration of equations.
//! - **[`machine`]**: States, transitions and change notifications.
//! - **[`simulator`]**: The step-by-step simulator.
//! - **[`verifier`]**: Determinism and reachability checks.

pub mod action;
pub mod equation;
pub mod error;
pub mod event;
pub mod machine;
pub mod operand;
pub mod simulator;
pub mod truth_table;
pub mod types;
pub mod value;
pub mod variable;
pub mod verifier;

pub use error::{Error, Result};
