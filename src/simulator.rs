//! Step-by-step simulation of a machine.
//!
//! The [`Simulator`] owns a [`Machine`] and moves its active state.
//!
//! ## Status
//!
//! ```text
//!            build             start
//!   Idle ──────────▶ Ready ──────────▶ Running ◀──┐
//!    ▲                 │                  │ pause  │ start
//!    │                 │                  ▼        │
//!    └──── stop ───────┴──────────────  Paused ────┘
//! ```
//!
//! `step` works in every status but `Idle`; `tick` (one clock period
//! elapsed) only while `Running`.
//!
//! ## One step
//!
//! The outgoing transitions of the active state are scanned in declaration
//! order and the first one whose condition is `1` (or which has no
//! condition) is crossed:
//!
//! 1. the Moore actions of the active state end,
//! 2. the Mealy actions of the transition begin and immediately end,
//! 3. the target becomes the active state,
//! 4. the Moore actions of the new active state begin.
//!
//! When no transition can be crossed, the active state is kept and its
//! `Pulse` actions end: a pulse lasts one step at most. `ActiveOnState`
//! actions keep acting.

use std::fmt;
use std::time::Duration;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::machine::Machine;
use crate::types::{StateId, TransitionId, VariableId};
use crate::value::LogicValue;
use crate::variable::VariableKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SimulatorStatus {
    /// Not built yet, or stopped.
    Idle,
    /// Built, the clock is not running.
    Ready,
    Running,
    Paused,
}

impl SimulatorStatus {
    fn name(self) -> &'static str {
        match self {
            SimulatorStatus::Idle => "idle",
            SimulatorStatus::Ready => "ready",
            SimulatorStatus::Running => "running",
            SimulatorStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for SimulatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration options for the simulator.
///
/// Use `SimulatorConfig::default()` for standard settings.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Period of the free-running clock (default: 1s)
    pub clock_period: Duration,
    /// Maximum number of steps taken by [`Simulator::run`] (default: 1000)
    pub step_limit: usize,
    /// Whether current values are restored to their initial values on build
    /// and reset (default: true)
    pub reset_variables: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            clock_period: Duration::from_secs(1),
            step_limit: 1000,
            reset_variables: true,
        }
    }
}

impl SimulatorConfig {
    pub fn with_clock_period(mut self, clock_period: Duration) -> Self {
        self.clock_period = clock_period;
        self
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn with_reset_variables(mut self, reset_variables: bool) -> Self {
        self.reset_variables = reset_variables;
        self
    }
}

/// What a step did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Crossed {
        transition: TransitionId,
        from: StateId,
        to: StateId,
    },
    /// No transition could be crossed.
    Held,
}

#[derive(Debug)]
pub struct Simulator {
    machine: Machine,
    config: SimulatorConfig,
    status: SimulatorStatus,
    active_state: Option<StateId>,
    step_count: u64,
}

impl Simulator {
    pub fn new(machine: Machine) -> Self {
        Self::with_config(machine, SimulatorConfig::default())
    }

    pub fn with_config(machine: Machine, config: SimulatorConfig) -> Self {
        Self {
            machine,
            config,
            status: SimulatorStatus::Idle,
            active_state: None,
            step_count: 0,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// The machine can only be edited while the simulator is idle.
    pub fn machine_mut(&mut self) -> Result<&mut Machine> {
        self.require(&[SimulatorStatus::Idle], "edit")?;
        Ok(&mut self.machine)
    }

    pub fn into_machine(self) -> Machine {
        self.machine
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn status(&self) -> SimulatorStatus {
        self.status
    }

    pub fn active_state(&self) -> Option<StateId> {
        self.active_state
    }

    /// Steps taken since the last build or reset.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Current value of a variable.
    pub fn value(&self, id: VariableId) -> Option<&LogicValue> {
        self.machine.variable(id).map(|v| v.current_value())
    }

    /// Prepares the simulation: the initial state becomes active.
    pub fn build(&mut self) -> Result<()> {
        self.require(&[SimulatorStatus::Idle], "build")?;
        let initial = self.machine.initial_state().ok_or(Error::MissingInitialState)?;
        debug!("build `{}`, initial state {}", self.machine.name(), initial);
        self.status = SimulatorStatus::Ready;
        self.restart(initial)
    }

    /// Starts (or resumes) the clock.
    pub fn start(&mut self) -> Result<()> {
        self.require(&[SimulatorStatus::Ready, SimulatorStatus::Paused], "start")?;
        self.status = SimulatorStatus::Running;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.require(&[SimulatorStatus::Running], "pause")?;
        self.status = SimulatorStatus::Paused;
        Ok(())
    }

    /// Ends the simulation: running actions end and initial values come back.
    pub fn stop(&mut self) -> Result<()> {
        self.require(
            &[SimulatorStatus::Ready, SimulatorStatus::Running, SimulatorStatus::Paused],
            "stop",
        )?;
        if let Some(active) = self.active_state {
            self.machine.end_state_actions(active)?;
        }
        self.machine.clear_acting();
        self.machine.reset_current_values()?;
        self.set_active(None);
        self.status = SimulatorStatus::Idle;
        debug!("stopped after {} steps", self.step_count);
        Ok(())
    }

    /// Back to the initial state, keeping the status.
    pub fn reset(&mut self) -> Result<()> {
        self.require(
            &[SimulatorStatus::Ready, SimulatorStatus::Running, SimulatorStatus::Paused],
            "reset",
        )?;
        let initial = self.machine.initial_state().ok_or(Error::MissingInitialState)?;
        if let Some(active) = self.active_state {
            self.machine.end_state_actions(active)?;
        }
        debug!("reset to {}", initial);
        self.restart(initial)
    }

    fn restart(&mut self, initial: StateId) -> Result<()> {
        self.machine.clear_acting();
        if self.config.reset_variables {
            self.machine.reset_current_values()?;
        }
        self.step_count = 0;
        self.set_active(Some(initial));
        self.machine.begin_state_actions(initial)
    }

    /// One clock period elapsed.
    pub fn tick(&mut self) -> Result<StepOutcome> {
        self.require(&[SimulatorStatus::Running], "tick")?;
        self.step()
    }

    /// Crosses the first crossable transition leaving the active state, if any.
    pub fn step(&mut self) -> Result<StepOutcome> {
        self.require(
            &[SimulatorStatus::Ready, SimulatorStatus::Running, SimulatorStatus::Paused],
            "step",
        )?;
        let Some(active) = self.active_state else {
            return Ok(StepOutcome::Held);
        };
        self.step_count += 1;

        let crossed = self
            .machine
            .outgoing(active)
            .find(|t| t.is_crossable())
            .map(|t| (t.id(), t.target()));
        let Some((transition, target)) = crossed else {
            trace!("step {}: holding in {}", self.step_count, active);
            self.machine.end_state_pulses(active)?;
            return Ok(StepOutcome::Held);
        };

        debug!(
            "step {}: crossing {} ({} -> {})",
            self.step_count, transition, active, target
        );
        self.machine.end_state_actions(active)?;
        self.machine.fire_transition_actions(transition)?;
        self.machine.notify(Event::TransitionCrossed(transition));
        self.set_active(Some(target));
        self.machine.begin_state_actions(target)?;

        Ok(StepOutcome::Crossed {
            transition,
            from: active,
            to: target,
        })
    }

    /// Steps until the machine holds or the step limit is reached.
    ///
    /// Returns the number of transitions crossed. The simulator is paused
    /// afterwards.
    pub fn run(&mut self) -> Result<usize> {
        self.require(
            &[SimulatorStatus::Ready, SimulatorStatus::Running, SimulatorStatus::Paused],
            "run",
        )?;
        self.status = SimulatorStatus::Running;
        let mut crossed = 0;
        for _ in 0..self.config.step_limit {
            match self.step()? {
                StepOutcome::Crossed { .. } => crossed += 1,
                StepOutcome::Held => break,
            }
        }
        self.status = SimulatorStatus::Paused;
        Ok(crossed)
    }

    /// Jumps to `state` without crossing any transition.
    pub fn force_state(&mut self, state: StateId) -> Result<()> {
        self.require(
            &[SimulatorStatus::Ready, SimulatorStatus::Running, SimulatorStatus::Paused],
            "force state",
        )?;
        self.machine.state(state).ok_or(Error::UnknownState(state))?;
        if let Some(active) = self.active_state {
            self.machine.end_state_actions(active)?;
        }
        debug!("forcing state {}", state);
        self.set_active(Some(state));
        self.machine.begin_state_actions(state)
    }

    /// Drives an input.
    pub fn set_input(&mut self, id: VariableId, value: LogicValue) -> Result<()> {
        let variable = self.machine.variable(id).ok_or(Error::UnknownVariable(id))?;
        if variable.kind() != VariableKind::Input {
            return Err(Error::IllegalOperation("only inputs can be driven"));
        }
        self.machine.set_current_value(id, value)
    }

    fn set_active(&mut self, state: Option<StateId>) {
        let previous = self.active_state;
        self.active_state = state;
        if previous != state {
            self.machine.notify(Event::ActiveStateChanged {
                previous,
                current: state,
            });
        }
    }

    fn require(&self, allowed: &[SimulatorStatus], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(Error::InvalidStatus {
                operation,
                status: self.status.name(),
            })
        }
    }
}
