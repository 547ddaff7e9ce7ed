use std::time::Duration;

use clap::Parser;
use log::info;

use logic_fsm::action::{Action, ActionType};
use logic_fsm::equation::{Equation, Operator};
use logic_fsm::machine::Machine;
use logic_fsm::simulator::{Simulator, SimulatorConfig, StepOutcome};
use logic_fsm::truth_table::TruthTable;
use logic_fsm::types::VariableId;
use logic_fsm::value::LogicValue;
use logic_fsm::variable::VariableKind;
use logic_fsm::verifier::verify;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of clock ticks to simulate.
    #[arg(value_name = "INT", default_value = "16")]
    steps: usize,

    /// Tick at which a car shows up on the side road.
    #[clap(long, value_name = "INT", default_value = "3")]
    car_at: usize,

    /// Clock period, in milliseconds.
    #[clap(long, value_name = "INT", default_value = "0")]
    period: u64,

    /// Print the truth table of the conditions leaving each state.
    #[clap(long)]
    tables: bool,
}

struct Lights {
    machine: Machine,
    car: VariableId,
    outputs: Vec<VariableId>,
}

/// Main road stays green until a car waits on the side road for long enough.
fn build_machine() -> color_eyre::Result<Lights> {
    let mut m = Machine::new("traffic light");

    let car = m.add_variable("car", VariableKind::Input, 1)?;
    let timer = m.add_variable("timer", VariableKind::Internal, 2)?;
    let outputs = vec![
        m.add_variable("main_green", VariableKind::Output, 1)?,
        m.add_variable("main_yellow", VariableKind::Output, 1)?,
        m.add_variable("side_green", VariableKind::Output, 1)?,
        m.add_variable("side_yellow", VariableKind::Output, 1)?,
    ];

    let names = ["MainGreen", "MainYellow", "SideGreen", "SideYellow"];
    let states: Vec<_> = names.iter().map(|name| m.add_state(*name)).collect();
    m.set_initial_state(Some(states[0]))?;
    for (&state, &light) in states.iter().zip(&outputs) {
        let action = Action::new(light, ActionType::ActiveOnState, m.variables())?;
        m.add_state_action(state, action)?;
    }

    let vals = m.variables().current();
    let timer_high = Equation::extract(timer, 1, None, &vals);
    let leave_main = Equation::from_operands(Operator::And, vec![car.into(), timer_high.clone().into()], &vals)?;
    let leave_side = timer_high;

    // Green states: leave when the timer allows it, count otherwise.
    for (green, condition, next) in [(0, leave_main, 1), (2, leave_side, 3)] {
        let leave = m.add_transition(states[green], states[next], Some(condition))?;
        m.add_transition_action(leave, Action::new(timer, ActionType::Reset, m.variables())?)?;
        let wait = m.add_transition(states[green], states[green], None)?;
        m.add_transition_action(wait, Action::new(timer, ActionType::Increment, m.variables())?)?;
    }
    m.add_transition(states[1], states[2], None)?;
    m.add_transition(states[3], states[0], None)?;

    Ok(Lights { machine: m, car, outputs })
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Cli::parse();
    println!("args = {:?}", args);

    let Lights { machine, car, outputs } = build_machine()?;

    println!("Verifying `{}`...", machine.name());
    for issue in verify(&machine) {
        println!("  - {}", issue);
    }

    if args.tables {
        for state in machine.states() {
            let conditions: Vec<&Equation> = machine.outgoing(state.id()).filter_map(|t| t.condition()).collect();
            if conditions.is_empty() {
                continue;
            }
            let table = TruthTable::new(&conditions, machine.variables())?;
            println!("Conditions leaving {}:\n{}", state.name(), table);
        }
    }

    let config = SimulatorConfig::default()
        .with_clock_period(Duration::from_millis(args.period))
        .with_step_limit(args.steps);
    let mut sim = Simulator::with_config(machine, config);
    sim.build()?;
    sim.start()?;

    for tick in 0..args.steps {
        if tick == args.car_at {
            info!("a car arrives");
            sim.set_input(car, LogicValue::ones(1))?;
        }

        let outcome = sim.tick()?;
        let state = sim
            .active_state()
            .and_then(|s| sim.machine().state(s))
            .map_or("?", |s| s.name());
        let lights: String = outputs
            .iter()
            .map(|&light| match sim.value(light) {
                Some(value) if value.is_true() => '●',
                _ => '○',
            })
            .collect();
        println!("tick {:>3}: {:<10} {}", tick, state, lights);

        if let StepOutcome::Crossed { to, .. } = outcome {
            if Some(to) == sim.machine().initial_state() && tick > args.car_at {
                sim.set_input(car, LogicValue::zeros(1))?;
            }
        }
        std::thread::sleep(sim.config().clock_period);
    }

    sim.stop()?;
    println!("Simulated {} steps", args.steps);

    Ok(())
}
