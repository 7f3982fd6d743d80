// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

use std::time::Duration;

use clap::Parser;

use admittance::controller::interfaces::{
    HW_IF_ESTIMATED_FT_PREFIX, HW_IF_FORCE_Z, HW_IF_POSITION, HW_IF_SAMPLE_TIME,
    HW_IF_SESSION_STATE,
};
use admittance::{
    AdmittanceController, AdmittanceControllerConfig, CommandInterface, ControlLoop,
    ControllerInterface, ControllerResult, HardwareInterface, RealtimeConfig, RobotDescription,
    SessionState, StateInterface, DEFAULT_CUTOFF_FREQUENCY, N_JNTS,
};

/// An example which runs the admittance controller against a simulated LBR.
///
/// The simulated robot follows the commanded joint positions exactly. A constant force along
/// z pushes the tip for the first half of the run, and the FRI session switches to
/// commanding after a few cycles.
#[derive(Parser, Debug)]
#[clap(author, version, name = "admittance_simulation")]
struct CommandLineArguments {
    /// Number of control cycles
    #[clap(long, default_value = "2000")]
    pub cycles: usize,
    /// Force along z in [N] applied during the first half of the run
    #[clap(long, default_value = "5.0")]
    pub force: f64,
    /// Virtual mass in [kg]
    #[clap(long)]
    pub mass: Option<f64>,
    /// Virtual damping in [Ns/m]
    #[clap(long)]
    pub damping: Option<f64>,
    /// Virtual stiffness in [N/m]
    #[clap(long)]
    pub stiffness: Option<f64>,
    /// JSON file with the controller parameters
    #[clap(long)]
    pub config: Option<String>,
    /// URDF of the robot. Defaults to a simplified LBR iiwa 7
    #[clap(long)]
    pub urdf: Option<String>,
    /// Low-pass filter the velocity estimate with the default cutoff frequency
    #[clap(short, long, action)]
    pub filter: bool,
}

const SAMPLE_TIME: f64 = 0.005;
const COMMANDING_AFTER_CYCLES: usize = 10;
const Q_START: [f64; N_JNTS] = [0.0, 0.5, 0.0, -1.2, 0.0, 0.6, 0.0];

struct SimulatedLbr {
    joint_names: Vec<String>,
    q: [f64; N_JNTS],
    force: f64,
    cycles: usize,
    push_cycles: usize,
}

impl SimulatedLbr {
    fn joint_index(&self, prefix_name: &str) -> Option<usize> {
        self.joint_names.iter().position(|name| name == prefix_name)
    }
}

impl HardwareInterface for SimulatedLbr {
    fn read(&mut self, state_interfaces: &mut [StateInterface]) -> ControllerResult<()> {
        let session_state = if self.cycles >= COMMANDING_AFTER_CYCLES {
            SessionState::CommandingActive
        } else {
            SessionState::MonitoringReady
        };
        let force = if self.cycles < self.push_cycles {
            self.force
        } else {
            0.
        };
        for state in state_interfaces.iter_mut() {
            let value = match (state.get_prefix_name(), state.get_interface_name()) {
                (_, HW_IF_SAMPLE_TIME) => SAMPLE_TIME,
                (_, HW_IF_SESSION_STATE) => session_state as u8 as f64,
                (HW_IF_ESTIMATED_FT_PREFIX, HW_IF_FORCE_Z) => force,
                (prefix, HW_IF_POSITION) => match self.joint_index(prefix) {
                    Some(joint) => self.q[joint],
                    None => 0.,
                },
                _ => 0.,
            };
            state.set_value(value);
        }
        self.cycles += 1;
        Ok(())
    }

    fn write(&mut self, command_interfaces: &[CommandInterface]) -> ControllerResult<()> {
        for command in command_interfaces {
            if let Some(joint) = self.joint_index(command.get_prefix_name()) {
                self.q[joint] = command.get_value();
            }
        }
        Ok(())
    }
}

fn main() -> ControllerResult<()> {
    tracing_subscriber::fmt::init();
    let args = CommandLineArguments::parse();
    let mut config = match args.config.as_ref() {
        Some(path) => AdmittanceControllerConfig::from_json_file(path)?,
        None => AdmittanceControllerConfig::default(),
    };
    if let Some(mass) = args.mass {
        config.admittance.mass = mass;
    }
    if let Some(damping) = args.damping {
        config.admittance.damping = damping;
    }
    if let Some(stiffness) = args.stiffness {
        config.admittance.stiffness = stiffness;
    }
    if args.filter {
        config.velocity_cutoff_frequency = DEFAULT_CUTOFF_FREQUENCY;
    }

    let robot_description = match args.urdf.as_ref() {
        Some(path) => RobotDescription::from_urdf_file(path)?,
        None => RobotDescription::lbr_iiwa7(&config.robot_name)?,
    };
    let mut controller =
        AdmittanceController::new(config).with_robot_description(robot_description);
    controller.on_init()?;
    controller.on_configure()?;

    let mut robot = SimulatedLbr {
        joint_names: controller.joint_names().to_vec(),
        q: Q_START,
        force: args.force,
        cycles: 0,
        push_cycles: args.cycles / 2,
    };
    let statistics = {
        let mut control_loop = ControlLoop::new(
            &mut controller,
            &mut robot,
            Duration::from_secs_f64(SAMPLE_TIME),
            RealtimeConfig::Ignore,
        )?;
        control_loop.run(args.cycles)?
    };
    println!(
        "{} commanded and {} gated cycles, {} overruns",
        statistics.commanded_cycles, statistics.gated_cycles, statistics.overruns
    );
    println!("tip displacement: {:?}", controller.displacement().as_slice());
    println!("final joint positions: {:?}", robot.q);
    Ok(())
}
