// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains a fixed-rate loop which drives a controller against a hardware interface.
use std::time::{Duration, Instant};

#[cfg(test)]
use mockall::automock;
use tracing::{debug, warn};

use crate::controller::control_tools::{apply_realtime_config, RealtimeConfig};
use crate::controller::controller_interface::{ControllerInterface, CycleOutcome};
use crate::controller::interfaces::{CommandInterface, Interface, StateInterface};
use crate::exception::ControllerResult;

/// Access to the robot from the host side.
#[cfg_attr(test, automock)]
pub trait HardwareInterface {
    /// Writes the current state of the robot into the state interfaces.
    fn read(&mut self, state_interfaces: &mut [StateInterface]) -> ControllerResult<()>;

    /// Sends the command interfaces to the robot.
    fn write(&mut self, command_interfaces: &[CommandInterface]) -> ControllerResult<()>;
}

/// Counts the outcomes of the cycles of a [`ControlLoop::run`](`ControlLoop::run`).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LoopStatistics {
    pub commanded_cycles: usize,
    pub gated_cycles: usize,
    /// Cycles which took longer than the period.
    pub overruns: usize,
}

/// Runs an initialized and configured controller at a fixed period.
///
/// The loop owns the interfaces and lends them to the hardware and to the controller once
/// per cycle.
pub struct ControlLoop<'a, C: ControllerInterface, H: HardwareInterface> {
    controller: &'a mut C,
    hardware: &'a mut H,
    period: Duration,
    state_interfaces: Vec<StateInterface>,
    command_interfaces: Vec<CommandInterface>,
}

impl<'a, C: ControllerInterface, H: HardwareInterface> ControlLoop<'a, C, H> {
    /// Creates the interfaces requested by the controller.
    /// # Errors
    /// * RealTimeException if `realtime_config` is
    /// [`Enforce`](`RealtimeConfig::Enforce`) and real-time scheduling is unavailable.
    pub fn new(
        controller: &'a mut C,
        hardware: &'a mut H,
        period: Duration,
        realtime_config: RealtimeConfig,
    ) -> ControllerResult<Self> {
        apply_realtime_config(realtime_config)?;
        let state_interfaces = controller
            .state_interface_configuration()
            .names
            .iter()
            .map(|name| Interface::from_name(name, 0.))
            .collect();
        let command_interfaces = controller
            .command_interface_configuration()
            .names
            .iter()
            .map(|name| Interface::from_name(name, 0.))
            .collect();
        Ok(ControlLoop {
            controller,
            hardware,
            period,
            state_interfaces,
            command_interfaces,
        })
    }

    pub fn state_interfaces(&self) -> &[StateInterface] {
        &self.state_interfaces
    }

    pub fn command_interfaces(&self) -> &[CommandInterface] {
        &self.command_interfaces
    }

    /// Activates the controller, runs `cycles` control cycles and deactivates the controller
    /// again, also if a cycle fails.
    pub fn run(&mut self, cycles: usize) -> ControllerResult<LoopStatistics> {
        self.hardware.read(&mut self.state_interfaces)?;
        self.hold_current_state();
        self.controller
            .on_activate(&self.state_interfaces, &self.command_interfaces)?;
        let result = self.do_loop(cycles);
        let deactivated = self.controller.on_deactivate();
        let statistics = result?;
        deactivated?;
        debug!("Control loop finished: {:?}", statistics);
        Ok(statistics)
    }

    /// Initializes every command interface with the state interface of the same name, so
    /// that a robot which is commanded before the controller writes stays where it is.
    fn hold_current_state(&mut self) {
        for command in self.command_interfaces.iter_mut() {
            if let Some(state) = self
                .state_interfaces
                .iter()
                .find(|state| state.has_name(&command.get_name()))
            {
                command.set_value(state.get_value());
            }
        }
    }

    fn do_loop(&mut self, cycles: usize) -> ControllerResult<LoopStatistics> {
        let mut statistics = LoopStatistics::default();
        let mut previous_time = Instant::now();
        for _ in 0..cycles {
            let start = Instant::now();
            self.hardware.read(&mut self.state_interfaces)?;
            let outcome = self.controller.update(
                &self.state_interfaces,
                &mut self.command_interfaces,
                &(start - previous_time),
            )?;
            previous_time = start;
            match outcome {
                CycleOutcome::Commanded => statistics.commanded_cycles += 1,
                CycleOutcome::Gated(_) => statistics.gated_cycles += 1,
            }
            self.hardware.write(&self.command_interfaces)?;
            let elapsed = start.elapsed();
            if elapsed < self.period {
                std::thread::sleep(self.period - elapsed);
            } else {
                statistics.overruns += 1;
                warn!("Control cycle overran: {:?} > {:?}", elapsed, self.period);
            }
        }
        Ok(statistics)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockall::Sequence;

    use crate::controller::admittance_controller::AdmittanceController;
    use crate::controller::config::AdmittanceControllerConfig;
    use crate::controller::control_loop::{ControlLoop, MockHardwareInterface};
    use crate::controller::control_tools::RealtimeConfig;
    use crate::controller::controller_interface::ControllerInterface;
    use crate::controller::interfaces::StateInterface;
    use crate::exception::ControllerException;
    use crate::model::RobotDescription;

    const Q_0: [f64; 7] = [0.0, 0.5, 0.0, -1.2, 0.0, 0.6, 0.0];

    fn controller() -> AdmittanceController {
        let mut controller = AdmittanceController::new(AdmittanceControllerConfig::default())
            .with_robot_description(RobotDescription::lbr_iiwa7("lbr").unwrap());
        controller.on_init().unwrap();
        controller.on_configure().unwrap();
        controller
    }

    fn fill_state(state_interfaces: &mut [StateInterface], session_state: f64) {
        for state in state_interfaces.iter_mut() {
            let value = match state.get_name().as_str() {
                "auxiliary_sensor/session_state" => session_state,
                "auxiliary_sensor/sample_time" => 0.005,
                "estimated_ft_sensor/force.z" => 2.,
                name => match name.strip_prefix("lbr_A") {
                    Some(rest) => {
                        let joint: usize = rest[..1].parse().unwrap();
                        Q_0[joint - 1]
                    }
                    None => 0.,
                },
            };
            state.set_value(value);
        }
    }

    #[test]
    fn run_test() {
        let mut controller = controller();
        let mut hardware = MockHardwareInterface::new();
        let mut sequence = Sequence::new();
        hardware
            .expect_read()
            .times(3)
            .in_sequence(&mut sequence)
            .returning(|state| {
                fill_state(state, 2.);
                Ok(())
            });
        hardware
            .expect_read()
            .times(2)
            .in_sequence(&mut sequence)
            .returning(|state| {
                fill_state(state, 4.);
                Ok(())
            });
        hardware.expect_write().times(4).returning(|commands| {
            assert_eq!(commands.len(), 7);
            Ok(())
        });
        let mut control_loop = ControlLoop::new(
            &mut controller,
            &mut hardware,
            Duration::from_millis(1),
            RealtimeConfig::Ignore,
        )
        .unwrap();
        assert_eq!(control_loop.state_interfaces().len(), 15);
        let statistics = control_loop.run(4).unwrap();
        assert_eq!(statistics.gated_cycles, 2);
        assert_eq!(statistics.commanded_cycles, 2);
        assert!(control_loop
            .command_interfaces()
            .iter()
            .zip(Q_0.iter())
            .all(|(command, q)| f64::abs(command.get_value() - q) < 0.01));
        drop(control_loop);
        assert!(!controller.is_active());
    }

    #[test]
    fn run_deactivates_on_error_test() {
        let mut controller = controller();
        let mut hardware = MockHardwareInterface::new();
        let mut sequence = Sequence::new();
        hardware
            .expect_read()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|state| {
                fill_state(state, 2.);
                Ok(())
            });
        hardware
            .expect_read()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|state| {
                fill_state(state, 9.);
                Ok(())
            });
        hardware.expect_write().never();
        let mut control_loop = ControlLoop::new(
            &mut controller,
            &mut hardware,
            Duration::from_millis(1),
            RealtimeConfig::Ignore,
        )
        .unwrap();
        let result = control_loop.run(10);
        assert_eq!(
            result,
            Err(ControllerException::InvalidSessionState { value: 9. })
        );
        drop(control_loop);
        assert!(!controller.is_active());
    }

    #[test]
    fn hold_current_state_test() {
        let mut controller = controller();
        let mut hardware = MockHardwareInterface::new();
        hardware.expect_read().times(1).returning(|state| {
            fill_state(state, 2.);
            Ok(())
        });
        let mut control_loop = ControlLoop::new(
            &mut controller,
            &mut hardware,
            Duration::from_millis(1),
            RealtimeConfig::Ignore,
        )
        .unwrap();
        let statistics = control_loop.run(0).unwrap();
        assert_eq!(statistics.commanded_cycles + statistics.gated_cycles, 0);
        for (command, q) in control_loop.command_interfaces().iter().zip(Q_0.iter()) {
            assert_eq!(command.get_value(), *q);
        }
    }
}
