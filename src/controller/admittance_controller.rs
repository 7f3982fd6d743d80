// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the admittance controller, which renders a virtual mass-spring-damper at the tip
//! of the robot and commands joint positions.
use std::time::Duration;

use nalgebra::Isometry3;
use tracing::{debug, error};

use crate::controller::admittance::AdmittanceModel;
use crate::controller::config::AdmittanceControllerConfig;
use crate::controller::controller_interface::{ControllerInterface, CycleOutcome};
use crate::controller::interfaces::{
    find_interface, read_interface, CommandInterface, ForceTorqueSensor, InterfaceConfiguration,
    StateInterface, HW_IF_AUXILIARY_PREFIX, HW_IF_ESTIMATED_FT_PREFIX, HW_IF_POSITION,
    HW_IF_SAMPLE_TIME, HW_IF_SESSION_STATE,
};
use crate::controller::inv_jac_ctrl::InverseJacobianController;
use crate::controller::low_pass_filter::cartesian_low_pass_filter;
use crate::controller::session_state::SessionState;
use crate::exception::{create_configuration_exception, ControllerException, ControllerResult};
use crate::model::{Kinematics, RobotDescription};
use crate::utils::{pose_error, CartesianVector, JointVector, N_JNTS};

/// Everything the control cycle needs to compute a command.
#[derive(Debug)]
pub enum Solver {
    /// [`on_init`](`ControllerInterface::on_init`) did not succeed yet.
    NotReady,
    Ready {
        admittance: AdmittanceModel,
        inv_jac_ctrl: InverseJacobianController,
    },
}

/// Pose the displacement is measured against.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Reference {
    /// No cycle ran since activation. The next cycle captures the reference.
    Uninitialized,
    Tracking {
        /// Tip pose captured in the first cycle after activation.
        reference: Isometry3<f64>,
        /// Tip pose of the previous cycle.
        previous: Isometry3<f64>,
    },
}

/// Interface locations resolved at activation.
#[derive(Debug, Copy, Clone, PartialEq)]
struct InterfaceIndices {
    joint_positions: [usize; N_JNTS],
    sample_time: usize,
    session_state: usize,
    joint_position_commands: [usize; N_JNTS],
}

/// Admittance controller for the LBR.
///
/// Wrench, displacement, velocity and the commanded twist are all expressed in the frame
/// of the chain tip. Each cycle the estimated external wrench at the tip is fed through an
/// [`AdmittanceModel`](`AdmittanceModel`), the resulting acceleration is integrated over
/// the period into a twist and the twist is turned into joint velocities by an
/// [`InverseJacobianController`](`InverseJacobianController`). Joint positions are only
/// commanded while the FRI session is
/// [`CommandingActive`](`SessionState::CommandingActive`).
#[derive(Debug)]
pub struct AdmittanceController {
    config: AdmittanceControllerConfig,
    robot_description: Option<RobotDescription>,
    joint_names: Vec<String>,
    solver: Solver,
    reference: Reference,
    estimated_ft_sensor: Option<ForceTorqueSensor>,
    interfaces: Option<InterfaceIndices>,

    f_ext: CartesianVector,
    pose: Isometry3<f64>,
    displacement: CartesianVector,
    dx: CartesianVector,
    ddx: CartesianVector,
    twist_command: CartesianVector,
    q: JointVector,
    dq: JointVector,
}

impl AdmittanceController {
    /// Creates an uninitialized controller.
    pub fn new(config: AdmittanceControllerConfig) -> Self {
        AdmittanceController {
            config,
            robot_description: None,
            joint_names: Vec::new(),
            solver: Solver::NotReady,
            reference: Reference::Uninitialized,
            estimated_ft_sensor: None,
            interfaces: None,
            f_ext: CartesianVector::zeros(),
            pose: Isometry3::identity(),
            displacement: CartesianVector::zeros(),
            dx: CartesianVector::zeros(),
            ddx: CartesianVector::zeros(),
            twist_command: CartesianVector::zeros(),
            q: JointVector::zeros(),
            dq: JointVector::zeros(),
        }
    }

    /// Sets the robot description the kinematic chain is resolved from.
    pub fn with_robot_description(mut self, robot_description: RobotDescription) -> Self {
        self.robot_description = Some(robot_description);
        self
    }

    pub fn config(&self) -> &AdmittanceControllerConfig {
        &self.config
    }

    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn is_active(&self) -> bool {
        self.interfaces.is_some()
    }

    /// External wrench of the last cycle.
    pub fn wrench(&self) -> &CartesianVector {
        &self.f_ext
    }

    /// Tip pose in the chain root frame of the last cycle.
    pub fn pose(&self) -> &Isometry3<f64> {
        &self.pose
    }

    /// Displacement from the reference pose in the last cycle, see
    /// [`pose_error`](`crate::utils::pose_error`).
    pub fn displacement(&self) -> &CartesianVector {
        &self.displacement
    }

    /// Estimated Cartesian velocity of the last cycle.
    pub fn velocity(&self) -> &CartesianVector {
        &self.dx
    }

    /// Cartesian acceleration computed by the admittance model in the last cycle.
    pub fn acceleration(&self) -> &CartesianVector {
        &self.ddx
    }

    /// Twist target of the last cycle.
    pub fn twist_command(&self) -> &CartesianVector {
        &self.twist_command
    }

    /// Joint velocity of the last commanded cycle.
    pub fn joint_velocity(&self) -> &JointVector {
        &self.dq
    }

    fn configure_joint_names(&mut self) -> ControllerResult<()> {
        self.joint_names = self.config.joint_names()?;
        Ok(())
    }

    fn configure_solver(&mut self) -> ControllerResult<()> {
        let description = self.robot_description.as_ref().ok_or_else(|| {
            create_configuration_exception("No robot description available.")
        })?;
        let admittance = AdmittanceModel::new(self.config.admittance)?;
        let mut parameters = self.config.inv_jac_ctrl.clone();
        // the wrench is estimated in the tip frame
        parameters.twist_in_tip_frame = true;
        let inv_jac_ctrl = InverseJacobianController::from_description(description, parameters)?;
        self.solver = Solver::Ready {
            admittance,
            inv_jac_ctrl,
        };
        Ok(())
    }

    fn init(&mut self) -> ControllerResult<()> {
        self.solver = Solver::NotReady;
        self.config.validate()?;
        self.configure_joint_names()?;
        self.configure_solver()?;
        self.zero_all_values();
        Ok(())
    }

    fn position_interface_name(joint_name: &str) -> String {
        format!("{}/{}", joint_name, HW_IF_POSITION)
    }

    fn auxiliary_interface_name(interface_name: &str) -> String {
        format!("{}/{}", HW_IF_AUXILIARY_PREFIX, interface_name)
    }

    fn reference_interfaces(
        &mut self,
        state_interfaces: &[StateInterface],
        command_interfaces: &[CommandInterface],
    ) -> ControllerResult<InterfaceIndices> {
        if let Solver::NotReady = self.solver {
            return Err(create_configuration_exception(
                "Admittance controller is not initialized.",
            ));
        }
        let sensor = self.estimated_ft_sensor.as_mut().ok_or_else(|| {
            create_configuration_exception("Estimated force torque sensor is not configured.")
        })?;
        if !sensor.assign_loaned_state_interfaces(state_interfaces) {
            return Err(create_configuration_exception(
                "Failed to assign estimated force torque state interfaces.",
            ));
        }

        let joint_positions: Vec<usize> = self
            .joint_names
            .iter()
            .filter_map(|name| {
                find_interface(state_interfaces, &Self::position_interface_name(name))
            })
            .collect();
        if joint_positions.len() != N_JNTS {
            return Err(create_configuration_exception(format!(
                "Number of joint position state interfaces '{}' does not match the number of \
                 joints in the robot '{}'.",
                joint_positions.len(),
                N_JNTS
            )));
        }
        let joint_position_commands: Vec<usize> = self
            .joint_names
            .iter()
            .filter_map(|name| {
                find_interface(command_interfaces, &Self::position_interface_name(name))
            })
            .collect();
        if joint_position_commands.len() != N_JNTS {
            return Err(create_configuration_exception(format!(
                "Number of joint position command interfaces '{}' does not match the number \
                 of joints in the robot '{}'.",
                joint_position_commands.len(),
                N_JNTS
            )));
        }
        let auxiliary = |interface_name: &str| {
            let name = Self::auxiliary_interface_name(interface_name);
            find_interface(state_interfaces, &name).ok_or_else(|| {
                create_configuration_exception(format!("State interface '{}' not found.", name))
            })
        };
        let sample_time = auxiliary(HW_IF_SAMPLE_TIME)?;
        let session_state = auxiliary(HW_IF_SESSION_STATE)?;

        let mut indices = InterfaceIndices {
            joint_positions: [0; N_JNTS],
            sample_time,
            session_state,
            joint_position_commands: [0; N_JNTS],
        };
        indices.joint_positions.copy_from_slice(&joint_positions);
        indices
            .joint_position_commands
            .copy_from_slice(&joint_position_commands);
        Ok(indices)
    }

    fn clear_interfaces(&mut self) {
        self.interfaces = None;
        if let Some(sensor) = self.estimated_ft_sensor.as_mut() {
            sensor.release_interfaces();
        }
    }

    fn zero_all_values(&mut self) {
        self.f_ext.fill(0.);
        self.pose = Isometry3::identity();
        self.displacement.fill(0.);
        self.dx.fill(0.);
        self.ddx.fill(0.);
        self.twist_command.fill(0.);
        self.dq.fill(0.);
    }

    fn cycle(
        &mut self,
        state_interfaces: &[StateInterface],
        command_interfaces: &mut [CommandInterface],
        period: &Duration,
    ) -> ControllerResult<CycleOutcome> {
        let (admittance, inv_jac_ctrl) = match &self.solver {
            Solver::Ready {
                admittance,
                inv_jac_ctrl,
            } => (admittance, inv_jac_ctrl),
            Solver::NotReady => return Err(ControllerException::SolverNotReady),
        };
        let interfaces =
            self.interfaces
                .as_ref()
                .ok_or_else(|| ControllerException::InterfaceException {
                    message: "Admittance controller is not active.".to_string(),
                })?;
        let sensor = self.estimated_ft_sensor.as_ref().ok_or_else(|| {
            ControllerException::InterfaceException {
                message: "Estimated force torque sensor is not configured.".to_string(),
            }
        })?;

        self.f_ext = sensor.get_wrench(state_interfaces)?;
        for (q_i, &index) in self.q.iter_mut().zip(interfaces.joint_positions.iter()) {
            *q_i = read_interface(state_interfaces, index)?;
        }

        self.pose = inv_jac_ctrl.kinematics().forward_kinematics(&self.q);
        let (reference, previous) = match self.reference {
            Reference::Tracking {
                reference,
                previous,
            } => (reference, previous),
            Reference::Uninitialized => {
                debug!("Captured reference pose {}.", self.pose);
                (self.pose, self.pose)
            }
        };

        let period = period.as_secs_f64();
        if period > 0. {
            let dx = pose_error(&self.pose, &previous) / period;
            self.dx = if self.config.is_velocity_filtered() {
                cartesian_low_pass_filter(
                    period,
                    &dx,
                    &self.dx,
                    self.config.velocity_cutoff_frequency,
                )
            } else {
                dx
            };
        } else {
            self.dx.fill(0.);
        }

        self.displacement = pose_error(&self.pose, &reference);
        self.ddx = admittance.compute(&self.f_ext, &self.displacement, &self.dx);
        self.reference = Reference::Tracking {
            reference,
            previous: self.pose,
        };
        self.twist_command = self.ddx * period;

        let session_state =
            SessionState::decode(read_interface(state_interfaces, interfaces.session_state)?)?;
        if !session_state.is_commanding_active() {
            return Ok(CycleOutcome::Gated(session_state));
        }

        let sample_time = read_interface(state_interfaces, interfaces.sample_time)?;
        if let Some(&index) = interfaces
            .joint_position_commands
            .iter()
            .find(|&&index| index >= command_interfaces.len())
        {
            return Err(ControllerException::InterfaceException {
                message: format!(
                    "Command interface {} is not available in this cycle ({} interfaces).",
                    index,
                    command_interfaces.len()
                ),
            });
        }
        self.dq = inv_jac_ctrl.compute(&self.twist_command, &self.q)?;
        for ((&index, q_i), dq_i) in interfaces
            .joint_position_commands
            .iter()
            .zip(self.q.iter())
            .zip(self.dq.iter())
        {
            command_interfaces[index].set_value(q_i + dq_i * sample_time);
        }
        Ok(CycleOutcome::Commanded)
    }
}

impl ControllerInterface for AdmittanceController {
    fn command_interface_configuration(&self) -> InterfaceConfiguration {
        InterfaceConfiguration {
            names: self
                .joint_names
                .iter()
                .map(|name| Self::position_interface_name(name))
                .collect(),
        }
    }

    fn state_interface_configuration(&self) -> InterfaceConfiguration {
        let mut names: Vec<String> = self
            .joint_names
            .iter()
            .map(|name| Self::position_interface_name(name))
            .collect();
        if let Some(sensor) = self.estimated_ft_sensor.as_ref() {
            names.extend(sensor.get_state_interface_names().iter().cloned());
        }
        names.push(Self::auxiliary_interface_name(HW_IF_SAMPLE_TIME));
        names.push(Self::auxiliary_interface_name(HW_IF_SESSION_STATE));
        InterfaceConfiguration { names }
    }

    fn on_init(&mut self) -> ControllerResult<()> {
        self.init().map_err(|e| {
            error!("Failed to initialize admittance controller with: {}.", e);
            e
        })
    }

    fn on_configure(&mut self) -> ControllerResult<()> {
        self.estimated_ft_sensor = Some(ForceTorqueSensor::from_prefix(HW_IF_ESTIMATED_FT_PREFIX));
        debug!("Admittance controller configured.");
        Ok(())
    }

    fn on_activate(
        &mut self,
        state_interfaces: &[StateInterface],
        command_interfaces: &[CommandInterface],
    ) -> ControllerResult<()> {
        match self.reference_interfaces(state_interfaces, command_interfaces) {
            Ok(interfaces) => self.interfaces = Some(interfaces),
            Err(e) => {
                error!("Failed to activate admittance controller: {}", e);
                self.clear_interfaces();
                return Err(e);
            }
        }
        self.reference = Reference::Uninitialized;
        self.zero_all_values();
        debug!("Admittance controller activated.");
        Ok(())
    }

    fn on_deactivate(&mut self) -> ControllerResult<()> {
        self.clear_interfaces();
        self.reference = Reference::Uninitialized;
        debug!("Admittance controller deactivated.");
        Ok(())
    }

    fn update(
        &mut self,
        state_interfaces: &[StateInterface],
        command_interfaces: &mut [CommandInterface],
        period: &Duration,
    ) -> ControllerResult<CycleOutcome> {
        self.cycle(state_interfaces, command_interfaces, period)
            .map_err(|e| {
                error!("Admittance controller update failed: {}", e);
                e
            })
    }
}
