// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! # lbr-admittance
//! lbr-admittance makes a KUKA LBR compliant to external forces. The estimated external
//! wrench at the tip is fed through a virtual mass-spring-damper, and the resulting motion
//! is commanded as joint positions over FRI.
//!
//! **ALWAYS HAVE THE USER STOP BUTTON AT
//! HAND WHILE CONTROLLING THE ROBOT!**
//!
//! ## Design
//! The library is divided into two main Modules:
//! * [controller](`crate::controller`) - the admittance controller, its building blocks and
//! the lifecycle through which a host drives it.
//! * [model](`crate::model`) - the URDF robot description and the kinematic chain on top of
//! [k](https://docs.rs/k).
//!
//! Each control cycle runs through the following steps:
//! 1. read the estimated wrench and the joint positions,
//! 2. compute the tip pose with forward kinematics,
//! 3. estimate the Cartesian velocity in the tip frame by a backward difference to the
//! previous pose,
//! 4. compute the acceleration with the [`AdmittanceModel`](`AdmittanceModel`),
//! 5. integrate the acceleration over the period into a twist,
//! 6. if the FRI session is commanding, turn the twist into joint velocities with the
//! [`InverseJacobianController`](`InverseJacobianController`) and command
//! `q + dq * sample_time`.
//!
//! # Example:
//!```no_run
//! use std::time::Duration;
//! use admittance::{
//!     AdmittanceController, AdmittanceControllerConfig, ControlLoop, ControllerInterface,
//!     ControllerResult, HardwareInterface, RealtimeConfig, RobotDescription,
//! };
//! fn run(hardware: &mut impl HardwareInterface) -> ControllerResult<()> {
//!     let config = AdmittanceControllerConfig::from_json_file("admittance.json")?;
//!     let robot_description = RobotDescription::from_urdf_file("lbr_iiwa7.urdf")?;
//!     let mut controller =
//!         AdmittanceController::new(config).with_robot_description(robot_description);
//!     controller.on_init()?;
//!     controller.on_configure()?;
//!     let mut control_loop = ControlLoop::new(
//!         &mut controller,
//!         hardware,
//!         Duration::from_millis(5),
//!         RealtimeConfig::Enforce,
//!     )?;
//!     control_loop.run(10_000)?;
//!     Ok(())
//! }
//!```
pub mod controller;
pub mod exception;
pub mod model;
pub mod utils;

pub use controller::admittance::{AdmittanceModel, AdmittanceParameters};
pub use controller::admittance_controller::{AdmittanceController, Reference, Solver};
pub use controller::config::AdmittanceControllerConfig;
pub use controller::control_loop::{ControlLoop, HardwareInterface, LoopStatistics};
pub use controller::control_tools::RealtimeConfig;
pub use controller::controller_interface::{ControllerInterface, CycleOutcome};
pub use controller::interfaces::{
    CommandInterface, ForceTorqueSensor, Interface, InterfaceConfiguration, StateInterface,
};
pub use controller::inv_jac_ctrl::{InvJacCtrlParameters, InverseJacobianController};
pub use controller::low_pass_filter::{DEFAULT_CUTOFF_FREQUENCY, MAX_CUTOFF_FREQUENCY};
pub use controller::session_state::SessionState;
pub use exception::{ControllerException, ControllerResult};
pub use model::{KinematicChain, Kinematics, RobotDescription};
pub use utils::*;
