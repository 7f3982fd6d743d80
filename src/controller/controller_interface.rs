// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the lifecycle interface through which a host drives a controller.
use std::time::Duration;

use crate::controller::interfaces::{CommandInterface, InterfaceConfiguration, StateInterface};
use crate::controller::session_state::SessionState;
use crate::exception::ControllerResult;

/// Result of a successful control cycle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Commands were written to the command interfaces.
    Commanded,
    /// The session does not accept commands, the command interfaces were left untouched.
    Gated(SessionState),
}

/// Lifecycle of a controller. The host calls
/// [`on_init`](`ControllerInterface::on_init`) and
/// [`on_configure`](`ControllerInterface::on_configure`) once, then alternates between
/// [`on_activate`](`ControllerInterface::on_activate`), periodic
/// [`update`](`ControllerInterface::update`) calls and
/// [`on_deactivate`](`ControllerInterface::on_deactivate`).
///
/// Interfaces are only lent to the controller for the duration of a single call. A
/// controller may remember where an interface is located, never the interface itself.
pub trait ControllerInterface {
    /// Full names of the command interfaces the controller writes.
    fn command_interface_configuration(&self) -> InterfaceConfiguration;

    /// Full names of the state interfaces the controller reads.
    fn state_interface_configuration(&self) -> InterfaceConfiguration;

    /// Validates the parameters and constructs everything the controller needs.
    /// # Errors
    /// * ConfigurationException, the controller must not be activated afterwards.
    fn on_init(&mut self) -> ControllerResult<()>;

    /// Constructs the sensor components.
    fn on_configure(&mut self) -> ControllerResult<()>;

    /// Binds the interfaces and resets the controller state.
    /// # Errors
    /// * ConfigurationException if required interfaces are missing.
    fn on_activate(
        &mut self,
        state_interfaces: &[StateInterface],
        command_interfaces: &[CommandInterface],
    ) -> ControllerResult<()>;

    /// Releases the interface bindings and resets the controller state.
    fn on_deactivate(&mut self) -> ControllerResult<()>;

    /// Runs one control cycle.
    /// # Arguments
    /// * `state_interfaces` - State of the robot in this cycle.
    /// * `command_interfaces` - Commands for this cycle.
    /// * `period` - Time passed since the previous cycle.
    fn update(
        &mut self,
        state_interfaces: &[StateInterface],
        command_interfaces: &mut [CommandInterface],
        period: &Duration,
    ) -> ControllerResult<CycleOutcome>;
}
