// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains exception and Result definitions
use thiserror::Error;

/// Represents all kind of errors which can occur while configuring or running the
/// admittance controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerException {
    /// ConfigurationException is returned if the controller cannot be brought into a
    /// state where it is allowed to activate: DOF mismatch, an unresolvable kinematic chain,
    /// an invalid parameter or interfaces which cannot be bound.
    #[error("{message}")]
    ConfigurationException { message: String },

    /// SolverNotReady is returned by update if the inverse Jacobian controller was never
    /// constructed.
    #[error("Inverse Jacobian controller not initialized.")]
    SolverNotReady,

    /// InvalidSessionState is returned if the raw session state signal does not encode a
    /// known session state.
    #[error("Received invalid session state value {value}")]
    InvalidSessionState { value: f64 },

    /// InterfaceException is returned if a bound interface is missing from the interfaces
    /// handed over for the current cycle.
    #[error("{message}")]
    InterfaceException { message: String },

    /// SingularJacobian is returned if the damped normal matrix of the Jacobian cannot be
    /// factorized. Only possible for a damping factor of zero.
    #[error("Jacobian is singular and the damping factor does not regularize it")]
    SingularJacobian,

    /// RealTimeException is returned if the real-time priority cannot be set
    #[error("{message}")]
    RealTimeException { message: String },

    /// ParameterException is returned if a parameter file cannot be read or parsed.
    #[error("{message}")]
    ParameterException { message: String },
}

/// creates a ConfigurationException from anything that converts into a String
pub(crate) fn create_configuration_exception<S: Into<String>>(message: S) -> ControllerException {
    ControllerException::ConfigurationException {
        message: message.into(),
    }
}

/// Result type which can have ControllerException as Error
pub type ControllerResult<T> = Result<T, ControllerException>;
