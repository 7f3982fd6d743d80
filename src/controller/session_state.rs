// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the session state of the FRI connection.
use std::fmt::{Display, Formatter, Result};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::exception::{ControllerException, ControllerResult};

/// State of the FRI session as published on the `session_state` state interface.
#[derive(Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
#[derive(FromPrimitive, ToPrimitive)]
pub enum SessionState {
    /// No connection to the robot controller.
    Idle = 0,
    /// Connected, waiting for sufficient connection quality.
    MonitoringWait = 1,
    /// Connected with sufficient connection quality, robot is not commanded.
    MonitoringReady = 2,
    /// Commanding was requested, waiting for the robot controller to hand over.
    CommandingWait = 3,
    /// Commands are accepted by the robot.
    CommandingActive = 4,
}

impl SessionState {
    /// Decodes the raw value of the session state interface.
    /// # Errors
    /// * InvalidSessionState if the value is not finite, not integral or does not encode a
    /// session state.
    pub fn decode(value: f64) -> ControllerResult<Self> {
        if !value.is_finite() || value.fract() != 0. {
            return Err(ControllerException::InvalidSessionState { value });
        }
        SessionState::from_f64(value).ok_or(ControllerException::InvalidSessionState { value })
    }

    /// Only an active commanding session accepts commands.
    pub fn is_commanding_active(&self) -> bool {
        *self == SessionState::CommandingActive
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::session_state::SessionState;
    use crate::exception::ControllerException;

    #[test]
    fn decode_test() {
        assert_eq!(SessionState::decode(0.).unwrap(), SessionState::Idle);
        assert_eq!(SessionState::decode(1.).unwrap(), SessionState::MonitoringWait);
        assert_eq!(SessionState::decode(2.).unwrap(), SessionState::MonitoringReady);
        assert_eq!(SessionState::decode(3.).unwrap(), SessionState::CommandingWait);
        assert_eq!(
            SessionState::decode(4.).unwrap(),
            SessionState::CommandingActive
        );
        assert!(SessionState::decode(4.).unwrap().is_commanding_active());
        assert!(!SessionState::decode(2.).unwrap().is_commanding_active());
    }

    #[test]
    fn decode_invalid_test() {
        for &value in [5., -1., 3.5, f64::NAN, f64::INFINITY].iter() {
            assert!(matches!(
                SessionState::decode(value),
                Err(ControllerException::InvalidSessionState { .. })
            ));
        }
    }
}
