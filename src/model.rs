// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the robot description and the kinematics used by the controller.
#[cfg(test)]
use mockall::automock;
use nalgebra::Isometry3;

use crate::utils::{Jacobian, JointVector};

pub mod kinematic_chain;
pub mod robot_description;

pub use kinematic_chain::KinematicChain;
pub use robot_description::{lbr_iiwa7_urdf, RobotDescription};

/// Evaluates forward kinematics and the Jacobian of a kinematic chain.
///
/// This is the only view the controllers have on the kinematics of the robot.
#[cfg_attr(test, automock)]
pub trait Kinematics {
    /// Pose of the chain tip in the chain root frame.
    /// # Arguments
    /// * `q` - Joint position.
    fn forward_kinematics(&self, q: &JointVector) -> Isometry3<f64>;

    /// Geometric 6x7 Jacobian with the reference point at the chain tip, expressed in the
    /// chain root frame. The first three rows map to linear velocity, the last three to
    /// angular velocity.
    /// # Arguments
    /// * `q` - Joint position.
    fn jacobian(&self, q: &JointVector) -> Jacobian;
}
