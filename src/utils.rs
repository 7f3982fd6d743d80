// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! contains useful type definitions and conversion functions.
use nalgebra::{Isometry3, SMatrix, SVector, Vector6};

/// Number of joints of the LBR.
pub const N_JNTS: usize = 7;
/// Number of Cartesian degrees of freedom (3 translational + 3 rotational).
pub const CARTESIAN_DOF: usize = 6;

/// A Vector with 7 entries
pub type Vector7 = SVector<f64, N_JNTS>;
/// Joint positions or joint velocities of the robot.
pub type JointVector = Vector7;
/// Cartesian displacement, velocity, acceleration, wrench or twist.
pub type CartesianVector = Vector6<f64>;
/// A Matrix with 6 rows and 7 columns
pub type Matrix6x7 = SMatrix<f64, CARTESIAN_DOF, N_JNTS>;
/// Maps joint velocities to a Cartesian twist.
pub type Jacobian = Matrix6x7;

/// Error of `pose` with respect to `reference`, expressed in the frame of `pose`.
///
/// The first three entries are the translation from `reference` to `pose` rotated into the
/// `pose` frame, the last three the rotation vector of `reference⁻¹ · pose`. This is the
/// same frame the tip twist is commanded in, so `-error` always points back to `reference`.
pub fn pose_error(pose: &Isometry3<f64>, reference: &Isometry3<f64>) -> CartesianVector {
    let translation = pose
        .rotation
        .inverse_transform_vector(&(pose.translation.vector - reference.translation.vector));
    let rotation = (reference.rotation.inverse() * pose.rotation).scaled_axis();
    CartesianVector::new(
        translation.x,
        translation.y,
        translation.z,
        rotation.x,
        rotation.y,
        rotation.z,
    )
}
