// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the inverse Jacobian controller which turns a Cartesian twist into joint
//! velocities using damped least squares.
use nalgebra::Matrix6;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::exception::{create_configuration_exception, ControllerException, ControllerResult};
use crate::model::{KinematicChain, Kinematics, RobotDescription};
use crate::utils::{CartesianVector, Jacobian, JointVector};

/// Parameters of the [`InverseJacobianController`](`InverseJacobianController`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InvJacCtrlParameters {
    /// Root link of the kinematic chain.
    pub chain_root: String,
    /// Tip link of the kinematic chain.
    pub chain_tip: String,
    /// If set, twists are expressed in the tip frame instead of the root frame.
    pub twist_in_tip_frame: bool,
    /// Damping factor λ of the damped least squares pseudo-inverse.
    pub damping: f64,
    /// Maximum norm of the commanded linear velocity in \[m/s\].
    pub max_linear_velocity: f64,
    /// Maximum norm of the commanded angular velocity in \[rad/s\].
    pub max_angular_velocity: f64,
}

impl Default for InvJacCtrlParameters {
    fn default() -> Self {
        InvJacCtrlParameters {
            chain_root: "lbr_link_0".to_string(),
            chain_tip: "lbr_link_ee".to_string(),
            twist_in_tip_frame: true,
            damping: 0.2,
            max_linear_velocity: 0.1,
            max_angular_velocity: 0.1,
        }
    }
}

impl InvJacCtrlParameters {
    /// # Errors
    /// * ConfigurationException if the damping is negative or a velocity limit is not
    /// strictly positive.
    pub fn validate(&self) -> ControllerResult<()> {
        if !(self.damping.is_finite() && self.damping >= 0.) {
            return Err(create_configuration_exception(format!(
                "Inverse Jacobian damping must be non-negative and finite, got {}.",
                self.damping
            )));
        }
        if !(self.max_linear_velocity > 0.) {
            return Err(create_configuration_exception(format!(
                "Maximum linear velocity must be positive, got {}.",
                self.max_linear_velocity
            )));
        }
        if !(self.max_angular_velocity > 0.) {
            return Err(create_configuration_exception(format!(
                "Maximum angular velocity must be positive, got {}.",
                self.max_angular_velocity
            )));
        }
        Ok(())
    }
}

/// Solves `dq = Jᵗ (J Jᵗ + λ² I)⁻¹ twist`.
///
/// The solution stays bounded for any λ > 0, even for a rank deficient Jacobian.
/// # Errors
/// * SingularJacobian if `J Jᵗ + λ² I` is not positive definite, which can only happen for
/// λ = 0.
pub fn damped_least_squares(
    jacobian: &Jacobian,
    twist: &CartesianVector,
    damping: f64,
) -> ControllerResult<JointVector> {
    let normal = jacobian * jacobian.transpose() + Matrix6::identity() * damping.powi(2);
    let cholesky = normal
        .cholesky()
        .ok_or(ControllerException::SingularJacobian)?;
    Ok(jacobian.transpose() * cholesky.solve(twist))
}

/// Scales the linear and the angular part of a twist independently so that their norms do
/// not exceed the given limits. The direction of each part is preserved.
pub fn clamp_twist(
    twist: &CartesianVector,
    max_linear_velocity: f64,
    max_angular_velocity: f64,
) -> CartesianVector {
    let mut clamped = *twist;
    let linear_norm = twist.fixed_rows::<3>(0).norm();
    if linear_norm > max_linear_velocity {
        clamped
            .fixed_rows_mut::<3>(0)
            .scale_mut(max_linear_velocity / linear_norm);
    }
    let angular_norm = twist.fixed_rows::<3>(3).norm();
    if angular_norm > max_angular_velocity {
        clamped
            .fixed_rows_mut::<3>(3)
            .scale_mut(max_angular_velocity / angular_norm);
    }
    clamped
}

/// Computes joint velocities which realize a Cartesian twist of the chain tip.
///
/// The twist is clamped to the configured velocity limits before it is inverted.
#[derive(Debug)]
pub struct InverseJacobianController<K: Kinematics = KinematicChain> {
    parameters: InvJacCtrlParameters,
    kinematics: K,
}

impl InverseJacobianController<KinematicChain> {
    /// Resolves the chain from `chain_root` to `chain_tip` in the robot description and
    /// creates the controller on top of it.
    /// # Errors
    /// * ConfigurationException if the parameters are invalid or the chain cannot be
    /// resolved.
    pub fn from_description(
        description: &RobotDescription,
        parameters: InvJacCtrlParameters,
    ) -> ControllerResult<Self> {
        let chain = KinematicChain::from_description(
            description,
            &parameters.chain_root,
            &parameters.chain_tip,
        )?;
        InverseJacobianController::new(parameters, chain)
    }
}

impl<K: Kinematics> InverseJacobianController<K> {
    /// # Errors
    /// * ConfigurationException if the parameters are invalid.
    pub fn new(parameters: InvJacCtrlParameters, kinematics: K) -> ControllerResult<Self> {
        parameters.validate()?;
        info!(
            chain_root = parameters.chain_root.as_str(),
            chain_tip = parameters.chain_tip.as_str(),
            damping = parameters.damping,
            max_linear_velocity = parameters.max_linear_velocity,
            max_angular_velocity = parameters.max_angular_velocity,
            "Inverse Jacobian controller initialized."
        );
        Ok(InverseJacobianController {
            parameters,
            kinematics,
        })
    }

    pub fn parameters(&self) -> &InvJacCtrlParameters {
        &self.parameters
    }

    pub fn kinematics(&self) -> &K {
        &self.kinematics
    }

    /// Jacobian at `q` in the frame the twist is expressed in.
    pub fn jacobian(&self, q: &JointVector) -> Jacobian {
        let mut jacobian = self.kinematics.jacobian(q);
        if self.parameters.twist_in_tip_frame {
            let rotation = self
                .kinematics
                .forward_kinematics(q)
                .rotation
                .to_rotation_matrix()
                .matrix()
                .transpose();
            let linear = rotation * jacobian.fixed_rows::<3>(0);
            let angular = rotation * jacobian.fixed_rows::<3>(3);
            jacobian.fixed_rows_mut::<3>(0).copy_from(&linear);
            jacobian.fixed_rows_mut::<3>(3).copy_from(&angular);
        }
        jacobian
    }

    /// Computes the joint velocity for a twist target.
    /// # Arguments
    /// * `twist_target` - Desired twist of the chain tip.
    /// * `q` - Current joint position.
    /// # Errors
    /// * SingularJacobian, see [`damped_least_squares`](`damped_least_squares`).
    pub fn compute(
        &self,
        twist_target: &CartesianVector,
        q: &JointVector,
    ) -> ControllerResult<JointVector> {
        let twist = clamp_twist(
            twist_target,
            self.parameters.max_linear_velocity,
            self.parameters.max_angular_velocity,
        );
        damped_least_squares(&self.jacobian(q), &twist, self.parameters.damping)
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{Isometry3, Vector3, Vector6};
    use std::f64::consts::PI;

    use crate::controller::inv_jac_ctrl::{
        clamp_twist, damped_least_squares, InvJacCtrlParameters, InverseJacobianController,
    };
    use crate::exception::ControllerException;
    use crate::model::{Kinematics, MockKinematics, RobotDescription};
    use crate::utils::{CartesianVector, Jacobian, JointVector};

    fn parameters(damping: f64) -> InvJacCtrlParameters {
        InvJacCtrlParameters {
            twist_in_tip_frame: false,
            damping,
            max_linear_velocity: 10.,
            max_angular_velocity: 10.,
            ..Default::default()
        }
    }

    fn lbr_controller(damping: f64) -> InverseJacobianController {
        InverseJacobianController::from_description(
            &RobotDescription::lbr_iiwa7("lbr").unwrap(),
            parameters(damping),
        )
        .unwrap()
    }

    fn non_singular_q() -> JointVector {
        JointVector::from_column_slice(&[0.1, 0.6, -0.2, -1.3, 0.3, 0.8, 0.2])
    }

    #[test]
    fn residual_shrinks_with_damping_test() {
        let q = non_singular_q();
        let twist = CartesianVector::new(0.05, -0.02, 0.03, 0.1, -0.05, 0.02);
        let mut last_residual = f64::INFINITY;
        for &damping in [0.5, 0.2, 0.05, 0.01, 0.001].iter() {
            let controller = lbr_controller(damping);
            let dq = controller.compute(&twist, &q).unwrap();
            let residual = (controller.jacobian(&q) * dq - twist).norm();
            assert!(residual < last_residual);
            last_residual = residual;
        }
        assert!(last_residual < 1e-3);
    }

    #[test]
    fn round_trip_test() {
        let q = non_singular_q();
        let controller = lbr_controller(1e-4);
        let jacobian = controller.jacobian(&q);
        // joint velocities in the row space of J are recovered exactly by the pseudo-inverse
        let dq = jacobian.transpose() * Vector6::new(0.1, 0.05, -0.08, 0.02, 0.04, -0.03);
        let twist = jacobian * dq;
        let solved = controller.compute(&twist, &q).unwrap();
        assert!((solved - dq).norm() < 1e-5 * (1. + dq.norm()));

        let attenuated = lbr_controller(0.5).compute(&twist, &q).unwrap();
        assert!(attenuated.norm() < dq.norm());
    }

    #[test]
    fn singular_jacobian_bounded_test() {
        let mut jacobian = Jacobian::zeros();
        jacobian[(0, 0)] = 1.;
        jacobian[(1, 0)] = 1.;
        let twist = CartesianVector::new(1., -1., 1., 1., 1., 1.);
        for &damping in [1., 0.1, 0.01, 1e-4].iter() {
            let dq = damped_least_squares(&jacobian, &twist, damping).unwrap();
            assert!(dq.iter().all(|x| x.is_finite()));
            assert!(dq.norm() <= twist.norm() / (2. * damping) + 1e-9);
        }
    }

    #[test]
    fn singular_jacobian_without_damping_test() {
        let jacobian = Jacobian::zeros();
        let result = damped_least_squares(&jacobian, &CartesianVector::zeros(), 0.);
        assert_eq!(result, Err(ControllerException::SingularJacobian));
    }

    #[test]
    fn clamp_twist_test() {
        let twist = CartesianVector::new(0.3, 0.4, 0., 0., 0., 0.05);
        let clamped = clamp_twist(&twist, 0.1, 0.1);
        assert!(f64::abs(clamped.fixed_rows::<3>(0).norm() - 0.1) < 1e-12);
        assert!(f64::abs(clamped[0] / clamped[1] - 0.75) < 1e-12);
        assert!(f64::abs(clamped[5] - 0.05) < 1e-12);

        let twist = CartesianVector::new(0.01, 0., 0., 0., -2., 0.);
        let clamped = clamp_twist(&twist, 0.1, 0.5);
        assert!(f64::abs(clamped[0] - 0.01) < 1e-12);
        assert!(f64::abs(clamped[4] + 0.5) < 1e-12);
    }

    #[test]
    fn compute_clamps_before_solving_test() {
        let mut kinematics = MockKinematics::new();
        let mut jacobian = Jacobian::zeros();
        for i in 0..6 {
            jacobian[(i, i)] = 1.;
        }
        kinematics.expect_jacobian().return_const(jacobian);
        let controller = InverseJacobianController::new(
            InvJacCtrlParameters {
                twist_in_tip_frame: false,
                damping: 0.,
                max_linear_velocity: 0.1,
                max_angular_velocity: 0.2,
                ..Default::default()
            },
            kinematics,
        )
        .unwrap();
        let twist = CartesianVector::new(1., 0., 0., 0., 0., -1.);
        let dq = controller.compute(&twist, &JointVector::zeros()).unwrap();
        assert!(f64::abs(dq[0] - 0.1) < 1e-12);
        assert!(f64::abs(dq[5] + 0.2) < 1e-12);
        assert!(f64::abs(dq[6]) < 1e-12);
    }

    #[test]
    fn twist_in_tip_frame_test() {
        let mut kinematics = MockKinematics::new();
        let mut jacobian = Jacobian::zeros();
        for i in 0..6 {
            jacobian[(i, i)] = 1.;
        }
        kinematics.expect_jacobian().return_const(jacobian);
        kinematics
            .expect_forward_kinematics()
            .return_const(Isometry3::new(Vector3::zeros(), Vector3::z() * PI / 2.));
        let controller = InverseJacobianController::new(
            InvJacCtrlParameters {
                twist_in_tip_frame: true,
                damping: 0.,
                max_linear_velocity: 1.,
                max_angular_velocity: 1.,
                ..Default::default()
            },
            kinematics,
        )
        .unwrap();
        // tip x axis points along root y
        let twist = CartesianVector::new(0.1, 0., 0., 0., 0., 0.);
        let dq = controller.compute(&twist, &JointVector::zeros()).unwrap();
        assert!(f64::abs(dq[0]) < 1e-12);
        assert!(f64::abs(dq[1] - 0.1) < 1e-12);
        assert!(controller.kinematics().jacobian(&JointVector::zeros()) == jacobian);
    }

    #[test]
    fn invalid_parameters_test() {
        let description = RobotDescription::lbr_iiwa7("lbr").unwrap();
        for parameters in [
            InvJacCtrlParameters {
                damping: -0.1,
                ..Default::default()
            },
            InvJacCtrlParameters {
                max_linear_velocity: 0.,
                ..Default::default()
            },
            InvJacCtrlParameters {
                max_angular_velocity: f64::NAN,
                ..Default::default()
            },
            InvJacCtrlParameters {
                chain_tip: "lbr_link_9".to_string(),
                ..Default::default()
            },
        ]
        .iter()
        {
            assert!(matches!(
                InverseJacobianController::from_description(&description, parameters.clone()),
                Err(ControllerException::ConfigurationException { .. })
            ));
        }
    }
}
