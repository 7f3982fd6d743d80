// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the serial kinematic chain between two links of a robot description.
use std::fmt::{Debug, Formatter};

use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};

use crate::exception::{create_configuration_exception, ControllerResult};
use crate::model::robot_description::RobotDescription;
use crate::model::Kinematics;
use crate::utils::{Jacobian, JointVector, N_JNTS};

/// Serial chain of joints from a root link to a tip link, evaluated with `k`.
///
/// `k` resolves the chain from the root of the URDF tree down to the tip. The root link of
/// the controller may sit below the URDF root as long as only fixed joints lead to it.
pub struct KinematicChain {
    root: String,
    tip: String,
    arm: k::SerialChain<f64>,
    /// position of the root link's node within `arm`
    root_index: usize,
}

impl KinematicChain {
    /// Resolves the chain from `root` to `tip`.
    /// # Errors
    /// * ConfigurationException if one of the links is unknown, the tip is not a descendant
    /// of the root, a movable joint lies above the root or the chain does not have exactly
    /// [`N_JNTS`](`crate::utils::N_JNTS`) movable joints.
    pub fn from_description(
        description: &RobotDescription,
        root: &str,
        tip: &str,
    ) -> ControllerResult<Self> {
        let tree = k::Chain::<f64>::from(description.robot());
        let find_link = |link: &str| {
            tree.find_link(link).ok_or_else(|| {
                create_configuration_exception(format!(
                    "Link '{}' not found in robot description '{}'.",
                    link,
                    description.name()
                ))
            })
        };
        let root_joint = find_link(root)?.joint().name.clone();
        let arm = k::SerialChain::from_end(find_link(tip)?);

        let root_index = arm
            .iter()
            .position(|node| node.joint().name == root_joint)
            .ok_or_else(|| {
                create_configuration_exception(format!(
                    "Chain tip '{}' is not a descendant of chain root '{}'.",
                    tip, root
                ))
            })?;
        if arm
            .iter()
            .take(root_index + 1)
            .any(|node| node.joint().is_movable())
        {
            return Err(create_configuration_exception(format!(
                "Chain root '{}' is moved by a joint of robot description '{}'.",
                root,
                description.name()
            )));
        }
        if arm.dof() != N_JNTS {
            return Err(create_configuration_exception(format!(
                "Chain from '{}' to '{}' has {} joints but the robot has {}.",
                root,
                tip,
                arm.dof(),
                N_JNTS
            )));
        }
        Ok(KinematicChain {
            root: root.to_string(),
            tip: tip.to_string(),
            arm,
            root_index,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn tip(&self) -> &str {
        &self.tip
    }

    /// Sets `q` and returns the poses of the root and the tip in the URDF root frame.
    fn update(&self, q: &JointVector) -> (Isometry3<f64>, Isometry3<f64>) {
        self.arm.set_joint_positions_unchecked(q.as_slice());
        let transforms = self.arm.update_transforms();
        let root = transforms
            .get(self.root_index)
            .map(to_isometry)
            .unwrap_or_else(Isometry3::identity);
        let tip = transforms
            .last()
            .map(to_isometry)
            .unwrap_or_else(Isometry3::identity);
        (root, tip)
    }
}

// k brings its own nalgebra
fn to_isometry(transform: &k::nalgebra::Isometry3<f64>) -> Isometry3<f64> {
    let t = &transform.translation;
    let r = &transform.rotation;
    Isometry3::from_parts(
        Translation3::new(t.x, t.y, t.z),
        UnitQuaternion::new_unchecked(Quaternion::new(r.w, r.i, r.j, r.k)),
    )
}

impl Debug for KinematicChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KinematicChain")
            .field("root", &self.root)
            .field("tip", &self.tip)
            .field("dof", &self.arm.dof())
            .finish()
    }
}

impl Kinematics for KinematicChain {
    fn forward_kinematics(&self, q: &JointVector) -> Isometry3<f64> {
        let (root, tip) = self.update(q);
        root.inverse() * tip
    }

    fn jacobian(&self, q: &JointVector) -> Jacobian {
        let (root, _) = self.update(q);
        let jacobian = k::jacobian(&self.arm);
        let mut rotated = Jacobian::from_fn(|row, column| jacobian[(row, column)]);
        let rotation = *root.rotation.inverse().to_rotation_matrix().matrix();
        let linear = rotation * rotated.fixed_rows::<3>(0);
        let angular = rotation * rotated.fixed_rows::<3>(3);
        rotated.fixed_rows_mut::<3>(0).copy_from(&linear);
        rotated.fixed_rows_mut::<3>(3).copy_from(&angular);
        rotated
    }
}
