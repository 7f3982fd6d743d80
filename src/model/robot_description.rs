// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the URDF robot description the kinematic chain is built from.
use std::fmt::Write;
use std::path::Path;

use crate::exception::{ControllerException, ControllerResult};

/// Joint offsets of the LBR iiwa 7 R800 along z in the zero configuration, from link 0
/// to link 7.
static LBR_IIWA7_OFFSETS: [f64; 7] = [0.1575, 0.2025, 0.2045, 0.2155, 0.1845, 0.2155, 0.081];
static LBR_IIWA7_AXES: [&str; 7] = ["0 0 1", "0 1 0", "0 0 1", "0 -1 0", "0 0 1", "0 1 0", "0 0 1"];
static LBR_IIWA7_LIMITS: [f64; 7] = [2.967, 2.094, 2.967, 2.094, 2.967, 2.094, 3.054];
static LBR_IIWA7_FLANGE_OFFSET: f64 = 0.045;

/// A parsed URDF robot description.
#[derive(Debug, Clone)]
pub struct RobotDescription {
    robot: urdf_rs::Robot,
}

impl RobotDescription {
    /// Parses a URDF string.
    /// # Errors
    /// * ParameterException if the string is not a valid URDF
    pub fn from_urdf_str(urdf: &str) -> ControllerResult<Self> {
        let robot =
            urdf_rs::read_from_string(urdf).map_err(|e| ControllerException::ParameterException {
                message: format!("Failed to parse robot description: {}", e),
            })?;
        Ok(RobotDescription { robot })
    }

    /// Reads a URDF file.
    /// # Errors
    /// * ParameterException if the file cannot be read or is not a valid URDF
    pub fn from_urdf_file<S: AsRef<Path>>(path: S) -> ControllerResult<Self> {
        let robot = urdf_rs::read_file(path.as_ref()).map_err(|e| {
            ControllerException::ParameterException {
                message: format!(
                    "Failed to read robot description {}: {}",
                    path.as_ref().display(),
                    e
                ),
            }
        })?;
        Ok(RobotDescription { robot })
    }

    /// Simplified KUKA LBR iiwa 7 R800 without meshes and inertia.
    ///
    /// Links are named `<robot_name>_link_0` to `<robot_name>_link_7` and
    /// `<robot_name>_link_ee`, joints `<robot_name>_A1` to `<robot_name>_A7`.
    /// # Errors
    /// * ParameterException if `robot_name` cannot be used in a URDF
    pub fn lbr_iiwa7(robot_name: &str) -> ControllerResult<Self> {
        RobotDescription::from_urdf_str(&lbr_iiwa7_urdf(robot_name))
    }

    pub fn name(&self) -> &str {
        &self.robot.name
    }

    /// checks if a link with the given name is part of the description
    pub fn has_link(&self, link: &str) -> bool {
        self.robot.links.iter().any(|l| l.name == link)
    }

    pub(crate) fn robot(&self) -> &urdf_rs::Robot {
        &self.robot
    }
}

/// URDF of [`RobotDescription::lbr_iiwa7`](`RobotDescription::lbr_iiwa7`).
pub fn lbr_iiwa7_urdf(robot_name: &str) -> String {
    let mut urdf = format!("<robot name=\"{}\">\n", robot_name);
    for i in 0..=7 {
        let _ = writeln!(urdf, "  <link name=\"{}_link_{}\"/>", robot_name, i);
    }
    let _ = writeln!(urdf, "  <link name=\"{}_link_ee\"/>", robot_name);
    for (i, ((offset, axis), limit)) in LBR_IIWA7_OFFSETS
        .iter()
        .zip(LBR_IIWA7_AXES.iter())
        .zip(LBR_IIWA7_LIMITS.iter())
        .enumerate()
    {
        let _ = write!(
            urdf,
            concat!(
                "  <joint name=\"{name}_A{joint}\" type=\"revolute\">\n",
                "    <parent link=\"{name}_link_{parent}\"/>\n",
                "    <child link=\"{name}_link_{joint}\"/>\n",
                "    <origin xyz=\"0 0 {offset}\" rpy=\"0 0 0\"/>\n",
                "    <axis xyz=\"{axis}\"/>\n",
                "    <limit lower=\"-{limit}\" upper=\"{limit}\" effort=\"300\" velocity=\"10\"/>\n",
                "  </joint>\n"
            ),
            name = robot_name,
            joint = i + 1,
            parent = i,
            offset = offset,
            axis = axis,
            limit = limit,
        );
    }
    let _ = write!(
        urdf,
        concat!(
            "  <joint name=\"{name}_joint_ee\" type=\"fixed\">\n",
            "    <parent link=\"{name}_link_7\"/>\n",
            "    <child link=\"{name}_link_ee\"/>\n",
            "    <origin xyz=\"0 0 {offset}\" rpy=\"0 0 0\"/>\n",
            "  </joint>\n",
            "</robot>\n"
        ),
        name = robot_name,
        offset = LBR_IIWA7_FLANGE_OFFSET,
    );
    urdf
}
