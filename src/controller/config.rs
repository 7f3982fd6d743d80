// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the parameters of the admittance controller.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::controller::admittance::AdmittanceParameters;
use crate::controller::inv_jac_ctrl::InvJacCtrlParameters;
use crate::controller::low_pass_filter::{is_valid_cutoff_frequency, MAX_CUTOFF_FREQUENCY};
use crate::exception::{create_configuration_exception, ControllerException, ControllerResult};
use crate::utils::N_JNTS;

/// Parameters of the [`AdmittanceController`](`crate::AdmittanceController`).
///
/// Every field has a default, so a parameter file only has to contain the values which
/// differ:
/// ```
/// # use admittance::AdmittanceControllerConfig;
/// let config = AdmittanceControllerConfig::from_json_str(
///     r#"{"admittance": {"mass": 2.0}, "inv_jac_ctrl": {"max_linear_velocity": 0.05}}"#,
/// ).unwrap();
/// assert_eq!(config.admittance.mass, 2.0);
/// assert_eq!(config.admittance.damping, 0.1);
/// assert_eq!(config.inv_jac_ctrl.chain_tip, "lbr_link_ee");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AdmittanceControllerConfig {
    /// Prefix of the generated joint names `<robot_name>_A1` .. `<robot_name>_A7`.
    pub robot_name: String,
    /// Explicit joint names. If empty the names are generated from `robot_name`.
    pub joint_names: Vec<String>,
    pub admittance: AdmittanceParameters,
    pub inv_jac_ctrl: InvJacCtrlParameters,
    /// Cutoff frequency of the low-pass filter on the Cartesian velocity estimate.
    /// [`MAX_CUTOFF_FREQUENCY`](`MAX_CUTOFF_FREQUENCY`) disables the filter,
    /// [`DEFAULT_CUTOFF_FREQUENCY`](`crate::DEFAULT_CUTOFF_FREQUENCY`) is a reasonable value
    /// to enable it with.
    pub velocity_cutoff_frequency: f64,
}

impl Default for AdmittanceControllerConfig {
    fn default() -> Self {
        AdmittanceControllerConfig {
            robot_name: "lbr".to_string(),
            joint_names: Vec::new(),
            admittance: AdmittanceParameters::default(),
            inv_jac_ctrl: InvJacCtrlParameters::default(),
            velocity_cutoff_frequency: MAX_CUTOFF_FREQUENCY,
        }
    }
}

impl AdmittanceControllerConfig {
    /// Parses the parameters from a JSON string.
    /// # Errors
    /// * ParameterException if the string cannot be parsed
    pub fn from_json_str(json: &str) -> ControllerResult<Self> {
        serde_json::from_str(json).map_err(|e| ControllerException::ParameterException {
            message: format!("Failed to parse admittance controller parameters: {}", e),
        })
    }

    /// Reads the parameters from a JSON file.
    /// # Errors
    /// * ParameterException if the file cannot be read or parsed
    pub fn from_json_file<S: AsRef<Path>>(path: S) -> ControllerResult<Self> {
        let json = fs::read_to_string(path.as_ref()).map_err(|e| {
            ControllerException::ParameterException {
                message: format!(
                    "Failed to read parameter file {}: {}",
                    path.as_ref().display(),
                    e
                ),
            }
        })?;
        AdmittanceControllerConfig::from_json_str(&json)
    }

    /// Names of the joints in the order of the kinematic chain.
    /// # Errors
    /// * ConfigurationException if explicit joint names are given and their number does not
    /// match the number of joints of the robot.
    pub fn joint_names(&self) -> ControllerResult<Vec<String>> {
        if self.joint_names.is_empty() {
            return Ok((1..=N_JNTS)
                .map(|i| format!("{}_A{}", self.robot_name, i))
                .collect());
        }
        if self.joint_names.len() != N_JNTS {
            return Err(create_configuration_exception(format!(
                "Number of joint names ({}) does not match the number of joints in the robot ({}).",
                self.joint_names.len(),
                N_JNTS
            )));
        }
        Ok(self.joint_names.clone())
    }

    /// Whether the Cartesian velocity estimate is low-pass filtered.
    pub fn is_velocity_filtered(&self) -> bool {
        self.velocity_cutoff_frequency < MAX_CUTOFF_FREQUENCY
    }

    /// Checks all parameters.
    /// # Errors
    /// * ConfigurationException if any parameter is invalid.
    pub fn validate(&self) -> ControllerResult<()> {
        self.joint_names()?;
        self.admittance.validate()?;
        self.inv_jac_ctrl.validate()?;
        if !is_valid_cutoff_frequency(self.velocity_cutoff_frequency) {
            return Err(create_configuration_exception(format!(
                "Velocity cutoff frequency must be in (0, {}], got {}.",
                MAX_CUTOFF_FREQUENCY, self.velocity_cutoff_frequency
            )));
        }
        Ok(())
    }
}
