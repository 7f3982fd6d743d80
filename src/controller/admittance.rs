// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the virtual mass-spring-damper model which turns an external wrench into a
//! Cartesian acceleration.
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::exception::{create_configuration_exception, ControllerResult};
use crate::utils::CartesianVector;

/// Virtual mechanical impedance of the admittance model.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default)]
pub struct AdmittanceParameters {
    /// Virtual mass. Must be strictly positive.
    pub mass: f64,
    /// Virtual damping.
    pub damping: f64,
    /// Virtual stiffness towards the reference pose.
    pub stiffness: f64,
}

impl Default for AdmittanceParameters {
    fn default() -> Self {
        AdmittanceParameters {
            mass: 1.0,
            damping: 0.1,
            stiffness: 0.0,
        }
    }
}

impl AdmittanceParameters {
    /// # Errors
    /// * ConfigurationException if the mass is not strictly positive or damping or stiffness
    /// are negative or any of the values is not finite.
    pub fn validate(&self) -> ControllerResult<()> {
        if !(self.mass.is_finite() && self.mass > 0.) {
            return Err(create_configuration_exception(format!(
                "Admittance mass must be positive and finite, got {}.",
                self.mass
            )));
        }
        if !(self.damping.is_finite() && self.damping >= 0.) {
            return Err(create_configuration_exception(format!(
                "Admittance damping must be non-negative and finite, got {}.",
                self.damping
            )));
        }
        if !(self.stiffness.is_finite() && self.stiffness >= 0.) {
            return Err(create_configuration_exception(format!(
                "Admittance stiffness must be non-negative and finite, got {}.",
                self.stiffness
            )));
        }
        Ok(())
    }
}

/// Maps an external wrench, the displacement from the reference pose and the Cartesian
/// velocity to a Cartesian acceleration:
///
/// `ddx = (f_ext - damping * dx - stiffness * x) / mass`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AdmittanceModel {
    parameters: AdmittanceParameters,
}

impl AdmittanceModel {
    /// Creates a new AdmittanceModel.
    /// # Errors
    /// * ConfigurationException if the parameters are invalid, see
    /// [`AdmittanceParameters::validate`](`AdmittanceParameters::validate`).
    pub fn new(parameters: AdmittanceParameters) -> ControllerResult<Self> {
        parameters.validate()?;
        info!(
            mass = parameters.mass,
            damping = parameters.damping,
            stiffness = parameters.stiffness,
            "Admittance model initialized."
        );
        Ok(AdmittanceModel { parameters })
    }

    pub fn parameters(&self) -> &AdmittanceParameters {
        &self.parameters
    }

    /// Computes the Cartesian acceleration.
    /// # Arguments
    /// * `f_ext` - External wrench.
    /// * `x` - Displacement from the reference pose.
    /// * `dx` - Cartesian velocity.
    pub fn compute(
        &self,
        f_ext: &CartesianVector,
        x: &CartesianVector,
        dx: &CartesianVector,
    ) -> CartesianVector {
        (f_ext - dx * self.parameters.damping - x * self.parameters.stiffness)
            / self.parameters.mass
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::admittance::{AdmittanceModel, AdmittanceParameters};
    use crate::exception::ControllerException;
    use crate::utils::CartesianVector;

    fn model(mass: f64, damping: f64, stiffness: f64) -> AdmittanceModel {
        AdmittanceModel::new(AdmittanceParameters {
            mass,
            damping,
            stiffness,
        })
        .unwrap()
    }

    #[test]
    fn equilibrium_test() {
        let model = model(2.5, 3.0, 40.0);
        let zero = CartesianVector::zeros();
        assert_eq!(model.compute(&zero, &zero, &zero), zero);
    }

    #[test]
    fn push_test() {
        let model = model(1.0, 0.1, 0.0);
        let f_ext = CartesianVector::new(5., 0., 0., 0., 0., 0.);
        let zero = CartesianVector::zeros();
        let ddx = model.compute(&f_ext, &zero, &zero);
        assert!((ddx - CartesianVector::new(5., 0., 0., 0., 0., 0.)).norm() < 1e-12);
        let twist = ddx * 0.001;
        assert!((twist - CartesianVector::new(0.005, 0., 0., 0., 0., 0.)).norm() < 1e-12);
    }

    #[test]
    fn affine_in_wrench_test() {
        let mass = 4.0;
        let model = model(mass, 0.7, 12.0);
        let f_ext = CartesianVector::new(1., -2., 3., 0.1, -0.2, 0.3);
        let x = CartesianVector::new(0.01, 0.02, -0.03, 0.1, 0., -0.1);
        let dx = CartesianVector::new(-0.5, 0.2, 0.1, 0., 0.3, 0.);
        let difference = model.compute(&(f_ext * 2.), &x, &dx) - model.compute(&f_ext, &x, &dx);
        assert!((difference - f_ext / mass).norm() < 1e-12);
    }

    #[test]
    fn spring_and_damper_oppose_motion_test() {
        let model = model(2.0, 4.0, 10.0);
        let zero = CartesianVector::zeros();
        let x = CartesianVector::new(0.1, 0., 0., 0., 0., 0.);
        let dx = CartesianVector::new(0., 0.5, 0., 0., 0., 0.);
        let ddx = model.compute(&zero, &x, &dx);
        assert!(f64::abs(ddx[0] + 0.5) < 1e-12);
        assert!(f64::abs(ddx[1] + 1.0) < 1e-12);
    }

    #[test]
    fn invalid_parameters_test() {
        for parameters in [
            AdmittanceParameters {
                mass: 0.,
                ..Default::default()
            },
            AdmittanceParameters {
                mass: -1.,
                ..Default::default()
            },
            AdmittanceParameters {
                mass: f64::NAN,
                ..Default::default()
            },
            AdmittanceParameters {
                damping: -0.1,
                ..Default::default()
            },
            AdmittanceParameters {
                stiffness: f64::INFINITY,
                ..Default::default()
            },
        ]
        .iter()
        {
            assert!(matches!(
                AdmittanceModel::new(*parameters),
                Err(ControllerException::ConfigurationException { .. })
            ));
        }
    }
}
