// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the hardware interface values exchanged between the host and a controller and
//! the force-torque sensor component which reads from them.
use crate::exception::{ControllerException, ControllerResult};
use crate::utils::CartesianVector;

/// Interface name of joint positions.
pub const HW_IF_POSITION: &str = "position";
/// Prefix of the auxiliary state interfaces.
pub const HW_IF_AUXILIARY_PREFIX: &str = "auxiliary_sensor";
/// Interface name of the FRI sample time in \[s\].
pub const HW_IF_SAMPLE_TIME: &str = "sample_time";
/// Interface name of the FRI session state.
pub const HW_IF_SESSION_STATE: &str = "session_state";
/// Prefix of the estimated external force-torque interfaces.
pub const HW_IF_ESTIMATED_FT_PREFIX: &str = "estimated_ft_sensor";
pub const HW_IF_FORCE_X: &str = "force.x";
pub const HW_IF_FORCE_Y: &str = "force.y";
pub const HW_IF_FORCE_Z: &str = "force.z";
pub const HW_IF_TORQUE_X: &str = "torque.x";
pub const HW_IF_TORQUE_Y: &str = "torque.y";
pub const HW_IF_TORQUE_Z: &str = "torque.z";

/// A single named value owned by the host. The full name is `prefix_name/interface_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    prefix_name: String,
    interface_name: String,
    value: f64,
}

/// Value read by a controller.
pub type StateInterface = Interface;
/// Value written by a controller.
pub type CommandInterface = Interface;

impl Interface {
    pub fn new(prefix_name: &str, interface_name: &str, value: f64) -> Self {
        Interface {
            prefix_name: prefix_name.to_string(),
            interface_name: interface_name.to_string(),
            value,
        }
    }

    /// Creates an interface from its full name `prefix_name/interface_name`.
    pub fn from_name(name: &str, value: f64) -> Self {
        match name.rsplit_once('/') {
            Some((prefix_name, interface_name)) => Interface::new(prefix_name, interface_name, value),
            None => Interface::new("", name, value),
        }
    }

    pub fn get_name(&self) -> String {
        format!("{}/{}", self.prefix_name, self.interface_name)
    }

    pub fn get_prefix_name(&self) -> &str {
        &self.prefix_name
    }

    pub fn get_interface_name(&self) -> &str {
        &self.interface_name
    }

    pub fn get_value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// checks if the full name of the interface equals `name` without allocating
    pub fn has_name(&self, name: &str) -> bool {
        match name.rsplit_once('/') {
            Some((prefix_name, interface_name)) => {
                self.prefix_name == prefix_name && self.interface_name == interface_name
            }
            None => self.prefix_name.is_empty() && self.interface_name == name,
        }
    }
}

/// Names of the interfaces a controller requires, in the order it expects them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterfaceConfiguration {
    pub names: Vec<String>,
}

/// Index of the interface with the given full name.
pub fn find_interface(interfaces: &[Interface], name: &str) -> Option<usize> {
    interfaces.iter().position(|interface| interface.has_name(name))
}

/// Reads the value at a previously resolved index.
/// # Errors
/// * InterfaceException if the index is not part of `interfaces`.
pub fn read_interface(interfaces: &[Interface], index: usize) -> ControllerResult<f64> {
    interfaces
        .get(index)
        .map(Interface::get_value)
        .ok_or_else(|| ControllerException::InterfaceException {
            message: format!(
                "State interface {} is not available in this cycle ({} interfaces).",
                index,
                interfaces.len()
            ),
        })
}

/// Semantic component which reads a wrench from six state interfaces.
#[derive(Debug, Clone)]
pub struct ForceTorqueSensor {
    names: [String; 6],
    indices: Option<[usize; 6]>,
}

impl ForceTorqueSensor {
    /// Creates a sensor from the full names of force x, y, z and torque x, y, z.
    pub fn new(names: [String; 6]) -> Self {
        ForceTorqueSensor {
            names,
            indices: None,
        }
    }

    /// Creates a sensor reading `<prefix>/force.x` .. `<prefix>/torque.z`.
    pub fn from_prefix(prefix: &str) -> Self {
        let name = |interface_name: &str| format!("{}/{}", prefix, interface_name);
        ForceTorqueSensor::new([
            name(HW_IF_FORCE_X),
            name(HW_IF_FORCE_Y),
            name(HW_IF_FORCE_Z),
            name(HW_IF_TORQUE_X),
            name(HW_IF_TORQUE_Y),
            name(HW_IF_TORQUE_Z),
        ])
    }

    pub fn get_state_interface_names(&self) -> &[String; 6] {
        &self.names
    }

    /// Resolves the indices of all six interfaces. Returns false and keeps the sensor
    /// unassigned if any of them is missing.
    pub fn assign_loaned_state_interfaces(&mut self, interfaces: &[StateInterface]) -> bool {
        let mut indices = [0; 6];
        for (index, name) in indices.iter_mut().zip(self.names.iter()) {
            match find_interface(interfaces, name) {
                Some(i) => *index = i,
                None => return false,
            }
        }
        self.indices = Some(indices);
        true
    }

    pub fn is_assigned(&self) -> bool {
        self.indices.is_some()
    }

    pub fn release_interfaces(&mut self) {
        self.indices = None;
    }

    /// Reads the wrench `[force, torque]` from the interfaces of the current cycle.
    /// # Errors
    /// * InterfaceException if the sensor is not assigned or an interface is missing.
    pub fn get_wrench(&self, interfaces: &[StateInterface]) -> ControllerResult<CartesianVector> {
        let indices = self
            .indices
            .as_ref()
            .ok_or_else(|| ControllerException::InterfaceException {
                message: "Force torque sensor interfaces are not assigned.".to_string(),
            })?;
        let mut wrench = CartesianVector::zeros();
        for (value, &index) in wrench.iter_mut().zip(indices.iter()) {
            *value = read_interface(interfaces, index)?;
        }
        Ok(wrench)
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::interfaces::{
        find_interface, read_interface, ForceTorqueSensor, Interface, StateInterface,
        HW_IF_ESTIMATED_FT_PREFIX,
    };
    use crate::utils::CartesianVector;

    fn ft_interfaces() -> Vec<StateInterface> {
        ["force.x", "force.y", "force.z", "torque.x", "torque.y", "torque.z"]
            .iter()
            .enumerate()
            .map(|(i, name)| Interface::new(HW_IF_ESTIMATED_FT_PREFIX, name, i as f64 + 1.))
            .rev()
            .collect()
    }

    #[test]
    fn interface_names_test() {
        let interface = Interface::from_name("lbr_A1/position", 0.5);
        assert_eq!(interface.get_prefix_name(), "lbr_A1");
        assert_eq!(interface.get_interface_name(), "position");
        assert_eq!(interface.get_name(), "lbr_A1/position");
        assert!(interface.has_name("lbr_A1/position"));
        assert!(!interface.has_name("lbr_A2/position"));
        assert!(!interface.has_name("position"));
        assert_eq!(interface.get_value(), 0.5);
    }

    #[test]
    fn find_and_read_interface_test() {
        let interfaces = vec![
            Interface::new("lbr_A1", "position", 0.1),
            Interface::new("lbr_A2", "position", 0.2),
        ];
        assert_eq!(find_interface(&interfaces, "lbr_A2/position"), Some(1));
        assert_eq!(find_interface(&interfaces, "lbr_A3/position"), None);
        assert_eq!(read_interface(&interfaces, 1).unwrap(), 0.2);
        assert!(read_interface(&interfaces, 2).is_err());
    }

    #[test]
    fn force_torque_sensor_test() {
        let interfaces = ft_interfaces();
        let mut sensor = ForceTorqueSensor::from_prefix(HW_IF_ESTIMATED_FT_PREFIX);
        assert_eq!(
            sensor.get_state_interface_names()[3],
            "estimated_ft_sensor/torque.x"
        );
        assert!(sensor.get_wrench(&interfaces).is_err());
        assert!(sensor.assign_loaned_state_interfaces(&interfaces));
        assert!(sensor.is_assigned());
        assert_eq!(
            sensor.get_wrench(&interfaces).unwrap(),
            CartesianVector::new(1., 2., 3., 4., 5., 6.)
        );
        sensor.release_interfaces();
        assert!(!sensor.is_assigned());
    }

    #[test]
    fn force_torque_sensor_missing_interface_test() {
        let mut interfaces = ft_interfaces();
        interfaces.remove(0);
        let mut sensor = ForceTorqueSensor::from_prefix(HW_IF_ESTIMATED_FT_PREFIX);
        assert!(!sensor.assign_loaned_state_interfaces(&interfaces));
        assert!(!sensor.is_assigned());
    }
}
