// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the admittance controller, its building blocks and the lifecycle through which a
//! host drives it.

pub mod admittance;
pub mod admittance_controller;
pub mod config;
pub mod control_loop;
pub mod control_tools;
pub mod controller_interface;
pub mod interfaces;
pub mod inv_jac_ctrl;
pub mod low_pass_filter;
pub mod session_state;
