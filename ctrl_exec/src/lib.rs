//! # Control core library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the control executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Aim control module - solves for the heading and launch angle needed to hit the target
pub mod aim_ctrl;

/// Global data store for the executable
pub mod data_store;

/// Joint control module - fault tolerant position control of the launcher arm joint
pub mod joint_ctrl;

/// Executable parameters
pub mod params;

/// Simulated joint hardware
pub mod sim_joint;

/// Telecommand processor - applies telecommands to the data store
pub mod tc_processor;

/// Telemetry server - archives a telemetry packet every cycle
pub mod tm_server;
