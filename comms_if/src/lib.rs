//! # Communications interface crate.
//!
//! Provides the interfaces shared between the control core and the things
//! around it: the actuator hardware and the telecommand sources.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommand definitions
pub mod tc;

/// Command and configuration definitions for equipment (like the joint actuator)
pub mod eqpt;
