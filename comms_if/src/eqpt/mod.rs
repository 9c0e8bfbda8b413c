//! # Equipment Interface
//!
//! This module defines the interface structures and traits used to talk to equipment.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Single joint actuator and its sensors
pub mod joint;
