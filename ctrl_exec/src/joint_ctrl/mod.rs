//! Joint control module
//!
//! Fault tolerant position control of a single joint. The joint's motor is commanded in its own
//! (relative) units, and a reference pair captured from the relative and absolute sensors maps
//! absolute angle targets onto motor positions. The reference pair is re-anchored periodically to
//! bound the relative sensor's drift.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod config;
mod mode;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use config::*;
pub use mode::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during JointCtrl initialisation.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Failed to load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Loaded parameters are invalid: {0}")]
    ParamsInvalid(ParamsError),
}

/// Possible errors that can occur during JointCtrl processing.
#[derive(Debug, thiserror::Error)]
pub enum JointCtrlError {
    #[error("Input {0} is not finite")]
    NonFiniteInput(&'static str),
}
