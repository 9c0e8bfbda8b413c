//! Aim control module
//!
//! Solves for the robot heading and launcher arm angle needed to put a game piece through a fixed
//! aperture under gravity. The launch point moves with the arm angle and heading, so the solver
//! uses the previous solution as a warm start for the launch point and relaxes towards the true
//! solution over successive calls.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod solver;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use solver::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during AimCtrl initialisation.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Failed to load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Loaded parameters are invalid: {0}")]
    ParamsInvalid(ParamsError),
}

/// Possible errors that can occur during AimCtrl processing.
#[derive(Debug, thiserror::Error)]
pub enum AimCtrlError {
    #[error("Robot pose is not finite: ({0}, {1})")]
    NonFinitePose(f64, f64),
}
