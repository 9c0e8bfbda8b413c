//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications
//! interface.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use serde_json;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the robot by the operator or a
/// script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Tc {
    /// Put the robot into safe mode, holding the joint still.
    MakeSafe,

    /// Leave safe mode.
    MakeUnsafe,

    /// Reconfigure the joint actuator, clearing a fault if it succeeds.
    JointReboot,

    /// Toggle between manual and automated joint control.
    JointToggleManual,

    /// Set the open loop joint power used in manual mode.
    JointManualPower(f64),

    /// Set the joint target angle in degrees.
    JointTarget(f64),

    /// Robot pose in the field frame from the pose estimator.
    RobotPose { x_m: f64, y_m: f64 },

    /// Select the alliance side, which selects the target.
    Alliance { blue: bool },

    /// Enable or disable feeding the aim solution into the joint target.
    AutoAim(bool),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC contains a non-finite value")]
    NonFinite,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        let tc: Tc = serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)?;

        let finite = match tc {
            Tc::JointManualPower(p) => p.is_finite(),
            Tc::JointTarget(t) => t.is_finite(),
            Tc::RobotPose { x_m, y_m } => x_m.is_finite() && y_m.is_finite(),
            _ => true,
        };

        if finite {
            Ok(tc)
        } else {
            Err(TcParseError::NonFinite)
        }
    }

    /// Serialize the TC into a JSON string
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }
}
