//! Parameters structure for JointCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::joint::{GainSlot, MotorConfig};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Joint control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- MECHANICAL RANGE ----
    /// Lowest angle the joint may be commanded to.
    ///
    /// Units: degrees
    pub min_angle_deg: f64,

    /// Highest angle the joint may be commanded to.
    ///
    /// Units: degrees
    pub max_angle_deg: f64,

    /// Target angle set on startup.
    ///
    /// Units: degrees
    pub initial_target_deg: f64,

    /// Motor rotations per joint rotation.
    pub gear_ratio: f64,

    // ---- ABSOLUTE ENCODER ----
    /// Raw absolute encoder reading when the joint is at 0 degrees.
    ///
    /// Units: rotations
    pub abs_zero_rot: f64,

    /// Sign applied to the offset encoder reading, either +1 or -1 depending on how the encoder
    /// is mounted.
    pub abs_sign: f64,

    // ---- CONFIGURATION ----
    /// Number of times a failed configuration is retried before the joint is faulted.
    pub max_config_retries: u32,

    /// The configuration applied to the motor controller.
    #[serde(default)]
    pub motor_config: MotorConfig,

    /// Gain slot used for motion profiled position moves.
    pub position_slot: GainSlot,

    // ---- CALIBRATION ----
    /// When the reference pair is re-anchored.
    pub calib_policy: CalibPolicy,

    /// Time between re-anchoring of the reference pair under `CalibPolicy::Periodic`. Shorter
    /// times track drift more closely but cause more oscillation.
    ///
    /// Units: seconds
    pub calib_interval_s: f64,

    // ---- SETPOINT DETECTION ----
    /// Tracking error below which the joint is at its setpoint.
    ///
    /// Units: degrees
    pub setpoint_tol_deg: f64,

    /// Motor rate below which the joint is considered settled.
    ///
    /// Units: motor rotations/second
    pub settled_rate_tol_rots: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Re-anchoring policies for the reference pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibPolicy {
    /// Re-anchor every `calib_interval_s` while the joint is not faulted.
    Periodic,

    /// Re-anchor only when the joint is rebooted.
    OnBoot,
}

/// Reasons a parameter set is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Minimum angle ({0}) must be below the maximum angle ({1})")]
    InvalidRange(f64, f64),

    #[error("Gear ratio must be finite and non-zero, found {0}")]
    InvalidGearRatio(f64),

    #[error("Absolute encoder sign must be +1 or -1, found {0}")]
    InvalidAbsSign(f64),

    #[error("Absolute encoder zero must be in [0, 1), found {0}")]
    InvalidAbsZero(f64),

    #[error("Parameter {0} must be finite and positive")]
    NotPositive(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check that the parameters describe a usable joint.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.min_angle_deg < self.max_angle_deg) {
            return Err(ParamsError::InvalidRange(
                self.min_angle_deg,
                self.max_angle_deg,
            ));
        }

        if !self.gear_ratio.is_finite() || self.gear_ratio == 0.0 {
            return Err(ParamsError::InvalidGearRatio(self.gear_ratio));
        }

        if self.abs_sign != 1.0 && self.abs_sign != -1.0 {
            return Err(ParamsError::InvalidAbsSign(self.abs_sign));
        }

        if !(0.0..1.0).contains(&self.abs_zero_rot) {
            return Err(ParamsError::InvalidAbsZero(self.abs_zero_rot));
        }

        for &(name, val) in [
            ("calib_interval_s", self.calib_interval_s),
            ("setpoint_tol_deg", self.setpoint_tol_deg),
            ("settled_rate_tol_rots", self.settled_rate_tol_rots),
        ]
        .iter()
        {
            if !val.is_finite() || val <= 0.0 {
                return Err(ParamsError::NotPositive(name));
            }
        }

        Ok(())
    }

    /// Convert a joint angle difference into motor rotations.
    pub fn deg_to_motor_rot(&self, angle_deg: f64) -> f64 {
        angle_deg * self.gear_ratio / 360.0
    }
}

impl Default for Params {
    /// The launcher arm: 72:12 chain on stacked 3:1, 4:1 and 4:1 planetaries.
    fn default() -> Self {
        Self {
            min_angle_deg: -4.0,
            max_angle_deg: 180.0,
            initial_target_deg: 50.0,
            gear_ratio: 288.0,
            abs_zero_rot: 0.6922,
            abs_sign: -1.0,
            max_config_retries: 3,
            motor_config: MotorConfig::default(),
            position_slot: GainSlot::Position,
            calib_policy: CalibPolicy::Periodic,
            calib_interval_s: 2.0,
            setpoint_tol_deg: 0.5,
            settled_rate_tol_rots: 1.0,
        }
    }
}
