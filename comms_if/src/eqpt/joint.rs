//! # Joint Equipment Interface
//!
//! The hardware adapter for a single actuated joint: one motor controller with an integrated
//! relative (rotor) position sensor, and one absolute single-turn encoder on the joint output.
//!
//! All reads and writes are non-blocking. Positions reported by the motor controller are in
//! motor rotations, the absolute encoder reports a fraction of one output rotation.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Hardware adapter for a single joint.
pub trait JointHw {
    /// Read the raw absolute encoder position as a fraction of one rotation.
    ///
    /// Nominally in `[0, 1)`, although some encoders report the wrap point as exactly `1.0` or
    /// slightly outside the range.
    fn read_abs_pos(&mut self) -> f64;

    /// Read the motor's relative position.
    ///
    /// Units: motor rotations
    fn read_rel_pos_rot(&mut self) -> f64;

    /// Read the motor's rate.
    ///
    /// Units: motor rotations/second
    fn read_rate_rots(&mut self) -> f64;

    /// Read the closed loop error of the motor controller's current position command.
    ///
    /// Units: motor rotations
    fn read_tracking_error_rot(&mut self) -> f64;

    /// Apply a full configuration to the motor controller.
    ///
    /// A single attempt, retries are the caller's responsibility. Applying the same configuration
    /// twice shall have the same effect as applying it once.
    fn apply_config(&mut self, config: &MotorConfig) -> Result<(), HwError>;

    /// Issue a command to the motor controller.
    fn command(&mut self, dems: JointDems);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Closed loop gains for one gain slot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,

    /// Velocity feed forward
    #[serde(default)]
    pub kv: f64,
}

/// Supply current limiting.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CurrentLimit {
    pub enable: bool,

    /// Current the supply is limited to once the threshold has been exceeded for the threshold
    /// time.
    ///
    /// Units: amps
    pub supply_limit_a: f64,

    /// Units: amps
    pub supply_threshold_a: f64,

    /// Units: seconds
    pub supply_time_threshold_s: f64,
}

/// Constraints applied to motion profiled position commands.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    /// Units: motor rotations/second
    pub cruise_velocity_rots: f64,

    /// Units: motor rotations/second^2
    pub acceleration_rots2: f64,

    /// Units: motor rotations/second^3
    pub jerk_rots3: f64,
}

/// Full configuration of the joint's motor controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MotorConfig {
    pub neutral_mode: NeutralMode,

    /// If true positive output drives the motor clockwise.
    pub inverted: bool,

    pub current_limit: CurrentLimit,

    /// Gains used by velocity control
    pub velocity_gains: Gains,

    /// Gains used by motion profiled position control
    pub position_gains: Gains,

    pub motion_profile: MotionProfile,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single command to the joint's motor controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum JointDems {
    /// Duty cycle output in `[-1, 1]`.
    OpenLoop { power: f64 },

    /// Motion profiled move to an absolute motor position.
    Profiled {
        /// Units: motor rotations
        target_pos_rot: f64,
        slot: GainSlot,
    },

    /// Switch to coast and output zero. Used when the motor cannot be configured.
    Disable,
}

/// Gain slots held by the motor controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainSlot {
    Velocity,
    Position,
}

/// Motor behaviour when no output is commanded.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeutralMode {
    Brake,
    Coast,
}

/// Errors reported by the joint hardware.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HwError {
    #[error("Configuration rejected by the motor controller: {0}")]
    ConfigRejected(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JointDems {
    /// Short name of the command kind, used in telemetry.
    pub fn kind_str(&self) -> &'static str {
        match self {
            JointDems::OpenLoop { .. } => "open_loop",
            JointDems::Profiled { .. } => "profiled",
            JointDems::Disable => "disable",
        }
    }
}

impl Default for MotorConfig {
    /// Brake on neutral, 40 A supply limit, and the tuned arm gains.
    fn default() -> Self {
        Self {
            neutral_mode: NeutralMode::Brake,
            inverted: false,
            current_limit: CurrentLimit {
                enable: true,
                supply_limit_a: 40.0,
                supply_threshold_a: 40.0,
                supply_time_threshold_s: 0.5,
            },
            velocity_gains: Gains {
                kp: 0.008,
                ki: 0.06,
                kd: 0.0002,
                kv: 0.009,
            },
            position_gains: Gains {
                kp: 0.8,
                ki: 2.0,
                kd: 0.006,
                kv: 0.0,
            },
            motion_profile: MotionProfile {
                cruise_velocity_rots: 50.0,
                acceleration_rots2: 75.0,
                jerk_rots3: 1000.0,
            },
        }
    }
}
