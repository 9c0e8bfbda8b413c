//! # Simulated Joint
//!
//! A simulated single joint implementing [`JointHw`], used when running the executable without
//! hardware and as the fixture for the controller tests. The simulation provides:
//!
//! - A rate limited plant: motion profiled commands move the motor towards the target at up to
//!   the configured cruise velocity, open loop commands move it at a fraction of free speed.
//! - A relative sensor that slips against the true motor position in proportion to how far the
//!   motor moves, so the relative reading drifts from the joint's true angle over time.
//! - An absolute encoder reading the true joint angle, wrapped into `[0, 1)`.
//! - Scripted configuration failures.
//! - A log of every command issued.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::joint::{HwError, JointDems, JointHw, MotorConfig, NeutralMode};
use log::trace;
use serde::Deserialize;
use std::collections::VecDeque;
use util::maths::{clamp, rem_euclid};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of commands kept in the command log.
const CMD_LOG_LEN: usize = 1024;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated joint.
#[derive(Debug, Clone, Deserialize)]
pub struct SimJointParams {
    /// Motor rotations per joint rotation.
    pub gear_ratio: f64,

    /// Raw absolute encoder reading at 0 degrees.
    pub abs_zero_rot: f64,

    /// Encoder mounting sign, +1 or -1.
    pub abs_sign: f64,

    /// Joint angle at the start of the simulation.
    ///
    /// Units: degrees
    pub initial_angle_deg: f64,

    /// Motor speed at full open loop power.
    ///
    /// Units: motor rotations/second
    pub free_speed_rots: f64,

    /// Relative sensor slip per motor rotation travelled.
    pub slip_per_rot: f64,
}

/// The simulated joint.
#[derive(Debug)]
pub struct SimJoint {
    params: SimJointParams,

    /// True motor position, zero at `initial_angle_deg`.
    rotor_pos_rot: f64,

    /// Accumulated error of the relative sensor.
    rel_drift_rot: f64,

    rate_rots: f64,

    tracking_error_rot: f64,

    active_dems: Option<JointDems>,

    config: Option<MotorConfig>,

    neutral_mode: NeutralMode,

    failing_configs: u32,

    num_config_attempts: u32,

    cmd_log: VecDeque<JointDems>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimJointParams {
    fn default() -> Self {
        Self {
            gear_ratio: 288.0,
            abs_zero_rot: 0.6922,
            abs_sign: -1.0,
            initial_angle_deg: 30.0,
            free_speed_rots: 100.0,
            slip_per_rot: 0.0,
        }
    }
}

impl SimJoint {
    pub fn new(params: SimJointParams) -> Self {
        Self {
            params,
            rotor_pos_rot: 0.0,
            rel_drift_rot: 0.0,
            rate_rots: 0.0,
            tracking_error_rot: 0.0,
            active_dems: None,
            config: None,
            neutral_mode: NeutralMode::Coast,
            failing_configs: 0,
            num_config_attempts: 0,
            cmd_log: VecDeque::with_capacity(CMD_LOG_LEN),
        }
    }

    /// Advance the simulation by `dt_s` seconds under the active command.
    pub fn step(&mut self, dt_s: f64) {
        if !(dt_s > 0.0) {
            return;
        }

        let rel_pos_rot = self.rotor_pos_rot + self.rel_drift_rot;

        self.rate_rots = match self.active_dems {
            Some(JointDems::OpenLoop { power }) => {
                self.tracking_error_rot = 0.0;
                clamp(power, -1.0, 1.0) * self.params.free_speed_rots
            }
            Some(JointDems::Profiled { target_pos_rot, .. }) => {
                let max_rate = self.max_profile_rate_rots();
                self.tracking_error_rot = target_pos_rot - rel_pos_rot;
                clamp(self.tracking_error_rot / dt_s, -max_rate, max_rate)
            }
            Some(JointDems::Disable) | None => {
                self.tracking_error_rot = 0.0;
                0.0
            }
        };

        let delta_rot = self.rate_rots * dt_s;
        self.rotor_pos_rot += delta_rot;
        self.rel_drift_rot += self.params.slip_per_rot * delta_rot.abs();

        if let Some(JointDems::Profiled { target_pos_rot, .. }) = self.active_dems {
            self.tracking_error_rot = target_pos_rot - (self.rotor_pos_rot + self.rel_drift_rot);
        }

        trace!(
            "SimJoint: angle {:.3} deg, rate {:.3} rot/s, drift {:.4} rot",
            self.angle_deg(),
            self.rate_rots,
            self.rel_drift_rot
        );
    }

    /// True angle of the joint.
    ///
    /// Units: degrees
    pub fn angle_deg(&self) -> f64 {
        self.params.initial_angle_deg + self.rotor_pos_rot * 360.0 / self.params.gear_ratio
    }

    /// Make the next `n` configuration attempts fail.
    pub fn fail_next_configs(&mut self, n: u32) {
        self.failing_configs = n;
    }

    /// Slip the relative sensor by `drift_rot` motor rotations.
    pub fn add_rel_drift(&mut self, drift_rot: f64) {
        self.rel_drift_rot += drift_rot;
    }

    /// The configuration most recently accepted.
    pub fn config(&self) -> Option<&MotorConfig> {
        self.config.as_ref()
    }

    pub fn neutral_mode(&self) -> NeutralMode {
        self.neutral_mode
    }

    pub fn num_config_attempts(&self) -> u32 {
        self.num_config_attempts
    }

    /// The most recent commands issued to the joint, oldest first.
    pub fn cmd_log(&self) -> &VecDeque<JointDems> {
        &self.cmd_log
    }

    pub fn last_cmd(&self) -> Option<JointDems> {
        self.cmd_log.back().copied()
    }

    fn max_profile_rate_rots(&self) -> f64 {
        match self.config {
            Some(ref c) => c.motion_profile.cruise_velocity_rots,
            None => self.params.free_speed_rots,
        }
    }
}

impl JointHw for SimJoint {
    fn read_abs_pos(&mut self) -> f64 {
        let raw = self.params.abs_zero_rot + self.params.abs_sign * self.angle_deg() / 360.0;
        rem_euclid(raw, 1.0)
    }

    fn read_rel_pos_rot(&mut self) -> f64 {
        self.rotor_pos_rot + self.rel_drift_rot
    }

    fn read_rate_rots(&mut self) -> f64 {
        self.rate_rots
    }

    fn read_tracking_error_rot(&mut self) -> f64 {
        self.tracking_error_rot
    }

    fn apply_config(&mut self, config: &MotorConfig) -> Result<(), HwError> {
        self.num_config_attempts += 1;

        if self.failing_configs > 0 {
            self.failing_configs -= 1;
            return Err(HwError::ConfigRejected(String::from("CAN frame timeout")));
        }

        self.neutral_mode = config.neutral_mode;
        self.config = Some(*config);
        Ok(())
    }

    fn command(&mut self, dems: JointDems) {
        if let JointDems::Disable = dems {
            self.neutral_mode = NeutralMode::Coast;
        }

        self.active_dems = Some(dems);

        if self.cmd_log.len() >= CMD_LOG_LEN {
            self.cmd_log.pop_front();
        }
        self.cmd_log.push_back(dems);
    }
}
