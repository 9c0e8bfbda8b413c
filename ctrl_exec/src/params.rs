//! # Control Executable Parameters
//!
//! This module provide parameters for the control executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::sim_joint::SimJointParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CtrlExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// If true a telemetry packet is archived every cycle.
    pub tm_enabled: bool,

    /// Alliance selected at startup, before any `Alliance` TC.
    pub alliance_is_blue: bool,

    /// Aim solution fed into the joint target at startup, before any `AutoAim` TC.
    pub auto_aim: bool,

    /// Plant parameters of the simulated joint.
    pub sim_joint: SimJointParams,
}

impl CtrlExecParams {
    /// Number of cycles per second.
    pub fn cycle_frequency_hz(&self) -> f64 {
        1.0 / self.cycle_period_s
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let p: CtrlExecParams = util::params::from_str(
            r#"
            cycle_period_s = 0.02
            tm_enabled = true
            alliance_is_blue = false
            auto_aim = true

            [sim_joint]
            gear_ratio = 288.0
            abs_zero_rot = 0.6922
            abs_sign = -1.0
            initial_angle_deg = 30.0
            free_speed_rots = 100.0
            slip_per_rot = 0.001
            "#,
        )
        .unwrap();

        assert!((p.cycle_frequency_hz() - 50.0).abs() < 1e-9);
        assert!(!p.alliance_is_blue);
        assert_eq!(p.sim_joint.slip_per_rot, 0.001);
    }

    #[test]
    fn test_shipped_params() {
        let p: CtrlExecParams = util::params::load_from_path("../params/ctrl_exec.toml").unwrap();

        assert!(p.cycle_period_s > 0.0);
        assert!(p.tm_enabled);
    }
}
