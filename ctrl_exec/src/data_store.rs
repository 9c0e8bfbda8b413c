//! # Data Store

use comms_if::eqpt::joint::JointHw;
use log::{info, warn};

use crate::{aim_ctrl, joint_ctrl};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the robot has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    MakeSafeTc,
    JointFaulted,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore<H: JointHw> {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time at the start of the cycle
    pub time_s: f64,

    // Safe mode variables
    /// Determines if the robot is in safe mode.
    pub safe: bool,

    /// Gives the reason for the robot being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // Field state
    /// Robot position in the field frame from the pose estimator, (x, y) in meters.
    pub robot_pose_m: Option<(f64, f64)>,

    pub alliance_is_blue: bool,

    /// If true feasible aim solutions are fed into the joint target.
    pub auto_aim: bool,

    // JointCtrl
    pub joint_ctrl: joint_ctrl::JointCtrl<H>,
    pub joint_ctrl_input: joint_ctrl::InputData,
    pub joint_ctrl_output: joint_ctrl::OutputData,
    pub joint_ctrl_status_rpt: joint_ctrl::StatusReport,

    // AimCtrl
    pub aim_ctrl: aim_ctrl::AimCtrl,
    pub aim_ctrl_output: Option<aim_ctrl::OutputData>,
    pub aim_ctrl_status_rpt: aim_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl<H: JointHw> DataStore<H> {
    /// Create a new data store around the given controllers.
    pub fn new(joint_ctrl: joint_ctrl::JointCtrl<H>, aim_ctrl: aim_ctrl::AimCtrl) -> Self {
        Self {
            num_cycles: 0,
            is_1_hz_cycle: false,
            time_s: 0.0,
            safe: false,
            safe_cause: None,
            robot_pose_m: None,
            alliance_is_blue: true,
            auto_aim: false,
            joint_ctrl,
            joint_ctrl_input: joint_ctrl::InputData::default(),
            joint_ctrl_output: joint_ctrl::OutputData::default(),
            joint_ctrl_status_rpt: joint_ctrl::StatusReport::default(),
            aim_ctrl,
            aim_ctrl_output: None,
            aim_ctrl_status_rpt: aim_ctrl::StatusReport::default(),
            num_consec_cycle_overruns: 0,
        }
    }

    /// Puts the robot into safe mode with the given cause.
    ///
    /// The joint is held under manual control with zero power until safe mode is cleared, including
    /// across a reboot on this cycle.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            self.joint_ctrl.make_safe();
            self.joint_ctrl_input.make_safe = true;
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns `Ok(())` if this cause was cleared and safe mode was disabled, or `Err(())`
    /// otherwise. To remove safe mode the provided cause must match the initial reason for safe
    /// mode being enabled.
    ///
    /// If safe mode was not enabled `Ok(())` is returned
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> Result<(), ()> {
        if !self.safe {
            return Ok(());
        }

        match self.safe_cause {
            Some(root_cause) if root_cause != cause => Err(()),
            _ => {
                self.safe = false;
                self.safe_cause = None;
                info!("Make unsafe requested, root cause match, safe mode disabled");
                Ok(())
            }
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64, time_s: f64) {
        let cycles_per_s = (cycle_frequency_hz.round() as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_s == 0;

        self.time_s = time_s;

        self.joint_ctrl_input = joint_ctrl::InputData {
            time_s,
            ..Default::default()
        };
        self.joint_ctrl_output = joint_ctrl::OutputData::default();
        self.joint_ctrl_status_rpt = joint_ctrl::StatusReport::default();

        self.aim_ctrl_output = None;
        self.aim_ctrl_status_rpt = aim_ctrl::StatusReport::default();
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }

    /// Input data for AimCtrl, `None` if no pose is known.
    pub fn aim_ctrl_input(&self) -> Option<aim_ctrl::InputData> {
        self.robot_pose_m.map(|(x, y)| aim_ctrl::InputData {
            robot_x_m: x,
            robot_y_m: y,
            alliance_is_blue: self.alliance_is_blue,
        })
    }

    /// Feed this cycle's aim solution into the joint target.
    ///
    /// Only feasible solutions are used, and nothing is fed while safe or when automatic aiming is
    /// off. An explicit target from a TC on the same cycle is overridden. Returns true if the
    /// target was set.
    pub fn apply_aim(&mut self) -> bool {
        if self.safe || !self.auto_aim {
            return false;
        }

        match self.aim_ctrl_output {
            Some(aim_ctrl::OutputData { solution }) if solution.feasible => {
                self.joint_ctrl_input.target_angle_deg = Some(solution.arm_angle_deg);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        aim_ctrl::AimCtrl,
        joint_ctrl::{JointCtrl, Params},
        sim_joint::{SimJoint, SimJointParams},
    };

    fn new_ds() -> DataStore<SimJoint> {
        DataStore::new(
            JointCtrl::with_params(
                Params::default(),
                SimJoint::new(SimJointParams::default()),
                0.0,
            ),
            AimCtrl::default(),
        )
    }

    #[test]
    fn test_safe_mode_causes() {
        let mut ds = new_ds();

        ds.make_safe(SafeModeCause::JointFaulted);
        assert!(ds.safe);
        assert!(ds.joint_ctrl.is_manual());
        assert_eq!(ds.joint_ctrl.manual_power(), 0.0);

        assert!(ds.make_unsafe(SafeModeCause::MakeSafeTc).is_err());
        assert!(ds.safe);
        assert!(ds.make_unsafe(SafeModeCause::JointFaulted).is_ok());
        assert!(!ds.safe);
    }

    #[test]
    fn test_reboot_in_safe_mode() {
        use util::module::State;

        let mut ds = new_ds();

        // Safe on operator request, a reboot must not release the joint
        ds.cycle_start(50.0, 0.0);
        ds.make_safe(SafeModeCause::MakeSafeTc);
        ds.joint_ctrl_input.reboot = true;
        let (_, rpt) = ds.joint_ctrl.proc(&ds.joint_ctrl_input).unwrap();
        assert!(rpt.manual);
        assert_eq!(ds.joint_ctrl.manual_power(), 0.0);

        // Safe because of a fault, the reboot is what clears it
        let mut ds = new_ds();
        ds.joint_ctrl.hw_mut().fail_next_configs(10);
        assert!(!ds.joint_ctrl.reboot(0.0));
        ds.make_safe(SafeModeCause::JointFaulted);

        ds.cycle_start(50.0, 0.02);
        ds.joint_ctrl.hw_mut().fail_next_configs(0);
        ds.joint_ctrl_input.reboot = true;
        let (_, rpt) = ds.joint_ctrl.proc(&ds.joint_ctrl_input).unwrap();
        assert!(!rpt.faulted);
        assert!(!rpt.manual);
        assert!(ds.make_unsafe(SafeModeCause::JointFaulted).is_ok());
    }

    #[test]
    fn test_apply_aim() {
        let mut ds = new_ds();
        ds.robot_pose_m = Some((3.0, 5.55));

        let input = ds.aim_ctrl_input().unwrap();
        let solution = ds.aim_ctrl.compute_aim(input.robot_x_m, input.robot_y_m, true);
        ds.aim_ctrl_output = Some(aim_ctrl::OutputData { solution });

        assert!(!ds.apply_aim());
        assert_eq!(ds.joint_ctrl_input.target_angle_deg, None);

        ds.auto_aim = true;
        assert!(ds.apply_aim());
        assert_eq!(
            ds.joint_ctrl_input.target_angle_deg,
            Some(solution.arm_angle_deg)
        );

        ds.cycle_start(50.0, 0.02);
        assert_eq!(ds.joint_ctrl_input.target_angle_deg, None);
        ds.aim_ctrl_output = Some(aim_ctrl::OutputData {
            solution: aim_ctrl::AimSolution::default(),
        });
        assert!(!ds.apply_aim());
    }

    #[test]
    fn test_1_hz_cycle() {
        let mut ds = new_ds();
        let mut flags = Vec::new();

        for i in 0..100 {
            ds.cycle_start(50.0, i as f64 * 0.02);
            flags.push(ds.is_1_hz_cycle);
            ds.cycle_end();
        }

        assert_eq!(flags.iter().filter(|&&f| f).count(), 2);
        assert!(flags[0] && flags[50]);
    }

    #[test]
    fn test_aim_drives_joint() {
        use util::module::State;

        let mut ds = new_ds();
        ds.robot_pose_m = Some((3.0, 5.55));
        ds.auto_aim = true;

        for i in 0..200 {
            ds.cycle_start(50.0, i as f64 * 0.02);

            let input = ds.aim_ctrl_input().unwrap();
            let (out, _) = ds.aim_ctrl.proc(&input).unwrap();
            ds.aim_ctrl_output = Some(out);
            ds.apply_aim();

            let (out, rpt) = ds.joint_ctrl.proc(&ds.joint_ctrl_input).unwrap();
            ds.joint_ctrl_output = out;
            ds.joint_ctrl_status_rpt = rpt;

            ds.joint_ctrl.hw_mut().step(0.02);
            ds.cycle_end();
        }

        let arm_angle_deg = ds.aim_ctrl.solution().arm_angle_deg;
        assert!((arm_angle_deg - 38.3044).abs() < 1e-3);
        assert!((ds.joint_ctrl.target_angle_deg() - arm_angle_deg).abs() < 1e-12);
        assert!((ds.joint_ctrl.hw().angle_deg() - arm_angle_deg).abs() < 0.1);
        assert!(ds.joint_ctrl_status_rpt.at_setpoint);
    }
}
