//! Implementations for the JointCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, trace};
use serde::Serialize;

// Internal
use super::{
    configure, CalibPolicy, InitError, JointCtrlError, JointMode, ModeEvent, Params,
};
use comms_if::eqpt::joint::{JointDems, JointHw};
use util::{
    maths::{clamp, rem_euclid},
    module::State,
    params,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Joint control module state
pub struct JointCtrl<H: JointHw> {
    params: Params,

    hw: H,

    mode: JointMode,

    /// The last requested angle, always within the mechanical range.
    ///
    /// Units: degrees
    target_angle_deg: f64,

    /// Open loop power used in manual mode.
    manual_power: f64,

    /// Motor position at the last calibration.
    ///
    /// Units: motor rotations
    ref_rel_pos_rot: f64,

    /// Absolute joint angle at the last calibration.
    ///
    /// Units: degrees
    ref_abs_angle_deg: f64,

    /// Time of the last calibration.
    ///
    /// Units: seconds
    last_calib_time_s: f64,

    num_calibs: u64,

    /// Configuration attempts made by the last reboot.
    last_config_attempts: u32,

    report: StatusReport,
}

/// Input data to Joint Control.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Current time.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// New target angle, or `None` to keep the current one.
    ///
    /// Units: degrees
    pub target_angle_deg: Option<f64>,

    /// New manual power, or `None` to keep the current one.
    pub manual_power: Option<f64>,

    /// Toggle manual control on this cycle.
    pub toggle_manual: bool,

    /// Reboot (reconfigure) the motor controller on this cycle.
    pub reboot: bool,

    /// Hold the joint in manual at zero power, applied after any reboot.
    pub make_safe: bool,
}

/// Output from JointCtrl.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutputData {
    /// The command issued to the motor on this cycle, if any.
    pub dems: Option<JointDems>,
}

/// Status report for JointCtrl processing.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub manual: bool,
    pub faulted: bool,
    pub at_setpoint: bool,

    /// Units: degrees
    pub target_angle_deg: f64,

    /// Units: degrees
    pub abs_angle_deg: f64,

    /// Raw absolute encoder reading.
    pub abs_raw: f64,

    pub manual_power: f64,

    /// True if the reference pair was re-anchored on this cycle.
    pub calibrated: bool,

    pub num_calibs: u64,

    pub config_attempts: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<H: JointHw> State for JointCtrl<H> {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = JointCtrlError;

    /// Initialise the JointCtrl module.
    ///
    /// Expected init data is the path to the parameter file. The motor is
    /// configured as part of initialisation, a configuration failure faults
    /// the joint but is not an initialisation error.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data).map_err(InitError::ParamLoadError)?;
        params.validate().map_err(InitError::ParamsInvalid)?;

        self.params = params;
        self.mode = JointMode::Operational;
        self.set_target_angle(self.params.initial_target_deg);

        info!(
            "JointCtrl initialised, calibration policy {:?}",
            self.params.calib_policy
        );

        let time_s = session::get_elapsed_seconds();
        self.reboot(if time_s.is_finite() { time_s } else { 0.0 });

        Ok(())
    }

    /// Perform cyclic processing of Joint Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !input_data.time_s.is_finite() {
            return Err(JointCtrlError::NonFiniteInput("time_s"));
        }
        if let Some(t) = input_data.target_angle_deg {
            if !t.is_finite() {
                return Err(JointCtrlError::NonFiniteInput("target_angle_deg"));
            }
        }
        if let Some(p) = input_data.manual_power {
            if !p.is_finite() {
                return Err(JointCtrlError::NonFiniteInput("manual_power"));
            }
        }

        self.report = StatusReport::default();

        if input_data.reboot {
            self.reboot(input_data.time_s);
        }
        if input_data.toggle_manual {
            self.toggle_manual_mode();
        }
        if let Some(p) = input_data.manual_power {
            self.set_manual_power(p);
        }
        if input_data.make_safe {
            self.make_safe();
        }
        if let Some(t) = input_data.target_angle_deg {
            self.set_target_angle(t);
        }

        let tick = self.tick(input_data.time_s);

        self.report.calibrated = tick.calibrated;
        self.report.manual = self.mode.is_manual();
        self.report.faulted = self.mode.is_faulted();
        self.report.at_setpoint = self.at_setpoint();
        self.report.target_angle_deg = self.target_angle_deg;
        self.report.abs_raw = self.hw.read_abs_pos();
        self.report.abs_angle_deg = self.abs_pos_to_deg(self.report.abs_raw);
        self.report.manual_power = self.manual_power;
        self.report.num_calibs = self.num_calibs;
        self.report.config_attempts = self.last_config_attempts;

        Ok((
            OutputData { dems: tick.dems },
            self.report,
        ))
    }
}

/// Result of one control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    /// True if the reference pair was re-anchored before the command was
    /// computed.
    pub calibrated: bool,

    /// The command issued, `None` if the joint is faulted.
    pub dems: Option<JointDems>,
}

impl<H: JointHw> JointCtrl<H> {
    /// Create a new controller with the default parameters.
    ///
    /// The motor is not configured until the controller is initialised or
    /// rebooted, and no command is issued before then.
    pub fn new(hw: H) -> Self {
        let params = Params::default();
        let target_angle_deg = clamp(
            params.initial_target_deg,
            params.min_angle_deg,
            params.max_angle_deg,
        );

        Self {
            params,
            hw,
            mode: JointMode::Manual,
            target_angle_deg,
            manual_power: 0.0,
            ref_rel_pos_rot: 0.0,
            ref_abs_angle_deg: 0.0,
            last_calib_time_s: 0.0,
            num_calibs: 0,
            last_config_attempts: 0,
            report: StatusReport::default(),
        }
    }

    /// Create a new controller with the given parameters, configuring the
    /// motor immediately.
    pub fn with_params(params: Params, hw: H, time_s: f64) -> Self {
        let mut ctrl = Self::new(hw);
        ctrl.mode = JointMode::Operational;
        ctrl.params = params;
        ctrl.set_target_angle(ctrl.params.initial_target_deg);
        ctrl.reboot(time_s);
        ctrl
    }

    /// Reconfigure the motor controller.
    ///
    /// On success the joint returns to operational control, clearing any
    /// fault or manual mode, and the reference pair is re-anchored.
    /// If every attempt fails the motor is disabled and the joint faulted.
    /// Returns true if the motor was configured.
    pub fn reboot(&mut self, time_s: f64) -> bool {
        let outcome = configure(
            &mut self.hw,
            &self.params.motor_config,
            self.params.max_config_retries,
        );
        self.last_config_attempts = outcome.attempts;

        match outcome.result {
            Ok(()) => {
                self.mode = self.mode.transition(ModeEvent::ConfigOk);
                self.calibrate(time_s);

                info!(
                    "Joint motor configured after {} attempt(s), mode {:?}",
                    outcome.attempts, self.mode
                );
                true
            }
            Err(e) => {
                self.hw.command(JointDems::Disable);
                self.mode = self.mode.transition(ModeEvent::ConfigFailed);

                error!(
                    "Joint motor could not be configured after {} attempts ({}), joint disabled",
                    outcome.attempts, e
                );
                false
            }
        }
    }

    /// Run one control period.
    ///
    /// Re-anchors the reference pair if due, then issues exactly one command
    /// for the current mode. A faulted joint, or one which has never been
    /// configured, is issued nothing.
    pub fn tick(&mut self, time_s: f64) -> TickOutput {
        let mut calibrated = false;

        if self.last_config_attempts == 0 {
            return TickOutput {
                calibrated,
                dems: None,
            };
        }

        if !self.mode.is_faulted()
            && self.params.calib_policy == CalibPolicy::Periodic
            && time_s - self.last_calib_time_s >= self.params.calib_interval_s
        {
            self.calibrate(time_s);
            calibrated = true;
        }

        let dems = match self.mode {
            JointMode::Faulted => None,
            JointMode::Manual => Some(JointDems::OpenLoop {
                power: self.manual_power,
            }),
            JointMode::Operational => {
                self.manual_power = 0.0;
                Some(JointDems::Profiled {
                    target_pos_rot: self.target_pos_rot(),
                    slot: self.params.position_slot,
                })
            }
        };

        if let Some(d) = dems {
            self.hw.command(d);
        }

        trace!("JointCtrl output: {:?}", dems);

        TickOutput { calibrated, dems }
    }

    /// Set the target angle, clamped to the mechanical range.
    pub fn set_target_angle(&mut self, angle_deg: f64) {
        self.target_angle_deg = clamp(
            angle_deg,
            self.params.min_angle_deg,
            self.params.max_angle_deg,
        );
    }

    /// Set the open loop power used in manual mode, clamped to `[-1, 1]`.
    pub fn set_manual_power(&mut self, power: f64) {
        self.manual_power = clamp(power, -1.0, 1.0);
    }

    /// Toggle between manual and automated control. Has no effect while the
    /// joint is faulted.
    pub fn toggle_manual_mode(&mut self) {
        self.mode = self.mode.transition(ModeEvent::ToggleManual);
        debug!("Joint manual mode toggled, now {:?}", self.mode);
    }

    /// Hold the joint still under manual control with zero power.
    pub fn make_safe(&mut self) {
        self.mode = self.mode.transition(ModeEvent::MakeSafe);
        self.manual_power = 0.0;
    }

    /// True if the joint has settled at its target angle.
    ///
    /// Both the tracking error and the motor rate must be within tolerance,
    /// so a joint passing through the target is not at its setpoint.
    pub fn at_setpoint(&mut self) -> bool {
        if self.mode.is_faulted() {
            return false;
        }

        let tol_rot = self.params.deg_to_motor_rot(self.params.setpoint_tol_deg).abs();

        self.hw.read_tracking_error_rot().abs() < tol_rot
            && self.hw.read_rate_rots().abs() < self.params.settled_rate_tol_rots
    }

    /// Read the absolute angle of the joint.
    ///
    /// Units: degrees
    pub fn get_absolute_angle(&mut self) -> f64 {
        let raw = self.hw.read_abs_pos();
        self.abs_pos_to_deg(raw)
    }

    pub fn target_angle_deg(&self) -> f64 {
        self.target_angle_deg
    }

    pub fn manual_power(&self) -> f64 {
        self.manual_power
    }

    pub fn mode(&self) -> JointMode {
        self.mode
    }

    pub fn is_manual(&self) -> bool {
        self.mode.is_manual()
    }

    pub fn is_faulted(&self) -> bool {
        self.mode.is_faulted()
    }

    /// The reference pair as (motor rotations, degrees).
    pub fn reference(&self) -> (f64, f64) {
        (self.ref_rel_pos_rot, self.ref_abs_angle_deg)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Motor position corresponding to the target angle under the current
    /// reference pair.
    ///
    /// Units: motor rotations
    pub fn target_pos_rot(&self) -> f64 {
        self.ref_rel_pos_rot
            + self
                .params
                .deg_to_motor_rot(self.target_angle_deg - self.ref_abs_angle_deg)
    }

    /// Capture a new reference pair from the current sensor readings.
    fn calibrate(&mut self, time_s: f64) {
        self.ref_rel_pos_rot = self.hw.read_rel_pos_rot();
        self.ref_abs_angle_deg = self.get_absolute_angle();
        self.last_calib_time_s = time_s;
        self.num_calibs += 1;

        debug!(
            "Joint re-anchored at {:.4} rot / {:.3} deg",
            self.ref_rel_pos_rot, self.ref_abs_angle_deg
        );
    }

    /// Convert a raw absolute encoder reading into the joint angle.
    fn abs_pos_to_deg(&self, raw: f64) -> f64 {
        // Encoders may report the wrap point as 1.0 or just outside [0, 1)
        let mut pos = rem_euclid(raw, 1.0);
        if pos >= 1.0 {
            pos = 0.0;
        }

        self.params.abs_sign * (pos - self.params.abs_zero_rot) * 360.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim_joint::{SimJoint, SimJointParams};
    use comms_if::eqpt::joint::GainSlot;

    const DT_S: f64 = 0.02;

    fn new_ctrl() -> JointCtrl<SimJoint> {
        JointCtrl::with_params(
            Params::default(),
            SimJoint::new(SimJointParams::default()),
            0.0,
        )
    }

    /// Run the controller and simulation for `n` cycles starting at `t0`,
    /// returning the end time.
    fn run(ctrl: &mut JointCtrl<SimJoint>, t0: f64, n: usize) -> f64 {
        let mut t = t0;
        for _ in 0..n {
            ctrl.tick(t);
            ctrl.hw_mut().step(DT_S);
            t += DT_S;
        }
        t
    }

    #[test]
    fn test_target_clamped() {
        let mut ctrl = new_ctrl();

        for &(req, exp) in [
            (45.0, 45.0),
            (180.0, 180.0),
            (250.0, 180.0),
            (-4.0, -4.0),
            (-30.0, -4.0),
        ]
        .iter()
        {
            ctrl.set_target_angle(req);
            assert_eq!(ctrl.target_angle_deg(), exp);
        }
    }

    #[test]
    fn test_boot_anchors_to_sensors() {
        let ctrl = new_ctrl();

        assert_eq!(ctrl.mode(), JointMode::Operational);
        let (rel, abs) = ctrl.reference();
        assert_eq!(rel, 0.0);
        assert!((abs - 30.0).abs() < 1e-9);
        assert_eq!(ctrl.target_angle_deg(), 50.0);

        // 20 degrees through 288:1 is 16 motor rotations
        assert!((ctrl.target_pos_rot() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_moves_to_setpoint() {
        let mut ctrl = new_ctrl();

        // Moving through the target is not settled
        let t = run(&mut ctrl, 0.0, 1);
        assert!(!ctrl.at_setpoint());

        let t = run(&mut ctrl, t, 99);
        ctrl.tick(t);

        assert!((ctrl.hw().angle_deg() - 50.0).abs() < 0.1);
        assert!((ctrl.get_absolute_angle() - 50.0).abs() < 0.1);
        assert!(ctrl.at_setpoint());
    }

    #[test]
    fn test_single_command_per_tick() {
        let mut ctrl = new_ctrl();
        let n0 = ctrl.hw().cmd_log().len();

        let out = ctrl.tick(0.1);
        assert_eq!(ctrl.hw().cmd_log().len(), n0 + 1);
        assert!(matches!(
            out.dems,
            Some(JointDems::Profiled {
                slot: GainSlot::Position,
                ..
            })
        ));

        ctrl.toggle_manual_mode();
        ctrl.set_manual_power(0.3);
        let out = ctrl.tick(0.2);
        assert_eq!(ctrl.hw().cmd_log().len(), n0 + 2);
        assert_eq!(out.dems, Some(JointDems::OpenLoop { power: 0.3 }));
    }

    #[test]
    fn test_silent_until_configured() {
        let mut ctrl = JointCtrl::new(SimJoint::new(SimJointParams::default()));

        let out = ctrl.tick(0.1);
        assert_eq!(out.dems, None);
        assert!(ctrl.hw().cmd_log().is_empty());

        assert!(ctrl.reboot(0.2));
        let out = ctrl.tick(0.22);
        assert!(matches!(out.dems, Some(JointDems::Profiled { .. })));
        assert_eq!(ctrl.hw().cmd_log().len(), 1);
    }

    #[test]
    fn test_manual_power_zeroed_in_auto() {
        let mut ctrl = new_ctrl();
        ctrl.set_manual_power(1.5);
        assert_eq!(ctrl.manual_power(), 1.0);

        ctrl.tick(0.1);
        assert_eq!(ctrl.manual_power(), 0.0);
    }

    #[test]
    fn test_config_failure_faults_joint() {
        let mut hw = SimJoint::new(SimJointParams::default());
        hw.fail_next_configs(4);
        let mut ctrl = JointCtrl::with_params(Params::default(), hw, 0.0);

        assert!(ctrl.is_faulted());
        assert!(ctrl.is_manual());
        assert_eq!(ctrl.hw().num_config_attempts(), 4);
        assert_eq!(ctrl.hw().last_cmd(), Some(JointDems::Disable));

        // Faulted ticks issue nothing, so disable stays the last command
        ctrl.set_manual_power(0.8);
        ctrl.toggle_manual_mode();
        let out = ctrl.tick(10.0);
        assert_eq!(out.dems, None);
        assert!(!out.calibrated);
        assert!(ctrl.is_faulted());
        assert_eq!(ctrl.hw().last_cmd(), Some(JointDems::Disable));
    }

    #[test]
    fn test_fewer_failures_recover() {
        let mut hw = SimJoint::new(SimJointParams::default());
        hw.fail_next_configs(3);
        let ctrl = JointCtrl::with_params(Params::default(), hw, 0.0);

        assert!(!ctrl.is_faulted());
        assert_eq!(ctrl.mode(), JointMode::Operational);
    }

    #[test]
    fn test_not_at_setpoint_when_faulted() {
        let mut ctrl = new_ctrl();
        let t = run(&mut ctrl, 0.0, 100);
        ctrl.tick(t);
        assert!(ctrl.at_setpoint());

        ctrl.hw_mut().fail_next_configs(10);
        assert!(!ctrl.reboot(t));
        assert!(!ctrl.at_setpoint());
    }

    #[test]
    fn test_reboot_clears_fault() {
        let mut hw = SimJoint::new(SimJointParams::default());
        hw.fail_next_configs(100);
        let mut ctrl = JointCtrl::with_params(Params::default(), hw, 0.0);
        assert!(ctrl.is_faulted());

        ctrl.hw_mut().fail_next_configs(0);
        assert!(ctrl.reboot(1.0));
        assert!(!ctrl.is_faulted());
        assert!(!ctrl.is_manual());

        let out = ctrl.tick(1.02);
        assert!(matches!(out.dems, Some(JointDems::Profiled { .. })));
    }

    #[test]
    fn test_reboot_idempotent() {
        let mut ctrl = new_ctrl();
        ctrl.set_target_angle(72.5);

        assert!(ctrl.reboot(0.5));
        let mode = ctrl.mode();
        let reference = ctrl.reference();

        assert!(ctrl.reboot(0.5));
        assert_eq!(ctrl.mode(), mode);
        assert_eq!(ctrl.reference(), reference);
        assert_eq!(ctrl.target_angle_deg(), 72.5);
        assert!(!ctrl.is_faulted());
    }

    #[test]
    fn test_reboot_leaves_manual() {
        let mut ctrl = new_ctrl();
        ctrl.toggle_manual_mode();
        ctrl.set_manual_power(0.4);
        assert!(ctrl.is_manual());

        assert!(ctrl.reboot(0.5));
        assert_eq!(ctrl.mode(), JointMode::Operational);
        assert!(!ctrl.is_manual());

        let out = ctrl.tick(0.52);
        assert!(matches!(out.dems, Some(JointDems::Profiled { .. })));
        assert_eq!(ctrl.manual_power(), 0.0);
    }

    #[test]
    fn test_proc_holds_safe_after_reboot() {
        let mut ctrl = new_ctrl();
        ctrl.make_safe();

        let (out, rpt) = ctrl
            .proc(&InputData {
                time_s: 0.5,
                reboot: true,
                make_safe: true,
                ..Default::default()
            })
            .unwrap();
        assert!(rpt.manual);
        assert_eq!(out.dems, Some(JointDems::OpenLoop { power: 0.0 }));

        // Without the hold the reboot resumes closed loop control
        let (out, rpt) = ctrl
            .proc(&InputData {
                time_s: 0.52,
                reboot: true,
                ..Default::default()
            })
            .unwrap();
        assert!(!rpt.manual);
        assert!(matches!(out.dems, Some(JointDems::Profiled { .. })));
    }

    #[test]
    fn test_periodic_calibration_corrects_drift() {
        let mut ctrl = new_ctrl();
        run(&mut ctrl, 0.0, 50);
        let before = ctrl.target_pos_rot();

        // Slip the relative sensor without moving the joint
        ctrl.hw_mut().add_rel_drift(5.0);
        let abs_before = ctrl.get_absolute_angle();

        // Before the interval elapses the stale reference is kept
        let out = ctrl.tick(1.5);
        assert!(!out.calibrated);
        assert_eq!(ctrl.target_pos_rot(), before);

        let out = ctrl.tick(2.0);
        assert!(out.calibrated);
        assert!((ctrl.target_pos_rot() - (before + 5.0)).abs() < 1e-6);

        // Re-anchoring does not change the reported angle
        assert_eq!(ctrl.get_absolute_angle(), abs_before);
    }

    #[test]
    fn test_calibration_before_command() {
        let mut ctrl = new_ctrl();
        ctrl.hw_mut().add_rel_drift(3.0);

        let out = ctrl.tick(2.0);
        assert!(out.calibrated);
        match out.dems {
            Some(JointDems::Profiled { target_pos_rot, .. }) => {
                assert!((target_pos_rot - ctrl.target_pos_rot()).abs() < 1e-12);
                assert!((target_pos_rot - 19.0).abs() < 1e-6);
            }
            d => panic!("Expected a profiled command, got {:?}", d),
        }
    }

    #[test]
    fn test_on_boot_policy_never_recalibrates() {
        let mut params = Params::default();
        params.calib_policy = CalibPolicy::OnBoot;
        let mut ctrl =
            JointCtrl::with_params(params, SimJoint::new(SimJointParams::default()), 0.0);

        ctrl.hw_mut().add_rel_drift(5.0);
        let out = ctrl.tick(100.0);
        assert!(!out.calibrated);
        assert_eq!(ctrl.reference().0, 0.0);

        assert!(ctrl.reboot(100.0));
        assert_eq!(ctrl.reference().0, 5.0);
    }

    #[test]
    fn test_abs_angle_wraparound() {
        let ctrl = new_ctrl();

        let a = ctrl.abs_pos_to_deg(0.25);
        assert!((ctrl.abs_pos_to_deg(1.25) - a).abs() < 1e-9);
        assert!((ctrl.abs_pos_to_deg(-0.75) - a).abs() < 1e-9);
        assert_eq!(ctrl.abs_pos_to_deg(1.0), ctrl.abs_pos_to_deg(0.0));
        assert!((ctrl.abs_pos_to_deg(0.6922)).abs() < 1e-9);
    }

    #[test]
    fn test_make_safe() {
        let mut ctrl = new_ctrl();
        ctrl.set_manual_power(0.7);
        ctrl.make_safe();

        let out = ctrl.tick(0.1);
        assert_eq!(out.dems, Some(JointDems::OpenLoop { power: 0.0 }));
    }

    #[test]
    fn test_proc_rejects_non_finite() {
        let mut ctrl = new_ctrl();

        let res = ctrl.proc(&InputData {
            time_s: 0.1,
            target_angle_deg: Some(std::f64::NAN),
            ..Default::default()
        });
        assert!(matches!(
            res,
            Err(JointCtrlError::NonFiniteInput("target_angle_deg"))
        ));

        let (out, rpt) = ctrl
            .proc(&InputData {
                time_s: 0.1,
                target_angle_deg: Some(300.0),
                ..Default::default()
            })
            .unwrap();
        assert!(out.dems.is_some());
        assert_eq!(rpt.target_angle_deg, 180.0);
        assert!(!rpt.faulted);
    }
}
