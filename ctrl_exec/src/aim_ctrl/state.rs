//! Implementations for the AimCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace};
use serde::Serialize;

// Internal
use super::{solve_once, AimCtrlError, AimSolution, InitError, Params};
use util::{maths::get_ang_dist_deg, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Aim control module state
#[derive(Debug, Default)]
pub struct AimCtrl {
    params: Params,

    /// The solution from the previous call.
    prev_solution: AimSolution,

    /// Relaxed (heading, arm angle) guess placing the launch point on the next call, `None` after
    /// an infeasible call.
    ///
    /// Units: degrees
    warm_guess: Option<(f64, f64)>,

    report: StatusReport,
}

/// Input data to Aim Control.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Units: meters
    pub robot_x_m: f64,

    /// Units: meters
    pub robot_y_m: f64,

    pub alliance_is_blue: bool,
}

/// Output from AimCtrl.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutputData {
    pub solution: AimSolution,
}

/// Status report for AimCtrl processing.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    /// True if the previous solution was used to place the launch point.
    pub warm_started: bool,

    /// True if feasibility changed on this cycle.
    pub feasibility_changed: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for AimCtrl {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = AimCtrlError;

    /// Initialise the AimCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data).map_err(InitError::ParamLoadError)?;
        params.validate().map_err(InitError::ParamsInvalid)?;

        info!(
            "AimCtrl initialised with {} candidate angles in [{}, {}] deg",
            params.num_samples, params.min_angle_deg, params.max_angle_deg
        );

        *self = Self::with_params(params);

        Ok(())
    }

    /// Perform cyclic processing of Aim Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !(input_data.robot_x_m.is_finite() && input_data.robot_y_m.is_finite()) {
            return Err(AimCtrlError::NonFinitePose(
                input_data.robot_x_m,
                input_data.robot_y_m,
            ));
        }

        let solution = self.compute_aim(
            input_data.robot_x_m,
            input_data.robot_y_m,
            input_data.alliance_is_blue,
        );

        Ok((OutputData { solution }, self.report))
    }
}

impl AimCtrl {
    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            prev_solution: AimSolution::default(),
            warm_guess: None,
            report: StatusReport::default(),
        }
    }

    /// Compute the heading and arm angle to hit the target from the given robot position.
    ///
    /// If the previous call was feasible the relaxed guess it left behind places the launch point,
    /// otherwise the robot's reference point is used. The guess is relaxed towards each new
    /// solution, `warm_start_iters` times per call, and carried over to the next call.
    pub fn compute_aim(
        &mut self,
        robot_x_m: f64,
        robot_y_m: f64,
        alliance_is_blue: bool,
    ) -> AimSolution {
        let alpha = self.params.warm_start_relaxation;

        let mut guess = self.warm_guess;

        self.report = StatusReport {
            warm_started: guess.is_some(),
            feasibility_changed: false,
        };

        let mut solution = AimSolution::default();

        for _ in 0..self.params.warm_start_iters.max(1) {
            solution = solve_once(&self.params, robot_x_m, robot_y_m, alliance_is_blue, guess);

            if !solution.feasible {
                break;
            }

            guess = Some(match guess {
                Some((heading_deg, arm_angle_deg)) => (
                    heading_deg - alpha * get_ang_dist_deg(heading_deg, solution.heading_deg),
                    arm_angle_deg + alpha * (solution.arm_angle_deg - arm_angle_deg),
                ),
                None => (solution.heading_deg, solution.arm_angle_deg),
            });
        }

        self.warm_guess = if solution.feasible { guess } else { None };

        if solution.feasible != self.prev_solution.feasible {
            self.report.feasibility_changed = true;
            debug!(
                "Aim is now {} from ({:.3}, {:.3})",
                if solution.feasible {
                    "feasible"
                } else {
                    "infeasible"
                },
                robot_x_m,
                robot_y_m
            );
        }

        trace!("AimCtrl output: {:?}", solution);

        self.prev_solution = solution;

        solution
    }

    /// The most recent solution.
    pub fn solution(&self) -> AimSolution {
        self.prev_solution
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::aim_ctrl::INFEASIBLE_ANGLE_DEG;

    const CONVERGED_HEADING_DEG: f64 = 146.0234;
    const CONVERGED_ARM_DEG: f64 = 38.4718;

    #[test]
    fn test_initial_state() {
        let ctrl = AimCtrl::with_params(Params::default());
        let sol = ctrl.solution();

        assert!(!sol.feasible);
        assert_eq!(sol.arm_angle_deg, INFEASIBLE_ANGLE_DEG);
    }

    #[test]
    fn test_converges_over_calls() {
        let mut ctrl = AimCtrl::with_params(Params::default());

        // With no warm start the launch point is the robot's reference point
        let first = ctrl.compute_aim(2.5, 4.0, true);
        assert!(first.feasible);
        assert!((first.heading_deg - (90.0 + (2.5f64 / 1.55).atan().to_degrees())).abs() < 1e-9);

        let mut prev = first;
        let mut sol = first;
        for _ in 0..10 {
            prev = sol;
            sol = ctrl.compute_aim(2.5, 4.0, true);
        }

        assert!((sol.heading_deg - prev.heading_deg).abs() < 1e-3);
        assert!((sol.heading_deg - CONVERGED_HEADING_DEG).abs() < 1e-2);
        assert!((sol.arm_angle_deg - CONVERGED_ARM_DEG).abs() < 1e-3);
        assert!(ctrl.report.warm_started);
    }

    #[test]
    fn test_warm_start_iterations() {
        let mut p = Params::default();
        p.warm_start_iters = 3;

        // Three steps in one call match three single step calls
        let mut multi = AimCtrl::with_params(p);
        let mut single = AimCtrl::with_params(Params::default());

        let m = multi.compute_aim(2.5, 4.0, true);
        let mut s = AimSolution::default();
        for _ in 0..3 {
            s = single.compute_aim(2.5, 4.0, true);
        }

        assert!((m.heading_deg - s.heading_deg).abs() < 1e-9);
        assert!((m.arm_angle_deg - s.arm_angle_deg).abs() < 1e-9);
    }

    #[test]
    fn test_relaxed_warm_start() {
        let mut p = Params::default();
        p.warm_start_iters = 8;
        p.warm_start_relaxation = 0.5;

        let mut ctrl = AimCtrl::with_params(p);
        let sol = ctrl.compute_aim(2.5, 4.0, true);

        assert!(sol.feasible);
        assert!((sol.heading_deg - CONVERGED_HEADING_DEG).abs() < 1e-2);
    }

    #[test]
    fn test_relaxation_carries_across_calls() {
        let mut p = Params::default();
        p.warm_start_relaxation = 0.1;

        let mut damped = AimCtrl::with_params(p);
        let mut undamped = AimCtrl::with_params(Params::default());

        // The first two calls see the same guess, the damped guess then lags behind
        let mut d = AimSolution::default();
        let mut u = AimSolution::default();
        for _ in 0..3 {
            d = damped.compute_aim(2.5, 4.0, true);
            u = undamped.compute_aim(2.5, 4.0, true);
        }
        assert!(d.feasible && u.feasible);
        assert!((d.heading_deg - u.heading_deg).abs() > 1e-3);

        // Both settle on the same fixed point
        for _ in 0..300 {
            d = damped.compute_aim(2.5, 4.0, true);
            u = undamped.compute_aim(2.5, 4.0, true);
        }
        assert!((d.heading_deg - u.heading_deg).abs() < 1e-6);
        assert!((d.arm_angle_deg - u.arm_angle_deg).abs() < 1e-6);
        assert!((d.heading_deg - CONVERGED_HEADING_DEG).abs() < 1e-2);
    }

    #[test]
    fn test_infeasible_resets_warm_start() {
        let mut ctrl = AimCtrl::with_params(Params::default());

        ctrl.compute_aim(2.5, 4.0, true);
        let far = ctrl.compute_aim(12.0, 5.55, true);
        assert!(!far.feasible);
        assert_eq!(far.arm_angle_deg, INFEASIBLE_ANGLE_DEG);
        assert!(ctrl.report.feasibility_changed);

        let again = ctrl.compute_aim(2.5, 4.0, true);
        assert!(!ctrl.report.warm_started);
        assert!((again.heading_deg - (90.0 + (2.5f64 / 1.55).atan().to_degrees())).abs() < 1e-9);
    }

    #[test]
    fn test_alliance_mirror() {
        let mut blue = AimCtrl::with_params(Params::default());
        let mut red = AimCtrl::with_params(Params::default());

        let b = blue.compute_aim(2.5, 4.0, true);
        let r = red.compute_aim(2.5, 8.21 - 4.0, false);

        assert!(r.feasible);
        assert!((b.heading_deg + r.heading_deg).abs() < 1e-6);
        assert!((b.arm_angle_deg - r.arm_angle_deg).abs() < 1e-6);

        let on_line = red.compute_aim(3.0, 8.21 - 5.55, false);
        assert!(on_line.feasible);
    }

    #[test]
    fn test_proc_rejects_non_finite_pose() {
        let mut ctrl = AimCtrl::with_params(Params::default());

        let res = ctrl.proc(&InputData {
            robot_x_m: std::f64::INFINITY,
            robot_y_m: 4.0,
            alliance_is_blue: true,
        });
        assert!(matches!(res, Err(AimCtrlError::NonFinitePose(_, _))));
        assert!(!ctrl.solution().feasible);

        let (out, _) = ctrl
            .proc(&InputData {
                robot_x_m: 3.0,
                robot_y_m: 5.55,
                alliance_is_blue: true,
            })
            .unwrap();
        assert!(out.solution.feasible);
        assert_eq!(out.solution.heading_deg, 180.0);
    }
}
