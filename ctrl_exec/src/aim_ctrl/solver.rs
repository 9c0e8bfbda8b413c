//! Ballistic aim solution
//!
//! The solver finds the heading and arm angle which put the game piece through the target. The
//! heading is found analytically from the launch point, the arm angle by sampling the height error
//! at the target over a fixed set of candidate angles and interpolating the first rising zero
//! crossing. Only the rising crossing is accepted, a falling crossing is the high arc which
//! approaches the target from above.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::{lin_map, norm};

use super::Params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Arm angle reported when no feasible angle exists.
pub const INFEASIBLE_ANGLE_DEG: f64 = -1.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A recommended heading and arm angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AimSolution {
    /// Units: degrees
    pub heading_deg: f64,

    /// Units: degrees, `INFEASIBLE_ANGLE_DEG` if not feasible
    pub arm_angle_deg: f64,

    pub feasible: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for AimSolution {
    fn default() -> Self {
        Self {
            heading_deg: 0.0,
            arm_angle_deg: INFEASIBLE_ANGLE_DEG,
            feasible: false,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve for the aim from the robot's position.
///
/// `guess` is the (heading, arm angle) used to place the launch point for the heading calculation,
/// with `None` the robot's reference point is used directly.
pub fn solve_once(
    params: &Params,
    robot_x_m: f64,
    robot_y_m: f64,
    alliance_is_blue: bool,
    guess: Option<(f64, f64)>,
) -> AimSolution {
    let target = [params.target_x_m, params.target_y_m(alliance_is_blue)];

    let provisional = match guess {
        Some((heading_deg, arm_angle_deg)) => {
            launch_point(params, robot_x_m, robot_y_m, arm_angle_deg, heading_deg)
        }
        None => [robot_x_m, robot_y_m],
    };

    let heading_deg = heading_to_target(provisional, target);

    let candidates = candidate_angles(params);
    let errors: Vec<f64> = candidates
        .iter()
        .map(|&a| height_error_m(params, robot_x_m, robot_y_m, a, heading_deg, target))
        .collect();

    for (a, e) in candidates.windows(2).zip(errors.windows(2)) {
        if e[0] < 0.0 && e[1] >= 0.0 {
            return AimSolution {
                heading_deg,
                arm_angle_deg: a[0] + (a[1] - a[0]) * e[0].abs() / (e[0].abs() + e[1].abs()),
                feasible: true,
            };
        }
    }

    AimSolution {
        heading_deg,
        arm_angle_deg: INFEASIBLE_ANGLE_DEG,
        feasible: false,
    }
}

/// Position of the launch point for the given arm angle and heading.
///
/// Units: meters
pub fn launch_point(
    params: &Params,
    robot_x_m: f64,
    robot_y_m: f64,
    arm_angle_deg: f64,
    heading_deg: f64,
) -> [f64; 2] {
    let arm = arm_angle_deg.to_radians();
    let heading = heading_deg.to_radians();
    let reach_m = params.arm_length_m * arm.cos();

    [
        robot_x_m - params.pivot_offset_m + reach_m * heading.cos(),
        robot_y_m + reach_m * heading.sin(),
    ]
}

/// Heading from the launch point to the target.
///
/// Units: degrees
pub fn heading_to_target(launch: [f64; 2], target: [f64; 2]) -> f64 {
    if launch[1] == target[1] {
        return 180.0;
    }

    let bearing_deg = ((launch[0] - target[0]) / (target[1] - launch[1]))
        .atan()
        .to_degrees();

    if launch[1] < target[1] {
        bearing_deg + 90.0
    } else {
        bearing_deg - 90.0
    }
}

/// Height of the game piece relative to the target once it has travelled the horizontal distance
/// to the target. Positive means the piece passes above the target.
///
/// Units: meters
pub fn height_error_m(
    params: &Params,
    robot_x_m: f64,
    robot_y_m: f64,
    arm_angle_deg: f64,
    heading_deg: f64,
    target: [f64; 2],
) -> f64 {
    let launch = launch_point(params, robot_x_m, robot_y_m, arm_angle_deg, heading_deg);
    let range_m = norm(&launch, &target).unwrap_or(0.0);

    let arm = arm_angle_deg.to_radians();
    let launch_height_m = params.pivot_height_m + params.arm_length_m * arm.sin();
    let radial_speed_ms = params.launch_speed_ms * arm.cos();
    let vert_speed_ms = params.launch_speed_ms * arm.sin();

    let flight_time_s = range_m / radial_speed_ms;

    launch_height_m + vert_speed_ms * flight_time_s
        - 0.5 * params.gravity_ms2 * flight_time_s.powi(2)
        - params.target_height_m
}

/// Equally spaced candidate angles strictly inside the angle bounds.
///
/// Units: degrees
pub fn candidate_angles(params: &Params) -> Vec<f64> {
    let n = params.num_samples;
    let span = (0.0, (n + 1) as f64);

    (1..=n)
        .map(|i| {
            lin_map(
                span,
                (params.min_angle_deg, params.max_angle_deg),
                i as f64,
            )
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_heading_branches() {
        assert_eq!(heading_to_target([3.0, 5.55], [0.0, 5.55]), 180.0);

        // Below the target's lateral coordinate the heading is in (90, 180)
        let h = heading_to_target([2.5, 4.0], [0.0, 5.55]);
        assert!(h > 90.0 && h < 180.0);
        assert!((h - (90.0 + (2.5f64 / 1.55).atan().to_degrees())).abs() < 1e-9);

        // And mirrored above it
        let h = heading_to_target([2.5, 7.1], [0.0, 5.55]);
        assert!(h > -180.0 && h < -90.0);
    }

    #[test]
    fn test_candidates_strictly_inside() {
        let p = Params::default();
        let c = candidate_angles(&p);

        assert_eq!(c.len(), 81);
        assert!(c[0] > p.min_angle_deg);
        assert!(c[80] < p.max_angle_deg);

        let step = c[1] - c[0];
        assert!((step - 80.0 / 82.0).abs() < 1e-9);
        assert!(c.windows(2).all(|w| (w[1] - w[0] - step).abs() < 1e-9));
    }

    #[test]
    fn test_solution_hits_target() {
        let p = Params::default();
        let sol = solve_once(&p, 3.0, 5.55, true, None);

        assert!(sol.feasible);
        assert_eq!(sol.heading_deg, 180.0);
        assert!((sol.arm_angle_deg - 38.3044).abs() < 1e-3);

        // Linear interpolation between samples leaves a small residual
        let err = height_error_m(
            &p,
            3.0,
            5.55,
            sol.arm_angle_deg,
            sol.heading_deg,
            [0.0, 5.55],
        );
        assert!(err.abs() < 1e-3);
    }

    #[test]
    fn test_rejects_high_arc() {
        let p = Params::default();
        let sol = solve_once(&p, 3.0, 5.55, true, None);

        // The falling crossing is at a much steeper angle
        let target = [0.0, 5.55];
        let e_low = height_error_m(&p, 3.0, 5.55, sol.arm_angle_deg - 1.0, 180.0, target);
        let e_high = height_error_m(&p, 3.0, 5.55, sol.arm_angle_deg + 1.0, 180.0, target);
        assert!(e_low < 0.0);
        assert!(e_high > 0.0);
        assert!(sol.arm_angle_deg < 45.0);
    }

    #[test]
    fn test_infeasible_when_too_slow() {
        let mut p = Params::default();
        p.launch_speed_ms = 3.0;

        let sol = solve_once(&p, 3.0, 5.55, true, None);
        assert!(!sol.feasible);
        assert_eq!(sol.arm_angle_deg, INFEASIBLE_ANGLE_DEG);
        assert_eq!(sol.heading_deg, 180.0);
    }

    #[test]
    fn test_launch_point_offset() {
        let p = Params::default();

        // Arm pointing straight up leaves only the pivot offset
        let l = launch_point(&p, 3.0, 4.0, 90.0, 123.0);
        assert!((l[0] - 2.8).abs() < 1e-9);
        assert!((l[1] - 4.0).abs() < 1e-9);

        let l = launch_point(&p, 3.0, 4.0, 0.0, 180.0);
        assert!((l[0] - 2.3).abs() < 1e-9);
        assert!((l[1] - 4.0).abs() < 1e-9);
    }
}
