//! Parameters structure for AimCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Aim control.
///
/// Positions are in the field frame, with x along the field length and y across it. The target
/// aperture is at `target_x_m` on both alliances, with its y coordinate mirrored about the field
/// midline for the red alliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- PHYSICS ----
    /// Units: meters/second^2
    pub gravity_ms2: f64,

    /// Speed the game piece leaves the launcher at.
    ///
    /// Units: meters/second
    pub launch_speed_ms: f64,

    // ---- LAUNCHER GEOMETRY ----
    /// Distance from the arm pivot to the launch point.
    ///
    /// Units: meters
    pub arm_length_m: f64,

    /// Distance of the arm pivot behind the robot's reference point.
    ///
    /// Units: meters
    pub pivot_offset_m: f64,

    /// Height of the arm pivot above the floor.
    ///
    /// Units: meters
    pub pivot_height_m: f64,

    // ---- TARGET GEOMETRY ----
    /// Units: meters
    pub target_height_m: f64,

    /// Units: meters
    pub target_x_m: f64,

    /// Lateral coordinate of the blue alliance target.
    ///
    /// Units: meters
    pub target_y_blue_m: f64,

    /// Units: meters
    pub field_width_m: f64,

    // ---- SEARCH ----
    /// Units: degrees
    pub min_angle_deg: f64,

    /// Units: degrees
    pub max_angle_deg: f64,

    /// Number of candidate angles sampled, strictly inside the angle bounds.
    pub num_samples: usize,

    // ---- WARM START ----
    /// Number of launch point relaxation steps per call. A single step relies on successive calls
    /// to converge.
    pub warm_start_iters: usize,

    /// Fraction of the way the launch point guess moves towards each new solution, in `(0, 1]`.
    pub warm_start_relaxation: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a parameter set is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("At least two candidate angles are required, found {0}")]
    TooFewSamples(usize),

    #[error("Angle bounds must satisfy -90 < min < max <= 90, found [{0}, {1}]")]
    InvalidAngleBounds(f64, f64),

    #[error("Parameter {0} must be finite and positive")]
    NotPositive(&'static str),

    #[error("At least one warm start iteration is required")]
    NoWarmStartIters,

    #[error("Warm start relaxation must be in (0, 1], found {0}")]
    InvalidRelaxation(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check that the parameters describe a solvable problem.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.num_samples < 2 {
            return Err(ParamsError::TooFewSamples(self.num_samples));
        }

        if !(self.min_angle_deg > -90.0
            && self.min_angle_deg < self.max_angle_deg
            && self.max_angle_deg <= 90.0)
        {
            return Err(ParamsError::InvalidAngleBounds(
                self.min_angle_deg,
                self.max_angle_deg,
            ));
        }

        for &(name, val) in [
            ("gravity_ms2", self.gravity_ms2),
            ("launch_speed_ms", self.launch_speed_ms),
            ("field_width_m", self.field_width_m),
        ]
        .iter()
        {
            if !val.is_finite() || val <= 0.0 {
                return Err(ParamsError::NotPositive(name));
            }
        }

        if self.warm_start_iters == 0 {
            return Err(ParamsError::NoWarmStartIters);
        }

        if !(self.warm_start_relaxation > 0.0 && self.warm_start_relaxation <= 1.0) {
            return Err(ParamsError::InvalidRelaxation(self.warm_start_relaxation));
        }

        Ok(())
    }

    /// Lateral coordinate of the target for the given alliance.
    ///
    /// Units: meters
    pub fn target_y_m(&self, alliance_is_blue: bool) -> f64 {
        if alliance_is_blue {
            self.target_y_blue_m
        } else {
            self.field_width_m - self.target_y_blue_m
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            gravity_ms2: 9.81,
            launch_speed_ms: 10.0,
            arm_length_m: 0.5,
            pivot_offset_m: 0.2,
            pivot_height_m: 0.3,
            target_height_m: 2.05,
            target_x_m: 0.0,
            target_y_blue_m: 5.55,
            field_width_m: 8.21,
            min_angle_deg: 5.0,
            max_angle_deg: 85.0,
            num_samples: 81,
            warm_start_iters: 1,
            warm_start_relaxation: 1.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Params::default().validate().is_ok());

        let mut p = Params::default();
        p.num_samples = 1;
        assert!(matches!(p.validate(), Err(ParamsError::TooFewSamples(1))));

        let mut p = Params::default();
        p.max_angle_deg = 95.0;
        assert!(matches!(
            p.validate(),
            Err(ParamsError::InvalidAngleBounds(_, _))
        ));

        let mut p = Params::default();
        p.launch_speed_ms = -1.0;
        assert!(matches!(
            p.validate(),
            Err(ParamsError::NotPositive("launch_speed_ms"))
        ));

        let mut p = Params::default();
        p.warm_start_relaxation = 1.5;
        assert!(matches!(
            p.validate(),
            Err(ParamsError::InvalidRelaxation(_))
        ));
    }

    #[test]
    fn test_alliance_mirror() {
        let p = Params::default();
        assert_eq!(p.target_y_m(true), 5.55);
        assert!((p.target_y_m(false) - 2.66).abs() < 1e-9);
    }

    #[test]
    fn test_parse() {
        let p: Params = util::params::from_str(
            r#"
            gravity_ms2 = 9.81
            launch_speed_ms = 12.0
            arm_length_m = 0.5
            pivot_offset_m = 0.2
            pivot_height_m = 0.3
            target_height_m = 2.05
            target_x_m = 0.0
            target_y_blue_m = 5.55
            field_width_m = 8.21
            min_angle_deg = 5.0
            max_angle_deg = 85.0
            num_samples = 41
            warm_start_iters = 2
            warm_start_relaxation = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(p.launch_speed_ms, 12.0);
        assert_eq!(p.num_samples, 41);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_shipped_params() {
        let p: Params = util::params::load_from_path("../params/aim_ctrl.toml").unwrap();

        assert!(p.validate().is_ok());
        assert_eq!(p.num_samples, 81);
    }
}
