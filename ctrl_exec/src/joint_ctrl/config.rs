//! Motor controller configuration protocol

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::joint::{HwError, JointHw, MotorConfig};
use log::warn;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The result of configuring the motor controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOutcome {
    /// Number of attempts made, including the successful one.
    pub attempts: u32,

    /// `Ok` if the configuration was applied, or the error from the last
    /// attempt.
    pub result: Result<(), HwError>,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply `config` to the motor controller, retrying up to `max_retries`
/// times after the first failure.
///
/// Applying a configuration is idempotent so this may be called at any time,
/// including while the joint is moving.
pub fn configure<H: JointHw>(hw: &mut H, config: &MotorConfig, max_retries: u32) -> ConfigOutcome {
    let mut attempts = 0;

    loop {
        attempts += 1;

        match hw.apply_config(config) {
            Ok(()) => {
                return ConfigOutcome {
                    attempts,
                    result: Ok(()),
                }
            }
            Err(e) => {
                warn!(
                    "Motor configuration attempt {}/{} failed: {}",
                    attempts,
                    max_retries.saturating_add(1),
                    e
                );

                if attempts > max_retries {
                    return ConfigOutcome {
                        attempts,
                        result: Err(e),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim_joint::{SimJoint, SimJointParams};

    #[test]
    fn test_configure_retries() {
        let mut hw = SimJoint::new(SimJointParams::default());
        hw.fail_next_configs(2);

        let outcome = configure(&mut hw, &MotorConfig::default(), 3);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.result.is_ok());
        assert_eq!(hw.config(), Some(&MotorConfig::default()));
    }

    #[test]
    fn test_configure_gives_up() {
        let mut hw = SimJoint::new(SimJointParams::default());
        hw.fail_next_configs(10);

        let outcome = configure(&mut hw, &MotorConfig::default(), 3);
        assert_eq!(outcome.attempts, 4);
        assert!(outcome.result.is_err());
        assert_eq!(hw.num_config_attempts(), 4);
        assert_eq!(hw.config(), None);
    }
}
