//! # Telecommand processor module
//!
//! The telecommand processor handles various TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use crate::data_store::{DataStore, SafeModeCause};
use comms_if::{eqpt::joint::JointHw, tc::Tc};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules. While in safe mode only TCs which
/// cannot move the joint are executed, plus `JointReboot` so that a faulted joint can be
/// recovered. Returns true if the TC was executed.
pub fn exec<H: JointHw>(ds: &mut DataStore<H>, tc: &Tc) -> bool {
    if ds.safe && !allowed_in_safe(tc) {
        warn!("{:?} rejected in safe mode", tc);
        return false;
    }

    match *tc {
        Tc::MakeSafe => {
            debug!("Recieved MakeSafe command");
            ds.make_safe(SafeModeCause::MakeSafeTc);
        }
        Tc::MakeUnsafe => {
            debug!("Recieved MakeUnsafe command");
            if ds.make_unsafe(SafeModeCause::MakeSafeTc).is_err() {
                warn!(
                    "Cannot leave safe mode, root cause is {:?}",
                    ds.safe_cause
                );
            }
        }
        Tc::JointReboot => {
            debug!("Recieved JointReboot command");
            ds.joint_ctrl_input.reboot = true;

            // Only a reboot may clear a fault-driven safe mode
            if ds.safe_cause == Some(SafeModeCause::MakeSafeTc) {
                ds.joint_ctrl_input.make_safe = true;
            }
        }
        Tc::JointToggleManual => ds.joint_ctrl_input.toggle_manual = true,
        Tc::JointManualPower(p) => ds.joint_ctrl_input.manual_power = Some(p),
        Tc::JointTarget(t) => ds.joint_ctrl_input.target_angle_deg = Some(t),
        Tc::RobotPose { x_m, y_m } => ds.robot_pose_m = Some((x_m, y_m)),
        Tc::Alliance { blue } => {
            debug!("Alliance set to {}", if blue { "blue" } else { "red" });
            ds.alliance_is_blue = blue;
        }
        Tc::AutoAim(enable) => {
            debug!("Automatic aiming {}", if enable { "enabled" } else { "disabled" });
            ds.auto_aim = enable;
        }
    }

    true
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn allowed_in_safe(tc: &Tc) -> bool {
    matches!(
        tc,
        Tc::MakeSafe
            | Tc::MakeUnsafe
            | Tc::JointReboot
            | Tc::RobotPose { .. }
            | Tc::Alliance { .. }
    )
}
