//! Joint control modes and the transitions between them

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The control mode of the joint.
///
/// Re-anchoring of the reference pair is a phase at the start of a control
/// cycle rather than a mode of its own, it always completes before that
/// cycle's command is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JointMode {
    /// Closed loop motion profiled control towards the target angle.
    Operational,

    /// Open loop control at the operator's manual power.
    Manual,

    /// The motor could not be configured and has been disabled. Only a
    /// successful reboot leaves this mode.
    Faulted,
}

/// Events which change the joint's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEvent {
    /// The motor controller accepted its configuration.
    ConfigOk,

    /// The motor controller rejected its configuration more times than allowed.
    ConfigFailed,

    /// The operator toggled manual control.
    ToggleManual,

    /// The robot entered safe mode.
    MakeSafe,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointMode {
    /// Get the mode reached from this mode when `event` occurs.
    pub fn transition(self, event: ModeEvent) -> Self {
        use JointMode::*;

        match (self, event) {
            (_, ModeEvent::ConfigFailed) => Faulted,

            // A configured motor always resumes closed loop control
            (_, ModeEvent::ConfigOk) => Operational,

            // Manual is latched while faulted
            (Faulted, _) => Faulted,

            (Operational, ModeEvent::ToggleManual) => Manual,
            (Manual, ModeEvent::ToggleManual) => Operational,

            (_, ModeEvent::MakeSafe) => Manual,
        }
    }

    /// True if the joint is under open loop (or no) control.
    pub fn is_manual(self) -> bool {
        self != JointMode::Operational
    }

    pub fn is_faulted(self) -> bool {
        self == JointMode::Faulted
    }
}
