//! Module interfaces
//!
//! The control modules in `ctrl_exec` (`joint_ctrl`, `aim_ctrl`) are driven
//! from the cyclic main loop through the [`State`] trait. A module owns all of
//! its state, including any hardware handle, so several instances can run side
//! by side in one process and tests can drive a module against a simulated
//! plant without touching anything global.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A control module driven once per control cycle.
pub trait State {
    /// Data required during initialisation, the parameter file name for
    /// every module in `ctrl_exec`.
    type InitData;
    /// An error which can occur during initialisation.
    type InitError;

    /// Commands and measurements for one cycle.
    type InputData;
    /// Data produced by one cycle, consumed by other modules or telemetry.
    type OutputData;
    /// A report on the cycle, rebuilt from scratch on every call to `proc`.
    type StatusReport;
    /// An error which can occur during cyclic processing.
    type ProcError;

    /// Initialise the module.
    ///
    /// Loads and validates the module's parameters from `init_data` (a file
    /// under the software root's `params` directory), then brings up any
    /// hardware the module owns. For `JointCtrl` this configures the motor
    /// controller. A hardware fault found here is not an `InitError`: the
    /// module starts in its faulted mode and reports it through the status
    /// report, only bad parameters stop the executable.
    ///
    /// May be called again to reload parameters, which resets the module.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one control cycle.
    ///
    /// Called exactly once per cycle after telecommands have been applied to
    /// `input_data`. Inputs which cannot be acted on (non-finite values) are
    /// rejected with a `ProcError` before any state changes, the module then
    /// issues nothing to its hardware that cycle.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
