//! # TM Server
//!
//! Telemetry is archived as one CSV row per cycle in the session's archive directory. Telemetry is
//! best effort, the caller should warn on errors and carry on.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use comms_if::eqpt::joint::JointHw;
use util::{
    archive::{ArchiveError, Archiver},
    session::Session,
};

use crate::data_store::DataStore;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    archiver: Archiver,
}

/// Telemetry packet that is output by the server.
#[derive(Debug, Clone, Serialize)]
pub struct TmPacket {
    pub num_cycles: u64,

    pub time_s: f64,

    pub safe: bool,

    pub safe_cause: String,

    pub joint_manual: bool,

    pub joint_faulted: bool,

    pub joint_at_setpoint: bool,

    /// Units: degrees
    pub joint_target_angle_deg: f64,

    /// Units: degrees
    pub joint_abs_angle_deg: f64,

    pub joint_abs_raw: f64,

    pub joint_manual_power: f64,

    pub joint_num_calibs: u64,

    pub joint_config_attempts: u32,

    /// Kind of command issued to the joint this cycle, empty if none.
    pub joint_cmd: String,

    pub auto_aim: bool,

    /// Units: degrees
    pub aim_heading_deg: f64,

    pub aim_feasible: bool,

    /// Units: degrees
    pub aim_arm_angle_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Could not archive telemetry: {0}")]
    ArchiveError(ArchiveError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server, archiving into `tm.csv` in the session's archive
    /// directory.
    pub fn new(session: &Session) -> Result<Self, TmServerError> {
        let archiver =
            Archiver::from_path(session, "tm.csv").map_err(TmServerError::ArchiveError)?;

        Ok(Self { archiver })
    }

    pub fn send<H: JointHw>(&mut self, ds: &DataStore<H>) -> Result<(), TmServerError> {
        let packet = TmPacket::from_datastore(ds);

        self.archiver
            .serialise(packet)
            .map_err(TmServerError::ArchiveError)
    }
}

impl TmPacket {
    pub fn from_datastore<H: JointHw>(ds: &DataStore<H>) -> Self {
        let rpt = &ds.joint_ctrl_status_rpt;
        let solution = ds.aim_ctrl.solution();

        Self {
            num_cycles: ds.num_cycles as u64,
            time_s: ds.time_s,
            safe: ds.safe,
            safe_cause: match ds.safe_cause {
                Some(c) => format!("{:?}", c),
                None => String::new(),
            },
            joint_manual: rpt.manual,
            joint_faulted: rpt.faulted,
            joint_at_setpoint: rpt.at_setpoint,
            joint_target_angle_deg: rpt.target_angle_deg,
            joint_abs_angle_deg: rpt.abs_angle_deg,
            joint_abs_raw: rpt.abs_raw,
            joint_manual_power: rpt.manual_power,
            joint_num_calibs: rpt.num_calibs,
            joint_config_attempts: rpt.config_attempts,
            joint_cmd: match ds.joint_ctrl_output.dems {
                Some(ref d) => String::from(d.kind_str()),
                None => String::new(),
            },
            auto_aim: ds.auto_aim,
            aim_heading_deg: solution.heading_deg,
            aim_feasible: solution.feasible,
            aim_arm_angle_deg: solution.arm_angle_deg,
        }
    }
}
