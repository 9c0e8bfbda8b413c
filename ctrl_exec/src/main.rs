//! Main control executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Telecommand processing and handling
//!         - Aim control processing
//!         - Coordination, feeding the aim solution into the joint target
//!         - Joint control processing
//!         - Simulated plant update
//!         - Telemetry archiving
//!
//! # Modules
//!
//! All modules (e.g. `joint_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use ctrl_lib::{
    aim_ctrl::AimCtrl,
    data_store::{DataStore, SafeModeCause},
    joint_ctrl::JointCtrl,
    params::CtrlExecParams,
    sim_joint::SimJoint,
    tc_processor,
    tm_server::TmServer,
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Control core executable, running the joint and aim controllers against the simulated joint.
#[derive(Debug, StructOpt)]
#[structopt(name = "ctrl_exec")]
struct Opts {
    /// Path to a TC script to execute.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Stop after this many seconds. Without a duration the executable stops at the end of the
    /// script, or runs forever if there is no script.
    #[structopt(short, long)]
    duration_s: Option<f64>,

    /// Log trace level messages.
    #[structopt(short, long)]
    verbose: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("ctrl_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let log_level = if opts.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Control Core Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let exec_params: CtrlExecParams =
        util::params::load("ctrl_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    let mut script = match opts.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            Some(si)
        }
        None => {
            info!("No script provided, running without TCs\n");
            None
        }
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut joint_ctrl = JointCtrl::new(SimJoint::new(exec_params.sim_joint.clone()));
    joint_ctrl
        .init("joint_ctrl.toml", &session)
        .wrap_err("Failed to initialise JointCtrl")?;
    info!("JointCtrl init complete");

    let mut aim_ctrl = AimCtrl::default();
    aim_ctrl
        .init("aim_ctrl.toml", &session)
        .wrap_err("Failed to initialise AimCtrl")?;
    info!("AimCtrl init complete");

    let mut ds = DataStore::new(joint_ctrl, aim_ctrl);
    ds.alliance_is_blue = exec_params.alliance_is_blue;
    ds.auto_aim = exec_params.auto_aim;

    let mut tm_server = if exec_params.tm_enabled {
        let s = TmServer::new(&session).wrap_err("Failed to initialise TmServer")?;
        info!("TmServer initialised");
        Some(s)
    } else {
        None
    };

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();
        let time_s = session::get_elapsed_seconds();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(exec_params.cycle_frequency_hz(), time_s);

        if let Some(d) = opts.duration_s {
            if time_s >= d {
                info!("Run duration of {:.02} s reached, stopping", d);
                break;
            }
        }

        // ---- TELECOMMAND PROCESSING ----

        if let Some(ref mut si) = script {
            match si.get_pending_tcs(time_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        tc_processor::exec(&mut ds, tc);
                    }
                }
                PendingTcs::EndOfScript => {
                    if opts.duration_s.is_none() {
                        info!("End of TC script reached, stopping");
                        break;
                    }
                }
            }
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        // AimCtrl processing
        if let Some(input) = ds.aim_ctrl_input() {
            match ds.aim_ctrl.proc(&input) {
                Ok((o, r)) => {
                    ds.aim_ctrl_output = Some(o);
                    ds.aim_ctrl_status_rpt = r;
                }
                Err(e) => warn!("Error during AimCtrl processing: {}", e),
            }
        }

        ds.apply_aim();

        // JointCtrl processing
        match ds.joint_ctrl.proc(&ds.joint_ctrl_input) {
            Ok((o, r)) => {
                ds.joint_ctrl_output = o;
                ds.joint_ctrl_status_rpt = r;
            }
            Err(e) => warn!("Error during JointCtrl processing: {}", e),
        };

        if ds.joint_ctrl_status_rpt.faulted {
            if !ds.safe {
                error!("Joint is faulted, reboot the joint to recover");
            }
            ds.make_safe(SafeModeCause::JointFaulted);
        } else {
            ds.make_unsafe(SafeModeCause::JointFaulted).ok();
        }

        // ---- PLANT ----

        ds.joint_ctrl.hw_mut().step(exec_params.cycle_period_s);

        // ---- TELEMETRY ----

        if let Some(ref mut s) = tm_server {
            if let Err(e) = s.send(&ds) {
                warn!("TmServer error: {}", e);
            }
        }

        if ds.is_1_hz_cycle {
            debug!(
                "Joint at {:.2} deg (target {:.2} deg), aim feasible: {}",
                ds.joint_ctrl_status_rpt.abs_angle_deg,
                ds.joint_ctrl_status_rpt.target_angle_deg,
                ds.aim_ctrl.solution().feasible
            );
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        ds.cycle_end();
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}
