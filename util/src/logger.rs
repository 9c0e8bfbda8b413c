//! Logger initialisation
//!
//! Log records go to two sinks: the terminal, with coloured level tags, and the session's log
//! file in plain text. Every line is stamped with the session elapsed time so that the log can be
//! lined up against archived telemetry.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info};
use std::fmt;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target of the simulated plant, which logs every step at trace level.
const SIM_TARGET: &str = "ctrl_lib::sim_joint";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` must be at least `Info`, warnings and errors from the controllers are never
/// filtered. Simulated plant messages are capped at `Debug` unless `Trace` is requested.
///
/// Must only be called once per execution.
pub fn logger_init(
    min_level: self::LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let term = fern::Dispatch::new()
        .format(|out, message, record| {
            let tag = level_tag(record.level());
            out.finish(format_args!(
                "{}",
                LogLine::new(record.level(), &tag, record.target(), message)
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            let tag = level_str(record.level());
            out.finish(format_args!(
                "{}",
                LogLine::new(record.level(), &tag, record.target(), message)
            ))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .level_for(SIM_TARGET, min_level.min(LevelFilter::Debug))
        .chain(term)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE ITEMS
// ---------------------------------------------------------------------------

/// One formatted log line, `[elapsed LVL] target: message`. The target is only shown for debug
/// and trace messages.
struct LogLine<'a, T: fmt::Display, M: fmt::Display> {
    level: log::Level,
    tag: &'a T,
    target: &'a str,
    message: M,
    elapsed_s: f64,
}

impl<'a, T: fmt::Display, M: fmt::Display> LogLine<'a, T, M> {
    fn new(level: log::Level, tag: &'a T, target: &'a str, message: M) -> Self {
        Self {
            level,
            tag,
            target,
            message,
            elapsed_s: session::get_elapsed_seconds(),
        }
    }
}

impl<'a, T: fmt::Display, M: fmt::Display> fmt::Display for LogLine<'a, T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.level > log::Level::Info {
            write!(
                f,
                "[{:10.6} {}] {}: {}",
                self.elapsed_s, self.tag, self.target, self.message
            )
        } else {
            write!(f, "[{:10.6} {}] {}", self.elapsed_s, self.tag, self.message)
        }
    }
}

/// Plain three letter level tag, used in the log file.
fn level_str(level: log::Level) -> &'static str {
    match level {
        log::Level::Trace => "TRC",
        log::Level::Debug => "DBG",
        log::Level::Info => "INF",
        log::Level::Warn => "WRN",
        log::Level::Error => "ERR",
    }
}

/// Coloured level tag, used on the terminal.
fn level_tag(level: log::Level) -> ColoredString {
    let tag = level_str(level);

    match level {
        log::Level::Trace => tag.dimmed().italic(),
        log::Level::Debug => tag.dimmed(),
        log::Level::Info => tag.normal(),
        log::Level::Warn => tag.yellow(),
        log::Level::Error => tag.red().bold(),
    }
}
