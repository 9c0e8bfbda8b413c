//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the software root, which
/// contains the `params` directory and is where sessions are created.
pub const SW_ROOT_ENV_VAR: &str = "CTRL_SW_ROOT";

/// Get the software root directory from the environment.
pub fn get_ctrl_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
