//! Host platform (linux for example) utility functions

use std::{env, path::PathBuf};

/// Name of the environment variable which points at the software root.
pub const SW_ROOT_ENV_VAR: &str = "DEIMOS_SW_ROOT";

/// Get the root directory of the software installation.
///
/// The root is read from the `DEIMOS_SW_ROOT` environment variable, and is
/// the directory which holds `params` and `sessions`.
pub fn get_deimos_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
