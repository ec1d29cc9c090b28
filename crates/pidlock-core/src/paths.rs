//! Conventional pidfile locations.
//!
//! Resolution order for the directory:
//! 1. `PIDLOCK_RUN_DIR` environment variable (highest priority)
//! 2. The user runtime directory (e.g., `$XDG_RUNTIME_DIR/pidlock`)
//! 3. The local data directory (e.g., `~/.local/share/pidlock/run`)
//!
//! Directories are not created here; [`crate::Pidfile::write`] does that.

use std::env;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the pidfile directory.
pub const RUN_DIR_ENV: &str = "PIDLOCK_RUN_DIR";

/// Errors that can occur during pidfile path resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// Could not determine any per-user directory.
    #[error("Cannot determine a runtime or data directory")]
    NoRunDir,

    /// An empty name was provided.
    #[error("Pidfile name cannot be empty")]
    EmptyName,

    /// The name would escape the pidfile directory.
    #[error("Pidfile name {0:?} must be a single path component")]
    InvalidName(String),
}

/// Directory pidfiles go in when no explicit path is given.
pub fn run_dir() -> Result<PathBuf, PathError> {
    if let Some(path) = env::var_os(RUN_DIR_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    if let Some(runtime) = dirs::runtime_dir() {
        return Ok(runtime.join("pidlock"));
    }

    dirs::data_local_dir()
        .map(|data| data.join("pidlock").join("run"))
        .ok_or(PathError::NoRunDir)
}

/// `<run_dir>/<name>.pid`.
pub fn default_pidfile_path(name: &str) -> Result<PathBuf, PathError> {
    pidfile_path_in(&run_dir()?, name)
}

/// `<dir>/<name>.pid`, rejecting names that are not a single normal component.
pub fn pidfile_path_in(dir: &Path, name: &str) -> Result<PathBuf, PathError> {
    if name.is_empty() {
        return Err(PathError::EmptyName);
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(dir.join(format!("{name}.pid"))),
        _ => Err(PathError::InvalidName(name.to_string())),
    }
}
