//! OS adapters for pidlock.
//!
//! Provides [`SystemProcessTable`], the production [`ProcessTable`], and
//! helpers that wire a [`PidfileLock`] to it.

#![deny(unsafe_code)]

pub mod process_table;

use std::path::PathBuf;
use std::sync::Arc;

use pidlock_core::{PathError, PidfileLock, ProcessTable, default_pidfile_path};

pub use process_table::SystemProcessTable;

/// A lock on the pidfile at `path`, validated against the live process table.
pub fn open_lock(path: impl Into<PathBuf>) -> PidfileLock {
    let processes: Arc<dyn ProcessTable> = Arc::new(SystemProcessTable::new());
    PidfileLock::new(path, processes)
}

/// A lock on `<run_dir>/<name>.pid`. See [`pidlock_core::paths`].
pub fn open_named_lock(name: &str) -> Result<PidfileLock, PathError> {
    Ok(open_lock(default_pidfile_path(name)?))
}
