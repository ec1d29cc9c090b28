//! Advisory single-instance locking with pidfiles.
//!
//! A pidfile records the id of the process that owns some resource. Because
//! pids are recycled, the lock is only considered held while the recorded pid
//! names a process that was already running when the pidfile was written.
//!
//! - [`Pidfile`] reads and atomically writes the raw record
//! - [`PidfileLock`] adds `holder` / `lock` / `unlock` on top of it
//! - [`ports::ProcessTable`] is the OS seam; `pidlock-runtime` implements it

pub mod error;
pub mod lock;
pub mod paths;
pub mod pid;
pub mod pidfile;
pub mod ports;

pub use error::{IoStage, PidfileError, Result};
pub use lock::{LockValidity, PidfileLock, StartedBeforeWrite, started_before_write};
pub use paths::{PathError, RUN_DIR_ENV, default_pidfile_path, pidfile_path_in, run_dir};
pub use pid::{Pid, PidRecord};
pub use pidfile::Pidfile;
pub use ports::{ProcessTable, ProcessTableError, ProcessTableResult, QueryFailure};
