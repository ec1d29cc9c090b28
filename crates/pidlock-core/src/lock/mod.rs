//! Advisory single-instance locking on top of a [`Pidfile`].
//!
//! The lock has no stored state. Every call re-reads the pidfile and
//! re-validates it against the process table:
//! - `UNLOCKED`: no pidfile, or the recorded process is gone or was reused
//! - `LOCKED(pid)`: the recorded process is alive and predates the pidfile
//!
//! This is advisory only. Nothing stops a process that ignores the protocol
//! from overwriting the pidfile, and [`PidfileLock::lock`] is check-then-act.

pub mod validity;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{PidfileError, Result};
use crate::pid::{Pid, PidRecord};
use crate::pidfile::Pidfile;
use crate::ports::ProcessTable;

pub use validity::{LockValidity, StartedBeforeWrite, started_before_write};

/// A pidfile used as a non-blocking, non-reentrant try-lock.
#[derive(Clone)]
pub struct PidfileLock {
    pidfile: Pidfile,
    processes: Arc<dyn ProcessTable>,
    validity: Arc<dyn LockValidity>,
}

impl std::fmt::Debug for PidfileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PidfileLock")
            .field("path", &self.pidfile.path())
            .finish_non_exhaustive()
    }
}

impl PidfileLock {
    /// Create a lock on the pidfile at `path`, validated against `processes`.
    pub fn new(path: impl Into<std::path::PathBuf>, processes: Arc<dyn ProcessTable>) -> Self {
        Self {
            pidfile: Pidfile::new(path),
            processes,
            validity: Arc::new(StartedBeforeWrite),
        }
    }

    /// Replace the default [`StartedBeforeWrite`] check.
    #[must_use]
    pub fn with_validity(mut self, validity: Arc<dyn LockValidity>) -> Self {
        self.validity = validity;
        self
    }

    /// The underlying record accessor.
    pub const fn pidfile(&self) -> &Pidfile {
        &self.pidfile
    }

    /// The pidfile path.
    pub fn path(&self) -> &Path {
        self.pidfile.path()
    }

    /// Write the pidfile without any lock checks. See [`Pidfile::write`].
    pub fn write(&self, pid: Pid) -> Result<()> {
        self.pidfile.write(pid)
    }

    /// Read the pidfile without any lock checks. See [`Pidfile::read`].
    pub fn read(&self) -> Result<Pid> {
        self.pidfile.read()
    }

    /// The pid currently holding the lock, or [`Pid::UNSET`] if nobody does.
    ///
    /// A missing pidfile and a stale one are both reported as unset, not as
    /// errors. Any other read failure, a malformed pidfile, or a process-table
    /// failure is returned.
    pub fn holder(&self) -> Result<Pid> {
        Ok(self.valid_record()?.map_or(Pid::UNSET, |record| record.pid))
    }

    /// Take the lock for `pid` (or the caller if unset).
    ///
    /// Fails with [`PidfileError::AlreadyHeld`] if any valid holder exists,
    /// including `pid` itself. A stale pidfile is overwritten.
    ///
    /// Not atomic: two processes racing here can both see the lock as free
    /// and both write, the later write winning. Callers needing strict mutual
    /// exclusion should not rely on this lock.
    pub fn lock(&self, pid: Pid) -> Result<()> {
        let pid = pid.or_current();

        let holder = self.holder()?;
        if holder.is_set() {
            debug!(
                "Lock {} requested by {} but held by {}",
                self.path().display(),
                pid,
                holder
            );
            return Err(PidfileError::AlreadyHeld {
                path: self.path().to_path_buf(),
                holder,
            });
        }

        if self.path().exists() {
            warn!("Overwriting stale pidfile {}", self.path().display());
        }

        self.pidfile.write(pid)?;
        info!("Lock {} acquired by pid {}", self.path().display(), pid);
        Ok(())
    }

    /// Release the lock held by `pid` (or the caller if unset).
    ///
    /// Fails with [`PidfileError::NotFound`] if there is no pidfile or it is
    /// stale; a stale pidfile is left in place. Fails with
    /// [`PidfileError::OwnershipMismatch`] if someone else holds the lock.
    pub fn unlock(&self, pid: Pid) -> Result<()> {
        let pid = pid.or_current();

        let Some(record) = self.valid_record()? else {
            return Err(PidfileError::NotFound {
                path: self.path().to_path_buf(),
            });
        };

        if record.pid != pid {
            return Err(PidfileError::OwnershipMismatch {
                path: self.path().to_path_buf(),
                holder: record.pid,
                requested: pid,
            });
        }

        self.pidfile.remove()?;
        info!("Lock {} released by pid {}", self.path().display(), pid);
        Ok(())
    }

    /// Read the pidfile and return it only if its holder is still valid.
    fn valid_record(&self) -> Result<Option<PidRecord>> {
        let record = match self.pidfile.read_record() {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                debug!("No pidfile at {}", self.path().display());
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if record.pid.as_raw() <= 0 {
            debug!(
                "Pidfile {} records non-positive pid {}",
                self.path().display(),
                record.pid
            );
            return Ok(None);
        }

        let valid = self.validity.is_valid(&record, self.processes.as_ref())?;
        Ok(valid.then_some(record))
    }
}
