//! Process table backed by the operating system.
//!
//! # Platform behavior
//! - **Unix**: existence via `kill(pid, 0)`, which tells "no such process"
//!   (`ESRCH`) apart from "exists but not ours" (`EPERM`)
//! - **All**: creation time via `sysinfo`, whole-second precision

use std::time::{Duration, SystemTime};

use pidlock_core::{Pid, ProcessTable, ProcessTableError, ProcessTableResult, QueryFailure};
use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

/// Default implementation of [`ProcessTable`].
///
/// Stateless; every query takes a fresh snapshot of the one process asked
/// about.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    /// Create a new system process table.
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessTable for SystemProcessTable {
    fn creation_time(&self, pid: Pid) -> ProcessTableResult<Option<SystemTime>> {
        if !self.exists(pid)? {
            return Ok(None);
        }

        match start_time(pid) {
            Some(secs) => Ok(Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))),
            // Exited between the two lookups
            None if !self.exists(pid)? => Ok(None),
            None => Err(ProcessTableError::new(
                pid,
                QueryFailure::Unavailable,
                "process exists but its start time could not be read",
            )),
        }
    }

    fn exists(&self, pid: Pid) -> ProcessTableResult<bool> {
        if pid.as_raw() <= 0 {
            return Ok(false);
        }
        probe(pid)
    }
}

#[allow(clippy::cast_sign_loss)] // callers reject pid <= 0
fn to_sysinfo(pid: Pid) -> sysinfo::Pid {
    sysinfo::Pid::from_u32(pid.as_raw() as u32)
}

/// Start time in seconds since the epoch, if the process could be read.
fn start_time(pid: Pid) -> Option<u64> {
    let target = to_sysinfo(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

    let secs = system.process(target)?.start_time();
    debug!("Pid {} started at {}s since epoch", pid, secs);
    (secs > 0).then_some(secs)
}

#[cfg(unix)]
fn probe(pid: Pid) -> ProcessTableResult<bool> {
    use nix::errno::Errno;
    use nix::sys::signal;

    // Signal None is a special "null signal" that checks if we can signal the process
    match signal::kill(nix::unistd::Pid::from_raw(pid.as_raw()), None) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(Errno::EPERM) => Ok(true), // Process exists but we lack permission
        Err(e) => Err(ProcessTableError::new(pid, QueryFailure::Other, e.desc())),
    }
}

#[cfg(not(unix))]
fn probe(pid: Pid) -> ProcessTableResult<bool> {
    let target = to_sysinfo(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    Ok(system.process(target).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_exists() {
        let table = SystemProcessTable::new();
        assert!(table.exists(Pid::current()).unwrap());
    }

    #[test]
    fn impossible_pid_does_not_exist() {
        let table = SystemProcessTable::new();
        // Above the Linux pid_max ceiling of 2^22
        let pid = Pid::from_raw(999_999_999);
        assert!(!table.exists(pid).unwrap());
        assert_eq!(table.creation_time(pid).unwrap(), None);
    }

    #[test]
    fn non_positive_pids_are_never_queried() {
        let table = SystemProcessTable::new();
        for raw in [0, -1, i32::MIN] {
            assert!(!table.exists(Pid::from_raw(raw)).unwrap());
            assert_eq!(table.creation_time(Pid::from_raw(raw)).unwrap(), None);
        }
    }

    #[test]
    fn current_process_started_in_the_past() {
        let table = SystemProcessTable::new();
        let created = table
            .creation_time(Pid::current())
            .unwrap()
            .expect("current process should have a start time");
        assert!(created <= SystemTime::now());
    }
}
