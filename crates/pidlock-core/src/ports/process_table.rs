//! Process table port for pid existence and creation-time lookups.
//!
//! # Design Notes
//!
//! - Core owns the trait and error type (pure)
//! - Runtime owns the implementation (signals and the OS process table)
//! - "No such process" is an `Ok(None)`, never an error

use std::time::SystemTime;

use thiserror::Error;

use crate::pid::Pid;

/// Why a process-table query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFailure {
    /// The process exists but we are not allowed to inspect it.
    PermissionDenied,
    /// The process exists but its metadata could not be read.
    Unavailable,
    /// Any other failure reported by the OS.
    Other,
}

/// Errors that can occur while querying the process table.
///
/// A missing process is not an error; see [`ProcessTable::creation_time`].
#[derive(Debug, Error)]
#[error("process table query for pid {pid} failed ({failure:?}): {reason}")]
pub struct ProcessTableError {
    pub pid: Pid,
    pub failure: QueryFailure,
    pub reason: String,
}

impl ProcessTableError {
    pub fn new(pid: Pid, failure: QueryFailure, reason: impl Into<String>) -> Self {
        Self {
            pid,
            failure,
            reason: reason.into(),
        }
    }
}

/// Result type for process table operations.
pub type ProcessTableResult<T> = Result<T, ProcessTableError>;

/// Port for looking up running processes by pid.
///
/// # Example
///
/// ```ignore
/// use pidlock_core::ports::ProcessTable;
///
/// fn is_running(table: &dyn ProcessTable, pid: Pid) -> bool {
///     table.exists(pid).unwrap_or(false)
/// }
/// ```
pub trait ProcessTable: Send + Sync {
    /// Creation time of the process with the given pid.
    ///
    /// Returns `Ok(None)` if no such process exists. Pids `<= 0` must be
    /// reported as not found without consulting the OS.
    fn creation_time(&self, pid: Pid) -> ProcessTableResult<Option<SystemTime>>;

    /// Whether a process with the given pid currently exists.
    fn exists(&self, pid: Pid) -> ProcessTableResult<bool> {
        self.creation_time(pid).map(|created| created.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct SingleProcess {
        pid: Pid,
        created: SystemTime,
    }

    impl ProcessTable for SingleProcess {
        fn creation_time(&self, pid: Pid) -> ProcessTableResult<Option<SystemTime>> {
            Ok((pid == self.pid).then_some(self.created))
        }
    }

    #[test]
    fn exists_follows_creation_time() {
        let table = SingleProcess {
            pid: Pid::from_raw(10),
            created: SystemTime::UNIX_EPOCH + Duration::from_secs(100),
        };

        assert!(table.exists(Pid::from_raw(10)).unwrap());
        assert!(!table.exists(Pid::from_raw(11)).unwrap());
    }

    #[test]
    fn error_message_names_pid() {
        let err = ProcessTableError::new(
            Pid::from_raw(77),
            QueryFailure::PermissionDenied,
            "EPERM",
        );
        let msg = err.to_string();
        assert!(msg.contains("77"));
        assert!(msg.contains("PermissionDenied"));
    }
}
