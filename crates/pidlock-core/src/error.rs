//! Error types for pidfile and lock operations.
//!
//! Low-level I/O and parse failures carry the path and the stage that failed.
//! Only "pidfile absent" and "holder not running" are normal outcomes, and
//! only at the `holder` layer; everything else surfaces here.

use std::fmt;
use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use crate::pid::Pid;
use crate::ports::ProcessTableError;

/// The filesystem step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStage {
    CreateDir,
    Create,
    Write,
    Sync,
    Commit,
    Read,
    Metadata,
    Remove,
}

impl fmt::Display for IoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreateDir => "failed to create parent directories of pidfile",
            Self::Create => "failed to open pidfile for writing",
            Self::Write => "failed to write pid to pidfile",
            Self::Sync => "failed to sync pidfile",
            Self::Commit => "failed to commit pidfile",
            Self::Read => "failed to read pidfile",
            Self::Metadata => "failed to stat pidfile",
            Self::Remove => "failed to remove pidfile",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while reading, writing, or locking a pidfile.
#[derive(Debug, Error)]
pub enum PidfileError {
    /// The pidfile does not exist (or holds no valid lock, for `unlock`).
    #[error("pidfile {} does not exist", .path.display())]
    NotFound { path: PathBuf },

    /// The pidfile content is not a decimal integer.
    #[error("failed to parse pid from pidfile {}: {content:?}", .path.display())]
    Malformed {
        path: PathBuf,
        content: String,
        #[source]
        source: ParseIntError,
    },

    /// `lock` found a live holder.
    #[error("pidfile {} is already held by pid {holder}", .path.display())]
    AlreadyHeld { path: PathBuf, holder: Pid },

    /// `unlock` was asked to release a lock held by someone else.
    #[error(
        "pidfile {} is held by {holder}; lock cannot be released by {requested}",
        .path.display()
    )]
    OwnershipMismatch {
        path: PathBuf,
        holder: Pid,
        requested: Pid,
    },

    /// A filesystem operation failed.
    #[error("{stage}: {}", .path.display())]
    Io {
        stage: IoStage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The process table could not answer for a reason other than "not found".
    #[error("failed to validate lock: {0}")]
    ProcessQuery(#[from] ProcessTableError),
}

impl PidfileError {
    pub(crate) fn io(stage: IoStage, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            stage,
            path: path.into(),
            source,
        }
    }

    /// Whether this is the "pidfile absent" class of error.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for pidfile operations.
pub type Result<T> = std::result::Result<T, PidfileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::QueryFailure;

    #[test]
    fn io_error_names_stage_and_path() {
        let err = PidfileError::io(
            IoStage::CreateDir,
            "/run/app/app.pid",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(
            err.to_string(),
            "failed to create parent directories of pidfile: /run/app/app.pid"
        );
    }

    #[test]
    fn ownership_mismatch_names_both_pids() {
        let err = PidfileError::OwnershipMismatch {
            path: PathBuf::from("x.pid"),
            holder: Pid::from_raw(1),
            requested: Pid::from_raw(2),
        };
        assert_eq!(
            err.to_string(),
            "pidfile x.pid is held by 1; lock cannot be released by 2"
        );
    }

    #[test]
    fn only_not_found_is_not_found() {
        assert!(
            PidfileError::NotFound {
                path: PathBuf::from("x.pid")
            }
            .is_not_found()
        );
        let query = ProcessTableError::new(Pid::from_raw(3), QueryFailure::Other, "boom");
        assert!(!PidfileError::from(query).is_not_found());
    }
}
