//! Deciding whether a pidfile still belongs to the process that wrote it.
//!
//! Pids get recycled, so a bare "is this pid running?" check cannot tell the
//! original writer from an unrelated process that later got the same id. The
//! default strategy compares the recorded process's creation time with the
//! pidfile's mtime: the writer must have existed before it wrote the file.
//!
//! This is a heuristic. It trusts the wall clock and the filesystem's mtime.
//! Process creation times are only known to whole-second precision on most
//! platforms, so they are truncated before comparing.

use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::pid::PidRecord;
use crate::ports::{ProcessTable, ProcessTableResult};

/// Strategy for checking a pidfile record against the process table.
pub trait LockValidity: Send + Sync {
    /// `Ok(false)` covers both "process gone" and "pid reused".
    fn is_valid(&self, record: &PidRecord, table: &dyn ProcessTable) -> ProcessTableResult<bool>;
}

/// Valid iff the recorded process exists and was created before the pidfile
/// was last modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartedBeforeWrite;

impl LockValidity for StartedBeforeWrite {
    fn is_valid(&self, record: &PidRecord, table: &dyn ProcessTable) -> ProcessTableResult<bool> {
        let Some(created) = table.creation_time(record.pid)? else {
            debug!("Pid {} is not running", record.pid);
            return Ok(false);
        };

        let valid = started_before_write(created, record.modified);
        if !valid {
            debug!(
                "Pid {} was created after its pidfile was written; treating as reused",
                record.pid
            );
        }
        Ok(valid)
    }
}

/// `true` iff `process_created` (truncated to whole seconds) is strictly
/// earlier than `pidfile_modified`.
pub fn started_before_write(process_created: SystemTime, pidfile_modified: SystemTime) -> bool {
    truncate_to_secs(process_created) < pidfile_modified
}

fn truncate_to_secs(t: SystemTime) -> SystemTime {
    match t.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(since) => SystemTime::UNIX_EPOCH + Duration::from_secs(since.as_secs()),
        Err(_) => t,
    }
}
