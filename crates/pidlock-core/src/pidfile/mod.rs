//! Pidfile record storage.
//!
//! A pidfile holds the decimal pid of a single process and nothing else:
//! ```text
//! 12345
//! ```
//! Surrounding whitespace is tolerated on read; no trailing newline is written.
//!
//! # Guarantees
//! - Writes are atomic (temp file + rename); readers never see partial content
//! - A failed write leaves the previous pidfile untouched
//! - Nothing is cached; every read goes back to disk

pub mod atomic;

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IoStage, PidfileError, Result};
use crate::pid::{Pid, PidRecord};

pub use atomic::{AtomicFile, DIR_MODE, FILE_MODE, create_parent_dirs, write_atomic};

/// Accessor for the pidfile at a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pidfile {
    path: PathBuf,
}

impl Pidfile {
    /// Create an accessor for `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The configured pidfile path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `pid` to the pidfile, or the caller's pid if `pid` is unset.
    ///
    /// Missing parent directories are created first.
    pub fn write(&self, pid: Pid) -> Result<()> {
        let pid = pid.or_current();

        if let Some(parent) = self.path.parent() {
            create_parent_dirs(parent)
                .map_err(|e| PidfileError::io(IoStage::CreateDir, &self.path, e))?;
        }

        write_atomic(&self.path, pid.to_string().as_bytes())?;
        debug!("Wrote pid {} to {}", pid, self.path.display());
        Ok(())
    }

    /// Read the recorded pid.
    pub fn read(&self) -> Result<Pid> {
        self.read_content().and_then(|content| self.parse(&content))
    }

    /// Read the recorded pid together with the pidfile's modification time.
    ///
    /// Both come from one open handle, so a concurrent replace cannot pair
    /// the pid of one file with the mtime of another.
    pub fn read_record(&self) -> Result<PidRecord> {
        let mut file = File::open(&self.path).map_err(|e| self.map_io(IoStage::Read, e))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| PidfileError::io(IoStage::Read, &self.path, e))?;
        let modified = file
            .metadata()
            .and_then(|meta| meta.modified())
            .map_err(|e| PidfileError::io(IoStage::Metadata, &self.path, e))?;
        let pid = self.parse(&content)?;

        Ok(PidRecord { pid, modified })
    }

    /// Delete the pidfile.
    ///
    /// On failure the pidfile is left in place.
    pub fn remove(&self) -> Result<()> {
        fs::remove_file(&self.path).map_err(|e| self.map_io(IoStage::Remove, e))
    }

    fn read_content(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| self.map_io(IoStage::Read, e))
    }

    fn parse(&self, content: &str) -> Result<Pid> {
        content
            .parse::<Pid>()
            .map_err(|source| PidfileError::Malformed {
                path: self.path.clone(),
                content: content.to_string(),
                source,
            })
    }

    fn map_io(&self, stage: IoStage, e: io::Error) -> PidfileError {
        if e.kind() == io::ErrorKind::NotFound {
            PidfileError::NotFound {
                path: self.path.clone(),
            }
        } else {
            PidfileError::io(stage, &self.path, e)
        }
    }
}
