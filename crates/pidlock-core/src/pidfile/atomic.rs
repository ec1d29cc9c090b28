//! All-or-nothing file replacement.
//!
//! # Strategy
//! 1. Write to a hidden sibling `.<name>.<pid>.<seq>.tmp` in the target directory
//! 2. `fsync` the temp file
//! 3. `rename` it over the target (atomic on the same filesystem)
//!
//! If the sequence stops before step 3, dropping the [`AtomicFile`] removes
//! the temp file and the target is never touched.

use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

use tracing::{debug, warn};

use crate::error::{IoStage, PidfileError, Result};

/// Distinguishes temp files of concurrent writers within one process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Mode for directories created above the pidfile.
pub const DIR_MODE: u32 = 0o755;

/// Mode for the pidfile itself.
pub const FILE_MODE: u32 = 0o644;

/// Create `dir` and all of its parents. An existing directory is not an error.
pub fn create_parent_dirs(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);

    match builder.create(dir) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        other => other,
    }
}

/// A pending replacement of `target`.
///
/// Nothing is visible at `target` until [`AtomicFile::commit`] succeeds.
#[derive(Debug)]
pub struct AtomicFile {
    target: PathBuf,
    temp_path: PathBuf,
    file: Option<File>,
    done: bool,
}

impl AtomicFile {
    /// Open a temp file next to `target`.
    ///
    /// The parent directory must already exist.
    pub fn create(target: &Path) -> Result<Self> {
        let temp_path = temp_path_for(target)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);

        let file = options
            .open(&temp_path)
            .map_err(|e| PidfileError::io(IoStage::Create, target, e))?;

        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            file: Some(file),
            done: false,
        })
    }

    /// Path of the file that will be replaced.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Append bytes to the pending content.
    pub fn write_all(&mut self, content: &[u8]) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(self.closed_error(IoStage::Write));
        };
        file.write_all(content)
            .map_err(|e| PidfileError::io(IoStage::Write, &self.target, e))
    }

    /// Sync the pending content and move it into place.
    pub fn commit(mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Err(self.closed_error(IoStage::Commit));
        };

        file.sync_all()
            .map_err(|e| PidfileError::io(IoStage::Sync, &self.target, e))?;
        drop(file);

        fs::rename(&self.temp_path, &self.target)
            .map_err(|e| PidfileError::io(IoStage::Commit, &self.target, e))?;

        // The temp path no longer exists; make Drop a no-op.
        self.done = true;

        if let Some(parent) = self.target.parent()
            && let Ok(dir) = File::open(parent)
            && let Err(e) = dir.sync_all()
        {
            debug!("Failed to sync directory {}: {}", parent.display(), e);
        }

        Ok(())
    }

    /// Throw away the pending content, leaving `target` as it was.
    pub fn abort(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        self.file = None;
        if self.done {
            return;
        }
        if let Err(e) = fs::remove_file(&self.temp_path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(
                "Failed to remove temporary pidfile {}: {}",
                self.temp_path.display(),
                e
            );
        }
        self.done = true;
    }

    fn closed_error(&self, stage: IoStage) -> PidfileError {
        PidfileError::io(
            stage,
            &self.target,
            io::Error::other("atomic file already closed"),
        )
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        self.discard();
    }
}

/// Replace `target` with `content` in one visible step.
pub fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let mut file = AtomicFile::create(target)?;
    file.write_all(content)?;
    file.commit()
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let Some(name) = target.file_name() else {
        return Err(PidfileError::io(
            IoStage::Create,
            target,
            io::Error::new(io::ErrorKind::InvalidInput, "pidfile path has no file name"),
        ));
    };

    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(name);
    temp_name.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    Ok(target.with_file_name(temp_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("tmp"))
            .collect()
    }

    #[test]
    fn write_atomic_replaces_existing_content() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.pid");
        fs::write(&target, "old content").unwrap();

        write_atomic(&target, b"123").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "123");
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn abort_leaves_target_untouched() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.pid");
        fs::write(&target, "42").unwrap();

        let mut file = AtomicFile::create(&target).unwrap();
        file.write_all(b"99").unwrap();
        file.abort();

        assert_eq!(fs::read_to_string(&target).unwrap(), "42");
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn drop_without_commit_discards() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.pid");

        {
            let mut file = AtomicFile::create(&target).unwrap();
            file.write_all(b"99").unwrap();
        }

        assert!(!target.exists());
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn create_fails_when_parent_missing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("app.pid");

        let err = AtomicFile::create(&target).unwrap_err();
        assert!(matches!(
            err,
            PidfileError::Io {
                stage: IoStage::Create,
                ..
            }
        ));
    }

    #[test]
    fn temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/run/app/app.pid")).unwrap();
        assert_eq!(temp.parent().unwrap(), Path::new("/run/app"));
        let name = temp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".app.pid."));
        assert!(name.ends_with(".tmp"));
    }

    #[test]
    fn temp_paths_are_unique_per_call() {
        let target = Path::new("/run/app/app.pid");
        assert_ne!(temp_path_for(target).unwrap(), temp_path_for(target).unwrap());
    }

    #[test]
    fn concurrent_writers_never_mix_content() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.pid");

        let handles: Vec<_> = ["1111111111", "2222222222"]
            .into_iter()
            .map(|content| {
                let target = target.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        write_atomic(&target, content.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = fs::read_to_string(&target).unwrap();
        assert!(content == "1111111111" || content == "2222222222", "got {content:?}");
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn create_parent_dirs_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b").join("c");

        create_parent_dirs(&nested).unwrap();
        create_parent_dirs(&nested).unwrap();

        assert!(nested.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn committed_file_has_pidfile_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.pid");
        write_atomic(&target, b"1").unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        // umask can only clear bits
        assert_eq!(mode & !FILE_MODE, 0);
        assert_ne!(mode & 0o600, 0);
    }
}
