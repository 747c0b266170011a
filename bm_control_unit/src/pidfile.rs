//! Single-instance PID file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use bm_common::consts::PID_FILE_NAME;
use nix::fcntl::{Flock, FlockArg};
use tracing::{debug, warn};

use crate::error::CoreError;

/// Locked `<rundir>/brickmaster.pid`. Removed on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    lock: Option<Flock<File>>,
}

impl PidFile {
    /// Create, lock and fill the PID file in `rundir`.
    ///
    /// # Errors
    /// - `CoreError::AlreadyRunning` if another process holds the lock
    /// - `CoreError::System` on I/O failures
    pub fn acquire(rundir: &Path) -> Result<Self, CoreError> {
        let path = rundir.join(PID_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let mut lock = Flock::lock(file, FlockArg::LockExclusiveNonblock)
            .map_err(|(_, errno)| CoreError::AlreadyRunning(format!("{}: {errno}", path.display())))?;
        lock.set_len(0)?;
        writeln!(*lock, "{}", std::process::id())?;
        lock.sync_all()?;
        debug!("PID file {} locked", path.display());
        Ok(Self {
            path,
            lock: Some(lock),
        })
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("cannot remove PID file {}: {e}", self.path.display());
        }
        // Unlock after the file is gone so a waiting instance sees a fresh one.
        drop(self.lock.take());
    }
}
