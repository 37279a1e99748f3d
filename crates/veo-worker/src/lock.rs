//! Cross-process ownership of the data directory.
//!
//! Every CLI invocation keeps its own in-memory queue and writes it back
//! whole, so only one process may change the saved queue at a time. A `run`
//! holds the lock for its whole duration; `add`, `clear` and `export` hold it
//! while they work and give up with `Busy` when it is taken.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use fd_lock::{RwLock, RwLockWriteGuard};

use crate::error::WorkerResult;

const LOCK_FILE: &str = "queue.lock";

/// Advisory lock file inside the data directory.
pub struct DataDirLock {
    lock: RwLock<File>,
}

impl DataDirLock {
    /// Open (creating if needed) the lock file. Does not take the lock.
    pub fn open(data_dir: &Path) -> WorkerResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(data_dir.join(LOCK_FILE))?;
        Ok(Self {
            lock: RwLock::new(file),
        })
    }

    /// Take the lock without waiting. `None` if another holder has it.
    pub fn try_acquire(&mut self) -> WorkerResult<Option<RwLockWriteGuard<'_, File>>> {
        match self.lock.try_write() {
            Ok(guard) => Ok(Some(guard)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
