//! Fault-injecting filesystem for testing recovery paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use avatar_cache::store::mock::{FaultyFs, FsOp};
//!
//! let fs = FaultyFs::new();
//! fs.fail_on(FsOp::Write);
//! // the next write through `fs` returns an error; everything else hits disk
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use tracing::debug;

use super::fs::{FileOps, StdFs};

/// Filesystem operation kinds that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    CreateDir,
    Read,
    Write,
    Rename,
    Remove,
    Metadata,
}

/// Armed failure: which operation, optionally only for one path, how many times.
#[derive(Debug, Clone)]
struct Fault {
    op: FsOp,
    path: Option<PathBuf>,
    remaining: usize,
}

/// A [`FileOps`] that delegates to the real filesystem but fails on demand.
///
/// Every call is recorded so tests can assert the order of protocol steps.
#[derive(Debug, Default)]
pub struct FaultyFs {
    inner: StdFs,
    faults: Mutex<Vec<Fault>>,
    log: Mutex<Vec<(FsOp, PathBuf)>>,
}

impl FaultyFs {
    /// A filesystem with no armed failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call of `op`.
    pub fn fail_on(&self, op: FsOp) {
        self.arm(op, None, 1);
    }

    /// Fail the next call of `op` targeting `path`.
    pub fn fail_on_path(&self, op: FsOp, path: impl Into<PathBuf>) {
        self.arm(op, Some(path.into()), 1);
    }

    /// Fail every call of `op` targeting `path`.
    pub fn always_fail_on_path(&self, op: FsOp, path: impl Into<PathBuf>) {
        self.arm(op, Some(path.into()), usize::MAX);
    }

    /// Remove all armed failures.
    pub fn clear_faults(&self) {
        self.lock_faults().clear();
    }

    /// Operations performed so far, in order.
    pub fn operations(&self) -> Vec<(FsOp, PathBuf)> {
        self.log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn arm(&self, op: FsOp, path: Option<PathBuf>, remaining: usize) {
        self.lock_faults().push(Fault {
            op,
            path,
            remaining,
        });
    }

    fn lock_faults(&self) -> std::sync::MutexGuard<'_, Vec<Fault>> {
        self.faults
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record the call and return an injected error if one is armed for it.
    fn check(&self, op: FsOp, path: &Path) -> io::Result<()> {
        self.log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((op, path.to_path_buf()));

        let mut faults = self.lock_faults();
        let hit = faults
            .iter_mut()
            .find(|f| f.op == op && f.path.as_deref().is_none_or(|p| p == path));
        if let Some(fault) = hit {
            fault.remaining = fault.remaining.saturating_sub(1);
            faults.retain(|f| f.remaining > 0);
            debug!(?op, path = %path.display(), "Injecting filesystem failure");
            return Err(io::Error::other(format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

impl FileOps for FaultyFs {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.check(FsOp::CreateDir, path)?;
        self.inner.create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        self.inner.exists(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.check(FsOp::Read, path)?;
        self.inner.read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.check(FsOp::Write, path)?;
        self.inner.write(path, bytes)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check(FsOp::Rename, from)?;
        self.inner.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.check(FsOp::Remove, path)?;
        self.inner.remove_file(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.check(FsOp::Metadata, path)?;
        self.inner.modified(path)
    }
}
