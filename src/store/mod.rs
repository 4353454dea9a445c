//! Avatar storage engine.
//!
//! Persists one PNG avatar per user with atomic-replace-with-backup
//! semantics. A save moves the current avatar aside, writes the new one,
//! then drops the backup; if anything fails after the move, the backup is
//! renamed back so the previous avatar survives.
//!
//! All operations for a given user are serialized through [`KeyedLocks`].

mod fs;
mod lock;
pub mod mock;

pub use fs::{FileOps, StdFs};
pub use lock::KeyedLocks;

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::{AvatarError, Result};
use crate::normalize::{self, decode_canonical};
use crate::paths::{AvatarLocation, UserId};
use crate::session::SessionContext;

/// Result of a successful save.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    /// Where the avatar was written.
    pub location: AvatarLocation,
    /// Size of the stored PNG.
    pub bytes_written: usize,
    /// Whether the source was converted to PNG.
    pub reencoded: bool,
    /// Whether a previous avatar was replaced.
    pub replaced_previous: bool,
}

/// Metadata about a stored avatar.
#[derive(Debug, Clone, Serialize)]
pub struct AvatarInfo {
    /// File locations.
    pub location: AvatarLocation,
    /// Size of the stored PNG.
    pub size_bytes: usize,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Hex SHA-256 of the stored bytes.
    pub sha256: String,
    /// Last modification time, if the filesystem reports one.
    pub modified: Option<DateTime<Utc>>,
}

/// A validated avatar as read from disk.
struct Stored {
    bytes: Vec<u8>,
    image: DynamicImage,
    modified: Option<DateTime<Utc>>,
}

/// Local file-backed avatar cache.
#[derive(Debug)]
pub struct AvatarStore<F: FileOps = StdFs> {
    root: PathBuf,
    fs: F,
    locks: KeyedLocks,
}

impl AvatarStore<StdFs> {
    /// Open a store rooted at `root` on the real filesystem.
    ///
    /// Nothing is created until the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_fs(root, StdFs)
    }
}

impl<F: FileOps> AvatarStore<F> {
    /// Open a store with a custom filesystem implementation.
    pub fn with_fs(root: impl Into<PathBuf>, fs: F) -> Self {
        Self {
            root: root.into(),
            fs,
            locks: KeyedLocks::new(),
        }
    }

    /// Application data root this store writes below.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The filesystem implementation in use.
    pub const fn file_ops(&self) -> &F {
        &self.fs
    }

    /// Paths used for `user_id`.
    pub fn location(&self, user_id: &UserId) -> AvatarLocation {
        AvatarLocation::new(&self.root, user_id)
    }

    /// Load the stored avatar bytes.
    ///
    /// Returns `Ok(None)` when no avatar exists. Callers should treat a
    /// `ReadError` like absence when rendering.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub fn load(&self, user_id: &UserId) -> Result<Option<Vec<u8>>> {
        Ok(self.load_stored(user_id)?.map(|stored| stored.bytes))
    }

    /// Load and decode the stored avatar for rendering.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub fn load_image(&self, user_id: &UserId) -> Result<Option<DynamicImage>> {
        Ok(self.load_stored(user_id)?.map(|stored| stored.image))
    }

    /// Metadata about the stored avatar, if any.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub fn info(&self, user_id: &UserId) -> Result<Option<AvatarInfo>> {
        Ok(self.load_with_info(user_id)?.map(|(_, info)| info))
    }

    /// Stored bytes together with their metadata, read in a single pass.
    ///
    /// The digest and timestamp always describe the returned bytes.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub fn load_with_info(&self, user_id: &UserId) -> Result<Option<(Vec<u8>, AvatarInfo)>> {
        let location = self.location(user_id);
        let Some(stored) = self.load_stored(user_id)? else {
            return Ok(None);
        };

        let (width, height) = stored.image.dimensions();
        let info = AvatarInfo {
            size_bytes: stored.bytes.len(),
            width,
            height,
            sha256: hex::encode(Sha256::digest(&stored.bytes)),
            modified: stored.modified,
            location,
        };
        Ok(Some((stored.bytes, info)))
    }

    /// Store `source` as the avatar of `user_id`.
    ///
    /// On failure the previous avatar (or its absence) is restored before
    /// returning the error.
    #[instrument(skip_all, fields(user_id = %user_id, source = %source.display()))]
    pub fn save(&self, user_id: &UserId, source: &Path) -> Result<SaveOutcome> {
        let location = self.location(user_id);
        self.locks.with_key(user_id.as_str(), || {
            // A backup still pending here may be the only good copy; step 2 would overwrite it.
            self.settle(&location)
                .map_err(|source| AvatarError::WriteFailed {
                    path: location.backup_path.display().to_string(),
                    source,
                })?;
            self.save_locked(&location, source)
        })
    }

    /// Load the avatar of the logged-in user.
    pub fn load_for(&self, session: &SessionContext) -> Result<Option<Vec<u8>>> {
        self.load(session.user_id()?)
    }

    /// Save an avatar for the logged-in user.
    pub fn save_for(&self, session: &SessionContext, source: &Path) -> Result<SaveOutcome> {
        self.save(session.user_id()?, source)
    }

    fn load_stored(&self, user_id: &UserId) -> Result<Option<Stored>> {
        let location = self.location(user_id);
        self.locks.with_key(user_id.as_str(), || {
            // Failures are logged by `settle`; the read below reports what is on disk.
            let _ = self.settle(&location);
            self.read_target(&location)
        })
    }

    /// Read and validate the target. Runs under the user's lock.
    fn read_target(&self, location: &AvatarLocation) -> Result<Option<Stored>> {
        let path = &location.target_path;
        let read_error = |reason: String| AvatarError::ReadError {
            path: path.display().to_string(),
            reason,
        };

        let bytes = match self.fs.read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "No stored avatar");
                return Ok(None);
            }
            Err(e) => return Err(read_error(e.to_string())),
        };

        let image = decode_canonical(&bytes).map_err(|e| read_error(e.to_string()))?;
        let modified = self.fs.modified(path).ok().map(DateTime::<Utc>::from);
        debug!(path = %path.display(), size = bytes.len(), "Loaded avatar");
        Ok(Some(Stored {
            bytes,
            image,
            modified,
        }))
    }

    fn save_locked(&self, location: &AvatarLocation, source: &Path) -> Result<SaveOutcome> {
        // 1. Directory
        self.fs
            .create_dir_all(&location.dir)
            .map_err(|source| AvatarError::DirectoryCreateFailed {
                path: location.dir.display().to_string(),
                source,
            })?;
        trace!(dir = %location.dir.display(), "Avatar directory ready");

        // 2-3. Backup and write; recover on failure.
        let (replaced_previous, normalized) = self
            .backup_and_write(location, source)
            .map_err(|primary| self.recover(location, primary))?;

        // 4. Cleanup
        if replaced_previous {
            if let Err(e) = self.fs.remove_file(&location.backup_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(
                        path = %location.backup_path.display(),
                        error = %e,
                        "Failed to remove avatar backup after save"
                    );
                }
            }
        }

        info!(
            user_id = %location.user_id,
            size = normalized.bytes.len(),
            reencoded = normalized.reencoded,
            "Avatar saved"
        );
        Ok(SaveOutcome {
            location: location.clone(),
            bytes_written: normalized.bytes.len(),
            reencoded: normalized.reencoded,
            replaced_previous,
        })
    }

    fn backup_and_write(
        &self,
        location: &AvatarLocation,
        source: &Path,
    ) -> Result<(bool, normalize::Normalized)> {
        let write_failed = |path: &Path, source: io::Error| AvatarError::WriteFailed {
            path: path.display().to_string(),
            source,
        };

        let had_previous = self
            .fs
            .exists(&location.target_path)
            .map_err(|e| write_failed(&location.target_path, e))?;
        if had_previous {
            self.fs
                .rename(&location.target_path, &location.backup_path)
                .map_err(|e| write_failed(&location.backup_path, e))?;
            trace!(backup = %location.backup_path.display(), "Previous avatar moved to backup");
        }

        let normalized = normalize::normalize(source)?;
        self.fs
            .write(&location.target_path, &normalized.bytes)
            .map_err(|e| write_failed(&location.target_path, e))?;

        Ok((had_previous, normalized))
    }

    /// Restore the backup after a failed save and hand back the error to report.
    fn recover(&self, location: &AvatarLocation, primary: AvatarError) -> AvatarError {
        let backup = &location.backup_path;
        match self.fs.exists(backup) {
            Ok(false) => {
                debug!(error = %primary, "Save failed with no backup to restore");
                return primary;
            }
            Ok(true) => {}
            Err(source) => return self.recovery_failed(backup, primary, source),
        }

        match self.fs.rename(backup, &location.target_path) {
            Ok(()) => {
                debug!(error = %primary, "Save failed, previous avatar restored");
                primary
            }
            Err(source) => self.recovery_failed(backup, primary, source),
        }
    }

    fn recovery_failed(&self, backup: &Path, primary: AvatarError, source: io::Error) -> AvatarError {
        error!(
            backup = %backup.display(),
            primary = %primary,
            error = %source,
            root = %self.root.display(),
            "Failed to restore avatar backup; stored avatar may be inconsistent"
        );
        AvatarError::RecoveryFailed {
            primary: Box::new(primary),
            path: backup.display().to_string(),
            source,
        }
    }

    /// Resolve leftovers of an interrupted save.
    ///
    /// Returns an error, after logging it, when a backup may still be pending.
    fn settle(&self, location: &AvatarLocation) -> io::Result<()> {
        let backup = &location.backup_path;
        let target = &location.target_path;

        match self.fs.exists(backup) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => {
                warn!(path = %backup.display(), error = %e, "Cannot check for avatar backup");
                return Err(e);
            }
        }

        let target_ok = match self.fs.read(target) {
            Ok(bytes) => decode_canonical(&bytes).is_ok(),
            Err(_) => false,
        };

        let result = if target_ok {
            debug!(path = %backup.display(), "Discarding backup left by a completed save");
            self.fs.remove_file(backup)
        } else {
            warn!(path = %target.display(), "Restoring avatar from backup left by an interrupted save");
            self.fs.rename(backup, target)
        };

        result.inspect_err(|e| {
            warn!(path = %backup.display(), error = %e, "Failed to settle avatar backup");
        })
    }
}
