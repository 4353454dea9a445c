//! Path resolution for the avatar cache.
//!
//! Derives the per-platform application data root and, below it, the
//! per-user avatar paths:
//!
//! ```text
//! {root}/avatars/{user_id}/profile.png
//! {root}/avatars/{user_id}/profile.backup.png
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{AvatarError, Result};

/// Application directory name used on Windows and macOS.
pub const APP_NAME: &str = "InsightDesk";

/// Directory below the data root holding one subdirectory per user.
pub const AVATARS_DIR: &str = "avatars";

/// File name of the authoritative avatar.
pub const AVATAR_FILE: &str = "profile.png";

/// File name of the transient backup kept during a save.
pub const BACKUP_FILE: &str = "profile.backup.png";

/// Host platform family, as far as data directory conventions go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Roaming application data (`%APPDATA%`).
    Windows,
    /// `~/Library/Application Support`.
    MacOs,
    /// XDG base directories.
    Posix,
    /// Anything else: a dot-directory in the home directory.
    Unknown,
}

impl Platform {
    /// Platform of the running binary.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Classify an OS name as reported by `std::env::consts::OS`.
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" | "solaris" | "illumos" => {
                Self::Posix
            }
            _ => Self::Unknown,
        }
    }
}

/// Environment inputs for data root resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnv {
    /// The user's home directory.
    pub home: Option<PathBuf>,
    /// Value of `APPDATA` (Windows).
    pub appdata: Option<PathBuf>,
    /// Value of `XDG_DATA_HOME` (POSIX).
    pub xdg_data_home: Option<PathBuf>,
}

impl HostEnv {
    /// Capture the environment of the current process.
    pub fn from_process() -> Self {
        Self {
            home: dirs::home_dir(),
            appdata: non_empty_var("APPDATA"),
            xdg_data_home: non_empty_var("XDG_DATA_HOME"),
        }
    }
}

fn non_empty_var(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Resolve the application data root for the running process.
///
/// Never fails; see [`app_data_root`] for the rules.
pub fn resolve_app_data_root() -> PathBuf {
    app_data_root(Platform::current(), &HostEnv::from_process(), APP_NAME)
}

/// Resolve the application data root for an explicit platform and environment.
///
/// Resolution rules:
/// 1. Windows: `%APPDATA%\{app}`, else `{home}\AppData\Roaming\{app}`
/// 2. macOS: `{home}/Library/Application Support/{app}`
/// 3. POSIX: `$XDG_DATA_HOME/{app}` (lowercased) when absolute, else `{home}/.local/share/{app}`
/// 4. Unknown: `{home}/.{app}` (lowercased)
///
/// A missing home directory falls back to the system temp directory.
pub fn app_data_root(platform: Platform, env: &HostEnv, app_name: &str) -> PathBuf {
    let home = env.home.clone().unwrap_or_else(std::env::temp_dir);
    let root = match platform {
        Platform::Windows => env
            .appdata
            .clone()
            .unwrap_or_else(|| home.join("AppData").join("Roaming"))
            .join(app_name),
        Platform::MacOs => home
            .join("Library")
            .join("Application Support")
            .join(app_name),
        Platform::Posix => {
            let base = env
                .xdg_data_home
                .clone()
                .filter(|p| p.is_absolute())
                .unwrap_or_else(|| home.join(".local").join("share"));
            base.join(app_name.to_lowercase())
        }
        Platform::Unknown => home.join(format!(".{}", app_name.to_lowercase())),
    };
    debug!(?platform, root = %root.display(), "Resolved app data root");
    root
}

/// Validated user identifier, safe to use as a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate a raw identifier.
    ///
    /// Rejects empty values, surrounding whitespace, path separators, NUL
    /// bytes, `.` and anything containing `..`.
    pub fn parse(raw: &str) -> Result<Self> {
        let reject = |reason: &'static str| AvatarError::InvalidIdentifier {
            value: raw.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(reject("must not be empty"));
        }
        if raw.trim() != raw {
            return Err(reject("must not start or end with whitespace"));
        }
        if raw.contains(['/', '\\']) {
            return Err(reject("must not contain path separators"));
        }
        if raw.contains('\0') {
            return Err(reject("must not contain NUL bytes"));
        }
        if raw == "." || raw.contains("..") {
            return Err(reject("must not contain relative path components"));
        }

        trace!(user_id = raw, "Validated user id");
        Ok(Self(raw.to_string()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = AvatarError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::str::FromStr for UserId {
    type Err = AvatarError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Concrete file locations for one user's avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvatarLocation {
    /// Owner of the avatar.
    pub user_id: UserId,
    /// Per-user directory.
    pub dir: PathBuf,
    /// Authoritative avatar file.
    pub target_path: PathBuf,
    /// Transient backup used during saves.
    pub backup_path: PathBuf,
}

impl AvatarLocation {
    /// Derive the avatar paths for `user_id` below `root`.
    pub fn new(root: &Path, user_id: &UserId) -> Self {
        let dir = root.join(AVATARS_DIR).join(user_id.as_str());
        Self {
            user_id: user_id.clone(),
            target_path: dir.join(AVATAR_FILE),
            backup_path: dir.join(BACKUP_FILE),
            dir,
        }
    }
}
