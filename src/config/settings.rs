//! TOML settings for the avatar cache.
//!
//! ```toml
//! # Store avatars below this directory instead of the platform default.
//! data_dir = "/srv/insightdesk"
//! # Application directory name used by the platform default.
//! app_name = "InsightDesk"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{AvatarError, Result};
use crate::paths::{self, HostEnv, Platform};

/// User-editable settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Explicit application data root.
    pub data_dir: Option<PathBuf>,
    /// Application directory name for the platform default root.
    pub app_name: Option<String>,
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AvatarError::ConfigParse(e.to_string()))
    }

    /// Read settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        trace!(path = %path.display(), "Reading settings");
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AvatarError::ConfigNotFound {
                    path: path.display().to_string(),
                }
            } else {
                AvatarError::Io(e)
            }
        })?;
        let settings = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), ?settings, "Loaded settings");
        Ok(settings)
    }

    /// Read settings from `path`, or use defaults when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    /// Override the data directory, typically from a CLI flag.
    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if dir.is_some() {
            self.data_dir = dir;
        }
        self
    }

    /// Application directory name in effect.
    pub fn app_name(&self) -> &str {
        self.app_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(paths::APP_NAME)
    }

    /// Application data root for an explicit platform and environment.
    pub fn app_data_root(&self, platform: Platform, env: &HostEnv) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| paths::app_data_root(platform, env, self.app_name()))
    }

    /// Application data root for the running process.
    pub fn resolve_app_data_root(&self) -> PathBuf {
        self.app_data_root(Platform::current(), &HostEnv::from_process())
    }
}
