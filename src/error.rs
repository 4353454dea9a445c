//! Error types for avatar storage operations.

use thiserror::Error;

/// Primary error type for avatar storage.
#[derive(Error, Debug)]
pub enum AvatarError {
    // Storage errors
    #[error("Failed to create avatar directory {path}: {source}")]
    DirectoryCreateFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored avatar at {path} is unreadable: {reason}")]
    ReadError { path: String, reason: String },

    #[error("Cannot decode image {path}: {reason}")]
    DecodeError { path: String, reason: String },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{primary}; restoring backup {path} also failed: {source}")]
    RecoveryFailed {
        primary: Box<AvatarError>,
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Identity errors
    #[error("Invalid user identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: &'static str },

    #[error("No user is logged in")]
    NoSession,

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AvatarError {
    /// Stable snake_case name of the error kind, for diagnostics and JSON output.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DirectoryCreateFailed { .. } => "directory_create_failed",
            Self::ReadError { .. } => "read_error",
            Self::DecodeError { .. } => "decode_error",
            Self::WriteFailed { .. } => "write_failed",
            Self::RecoveryFailed { .. } => "recovery_failed",
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::NoSession => "no_session",
            Self::ConfigNotFound { .. } => "config_not_found",
            Self::ConfigParse(_) => "config_parse",
            Self::Io(_) => "io",
        }
    }

    /// The error that started the failure chain.
    ///
    /// For `RecoveryFailed` this is the save failure that triggered recovery.
    pub fn primary(&self) -> &Self {
        match self {
            Self::RecoveryFailed { primary, .. } => primary.primary(),
            other => other,
        }
    }

    /// Message safe to show in the UI, without technical detail.
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::DirectoryCreateFailed { .. }
            | Self::DecodeError { .. }
            | Self::WriteFailed { .. }
            | Self::RecoveryFailed { .. } => "could not save image",
            Self::ReadError { .. } => "could not load image",
            Self::InvalidIdentifier { .. } | Self::NoSession => "no valid user for this avatar",
            Self::ConfigNotFound { .. } | Self::ConfigParse(_) => "could not read settings",
            Self::Io(_) => "a file operation failed",
        }
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DecodeError { .. }
                | Self::InvalidIdentifier { .. }
                | Self::NoSession
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DecodeError { .. } => Some("Choose a PNG, JPEG, GIF, BMP or WebP image"),
            Self::DirectoryCreateFailed { .. } | Self::WriteFailed { .. } => {
                Some("Check free disk space and permissions of the data directory")
            }
            Self::RecoveryFailed { .. } => {
                Some("The previous avatar may be lost; save a new image to repair it")
            }
            Self::InvalidIdentifier { .. } => Some("User ids must not contain path separators"),
            Self::NoSession => Some("Log in before changing the avatar"),
            Self::ConfigNotFound { .. } => Some("Check the --config path or AVATAR_CONFIG"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using AvatarError.
pub type Result<T> = std::result::Result<T, AvatarError>;
