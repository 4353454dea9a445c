//! Avatar cache library - crash-safe local storage of per-user profile images.
//!
//! This library exposes the storage engine used by the `avatar` CLI and by
//! the desktop client.
//!
//! # Modules
//!
//! - `paths`: Platform data root and per-user avatar paths
//! - `normalize`: Conversion of source images to the canonical PNG format
//! - `store`: Storage engine with atomic-replace-with-backup saves
//! - `session`: Logged-in identity passed to the storage engine
//! - `config`: TOML settings
//! - `error`: Error types with user-facing messages
//! - `logging`: Tracing subscriber setup
//!
//! # Example
//!
//! ```rust,no_run
//! use avatar_cache::paths::UserId;
//! use avatar_cache::store::AvatarStore;
//!
//! let store = AvatarStore::new(avatar_cache::paths::resolve_app_data_root());
//! let user = UserId::parse("42")?;
//! store.save(&user, std::path::Path::new("photo.jpg"))?;
//! let png = store.load(&user)?;
//! # Ok::<(), avatar_cache::error::AvatarError>(())
//! ```
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod paths;
pub mod session;
pub mod store;

pub use error::{AvatarError, Result};
pub use paths::{AvatarLocation, UserId};
pub use store::AvatarStore;
