//! Configuration for the avatar cache.
//!
//! Settings come from an optional TOML file; CLI flags and their
//! environment variables override individual values.

mod settings;

pub use settings::Settings;
