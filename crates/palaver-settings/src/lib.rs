//! # palaver-settings
//!
//! Layered configuration for the Palaver chat server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`PalaverSettings::default()`]
//! 2. **User file**: `~/.palaver/settings.json`, or a path given on the
//!    command line, deep-merged over defaults
//! 3. **Environment variables**: `PALAVER_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, palaver_home,
    settings_path,
};
pub use types::{ChatSettings, DatabaseSettings, LoggingSettings, PalaverSettings, ServerSettings};
