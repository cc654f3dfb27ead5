//! Configuration module.
//!
//! Handles the settings file, named sources, and environment variable
//! expansion.

mod settings;

pub use settings::{expand_env, ScanSettings, Settings, SettingsError, SourceSettings};
