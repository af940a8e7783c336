//! Error types for the settings crate.
//!
//! This module provides structured error types for profile libraries,
//! configuration files and their validation.

use std::io;
use thiserror::Error;

/// Errors that can occur during settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The configuration file could not be loaded.
    #[error("Failed to load settings: {0}")]
    LoadError(String),

    /// A configuration value is invalid.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// The configuration directory could not be found.
    #[error("Config directory error: {0}")]
    ConfigDirectory(String),

    /// The file extension does not name a supported format.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// A profile library error occurred.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),
}

/// Errors related to foam and table profiles.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A profile index does not exist.
    #[error("No {kind} profile at index {index} ({len} defined)")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// The last profile of a kind cannot be removed.
    #[error("Cannot remove the last {0} profile")]
    LastProfile(&'static str),

    /// A profile field holds an unusable value.
    #[error("Invalid {kind} profile '{name}': {reason}")]
    InvalidValue {
        kind: &'static str,
        name: String,
        reason: String,
    },
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Result type alias for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;
