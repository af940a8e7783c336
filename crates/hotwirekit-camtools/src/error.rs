//! Error types for the toolpath engine.
//!
//! Geometry problems carry the name of the shape they were found on so a job with
//! several solids reports which one needs fixing.

use hotwirekit_core::GeometryError;
use hotwirekit_settings::SettingsError;
use std::io;
use thiserror::Error;

/// Errors that can occur while building paths or emitting G-code.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// Faces of a solid could not be chained into closed rings, or a ring
    /// could not be projected onto the end caps.
    #[error("Shape '{shape}': face adjacency error: {reason}")]
    GeometryAdjacency { shape: String, reason: String },

    /// Kerf offsetting failed with both the miter and the round join strategy.
    #[error("Shape '{shape}': kerf offset failed, points too close together ({reason})")]
    DegenerateOffset { shape: String, reason: String },

    /// The path graph is inconsistent: missing start or end, dangling link endpoint.
    #[error("Path graph error: {0}")]
    GraphIntegrity(String),

    /// Invalid parameters were provided to a generator.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// G-code generation failed.
    #[error("G-code generation failed: {0}")]
    GenerationFailed(String),

    /// Building the input solid failed.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Profile or machine settings were rejected.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CamToolError {
    pub(crate) fn adjacency(shape: &str, reason: impl Into<String>) -> Self {
        Self::GeometryAdjacency {
            shape: shape.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for toolpath operations.
pub type CamToolResult<T> = Result<T, CamToolError>;
