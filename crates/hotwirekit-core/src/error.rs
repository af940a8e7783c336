//! Error types for the core crate.
//!
//! Covers solid construction from profiles and mesh import. Errors raised by the
//! toolpath engine itself live in the camtools crate.

use std::io;
use thiserror::Error;

/// Errors that can occur while building or importing geometry.
#[derive(Error, Debug)]
pub enum GeometryError {
    /// A 2D profile is malformed (too few segments, open, bad arc).
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// Root and tip sections cannot be joined by ruled faces.
    #[error("Incompatible sections: {0}")]
    IncompatibleSections(String),

    /// An edge could not be created from the given points.
    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    /// A mesh could not be converted into a solid.
    #[error("Mesh import failed: {0}")]
    MeshImport(String),

    /// I/O error while reading a geometry file.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Result type alias for geometry operations.
pub type GeometryResult<T> = Result<T, GeometryError>;
