//! # HotWireKit Core
//!
//! Shared building blocks for the hot-wire toolpath crates:
//! - geometric tolerances used across ring building, projection and traversal
//! - a boundary representation of the solids handed to the path engine
//! - solid builders (prism, loft) and STL mesh import
//! - the core error type

pub mod constants;
pub mod error;
pub mod geometry;

pub use error::{GeometryError, GeometryResult};
pub use geometry::{
    bounds::BoundingBox3,
    brep::{Edge, EdgeCurve, Face, Solid},
    mesh::{solid_from_indexed_mesh, solid_from_stl_file},
    profile::{Profile2D, ProfileSegment, Section},
};

pub use nalgebra::{Point2, Point3, Vector2, Vector3};
