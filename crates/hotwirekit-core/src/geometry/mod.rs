//! Boundary representation of the solids cut by the wire.
//!
//! The cut direction is the Z axis: end caps lie in planes of constant Z and every
//! side wall is a ruled face joining one edge on each cap.

pub mod bounds;
pub mod brep;
pub mod mesh;
pub mod profile;
