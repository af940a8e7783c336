//! Geometric tolerances, all in millimeters unless stated otherwise.

/// Two points closer than this are the same point (vertices, edge centers, link anchors).
pub const POINT_TOLERANCE: f64 = 0.001;

/// An edge whose center lies within this distance of a cap plane belongs to that cap.
/// Also the minimum rail length of a face segment before it is merged into its neighbour.
pub const PLANE_TOLERANCE: f64 = 0.01;

/// Minimum length of `normal x Z` for a face to count as transversal (a side wall).
pub const NORMAL_TOLERANCE: f64 = 0.001;

/// Sample count used when a curved edge needs a representative center.
pub const CENTER_SAMPLES: usize = 33;
