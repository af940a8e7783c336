//! 2D section profiles and the solid builders that sweep them along Z.
//!
//! A profile is a closed chain of line and arc segments. Each segment becomes one
//! ruled side face of the solid, so a root and a tip section can be lofted as long
//! as their segment counts match.

use crate::constants::{PLANE_TOLERANCE, POINT_TOLERANCE};
use crate::error::{GeometryError, GeometryResult};
use crate::geometry::brep::{Edge, Face, Solid};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

/// One segment of a profile, running from the previous segment's end point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileSegment {
    Line {
        to: [f64; 2],
    },
    Arc {
        to: [f64; 2],
        center: [f64; 2],
        #[serde(default)]
        clockwise: bool,
    },
}

impl ProfileSegment {
    pub fn to(&self) -> [f64; 2] {
        match self {
            ProfileSegment::Line { to } | ProfileSegment::Arc { to, .. } => *to,
        }
    }
}

/// Closed planar profile. A closing line back to `start` is implied when the last
/// segment does not end there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile2D {
    pub start: [f64; 2],
    pub segments: Vec<ProfileSegment>,
}

impl Profile2D {
    pub fn polygon(points: &[[f64; 2]]) -> Self {
        let start = points.first().copied().unwrap_or([0.0, 0.0]);
        let segments = points
            .iter()
            .skip(1)
            .map(|p| ProfileSegment::Line { to: *p })
            .collect();
        Self { start, segments }
    }

    /// Counter-clockwise rectangle with its lower-left corner at `(x, y)`.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::polygon(&[
            [x, y],
            [x + width, y],
            [x + width, y + height],
            [x, y + height],
        ])
    }

    /// Counter-clockwise circle made of four quarter arcs.
    pub fn circle(cx: f64, cy: f64, radius: f64) -> Self {
        let segments = (1..=4)
            .map(|k| {
                let a = FRAC_PI_2 * k as f64;
                ProfileSegment::Arc {
                    to: [cx + radius * a.cos(), cy + radius * a.sin()],
                    center: [cx, cy],
                    clockwise: false,
                }
            })
            .collect();
        Self {
            start: [cx + radius, cy],
            segments,
        }
    }

    fn closed_segments(&self) -> Vec<ProfileSegment> {
        let mut segments = self.segments.clone();
        let ends_at_start = segments
            .last()
            .map(|s| distance2(s.to(), self.start) < POINT_TOLERANCE)
            .unwrap_or(true);
        if !ends_at_start {
            segments.push(ProfileSegment::Line { to: self.start });
        }
        segments
    }

    /// Number of side faces this profile produces.
    pub fn segment_count(&self) -> usize {
        self.closed_segments().len()
    }

    /// Edges of the closed profile placed in the plane `z`.
    pub fn edges_at(&self, z: f64) -> GeometryResult<Vec<Edge>> {
        let segments = self.closed_segments();
        if segments.len() < 2 {
            return Err(GeometryError::InvalidProfile(format!(
                "profile needs at least 2 segments, got {}",
                segments.len()
            )));
        }

        let mut edges = Vec::with_capacity(segments.len());
        let mut from = self.start;
        for (i, segment) in segments.iter().enumerate() {
            let to = segment.to();
            let start = Point3::new(from[0], from[1], z);
            let end = Point3::new(to[0], to[1], z);
            match segment {
                ProfileSegment::Line { .. } => {
                    if (end - start).norm() < POINT_TOLERANCE {
                        return Err(GeometryError::InvalidProfile(format!(
                            "segment {} has zero length",
                            i
                        )));
                    }
                    edges.push(Edge::line(start, end));
                }
                ProfileSegment::Arc {
                    center, clockwise, ..
                } => {
                    let r0 = distance2(from, *center);
                    let r1 = distance2(to, *center);
                    if (r0 - r1).abs() > POINT_TOLERANCE {
                        return Err(GeometryError::InvalidProfile(format!(
                            "arc segment {} has unequal radii {:.4} and {:.4}",
                            i, r0, r1
                        )));
                    }
                    let a0 = (from[1] - center[1]).atan2(from[0] - center[0]);
                    let a1 = (to[1] - center[1]).atan2(to[0] - center[0]);
                    let sweep = if *clockwise {
                        -positive_angle(a0 - a1)
                    } else {
                        positive_angle(a1 - a0)
                    };
                    let c = Point3::new(center[0], center[1], z);
                    edges.push(Edge::arc(start, c, Vector3::z(), sweep)?);
                }
            }
            from = to;
        }
        Ok(edges)
    }
}

/// Angle folded into `(0, 2*pi]`.
fn positive_angle(a: f64) -> f64 {
    let r = a.rem_euclid(TAU);
    if r < 1e-12 {
        TAU
    } else {
        r
    }
}

fn distance2(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Outer profile plus optional cut-outs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub outer: Profile2D,
    #[serde(default)]
    pub holes: Vec<Profile2D>,
}

impl Section {
    pub fn new(outer: Profile2D) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    pub fn with_hole(mut self, hole: Profile2D) -> Self {
        self.holes.push(hole);
        self
    }
}

impl Solid {
    /// Straight extrusion of `section` between `z0` and `z1`.
    pub fn prism(name: impl Into<String>, section: &Section, z0: f64, z1: f64) -> GeometryResult<Solid> {
        Self::loft(name, section, section, z0, z1)
    }

    /// Ruled loft from `root` at `z0` to `tip` at `z1`. Segment `i` of each root profile
    /// is joined to segment `i` of the matching tip profile.
    pub fn loft(
        name: impl Into<String>,
        root: &Section,
        tip: &Section,
        z0: f64,
        z1: f64,
    ) -> GeometryResult<Solid> {
        if z1 - z0 < PLANE_TOLERANCE {
            return Err(GeometryError::IncompatibleSections(format!(
                "tip plane z={} must lie above root plane z={}",
                z1, z0
            )));
        }
        if root.holes.len() != tip.holes.len() {
            return Err(GeometryError::IncompatibleSections(format!(
                "root has {} holes, tip has {}",
                root.holes.len(),
                tip.holes.len()
            )));
        }

        let pairs = std::iter::once((&root.outer, &tip.outer))
            .chain(root.holes.iter().zip(tip.holes.iter()));

        let mut faces = Vec::new();
        let mut bottom_edges = Vec::new();
        let mut top_edges = Vec::new();
        for (root_profile, tip_profile) in pairs {
            let lower = root_profile.edges_at(z0)?;
            let upper = tip_profile.edges_at(z1)?;
            if lower.len() != upper.len() {
                return Err(GeometryError::IncompatibleSections(format!(
                    "root profile has {} segments, tip profile has {}",
                    lower.len(),
                    upper.len()
                )));
            }
            for (low, high) in lower.iter().zip(upper.iter()) {
                faces.push(Face::from_edges(vec![
                    low.clone(),
                    Edge::line(low.end(), high.end()),
                    high.reversed(),
                    Edge::line(high.start(), low.start()),
                ]));
            }
            bottom_edges.extend(lower);
            top_edges.extend(upper);
        }

        faces.push(Face::new(bottom_edges, -Vector3::z()));
        faces.push(Face::new(top_edges, Vector3::z()));
        Ok(Solid::new(name, faces))
    }
}
