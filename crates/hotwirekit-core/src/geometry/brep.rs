//! Faces, edges and solids.
//!
//! Only the queries the path engine needs are modelled: edge length, center and
//! discretization, face normal and vertex listing, shared-edge tests between faces.

use crate::constants::{CENTER_SAMPLES, NORMAL_TOLERANCE, POINT_TOLERANCE};
use crate::error::{GeometryError, GeometryResult};
use crate::geometry::bounds::BoundingBox3;
use nalgebra::{Point3, Rotation3, Unit, Vector3};

/// Geometry of an edge between its two endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeCurve {
    /// Straight segment.
    Line,
    /// Circular arc: the start point rotated by `sweep` radians about `axis` through `center`.
    Arc {
        center: Point3<f64>,
        axis: Vector3<f64>,
        sweep: f64,
    },
    /// Sampled curve (splines and other freeform edges). First and last samples are
    /// the edge endpoints.
    Polyline(Vec<Point3<f64>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    start: Point3<f64>,
    end: Point3<f64>,
    curve: EdgeCurve,
}

impl Edge {
    pub fn line(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self {
            start,
            end,
            curve: EdgeCurve::Line,
        }
    }

    /// Arc starting at `start`, turning `sweep` radians about `axis` (right-hand rule).
    pub fn arc(
        start: Point3<f64>,
        center: Point3<f64>,
        axis: Vector3<f64>,
        sweep: f64,
    ) -> GeometryResult<Self> {
        if axis.norm() < f64::EPSILON {
            return Err(GeometryError::InvalidEdge("arc axis is a zero vector".into()));
        }
        if (start - center).norm() < POINT_TOLERANCE {
            return Err(GeometryError::InvalidEdge("arc radius is zero".into()));
        }
        let axis = axis.normalize();
        let end = center + rotate(&axis, sweep, start - center);
        Ok(Self {
            start,
            end,
            curve: EdgeCurve::Arc {
                center,
                axis,
                sweep,
            },
        })
    }

    pub fn polyline(points: Vec<Point3<f64>>) -> GeometryResult<Self> {
        if points.len() < 2 {
            return Err(GeometryError::InvalidEdge(format!(
                "polyline edge needs at least 2 points, got {}",
                points.len()
            )));
        }
        let start = points[0];
        let end = points[points.len() - 1];
        Ok(Self {
            start,
            end,
            curve: EdgeCurve::Polyline(points),
        })
    }

    pub fn start(&self) -> Point3<f64> {
        self.start
    }

    pub fn end(&self) -> Point3<f64> {
        self.end
    }

    pub fn curve(&self) -> &EdgeCurve {
        &self.curve
    }

    pub fn is_line(&self) -> bool {
        matches!(self.curve, EdgeCurve::Line)
    }

    pub fn length(&self) -> f64 {
        match &self.curve {
            EdgeCurve::Line => (self.end - self.start).norm(),
            EdgeCurve::Arc { center, sweep, .. } => (self.start - center).norm() * sweep.abs(),
            EdgeCurve::Polyline(points) => polyline_length(points),
        }
    }

    /// Point at fraction `t` of the edge's arc length, clamped to `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        let t = t.clamp(0.0, 1.0);
        match &self.curve {
            EdgeCurve::Line => self.start + (self.end - self.start) * t,
            EdgeCurve::Arc {
                center,
                axis,
                sweep,
            } => center + rotate(axis, sweep * t, self.start - center),
            EdgeCurve::Polyline(points) => {
                let target = polyline_length(points) * t;
                let mut walked = 0.0;
                for pair in points.windows(2) {
                    let seg = (pair[1] - pair[0]).norm();
                    if seg > 0.0 && walked + seg >= target {
                        return pair[0] + (pair[1] - pair[0]) * ((target - walked) / seg);
                    }
                    walked += seg;
                }
                self.end
            }
        }
    }

    /// `n` points evenly spaced by arc length, endpoints included. `n` below 2 is raised to 2.
    pub fn discretize(&self, n: usize) -> Vec<Point3<f64>> {
        let n = n.max(2);
        let mut points: Vec<Point3<f64>> = (0..n)
            .map(|i| self.point_at(i as f64 / (n - 1) as f64))
            .collect();
        points[0] = self.start;
        points[n - 1] = self.end;
        points
    }

    /// Direction independent representative point of the edge.
    pub fn center_of_mass(&self) -> Point3<f64> {
        if self.is_line() {
            return nalgebra::center(&self.start, &self.end);
        }
        let samples = self.discretize(CENTER_SAMPLES);
        let sum = samples
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / samples.len() as f64)
    }

    pub fn reversed(&self) -> Edge {
        let curve = match &self.curve {
            EdgeCurve::Line => EdgeCurve::Line,
            EdgeCurve::Arc {
                center,
                axis,
                sweep,
            } => EdgeCurve::Arc {
                center: *center,
                axis: *axis,
                sweep: -sweep,
            },
            EdgeCurve::Polyline(points) => {
                EdgeCurve::Polyline(points.iter().rev().copied().collect())
            }
        };
        Edge {
            start: self.end,
            end: self.start,
            curve,
        }
    }

    pub fn translated(&self, offset: &Vector3<f64>) -> Edge {
        let curve = match &self.curve {
            EdgeCurve::Line => EdgeCurve::Line,
            EdgeCurve::Arc {
                center,
                axis,
                sweep,
            } => EdgeCurve::Arc {
                center: center + offset,
                axis: *axis,
                sweep: *sweep,
            },
            EdgeCurve::Polyline(points) => {
                EdgeCurve::Polyline(points.iter().map(|p| p + offset).collect())
            }
        };
        Edge {
            start: self.start + offset,
            end: self.end + offset,
            curve,
        }
    }

    /// True when one of the endpoints coincides with `p`.
    pub fn touches(&self, p: &Point3<f64>) -> bool {
        (self.start - p).norm() < POINT_TOLERANCE || (self.end - p).norm() < POINT_TOLERANCE
    }
}

fn rotate(axis: &Vector3<f64>, angle: f64, v: Vector3<f64>) -> Vector3<f64> {
    Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle) * v
}

fn polyline_length(points: &[Point3<f64>]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// A bounded surface patch: its boundary edges plus a unit normal at a sample point.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    normal: Vector3<f64>,
    edges: Vec<Edge>,
}

impl Face {
    pub fn new(edges: Vec<Edge>, normal: Vector3<f64>) -> Self {
        let normal = if normal.norm() > f64::EPSILON {
            normal.normalize()
        } else {
            normal
        };
        Self { normal, edges }
    }

    /// Face whose normal is derived from the boundary with Newell's method.
    /// The edges must form one chained loop.
    pub fn from_edges(edges: Vec<Edge>) -> Self {
        let mut loop_points = Vec::new();
        for edge in &edges {
            let n = if edge.is_line() { 2 } else { 9 };
            let pts = edge.discretize(n);
            loop_points.extend_from_slice(&pts[..pts.len() - 1]);
        }
        let normal = newell_normal(&loop_points);
        Self::new(edges, normal)
    }

    pub fn normal(&self) -> &Vector3<f64> {
        &self.normal
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Distinct edge endpoints in boundary order.
    pub fn vertices(&self) -> Vec<Point3<f64>> {
        let mut out: Vec<Point3<f64>> = Vec::new();
        for edge in &self.edges {
            for p in [edge.start(), edge.end()] {
                if !out.iter().any(|q| (q - p).norm() < POINT_TOLERANCE) {
                    out.push(p);
                }
            }
        }
        out
    }

    /// Length weighted mean of the edge centers.
    pub fn center_of_mass(&self) -> Point3<f64> {
        let mut total = 0.0;
        let mut sum = Vector3::zeros();
        for edge in &self.edges {
            let len = edge.length();
            sum += edge.center_of_mass().coords * len;
            total += len;
        }
        if total > 0.0 {
            Point3::from(sum / total)
        } else {
            self.edges
                .first()
                .map(|e| e.start())
                .unwrap_or_else(Point3::origin)
        }
    }

    /// Side walls swept by the wire have normals that are not parallel to Z.
    pub fn is_transversal(&self) -> bool {
        self.normal.cross(&Vector3::z()).norm() > NORMAL_TOLERANCE
    }

    /// Edge pairs of `self` and `other` whose centers coincide.
    pub fn shared_edges<'a>(&'a self, other: &'a Face) -> Vec<(&'a Edge, &'a Edge)> {
        let mut out = Vec::new();
        for a in &self.edges {
            let ca = a.center_of_mass();
            for b in &other.edges {
                if (b.center_of_mass() - ca).norm() < POINT_TOLERANCE {
                    out.push((a, b));
                }
            }
        }
        out
    }

    pub fn shares_edge_with(&self, other: &Face) -> bool {
        !self.shared_edges(other).is_empty()
    }

    pub fn translated(&self, offset: &Vector3<f64>) -> Face {
        Face {
            normal: self.normal,
            edges: self.edges.iter().map(|e| e.translated(offset)).collect(),
        }
    }
}

fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        n.x += (p.y - q.y) * (p.z + q.z);
        n.y += (p.z - q.z) * (p.x + q.x);
        n.z += (p.x - q.x) * (p.y + q.y);
    }
    n
}

/// A closed solid described by its faces.
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    name: String,
    faces: Vec<Face>,
}

impl Solid {
    pub fn new(name: impl Into<String>, faces: Vec<Face>) -> Self {
        Self {
            name: name.into(),
            faces,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn bounding_box(&self) -> Option<BoundingBox3> {
        let points: Vec<Point3<f64>> = self
            .faces
            .iter()
            .flat_map(|f| f.edges())
            .flat_map(|e| {
                if e.is_line() {
                    vec![e.start(), e.end()]
                } else {
                    e.discretize(CENTER_SAMPLES)
                }
            })
            .collect();
        BoundingBox3::from_points(&points)
    }

    pub fn translated(&self, offset: &Vector3<f64>) -> Solid {
        Solid {
            name: self.name.clone(),
            faces: self.faces.iter().map(|f| f.translated(offset)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_line_discretize() {
        let e = Edge::line(Point3::origin(), Point3::new(10.0, 0.0, 0.0));
        let pts = e.discretize(5);
        assert_eq!(pts.len(), 5);
        assert!((pts[2].x - 5.0).abs() < 1e-12);
        assert_eq!(e.length(), 10.0);
    }

    #[test]
    fn test_arc_quarter_circle() {
        let e = Edge::arc(
            Point3::new(10.0, 0.0, 0.0),
            Point3::origin(),
            Vector3::z(),
            FRAC_PI_2,
        )
        .unwrap();
        assert!((e.end() - Point3::new(0.0, 10.0, 0.0)).norm() < 1e-9);
        assert!((e.length() - 10.0 * FRAC_PI_2).abs() < 1e-9);
        let mid = e.point_at(0.5);
        assert!((mid.coords.norm() - 10.0).abs() < 1e-9);
        assert!((mid.x - mid.y).abs() < 1e-9);
    }

    #[test]
    fn test_reversed_arc_keeps_center() {
        let e = Edge::arc(
            Point3::new(10.0, 0.0, 0.0),
            Point3::origin(),
            Vector3::z(),
            FRAC_PI_2,
        )
        .unwrap();
        let r = e.reversed();
        assert!((r.end() - e.start()).norm() < 1e-9);
        assert!((r.center_of_mass() - e.center_of_mass()).norm() < POINT_TOLERANCE);
    }

    #[test]
    fn test_polyline_point_at() {
        let e = Edge::polyline(vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ])
        .unwrap();
        assert_eq!(e.length(), 2.0);
        let p = e.point_at(0.75);
        assert!((p - Point3::new(1.0, 0.5, 0.0)).norm() < 1e-12);
        assert!(Edge::polyline(vec![Point3::origin()]).is_err());
    }

    #[test]
    fn test_face_classification() {
        let side = Face::from_edges(vec![
            Edge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)),
            Edge::line(Point3::new(10.0, 0.0, 0.0), Point3::new(10.0, 0.0, 5.0)),
            Edge::line(Point3::new(10.0, 0.0, 5.0), Point3::new(0.0, 0.0, 5.0)),
            Edge::line(Point3::new(0.0, 0.0, 5.0), Point3::new(0.0, 0.0, 0.0)),
        ]);
        assert!(side.is_transversal());
        assert_eq!(side.vertices().len(), 4);

        let cap = Face::new(side.edges()[..1].to_vec(), Vector3::new(0.0, 0.0, -3.0));
        assert!(!cap.is_transversal());
        assert_eq!(cap.normal().z, -1.0);
    }

    #[test]
    fn test_shared_edge_ignores_direction() {
        let a = Face::from_edges(vec![
            Edge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
            Edge::line(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 1.0)),
        ]);
        let b = Face::from_edges(vec![
            Edge::line(Point3::new(1.0, 0.0, 1.0), Point3::new(1.0, 0.0, 0.0)),
            Edge::line(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)),
        ]);
        assert!(a.shares_edge_with(&b));
        assert_eq!(a.shared_edges(&b).len(), 1);
    }
}
