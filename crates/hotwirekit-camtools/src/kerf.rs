//! Kerf compensation.
//!
//! The wire melts a channel wider than itself, and the channel widens where the wire
//! moves slower. With both ends of the wire arriving at the same time, the shorter rail
//! moves slower and needs a larger offset. The kerf measured at full speed (`root_kerf`)
//! and at the slower tip of a 60% taper (`tip_kerf`) define a straight line that maps
//! a rail length ratio to an offset.
//!
//! Offsetting keeps one output point per input point so rail A and rail B stay paired.
//! Corners are first joined with miters; when a miter overshoots, the loop is offset
//! with round joins and every vertex is snapped onto that offset curve instead.

use crate::error::{CamToolError, CamToolResult};
use crate::rails::{signed_area, PathSegmentLengths, ProjectedRing};
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use hotwirekit_core::constants::POINT_TOLERANCE;
use hotwirekit_settings::FoamProfile;
use nalgebra::{Point2, Point3, Vector2};
use std::cmp::Ordering;
use std::panic;
use tracing::{debug, warn};

/// Length ratio at which `tip_kerf` was measured.
const TIP_RATIO: f64 = 0.4;

/// Miter vectors longer than this many offsets are treated as a failed join.
const MITER_LIMIT: f64 = 25.0;

/// Chords per bulge when flattening the round-join offset.
const ARC_SEGMENTS: usize = 8;

/// Linear kerf model built from a foam profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KerfModel {
    /// Half of the root kerf: the offset at full speed.
    k1: f64,
    /// Half of the tip kerf: the offset at the tip ratio.
    k2: f64,
}

impl KerfModel {
    pub fn new(root_kerf: f64, tip_kerf: f64) -> Self {
        Self {
            k1: root_kerf / 2.0,
            k2: tip_kerf / 2.0,
        }
    }

    pub fn from_foam(foam: &FoamProfile) -> Self {
        Self::new(foam.root_kerf, foam.tip_kerf)
    }

    /// Offset applied to a rail moving at full speed.
    pub fn root_offset(&self) -> f64 {
        self.k1
    }

    /// Offset for a rail whose length is `ratio` times the longer rail.
    pub fn offset_for_ratio(&self, ratio: f64) -> f64 {
        if self.k1 == 0.0 && self.k2 == 0.0 {
            return 0.0;
        }
        if (self.k2 - self.k1).abs() < f64::EPSILON {
            return self.k1;
        }
        let slope = (TIP_RATIO - 1.0) / (self.k2 - self.k1);
        let intercept = 1.0 - slope * self.k1;
        (ratio - intercept) / slope
    }

    /// Full kerf width for a rail length ratio.
    pub fn kerf_for_ratio(&self, ratio: f64) -> f64 {
        2.0 * self.offset_for_ratio(ratio)
    }

    /// Outward offsets for rails A and B. The longer rail gets the root offset, the
    /// shorter one the estimate for its length ratio. Holes are offset inward.
    pub fn rail_offsets(&self, lengths: PathSegmentLengths, inner: bool) -> (f64, f64) {
        let (la, lb) = (lengths.a, lengths.b);
        let (oa, ob) = if (la - lb).abs() < f64::EPSILON * la.max(lb).max(1.0) {
            (self.k1, self.k1)
        } else if la > lb {
            (self.k1, self.offset_for_ratio(lb / la))
        } else {
            (self.offset_for_ratio(la / lb), self.k1)
        };
        if inner {
            (-oa, -ob)
        } else {
            (oa, ob)
        }
    }
}

/// Applies a [`KerfModel`] to projected rings.
pub struct KerfCompensator {
    model: KerfModel,
}

impl KerfCompensator {
    pub fn new(model: KerfModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &KerfModel {
        &self.model
    }

    /// Offset both rails of `ring`. `lengths` are the raw closed rail lengths.
    pub fn compensate(
        &self,
        shape: &str,
        ring: &ProjectedRing,
        lengths: PathSegmentLengths,
        inner: bool,
    ) -> CamToolResult<ProjectedRing> {
        let (da, db) = self.model.rail_offsets(lengths, inner);
        debug!(
            "Shape {}: kerf offsets A={:.4} B={:.4} (lengths {:.2}/{:.2})",
            shape, da, db, lengths.a, lengths.b
        );
        let a = offset_rail(&ring.flat_a(), da).map_err(|reason| {
            CamToolError::DegenerateOffset {
                shape: shape.to_string(),
                reason: format!("rail A: {}", reason),
            }
        })?;
        let b = offset_rail(&ring.flat_b(), db).map_err(|reason| {
            CamToolError::DegenerateOffset {
                shape: shape.to_string(),
                reason: format!("rail B: {}", reason),
            }
        })?;
        ring.with_flat_rails(&a, &b)
    }
}

/// Offset a closed rail outward by `distance` (inward when negative).
///
/// The rail may repeat points where segments join and where it closes; repeated
/// points map to the same offset point.
pub fn offset_rail(points: &[Point3<f64>], distance: f64) -> Result<Vec<Point3<f64>>, String> {
    if distance.abs() < f64::EPSILON {
        return Ok(points.to_vec());
    }

    let mut unique: Vec<Point2<f64>> = Vec::new();
    let mut map: Vec<usize> = Vec::with_capacity(points.len());
    for p in points {
        let q = p.xy();
        match unique.last() {
            Some(last) if (q - last).norm() < POINT_TOLERANCE => {}
            _ => unique.push(q),
        }
        map.push(unique.len() - 1);
    }
    if unique.len() > 1 && (unique[unique.len() - 1] - unique[0]).norm() < POINT_TOLERANCE {
        let last = unique.len() - 1;
        unique.pop();
        for m in map.iter_mut() {
            if *m == last {
                *m = 0;
            }
        }
    }
    if unique.len() < 3 {
        return Err(format!("only {} distinct points", unique.len()));
    }

    let offset = match miter_offset(&unique, distance) {
        Some(offset) => offset,
        None => {
            warn!(
                "Miter offset of {:.4} failed on {} points, retrying with round joins",
                distance,
                unique.len()
            );
            round_offset(&unique, distance)
                .ok_or_else(|| format!("offset {:.4} collapses the contour", distance))?
        }
    };

    Ok(points
        .iter()
        .zip(&map)
        .map(|(p, &m)| Point3::new(offset[m].x, offset[m].y, p.z))
        .collect())
}

fn loop_area(points: &[Point2<f64>]) -> f64 {
    let as3: Vec<Point3<f64>> = points.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
    signed_area(&as3)
}

/// Outward unit normals of every edge `i -> i+1`.
fn edge_normals(points: &[Point2<f64>]) -> Option<Vec<Vector2<f64>>> {
    let n = points.len();
    let area = loop_area(points);
    if area.abs() < f64::EPSILON {
        return None;
    }
    let sign = area.signum();
    (0..n)
        .map(|i| {
            let e = points[(i + 1) % n] - points[i];
            let len = e.norm();
            if len < f64::EPSILON {
                None
            } else {
                Some(Vector2::new(e.y, -e.x) * (sign / len))
            }
        })
        .collect()
}

/// Intersection join: each vertex moves to where its two offset edges meet.
fn miter_offset(points: &[Point2<f64>], d: f64) -> Option<Vec<Point2<f64>>> {
    let n = points.len();
    let normals = edge_normals(points)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let n_prev = normals[(i + n - 1) % n];
        let n_next = normals[i];
        let denom = 1.0 + n_prev.dot(&n_next);
        if denom < 1e-6 {
            return None;
        }
        let m = (n_prev + n_next) * (d / denom);
        if m.norm() > MITER_LIMIT * d.abs() {
            return None;
        }
        out.push(points[i] + m);
    }

    // an offset edge running backwards means the offset swallowed a feature
    let flipped = (0..n).any(|i| {
        let j = (i + 1) % n;
        (out[j] - out[i]).dot(&(points[j] - points[i])) <= 0.0
    });
    if flipped {
        None
    } else {
        Some(out)
    }
}

/// Round join offset: the loop is offset as a whole and each vertex is snapped to
/// the closest point of the result near its ideal position.
fn round_offset(points: &[Point2<f64>], d: f64) -> Option<Vec<Point2<f64>>> {
    let normals = edge_normals(points)?;
    let n = points.len();

    let mut pline = Polyline::new();
    for p in points {
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    pline.set_is_closed(true);

    // positive offsets grow clockwise loops and shrink counter-clockwise ones
    let value = if loop_area(points) > 0.0 { -d } else { d };
    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| pline.parallel_offset(value)));
    let loops = match result {
        Ok(loops) => loops,
        Err(_) => {
            warn!("Panic during parallel offset of kerf contour");
            return None;
        }
    };
    let best = loops.into_iter().max_by(|a, b| {
        a.area()
            .abs()
            .partial_cmp(&b.area().abs())
            .unwrap_or(Ordering::Equal)
    })?;
    let curve = flatten_polyline(&best);
    if curve.len() < 3 {
        return None;
    }

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let bisector = normals[(i + n - 1) % n] + normals[i];
        let dir = if bisector.norm() > 1e-9 {
            bisector.normalize()
        } else {
            normals[i]
        };
        let target = points[i] + dir * d;
        out.push(closest_on_loop(&curve, &target));
    }

    let collapsed = (0..n).any(|i| (out[(i + 1) % n] - out[i]).norm() < POINT_TOLERANCE / 10.0);
    if collapsed {
        None
    } else {
        Some(out)
    }
}

/// Closed polyline to points, with bulge arcs split into chords.
fn flatten_polyline(pline: &Polyline<f64>) -> Vec<Point2<f64>> {
    let count = pline.vertex_count();
    let mut points = Vec::new();
    for i in 0..count {
        let v1 = pline.at(i);
        let v2 = pline.at((i + 1) % count);
        points.push(Point2::new(v1.x, v1.y));

        if v1.bulge.abs() > 1e-5 {
            let theta = 4.0 * v1.bulge.atan();
            let chord_len = ((v2.x - v1.x).powi(2) + (v2.y - v1.y).powi(2)).sqrt();
            if chord_len > 1e-5 {
                let radius = chord_len / (2.0 * (theta / 2.0).sin());
                let dist_to_center = radius.abs() * (theta.abs() / 2.0).cos();
                let nx = -(v2.y - v1.y) / chord_len;
                let ny = (v2.x - v1.x) / chord_len;
                let sign = v1.bulge.signum();
                let cx = (v1.x + v2.x) / 2.0 + nx * dist_to_center * sign;
                let cy = (v1.y + v2.y) / 2.0 + ny * dist_to_center * sign;
                let start_angle = (v1.y - cy).atan2(v1.x - cx);
                let mut end_angle = (v2.y - cy).atan2(v2.x - cx);
                if v1.bulge > 0.0 {
                    if end_angle <= start_angle {
                        end_angle += std::f64::consts::TAU;
                    }
                } else if end_angle >= start_angle {
                    end_angle -= std::f64::consts::TAU;
                }
                for j in 1..ARC_SEGMENTS {
                    let t = j as f64 / ARC_SEGMENTS as f64;
                    let angle = start_angle + (end_angle - start_angle) * t;
                    points.push(Point2::new(
                        cx + radius.abs() * angle.cos(),
                        cy + radius.abs() * angle.sin(),
                    ));
                }
            }
        }
    }
    points
}

fn closest_on_segment(a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>) -> Point2<f64> {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < f64::EPSILON {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

fn closest_on_loop(points: &[Point2<f64>], p: &Point2<f64>) -> Point2<f64> {
    let n = points.len();
    let mut best = points[0];
    let mut best_dist = f64::INFINITY;
    for i in 0..n {
        let q = closest_on_segment(&points[i], &points[(i + 1) % n], p);
        let dist = (q - p).norm();
        if dist < best_dist {
            best_dist = dist;
            best = q;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rails::RailSegment;

    fn p2(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    fn square(size: f64) -> Vec<Point2<f64>> {
        vec![p2(0.0, 0.0), p2(size, 0.0), p2(size, size), p2(0.0, size)]
    }

    #[test]
    fn test_kerf_model_endpoints() {
        let model = KerfModel::new(1.6, 1.9);
        assert!((model.offset_for_ratio(1.0) - 0.8).abs() < 1e-12);
        assert!((model.offset_for_ratio(0.4) - 0.95).abs() < 1e-12);
        assert!((model.kerf_for_ratio(0.4) - 1.9).abs() < 1e-12);
    }

    #[test]
    fn test_kerf_model_degenerate_inputs() {
        assert_eq!(KerfModel::new(0.0, 0.0).offset_for_ratio(0.5), 0.0);
        assert_eq!(KerfModel::new(1.2, 1.2).offset_for_ratio(0.5), 0.6);
    }

    #[test]
    fn test_rail_offsets_longer_rail_gets_root() {
        let model = KerfModel::new(1.6, 1.9);
        let (a, b) = model.rail_offsets(PathSegmentLengths::new(100.0, 40.0), false);
        assert!((a - 0.8).abs() < 1e-12);
        assert!((b - 0.95).abs() < 1e-12);

        let (a, b) = model.rail_offsets(PathSegmentLengths::new(40.0, 100.0), true);
        assert!((a + 0.95).abs() < 1e-12);
        assert!((b + 0.8).abs() < 1e-12);

        let (a, b) = model.rail_offsets(PathSegmentLengths::new(50.0, 50.0), false);
        assert_eq!((a, b), (0.8, 0.8));
    }

    #[test]
    fn test_miter_square_grows() {
        let out = miter_offset(&square(10.0), 1.0).unwrap();
        assert!((out[0] - p2(-1.0, -1.0)).norm() < 1e-12);
        assert!((out[2] - p2(11.0, 11.0)).norm() < 1e-12);

        // clockwise input still grows outward
        let mut cw = square(10.0);
        cw.reverse();
        let out = miter_offset(&cw, 1.0).unwrap();
        assert!((out[0] - p2(-1.0, 11.0)).norm() < 1e-12);
    }

    #[test]
    fn test_miter_rejects_swallowed_edge() {
        // a 0.5 mm slot closes under a 1 mm outward offset
        let notch = vec![
            p2(0.0, 0.0),
            p2(10.0, 0.0),
            p2(10.0, 10.0),
            p2(5.25, 10.0),
            p2(5.25, 9.0),
            p2(4.75, 9.0),
            p2(4.75, 10.0),
            p2(0.0, 10.0),
        ];
        assert!(miter_offset(&notch, 1.0).is_none());
    }

    #[test]
    fn test_offset_rail_keeps_duplicates_paired() {
        let rail = vec![
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(10.0, 0.0, 5.0),
            Point3::new(10.0, 0.0, 5.0),
            Point3::new(10.0, 10.0, 5.0),
            Point3::new(0.0, 10.0, 5.0),
            Point3::new(0.0, 0.0, 5.0),
        ];
        let out = offset_rail(&rail, 0.5).unwrap();
        assert_eq!(out.len(), rail.len());
        assert_eq!(out[1], out[2]);
        assert_eq!(out[0], out[5]);
        assert!(out.iter().all(|p| p.z == 5.0));
        assert!((out[0] - Point3::new(-0.5, -0.5, 5.0)).norm() < 1e-12);
    }

    #[test]
    fn test_sharp_tip_falls_back_to_round_joins() {
        // about 1 degree at the tip, far past the miter limit
        let wedge = [p2(0.0, 0.0), p2(100.0, 0.0), p2(0.0, 1.75)];
        assert!(miter_offset(&wedge, 0.8).is_none());

        let rail: Vec<Point3<f64>> = wedge
            .iter()
            .chain(std::iter::once(&wedge[0]))
            .map(|p| Point3::new(p.x, p.y, 20.0))
            .collect();
        let out = offset_rail(&rail, 0.8).unwrap();
        assert_eq!(out.len(), rail.len());
        assert_eq!(out[0], out[3]);
        for (moved, original) in out.iter().zip(&rail) {
            assert_eq!(moved.z, 20.0);
            let shift = (moved.xy() - original.xy()).norm();
            assert!((shift - 0.8).abs() < 0.03, "vertex moved {}", shift);
            let gap = (closest_on_loop(&wedge, &moved.xy()) - moved.xy()).norm();
            assert!((gap - 0.8).abs() < 0.03, "vertex {} from the contour", gap);
        }
    }

    #[test]
    fn test_offset_rail_too_few_points() {
        let rail = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        assert!(offset_rail(&rail, 0.5).is_err());
        assert_eq!(offset_rail(&rail, 0.0).unwrap(), rail);
    }

    #[test]
    fn test_closest_on_loop() {
        let sq = square(10.0);
        let q = closest_on_loop(&sq, &p2(5.0, -3.0));
        assert!((q - p2(5.0, 0.0)).norm() < 1e-12);
        let q = closest_on_loop(&sq, &p2(12.0, 12.0));
        assert!((q - p2(10.0, 10.0)).norm() < 1e-12);
    }

    #[test]
    fn test_compensate_hole_shrinks() {
        let segments = (0..4)
            .map(|i| {
                let sq = square(20.0);
                let (s, e) = (sq[i], sq[(i + 1) % 4]);
                RailSegment::new(
                    vec![Point3::new(s.x, s.y, 0.0), Point3::new(e.x, e.y, 0.0)],
                    vec![Point3::new(s.x, s.y, 100.0), Point3::new(e.x, e.y, 100.0)],
                )
            })
            .collect();
        let ring = ProjectedRing::new(segments);
        let comp = KerfCompensator::new(KerfModel::new(2.0, 2.0));
        let out = comp.compensate("hole", &ring, ring.lengths(), true).unwrap();
        assert_eq!(out.segment_sizes(), ring.segment_sizes());
        assert!((out.segments[0].a[0] - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
        assert!((out.segments[2].b[0] - Point3::new(19.0, 19.0, 100.0)).norm() < 1e-12);
    }

    #[test]
    fn test_compensate_tiny_hole_fails() {
        let segments = (0..4)
            .map(|i| {
                let sq = square(0.5);
                let (s, e) = (sq[i], sq[(i + 1) % 4]);
                RailSegment::new(
                    vec![Point3::new(s.x, s.y, 0.0), Point3::new(e.x, e.y, 0.0)],
                    vec![Point3::new(s.x, s.y, 10.0), Point3::new(e.x, e.y, 10.0)],
                )
            })
            .collect();
        let ring = ProjectedRing::new(segments);
        let comp = KerfCompensator::new(KerfModel::new(2.0, 2.0));
        let err = comp
            .compensate("pin", &ring, ring.lengths(), true)
            .unwrap_err();
        assert!(err.to_string().contains("points too close together"));
    }
}
