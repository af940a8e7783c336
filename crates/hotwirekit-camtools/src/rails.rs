//! Rail data shared by the projector, the kerf compensator and the path graph.
//!
//! A wire position is a pair of 3D points, one per end-cap plane. Side A is always
//! the rail on the lower cap once a ring has been finished.

use crate::error::{CamToolError, CamToolResult};
use hotwirekit_core::constants::POINT_TOLERANCE;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Travelled length of each rail over one path element, mm.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathSegmentLengths {
    pub a: f64,
    pub b: f64,
}

/// One of the two wire ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rail {
    A,
    B,
}

impl PathSegmentLengths {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    pub fn swapped(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
        }
    }

    /// Rail that travels further and therefore sets the feed. Ties go to A.
    pub fn driver(&self) -> Rail {
        if self.a >= self.b {
            Rail::A
        } else {
            Rail::B
        }
    }
}

/// Polyline length measured in 3D.
pub fn polyline_length(points: &[Point3<f64>]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// Polyline length measured in the XY plane.
pub fn planar_length(points: &[Point3<f64>]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].xy() - w[0].xy()).norm())
        .sum()
}

/// Shoelace area of the XY projection; positive for counter-clockwise loops.
pub fn signed_area(points: &[Point3<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let p = &points[i];
            let q = &points[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum();
    twice / 2.0
}

/// Rails of one side face: `a[i]` and `b[i]` are the two ends of the same wire position.
#[derive(Debug, Clone, PartialEq)]
pub struct RailSegment {
    pub a: Vec<Point3<f64>>,
    pub b: Vec<Point3<f64>>,
}

impl RailSegment {
    pub fn new(a: Vec<Point3<f64>>, b: Vec<Point3<f64>>) -> Self {
        Self { a, b }
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn lengths(&self) -> PathSegmentLengths {
        PathSegmentLengths::new(polyline_length(&self.a), polyline_length(&self.b))
    }
}

/// Rails of a whole face ring before cleanup, one segment per face.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectedRing {
    pub segments: Vec<RailSegment>,
}

impl ProjectedRing {
    pub fn new(segments: Vec<RailSegment>) -> Self {
        Self { segments }
    }

    /// Segment sizes, used to split a flattened rail back into segments.
    pub fn segment_sizes(&self) -> Vec<usize> {
        self.segments.iter().map(|s| s.len()).collect()
    }

    pub fn flat_a(&self) -> Vec<Point3<f64>> {
        self.segments.iter().flat_map(|s| s.a.iter().copied()).collect()
    }

    pub fn flat_b(&self) -> Vec<Point3<f64>> {
        self.segments.iter().flat_map(|s| s.b.iter().copied()).collect()
    }

    /// Closed length of each rail, summed over the segments.
    pub fn lengths(&self) -> PathSegmentLengths {
        self.segments
            .iter()
            .map(|s| s.lengths())
            .fold(PathSegmentLengths::default(), |acc, l| {
                PathSegmentLengths::new(acc.a + l.a, acc.b + l.b)
            })
    }

    /// XY bounding-box area of rail A, used to tell the outer ring from holes.
    pub fn planar_extent(&self) -> f64 {
        let points = self.flat_a();
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if points.is_empty() {
            0.0
        } else {
            (max_x - min_x) * (max_y - min_y)
        }
    }

    /// Rebuild a ring with the same segment layout from flattened rails.
    pub fn with_flat_rails(&self, a: &[Point3<f64>], b: &[Point3<f64>]) -> CamToolResult<Self> {
        let total: usize = self.segment_sizes().iter().sum();
        if a.len() != total || b.len() != total {
            return Err(CamToolError::GenerationFailed(format!(
                "rail sizes {}/{} do not match ring layout of {} points",
                a.len(),
                b.len(),
                total
            )));
        }
        let mut start = 0;
        let mut segments = Vec::with_capacity(self.segments.len());
        for size in self.segment_sizes() {
            segments.push(RailSegment::new(
                a[start..start + size].to_vec(),
                b[start..start + size].to_vec(),
            ));
            start += size;
        }
        Ok(Self { segments })
    }

    /// Turn the per-face segments into one closed rail pair.
    ///
    /// The last point of every segment repeats the first point of the next one and
    /// is dropped; consecutive positions where both rails coincide collapse into one;
    /// the loop is closed on its first point. When rail A ends up on the higher plane
    /// the rails swap, and `lengths` swaps with them.
    pub fn finish(
        &self,
        lengths: PathSegmentLengths,
    ) -> CamToolResult<(RailPair, PathSegmentLengths)> {
        let mut a: Vec<Point3<f64>> = Vec::new();
        let mut b: Vec<Point3<f64>> = Vec::new();
        for segment in &self.segments {
            let keep = segment.len().saturating_sub(1);
            for i in 0..keep {
                let (pa, pb) = (segment.a[i], segment.b[i]);
                let duplicate = match (a.last(), b.last()) {
                    (Some(la), Some(lb)) => {
                        (pa - la).norm() < POINT_TOLERANCE && (pb - lb).norm() < POINT_TOLERANCE
                    }
                    _ => false,
                };
                if !duplicate {
                    a.push(pa);
                    b.push(pb);
                }
            }
        }

        while a.len() > 1 {
            let n = a.len() - 1;
            if (a[n] - a[0]).norm() < POINT_TOLERANCE && (b[n] - b[0]).norm() < POINT_TOLERANCE {
                a.pop();
                b.pop();
            } else {
                break;
            }
        }

        if a.len() < 2 {
            return Err(CamToolError::GenerationFailed(format!(
                "ring collapsed to {} distinct wire positions",
                a.len()
            )));
        }
        a.push(a[0]);
        b.push(b[0]);

        if a[0].z > b[0].z {
            Ok((RailPair { side_a: b, side_b: a }, lengths.swapped()))
        } else {
            Ok((RailPair { side_a: a, side_b: b }, lengths))
        }
    }
}

/// Closed, cleaned wire path of one shape: `side_a[i]` pairs with `side_b[i]` and the
/// last position repeats the first.
#[derive(Debug, Clone, PartialEq)]
pub struct RailPair {
    side_a: Vec<Point3<f64>>,
    side_b: Vec<Point3<f64>>,
}

impl RailPair {
    pub fn new(side_a: Vec<Point3<f64>>, side_b: Vec<Point3<f64>>) -> CamToolResult<Self> {
        if side_a.len() != side_b.len() {
            return Err(CamToolError::InvalidParameters(format!(
                "rail A has {} points, rail B has {}",
                side_a.len(),
                side_b.len()
            )));
        }
        if side_a.len() < 2 {
            return Err(CamToolError::InvalidParameters(
                "a rail pair needs at least 2 points".into(),
            ));
        }
        Ok(Self { side_a, side_b })
    }

    pub fn side_a(&self) -> &[Point3<f64>] {
        &self.side_a
    }

    pub fn side_b(&self) -> &[Point3<f64>] {
        &self.side_b
    }

    pub fn len(&self) -> usize {
        self.side_a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.side_a.is_empty()
    }

    /// Both rails of wire position `i`.
    pub fn point(&self, i: usize) -> Option<(Point3<f64>, Point3<f64>)> {
        Some((*self.side_a.get(i)?, *self.side_b.get(i)?))
    }

    pub fn is_closed(&self) -> bool {
        let n = self.len();
        n > 2
            && (self.side_a[n - 1] - self.side_a[0]).norm() < POINT_TOLERANCE
            && (self.side_b[n - 1] - self.side_b[0]).norm() < POINT_TOLERANCE
    }

    /// Number of distinct positions around a closed loop.
    pub fn unique_len(&self) -> usize {
        if self.is_closed() {
            self.len() - 1
        } else {
            self.len()
        }
    }

    /// Index of the first position whose A or B point lies within tolerance of `p`.
    pub fn find_point(&self, p: &Point3<f64>) -> Option<usize> {
        (0..self.unique_len()).find(|&i| {
            (self.side_a[i] - p).norm() < POINT_TOLERANCE
                || (self.side_b[i] - p).norm() < POINT_TOLERANCE
        })
    }

    pub fn lengths(&self) -> PathSegmentLengths {
        PathSegmentLengths::new(polyline_length(&self.side_a), polyline_length(&self.side_b))
    }

    pub fn is_ccw(&self) -> bool {
        signed_area(&self.side_a[..self.unique_len()]) > 0.0
    }

    /// Same loop walked the other way round.
    pub fn reversed(&self) -> RailPair {
        RailPair {
            side_a: self.side_a.iter().rev().copied().collect(),
            side_b: self.side_b.iter().rev().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    fn square_segments(z0: f64, z1: f64) -> ProjectedRing {
        let corners = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let segments = (0..4)
            .map(|i| {
                let (x0, y0) = corners[i];
                let (x1, y1) = corners[(i + 1) % 4];
                RailSegment::new(
                    vec![p(x0, y0, z0), p(x1, y1, z0)],
                    vec![p(x0, y0, z1), p(x1, y1, z1)],
                )
            })
            .collect();
        ProjectedRing::new(segments)
    }

    #[test]
    fn test_finish_closes_and_drops_joints() {
        let ring = square_segments(0.0, 100.0);
        let lengths = ring.lengths();
        assert_eq!(lengths, PathSegmentLengths::new(40.0, 40.0));

        let (rails, _) = ring.finish(lengths).unwrap();
        assert_eq!(rails.len(), 5);
        assert!(rails.is_closed());
        assert_eq!(rails.unique_len(), 4);
        assert!(rails.is_ccw());
    }

    #[test]
    fn test_finish_swaps_rails_and_lengths() {
        let ring = square_segments(100.0, 0.0);
        let lengths = PathSegmentLengths::new(1.0, 2.0);
        let (rails, swapped) = ring.finish(lengths).unwrap();
        assert_eq!(rails.side_a()[0].z, 0.0);
        assert_eq!(swapped, PathSegmentLengths::new(2.0, 1.0));
    }

    #[test]
    fn test_finish_keeps_point_when_only_one_rail_repeats() {
        // rail A pinches to a point while B keeps moving
        let ring = ProjectedRing::new(vec![
            RailSegment::new(
                vec![p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.0), p(5.0, 0.0, 0.0)],
                vec![p(0.0, 0.0, 9.0), p(1.0, 0.0, 9.0), p(5.0, 0.0, 9.0)],
            ),
            RailSegment::new(
                vec![p(5.0, 0.0, 0.0), p(5.0, 5.0, 0.0), p(0.0, 0.0, 0.0)],
                vec![p(5.0, 0.0, 9.0), p(5.0, 5.0, 9.0), p(0.0, 0.0, 9.0)],
            ),
        ]);
        let (rails, _) = ring.finish(ring.lengths()).unwrap();
        assert_eq!(rails.unique_len(), 4);
    }

    #[test]
    fn test_collapsed_ring_is_an_error() {
        let ring = ProjectedRing::new(vec![RailSegment::new(
            vec![p(1.0, 1.0, 0.0), p(1.0, 1.0, 0.0)],
            vec![p(1.0, 1.0, 5.0), p(1.0, 1.0, 5.0)],
        )]);
        assert!(ring.finish(ring.lengths()).is_err());
    }

    #[test]
    fn test_find_point_matches_either_rail() {
        let (rails, _) = square_segments(0.0, 50.0)
            .finish(PathSegmentLengths::default())
            .unwrap();
        assert_eq!(rails.find_point(&p(10.0, 10.0, 0.0)), Some(2));
        assert_eq!(rails.find_point(&p(10.0, 0.0, 50.0)), Some(1));
        assert_eq!(rails.find_point(&p(10.0, 0.0, 25.0)), None);
    }

    #[test]
    fn test_reversed_flips_winding() {
        let (rails, _) = square_segments(0.0, 50.0)
            .finish(PathSegmentLengths::default())
            .unwrap();
        let rev = rails.reversed();
        assert!(!rev.is_ccw());
        assert!(rev.is_closed());
        assert_eq!(rev.side_a()[0], rails.side_a()[0]);
    }

    #[test]
    fn test_driver_rail() {
        assert_eq!(PathSegmentLengths::new(3.0, 3.0).driver(), Rail::A);
        assert_eq!(PathSegmentLengths::new(1.0, 3.0).driver(), Rail::B);
    }

    #[test]
    fn test_planar_length_ignores_z() {
        let pts = [p(0.0, 0.0, 0.0), p(3.0, 4.0, 100.0)];
        assert_eq!(planar_length(&pts), 5.0);
        assert!(polyline_length(&pts) > 100.0);
    }
}
