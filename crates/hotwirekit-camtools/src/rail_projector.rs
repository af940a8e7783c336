//! Dual-rail projector.
//!
//! Each side face of a ring is turned into a pair of rails, one along the face's
//! boundary on each end cap. Consecutive faces meet on their shared spanning edge,
//! whose two endpoints are the wire position at the transition.

use crate::error::{CamToolError, CamToolResult};
use crate::face_ring::CapPlanes;
use crate::rails::{ProjectedRing, RailSegment};
use hotwirekit_core::constants::{PLANE_TOLERANCE, POINT_TOLERANCE};
use hotwirekit_core::{Edge, Face, Solid};
use nalgebra::Point3;
use tracing::debug;

/// Wire position where one face hands over to the next.
#[derive(Debug, Clone, Copy)]
struct Transition {
    low: Point3<f64>,
    high: Point3<f64>,
    center: Point3<f64>,
}

pub struct DualRailProjector<'a> {
    solid: &'a Solid,
    caps: CapPlanes,
    resolution: f64,
}

impl<'a> DualRailProjector<'a> {
    /// `resolution` is the target spacing between rail points on curved faces, mm.
    pub fn new(solid: &'a Solid, caps: CapPlanes, resolution: f64) -> CamToolResult<Self> {
        if resolution.is_nan() || resolution <= 0.0 {
            return Err(CamToolError::InvalidParameters(format!(
                "path resolution must be > 0, got {}",
                resolution
            )));
        }
        Ok(Self {
            solid,
            caps,
            resolution,
        })
    }

    fn face(&self, index: usize) -> &'a Face {
        &self.solid.faces()[index]
    }

    fn name(&self) -> &str {
        self.solid.name()
    }

    /// Project one ring of face indices. Rail A runs on the low cap, rail B on the high cap.
    pub fn project(&self, ring: &[usize]) -> CamToolResult<ProjectedRing> {
        let transitions = self.transitions(ring)?;
        let n = ring.len();
        let mut segments: Vec<RailSegment> = Vec::with_capacity(n);
        let mut first_collapsed = false;

        for i in 0..n {
            let entry = transitions[(i + n - 1) % n];
            let exit = transitions[i];
            let face = self.face(ring[i]);

            let chain_a = self.cap_chain(face, ring[i], self.caps.low, entry.low, exit.low)?;
            let chain_b = self.cap_chain(face, ring[i], self.caps.high, entry.high, exit.high)?;
            let segment = self.sample(&chain_a, &chain_b, &entry, &exit);

            let lengths = segment.lengths();
            if lengths.a.min(lengths.b) < PLANE_TOLERANCE {
                match segments.pop() {
                    Some(prev) => {
                        // fold a collapsed face into the previous one as a straight move
                        debug!(
                            "Shape {}: face {} rail length {:.4} merged into previous segment",
                            self.name(),
                            ring[i],
                            lengths.a.min(lengths.b)
                        );
                        segments.push(merged(&prev, &segment));
                        continue;
                    }
                    None => first_collapsed = true,
                }
            }
            segments.push(segment);
        }

        // the ring is cyclic: a collapsed first face folds into the last one
        if first_collapsed && segments.len() > 1 {
            let first = segments.remove(0);
            if let Some(last) = segments.pop() {
                debug!(
                    "Shape {}: face {} merged into the closing segment",
                    self.name(),
                    ring[0]
                );
                segments.push(merged(&last, &first));
            }
        }

        Ok(ProjectedRing::new(segments))
    }

    /// Exit transition of every face in the ring.
    ///
    /// Two faces can share more than one edge (a ring of two half-cylinders); the exit
    /// edge is the shared edge that is not the face's entry edge.
    fn transitions(&self, ring: &[usize]) -> CamToolResult<Vec<Transition>> {
        let n = ring.len();
        if n < 2 {
            return Err(CamToolError::adjacency(
                self.name(),
                format!("ring of {} face cannot be projected", n),
            ));
        }

        let mut out: Vec<Transition> = Vec::with_capacity(n);
        for i in 0..n {
            let current = self.face(ring[i]);
            let next = self.face(ring[(i + 1) % n]);
            let shared = current.shared_edges(next);
            let entry_center = out.last().map(|t| t.center);
            let chosen = shared
                .iter()
                .map(|(edge, _)| *edge)
                .find(|edge| {
                    entry_center
                        .map(|c| (edge.center_of_mass() - c).norm() >= POINT_TOLERANCE)
                        .unwrap_or(true)
                })
                .ok_or_else(|| {
                    CamToolError::adjacency(
                        self.name(),
                        format!(
                            "faces {} and {} share no exit edge",
                            ring[i],
                            ring[(i + 1) % n]
                        ),
                    )
                })?;
            out.push(self.transition(chosen, ring[i])?);
        }
        Ok(out)
    }

    fn transition(&self, edge: &Edge, face: usize) -> CamToolResult<Transition> {
        let on = |p: &Point3<f64>, z: f64| (p.z - z).abs() < PLANE_TOLERANCE;
        let (s, e) = (edge.start(), edge.end());
        let (low, high) = if on(&s, self.caps.low) && on(&e, self.caps.high) {
            (s, e)
        } else if on(&e, self.caps.low) && on(&s, self.caps.high) {
            (e, s)
        } else {
            return Err(CamToolError::adjacency(
                self.name(),
                format!(
                    "exit edge of face {} from z={:.3} to z={:.3} does not span both end caps",
                    face, s.z, e.z
                ),
            ));
        };
        Ok(Transition {
            low,
            high,
            center: edge.center_of_mass(),
        })
    }

    /// Boundary edges of `face` lying on the cap at height `z`, chained and oriented
    /// from `from` to `to`.
    fn cap_chain(
        &self,
        face: &Face,
        index: usize,
        z: f64,
        from: Point3<f64>,
        to: Point3<f64>,
    ) -> CamToolResult<Vec<Edge>> {
        let mut pool: Vec<&Edge> = face
            .edges()
            .iter()
            .filter(|e| (e.center_of_mass().z - z).abs() < PLANE_TOLERANCE)
            .collect();

        let mut chain = Vec::new();
        let mut cursor = from;
        while (cursor - to).norm() >= POINT_TOLERANCE {
            let k = pool
                .iter()
                .position(|e| e.touches(&cursor))
                .ok_or_else(|| {
                    CamToolError::adjacency(
                        self.name(),
                        format!("face {} has no rail edge on the cap at z={:.3}", index, z),
                    )
                })?;
            let edge = pool.swap_remove(k);
            let oriented = if (edge.start() - cursor).norm() < POINT_TOLERANCE {
                edge.clone()
            } else {
                edge.reversed()
            };
            cursor = oriented.end();
            chain.push(oriented);
        }
        Ok(chain)
    }

    fn sample(
        &self,
        chain_a: &[Edge],
        chain_b: &[Edge],
        entry: &Transition,
        exit: &Transition,
    ) -> RailSegment {
        let straight = |chain: &[Edge]| chain.len() <= 1 && chain.iter().all(|e| e.is_line());
        if straight(chain_a) && straight(chain_b) {
            return RailSegment::new(vec![entry.low, exit.low], vec![entry.high, exit.high]);
        }

        let len_a: f64 = chain_a.iter().map(|e| e.length()).sum();
        let len_b: f64 = chain_b.iter().map(|e| e.length()).sum();
        let count = ((len_a.max(len_b) / self.resolution).floor() as usize).max(2);
        RailSegment::new(
            sample_chain(chain_a, count, entry.low, exit.low),
            sample_chain(chain_b, count, entry.high, exit.high),
        )
    }
}

/// Straight segment from the start of `prev` to the end of `next`.
fn merged(prev: &RailSegment, next: &RailSegment) -> RailSegment {
    RailSegment::new(
        vec![prev.a[0], next.a[next.len() - 1]],
        vec![prev.b[0], next.b[next.len() - 1]],
    )
}

/// `count` points spread evenly by arc length along a chain of edges.
fn sample_chain(
    chain: &[Edge],
    count: usize,
    start: Point3<f64>,
    end: Point3<f64>,
) -> Vec<Point3<f64>> {
    let total: f64 = chain.iter().map(|e| e.length()).sum();
    if chain.is_empty() || total < POINT_TOLERANCE {
        return vec![start; count];
    }

    let mut points = Vec::with_capacity(count);
    let mut edge = 0;
    let mut walked = 0.0;
    for k in 0..count {
        let target = total * k as f64 / (count - 1) as f64;
        while edge + 1 < chain.len() && walked + chain[edge].length() < target {
            walked += chain[edge].length();
            edge += 1;
        }
        let len = chain[edge].length();
        let t = if len > 0.0 { (target - walked) / len } else { 0.0 };
        points.push(chain[edge].point_at(t));
    }
    points[0] = start;
    points[count - 1] = end;
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_ring::FaceRingBuilder;
    use hotwirekit_core::{Profile2D, Section};

    fn project(solid: &Solid, resolution: f64) -> Vec<ProjectedRing> {
        let rings = FaceRingBuilder::new(solid).build().unwrap();
        let projector = DualRailProjector::new(solid, rings.caps(), resolution).unwrap();
        rings.rings().map(|r| projector.project(r).unwrap()).collect()
    }

    #[test]
    fn test_box_gives_two_point_segments() {
        let section = Section::new(Profile2D::rectangle(0.0, 0.0, 100.0, 50.0));
        let solid = Solid::prism("block", &section, 0.0, 500.0).unwrap();
        let rings = project(&solid, 1.0);
        assert_eq!(rings.len(), 1);
        let ring = &rings[0];
        assert_eq!(ring.segments.len(), 4);
        for seg in &ring.segments {
            assert_eq!(seg.len(), 2);
            assert!(seg.a.iter().all(|p| p.z.abs() < 1e-9));
            assert!(seg.b.iter().all(|p| (p.z - 500.0).abs() < 1e-9));
        }
        // segments chain end to start
        for i in 0..4 {
            let next = &ring.segments[(i + 1) % 4];
            assert!((ring.segments[i].a[1] - next.a[0]).norm() < 1e-9);
        }
        assert!((ring.lengths().a - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_arc_faces_are_sampled_by_resolution() {
        let section = Section::new(Profile2D::circle(0.0, 0.0, 20.0));
        let solid = Solid::prism("rod", &section, 0.0, 100.0).unwrap();
        let rings = project(&solid, 2.0);
        let ring = &rings[0];
        assert_eq!(ring.segments.len(), 4);
        let quarter = 20.0 * std::f64::consts::FRAC_PI_2;
        let expected = (quarter / 2.0).floor() as usize;
        for seg in &ring.segments {
            assert_eq!(seg.len(), expected);
            for p in &seg.a {
                assert!((p.coords.xy().norm() - 20.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_tapered_loft_pairs_points() {
        let root = Section::new(Profile2D::circle(0.0, 0.0, 40.0));
        let tip = Section::new(Profile2D::circle(0.0, 0.0, 10.0));
        let solid = Solid::loft("cone", &root, &tip, 0.0, 200.0).unwrap();
        let rings = project(&solid, 5.0);
        let ring = &rings[0];
        for seg in &ring.segments {
            assert_eq!(seg.a.len(), seg.b.len());
            // both rails keep the same angular position
            for (a, b) in seg.a.iter().zip(&seg.b) {
                let (va, vb) = (a.coords.xy(), b.coords.xy());
                assert!((va.x * vb.y - va.y * vb.x).abs() < 1e-6);
                assert!(va.dot(&vb) > 0.0);
            }
        }
    }

    #[test]
    fn test_collapsed_face_merges_into_previous() {
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        let root = [p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0), p(10.0, 10.0, 0.0), p(0.0, 10.0, 0.0)];
        // the last tip corner coincides with the first, so face 3 has no top rail
        let tip = [p(0.0, 0.0, 10.0), p(10.0, 0.0, 10.0), p(10.0, 10.0, 10.0), p(0.0, 0.0, 10.0)];
        let mut faces: Vec<Face> = (0..4)
            .map(|i| {
                let j = (i + 1) % 4;
                Face::from_edges(vec![
                    Edge::line(root[i], root[j]),
                    Edge::line(root[j], tip[j]),
                    Edge::line(tip[j], tip[i]),
                    Edge::line(tip[i], root[i]),
                ])
            })
            .collect();
        let low: Vec<Edge> = (0..4).map(|i| Edge::line(root[i], root[(i + 1) % 4])).collect();
        let high: Vec<Edge> = (0..3).map(|i| Edge::line(tip[i], tip[i + 1])).collect();
        faces.push(Face::new(low, -hotwirekit_core::Vector3::z()));
        faces.push(Face::new(high, hotwirekit_core::Vector3::z()));
        let solid = Solid::new("pinched", faces);

        let rings = project(&solid, 1.0);
        let ring = &rings[0];
        assert_eq!(ring.segments.len(), 3);
        let merged = &ring.segments[2];
        assert_eq!(merged.a, vec![root[2], root[0]]);
        assert_eq!(merged.b, vec![tip[2], tip[0]]);
    }

    #[test]
    fn test_collapsed_first_face_merges_into_last() {
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        let root = [p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0), p(10.0, 10.0, 0.0), p(0.0, 10.0, 0.0)];
        // the first two tip corners coincide, so face 0 has no top rail
        let tip = [p(0.0, 0.0, 10.0), p(0.0, 0.0, 10.0), p(10.0, 10.0, 10.0), p(0.0, 10.0, 10.0)];
        let mut faces: Vec<Face> = (0..4)
            .map(|i| {
                let j = (i + 1) % 4;
                Face::from_edges(vec![
                    Edge::line(root[i], root[j]),
                    Edge::line(root[j], tip[j]),
                    Edge::line(tip[j], tip[i]),
                    Edge::line(tip[i], root[i]),
                ])
            })
            .collect();
        let low: Vec<Edge> = (0..4).map(|i| Edge::line(root[i], root[(i + 1) % 4])).collect();
        let high: Vec<Edge> = (1..4).map(|i| Edge::line(tip[i], tip[(i + 1) % 4])).collect();
        faces.push(Face::new(low, -hotwirekit_core::Vector3::z()));
        faces.push(Face::new(high, hotwirekit_core::Vector3::z()));
        let solid = Solid::new("pinched", faces);

        let rings = project(&solid, 1.0);
        let ring = &rings[0];
        assert_eq!(ring.segments.len(), 3);
        assert_eq!(ring.segments[0].a[0], root[1]);
        let closing = &ring.segments[2];
        assert_eq!(closing.a, vec![root[3], root[1]]);
        assert_eq!(closing.b, vec![tip[3], tip[1]]);
        for seg in &ring.segments {
            let lengths = seg.lengths();
            assert!(lengths.a.min(lengths.b) >= PLANE_TOLERANCE);
        }
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let section = Section::new(Profile2D::rectangle(0.0, 0.0, 10.0, 10.0));
        let solid = Solid::prism("block", &section, 0.0, 10.0).unwrap();
        let caps = CapPlanes { low: 0.0, high: 10.0 };
        assert!(DualRailProjector::new(&solid, caps, 0.0).is_err());
    }

    #[test]
    fn test_sample_chain_hits_corners_of_equal_edges() {
        let chain = vec![
            Edge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)),
            Edge::line(Point3::new(10.0, 0.0, 0.0), Point3::new(10.0, 10.0, 0.0)),
        ];
        let pts = sample_chain(&chain, 5, chain[0].start(), chain[1].end());
        assert_eq!(pts.len(), 5);
        assert!((pts[2] - Point3::new(10.0, 0.0, 0.0)).norm() < 1e-9);
        assert!((pts[4] - Point3::new(10.0, 10.0, 0.0)).norm() < 1e-9);
    }
}
