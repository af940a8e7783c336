//! Face ring builder.
//!
//! Side faces of a ruled solid are chained through shared edges into closed rings.
//! A solid with holes produces one ring per boundary loop. The two parallel faces
//! are the end caps the wire ends slide on.

use crate::error::{CamToolError, CamToolResult};
use hotwirekit_core::constants::PLANE_TOLERANCE;
use hotwirekit_core::{Face, Solid};
use tracing::debug;

/// Heights of the two end-cap planes, `low < high`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapPlanes {
    pub low: f64,
    pub high: f64,
}

impl CapPlanes {
    pub fn contains(&self, z: f64) -> bool {
        (z - self.low).abs() < PLANE_TOLERANCE || (z - self.high).abs() < PLANE_TOLERANCE
    }
}

/// Ordered transversal faces of a solid grouped into closed rings.
///
/// `order` lists face indices ring after ring; `parts` holds the offset in `order`
/// where each ring starts.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRings {
    order: Vec<usize>,
    parts: Vec<usize>,
    caps: CapPlanes,
}

impl FaceRings {
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn parts(&self) -> &[usize] {
        &self.parts
    }

    pub fn caps(&self) -> CapPlanes {
        self.caps
    }

    pub fn ring_count(&self) -> usize {
        self.parts.len()
    }

    pub fn ring(&self, k: usize) -> Option<&[usize]> {
        let start = *self.parts.get(k)?;
        let end = self.parts.get(k + 1).copied().unwrap_or(self.order.len());
        Some(&self.order[start..end])
    }

    pub fn rings(&self) -> impl Iterator<Item = &[usize]> + '_ {
        (0..self.ring_count()).filter_map(move |k| self.ring(k))
    }
}

pub struct FaceRingBuilder<'a> {
    solid: &'a Solid,
}

impl<'a> FaceRingBuilder<'a> {
    pub fn new(solid: &'a Solid) -> Self {
        Self { solid }
    }

    fn face(&self, index: usize) -> &'a Face {
        &self.solid.faces()[index]
    }

    /// Split face indices into (transversal, parallel).
    pub fn classify(&self) -> (Vec<usize>, Vec<usize>) {
        (0..self.solid.faces().len()).partition(|&i| self.face(i).is_transversal())
    }

    /// Cap planes from the centers of the parallel faces. Exactly two distinct
    /// heights must be present.
    pub fn cap_planes(&self, parallel: &[usize]) -> CamToolResult<CapPlanes> {
        let mut heights: Vec<f64> = Vec::new();
        for &i in parallel {
            let z = self.face(i).center_of_mass().z;
            if !heights.iter().any(|h| (h - z).abs() < PLANE_TOLERANCE) {
                heights.push(z);
            }
        }
        if heights.len() != 2 {
            return Err(CamToolError::adjacency(
                self.solid.name(),
                format!(
                    "expected 2 end-cap planes, found {} among {} parallel faces",
                    heights.len(),
                    parallel.len()
                ),
            ));
        }
        Ok(CapPlanes {
            low: heights[0].min(heights[1]),
            high: heights[0].max(heights[1]),
        })
    }

    /// Chain the transversal faces into closed rings.
    ///
    /// Each ring starts at the first unused face and greedily appends the first unused
    /// face sharing an edge with the current tail. A ring whose tail does not share an
    /// edge with its head is rejected.
    pub fn build(&self) -> CamToolResult<FaceRings> {
        let (transversal, parallel) = self.classify();
        let caps = self.cap_planes(&parallel)?;
        if transversal.is_empty() {
            return Err(CamToolError::adjacency(
                self.solid.name(),
                "solid has no side faces",
            ));
        }

        let mut used = vec![false; transversal.len()];
        let mut order = Vec::with_capacity(transversal.len());
        let mut parts = Vec::new();

        while let Some(seed) = used.iter().position(|u| !u) {
            parts.push(order.len());
            used[seed] = true;
            let head = transversal[seed];
            let mut tail = head;
            order.push(head);

            loop {
                let next = (0..transversal.len()).find(|&k| {
                    !used[k] && self.face(tail).shares_edge_with(self.face(transversal[k]))
                });
                match next {
                    Some(k) => {
                        used[k] = true;
                        tail = transversal[k];
                        order.push(tail);
                    }
                    None => break,
                }
            }

            let ring_len = order.len() - parts[parts.len() - 1];
            let closing = self.face(tail).shared_edges(self.face(head)).len();
            // two faces close a ring only through two distinct shared edges
            let closes = match ring_len {
                0 | 1 => false,
                2 => closing >= 2,
                _ => closing >= 1,
            };
            if !closes {
                return Err(CamToolError::adjacency(
                    self.solid.name(),
                    format!(
                        "ring starting at face {} does not close after {} faces",
                        head, ring_len
                    ),
                ));
            }
            debug!(
                "Shape {}: ring {} has {} faces",
                self.solid.name(),
                parts.len() - 1,
                ring_len
            );
        }

        Ok(FaceRings { order, parts, caps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotwirekit_core::{Edge, Point3, Profile2D, Section, Vector3};

    #[test]
    fn test_rectangle_prism_single_ring() {
        let section = Section::new(Profile2D::rectangle(0.0, 0.0, 100.0, 50.0));
        let solid = Solid::prism("block", &section, 0.0, 500.0).unwrap();
        let rings = FaceRingBuilder::new(&solid).build().unwrap();
        assert_eq!(rings.ring_count(), 1);
        assert_eq!(rings.parts(), &[0]);
        assert_eq!(rings.order().len(), 4);
        assert_eq!(rings.caps(), CapPlanes { low: 0.0, high: 500.0 });
    }

    #[test]
    fn test_consecutive_faces_share_edges() {
        let section = Section::new(Profile2D::polygon(&[
            [0.0, 0.0],
            [40.0, 0.0],
            [50.0, 20.0],
            [20.0, 35.0],
            [-5.0, 15.0],
        ]));
        let solid = Solid::prism("penta", &section, 10.0, 110.0).unwrap();
        let rings = FaceRingBuilder::new(&solid).build().unwrap();
        let ring = rings.ring(0).unwrap();
        assert_eq!(ring.len(), 5);
        for i in 0..ring.len() {
            let a = &solid.faces()[ring[i]];
            let b = &solid.faces()[ring[(i + 1) % ring.len()]];
            assert!(a.shares_edge_with(b));
        }
    }

    #[test]
    fn test_hole_gives_second_ring() {
        let section = Section::new(Profile2D::rectangle(0.0, 0.0, 100.0, 100.0))
            .with_hole(Profile2D::circle(50.0, 50.0, 10.0));
        let solid = Solid::prism("ring", &section, 0.0, 200.0).unwrap();
        let rings = FaceRingBuilder::new(&solid).build().unwrap();
        assert_eq!(rings.ring_count(), 2);
        assert_eq!(rings.parts(), &[0, 4]);
        assert_eq!(rings.ring(1).unwrap().len(), 4);
        assert!(rings.ring(2).is_none());
    }

    #[test]
    fn test_missing_cap_rejected() {
        let section = Section::new(Profile2D::rectangle(0.0, 0.0, 10.0, 10.0));
        let solid = Solid::prism("open", &section, 0.0, 50.0).unwrap();
        let faces: Vec<Face> = solid
            .faces()
            .iter()
            .filter(|f| f.is_transversal())
            .cloned()
            .collect();
        let capless = Solid::new("open", faces);
        let err = FaceRingBuilder::new(&capless).build().unwrap_err();
        assert!(matches!(err, CamToolError::GeometryAdjacency { .. }));
    }

    #[test]
    fn test_unclosed_ring_rejected() {
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        let wall = |x0: f64, x1: f64| {
            Face::from_edges(vec![
                Edge::line(p(x0, 0.0, 0.0), p(x1, 0.0, 0.0)),
                Edge::line(p(x1, 0.0, 0.0), p(x1, 0.0, 10.0)),
                Edge::line(p(x1, 0.0, 10.0), p(x0, 0.0, 10.0)),
                Edge::line(p(x0, 0.0, 10.0), p(x0, 0.0, 0.0)),
            ])
        };
        let faces = vec![
            wall(0.0, 5.0),
            wall(5.0, 10.0),
            wall(10.0, 15.0),
            Face::new(vec![Edge::line(p(0.0, 0.0, 0.0), p(15.0, 0.0, 0.0))], -Vector3::z()),
            Face::new(vec![Edge::line(p(0.0, 0.0, 10.0), p(15.0, 0.0, 10.0))], Vector3::z()),
        ];
        let solid = Solid::new("strip", faces);
        let err = FaceRingBuilder::new(&solid).build().unwrap_err();
        assert!(err.to_string().contains("does not close"));
    }
}
