//! Shape path generator.
//!
//! Turns one solid into kerf-compensated, closed rail pairs: one outer loop plus one
//! loop per hole.

use crate::error::{CamToolError, CamToolResult};
use crate::face_ring::FaceRingBuilder;
use crate::kerf::{KerfCompensator, KerfModel};
use crate::rail_projector::DualRailProjector;
use crate::rails::{PathSegmentLengths, ProjectedRing, RailPair};
use hotwirekit_core::Solid;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapePathParameters {
    /// Spacing of rail points on curved faces, mm per point
    pub resolution: f64,
    /// Cut clockwise instead of counter-clockwise
    pub reverse: bool,
}

impl Default for ShapePathParameters {
    fn default() -> Self {
        Self {
            resolution: 5.0,
            reverse: false,
        }
    }
}

/// One finished loop and the raw rail lengths it was compensated with.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeLoop {
    pub rails: RailPair,
    pub lengths: PathSegmentLengths,
}

/// All loops of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePaths {
    pub outer: ShapeLoop,
    pub inner: Vec<ShapeLoop>,
}

pub struct ShapePathGenerator {
    params: ShapePathParameters,
    compensator: KerfCompensator,
}

impl ShapePathGenerator {
    pub fn new(params: ShapePathParameters, kerf: KerfModel) -> Self {
        Self {
            params,
            compensator: KerfCompensator::new(kerf),
        }
    }

    pub fn params(&self) -> &ShapePathParameters {
        &self.params
    }

    pub fn generate(&self, solid: &Solid) -> CamToolResult<ShapePaths> {
        let rings = FaceRingBuilder::new(solid).build()?;
        let projector = DualRailProjector::new(solid, rings.caps(), self.params.resolution)?;

        let mut projected: Vec<ProjectedRing> = rings
            .rings()
            .map(|ring| projector.project(ring))
            .collect::<CamToolResult<_>>()?;

        // the loop with the widest footprint is the outer boundary
        let outer_index = projected
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.planar_extent()
                    .partial_cmp(&b.planar_extent())
                    .unwrap_or(Ordering::Equal)
            })
            .map(|(i, _)| i)
            .ok_or_else(|| CamToolError::adjacency(solid.name(), "no rings found"))?;
        let outer_ring = projected.remove(outer_index);

        let outer = self.finish_loop(solid.name(), &outer_ring, false)?;
        let inner = projected
            .iter()
            .map(|ring| self.finish_loop(solid.name(), ring, true))
            .collect::<CamToolResult<Vec<_>>>()?;

        info!(
            "Shape {}: outer loop of {} points, {} inner loop(s)",
            solid.name(),
            outer.rails.len(),
            inner.len()
        );
        Ok(ShapePaths { outer, inner })
    }

    fn finish_loop(&self, shape: &str, ring: &ProjectedRing, inner: bool) -> CamToolResult<ShapeLoop> {
        let raw_lengths = ring.lengths();
        let compensated = self.compensator.compensate(shape, ring, raw_lengths, inner)?;
        let (rails, lengths) = compensated.finish(raw_lengths)?;
        let rails = if rails.is_ccw() == self.params.reverse {
            rails.reversed()
        } else {
            rails
        };
        debug!(
            "Shape {}: {} loop lengths A={:.3} B={:.3}",
            shape,
            if inner { "inner" } else { "outer" },
            lengths.a,
            lengths.b
        );
        Ok(ShapeLoop { rails, lengths })
    }
}
