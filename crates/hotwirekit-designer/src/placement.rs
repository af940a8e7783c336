//! Part placement on the cutting table.
//!
//! Parts are laid out against the base block, the fixed foam support sitting on the
//! table. Every operation computes per-object translation deltas first and applies
//! them afterwards, so a caller can preview a move before committing it.

use crate::error::{LayoutError, LayoutResult};
use hotwirekit_core::{BoundingBox3, Solid};
use hotwirekit_settings::TableProfile;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Alignment against the base block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseAlignment {
    /// Bottom of the part on the top face of the base
    Top,
    /// Part starts where the base starts along X
    Front,
    /// Part ends where the base ends along X
    Back,
    ZMin,
    ZMax,
}

/// Alignment against the first selected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectAlignment {
    ZMin,
    ZMax,
    YMin,
    YMax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributeAxis {
    X,
    Y,
}

/// A part with its untransformed bounds and the translation applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedObject {
    pub name: String,
    local_bounds: BoundingBox3,
    pub offset: Vector3<f64>,
}

impl PlacedObject {
    pub fn new(name: impl Into<String>, bounds: BoundingBox3) -> Self {
        Self {
            name: name.into(),
            local_bounds: bounds,
            offset: Vector3::zeros(),
        }
    }

    pub fn from_solid(solid: &Solid) -> LayoutResult<Self> {
        let bounds = solid
            .bounding_box()
            .ok_or_else(|| LayoutError::EmptyObject(solid.name().to_string()))?;
        Ok(Self::new(solid.name(), bounds))
    }

    /// Bounds in table space.
    pub fn bounds(&self) -> BoundingBox3 {
        self.local_bounds.translated(&self.offset)
    }

    pub fn translate(&mut self, delta: &Vector3<f64>) {
        self.offset += *delta;
    }

    /// `solid` moved to this object's placement.
    pub fn place(&self, solid: &Solid) -> Solid {
        solid.translated(&self.offset)
    }
}

/// Base block of a table profile. It sits on the table at Y=0, starts at the base X
/// offset and is centered between the two gantries.
pub fn base_box(table: &TableProfile) -> BoundingBox3 {
    let z0 = (table.wire_length - table.base_height) / 2.0;
    let min = Point3::new(table.base_x_offset, 0.0, z0);
    let max = Point3::new(
        table.base_x_offset + table.base_length,
        table.base_width,
        z0 + table.base_height,
    );
    BoundingBox3::new(min, max)
}

#[derive(Debug, Clone)]
pub struct Layout {
    base: BoundingBox3,
    objects: Vec<PlacedObject>,
}

impl Layout {
    pub fn new(base: BoundingBox3) -> Self {
        Self {
            base,
            objects: Vec::new(),
        }
    }

    pub fn from_table(table: &TableProfile) -> Self {
        Self::new(base_box(table))
    }

    pub fn base(&self) -> &BoundingBox3 {
        &self.base
    }

    pub fn objects(&self) -> &[PlacedObject] {
        &self.objects
    }

    pub fn object(&self, index: usize) -> Option<&PlacedObject> {
        self.objects.get(index)
    }

    pub fn add(&mut self, object: PlacedObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    fn selected(&self, selection: &[usize]) -> LayoutResult<Vec<(usize, BoundingBox3)>> {
        if selection.is_empty() {
            return Err(LayoutError::EmptySelection);
        }
        selection
            .iter()
            .map(|&i| {
                self.objects
                    .get(i)
                    .map(|o| (i, o.bounds()))
                    .ok_or(LayoutError::IndexOutOfRange {
                        index: i,
                        len: self.objects.len(),
                    })
            })
            .collect()
    }

    /// Deltas that align each selected object to the base. Objects already in place
    /// are left out.
    pub fn base_alignment_deltas(
        &self,
        alignment: BaseAlignment,
        selection: &[usize],
    ) -> LayoutResult<Vec<(usize, Vector3<f64>)>> {
        let base = self.base;
        let deltas = self
            .selected(selection)?
            .into_iter()
            .map(|(i, b)| {
                let delta = match alignment {
                    BaseAlignment::Top => Vector3::new(0.0, base.max.y - b.min.y, 0.0),
                    BaseAlignment::Front => Vector3::new(base.min.x - b.min.x, 0.0, 0.0),
                    BaseAlignment::Back => Vector3::new(base.max.x - b.max.x, 0.0, 0.0),
                    BaseAlignment::ZMin => Vector3::new(0.0, 0.0, base.min.z - b.min.z),
                    BaseAlignment::ZMax => Vector3::new(0.0, 0.0, base.max.z - b.max.z),
                };
                (i, delta)
            })
            .collect();
        Ok(moving(deltas))
    }

    /// Deltas that align each selected object to the first one in `selection`.
    pub fn object_alignment_deltas(
        &self,
        alignment: ObjectAlignment,
        selection: &[usize],
    ) -> LayoutResult<Vec<(usize, Vector3<f64>)>> {
        let selected = self.selected(selection)?;
        let first = selected[0].1;
        let deltas = selected
            .into_iter()
            .skip(1)
            .map(|(i, b)| {
                let delta = match alignment {
                    ObjectAlignment::ZMin => Vector3::new(0.0, 0.0, first.min.z - b.min.z),
                    ObjectAlignment::ZMax => Vector3::new(0.0, 0.0, first.max.z - b.max.z),
                    ObjectAlignment::YMin => Vector3::new(0.0, first.min.y - b.min.y, 0.0),
                    ObjectAlignment::YMax => Vector3::new(0.0, first.max.y - b.max.y, 0.0),
                };
                (i, delta)
            })
            .collect();
        Ok(moving(deltas))
    }

    /// Stack the selection along `axis`, in selection order. The first object keeps
    /// `margin` from the base, later ones keep twice the margin from their predecessor.
    pub fn distribute_deltas(
        &self,
        axis: DistributeAxis,
        margin: f64,
        selection: &[usize],
    ) -> LayoutResult<Vec<(usize, Vector3<f64>)>> {
        let start = match axis {
            DistributeAxis::Y => self.base.max.y,
            DistributeAxis::X => self.base.min.x,
        };
        let mut edge = start + margin;
        let mut deltas = Vec::new();
        for (i, b) in self.selected(selection)? {
            let (low, high) = match axis {
                DistributeAxis::Y => (b.min.y, b.max.y),
                DistributeAxis::X => (b.min.x, b.max.x),
            };
            let shift = edge - low;
            edge = high + shift + 2.0 * margin;
            let delta = match axis {
                DistributeAxis::Y => Vector3::new(0.0, shift, 0.0),
                DistributeAxis::X => Vector3::new(shift, 0.0, 0.0),
            };
            deltas.push((i, delta));
        }
        Ok(moving(deltas))
    }

    /// Deltas that center each selected object between the gantries.
    pub fn center_z_deltas(
        &self,
        wire_length: f64,
        selection: &[usize],
    ) -> LayoutResult<Vec<(usize, Vector3<f64>)>> {
        let middle = wire_length / 2.0;
        let deltas = self
            .selected(selection)?
            .into_iter()
            .map(|(i, b)| (i, Vector3::new(0.0, 0.0, middle - b.z_length() / 2.0 - b.min.z)))
            .collect();
        Ok(moving(deltas))
    }

    pub fn apply(&mut self, deltas: &[(usize, Vector3<f64>)]) -> LayoutResult<usize> {
        let len = self.objects.len();
        for (i, delta) in deltas {
            let object = self
                .objects
                .get_mut(*i)
                .ok_or(LayoutError::IndexOutOfRange { index: *i, len })?;
            object.translate(delta);
            debug!(
                "Moved {} by ({:.3}, {:.3}, {:.3})",
                object.name, delta.x, delta.y, delta.z
            );
        }
        Ok(deltas.len())
    }

    pub fn align_to_base(&mut self, alignment: BaseAlignment, selection: &[usize]) -> LayoutResult<usize> {
        let deltas = self.base_alignment_deltas(alignment, selection)?;
        self.apply(&deltas)
    }

    pub fn align_to_first(&mut self, alignment: ObjectAlignment, selection: &[usize]) -> LayoutResult<usize> {
        let deltas = self.object_alignment_deltas(alignment, selection)?;
        self.apply(&deltas)
    }

    pub fn distribute(&mut self, axis: DistributeAxis, margin: f64, selection: &[usize]) -> LayoutResult<usize> {
        let deltas = self.distribute_deltas(axis, margin, selection)?;
        self.apply(&deltas)
    }

    pub fn center_on_z(&mut self, wire_length: f64, selection: &[usize]) -> LayoutResult<usize> {
        let deltas = self.center_z_deltas(wire_length, selection)?;
        self.apply(&deltas)
    }
}

fn moving(deltas: Vec<(usize, Vector3<f64>)>) -> Vec<(usize, Vector3<f64>)> {
    deltas
        .into_iter()
        .filter(|(_, d)| d.iter().any(|c| c.abs() > f64::EPSILON))
        .collect()
}
