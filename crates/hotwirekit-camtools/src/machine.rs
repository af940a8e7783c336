//! Machine envelope and wire projection.
//!
//! Rails are generated at the Z heights of the part's end caps. The gantries sit at
//! Z=0 and Z=wire length, so every wire position is extended along the wire until it
//! meets both gantry planes.

use hotwirekit_settings::{MachineSettings, TableProfile};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use std::fmt;

const PARALLEL_EPSILON: f64 = 1e-9;

/// Machine axis, named after the rail and coordinate it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineAxis {
    AX,
    AY,
    BX,
    BY,
}

impl MachineAxis {
    fn slot(&self) -> usize {
        match self {
            MachineAxis::AX => 0,
            MachineAxis::AY => 1,
            MachineAxis::BX => 2,
            MachineAxis::BY => 3,
        }
    }
}

/// A projected coordinate outside the travel envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeWarning {
    /// Route index of the offending move
    pub index: usize,
    pub axis: MachineAxis,
    /// G-code name of the axis, as configured
    pub axis_name: String,
    pub value: f64,
    pub limit: f64,
}

impl fmt::Display for RangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Move {}: axis {} out of range ({:.3} not in [0, {:.3}])",
            self.index, self.axis_name, self.value, self.limit
        )
    }
}

/// Travel envelope of the cutter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineEnvelope {
    pub x_length: f64,
    pub y_length: f64,
    /// Distance between the two gantry planes
    pub z_length: f64,
    pub home: Point3<f64>,
}

impl MachineEnvelope {
    pub fn new(x_length: f64, y_length: f64, z_length: f64, home: Point3<f64>) -> Self {
        Self {
            x_length,
            y_length,
            z_length,
            home,
        }
    }

    pub fn from_profiles(table: &TableProfile, settings: &MachineSettings) -> Self {
        Self::new(
            table.x_travel,
            table.y_travel,
            table.wire_length,
            settings.virtual_zero_point(),
        )
    }

    /// Gantry positions for a wire running through `a` and `b`.
    pub fn project(&self, a: &Point3<f64>, b: &Point3<f64>) -> (Point2<f64>, Point2<f64>) {
        project_wire(a, b, 0.0, self.z_length)
    }

    /// Out-of-range axes of a projected move.
    pub fn check(
        &self,
        index: usize,
        a: &Point2<f64>,
        b: &Point2<f64>,
        names: [&str; 4],
    ) -> Vec<RangeWarning> {
        let axes = [
            (MachineAxis::AX, a.x, self.x_length),
            (MachineAxis::AY, a.y, self.y_length),
            (MachineAxis::BX, b.x, self.x_length),
            (MachineAxis::BY, b.y, self.y_length),
        ];
        axes.into_iter()
            .filter(|(_, value, limit)| *value < 0.0 || *value > *limit)
            .map(|(axis, value, limit)| RangeWarning {
                index,
                axis,
                axis_name: names[axis.slot()].to_string(),
                value,
                limit,
            })
            .collect()
    }
}

/// Extend the line through `a` and `b` to the planes `z = z0` and `z = z1`.
///
/// A wire lying in a constant-Z plane cannot be extended; its XY values are kept.
pub fn project_wire(
    a: &Point3<f64>,
    b: &Point3<f64>,
    z0: f64,
    z1: f64,
) -> (Point2<f64>, Point2<f64>) {
    let dir = b - a;
    if dir.z.abs() < PARALLEL_EPSILON {
        return (a.xy(), b.xy());
    }
    let at = |z: f64| {
        let t = (z - a.z) / dir.z;
        Point2::new(a.x + dir.x * t, a.y + dir.y * t)
    };
    (at(z0), at(z1))
}
