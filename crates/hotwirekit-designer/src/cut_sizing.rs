//! Pre-cut block sizing from a part's bounds.

use hotwirekit_core::BoundingBox3;
use hotwirekit_settings::{CutBlockParameters, TableProfile};
use serde::{Deserialize, Serialize};

/// Axis of the part that becomes the block depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CutAxis {
    X,
    Y,
    Z,
}

/// Block depth for a part, margins included, rounded to 0.01 mm.
pub fn block_depth(bounds: &BoundingBox3, axis: CutAxis, table: &TableProfile) -> f64 {
    let depth = match axis {
        CutAxis::X => bounds.x_length() + 2.0 * table.x_margin,
        CutAxis::Y => bounds.y_length() + 2.0 * table.y_margin,
        CutAxis::Z => bounds.z_length(),
    };
    (depth * 100.0).round() / 100.0
}

/// Cut position at the far end of the base block.
pub fn base_end_position(base: &BoundingBox3, table: &TableProfile) -> f64 {
    base.x_length() + table.base_x_offset
}

/// `params` with the depth taken from `bounds`, and the position moved to the base end
/// when `at_base_end` is set.
pub fn size_cut_block(
    params: CutBlockParameters,
    bounds: Option<(&BoundingBox3, CutAxis)>,
    base: &BoundingBox3,
    table: &TableProfile,
    at_base_end: bool,
) -> CutBlockParameters {
    let mut sized = params;
    if let Some((bounds, axis)) = bounds {
        sized.block_depth = block_depth(bounds, axis, table);
    }
    if at_base_end {
        sized.position = base_end_position(base, table);
    }
    sized
}
