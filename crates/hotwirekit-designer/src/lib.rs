//! # HotWireKit Designer
//!
//! Layout helpers for the cutting table: aligning and distributing parts around the
//! base block, centering them between the gantries, and sizing the block pre-cut.

pub mod cut_sizing;
pub mod error;
pub mod placement;

pub use cut_sizing::{base_end_position, block_depth, size_cut_block, CutAxis};
pub use error::{LayoutError, LayoutResult};
pub use placement::{
    base_box, BaseAlignment, DistributeAxis, Layout, ObjectAlignment, PlacedObject,
};
