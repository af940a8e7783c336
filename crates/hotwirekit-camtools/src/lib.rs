//! # HotWireKit CAM Tools
//!
//! Toolpath engine for four-axis hot-wire foam cutters. A solid goes in, a
//! synchronized two-rail G-code program comes out.
//!
//! ## Pipeline
//!
//! - **Face Ring Builder**: chains the side faces of a solid into closed rings
//! - **Dual-Rail Projector**: samples every ring onto the two end-cap planes
//! - **Kerf Compensator**: offsets each rail by its interpolated kerf
//! - **Shape Paths**: runs the three steps above for the outer profile and every hole
//! - **Path Graph**: shapes, holes and the links between them
//! - **Traversal**: flattens the graph into one continuous wire route
//! - **G-Code Emitter**: projects the route onto the gantries and writes G93/G94 moves
//!
//! ## Extras
//!
//! - **Cut Block**: fixed pre-cut program that trims a foam block to depth

pub mod cut_block;
pub mod error;
pub mod face_ring;
pub mod gcode_emitter;
pub mod kerf;
pub mod machine;
pub mod path_graph;
pub mod rail_projector;
pub mod rails;
pub mod shape_path;
pub mod traversal;

pub use cut_block::CutBlockGenerator;
pub use error::{CamToolError, CamToolResult};
pub use face_ring::{CapPlanes, FaceRingBuilder, FaceRings};
pub use gcode_emitter::{GcodeEmitter, GcodeReport};
pub use kerf::{KerfCompensator, KerfModel};
pub use machine::{MachineAxis, MachineEnvelope, RangeWarning};
pub use path_graph::{
    ElementKind, LinkId, LinkKind, NodeId, NodeKind, PathAnchor, PathGraph, PathLink, PathNode,
    SegmentRef,
};
pub use rail_projector::DualRailProjector;
pub use rails::{PathSegmentLengths, ProjectedRing, Rail, RailPair};
pub use shape_path::{ShapeLoop, ShapePathGenerator, ShapePathParameters, ShapePaths};
pub use traversal::{traverse, Route, RouteCommand, TraversalOptions};
