//! Job files.
//!
//! A job is a JSON document naming the shapes to cut, how they are laid out on the
//! table, where the wire enters and leaves each of them, and which profiles to use.
//!
//! ```json
//! {
//!   "name": "wing",
//!   "shapes": [
//!     { "name": "wing", "source": { "type": "stl", "path": "wing.stl" } }
//!   ],
//!   "initial_path": { "to": { "shape": "wing", "index": 0 } },
//!   "final_path": { "from": { "shape": "wing", "index": 0 }, "control_points": [[0, 40]] }
//! }
//! ```
//!
//! Anchors take either a point index or a 3D point on one of the shape's rails. Holes
//! are addressed as `<shape>_<k>`, numbered from 1.

use anyhow::{bail, Context, Result};
use hotwirekit_camtools::{
    traverse, GcodeEmitter, GcodeReport, KerfModel, MachineEnvelope, PathAnchor, PathGraph,
    ShapePathGenerator, ShapePathParameters, TraversalOptions,
};
use hotwirekit_core::{solid_from_stl_file, Profile2D, Section, Solid};
use hotwirekit_designer::{BaseAlignment, DistributeAxis, Layout, ObjectAlignment, PlacedObject};
use hotwirekit_settings::{Config, FoamProfile, ProfileLibrary, TableProfile};
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFile {
    #[serde(default)]
    pub name: Option<String>,
    /// Overrides the configured table profile
    #[serde(default)]
    pub table_index: Option<usize>,
    /// Overrides the configured foam profile
    #[serde(default)]
    pub foam_index: Option<usize>,
    pub shapes: Vec<ShapeSpec>,
    /// Placement steps, applied in order before any path is generated
    #[serde(default)]
    pub layout: Vec<LayoutStep>,
    pub initial_path: InitialPathSpec,
    pub final_path: FinalPathSpec,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSpec {
    pub name: String,
    pub source: ShapeSource,
    #[serde(default)]
    pub params: ShapePathParameters,
    /// Translation applied to the solid, mm
    #[serde(default)]
    pub offset: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeSource {
    /// STL mesh, relative paths resolve against the job file
    Stl { path: String },
    Prism { section: SectionSpec, z0: f64, z1: f64 },
    Loft {
        root: SectionSpec,
        tip: SectionSpec,
        z0: f64,
        z1: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub outer: ProfileSpec,
    #[serde(default)]
    pub holes: Vec<ProfileSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileSpec {
    Rectangle {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        radius: f64,
    },
    Polygon {
        points: Vec<[f64; 2]>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LayoutStep {
    AlignToBase {
        alignment: BaseAlignment,
        shapes: Vec<String>,
    },
    AlignToFirst {
        alignment: ObjectAlignment,
        shapes: Vec<String>,
    },
    /// Uses the table's margin for the axis
    Distribute {
        axis: DistributeAxis,
        shapes: Vec<String>,
    },
    CenterOnZ {
        shapes: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorSpec {
    pub shape: String,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub point: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialPathSpec {
    pub to: AnchorSpec,
    #[serde(default)]
    pub control_points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalPathSpec {
    pub from: AnchorSpec,
    #[serde(default)]
    pub control_points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub from: AnchorSpec,
    pub to: AnchorSpec,
    #[serde(default)]
    pub control_points: Vec<[f64; 2]>,
}

impl JobFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse job file {}", path.display()))
    }
}

impl ProfileSpec {
    fn to_profile(&self) -> Profile2D {
        match self {
            Self::Rectangle {
                x,
                y,
                width,
                height,
            } => Profile2D::rectangle(*x, *y, *width, *height),
            Self::Circle { cx, cy, radius } => Profile2D::circle(*cx, *cy, *radius),
            Self::Polygon { points } => Profile2D::polygon(points),
        }
    }
}

impl SectionSpec {
    fn to_section(&self) -> Section {
        self.holes
            .iter()
            .fold(Section::new(self.outer.to_profile()), |s, h| s.with_hole(h.to_profile()))
    }
}

impl ShapeSpec {
    fn build(&self, base_dir: &Path) -> Result<Solid> {
        let solid = match &self.source {
            ShapeSource::Stl { path } => {
                let full = base_dir.join(path);
                let mesh = solid_from_stl_file(&full)
                    .with_context(|| format!("Failed to import {}", full.display()))?;
                Solid::new(&self.name, mesh.faces().to_vec())
            }
            ShapeSource::Prism { section, z0, z1 } => {
                Solid::prism(&self.name, &section.to_section(), *z0, *z1)?
            }
            ShapeSource::Loft { root, tip, z0, z1 } => {
                Solid::loft(&self.name, &root.to_section(), &tip.to_section(), *z0, *z1)?
            }
        };
        Ok(solid.translated(&Vector3::from(self.offset)))
    }
}

/// Profiles a job runs with: the job's own indices win over the configured ones.
pub fn select_profiles<'a>(
    job: &JobFile,
    config: &Config,
    library: &'a ProfileLibrary,
) -> Result<(&'a TableProfile, &'a FoamProfile)> {
    let table = match job.table_index {
        Some(i) => library.table(i)?,
        None => library.active_table(config.table_index)?,
    };
    let foam = match job.foam_index {
        Some(i) => library.foam(i)?,
        None => library.active_foam(config.foam_index)?,
    };
    Ok((table, foam))
}

fn apply_layout(solids: Vec<Solid>, steps: &[LayoutStep], table: &TableProfile) -> Result<Vec<Solid>> {
    if steps.is_empty() {
        return Ok(solids);
    }
    let mut layout = Layout::from_table(table);
    let mut index = HashMap::new();
    for solid in &solids {
        let i = layout.add(PlacedObject::from_solid(solid)?);
        index.insert(solid.name().to_string(), i);
    }
    let select = |names: &[String]| -> Result<Vec<usize>> {
        names
            .iter()
            .map(|n| {
                index
                    .get(n)
                    .copied()
                    .with_context(|| format!("Layout step names unknown shape '{}'", n))
            })
            .collect()
    };

    for step in steps {
        let moved = match step {
            LayoutStep::AlignToBase { alignment, shapes } => {
                layout.align_to_base(*alignment, &select(shapes)?)?
            }
            LayoutStep::AlignToFirst { alignment, shapes } => {
                layout.align_to_first(*alignment, &select(shapes)?)?
            }
            LayoutStep::Distribute { axis, shapes } => {
                let margin = match axis {
                    DistributeAxis::X => table.x_margin,
                    DistributeAxis::Y => table.y_margin,
                };
                layout.distribute(*axis, margin, &select(shapes)?)?
            }
            LayoutStep::CenterOnZ { shapes } => {
                layout.center_on_z(table.wire_length, &select(shapes)?)?
            }
        };
        info!("Layout step {:?}: moved {} shape(s)", step, moved);
    }

    Ok(solids
        .iter()
        .zip(layout.objects())
        .map(|(solid, placed)| placed.place(solid))
        .collect())
}

fn resolve(graph: &PathGraph, spec: &AnchorSpec) -> Result<PathAnchor> {
    let node = graph
        .find_node(&spec.shape)
        .with_context(|| format!("Unknown shape '{}'", spec.shape))?;
    match (spec.point, spec.index) {
        (Some(_), Some(_)) => bail!(
            "Anchor on '{}' names both a point and an index",
            spec.shape
        ),
        (Some(p), None) => Ok(graph.anchor(node, &Point3::from(p))?),
        (None, index) => Ok(PathAnchor {
            node,
            index: index.unwrap_or(0),
        }),
    }
}

fn controls(points: &[[f64; 2]]) -> Vec<Point2<f64>> {
    points.iter().map(|p| Point2::new(p[0], p[1])).collect()
}

/// Build the path graph of a job.
pub fn build_graph(
    job: &JobFile,
    base_dir: &Path,
    config: &Config,
    table: &TableProfile,
    foam: &FoamProfile,
) -> Result<PathGraph> {
    if job.shapes.is_empty() {
        bail!("Job has no shapes");
    }
    let solids = job
        .shapes
        .iter()
        .map(|s| s.build(base_dir))
        .collect::<Result<Vec<_>>>()?;
    let solids = apply_layout(solids, &job.layout, table)?;

    let mut graph = PathGraph::new(config.machine.virtual_zero_point(), table.wire_length);
    let kerf = KerfModel::from_foam(foam);
    for (spec, solid) in job.shapes.iter().zip(&solids) {
        let paths = ShapePathGenerator::new(spec.params, kerf)
            .generate(solid)
            .with_context(|| format!("Failed to generate paths for '{}'", spec.name))?;
        graph.add_shape(&spec.name, paths, spec.params)?;
    }

    let to = resolve(&graph, &job.initial_path.to)?;
    graph.set_initial_path(to, controls(&job.initial_path.control_points))?;
    for link in &job.links {
        let from = resolve(&graph, &link.from)?;
        let to = resolve(&graph, &link.to)?;
        graph.add_link(from, to, controls(&link.control_points))?;
    }
    let from = resolve(&graph, &job.final_path.from)?;
    graph.set_final_path(from, controls(&job.final_path.control_points))?;
    Ok(graph)
}

/// Run a job to completion and return the G-code. Nothing is written to disk.
pub fn run_job(
    job: &JobFile,
    base_dir: &Path,
    config: &Config,
    library: &ProfileLibrary,
) -> Result<GcodeReport> {
    let (table, foam) = select_profiles(job, config, library)?;
    info!("Running job with table '{}' and foam '{}'", table.name, foam.name);

    let graph = build_graph(job, base_dir, config, table, foam)?;
    let route = traverse(
        &graph,
        TraversalOptions {
            return_home: config.machine.return_home,
        },
    )?;

    let envelope = MachineEnvelope::from_profiles(table, &config.machine);
    let mut emitter = GcodeEmitter::new(envelope, foam, &config.machine);
    if let Some(name) = &job.name {
        emitter = emitter.with_job_name(name);
    }
    Ok(emitter.generate(&route)?)
}
