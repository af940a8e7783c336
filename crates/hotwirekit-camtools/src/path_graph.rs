//! Path graph store.
//!
//! Shapes and their inner loops are nodes; the moves between them are links. The
//! graph owns every element in slot-map arenas and elements refer to each other by
//! id, so removing a shape cannot leave a dangling reference behind.

use crate::error::{CamToolError, CamToolResult};
use crate::rails::{planar_length, PathSegmentLengths, RailPair};
use crate::shape_path::{ShapeLoop, ShapePathParameters, ShapePaths};
use nalgebra::{Point2, Point3};
use slotmap::SlotMap;
use std::fmt;
use tracing::debug;

/// Most control points a link may bend through.
pub const MAX_CONTROL_POINTS: usize = 5;

slotmap::new_key_type! {
    /// Identifier of a shape or inner-shape node.
    pub struct NodeId;
}

slotmap::new_key_type! {
    /// Identifier of a link, initial path or final path.
    pub struct LinkId;
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Shape {
        params: ShapePathParameters,
        children: Vec<NodeId>,
    },
    InnerShape {
        parent: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    pub name: String,
    pub kind: NodeKind,
    pub rails: RailPair,
    pub lengths: PathSegmentLengths,
}

impl PathNode {
    pub fn is_inner(&self) -> bool {
        matches!(self.kind, NodeKind::InnerShape { .. })
    }

    pub fn element_kind(&self) -> ElementKind {
        match self.kind {
            NodeKind::Shape { .. } => ElementKind::Shape,
            NodeKind::InnerShape { .. } => ElementKind::InnerShape,
        }
    }
}

/// A wire position on a node: index into the node's rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathAnchor {
    pub node: NodeId,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkKind {
    /// From the home position to the first cut.
    InitialPath { to: PathAnchor },
    /// From the last cut back home.
    FinalPath { from: PathAnchor },
    /// Between two nodes.
    Link { from: PathAnchor, to: PathAnchor },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathLink {
    pub name: String,
    pub kind: LinkKind,
    /// Planar bend points, placed on each rail's own cap plane.
    pub control_points: Vec<Point2<f64>>,
}

impl PathLink {
    pub fn source(&self) -> Option<PathAnchor> {
        match self.kind {
            LinkKind::InitialPath { .. } => None,
            LinkKind::FinalPath { from } | LinkKind::Link { from, .. } => Some(from),
        }
    }

    pub fn target(&self) -> Option<PathAnchor> {
        match self.kind {
            LinkKind::FinalPath { .. } => None,
            LinkKind::InitialPath { to } | LinkKind::Link { to, .. } => Some(to),
        }
    }

    pub fn element_kind(&self) -> ElementKind {
        match self.kind {
            LinkKind::InitialPath { .. } => ElementKind::InitialPath,
            LinkKind::FinalPath { .. } => ElementKind::FinalPath,
            LinkKind::Link { .. } => ElementKind::Link,
        }
    }
}

/// What an element of the route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Shape,
    InnerShape,
    Link,
    InitialPath,
    FinalPath,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Shape => "shape",
            Self::InnerShape => "inner shape",
            Self::Link => "link",
            Self::InitialPath => "initial path",
            Self::FinalPath => "final path",
        };
        write!(f, "{}", name)
    }
}

/// Reference to any element of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentRef {
    Node(NodeId),
    Link(LinkId),
}

/// Rails of a link including both endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRails {
    pub side_a: Vec<Point3<f64>>,
    pub side_b: Vec<Point3<f64>>,
}

impl LinkRails {
    /// Planar travel of each rail.
    pub fn lengths(&self) -> PathSegmentLengths {
        PathSegmentLengths::new(planar_length(&self.side_a), planar_length(&self.side_b))
    }
}

#[derive(Debug, Clone)]
pub struct PathGraph {
    nodes: SlotMap<NodeId, PathNode>,
    links: SlotMap<LinkId, PathLink>,
    home: Point3<f64>,
    wire_length: f64,
}

impl PathGraph {
    /// `home` is gantry A's rest position; gantry B rests `wire_length` further along Z.
    pub fn new(home: Point3<f64>, wire_length: f64) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            links: SlotMap::with_key(),
            home,
            wire_length,
        }
    }

    pub fn home(&self) -> Point3<f64> {
        self.home
    }

    pub fn wire_length(&self) -> f64 {
        self.wire_length
    }

    /// Wire ends at rest.
    pub fn home_pair(&self) -> (Point3<f64>, Point3<f64>) {
        let b = Point3::new(self.home.x, self.home.y, self.home.z + self.wire_length);
        (self.home, b)
    }

    pub fn node(&self, id: NodeId) -> Option<&PathNode> {
        self.nodes.get(id)
    }

    pub fn link(&self, id: LinkId) -> Option<&PathLink> {
        self.links.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PathNode)> {
        self.nodes.iter()
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &PathLink)> {
        self.links.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name == name)
            .map(|(id, _)| id)
    }

    pub fn kind_of(&self, segment: SegmentRef) -> Option<ElementKind> {
        match segment {
            SegmentRef::Node(id) => self.node(id).map(|n| n.element_kind()),
            SegmentRef::Link(id) => self.link(id).map(|l| l.element_kind()),
        }
    }

    fn require_node(&self, id: NodeId) -> CamToolResult<&PathNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| CamToolError::GraphIntegrity(format!("unknown node {:?}", id)))
    }

    /// Add a shape and one inner node per hole, named `<name>_<k>`.
    pub fn add_shape(
        &mut self,
        name: impl Into<String>,
        paths: ShapePaths,
        params: ShapePathParameters,
    ) -> CamToolResult<NodeId> {
        let name = name.into();
        if self.find_node(&name).is_some() {
            return Err(CamToolError::InvalidParameters(format!(
                "a shape named '{}' already exists",
                name
            )));
        }
        let ShapePaths { outer, inner } = paths;
        let id = self.nodes.insert(PathNode {
            name: name.clone(),
            kind: NodeKind::Shape {
                params,
                children: Vec::new(),
            },
            rails: outer.rails,
            lengths: outer.lengths,
        });
        self.attach_children(id, &name, inner);
        debug!("Added shape {} to path graph", name);
        Ok(id)
    }

    fn attach_children(&mut self, parent: NodeId, name: &str, loops: Vec<ShapeLoop>) {
        let children: Vec<NodeId> = loops
            .into_iter()
            .enumerate()
            .map(|(k, lp)| {
                self.nodes.insert(PathNode {
                    name: format!("{}_{}", name, k + 1),
                    kind: NodeKind::InnerShape { parent },
                    rails: lp.rails,
                    lengths: lp.lengths,
                })
            })
            .collect();
        if let Some(PathNode {
            kind: NodeKind::Shape { children: slot, .. },
            ..
        }) = self.nodes.get_mut(parent)
        {
            *slot = children;
        }
    }

    fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        match self.nodes.get(id).map(|n| &n.kind) {
            Some(NodeKind::Shape { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    fn unlink(&mut self, nodes: &[NodeId]) -> usize {
        let touching: Vec<LinkId> = self
            .links
            .iter()
            .filter(|(_, l)| {
                l.source().is_some_and(|a| nodes.contains(&a.node))
                    || l.target().is_some_and(|a| nodes.contains(&a.node))
            })
            .map(|(id, _)| id)
            .collect();
        for id in &touching {
            self.links.remove(*id);
        }
        touching.len()
    }

    /// Replace a shape's loops after its solid changed. Links touching the shape or
    /// its inner nodes are removed since their anchor indices no longer hold.
    /// Returns the number of links removed.
    pub fn rebuild_shape(&mut self, id: NodeId, paths: ShapePaths) -> CamToolResult<usize> {
        let node = self.require_node(id)?;
        if node.is_inner() {
            return Err(CamToolError::InvalidParameters(format!(
                "'{}' is an inner shape, rebuild its parent",
                node.name
            )));
        }
        let name = node.name.clone();

        let mut affected = self.children_of(id);
        affected.push(id);
        let removed = self.unlink(&affected);
        for child in self.children_of(id) {
            self.nodes.remove(child);
        }

        let ShapePaths { outer, inner } = paths;
        if let Some(node) = self.nodes.get_mut(id) {
            node.rails = outer.rails;
            node.lengths = outer.lengths;
        }
        self.attach_children(id, &name, inner);
        debug!("Rebuilt shape {}, dropped {} link(s)", name, removed);
        Ok(removed)
    }

    /// Remove a shape, its inner nodes and every link touching them.
    pub fn remove_shape(&mut self, id: NodeId) -> CamToolResult<()> {
        let node = self.require_node(id)?;
        if node.is_inner() {
            return Err(CamToolError::InvalidParameters(format!(
                "'{}' is an inner shape and is removed with its parent",
                node.name
            )));
        }
        let mut affected = self.children_of(id);
        affected.push(id);
        self.unlink(&affected);
        for n in affected {
            self.nodes.remove(n);
        }
        Ok(())
    }

    /// Resolve a 3D point to the node position it lies on (rail A or rail B).
    pub fn anchor(&self, node: NodeId, point: &Point3<f64>) -> CamToolResult<PathAnchor> {
        let n = self.require_node(node)?;
        n.rails
            .find_point(point)
            .map(|index| PathAnchor { node, index })
            .ok_or_else(|| {
                CamToolError::GraphIntegrity(format!(
                    "link control point not found: ({:.3}, {:.3}, {:.3}) is not on '{}'",
                    point.x, point.y, point.z, n.name
                ))
            })
    }

    fn check_anchor(&self, anchor: &PathAnchor) -> CamToolResult<()> {
        let node = self.require_node(anchor.node)?;
        if anchor.index >= node.rails.unique_len() {
            return Err(CamToolError::GraphIntegrity(format!(
                "index {} is outside '{}' ({} positions)",
                anchor.index,
                node.name,
                node.rails.unique_len()
            )));
        }
        Ok(())
    }

    fn check_controls(control_points: &[Point2<f64>]) -> CamToolResult<()> {
        if control_points.len() > MAX_CONTROL_POINTS {
            return Err(CamToolError::InvalidParameters(format!(
                "a link takes at most {} control points, got {}",
                MAX_CONTROL_POINTS,
                control_points.len()
            )));
        }
        Ok(())
    }

    fn find_kind(&self, pred: impl Fn(&LinkKind) -> bool) -> Option<LinkId> {
        self.links
            .iter()
            .find(|(_, l)| pred(&l.kind))
            .map(|(id, _)| id)
    }

    pub fn initial_path(&self) -> Option<LinkId> {
        self.find_kind(|k| matches!(k, LinkKind::InitialPath { .. }))
    }

    pub fn final_path(&self) -> Option<LinkId> {
        self.find_kind(|k| matches!(k, LinkKind::FinalPath { .. }))
    }

    /// Set the move from home to `to`, replacing any previous initial path.
    pub fn set_initial_path(
        &mut self,
        to: PathAnchor,
        control_points: Vec<Point2<f64>>,
    ) -> CamToolResult<LinkId> {
        self.check_anchor(&to)?;
        Self::check_controls(&control_points)?;
        if let Some(old) = self.initial_path() {
            self.links.remove(old);
        }
        Ok(self.links.insert(PathLink {
            name: "InitialPath".to_string(),
            kind: LinkKind::InitialPath { to },
            control_points,
        }))
    }

    /// Set the move from `from` back home, replacing any previous final path.
    pub fn set_final_path(
        &mut self,
        from: PathAnchor,
        control_points: Vec<Point2<f64>>,
    ) -> CamToolResult<LinkId> {
        self.check_anchor(&from)?;
        Self::check_controls(&control_points)?;
        if let Some(old) = self.final_path() {
            self.links.remove(old);
        }
        Ok(self.links.insert(PathLink {
            name: "FinalPath".to_string(),
            kind: LinkKind::FinalPath { from },
            control_points,
        }))
    }

    pub fn add_link(
        &mut self,
        from: PathAnchor,
        to: PathAnchor,
        control_points: Vec<Point2<f64>>,
    ) -> CamToolResult<LinkId> {
        self.check_anchor(&from)?;
        self.check_anchor(&to)?;
        Self::check_controls(&control_points)?;
        if from.node == to.node {
            return Err(CamToolError::InvalidParameters(
                "a link must join two different shapes".into(),
            ));
        }
        let name = format!("Link{:03}", self.link_count() + 1);
        Ok(self.links.insert(PathLink {
            name,
            kind: LinkKind::Link { from, to },
            control_points,
        }))
    }

    fn anchor_pair(&self, anchor: &PathAnchor) -> CamToolResult<(Point3<f64>, Point3<f64>)> {
        let node = self.require_node(anchor.node)?;
        node.rails.point(anchor.index).ok_or_else(|| {
            CamToolError::GraphIntegrity(format!(
                "index {} is outside '{}'",
                anchor.index, node.name
            ))
        })
    }

    /// Both rails of a link, endpoints included. The initial path starts and the final
    /// path ends at the wire's rest position, and their control points lie on the
    /// gantry planes. Control points of other links sit on the plane of the rail they
    /// belong to.
    pub fn link_rails(&self, id: LinkId) -> CamToolResult<LinkRails> {
        let link = self
            .link(id)
            .ok_or_else(|| CamToolError::GraphIntegrity(format!("unknown link {:?}", id)))?;

        let home = self.home_pair();
        let (start, end, plane) = match &link.kind {
            LinkKind::InitialPath { to } => (home, self.anchor_pair(to)?, home),
            LinkKind::FinalPath { from } => (self.anchor_pair(from)?, home, home),
            LinkKind::Link { from, to } => {
                let start = self.anchor_pair(from)?;
                (start, self.anchor_pair(to)?, start)
            }
        };

        let rail = |first: Point3<f64>, last: Point3<f64>, z: f64| -> Vec<Point3<f64>> {
            std::iter::once(first)
                .chain(link.control_points.iter().map(|c| Point3::new(c.x, c.y, z)))
                .chain(std::iter::once(last))
                .collect()
        };
        Ok(LinkRails {
            side_a: rail(start.0, end.0, plane.0.z),
            side_b: rail(start.1, end.1, plane.1.z),
        })
    }
}
