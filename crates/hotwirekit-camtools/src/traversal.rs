//! Route traversal.
//!
//! Flattens the path graph into one continuous wire route: home, initial path, every
//! shape in link order with its holes cut on the way, final path, home. The walk keeps
//! an explicit stack of frames, one per node being cut, so nesting depth never grows
//! the call stack.
//!
//! At every position of a node the walker first descends into unused links that lead
//! to the node's own inner shapes, cuts the inner loop, and comes back along the same link. Once the
//! loop is complete an outer shape continues through its exit link, or finishes on
//! the final path.

use crate::error::{CamToolError, CamToolResult};
use crate::path_graph::{ElementKind, LinkId, NodeId, NodeKind, PathGraph, PathLink, SegmentRef};
use crate::rails::PathSegmentLengths;
use nalgebra::Point3;
use std::collections::HashSet;
use tracing::{debug, warn};

/// What the move that ends at a route point belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCommand {
    pub segment: SegmentRef,
    pub kind: ElementKind,
    /// Rail lengths of the whole element, used to pick the feed-driving rail.
    pub lengths: PathSegmentLengths,
}

/// Flat wire route: `side_a[i]`, `side_b[i]` and `commands[i]` describe the move to point `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub side_a: Vec<Point3<f64>>,
    pub side_b: Vec<Point3<f64>>,
    pub commands: Vec<RouteCommand>,
    /// Index of the final move back home, when one was emitted.
    pub home_index: Option<usize>,
}

impl Route {
    pub fn len(&self) -> usize {
        self.side_a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.side_a.is_empty()
    }

    fn push(&mut self, a: Point3<f64>, b: Point3<f64>, command: RouteCommand) {
        self.side_a.push(a);
        self.side_b.push(b);
        self.commands.push(command);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraversalOptions {
    /// End the route with the move back home.
    pub return_home: bool,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self { return_home: true }
    }
}

/// A node being cut.
#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    entry: usize,
    /// Positions travelled since `entry`.
    step: usize,
    /// Link that led into an inner node, walked back once the node is done.
    via: Option<LinkId>,
}

impl Frame {
    fn new(node: NodeId, entry: usize, via: Option<LinkId>) -> Self {
        Self {
            node,
            entry,
            step: 0,
            via,
        }
    }
}

/// Next action of the walker.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Descend(LinkId),
    Advance,
    Return(LinkId),
    Exit(LinkId),
    Exhausted,
}

struct Walker<'g> {
    graph: &'g PathGraph,
    used: HashSet<LinkId>,
    route: Route,
}

impl<'g> Walker<'g> {
    fn node_len(&self, node: NodeId) -> CamToolResult<usize> {
        self.graph
            .node(node)
            .map(|n| n.rails.unique_len())
            .ok_or_else(|| CamToolError::GraphIntegrity(format!("unknown node {:?}", node)))
    }

    fn link(&self, id: LinkId) -> CamToolResult<&'g PathLink> {
        self.graph
            .link(id)
            .ok_or_else(|| CamToolError::GraphIntegrity(format!("unknown link {:?}", id)))
    }

    fn unused_links_from(&self, node: NodeId, index: Option<usize>) -> Vec<(LinkId, &'g PathLink)> {
        self.graph
            .links()
            .filter(|(id, link)| {
                !self.used.contains(id)
                    && matches!(link.element_kind(), ElementKind::Link)
                    && link
                        .source()
                        .is_some_and(|s| s.node == node && index.map_or(true, |i| s.index == i))
            })
            .collect()
    }

    /// Whether `link` leads into a hole of `node`.
    fn targets_own_inner(&self, link: &PathLink, node: NodeId) -> bool {
        link.target()
            .and_then(|t| self.graph.node(t.node))
            .is_some_and(|n| matches!(n.kind, NodeKind::InnerShape { parent } if parent == node))
    }

    fn next_step(&self, frame: &Frame) -> CamToolResult<Step> {
        let len = self.node_len(frame.node)?;
        let index = (frame.entry + frame.step) % len;

        if let Some((id, _)) = self
            .unused_links_from(frame.node, Some(index))
            .into_iter()
            .find(|(_, l)| self.targets_own_inner(l, frame.node))
        {
            return Ok(Step::Descend(id));
        }
        if frame.step < len {
            return Ok(Step::Advance);
        }
        if let Some(via) = frame.via {
            return Ok(Step::Return(via));
        }
        let is_inner = self.graph.node(frame.node).is_some_and(|n| n.is_inner());
        if !is_inner {
            if let Some((id, _)) = self
                .unused_links_from(frame.node, None)
                .into_iter()
                .find(|(_, l)| !self.targets_own_inner(l, frame.node))
            {
                return Ok(Step::Exit(id));
            }
        }
        Ok(Step::Exhausted)
    }

    fn node_command(&self, node: NodeId) -> CamToolResult<RouteCommand> {
        let n = self
            .graph
            .node(node)
            .ok_or_else(|| CamToolError::GraphIntegrity(format!("unknown node {:?}", node)))?;
        Ok(RouteCommand {
            segment: SegmentRef::Node(node),
            kind: n.element_kind(),
            lengths: n.lengths,
        })
    }

    fn emit_node_point(&mut self, node: NodeId, index: usize) -> CamToolResult<()> {
        let command = self.node_command(node)?;
        let (a, b) = self
            .graph
            .node(node)
            .and_then(|n| n.rails.point(index))
            .ok_or_else(|| {
                CamToolError::GraphIntegrity(format!("position {} missing on node {:?}", index, node))
            })?;
        self.route.push(a, b, command);
        Ok(())
    }

    /// Walk `frame`'s node forward from its current position to `index`.
    fn walk_to(&mut self, frame: &mut Frame, index: usize) -> CamToolResult<()> {
        let len = self.node_len(frame.node)?;
        while (frame.entry + frame.step) % len != index {
            frame.step += 1;
            self.emit_node_point(frame.node, (frame.entry + frame.step) % len)?;
        }
        Ok(())
    }

    /// Emit a link's points after its start point. With `backwards` the link is
    /// replayed from its end to its start. `include_end` drops the far endpoint
    /// when false.
    fn emit_link(&mut self, id: LinkId, backwards: bool, include_end: bool) -> CamToolResult<()> {
        let link = self.link(id)?;
        let rails = self.graph.link_rails(id)?;
        let command = RouteCommand {
            segment: SegmentRef::Link(id),
            kind: link.element_kind(),
            lengths: rails.lengths(),
        };
        let mut pairs: Vec<(Point3<f64>, Point3<f64>)> = rails
            .side_a
            .into_iter()
            .zip(rails.side_b)
            .collect();
        if backwards {
            pairs.reverse();
        }
        let end = if include_end { pairs.len() } else { pairs.len() - 1 };
        for &(a, b) in &pairs[1..end] {
            self.route.push(a, b, command);
        }
        Ok(())
    }
}

/// Flatten `graph` into a route.
pub fn traverse(graph: &PathGraph, options: TraversalOptions) -> CamToolResult<Route> {
    let initial_id = graph
        .initial_path()
        .ok_or_else(|| CamToolError::GraphIntegrity("no initial path defined".into()))?;
    let final_id = graph
        .final_path()
        .ok_or_else(|| CamToolError::GraphIntegrity("no final path defined".into()))?;
    let start = graph
        .link(initial_id)
        .and_then(|l| l.target())
        .ok_or_else(|| CamToolError::GraphIntegrity("initial path has no target".into()))?;
    let finish = graph
        .link(final_id)
        .and_then(|l| l.source())
        .ok_or_else(|| CamToolError::GraphIntegrity("final path has no source".into()))?;

    let mut walker = Walker {
        graph,
        used: HashSet::new(),
        route: Route::default(),
    };
    walker.used.insert(initial_id);
    walker.used.insert(final_id);
    walker.emit_link(initial_id, false, true)?;

    let mut stack = vec![Frame::new(start.node, start.index, None)];
    let mut last = stack[0];
    while let Some(mut frame) = stack.pop() {
        match walker.next_step(&frame)? {
            Step::Descend(id) => {
                walker.used.insert(id);
                let target = walker
                    .link(id)?
                    .target()
                    .ok_or_else(|| CamToolError::GraphIntegrity("link without target".into()))?;
                debug!("Descending into inner node {:?}", target.node);
                walker.emit_link(id, false, true)?;
                stack.push(frame);
                stack.push(Frame::new(target.node, target.index, Some(id)));
            }
            Step::Advance => {
                frame.step += 1;
                let len = walker.node_len(frame.node)?;
                walker.emit_node_point(frame.node, (frame.entry + frame.step) % len)?;
                stack.push(frame);
            }
            Step::Return(via) => {
                walker.emit_link(via, true, true)?;
            }
            Step::Exit(id) => {
                walker.used.insert(id);
                let link = walker.link(id)?;
                let (source, target) = match (link.source(), link.target()) {
                    (Some(s), Some(t)) => (s, t),
                    _ => return Err(CamToolError::GraphIntegrity("link without endpoints".into())),
                };
                walker.walk_to(&mut frame, source.index)?;
                walker.emit_link(id, false, true)?;
                stack.push(Frame::new(target.node, target.index, None));
            }
            Step::Exhausted => {
                last = frame;
            }
        }
    }

    if last.node != finish.node {
        let name = |id: NodeId| graph.node(id).map(|n| n.name.clone()).unwrap_or_default();
        return Err(CamToolError::GraphIntegrity(format!(
            "final path starts on '{}' but the route ends on '{}'",
            name(finish.node),
            name(last.node)
        )));
    }
    walker.walk_to(&mut last, finish.index)?;
    walker.emit_link(final_id, false, options.return_home)?;
    if options.return_home {
        walker.route.home_index = Some(walker.route.len() - 1);
    }

    for (id, link) in graph.links() {
        if !walker.used.contains(&id) {
            warn!("Link {} was never reached by the route", link.name);
        }
    }
    debug!("Route has {} points", walker.route.len());
    Ok(walker.route)
}
