//! STL import.
//!
//! A triangulated ruled solid has every vertex on one of the two end-cap planes.
//! Side triangles come in pairs that share a diagonal; each pair is rebuilt into one
//! ruled quad face so the path engine sees the same face structure as a CAD solid.

use crate::constants::PLANE_TOLERANCE;
use crate::error::{GeometryError, GeometryResult};
use crate::geometry::brep::{Edge, Face, Solid};
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Load a binary or ASCII STL file. The solid is named after the file stem.
pub fn solid_from_stl_file(path: impl AsRef<Path>) -> GeometryResult<Solid> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mesh = stl_io::read_stl(&mut file)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mesh");
    debug!("STL {} contains {} faces", path.display(), mesh.faces.len());
    solid_from_indexed_mesh(name, &mesh)
}

pub fn solid_from_indexed_mesh(name: &str, mesh: &stl_io::IndexedMesh) -> GeometryResult<Solid> {
    let vertices: Vec<Point3<f64>> = mesh
        .vertices
        .iter()
        .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        .collect();
    let triangles: Vec<[usize; 3]> = mesh.faces.iter().map(|f| f.vertices).collect();
    solid_from_triangles(name, &vertices, &triangles)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Low,
    High,
}

#[derive(Debug, Clone, Copy)]
struct SideTriangle {
    cap: (usize, usize),
    apex: usize,
    level: Level,
}

impl SideTriangle {
    fn spanning(&self) -> [(usize, usize); 2] {
        [key(self.apex, self.cap.0), key(self.apex, self.cap.1)]
    }
}

fn key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Build a solid from an indexed triangle list.
pub fn solid_from_triangles(
    name: &str,
    vertices: &[Point3<f64>],
    triangles: &[[usize; 3]],
) -> GeometryResult<Solid> {
    if triangles.is_empty() {
        return Err(GeometryError::MeshImport("mesh has no triangles".into()));
    }
    if let Some(bad) = triangles.iter().flatten().find(|&&i| i >= vertices.len()) {
        return Err(GeometryError::MeshImport(format!(
            "vertex index {} out of range",
            bad
        )));
    }

    let (z_min, z_max) = triangles
        .iter()
        .flatten()
        .map(|&i| vertices[i].z)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), z| {
            (lo.min(z), hi.max(z))
        });
    if z_max - z_min < PLANE_TOLERANCE {
        return Err(GeometryError::MeshImport("mesh is flat along Z".into()));
    }

    let level_of = |i: usize| -> GeometryResult<Level> {
        let z = vertices[i].z;
        if (z - z_min).abs() < PLANE_TOLERANCE {
            Ok(Level::Low)
        } else if (z - z_max).abs() < PLANE_TOLERANCE {
            Ok(Level::High)
        } else {
            Err(GeometryError::MeshImport(format!(
                "vertex {} at z={:.4} lies between the end caps",
                i, z
            )))
        }
    };

    let mut sides = Vec::new();
    for tri in triangles {
        let levels = [level_of(tri[0])?, level_of(tri[1])?, level_of(tri[2])?];
        let lows = levels.iter().filter(|l| **l == Level::Low).count();
        if lows == 0 || lows == 3 {
            continue;
        }
        // the odd one out is the apex, the other two form the cap edge
        let apex_level = if lows == 1 { Level::Low } else { Level::High };
        let apex_slot = levels
            .iter()
            .position(|l| *l == apex_level)
            .unwrap_or(0);
        let a = tri[(apex_slot + 1) % 3];
        let b = tri[(apex_slot + 2) % 3];
        if a == b || a == tri[apex_slot] || b == tri[apex_slot] {
            return Err(GeometryError::MeshImport("degenerate side triangle".into()));
        }
        let cap_level = if apex_level == Level::Low {
            Level::High
        } else {
            Level::Low
        };
        sides.push(SideTriangle {
            cap: (a, b),
            apex: tri[apex_slot],
            level: cap_level,
        });
    }

    let mut by_edge: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (t, side) in sides.iter().enumerate() {
        for e in side.spanning() {
            by_edge.entry(e).or_default().push(t);
        }
    }
    if by_edge.values().any(|ts| ts.len() != 2) {
        return Err(GeometryError::MeshImport(
            "side walls are not a closed triangle strip".into(),
        ));
    }

    let mut faces = Vec::new();
    let mut low_edges = Vec::new();
    let mut high_edges = Vec::new();
    let mut visited = vec![false; sides.len()];
    for start in 0..sides.len() {
        if visited[start] {
            continue;
        }
        let ring = walk_strip(start, &sides, &by_edge, &mut visited)?;
        for (lower, upper) in pair_strip(&ring, &sides, vertices)? {
            let (quad, low, high) = quad_face(&sides[lower], &sides[upper], vertices)?;
            faces.push(quad);
            low_edges.push(low);
            high_edges.push(high);
        }
    }

    debug!("Rebuilt {} ruled faces from mesh {}", faces.len(), name);
    faces.push(Face::new(low_edges, -Vector3::z()));
    faces.push(Face::new(high_edges, Vector3::z()));
    Ok(Solid::new(name, faces))
}

fn walk_strip(
    start: usize,
    sides: &[SideTriangle],
    by_edge: &HashMap<(usize, usize), Vec<usize>>,
    visited: &mut [bool],
) -> GeometryResult<Vec<usize>> {
    let mut ring = vec![start];
    visited[start] = true;
    let mut came_from = sides[start].spanning()[0];
    let mut current = start;
    loop {
        let exit = sides[current]
            .spanning()
            .into_iter()
            .find(|e| *e != came_from)
            .ok_or_else(|| GeometryError::MeshImport("side triangle has one spanning edge".into()))?;
        let next = by_edge
            .get(&exit)
            .and_then(|ts| ts.iter().copied().find(|t| *t != current))
            .ok_or_else(|| GeometryError::MeshImport("open side strip".into()))?;
        if next == start {
            return Ok(ring);
        }
        if visited[next] {
            return Err(GeometryError::MeshImport("side strip branches".into()));
        }
        visited[next] = true;
        ring.push(next);
        came_from = exit;
        current = next;
    }
}

/// Pairs neighbouring triangles into quads. Of the two possible pairings the one with
/// the shorter outer spanning edges wins, which keeps quads untwisted.
fn pair_strip(
    ring: &[usize],
    sides: &[SideTriangle],
    vertices: &[Point3<f64>],
) -> GeometryResult<Vec<(usize, usize)>> {
    let n = ring.len();
    if n % 2 != 0 || (0..n).any(|i| sides[ring[i]].level == sides[ring[(i + 1) % n]].level) {
        return Err(GeometryError::MeshImport(format!(
            "side strip of {} triangles cannot be split into ruled quads",
            n
        )));
    }

    let span_len = |t: usize, other: usize| -> f64 {
        let shared = sides[other].spanning();
        sides[t]
            .spanning()
            .into_iter()
            .filter(|e| !shared.contains(e))
            .map(|(a, b)| (vertices[a] - vertices[b]).norm())
            .sum()
    };

    let pairing = |offset: usize| -> Vec<(usize, usize)> {
        (0..n / 2)
            .map(|k| (ring[(offset + 2 * k) % n], ring[(offset + 2 * k + 1) % n]))
            .collect()
    };
    let cost = |pairs: &[(usize, usize)]| -> f64 {
        pairs
            .iter()
            .map(|&(a, b)| span_len(a, b) + span_len(b, a))
            .sum()
    };

    let first = pairing(0);
    let second = pairing(1);
    let chosen = if cost(&second) < cost(&first) {
        second
    } else {
        first
    };
    Ok(chosen
        .into_iter()
        .map(|(a, b)| {
            if sides[a].level == Level::Low {
                (a, b)
            } else {
                (b, a)
            }
        })
        .collect())
}

fn quad_face(
    lower: &SideTriangle,
    upper: &SideTriangle,
    vertices: &[Point3<f64>],
) -> GeometryResult<(Face, Edge, Edge)> {
    let (l0, l1) = lower.cap;
    let (h0, h1) = upper.cap;
    let connects = |l: usize, h: usize| {
        lower.spanning().contains(&key(l, h)) || upper.spanning().contains(&key(l, h))
    };
    // high vertex joined to l1 by an outer spanning edge
    let (h_next, h_prev) = if connects(l1, h0) && connects(l0, h1) {
        (h0, h1)
    } else if connects(l1, h1) && connects(l0, h0) {
        (h1, h0)
    } else {
        return Err(GeometryError::MeshImport(
            "paired triangles do not form a quad".into(),
        ));
    };

    let low = Edge::line(vertices[l0], vertices[l1]);
    let high = Edge::line(vertices[h_next], vertices[h_prev]);
    let face = Face::from_edges(vec![
        low.clone(),
        Edge::line(vertices[l1], vertices[h_next]),
        high.clone(),
        Edge::line(vertices[h_prev], vertices[l0]),
    ]);
    Ok((face, low, high))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Square prism 0..10 x 0..10 x 0..20, side quads split on their diagonals.
    fn prism_mesh() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let corners = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let mut vertices = Vec::new();
        for c in &corners {
            vertices.push(Point3::new(c[0], c[1], 0.0));
        }
        for c in &corners {
            vertices.push(Point3::new(c[0], c[1], 20.0));
        }
        let mut triangles = Vec::new();
        for i in 0..4 {
            let j = (i + 1) % 4;
            triangles.push([i, j, 4 + i]);
            triangles.push([j, 4 + j, 4 + i]);
        }
        triangles.push([0, 2, 1]);
        triangles.push([0, 3, 2]);
        triangles.push([4, 5, 6]);
        triangles.push([4, 6, 7]);
        (vertices, triangles)
    }

    #[test]
    fn test_prism_mesh_becomes_four_quads() {
        let (vertices, triangles) = prism_mesh();
        let solid = solid_from_triangles("box", &vertices, &triangles).unwrap();
        assert_eq!(solid.faces().len(), 6);
        let sides: Vec<&Face> = solid.faces().iter().filter(|f| f.is_transversal()).collect();
        assert_eq!(sides.len(), 4);
        for side in sides {
            assert_eq!(side.vertices().len(), 4);
            // no diagonal: every spanning edge is vertical
            let vertical = side
                .edges()
                .iter()
                .filter(|e| (e.end().z - e.start().z).abs() > 1.0)
                .all(|e| (e.end().x - e.start().x).abs() < 1e-9 && (e.end().y - e.start().y).abs() < 1e-9);
            assert!(vertical);
        }
    }

    #[test]
    fn test_vertex_between_caps_rejected() {
        let (mut vertices, triangles) = prism_mesh();
        vertices[5].z = 12.0;
        vertices.push(Point3::new(10.0, 0.0, 20.0));
        let err = solid_from_triangles("bad", &vertices, &triangles).unwrap_err();
        assert!(matches!(err, GeometryError::MeshImport(_)));
    }

    #[test]
    fn test_open_strip_rejected() {
        let (vertices, mut triangles) = prism_mesh();
        triangles.remove(0);
        assert!(solid_from_triangles("open", &vertices, &triangles).is_err());
    }
}
