//! Boundary tracing of labeled components along cell edges
//!
//! Every side of a member cell that faces a non-member becomes a directed
//! edge, oriented so the member lies to the right when rows grow downward.
//! Chaining edges end-to-start yields closed rings: exteriors have positive
//! signed area in (col, row) space, holes negative. Where two member cells
//! meet only at a corner, the chain stays on the cell it arrived from, so
//! rings never cross and diagonal neighbours become separate rings. Paths
//! that still revisit a vertex are split there, so every ring is simple.

use std::collections::HashMap;

use geo::Contains;
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};

use crate::refine::ComponentLabels;
use landmask_core::GeoTransform;

type Vertex = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    fn offset(self) -> (isize, isize) {
        match self {
            Side::Top => (-1, 0),
            Side::Right => (0, 1),
            Side::Bottom => (1, 0),
            Side::Left => (0, -1),
        }
    }

    /// Start and end vertex (row, col) of this side of cell (row, col)
    fn vertices(self, row: usize, col: usize) -> (Vertex, Vertex) {
        match self {
            Side::Top => ((row, col), (row, col + 1)),
            Side::Right => ((row, col + 1), (row + 1, col + 1)),
            Side::Bottom => ((row + 1, col + 1), (row + 1, col)),
            Side::Left => ((row + 1, col), (row, col)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    start: Vertex,
    end: Vertex,
    cell: Vertex,
    side: Side,
}

#[derive(Debug)]
struct Ring {
    vertices: Vec<Vertex>,
    /// Twice the signed area in (col, row) space
    area2: i64,
    /// Cell across the first edge, outside the component
    outside: (isize, isize),
}

/// Polygons of component `label` in grid (col, row) units, before
/// georeferencing.
pub(crate) fn component_polygons(components: &ComponentLabels, label: u32) -> Vec<GridPolygon> {
    let rings = trace_rings(components, label);

    let (exteriors, holes): (Vec<Ring>, Vec<Ring>) = rings.into_iter().partition(|r| r.area2 > 0);

    let mut polygons: Vec<GridPolygon> = exteriors
        .into_iter()
        .map(|ring| GridPolygon {
            shape: Polygon::new(grid_line(&ring.vertices), vec![]),
            exterior: ring.vertices,
            area2: ring.area2,
            holes: Vec::new(),
        })
        .collect();

    for hole in holes {
        let probe = Point::new(hole.outside.1 as f64 + 0.5, hole.outside.0 as f64 + 0.5);
        let owner = polygons
            .iter_mut()
            .filter(|p| p.shape.contains(&probe))
            .min_by_key(|p| p.area2);
        if let Some(owner) = owner {
            owner.holes.push(hole.vertices);
        }
    }

    polygons
}

/// A traced polygon, vertices as (row, col) grid points
#[derive(Debug)]
pub(crate) struct GridPolygon {
    pub exterior: Vec<Vertex>,
    pub holes: Vec<Vec<Vertex>>,
    area2: i64,
    shape: Polygon<f64>,
}

impl GridPolygon {
    pub fn to_geo(&self, transform: &GeoTransform) -> Polygon<f64> {
        Polygon::new(
            geo_line(&self.exterior, transform),
            self.holes.iter().map(|h| geo_line(h, transform)).collect(),
        )
    }
}

/// Georeferenced geometry of a list of traced polygons
pub(crate) fn to_multi_polygon(polygons: &[GridPolygon], transform: &GeoTransform) -> MultiPolygon<f64> {
    MultiPolygon::new(polygons.iter().map(|p| p.to_geo(transform)).collect())
}

fn grid_line(vertices: &[Vertex]) -> LineString<f64> {
    vertices
        .iter()
        .map(|&(r, c)| Coord { x: c as f64, y: r as f64 })
        .collect()
}

fn geo_line(vertices: &[Vertex], transform: &GeoTransform) -> LineString<f64> {
    vertices
        .iter()
        .map(|&(r, c)| {
            let (x, y) = transform.pixel_to_geo_corner(c, r);
            Coord { x, y }
        })
        .collect()
}

fn trace_rings(components: &ComponentLabels, label: u32) -> Vec<Ring> {
    let Some(bounds) = components.bounds(label) else {
        return Vec::new();
    };
    let member = |row: isize, col: isize| {
        row >= 0 && col >= 0 && components.label_at(row as usize, col as usize) == label
    };

    let mut edges = Vec::new();
    for row in bounds.min_row..=bounds.max_row {
        for col in bounds.min_col..=bounds.max_col {
            if !member(row as isize, col as isize) {
                continue;
            }
            for side in Side::ALL {
                let (dr, dc) = side.offset();
                if member(row as isize + dr, col as isize + dc) {
                    continue;
                }
                let (start, end) = side.vertices(row, col);
                edges.push(Edge {
                    start,
                    end,
                    cell: (row, col),
                    side,
                });
            }
        }
    }

    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.start).or_default().push(i);
    }

    let successor = |e: &Edge| -> Option<usize> {
        let candidates = outgoing.get(&e.end)?;
        candidates
            .iter()
            .copied()
            .find(|&i| edges[i].cell == e.cell)
            .or_else(|| candidates.first().copied())
    };

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }

        let mut path = Vec::new();
        let mut current = first;
        loop {
            used[current] = true;
            path.push(current);
            match successor(&edges[current]) {
                Some(next) if !used[next] => current = next,
                _ => break,
            }
        }

        for lp in split_at_repeats(&path, &edges) {
            let first_edge = edges[lp[0]];
            let vertices = drop_collinear(lp.iter().map(|&i| edges[i].start).collect());
            let (dr, dc) = first_edge.side.offset();
            rings.push(Ring {
                area2: signed_area2(&vertices),
                vertices,
                outside: (first_edge.cell.0 as isize + dr, first_edge.cell.1 as isize + dc),
            });
        }
    }

    rings
}

/// Split a closed edge path into simple loops wherever it passes through
/// a vertex it has already visited.
///
/// Staying on the arrival cell keeps diagonal member cells apart, but joins
/// diagonal non-member cells: two holes meeting at a corner, or a hole
/// touching the outside at a corner, come out as one self-touching path.
fn split_at_repeats(path: &[usize], edges: &[Edge]) -> Vec<Vec<usize>> {
    let mut loops = Vec::new();
    let mut stack: Vec<usize> = Vec::with_capacity(path.len());
    let mut seen: HashMap<Vertex, usize> = HashMap::new();

    for &e in path {
        let v = edges[e].start;
        if let Some(&pos) = seen.get(&v) {
            let closed: Vec<usize> = stack.drain(pos..).collect();
            for &i in &closed {
                seen.remove(&edges[i].start);
            }
            loops.push(closed);
        }
        seen.insert(v, stack.len());
        stack.push(e);
    }
    if !stack.is_empty() {
        loops.push(stack);
    }
    loops
}

/// Remove vertices that continue straight on
fn drop_collinear(path: Vec<Vertex>) -> Vec<Vertex> {
    let n = path.len();
    if n < 4 {
        return path;
    }
    let dir = |a: Vertex, b: Vertex| {
        (
            (b.0 as isize - a.0 as isize).signum(),
            (b.1 as isize - a.1 as isize).signum(),
        )
    };
    (0..n)
        .filter(|&i| {
            let prev = path[(i + n - 1) % n];
            let next = path[(i + 1) % n];
            dir(prev, path[i]) != dir(path[i], next)
        })
        .map(|i| path[i])
        .collect()
}

fn signed_area2(vertices: &[Vertex]) -> i64 {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let (r0, c0) = vertices[i];
            let (r1, c1) = vertices[(i + 1) % n];
            c0 as i64 * r1 as i64 - c1 as i64 * r0 as i64
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::{label_components, Connectivity};
    use landmask_core::BinaryMask;

    fn labels(rows: &[&str], connectivity: Connectivity) -> ComponentLabels {
        let cols = rows[0].len();
        let values: Vec<bool> = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| c == '#'))
            .collect();
        let mask =
            BinaryMask::from_bools(&values, rows.len(), cols, GeoTransform::default()).unwrap();
        label_components(&mask, connectivity)
    }

    #[test]
    fn test_single_cell_square() {
        let l = labels(&["...", ".#.", "..."], Connectivity::Eight);
        let polys = component_polygons(&l, 1);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].exterior, vec![(1, 1), (1, 2), (2, 2), (2, 1)]);
        assert_eq!(polys[0].area2, 2);
    }

    #[test]
    fn test_l_shape_corners() {
        let l = labels(&["#.", "##"], Connectivity::Four);
        let polys = component_polygons(&l, 1);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].exterior.len(), 6);
        assert_eq!(polys[0].area2, 6);
        assert!(polys[0].holes.is_empty());
    }

    #[test]
    fn test_ring_with_hole() {
        let l = labels(&["###", "#.#", "###"], Connectivity::Four);
        let polys = component_polygons(&l, 1);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].holes.len(), 1);
        assert_eq!(signed_area2(&polys[0].holes[0]), -2);
        assert_eq!(polys[0].area2, 18);
    }

    #[test]
    fn test_diagonal_pieces_split() {
        let l = labels(&["#.", ".#"], Connectivity::Eight);
        assert_eq!(l.count(), 1);
        let polys = component_polygons(&l, 1);
        assert_eq!(polys.len(), 2);
        assert!(polys.iter().all(|p| p.area2 == 2 && p.holes.is_empty()));
    }

    fn has_repeated_vertex(ring: &[Vertex]) -> bool {
        let mut seen = std::collections::HashSet::new();
        !ring.iter().all(|v| seen.insert(*v))
    }

    #[test]
    fn test_diagonal_holes_stay_separate() {
        let l = labels(&["####", "#.##", "##.#", "####"], Connectivity::Eight);
        assert_eq!(l.count(), 1);
        let polys = component_polygons(&l, 1);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].area2, 32);
        assert_eq!(polys[0].holes.len(), 2);
        for hole in &polys[0].holes {
            assert_eq!(signed_area2(hole), -2);
            assert!(!has_repeated_vertex(hole));
        }
        assert!(!has_repeated_vertex(&polys[0].exterior));
    }

    #[test]
    fn test_hole_touching_outside_at_corner() {
        let l = labels(&["###", "#.#", "##."], Connectivity::Eight);
        assert_eq!(l.count(), 1);
        let polys = component_polygons(&l, 1);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].area2, 16);
        assert!(!has_repeated_vertex(&polys[0].exterior));
        assert_eq!(polys[0].holes.len(), 1);
        assert_eq!(signed_area2(&polys[0].holes[0]), -2);
    }

    #[test]
    fn test_georeferenced_corners() {
        let l = labels(&["#"], Connectivity::Eight);
        let polys = component_polygons(&l, 1);
        let t = GeoTransform::new(100.0, 50.0, 10.0, -10.0);
        let geom = polys[0].to_geo(&t);
        let xs: Vec<(f64, f64)> = geom.exterior().coords().map(|c| (c.x, c.y)).collect();
        assert_eq!(
            xs,
            vec![(100.0, 50.0), (110.0, 50.0), (110.0, 40.0), (100.0, 40.0), (100.0, 50.0)]
        );
    }
}
