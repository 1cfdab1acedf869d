//! Ring topology of one grid slice: validation and donut merging.
//!
//! Every pair of rings on a slice is compared, so the cost grows
//! quadratically with the number of rings per slice and with the number of
//! edges per ring. Typical structures hold a handful of rings per slice.

use std::collections::BTreeMap;
use std::fmt;

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::orient::Direction;
use geo::{Area, Contains, Coord, Line, LineString, Orient, Polygon};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use dose_common::{ContourStructure, GeometricGrid, IndexBounds};

/// Rings with an absolute area below this (in voxel units) are degenerate.
const DEGENERATE_AREA: f64 = 1e-12;

/// Position of a ring in its source structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RingId {
    /// Index of the contour plane in the structure.
    pub plane: usize,
    /// Index of the ring within its plane.
    pub ring: usize,
}

impl fmt::Display for RingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ring {} of contour plane {}", self.ring, self.plane)
    }
}

/// A contour ring expressed in continuous grid-index coordinates.
#[derive(Debug, Clone)]
pub struct IndexRing {
    pub id: RingId,
    coords: Vec<Coord<f64>>,
    signed_area: f64,
    bounds: Option<IndexBounds>,
    shape: Polygon<f64>,
}

impl IndexRing {
    /// Create a ring from open (not repeated) vertex coordinates.
    pub fn new(id: RingId, coords: Vec<Coord<f64>>) -> Self {
        let bounds = IndexBounds::from_points(coords.iter().map(|c| (c.x, c.y)));
        let shape = Polygon::new(LineString::new(coords.clone()), vec![]);
        let signed_area = shape.signed_area();
        Self {
            id,
            coords,
            signed_area,
            bounds,
            shape,
        }
    }

    pub fn coords(&self) -> &[Coord<f64>] {
        &self.coords
    }

    pub fn signed_area(&self) -> f64 {
        self.signed_area
    }

    pub fn area(&self) -> f64 {
        self.signed_area.abs()
    }

    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area > 0.0
    }

    pub fn bounds(&self) -> Option<IndexBounds> {
        self.bounds
    }

    /// Fewer than three distinct vertices or no enclosed area.
    pub fn is_degenerate(&self) -> bool {
        self.coords.len() < 3 || self.area() <= DEGENERATE_AREA
    }

    fn edges(&self) -> impl Iterator<Item = Line<f64>> + '_ {
        let n = self.coords.len();
        (0..n).map(move |i| Line::new(self.coords[i], self.coords[(i + 1) % n]))
    }

    /// True if any two non-adjacent edges touch, or any two edges overlap.
    pub fn self_intersects(&self) -> bool {
        let edges: Vec<Line<f64>> = self.edges().collect();
        let n = edges.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                match line_intersection(edges[i], edges[j]) {
                    Some(LineIntersection::Collinear { .. }) => return true,
                    Some(LineIntersection::SinglePoint { .. }) if !adjacent => return true,
                    _ => {}
                }
            }
        }
        false
    }

    /// True if any edge of `self` touches any edge of `other`.
    pub fn intersects(&self, other: &IndexRing) -> bool {
        match (self.bounds, other.bounds) {
            (Some(a), Some(b)) if a.intersects(&b) => {}
            _ => return false,
        }
        let theirs: Vec<Line<f64>> = other.edges().collect();
        self.edges()
            .any(|e| theirs.iter().any(|f| line_intersection(e, *f).is_some()))
    }

    /// True if `other` lies inside `self`. Only meaningful when the two rings
    /// do not intersect, so testing a single vertex suffices.
    pub fn encloses(&self, other: &IndexRing) -> bool {
        let (Some(outer), Some(inner)) = (self.bounds, other.bounds) else {
            return false;
        };
        if inner.min_x < outer.min_x
            || inner.max_x > outer.max_x
            || inner.min_y < outer.min_y
            || inner.max_y > outer.max_y
        {
            return false;
        }
        other
            .coords
            .first()
            .map_or(false, |c| self.shape.contains(c))
    }
}

/// An exterior ring with zero or more holes.
#[derive(Debug, Clone)]
pub struct SlicePolygon {
    exterior: IndexRing,
    holes: Vec<IndexRing>,
    shape: Polygon<f64>,
}

impl SlicePolygon {
    pub fn new(exterior: IndexRing, holes: Vec<IndexRing>) -> Self {
        let shape = Polygon::new(
            exterior.shape.exterior().clone(),
            holes.iter().map(|h| h.shape.exterior().clone()).collect(),
        )
        .orient(Direction::Default);
        Self {
            exterior,
            holes,
            shape,
        }
    }

    pub fn exterior(&self) -> &IndexRing {
        &self.exterior
    }

    pub fn holes(&self) -> &[IndexRing] {
        &self.holes
    }

    /// Hole-aware polygon with a counter-clockwise exterior and clockwise
    /// holes.
    pub fn shape(&self) -> &Polygon<f64> {
        &self.shape
    }

    pub fn bounds(&self) -> Option<IndexBounds> {
        self.exterior.bounds()
    }

    /// Enclosed area in voxel units.
    pub fn area(&self) -> f64 {
        self.shape.unsigned_area()
    }
}

/// A topology problem found on one grid slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopologyIssue {
    /// Ring with fewer than three distinct vertices or zero area.
    Degenerate { slice: usize, ring: RingId },
    /// Ring crosses or overlaps itself.
    SelfIntersection { slice: usize, ring: RingId },
    /// Two rings on the same slice touch or cross.
    Crossing {
        slice: usize,
        first: RingId,
        second: RingId,
    },
    /// A ring nested directly inside another ring with the same winding.
    NestedSameWinding {
        slice: usize,
        outer: RingId,
        inner: RingId,
    },
}

impl TopologyIssue {
    /// Grid slice the issue was found on.
    pub fn slice(&self) -> usize {
        match self {
            Self::Degenerate { slice, .. }
            | Self::SelfIntersection { slice, .. }
            | Self::Crossing { slice, .. }
            | Self::NestedSameWinding { slice, .. } => *slice,
        }
    }
}

impl fmt::Display for TopologyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Degenerate { slice, ring } => {
                write!(f, "slice {}: {} is degenerate", slice, ring)
            }
            Self::SelfIntersection { slice, ring } => {
                write!(f, "slice {}: {} intersects itself", slice, ring)
            }
            Self::Crossing {
                slice,
                first,
                second,
            } => write!(f, "slice {}: {} intersects {}", slice, first, second),
            Self::NestedSameWinding {
                slice,
                outer,
                inner,
            } => write!(
                f,
                "slice {}: {} lies inside {} with the same winding",
                slice, inner, outer
            ),
        }
    }
}

/// Polygons and issues of one grid slice.
#[derive(Debug, Clone)]
pub struct SliceTopology {
    pub slice: usize,
    pub polygons: Vec<SlicePolygon>,
    pub issues: Vec<TopologyIssue>,
}

impl SliceTopology {
    /// Bounds of all polygons on the slice.
    pub fn bounds(&self) -> Option<IndexBounds> {
        self.polygons
            .iter()
            .filter_map(SlicePolygon::bounds)
            .reduce(|a, b| a.union(&b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Role {
    Exterior,
    Hole(usize),
}

/// Validate the rings of one grid slice and merge donut pairs.
///
/// A ring becomes a hole when its innermost enclosing ring is an exterior
/// with opposite winding. A ring inside a hole is a new exterior. Rings that
/// cross, self-intersect or nest with the same winding are reported; they
/// are still voxelized as standalone exteriors, degenerate rings contribute
/// no area.
pub fn analyze_slice(slice: usize, rings: Vec<IndexRing>) -> SliceTopology {
    let mut issues = Vec::new();

    let (degenerate, valid): (Vec<IndexRing>, Vec<IndexRing>) =
        rings.into_iter().partition(IndexRing::is_degenerate);
    for ring in &degenerate {
        issues.push(TopologyIssue::Degenerate {
            slice,
            ring: ring.id,
        });
    }

    for ring in &valid {
        if ring.self_intersects() {
            issues.push(TopologyIssue::SelfIntersection {
                slice,
                ring: ring.id,
            });
        }
    }

    // Innermost enclosing ring of each ring.
    let n = valid.len();
    let mut parent: Vec<Option<usize>> = vec![None; n];
    let adopt = |parent: &mut Vec<Option<usize>>, child: usize, candidate: usize| {
        let better = match parent[child] {
            None => true,
            Some(current) => valid[candidate].area() < valid[current].area(),
        };
        if better {
            parent[child] = Some(candidate);
        }
    };

    for i in 0..n {
        for j in (i + 1)..n {
            if valid[i].intersects(&valid[j]) {
                issues.push(TopologyIssue::Crossing {
                    slice,
                    first: valid[i].id,
                    second: valid[j].id,
                });
            } else if valid[i].encloses(&valid[j]) {
                adopt(&mut parent, j, i);
            } else if valid[j].encloses(&valid[i]) {
                adopt(&mut parent, i, j);
            }
        }
    }

    // Enclosing rings are strictly larger, so they get their role first.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| valid[b].area().total_cmp(&valid[a].area()));

    let mut roles = vec![Role::Exterior; n];
    for &k in &order {
        let Some(p) = parent[k] else {
            continue;
        };
        if valid[p].is_counter_clockwise() == valid[k].is_counter_clockwise() {
            issues.push(TopologyIssue::NestedSameWinding {
                slice,
                outer: valid[p].id,
                inner: valid[k].id,
            });
            continue;
        }
        if roles[p] == Role::Exterior {
            roles[k] = Role::Hole(p);
        }
    }

    let mut slots: Vec<Option<IndexRing>> = valid.into_iter().map(Some).collect();
    let mut holes_of: Vec<Vec<IndexRing>> = (0..n).map(|_| Vec::new()).collect();
    for k in 0..n {
        if let Role::Hole(p) = roles[k] {
            if let Some(hole) = slots[k].take() {
                holes_of[p].push(hole);
            }
        }
    }

    let mut polygons = Vec::new();
    for (k, slot) in slots.into_iter().enumerate() {
        if let Some(exterior) = slot {
            polygons.push(SlicePolygon::new(exterior, std::mem::take(&mut holes_of[k])));
        }
    }

    SliceTopology {
        slice,
        polygons,
        issues,
    }
}

/// Project every ring of `structure` into continuous index coordinates of
/// `grid`, grouped by the grid slice its contour plane falls in.
///
/// Contour planes outside the grid are skipped with a warning.
pub fn project_structure(
    structure: &ContourStructure,
    grid: &GeometricGrid,
) -> BTreeMap<usize, Vec<IndexRing>> {
    let mut slices: BTreeMap<usize, Vec<IndexRing>> = BTreeMap::new();

    for (plane, contour) in structure.slices().iter().enumerate() {
        let slice = match grid.slice_for_z(contour.z) {
            Ok(slice) => slice,
            Err(e) => {
                warn!(
                    structure = structure.label(),
                    z = contour.z,
                    rings = contour.rings.len(),
                    error = %e,
                    "Contour plane outside grid, skipping"
                );
                continue;
            }
        };

        let rings = slices.entry(slice).or_default();
        for (ring, outline) in contour.rings.iter().enumerate() {
            let coords = outline
                .normalized_points()
                .iter()
                .map(|p| {
                    let c = grid.world_to_continuous_index(&Vector3::new(p.x, p.y, contour.z));
                    Coord { x: c.x, y: c.y }
                })
                .collect();
            rings.push(IndexRing::new(RingId { plane, ring }, coords));
        }
    }

    slices
}

/// Topology of every grid slice touched by `structure`, in slice order.
pub fn analyze_structure(structure: &ContourStructure, grid: &GeometricGrid) -> Vec<SliceTopology> {
    project_structure(structure, grid)
        .into_iter()
        .map(|(slice, rings)| analyze_slice(slice, rings))
        .collect()
}

/// All topology issues of `structure` on `grid`. Empty for a valid structure.
pub fn validate_structure(structure: &ContourStructure, grid: &GeometricGrid) -> Vec<TopologyIssue> {
    analyze_structure(structure, grid)
        .into_iter()
        .flat_map(|topology| topology.issues)
        .collect()
}
