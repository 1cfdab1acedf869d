//! Contour model of a delineated structure.
//!
//! A structure is an ordered list of axial contour planes. Each plane holds
//! one or more closed rings in world x/y coordinates (mm). Rings keep the
//! order in which they were added.

use serde::{Deserialize, Serialize};

/// A 2D point in world coordinates (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A closed polygon outline. The closing edge from the last point back to
/// the first is implicit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ring {
    points: Vec<Point2>,
}

impl Ring {
    /// Create a ring from its vertices.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle with counter-clockwise winding.
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(vec![
            Point2::new(min_x, min_y),
            Point2::new(max_x, min_y),
            Point2::new(max_x, max_y),
            Point2::new(min_x, max_y),
        ])
    }

    /// The vertices as supplied.
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Vertices with a repeated closing point and consecutive duplicates
    /// removed.
    pub fn normalized_points(&self) -> Vec<Point2> {
        let mut out: Vec<Point2> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if out.last() != Some(p) {
                out.push(*p);
            }
        }
        while out.len() > 1 && out.first() == out.last() {
            out.pop();
        }
        out
    }

    /// Same ring traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }
}

impl From<Vec<(f64, f64)>> for Ring {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Self::new(points.into_iter().map(Point2::from).collect())
    }
}

/// All rings lying in one axial plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourSlice {
    /// World z position of the plane (mm).
    pub z: f64,
    pub rings: Vec<Ring>,
}

impl ContourSlice {
    pub fn new(z: f64, rings: Vec<Ring>) -> Self {
        Self { z, rings }
    }
}

/// A delineated structure: its label and contour planes in ascending z.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContourStructure {
    label: String,
    slices: Vec<ContourSlice>,
}

impl ContourStructure {
    /// Create an empty structure.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            slices: Vec::new(),
        }
    }

    /// Add a ring in the plane at `z`. Rings in the same plane (exact z match)
    /// are grouped together and keep insertion order.
    pub fn add_ring(&mut self, z: f64, ring: Ring) {
        match self.slices.iter_mut().find(|s| s.z == z) {
            Some(slice) => slice.rings.push(ring),
            None => {
                let pos = self.slices.partition_point(|s| s.z < z);
                self.slices.insert(pos, ContourSlice::new(z, vec![ring]));
            }
        }
    }

    /// Builder form of [`ContourStructure::add_ring`].
    pub fn with_ring(mut self, z: f64, ring: Ring) -> Self {
        self.add_ring(z, ring);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Contour planes in ascending z.
    pub fn slices(&self) -> &[ContourSlice] {
        &self.slices
    }

    /// Total number of rings across all planes.
    pub fn ring_count(&self) -> usize {
        self.slices.iter().map(|s| s.rings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ring_count() == 0
    }
}
