//! Axis-aligned bounds in continuous grid-index space.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in continuous (x, y) grid-index coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl IndexBounds {
    /// Create bounds from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Tight bounds around a set of points. Returns `None` for an empty set.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut bounds = Self::new(x0, y0, x0, y0);
        for (x, y) in iter {
            bounds.min_x = bounds.min_x.min(x);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_x = bounds.max_x.max(x);
            bounds.max_y = bounds.max_y.max(y);
        }
        Some(bounds)
    }

    /// Smallest bounds enclosing both.
    pub fn union(&self, other: &IndexBounds) -> IndexBounds {
        IndexBounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Check if this rectangle overlaps another (touching counts).
    pub fn intersects(&self, other: &IndexBounds) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_y < other.min_y
            || self.min_y > other.max_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Inclusive voxel index ranges whose footprints `[i - 0.5, i + 0.5]`
    /// overlap these bounds, clamped to a grid of `nx` by `ny` voxels.
    ///
    /// Returns `None` if the bounds miss the grid entirely.
    pub fn voxel_ranges(
        &self,
        nx: usize,
        ny: usize,
    ) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        let xs = axis_range(self.min_x, self.max_x, nx)?;
        let ys = axis_range(self.min_y, self.max_y, ny)?;
        Some((xs, ys))
    }
}

fn axis_range(min: f64, max: f64, n: usize) -> Option<RangeInclusive<usize>> {
    if n == 0 || !min.is_finite() || !max.is_finite() || max < min {
        return None;
    }
    let lo = (min + 0.5).floor().max(0.0);
    let hi = (max + 0.5).floor().min((n - 1) as f64);
    if lo > hi {
        return None;
    }
    Some(lo as usize..=hi as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let bounds = IndexBounds::from_points(vec![(1.0, 5.0), (-2.0, 3.0), (4.0, 4.0)]).unwrap();
        assert_eq!(bounds, IndexBounds::new(-2.0, 3.0, 4.0, 5.0));
        assert!(IndexBounds::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_voxel_ranges_clamped() {
        let bounds = IndexBounds::new(1.5, -3.0, 7.5, 2.2);
        let (xs, ys) = bounds.voxel_ranges(10, 10).unwrap();
        assert_eq!(xs, 2..=8);
        assert_eq!(ys, 0..=2);
    }

    #[test]
    fn test_voxel_ranges_outside_grid() {
        assert!(IndexBounds::new(11.0, 0.0, 12.0, 1.0).voxel_ranges(10, 10).is_none());
        assert!(IndexBounds::new(-5.0, 0.0, -0.6, 1.0).voxel_ranges(10, 10).is_none());
    }

    #[test]
    fn test_union_and_intersects() {
        let a = IndexBounds::new(0.0, 0.0, 2.0, 2.0);
        let b = IndexBounds::new(2.0, 1.0, 4.0, 5.0);
        let c = IndexBounds::new(5.0, 5.0, 6.0, 6.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.union(&c), IndexBounds::new(0.0, 0.0, 6.0, 6.0));
        assert!((a.union(&b).width() - 4.0).abs() < f64::EPSILON);
        assert!((a.union(&b).height() - 5.0).abs() < f64::EPSILON);
    }
}
