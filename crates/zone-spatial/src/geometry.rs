//! Points, block positions and axis-aligned boxes.

use std::fmt;

/// A continuous position inside a domain.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Get the coordinate along a horizontal axis.
    #[must_use]
    pub const fn along(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Z => self.z,
        }
    }
}

/// An integer block coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    /// Create a new block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The block's minimum corner as a continuous point.
    #[must_use]
    pub fn to_point(self) -> Point {
        Point::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Horizontal axis used by the partition tree.
///
/// Y is never partitioned: regions are shallow in Y relative to X/Z, so the
/// exact leaf test handles it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Z,
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point,
    pub max: Point,
}

impl Aabb {
    /// Create a box from two arbitrary corners, sorting each coordinate.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// The unit box occupied by a block.
    #[must_use]
    pub fn block(pos: BlockPos) -> Self {
        let min = pos.to_point();
        Self {
            min,
            max: Point::new(min.x + 1.0, min.y + 1.0, min.z + 1.0),
        }
    }

    /// Whether the point lies inside the box.
    ///
    /// The minimum faces are always inclusive; `max_inclusive` decides the
    /// maximum faces.
    #[must_use]
    pub fn contains_point(&self, p: Point, max_inclusive: bool) -> bool {
        let below_max = if max_inclusive {
            p.x <= self.max.x && p.y <= self.max.y && p.z <= self.max.z
        } else {
            p.x < self.max.x && p.y < self.max.y && p.z < self.max.z
        };
        below_max && p.x >= self.min.x && p.y >= self.min.y && p.z >= self.min.z
    }

    /// Whether `other` lies wholly inside this box.
    #[must_use]
    pub fn contains_box(&self, other: &Self, max_inclusive: bool) -> bool {
        let below_max = if max_inclusive {
            other.max.x <= self.max.x && other.max.y <= self.max.y && other.max.z <= self.max.z
        } else {
            other.max.x < self.max.x && other.max.y < self.max.y && other.max.z < self.max.z
        };
        below_max
            && other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.min.z >= self.min.z
    }

    /// Whether the two boxes share a region of positive volume.
    ///
    /// Boxes that only touch along a face do not overlap, matching the
    /// half-open convention of block-built cuboids.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
            && self.min.z < other.max.z
            && other.min.z < self.max.z
    }

    /// All eight corners.
    #[must_use]
    pub fn corners(&self) -> [Point; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Point::new(lo.x, lo.y, lo.z),
            Point::new(hi.x, lo.y, lo.z),
            Point::new(lo.x, hi.y, lo.z),
            Point::new(lo.x, lo.y, hi.z),
            Point::new(hi.x, hi.y, lo.z),
            Point::new(hi.x, lo.y, hi.z),
            Point::new(lo.x, hi.y, hi.z),
            Point::new(hi.x, hi.y, hi.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_sorts() {
        let b = Aabb::from_corners(Point::new(5.0, -1.0, 3.0), Point::new(1.0, 4.0, -2.0));
        assert_eq!(b.min, Point::new(1.0, -1.0, -2.0));
        assert_eq!(b.max, Point::new(5.0, 4.0, 3.0));
    }

    #[test]
    fn test_max_boundary_inclusivity() {
        let b = Aabb::from_corners(Point::new(0.0, 0.0, 0.0), Point::new(10.0, 10.0, 10.0));
        let edge = Point::new(10.0, 5.0, 5.0);

        assert!(b.contains_point(edge, true));
        assert!(!b.contains_point(edge, false));
        assert!(b.contains_point(Point::new(0.0, 0.0, 0.0), false));
    }

    #[test]
    fn test_block_box_fits_exclusive() {
        let outer = Aabb::from_corners(Point::new(0.0, 0.0, 0.0), Point::new(4.0, 4.0, 4.0));

        assert!(outer.contains_box(&Aabb::block(BlockPos::new(3, 3, 3)), true));
        assert!(!outer.contains_box(&Aabb::block(BlockPos::new(3, 3, 3)), false));
        assert!(!outer.contains_box(&Aabb::block(BlockPos::new(4, 0, 0)), true));
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let a = Aabb::from_corners(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0));
        let b = Aabb::from_corners(Point::new(1.0, 0.0, 0.0), Point::new(2.0, 1.0, 1.0));
        let c = Aabb::from_corners(Point::new(0.5, 0.5, 0.0), Point::new(2.0, 1.0, 1.0));

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }
}
