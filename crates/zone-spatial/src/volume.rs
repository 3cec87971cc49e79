//! Volumes: the geometric shapes that make up a zone.
//!
//! Every volume exposes two axis-aligned approximations:
//!
//! - **circumscribed**: contains every point of the volume (no false negatives)
//! - **inscribed**: contained by the volume (no false positives)
//!
//! The index descends on circumscribed boxes and only asks the exact
//! predicate at the leaves.

use std::fmt;

use crate::{Aabb, Point, SpatialError, SpatialResult};

/// Identifies the world a volume lives in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DomainId(pub u32);

impl fmt::Debug for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Domain({})", self.0)
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A geometric region inside one domain.
///
/// Implementations must be immutable once created. The default
/// `contains_box` tests all eight corners, which is exact for convex shapes.
pub trait Volume: Send + Sync + fmt::Debug {
    /// The domain this volume belongs to.
    fn domain(&self) -> DomainId;

    /// Safe outer approximation.
    fn circumscribed(&self) -> Aabb;

    /// Safe inner approximation.
    fn inscribed(&self) -> Aabb;

    /// Exact point containment.
    fn contains_point(&self, p: Point, max_inclusive: bool) -> bool;

    /// Exact box containment.
    fn contains_box(&self, b: &Aabb, max_inclusive: bool) -> bool {
        b.corners()
            .into_iter()
            .all(|corner| self.contains_point(corner, max_inclusive))
    }

    /// Exact geometry, if the volume is one of the known shapes.
    fn shape(&self) -> Shape {
        Shape::Opaque
    }

    /// Whether the two volumes share space.
    ///
    /// Known shape pairs are tested exactly. Anything involving an
    /// [`Shape::Opaque`] volume falls back to comparing circumscribed boxes.
    fn intersects(&self, other: &dyn Volume) -> bool {
        if self.domain() != other.domain()
            || !self.circumscribed().overlaps(&other.circumscribed())
        {
            return false;
        }
        self.shape().intersects(other.shape()).unwrap_or(true)
    }
}

/// Exact geometry of a volume.
///
/// Intersection between shapes is strict: shapes that only touch do not
/// intersect, matching [`Aabb::overlaps`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// An axis-aligned box. Bounds may be infinite.
    Box(Aabb),
    Ball { center: Point, radius: f64 },
    /// A vertical cylinder.
    Column {
        center_x: f64,
        center_z: f64,
        radius: f64,
        min_y: f64,
        max_y: f64,
    },
    /// Unknown geometry.
    Opaque,
}

impl Shape {
    /// Exact strict intersection, or `None` if either side is opaque.
    #[must_use]
    pub fn intersects(self, other: Self) -> Option<bool> {
        let hit = match (self, other) {
            (Self::Opaque, _) | (_, Self::Opaque) => return None,
            (Self::Box(a), Self::Box(b)) => a.overlaps(&b),
            (Self::Ball { center, radius }, Self::Box(b))
            | (Self::Box(b), Self::Ball { center, radius }) => {
                box_distance_sq(&b, center) < radius * radius
            }
            (Self::Ball { center: a, radius: ra }, Self::Ball { center: b, radius: rb }) => {
                let (dx, dy, dz) = (a.x - b.x, a.y - b.y, a.z - b.z);
                dx * dx + dy * dy + dz * dz < (ra + rb) * (ra + rb)
            }
            (
                Self::Column {
                    center_x,
                    center_z,
                    radius,
                    min_y,
                    max_y,
                },
                Self::Box(b),
            )
            | (
                Self::Box(b),
                Self::Column {
                    center_x,
                    center_z,
                    radius,
                    min_y,
                    max_y,
                },
            ) => {
                let dx = gap(b.min.x, b.max.x, center_x);
                let dz = gap(b.min.z, b.max.z, center_z);
                min_y < b.max.y && b.min.y < max_y && dx * dx + dz * dz < radius * radius
            }
            (
                Self::Column {
                    center_x: ax,
                    center_z: az,
                    radius: ra,
                    min_y: a_lo,
                    max_y: a_hi,
                },
                Self::Column {
                    center_x: bx,
                    center_z: bz,
                    radius: rb,
                    min_y: b_lo,
                    max_y: b_hi,
                },
            ) => {
                let (dx, dz) = (ax - bx, az - bz);
                a_lo < b_hi && b_lo < a_hi && dx * dx + dz * dz < (ra + rb) * (ra + rb)
            }
            (
                Self::Ball { center, radius },
                Self::Column {
                    center_x,
                    center_z,
                    radius: rc,
                    min_y,
                    max_y,
                },
            )
            | (
                Self::Column {
                    center_x,
                    center_z,
                    radius: rc,
                    min_y,
                    max_y,
                },
                Self::Ball { center, radius },
            ) => {
                let (hx, hz) = (center.x - center_x, center.z - center_z);
                let dh = ((hx * hx + hz * hz).sqrt() - rc).max(0.0);
                let dy = gap(min_y, max_y, center.y);
                dh * dh + dy * dy < radius * radius
            }
        };
        Some(hit)
    }
}

/// Distance from `v` to the interval `[lo, hi]`.
fn gap(lo: f64, hi: f64, v: f64) -> f64 {
    (lo - v).max(v - hi).max(0.0)
}

/// Squared distance from `p` to the closest point of `b`.
fn box_distance_sq(b: &Aabb, p: Point) -> f64 {
    let dx = gap(b.min.x, b.max.x, p.x);
    let dy = gap(b.min.y, b.max.y, p.y);
    let dz = gap(b.min.z, b.max.z, p.z);
    dx * dx + dy * dy + dz * dz
}

fn require_positive(shape: &'static str, what: &str, value: f64) -> SpatialResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(SpatialError::InvalidDimensions {
            shape,
            detail: format!("{what} must be positive, got {value}"),
        })
    }
}

/// An axis-aligned box.
#[derive(Clone, Debug, PartialEq)]
pub struct Cuboid {
    domain: DomainId,
    bounds: Aabb,
}

impl Cuboid {
    /// Create a cuboid spanning two continuous corners.
    pub fn new(domain: DomainId, a: Point, b: Point) -> SpatialResult<Self> {
        let bounds = Aabb::from_corners(a, b);
        require_positive("cuboid", "width", bounds.max.x - bounds.min.x)?;
        require_positive("cuboid", "height", bounds.max.y - bounds.min.y)?;
        require_positive("cuboid", "length", bounds.max.z - bounds.min.z)?;
        Ok(Self { domain, bounds })
    }

    /// Create a cuboid covering every block between two block corners,
    /// both inclusive.
    pub fn from_blocks(
        domain: DomainId,
        a: crate::BlockPos,
        b: crate::BlockPos,
    ) -> SpatialResult<Self> {
        let min = crate::BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
        let max = crate::BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z));
        let far = max.to_point();
        Self::new(
            domain,
            min.to_point(),
            Point::new(far.x + 1.0, far.y + 1.0, far.z + 1.0),
        )
    }

    /// The exact bounds.
    #[must_use]
    pub const fn bounds(&self) -> Aabb {
        self.bounds
    }
}

impl Volume for Cuboid {
    fn domain(&self) -> DomainId {
        self.domain
    }

    fn circumscribed(&self) -> Aabb {
        self.bounds
    }

    fn inscribed(&self) -> Aabb {
        self.bounds
    }

    fn contains_point(&self, p: Point, max_inclusive: bool) -> bool {
        self.bounds.contains_point(p, max_inclusive)
    }

    fn contains_box(&self, b: &Aabb, max_inclusive: bool) -> bool {
        self.bounds.contains_box(b, max_inclusive)
    }

    fn shape(&self) -> Shape {
        Shape::Box(self.bounds)
    }
}

/// A ball.
#[derive(Clone, Debug, PartialEq)]
pub struct Sphere {
    domain: DomainId,
    center: Point,
    radius: f64,
}

impl Sphere {
    pub fn new(domain: DomainId, center: Point, radius: f64) -> SpatialResult<Self> {
        require_positive("sphere", "radius", radius)?;
        Ok(Self {
            domain,
            center,
            radius,
        })
    }
}

impl Volume for Sphere {
    fn domain(&self) -> DomainId {
        self.domain
    }

    fn circumscribed(&self) -> Aabb {
        let r = self.radius;
        let c = self.center;
        Aabb {
            min: Point::new(c.x - r, c.y - r, c.z - r),
            max: Point::new(c.x + r, c.y + r, c.z + r),
        }
    }

    fn inscribed(&self) -> Aabb {
        // Largest cube inside a ball has half-side r / sqrt(3).
        let h = self.radius / 3f64.sqrt();
        let c = self.center;
        Aabb {
            min: Point::new(c.x - h, c.y - h, c.z - h),
            max: Point::new(c.x + h, c.y + h, c.z + h),
        }
    }

    fn contains_point(&self, p: Point, max_inclusive: bool) -> bool {
        let dx = p.x - self.center.x;
        let dy = p.y - self.center.y;
        let dz = p.z - self.center.z;
        let d2 = dx * dx + dy * dy + dz * dz;
        let r2 = self.radius * self.radius;
        if max_inclusive { d2 <= r2 } else { d2 < r2 }
    }

    fn shape(&self) -> Shape {
        Shape::Ball {
            center: self.center,
            radius: self.radius,
        }
    }
}

/// A vertical cylinder.
#[derive(Clone, Debug, PartialEq)]
pub struct Cylinder {
    domain: DomainId,
    center_x: f64,
    center_z: f64,
    radius: f64,
    min_y: f64,
    max_y: f64,
}

impl Cylinder {
    pub fn new(
        domain: DomainId,
        center_x: f64,
        center_z: f64,
        radius: f64,
        min_y: f64,
        max_y: f64,
    ) -> SpatialResult<Self> {
        require_positive("cylinder", "radius", radius)?;
        require_positive("cylinder", "height", max_y - min_y)?;
        Ok(Self {
            domain,
            center_x,
            center_z,
            radius,
            min_y,
            max_y,
        })
    }

    fn horizontal_box(&self, half: f64) -> Aabb {
        Aabb {
            min: Point::new(self.center_x - half, self.min_y, self.center_z - half),
            max: Point::new(self.center_x + half, self.max_y, self.center_z + half),
        }
    }
}

impl Volume for Cylinder {
    fn domain(&self) -> DomainId {
        self.domain
    }

    fn circumscribed(&self) -> Aabb {
        self.horizontal_box(self.radius)
    }

    fn inscribed(&self) -> Aabb {
        self.horizontal_box(self.radius / 2f64.sqrt())
    }

    fn contains_point(&self, p: Point, max_inclusive: bool) -> bool {
        let dx = p.x - self.center_x;
        let dz = p.z - self.center_z;
        let d2 = dx * dx + dz * dz;
        let r2 = self.radius * self.radius;
        if p.y < self.min_y {
            return false;
        }
        if max_inclusive {
            d2 <= r2 && p.y <= self.max_y
        } else {
            d2 < r2 && p.y < self.max_y
        }
    }

    fn shape(&self) -> Shape {
        Shape::Column {
            center_x: self.center_x,
            center_z: self.center_z,
            radius: self.radius,
            min_y: self.min_y,
            max_y: self.max_y,
        }
    }
}

/// Every column of a domain between two heights.
#[derive(Clone, Debug, PartialEq)]
pub struct Slab {
    domain: DomainId,
    min_y: f64,
    max_y: f64,
}

impl Slab {
    pub fn new(domain: DomainId, min_y: f64, max_y: f64) -> SpatialResult<Self> {
        require_positive("slab", "height", max_y - min_y)?;
        Ok(Self {
            domain,
            min_y,
            max_y,
        })
    }

    fn bounds(&self) -> Aabb {
        Aabb {
            min: Point::new(f64::NEG_INFINITY, self.min_y, f64::NEG_INFINITY),
            max: Point::new(f64::INFINITY, self.max_y, f64::INFINITY),
        }
    }
}

impl Volume for Slab {
    fn domain(&self) -> DomainId {
        self.domain
    }

    fn circumscribed(&self) -> Aabb {
        self.bounds()
    }

    fn inscribed(&self) -> Aabb {
        self.bounds()
    }

    fn contains_point(&self, p: Point, max_inclusive: bool) -> bool {
        p.y >= self.min_y && if max_inclusive { p.y <= self.max_y } else { p.y < self.max_y }
    }

    fn contains_box(&self, b: &Aabb, max_inclusive: bool) -> bool {
        self.bounds().contains_box(b, max_inclusive)
    }

    fn shape(&self) -> Shape {
        Shape::Box(self.bounds())
    }
}
