//! Binary space partition over circumscribed boxes.
//!
//! Only X and Z are partitioned. Each level rotates through four phases:
//!
//! ```text
//!   depth 0   (X, Min)
//!   depth 1   (Z, Min)
//!   depth 2   (X, Max)
//!   depth 3   (Z, Max)
//!   depth 4   (X, Min)  ...
//! ```
//!
//! At a divider with value `v`:
//!
//! - `Min` phase: the left child holds every box with `min < v`; the right
//!   child holds every box with `max >= v`.
//! - `Max` phase: the left child holds every box with `max > v`; the right
//!   child holds every box with `min <= v`.
//!
//! A box straddling the divider is therefore stored on both sides. Descent
//! never loses a box that could contain the query, and the exact predicate
//! runs at the leaf.

use smallvec::SmallVec;

use crate::{Aabb, Axis, VolumeId};

/// Levels in a row where the right child failed to shrink before the
/// builder gives up and emits a brute-force leaf.
pub const UNCHANGED_LIMIT: u32 = 4;

/// Which face of the box a divider compares against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Min,
    Max,
}

/// A divider's axis and comparison face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phase {
    pub axis: Axis,
    pub bound: Bound,
}

impl Phase {
    /// Phase of the root node.
    pub const FIRST: Self = Self {
        axis: Axis::X,
        bound: Bound::Min,
    };

    /// The phase of the next level down.
    #[must_use]
    pub const fn next(self) -> Self {
        let (axis, bound) = match (self.axis, self.bound) {
            (Axis::X, Bound::Min) => (Axis::Z, Bound::Min),
            (Axis::Z, Bound::Min) => (Axis::X, Bound::Max),
            (Axis::X, Bound::Max) => (Axis::Z, Bound::Max),
            (Axis::Z, Bound::Max) => (Axis::X, Bound::Min),
        };
        Self { axis, bound }
    }

    /// The sort key of a box in this phase.
    fn key(self, b: &Aabb) -> f64 {
        match self.bound {
            Bound::Min => b.min.along(self.axis),
            Bound::Max => b.max.along(self.axis),
        }
    }

    /// Whether a box belongs in the right child of a divider at `value`.
    fn reaches_right(self, b: &Aabb, value: f64) -> bool {
        match self.bound {
            Bound::Min => b.max.along(self.axis) >= value,
            Bound::Max => b.min.along(self.axis) <= value,
        }
    }

    /// Whether a query spanning `[lo, hi]` on this axis descends left.
    fn goes_left(self, lo: f64, hi: f64, value: f64) -> bool {
        match self.bound {
            Bound::Min => lo < value,
            Bound::Max => hi > value,
        }
    }
}

/// A volume as seen by the builder.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Candidate {
    pub id: VolumeId,
    pub bounds: Aabb,
}

#[derive(Debug)]
pub(crate) enum Node {
    /// Brute-force bucket, checked with the exact predicate.
    Leaf(SmallVec<[VolumeId; 4]>),
    Divider {
        phase: Phase,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    /// Build a tree over the candidates.
    pub(crate) fn build(candidates: Vec<Candidate>) -> Self {
        Self::build_at(candidates, Phase::FIRST, 0)
    }

    fn build_at(mut candidates: Vec<Candidate>, phase: Phase, unchanged: u32) -> Self {
        if candidates.len() <= 1 || unchanged >= UNCHANGED_LIMIT {
            return Self::Leaf(candidates.into_iter().map(|c| c.id).collect());
        }

        match phase.bound {
            Bound::Min => candidates
                .sort_by(|a, b| phase.key(&a.bounds).total_cmp(&phase.key(&b.bounds))),
            Bound::Max => candidates
                .sort_by(|a, b| phase.key(&b.bounds).total_cmp(&phase.key(&a.bounds))),
        }

        let divider = divider_index(&candidates, phase);
        let value = phase.key(&candidates[divider].bounds);

        let left = candidates[..divider].to_vec();
        let before = candidates.len();
        candidates.retain(|c| phase.reaches_right(&c.bounds, value));
        let changed = candidates.len() < before;

        let next = phase.next();
        let right_unchanged = if changed { 0 } else { unchanged + 1 };

        Self::Divider {
            phase,
            value,
            left: Box::new(Self::build_at(left, next, 0)),
            right: Box::new(Self::build_at(candidates, next, right_unchanged)),
        }
    }

    /// Walk to the single leaf that may hold containers of `[lo, hi]`.
    pub(crate) fn leaf_for(&self, lo: crate::Point, hi: crate::Point) -> &[VolumeId] {
        let mut node = self;
        loop {
            match node {
                Self::Leaf(ids) => return ids,
                Self::Divider {
                    phase,
                    value,
                    left,
                    right,
                } => {
                    node = if phase.goes_left(lo.along(phase.axis), hi.along(phase.axis), *value)
                    {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Node count and height.
    pub(crate) fn stats(&self) -> (usize, usize) {
        match self {
            Self::Leaf(_) => (1, 1),
            Self::Divider { left, right, .. } => {
                let (ln, lh) = left.stats();
                let (rn, rh) = right.stats();
                (ln + rn + 1, lh.max(rh) + 1)
            }
        }
    }
}

/// Pick `len / 2`, moved so no key equal to the divider's sits before it.
///
/// Shifts down first; if that reaches the front, shifts up to the first key
/// that differs from the smallest. Returns 0 when every key is equal.
fn divider_index(sorted: &[Candidate], phase: Phase) -> usize {
    let key = |i: usize| phase.key(&sorted[i].bounds);
    let same = |a: usize, b: usize| key(a).total_cmp(&key(b)).is_eq();

    let mut down = sorted.len() / 2;
    while down > 0 && same(down - 1, down) {
        down -= 1;
    }
    if down > 0 {
        return down;
    }

    (1..sorted.len()).find(|&i| !same(0, i)).unwrap_or(0)
}
