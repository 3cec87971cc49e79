//! Containment index over every volume of one domain.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::tree::{Candidate, Node};
use crate::{Aabb, Point, SpatialError, SpatialResult, Volume};

/// Arena id of a volume stored in a [`SpatialIndex`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeId(pub u32);

impl fmt::Debug for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Volume({})", self.0)
    }
}

/// Set of owners returned by queries.
pub type OwnerSet<O> = HashSet<O, FxBuildHasher>;

struct Entry<O> {
    volume: Arc<dyn Volume>,
    owner: O,
}

/// A BSP tree over the circumscribed boxes of stored volumes.
///
/// Tree leaves hold [`VolumeId`]s only; the arena maps ids to the volume and
/// its owner, so a stale tree can never point at a dropped volume.
///
/// # Mutation
///
/// `put` and `remove` take `rebuild` flags. Batch edits should pass `false`
/// and call [`construct`](Self::construct) once afterwards. Until then the
/// tree does not know about new volumes, and removed ids are skipped.
pub struct SpatialIndex<O> {
    entries: HashMap<VolumeId, Entry<O>, FxBuildHasher>,
    next_id: u32,
    root: Option<Node>,
}

impl<O: Copy + Eq + Hash> Default for SpatialIndex<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Copy + Eq + Hash> SpatialIndex<O> {
    /// Create an empty, unconstructed index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::default(),
            next_id: 0,
            root: None,
        }
    }

    /// Number of stored volumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index stores no volumes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `construct()` has run at least once.
    #[must_use]
    pub fn is_constructed(&self) -> bool {
        self.root.is_some()
    }

    /// Store a volume for `owner`.
    pub fn put(&mut self, volume: Arc<dyn Volume>, owner: O, rebuild: bool) -> VolumeId {
        let id = VolumeId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, Entry { volume, owner });
        if rebuild {
            self.construct();
        }
        id
    }

    /// Drop a stored volume, returning it with its owner.
    pub fn remove(&mut self, id: VolumeId, rebuild: bool) -> SpatialResult<(Arc<dyn Volume>, O)> {
        let entry = self
            .entries
            .remove(&id)
            .ok_or(SpatialError::UnknownVolume(id))?;
        if rebuild {
            self.construct();
        }
        Ok((entry.volume, entry.owner))
    }

    /// Rebuild the tree from every stored volume.
    pub fn construct(&mut self) {
        let mut candidates: Vec<Candidate> = self
            .entries
            .iter()
            .map(|(&id, entry)| Candidate {
                id,
                bounds: entry.volume.circumscribed(),
            })
            .collect();
        // Arena iteration order is arbitrary; keep builds reproducible.
        candidates.sort_by_key(|c| c.id);

        let root = Node::build(candidates);
        let (nodes, depth) = root.stats();
        debug!(volumes = self.entries.len(), nodes, depth, "constructed spatial index");
        self.root = Some(root);
    }

    /// Look up a stored volume and its owner.
    #[must_use]
    pub fn get(&self, id: VolumeId) -> Option<(&Arc<dyn Volume>, O)> {
        self.entries.get(&id).map(|e| (&e.volume, e.owner))
    }

    /// Iterate over the volumes stored for `owner`.
    pub fn volumes_of(&self, owner: O) -> impl Iterator<Item = (VolumeId, &Arc<dyn Volume>)> {
        self.entries
            .iter()
            .filter(move |(_, e)| e.owner == owner)
            .map(|(&id, e)| (id, &e.volume))
    }

    fn root(&self) -> SpatialResult<&Node> {
        self.root.as_ref().ok_or(SpatialError::NotConstructed)
    }

    /// Owners with a volume containing `p`.
    pub fn containing_point(&self, p: Point, max_inclusive: bool) -> SpatialResult<OwnerSet<O>> {
        let leaf = self.root()?.leaf_for(p, p);
        Ok(leaf
            .iter()
            .filter_map(|id| self.entries.get(id))
            .filter(|e| e.volume.contains_point(p, max_inclusive))
            .map(|e| e.owner)
            .collect())
    }

    /// Owners with a volume containing all of `b`.
    pub fn containing_box(&self, b: &Aabb, max_inclusive: bool) -> SpatialResult<OwnerSet<O>> {
        let leaf = self.root()?.leaf_for(b.min, b.max);
        Ok(leaf
            .iter()
            .filter_map(|id| self.entries.get(id))
            .filter(|e| e.volume.contains_box(b, max_inclusive))
            .map(|e| e.owner)
            .collect())
    }

    /// Owners containing every corner of the volume's approximation.
    ///
    /// `discriminate = false` tests the inscribed box, `true` the
    /// circumscribed box. The result is the intersection over the corners.
    pub fn containing_volume(
        &self,
        volume: &dyn Volume,
        discriminate: bool,
    ) -> SpatialResult<OwnerSet<O>> {
        let approx = if discriminate {
            volume.circumscribed()
        } else {
            volume.inscribed()
        };

        let mut corners = approx.corners().into_iter();
        let Some(first) = corners.next() else {
            return Ok(OwnerSet::default());
        };
        let mut owners = self.containing_point(first, true)?;
        for corner in corners {
            if owners.is_empty() {
                break;
            }
            let here = self.containing_point(corner, true)?;
            owners.retain(|o| here.contains(o));
        }
        Ok(owners)
    }

    /// Owners whose volumes intersect `volume`. Brute force, not via the tree.
    pub fn intersecting_volume(&self, volume: &dyn Volume) -> OwnerSet<O> {
        self.entries
            .values()
            .filter(|e| e.volume.intersects(volume))
            .map(|e| e.owner)
            .collect()
    }

    /// Other owners with a volume intersecting any volume of `owner`.
    pub fn intersecting_owner(&self, owner: O) -> OwnerSet<O> {
        let mut out = OwnerSet::default();
        for mine in self.entries.values().filter(|e| e.owner == owner) {
            for other in self.entries.values() {
                if other.owner != owner
                    && !out.contains(&other.owner)
                    && mine.volume.intersects(other.volume.as_ref())
                {
                    out.insert(other.owner);
                }
            }
        }
        out
    }
}

impl<O: fmt::Debug> fmt::Debug for SpatialIndex<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("volumes", &self.entries.len())
            .field("constructed", &self.root.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cuboid, DomainId, Sphere};

    const D: DomainId = DomainId(0);

    fn cuboid(a: (f64, f64, f64), b: (f64, f64, f64)) -> Arc<dyn Volume> {
        Arc::new(Cuboid::new(D, Point::new(a.0, a.1, a.2), Point::new(b.0, b.1, b.2)).unwrap())
    }

    #[test]
    fn test_query_before_construct_fails() {
        let mut index: SpatialIndex<u32> = SpatialIndex::new();
        index.put(cuboid((0.0, 0.0, 0.0), (1.0, 1.0, 1.0)), 7, false);

        assert!(matches!(
            index.containing_point(Point::new(0.5, 0.5, 0.5), false),
            Err(SpatialError::NotConstructed)
        ));
    }

    #[test]
    fn test_empty_index_answers_empty() {
        let mut index: SpatialIndex<u32> = SpatialIndex::new();
        index.construct();

        assert!(index.containing_point(Point::default(), true).unwrap().is_empty());
    }

    #[test]
    fn test_overlapping_owners() {
        let mut index = SpatialIndex::new();
        index.put(cuboid((0.0, 0.0, 0.0), (10.0, 10.0, 10.0)), 'a', false);
        index.put(cuboid((5.0, 0.0, 5.0), (15.0, 10.0, 15.0)), 'b', false);
        index.put(
            Arc::new(Sphere::new(D, Point::new(100.0, 5.0, 100.0), 3.0).unwrap()),
            'c',
            false,
        );
        index.construct();

        let both = index.containing_point(Point::new(7.0, 5.0, 7.0), false).unwrap();
        assert_eq!(both.len(), 2);
        assert!(both.contains(&'a') && both.contains(&'b'));

        let sphere = index.containing_point(Point::new(101.0, 5.0, 100.0), false).unwrap();
        assert!(sphere.contains(&'c'));

        // Inside the sphere's box but outside the ball.
        let corner = index.containing_point(Point::new(102.9, 7.9, 102.9), false).unwrap();
        assert!(corner.is_empty());
    }

    #[test]
    fn test_box_containment_respects_max_flag() {
        let mut index = SpatialIndex::new();
        index.put(cuboid((0.0, 0.0, 0.0), (4.0, 4.0, 4.0)), 1u8, true);
        let b = Aabb::from_corners(Point::new(3.0, 3.0, 3.0), Point::new(4.0, 4.0, 4.0));

        assert!(index.containing_box(&b, true).unwrap().contains(&1));
        assert!(index.containing_box(&b, false).unwrap().is_empty());
    }

    #[test]
    fn test_remove_unknown_volume() {
        let mut index: SpatialIndex<u8> = SpatialIndex::new();
        assert!(matches!(
            index.remove(VolumeId(3), true),
            Err(SpatialError::UnknownVolume(VolumeId(3)))
        ));
    }

    #[test]
    fn test_stale_tree_skips_removed_volume() {
        let mut index = SpatialIndex::new();
        let id = index.put(cuboid((0.0, 0.0, 0.0), (4.0, 4.0, 4.0)), 1u8, true);
        index.remove(id, false).unwrap();

        assert!(index.containing_point(Point::new(1.0, 1.0, 1.0), false).unwrap().is_empty());
    }

    #[test]
    fn test_containing_volume_intersects_corners() {
        let mut index = SpatialIndex::new();
        index.put(cuboid((0.0, 0.0, 0.0), (20.0, 20.0, 20.0)), "outer", false);
        index.put(cuboid((0.0, 0.0, 0.0), (6.0, 20.0, 6.0)), "partial", false);
        index.construct();

        let inner = Cuboid::new(D, Point::new(4.0, 4.0, 4.0), Point::new(8.0, 8.0, 8.0)).unwrap();
        let owners = index.containing_volume(&inner, true).unwrap();

        assert!(owners.contains("outer"));
        assert!(!owners.contains("partial"));
    }

    #[test]
    fn test_intersecting_owner_excludes_self() {
        let mut index = SpatialIndex::new();
        index.put(cuboid((0.0, 0.0, 0.0), (10.0, 10.0, 10.0)), 1u8, false);
        index.put(cuboid((20.0, 0.0, 0.0), (30.0, 10.0, 10.0)), 1u8, false);
        index.put(cuboid((25.0, 0.0, 5.0), (35.0, 10.0, 15.0)), 2u8, false);
        index.put(cuboid((50.0, 0.0, 0.0), (60.0, 10.0, 10.0)), 3u8, false);

        let hits = index.intersecting_owner(1);
        assert_eq!(hits.len(), 1);
        assert!(hits.contains(&2));

        let sliver = cuboid((55.0, 0.0, 0.0), (56.0, 1.0, 1.0));
        assert!(index.intersecting_volume(sliver.as_ref()).contains(&3));
    }
}
