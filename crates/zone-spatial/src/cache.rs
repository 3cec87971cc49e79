//! Memoization of block queries over one index.
//!
//! # Coherence
//!
//! [`CachedIndex`] only hands out `&mut` access to the index through `put`,
//! `remove` and `construct`, and each of those clears the cache. Since a
//! reader needs `&self`, no query can run while a mutation is in progress,
//! so a stale result can never be stored after the clear.
//!
//! # Eviction
//!
//! Entries are evicted in insertion order by [`QueryCache::trim`], which a
//! maintenance task calls on a fixed interval. Between trims the cache may
//! grow past its soft capacity.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::{BlockPos, OwnerSet, SpatialIndex, SpatialResult, Volume, VolumeId};

struct CacheInner<O> {
    entries: HashMap<BlockPos, Arc<OwnerSet<O>>, FxBuildHasher>,
    /// Insertion order of `entries` keys.
    history: VecDeque<BlockPos>,
}

/// Bounded FIFO cache of block query results.
///
/// A single lock guards the map and its history; hits only take the read
/// side.
pub struct QueryCache<O> {
    inner: RwLock<CacheInner<O>>,
    capacity: usize,
}

impl<O: Copy + Eq + Hash> QueryCache<O> {
    /// Create a cache that trims down to `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: HashMap::default(),
                history: VecDeque::new(),
            }),
            capacity,
        }
    }

    /// Soft capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached result for a position, if any.
    #[must_use]
    pub fn get(&self, pos: BlockPos) -> Option<Arc<OwnerSet<O>>> {
        self.inner.read().entries.get(&pos).cloned()
    }

    /// Answer from the cache, or query `index` and remember the result.
    pub fn get_or_query(
        &self,
        index: &SpatialIndex<O>,
        pos: BlockPos,
    ) -> SpatialResult<Arc<OwnerSet<O>>> {
        if let Some(hit) = self.get(pos) {
            return Ok(hit);
        }

        let owners = Arc::new(index.containing_point(pos.to_point(), false)?);

        let mut inner = self.inner.write();
        // Another reader may have filled the slot while we were querying.
        if let Some(existing) = inner.entries.get(&pos) {
            return Ok(Arc::clone(existing));
        }
        inner.entries.insert(pos, Arc::clone(&owners));
        inner.history.push_back(pos);
        Ok(owners)
    }

    /// Evict the oldest entries until the cache fits its capacity.
    ///
    /// Returns the number of evicted entries.
    pub fn trim(&self) -> usize {
        let mut inner = self.inner.write();
        let mut evicted = 0;
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.history.pop_front() else {
                break;
            };
            if inner.entries.remove(&oldest).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(evicted, remaining = inner.entries.len(), "trimmed query cache");
        }
        evicted
    }

    /// Forget everything.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.history.clear();
    }
}

/// A [`SpatialIndex`] paired with its [`QueryCache`].
pub struct CachedIndex<O> {
    index: SpatialIndex<O>,
    cache: QueryCache<O>,
}

impl<O: Copy + Eq + Hash> CachedIndex<O> {
    /// Create an index and construct it empty, so it answers queries at once.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut index = SpatialIndex::new();
        index.construct();
        Self {
            index,
            cache: QueryCache::new(capacity),
        }
    }

    /// Read access to the index.
    #[must_use]
    pub fn index(&self) -> &SpatialIndex<O> {
        &self.index
    }

    /// Read access to the cache.
    #[must_use]
    pub fn cache(&self) -> &QueryCache<O> {
        &self.cache
    }

    /// Store a volume and invalidate the cache.
    pub fn put(&mut self, volume: Arc<dyn Volume>, owner: O, rebuild: bool) -> VolumeId {
        let id = self.index.put(volume, owner, rebuild);
        self.invalidate();
        id
    }

    /// Remove a volume and invalidate the cache.
    pub fn remove(&mut self, id: VolumeId, rebuild: bool) -> SpatialResult<(Arc<dyn Volume>, O)> {
        let removed = self.index.remove(id, rebuild)?;
        self.invalidate();
        Ok(removed)
    }

    /// Rebuild the tree after batched edits.
    pub fn construct(&mut self) {
        self.index.construct();
        self.invalidate();
    }

    /// Owners containing the block, answered through the cache.
    pub fn containing_block(&self, pos: BlockPos) -> SpatialResult<Arc<OwnerSet<O>>> {
        self.cache.get_or_query(&self.index, pos)
    }

    fn invalidate(&self) {
        if !self.cache.is_empty() {
            debug!(dropped = self.cache.len(), "cleared query cache");
        }
        self.cache.clear();
    }
}
