//! Zone spatial indexing.
//!
//! Maps a point or box in a domain to the owners of every volume containing
//! it. Volumes are approximated by axis-aligned boxes for tree descent and
//! checked exactly at the leaves, so queries never miss a true container and
//! never report a false one.
//!
//! # Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CachedIndex                                                │
//! │    - QueryCache: block position → owners, FIFO trimmed      │
//! │    - cleared on every put / remove / construct              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  SpatialIndex                                               │
//! │    - arena: VolumeId → (Volume, owner)                      │
//! │    - X/Z BSP tree over circumscribed boxes                  │
//! │    - exact containment test at the leaf                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod cache;
mod error;
mod geometry;
mod index;
mod tree;
mod volume;

pub use cache::{CachedIndex, QueryCache};
pub use error::{SpatialError, SpatialResult};
pub use geometry::{Aabb, Axis, BlockPos, Point};
pub use index::{OwnerSet, SpatialIndex, VolumeId};
pub use volume::{Cuboid, Cylinder, DomainId, Shape, Slab, Sphere, Volume};
