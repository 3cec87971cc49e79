//! Sampled properties of the containment index.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zone_spatial::{
    Aabb, BlockPos, CachedIndex, Cuboid, Cylinder, DomainId, Point, Slab, SpatialIndex, Sphere,
    Volume, VolumeId,
};

// ============================================================================
// Fixtures
// ============================================================================

const D: DomainId = DomainId(0);

fn random_volume(rng: &mut StdRng) -> Arc<dyn Volume> {
    let x = rng.gen_range(-200.0..200.0);
    let y = rng.gen_range(0.0..128.0);
    let z = rng.gen_range(-200.0..200.0);
    match rng.gen_range(0..3) {
        0 => {
            let w = rng.gen_range(1.0..60.0);
            let h = rng.gen_range(1.0..40.0);
            let l = rng.gen_range(1.0..60.0);
            Arc::new(Cuboid::new(D, Point::new(x, y, z), Point::new(x + w, y + h, z + l)).unwrap())
        }
        1 => Arc::new(Sphere::new(D, Point::new(x, y, z), rng.gen_range(1.0..30.0)).unwrap()),
        _ => Arc::new(
            Cylinder::new(D, x, z, rng.gen_range(1.0..30.0), y, y + rng.gen_range(1.0..40.0))
                .unwrap(),
        ),
    }
}

/// Build an index with a mix of scattered shapes plus a clump of identical
/// boxes that forces the unchanged-level cutoff.
fn populated(seed: u64) -> (SpatialIndex<u32>, Vec<(Arc<dyn Volume>, u32)>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut index = SpatialIndex::new();
    let mut stored = Vec::new();

    for owner in 0..120 {
        let volume = random_volume(&mut rng);
        index.put(Arc::clone(&volume), owner, false);
        stored.push((volume, owner));
    }
    for owner in 120..140 {
        let volume: Arc<dyn Volume> = Arc::new(
            Cuboid::new(D, Point::new(10.0, 10.0, 10.0), Point::new(20.0, 20.0, 20.0)).unwrap(),
        );
        index.put(Arc::clone(&volume), owner, false);
        stored.push((volume, owner));
    }
    let slab: Arc<dyn Volume> = Arc::new(Slab::new(D, -64.0, -32.0).unwrap());
    index.put(Arc::clone(&slab), 140, false);
    stored.push((slab, 140));

    index.construct();
    (index, stored)
}

fn sample_point(rng: &mut StdRng) -> Point {
    Point::new(
        rng.gen_range(-260.0..260.0),
        rng.gen_range(-70.0..180.0),
        rng.gen_range(-260.0..260.0),
    )
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_matches_brute_force() {
    let (index, stored) = populated(7);
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..4000 {
        let p = sample_point(&mut rng);
        let found = index.containing_point(p, false).unwrap();

        for (volume, owner) in &stored {
            assert_eq!(
                volume.contains_point(p, false),
                found.contains(owner),
                "owner {owner} disagrees at {p:?}"
            );
        }
    }
}

/// Block-aligned corners, so query boxes often share faces with stored boxes.
fn grid_box(rng: &mut StdRng, max_extent: i32) -> (Point, Point) {
    let x = rng.gen_range(-100..100);
    let y = rng.gen_range(0..64);
    let z = rng.gen_range(-100..100);
    let far = Point::new(
        f64::from(x + rng.gen_range(1..=max_extent)),
        f64::from(y + rng.gen_range(1..=max_extent)),
        f64::from(z + rng.gen_range(1..=max_extent)),
    );
    (Point::new(f64::from(x), f64::from(y), f64::from(z)), far)
}

#[test]
fn test_box_queries_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut index = SpatialIndex::new();
    let mut stored: Vec<(Arc<dyn Volume>, u32)> = Vec::new();
    for owner in 0..200 {
        let (a, b) = grid_box(&mut rng, 40);
        let volume: Arc<dyn Volume> = Arc::new(Cuboid::new(D, a, b).unwrap());
        index.put(Arc::clone(&volume), owner, false);
        stored.push((volume, owner));
    }
    index.construct();

    for round in 0..5000 {
        let query = if round % 5 == 0 {
            // Exactly a stored box: every max face sits on a boundary.
            stored[round % stored.len()].0.circumscribed()
        } else {
            let (a, b) = grid_box(&mut rng, 12);
            Aabb::from_corners(a, b)
        };

        for max_inclusive in [false, true] {
            let found = index.containing_box(&query, max_inclusive).unwrap();
            for (volume, owner) in &stored {
                assert_eq!(
                    volume.contains_box(&query, max_inclusive),
                    found.contains(owner),
                    "owner {owner} disagrees on {query:?} (max_inclusive = {max_inclusive})"
                );
            }
        }
    }
}

#[test]
fn test_points_inside_each_volume_are_found() {
    let (index, stored) = populated(11);
    let mut rng = StdRng::seed_from_u64(5);

    for (volume, owner) in &stored {
        let inner = volume.inscribed();
        for _ in 0..20 {
            let lo = inner.min;
            let hi = inner.max;
            // Slabs are unbounded in X/Z; sample them near the origin.
            let p = Point::new(
                if lo.x.is_finite() { rng.gen_range(lo.x..hi.x) } else { rng.gen_range(-500.0..500.0) },
                rng.gen_range(lo.y..hi.y),
                if lo.z.is_finite() { rng.gen_range(lo.z..hi.z) } else { rng.gen_range(-500.0..500.0) },
            );
            if volume.contains_point(p, false) {
                assert!(index.containing_point(p, false).unwrap().contains(owner));
            }
        }
    }
}

#[test]
fn test_construct_is_idempotent() {
    let (mut index, _) = populated(3);
    let mut rng = StdRng::seed_from_u64(17);
    let points: Vec<Point> = (0..500).map(|_| sample_point(&mut rng)).collect();

    let before: Vec<_> = points
        .iter()
        .map(|&p| index.containing_point(p, false).unwrap())
        .collect();
    index.construct();
    let after: Vec<_> = points
        .iter()
        .map(|&p| index.containing_point(p, false).unwrap())
        .collect();

    assert_eq!(before, after);
}

#[test]
fn test_put_then_remove_round_trip() {
    let (mut index, _) = populated(21);
    let mut rng = StdRng::seed_from_u64(23);
    let points: Vec<Point> = (0..500).map(|_| sample_point(&mut rng)).collect();
    let before: Vec<_> = points
        .iter()
        .map(|&p| index.containing_point(p, false).unwrap())
        .collect();

    let big: Arc<dyn Volume> = Arc::new(
        Cuboid::new(D, Point::new(-100.0, 0.0, -100.0), Point::new(100.0, 100.0, 100.0)).unwrap(),
    );
    let id: VolumeId = index.put(big, 999, true);
    assert!(
        index
            .containing_point(Point::new(0.0, 50.0, 0.0), false)
            .unwrap()
            .contains(&999)
    );
    index.remove(id, true).unwrap();

    let after: Vec<_> = points
        .iter()
        .map(|&p| index.containing_point(p, false).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn test_cache_never_serves_pre_mutation_results() {
    let mut cached: CachedIndex<u32> = CachedIndex::new(1024);
    let positions: Vec<BlockPos> = (0..16).map(|i| BlockPos::new(i, 5, i)).collect();

    for &pos in &positions {
        assert!(cached.containing_block(pos).unwrap().is_empty());
    }

    let zone: Arc<dyn Volume> = Arc::new(
        Cuboid::from_blocks(D, BlockPos::new(0, 0, 0), BlockPos::new(15, 15, 15)).unwrap(),
    );
    let id = cached.put(zone, 1, true);
    for &pos in &positions {
        assert!(cached.containing_block(pos).unwrap().contains(&1));
    }

    cached.remove(id, true).unwrap();
    for &pos in &positions {
        assert!(cached.containing_block(pos).unwrap().is_empty());
    }
}
