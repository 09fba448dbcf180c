// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multithreaded tests for `understory_octree`.
//!
//! Threads share one tree by reference through `std::thread::scope`. These
//! check that concurrent inserts lose nothing, that concurrent optimize calls
//! rendezvous instead of deadlocking, and that queries stay usable while a
//! round is restructuring.

use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use understory_octree::{
    Aabb, Blocking, Octree, OctreeConfig, OctreeObject, Spinning, SyncStrategy,
};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Sample {
    id: u32,
    // Fixed-point coordinates keep the type `Ord`.
    at: [i32; 3],
}

const SCALE: f64 = 1_048_576.0;

impl Sample {
    fn point(&self) -> [f64; 3] {
        self.at.map(|c| f64::from(c) / SCALE)
    }
}

impl OctreeObject<f64, 3> for Sample {
    fn overlaps(&self, region: &Aabb<f64, 3>) -> bool {
        region.contains_point(&self.point())
    }
}

/// Samples with odd coordinates over a 2^20 denominator. Split planes are
/// multiples of 2^-8 at the deepest level, so no sample lies on one.
fn samples(seed: u64, first_id: u32, count: u32) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (first_id..first_id + count)
        .map(|id| Sample {
            id,
            at: [(); 3].map(|()| rng.random_range(-524_288..524_288) * 2 + 1),
        })
        .collect()
}

fn tree<S: SyncStrategy>() -> Octree<Sample, f64, 3, S> {
    let config = OctreeConfig::default().with_initial_height(1);
    Octree::with_config(Aabb::new([-1.0; 3], [1.0; 3]), config).unwrap()
}

fn assert_settled<S: SyncStrategy>(tree: &Octree<Sample, f64, 3, S>) {
    let config = *tree.config();
    tree.visit(|node| {
        if node.is_leaf() {
            let objects = node.objects();
            assert!(objects.is_sorted(), "unsorted leaf at level {}", node.level());
            assert!(
                objects.len() <= config.split_threshold || node.level() == config.max_height,
                "overloaded leaf at level {}",
                node.level()
            );
        }
    });
}

#[test]
fn concurrent_inserts_lose_nothing() {
    const THREADS: u32 = 8;
    const PER_THREAD: u32 = 500;
    let tree = tree::<Blocking>();
    thread::scope(|s| {
        for t in 0..THREADS {
            let tree = &tree;
            s.spawn(move || {
                for sample in samples(u64::from(t), t * PER_THREAD, PER_THREAD) {
                    tree.insert(sample);
                }
            });
        }
    });
    assert_eq!(tree.object_count(), (THREADS * PER_THREAD) as usize);
    tree.optimize();
    assert_eq!(tree.object_count(), (THREADS * PER_THREAD) as usize);
    assert_settled(&tree);
}

fn insert_then_optimize_everywhere<S: SyncStrategy>()
where
    Octree<Sample, f64, 3, S>: Sync,
{
    const THREADS: u32 = 6;
    const PER_THREAD: u32 = 400;
    let tree = tree::<S>();
    thread::scope(|s| {
        for t in 0..THREADS {
            let tree = &tree;
            s.spawn(move || {
                tree.insert_many(samples(100 + u64::from(t), t * PER_THREAD, PER_THREAD));
                tree.optimize();
            });
        }
    });
    assert!(tree.is_optimized());
    assert_eq!(tree.object_count(), (THREADS * PER_THREAD) as usize);

    // A thread may have joined a round after classification; one more
    // round from a single caller settles whatever it missed.
    tree.optimize();
    assert_settled(&tree);
    let all = tree.find_if(|_| true);
    assert_eq!(all.len(), (THREADS * PER_THREAD) as usize);
    assert!(all.is_sorted());
}

#[test]
fn concurrent_optimize_rounds_complete() {
    insert_then_optimize_everywhere::<Blocking>();
}

#[test]
fn concurrent_optimize_rounds_complete_with_spin_locks() {
    insert_then_optimize_everywhere::<Spinning>();
}

#[test]
fn inserts_racing_optimize_rounds_are_kept() {
    const INSERTERS: u32 = 4;
    const PER_THREAD: u32 = 500;
    // Deep enough that most of the grid is empty and gets collapsed.
    let config = OctreeConfig::default().with_initial_height(4);
    let tree: Octree<Sample, f64, 3> =
        Octree::with_config(Aabb::new([-1.0; 3], [1.0; 3]), config).unwrap();
    thread::scope(|s| {
        let tree = &tree;
        s.spawn(move || {
            for _ in 0..20 {
                tree.optimize();
            }
        });
        for t in 0..INSERTERS {
            s.spawn(move || {
                for sample in samples(200 + u64::from(t), t * PER_THREAD, PER_THREAD) {
                    tree.insert(sample);
                }
            });
        }
    });
    assert_eq!(tree.object_count(), (INSERTERS * PER_THREAD) as usize);
    tree.optimize();
    assert_eq!(tree.object_count(), (INSERTERS * PER_THREAD) as usize);
    assert_settled(&tree);
}

#[test]
fn idle_optimize_callers_rendezvous() {
    let tree = tree::<Blocking>();
    tree.insert_many(samples(42, 0, 300));
    thread::scope(|s| {
        for _ in 0..8 {
            let tree = &tree;
            s.spawn(move || {
                for _ in 0..5 {
                    tree.optimize();
                }
            });
        }
    });
    assert!(tree.is_optimized());
    assert_eq!(tree.object_count(), 300);
    assert_settled(&tree);
}

#[test]
fn queries_run_alongside_optimize() {
    let tree = tree::<Blocking>();
    let seed = samples(7, 0, 2000);
    tree.insert_many(seed.iter().cloned());
    thread::scope(|s| {
        let tree = &tree;
        s.spawn(move || tree.optimize());
        for q in 0..4_u64 {
            s.spawn(move || {
                for probe in samples(1000 + q, 0, 50) {
                    let point = probe.point();
                    // Whatever state the tree is in, results are whole
                    // leaves from inside the tree.
                    for hit in tree.find_nearest_leaves(&point) {
                        assert!(hit.id < 2000);
                    }
                    let exact = tree.find_exact(&point);
                    assert!(exact.iter().all(|hit| hit.id < 2000));
                }
            });
        }
    });
    assert!(tree.is_optimized());
    assert_eq!(tree.object_count(), seed.len());
    assert_settled(&tree);
}
