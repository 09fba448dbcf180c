// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Octree points.
//!
//! Fill a 3D tree with a lattice of points from several threads, optimize it
//! from all of them at once, then query it concurrently.
//!
//! Run:
//! - `cargo run -p understory_demos --example octree_points`

use std::thread;

use understory_octree::{Aabb, Node, Octree, OctreeObject};

const THREADS: usize = 8;
const STEPS: i32 = 10;

/// A lattice point, ordered by its integer coordinates.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct LatticePoint([i32; 3]);

impl LatticePoint {
    fn position(&self) -> [f64; 3] {
        self.0.map(|i| 2.0 * f64::from(i) / f64::from(STEPS) - 1.0)
    }
}

impl OctreeObject<f64, 3> for LatticePoint {
    fn overlaps(&self, region: &Aabb<f64, 3>) -> bool {
        region.contains_point(&self.position())
    }
}

fn main() {
    let mut points = Vec::new();
    for i in 0..=STEPS {
        for j in 0..=STEPS {
            for k in 0..=STEPS {
                points.push(LatticePoint([i, j, k]));
            }
        }
    }

    let tree: Octree<LatticePoint, f64, 3> =
        Octree::new(Aabb::new([-1.0; 3], [1.0; 3])).expect("valid bounds");

    // Fill from several threads; each inserts its own share.
    thread::scope(|s| {
        for part in points.chunks(points.len().div_ceil(THREADS)) {
            let tree = &tree;
            s.spawn(move || tree.insert_many(part.iter().cloned()));
        }
    });
    println!("after fill:\n{:#?}", tree.stats());

    // Every thread asks for an optimization; they share one round.
    thread::scope(|s| {
        for _ in 0..THREADS {
            let tree = &tree;
            s.spawn(move || tree.optimize());
        }
    });
    println!("after optimize:\n{:#?}", tree.stats());

    // Query from several threads.
    let origin = [0.0; 3];
    let inner = |node: &Node<LatticePoint, f64, 3>| {
        node.aabb().intersects(&Aabb::new([-0.5; 3], [0.5; 3]))
    };
    thread::scope(|s| {
        for t in 0..THREADS {
            let tree = &tree;
            s.spawn(move || {
                let exact = tree.find_exact(&origin).len();
                let nearest = tree.find_nearest(&origin).len();
                let nearest_leaves = tree.find_nearest_leaves(&origin).len();
                let inside = tree.find_if(inner).len();
                println!(
                    "thread {t}: exact {exact}, nearest {nearest}, \
                     nearest leaves {nearest_leaves}, inner cube {inside}"
                );
            });
        }
    });
}
