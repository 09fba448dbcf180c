// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_octree --heading-base-level=0

//! Understory Octree: a concurrent K-dimensional spatial tree.
//!
//! An [`Octree`] divides a root box into `2^K` orthants per level (a binary
//! tree for `K = 1`, a quadtree for `K = 2`, an octree for `K = 3`, and so on)
//! and stores user objects in the leaves they overlap.
//!
//! - Insert objects from any number of threads at once; every operation takes `&self`.
//! - Rebalance with [`Octree::optimize`]: overloaded leaves split, empty branches
//!   collapse, and leaves are sorted. Several threads may call it together; they
//!   rendezvous on barriers and each phase is done once.
//! - Query by containing leaf ([`Octree::find_exact`]), closest leaf
//!   ([`Octree::find_nearest`]), every leaf that may hold the closest object
//!   ([`Octree::find_nearest_leaves`]), or any predicate over nodes ([`Octree::find_if`]).
//! - Inspect the shape with [`Octree::stats`] and friends.
//!
//! Stored objects implement [`OctreeObject`]: an overlap test against a box
//! (which decides the leaves an object lands in) plus `Ord` and `Clone`.
//! Queries return copies of whole leaves; filter them for exact hits.
//!
//! # Example
//!
//! ```rust
//! use understory_octree::{Aabb, Octree, OctreeConfig, OctreeObject};
//!
//! #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
//! struct Marker {
//!     id: u32,
//!     at: [i32; 3],
//! }
//!
//! impl OctreeObject<f64, 3> for Marker {
//!     fn overlaps(&self, region: &Aabb<f64, 3>) -> bool {
//!         region.contains_point(&self.at.map(f64::from))
//!     }
//! }
//!
//! let config = OctreeConfig::default().with_initial_height(1);
//! let tree: Octree<Marker, f64, 3> =
//!     Octree::with_config(Aabb::new([-8.0; 3], [8.0; 3]), config).unwrap();
//!
//! tree.insert(Marker { id: 1, at: [-3, -3, -3] });
//! tree.insert(Marker { id: 2, at: [5, 5, 5] });
//! tree.optimize();
//!
//! let hits = tree.find_exact(&[-4.0, -4.0, -4.0]);
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].id, 1);
//!
//! // The closest populated leaf to a far-away point.
//! let near = tree.find_nearest(&[20.0, 20.0, 20.0]);
//! assert_eq!(near[0].id, 2);
//! ```
//!
//! Sharing the tree between threads needs nothing more than a reference:
//!
//! ```rust
//! use understory_octree::{Aabb, Octree, OctreeObject};
//!
//! #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
//! struct Tick(u16);
//!
//! impl OctreeObject<f32, 1> for Tick {
//!     fn overlaps(&self, region: &Aabb<f32, 1>) -> bool {
//!         region.contains_point(&[f32::from(self.0)])
//!     }
//! }
//!
//! let tree: Octree<Tick, f32, 1> = Octree::new(Aabb::new([0.0], [1024.0])).unwrap();
//! std::thread::scope(|s| {
//!     for t in 0..4_u16 {
//!         let tree = &tree;
//!         s.spawn(move || {
//!             tree.insert_many((0..256).map(|i| Tick(t * 256 + i)));
//!             tree.optimize();
//!         });
//!     }
//! });
//! assert!(tree.is_optimized());
//! assert!(tree.object_count() >= 1024);
//! ```
//!
//! ## Locking
//!
//! Each leaf guards its collection with the lock chosen by the tree's
//! [`SyncStrategy`]: [`Blocking`] (the default), [`Spinning`], or
//! [`Unsynchronized`] for single-threaded use.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates. Comparisons
//! involving one evaluate to `false`; construction rejects NaN bounds.

mod config;
mod error;
mod geometry;
mod node;
mod optimize;
mod query;
mod stats;
pub mod sync;
mod tree;

pub use config::OctreeConfig;
pub use error::BuildError;
#[cfg(feature = "kurbo")]
pub use geometry::point_from_kurbo;
pub use geometry::{Aabb, Point, Scalar, Sphere};
pub use node::{Node, NodeKinds};
pub use stats::OctreeStats;
pub use sync::{Blocking, Spinning, SyncStrategy, Unsynchronized};
pub use tree::{Octree, OctreeObject};

/// A tree over two axes (four children per node).
pub type Quadtree<O, T = f64, S = Blocking> = Octree<O, T, 2, S>;

/// A tree over three axes (eight children per node).
pub type Octree3<O, T = f64, S = Blocking> = Octree<O, T, 3, S>;
