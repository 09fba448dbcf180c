// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Octree`] type: construction and insertion.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::config::OctreeConfig;
use crate::error::BuildError;
use crate::geometry::{Aabb, Scalar};
use crate::node::{Node, fanout};
use crate::optimize::Phase;
use crate::sync::{Blocking, SyncStrategy};

/// A value that can be stored in an [`Octree`].
///
/// Objects are routed by [`overlaps`](Self::overlaps): an object is stored in
/// every leaf whose box it overlaps, so an object straddling a split plane
/// lands in several leaves. `Ord` orders each leaf after optimization and
/// lets multi-leaf query results be merged; `Clone` hands out copies.
pub trait OctreeObject<T, const K: usize>: Clone + Ord {
    /// Whether this object belongs in `region`.
    ///
    /// Must be monotone: an object that overlaps a box also overlaps every
    /// box containing it. Otherwise inserts may silently drop the object.
    fn overlaps(&self, region: &Aabb<T, K>) -> bool;
}

/// A concurrent K-dimensional octree.
///
/// - `O`: stored object type, see [`OctreeObject`].
/// - `T`: coordinate scalar (`f32` or `f64`).
/// - `K`: dimension. Every internal node has `2^K` children.
/// - `S`: lock used for leaf collections, see [`SyncStrategy`].
///
/// All operations take `&self`; share the tree between threads by reference.
/// Inserts and queries run concurrently with each other. An
/// [`optimize`](Self::optimize) round excludes them only while it
/// restructures.
pub struct Octree<O, T, const K: usize, S: SyncStrategy = Blocking> {
    pub(crate) root: RwLock<Node<O, T, K, S>>,
    pub(crate) config: OctreeConfig,
    pub(crate) bounds: Aabb<T, K>,
    pub(crate) optimized: AtomicBool,
    pub(crate) pre: Phase,
    pub(crate) main: Phase,
    pub(crate) post: Phase,
}

impl<O, T: fmt::Debug, const K: usize, S: SyncStrategy> fmt::Debug for Octree<O, T, K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Octree")
            .field("bounds", &self.bounds)
            .field("config", &self.config)
            .field("optimized", &self.is_optimized())
            .finish_non_exhaustive()
    }
}

impl<O, T: Scalar, const K: usize, S: SyncStrategy> Octree<O, T, K, S> {
    /// Create a tree over `bounds` with the default configuration.
    pub fn new(bounds: Aabb<T, K>) -> Result<Self, BuildError> {
        Self::with_config(bounds, OctreeConfig::default())
    }

    /// Create a tree over `bounds`, eagerly building a complete grid of
    /// `config.initial_height` levels below the root.
    pub fn with_config(bounds: Aabb<T, K>, config: OctreeConfig) -> Result<Self, BuildError> {
        if K == 0 {
            return Err(BuildError::ZeroDimension);
        }
        let fanout = fanout(K).ok_or(BuildError::DimensionTooLarge { dimension: K })?;
        if let Some(axis) = bounds.first_malformed_axis() {
            return Err(BuildError::InvertedBounds { axis });
        }
        if config.max_height == 0 {
            return Err(BuildError::ZeroMaxHeight);
        }
        let height = config.initial_height;
        let nodes = complete_node_count(fanout, height).ok_or(BuildError::TooManyNodes { height })?;

        let root = Node::build(bounds, 1, height);
        tracing::debug!(dimension = K, height, nodes, "built octree");
        Ok(Self {
            root: RwLock::new(root),
            config,
            bounds,
            optimized: AtomicBool::new(false),
            pre: Phase::default(),
            main: Phase::default(),
            post: Phase::default(),
        })
    }
}

impl<O, T, const K: usize, S: SyncStrategy> Octree<O, T, K, S> {
    /// The configuration this tree was built with.
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// The root box.
    pub fn bounds(&self) -> &Aabb<T, K> {
        &self.bounds
    }

    /// Whether the last [`optimize`](Self::optimize) round finished with no
    /// insert since.
    pub fn is_optimized(&self) -> bool {
        self.optimized.load(Ordering::Acquire)
    }
}

impl<O: OctreeObject<T, K>, T: Scalar, const K: usize, S: SyncStrategy> Octree<O, T, K, S> {
    /// Insert `object` into every leaf it overlaps.
    ///
    /// Leaves are never split here; an overloaded leaf waits for the next
    /// [`optimize`](Self::optimize). Objects overlapping nothing inside the
    /// root box are dropped.
    pub fn insert(&self, object: O) {
        self.optimized.store(false, Ordering::Release);
        route(&*self.root.read(), &object);
    }

    /// Insert every object of `objects`.
    ///
    /// The iterator is drained before the tree is locked, so it may itself
    /// use the tree.
    pub fn insert_many(&self, objects: impl IntoIterator<Item = O>) {
        let objects: Vec<O> = objects.into_iter().collect();
        self.optimized.store(false, Ordering::Release);
        let root = self.root.read();
        for object in &objects {
            route(&*root, object);
        }
    }
}

/// Push `object` into every leaf below `node` that it overlaps.
pub(crate) fn route<O, T, const K: usize, S>(node: &Node<O, T, K, S>, object: &O)
where
    O: OctreeObject<T, K>,
    T: Scalar,
    S: SyncStrategy,
{
    if !object.overlaps(node.aabb()) {
        return;
    }
    if node.is_leaf() {
        node.push(object.clone());
    } else {
        for child in node.children() {
            route(child, object);
        }
    }
}

/// Nodes in a complete tree `height` levels below the root.
fn complete_node_count(fanout: usize, height: usize) -> Option<usize> {
    let mut total = 1_usize;
    let mut level = 1_usize;
    for _ in 0..height {
        level = level.checked_mul(fanout)?;
        total = total.checked_add(level)?;
    }
    Some(total)
}
