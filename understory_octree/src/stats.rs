// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only introspection.

use crate::node::{Node, NodeKinds};
use crate::sync::SyncStrategy;
use crate::tree::Octree;

/// Snapshot of an octree's shape, taken in one traversal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OctreeStats {
    /// Number of axes.
    pub dimension: usize,
    /// Total number of nodes, the root included.
    pub nodes: usize,
    /// Nodes without children.
    pub leaves: usize,
    /// Nodes with children, excluding the root.
    pub internal: usize,
    /// Leaves holding nothing.
    pub empty_leaves: usize,
    /// Level of the shallowest leaf.
    pub min_height: usize,
    /// Level of the deepest leaf.
    pub max_height: usize,
    /// Stored entries. An object held by several leaves counts once per leaf.
    pub objects: usize,
    /// Largest leaf collection.
    pub max_leaf_len: usize,
    /// Smallest leaf collection.
    pub min_leaf_len: usize,
    /// Approximate heap and inline bytes used by nodes and collections.
    pub memory_usage: usize,
    /// Whether the tree was optimized with no insert since.
    pub optimized: bool,
}

impl<O, T, const K: usize, S: SyncStrategy> Octree<O, T, K, S> {
    /// Fold `f` over every node in depth-first pre-order.
    pub fn fold<A>(&self, init: A, mut f: impl FnMut(A, &Node<O, T, K, S>) -> A) -> A {
        fn walk<A, O, T, const K: usize, S: SyncStrategy>(
            node: &Node<O, T, K, S>,
            acc: A,
            f: &mut impl FnMut(A, &Node<O, T, K, S>) -> A,
        ) -> A {
            let acc = f(acc, node);
            node.children()
                .iter()
                .fold(acc, |acc, child| walk(child, acc, &mut *f))
        }
        walk(&*self.root.read(), init, &mut f)
    }

    /// Call `f` on every node in depth-first pre-order.
    pub fn visit(&self, mut f: impl FnMut(&Node<O, T, K, S>)) {
        self.fold((), |(), node| f(node));
    }

    /// Total number of nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.fold(0, |n, _| n + 1)
    }

    /// Number of nodes having every role in `kinds`.
    ///
    /// `count(NodeKinds::LEAF | NodeKinds::EMPTY)` counts empty leaves.
    pub fn count(&self, kinds: NodeKinds) -> usize {
        self.fold(0, |n, node| n + usize::from(node.kinds().contains(kinds)))
    }

    /// Level of the shallowest leaf. The root is level 1.
    pub fn min_height(&self) -> usize {
        self.fold(usize::MAX, |h, node| {
            if node.is_leaf() { h.min(node.level()) } else { h }
        })
    }

    /// Level of the deepest leaf. The root is level 1.
    pub fn max_height(&self) -> usize {
        self.fold(0, |h, node| h.max(node.level()))
    }

    /// Approximate bytes used by nodes and their collections.
    pub fn memory_usage(&self) -> usize {
        self.fold(0, |bytes, node| bytes + node.footprint())
    }

    /// Stored entries, counting an object once per leaf holding it.
    pub fn object_count(&self) -> usize {
        self.fold(0, |n, node| n + node.len())
    }

    /// Largest leaf collection.
    pub fn max_leaf_len(&self) -> usize {
        self.fold(0, |n, node| n.max(node.len()))
    }

    /// Smallest leaf collection.
    pub fn min_leaf_len(&self) -> usize {
        self.fold(usize::MAX, |n, node| {
            if node.is_leaf() { n.min(node.len()) } else { n }
        })
    }

    /// Whether no leaf holds anything.
    pub fn is_empty(&self) -> bool {
        self.object_count() == 0
    }

    /// Gather every aggregate in one pass.
    pub fn stats(&self) -> OctreeStats {
        let mut stats = OctreeStats {
            dimension: K,
            min_height: usize::MAX,
            min_leaf_len: usize::MAX,
            optimized: self.is_optimized(),
            ..OctreeStats::default()
        };
        self.visit(|node| {
            let len = node.len();
            stats.nodes += 1;
            stats.objects += len;
            stats.memory_usage += node.footprint();
            stats.max_height = stats.max_height.max(node.level());
            stats.max_leaf_len = stats.max_leaf_len.max(len);
            if node.is_internal() {
                stats.internal += 1;
            }
            if node.is_leaf() {
                stats.leaves += 1;
                stats.empty_leaves += usize::from(len == 0);
                stats.min_height = stats.min_height.min(node.level());
                stats.min_leaf_len = stats.min_leaf_len.min(len);
            }
        });
        stats
    }
}
