// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial queries.
//!
//! Every query returns the objects of whole leaves, copied out under each
//! leaf's lock: callers that need exact hits filter the result themselves.
//! When the tree is optimized every leaf is sorted and multi-leaf results
//! come back sorted too; otherwise leaf contents are concatenated in slot
//! order.

use core::cmp::Ordering;
use core::slice;

use crate::geometry::{Aabb, Point, Scalar, Sphere, lt, min_t};
use crate::node::Node;
use crate::sync::SyncStrategy;
use crate::tree::{Octree, OctreeObject};

impl<O: OctreeObject<T, K>, T: Scalar, const K: usize, S: SyncStrategy> Octree<O, T, K, S> {
    /// Objects of the leaf containing `point`.
    ///
    /// Empty leaves are skipped, so for a point on a split plane the first
    /// non-empty leaf touching it (in slot order) wins. Returns nothing if
    /// the point is outside the tree or every leaf around it is empty.
    pub fn find_exact(&self, point: &Point<T, K>) -> Vec<O> {
        let root = self.root.read();
        let optimized = self.is_optimized();
        let mut candidates = slice::from_ref(&*root);
        loop {
            let Some(node) = candidates
                .iter()
                .find(|&node| !is_vacant(node, optimized) && node.aabb().contains_point(point))
            else {
                return Vec::new();
            };
            if node.is_leaf() {
                return node.objects();
            }
            candidates = node.children();
        }
    }

    /// Objects of the non-empty leaf closest to `point`.
    pub fn find_nearest(&self, point: &Point<T, K>) -> Vec<O> {
        self.find_nearest_within(point, T::max_value())
    }

    /// Objects of the non-empty leaf closest to `point`, if it lies strictly
    /// within `radius_sq` (a squared distance).
    ///
    /// The search is greedy: at each level it descends into the closest
    /// non-empty child only. A zero radius is the same as
    /// [`find_exact`](Self::find_exact).
    pub fn find_nearest_within(&self, point: &Point<T, K>, radius_sq: T) -> Vec<O> {
        if radius_sq.partial_cmp(&T::zero()) == Some(Ordering::Equal) {
            return self.find_exact(point);
        }
        let root = self.root.read();
        let optimized = self.is_optimized();
        let mut candidates = slice::from_ref(&*root);
        loop {
            let mut closest: Option<(&Node<O, T, K, S>, T)> = None;
            for node in candidates {
                if is_vacant(node, optimized) {
                    continue;
                }
                let distance = node.aabb().shortest_distance_sq(point);
                if closest.is_none_or(|(_, best)| lt(distance, best)) {
                    closest = Some((node, distance));
                }
            }
            let Some((node, distance)) = closest else {
                return Vec::new();
            };
            if !lt(distance, radius_sq) {
                return Vec::new();
            }
            if node.is_leaf() {
                return node.objects();
            }
            candidates = node.children();
        }
    }

    /// Objects of every leaf that may hold the object nearest to `point`.
    pub fn find_nearest_leaves(&self, point: &Point<T, K>) -> Vec<O> {
        self.find_nearest_leaves_within(point, T::max_value())
    }

    /// Objects of every leaf that may hold the object nearest to `point`,
    /// searching no farther than `radius_sq` (a squared distance).
    ///
    /// Refines level by level: each round the search radius shrinks to the
    /// smallest farthest-corner distance of any non-empty candidate, since
    /// that box alone is guaranteed to hold something within it. Candidates
    /// intersecting the shrunk sphere are kept and internal ones replaced by
    /// their children, until only leaves remain.
    pub fn find_nearest_leaves_within(&self, point: &Point<T, K>, radius_sq: T) -> Vec<O> {
        let root = self.root.read();
        let optimized = self.is_optimized();
        let mut radius_sq = radius_sq;
        let mut frontier = vec![&*root];
        loop {
            frontier.retain(|&node| !is_vacant(node, optimized));
            radius_sq = frontier
                .iter()
                .map(|node| node.aabb().longest_distance_sq(point))
                .fold(radius_sq, min_t);
            let sphere = Sphere::new(*point, radius_sq);
            let (next, settled) = refine(&frontier, |node| sphere.intersects_aabb(node.aabb()));
            if settled {
                return gather(&next, optimized);
            }
            frontier = next;
        }
    }

    /// Objects of every leaf reached by descending through nodes accepted by
    /// `predicate`.
    ///
    /// The predicate sees internal nodes and leaves alike; rejecting an
    /// internal node prunes its subtree. Empty subtrees are never offered.
    pub fn find_if(&self, mut predicate: impl FnMut(&Node<O, T, K, S>) -> bool) -> Vec<O> {
        let root = self.root.read();
        let optimized = self.is_optimized();
        let mut frontier = vec![&*root];
        loop {
            let (next, settled) = refine(&frontier, |node| {
                !is_vacant(node, optimized) && predicate(node)
            });
            if settled {
                return gather(&next, optimized);
            }
            frontier = next;
        }
    }

    /// Objects of every leaf whose box intersects `region`.
    pub fn find_intersecting(&self, region: &Aabb<T, K>) -> Vec<O> {
        self.find_if(|node| node.aabb().intersects(region))
    }

    /// Objects of every leaf whose box intersects `sphere`.
    pub fn find_in_sphere(&self, sphere: &Sphere<T, K>) -> Vec<O> {
        self.find_if(|node| sphere.intersects_aabb(node.aabb()))
    }
}

/// Whether a subtree holds no objects.
///
/// Collapsed branches are gone after optimization, so an internal node of an
/// optimized tree is assumed to hold something.
fn is_vacant<O, T, const K: usize, S: SyncStrategy>(node: &Node<O, T, K, S>, optimized: bool) -> bool {
    if node.is_leaf() {
        node.is_empty()
    } else {
        !optimized && node.children().iter().all(|child| is_vacant(child, optimized))
    }
}

/// One round of frontier refinement.
///
/// Keeps the nodes accepted by `keep`, replacing kept internal nodes by their
/// children. The flag is set when every kept node was a leaf.
fn refine<'a, O, T, const K: usize, S: SyncStrategy>(
    frontier: &[&'a Node<O, T, K, S>],
    mut keep: impl FnMut(&Node<O, T, K, S>) -> bool,
) -> (Vec<&'a Node<O, T, K, S>>, bool) {
    let mut next = Vec::new();
    let mut settled = true;
    for &node in frontier {
        if !keep(node) {
            continue;
        }
        if node.is_leaf() {
            next.push(node);
        } else {
            settled = false;
            next.extend(node.children());
        }
    }
    (next, settled)
}

/// Collect the objects of `leaves`.
///
/// Leaves of an optimized tree are sorted, so their runs are merged;
/// otherwise they are concatenated in the order given.
fn gather<O: Clone + Ord, T, const K: usize, S: SyncStrategy>(
    leaves: &[&Node<O, T, K, S>],
    optimized: bool,
) -> Vec<O> {
    let runs = leaves.iter().map(|leaf| leaf.objects());
    if optimized {
        merge_runs(runs.collect())
    } else {
        runs.flatten().collect()
    }
}

/// Merge sorted runs pairwise until one is left. Equal items keep the order
/// of their runs.
fn merge_runs<O: Ord>(mut runs: Vec<Vec<O>>) -> Vec<O> {
    while runs.len() > 1 {
        let mut merged = Vec::with_capacity(runs.len().div_ceil(2));
        let mut pairs = runs.into_iter();
        while let Some(left) = pairs.next() {
            merged.push(match pairs.next() {
                Some(right) => merge_two(left, right),
                None => left,
            });
        }
        runs = merged;
    }
    runs.pop().unwrap_or_default()
}

fn merge_two<O: Ord>(left: Vec<O>, right: Vec<O>) -> Vec<O> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let from_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => l <= r,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return out,
        };
        out.extend(if from_left { left.next() } else { right.next() });
    }
}
