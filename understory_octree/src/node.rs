// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree nodes.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::geometry::{Aabb, Scalar};
use crate::sync::{Blocking, Lock, SyncStrategy};

/// Lifecycle state of a node during an optimization round.
///
/// Outside of [`Octree::optimize`](crate::Octree::optimize) every node is
/// [`NodeState::Default`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum NodeState {
    Default = 0,
    NoAction = 1,
    SplitNode = 2,
    ClearBranch = 3,
    EmptyNode = 4,
}

impl NodeState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::NoAction,
            2 => Self::SplitNode,
            3 => Self::ClearBranch,
            4 => Self::EmptyNode,
            _ => Self::Default,
        }
    }
}

bitflags::bitflags! {
    /// Structural role of a node, used to filter introspection.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeKinds: u8 {
        /// The root node (level 1).
        const ROOT     = 0b0000_0001;
        /// A node with children that is not the root.
        const INTERNAL = 0b0000_0010;
        /// A node without children. The root can be a leaf too.
        const LEAF     = 0b0000_0100;
        /// A leaf holding no objects.
        const EMPTY    = 0b0000_1000;
    }
}

/// One cell of an [`Octree`](crate::Octree).
///
/// A node is either a leaf holding a collection of objects, or has exactly
/// `2^K` children covering its box orthant by orthant. Only leaves ever hold
/// objects once the tree is built; internal collections stay empty.
pub struct Node<O, T, const K: usize, S: SyncStrategy = Blocking> {
    aabb: Aabb<T, K>,
    level: usize,
    state: AtomicU8,
    children: Vec<Self>,
    objects: S::Lock<Vec<O>>,
}

impl<O, T: fmt::Debug, const K: usize, S: SyncStrategy> fmt::Debug for Node<O, T, K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("aabb", &self.aabb)
            .field("level", &self.level)
            .field("state", &self.state())
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

/// Number of children of an internal node in `K` dimensions, if it fits.
pub(crate) fn fanout(dimension: usize) -> Option<usize> {
    u32::try_from(dimension)
        .ok()
        .and_then(|shift| 1_usize.checked_shl(shift))
}

impl<O, T: Scalar, const K: usize, S: SyncStrategy> Node<O, T, K, S> {
    /// A leaf with an empty collection.
    pub(crate) fn leaf(aabb: Aabb<T, K>, level: usize) -> Self {
        Self {
            aabb,
            level,
            state: AtomicU8::new(NodeState::Default as u8),
            children: Vec::new(),
            objects: Lock::new(Vec::new()),
        }
    }

    /// A complete subtree `height` levels deep below a node at `level`.
    pub(crate) fn build(aabb: Aabb<T, K>, level: usize, height: usize) -> Self {
        let mut node = Self::leaf(aabb, level);
        if height > 0 {
            node.children = (0..1_usize << K)
                .map(|slot| Self::build(aabb.orthant(slot), level + 1, height - 1))
                .collect();
        }
        node
    }

    /// The `2^K` empty leaves a split of this node produces.
    pub(crate) fn split_children(&self) -> Vec<Self> {
        (0..1_usize << K)
            .map(|slot| Self::leaf(self.aabb.orthant(slot), self.level + 1))
            .collect()
    }

    /// The region this node covers.
    pub fn aabb(&self) -> &Aabb<T, K> {
        &self.aabb
    }
}

impl<O, T, const K: usize, S: SyncStrategy> Node<O, T, K, S> {
    /// Depth of this node. The root is level 1.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Child nodes in orthant order; empty for a leaf.
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether this is the root of its tree.
    pub fn is_root(&self) -> bool {
        self.level == 1
    }

    /// Whether this node has children and is not the root.
    pub fn is_internal(&self) -> bool {
        !self.is_root() && !self.is_leaf()
    }

    /// Whether this node is a leaf with nothing in it.
    pub fn is_empty_leaf(&self) -> bool {
        self.is_leaf() && self.is_empty()
    }

    /// Number of objects stored directly in this node.
    pub fn len(&self) -> usize {
        self.with_objects(|objects| objects.len())
    }

    /// Whether this node stores no objects directly.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the objects stored in this node, taken under its lock.
    pub fn objects(&self) -> Vec<O>
    where
        O: Clone,
    {
        self.with_objects(|objects| objects.clone())
    }

    /// Structural role of this node.
    pub fn kinds(&self) -> NodeKinds {
        let mut kinds = NodeKinds::empty();
        if self.is_root() {
            kinds |= NodeKinds::ROOT;
        }
        if self.is_internal() {
            kinds |= NodeKinds::INTERNAL;
        }
        if self.is_leaf() {
            kinds |= NodeKinds::LEAF;
            if self.is_empty() {
                kinds |= NodeKinds::EMPTY;
            }
        }
        kinds
    }

    pub(crate) fn with_objects<R>(&self, f: impl FnOnce(&mut Vec<O>) -> R) -> R {
        self.objects.with(f)
    }

    pub(crate) fn push(&self, object: O) {
        self.with_objects(|objects| objects.push(object));
    }

    pub(crate) fn sort(&self)
    where
        O: Ord,
    {
        self.with_objects(|objects| objects.sort_unstable());
    }

    /// The collection, without locking.
    pub(crate) fn objects_mut(&mut self) -> &mut Vec<O> {
        self.objects.get_mut()
    }

    /// Move the collection out without locking.
    pub(crate) fn take_objects(&mut self) -> Vec<O> {
        core::mem::take(self.objects_mut())
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Self] {
        &mut self.children
    }

    pub(crate) fn set_children(&mut self, children: Vec<Self>) {
        self.children = children;
    }

    /// Drop the whole subtree below this node, turning it into a leaf.
    pub(crate) fn clear_children(&mut self) {
        self.children = Vec::new();
    }

    pub(crate) fn state(&self) -> NodeState {
        NodeState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn mark(&self, state: NodeState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn swap_state(&self, state: NodeState) -> NodeState {
        NodeState::from_raw(self.state.swap(state as u8, Ordering::AcqRel))
    }

    /// Take ownership of this node for the current round.
    ///
    /// Moves `Default` to `NoAction`; only one caller can win.
    pub(crate) fn claim(&self) -> bool {
        self.state
            .compare_exchange(
                NodeState::Default as u8,
                NodeState::NoAction as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Bytes owned by this node alone, excluding children.
    pub(crate) fn footprint(&self) -> usize {
        size_of::<Self>()
            + self.with_objects(|objects| objects.capacity() * size_of::<O>())
    }
}
