// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Barrier-coordinated rebalancing.
//!
//! A round has three phases, each run by exactly one participant:
//!
//! 1. classify: mark overloaded leaves for splitting, empty leaves as empty,
//!    and branches holding nothing at all for collapse;
//! 2. restructure: collapse and split, cascading splits into children that
//!    are still overloaded;
//! 3. settle: reset every node and sort the leaves.
//!
//! Every participant arrives at all three barriers before doing anything, so
//! no participant leaves a phase before the phase body has finished.
//!
//! Inserts may land between classification and restructuring. A branch is
//! only collapsed if it still holds nothing once the structure is locked.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::OctreeConfig;
use crate::geometry::Scalar;
use crate::node::{Node, NodeState};
use crate::sync::{Arrival, CountDownBarrier, SyncStrategy};
use crate::tree::{Octree, OctreeObject, route};

/// One optimization phase: a rendezvous plus a "someone is running it" flag.
#[derive(Debug, Default)]
pub(crate) struct Phase {
    barrier: CountDownBarrier,
    claimed: AtomicBool,
}

impl Phase {
    /// Win the right to run this phase's body for the current round.
    fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn reset(&self) {
        self.claimed.store(false, Ordering::Release);
    }
}

/// Tunables the phases need, copied out of the config.
#[derive(Copy, Clone, Debug)]
struct Limits {
    split_threshold: usize,
    max_height: usize,
    cascade_ratio: f64,
}

impl Limits {
    fn new(config: &OctreeConfig, dimension: usize) -> Self {
        Self {
            split_threshold: config.split_threshold,
            max_height: config.max_height,
            cascade_ratio: ((1_usize << dimension) as f64).sqrt(),
        }
    }
}

const PRE: usize = 0;
const MAIN: usize = 1;
const POST: usize = 2;

/// One caller's tickets for a round.
///
/// Departing the post barrier last releases the phase flags. If a phase body
/// unwinds, dropping the round departs the remaining barriers in order and
/// the last caller out resets node states and flags, so the next round
/// starts clean.
struct Round<'a, O, T, const K: usize, S: SyncStrategy> {
    tree: &'a Octree<O, T, K, S>,
    tickets: [Option<Arrival<'a>>; 3],
}

impl<'a, O, T, const K: usize, S: SyncStrategy> Round<'a, O, T, K, S> {
    fn arrive(tree: &'a Octree<O, T, K, S>) -> Self {
        Self {
            tree,
            tickets: [
                Some(tree.pre.barrier.arrive()),
                Some(tree.main.barrier.arrive()),
                Some(tree.post.barrier.arrive()),
            ],
        }
    }

    fn depart(&mut self, phase: usize) {
        let Some(ticket) = self.tickets[phase].take() else {
            return;
        };
        let tree = self.tree;
        if phase == POST {
            ticket.depart_and(|| tree.release_phases());
        } else {
            ticket.depart();
        }
    }
}

impl<O, T, const K: usize, S: SyncStrategy> Drop for Round<'_, O, T, K, S> {
    fn drop(&mut self) {
        let Some(post) = self.tickets[POST].take() else {
            return;
        };
        self.depart(PRE);
        self.depart(MAIN);
        let tree = self.tree;
        post.depart_and(|| {
            reset_states(&*tree.root.read());
            tree.release_phases();
        });
    }
}

impl<O, T, const K: usize, S: SyncStrategy> Octree<O, T, K, S> {
    fn release_phases(&self) {
        self.pre.reset();
        self.main.reset();
        self.post.reset();
    }
}

impl<O: OctreeObject<T, K>, T: Scalar, const K: usize, S: SyncStrategy> Octree<O, T, K, S> {
    /// Rebalance the tree.
    ///
    /// Leaves holding more than the split threshold are split (down to the
    /// maximum height), branches holding no objects anywhere are collapsed
    /// into single leaves, and every leaf is sorted.
    ///
    /// Safe to call from several threads at once: callers rendezvous and the
    /// work of each phase is done by one of them. Inserts and queries issued
    /// during the restructure phase wait for it to finish.
    pub fn optimize(&self) {
        let limits = Limits::new(&self.config, K);
        let mut round = Round::arrive(self);

        if self.pre.claim() {
            let root = self.root.read();
            classify(&*root, &limits);
            tracing::debug!("octree optimize: classified");
        }
        round.depart(PRE);

        if self.main.claim() {
            let mut root = self.root.write();
            restructure(&mut *root, &limits);
            tracing::debug!("octree optimize: restructured");
        }
        round.depart(MAIN);

        if self.post.claim() {
            settle(&*self.root.read());
            tracing::debug!("octree optimize: settled");
        }
        round.depart(POST);

        self.optimized.store(true, Ordering::Release);
    }
}

/// Phase 1. Marks leaves bottom-up, then branches whose children are all
/// collapsible.
fn classify<O, T, const K: usize, S>(node: &Node<O, T, K, S>, limits: &Limits)
where
    S: SyncStrategy,
{
    if node.is_leaf() {
        if node.claim() {
            let len = node.len();
            if len > limits.split_threshold && node.level() < limits.max_height {
                node.mark(NodeState::SplitNode);
            } else if len == 0 {
                node.mark(NodeState::EmptyNode);
            }
        }
        return;
    }

    for child in node.children() {
        classify(child, limits);
    }
    let collapsible = node
        .children()
        .iter()
        .all(|child| matches!(child.state(), NodeState::ClearBranch | NodeState::EmptyNode));
    if collapsible {
        node.mark(NodeState::ClearBranch);
    }
}

/// Phase 2. Collapses `ClearBranch` nodes and splits `SplitNode` leaves.
fn restructure<O, T, const K: usize, S>(node: &mut Node<O, T, K, S>, limits: &Limits)
where
    O: OctreeObject<T, K>,
    T: Scalar,
    S: SyncStrategy,
{
    if node.state() == NodeState::Default {
        for child in node.children_mut() {
            restructure(child, limits);
        }
        return;
    }

    match node.swap_state(NodeState::NoAction) {
        NodeState::ClearBranch if holds_nothing(node) => {
            tracing::trace!(level = node.level(), "collapsing empty branch");
            node.clear_children();
        }
        NodeState::ClearBranch => {
            tracing::trace!(level = node.level(), "branch filled since classification");
            for child in node.children_mut() {
                restructure(child, limits);
            }
        }
        NodeState::SplitNode => split(node, limits),
        _ => {}
    }
}

/// Give a leaf `2^K` children and move its objects into them.
fn split<O, T, const K: usize, S>(node: &mut Node<O, T, K, S>, limits: &Limits)
where
    O: OctreeObject<T, K>,
    T: Scalar,
    S: SyncStrategy,
{
    // The leaf keeps its objects until every child is filled.
    let children = node.split_children();
    for object in node.objects_mut().iter() {
        for child in &children {
            route(child, object);
        }
    }
    let before = node.take_objects().len();
    node.set_children(children);
    tracing::trace!(level = node.level(), objects = before, "splitting leaf");

    for child in node.children_mut() {
        let after = child.len();
        let shrank_enough = before as f64 > limits.cascade_ratio * after as f64;
        if shrank_enough
            && after > limits.split_threshold
            && child.level() < limits.max_height
        {
            child.mark(NodeState::SplitNode);
        } else {
            child.mark(NodeState::NoAction);
        }
        restructure(child, limits);
    }
}

/// Whether no leaf below `node` holds anything.
fn holds_nothing<O, T, const K: usize, S: SyncStrategy>(node: &Node<O, T, K, S>) -> bool {
    if node.is_leaf() {
        node.is_empty()
    } else {
        node.children().iter().all(holds_nothing)
    }
}

/// Put every node back to `Default` without touching collections.
fn reset_states<O, T, const K: usize, S: SyncStrategy>(node: &Node<O, T, K, S>) {
    node.mark(NodeState::Default);
    for child in node.children() {
        reset_states(child);
    }
}

/// Phase 3. Resets every node and sorts the leaves that took part.
fn settle<O, T, const K: usize, S>(node: &Node<O, T, K, S>)
where
    O: Ord,
    S: SyncStrategy,
{
    let prior = node.swap_state(NodeState::Default);
    if node.is_leaf() {
        if prior == NodeState::NoAction {
            node.sort();
        }
    } else {
        for child in node.children() {
            settle(child);
        }
    }
}
