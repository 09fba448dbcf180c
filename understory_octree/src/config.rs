// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Octree configuration.

/// Shape and rebalancing parameters of an [`Octree`](crate::Octree).
///
/// The defaults reproduce the fixed heuristic: build four levels below the
/// root up front, split leaves holding more than 50 objects, and never grow
/// deeper than 10 levels (the root counts as level 1).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OctreeConfig {
    /// Levels of children built eagerly below the root. 0 means the root
    /// starts out as a single leaf.
    pub initial_height: usize,

    /// A leaf holding more objects than this is split during optimization.
    pub split_threshold: usize,

    /// Leaves at this level are never split. The root is level 1.
    pub max_height: usize,
}

impl OctreeConfig {
    /// Default eager build height.
    pub const DEFAULT_INITIAL_HEIGHT: usize = 4;
    /// Default split threshold.
    pub const DEFAULT_SPLIT_THRESHOLD: usize = 50;
    /// Default maximum height.
    pub const DEFAULT_MAX_HEIGHT: usize = 10;

    /// Set the eager build height.
    #[must_use]
    pub const fn with_initial_height(mut self, initial_height: usize) -> Self {
        self.initial_height = initial_height;
        self
    }

    /// Set the split threshold.
    #[must_use]
    pub const fn with_split_threshold(mut self, split_threshold: usize) -> Self {
        self.split_threshold = split_threshold;
        self
    }

    /// Set the maximum height.
    #[must_use]
    pub const fn with_max_height(mut self, max_height: usize) -> Self {
        self.max_height = max_height;
        self
    }
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            initial_height: Self::DEFAULT_INITIAL_HEIGHT,
            split_threshold: Self::DEFAULT_SPLIT_THRESHOLD,
            max_height: Self::DEFAULT_MAX_HEIGHT,
        }
    }
}
