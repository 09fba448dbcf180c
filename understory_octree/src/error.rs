// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction errors.

use thiserror::Error;

/// Errors reported when an [`Octree`](crate::Octree) cannot be built.
///
/// Queries and updates never fail; an empty result is an empty `Vec`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The tree was instantiated with `K == 0`.
    #[error("octree dimension must be at least 1")]
    ZeroDimension,

    /// `2^K` children per node do not fit in `usize`.
    #[error("dimension {dimension} needs more than usize::MAX children per node")]
    DimensionTooLarge {
        /// The offending dimension.
        dimension: usize,
    },

    /// The root box has `min > max` (or incomparable bounds) on an axis.
    #[error("root bounds are inverted or not comparable on axis {axis}")]
    InvertedBounds {
        /// First malformed axis.
        axis: usize,
    },

    /// Building the initial grid would need more than `usize::MAX` nodes.
    #[error("initial height {height} needs more than usize::MAX nodes")]
    TooManyNodes {
        /// The requested initial height.
        height: usize,
    },

    /// The maximum height must allow at least the root.
    #[error("maximum height must be at least 1")]
    ZeroMaxHeight,
}
