// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.
//!
//! Everything here is a pure function of immutable inputs. Distances are
//! returned squared so no square roots are ever taken.

use core::cmp::Ordering;
use core::fmt::Debug;
use core::ops::{Add, Mul, Sub};

/// A query point: one coordinate per axis.
pub type Point<T, const K: usize> = [T; K];

/// Numeric scalar abstraction for K-dimensional boxes.
///
/// This trait provides the handful of operations needed for containment and
/// distance tests plus box bisection. Floats are assumed to be free of NaNs;
/// comparisons that involve one evaluate to `false`.
pub trait Scalar:
    Copy
    + PartialOrd
    + Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Zero value for the scalar type.
    fn zero() -> Self;

    /// Largest finite value. Used as "unbounded" for radii and empty boxes.
    fn max_value() -> Self;

    /// Negation of [`Scalar::max_value`].
    fn lowest() -> Self;

    /// Absolute value.
    fn abs(v: Self) -> Self;

    /// Midpoint between a and b (used for orthant bisection).
    fn mid(a: Self, b: Self) -> Self;
}

impl Scalar for f32 {
    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn max_value() -> Self {
        Self::MAX
    }

    #[inline]
    fn lowest() -> Self {
        -Self::MAX
    }

    #[inline]
    fn abs(v: Self) -> Self {
        v.abs()
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }
}

impl Scalar for f64 {
    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn max_value() -> Self {
        Self::MAX
    }

    #[inline]
    fn lowest() -> Self {
        -Self::MAX
    }

    #[inline]
    fn abs(v: Self) -> Self {
        v.abs()
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }
}

/// Axis-aligned bounding box in K dimensions.
///
/// Bounds are closed: a point lying exactly on a face is inside.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb<T, const K: usize> {
    /// Low bound per axis.
    pub min: [T; K],
    /// High bound per axis.
    pub max: [T; K],
}

impl<T, const K: usize> Aabb<T, K> {
    /// Create a new box from its low and high corners.
    pub const fn new(min: [T; K], max: [T; K]) -> Self {
        Self { min, max }
    }
}

impl<T: Scalar, const K: usize> Aabb<T, K> {
    /// The empty box: `min = +MAX`, `max = -MAX` on every axis.
    ///
    /// It contains no point and intersects nothing.
    pub fn empty() -> Self {
        Self {
            min: [T::max_value(); K],
            max: [T::lowest(); K],
        }
    }

    /// Return true if the box is inverted on any axis. Assumes no NaN.
    pub fn is_empty(&self) -> bool {
        (0..K).any(|axis| lt(self.max[axis], self.min[axis]))
    }

    /// First axis on which `min <= max` does not hold, if any.
    ///
    /// Unlike [`Aabb::is_empty`] this also rejects bounds that do not compare
    /// (NaN).
    pub(crate) fn first_malformed_axis(&self) -> Option<usize> {
        (0..K).find(|&axis| !le(self.min[axis], self.max[axis]))
    }

    /// Center point of the box.
    pub fn center(&self) -> Point<T, K> {
        core::array::from_fn(|axis| T::mid(self.min[axis], self.max[axis]))
    }

    /// Whether this box contains the point.
    pub fn contains_point(&self, point: &Point<T, K>) -> bool {
        (0..K).all(|axis| le(self.min[axis], point[axis]) && le(point[axis], self.max[axis]))
    }

    /// Whether two boxes overlap. Touching faces count as overlap.
    pub fn intersects(&self, other: &Self) -> bool {
        (0..K).all(|axis| {
            !(lt(other.max[axis], self.min[axis]) || lt(self.max[axis], other.min[axis]))
        })
    }

    /// Whether the box and the sphere overlap.
    pub fn intersects_sphere(&self, sphere: &Sphere<T, K>) -> bool {
        le(self.shortest_distance_sq(&sphere.center), sphere.radius_sq)
    }

    /// Squared distance from `point` to the nearest point of the box.
    ///
    /// Zero when the point is inside.
    pub fn shortest_distance_sq(&self, point: &Point<T, K>) -> T {
        let mut distance = T::zero();
        for axis in 0..K {
            let p = point[axis];
            if lt(p, self.min[axis]) || lt(self.max[axis], p) {
                let d = min_t(T::abs(p - self.min[axis]), T::abs(p - self.max[axis]));
                distance = distance + d * d;
            }
        }
        distance
    }

    /// Squared distance from `point` to the farthest corner of the box.
    pub fn longest_distance_sq(&self, point: &Point<T, K>) -> T {
        let mut distance = T::zero();
        for axis in 0..K {
            let p = point[axis];
            let d = max_t(T::abs(p - self.min[axis]), T::abs(p - self.max[axis]));
            distance = distance + d * d;
        }
        distance
    }

    /// The child box in orthant `slot`.
    ///
    /// Every axis is split at its midpoint; bit `a` of `slot` selects the
    /// upper half on axis `a`. Slot 0 is the all-low corner.
    pub fn orthant(&self, slot: usize) -> Self {
        let mut min = self.min;
        let mut max = self.max;
        for axis in 0..K {
            let mid = T::mid(self.min[axis], self.max[axis]);
            if (slot >> axis) & 1 == 1 {
                min[axis] = mid;
            } else {
                max[axis] = mid;
            }
        }
        Self { min, max }
    }
}

/// Bounding sphere: center plus squared radius.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sphere<T, const K: usize> {
    /// Center of the sphere.
    pub center: Point<T, K>,
    /// Squared radius. Never negative.
    pub radius_sq: T,
}

impl<T, const K: usize> Sphere<T, K> {
    /// Create a sphere from its center and squared radius.
    pub const fn new(center: Point<T, K>, radius_sq: T) -> Self {
        Self { center, radius_sq }
    }
}

impl<T: Scalar, const K: usize> Sphere<T, K> {
    /// A sphere around `center` whose radius is the largest representable value.
    pub fn unbounded(center: Point<T, K>) -> Self {
        Self {
            center,
            radius_sq: T::max_value(),
        }
    }

    /// Whether the point lies inside or on the sphere.
    pub fn contains_point(&self, point: &Point<T, K>) -> bool {
        let mut distance = T::zero();
        for axis in 0..K {
            let d = point[axis] - self.center[axis];
            distance = distance + d * d;
        }
        le(distance, self.radius_sq)
    }

    /// Whether the sphere and the box overlap.
    pub fn intersects_aabb(&self, aabb: &Aabb<T, K>) -> bool {
        aabb.intersects_sphere(self)
    }
}

impl<T: Scalar, const K: usize> Default for Sphere<T, K> {
    fn default() -> Self {
        Self::unbounded([T::zero(); K])
    }
}

#[cfg(feature = "kurbo")]
impl From<kurbo::Rect> for Aabb<f64, 2> {
    fn from(rect: kurbo::Rect) -> Self {
        let rect = rect.abs();
        Self::new([rect.x0, rect.y0], [rect.x1, rect.y1])
    }
}

/// Convert a Kurbo point into a 2D query point.
#[cfg(feature = "kurbo")]
pub fn point_from_kurbo(point: kurbo::Point) -> Point<f64, 2> {
    [point.x, point.y]
}

pub(crate) fn min_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => b,
        _ => a,
    }
}

pub(crate) fn max_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => b,
        _ => a,
    }
}

pub(crate) fn le<T: PartialOrd>(a: T, b: T) -> bool {
    a.partial_cmp(&b)
        .map(|o| o != Ordering::Greater)
        .unwrap_or(false)
}

pub(crate) fn lt<T: PartialOrd>(a: T, b: T) -> bool {
    a.partial_cmp(&b)
        .map(|o| o == Ordering::Less)
        .unwrap_or(false)
}
