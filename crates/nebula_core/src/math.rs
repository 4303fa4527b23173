//! Planar math and numeric tolerances shared by the planners.
//!
//! Positions are in mkm (10^6 km). ETAs may be `f64::INFINITY`, which is a
//! normal value meaning "unreachable" and is never compared without a
//! finiteness guard.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Tolerance for "effectively zero" comparisons and ordering ties.
pub const EPS: f64 = 1e-9;

/// Tolerance for "observable change" (advisor warnings, battle kills).
pub const EPS_CHANGE: f64 = 1e-6;

/// 2D vector in mkm.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Vec2 {
    /// Zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// True when both components are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Clamp to `>= 0`, mapping NaN to zero.
#[inline]
#[must_use]
pub fn non_neg(v: f64) -> f64 {
    if v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Like [`non_neg`] but also maps infinities to zero.
#[inline]
#[must_use]
pub fn finite_non_neg(v: f64) -> f64 {
    if v.is_finite() {
        non_neg(v)
    } else {
        0.0
    }
}

/// `a` is greater than `b` by more than [`EPS`].
#[inline]
#[must_use]
pub fn gt_eps(a: f64, b: f64) -> bool {
    a > b + EPS
}

/// `a` and `b` are within [`EPS`] of each other.
#[inline]
#[must_use]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPS
}

/// Speed in km/s converted to mkm per day.
#[inline]
#[must_use]
pub fn mkm_per_day(speed_km_s: f64, seconds_per_day: f64) -> f64 {
    non_neg(speed_km_s) * non_neg(seconds_per_day) / 1.0e6
}

/// Total order on `f64` that treats values on the same [`EPS`] grid step as equal.
///
/// Used for ordering ties: unlike an `|a - b| <= EPS` test it stays transitive,
/// so it is safe inside `sort_by` and `BinaryHeap`.
#[must_use]
pub fn cmp_eps(a: f64, b: f64) -> Ordering {
    quantize(a).total_cmp(&quantize(b))
}

fn quantize(v: f64) -> f64 {
    if v.is_finite() {
        // `+ 0.0` folds -0.0 into +0.0.
        (v / EPS).round() + 0.0
    } else {
        v
    }
}
