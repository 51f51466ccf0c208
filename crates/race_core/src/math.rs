//! Float math utilities for the simulation.
//!
//! The arena runs on `f32` with [`glam::Vec2`]. Determinism within one build
//! comes from fixed iteration order, not from fixed-point arithmetic; every
//! value entering the simulation from configuration passes through
//! [`finite_or`] so NaN never reaches the grid bucketing arithmetic.

use std::f32::consts::{PI, TAU};

pub use glam::Vec2;

/// Smallest radius a racer may have.
pub const MIN_RADIUS: f32 = 0.5;

/// Tolerance for treating a length as zero.
pub const EPSILON: f32 = 1e-6;

/// Return `value` if finite, otherwise `fallback`.
#[inline]
#[must_use]
pub fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Return `value` if both components are finite, otherwise `fallback`.
#[inline]
#[must_use]
pub fn finite_vec_or(value: Vec2, fallback: Vec2) -> Vec2 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Sanitize a configured radius: non-finite or too small becomes [`MIN_RADIUS`].
#[inline]
#[must_use]
pub fn sanitize_radius(radius: f32) -> f32 {
    finite_or(radius, MIN_RADIUS).max(MIN_RADIUS)
}

/// Normalize an angle to `[-π, π)`.
#[inline]
#[must_use]
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Signed smallest difference `a - b` between two angles, in `[-π, π)`.
#[inline]
#[must_use]
pub fn angle_delta(a: f32, b: f32) -> f32 {
    normalize_angle(a - b)
}

/// Convert polar `(r, theta)` around `origin` to cartesian.
#[inline]
#[must_use]
pub fn polar_to_cartesian(origin: Vec2, r: f32, theta: f32) -> Vec2 {
    origin + Vec2::from_angle(theta) * r
}

/// Convert cartesian `point` to polar `(r, theta)` around `origin`.
#[inline]
#[must_use]
pub fn cartesian_to_polar(origin: Vec2, point: Vec2) -> (f32, f32) {
    let d = point - origin;
    (d.length(), d.y.atan2(d.x))
}

/// Reflect `v` about the line with normal `n`: `v - 2 (v·n̂) n̂`.
///
/// `n` does not need to be unit length. A zero normal returns `v` unchanged.
#[inline]
#[must_use]
pub fn reflect(v: Vec2, n: Vec2) -> Vec2 {
    let n = n.normalize_or_zero();
    v - 2.0 * v.dot(n) * n
}
