//! Narrow-phase geometry kernel.
//!
//! Stateless circle-vs-shape tests. Every test returns a [`Contact`] whose
//! normal is unit length and points from the obstacle surface toward the
//! circle centre, with `penetration` being how far the circle must travel
//! along that normal to stop overlapping. Nothing here allocates.

use serde::{Deserialize, Serialize};

use crate::math::{angle_delta, cartesian_to_polar, Vec2, EPSILON};

/// Extra depth reported by arc-band contacts so a resting circle settles just
/// outside the band instead of grazing it every tick.
pub const ARC_REST_BIAS: f32 = 0.5;

/// Result of a narrow-phase test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Whether the shapes overlap.
    pub hit: bool,
    /// Contact point on the obstacle surface.
    pub point: Vec2,
    /// Unit normal from the obstacle surface toward the circle centre.
    pub normal: Vec2,
    /// Overlap depth along `normal`.
    pub penetration: f32,
}

impl Contact {
    /// No contact.
    pub const MISS: Self = Self {
        hit: false,
        point: Vec2::ZERO,
        normal: Vec2::ZERO,
        penetration: 0.0,
    };

    #[inline]
    fn new(point: Vec2, normal: Vec2, penetration: f32) -> Self {
        Self {
            hit: true,
            point,
            normal,
            penetration,
        }
    }

    /// Rotate point and normal by `rotation` (a unit complex number) about `origin`.
    #[inline]
    fn rotated(self, origin: Vec2, rotation: Vec2) -> Self {
        if !self.hit {
            return self;
        }
        Self {
            hit: true,
            point: origin + rotation.rotate(self.point),
            normal: rotation.rotate(self.normal),
            penetration: self.penetration,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec2,
    /// Maximum corner.
    pub max: Vec2,
}

impl Aabb {
    /// Create a box from two corners in any order.
    #[must_use]
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Bounding box of a circle.
    #[must_use]
    pub fn from_circle(center: Vec2, radius: f32) -> Self {
        let r = Vec2::splat(radius);
        Self {
            min: center - r,
            max: center + r,
        }
    }

    /// Grow the box by `amount` on every side.
    #[must_use]
    pub fn inflate(self, amount: f32) -> Self {
        let a = Vec2::splat(amount);
        Self {
            min: self.min - a,
            max: self.max + a,
        }
    }

    /// Both corners are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Squared distance from `p` to the box (zero inside).
    #[must_use]
    pub fn distance_squared_to(&self, p: Vec2) -> f32 {
        let clamped = p.max(self.min).min(self.max);
        p.distance_squared(clamped)
    }
}

/// Nearest point on segment `a`-`b` to `p`, and the distance to it.
///
/// A zero-length segment collapses to `a`.
#[must_use]
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> (Vec2, f32) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < EPSILON {
        return (a, p.distance(a));
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let nearest = a + ab * t;
    (nearest, p.distance(nearest))
}

/// Circle vs axis-aligned rectangle with optionally rounded corners.
///
/// The rectangle spans `min..max`; `corner_radius` rounds its corners, which
/// makes the shape a core rectangle (shrunk by the corner radius) swept by a
/// disc. The core region is tested first, then the corner and edge cases.
#[must_use]
pub fn circle_rect(center: Vec2, radius: f32, min: Vec2, max: Vec2, corner_radius: f32) -> Contact {
    let half = (max - min) * 0.5;
    let corner = corner_radius.clamp(0.0, half.x.min(half.y).max(0.0));
    let core_min = min + Vec2::splat(corner);
    let core_max = max - Vec2::splat(corner);

    let nearest = center.max(core_min).min(core_max);
    let reach = radius + corner;

    if nearest == center {
        // Centre inside the core: leave through the nearest face.
        let faces = [
            (center.x - core_min.x, Vec2::NEG_X),
            (core_max.x - center.x, Vec2::X),
            (center.y - core_min.y, Vec2::NEG_Y),
            (core_max.y - center.y, Vec2::Y),
        ];
        let (depth, normal) = faces
            .iter()
            .copied()
            .fold(faces[0], |best, face| if face.0 < best.0 { face } else { best });
        let point = center + normal * (depth + corner);
        return Contact::new(point, normal, reach + depth);
    }

    let delta = center - nearest;
    let dist_sq = delta.length_squared();
    if dist_sq > reach * reach {
        return Contact::MISS;
    }
    let dist = dist_sq.sqrt();
    let normal = delta.try_normalize().unwrap_or(Vec2::Y);
    Contact::new(nearest + normal * corner, normal, reach - dist)
}

/// Circle vs rotated rectangle.
///
/// The circle centre is moved into the rectangle's local frame, tested with
/// [`circle_rect`], and the contact rotated back to world space.
#[must_use]
pub fn circle_obb(
    center: Vec2,
    radius: f32,
    obb_center: Vec2,
    half_extents: Vec2,
    angle: f32,
    corner_radius: f32,
) -> Contact {
    let rotation = Vec2::from_angle(angle);
    let inverse = Vec2::new(rotation.x, -rotation.y);
    let local = inverse.rotate(center - obb_center);
    circle_rect(local, radius, -half_extents, half_extents, corner_radius)
        .rotated(obb_center, rotation)
}

/// Circle vs capsule (segment `a`-`b` swept by `capsule_radius`).
#[must_use]
pub fn circle_capsule(center: Vec2, radius: f32, a: Vec2, b: Vec2, capsule_radius: f32) -> Contact {
    let (nearest, dist) = point_segment_distance(center, a, b);
    let reach = radius + capsule_radius;
    if dist > reach {
        return Contact::MISS;
    }
    let normal = if dist > EPSILON {
        (center - nearest) / dist
    } else {
        // Centre on the segment: push out sideways.
        (b - a).perp().try_normalize().unwrap_or(Vec2::Y)
    };
    Contact::new(nearest + normal * capsule_radius, normal, reach - dist)
}

/// Circle vs circle. The normal points from `other` toward `center`.
#[must_use]
pub fn circle_circle(center: Vec2, radius: f32, other: Vec2, other_radius: f32) -> Contact {
    let delta = center - other;
    let reach = radius + other_radius;
    let dist_sq = delta.length_squared();
    if dist_sq > reach * reach {
        return Contact::MISS;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist > EPSILON { delta / dist } else { Vec2::X };
    Contact::new(other + normal * other_radius, normal, reach - dist)
}

/// Circle vs semicircle.
///
/// The semicircle is the half of the disc at `sc_center` lying in the
/// direction `facing`. Behind the flat side the test is a zero-width capsule
/// against the diameter; in front it is a circle-circle test against the
/// disc, except when the centre is inside the half-disc and the flat side is
/// the shorter way out.
#[must_use]
pub fn circle_semicircle(
    center: Vec2,
    radius: f32,
    sc_center: Vec2,
    sc_radius: f32,
    facing: f32,
) -> Contact {
    if sc_radius <= EPSILON {
        return Contact::MISS;
    }
    let forward = Vec2::from_angle(facing);
    let rel = center - sc_center;
    let side = rel.dot(forward);

    if side <= 0.0 {
        let across = forward.perp() * sc_radius;
        return circle_capsule(center, radius, sc_center - across, sc_center + across, 0.0);
    }

    let dist = rel.length();
    let curved_exit = sc_radius - dist;
    if curved_exit > 0.0 && side < curved_exit {
        // Inside the half-disc, closer to the diameter than to the arc.
        let point = center - forward * side;
        return Contact::new(point, -forward, radius + side);
    }

    circle_circle(center, radius, sc_center, sc_radius)
}

/// Circle vs arc band: the ring between `inner_radius` and `outer_radius`
/// around `band_center`, limited to `span` radians centred on `angle`.
///
/// Circles whose centre lies outside the angular span never collide.
/// Otherwise the nearer of the inner and outer surfaces is tested, and the
/// reported penetration includes [`ARC_REST_BIAS`].
#[must_use]
pub fn circle_arc_band(
    center: Vec2,
    radius: f32,
    band_center: Vec2,
    inner_radius: f32,
    outer_radius: f32,
    angle: f32,
    span: f32,
) -> Contact {
    let inner = inner_radius.max(0.0);
    if outer_radius <= EPSILON || outer_radius <= inner {
        return Contact::MISS;
    }

    let (dist, theta) = cartesian_to_polar(band_center, center);
    let radial = if dist > EPSILON {
        (center - band_center) / dist
    } else {
        Vec2::from_angle(angle)
    };
    let theta = if dist > EPSILON { theta } else { angle };

    if angle_delta(theta, angle).abs() > span * 0.5 {
        return Contact::MISS;
    }
    if dist > outer_radius + radius || dist < inner - radius {
        return Contact::MISS;
    }

    let (surface, normal, depth) = if (outer_radius - dist).abs() <= (dist - inner).abs() {
        (outer_radius, radial, outer_radius + radius - dist)
    } else {
        (inner, -radial, dist - inner + radius)
    };
    if depth <= 0.0 {
        return Contact::MISS;
    }
    Contact::new(band_center + radial * surface, normal, depth + ARC_REST_BIAS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const TOL: f32 = 1e-5;

    fn assert_near(a: f32, b: f32) {
        assert!((a - b).abs() < TOL, "{a} != {b}");
    }

    #[test]
    fn test_point_segment_distance_interior() {
        let (p, d) = point_segment_distance(Vec2::new(5.0, 3.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert_eq!(p, Vec2::new(5.0, 0.0));
        assert_near(d, 3.0);
    }

    #[test]
    fn test_point_segment_distance_clamps_to_endpoint() {
        let (p, d) = point_segment_distance(Vec2::new(-3.0, 4.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert_eq!(p, Vec2::ZERO);
        assert_near(d, 5.0);
    }

    #[test]
    fn test_point_segment_distance_degenerate() {
        let a = Vec2::new(2.0, 2.0);
        let (p, d) = point_segment_distance(Vec2::new(2.0, 5.0), a, a);
        assert_eq!(p, a);
        assert_near(d, 3.0);
    }

    #[test]
    fn test_circle_rect_edge_penetration() {
        // 4 units above the top edge, radius 10.
        let c = circle_rect(Vec2::new(50.0, 104.0), 10.0, Vec2::ZERO, Vec2::new(100.0, 100.0), 0.0);
        assert!(c.hit);
        assert!((c.penetration - 6.0).abs() < 1e-6);
        assert_eq!(c.normal, Vec2::Y);
        assert_eq!(c.point, Vec2::new(50.0, 100.0));
    }

    #[test]
    fn test_circle_rect_miss() {
        let c = circle_rect(Vec2::new(50.0, 111.0), 10.0, Vec2::ZERO, Vec2::new(100.0, 100.0), 0.0);
        assert!(!c.hit);
    }

    #[test]
    fn test_circle_rect_corner() {
        let c = circle_rect(Vec2::new(103.0, 104.0), 10.0, Vec2::ZERO, Vec2::new(100.0, 100.0), 0.0);
        assert!(c.hit);
        assert_near(c.penetration, 5.0);
        assert_near(c.normal.x, 0.6);
        assert_near(c.normal.y, 0.8);
    }

    #[test]
    fn test_circle_rect_rounded_corner_misses_where_square_hits() {
        let center = Vec2::new(106.0, 106.0);
        let min = Vec2::ZERO;
        let max = Vec2::new(100.0, 100.0);
        assert!(circle_rect(center, 9.0, min, max, 0.0).hit);
        assert!(!circle_rect(center, 9.0, min, max, 20.0).hit);
    }

    #[test]
    fn test_circle_rect_center_inside_uses_nearest_face() {
        let c = circle_rect(Vec2::new(97.0, 50.0), 5.0, Vec2::ZERO, Vec2::new(100.0, 100.0), 0.0);
        assert!(c.hit);
        assert_eq!(c.normal, Vec2::X);
        assert_near(c.penetration, 8.0);
    }

    #[test]
    fn test_circle_obb_matches_rect_when_unrotated() {
        let center = Vec2::new(12.0, 3.0);
        let a = circle_obb(center, 4.0, Vec2::ZERO, Vec2::new(10.0, 5.0), 0.0, 0.0);
        let b = circle_rect(center, 4.0, Vec2::new(-10.0, -5.0), Vec2::new(10.0, 5.0), 0.0);
        assert!(a.hit && b.hit);
        assert_near(a.penetration, b.penetration);
        assert!((a.normal - b.normal).length() < TOL);
    }

    #[test]
    fn test_circle_obb_rotated_normal_in_world_space() {
        // Box rotated 90°: its long axis now runs along Y.
        let c = circle_obb(Vec2::new(7.0, 0.0), 4.0, Vec2::ZERO, Vec2::new(10.0, 5.0), FRAC_PI_2, 0.0);
        assert!(c.hit);
        assert!((c.normal - Vec2::X).length() < 1e-4);
        assert!((c.penetration - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_circle_capsule_scenario_center_on_axis() {
        let c = circle_capsule(
            Vec2::new(100.0, 100.0),
            10.0,
            Vec2::new(0.0, 100.0),
            Vec2::new(200.0, 100.0),
            5.0,
        );
        assert!(c.hit);
        assert!(c.normal.x.abs() < TOL);
        assert_near(c.normal.y.abs(), 1.0);
        // Centre on the axis: full reach is the depth needed to separate.
        assert_near(c.penetration, 15.0);
    }

    #[test]
    fn test_circle_capsule_side_contact() {
        let c = circle_capsule(
            Vec2::new(100.0, 112.0),
            10.0,
            Vec2::new(0.0, 100.0),
            Vec2::new(200.0, 100.0),
            5.0,
        );
        assert!(c.hit);
        assert_eq!(c.normal, Vec2::Y);
        assert_near(c.penetration, 3.0);
    }

    #[test]
    fn test_circle_capsule_zero_length_falls_back() {
        let p = Vec2::new(5.0, 5.0);
        let c = circle_capsule(p, 2.0, p, p, 1.0);
        assert!(c.hit);
        assert_eq!(c.normal, Vec2::Y);
        assert!(c.penetration.is_finite());
    }

    #[test]
    fn test_circle_semicircle_flat_side() {
        // Semicircle bulging toward +Y; circle just below the diameter.
        let c = circle_semicircle(Vec2::new(0.0, -3.0), 5.0, Vec2::ZERO, 20.0, FRAC_PI_2);
        assert!(c.hit);
        assert!((c.normal - Vec2::NEG_Y).length() < 1e-4);
        assert!((c.penetration - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_circle_semicircle_curved_side() {
        let c = circle_semicircle(Vec2::new(0.0, 23.0), 5.0, Vec2::ZERO, 20.0, FRAC_PI_2);
        assert!(c.hit);
        assert!((c.normal - Vec2::Y).length() < 1e-4);
        assert!((c.penetration - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_circle_semicircle_behind_far_away_misses() {
        let c = circle_semicircle(Vec2::new(0.0, -10.0), 5.0, Vec2::ZERO, 20.0, FRAC_PI_2);
        assert!(!c.hit);
    }

    #[test]
    fn test_circle_arc_band_outer_surface() {
        let c = circle_arc_band(Vec2::new(105.0, 0.0), 8.0, Vec2::ZERO, 80.0, 100.0, 0.0, FRAC_PI_2);
        assert!(c.hit);
        assert_eq!(c.normal, Vec2::X);
        assert_near(c.penetration, 3.0 + ARC_REST_BIAS);
    }

    #[test]
    fn test_circle_arc_band_inner_surface() {
        let c = circle_arc_band(Vec2::new(0.0, 75.0), 8.0, Vec2::ZERO, 80.0, 100.0, FRAC_PI_2, 1.0);
        assert!(c.hit);
        assert!((c.normal - Vec2::NEG_Y).length() < 1e-5);
        assert!((c.penetration - (3.0 + ARC_REST_BIAS)).abs() < 1e-4);
    }

    #[test]
    fn test_circle_arc_band_outside_span_never_hits() {
        // Band faces +X with a 90° span; circle sits at 180° from the facing.
        for radius in [1.0_f32, 50.0, 500.0] {
            let c = circle_arc_band(Vec2::new(-90.0, 0.0), radius, Vec2::ZERO, 80.0, 100.0, 0.0, FRAC_PI_2);
            assert!(!c.hit, "radius {radius} should not hit");
        }
    }

    #[test]
    fn test_circle_arc_band_wraps_across_pi() {
        let c = circle_arc_band(Vec2::new(-105.0, 0.0), 8.0, Vec2::ZERO, 80.0, 100.0, PI, FRAC_PI_2);
        assert!(c.hit);
        assert!((c.normal - Vec2::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_circle_arc_band_degenerate_radius() {
        let c = circle_arc_band(Vec2::ZERO, 5.0, Vec2::ZERO, 0.0, 0.0, 0.0, PI);
        assert!(!c.hit);
    }

    #[test]
    fn test_circle_circle_coincident_centres() {
        let c = circle_circle(Vec2::ONE, 3.0, Vec2::ONE, 2.0);
        assert!(c.hit);
        assert_eq!(c.normal, Vec2::X);
        assert_near(c.penetration, 5.0);
    }
}
