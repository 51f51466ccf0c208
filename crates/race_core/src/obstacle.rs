//! Static arena obstacles.
//!
//! Obstacles come from the map definition and are never mutated by the
//! simulation. Each variant knows its bounding box (for the static broad
//! phase) and which geometry test applies to it.

use serde::{Deserialize, Serialize};

use crate::geometry::{
    circle_arc_band, circle_capsule, circle_obb, circle_rect, circle_semicircle, Aabb, Contact,
};
use crate::math::{Vec2, EPSILON};

/// A static obstacle shape.
///
/// Angles are in radians. All dimensions are in world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Obstacle {
    /// Axis-aligned rectangle, optionally with rounded corners.
    Rect {
        /// Minimum corner.
        min: Vec2,
        /// Maximum corner.
        max: Vec2,
        /// Corner rounding radius.
        #[serde(default)]
        corner_radius: f32,
    },
    /// Rectangle rotated about its centre.
    RotatedRect {
        /// Centre of the rectangle.
        center: Vec2,
        /// Half width and half height before rotation.
        half_extents: Vec2,
        /// Rotation angle.
        angle: f32,
        /// Corner rounding radius.
        #[serde(default)]
        corner_radius: f32,
    },
    /// Segment swept by a radius.
    Capsule {
        /// First endpoint.
        a: Vec2,
        /// Second endpoint.
        b: Vec2,
        /// Sweep radius.
        radius: f32,
    },
    /// Half disc bulging in the `facing` direction.
    Semicircle {
        /// Centre of the full disc.
        center: Vec2,
        /// Disc radius.
        radius: f32,
        /// Direction the curved side faces.
        facing: f32,
    },
    /// Partial ring.
    ArcBand {
        /// Ring centre.
        center: Vec2,
        /// Inner radius.
        inner_radius: f32,
        /// Outer radius.
        outer_radius: f32,
        /// Direction of the middle of the span.
        angle: f32,
        /// Total angular width.
        span: f32,
    },
}

impl Obstacle {
    /// Short name for logs and events.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Rect { .. } => "rect",
            Self::RotatedRect { .. } => "rotated_rect",
            Self::Capsule { .. } => "capsule",
            Self::Semicircle { .. } => "semicircle",
            Self::ArcBand { .. } => "arc_band",
        }
    }

    /// Check that every field is finite and dimensions are non-negative.
    ///
    /// Degenerate but finite shapes (zero-length capsules, zero-radius arc
    /// bands) are valid; the geometry kernel has fallbacks for them.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Rect {
                min,
                max,
                corner_radius,
            } => {
                min.is_finite()
                    && max.is_finite()
                    && min.cmple(max).all()
                    && corner_radius.is_finite()
                    && corner_radius >= 0.0
            }
            Self::RotatedRect {
                center,
                half_extents,
                angle,
                corner_radius,
            } => {
                center.is_finite()
                    && half_extents.is_finite()
                    && half_extents.cmpge(Vec2::ZERO).all()
                    && angle.is_finite()
                    && corner_radius.is_finite()
                    && corner_radius >= 0.0
            }
            Self::Capsule { a, b, radius } => {
                a.is_finite() && b.is_finite() && radius.is_finite() && radius >= 0.0
            }
            Self::Semicircle {
                center,
                radius,
                facing,
            } => center.is_finite() && radius.is_finite() && radius >= 0.0 && facing.is_finite(),
            Self::ArcBand {
                center,
                inner_radius,
                outer_radius,
                angle,
                span,
            } => {
                center.is_finite()
                    && inner_radius.is_finite()
                    && outer_radius.is_finite()
                    && inner_radius >= 0.0
                    && outer_radius >= inner_radius
                    && angle.is_finite()
                    && span.is_finite()
                    && span >= 0.0
            }
        }
    }

    /// Conservative bounding box.
    ///
    /// Semicircles and arc bands report the box of their full disc.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        match *self {
            Self::Rect { min, max, .. } => Aabb::from_corners(min, max),
            Self::RotatedRect {
                center,
                half_extents,
                angle,
                ..
            } => {
                let rotation = Vec2::from_angle(angle);
                let ex = rotation.rotate(Vec2::new(half_extents.x, 0.0)).abs();
                let ey = rotation.rotate(Vec2::new(0.0, half_extents.y)).abs();
                let reach = ex + ey;
                Aabb {
                    min: center - reach,
                    max: center + reach,
                }
            }
            Self::Capsule { a, b, radius } => Aabb::from_corners(a, b).inflate(radius),
            Self::Semicircle { center, radius, .. } => Aabb::from_circle(center, radius),
            Self::ArcBand {
                center,
                outer_radius,
                ..
            } => Aabb::from_circle(center, outer_radius),
        }
    }

    /// Run the narrow-phase test matching this shape.
    ///
    /// Invalid obstacles never report contact.
    #[must_use]
    pub fn test_circle(&self, center: Vec2, radius: f32) -> Contact {
        if !self.is_valid() {
            return Contact::MISS;
        }
        match *self {
            Self::Rect {
                min,
                max,
                corner_radius,
            } => circle_rect(center, radius, min, max, corner_radius),
            Self::RotatedRect {
                center: obb_center,
                half_extents,
                angle,
                corner_radius,
            } => circle_obb(center, radius, obb_center, half_extents, angle, corner_radius),
            Self::Capsule { a, b, radius: cap } => circle_capsule(center, radius, a, b, cap),
            Self::Semicircle {
                center: sc_center,
                radius: sc_radius,
                facing,
            } => circle_semicircle(center, radius, sc_center, sc_radius, facing),
            Self::ArcBand {
                center: band_center,
                inner_radius,
                outer_radius,
                angle,
                span,
            } => circle_arc_band(
                center,
                radius,
                band_center,
                inner_radius,
                outer_radius,
                angle,
                span,
            ),
        }
    }

    /// Whether the shape has no area worth testing (still valid).
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        match *self {
            Self::Rect { min, max, .. } => (max - min).min_element() <= EPSILON,
            Self::RotatedRect { half_extents, .. } => half_extents.min_element() <= EPSILON,
            Self::Capsule { a, b, radius } => a.distance_squared(b) <= EPSILON && radius <= EPSILON,
            Self::Semicircle { radius, .. } => radius <= EPSILON,
            Self::ArcBand {
                inner_radius,
                outer_radius,
                span,
                ..
            } => outer_radius - inner_radius <= EPSILON || span <= EPSILON,
        }
    }
}
