//! Collision resolution.
//!
//! Two passes run for each racer in id order: first against the static
//! obstacles found through the obstacle grid, then against neighbouring
//! racers with a higher id so each pair is handled once. Position is always
//! corrected before velocity, and a velocity is only reflected while the
//! racer is still moving into the surface.

use serde::{Deserialize, Serialize};

use crate::components::{Racer, RacerId};
use crate::error::{Result, SimError};
use crate::events::{CollisionEvent, ContactTarget};
use crate::geometry::circle_circle;
use crate::math::{finite_or, reflect, Vec2};
use crate::obstacle::Obstacle;

/// Damping used by the default policy.
pub const DEFAULT_DAMPING: f32 = 0.9;

/// How a velocity responds to a contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Reflect and lose some energy. Slippery surfaces lose less.
    ElasticWithLoss {
        /// Fraction of speed kept on a dry surface, `[0, 1]`.
        damping: f32,
    },
    /// Reflect and keep the speed the racer had before the contact.
    SpeedPreserving,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        Self::ElasticWithLoss {
            damping: DEFAULT_DAMPING,
        }
    }
}

impl CollisionPolicy {
    /// Reject a damping outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::ElasticWithLoss { damping } if !(0.0..=1.0).contains(&damping) => {
                Err(SimError::InvalidConfig(format!(
                    "damping must be within [0, 1], got {damping}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// New velocity after touching a surface with outward normal `normal`.
    ///
    /// A velocity already leaving the surface is returned untouched.
    #[must_use]
    pub fn respond(&self, velocity: Vec2, normal: Vec2, slip: f32) -> Vec2 {
        if velocity.dot(normal) >= 0.0 {
            return velocity;
        }
        let reflected = reflect(velocity, normal);
        match *self {
            Self::ElasticWithLoss { damping } => reflected * effective_damping(damping, slip),
            Self::SpeedPreserving => reflected.normalize_or_zero() * velocity.length(),
        }
    }
}

/// Damping after the surface's slip: `1 - (1 - damping) / slip` when
/// `slip > 1`, plain `damping` otherwise.
#[must_use]
pub fn effective_damping(damping: f32, slip: f32) -> f32 {
    let damping = finite_or(damping, DEFAULT_DAMPING).clamp(0.0, 1.0);
    let slip = finite_or(slip, 1.0);
    if slip > 1.0 {
        1.0 - (1.0 - damping) / slip
    } else {
        damping
    }
}

/// Contact parameters shared by every resolution in a tick.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    /// Velocity response.
    pub policy: CollisionPolicy,
    /// Extra push-out distance.
    pub epsilon: f32,
    /// Time of the tick, stamped on impacted racers.
    pub now_ms: u64,
}

impl Resolver {
    /// Resolve `racer` against the obstacles listed in `candidates`.
    ///
    /// Obstacles are tested one after another against the already corrected
    /// position, so a racer wedged into a corner is pushed out of both walls.
    pub fn resolve_obstacles(
        &self,
        racer: &mut Racer,
        obstacles: &[Obstacle],
        candidates: &[u32],
        events: &mut Vec<CollisionEvent>,
    ) {
        for &index in candidates {
            let Some(obstacle) = obstacles.get(index as usize) else {
                continue;
            };
            let contact = obstacle.test_circle(racer.position, racer.radius);
            if !contact.hit {
                continue;
            }
            racer.position += contact.normal * (contact.penetration + self.epsilon);
            racer.velocity = self
                .policy
                .respond(racer.velocity, contact.normal, racer.modifiers.slip);
            racer.status.last_hit_ms = Some(self.now_ms);
            events.push(CollisionEvent {
                racer: racer.id,
                target: ContactTarget::Obstacle(index),
                point: contact.point,
                normal: contact.normal,
            });
        }
    }

    /// Resolve one racer pair. Returns the contact, if any.
    ///
    /// Ghosted or knocked-out racers never touch. A shielded racer is neither
    /// moved nor deflected; the other party takes the whole push-out plus the
    /// shield's knockback. Two shields separate evenly without any velocity
    /// change.
    pub fn resolve_pair(&self, a: &mut Racer, b: &mut Racer) -> Option<CollisionEvent> {
        if a.is_knocked_out() || b.is_knocked_out() || a.is_ghosted() || b.is_ghosted() {
            return None;
        }
        let contact = circle_circle(a.position, a.radius, b.position, b.radius);
        if !contact.hit {
            return None;
        }
        // Points from b toward a.
        let n = contact.normal;
        let push = contact.penetration + self.epsilon;

        match (a.ability.active_shield(), b.ability.active_shield()) {
            (Some(_), Some(_)) => {
                a.position += n * (push * 0.5);
                b.position -= n * (push * 0.5);
            }
            (Some(shield), None) => {
                b.position -= n * push;
                b.velocity = self.policy.respond(b.velocity, -n, b.modifiers.slip);
                b.velocity -= n * shield.knockback;
                b.status.last_hit_ms = Some(self.now_ms);
            }
            (None, Some(shield)) => {
                a.position += n * push;
                a.velocity = self.policy.respond(a.velocity, n, a.modifiers.slip);
                a.velocity += n * shield.knockback;
                a.status.last_hit_ms = Some(self.now_ms);
            }
            (None, None) => {
                a.position += n * (push * 0.5);
                b.position -= n * (push * 0.5);
                a.velocity = self.policy.respond(a.velocity, n, a.modifiers.slip);
                b.velocity = self.policy.respond(b.velocity, -n, b.modifiers.slip);
                a.status.last_hit_ms = Some(self.now_ms);
                b.status.last_hit_ms = Some(self.now_ms);
            }
        }

        Some(CollisionEvent {
            racer: a.id,
            target: ContactTarget::Racer(b.id),
            point: contact.point,
            normal: n,
        })
    }

    /// Resolve racer `i` against every neighbour with a higher id.
    pub fn resolve_neighbours(
        &self,
        racers: &mut [Racer],
        i: usize,
        neighbours: &[RacerId],
        events: &mut Vec<CollisionEvent>,
    ) {
        for &j in neighbours {
            let j = j as usize;
            if j <= i || j >= racers.len() {
                continue;
            }
            let (a, b) = pair_mut(racers, i, j);
            if let Some(event) = self.resolve_pair(a, b) {
                events.push(event);
            }
        }
    }
}

/// Two distinct mutable racers, `i < j`.
pub(crate) fn pair_mut(racers: &mut [Racer], i: usize, j: usize) -> (&mut Racer, &mut Racer) {
    debug_assert!(i < j);
    let (head, tail) = racers.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}
