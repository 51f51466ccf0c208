//! Events produced by a simulation tick.
//!
//! The presentation layer drains these once per tick to trigger effects and
//! sounds. Every event is plain data and serializes to JSON for the headless
//! driver.

use serde::Serialize;

use crate::ability::{AbilityStatus, AbilityTransition};
use crate::components::RacerId;
use crate::math::Vec2;

/// What a racer touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ContactTarget {
    /// Index into the obstacle list.
    Obstacle(u32),
    /// Another racer.
    Racer(RacerId),
}

/// A resolved contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CollisionEvent {
    /// Racer that was resolved.
    pub racer: RacerId,
    /// What it touched.
    pub target: ContactTarget,
    /// Contact point.
    pub point: Vec2,
    /// Unit normal toward `racer`.
    pub normal: Vec2,
}

/// An ability phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AbilityEvent {
    /// Owner.
    pub racer: RacerId,
    /// Ability name.
    pub ability: &'static str,
    /// Phase left.
    pub from: AbilityStatus,
    /// Phase entered.
    pub to: AbilityStatus,
    /// Exact time of the boundary, ms.
    pub at_ms: u64,
}

impl AbilityEvent {
    /// Attach an owner to a transition.
    #[must_use]
    pub const fn new(racer: RacerId, ability: &'static str, transition: AbilityTransition) -> Self {
        Self {
            racer,
            ability,
            from: transition.from,
            to: transition.to,
            at_ms: transition.at_ms,
        }
    }
}

/// An activation request that was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RejectedActivation {
    /// Racer that asked.
    pub racer: RacerId,
    /// Ability name.
    pub ability: &'static str,
    /// Phase the ability was in.
    pub status: AbilityStatus,
    /// Time of the request, ms.
    pub at_ms: u64,
}

/// What an ability did to a racer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    /// Stun applied for `ms`.
    Stunned {
        /// Applied duration after reductions.
        ms: u64,
    },
    /// A one-shot passive cancelled a stun.
    StunBlocked,
    /// Slow applied.
    Slowed {
        /// Applied duration after reductions.
        ms: u64,
        /// Speed multiplier.
        factor: f32,
    },
    /// Pulled toward the source.
    Pulled,
    /// Pushed away from the source.
    Knockback,
    /// Missile hit.
    MissileHit {
        /// HP removed.
        damage: u32,
    },
}

/// An ability effect landing on a racer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectEvent {
    /// Racer whose ability caused it.
    pub source: RacerId,
    /// Racer affected.
    pub target: RacerId,
    /// What happened.
    pub kind: EffectKind,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickEvents {
    /// Resolved contacts, in resolution order.
    pub collisions: Vec<CollisionEvent>,
    /// Ability phase changes, in order of occurrence per racer.
    pub abilities: Vec<AbilityEvent>,
    /// Refused activation requests.
    pub rejected: Vec<RejectedActivation>,
    /// Ability effects on racers.
    pub effects: Vec<EffectEvent>,
    /// Racers knocked out this tick.
    pub knockouts: Vec<RacerId>,
}

impl TickEvents {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collisions.is_empty()
            && self.abilities.is_empty()
            && self.rejected.is_empty()
            && self.effects.is_empty()
            && self.knockouts.is_empty()
    }
}
