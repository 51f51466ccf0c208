//! Racer data.
//!
//! A racer is a moving circle with environment modifiers, one ability and a
//! handful of timed status effects. Racers live in a `Vec` owned by the
//! simulation and are addressed by index.

use serde::{Deserialize, Serialize};

use crate::ability::{AbilityKind, AbilityState, AbilityStatus};
use crate::config::RacerConfig;
use crate::math::{finite_or, finite_vec_or, sanitize_radius, Vec2};

/// Racer identifier. Equal to the racer's index in the simulation.
pub type RacerId = u32;

/// Hit points when the configuration does not override them.
pub const DEFAULT_HP: u32 = 100;

/// Share of incoming stun/slow a fully lucky racer shrugs off.
pub const MAX_LUCK_REDUCTION: f32 = 0.5;

/// Per-tick multiplicative modifiers. Reset to neutral every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvModifiers {
    /// Multiplier on displacement.
    pub speed: f32,
    /// Above 1.0 the surface is slippery and bounces lose less energy.
    pub slip: f32,
}

impl EnvModifiers {
    /// Neutral modifiers.
    pub const NEUTRAL: Self = Self {
        speed: 1.0,
        slip: 1.0,
    };
}

impl Default for EnvModifiers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// One running slow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowWindow {
    /// Speed multiplier in `[0, 1]`.
    pub factor: f32,
    /// Expiry, ms.
    pub until_ms: u64,
}

impl SlowWindow {
    /// Whether this window is at least as strong and lasts at least as long.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        self.factor <= other.factor && self.until_ms >= other.until_ms
    }
}

/// Timed effects applied by other racers or the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffects {
    /// Stun expiry, ms.
    pub stunned_until_ms: Option<u64>,
    /// Running slows ordered by expiry. Each window is strictly stronger
    /// than the ones after it, so the first one is in force.
    pub slows: Vec<SlowWindow>,
    /// Time of the last contact, for impact-based weather.
    pub last_hit_ms: Option<u64>,
}

impl StatusEffects {
    /// Whether a stun is running at `now_ms`.
    #[must_use]
    pub fn is_stunned(&self, now_ms: u64) -> bool {
        self.stunned_until_ms.is_some_and(|until| now_ms < until)
    }

    /// Whether a slow is running at `now_ms`.
    #[must_use]
    pub fn is_slowed(&self, now_ms: u64) -> bool {
        self.slows.last().is_some_and(|w| now_ms < w.until_ms)
    }

    /// Speed multiplier from slows at `now_ms`; 1.0 when none is running.
    #[must_use]
    pub fn slow_factor(&self, now_ms: u64) -> f32 {
        self.slows
            .iter()
            .find(|w| now_ms < w.until_ms)
            .map_or(1.0, |w| w.factor)
    }

    /// Stun time left, ms.
    #[must_use]
    pub fn stun_remaining_ms(&self, now_ms: u64) -> u64 {
        self.stunned_until_ms
            .map_or(0, |until| until.saturating_sub(now_ms))
    }

    /// Time until every slow has ended, ms.
    #[must_use]
    pub fn slow_remaining_ms(&self, now_ms: u64) -> u64 {
        self.slows
            .last()
            .map_or(0, |w| w.until_ms.saturating_sub(now_ms))
    }

    /// Stun for `duration_ms`. Reapplication refreshes, never stacks: the
    /// remaining time becomes the larger of what was left and the new value.
    /// A shorter stun landing on a longer one leaves the longer one as is.
    pub fn apply_stun(&mut self, now_ms: u64, duration_ms: u64) {
        let until = now_ms + duration_ms;
        self.stunned_until_ms = Some(self.stunned_until_ms.map_or(until, |old| old.max(until)));
    }

    /// Slow by `factor` for `duration_ms`.
    ///
    /// Every slow keeps its own factor and expiry. A window that is no
    /// stronger and ends no later than another is dropped, so reapplying the
    /// same slow refreshes it like [`apply_stun`](Self::apply_stun). A
    /// stronger but shorter slow runs on top of a weaker one and hands back
    /// to it when it ends.
    pub fn apply_slow(&mut self, now_ms: u64, duration_ms: u64, factor: f32) {
        let incoming = SlowWindow {
            factor: finite_or(factor, 1.0).clamp(0.0, 1.0),
            until_ms: now_ms + duration_ms,
        };
        self.slows.retain(|w| now_ms < w.until_ms);
        if duration_ms == 0 || self.slows.iter().any(|w| w.covers(&incoming)) {
            return;
        }
        self.slows.retain(|w| !incoming.covers(w));
        let at = self.slows.partition_point(|w| w.until_ms < incoming.until_ms);
        self.slows.insert(at, incoming);
    }

    /// Drop expired windows so no state outlives its effect.
    pub fn expire(&mut self, now_ms: u64, hit_window_ms: u64) {
        if !self.is_stunned(now_ms) {
            self.stunned_until_ms = None;
        }
        self.slows.retain(|w| now_ms < w.until_ms);
        if self
            .last_hit_ms
            .is_some_and(|hit| now_ms.saturating_sub(hit) >= hit_window_ms)
        {
            self.last_hit_ms = None;
        }
    }
}

/// Outcome of an incoming stun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StunOutcome {
    /// Stun applied for the given (possibly reduced) duration.
    Applied(u64),
    /// A one-shot passive cancelled it.
    Blocked,
}

/// A racer in the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Racer {
    /// Identifier, equal to the index in the simulation.
    pub id: RacerId,
    /// Centre position.
    pub position: Vec2,
    /// Velocity, units/s.
    pub velocity: Vec2,
    /// Bounding circle radius, always > 0.
    pub radius: f32,
    /// This tick's environment modifiers.
    pub modifiers: EnvModifiers,
    /// Ability state.
    pub ability: AbilityState,
    /// Timed status effects.
    pub status: StatusEffects,
    /// Current hit points.
    pub hp: u32,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Speed override multiplier.
    pub speed_scale: f32,
    /// Luck in `[0, 1]`; shortens incoming stuns and slows.
    pub luck: f32,
}

impl Racer {
    /// Build a racer from configuration, clamping non-finite values.
    #[must_use]
    pub fn from_config(id: RacerId, config: &RacerConfig) -> Self {
        let radius = sanitize_radius(config.radius);
        if radius != config.radius {
            tracing::warn!(racer = id, configured = config.radius, radius, "Clamped racer radius");
        }
        let overrides = &config.overrides;
        let max_hp = overrides.hp.unwrap_or(DEFAULT_HP).max(1);
        let speed_scale = overrides
            .speed
            .map_or(1.0, |s| finite_or(s, 1.0).max(0.0));
        let luck = overrides.luck.map_or(0.0, |l| finite_or(l, 0.0).clamp(0.0, 1.0));

        Self {
            id,
            position: finite_vec_or(config.position, Vec2::ZERO),
            velocity: finite_vec_or(config.velocity, Vec2::ZERO),
            radius,
            modifiers: EnvModifiers::NEUTRAL,
            ability: AbilityState::new(config.ability, config.timing),
            status: StatusEffects::default(),
            hp: max_hp,
            max_hp,
            speed_scale,
            luck,
        }
    }

    /// Knocked-out racers are frozen and excluded from every query.
    #[must_use]
    pub const fn is_knocked_out(&self) -> bool {
        self.hp == 0
    }

    /// Whether a shield is up.
    #[must_use]
    pub fn is_shielded(&self) -> bool {
        self.ability.active_shield().is_some()
    }

    /// Whether racer contacts are ignored.
    #[must_use]
    pub fn is_ghosted(&self) -> bool {
        self.ability.is_ghosted()
    }

    /// Scale an incoming crowd-control duration by luck and passives.
    #[must_use]
    pub fn incoming_duration(&self, duration_ms: u64) -> u64 {
        let mut scale = 1.0 - MAX_LUCK_REDUCTION * self.luck;
        if let AbilityKind::Resilience(params) = self.ability.kind {
            scale *= 1.0 - finite_or(params.reduction, 0.0).clamp(0.0, 1.0);
        }
        (duration_ms as f64 * f64::from(scale)).round() as u64
    }

    /// Receive a stun, honouring passives.
    pub fn receive_stun(&mut self, now_ms: u64, duration_ms: u64) -> StunOutcome {
        if self.ability.consume() {
            return StunOutcome::Blocked;
        }
        let duration = self.incoming_duration(duration_ms);
        self.status.apply_stun(now_ms, duration);
        StunOutcome::Applied(duration)
    }

    /// Receive a slow, honouring passives. Returns the applied duration.
    pub fn receive_slow(&mut self, now_ms: u64, duration_ms: u64, factor: f32) -> u64 {
        let duration = self.incoming_duration(duration_ms);
        self.status.apply_slow(now_ms, duration, factor);
        duration
    }

    /// Remove HP. Returns `true` if this knocked the racer out.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        if self.is_knocked_out() {
            return false;
        }
        self.hp = self.hp.saturating_sub(amount);
        if self.is_knocked_out() {
            self.velocity = Vec2::ZERO;
            return true;
        }
        false
    }

    /// Snapshot for the presentation layer.
    #[must_use]
    pub fn snapshot(&self, now_ms: u64) -> RacerSnapshot {
        RacerSnapshot {
            id: self.id,
            position: self.position,
            velocity: self.velocity,
            radius: self.radius,
            ability: self.ability.name(),
            ability_status: self.ability.status(),
            ability_remaining_ms: self.ability.remaining_ms(now_ms),
            shielded: self.is_shielded(),
            ghosted: self.is_ghosted(),
            stunned: self.status.is_stunned(now_ms),
            slowed: self.status.is_slowed(now_ms),
            hp: self.hp,
            knocked_out: self.is_knocked_out(),
            projectile: self.ability.projectile.map(|p| p.position),
        }
    }
}

/// Per-tick view of a racer: everything a renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RacerSnapshot {
    /// Racer id.
    pub id: RacerId,
    /// Centre position.
    pub position: Vec2,
    /// Velocity.
    pub velocity: Vec2,
    /// Radius.
    pub radius: f32,
    /// Ability name.
    pub ability: &'static str,
    /// Ability phase.
    pub ability_status: AbilityStatus,
    /// Time left in the ability phase, ms.
    pub ability_remaining_ms: u64,
    /// Shield up.
    pub shielded: bool,
    /// Ghost running.
    pub ghosted: bool,
    /// Stunned.
    pub stunned: bool,
    /// Slowed.
    pub slowed: bool,
    /// Hit points.
    pub hp: u32,
    /// Out of the race.
    pub knocked_out: bool,
    /// Missile position, if one is in flight.
    pub projectile: Option<Vec2>,
}
