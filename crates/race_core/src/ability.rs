//! Per-racer ability state machine.
//!
//! Timed abilities cycle `Ready → Activating → Active → Cooldown → Ready`.
//! Passive abilities sit in [`AbilityStatus::Passive`] forever. Leaving
//! `Ready` only happens through [`AbilityState::activate`]; every other
//! transition is driven by simulation time in [`AbilityState::advance`].
//!
//! What an ability *does* lives in [`crate::effects`]; this module only
//! tracks phases and parameters.

use serde::{Deserialize, Serialize};

use crate::components::RacerId;
use crate::math::Vec2;

/// Phase of an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityStatus {
    /// Waiting for an activation request.
    Ready,
    /// Cast delay running.
    Activating,
    /// Effect running.
    Active,
    /// Recharging.
    Cooldown,
    /// Always on, or one-shot on trigger. Never cycles.
    Passive,
}

impl AbilityStatus {
    /// Lowercase name for events and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Cooldown => "cooldown",
            Self::Passive => "passive",
        }
    }
}

/// Phase lengths in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbilityTiming {
    /// Cast delay between request and effect.
    pub activation_ms: u32,
    /// How long the effect runs.
    pub duration_ms: u32,
    /// Recharge time after the effect ends.
    pub cooldown_ms: u32,
}

impl AbilityTiming {
    /// Create a timing triple.
    #[must_use]
    pub const fn new(activation_ms: u32, duration_ms: u32, cooldown_ms: u32) -> Self {
        Self {
            activation_ms,
            duration_ms,
            cooldown_ms,
        }
    }

    /// All phases zero.
    pub const INSTANT: Self = Self::new(0, 0, 0);
}

/// Speed burst.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    /// Speed modifier multiplier while active.
    pub multiplier: f32,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self { multiplier: 1.6 }
    }
}

/// Contact-absorbing shield.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShieldParams {
    /// Velocity added to the other racer along the contact normal.
    pub knockback: f32,
}

impl Default for ShieldParams {
    fn default() -> Self {
        Self { knockback: 120.0 }
    }
}

/// Continuous pull toward the caster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnetParams {
    /// Pull radius around the caster.
    pub radius: f32,
    /// Acceleration toward the caster, units/s².
    pub strength: f32,
}

impl Default for MagnetParams {
    fn default() -> Self {
        Self {
            radius: 150.0,
            strength: 220.0,
        }
    }
}

/// One-time radial blast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShockwaveParams {
    /// Blast radius.
    pub radius: f32,
    /// Velocity added away from the caster.
    pub impulse: f32,
    /// Stun applied to every racer caught.
    pub stun_ms: u32,
}

impl Default for ShockwaveParams {
    fn default() -> Self {
        Self {
            radius: 120.0,
            impulse: 180.0,
            stun_ms: 400,
        }
    }
}

/// Stun that hops between nearby racers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainStunParams {
    /// Maximum distance of a single hop.
    pub jump_radius: f32,
    /// Number of racers the chain may hit.
    pub max_jumps: u32,
    /// Stun applied by the first hop.
    pub stun_ms: u32,
    /// Slow applied by the first hop.
    pub slow_ms: u32,
    /// Speed multiplier while slowed.
    pub slow_factor: f32,
    /// Multiplier applied to both durations on every further hop.
    pub decay: f32,
}

impl Default for ChainStunParams {
    fn default() -> Self {
        Self {
            jump_radius: 160.0,
            max_jumps: 3,
            stun_ms: 600,
            slow_ms: 3000,
            slow_factor: 0.5,
            decay: 0.7,
        }
    }
}

/// Homing projectile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissileParams {
    /// Lock-on range when the missile is launched.
    pub range: f32,
    /// Travel speed, units/s.
    pub speed: f32,
    /// Distance from the target's edge that counts as a hit.
    pub hit_radius: f32,
    /// Stun applied on hit.
    pub stun_ms: u32,
    /// HP removed on hit.
    pub damage: u32,
}

impl Default for MissileParams {
    fn default() -> Self {
        Self {
            range: 400.0,
            speed: 420.0,
            hit_radius: 4.0,
            stun_ms: 800,
            damage: 20,
        }
    }
}

/// Always-on reduction of incoming crowd control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResilienceParams {
    /// Fraction removed from incoming stun and slow durations, `[0, 1]`.
    pub reduction: f32,
}

impl Default for ResilienceParams {
    fn default() -> Self {
        Self { reduction: 0.4 }
    }
}

/// The closed set of abilities, each with its own parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum AbilityKind {
    /// No ability.
    #[default]
    None,
    /// Temporary speed multiplier.
    Boost(BoostParams),
    /// Absorbs racer contacts and knocks the other party back.
    Shield(ShieldParams),
    /// Passes through other racers.
    Ghost,
    /// Pulls nearby racers in every tick while active.
    Magnet(MagnetParams),
    /// Blasts nearby racers away on activation.
    Shockwave(ShockwaveParams),
    /// Chained stun and slow on activation.
    ChainStun(ChainStunParams),
    /// Launches a homing projectile at the nearest racer.
    Missile(MissileParams),
    /// Passive crowd-control reduction.
    Resilience(ResilienceParams),
    /// Passive: the first incoming stun is cancelled.
    SecondWind,
}

impl AbilityKind {
    /// Stable name used in events.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Boost(_) => "boost",
            Self::Shield(_) => "shield",
            Self::Ghost => "ghost",
            Self::Magnet(_) => "magnet",
            Self::Shockwave(_) => "shockwave",
            Self::ChainStun(_) => "chain_stun",
            Self::Missile(_) => "missile",
            Self::Resilience(_) => "resilience",
            Self::SecondWind => "second_wind",
        }
    }

    /// Passive abilities never cycle.
    #[must_use]
    pub const fn is_passive(&self) -> bool {
        matches!(self, Self::None | Self::Resilience(_) | Self::SecondWind)
    }

    /// Timing used when the configuration does not give one.
    #[must_use]
    pub const fn default_timing(&self) -> AbilityTiming {
        match self {
            Self::None | Self::Resilience(_) | Self::SecondWind => AbilityTiming::INSTANT,
            Self::Boost(_) => AbilityTiming::new(0, 2000, 6000),
            Self::Shield(_) => AbilityTiming::new(200, 3000, 8000),
            Self::Ghost => AbilityTiming::new(0, 1500, 7000),
            Self::Magnet(_) => AbilityTiming::new(300, 2500, 9000),
            Self::Shockwave(_) => AbilityTiming::new(500, 0, 8000),
            Self::ChainStun(_) => AbilityTiming::new(400, 0, 10000),
            Self::Missile(_) => AbilityTiming::new(250, 3000, 9000),
        }
    }
}

/// In-flight projectile owned by a missile ability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Current position.
    pub position: Vec2,
    /// Racer being chased.
    pub target: RacerId,
}

/// A phase change, in order of occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityTransition {
    /// Phase left.
    pub from: AbilityStatus,
    /// Phase entered.
    pub to: AbilityStatus,
    /// Simulation time of the boundary, ms.
    pub at_ms: u64,
}

/// Live ability state of one racer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityState {
    /// Which ability and its parameters. Fixed at configuration time.
    pub kind: AbilityKind,
    /// Phase lengths. Fixed at configuration time.
    pub timing: AbilityTiming,
    status: AbilityStatus,
    phase_started_ms: u64,
    consumed: bool,
    /// Missile in flight, if any.
    pub projectile: Option<Projectile>,
}

impl AbilityState {
    /// Create the state for a configured ability.
    #[must_use]
    pub fn new(kind: AbilityKind, timing: Option<AbilityTiming>) -> Self {
        let status = if kind.is_passive() {
            AbilityStatus::Passive
        } else {
            AbilityStatus::Ready
        };
        Self {
            kind,
            timing: timing.unwrap_or_else(|| kind.default_timing()),
            status,
            phase_started_ms: 0,
            consumed: false,
            projectile: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn status(&self) -> AbilityStatus {
        self.status
    }

    /// Ability name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Whether the effect is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AbilityStatus::Active
    }

    /// Whether a one-shot passive has fired.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Time the current phase began, ms.
    #[must_use]
    pub const fn phase_started_ms(&self) -> u64 {
        self.phase_started_ms
    }

    fn phase_length(&self) -> Option<u64> {
        match self.status {
            AbilityStatus::Activating => Some(u64::from(self.timing.activation_ms)),
            AbilityStatus::Active => Some(u64::from(self.timing.duration_ms)),
            AbilityStatus::Cooldown => Some(u64::from(self.timing.cooldown_ms)),
            AbilityStatus::Ready | AbilityStatus::Passive => None,
        }
    }

    /// Milliseconds left in the current timed phase. Zero for untimed phases.
    #[must_use]
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.phase_length().map_or(0, |len| {
            (self.phase_started_ms + len).saturating_sub(now_ms)
        })
    }

    /// Request activation at `now_ms`.
    ///
    /// Only a `Ready` ability accepts; anything else returns `None` and is
    /// left untouched.
    pub fn activate(&mut self, now_ms: u64) -> Option<AbilityTransition> {
        if self.status != AbilityStatus::Ready {
            return None;
        }
        self.status = AbilityStatus::Activating;
        self.phase_started_ms = now_ms;
        Some(AbilityTransition {
            from: AbilityStatus::Ready,
            to: AbilityStatus::Activating,
            at_ms: now_ms,
        })
    }

    /// Advance phases up to `now_ms`, appending every crossed boundary.
    ///
    /// Each new phase starts at the exact boundary of the previous one, so a
    /// long step crossing several phases reports all of them in order and
    /// later phases are not shortened.
    pub fn advance(&mut self, now_ms: u64, out: &mut Vec<AbilityTransition>) {
        while let Some(len) = self.phase_length() {
            let boundary = self.phase_started_ms + len;
            if now_ms < boundary {
                break;
            }
            let next = match self.status {
                AbilityStatus::Activating => AbilityStatus::Active,
                AbilityStatus::Active => AbilityStatus::Cooldown,
                AbilityStatus::Cooldown => AbilityStatus::Ready,
                AbilityStatus::Ready | AbilityStatus::Passive => break,
            };
            out.push(AbilityTransition {
                from: self.status,
                to: next,
                at_ms: boundary,
            });
            self.status = next;
            self.phase_started_ms = boundary;
        }
    }

    /// Fire a one-shot passive. Returns `false` if it was already used or the
    /// ability is not a one-shot.
    pub fn consume(&mut self) -> bool {
        if !matches!(self.kind, AbilityKind::SecondWind) || self.consumed {
            return false;
        }
        self.consumed = true;
        true
    }

    /// Shield parameters while a shield is up.
    #[must_use]
    pub fn active_shield(&self) -> Option<ShieldParams> {
        match self.kind {
            AbilityKind::Shield(params) if self.is_active() => Some(params),
            _ => None,
        }
    }

    /// Whether a ghost effect is running.
    #[must_use]
    pub fn is_ghosted(&self) -> bool {
        matches!(self.kind, AbilityKind::Ghost) && self.is_active()
    }

    /// Speed multiplier from a running boost, `1.0` otherwise.
    #[must_use]
    pub fn boost_multiplier(&self) -> f32 {
        match self.kind {
            AbilityKind::Boost(params) if self.is_active() => params.multiplier,
            _ => 1.0,
        }
    }
}

impl Default for AbilityState {
    fn default() -> Self {
        Self::new(AbilityKind::None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed() -> AbilityState {
        AbilityState::new(
            AbilityKind::Boost(BoostParams::default()),
            Some(AbilityTiming::new(100, 500, 1000)),
        )
    }

    #[test]
    fn test_lifecycle_visits_every_phase_in_order() {
        let mut ability = timed();
        let mut seen = vec![ability.status()];
        let mut out = Vec::new();

        assert!(ability.activate(0).is_some());
        seen.push(ability.status());

        // Advance in 10 ms steps through the whole cycle.
        for now in (10..=1600).step_by(10) {
            out.clear();
            ability.advance(now, &mut out);
            for t in &out {
                assert_eq!(t.from, *seen.last().unwrap());
                seen.push(t.to);
            }
            assert!(ability.remaining_ms(now) <= 1000);
        }

        assert_eq!(
            seen,
            vec![
                AbilityStatus::Ready,
                AbilityStatus::Activating,
                AbilityStatus::Active,
                AbilityStatus::Cooldown,
                AbilityStatus::Ready,
            ]
        );
    }

    #[test]
    fn test_single_long_advance_reports_all_boundaries() {
        let mut ability = timed();
        ability.activate(50);
        let mut out = Vec::new();
        ability.advance(10_000, &mut out);
        let boundaries: Vec<u64> = out.iter().map(|t| t.at_ms).collect();
        assert_eq!(boundaries, vec![150, 650, 1650]);
        assert_eq!(ability.status(), AbilityStatus::Ready);
    }

    #[test]
    fn test_activation_rejected_unless_ready() {
        let mut ability = timed();
        assert!(ability.activate(0).is_some());
        assert!(ability.activate(5).is_none());
        assert_eq!(ability.phase_started_ms(), 0);

        let mut passive = AbilityState::new(AbilityKind::SecondWind, None);
        assert_eq!(passive.status(), AbilityStatus::Passive);
        assert!(passive.activate(0).is_none());
    }

    #[test]
    fn test_zero_activation_enters_active_same_step() {
        let mut ability = AbilityState::new(
            AbilityKind::Ghost,
            Some(AbilityTiming::new(0, 300, 300)),
        );
        ability.activate(40);
        let mut out = Vec::new();
        ability.advance(40, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, AbilityStatus::Active);
        assert!(ability.is_ghosted());
    }

    #[test]
    fn test_remaining_never_negative() {
        let mut ability = timed();
        ability.activate(0);
        assert_eq!(ability.remaining_ms(5_000), 0);
        assert_eq!(ability.remaining_ms(40), 60);
    }

    #[test]
    fn test_second_wind_consumes_once() {
        let mut ability = AbilityState::new(AbilityKind::SecondWind, None);
        assert!(ability.consume());
        assert!(!ability.consume());
        assert!(ability.is_consumed());

        let mut boost = timed();
        assert!(!boost.consume());
    }

    #[test]
    fn test_passive_never_advances() {
        let mut ability = AbilityState::new(
            AbilityKind::Resilience(ResilienceParams::default()),
            None,
        );
        let mut out = Vec::new();
        ability.advance(1_000_000, &mut out);
        assert!(out.is_empty());
        assert_eq!(ability.status(), AbilityStatus::Passive);
    }
}
