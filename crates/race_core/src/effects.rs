//! What abilities do to other racers.
//!
//! The ability state machine only tracks phases; this module turns phase
//! changes into effects. Area and targeted effects find their victims through
//! the racer grid, then confirm with an exact distance check against current
//! positions. Knocked-out racers are never affected.

use crate::ability::{
    AbilityKind, ChainStunParams, MagnetParams, MissileParams, Projectile, ShockwaveParams,
};
use crate::components::{Racer, RacerId, StunOutcome};
use crate::events::{EffectEvent, EffectKind, TickEvents};
use crate::math::{finite_or, Vec2, EPSILON};
use crate::spatial::SpatialHashGrid;

/// Shared inputs for one racer's effects.
#[derive(Debug)]
pub struct EffectContext<'a> {
    /// Racer broad phase for this tick.
    pub grid: &'a SpatialHashGrid,
    /// Simulation time, ms.
    pub now_ms: u64,
    /// Tick length, seconds.
    pub dt_secs: f32,
}

impl EffectContext<'_> {
    /// Run the one-time effect of entering `Active`.
    pub fn on_enter_active(
        &self,
        racers: &mut [Racer],
        caster: usize,
        scratch: &mut Vec<u32>,
        events: &mut TickEvents,
    ) {
        match racers[caster].ability.kind {
            AbilityKind::Shockwave(params) => {
                self.shockwave(racers, caster, params, scratch, events);
            }
            AbilityKind::ChainStun(params) => {
                self.chain_stun(racers, caster, params, scratch, events);
            }
            AbilityKind::Missile(params) => self.launch_missile(racers, caster, params, scratch),
            _ => {}
        }
    }

    /// Run the per-tick effect of a running ability.
    pub fn while_active(
        &self,
        racers: &mut [Racer],
        caster: usize,
        scratch: &mut Vec<u32>,
        events: &mut TickEvents,
    ) {
        match racers[caster].ability.kind {
            AbilityKind::Magnet(params) => self.magnet(racers, caster, params, scratch, events),
            AbilityKind::Missile(params) => self.advance_missile(racers, caster, params, events),
            _ => {}
        }
    }

    /// Clean up when `Active` ends.
    pub fn on_leave_active(racer: &mut Racer) {
        if racer.ability.projectile.take().is_some() {
            tracing::trace!(racer = racer.id, "Missile expired");
        }
    }

    /// Live racers other than `caster` within `radius` of `center`, sorted by id.
    fn gather(
        &self,
        racers: &[Racer],
        caster: usize,
        center: Vec2,
        radius: f32,
        scratch: &mut Vec<u32>,
    ) {
        self.grid.query_circle_into(center, radius, scratch);
        scratch.retain(|&id| {
            racers.get(id as usize).is_some_and(|r| {
                id as usize != caster
                    && !r.is_knocked_out()
                    && r.position.distance(center) <= radius + r.radius
            })
        });
    }

    fn stun(&self, source: RacerId, target: &mut Racer, ms: u64, events: &mut TickEvents) {
        let kind = match target.receive_stun(self.now_ms, ms) {
            StunOutcome::Applied(ms) => EffectKind::Stunned { ms },
            StunOutcome::Blocked => EffectKind::StunBlocked,
        };
        events.effects.push(EffectEvent {
            source,
            target: target.id,
            kind,
        });
    }

    fn shockwave(
        &self,
        racers: &mut [Racer],
        caster: usize,
        params: ShockwaveParams,
        scratch: &mut Vec<u32>,
        events: &mut TickEvents,
    ) {
        let source = racers[caster].id;
        let origin = racers[caster].position;
        self.gather(racers, caster, origin, params.radius.max(0.0), scratch);

        for &id in scratch.iter() {
            let target = &mut racers[id as usize];
            let away = (target.position - origin).try_normalize().unwrap_or(Vec2::X);
            target.velocity += away * finite_or(params.impulse, 0.0);
            events.effects.push(EffectEvent {
                source,
                target: id,
                kind: EffectKind::Knockback,
            });
            self.stun(source, target, u64::from(params.stun_ms), events);
        }
    }

    /// Hop from the caster to the nearest unvisited racer, up to
    /// `max_jumps` times. Ties go to the lower id. Hop `k` (from zero)
    /// applies the durations scaled by `decay^k`.
    fn chain_stun(
        &self,
        racers: &mut [Racer],
        caster: usize,
        params: ChainStunParams,
        scratch: &mut Vec<u32>,
        events: &mut TickEvents,
    ) {
        let source = racers[caster].id;
        let decay = finite_or(params.decay, 0.0).clamp(0.0, 1.0);
        let jump = params.jump_radius.max(0.0);
        let slow_factor = finite_or(params.slow_factor, 1.0).clamp(0.0, 1.0);
        let mut visited = vec![caster];
        let mut from = racers[caster].position;

        for hop in 0..params.max_jumps {
            self.grid.query_circle_into(from, jump, scratch);
            let mut best: Option<(usize, f32)> = None;
            for &id in scratch.iter() {
                let index = id as usize;
                let Some(candidate) = racers.get(index) else {
                    continue;
                };
                if visited.contains(&index) || candidate.is_knocked_out() {
                    continue;
                }
                let dist = candidate.position.distance(from);
                if dist <= jump && best.map_or(true, |(_, d)| dist < d) {
                    best = Some((index, dist));
                }
            }
            let Some((index, _)) = best else {
                break;
            };

            let scale = decay.powi(hop as i32);
            let stun_ms = (f64::from(params.stun_ms) * f64::from(scale)).round() as u64;
            let slow_ms = (f64::from(params.slow_ms) * f64::from(scale)).round() as u64;

            let target = &mut racers[index];
            self.stun(source, target, stun_ms, events);
            let applied = target.receive_slow(self.now_ms, slow_ms, slow_factor);
            events.effects.push(EffectEvent {
                source,
                target: target.id,
                kind: EffectKind::Slowed {
                    ms: applied,
                    factor: slow_factor,
                },
            });

            tracing::trace!(source, target = target.id, hop, "Chain stun hop");
            visited.push(index);
            from = target.position;
        }
    }

    fn launch_missile(
        &self,
        racers: &mut [Racer],
        caster: usize,
        params: MissileParams,
        scratch: &mut Vec<u32>,
    ) {
        let origin = racers[caster].position;
        self.gather(racers, caster, origin, params.range.max(0.0), scratch);

        let mut best: Option<(RacerId, f32)> = None;
        for &id in scratch.iter() {
            let dist = racers[id as usize].position.distance(origin);
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((id, dist));
            }
        }

        let owner = &mut racers[caster];
        owner.ability.projectile = best.map(|(target, _)| Projectile {
            position: origin,
            target,
        });
        match owner.ability.projectile {
            Some(p) => tracing::trace!(racer = owner.id, target = p.target, "Missile launched"),
            None => tracing::trace!(racer = owner.id, "Missile found no target"),
        }
    }

    fn advance_missile(
        &self,
        racers: &mut [Racer],
        caster: usize,
        params: MissileParams,
        events: &mut TickEvents,
    ) {
        let Some(mut projectile) = racers[caster].ability.projectile else {
            return;
        };
        let source = racers[caster].id;
        let Some(target) = racers.get(projectile.target as usize) else {
            racers[caster].ability.projectile = None;
            return;
        };
        if target.is_knocked_out() {
            racers[caster].ability.projectile = None;
            return;
        }

        let to_target = target.position - projectile.position;
        let dist = to_target.length();
        let step = finite_or(params.speed, 0.0).max(0.0) * self.dt_secs;
        if dist > EPSILON {
            projectile.position += to_target / dist * step.min(dist);
        }
        let reach = target.radius + params.hit_radius.max(0.0);
        if projectile.position.distance(target.position) > reach {
            racers[caster].ability.projectile = Some(projectile);
            return;
        }

        racers[caster].ability.projectile = None;
        let target = &mut racers[projectile.target as usize];
        events.effects.push(EffectEvent {
            source,
            target: target.id,
            kind: EffectKind::MissileHit {
                damage: params.damage,
            },
        });
        self.stun(source, target, u64::from(params.stun_ms), events);
        if target.take_damage(params.damage) {
            target.ability.projectile = None;
            tracing::debug!(racer = target.id, by = source, "Racer knocked out");
            events.knockouts.push(target.id);
        }
    }

    fn magnet(
        &self,
        racers: &mut [Racer],
        caster: usize,
        params: MagnetParams,
        scratch: &mut Vec<u32>,
        events: &mut TickEvents,
    ) {
        let source = racers[caster].id;
        let center = racers[caster].position;
        let radius = params.radius.max(0.0);
        self.gather(racers, caster, center, radius, scratch);

        let pull = finite_or(params.strength, 0.0) * self.dt_secs;
        for &id in scratch.iter() {
            let target = &mut racers[id as usize];
            let toward = center - target.position;
            if toward.length() > radius {
                continue;
            }
            let Some(dir) = toward.try_normalize() else {
                continue;
            };
            target.velocity += dir * pull;
            events.effects.push(EffectEvent {
                source,
                target: id,
                kind: EffectKind::Pulled,
            });
        }
    }
}
