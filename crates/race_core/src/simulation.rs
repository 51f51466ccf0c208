//! Core simulation loop.
//!
//! The simulation advances in fixed steps of `dt_ms` and owns every piece of
//! mutable state: racers, both spatial grids, the weather and the clock.
//! Callers interact through [`Simulation::request_activation`],
//! [`Simulation::set_weather`] and [`Simulation::tick`], and read results
//! from the returned [`TickEvents`] and [`Simulation::snapshot`].
//!
//! # Determinism
//!
//! Racers are processed in id order, grid queries return sorted ids, and no
//! step reads a clock or a random source. Two simulations built from the
//! same setup and fed the same requests produce the same
//! [`state_hash`](Simulation::state_hash) on the same machine.
//!
//! # Example
//!
//! ```
//! use race_core::config::{RaceSetup, RacerConfig};
//! use race_core::math::Vec2;
//! use race_core::simulation::Simulation;
//!
//! let setup = RaceSetup {
//!     racers: vec![RacerConfig::new(Vec2::ZERO, Vec2::new(100.0, 0.0), 8.0)],
//!     ..RaceSetup::default()
//! };
//! let mut sim = Simulation::new(setup).unwrap();
//! let events = sim.tick();
//! assert!(events.collisions.is_empty());
//! assert_eq!(sim.get_tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::ability::AbilityStatus;
use crate::collision::Resolver;
use crate::components::{Racer, RacerId, RacerSnapshot};
use crate::config::{RaceSetup, SimConfig};
use crate::effects::EffectContext;
use crate::environment::{apply_environment, Weather, WeatherKind, HIT_WINDOW_MS};
use crate::error::{Result, SimError};
use crate::events::{AbilityEvent, RejectedActivation, TickEvents};
use crate::obstacle::Obstacle;
use crate::spatial::{SpatialHashGrid, DEFAULT_CELL_SIZE};

/// The race simulation.
///
/// # Tick Order
///
/// 1. **Environment** - recompute modifiers from the weather and statuses
/// 2. **Integration** - move racers by velocity scaled by their speed modifier
/// 3. **Broad phase** - rebuild the racer grid
/// 4. **Per racer, in id order** - obstacle contacts, then contacts with
///    higher-id neighbours, then ability phases and effects
/// 5. **Expiry** - drop finished stun, slow and impact windows
/// 6. **Clock** - advance tick and time
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    obstacles: Vec<Obstacle>,
    obstacle_grid: SpatialHashGrid,
    grid: SpatialHashGrid,
    racers: Vec<Racer>,
    weather: Weather,
    tick: u64,
    time_ms: u64,
    pending_abilities: Vec<AbilityEvent>,
    pending_rejected: Vec<RejectedActivation>,
    scratch: Vec<u32>,
}

impl Simulation {
    /// Build a simulation from a setup.
    ///
    /// Racer values are sanitized rather than rejected. Obstacles that fail
    /// validation are kept in the list, so indices stay stable, but never
    /// enter the obstacle grid and so never collide.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the simulation settings are
    /// unusable.
    pub fn new(setup: RaceSetup) -> Result<Self> {
        let RaceSetup {
            config,
            weather,
            obstacles,
            racers,
        } = setup;
        config.validate()?;

        let racers: Vec<Racer> = racers
            .iter()
            .enumerate()
            .map(|(i, cfg)| Racer::from_config(i as RacerId, cfg))
            .collect();

        let cell_size = config.cell_size.unwrap_or_else(|| {
            racers
                .iter()
                .map(|r| r.radius * 2.0)
                .reduce(f32::max)
                .unwrap_or(DEFAULT_CELL_SIZE)
        });
        let grid = SpatialHashGrid::new(cell_size);

        let mut obstacle_grid = SpatialHashGrid::new(grid.cell_size().max(DEFAULT_CELL_SIZE));
        for (index, obstacle) in obstacles.iter().enumerate() {
            if !obstacle.is_valid() {
                tracing::warn!(index, kind = obstacle.kind_name(), "Skipping invalid obstacle");
                continue;
            }
            if obstacle.is_degenerate() {
                tracing::debug!(index, kind = obstacle.kind_name(), "Skipping degenerate obstacle");
                continue;
            }
            if !obstacle_grid.insert_aabb(index as u32, obstacle.aabb()) {
                tracing::warn!(
                    index,
                    kind = obstacle.kind_name(),
                    "Obstacle spans too many grid cells; its far end is not indexed"
                );
            }
        }

        tracing::info!(
            racers = racers.len(),
            obstacles = obstacles.len(),
            cell_size = grid.cell_size(),
            "Simulation created"
        );

        Ok(Self {
            config,
            obstacles,
            obstacle_grid,
            grid,
            racers,
            weather,
            tick: 0,
            time_ms: 0,
            pending_abilities: Vec::new(),
            pending_rejected: Vec::new(),
            scratch: Vec::new(),
        })
    }

    /// Parse a RON setup and build a simulation from it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ConfigParse`] for malformed text and
    /// [`SimError::InvalidConfig`] for unusable settings.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Self::new(RaceSetup::from_ron_str(ron)?)
    }

    /// Current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulation time, ms.
    #[must_use]
    pub const fn time_ms(&self) -> u64 {
        self.time_ms
    }

    /// Simulation settings.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// All racers in id order.
    #[must_use]
    pub fn racers(&self) -> &[Racer] {
        &self.racers
    }

    /// One racer.
    #[must_use]
    pub fn racer(&self, id: RacerId) -> Option<&Racer> {
        self.racers.get(id as usize)
    }

    /// Obstacles as configured, including any that were skipped.
    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Racer broad phase as of the last tick.
    #[must_use]
    pub const fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    /// Static obstacle broad phase.
    #[must_use]
    pub const fn obstacle_grid(&self) -> &SpatialHashGrid {
        &self.obstacle_grid
    }

    /// Current weather.
    #[must_use]
    pub const fn weather(&self) -> &Weather {
        &self.weather
    }

    /// Change the weather. Takes effect at the next tick.
    pub fn set_weather(&mut self, weather: Weather) {
        tracing::debug!(?weather, tick = self.tick, "Weather changed");
        self.weather = weather;
    }

    /// Ask racer `id` to use its ability at the current time.
    ///
    /// Returns `Ok(true)` if the ability started activating. A request the
    /// ability cannot take (not ready, passive, or racer knocked out) returns
    /// `Ok(false)` and is reported in the next tick's `rejected` list.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidRacerId`] if no such racer exists.
    pub fn request_activation(&mut self, id: RacerId) -> Result<bool> {
        let now = self.time_ms;
        let racer = self
            .racers
            .get_mut(id as usize)
            .ok_or(SimError::InvalidRacerId(id))?;

        let transition = if racer.is_knocked_out() {
            None
        } else {
            racer.ability.activate(now)
        };

        match transition {
            Some(t) => {
                self.pending_abilities
                    .push(AbilityEvent::new(id, racer.ability.name(), t));
                Ok(true)
            }
            None => {
                tracing::trace!(
                    racer = id,
                    status = racer.ability.status().as_str(),
                    "Activation rejected"
                );
                self.pending_rejected.push(RejectedActivation {
                    racer: id,
                    ability: racer.ability.name(),
                    status: racer.ability.status(),
                    at_ms: now,
                });
                Ok(false)
            }
        }
    }

    /// Advance the simulation by one step.
    ///
    /// Returns everything that happened, including activation requests made
    /// since the previous tick.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents {
            abilities: std::mem::take(&mut self.pending_abilities),
            rejected: std::mem::take(&mut self.pending_rejected),
            ..TickEvents::default()
        };

        let start = self.time_ms;
        let end = start + u64::from(self.config.dt_ms);
        let dt_secs = self.config.dt_ms as f32 / 1000.0;

        if self.config.auto_activate {
            self.run_auto_activation(start, &mut events);
        }

        // 1. Environment
        for racer in self.racers.iter_mut().filter(|r| !r.is_knocked_out()) {
            apply_environment(racer, &self.weather, start, dt_secs);
        }

        // 2. Integration
        for racer in self.racers.iter_mut().filter(|r| !r.is_knocked_out()) {
            racer.position += racer.velocity * racer.modifiers.speed * dt_secs;
        }

        // 3. Broad phase
        self.grid.clear();
        for racer in self.racers.iter().filter(|r| !r.is_knocked_out()) {
            self.grid.insert(racer.id, racer.position, racer.radius);
        }

        // 4. Contacts and abilities
        self.run_racer_pass(end, dt_secs, &mut events);

        // 5. Expiry
        for racer in &mut self.racers {
            racer.status.expire(end, HIT_WINDOW_MS);
        }

        // 6. Clock
        self.tick += 1;
        self.time_ms = end;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        #[cfg(feature = "debug-validation")]
        self.validate_state();

        events
    }

    /// Warn about racers with non-finite state or left overlapping an obstacle.
    ///
    /// Racer-racer pushes late in a tick may leave a shallow overlap that the
    /// next tick resolves, so only overlaps deeper than a racer radius count.
    #[cfg(feature = "debug-validation")]
    fn validate_state(&self) {
        for racer in self.racers.iter().filter(|r| !r.is_knocked_out()) {
            if !racer.position.is_finite() || !racer.velocity.is_finite() {
                tracing::warn!(tick = self.tick, racer = racer.id, "Non-finite racer state");
                continue;
            }
            let candidates = self.obstacle_grid.query_circle(racer.position, racer.radius);
            for index in candidates {
                let contact =
                    self.obstacles[index as usize].test_circle(racer.position, racer.radius);
                if contact.hit && contact.penetration > racer.radius {
                    tracing::warn!(
                        tick = self.tick,
                        racer = racer.id,
                        obstacle = index,
                        penetration = contact.penetration,
                        "Racer deep inside obstacle"
                    );
                }
            }
        }
    }

    fn run_auto_activation(&mut self, now: u64, events: &mut TickEvents) {
        for racer in &mut self.racers {
            if racer.is_knocked_out() || racer.ability.status() != AbilityStatus::Ready {
                continue;
            }
            if let Some(t) = racer.ability.activate(now) {
                events
                    .abilities
                    .push(AbilityEvent::new(racer.id, racer.ability.name(), t));
            }
        }
    }

    fn run_racer_pass(&mut self, now: u64, dt_secs: f32, events: &mut TickEvents) {
        let resolver = Resolver {
            policy: self.config.policy,
            epsilon: self.config.contact_epsilon,
            now_ms: now,
        };
        let effects = EffectContext {
            grid: &self.grid,
            now_ms: now,
            dt_secs,
        };
        let mut transitions = Vec::new();
        let mut area = Vec::new();

        for i in 0..self.racers.len() {
            if self.racers[i].is_knocked_out() {
                continue;
            }

            let (position, radius) = (self.racers[i].position, self.racers[i].radius);
            self.obstacle_grid
                .query_circle_into(position, radius, &mut self.scratch);
            resolver.resolve_obstacles(
                &mut self.racers[i],
                &self.obstacles,
                &self.scratch,
                &mut events.collisions,
            );

            let (position, radius) = (self.racers[i].position, self.racers[i].radius);
            self.grid
                .query_nearby_into(i as u32, position, radius, &mut self.scratch);
            resolver.resolve_neighbours(&mut self.racers, i, &self.scratch, &mut events.collisions);

            transitions.clear();
            self.racers[i].ability.advance(now, &mut transitions);
            for &t in &transitions {
                let racer = &self.racers[i];
                tracing::trace!(
                    racer = racer.id,
                    ability = racer.ability.name(),
                    from = t.from.as_str(),
                    to = t.to.as_str(),
                    at_ms = t.at_ms,
                    "Ability transition"
                );
                events
                    .abilities
                    .push(AbilityEvent::new(racer.id, racer.ability.name(), t));
                if t.to == AbilityStatus::Active {
                    effects.on_enter_active(&mut self.racers, i, &mut area, events);
                }
                if t.from == AbilityStatus::Active {
                    EffectContext::on_leave_active(&mut self.racers[i]);
                }
            }
            if self.racers[i].ability.is_active() {
                effects.while_active(&mut self.racers, i, &mut area, events);
            }
        }
    }

    /// View of every racer for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RacerSnapshot> {
        self.racers
            .iter()
            .map(|r| r.snapshot(self.time_ms))
            .collect()
    }

    /// Hash of the simulation state.
    ///
    /// Floats are hashed by bit pattern, so any difference at all shows up.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.time_ms.hash(&mut hasher);

        match self.weather.kind {
            WeatherKind::Clear => 0u8.hash(&mut hasher),
            WeatherKind::Rain => 1u8.hash(&mut hasher),
            WeatherKind::Snow => 2u8.hash(&mut hasher),
            WeatherKind::Wind { angle } => {
                3u8.hash(&mut hasher);
                angle.to_bits().hash(&mut hasher);
            }
            WeatherKind::Storm => 4u8.hash(&mut hasher),
        }
        self.weather.intensity.to_bits().hash(&mut hasher);

        self.racers.len().hash(&mut hasher);
        for racer in &self.racers {
            racer.id.hash(&mut hasher);
            racer.position.x.to_bits().hash(&mut hasher);
            racer.position.y.to_bits().hash(&mut hasher);
            racer.velocity.x.to_bits().hash(&mut hasher);
            racer.velocity.y.to_bits().hash(&mut hasher);
            racer.hp.hash(&mut hasher);

            racer.ability.status().hash(&mut hasher);
            racer.ability.phase_started_ms().hash(&mut hasher);
            racer.ability.is_consumed().hash(&mut hasher);
            if let Some(p) = racer.ability.projectile {
                p.position.x.to_bits().hash(&mut hasher);
                p.position.y.to_bits().hash(&mut hasher);
                p.target.hash(&mut hasher);
            }

            racer.status.stunned_until_ms.hash(&mut hasher);
            for slow in &racer.status.slows {
                slow.factor.to_bits().hash(&mut hasher);
                slow.until_ms.hash(&mut hasher);
            }
            racer.status.last_hit_ms.hash(&mut hasher);
        }

        hasher.finish()
    }
}
