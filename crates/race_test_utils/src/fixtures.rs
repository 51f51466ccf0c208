//! Test fixtures and helpers.
//!
//! Pre-built arenas and racer configurations for consistent testing.

use race_core::ability::{
    AbilityKind, ChainStunParams, MagnetParams, MissileParams, ResilienceParams, ShieldParams,
    ShockwaveParams,
};
use race_core::config::{RaceSetup, RacerConfig, SimConfig};
use race_core::environment::Weather;
use race_core::math::Vec2;
use race_core::obstacle::Obstacle;
use race_core::simulation::Simulation;

/// Wall thickness used by [`walled_arena`].
pub const WALL: f32 = 20.0;

/// A racer at `(x, y)` with radius 8 and the given velocity.
#[must_use]
pub fn racer_at(x: f32, y: f32, vx: f32, vy: f32) -> RacerConfig {
    RacerConfig::new(Vec2::new(x, y), Vec2::new(vx, vy), 8.0)
}

/// Four walls enclosing `0..width` × `0..height`, with rounded inner corners
/// and a capsule divider across the middle third.
#[must_use]
pub fn walled_arena(width: f32, height: f32) -> Vec<Obstacle> {
    vec![
        Obstacle::Rect {
            min: Vec2::new(-WALL, -WALL),
            max: Vec2::new(width + WALL, 0.0),
            corner_radius: 0.0,
        },
        Obstacle::Rect {
            min: Vec2::new(-WALL, height),
            max: Vec2::new(width + WALL, height + WALL),
            corner_radius: 0.0,
        },
        Obstacle::Rect {
            min: Vec2::new(-WALL, 0.0),
            max: Vec2::new(0.0, height),
            corner_radius: 0.0,
        },
        Obstacle::Rect {
            min: Vec2::new(width, 0.0),
            max: Vec2::new(width + WALL, height),
            corner_radius: 0.0,
        },
        Obstacle::Capsule {
            a: Vec2::new(width / 3.0, height / 2.0),
            b: Vec2::new(2.0 * width / 3.0, height / 2.0),
            radius: 6.0,
        },
    ]
}

/// One of every obstacle kind, spread around a 600 × 600 arena.
#[must_use]
pub fn mixed_obstacles() -> Vec<Obstacle> {
    let mut obstacles = walled_arena(600.0, 600.0);
    obstacles.extend([
        Obstacle::RotatedRect {
            center: Vec2::new(150.0, 150.0),
            half_extents: Vec2::new(40.0, 10.0),
            angle: 0.6,
            corner_radius: 3.0,
        },
        Obstacle::Semicircle {
            center: Vec2::new(450.0, 150.0),
            radius: 35.0,
            facing: std::f32::consts::FRAC_PI_2,
        },
        Obstacle::ArcBand {
            center: Vec2::new(300.0, 450.0),
            inner_radius: 70.0,
            outer_radius: 85.0,
            angle: -std::f32::consts::FRAC_PI_2,
            span: 2.0,
        },
    ]);
    obstacles
}

/// `count` racers on a grid inside `width` × `height`, each heading a
/// different direction at `speed`.
#[must_use]
pub fn racer_grid(count: usize, width: f32, height: f32, speed: f32) -> Vec<RacerConfig> {
    let per_row = (count as f32).sqrt().ceil().max(1.0) as usize;
    let rows = count.div_ceil(per_row).max(1);
    let dx = width / (per_row + 1) as f32;
    let dy = height / (rows + 1) as f32;
    (0..count)
        .map(|i| {
            let x = dx * (1 + i % per_row) as f32;
            let y = dy * (1 + i / per_row) as f32;
            let heading = Vec2::from_angle(i as f32 * 2.399) * speed;
            racer_at(x, y, heading.x, heading.y)
        })
        .collect()
}

/// Every timed ability with default parameters, in a fixed rotation.
#[must_use]
pub fn ability_rotation() -> [AbilityKind; 10] {
    [
        AbilityKind::Boost(Default::default()),
        AbilityKind::Shield(ShieldParams::default()),
        AbilityKind::Ghost,
        AbilityKind::Magnet(MagnetParams::default()),
        AbilityKind::Shockwave(ShockwaveParams::default()),
        AbilityKind::ChainStun(ChainStunParams::default()),
        AbilityKind::Missile(MissileParams::default()),
        AbilityKind::Resilience(ResilienceParams::default()),
        AbilityKind::SecondWind,
        AbilityKind::None,
    ]
}

/// A busy race: walls, every obstacle kind, `count` racers cycling through
/// every ability, racers activating on their own.
#[must_use]
pub fn busy_race(count: usize, weather: Weather) -> RaceSetup {
    let abilities = ability_rotation();
    let racers = racer_grid(count, 600.0, 600.0, 140.0)
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.with_ability(abilities[i % abilities.len()]))
        .collect();
    RaceSetup {
        config: SimConfig {
            auto_activate: true,
            ..SimConfig::default()
        },
        weather,
        obstacles: mixed_obstacles(),
        racers,
    }
}

/// Build a simulation, panicking on a bad fixture.
///
/// # Panics
///
/// Panics if the setup is rejected.
#[must_use]
pub fn build(setup: RaceSetup) -> Simulation {
    Simulation::new(setup).expect("fixture setup should be valid")
}
