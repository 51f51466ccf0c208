//! Scenario loading and configuration.
//!
//! A scenario is a named [`RaceSetup`] plus how long a scripted run lasts.
//! Scenarios are RON files or one of the built-ins below.

use std::path::Path;

use race_core::ability::{
    AbilityKind, BoostParams, ChainStunParams, MagnetParams, MissileParams, ResilienceParams,
    ShieldParams, ShockwaveParams,
};
use race_core::config::{RaceSetup, RacerConfig, RacerOverrides, SimConfig};
use race_core::environment::{Weather, WeatherKind};
use race_core::error::SimError;
use race_core::math::Vec2;
use race_core::obstacle::Obstacle;
use race_core::simulation::Simulation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default length of a scripted run: one minute at 16 ms ticks.
pub const DEFAULT_TICKS: u64 = 3750;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The setup parsed but the simulation refused it.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] SimError),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Ticks in a scripted run.
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Arena and racers.
    pub setup: RaceSetup,
}

fn default_ticks() -> u64 {
    DEFAULT_TICKS
}

impl Default for Scenario {
    fn default() -> Self {
        Self::demo()
    }
}

impl Scenario {
    /// Names accepted by [`Scenario::builtin`].
    pub const BUILTIN: [&'static str; 3] = ["demo", "duel", "storm"];

    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// A built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "demo" => Some(Self::demo()),
            "duel" => Some(Self::missile_duel()),
            "storm" => Some(Self::storm()),
            _ => None,
        }
    }

    /// A built-in name, or else a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Some(scenario) => Ok(scenario),
            None => Self::load(name_or_path),
        }
    }

    /// Build a fresh simulation for this scenario.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        Ok(Simulation::new(self.setup.clone())?)
    }

    /// Every obstacle kind inside an 800 × 600 walled arena, 24 racers
    /// cycling through the ability roster and using abilities on their own.
    #[must_use]
    pub fn demo() -> Self {
        let roster = [
            AbilityKind::Boost(BoostParams::default()),
            AbilityKind::Shield(ShieldParams::default()),
            AbilityKind::Ghost,
            AbilityKind::Magnet(MagnetParams::default()),
            AbilityKind::Shockwave(ShockwaveParams::default()),
            AbilityKind::ChainStun(ChainStunParams::default()),
            AbilityKind::Missile(MissileParams::default()),
            AbilityKind::Resilience(ResilienceParams::default()),
            AbilityKind::SecondWind,
        ];
        let racers = (0..24)
            .map(|i| {
                let column = (i % 6) as f32;
                let row = (i / 6) as f32;
                let heading = Vec2::from_angle(i as f32 * 2.399) * 150.0;
                RacerConfig::new(
                    Vec2::new(110.0 + column * 116.0, 90.0 + row * 140.0),
                    heading,
                    9.0,
                )
                .with_ability(roster[i % roster.len()])
                .with_overrides(RacerOverrides {
                    luck: Some((i % 5) as f32 * 0.2),
                    ..RacerOverrides::default()
                })
            })
            .collect();

        let mut obstacles = arena_walls(800.0, 600.0);
        obstacles.extend([
            Obstacle::Capsule {
                a: Vec2::new(300.0, 300.0),
                b: Vec2::new(500.0, 300.0),
                radius: 8.0,
            },
            Obstacle::RotatedRect {
                center: Vec2::new(180.0, 440.0),
                half_extents: Vec2::new(50.0, 12.0),
                angle: 0.5,
                corner_radius: 4.0,
            },
            Obstacle::Semicircle {
                center: Vec2::new(620.0, 150.0),
                radius: 40.0,
                facing: std::f32::consts::FRAC_PI_2,
            },
            Obstacle::ArcBand {
                center: Vec2::new(620.0, 450.0),
                inner_radius: 60.0,
                outer_radius: 75.0,
                angle: std::f32::consts::PI,
                span: 2.4,
            },
        ]);

        Self {
            name: "demo".to_string(),
            description: "Mixed arena with every ability and obstacle kind".to_string(),
            ticks: DEFAULT_TICKS,
            setup: RaceSetup {
                config: SimConfig {
                    auto_activate: true,
                    ..SimConfig::default()
                },
                weather: Weather::new(WeatherKind::Rain, 0.4),
                obstacles,
                racers,
            },
        }
    }

    /// Two missile carriers facing off in an open 600 × 300 box.
    #[must_use]
    pub fn missile_duel() -> Self {
        let missile = AbilityKind::Missile(MissileParams {
            damage: 50,
            ..MissileParams::default()
        });
        Self {
            name: "duel".to_string(),
            description: "Two missile carriers until one is knocked out".to_string(),
            ticks: 1500,
            setup: RaceSetup {
                config: SimConfig {
                    auto_activate: true,
                    ..SimConfig::default()
                },
                weather: Weather::CLEAR,
                obstacles: arena_walls(600.0, 300.0),
                racers: vec![
                    RacerConfig::new(Vec2::new(100.0, 150.0), Vec2::new(0.0, 80.0), 10.0)
                        .with_ability(missile),
                    RacerConfig::new(Vec2::new(500.0, 150.0), Vec2::new(0.0, -80.0), 10.0)
                        .with_ability(missile)
                        .with_overrides(RacerOverrides {
                            hp: Some(150),
                            ..RacerOverrides::default()
                        }),
                ],
            },
        }
    }

    /// A crowded box in a full storm: every bump slows the racer for a while.
    #[must_use]
    pub fn storm() -> Self {
        let racers = (0..16)
            .map(|i| {
                let heading = Vec2::from_angle(i as f32 * 0.9) * 200.0;
                RacerConfig::new(
                    Vec2::new(60.0 + (i % 4) as f32 * 60.0, 60.0 + (i / 4) as f32 * 60.0),
                    heading,
                    8.0,
                )
            })
            .collect();
        Self {
            name: "storm".to_string(),
            description: "Storm impact penalties in a crowded box".to_string(),
            ticks: DEFAULT_TICKS,
            setup: RaceSetup {
                config: SimConfig::default(),
                weather: Weather::new(WeatherKind::Storm, 1.0),
                obstacles: arena_walls(300.0, 300.0),
                racers,
            },
        }
    }
}

/// Four 20-unit walls enclosing `0..width` × `0..height`.
fn arena_walls(width: f32, height: f32) -> Vec<Obstacle> {
    const WALL: f32 = 20.0;
    let rect = |min: Vec2, max: Vec2| Obstacle::Rect {
        min,
        max,
        corner_radius: 0.0,
    };
    vec![
        rect(Vec2::new(-WALL, -WALL), Vec2::new(width + WALL, 0.0)),
        rect(Vec2::new(-WALL, height), Vec2::new(width + WALL, height + WALL)),
        rect(Vec2::new(-WALL, 0.0), Vec2::new(0.0, height)),
        rect(Vec2::new(width, 0.0), Vec2::new(width + WALL, height)),
    ]
}
