//! # Race Core
//!
//! Simulation core for a 2D racer arena.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No wall-clock time (the simulation owns its clock)
//!
//! This separation enables:
//! - Headless runs and batch verification
//! - Reproducible state hashes for regression testing
//! - Any presentation layer on top of [`simulation::Simulation::snapshot`]
//!
//! ## Crate Structure
//!
//! - [`math`] - Vector helpers and numeric sanitizing
//! - [`geometry`] - Circle-vs-shape narrow phase
//! - [`obstacle`] - Static arena shapes
//! - [`spatial`] - Uniform spatial hash grid
//! - [`collision`] - Contact resolution and velocity response
//! - [`environment`] - Weather and per-tick modifiers
//! - [`ability`] - Ability phases and parameters
//! - [`effects`] - What abilities do to other racers
//! - [`simulation`] - Core simulation loop

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ability;
pub mod collision;
pub mod components;
pub mod config;
pub mod effects;
pub mod environment;
pub mod error;
pub mod events;
pub mod geometry;
pub mod math;
pub mod obstacle;
pub mod simulation;
pub mod spatial;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ability::{AbilityKind, AbilityState, AbilityStatus, AbilityTiming};
    pub use crate::collision::CollisionPolicy;
    pub use crate::components::{Racer, RacerId, RacerSnapshot};
    pub use crate::config::{RaceSetup, RacerConfig, RacerOverrides, SimConfig};
    pub use crate::environment::{Weather, WeatherKind};
    pub use crate::error::{Result, SimError};
    pub use crate::events::TickEvents;
    pub use crate::math::Vec2;
    pub use crate::obstacle::Obstacle;
    pub use crate::simulation::Simulation;
}
