//! Data-driven race configuration.
//!
//! Everything here is plain data designed to be deserialized from RON.
//! Parsing a string is supported; reading files is left to the caller.
//!
//! # Example RON
//!
//! ```ron
//! RaceSetup(
//!     config: (dt_ms: 16, policy: SpeedPreserving, auto_activate: true),
//!     weather: (kind: Rain, intensity: 0.5),
//!     obstacles: [
//!         Capsule(a: (0.0, 0.0), b: (400.0, 0.0), radius: 6.0),
//!     ],
//!     racers: [
//!         (position: (50.0, 50.0), velocity: (120.0, 40.0), radius: 8.0,
//!          ability: Boost((multiplier: 1.5)),
//!          overrides: (speed: Some(1.1))),
//!     ],
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::ability::{AbilityKind, AbilityTiming};
use crate::collision::CollisionPolicy;
use crate::environment::Weather;
use crate::error::{Result, SimError};
use crate::math::Vec2;
use crate::obstacle::Obstacle;

/// Default tick length in milliseconds.
pub const DEFAULT_DT_MS: u32 = 16;

/// Default extra push-out distance after a contact.
pub const DEFAULT_CONTACT_EPSILON: f32 = 0.01;

/// Simulation-wide tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Length of one tick, ms.
    pub dt_ms: u32,
    /// Broad-phase cell size. `None` sizes cells at twice the largest racer radius.
    pub cell_size: Option<f32>,
    /// How velocities respond to contacts.
    pub policy: CollisionPolicy,
    /// Extra push-out distance so resolved contacts do not re-trigger.
    pub contact_epsilon: f32,
    /// Racers request activation on their own whenever ready.
    pub auto_activate: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt_ms: DEFAULT_DT_MS,
            cell_size: None,
            policy: CollisionPolicy::default(),
            contact_epsilon: DEFAULT_CONTACT_EPSILON,
            auto_activate: false,
        }
    }
}

impl SimConfig {
    /// Reject settings that would stall or corrupt the simulation.
    pub fn validate(&self) -> Result<()> {
        if self.dt_ms == 0 {
            return Err(SimError::InvalidConfig("dt_ms must be positive".into()));
        }
        if !self.contact_epsilon.is_finite() || self.contact_epsilon < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "contact_epsilon must be finite and non-negative, got {}",
                self.contact_epsilon
            )));
        }
        self.policy.validate()
    }
}

/// Optional per-racer overrides. Absent fields use deterministic defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RacerOverrides {
    /// Speed multiplier (default 1.0).
    pub speed: Option<f32>,
    /// Maximum hit points (default 100).
    pub hp: Option<u32>,
    /// Luck in `[0, 1]` (default 0.0).
    pub luck: Option<f32>,
}

/// Initial configuration of one racer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacerConfig {
    /// Starting centre.
    pub position: Vec2,
    /// Starting velocity, units/s.
    #[serde(default)]
    pub velocity: Vec2,
    /// Bounding radius.
    pub radius: f32,
    /// Assigned ability and its parameters.
    #[serde(default)]
    pub ability: AbilityKind,
    /// Phase lengths; `None` uses the ability's defaults.
    #[serde(default)]
    pub timing: Option<AbilityTiming>,
    /// Per-racer overrides.
    #[serde(default)]
    pub overrides: RacerOverrides,
}

impl RacerConfig {
    /// A racer with no ability and no overrides.
    #[must_use]
    pub fn new(position: Vec2, velocity: Vec2, radius: f32) -> Self {
        Self {
            position,
            velocity,
            radius,
            ability: AbilityKind::None,
            timing: None,
            overrides: RacerOverrides::default(),
        }
    }

    /// Builder: assign an ability with its default timing.
    #[must_use]
    pub fn with_ability(mut self, ability: AbilityKind) -> Self {
        self.ability = ability;
        self
    }

    /// Builder: override ability timing.
    #[must_use]
    pub fn with_timing(mut self, timing: AbilityTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Builder: set overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: RacerOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Everything needed to start a race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RaceSetup {
    /// Simulation tuning.
    #[serde(default)]
    pub config: SimConfig,
    /// Initial weather.
    #[serde(default)]
    pub weather: Weather,
    /// Static obstacles.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Participants, in id order.
    #[serde(default)]
    pub racers: Vec<RacerConfig>,
}

impl RaceSetup {
    /// Parse a setup from RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| SimError::ConfigParse(e.to_string()))
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SimError::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::BoostParams;
    use crate::environment::WeatherKind;

    #[test]
    fn test_parse_minimal_setup() {
        let setup = RaceSetup::from_ron_str(
            r#"(
                racers: [
                    (position: (10.0, 20.0), radius: 8.0),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(setup.racers.len(), 1);
        assert_eq!(setup.racers[0].velocity, Vec2::ZERO);
        assert_eq!(setup.racers[0].ability, AbilityKind::None);
        assert_eq!(setup.config.dt_ms, DEFAULT_DT_MS);
        assert_eq!(setup.weather.kind, WeatherKind::Clear);
    }

    #[test]
    fn test_parse_full_setup() {
        let setup = RaceSetup::from_ron_str(
            r#"(
                config: (dt_ms: 20, policy: SpeedPreserving, auto_activate: true),
                weather: (kind: Wind(angle: 1.5), intensity: 0.8),
                obstacles: [
                    Rect(min: (0.0, 0.0), max: (10.0, 400.0)),
                    Capsule(a: (0.0, 0.0), b: (400.0, 0.0), radius: 6.0),
                    ArcBand(center: (200.0, 200.0), inner_radius: 80.0, outer_radius: 100.0, angle: 0.0, span: 1.2),
                ],
                racers: [
                    (
                        position: (50.0, 50.0),
                        velocity: (120.0, 40.0),
                        radius: 8.0,
                        ability: Boost((multiplier: 1.5)),
                        timing: Some((activation_ms: 0, duration_ms: 1000, cooldown_ms: 2000)),
                        overrides: (speed: Some(1.1), luck: Some(0.25)),
                    ),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(setup.config.dt_ms, 20);
        assert_eq!(setup.config.policy, CollisionPolicy::SpeedPreserving);
        assert!(setup.config.auto_activate);
        assert_eq!(setup.obstacles.len(), 3);
        let racer = &setup.racers[0];
        assert_eq!(
            racer.ability,
            AbilityKind::Boost(BoostParams { multiplier: 1.5 })
        );
        assert_eq!(racer.overrides.speed, Some(1.1));
        assert_eq!(racer.overrides.hp, None);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = RaceSetup::from_ron_str("(racers: [oops])").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
    }

    #[test]
    fn test_validate_rejects_zero_dt() {
        let config = SimConfig {
            dt_ms: 0,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_ron_roundtrip_preserves_setup() {
        let setup = RaceSetup {
            racers: vec![RacerConfig::new(Vec2::new(1.0, 2.0), Vec2::X, 5.0)],
            ..RaceSetup::default()
        };
        let text = setup.to_ron_string().unwrap();
        assert_eq!(RaceSetup::from_ron_str(&text).unwrap(), setup);
    }
}
