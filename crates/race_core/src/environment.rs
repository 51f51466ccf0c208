//! Weather and per-racer environment modifiers.
//!
//! Modifiers are recomputed from scratch every tick: reset to neutral, then
//! multiplied by the weather, the racer's speed override, and its status
//! effects. The weather is re-read every tick so callers may change it at
//! any time between ticks.

use serde::{Deserialize, Serialize};

use crate::components::{EnvModifiers, Racer};
use crate::math::{finite_or, Vec2};

/// How long an impact keeps penalising a racer under [`WeatherKind::Storm`], ms.
pub const HIT_WINDOW_MS: u64 = 2000;

/// Speed penalty right after an impact at full storm intensity.
pub const HIT_PENALTY: f32 = 0.4;

/// Wind acceleration at full intensity, units/s².
pub const WIND_FORCE: f32 = 60.0;

/// Ambient weather type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum WeatherKind {
    /// No effect.
    #[default]
    Clear,
    /// Slower and slicker.
    Rain,
    /// Much slower and much slicker.
    Snow,
    /// Constant push in one direction.
    Wind {
        /// Direction the wind blows toward, radians.
        angle: f32,
    },
    /// Mild ambient slowdown plus a decaying penalty after every impact.
    Storm,
}

/// Weather setting: a type and an intensity in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Weather {
    /// Weather type.
    pub kind: WeatherKind,
    /// Strength, clamped to `[0, 1]` when read.
    pub intensity: f32,
}

impl Weather {
    /// Create a weather setting.
    #[must_use]
    pub const fn new(kind: WeatherKind, intensity: f32) -> Self {
        Self { kind, intensity }
    }

    /// Clear skies.
    pub const CLEAR: Self = Self::new(WeatherKind::Clear, 0.0);

    /// Intensity clamped to `[0, 1]`; non-finite reads as zero.
    #[must_use]
    pub fn intensity(&self) -> f32 {
        finite_or(self.intensity, 0.0).clamp(0.0, 1.0)
    }

    /// Ambient modifiers before any per-racer effect.
    #[must_use]
    pub fn ambient(&self) -> EnvModifiers {
        let i = self.intensity();
        match self.kind {
            WeatherKind::Clear | WeatherKind::Wind { .. } => EnvModifiers::NEUTRAL,
            WeatherKind::Rain => EnvModifiers {
                speed: 1.0 - 0.25 * i,
                slip: 1.0 + 0.6 * i,
            },
            WeatherKind::Snow => EnvModifiers {
                speed: 1.0 - 0.4 * i,
                slip: 1.0 + i,
            },
            WeatherKind::Storm => EnvModifiers {
                speed: 1.0 - 0.1 * i,
                slip: 1.0,
            },
        }
    }

    /// Velocity change from wind over `dt_secs`.
    #[must_use]
    pub fn wind_impulse(&self, dt_secs: f32) -> Vec2 {
        match self.kind {
            WeatherKind::Wind { angle } if angle.is_finite() => {
                Vec2::from_angle(angle) * WIND_FORCE * self.intensity() * dt_secs
            }
            _ => Vec2::ZERO,
        }
    }

    /// Speed penalty for a racer hit `elapsed_ms` ago.
    ///
    /// Only storms penalise impacts. The penalty falls linearly from
    /// `HIT_PENALTY × intensity` to exactly zero at [`HIT_WINDOW_MS`] and
    /// stays zero afterward.
    #[must_use]
    pub fn impact_penalty(&self, elapsed_ms: u64) -> f32 {
        if !matches!(self.kind, WeatherKind::Storm) || elapsed_ms >= HIT_WINDOW_MS {
            return 0.0;
        }
        let remaining = 1.0 - elapsed_ms as f32 / HIT_WINDOW_MS as f32;
        (HIT_PENALTY * self.intensity() * remaining).max(0.0)
    }
}

/// Recompute `racer.modifiers` for the tick starting at `now_ms` and apply
/// wind to its velocity.
pub fn apply_environment(racer: &mut Racer, weather: &Weather, now_ms: u64, dt_secs: f32) {
    let mut modifiers = weather.ambient();

    if let Some(hit) = racer.status.last_hit_ms {
        let elapsed = now_ms.saturating_sub(hit);
        modifiers.speed *= 1.0 - weather.impact_penalty(elapsed);
        if elapsed >= HIT_WINDOW_MS {
            racer.status.last_hit_ms = None;
        }
    }

    modifiers.speed *= racer.speed_scale;
    modifiers.speed *= racer.ability.boost_multiplier();
    modifiers.speed *= racer.status.slow_factor(now_ms);
    if racer.status.is_stunned(now_ms) {
        modifiers.speed = 0.0;
    }

    racer.modifiers = EnvModifiers {
        speed: modifiers.speed.max(0.0),
        slip: modifiers.slip.max(1.0),
    };

    if !racer.status.is_stunned(now_ms) {
        racer.velocity += weather.wind_impulse(dt_secs);
    }
}
