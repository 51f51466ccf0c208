//! Replay harness: run the same race more than once and compare hashes.
//!
//! Races use `f32` math, so identical hashes are only expected from the same
//! build on the same machine. What can still break replay within a build:
//!
//! - **Bucket order**: grid cells live in a `HashMap` with a randomized
//!   hasher, so every query sorts its ids before anyone iterates them.
//! - **Clocks**: `Simulation` keeps its own millisecond counter and never
//!   looks at the host clock.
//! - **Float summation order**: racers and obstacles are always visited in
//!   index order, so sums accumulate identically.
//!
//! The tests below go from a single racer up to randomized arenas
//! (proptest) and several races on scoped threads at once.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use race_core::simulation::Simulation;

/// Final hashes of repeated runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Every run ended on the same hash.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Ticks per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Distinct hashes, sorted. One entry when the runs agree.
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Fail the test with every hash listed if the runs disagree.
    ///
    /// # Panics
    ///
    /// Panics when more than one distinct hash was seen.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Race replay diverged\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Final hashes of races run side by side on threads.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// One hash per thread, in spawn order.
    pub hashes: Vec<u64>,
    /// Ticks per race.
    pub ticks: u64,
    /// Threads used.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Every thread ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Fail the test with every hash listed if the threads disagree.
    ///
    /// # Panics
    ///
    /// Panics when more than one distinct hash was seen.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Threaded races diverged\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Build a fresh state `runs` times, step each one `ticks` times, and
/// collect the final hashes.
///
/// Generic over the state so the harness itself can be tested on plain
/// counters.
///
/// # Example
///
/// ```
/// use race_core::environment::Weather;
/// use race_test_utils::determinism::verify_determinism;
/// use race_test_utils::fixtures::{build, busy_race};
///
/// let result = verify_determinism(
///     3,
///     100,
///     || build(busy_race(20, Weather::default())),
///     |sim| { sim.tick(); },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Two runs from the same setup must end on the same [`Simulation::state_hash`].
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    );
    result.is_deterministic
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches drift that only shows up under thread scheduling or memory
/// layout differences.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Step two copies of a race in lockstep and report the first tick whose hashes differ.
///
/// # Returns
///
/// `None` if the runs stay identical, `Some(tick)` for the first tick whose
/// state hashes differ (0 means they differed before any tick).
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    find_first_divergence_with(&setup_fn, &setup_fn, num_ticks, |_, _| {})
}

/// Like [`find_first_divergence`] but with two different setups and a
/// per-tick driver that runs before each tick, e.g. to issue activation
/// requests or change the weather.
pub fn find_first_divergence_with<A, B, Drive>(
    setup_a: A,
    setup_b: B,
    num_ticks: u64,
    drive: Drive,
) -> Option<u64>
where
    A: Fn() -> Simulation,
    B: Fn() -> Simulation,
    Drive: Fn(&mut Simulation, u64),
{
    let mut sim1 = setup_a();
    let mut sim2 = setup_b();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        drive(&mut sim1, tick);
        drive(&mut sim2, tick);
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// `DefaultHasher` digest of a value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation testing.
///
/// These strategies generate random but reproducible arenas.
pub mod strategies {
    use proptest::prelude::*;
    use race_core::ability::{AbilityKind, AbilityTiming};
    use race_core::config::{RacerConfig, RacerOverrides};
    use race_core::environment::{Weather, WeatherKind};
    use race_core::math::Vec2;
    use race_core::obstacle::Obstacle;

    use crate::fixtures::ability_rotation;

    /// A coordinate inside a 1000 × 1000 arena.
    pub fn arb_coord() -> impl Strategy<Value = f32> {
        0.0f32..1000.0
    }

    /// A point inside a 1000 × 1000 arena.
    pub fn arb_point() -> impl Strategy<Value = Vec2> {
        (arb_coord(), arb_coord()).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// A velocity up to 300 units/s in any direction.
    pub fn arb_velocity() -> impl Strategy<Value = Vec2> {
        (0.0f32..std::f32::consts::TAU, 0.0f32..300.0)
            .prop_map(|(angle, speed)| Vec2::from_angle(angle) * speed)
    }

    /// A racer radius.
    pub fn arb_radius() -> impl Strategy<Value = f32> {
        2.0f32..20.0
    }

    /// Any ability from the roster with default parameters.
    pub fn arb_ability() -> impl Strategy<Value = AbilityKind> {
        let roster = ability_rotation();
        (0..roster.len()).prop_map(move |i| roster[i])
    }

    /// Short timings so a few hundred ticks cycle through every phase.
    pub fn arb_timing() -> impl Strategy<Value = AbilityTiming> {
        (0u32..200, 0u32..600, 0u32..800).prop_map(|(a, d, c)| AbilityTiming::new(a, d, c))
    }

    /// Optional per-racer overrides.
    pub fn arb_overrides() -> impl Strategy<Value = RacerOverrides> {
        (
            proptest::option::of(0.5f32..1.5),
            proptest::option::of(1u32..200),
            proptest::option::of(0.0f32..1.0),
        )
            .prop_map(|(speed, hp, luck)| RacerOverrides { speed, hp, luck })
    }

    /// A fully configured racer.
    pub fn arb_racer() -> impl Strategy<Value = RacerConfig> {
        (
            arb_point(),
            arb_velocity(),
            arb_radius(),
            arb_ability(),
            proptest::option::of(arb_timing()),
            arb_overrides(),
        )
            .prop_map(|(position, velocity, radius, ability, timing, overrides)| {
                RacerConfig {
                    position,
                    velocity,
                    radius,
                    ability,
                    timing,
                    overrides,
                }
            })
    }

    /// A list of racers.
    pub fn arb_racer_list(max_racers: usize) -> impl Strategy<Value = Vec<RacerConfig>> {
        proptest::collection::vec(arb_racer(), 1..max_racers)
    }

    /// Any obstacle kind with sensible dimensions.
    pub fn arb_obstacle() -> impl Strategy<Value = Obstacle> {
        prop_oneof![
            (arb_point(), 10.0f32..120.0, 10.0f32..120.0, 0.0f32..5.0).prop_map(
                |(min, w, h, corner_radius)| Obstacle::Rect {
                    min,
                    max: min + Vec2::new(w, h),
                    corner_radius,
                }
            ),
            (arb_point(), 5.0f32..60.0, 5.0f32..60.0, -3.2f32..3.2).prop_map(
                |(center, hx, hy, angle)| Obstacle::RotatedRect {
                    center,
                    half_extents: Vec2::new(hx, hy),
                    angle,
                    corner_radius: 0.0,
                }
            ),
            (arb_point(), arb_point(), 1.0f32..15.0)
                .prop_map(|(a, b, radius)| Obstacle::Capsule { a, b, radius }),
            (arb_point(), 5.0f32..60.0, -3.2f32..3.2).prop_map(|(center, radius, facing)| {
                Obstacle::Semicircle {
                    center,
                    radius,
                    facing,
                }
            }),
            (arb_point(), 20.0f32..80.0, 5.0f32..30.0, -3.2f32..3.2, 0.3f32..6.0).prop_map(
                |(center, inner_radius, width, angle, span)| Obstacle::ArcBand {
                    center,
                    inner_radius,
                    outer_radius: inner_radius + width,
                    angle,
                    span,
                }
            ),
        ]
    }

    /// Any weather.
    pub fn arb_weather() -> impl Strategy<Value = Weather> {
        let kind = prop_oneof![
            Just(WeatherKind::Clear),
            Just(WeatherKind::Rain),
            Just(WeatherKind::Snow),
            (-3.2f32..3.2).prop_map(|angle| WeatherKind::Wind { angle }),
            Just(WeatherKind::Storm),
        ];
        (kind, 0.0f32..=1.0).prop_map(|(kind, intensity)| Weather::new(kind, intensity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use race_core::ability::{AbilityKind, MissileParams};
    use race_core::config::{RaceSetup, SimConfig};
    use race_core::environment::{Weather, WeatherKind};

    use crate::fixtures::{build, busy_race, mixed_obstacles, racer_at, walled_arena};

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_unique_hashes_reports_divergence() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![3, 1, 3],
            ticks: 10,
        };
        assert_eq!(result.unique_hashes(), vec![1, 3]);
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(7u32, "racer")), compute_hash(&(7u32, "racer")));
        assert_ne!(compute_hash(&7u32), compute_hash(&8u32));
    }

    #[test]
    fn test_empty_simulation_determinism() {
        assert!(verify_simulation_determinism(
            || build(RaceSetup::default()),
            100
        ));
    }

    #[test]
    fn test_single_racer_determinism() {
        assert!(verify_simulation_determinism(
            || {
                build(RaceSetup {
                    obstacles: walled_arena(400.0, 300.0),
                    racers: vec![racer_at(50.0, 50.0, 230.0, 170.0)],
                    ..RaceSetup::default()
                })
            },
            500,
        ));
    }

    #[test]
    fn test_find_divergence_on_deterministic_sim() {
        let divergence = find_first_divergence(|| build(busy_race(12, Weather::default())), 200);
        assert!(divergence.is_none(), "Expected no divergence");
    }

    #[test]
    fn test_find_divergence_reports_first_differing_tick() {
        let setup = || build(busy_race(6, Weather::default()));
        let divergence = find_first_divergence_with(setup, setup, 50, |sim, tick| {
            if tick == 20 {
                sim.set_weather(Weather::new(WeatherKind::Storm, 0.8));
            }
        });
        // Both runs receive the same driver, so they still agree.
        assert!(divergence.is_none());

        let calm = || build(busy_race(6, Weather::default()));
        let windy = || build(busy_race(6, Weather::new(WeatherKind::Wind { angle: 0.0 }, 1.0)));
        assert_eq!(find_first_divergence_with(calm, windy, 50, |_, _| {}), Some(0));
    }

    // =========================================================================
    // Integration tests: full races
    // =========================================================================

    #[test]
    fn test_busy_race_determinism_in_every_weather() {
        let weathers = [
            Weather::default(),
            Weather::new(WeatherKind::Rain, 0.7),
            Weather::new(WeatherKind::Snow, 1.0),
            Weather::new(WeatherKind::Wind { angle: 2.0 }, 0.5),
            Weather::new(WeatherKind::Storm, 0.9),
        ];
        for weather in weathers {
            let result = verify_determinism(
                3,
                300,
                || build(busy_race(30, weather)),
                |sim| {
                    sim.tick();
                },
                Simulation::state_hash,
            );
            result.assert_deterministic();
        }
    }

    #[test]
    fn test_events_are_identical_between_runs() {
        let mut sim1 = build(busy_race(24, Weather::new(WeatherKind::Storm, 0.5)));
        let mut sim2 = build(busy_race(24, Weather::new(WeatherKind::Storm, 0.5)));
        for _ in 0..200 {
            assert_eq!(sim1.tick(), sim2.tick());
        }
    }

    #[test]
    fn test_missile_duel_is_deterministic() {
        let setup = || {
            let shooter = |x: f32| {
                racer_at(x, 200.0, 0.0, 40.0).with_ability(AbilityKind::Missile(MissileParams {
                    damage: 35,
                    ..MissileParams::default()
                }))
            };
            build(RaceSetup {
                config: SimConfig {
                    auto_activate: true,
                    ..SimConfig::default()
                },
                obstacles: walled_arena(600.0, 400.0),
                racers: vec![shooter(100.0), shooter(400.0)],
                ..RaceSetup::default()
            })
        };
        let result = verify_determinism(
            4,
            1500,
            setup,
            |sim| {
                sim.tick();
            },
            Simulation::state_hash,
        );
        result.assert_deterministic();
    }

    // =========================================================================
    // Parallel tests
    // =========================================================================

    #[test]
    fn test_parallel_busy_races() {
        let result =
            run_parallel_simulations_scoped(|| build(busy_race(20, Weather::default())), 4, 200);
        result.assert_deterministic();
        assert_eq!(result.hashes.len(), 4);
    }

    // =========================================================================
    // Property-based tests using proptest
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Random arenas replay identically.
        #[test]
        fn prop_random_races_are_deterministic(
            racers in strategies::arb_racer_list(16),
            obstacles in proptest::collection::vec(strategies::arb_obstacle(), 0..8),
            weather in strategies::arb_weather(),
            auto_activate in any::<bool>(),
        ) {
            let setup = move || {
                build(RaceSetup {
                    config: SimConfig { auto_activate, ..SimConfig::default() },
                    weather,
                    obstacles: obstacles.clone(),
                    racers: racers.clone(),
                })
            };
            let result = verify_determinism(2, 120, setup, |s| { s.tick(); }, Simulation::state_hash);
            prop_assert!(result.is_deterministic);
        }

        /// Positions and velocities stay finite whatever the arena.
        #[test]
        fn prop_state_stays_finite(
            racers in strategies::arb_racer_list(12),
            weather in strategies::arb_weather(),
        ) {
            let mut sim = build(RaceSetup {
                config: SimConfig { auto_activate: true, ..SimConfig::default() },
                weather,
                obstacles: mixed_obstacles(),
                racers,
            });
            for _ in 0..200 {
                sim.tick();
            }
            for racer in sim.racers() {
                prop_assert!(racer.position.is_finite());
                prop_assert!(racer.velocity.is_finite());
            }
        }
    }

    // =========================================================================
    // Stress tests (only run explicitly with --ignored)
    // =========================================================================

    #[test]
    #[ignore = "Long-running stress test"]
    fn stress_test_many_racers() {
        let result = verify_determinism(
            3,
            2000,
            || build(busy_race(400, Weather::new(WeatherKind::Rain, 0.5))),
            |s| {
                s.tick();
            },
            Simulation::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    #[ignore = "Long-running stress test"]
    fn stress_test_parallel_many_simulations() {
        let result = run_parallel_simulations_scoped(
            || build(busy_race(100, Weather::new(WeatherKind::Storm, 1.0))),
            16,
            1000,
        );
        result.assert_deterministic();
    }
}
