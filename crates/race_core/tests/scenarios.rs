//! End-to-end race scenarios driven through the public API.

use race_core::ability::{ChainStunParams, ShieldParams};
use race_core::environment::{HIT_PENALTY, HIT_WINDOW_MS};
use race_core::events::{ContactTarget, EffectKind};
use race_core::prelude::*;
use race_test_utils::fixtures::{build, busy_race, mixed_obstacles, racer_at, walled_arena};

fn one_racer(racer: RacerConfig, obstacles: Vec<Obstacle>, weather: Weather) -> Simulation {
    build(RaceSetup {
        weather,
        obstacles,
        racers: vec![racer],
        ..RaceSetup::default()
    })
}

// ============================================================================
// Containment
// ============================================================================

#[test]
fn racers_stay_inside_a_walled_arena() {
    let mut sim = build(RaceSetup {
        obstacles: walled_arena(400.0, 300.0),
        racers: (0..12)
            .map(|i| {
                let v = Vec2::from_angle(i as f32) * 250.0;
                racer_at(40.0 + 25.0 * i as f32, 60.0, v.x, v.y)
            })
            .collect(),
        ..RaceSetup::default()
    });

    for _ in 0..1000 {
        sim.tick();
    }
    for racer in sim.racers() {
        assert!(racer.position.x > 0.0 && racer.position.x < 400.0, "{racer:?}");
        assert!(racer.position.y > 0.0 && racer.position.y < 300.0, "{racer:?}");
    }
}

#[test]
fn wall_contacts_carry_obstacle_indices() {
    let mut sim = build(busy_race(40, Weather::default()));
    let mut touched = std::collections::BTreeSet::new();
    for _ in 0..3000 {
        for c in sim.tick().collisions {
            if let ContactTarget::Obstacle(index) = c.target {
                touched.insert(index);
            }
        }
    }
    // The four walls are hit by a fast crowd within a minute of race time.
    for wall in 0..4 {
        assert!(touched.contains(&wall), "wall {wall} never touched");
    }
    assert!(touched.iter().all(|&i| (i as usize) < mixed_obstacles().len()));
}

// ============================================================================
// Geometry scenarios
// ============================================================================

#[test]
fn capsule_contact_pushes_racer_clear() {
    let capsule = Obstacle::Capsule {
        a: Vec2::ZERO,
        b: Vec2::new(100.0, 0.0),
        radius: 10.0,
    };
    let contact = capsule.test_circle(Vec2::new(50.0, 5.0), 10.0);
    assert!(contact.hit);
    assert!((contact.normal - Vec2::Y).length() < 1e-6);
    assert!((contact.penetration - 15.0).abs() < 1e-5);

    let mut sim = one_racer(
        RacerConfig::new(Vec2::new(50.0, 5.0), Vec2::ZERO, 10.0),
        vec![capsule.clone()],
        Weather::default(),
    );
    let events = sim.tick();
    assert_eq!(events.collisions.len(), 1);
    let r = sim.racer(0).unwrap();
    assert!(!capsule.test_circle(r.position, r.radius).hit);
}

#[test]
fn arc_band_ignores_racers_outside_its_span() {
    let band = Obstacle::ArcBand {
        center: Vec2::ZERO,
        inner_radius: 80.0,
        outer_radius: 100.0,
        angle: 0.0,
        span: std::f32::consts::FRAC_PI_2,
    };
    // On the ring radius but straight behind the span.
    let mut sim = one_racer(
        RacerConfig::new(Vec2::new(-90.0, 0.0), Vec2::ZERO, 6.0),
        vec![band.clone()],
        Weather::default(),
    );
    assert!(sim.tick().collisions.is_empty());

    // Same radius inside the span collides.
    let mut sim = one_racer(
        RacerConfig::new(Vec2::new(90.0, 0.0), Vec2::ZERO, 6.0),
        vec![band],
        Weather::default(),
    );
    assert_eq!(sim.tick().collisions.len(), 1);
}

// ============================================================================
// Status effects
// ============================================================================

#[test]
fn repeated_chain_stun_refreshes_slow() {
    let caster = racer_at(0.0, 0.0, 0.0, 0.0)
        .with_ability(AbilityKind::ChainStun(ChainStunParams {
            max_jumps: 1,
            stun_ms: 0,
            slow_ms: 3000,
            ..ChainStunParams::default()
        }))
        .with_timing(AbilityTiming::new(0, 0, 1000));
    let mut sim = build(RaceSetup {
        racers: vec![caster, racer_at(60.0, 0.0, 0.0, 0.0)],
        ..RaceSetup::default()
    });

    sim.request_activation(0).unwrap();
    sim.tick();
    let first = sim.racer(1).unwrap().status.slow_remaining_ms(sim.time_ms());
    assert_eq!(first, 3000);

    // Wait out the cooldown, then cast again.
    while sim.racer(0).unwrap().ability.status() != AbilityStatus::Ready {
        sim.tick();
    }
    assert!(sim.request_activation(0).unwrap());
    sim.tick();
    let second = sim.racer(1).unwrap().status.slow_remaining_ms(sim.time_ms());
    assert_eq!(second, 3000);
}

#[test]
fn storm_penalty_fades_out_after_impact() {
    let wall = Obstacle::Rect {
        min: Vec2::new(30.0, -100.0),
        max: Vec2::new(50.0, 100.0),
        corner_radius: 0.0,
    };
    let mut sim = one_racer(
        RacerConfig::new(Vec2::new(20.0, 0.0), Vec2::new(200.0, 0.0), 8.0),
        vec![wall],
        Weather::new(WeatherKind::Storm, 1.0),
    );
    let ambient = 0.9;

    let events = sim.tick();
    assert_eq!(events.collisions.len(), 1);
    let hit_at = sim.time_ms();

    // Contacts are stamped with the end of the tick, so the next tick starts
    // with the full penalty.
    assert_eq!(sim.racer(0).unwrap().status.last_hit_ms, Some(hit_at));
    sim.tick();
    let speed = sim.racer(0).unwrap().modifiers.speed;
    let expected = ambient * (1.0 - HIT_PENALTY);
    assert!((speed - expected).abs() < 1e-5, "{speed} vs {expected}");

    // Tick until the window has passed; the penalty must be gone for good.
    while sim.time_ms() <= hit_at + HIT_WINDOW_MS {
        sim.tick();
    }
    assert!((sim.racer(0).unwrap().modifiers.speed - ambient).abs() < 1e-6);
    assert_eq!(sim.racer(0).unwrap().status.last_hit_ms, None);
}

#[test]
fn shield_holds_its_ground() {
    let shield = racer_at(0.0, 0.0, 0.0, 0.0)
        .with_ability(AbilityKind::Shield(ShieldParams { knockback: 80.0 }))
        .with_timing(AbilityTiming::new(0, 2000, 1000));
    let rammer = racer_at(40.0, 0.0, -300.0, 0.0);
    let mut sim = build(RaceSetup {
        racers: vec![shield, rammer],
        ..RaceSetup::default()
    });
    sim.request_activation(0).unwrap();

    let mut contact = false;
    for _ in 0..20 {
        contact |= sim
            .tick()
            .collisions
            .iter()
            .any(|c| c.target == ContactTarget::Racer(1));
    }
    assert!(contact);
    assert_eq!(sim.racer(0).unwrap().position, Vec2::ZERO);
    assert!(sim.racer(1).unwrap().velocity.x > 0.0);
}

#[test]
fn second_wind_blocks_the_first_stun_only() {
    let caster = racer_at(0.0, 0.0, 0.0, 0.0)
        .with_ability(AbilityKind::ChainStun(ChainStunParams {
            max_jumps: 1,
            ..ChainStunParams::default()
        }))
        .with_timing(AbilityTiming::new(0, 0, 100));
    let survivor = racer_at(50.0, 0.0, 0.0, 0.0).with_ability(AbilityKind::SecondWind);
    let mut sim = build(RaceSetup {
        racers: vec![caster, survivor],
        ..RaceSetup::default()
    });

    let mut outcomes = Vec::new();
    for _ in 0..30 {
        let _ = sim.request_activation(0);
        for e in sim.tick().effects {
            if matches!(e.kind, EffectKind::Stunned { .. } | EffectKind::StunBlocked) {
                outcomes.push(e.kind);
            }
        }
    }
    assert_eq!(outcomes[0], EffectKind::StunBlocked);
    assert!(matches!(outcomes[1], EffectKind::Stunned { .. }));
    assert!(outcomes[2..]
        .iter()
        .all(|k| matches!(k, EffectKind::Stunned { .. })));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn race_runs_from_ron_text() {
    let mut sim = Simulation::from_ron_str(
        r#"(
            config: (policy: SpeedPreserving, auto_activate: true),
            weather: (kind: Rain, intensity: 0.5),
            obstacles: [
                Rect(min: (-20.0, -20.0), max: (420.0, 0.0)),
                Semicircle(center: (200.0, 150.0), radius: 30.0, facing: 0.0),
            ],
            racers: [
                (position: (50.0, 50.0), velocity: (0.0, -100.0), radius: 8.0,
                 ability: Ghost),
                (position: (80.0, 50.0), velocity: (-60.0, 0.0), radius: 8.0,
                 ability: Magnet((radius: 120.0, strength: 90.0)),
                 overrides: (speed: Some(1.2), luck: Some(0.5))),
            ],
        )"#,
    )
    .unwrap();
    assert_eq!(sim.racers().len(), 2);
    let mut collisions = 0;
    for _ in 0..120 {
        collisions += sim.tick().collisions.len();
    }
    assert!(collisions > 0);
    assert!(sim.snapshot().iter().all(|s| s.position.is_finite()));
}

#[test]
fn bad_ron_is_a_config_error() {
    assert!(matches!(
        Simulation::from_ron_str("(racers: 5)"),
        Err(SimError::ConfigParse(_))
    ));
    assert!(matches!(
        Simulation::from_ron_str("(config: (dt_ms: 0))"),
        Err(SimError::InvalidConfig(_))
    ));
}
