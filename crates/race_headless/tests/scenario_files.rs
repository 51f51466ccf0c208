//! Scenario files driven end to end through the headless runner.

use std::io::Write;

use race_core::environment::{Weather, WeatherKind};
use race_headless::{verify_determinism, HeadlessRunner, Scenario, ScenarioError};
use race_test_utils::determinism::verify_simulation_determinism;
use race_test_utils::fixtures::{build, busy_race};

fn busy_scenario(weather: Weather) -> Scenario {
    Scenario {
        name: "busy".to_string(),
        description: "Fixture race".to_string(),
        ticks: 300,
        setup: busy_race(30, weather),
    }
}

fn write_scenario(dir: &tempfile::TempDir, scenario: &Scenario) -> std::path::PathBuf {
    let path = dir.path().join(format!("{}.ron", scenario.name));
    let text = ron::ser::to_string_pretty(scenario, ron::ser::PrettyConfig::default()).unwrap();
    std::fs::File::create(&path)
        .unwrap()
        .write_all(text.as_bytes())
        .unwrap();
    path
}

#[test]
fn scenario_file_plays_like_the_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = busy_scenario(Weather::new(WeatherKind::Wind { angle: 0.7 }, 0.6));
    let path = write_scenario(&dir, &scenario);

    let loaded = Scenario::resolve(path.to_str().unwrap()).unwrap();
    let mut runner = HeadlessRunner::new(loaded).unwrap();
    let mut out = Vec::new();
    let played = runner.play(None, &mut out).unwrap();

    let mut direct = build(scenario.setup.clone());
    for _ in 0..scenario.ticks {
        direct.tick();
    }
    assert_eq!(played, direct.state_hash());

    let text = String::from_utf8(out).unwrap();
    assert!(text.lines().last().unwrap().contains(r#""type":"done""#));
}

#[test]
fn loaded_scenarios_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    for kind in [WeatherKind::Snow, WeatherKind::Storm] {
        let path = write_scenario(&dir, &busy_scenario(Weather::new(kind, 1.0)));
        let scenario = Scenario::load(&path).unwrap();

        assert!(verify_simulation_determinism(
            || scenario.build().unwrap(),
            scenario.ticks
        ));
        let report = verify_determinism(&scenario, scenario.ticks, 3).unwrap();
        assert!(report.is_deterministic());
    }
}

#[test]
fn broken_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    std::fs::write(&path, "Scenario(name: 5)").unwrap();
    assert!(matches!(
        Scenario::load(&path),
        Err(ScenarioError::ParseError(_))
    ));

    let missing = dir.path().join("missing.ron");
    assert!(matches!(
        Scenario::resolve(missing.to_str().unwrap()),
        Err(ScenarioError::FileNotFound(_))
    ));
}
