#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use ballistics::simulation::content::{ContentError, ContentRegistry};
use ballistics::simulation::event_log::EventLog;
use ballistics::simulation::geometry::vec2;
use ballistics::simulation::params::{Params, ParamsError};
use ballistics::simulation::projectile::Projectile;
use ballistics::simulation::spawn::{Shot, SpawnInfo};
use ballistics::simulation::terrain::{PX_DIRT, PixelMap};
use ballistics::simulation::time::SimTime;
use ballistics::simulation::world::World;
use ballistics::simulation::worm::Worm;
use std::fs;

const ASSETS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/weapons.json");

fn create_test_params() -> Params {
    Params {
        tick_ms: 10,
        game_speed: 1.5,
        team_game: true,
        new_net: false,
        random_seed: 42,
    }
}

fn create_test_world() -> World<PixelMap, EventLog> {
    let content = ContentRegistry::from_file(ASSETS).expect("Failed to load content");
    let mut map = PixelMap::new(320, 200, 4, 4);
    map.fill_rect(0, 170, 319, 199, PX_DIRT);
    let worms = vec![Worm::new(vec2(40.0, 160.0), 0), Worm::new(vec2(280.0, 160.0), 1)];
    World::new(create_test_params(), content, map, worms, EventLog::new())
}

#[test]
fn test_save_and_load_params() {
    let params = create_test_params();
    let save_path = "test_params.json";

    params.save_to_file(save_path).expect("Failed to save params");
    let loaded = Params::load_from_file(save_path).expect("Failed to load params");

    assert_eq!(loaded, params);

    fs::remove_file(save_path).ok();
}

#[test]
fn test_params_missing_fields_use_defaults() {
    let save_path = "test_params_partial.json";
    fs::write(save_path, r#"{ "game_speed": 2.0 }"#).expect("Failed to write test file");

    let loaded = Params::load_from_file(save_path).expect("Failed to load params");

    assert_eq!(loaded.game_speed, 2.0);
    assert_eq!(loaded.tick_ms, Params::default().tick_ms);
    assert_eq!(loaded.tick(), SimTime::from_millis(10));
    assert!((loaded.physics_dt() - 0.02).abs() < 1e-6);

    fs::remove_file(save_path).ok();
}

#[test]
fn test_load_nonexistent_file() {
    assert!(matches!(
        Params::load_from_file("nonexistent_params.json"),
        Err(ParamsError::Io(_))
    ));
    assert!(matches!(
        ContentRegistry::from_file("nonexistent_content.json"),
        Err(ContentError::Io(_))
    ));
}

#[test]
fn test_load_invalid_json() {
    let invalid_path = "test_invalid_content.json";
    fs::write(invalid_path, "{ this is not valid json }").expect("Failed to write test file");

    let result = ContentRegistry::from_file(invalid_path);
    assert!(matches!(result, Err(ContentError::Json(_))));

    fs::remove_file(invalid_path).ok();
}

#[test]
fn test_load_invalid_params() {
    let invalid_path = "test_invalid_params.json";
    fs::write(invalid_path, r#"{ "tick_ms": "fast" }"#).expect("Failed to write test file");

    let result = Params::load_from_file(invalid_path);
    assert!(matches!(result, Err(ParamsError::Json(_))));
    let message = result.unwrap_err().to_string();
    assert!(message.starts_with("malformed params"), "{message}");

    fs::remove_file(invalid_path).ok();
}

#[test]
fn test_projectile_snapshot_survives_json() {
    let mut world = create_test_world();
    let mut shot = Shot {
        pos: vec2(40.0, 160.0),
        angle: -60,
        worm_velocity: vec2(0.0, 0.0),
        worm: Some(0),
        random: 11,
    };
    let spawn = SpawnInfo {
        projectile: "cluster".to_string(),
        amount: 3,
        speed: 90.0,
        spread: 40.0,
        ..SpawnInfo::default()
    };
    world.fire(&mut shot, &spawn).expect("Failed to fire");
    world.advance(SimTime::from_millis(500));

    let snapshot = world.snapshot();
    assert_eq!(snapshot.len(), 3);

    let json = serde_json::to_string(&snapshot).expect("Failed to serialize");
    let loaded: Vec<Projectile> = serde_json::from_str(&json).expect("Failed to deserialize");

    for (original, loaded) in snapshot.iter().zip(loaded.iter()) {
        assert_eq!(original.id, loaded.id);
        assert_eq!(original.descriptor, loaded.descriptor);
        assert_eq!(original.last_sim_time, loaded.last_sim_time);
        assert!((original.pos.x - loaded.pos.x).abs() < 0.001);
        assert!((original.pos.y - loaded.pos.y).abs() < 0.001);
        assert_eq!(original.timers, loaded.timers);
    }
}
