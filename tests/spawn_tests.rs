#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use ballistics::simulation::content::{ContentError, ContentRegistry};
use ballistics::simulation::event_log::{EventLog, SimulationEvent};
use ballistics::simulation::geometry::{heading_degrees, vec2};
use ballistics::simulation::params::Params;
use ballistics::simulation::projectile::SpawnRequest;
use ballistics::simulation::random::{FIXED_RANDOM_LEN, FixedRandom};
use ballistics::simulation::spawn::{Shot, SpawnInfo};
use ballistics::simulation::terrain::PixelMap;
use ballistics::simulation::time::SimTime;
use ballistics::simulation::world::World;
use serde_json::json;

type TestWorld = World<PixelMap, EventLog>;

fn create_test_world() -> TestWorld {
    let content = json!({
        "projectiles": [
            { "name": "pellet", "hit": { "kind": "Explode", "damage": 1 } },
            {
                "name": "mine",
                "timer": {
                    "time": 0.02,
                    "action": { "kind": "Explode", "damage": 1, "projectiles": true }
                },
                "spawn": {
                    "projectile": "pellet",
                    "amount": 1,
                    "pos_diff": { "x": 3, "y": 0 },
                    "snap_to_grid": { "x": 10, "y": 10 }
                }
            }
        ]
    });
    let content = ContentRegistry::from_json(&content.to_string()).unwrap();
    let map = PixelMap::new(200, 200, 4, 4);
    World::new(Params::default(), content, map, Vec::new(), EventLog::new())
}

fn create_shot(random: i32) -> Shot {
    Shot {
        pos: vec2(50.0, 50.0),
        angle: 0,
        worm_velocity: vec2(0.0, 0.0),
        worm: Some(0),
        random,
    }
}

fn pellets(amount: u32) -> SpawnInfo {
    SpawnInfo {
        projectile: "pellet".to_string(),
        amount,
        speed: 100.0,
        ..SpawnInfo::default()
    }
}

#[test]
fn test_spawn_fan_stays_inside_spread() {
    let mut world = create_test_world();
    let mut shot = create_shot(0);
    let spawn = SpawnInfo {
        spread: 30.0,
        ..pellets(5)
    };

    let ids = world.fire(&mut shot, &spawn).unwrap();

    assert_eq!(ids.len(), 5);
    for id in ids {
        let prj = world.projectile(id).unwrap();
        let mut heading = heading_degrees(prj.velocity);
        if heading > 180.0 {
            heading -= 360.0;
        }
        assert!(heading.abs() <= 15.5, "heading = {heading}");
        assert!((prj.velocity.x.hypot(prj.velocity.y) - 100.0).abs() < 1e-2);
    }
}

#[test]
fn test_shot_random_stream_advances_per_child() {
    let mut world = create_test_world();
    let mut shot = create_shot(7);

    let ids = world.fire(&mut shot, &pellets(3)).unwrap();

    let mut r = 7;
    let mut expected = Vec::new();
    for _ in 0..3 {
        r = (r + 1) % FIXED_RANDOM_LEN;
        r = (r * 5) % FIXED_RANDOM_LEN;
        expected.push(r);
        r = (r + 1) % FIXED_RANDOM_LEN;
    }

    let indices: Vec<i32> = ids
        .iter()
        .map(|id| world.projectile(*id).unwrap().random_index)
        .collect();
    assert_eq!(indices, expected);
    assert_eq!(shot.random, r);

    let table = FixedRandom::new(Params::default().random_seed);
    for id in ids {
        let prj = world.projectile(id).unwrap();
        assert_eq!(prj.random_float, table.get(prj.random_index));
        assert_eq!(prj.time_var_random, prj.random_float);
    }
}

#[test]
fn test_shot_spawns_at_muzzle() {
    let mut world = create_test_world();
    let mut shot = create_shot(0);

    let ids = world.fire(&mut shot, &pellets(1)).unwrap();

    let prj = world.projectile(ids[0]).unwrap();
    assert_eq!(prj.pos, vec2(58.0, 50.0));
    assert_eq!(prj.owner, Some(0));
    assert_eq!(prj.velocity, vec2(100.0, 0.0));
    assert_eq!(prj.ignore_worm_before, SimTime::from_millis(100));
}

#[test]
fn test_shot_adds_worm_velocity() {
    let mut world = create_test_world();
    let mut shot = Shot {
        worm_velocity: vec2(10.0, -4.0),
        ..create_shot(0)
    };
    let spawn = SpawnInfo {
        speed: 0.0,
        add_parent_vel: true,
        parent_vel_factor: 2.0,
        ..pellets(1)
    };

    let ids = world.fire(&mut shot, &spawn).unwrap();

    assert_eq!(world.projectile(ids[0]).unwrap().velocity, vec2(20.0, -8.0));
}

#[test]
fn test_child_position_offset_and_snap() {
    let mut world = create_test_world();
    let descriptor = world.content().id_of("mine").unwrap();
    let pellet = world.content().id_of("pellet").unwrap();
    let mine = world.spawn(SpawnRequest {
        descriptor,
        pos: vec2(52.0, 47.0),
        velocity: vec2(0.0, 0.0),
        rotation: 0,
        owner: Some(1),
        random_index: 4,
        spawn_time: SimTime::ZERO,
        ignore_worm_before: SimTime::ZERO,
    });

    world.advance(SimTime::from_millis(100));
    assert!(world.projectile(mine).is_none());

    let child = world
        .hooks()
        .events()
        .iter()
        .find_map(|e| match e {
            SimulationEvent::Spawned {
                id,
                descriptor,
                pos,
                ..
            } if *descriptor == pellet => Some((*id, *pos)),
            _ => None,
        })
        .unwrap();
    assert_eq!(child.1, vec2(55.0, 45.0));

    let prj = world.projectile(child.0).unwrap();
    assert_eq!(prj.owner, Some(1));
    assert_eq!(prj.random_index, 5);
}

#[test]
fn test_fire_unknown_projectile() {
    let mut world = create_test_world();
    let mut shot = create_shot(0);
    let spawn = SpawnInfo {
        projectile: "missing".to_string(),
        amount: 1,
        ..SpawnInfo::default()
    };

    let res = world.fire(&mut shot, &spawn);

    assert!(matches!(res, Err(ContentError::UnknownProjectile { .. })));
    assert!(world.projectiles().is_empty());
}

#[test]
fn test_shot_random_stream_wraps_large_index() {
    let mut world = create_test_world();
    let mut shot = create_shot(i32::MAX);

    let ids = world.fire(&mut shot, &pellets(1)).unwrap();

    // i32::MAX is 127 modulo the table length: 127 + 1 = 128, 128 * 5 = 130, 130 + 1 = 131.
    assert_eq!(world.projectile(ids[0]).unwrap().random_index, 130);
    assert_eq!(shot.random, 131);
}

#[test]
fn test_random_index_helpers_wrap() {
    assert_eq!(FixedRandom::advance(254, 1), 0);
    assert_eq!(FixedRandom::advance(-1, 1), 0);
    assert_eq!(FixedRandom::advance(i32::MAX, i32::MAX), 254);
    assert_eq!(FixedRandom::scale(i32::MAX, 5), 130);
}

#[test]
fn test_zero_amount_spawns_nothing() {
    let mut world = create_test_world();
    let mut shot = create_shot(9);

    let ids = world.fire(&mut shot, &pellets(0)).unwrap();

    assert!(ids.is_empty());
    assert_eq!(shot.random, 9);
}
