#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use ballistics::simulation::collision::{
    COL_BOTTOM, COL_LEFT, COL_RIGHT, COL_TOP, CollisionMask, CollisionResult,
    map_bounds_collision, terrain_collision,
};
use ballistics::simulation::content::ContentRegistry;
use ballistics::simulation::event_log::{EventLog, SimulationEvent};
use ballistics::simulation::geometry::{Vec2, vec2};
use ballistics::simulation::params::Params;
use ballistics::simulation::projectile::{Projectile, ProjectileId, SpawnRequest};
use ballistics::simulation::random::FixedRandom;
use ballistics::simulation::simulator::simulate_frame;
use ballistics::simulation::terrain::{PX_DIRT, PX_ROCK, PixelMap, TerrainMap};
use ballistics::simulation::time::SimTime;
use ballistics::simulation::world::World;
use ballistics::simulation::worm::Worm;
use serde_json::json;

fn create_test_content() -> ContentRegistry {
    let content = json!({
        "projectiles": [
            {
                "name": "ball",
                "hit": { "kind": "Bounce", "bounce_coeff": 0.5 }
            },
            {
                "name": "shell",
                "hit": { "kind": "Explode", "damage": 5 },
                "ply_hit": { "kind": "Injure", "damage": 7 }
            }
        ]
    });
    ContentRegistry::from_json(&content.to_string()).unwrap()
}

/// 100x100 map with a dirt floor from row 50 down.
fn create_floor_map() -> PixelMap {
    let mut map = PixelMap::new(100, 100, 4, 4);
    map.fill_rect(0, 50, 99, 99, PX_DIRT);
    map
}

fn create_projectile(
    content: &ContentRegistry,
    name: &str,
    pos: Vec2,
    velocity: Vec2,
) -> Projectile {
    let id = content.id_of(name).unwrap();
    let request = SpawnRequest {
        descriptor: id,
        pos,
        velocity,
        rotation: 0,
        owner: None,
        random_index: 0,
        spawn_time: SimTime::ZERO,
        ignore_worm_before: SimTime::ZERO,
    };
    Projectile::new(ProjectileId(0), content.get(id), request, &FixedRandom::new(1))
}

fn spawn(
    world: &mut World<PixelMap, EventLog>,
    name: &str,
    pos: Vec2,
    velocity: Vec2,
    owner: Option<usize>,
) -> ProjectileId {
    let descriptor = world.content().id_of(name).unwrap();
    world.spawn(SpawnRequest {
        descriptor,
        pos,
        velocity,
        rotation: 0,
        owner,
        random_index: 0,
        spawn_time: world.time(),
        ignore_worm_before: world.time(),
    })
}

#[test]
fn test_map_bounds_inside_and_outside() {
    let content = create_test_content();
    let map = PixelMap::new(100, 100, 4, 4);
    let mut prj = create_projectile(&content, "ball", vec2(50.0, 50.0), vec2(0.0, 0.0));

    assert!(!map_bounds_collision(&mut prj, &map, 50, 50));
    assert_eq!(prj.collision_side, 0);

    // Touching the border from inside is not a hit.
    assert!(!map_bounds_collision(&mut prj, &map, 1, 98));

    assert!(map_bounds_collision(&mut prj, &map, 0, 50));
    assert_eq!(prj.collision_side, COL_LEFT);

    assert!(map_bounds_collision(&mut prj, &map, 99, 99));
    assert_eq!(prj.collision_side, COL_RIGHT | COL_BOTTOM);

    assert!(map_bounds_collision(&mut prj, &map, 50, -3));
    assert_eq!(prj.collision_side, COL_TOP);
}

#[test]
fn test_map_bounds_is_idempotent() {
    let content = create_test_content();
    let map = PixelMap::new(100, 100, 4, 4);
    let mut prj = create_projectile(&content, "ball", vec2(0.0, 0.0), vec2(0.0, 0.0));

    let first = map_bounds_collision(&mut prj, &map, -5, 120);
    let side = prj.collision_side;
    let second = map_bounds_collision(&mut prj, &map, -5, 120);

    assert_eq!(first, second);
    assert_eq!(prj.collision_side, side);
    assert_eq!(side, COL_LEFT | COL_BOTTOM);
}

#[test]
fn test_terrain_counts_per_side() {
    let content = create_test_content();
    let map = create_floor_map();
    let prj = create_projectile(&content, "ball", vec2(50.0, 49.0), vec2(0.0, 0.0));

    // 3x3 box at (50, 49): the bottom row lies in the floor.
    let hit = terrain_collision(&prj, &map, 50, 49);
    assert!(hit.collided);
    assert!(hit.only_dirt);
    assert_eq!(hit.bottom, 3);
    assert_eq!(hit.top, 0);
    assert_eq!(hit.left, 1);
    assert_eq!(hit.right, 1);

    let clear = terrain_collision(&prj, &map, 50, 40);
    assert!(!clear.collided);
    assert_eq!(clear.bottom + clear.top + clear.left + clear.right, 0);
}

#[test]
fn test_terrain_rock_is_not_dirt() {
    let content = create_test_content();
    let mut map = PixelMap::new(100, 100, 4, 4);
    map.fill_rect(0, 50, 99, 99, PX_ROCK);
    let prj = create_projectile(&content, "ball", vec2(50.0, 50.0), vec2(0.0, 0.0));

    let hit = terrain_collision(&prj, &map, 50, 50);
    assert!(hit.collided);
    assert!(!hit.only_dirt);
}

#[test]
fn test_bounce_off_floor() {
    let content = create_test_content();
    let params = Params::default();
    let mut world = World::new(params, content, create_floor_map(), Vec::new(), EventLog::new());
    let id = spawn(&mut world, "ball", vec2(50.0, 40.0), vec2(0.0, 50.0), None);

    world.advance(SimTime::from_millis(300));

    let prj = world.projectile(id).unwrap();
    assert!((prj.velocity.y + 25.0).abs() < 1e-3, "vy = {}", prj.velocity.y);
    assert!(prj.velocity.x.abs() < 1e-6);
    assert!(prj.pos.y < 49.0);
}

#[test]
fn test_bounce_keeps_horizontal_direction() {
    let content = create_test_content();
    let params = Params::default();
    let mut world = World::new(params, content, create_floor_map(), Vec::new(), EventLog::new());
    let id = spawn(&mut world, "ball", vec2(30.0, 40.0), vec2(10.0, 50.0), None);

    world.advance(SimTime::from_millis(300));

    let prj = world.projectile(id).unwrap();
    assert!(prj.velocity.y < 0.0);
    assert!((prj.velocity.x - 5.0).abs() < 1e-3, "vx = {}", prj.velocity.x);
}

#[test]
fn test_simulate_frame_reports_dirt_hit() {
    let content = create_test_content();
    let map = create_floor_map();
    let mut prj = create_projectile(&content, "shell", vec2(50.0, 48.0), vec2(0.0, 100.0));
    prj.last_sim_time = SimTime::from_millis(10);
    let desc = content.get(prj.descriptor);

    let outcome = simulate_frame(&mut prj, desc, 0.01, &map, &[]);

    match outcome.collision {
        CollisionResult::Terrain { mask } => {
            assert!(mask.contains(CollisionMask::TERRAIN));
            assert!(mask.contains(CollisionMask::DIRT));
            assert!(!mask.contains(CollisionMask::MAPBORDER));
        }
        other => panic!("expected terrain hit, got {other:?}"),
    }
}

#[test]
fn test_simulate_frame_reports_map_border() {
    let content = create_test_content();
    let map = PixelMap::new(100, 100, 4, 4);
    let mut prj = create_projectile(&content, "shell", vec2(97.0, 50.0), vec2(300.0, 0.0));
    prj.last_sim_time = SimTime::from_millis(10);
    let desc = content.get(prj.descriptor);

    let outcome = simulate_frame(&mut prj, desc, 0.01, &map, &[]);

    let mask = outcome.collision.terrain_mask().unwrap();
    assert!(mask.contains(CollisionMask::MAPBORDER));
    // The projectile is put back to its last good position.
    assert_eq!(prj.pos, vec2(97.0, 50.0));
}

#[test]
fn test_worm_hit_injures_and_deletes() {
    let content = create_test_content();
    let params = Params::default();
    let worms = vec![Worm::new(vec2(60.0, 30.0), 0)];
    let map = PixelMap::new(100, 100, 4, 4);
    let mut world = World::new(params, content, map, worms, EventLog::new());
    let id = spawn(&mut world, "shell", vec2(20.0, 30.0), vec2(200.0, 0.0), None);

    world.advance(SimTime::from_millis(500));

    assert!(world.projectile(id).is_none());
    let injuries: Vec<_> = world
        .hooks()
        .events()
        .iter()
        .filter_map(|e| match e {
            SimulationEvent::WormInjured { worm, damage, .. } => Some((*worm, *damage)),
            _ => None,
        })
        .collect();
    assert_eq!(injuries, vec![(0, 7)]);
}

#[test]
fn test_owner_is_ignored_during_grace_period() {
    let content = create_test_content();
    let params = Params::default();
    let worms = vec![Worm::new(vec2(30.0, 30.0), 0)];
    let map = PixelMap::new(100, 100, 4, 4);
    let mut world = World::new(params, content, map, worms, EventLog::new());

    let descriptor = world.content().id_of("shell").unwrap();
    let id = world.spawn(SpawnRequest {
        descriptor,
        pos: vec2(30.0, 30.0),
        velocity: vec2(0.0, 0.0),
        rotation: 0,
        owner: Some(0),
        random_index: 0,
        spawn_time: SimTime::ZERO,
        ignore_worm_before: SimTime::from_millis(1_000),
    });

    world.advance(SimTime::from_millis(200));
    assert!(world.projectile(id).is_some());
    assert!(
        !world
            .hooks()
            .events()
            .iter()
            .any(|e| matches!(e, SimulationEvent::WormInjured { .. }))
    );

    world.advance(SimTime::from_millis(1_200));
    assert!(world.projectile(id).is_none());
}

#[test]
fn test_carve_and_place_dirt() {
    let mut map = create_floor_map();
    let before = map.count(PX_DIRT);

    let removed = map.carve_hole(3, vec2(50.0, 60.0));
    assert!(removed > 0);
    assert_eq!(map.count(PX_DIRT), before - removed as usize);

    let placed = map.place_dirt(3, vec2(50.0, 60.0));
    assert_eq!(placed, removed);
    assert_eq!(map.count(PX_DIRT), before);

    map.fill_rect(0, 0, 10, 10, PX_ROCK);
    assert_eq!(map.carve_hole(4, vec2(5.0, 5.0)), 0);
    assert_eq!(map.pixel_flags(-1, 5), 0);
}
