use ballistics::simulation::content::ContentRegistry;
use ballistics::simulation::event_log::{EventLog, SimulationEvent};
use ballistics::simulation::geometry::vec2;
use ballistics::simulation::params::Params;
use ballistics::simulation::spawn::{Shot, SpawnInfo};
use ballistics::simulation::terrain::{PX_DIRT, PX_ROCK, PixelMap};
use ballistics::simulation::time::SimTime;
use ballistics::simulation::world::World;
use ballistics::simulation::worm::Worm;
use tracing::{error, info};

const CONTENT_PATH: &str = "assets/weapons.json";

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let content = match ContentRegistry::from_file(CONTENT_PATH) {
        Ok(content) => content,
        Err(e) => {
            error!(error = %e, path = CONTENT_PATH, "failed to load content");
            std::process::exit(1);
        }
    };

    let params = Params::default();

    // Rock floor with a dirt hill in the middle.
    let mut map = PixelMap::new(320, 200, 4, 4);
    map.fill_rect(0, 180, 319, 199, PX_ROCK);
    map.fill_rect(120, 140, 200, 179, PX_DIRT);

    let worms = vec![
        Worm::new(vec2(40.0, 170.0), 0),
        Worm::new(vec2(280.0, 170.0), 1),
    ];

    let mut world = World::new(params, content, map, worms, EventLog::new());
    let dirt_before = world.map().count(PX_DIRT);

    for (weapon, angle) in [("bazooka", -30), ("cluster", -50), ("bouncer", -20)] {
        let mut shot = Shot {
            pos: world.worms()[0].pos,
            angle,
            worm_velocity: vec2(0.0, 0.0),
            worm: Some(0),
            random: 0,
        };
        let spawn = SpawnInfo {
            projectile: weapon.to_string(),
            amount: 1,
            speed: 150.0,
            ..SpawnInfo::default()
        };
        match world.fire(&mut shot, &spawn) {
            Ok(ids) => info!(weapon, count = ids.len(), "fired"),
            Err(e) => error!(weapon, error = %e, "cannot fire"),
        }

        let target = world.time() + SimTime::from_millis(5_000);
        world.advance(target);

        for event in world.hooks_mut().drain() {
            match event {
                SimulationEvent::Explosion { pos, damage, .. } => {
                    info!(weapon, x = pos.x, y = pos.y, damage, "explosion");
                }
                SimulationEvent::WormInjured { worm, damage, .. } => {
                    info!(weapon, worm, damage, "worm hit");
                }
                _ => {}
            }
        }
        info!(
            weapon,
            live = world.projectiles().len(),
            time = world.time().millis(),
            "weapon done"
        );
    }

    info!(
        dirt_before,
        dirt_after = world.map().count(PX_DIRT),
        "simulation finished"
    );
}
