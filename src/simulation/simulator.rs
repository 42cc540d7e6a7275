//! Per-projectile frame integration and the catch-up loop.
//!
//! [`simulate_frame`] moves one projectile by one physics step and classifies what it hit.
//! [`simulate_projectile`] repeats fixed ticks until the projectile has caught up with the
//! driver's clock, running conditions and actions after every tick.

use tracing::{debug, trace};

use super::actions::{ActionRecord, ProjectileAction};
use super::collision::{
    CollisionMask, CollisionResult, final_worm_collision, handle_terrain_collision,
    map_bounds_collision, terrain_collision,
};
use super::descriptor::{AnimType, ProjectileDescriptor, TrailKind};
use super::event_log::EntityKind;
use super::events::EventOccurInfo;
use super::geometry::{fmod_positive, length2, vec2};
use super::projectile::{Projectile, ProjectileId};
use super::terrain::TerrainMap;
use super::time::SimTime;
use super::world::SimContext;
use super::worm::Worm;

/// Squared speed drift that triggers a check-step recomputation.
pub const CHECK_SPEED_DRIFT: i32 = 50_000;

/// Shortest sub-step in seconds.
pub const MIN_SUBSTEP: f32 = 0.001;

/// Seconds between smoke trail puffs.
const SMOKE_TRAIL_INTERVAL: f32 = 0.075;

/// Seconds between spark and explosion trail sprites.
const SPARK_TRAIL_INTERVAL: f32 = 0.05;

/// Result of one physics frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    /// What the projectile hit.
    pub collision: CollisionResult,
    /// Seconds of the frame that were actually travelled. Shorter than the frame when a
    /// collision cut it short.
    pub used_dt: f32,
}

/// Advances one projectile by `dt` seconds and detects collisions.
///
/// Fast projectiles are split into sub-steps so that no single move skips over thin terrain.
/// Splitting stops at the first collision.
///
/// # Arguments
///
/// * `prj` - Projectile to move
/// * `desc` - Its descriptor
/// * `dt` - Frame length in seconds
/// * `map` - Terrain
/// * `worms` - Worm table
pub fn simulate_frame(
    prj: &mut Projectile,
    desc: &ProjectileDescriptor,
    dt: f32,
    map: &dyn TerrainMap,
    worms: &[Worm],
) -> FrameOutcome {
    let mut used_dt = 0.0;
    let collision = frame(prj, desc, dt, map, worms, &mut used_dt);
    FrameOutcome { collision, used_dt }
}

fn frame(
    prj: &mut Projectile,
    desc: &ProjectileDescriptor,
    dt: f32,
    map: &dyn TerrainMap,
    worms: &[Worm],
    used_dt: &mut f32,
) -> CollisionResult {
    if desc.changes_speed() {
        let len = length2(prj.velocity) as i32;
        if (len - prj.check_steps.speed_len).abs() > CHECK_SPEED_DRIFT {
            prj.recalculate_check_steps();
        }
    }

    let old_vel = prj.velocity;
    let mut new_vel = prj.velocity;
    new_vel.y += desc.gravity * dt;
    new_vel = new_vel * desc.dampening;

    let speed2 = length2(new_vel);
    if (speed2 * dt * dt) as i32 > prj.check_steps.max2 {
        let step = (prj.check_steps.avg as f32 / speed2.sqrt()).max(MIN_SUBSTEP);
        // Rounding can make the step as long as the frame. Splitting would then recurse
        // forever, so the frame is simulated in one piece instead.
        if step < dt {
            let mut time = 0.0;
            while time < dt {
                let sub = if time + step > dt { dt - time } else { step };
                let res = frame(prj, desc, sub, map, worms, used_dt);
                if res.is_some() {
                    *used_dt += time;
                    return res;
                }
                time += step;
            }
            *used_dt = dt;
            return CollisionResult::None;
        }
    }

    prj.velocity = new_vel;
    *used_dt = dt;
    let frame_old_pos = prj.pos;
    prj.pos = prj.pos + prj.velocity * dt;

    let finish = |prj: &mut Projectile, used_dt: &mut f32, current| {
        final_worm_collision(prj, desc, frame_old_pos, old_vel, worms, dt, used_dt, current)
    };

    if (length2(prj.old_pos - prj.pos) as i32) < prj.check_steps.min2 {
        return finish(prj, used_dt, CollisionResult::None);
    }

    let px = prj.pos.x as i32;
    let py = prj.pos.y as i32;

    if map_bounds_collision(prj, map, px, py) {
        prj.pos = prj.old_pos;
        prj.velocity = old_vel;
        let mask = CollisionMask::TERRAIN | CollisionMask::MAPBORDER;
        return finish(prj, used_dt, CollisionResult::Terrain { mask });
    }

    // Legacy wall shooting: freshly spawned projectiles ignore terrain for a moment.
    if prj.last_sim_time.saturating_sub(prj.spawn_time).seconds() <= desc.wallshoot_time {
        return finish(prj, used_dt, CollisionResult::None);
    }

    let hit = terrain_collision(prj, map, px, py);
    if hit.collided && handle_terrain_collision(prj, desc, &hit, frame_old_pos, old_vel, dt) {
        let mut mask = CollisionMask::TERRAIN;
        if hit.only_dirt {
            mask = mask | CollisionMask::DIRT;
        }
        return finish(prj, used_dt, CollisionResult::Terrain { mask });
    }

    prj.old_pos = prj.pos;
    finish(prj, used_dt, CollisionResult::None)
}

/// Runs one tick of movement plus the per-tick bookkeeping: age, rotation, animation and
/// trails.
///
/// # Arguments
///
/// * `dt` - Physics step in seconds
/// * `prj` - Projectile to advance
/// * `desc` - Its descriptor
/// * `ctx` - Simulation context
/// * `record` - Receives trail spawn and animation end requests
pub fn simulate_low_level(
    dt: f32,
    prj: &mut Projectile,
    desc: &ProjectileDescriptor,
    ctx: &mut SimContext<'_>,
    record: &mut ActionRecord,
) -> CollisionResult {
    let outcome = simulate_frame(prj, desc, dt, &*ctx.map, &*ctx.worms);
    let dt = outcome.used_dt;

    prj.life += dt;
    prj.extra += dt;

    if desc.rotating {
        prj.rotation = fmod_positive(prj.rotation + desc.rot_speed * dt, 360.0);
    }

    if desc.animating {
        if prj.frame_forward {
            prj.frame += desc.anim_rate * dt;
        } else {
            prj.frame -= desc.anim_rate * dt;
        }

        if desc.frame_count > 0 {
            let frames = desc.frame_count as f32;
            if prj.frame >= frames {
                match desc.anim_type {
                    AnimType::Once => record.delete = true,
                    AnimType::Loop => prj.frame = 0.0,
                    AnimType::PingPong => {
                        prj.frame_forward = !prj.frame_forward;
                        prj.frame = frames - 1.0;
                    }
                    AnimType::Unknown => {}
                }
            } else if prj.frame < 0.0 && desc.anim_type == AnimType::PingPong {
                prj.frame_forward = !prj.frame_forward;
                prj.frame = 0.0;
            }
        }
    }

    let still = vec2(0.0, 0.0);
    match desc.trail.kind {
        TrailKind::Smoke | TrailKind::ChemSmoke if prj.extra >= SMOKE_TRAIL_INTERVAL => {
            prj.extra = 0.0;
            let kind = if desc.trail.kind == TrailKind::Smoke {
                EntityKind::Smoke
            } else {
                EntityKind::ChemSmoke
            };
            ctx.hooks.spawn_entity(kind, prj.pos, still);
        }
        TrailKind::Doomsday if prj.extra >= SPARK_TRAIL_INTERVAL => {
            prj.extra = 0.0;
            ctx.hooks
                .spawn_entity(EntityKind::Doomsday, prj.pos, prj.velocity);
        }
        TrailKind::Explosive if prj.extra >= SPARK_TRAIL_INTERVAL => {
            prj.extra = 0.0;
            ctx.hooks.spawn_entity(EntityKind::Explosion, prj.pos, still);
        }
        TrailKind::Projectile if prj.last_sim_time > prj.last_trail_time => {
            let speed = ctx.params.game_speed;
            let delay = if speed > 0.0 {
                desc.trail.delay / speed
            } else {
                desc.trail.delay
            };
            prj.last_trail_time = prj.last_sim_time.add_secs(delay);
            record.trail_spawn = true;
        }
        _ => {}
    }

    outcome.collision
}

/// Server time in seconds as seen by a projectile that lags behind the driver's clock.
fn step_server_time(server: SimTime, current: SimTime, step: SimTime) -> f32 {
    let lag = current.saturating_sub(step);
    if lag >= server {
        0.0
    } else {
        (server - lag).seconds()
    }
}

/// Advances one projectile tick by tick until it has caught up with `current_time`.
///
/// Every tick runs the legacy timer, moves the projectile, applies the terrain or worm hit
/// action, checks the generic condition/action pairs and executes the collected effects. The
/// loop ends early when the projectile is deleted. The projectile is refiled in the spatial
/// index once, after the loop.
pub fn simulate_projectile(current_time: SimTime, id: ProjectileId, ctx: &mut SimContext<'_>) {
    let Some(mut prj) = ctx.projectiles.take(id) else {
        return;
    };
    let content = ctx.content;
    let desc = content.get(prj.descriptor);
    let tick = ctx.params.tick();
    let dt = ctx.params.physics_dt();

    let mut deleted = false;
    while prj.last_sim_time + tick <= current_time {
        prj.last_sim_time += tick;
        let mut record = ActionRecord::default();
        let server_time = step_server_time(ctx.server_time, current_time, prj.last_sim_time);

        desc.timer.check_and_apply(
            EventOccurInfo::unspecified(server_time, dt),
            &mut prj,
            &mut record,
            ctx,
        );

        let result = simulate_low_level(dt, &mut prj, desc, ctx, &mut record);
        trace!(
            id = id.0,
            x = prj.pos.x,
            y = prj.pos.y,
            ?result,
            "projectile step"
        );

        let ev = EventOccurInfo::with_collision(server_time, dt, result);
        match result {
            CollisionResult::Terrain { .. } => {
                desc.hit.apply_to(&ev, &mut prj, &mut record, ctx);
            }
            CollisionResult::Worm { worm } if !record.explode => {
                let own_worm = prj.owner == Some(worm);
                let too_early = prj.ignore_worm_before > prj.last_sim_time;
                if !(own_worm && too_early) || ctx.params.new_net {
                    desc.ply_hit.apply_to(&ev, &mut prj, &mut record, ctx);
                }
            }
            _ => {}
        }

        for pair in &desc.actions {
            pair.check_and_apply(&ev, &mut prj, &mut record, ctx);
        }

        record.execute(&mut prj, desc, current_time, ctx);
        if record.delete {
            deleted = true;
            break;
        }
    }

    if deleted {
        debug!(id = id.0, x = prj.pos.x, y = prj.pos.y, "projectile deleted");
        ctx.hooks.projectile_deleted(id, prj.pos);
        ctx.projectiles.discard(id);
    } else {
        ctx.projectiles.restore(prj);
    }
}
