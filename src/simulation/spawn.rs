//! Child projectile generation.
//!
//! A spawn description is applied to a parent, either a shot fired by a worm or a projectile.
//! The parent decides where children start, which velocity they inherit and which random
//! samples they draw. The order in which a shot's random stream advances is part of the
//! network protocol and must not change.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::content::DescriptorId;
use super::geometry::{
    IVec2, Vec2, direction_from_angle, heading_degrees, ivec2, to_float, to_pixel, vec2,
};
use super::projectile::{Projectile, ProjectileId, SpawnRequest};
use super::random::FixedRandom;
use super::time::SimTime;
use super::world::SimContext;

/// Distance in front of the worm at which shots appear.
pub const SHOT_MUZZLE_DISTANCE: f32 = 8.0;

/// Grace period during which shots ignore collisions with their owner.
pub const SHOT_OWNER_GRACE: SimTime = SimTime(100);

/// Parameters for spawning a group of child projectiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnInfo {
    /// Name of the projectile to spawn. Empty for none.
    pub projectile: String,
    /// Resolved `projectile`, set at load time.
    #[serde(skip)]
    pub target: Option<DescriptorId>,
    /// Number of children.
    pub amount: u32,
    /// Base speed.
    pub speed: f32,
    /// Speed jitter, scaled by the parent's random sample.
    pub speed_var: f32,
    /// Base angle in degrees.
    pub angle: f32,
    /// Full width of the random cone around the direction, in degrees.
    pub spread: f32,
    /// Add the parent heading to `angle`.
    pub use_angle: bool,
    /// Use the scaled parent velocity as direction instead of an angle.
    pub use_parent_velocity_for_spread: bool,
    /// Scale for the parent velocity when it is used as direction.
    pub parent_vel_spread_factor: f32,
    /// Apply the speed jitter along `(1, 1)` instead of the direction.
    pub diagonal_speed_var: bool,
    /// Add the scaled parent velocity.
    pub add_parent_vel: bool,
    /// Scale for the added parent velocity.
    pub parent_vel_factor: f32,
    /// Start with a random sprite rotation.
    pub random_rotation: bool,
    /// Offset from the parent position.
    pub pos_diff: IVec2,
    /// Snap the start position to the centre of cells of this size. Disabled below 1.
    pub snap_to_grid: IVec2,
}

impl Default for SpawnInfo {
    fn default() -> Self {
        Self {
            projectile: String::new(),
            target: None,
            amount: 0,
            speed: 0.0,
            speed_var: 0.0,
            angle: 0.0,
            spread: 0.0,
            use_angle: true,
            use_parent_velocity_for_spread: false,
            parent_vel_spread_factor: 1.0,
            diagonal_speed_var: false,
            add_parent_vel: false,
            parent_vel_factor: 1.0,
            random_rotation: false,
            pos_diff: IVec2::default(),
            snap_to_grid: IVec2::default(),
        }
    }
}

/// A weapon discharge by a worm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    /// Worm position.
    pub pos: Vec2,
    /// Aim angle in whole degrees.
    pub angle: i32,
    /// Worm velocity at the time of the shot.
    pub worm_velocity: Vec2,
    /// Firing worm.
    pub worm: Option<usize>,
    /// Random stream index. Advanced while children are spawned.
    pub random: i32,
}

/// Origin of a spawn.
#[derive(Debug)]
pub enum SpawnParent<'p> {
    /// Fired by a worm. The shot's random stream advances per child.
    Shot(&'p mut Shot),
    /// Spawned by a projectile.
    Projectile(&'p Projectile),
}

impl SpawnParent<'_> {
    fn owner(&self) -> Option<usize> {
        match self {
            Self::Shot(shot) => shot.worm,
            Self::Projectile(prj) => prj.owner,
        }
    }

    fn random_index(&self) -> i32 {
        match self {
            Self::Shot(shot) => shot.random,
            Self::Projectile(prj) => FixedRandom::advance(prj.random_index, 1),
        }
    }

    fn random_float(&self, random: &FixedRandom) -> f32 {
        match self {
            Self::Shot(shot) => random.get(shot.random),
            Self::Projectile(prj) => prj.random_float,
        }
    }

    fn position(&self) -> Vec2 {
        match self {
            Self::Shot(shot) => {
                shot.pos + direction_from_angle(shot.angle as f32) * SHOT_MUZZLE_DISTANCE
            }
            Self::Projectile(prj) => prj.pos,
        }
    }

    fn velocity(&self) -> Vec2 {
        match self {
            Self::Shot(shot) => shot.worm_velocity,
            Self::Projectile(prj) => prj.velocity,
        }
    }

    /// Heading in degrees; 0° is `+x`.
    fn angle(&self) -> f32 {
        match self {
            Self::Shot(shot) => shot.angle as f32,
            Self::Projectile(prj) => heading_degrees(prj.velocity),
        }
    }

    fn advance_stream(&mut self, f: impl FnOnce(i32) -> i32) {
        if let Self::Shot(shot) = self {
            shot.random = f(shot.random);
        }
    }
}

/// Snaps a coordinate to the centre of its cell.
fn snap(value: i32, cell: i32) -> i32 {
    value - value % cell + cell / 2
}

impl SpawnInfo {
    /// Spawns the children for one parent.
    ///
    /// # Arguments
    ///
    /// * `parent` - Shot or projectile the children originate from
    /// * `spawn_time` - Simulation time the children are created at
    /// * `ctx` - Simulation context receiving the new projectiles
    ///
    /// # Returns
    ///
    /// Ids of the new projectiles, in creation order.
    pub fn apply(
        &self,
        mut parent: SpawnParent<'_>,
        spawn_time: SimTime,
        ctx: &mut SimContext<'_>,
    ) -> Vec<ProjectileId> {
        let Some(target) = self.target else {
            return Vec::new();
        };
        let random = ctx.random;
        let content = ctx.content;
        let child = content.get(target);
        let heading = if self.use_angle { parent.angle() } else { 0.0 };

        let mut spawned = Vec::with_capacity(self.amount as usize);
        for _ in 0..self.amount {
            let direction = if self.use_parent_velocity_for_spread {
                parent.velocity() * self.parent_vel_spread_factor
            } else {
                let r = parent.random_float(random);
                let angle = (self.angle + heading + r * self.spread / 2.0) as i32;
                direction_from_angle(angle as f32)
            };

            let mut rotation = 0;
            if self.random_rotation && child.rotating {
                let increment = child.rot_increment.max(1);
                rotation = ctx.rng.random_range(0..=360 / increment) * increment;
            }

            parent.advance_stream(|r| FixedRandom::advance(r, 1));

            let mut velocity = direction * self.speed;
            let jitter_dir = if self.diagonal_speed_var {
                vec2(1.0, 1.0)
            } else {
                direction
            };
            velocity = velocity + jitter_dir * (self.speed_var * parent.random_float(random));
            if self.add_parent_vel {
                velocity = velocity + parent.velocity() * self.parent_vel_factor;
            }

            parent.advance_stream(|r| FixedRandom::scale(r, 5));

            let ignore_worm_before = match &parent {
                SpawnParent::Projectile(prj) => prj.ignore_worm_before,
                SpawnParent::Shot(_) => spawn_time + SHOT_OWNER_GRACE,
            };

            let mut pos = to_pixel(parent.position()) + self.pos_diff;
            if self.snap_to_grid.x >= 1 && self.snap_to_grid.y >= 1 {
                pos = ivec2(
                    snap(pos.x, self.snap_to_grid.x),
                    snap(pos.y, self.snap_to_grid.y),
                );
            }

            let id = ctx.spawn_projectile(SpawnRequest {
                descriptor: target,
                pos: to_float(pos),
                velocity,
                rotation,
                owner: parent.owner(),
                random_index: parent.random_index(),
                spawn_time,
                ignore_worm_before,
            });
            spawned.push(id);

            parent.advance_stream(|r| FixedRandom::advance(r, 1));
        }

        debug!(
            projectile = %self.projectile,
            count = spawned.len(),
            time = spawn_time.millis(),
            "spawned children"
        );
        spawned
    }
}
