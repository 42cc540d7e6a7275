//! Live projectile state.
//!
//! A projectile references its immutable descriptor by id and carries everything that changes
//! while it flies: kinematics, clocks, per-condition timer progress and cosmetic state.

use serde::{Deserialize, Serialize};

use super::collision::{COL_BOTTOM, COL_LEFT, COL_RIGHT, COL_TOP};
use super::content::DescriptorId;
use super::descriptor::ProjectileDescriptor;
use super::geometry::{IVec2, Shape, ShapeKind, Vec2, length2, to_pixel};
use super::random::FixedRandom;
use super::time::SimTime;

/// Health every projectile starts with.
pub const INITIAL_HEALTH: i32 = 100;

/// Stable identifier of a live projectile. Ids grow monotonically and are never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ProjectileId(pub u64);

/// Progress of one repeating timer condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    /// Number of times the timer elapsed.
    pub count: i32,
    /// Clock value of the last elapse (age or scaled server time, depending on the timer).
    pub last: f32,
}

/// Displacement thresholds that drive adaptive sub-stepping.
///
/// Distances are in pixels; the squared forms are what the integrator compares against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSteps {
    /// Squared displacement below which a step skips collision tests.
    pub min2: i32,
    /// Squared displacement above which a step is split into sub-steps.
    pub max2: i32,
    /// Target displacement of one sub-step.
    pub avg: i32,
    /// Squared speed the thresholds were computed for.
    pub speed_len: i32,
}

impl CheckSteps {
    /// Picks thresholds for a velocity. Faster projectiles tolerate larger steps.
    pub fn for_velocity(velocity: Vec2) -> Self {
        let speed_len = length2(velocity) as i32;
        let (min, max, avg) = if speed_len < 14_000 {
            (0, 3, 2)
        } else if speed_len < 75_000 {
            (1, 4, 2)
        } else if speed_len < 250_000 {
            (2, 5, 3)
        } else {
            (4, 6, 4)
        };
        Self {
            min2: min * min,
            max2: max * max,
            avg,
            speed_len,
        }
    }
}

/// Everything needed to create a projectile.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    /// Projectile type.
    pub descriptor: DescriptorId,
    /// Spawn position.
    pub pos: Vec2,
    /// Initial velocity.
    pub velocity: Vec2,
    /// Initial sprite rotation in degrees.
    pub rotation: i32,
    /// Owning worm.
    pub owner: Option<usize>,
    /// Index into the fixed random table.
    pub random_index: i32,
    /// Simulation time of the spawn.
    pub spawn_time: SimTime,
    /// Collisions with the owner are ignored before this time.
    pub ignore_worm_before: SimTime,
}

/// A live projectile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Identifier.
    pub id: ProjectileId,
    /// Projectile type.
    pub descriptor: DescriptorId,
    /// Hit box kind, copied from the descriptor.
    pub shape: ShapeKind,
    /// Current position.
    pub pos: Vec2,
    /// Last position confirmed free of collisions.
    pub old_pos: Vec2,
    /// Current velocity.
    pub velocity: Vec2,
    /// Current hit box radius. Never negative.
    pub radius: IVec2,
    /// Age in seconds.
    pub life: f32,
    /// Free running clock used by visual trails.
    pub extra: f32,
    /// Owning worm.
    pub owner: Option<usize>,
    /// Index into the fixed random table.
    pub random_index: i32,
    /// Fixed random sample of this projectile, in `[-1, 1)`.
    pub random_float: f32,
    /// Sample used for the legacy timer jitter.
    pub time_var_random: f32,
    /// Legacy timer already fired.
    pub legacy_timer_fired: bool,
    /// One entry per repeating timer condition of the descriptor.
    pub timers: Vec<TimerState>,
    /// Sprite rotation in degrees.
    pub rotation: f32,
    /// Animation frame.
    pub frame: f32,
    /// Animation runs forwards.
    pub frame_forward: bool,
    /// Side bits of the most recent border or terrain collision.
    pub collision_side: u8,
    /// Health, reduced by projectile injuries.
    pub health: i32,
    /// Simulation time of the spawn.
    pub spawn_time: SimTime,
    /// Simulation time this projectile has been advanced to.
    pub last_sim_time: SimTime,
    /// Collisions with the owner are ignored before this time.
    pub ignore_worm_before: SimTime,
    /// Next projectile trail spawn is due after this time.
    pub last_trail_time: SimTime,
    /// Adaptive sub-stepping thresholds.
    pub check_steps: CheckSteps,
}

impl Projectile {
    /// Creates a projectile from a spawn request.
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier assigned by the pool
    /// * `desc` - Descriptor of `request.descriptor`
    /// * `request` - Spawn parameters
    /// * `random` - Fixed random table used to draw the projectile's samples
    pub fn new(
        id: ProjectileId,
        desc: &ProjectileDescriptor,
        request: SpawnRequest,
        random: &FixedRandom,
    ) -> Self {
        let sample = random.get(request.random_index);
        Self {
            id,
            descriptor: request.descriptor,
            shape: desc.shape,
            pos: request.pos,
            old_pos: request.pos,
            velocity: request.velocity,
            radius: desc.radius,
            life: 0.0,
            extra: 0.0,
            owner: request.owner,
            random_index: request.random_index,
            random_float: sample,
            time_var_random: sample,
            legacy_timer_fired: false,
            timers: vec![TimerState::default(); desc.timer_slots()],
            rotation: request.rotation as f32,
            frame: 0.0,
            frame_forward: true,
            collision_side: 0,
            health: INITIAL_HEALTH,
            spawn_time: request.spawn_time,
            last_sim_time: request.spawn_time,
            ignore_worm_before: request.ignore_worm_before,
            last_trail_time: request.spawn_time,
            check_steps: CheckSteps::for_velocity(request.velocity),
        }
    }

    /// Pixel position.
    pub fn pixel_pos(&self) -> IVec2 {
        to_pixel(self.pos)
    }

    /// Hit box at the current position.
    pub fn hit_shape(&self) -> Shape {
        Shape::new(self.shape, self.pixel_pos(), self.radius)
    }

    /// Recomputes the sub-stepping thresholds for the current velocity.
    pub fn recalculate_check_steps(&mut self) {
        self.check_steps = CheckSteps::for_velocity(self.velocity);
    }

    /// Reflects the velocity off the sides recorded in the last terrain collision.
    ///
    /// The blocked axis is scaled by `-coeff` and the free axis by `coeff`. When both a
    /// horizontal and a vertical side are set, the horizontal one decides.
    pub fn bounce(&mut self, coeff: f32) {
        let mut x = 1.0;
        let mut y = 1.0;
        if self.collision_side & (COL_TOP | COL_BOTTOM) != 0 {
            x = coeff;
            y = -coeff;
        }
        if self.collision_side & (COL_LEFT | COL_RIGHT) != 0 {
            x = -coeff;
            y = coeff;
        }
        self.velocity.x *= x;
        self.velocity.y *= y;
    }

    /// Reduces health. Health below zero triggers death conditions.
    pub fn injure(&mut self, damage: i32) {
        self.health -= damage;
    }

    /// Whether the projectile has an owning worm.
    pub fn has_owner(&self) -> bool {
        self.owner.is_some()
    }
}
