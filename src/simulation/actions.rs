//! Actions applied when conditions match, and the per-step mutation record.
//!
//! Actions never touch the world directly. They describe their effects in an
//! [`ActionRecord`], which is executed once at the end of the step. The only exception is a
//! bounce, which reflects the projectile's own velocity immediately so that later actions in
//! the same step see the reflected direction.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::collision::CollisionMask;
use super::descriptor::ProjectileDescriptor;
use super::events::EventOccurInfo;
use super::geometry::{IVec2, Mat2, Vec2, normalize, vec2};
use super::projectile::{Projectile, ProjectileId};
use super::spawn::{SpawnInfo, SpawnParent};
use super::time::SimTime;
use super::world::SimContext;
use super::worm::{nearest_enemy_worm, nearest_other_worm, nearest_team_mate, nearest_worm};

/// Speed at which a hit worm is pushed along the projectile's flight direction, per second.
pub const WORM_PUSH_SPEED: f32 = 100.0;

/// Kind of an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Explode with `damage` and delete the projectile.
    Explode,
    /// Reflect off the collided sides, optionally with a small explosion.
    Bounce,
    /// Carve a hole of radius `damage` and delete the projectile.
    Carve,
    /// Place dirt and delete the projectile.
    Dirt,
    /// Place green dirt and delete the projectile.
    GreenDirt,
    /// Delete the projectile unless a worm was hit.
    Disappear,
    /// Delete the projectile.
    DisappearAlways,
    /// Injure the hit worm and delete the projectile.
    Injure,
    /// Injure every projectile collected by projectile-hit conditions.
    InjureProjectiles,
    /// Play a sound.
    PlaySound,
    /// Pass through at `go_through_speed`.
    GoThrough,
    /// No effect of its own.
    #[default]
    Nothing,
    /// Unrecognised action from newer content. No effect.
    #[serde(other)]
    Unknown,
}

/// Homing modifiers. Each value is the maximum turn in degrees per application; zero disables
/// that modifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Steering {
    /// Turn towards the nearest worm.
    pub next_worm: f32,
    /// Turn towards the owner.
    pub owner: f32,
    /// Turn towards the nearest worm that is not the owner.
    pub next_other_worm: f32,
    /// Turn towards the nearest enemy of the owner.
    pub next_enemy_worm: f32,
    /// Turn towards the nearest team mate of the owner.
    pub next_team_mate: f32,
}

impl Steering {
    /// Whether any modifier is enabled.
    pub fn is_active(&self) -> bool {
        self.next_worm != 0.0
            || self.owner != 0.0
            || self.next_other_worm != 0.0
            || self.next_enemy_worm != 0.0
            || self.next_team_mate != 0.0
    }
}

/// An action node with its modifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    /// Primary effect.
    pub kind: ActionKind,
    /// Explosion damage, carve radius or injury amount.
    pub damage: i32,
    /// Spawn projectiles: `spawn` if set, the descriptor's general spawn otherwise.
    pub projectiles: bool,
    /// Explicit spawn target.
    pub spawn: Option<SpawnInfo>,
    /// Screen shake of an explosion.
    pub shake: i32,
    /// Sound to play.
    pub sound: Option<String>,
    /// Velocity scale for bounces.
    pub bounce_coeff: f32,
    /// Damage of an explosion on every bounce. Zero for none.
    pub bounce_explode: i32,
    /// Speed factor while passing through terrain.
    pub go_through_speed: f32,
    /// Added to the projectile radius.
    pub change_radius: IVec2,
    /// Replaces the projectile velocity.
    pub overwrite_own_speed: Option<Vec2>,
    /// Left-multiplied onto the projectile velocity.
    pub change_own_speed: Mat2,
    /// Added to the projectile velocity.
    pub diff_own_speed: Vec2,
    /// Replaces the velocity of hit worms and projectiles.
    pub overwrite_target_speed: Option<Vec2>,
    /// Left-multiplied onto the velocity of hit worms and projectiles.
    pub change_target_speed: Mat2,
    /// Added to the velocity of hit worms and projectiles.
    pub diff_target_speed: Vec2,
    /// Homing modifiers.
    pub steering: Steering,
    /// Evaluated right after this action with the legacy timer flag cleared.
    pub additional: Option<Box<Action>>,
}

impl Default for Action {
    fn default() -> Self {
        Self {
            kind: ActionKind::Nothing,
            damage: 0,
            projectiles: false,
            spawn: None,
            shake: 0,
            sound: None,
            bounce_coeff: 0.5,
            bounce_explode: 0,
            go_through_speed: 1.0,
            change_radius: IVec2::default(),
            overwrite_own_speed: None,
            change_own_speed: Mat2::IDENTITY,
            diff_own_speed: Vec2::default(),
            overwrite_target_speed: None,
            change_target_speed: Mat2::IDENTITY,
            diff_target_speed: Vec2::default(),
            steering: Steering::default(),
            additional: None,
        }
    }
}

impl Action {
    /// Whether this action can have any effect at all.
    pub fn has_action(&self) -> bool {
        self.kind != ActionKind::Nothing
            || self.projectiles
            || self.sound.is_some()
            || self.changes_own_speed()
            || self.changes_target_speed()
            || self.change_radius != IVec2::default()
            || self.additional.as_ref().is_some_and(|a| a.has_action())
    }

    /// Whether this action can alter the projectile's own velocity.
    pub fn changes_own_speed(&self) -> bool {
        self.kind == ActionKind::Bounce
            || self.overwrite_own_speed.is_some()
            || !self.change_own_speed.is_identity()
            || self.diff_own_speed != Vec2::default()
            || self.steering.is_active()
            || self
                .additional
                .as_ref()
                .is_some_and(|a| a.changes_own_speed())
    }

    fn changes_target_speed(&self) -> bool {
        self.overwrite_target_speed.is_some()
            || !self.change_target_speed.is_identity()
            || self.diff_target_speed != Vec2::default()
    }
}

/// Something that contributes effects to a step's [`ActionRecord`].
pub trait ProjectileAction {
    /// Records the effects of this action.
    ///
    /// # Arguments
    ///
    /// * `ev` - Step context, including any data collected by conditions
    /// * `prj` - Projectile being simulated
    /// * `record` - Accumulator for this step
    /// * `ctx` - Simulation context (read only; effects are deferred)
    fn apply_to(
        &self,
        ev: &EventOccurInfo,
        prj: &mut Projectile,
        record: &mut ActionRecord,
        ctx: &SimContext<'_>,
    );
}

/// A velocity change for a hit worm or projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VelocityChange {
    /// Replace the velocity.
    Overwrite(Vec2),
    /// `v = matrix * v + offset`.
    Transform {
        /// Multiplicative part.
        matrix: Mat2,
        /// Additive part.
        offset: Vec2,
    },
}

impl VelocityChange {
    /// Applies the change to a velocity.
    pub fn apply(self, v: Vec2) -> Vec2 {
        match self {
            Self::Overwrite(new) => new,
            Self::Transform { matrix, offset } => matrix * v + offset,
        }
    }
}

/// An effect on something other than the acting projectile, applied during execution.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetEffect {
    /// Carve a hole and credit the removed dirt to the owner.
    CarveHole {
        /// Hole radius.
        radius: i32,
        /// Hole centre.
        pos: Vec2,
    },
    /// Explosion caused by a bounce.
    BounceExplosion {
        /// Explosion centre.
        pos: Vec2,
        /// Damage.
        damage: i32,
    },
    /// Injure a worm.
    InjureWorm {
        /// Worm index.
        worm: usize,
        /// Damage.
        damage: i32,
    },
    /// Injure projectiles.
    InjureProjectiles {
        /// Targets.
        ids: Vec<ProjectileId>,
        /// Damage.
        damage: i32,
    },
    /// Change a worm's velocity.
    WormVelocity {
        /// Worm index.
        worm: usize,
        /// Change to apply.
        change: VelocityChange,
    },
    /// Change the velocity of projectiles.
    ProjectileVelocity {
        /// Targets.
        ids: Vec<ProjectileId>,
        /// Change to apply.
        change: VelocityChange,
    },
}

/// A worm push-back, resolved against the final velocity of the projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushBack {
    /// Worm index.
    pub worm: usize,
    /// Step length in seconds.
    pub dt: f32,
}

/// Everything the matched actions of one step want to happen.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    /// Explode at the end of the step.
    pub explode: bool,
    /// The explosion was caused by the legacy timer.
    pub timer: bool,
    /// Explosion damage.
    pub damage: i32,
    /// Strongest screen shake requested.
    pub shake: i32,
    /// Place dirt.
    pub dirt: bool,
    /// Place green dirt.
    pub green_dirt: bool,
    /// Spawn the trail projectile.
    pub trail_spawn: bool,
    /// Spawn the descriptor's general spawn.
    pub general_spawn: bool,
    /// Explicit spawns.
    pub other_spawns: Vec<SpawnInfo>,
    /// Delete the projectile.
    pub delete: bool,
    /// Sound to play.
    pub sound: Option<String>,
    /// Replacement velocity.
    pub overwrite_own_speed: Option<Vec2>,
    /// Accumulated velocity matrix. Later actions multiply from the left.
    pub change_own_speed: Mat2,
    /// Accumulated velocity offset.
    pub diff_own_speed: Vec2,
    /// Accumulated radius change.
    pub change_radius: IVec2,
    /// Deferred effects on the map, worms and other projectiles, in request order.
    pub target_effects: Vec<TargetEffect>,
    /// Deferred worm push-backs.
    pub push_backs: Vec<PushBack>,
}

impl Default for ActionRecord {
    fn default() -> Self {
        Self {
            explode: false,
            timer: false,
            damage: 0,
            shake: 0,
            dirt: false,
            green_dirt: false,
            trail_spawn: false,
            general_spawn: false,
            other_spawns: Vec::new(),
            delete: false,
            sound: None,
            overwrite_own_speed: None,
            change_own_speed: Mat2::IDENTITY,
            diff_own_speed: Vec2::default(),
            change_radius: IVec2::default(),
            target_effects: Vec::new(),
            push_backs: Vec::new(),
        }
    }
}

/// Rotation that turns the projectile velocity towards a worm by at most `max_angle` degrees.
fn steer_towards(worm_pos: Option<Vec2>, prj: &Projectile, max_angle: f32) -> Mat2 {
    let Some(worm_pos) = worm_pos else {
        return Mat2::IDENTITY;
    };
    let max_angle = max_angle.to_radians();
    let (diff, _) = normalize(worm_pos - prj.pos);
    let relative = Mat2::rotation(diff.x, -diff.y) * prj.velocity;
    let mut angle = relative.y.atan2(relative.x);
    if angle.abs() > max_angle.abs() {
        angle = max_angle * angle.signum();
    }
    Mat2::rotation((-angle).cos(), (-angle).sin())
}

impl ProjectileAction for Action {
    fn apply_to(
        &self,
        ev: &EventOccurInfo,
        prj: &mut Projectile,
        record: &mut ActionRecord,
        ctx: &SimContext<'_>,
    ) {
        let hit_worm = ev.collision.worm();
        let mut push_worm = true;
        let mut spawn_projectiles = self.projectiles;

        match self.kind {
            ActionKind::Explode => {
                record.explode = true;
                record.damage = self.damage;
                if ev.timer_hit {
                    record.timer = true;
                }
                record.shake = record.shake.max(self.shake);
                if self.sound.is_some() {
                    record.sound.clone_from(&self.sound);
                }
            }
            ActionKind::Bounce => {
                if ev.timer_hit {
                    spawn_projectiles = false;
                } else {
                    push_worm = false;
                    prj.bounce(self.bounce_coeff);
                    if self.bounce_explode > 0 {
                        record.target_effects.push(TargetEffect::BounceExplosion {
                            pos: prj.pos,
                            damage: self.bounce_explode,
                        });
                    }
                }
            }
            ActionKind::Carve => {
                if ev.timer_hit || ev.collision.terrain_mask().is_some() {
                    record.target_effects.push(TargetEffect::CarveHole {
                        radius: self.damage,
                        pos: prj.pos,
                    });
                    record.delete = true;
                }
            }
            ActionKind::Dirt | ActionKind::GreenDirt => {
                if self.kind == ActionKind::Dirt {
                    record.dirt = true;
                } else {
                    record.green_dirt = true;
                }
                if ev.timer_hit {
                    record.shake = record.shake.max(self.shake);
                }
            }
            ActionKind::DisappearAlways => record.delete = true,
            ActionKind::Injure | ActionKind::Disappear if hit_worm.is_some() => {
                if let (ActionKind::Injure, Some(worm)) = (self.kind, hit_worm) {
                    record.delete = true;
                    record.target_effects.push(TargetEffect::InjureWorm {
                        worm,
                        damage: self.damage,
                    });
                }
            }
            ActionKind::Injure
            | ActionKind::Disappear
            | ActionKind::GoThrough
            | ActionKind::Nothing => {
                let border = ev
                    .collision
                    .terrain_mask()
                    .is_some_and(|m| m.contains(CollisionMask::MAPBORDER));
                if border {
                    let (w, h) = (ctx.map.width() as f32, ctx.map.height() as f32);
                    let outside_x = prj.pos.x < 0.0 || prj.pos.x > w;
                    let outside_y = prj.pos.y < 0.0 || prj.pos.y > h;
                    if outside_x && outside_y {
                        record.delete = true;
                    }
                }
                push_worm = false;
                if ev.timer_hit {
                    spawn_projectiles = false;
                }
            }
            ActionKind::InjureProjectiles => {
                if !ev.proj_cols.is_empty() {
                    record.target_effects.push(TargetEffect::InjureProjectiles {
                        ids: ev.proj_cols.iter().copied().collect(),
                        damage: self.damage,
                    });
                }
            }
            ActionKind::PlaySound => {
                if self.sound.is_some() {
                    record.sound.clone_from(&self.sound);
                }
            }
            ActionKind::Unknown => {}
        }

        if let (true, Some(worm)) = (push_worm, hit_worm) {
            record.push_backs.push(PushBack { worm, dt: ev.dt });
        }

        if spawn_projectiles {
            match &self.spawn {
                Some(spawn) => record.other_spawns.push(spawn.clone()),
                None => record.general_spawn = true,
            }
        }

        if self.overwrite_own_speed.is_some() {
            record.overwrite_own_speed = self.overwrite_own_speed;
        }
        record.change_own_speed = self.change_own_speed * record.change_own_speed;
        record.diff_own_speed = record.diff_own_speed + self.diff_own_speed;

        let worms = ctx.worms();
        let team_game = ctx.params.team_game;
        let worm_pos = |w: Option<usize>| w.and_then(|i| worms.get(i)).map(|w| w.pos);
        let s = &self.steering;
        if s.next_worm != 0.0 {
            let target = worm_pos(nearest_worm(worms, prj.pos));
            record.change_own_speed =
                steer_towards(target, prj, s.next_worm) * record.change_own_speed;
        }
        if s.owner != 0.0 && prj.has_owner() {
            let target = worm_pos(prj.owner);
            record.change_own_speed = steer_towards(target, prj, s.owner) * record.change_own_speed;
        }
        if s.next_other_worm != 0.0 {
            let target = worm_pos(nearest_other_worm(worms, prj.pos, prj.owner));
            record.change_own_speed =
                steer_towards(target, prj, s.next_other_worm) * record.change_own_speed;
        }
        if s.next_enemy_worm != 0.0 {
            let target = worm_pos(nearest_enemy_worm(worms, prj.pos, prj.owner, team_game));
            record.change_own_speed =
                steer_towards(target, prj, s.next_enemy_worm) * record.change_own_speed;
        }
        if s.next_team_mate != 0.0 {
            let target = worm_pos(nearest_team_mate(worms, prj.pos, prj.owner, team_game));
            record.change_own_speed =
                steer_towards(target, prj, s.next_team_mate) * record.change_own_speed;
        }

        let mut target_changes = Vec::new();
        if let Some(v) = self.overwrite_target_speed {
            target_changes.push(VelocityChange::Overwrite(v));
        }
        if !self.change_target_speed.is_identity() || self.diff_target_speed != Vec2::default() {
            target_changes.push(VelocityChange::Transform {
                matrix: self.change_target_speed,
                offset: self.diff_target_speed,
            });
        }
        for change in target_changes {
            if let Some(worm) = hit_worm {
                record
                    .target_effects
                    .push(TargetEffect::WormVelocity { worm, change });
            }
            if !ev.proj_cols.is_empty() {
                record.target_effects.push(TargetEffect::ProjectileVelocity {
                    ids: ev.proj_cols.iter().copied().collect(),
                    change,
                });
            }
        }

        record.change_radius = record.change_radius + self.change_radius;

        if let Some(next) = &self.additional {
            let mut chained = ev.clone();
            chained.timer_hit = false;
            next.apply_to(&chained, prj, record, ctx);
        }
    }
}

impl ActionRecord {
    /// Whether anything was requested that changes the projectile or the world.
    pub fn has_any_effect(&self) -> bool {
        self.explode
            || self.dirt
            || self.green_dirt
            || self.trail_spawn
            || self.general_spawn
            || !self.other_spawns.is_empty()
            || self.overwrite_own_speed.is_some()
            || !self.change_own_speed.is_identity()
            || self.diff_own_speed != Vec2::default()
            || self.change_radius != IVec2::default()
            || self.delete
    }

    /// Applies the record. This is the only place where a step changes the world.
    ///
    /// # Arguments
    ///
    /// * `prj` - Projectile the record belongs to
    /// * `desc` - Its descriptor
    /// * `current_time` - Time the outer driver is simulating, used for spawns caused by the
    ///   environment
    /// * `ctx` - Simulation context
    pub fn execute(
        &mut self,
        prj: &mut Projectile,
        desc: &ProjectileDescriptor,
        current_time: SimTime,
        ctx: &mut SimContext<'_>,
    ) {
        if self.explode {
            let damage = if self.timer {
                if desc.ply_hit.kind == ActionKind::Explode {
                    desc.ply_hit.damage
                } else {
                    desc.timer.action.damage
                }
            } else {
                self.damage
            };
            if damage != -1 {
                ctx.hooks.explosion(prj.pos, damage, self.shake, prj.owner);
            }
            self.delete = true;
        }

        if self.dirt {
            let mut placed = 0;
            for offset in [vec2(-6.0, -6.0), vec2(6.0, -6.0), vec2(0.0, 6.0)] {
                placed += ctx.map.place_dirt(5, prj.pos + offset);
            }
            ctx.adjust_dirt_count(prj.owner, -placed);
            self.delete = true;
        }

        if self.green_dirt {
            let placed = ctx.map.place_green_dirt(prj.pos);
            ctx.adjust_dirt_count(prj.owner, -placed);
            self.delete = true;
        }

        for effect in self.target_effects.drain(..) {
            apply_target_effect(effect, prj, ctx);
        }

        if let Some(v) = self.overwrite_own_speed {
            prj.velocity = v;
        }
        prj.velocity = self.change_own_speed * prj.velocity;
        prj.velocity = prj.velocity + self.diff_own_speed;

        prj.radius = prj.radius + self.change_radius;
        prj.radius.x = prj.radius.x.max(0);
        prj.radius.y = prj.radius.y.max(0);

        if !self.push_backs.is_empty() {
            let (dir, _) = normalize(prj.velocity);
            for push in self.push_backs.drain(..) {
                if let Some(worm) = ctx.worms.get_mut(push.worm) {
                    worm.velocity = worm.velocity + dir * (WORM_PUSH_SPEED * push.dt);
                }
            }
        }

        if self.trail_spawn {
            // Trails belong to the projectile's own timeline.
            let time = prj.last_sim_time;
            desc.trail
                .projectile
                .apply(SpawnParent::Projectile(prj), time, ctx);
        }

        if self.general_spawn {
            desc.spawn
                .apply(SpawnParent::Projectile(prj), current_time, ctx);
        }

        for spawn in &self.other_spawns {
            spawn.apply(SpawnParent::Projectile(prj), current_time, ctx);
        }

        if let Some(sound) = &self.sound {
            ctx.hooks.play_sound(sound, prj.pos);
        }

        if !desc.has_any_action() && !desc.has_finite_animation() {
            trace!(id = prj.id.0, "junk projectile removed");
            self.delete = true;
        }
    }
}

fn apply_target_effect(effect: TargetEffect, prj: &Projectile, ctx: &mut SimContext<'_>) {
    match effect {
        TargetEffect::CarveHole { radius, pos } => {
            let removed = ctx.map.carve_hole(radius, pos);
            ctx.adjust_dirt_count(prj.owner, removed);
        }
        TargetEffect::BounceExplosion { pos, damage } => {
            ctx.hooks.explosion(pos, damage, 0, prj.owner);
        }
        TargetEffect::InjureWorm { worm, damage } => {
            ctx.hooks.injure_worm(worm, damage, prj.owner);
        }
        TargetEffect::InjureProjectiles { ids, damage } => {
            for id in ids {
                if let Some(target) = ctx.projectiles.get_mut(id) {
                    target.injure(damage);
                }
            }
        }
        TargetEffect::WormVelocity { worm, change } => {
            if let Some(worm) = ctx.worms.get_mut(worm) {
                worm.velocity = change.apply(worm.velocity);
            }
        }
        TargetEffect::ProjectileVelocity { ids, change } => {
            for id in ids {
                if let Some(target) = ctx.projectiles.get_mut(id) {
                    target.velocity = change.apply(target.velocity);
                }
            }
        }
    }
}
