//! Conditions that decide when a projectile's actions run.
//!
//! Content scripts call these "events". Every condition is checked against the per-step
//! [`EventOccurInfo`] and may write auxiliary data into it, for example the set of projectiles
//! it collided with, which the following action then consumes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::actions::{ActionRecord, ProjectileAction};
use super::collision::{CollisionMask, CollisionResult, projectiles_collide};
use super::content::{ContentError, DescriptorId};
use super::descriptor::{EventAction, LegacyTimer};
use super::geometry::{IVec2, fmod_positive, ivec2};
use super::projectile::{Projectile, ProjectileId, TimerState};
use super::world::SimContext;
use super::worm::{Worm, team_of};

/// Per-step context shared by every condition and action of one projectile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventOccurInfo {
    /// Physics step length in seconds, scaled by game speed.
    pub dt: f32,
    /// Server time in seconds at which this step happens.
    pub server_time: f32,
    /// Collision of this step. [`CollisionResult::None`] also stands for "not a collision
    /// event".
    pub collision: CollisionResult,
    /// Set by the legacy timer. Some actions behave differently when the fuse fired.
    pub timer_hit: bool,
    /// Projectiles collected by projectile-hit conditions, in id order.
    pub proj_cols: BTreeSet<ProjectileId>,
}

impl EventOccurInfo {
    /// Context for a step without collision information.
    pub fn unspecified(server_time: f32, dt: f32) -> Self {
        Self {
            dt,
            server_time,
            ..Self::default()
        }
    }

    /// Context for a step with a collision result.
    pub fn with_collision(server_time: f32, dt: f32, collision: CollisionResult) -> Self {
        Self {
            dt,
            server_time,
            collision,
            ..Self::default()
        }
    }
}

/// A condition evaluated once per step.
pub trait EventCondition {
    /// Checks whether the condition holds for this step.
    ///
    /// # Arguments
    ///
    /// * `ev` - Step context; conditions may add auxiliary match data
    /// * `prj` - Projectile being simulated; timer conditions update their slot
    /// * `record` - Effects accumulated so far this step
    /// * `ctx` - Simulation context
    fn check_event(
        &self,
        ev: &mut EventOccurInfo,
        prj: &mut Projectile,
        record: &ActionRecord,
        ctx: &SimContext<'_>,
    ) -> bool;
}

/// A repeating timer.
///
/// Elapses every `delay` seconds, either measured on the projectile's age or aligned to the
/// scaled server clock. In permanent mode the timer keeps answering between elapses: a
/// positive mode `N` is true except on every `(N+1)`-th elapse, a negative mode `-N` is true
/// only on every `(N+1)`-th elapse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerEvent {
    /// Seconds between elapses.
    pub delay: f32,
    /// Keep elapsing after the first time.
    pub repeat: bool,
    /// Align to the global clock instead of the projectile's age.
    pub use_global_time: bool,
    /// Duty cycle mode, see the type documentation.
    pub permanent_mode: i32,
    /// Index into [`Projectile::timers`], assigned at load time.
    #[serde(skip)]
    pub slot: usize,
}

impl Default for TimerEvent {
    fn default() -> Self {
        Self {
            delay: 1.0,
            repeat: true,
            use_global_time: false,
            permanent_mode: 0,
            slot: 0,
        }
    }
}

impl TimerEvent {
    /// Advances the timer state and returns whether the condition holds.
    ///
    /// # Arguments
    ///
    /// * `state` - Slot state of the projectile
    /// * `life` - Projectile age in seconds
    /// * `now` - Server time in seconds, already scaled by game speed
    pub fn advance(&self, state: &mut TimerState, life: f32, now: f32) -> bool {
        if state.count > 0 && !self.repeat {
            return self.permanent_mode == 1;
        }

        let elapsed = if self.use_global_time {
            let base = if state.count == 0 { now - life } else { state.last };
            let next = base - fmod_positive(base, self.delay) + self.delay;
            if now >= next {
                state.last = now;
                true
            } else {
                false
            }
        } else if state.last + self.delay <= life {
            state.last = life;
            true
        } else {
            false
        };

        if elapsed {
            state.count += 1;
            if self.permanent_mode == 0 {
                return true;
            }
        }

        match self.permanent_mode {
            n if n > 0 => state.count % (n + 1) != 0,
            n if n < 0 => state.count % (-n + 1) == 0,
            _ => false,
        }
    }
}

/// Terrain or border collision filter. Every set flag must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainHitEvent {
    /// Require a map border hit.
    pub map_bound: bool,
    /// Require a dirt-only hit.
    pub dirt: bool,
    /// Require a plain terrain hit (no border, not dirt-only).
    pub rock: bool,
}

impl TerrainHitEvent {
    fn matches(self, mask: CollisionMask) -> bool {
        if self.map_bound && !mask.contains(CollisionMask::MAPBORDER) {
            return false;
        }
        if self.dirt && !mask.contains(CollisionMask::DIRT) {
            return false;
        }
        if self.rock && mask != CollisionMask::TERRAIN {
            return false;
        }
        true
    }
}

/// Raw relation flags as written in content files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WormHitFlags {
    /// The worm is the projectile owner.
    pub same_worm: bool,
    /// The worm is not the projectile owner.
    pub diff_worm: bool,
    /// The worm is on the owner's team.
    pub same_team: bool,
    /// The worm is on another team.
    pub diff_team: bool,
    /// Team mate in team games, the owner itself otherwise.
    pub team_mate: bool,
    /// Anyone but the owner, and in team games not on the owner's team.
    pub enemy: bool,
}

/// Validated relation between a worm and a projectile owner.
///
/// Flag combinations that can never match are rejected when the policy is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WormHitFlags", into = "WormHitFlags")]
pub struct WormHitPolicy {
    flags: WormHitFlags,
}

impl TryFrom<WormHitFlags> for WormHitPolicy {
    type Error = ContentError;

    fn try_from(flags: WormHitFlags) -> Result<Self, Self::Error> {
        Self::new(flags)
    }
}

impl From<WormHitPolicy> for WormHitFlags {
    fn from(policy: WormHitPolicy) -> Self {
        policy.flags()
    }
}

impl WormHitPolicy {
    /// Validates a flag set.
    pub fn new(flags: WormHitFlags) -> Result<Self, ContentError> {
        let invalid = |reason: &str| Err(ContentError::InvalidWormHitPolicy(reason.to_string()));
        if flags.same_worm && (flags.diff_worm || flags.diff_team || flags.enemy) {
            return invalid("same worm with a different worm, different team or enemy");
        }
        if flags.same_team && (flags.diff_team || flags.enemy) {
            return invalid("same team with a different team or enemy");
        }
        if flags.team_mate && flags.enemy {
            return invalid("team mate with enemy");
        }
        Ok(Self { flags })
    }

    /// The validated flags.
    pub fn flags(&self) -> WormHitFlags {
        self.flags
    }

    /// Whether `worm` stands in the required relation to `owner`.
    pub fn matches(
        &self,
        worm: Option<usize>,
        owner: Option<usize>,
        worms: &[Worm],
        team_game: bool,
    ) -> bool {
        let f = &self.flags;
        if f.same_worm && owner != worm {
            return false;
        }
        if f.diff_worm && owner == worm {
            return false;
        }

        let team = team_of(worms, worm);
        let owner_team = team_of(worms, owner);
        if f.same_team && owner_team != team {
            return false;
        }
        if f.diff_team && owner_team == team {
            return false;
        }

        if f.team_mate && !team_game && owner != worm {
            return false;
        }
        if f.team_mate && team_game && owner_team != team {
            return false;
        }
        if f.enemy && owner == worm {
            return false;
        }
        if f.enemy && team_game && owner_team == team {
            return false;
        }
        true
    }
}

/// Collision with other projectiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjHitEvent {
    /// Only count projectiles of this type.
    pub target: Option<String>,
    /// Resolved `target`, set at load time.
    #[serde(skip)]
    pub target_id: Option<DescriptorId>,
    /// Required relation between this projectile's owner and the other projectile's owner.
    pub owner: WormHitPolicy,
    /// Minimum number of hits.
    pub min_hit_count: usize,
    /// Maximum number of hits, negative for unbounded.
    pub max_hit_count: i32,
    /// Hit box width to use instead of the own radius. Negative to use the radius.
    pub width: i32,
    /// Hit box height to use instead of the own radius. Negative to use the radius.
    pub height: i32,
    /// Only count targets with more health.
    pub target_health_is_more: bool,
    /// Only count targets with less health.
    pub target_health_is_less: bool,
    /// Only count older targets.
    pub target_time_is_more: bool,
    /// Only count younger targets.
    pub target_time_is_less: bool,
}

impl Default for ProjHitEvent {
    fn default() -> Self {
        Self {
            target: None,
            target_id: None,
            owner: WormHitPolicy::default(),
            min_hit_count: 1,
            max_hit_count: -1,
            width: -1,
            height: -1,
            target_health_is_more: false,
            target_health_is_less: false,
            target_time_is_more: false,
            target_time_is_less: false,
        }
    }
}

impl ProjHitEvent {
    /// Tests one candidate. Returns `false` once no further candidates need checking.
    fn visit(
        &self,
        ev: &mut EventOccurInfo,
        prj: &Projectile,
        other: &Projectile,
        hit_box: IVec2,
        ctx: &SimContext<'_>,
    ) -> bool {
        if other.id == prj.id {
            return true;
        }
        if self.target_id.is_some_and(|t| t != other.descriptor) {
            return true;
        }
        if !self
            .owner
            .matches(prj.owner, other.owner, ctx.worms(), ctx.params.team_game)
        {
            return true;
        }
        if self.target_health_is_more && other.health <= prj.health {
            return true;
        }
        if self.target_health_is_less && other.health >= prj.health {
            return true;
        }
        if self.target_time_is_more && other.life <= prj.life {
            return true;
        }
        if self.target_time_is_less && other.life >= prj.life {
            return true;
        }

        if !projectiles_collide(prj, other, hit_box.x, hit_box.y) {
            return true;
        }

        ev.proj_cols.insert(other.id);
        let count = ev.proj_cols.len();
        if self.max_hit_count < 0 && count >= self.min_hit_count {
            return false;
        }
        if self.max_hit_count >= 0 && count > self.max_hit_count as usize {
            return false;
        }
        true
    }

    /// Half extents used for the test: the configured box, or the projectile's radius.
    fn hit_box(&self, prj: &Projectile) -> IVec2 {
        if self.width >= 0 && self.height >= 0 {
            ivec2(self.width / 2, self.height / 2)
        } else {
            prj.radius
        }
    }

    fn check(&self, ev: &mut EventOccurInfo, prj: &Projectile, ctx: &SimContext<'_>) -> bool {
        let hit_box = self.hit_box(prj);
        for id in ctx.projectiles().neighbours(prj.pixel_pos(), hit_box) {
            let Some(other) = ctx.projectiles().get(id) else {
                continue;
            };
            if !self.visit(ev, prj, other, hit_box, ctx) {
                break;
            }
        }
        let count = ev.proj_cols.len();
        count >= self.min_hit_count
            && (self.max_hit_count < 0 || count <= self.max_hit_count as usize)
    }
}

/// A condition as written in content files, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Trigger {
    /// Repeating timer.
    Timer(TimerEvent),
    /// Terrain or border collision.
    TerrainHit(TerrainHitEvent),
    /// Worm collision with an owner relation.
    WormHit(WormHitPolicy),
    /// Collision with other projectiles.
    ProjHit(ProjHitEvent),
    /// Health dropped below zero.
    Death,
    /// No other action produced an effect this step.
    Fallback,
    /// Unrecognised condition from newer content. Never matches.
    #[serde(other)]
    Unknown,
}

impl EventCondition for Trigger {
    fn check_event(
        &self,
        ev: &mut EventOccurInfo,
        prj: &mut Projectile,
        record: &ActionRecord,
        ctx: &SimContext<'_>,
    ) -> bool {
        match self {
            Trigger::Timer(timer) => {
                let now = ev.server_time * ctx.params.game_speed;
                let life = prj.life;
                match prj.timers.get_mut(timer.slot) {
                    Some(state) => timer.advance(state, life, now),
                    None => false,
                }
            }
            Trigger::TerrainHit(filter) => ev
                .collision
                .terrain_mask()
                .is_some_and(|mask| filter.matches(mask)),
            Trigger::WormHit(policy) => ev.collision.worm().is_some_and(|worm| {
                policy.matches(Some(worm), prj.owner, ctx.worms(), ctx.params.team_game)
            }),
            Trigger::ProjHit(hit) => hit.check(ev, prj, ctx),
            Trigger::Death => prj.health < 0,
            Trigger::Fallback => !record.has_any_effect(),
            Trigger::Unknown => false,
        }
    }
}

impl EventCondition for LegacyTimer {
    fn check_event(
        &self,
        ev: &mut EventOccurInfo,
        prj: &mut Projectile,
        _record: &ActionRecord,
        _ctx: &SimContext<'_>,
    ) -> bool {
        if prj.legacy_timer_fired || self.time <= 0.0 {
            return false;
        }
        if prj.life >= self.time + self.time_var * prj.time_var_random {
            prj.legacy_timer_fired = true;
            ev.timer_hit = true;
            return true;
        }
        false
    }
}

impl LegacyTimer {
    /// Fires the timer action if the fuse has burnt down.
    pub fn check_and_apply(
        &self,
        mut ev: EventOccurInfo,
        prj: &mut Projectile,
        record: &mut ActionRecord,
        ctx: &SimContext<'_>,
    ) -> bool {
        if !self.check_event(&mut ev, prj, record, ctx) {
            return false;
        }
        self.action.apply_to(&ev, prj, record, ctx);
        true
    }
}

impl EventAction {
    /// Checks every condition in order on a private copy of the step context and applies the
    /// action if all matched.
    pub fn check_and_apply(
        &self,
        ev: &EventOccurInfo,
        prj: &mut Projectile,
        record: &mut ActionRecord,
        ctx: &SimContext<'_>,
    ) -> bool {
        if self.events.is_empty() {
            return false;
        }
        let mut ev = ev.clone();
        for trigger in &self.events {
            if !trigger.check_event(&mut ev, prj, record, ctx) {
                return false;
            }
        }
        self.action.apply_to(&ev, prj, record, ctx);
        true
    }
}
