//! Authored projectile descriptions.
//!
//! A descriptor is loaded once and shared read-only by every live projectile of that type. All
//! fields use serde defaults so content files only spell out what differs.

use serde::{Deserialize, Serialize};

use super::actions::{Action, ActionKind};
use super::events::Trigger;
use super::geometry::{IVec2, ShapeKind, ivec2};
use super::spawn::SpawnInfo;

/// A legacy, single shot timer with its action.
///
/// Fires when the projectile age reaches `time + time_var * r`, where `r` is the projectile's
/// own fixed random sample. Disabled when `time` is not positive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyTimer {
    /// Base fuse time in seconds.
    pub time: f32,
    /// Jitter in seconds, scaled by the projectile's random sample.
    pub time_var: f32,
    /// Action applied when the timer fires.
    pub action: Action,
}

impl LegacyTimer {
    /// Whether the timer is armed and does something when it fires.
    pub fn has_action(&self) -> bool {
        self.time > 0.0 && self.action.has_action()
    }
}

/// A list of conditions and the action applied when all of them match in the same step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventAction {
    /// Conditions. An empty list never matches.
    pub events: Vec<Trigger>,
    /// Action applied when every condition matched.
    pub action: Action,
}

/// Visual or projectile trail emitted while a projectile flies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrailKind {
    /// No trail.
    #[default]
    None,
    /// Grey smoke puffs.
    Smoke,
    /// Chemical smoke puffs.
    ChemSmoke,
    /// Doomsday sparks that inherit the projectile velocity.
    Doomsday,
    /// Small explosion sprites.
    Explosive,
    /// Child projectiles spawned every `delay` seconds.
    Projectile,
    /// Unrecognised trail kind from newer content. Ignored.
    #[serde(other)]
    Unknown,
}

/// Trail configuration of a descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Trail {
    /// Trail kind.
    pub kind: TrailKind,
    /// Seconds between projectile trail spawns (before game speed scaling).
    pub delay: f32,
    /// Spawn used by [`TrailKind::Projectile`].
    pub projectile: SpawnInfo,
}

/// How a sprite animation continues after its last frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimType {
    /// Play once, then delete the projectile.
    #[default]
    Once,
    /// Restart from the first frame.
    Loop,
    /// Reverse direction at either end.
    PingPong,
    /// Unrecognised animation type from newer content. Ignored.
    #[serde(other)]
    Unknown,
}

/// Immutable description of one projectile type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileDescriptor {
    /// Unique name, used by spawn references.
    pub name: String,
    /// Hit box kind.
    pub shape: ShapeKind,
    /// Initial hit box radius.
    pub radius: IVec2,
    /// Downwards acceleration in units per second squared.
    pub gravity: f32,
    /// Velocity multiplier applied every step.
    pub dampening: f32,
    /// Action on terrain or map border collision.
    pub hit: Action,
    /// Action on worm collision.
    pub ply_hit: Action,
    /// Legacy fuse timer.
    pub timer: LegacyTimer,
    /// Generic condition/action pairs, checked in order every step.
    pub actions: Vec<EventAction>,
    /// Trail emitted while flying.
    pub trail: Trail,
    /// Spawn used by actions that request "spawn projectiles" without an explicit target.
    pub spawn: SpawnInfo,
    /// Whether the sprite rotates.
    pub rotating: bool,
    /// Rotation speed in degrees per second.
    pub rot_speed: f32,
    /// Granularity of random initial rotations, in degrees.
    pub rot_increment: i32,
    /// Whether the sprite animates.
    pub animating: bool,
    /// Animation continuation mode.
    pub anim_type: AnimType,
    /// Frames per second.
    pub anim_rate: f32,
    /// Number of animation frames. Zero means the projectile has no sprite.
    pub frame_count: u32,
    /// Seconds after spawn during which terrain is ignored.
    pub wallshoot_time: f32,

    /// Set at load time: velocity may change between steps, so check steps need refreshing.
    #[serde(skip)]
    pub(crate) changes_speed: bool,
    /// Set at load time: number of repeating timer conditions in `actions`.
    #[serde(skip)]
    pub(crate) timer_slots: usize,
}

impl Default for ProjectileDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            shape: ShapeKind::default(),
            radius: ivec2(1, 1),
            gravity: 0.0,
            dampening: 1.0,
            hit: Action::default(),
            ply_hit: Action::default(),
            timer: LegacyTimer::default(),
            actions: Vec::new(),
            trail: Trail::default(),
            spawn: SpawnInfo::default(),
            rotating: false,
            rot_speed: 0.0,
            rot_increment: 0,
            animating: false,
            anim_type: AnimType::default(),
            anim_rate: 0.0,
            frame_count: 0,
            wallshoot_time: 0.0,
            changes_speed: false,
            timer_slots: 0,
        }
    }
}

impl ProjectileDescriptor {
    /// Whether velocity can change after spawn (gravity, drag, bouncing or speed actions).
    pub fn changes_speed(&self) -> bool {
        self.changes_speed
    }

    /// Number of repeating timer slots a live instance needs.
    pub fn timer_slots(&self) -> usize {
        self.timer_slots
    }

    /// Whether any hit, timer or generic action can ever do something.
    pub fn has_any_action(&self) -> bool {
        self.hit.has_action()
            || self.ply_hit.has_action()
            || self.timer.has_action()
            || self.actions.iter().any(|a| a.action.has_action())
    }

    /// Whether the projectile removes itself once its animation ends.
    pub fn has_finite_animation(&self) -> bool {
        self.animating && self.anim_type == AnimType::Once && self.frame_count > 0
    }

    /// Recomputes the derived fields. Called by the content registry after loading.
    pub(crate) fn derive_flags(&mut self) {
        let own_speed_actions = std::iter::once(&self.hit)
            .chain(std::iter::once(&self.ply_hit))
            .chain(std::iter::once(&self.timer.action))
            .chain(self.actions.iter().map(|a| &a.action))
            .any(Action::changes_own_speed);
        self.changes_speed = self.gravity != 0.0
            || self.dampening != 1.0
            || self.hit.kind == ActionKind::Bounce
            || own_speed_actions;

        let mut slot = 0;
        for pair in &mut self.actions {
            for trigger in &mut pair.events {
                if let Trigger::Timer(timer) = trigger {
                    timer.slot = slot;
                    slot += 1;
                }
            }
        }
        self.timer_slots = slot;
    }
}
