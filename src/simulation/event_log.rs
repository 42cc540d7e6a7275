//! Side effects towards the rest of the game, and a recorder for them.
//!
//! The projectile core never plays sounds, renders or applies damage itself. It calls a
//! [`GameHooks`] implementation instead. [`EventLog`] records every call, which is what the
//! headless driver and the tests use.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::content::DescriptorId;
use super::geometry::Vec2;
use super::projectile::ProjectileId;
use super::time::SimTime;

/// Purely visual entities emitted by trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Smoke puff.
    Smoke,
    /// Chemical smoke puff.
    ChemSmoke,
    /// Doomsday spark.
    Doomsday,
    /// Small explosion sprite.
    Explosion,
}

/// Calls from the projectile core into the surrounding game.
pub trait GameHooks {
    /// Plays a sound sample at a position.
    fn play_sound(&mut self, sound: &str, pos: Vec2);

    /// Creates an explosion.
    fn explosion(&mut self, pos: Vec2, damage: i32, shake: i32, owner: Option<usize>);

    /// Damages a worm.
    fn injure_worm(&mut self, worm: usize, damage: i32, owner: Option<usize>);

    /// Spawns a visual particle.
    fn spawn_entity(&mut self, kind: EntityKind, pos: Vec2, velocity: Vec2);

    /// A projectile entered the simulation.
    fn projectile_spawned(
        &mut self,
        id: ProjectileId,
        descriptor: DescriptorId,
        pos: Vec2,
        time: SimTime,
    );

    /// A projectile left the simulation.
    fn projectile_deleted(&mut self, id: ProjectileId, pos: Vec2);
}

/// One recorded hook call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    /// A sound was played.
    Sound {
        /// Sample name.
        sound: String,
        /// Position.
        pos: Vec2,
    },
    /// An explosion happened.
    Explosion {
        /// Centre.
        pos: Vec2,
        /// Damage.
        damage: i32,
        /// Screen shake.
        shake: i32,
        /// Worm credited with the explosion.
        owner: Option<usize>,
    },
    /// A worm was injured.
    WormInjured {
        /// Worm index.
        worm: usize,
        /// Damage.
        damage: i32,
        /// Worm credited with the damage.
        owner: Option<usize>,
    },
    /// A visual entity was spawned.
    Entity {
        /// Entity kind.
        kind: EntityKind,
        /// Position.
        pos: Vec2,
    },
    /// A projectile was spawned.
    Spawned {
        /// New projectile.
        id: ProjectileId,
        /// Its type.
        descriptor: DescriptorId,
        /// Spawn position.
        pos: Vec2,
        /// Spawn time.
        time: SimTime,
    },
    /// A projectile was deleted.
    Deleted {
        /// Removed projectile.
        id: ProjectileId,
        /// Last position.
        pos: Vec2,
    },
}

/// Records hook calls in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<SimulationEvent>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> &[SimulationEvent] {
        &self.events
    }

    /// Removes and returns all recorded events.
    pub fn drain(&mut self) -> std::vec::Drain<'_, SimulationEvent> {
        self.events.drain(..)
    }

    /// Clears all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn push(&mut self, event: SimulationEvent) {
        self.events.push(event);
    }
}

impl GameHooks for EventLog {
    fn play_sound(&mut self, sound: &str, pos: Vec2) {
        self.push(SimulationEvent::Sound {
            sound: sound.to_string(),
            pos,
        });
    }

    fn explosion(&mut self, pos: Vec2, damage: i32, shake: i32, owner: Option<usize>) {
        debug!(x = pos.x, y = pos.y, damage, "explosion");
        self.push(SimulationEvent::Explosion {
            pos,
            damage,
            shake,
            owner,
        });
    }

    fn injure_worm(&mut self, worm: usize, damage: i32, owner: Option<usize>) {
        debug!(worm, damage, "worm injured");
        self.push(SimulationEvent::WormInjured {
            worm,
            damage,
            owner,
        });
    }

    fn spawn_entity(&mut self, kind: EntityKind, pos: Vec2, _velocity: Vec2) {
        self.push(SimulationEvent::Entity { kind, pos });
    }

    fn projectile_spawned(
        &mut self,
        id: ProjectileId,
        descriptor: DescriptorId,
        pos: Vec2,
        time: SimTime,
    ) {
        self.push(SimulationEvent::Spawned {
            id,
            descriptor,
            pos,
            time,
        });
    }

    fn projectile_deleted(&mut self, id: ProjectileId, pos: Vec2) {
        self.push(SimulationEvent::Deleted { id, pos });
    }
}
