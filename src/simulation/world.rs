//! The simulation world and the context handed to every step.

use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use super::content::{ContentError, ContentRegistry};
use super::event_log::GameHooks;
use super::params::Params;
use super::projectile::{Projectile, ProjectileId, SpawnRequest};
use super::random::{FixedRandom, seeded_rng};
use super::simulator::simulate_projectile;
use super::spatial::ProjectilePool;
use super::spawn::{Shot, SpawnInfo, SpawnParent};
use super::terrain::TerrainMap;
use super::time::SimTime;
use super::worm::Worm;

/// Borrowed view of the world used while one projectile is simulated.
///
/// The simulated projectile itself is taken out of `projectiles` for the duration of its
/// step, so the pool only contains the other projectiles.
pub struct SimContext<'a> {
    /// Timing and rule parameters.
    pub params: &'a Params,
    /// Projectile types.
    pub content: &'a ContentRegistry,
    /// Shared random table.
    pub random: &'a FixedRandom,
    /// Terrain.
    pub map: &'a mut dyn TerrainMap,
    /// Worm table.
    pub worms: &'a mut [Worm],
    /// Sink for sounds, explosions and other side effects.
    pub hooks: &'a mut dyn GameHooks,
    /// Seeded generator for cosmetic randomness.
    pub rng: &'a mut ChaCha8Rng,
    /// Every projectile except the one being stepped.
    pub projectiles: &'a mut ProjectilePool,
    /// Server clock.
    pub server_time: SimTime,
}

impl SimContext<'_> {
    /// Read-only worm table.
    pub fn worms(&self) -> &[Worm] {
        &*self.worms
    }

    /// Read-only projectile pool.
    pub fn projectiles(&self) -> &ProjectilePool {
        &*self.projectiles
    }

    /// Adds to the dirt counter of a worm. Ownerless changes are ignored.
    pub fn adjust_dirt_count(&mut self, owner: Option<usize>, delta: i32) {
        if let Some(worm) = owner.and_then(|w| self.worms.get_mut(w)) {
            worm.dirt_count += delta;
        }
    }

    /// Creates a projectile and adds it to the pool.
    ///
    /// # Returns
    ///
    /// The new id. Ids increase monotonically, so a projectile spawned during a tick is only
    /// simulated from the next tick on.
    pub fn spawn_projectile(&mut self, request: SpawnRequest) -> ProjectileId {
        let id = self.projectiles.next_id();
        let desc = self.content.get(request.descriptor);
        let prj = Projectile::new(id, desc, request, self.random);
        self.hooks
            .projectile_spawned(id, prj.descriptor, prj.pos, prj.spawn_time);
        self.projectiles.insert(prj);
        id
    }
}

/// Owns everything the projectile simulation touches and drives it in fixed ticks.
pub struct World<M: TerrainMap, H: GameHooks> {
    params: Params,
    content: ContentRegistry,
    random: FixedRandom,
    map: M,
    worms: Vec<Worm>,
    hooks: H,
    rng: ChaCha8Rng,
    projectiles: ProjectilePool,
    time: SimTime,
}

impl<M: TerrainMap, H: GameHooks> World<M, H> {
    /// Creates a world at time zero.
    ///
    /// # Arguments
    ///
    /// * `params` - Simulation parameters
    /// * `content` - Linked projectile types
    /// * `map` - Terrain; its grid also sizes the spatial index
    /// * `worms` - Worm table
    /// * `hooks` - Side effect sink
    pub fn new(
        params: Params,
        content: ContentRegistry,
        map: M,
        worms: Vec<Worm>,
        hooks: H,
    ) -> Self {
        let projectiles = ProjectilePool::new(
            map.grid_width(),
            map.grid_height(),
            map.grid_cols(),
            map.grid_rows(),
        );
        debug!(
            width = map.width(),
            height = map.height(),
            worms = worms.len(),
            seed = params.random_seed,
            "world created"
        );
        Self {
            random: FixedRandom::new(params.random_seed),
            rng: seeded_rng(params.random_seed),
            params,
            content,
            map,
            worms,
            hooks,
            projectiles,
            time: SimTime::ZERO,
        }
    }

    /// Borrows the world as a step context.
    pub fn context(&mut self) -> SimContext<'_> {
        SimContext {
            params: &self.params,
            content: &self.content,
            random: &self.random,
            map: &mut self.map,
            worms: &mut self.worms,
            hooks: &mut self.hooks,
            rng: &mut self.rng,
            projectiles: &mut self.projectiles,
            server_time: self.time,
        }
    }

    /// Fires a weapon at the current time.
    ///
    /// # Arguments
    ///
    /// * `shot` - Worm discharge; its random stream advances per child
    /// * `spawn` - Weapon spawn, resolved against the content by projectile name
    ///
    /// # Returns
    ///
    /// Ids of the spawned projectiles, or an error if the projectile name is unknown.
    pub fn fire(
        &mut self,
        shot: &mut Shot,
        spawn: &SpawnInfo,
    ) -> Result<Vec<ProjectileId>, ContentError> {
        let spawn = self.content.resolve_spawn(spawn)?;
        let time = self.time;
        let mut ctx = self.context();
        Ok(spawn.apply(SpawnParent::Shot(shot), time, &mut ctx))
    }

    /// Adds a single projectile directly.
    pub fn spawn(&mut self, request: SpawnRequest) -> ProjectileId {
        self.context().spawn_projectile(request)
    }

    /// Runs fixed ticks until the clock reaches `target`.
    ///
    /// Every tick simulates the projectiles alive at its start, in ascending id order. A
    /// projectile deleted earlier in the tick is skipped.
    ///
    /// # Returns
    ///
    /// Number of ticks run.
    pub fn advance(&mut self, target: SimTime) -> usize {
        let tick = self.params.tick();
        let mut ticks = 0;
        while self.time + tick <= target {
            let ids = self.projectiles.ids();
            let now = self.time;
            let mut ctx = self.context();
            for id in ids {
                simulate_projectile(now, id, &mut ctx);
            }
            self.time += tick;
            ticks += 1;
            trace!(
                time = self.time.millis(),
                live = self.projectiles.len(),
                "tick"
            );
        }
        ticks
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Simulation parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Projectile types.
    pub fn content(&self) -> &ContentRegistry {
        &self.content
    }

    /// Terrain.
    pub fn map(&self) -> &M {
        &self.map
    }

    /// Mutable terrain.
    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    /// Worm table.
    pub fn worms(&self) -> &[Worm] {
        &self.worms
    }

    /// Mutable worm table.
    pub fn worms_mut(&mut self) -> &mut [Worm] {
        &mut self.worms
    }

    /// Side effect sink.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Mutable side effect sink.
    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Live projectiles.
    pub fn projectiles(&self) -> &ProjectilePool {
        &self.projectiles
    }

    /// Projectile by id.
    pub fn projectile(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.get(id)
    }

    /// Copies of all live projectiles in id order.
    pub fn snapshot(&self) -> Vec<Projectile> {
        self.projectiles.iter().cloned().collect()
    }
}
