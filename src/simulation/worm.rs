//! Worm state as seen by projectiles, and the nearest-worm queries used by homing actions.

use serde::{Deserialize, Serialize};

use super::geometry::{Shape, ShapeKind, Vec2, ivec2, length2, to_pixel, vec2};

/// Half extent of the square hit box of a worm.
pub const WORM_HIT_RADIUS: i32 = 4;

/// A player avatar.
///
/// Projectiles read position and team, and may push the worm by changing its velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worm {
    /// Current position.
    pub pos: Vec2,
    /// Current velocity. Mutable by projectile actions.
    pub velocity: Vec2,
    /// Team number. Only meaningful in team games.
    pub team: i32,
    /// Slot is occupied by a player.
    pub used: bool,
    /// Worm is alive.
    pub alive: bool,
    /// Dirt carved (positive) or placed (negative) by this worm's projectiles.
    pub dirt_count: i32,
}

impl Worm {
    /// Creates a live worm at rest.
    pub fn new(pos: Vec2, team: i32) -> Self {
        Self {
            pos,
            velocity: vec2(0.0, 0.0),
            team,
            used: true,
            alive: true,
            dirt_count: 0,
        }
    }

    /// A worm takes part in collisions only if its slot is used and it is alive.
    pub fn is_active(&self) -> bool {
        self.used && self.alive
    }

    /// Hit box of the worm.
    pub fn hit_shape(&self) -> Shape {
        Shape::new(
            ShapeKind::Box,
            to_pixel(self.pos),
            ivec2(WORM_HIT_RADIUS, WORM_HIT_RADIUS),
        )
    }
}

/// Team of a worm, or `-1` for no worm.
pub fn team_of(worms: &[Worm], worm: Option<usize>) -> i32 {
    worm.and_then(|w| worms.get(w)).map_or(-1, |w| w.team)
}

/// First active worm whose hit box overlaps `shape`.
pub fn worm_at(worms: &[Worm], shape: &Shape) -> Option<usize> {
    worms
        .iter()
        .position(|w| w.is_active() && w.hit_shape().collides_with(shape))
}

fn nearest_matching(
    worms: &[Worm],
    pos: Vec2,
    accept: impl Fn(usize, &Worm) -> bool,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, w) in worms.iter().enumerate() {
        if !w.is_active() || !accept(i, w) {
            continue;
        }
        let d = length2(w.pos - pos);
        // Strict comparison keeps the lowest index on ties.
        if best.is_none_or(|(_, best_d)| best_d > d) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Nearest active worm.
pub fn nearest_worm(worms: &[Worm], pos: Vec2) -> Option<usize> {
    nearest_matching(worms, pos, |_, _| true)
}

/// Nearest active worm other than `worm`.
pub fn nearest_other_worm(worms: &[Worm], pos: Vec2, worm: Option<usize>) -> Option<usize> {
    nearest_matching(worms, pos, |i, _| Some(i) != worm)
}

/// Nearest active worm that is not `worm` and, in team games, not on its team.
pub fn nearest_enemy_worm(
    worms: &[Worm],
    pos: Vec2,
    worm: Option<usize>,
    team_game: bool,
) -> Option<usize> {
    let team = team_of(worms, worm);
    nearest_matching(worms, pos, |i, w| {
        Some(i) != worm && !(team_game && w.team == team)
    })
}

/// Nearest active team mate of `worm`. Always `None` outside team games.
pub fn nearest_team_mate(
    worms: &[Worm],
    pos: Vec2,
    worm: Option<usize>,
    team_game: bool,
) -> Option<usize> {
    if !team_game {
        return None;
    }
    let team = team_of(worms, worm);
    nearest_matching(worms, pos, |i, w| Some(i) != worm && w.team == team)
}
