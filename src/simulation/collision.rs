//! Collision tests against the map border, terrain pixels, worms and other projectiles.
//!
//! Terrain tests count solid pixels per side of the hit box so that the caller can tell which
//! faces were blocked, not only that something was hit.

use serde::{Deserialize, Serialize};

use super::actions::ActionKind;
use super::descriptor::ProjectileDescriptor;
use super::geometry::{Shape, ShapeKind, Vec2, ivec2, normalize, to_pixel};
use super::projectile::Projectile;
use super::terrain::{PX_DIRT, PX_EMPTY, PX_ROCK, TerrainMap};
use super::worm::{Worm, worm_at};

/// Left side blocked.
pub const COL_LEFT: u8 = 0x01;
/// Right side blocked.
pub const COL_RIGHT: u8 = 0x02;
/// Top side blocked.
pub const COL_TOP: u8 = 0x04;
/// Bottom side blocked.
pub const COL_BOTTOM: u8 = 0x08;

/// Distance between worm trace samples. Worm hit boxes are 8 pixels wide, so no worm can be
/// stepped over.
pub const WORM_TRACE_STEP: f32 = 2.0;

/// Classification bits of a terrain collision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionMask(pub u8);

impl CollisionMask {
    /// No collision.
    pub const NONE: Self = Self(0);
    /// Terrain or border was hit.
    pub const TERRAIN: Self = Self(0x01);
    /// The map border was hit.
    pub const MAPBORDER: Self = Self(0x02);
    /// Only dirt was hit, no rock.
    pub const DIRT: Self = Self(0x04);

    /// Whether every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for CollisionMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Outcome of one simulated frame. At most one classification per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionResult {
    /// Nothing was hit.
    #[default]
    None,
    /// Terrain or the map border was hit.
    Terrain {
        /// Classification bits.
        mask: CollisionMask,
    },
    /// A worm was hit.
    Worm {
        /// Index of the worm.
        worm: usize,
    },
}

impl CollisionResult {
    /// Whether anything was hit.
    pub fn is_some(self) -> bool {
        !matches!(self, Self::None)
    }

    /// The worm that was hit, if any.
    pub fn worm(self) -> Option<usize> {
        match self {
            Self::Worm { worm } => Some(worm),
            _ => None,
        }
    }

    /// The terrain mask, if terrain was hit.
    pub fn terrain_mask(self) -> Option<CollisionMask> {
        match self {
            Self::Terrain { mask } => Some(mask),
            _ => None,
        }
    }
}

/// Solid pixel counts around a hit box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainHit {
    /// Solid pixels left of the centre column.
    pub left: i32,
    /// Solid pixels right of the centre column.
    pub right: i32,
    /// Solid pixels above the centre row.
    pub top: i32,
    /// Solid pixels below the centre row.
    pub bottom: i32,
    /// No rock pixel was touched.
    pub only_dirt: bool,
    /// Any solid pixel was touched.
    pub collided: bool,
}

impl Default for TerrainHit {
    fn default() -> Self {
        Self {
            left: 0,
            right: 0,
            top: 0,
            bottom: 0,
            only_dirt: true,
            collided: false,
        }
    }
}

/// Tests the hit box at `(px, py)` against the map border and records the crossed sides.
///
/// The side mask is reset first. A box touching the border from inside is not out of bounds.
pub fn map_bounds_collision(prj: &mut Projectile, map: &dyn TerrainMap, px: i32, py: i32) -> bool {
    let r = prj.radius;
    prj.collision_side = 0;
    if px - r.x < 0 {
        prj.collision_side |= COL_LEFT;
    }
    if px + r.x >= map.width() {
        prj.collision_side |= COL_RIGHT;
    }
    if py - r.y < 0 {
        prj.collision_side |= COL_TOP;
    }
    if py + r.y >= map.height() {
        prj.collision_side |= COL_BOTTOM;
    }
    prj.collision_side != 0
}

/// Counts solid pixels covered by the hit box at `(px, py)`.
///
/// Small hit boxes first look at the coarse grid cells of their four corners and bail out when
/// all of them are empty. Circular hit boxes skip pixels outside the circle.
pub fn terrain_collision(prj: &Projectile, map: &dyn TerrainMap, px: i32, py: i32) -> TerrainHit {
    let mut res = TerrainHit::default();
    let r = prj.radius;
    let (gw, gh) = (map.grid_width(), map.grid_height());

    if r.x * 2 < gw && r.y * 2 < gh {
        let (left, right) = ((px - r.x) / gw, (px + r.x) / gw);
        let (top, bottom) = ((py - r.y) / gh, (py + r.y) / gh);
        let flags = map.grid_flags(left, top)
            | map.grid_flags(right, top)
            | map.grid_flags(left, bottom)
            | map.grid_flags(right, bottom);
        if flags == PX_EMPTY {
            return res;
        }
    }

    let radius2 = r.x * r.x + r.y * r.y;
    for y in py - r.y..=py + r.y {
        for x in px - r.x..=px + r.x {
            if prj.shape == ShapeKind::Circle {
                let (dx, dy) = (x - px, y - py);
                if dx * dx + dy * dy > radius2 {
                    continue;
                }
            }

            let flags = map.pixel_flags(x, y);
            if flags & (PX_DIRT | PX_ROCK) == 0 {
                continue;
            }
            if y < py {
                res.top += 1;
            } else if y > py {
                res.bottom += 1;
            }
            if x < px {
                res.left += 1;
            } else if x > px {
                res.right += 1;
            }
            if flags & PX_ROCK != 0 {
                res.only_dirt = false;
            }
            res.collided = true;
        }
    }
    res
}

/// Resolves a terrain collision according to the descriptor's terrain hit action.
///
/// # Arguments
///
/// * `prj` - Projectile, already moved to the colliding position
/// * `desc` - Its descriptor
/// * `hit` - Pixel counts from [`terrain_collision`]
/// * `frame_old_pos` - Position at the start of the frame
/// * `old_vel` - Velocity at the start of the frame
/// * `dt` - Frame length in seconds
///
/// # Returns
///
/// `false` if the collision is ignored and the projectile keeps moving.
pub fn handle_terrain_collision(
    prj: &mut Projectile,
    desc: &ProjectileDescriptor,
    hit: &TerrainHit,
    frame_old_pos: Vec2,
    old_vel: Vec2,
    dt: f32,
) -> bool {
    if desc.hit.kind == ActionKind::Explode && hit.only_dirt {
        // Stay inside the dirt so the explosion happens where the projectile hit.
        return true;
    }

    let bounce = match desc.hit.kind {
        ActionKind::Bounce => true,
        ActionKind::Nothing => {
            prj.pos = frame_old_pos + prj.velocity * dt * 0.5;
            prj.old_pos = prj.pos;
            false
        }
        ActionKind::GoThrough => {
            prj.pos = frame_old_pos + prj.velocity * dt * desc.hit.go_through_speed;
            return false;
        }
        _ => {
            prj.pos = prj.old_pos;
            prj.velocity = old_vel;
            return true;
        }
    };

    let vx = prj.velocity.x as i32;
    let vy = prj.velocity.y as i32;

    if (hit.left > hit.right || hit.left > 2) && hit.left > 1 && vx <= 0 {
        if bounce {
            prj.pos.x = frame_old_pos.x;
        }
        if vx != 0 {
            prj.collision_side |= COL_LEFT;
        }
    }

    if (hit.right > hit.left || hit.right > 2) && hit.right > 1 && vx >= 0 {
        if bounce {
            prj.pos.x = frame_old_pos.x;
        }
        if vx != 0 {
            prj.collision_side |= COL_RIGHT;
        }
    }

    if hit.top > 1 && vy <= 0 {
        if bounce {
            prj.pos.y = frame_old_pos.y;
        }
        if vy != 0 {
            prj.collision_side |= COL_TOP;
        }
    }

    if hit.bottom > 1 && vy >= 0 {
        if bounce {
            prj.pos.y = frame_old_pos.y;
        }
        if vy != 0 {
            prj.collision_side |= COL_BOTTOM;
        }
    }

    // Slow projectiles come to rest instead of jittering against the surface.
    if vx.abs() < 2 {
        prj.velocity.x = 0.0;
    }
    if vy.abs() < 2 {
        prj.velocity.y = 0.0;
    }

    true
}

/// First active worm overlapping the projectile's hit box placed at `pos`.
pub fn projectile_worm_collision(prj: &Projectile, pos: Vec2, worms: &[Worm]) -> Option<usize> {
    let shape = Shape::new(prj.shape, to_pixel(pos), prj.radius);
    worm_at(worms, &shape)
}

/// Traces the segment travelled this frame for worm hits.
///
/// Samples every [`WORM_TRACE_STEP`] units from `frame_old_pos` to the current position. On
/// the first hit the projectile is cut back to the hit point with its frame-start velocity,
/// unless its worm hit action passes through worms. Returns `current` when no worm is hit or
/// when the projectile ignores worms entirely.
#[allow(clippy::too_many_arguments)]
pub fn final_worm_collision(
    prj: &mut Projectile,
    desc: &ProjectileDescriptor,
    frame_old_pos: Vec2,
    frame_old_vel: Vec2,
    worms: &[Worm],
    dt: f32,
    used_dt: &mut f32,
    current: CollisionResult,
) -> CollisionResult {
    if desc.ply_hit.kind == ActionKind::Nothing {
        return current;
    }

    let (dir, len) = normalize(prj.pos - frame_old_pos);
    let mut p = 0.0;
    while p <= len {
        let sample = frame_old_pos + dir * p;
        if let Some(worm) = projectile_worm_collision(prj, sample, worms) {
            if desc.ply_hit.kind != ActionKind::GoThrough {
                *used_dt = if len != 0.0 { dt * p / len } else { dt };
                prj.pos = sample;
                prj.velocity = frame_old_vel;
            }
            return CollisionResult::Worm { worm };
        }
        p += WORM_TRACE_STEP;
    }
    current
}

/// Narrow phase between two projectiles, with `a` using the radius `(rx, ry)` instead of its
/// own. Symmetric in the sense that swapping `a` and `b` (with their radii) gives the same
/// answer.
pub fn projectiles_collide(a: &Projectile, b: &Projectile, rx: i32, ry: i32) -> bool {
    let sa = Shape::new(a.shape, a.pixel_pos(), ivec2(rx, ry));
    sa.collides_with(&b.hit_shape())
}
