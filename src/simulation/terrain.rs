//! Terrain interface consumed by the projectile core, plus a bitmap-backed implementation.
//!
//! The game owns the real map. Projectiles only need per-pixel material flags, a coarse grid of
//! OR-ed cell flags for fast rejection, and three mutation calls.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::geometry::Vec2;

/// Pixel holds no material.
pub const PX_EMPTY: u8 = 0x00;
/// Pixel holds soft, destructible terrain.
pub const PX_DIRT: u8 = 0x01;
/// Pixel holds hard terrain that cannot be carved.
pub const PX_ROCK: u8 = 0x02;

/// Read access to terrain material plus the mutations projectiles may request.
///
/// Coordinates are pixels with `(0, 0)` at the top left corner and `y` growing downwards.
pub trait TerrainMap {
    /// Map width in pixels.
    fn width(&self) -> i32;
    /// Map height in pixels.
    fn height(&self) -> i32;
    /// Width of one coarse grid cell in pixels.
    fn grid_width(&self) -> i32;
    /// Height of one coarse grid cell in pixels.
    fn grid_height(&self) -> i32;

    /// Number of grid columns.
    fn grid_cols(&self) -> i32 {
        (self.width() + self.grid_width() - 1) / self.grid_width()
    }

    /// Number of grid rows.
    fn grid_rows(&self) -> i32 {
        (self.height() + self.grid_height() - 1) / self.grid_height()
    }

    /// Material flags of one pixel. Pixels outside the map are empty.
    fn pixel_flags(&self, x: i32, y: i32) -> u8;

    /// OR of the material flags of all pixels in one grid cell. Cells outside the map are empty.
    fn grid_flags(&self, col: i32, row: i32) -> u8;

    /// Removes dirt in a circle. Returns the number of pixels removed.
    fn carve_hole(&mut self, radius: i32, pos: Vec2) -> i32;

    /// Fills empty pixels in a circle with dirt. Returns the number of pixels placed.
    fn place_dirt(&mut self, radius: i32, pos: Vec2) -> i32;

    /// Places a small blob of green dirt. Returns the number of pixels placed.
    fn place_green_dirt(&mut self, pos: Vec2) -> i32;
}

/// Radius of the blob placed by [`TerrainMap::place_green_dirt`] on a [`PixelMap`].
pub const GREEN_DIRT_RADIUS: i32 = 2;

/// In-memory terrain bitmap.
///
/// Pixels are stored row-major as `[y, x]`. The coarse grid is kept in sync on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixelMap {
    pixels: Array2<u8>,
    grid: Array2<u8>,
    grid_width: i32,
    grid_height: i32,
}

impl PixelMap {
    /// Creates an empty map.
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `grid_width` - Width of one grid cell in pixels (at least 1)
    /// * `grid_height` - Height of one grid cell in pixels (at least 1)
    pub fn new(width: usize, height: usize, grid_width: usize, grid_height: usize) -> Self {
        let grid_width = grid_width.max(1);
        let grid_height = grid_height.max(1);
        let cols = width.div_ceil(grid_width);
        let rows = height.div_ceil(grid_height);
        Self {
            pixels: Array2::zeros((height, width)),
            grid: Array2::zeros((rows, cols)),
            grid_width: grid_width as i32,
            grid_height: grid_height as i32,
        }
    }

    /// Sets every pixel of the inclusive rectangle to `flags`. The rectangle is clipped to the
    /// map.
    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, flags: u8) {
        let (x0, x1) = (x0.max(0), x1.min(self.width() - 1));
        let (y0, y1) = (y0.max(0), y1.min(self.height() - 1));
        if x0 > x1 || y0 > y1 {
            return;
        }
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.pixels[[y as usize, x as usize]] = flags;
            }
        }
        self.refresh_grid(x0, y0, x1, y1);
    }

    /// Sets one pixel. Out of range coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, flags: u8) {
        self.fill_rect(x, y, x, y, flags);
    }

    /// Number of pixels holding any of `flags`.
    pub fn count(&self, flags: u8) -> usize {
        self.pixels.iter().filter(|&&px| px & flags != 0).count()
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width() && y < self.height()
    }

    /// Rewrites every pixel in a circle through `f` and returns how many pixels changed.
    fn modify_circle(&mut self, radius: i32, pos: Vec2, f: impl Fn(u8) -> u8) -> i32 {
        let radius = radius.max(0);
        let cx = pos.x as i32;
        let cy = pos.y as i32;
        let mut changed = 0;
        for y in cy - radius..=cy + radius {
            for x in cx - radius..=cx + radius {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy > radius * radius || !self.in_bounds(x, y) {
                    continue;
                }
                let cell = &mut self.pixels[[y as usize, x as usize]];
                let next = f(*cell);
                if next != *cell {
                    *cell = next;
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            self.refresh_grid(cx - radius, cy - radius, cx + radius, cy + radius);
        }
        changed
    }

    fn refresh_grid(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let (gw, gh) = (self.grid_width, self.grid_height);
        let col0 = x0.max(0) / gw;
        let row0 = y0.max(0) / gh;
        let col1 = x1.min(self.width() - 1) / gw;
        let row1 = y1.min(self.height() - 1) / gh;
        for row in row0..=row1 {
            for col in col0..=col1 {
                let px0 = col * gw;
                let py0 = row * gh;
                let px1 = (px0 + gw).min(self.width());
                let py1 = (py0 + gh).min(self.height());
                let mut flags = PX_EMPTY;
                for y in py0..py1 {
                    for x in px0..px1 {
                        flags |= self.pixels[[y as usize, x as usize]];
                    }
                }
                self.grid[[row as usize, col as usize]] = flags;
            }
        }
    }
}

impl TerrainMap for PixelMap {
    fn width(&self) -> i32 {
        self.pixels.ncols() as i32
    }

    fn height(&self) -> i32 {
        self.pixels.nrows() as i32
    }

    fn grid_width(&self) -> i32 {
        self.grid_width
    }

    fn grid_height(&self) -> i32 {
        self.grid_height
    }

    fn pixel_flags(&self, x: i32, y: i32) -> u8 {
        if self.in_bounds(x, y) {
            self.pixels[[y as usize, x as usize]]
        } else {
            PX_EMPTY
        }
    }

    fn grid_flags(&self, col: i32, row: i32) -> u8 {
        if col < 0 || row < 0 {
            return PX_EMPTY;
        }
        self.grid
            .get((row as usize, col as usize))
            .copied()
            .unwrap_or(PX_EMPTY)
    }

    fn carve_hole(&mut self, radius: i32, pos: Vec2) -> i32 {
        self.modify_circle(radius, pos, |px| {
            if px & PX_DIRT != 0 && px & PX_ROCK == 0 {
                PX_EMPTY
            } else {
                px
            }
        })
    }

    fn place_dirt(&mut self, radius: i32, pos: Vec2) -> i32 {
        self.modify_circle(radius, pos, |px| if px == PX_EMPTY { PX_DIRT } else { px })
    }

    fn place_green_dirt(&mut self, pos: Vec2) -> i32 {
        self.place_dirt(GREEN_DIRT_RADIUS, pos)
    }
}
