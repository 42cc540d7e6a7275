//! Projectile storage and the bucketed spatial index.
//!
//! Projectiles live in an ordered map keyed by id, so iteration order is the spawn order on
//! every peer. Each projectile is also filed under every map grid cell its hit box covers.
//! Neighbour queries walk the cells around a hit box and return each id once, ascending.

use std::collections::{BTreeMap, BTreeSet};

use super::geometry::IVec2;
use super::projectile::{Projectile, ProjectileId};

/// Cell coordinates `(col, row)`.
type Cell = (i32, i32);

/// Inclusive range of cells, top-left to bottom-right.
type Span = (Cell, Cell);

/// Live projectiles plus their bucket index.
#[derive(Debug, Clone)]
pub struct ProjectilePool {
    projectiles: BTreeMap<ProjectileId, Projectile>,
    span_of: BTreeMap<ProjectileId, Span>,
    buckets: BTreeMap<Cell, BTreeSet<ProjectileId>>,
    cell_width: i32,
    cell_height: i32,
    cols: i32,
    rows: i32,
    next_id: u64,
}

impl ProjectilePool {
    /// Creates an empty pool whose buckets match a map grid.
    ///
    /// # Arguments
    ///
    /// * `cell_width` - Width of one bucket in pixels
    /// * `cell_height` - Height of one bucket in pixels
    /// * `cols` - Number of bucket columns
    /// * `rows` - Number of bucket rows
    pub fn new(cell_width: i32, cell_height: i32, cols: i32, rows: i32) -> Self {
        Self {
            projectiles: BTreeMap::new(),
            span_of: BTreeMap::new(),
            buckets: BTreeMap::new(),
            cell_width: cell_width.max(1),
            cell_height: cell_height.max(1),
            cols: cols.max(1),
            rows: rows.max(1),
            next_id: 0,
        }
    }

    /// Reserves the next id.
    pub fn next_id(&mut self) -> ProjectileId {
        let id = ProjectileId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Bucket of a pixel position. Positions outside the map fall into the nearest edge cell.
    fn cell_at(&self, pos: IVec2) -> Cell {
        let col = pos.x.div_euclid(self.cell_width).clamp(0, self.cols - 1);
        let row = pos.y.div_euclid(self.cell_height).clamp(0, self.rows - 1);
        (col, row)
    }

    /// Cells covered by a hit box.
    fn span(&self, pos: IVec2, radius: IVec2) -> Span {
        (self.cell_at(pos - radius), self.cell_at(pos + radius))
    }

    fn cells(span: Span) -> impl Iterator<Item = Cell> {
        let ((left, top), (right, bottom)) = span;
        (left..=right).flat_map(move |col| (top..=bottom).map(move |row| (col, row)))
    }

    fn file(&mut self, prj: &Projectile) {
        let span = self.span(prj.pixel_pos(), prj.radius);
        if let Some(old) = self.span_of.insert(prj.id, span) {
            if old == span {
                return;
            }
            self.unfile(prj.id, old);
        }
        for cell in Self::cells(span) {
            self.buckets.entry(cell).or_default().insert(prj.id);
        }
    }

    fn unfile(&mut self, id: ProjectileId, span: Span) {
        for cell in Self::cells(span) {
            if let Some(bucket) = self.buckets.get_mut(&cell) {
                bucket.remove(&id);
                if bucket.is_empty() {
                    self.buckets.remove(&cell);
                }
            }
        }
    }

    /// Adds a projectile and files it in the buckets under its hit box.
    pub fn insert(&mut self, prj: Projectile) {
        self.file(&prj);
        self.projectiles.insert(prj.id, prj);
    }

    /// Projectile by id.
    pub fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.get(&id)
    }

    /// Mutable projectile by id. The bucket is not refreshed; callers that move the
    /// projectile must go through [`take`](Self::take) and [`restore`](Self::restore).
    pub fn get_mut(&mut self, id: ProjectileId) -> Option<&mut Projectile> {
        self.projectiles.get_mut(&id)
    }

    /// Removes a projectile for simulation. It stays filed in its buckets, so neighbour
    /// queries still return its id, but lookups skip it until it is restored.
    pub fn take(&mut self, id: ProjectileId) -> Option<Projectile> {
        self.projectiles.remove(&id)
    }

    /// Puts a simulated projectile back and refreshes its buckets, which follow both its
    /// position and its current radius.
    pub fn restore(&mut self, prj: Projectile) {
        self.insert(prj);
    }

    /// Drops a projectile that was taken out and deleted.
    pub fn discard(&mut self, id: ProjectileId) {
        self.projectiles.remove(&id);
        if let Some(span) = self.span_of.remove(&id) {
            self.unfile(id, span);
        }
    }

    /// Ids of all live projectiles, ascending.
    pub fn ids(&self) -> Vec<ProjectileId> {
        self.projectiles.keys().copied().collect()
    }

    /// Iterates live projectiles in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    /// Number of live projectiles.
    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    /// Whether no projectile is alive.
    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    /// Ids filed in the buckets around a hit box, each once and ascending.
    ///
    /// Covers every cell the box touches plus a ring of one cell, which for boxes smaller
    /// than a cell is the 3×3 neighbourhood.
    pub fn neighbours(&self, pos: IVec2, radius: IVec2) -> Vec<ProjectileId> {
        let ((left, top), (right, bottom)) = self.span(pos, radius);
        let ring = (
            ((left - 1).max(0), (top - 1).max(0)),
            ((right + 1).min(self.cols - 1), (bottom + 1).min(self.rows - 1)),
        );
        let ids: BTreeSet<ProjectileId> = Self::cells(ring)
            .filter_map(|cell| self.buckets.get(&cell))
            .flat_map(|bucket| bucket.iter().copied())
            .collect();
        ids.into_iter().collect()
    }
}
