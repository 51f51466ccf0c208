//! Uniform spatial hash grid for broad-phase queries.
//!
//! The racer grid is rebuilt from scratch every tick (`clear` then `insert`
//! for each live racer), so there is no removal API. A second grid built once
//! per race indexes obstacle bounding boxes.
//!
//! Every cell list only holds ids whose bounding shape overlaps the cell, so
//! a query never has to re-check membership. Query results are sorted and
//! de-duplicated to keep iteration order stable.

use std::collections::HashMap;

use crate::geometry::Aabb;
use crate::math::{Vec2, EPSILON};

/// Cell coordinate.
pub type CellKey = (i32, i32);

/// Default cell size when no racer radius is known.
pub const DEFAULT_CELL_SIZE: f32 = 64.0;

/// Largest number of cells along one axis a single insert may touch.
///
/// Oversized shapes still get indexed, just coarsely clamped, so a bad
/// configuration cannot make insertion unbounded.
const MAX_CELLS_PER_AXIS: i32 = 4096;

/// Bucket index keyed by cell coordinate.
#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    cell_size: f32,
    cells: HashMap<CellKey, Vec<u32>>,
}

impl SpatialHashGrid {
    /// Create an empty grid. Non-finite or non-positive sizes fall back to
    /// [`DEFAULT_CELL_SIZE`].
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > EPSILON {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// Cell edge length.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Ids stored in one cell.
    #[must_use]
    pub fn cell(&self, key: CellKey) -> &[u32] {
        self.cells.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Iterate over all non-empty cells (unordered).
    pub fn cells(&self) -> impl Iterator<Item = (&CellKey, &Vec<u32>)> {
        self.cells.iter()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Cell containing a point.
    #[must_use]
    pub fn cell_key(&self, p: Vec2) -> CellKey {
        (
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
        )
    }

    /// Bounds of a cell.
    #[must_use]
    pub fn cell_bounds(&self, key: CellKey) -> Aabb {
        let min = Vec2::new(key.0 as f32, key.1 as f32) * self.cell_size;
        Aabb {
            min,
            max: min + Vec2::splat(self.cell_size),
        }
    }

    fn key_range(&self, aabb: Aabb) -> Option<(CellKey, CellKey)> {
        if !aabb.is_finite() {
            return None;
        }
        let lo = self.cell_key(aabb.min);
        let mut hi = self.cell_key(aabb.max);
        hi.0 = hi.0.min(lo.0.saturating_add(MAX_CELLS_PER_AXIS));
        hi.1 = hi.1.min(lo.1.saturating_add(MAX_CELLS_PER_AXIS));
        Some((lo, hi))
    }

    /// Insert a circle into every cell it overlaps.
    ///
    /// Cells in the circle's bounding box that the circle does not actually
    /// reach (the box corners) are skipped. Non-finite input is ignored.
    pub fn insert(&mut self, id: u32, center: Vec2, radius: f32) {
        if !center.is_finite() || !radius.is_finite() {
            return;
        }
        let Some((lo, hi)) = self.key_range(Aabb::from_circle(center, radius)) else {
            return;
        };
        let r_sq = radius * radius;
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                let key = (cx, cy);
                if self.cell_bounds(key).distance_squared_to(center) <= r_sq {
                    self.cells.entry(key).or_default().push(id);
                }
            }
        }
    }

    /// Insert a box into every cell it overlaps.
    ///
    /// Returns `false` when nothing or only part of the box was indexed: a
    /// non-finite box, or one spanning more than 4096 cells on an axis.
    pub fn insert_aabb(&mut self, id: u32, aabb: Aabb) -> bool {
        let Some((lo, hi)) = self.key_range(aabb) else {
            return false;
        };
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                self.cells.entry((cx, cy)).or_default().push(id);
            }
        }
        hi == self.cell_key(aabb.max)
    }

    fn collect_range(&self, lo: CellKey, hi: CellKey, out: &mut Vec<u32>) {
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                if let Some(ids) = self.cells.get(&(cx, cy)) {
                    out.extend_from_slice(ids);
                }
            }
        }
    }

    /// All ids sharing a cell with the circle of racer `id`, excluding `id`.
    ///
    /// The circle is re-derived from `center`/`radius` rather than looked up,
    /// which gives the same cells the racer was inserted into.
    #[must_use]
    pub fn query_nearby(&self, id: u32, center: Vec2, radius: f32) -> Vec<u32> {
        let mut out = Vec::new();
        self.query_nearby_into(id, center, radius, &mut out);
        out
    }

    /// Like [`query_nearby`](Self::query_nearby) but reuses `out`.
    pub fn query_nearby_into(&self, id: u32, center: Vec2, radius: f32, out: &mut Vec<u32>) {
        out.clear();
        if !center.is_finite() || !radius.is_finite() {
            return;
        }
        let Some((lo, hi)) = self.key_range(Aabb::from_circle(center, radius)) else {
            return;
        };
        let r_sq = radius * radius;
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                let key = (cx, cy);
                if self.cell_bounds(key).distance_squared_to(center) > r_sq {
                    continue;
                }
                if let Some(ids) = self.cells.get(&key) {
                    out.extend(ids.iter().copied().filter(|&other| other != id));
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    /// All ids in cells overlapping the rectangle `(x, y, w, h)`.
    #[must_use]
    pub fn query_rect(&self, x: f32, y: f32, w: f32, h: f32) -> Vec<u32> {
        let mut out = Vec::new();
        let aabb = Aabb::from_corners(Vec2::new(x, y), Vec2::new(x + w, y + h));
        if let Some((lo, hi)) = self.key_range(aabb) {
            self.collect_range(lo, hi, &mut out);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// All ids in cells overlapping a circle. Used for area effects.
    #[must_use]
    pub fn query_circle(&self, center: Vec2, radius: f32) -> Vec<u32> {
        let mut out = Vec::new();
        self.query_circle_into(center, radius, &mut out);
        out
    }

    /// Like [`query_circle`](Self::query_circle) but reuses `out`.
    pub fn query_circle_into(&self, center: Vec2, radius: f32, out: &mut Vec<u32>) {
        out.clear();
        if let Some((lo, hi)) = self.key_range(Aabb::from_circle(center, radius)) {
            self.collect_range(lo, hi, out);
        }
        out.sort_unstable();
        out.dedup();
    }
}

impl Default for SpatialHashGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}
