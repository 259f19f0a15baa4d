// Core types shared across the navigation crate.
//
// Defines grid addressing (`CellCoord`, `CellRect`, `SectionCoord`), world
// positions (`WorldPos`), compact IDs for obstacles and regions, and the
// `Movement` connectivity mode. All types derive `Serialize`/`Deserialize`
// so that grid snapshots and world edits can cross thread boundaries as
// plain data.
//
// Cells are addressed by signed `(col, row)` so that conversions from world
// space can represent out-of-bounds positions without wrapping; the grid
// owns the bounds check. Linear index is `col + row * cols`.
//
// **Critical constraint: determinism.** Everything here is `Ord` where it is
// used as a map key, so registries can use `BTreeMap` and iterate in a fixed
// order.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A grid cell address. Column grows east, row grows south.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub col: i32,
    pub row: i32,
}

impl CellCoord {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Saturates at the `i32` range, which is always far out of bounds.
    pub fn offset(self, dc: i32, dr: i32) -> Self {
        Self::new(self.col.saturating_add(dc), self.row.saturating_add(dr))
    }

    /// Manhattan distance in cells.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.col - other.col).unsigned_abs() + (self.row - other.row).unsigned_abs()
    }

    /// World-space center of this cell.
    pub fn center(self, cell_size: f32) -> WorldPos {
        WorldPos::new(
            (self.col as f32 + 0.5) * cell_size,
            (self.row as f32 + 0.5) * cell_size,
        )
    }

    /// Octile distance: diagonal steps cost sqrt(2), straight steps 1.
    pub fn octile_distance(self, other: Self) -> f32 {
        let dx = (self.col - other.col).unsigned_abs() as f32;
        let dy = (self.row - other.row).unsigned_abs() as f32;
        let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
        hi - lo + lo * std::f32::consts::SQRT_2
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// A position in continuous world space.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
}

impl WorldPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// The cell containing this position. The world origin is the top-left
    /// corner of cell `(0, 0)`.
    pub fn to_cell(self, cell_size: f32) -> CellCoord {
        CellCoord::new(
            (self.x / cell_size).floor() as i32,
            (self.y / cell_size).floor() as i32,
        )
    }

    pub fn distance_squared(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(self, other: Self) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

/// An inclusive, axis-aligned rectangle of cells. Always non-empty: every
/// constructor that could produce an empty rectangle returns `Option`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRect {
    pub min: CellCoord,
    pub max: CellCoord,
}

impl CellRect {
    /// Rectangle spanning two corners in any order.
    pub fn from_corners(a: CellCoord, b: CellCoord) -> Self {
        Self {
            min: CellCoord::new(a.col.min(b.col), a.row.min(b.row)),
            max: CellCoord::new(a.col.max(b.col), a.row.max(b.row)),
        }
    }

    /// Rectangle with its top-left cell at `(col, row)`. `None` if either
    /// dimension is not positive.
    pub fn from_origin_size(col: i32, row: i32, width: i32, height: i32) -> Option<Self> {
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(Self {
            min: CellCoord::new(col, row),
            max: CellCoord::new(col + width - 1, row + height - 1),
        })
    }

    pub fn single(cell: CellCoord) -> Self {
        Self { min: cell, max: cell }
    }

    pub fn width(&self) -> u32 {
        (self.max.col - self.min.col) as u32 + 1
    }

    pub fn height(&self) -> u32 {
        (self.max.row - self.min.row) as u32 + 1
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.col >= self.min.col
            && cell.col <= self.max.col
            && cell.row >= self.min.row
            && cell.row <= self.max.row
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.min.col <= other.max.col
            && other.min.col <= self.max.col
            && self.min.row <= other.max.row
            && other.min.row <= self.max.row
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self {
            min: CellCoord::new(self.min.col.max(other.min.col), self.min.row.max(other.min.row)),
            max: CellCoord::new(self.max.col.min(other.max.col), self.max.row.min(other.max.row)),
        })
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: CellCoord::new(self.min.col.min(other.min.col), self.min.row.min(other.min.row)),
            max: CellCoord::new(self.max.col.max(other.max.col), self.max.row.max(other.max.row)),
        }
    }

    /// True if the rectangles overlap or share an edge (no gap between them).
    pub fn touches(&self, other: &Self) -> bool {
        self.expand(1).intersects(other)
    }

    /// Grow by `cells` on every side.
    pub fn expand(&self, cells: i32) -> Self {
        Self {
            min: self.min.offset(-cells, -cells),
            max: self.max.offset(cells, cells),
        }
    }

    /// Clip to a `cols x rows` grid. `None` if nothing remains.
    pub fn clip(&self, cols: u32, rows: u32) -> Option<Self> {
        if cols == 0 || rows == 0 {
            return None;
        }
        let grid = Self {
            min: CellCoord::new(0, 0),
            max: CellCoord::new(cols as i32 - 1, rows as i32 - 1),
        };
        self.intersection(&grid)
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + use<> {
        let (min, max) = (self.min, self.max);
        (min.row..=max.row)
            .flat_map(move |row| (min.col..=max.col).map(move |col| CellCoord::new(col, row)))
    }
}

impl fmt::Display for CellRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.min, self.max)
    }
}

/// Address of a fixed-size grid section (the unit of dirty tracking and of
/// connectivity recomputation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionCoord {
    pub sx: u32,
    pub sy: u32,
}

impl SectionCoord {
    pub const fn new(sx: u32, sy: u32) -> Self {
        Self { sx, sy }
    }
}

// ---------------------------------------------------------------------------
// IDs — compact integers assigned in insertion order.
// ---------------------------------------------------------------------------

/// Identifier of a building in the obstacle registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

/// Identifier of a natural obstacle (tree, rock, ore node) in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

/// Identifier of a connectivity region: the owning section index in the
/// upper 16 bits, the region's ordinal within that section in the lower 16.
///
/// Because a section's regions are always numbered by the same row-major
/// flood-fill order, the id of a region is a pure function of the section's
/// solidity, independent of whether it was produced by a full or a partial
/// rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u32);

impl RegionId {
    /// Sentinel stored in per-cell region arrays for solid cells.
    pub const NONE: u32 = u32::MAX;

    pub fn new(section: u32, local: u16) -> Self {
        Self((section << 16) | local as u32)
    }

    pub fn section(self) -> u32 {
        self.0 >> 16
    }

    pub fn local(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}.{}", self.section(), self.local())
    }
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// How agents step between cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Movement {
    /// 4-connected. Heuristic: Manhattan distance.
    #[default]
    Cardinal,
    /// 8-connected without corner cutting. Diagonal steps cost `sqrt(2)`
    /// times the destination cost. Heuristic: octile distance.
    Octile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_and_octile_distance() {
        let a = CellCoord::new(0, 0);
        let b = CellCoord::new(3, 4);
        assert_eq!(a.manhattan_distance(b), 7);
        let octile = a.octile_distance(b);
        assert!((octile - (1.0 + 3.0 * std::f32::consts::SQRT_2)).abs() < 1e-5);
    }

    #[test]
    fn world_cell_conversion() {
        let pos = WorldPos::new(33.0, 15.9);
        assert_eq!(pos.to_cell(16.0), CellCoord::new(2, 0));
        assert_eq!(WorldPos::new(-0.1, 0.0).to_cell(16.0), CellCoord::new(-1, 0));
        assert_eq!(CellCoord::new(2, 0).center(16.0), WorldPos::new(40.0, 8.0));
    }

    #[test]
    fn rect_from_origin_size_rejects_empty() {
        assert!(CellRect::from_origin_size(0, 0, 0, 3).is_none());
        assert!(CellRect::from_origin_size(0, 0, 3, -1).is_none());
        let r = CellRect::from_origin_size(2, 3, 4, 2).unwrap();
        assert_eq!(r.min, CellCoord::new(2, 3));
        assert_eq!(r.max, CellCoord::new(5, 4));
        assert_eq!(r.area(), 8);
    }

    #[test]
    fn rect_clip_and_intersection() {
        let r = CellRect::from_corners(CellCoord::new(-3, -3), CellCoord::new(2, 2));
        let clipped = r.clip(10, 10).unwrap();
        assert_eq!(clipped.min, CellCoord::new(0, 0));
        assert_eq!(clipped.max, CellCoord::new(2, 2));

        let outside = CellRect::from_corners(CellCoord::new(20, 20), CellCoord::new(25, 25));
        assert!(outside.clip(10, 10).is_none());
    }

    #[test]
    fn rect_touches_adjacent_but_not_gapped() {
        let a = CellRect::from_corners(CellCoord::new(0, 0), CellCoord::new(2, 2));
        let b = CellRect::from_corners(CellCoord::new(3, 0), CellCoord::new(4, 2));
        let c = CellRect::from_corners(CellCoord::new(5, 0), CellCoord::new(6, 2));
        assert!(a.touches(&b));
        assert!(!a.touches(&c));
    }

    #[test]
    fn rect_cells_row_major() {
        let r = CellRect::from_corners(CellCoord::new(1, 1), CellCoord::new(2, 2));
        let cells: Vec<_> = r.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(1, 1),
                CellCoord::new(2, 1),
                CellCoord::new(1, 2),
                CellCoord::new(2, 2),
            ]
        );
    }

    #[test]
    fn region_id_packs_section_and_local() {
        let id = RegionId::new(37, 5);
        assert_eq!(id.section(), 37);
        assert_eq!(id.local(), 5);
        assert_ne!(id.0, RegionId::NONE);
    }
}
