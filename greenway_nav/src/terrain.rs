// Terrain layer: per-cell base terrain and painted floor, and the cost model
// that fuses them.
//
// `cost(cell) = terrain_base_cost(terrain[cell]) * floor_multiplier(floor[cell])`.
// Multiplying instead of replacing means a floor always helps, even on slow
// terrain, but can never cancel a severe penalty outright. `passable()` is the
// single terrain-level impassability test: it is false whenever the fused cost
// reaches `IMPASSABLE_COST`, regardless of any flag elsewhere. Floors are
// ignored on impassable terrain, so painting a road across deep water leaves
// it impassable. Buildings and natural obstacles add solidity on top of this
// in `rebuild.rs`.
//
// The layer holds the source data the nav grid is rebuilt from. It is only
// mutated through `NavWorld` edits, which also queue the matching rebuild.
// The `CostTable` maps from config are compiled into a dense lookup table at
// construction, so the per-cell cost is two array reads and a multiply.
//
// See also: `config.rs` for `CostTable`, `nav_grid.rs` for the grid mirrored
// from this layer, `rebuild.rs` for the reset step that reads it.

use crate::config::{CostTable, IMPASSABLE_COST};
use crate::types::{CellCoord, CellRect};
use serde::{Deserialize, Serialize};

/// Base terrain of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TerrainType {
    #[default]
    Grass,
    Dirt,
    Sand,
    Mud,
    ShallowWater,
    DeepWater,
    Rock,
    Lava,
}

impl TerrainType {
    pub const ALL: [TerrainType; 8] = [
        TerrainType::Grass,
        TerrainType::Dirt,
        TerrainType::Sand,
        TerrainType::Mud,
        TerrainType::ShallowWater,
        TerrainType::DeepWater,
        TerrainType::Rock,
        TerrainType::Lava,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Painted floor overlay of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FloorType {
    #[default]
    None,
    BasicPath,
    Road,
    Planks,
    Carpet,
}

impl FloorType {
    pub const ALL: [FloorType; 5] = [
        FloorType::None,
        FloorType::BasicPath,
        FloorType::Road,
        FloorType::Planks,
        FloorType::Carpet,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Dense cost lookup compiled from a `CostTable`. Missing entries (only
/// possible with an unvalidated table) fall back to neutral 1.0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct CostLut {
    terrain: [f32; TerrainType::ALL.len()],
    floor: [f32; FloorType::ALL.len()],
}

impl CostLut {
    fn compile(costs: &CostTable) -> Self {
        let mut terrain = [1.0; TerrainType::ALL.len()];
        for t in TerrainType::ALL {
            if let Some(c) = costs.terrain.get(&t) {
                terrain[t.index()] = *c;
            }
        }
        let mut floor = [1.0; FloorType::ALL.len()];
        for f in FloorType::ALL {
            if let Some(m) = costs.floor.get(&f) {
                floor[f.index()] = *m;
            }
        }
        Self { terrain, floor }
    }
}

/// Per-cell terrain and floor arrays, indexed like `NavGrid`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainLayer {
    cols: u32,
    rows: u32,
    terrain: Vec<TerrainType>,
    floor: Vec<FloorType>,
    lut: CostLut,
}

impl TerrainLayer {
    /// A `cols x rows` layer of bare grass.
    pub fn new(cols: u32, rows: u32, costs: &CostTable) -> Self {
        let total = cols as usize * rows as usize;
        Self {
            cols,
            rows,
            terrain: vec![TerrainType::Grass; total],
            floor: vec![FloorType::None; total],
            lut: CostLut::compile(costs),
        }
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.col >= 0
            && cell.row >= 0
            && (cell.col as u32) < self.cols
            && (cell.row as u32) < self.rows
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.col as usize + cell.row as usize * self.cols as usize)
        } else {
            None
        }
    }

    /// Terrain at a cell. Out-of-bounds reads return the default terrain.
    pub fn terrain_at(&self, cell: CellCoord) -> TerrainType {
        self.index(cell).map(|i| self.terrain[i]).unwrap_or_default()
    }

    /// Floor at a cell. Out-of-bounds reads return no floor.
    pub fn floor_at(&self, cell: CellCoord) -> FloorType {
        self.index(cell).map(|i| self.floor[i]).unwrap_or_default()
    }

    /// Set a cell's terrain. Returns whether anything changed; out-of-bounds
    /// writes are no-ops.
    pub fn set_terrain(&mut self, cell: CellCoord, terrain: TerrainType) -> bool {
        match self.index(cell) {
            Some(i) if self.terrain[i] != terrain => {
                self.terrain[i] = terrain;
                true
            }
            _ => false,
        }
    }

    /// Set a cell's floor. Returns whether anything changed.
    pub fn set_floor(&mut self, cell: CellCoord, floor: FloorType) -> bool {
        match self.index(cell) {
            Some(i) if self.floor[i] != floor => {
                self.floor[i] = floor;
                true
            }
            _ => false,
        }
    }

    /// Fill a rectangle with one terrain type. Returns the in-bounds part of
    /// the rectangle if any cell changed.
    pub fn fill_terrain(&mut self, rect: CellRect, terrain: TerrainType) -> Option<CellRect> {
        let clipped = rect.clip(self.cols, self.rows)?;
        let mut changed = false;
        for cell in clipped.cells() {
            changed |= self.set_terrain(cell, terrain);
        }
        changed.then_some(clipped)
    }

    /// Paint a rectangle with one floor type. Returns the in-bounds part of
    /// the rectangle if any cell changed.
    pub fn paint_floor(&mut self, rect: CellRect, floor: FloorType) -> Option<CellRect> {
        let clipped = rect.clip(self.cols, self.rows)?;
        let mut changed = false;
        for cell in clipped.cells() {
            changed |= self.set_floor(cell, floor);
        }
        changed.then_some(clipped)
    }

    /// Fused traversal cost. Out-of-bounds cells are impassable.
    pub fn cost(&self, cell: CellCoord) -> f32 {
        match self.index(cell) {
            Some(i) => self.cost_at_index(i),
            None => IMPASSABLE_COST,
        }
    }

    /// Terrain-level passability: false whenever the fused cost reaches
    /// `IMPASSABLE_COST`.
    pub fn passable(&self, cell: CellCoord) -> bool {
        self.cost(cell) < IMPASSABLE_COST
    }

    /// Fused cost by linear index. Caller guarantees `i` is in range.
    /// Floors do not apply to impassable terrain.
    pub(crate) fn cost_at_index(&self, i: usize) -> f32 {
        let base = self.lut.terrain[self.terrain[i].index()];
        if base >= IMPASSABLE_COST {
            return base;
        }
        base * self.lut.floor[self.floor[i].index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> TerrainLayer {
        TerrainLayer::new(8, 8, &CostTable::default())
    }

    #[test]
    fn new_layer_is_grass_without_floor() {
        let layer = layer();
        assert_eq!(layer.terrain_at(CellCoord::new(3, 3)), TerrainType::Grass);
        assert_eq!(layer.floor_at(CellCoord::new(3, 3)), FloorType::None);
        assert_eq!(layer.cost(CellCoord::new(3, 3)), 1.0);
    }

    #[test]
    fn cost_is_terrain_times_floor() {
        let mut layer = layer();
        let cell = CellCoord::new(2, 5);
        layer.set_terrain(cell, TerrainType::Mud);
        assert_eq!(layer.cost(cell), 2.5);
        layer.set_floor(cell, FloorType::Road);
        assert!((layer.cost(cell) - 1.25).abs() < 1e-6);
    }

    #[test]
    fn floor_never_makes_impassable_terrain_passable() {
        let mut layer = layer();
        let cell = CellCoord::new(1, 1);
        layer.set_terrain(cell, TerrainType::DeepWater);
        assert!(!layer.passable(cell));
        layer.set_floor(cell, FloorType::Road);
        assert_eq!(layer.cost(cell), IMPASSABLE_COST);
        assert!(!layer.passable(cell));
        assert_eq!(layer.floor_at(cell), FloorType::Road);
    }

    #[test]
    fn out_of_bounds_is_impassable_and_writes_are_noops() {
        let mut layer = layer();
        let outside = CellCoord::new(-1, 4);
        assert!(!layer.passable(outside));
        assert!(!layer.set_terrain(outside, TerrainType::Rock));
        assert!(!layer.set_floor(CellCoord::new(8, 0), FloorType::Road));
    }

    #[test]
    fn set_reports_changes_only() {
        let mut layer = layer();
        let cell = CellCoord::new(0, 0);
        assert!(!layer.set_terrain(cell, TerrainType::Grass));
        assert!(layer.set_terrain(cell, TerrainType::Sand));
        assert!(!layer.set_terrain(cell, TerrainType::Sand));
    }

    #[test]
    fn paint_floor_clips_and_reports() {
        let mut layer = layer();
        let rect = CellRect::from_corners(CellCoord::new(6, 6), CellCoord::new(12, 12));
        let painted = layer.paint_floor(rect, FloorType::BasicPath).unwrap();
        assert_eq!(painted.max, CellCoord::new(7, 7));
        assert_eq!(layer.floor_at(CellCoord::new(7, 7)), FloorType::BasicPath);
        // Repainting the same floor changes nothing.
        assert!(layer.paint_floor(rect, FloorType::BasicPath).is_none());
    }

    #[test]
    fn custom_cost_table_is_respected() {
        let mut costs = CostTable::default();
        costs.terrain.insert(TerrainType::Sand, 4.0);
        let mut layer = TerrainLayer::new(4, 4, &costs);
        layer.set_terrain(CellCoord::new(0, 0), TerrainType::Sand);
        assert_eq!(layer.cost(CellCoord::new(0, 0)), 4.0);
    }
}
