// The authoritative pathfinding grid.
//
// Two parallel arrays indexed by `col + row * cols`: `solid` (no path may
// enter) and `cost` (traversal multiplier of entering the cell). The grid is a
// mirror: every value is produced by `rebuild.rs` from the terrain layer plus
// the obstacle registry, and nothing else writes to it. It is allocated once
// per session at a fixed size.
//
// The grid is partitioned into square sections of `section_size` cells. Each
// section carries a dirty marker that rebuilds set when a cell inside it
// actually changed; rendering and debug overlays drain them with
// `take_dirty_sections()` to refresh only what moved. Sections are also the
// unit of connectivity recomputation (see `regions.rs`).
//
// `min_cost` is a global lower bound on the cost of any enterable cell. The
// A* heuristic multiplies grid distance by it, so it must never exceed the
// true minimum: full rebuilds recompute it exactly, region rebuilds can only
// lower it.
//
// `generation` increments whenever any cell changes, so snapshot consumers
// can tell whether a cached copy is stale.
//
// See also: `rebuild.rs` (the only writer), `pathfinding.rs` and
// `regions.rs` (readers), `snapshot.rs` for the off-thread copy.
//
// **Critical constraint: determinism.** Cell values are a pure function of
// terrain, obstacles and config.

use crate::config::{IMPASSABLE_COST, NavConfig};
use crate::types::{CellCoord, CellRect, SectionCoord, WorldPos};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavGrid {
    cols: u32,
    rows: u32,
    cell_size: f32,
    solid: Vec<bool>,
    cost: Vec<f32>,
    min_cost: f32,
    section_size: u32,
    section_cols: u32,
    section_rows: u32,
    dirty: Vec<bool>,
    generation: u64,
}

impl NavGrid {
    /// An open grid of unit cost. Callers run a full rebuild before use.
    pub fn new(config: &NavConfig) -> Self {
        let total = config.cell_count();
        let section_size = config.section_size.max(1);
        let section_cols = config.cols.div_ceil(section_size);
        let section_rows = config.rows.div_ceil(section_size);
        Self {
            cols: config.cols,
            rows: config.rows,
            cell_size: config.cell_size,
            solid: vec![false; total],
            cost: vec![1.0; total],
            min_cost: 1.0,
            section_size,
            section_cols,
            section_rows,
            dirty: vec![false; (section_cols * section_rows) as usize],
            generation: 0,
        }
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.solid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solid.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whole-grid rectangle.
    pub fn bounds(&self) -> CellRect {
        CellRect::from_corners(
            CellCoord::new(0, 0),
            CellCoord::new(self.cols as i32 - 1, self.rows as i32 - 1),
        )
    }

    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.col >= 0
            && cell.row >= 0
            && (cell.col as u32) < self.cols
            && (cell.row as u32) < self.rows
    }

    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.col as usize + cell.row as usize * self.cols as usize)
        } else {
            None
        }
    }

    pub fn cell_of_index(&self, i: usize) -> CellCoord {
        let cols = self.cols as usize;
        CellCoord::new((i % cols) as i32, (i / cols) as i32)
    }

    pub fn world_to_cell(&self, pos: WorldPos) -> CellCoord {
        pos.to_cell(self.cell_size)
    }

    pub fn cell_center(&self, cell: CellCoord) -> WorldPos {
        cell.center(self.cell_size)
    }

    /// Solid flag. Out-of-bounds cells count as solid.
    pub fn is_solid(&self, cell: CellCoord) -> bool {
        self.index(cell).is_none_or(|i| self.solid[i])
    }

    /// In bounds and not solid.
    pub fn passable(&self, cell: CellCoord) -> bool {
        !self.is_solid(cell)
    }

    /// Cost of entering a cell. Out-of-bounds cells are impassable.
    pub fn cost(&self, cell: CellCoord) -> f32 {
        self.index(cell).map_or(IMPASSABLE_COST, |i| self.cost[i])
    }

    /// Global lower bound on the cost of any enterable cell.
    pub fn min_cost(&self) -> f32 {
        self.min_cost
    }

    /// Read-only view of the solid array, for debug overlays.
    pub fn solid_cells(&self) -> &[bool] {
        &self.solid
    }

    /// Read-only view of the cost array, for debug overlays.
    pub fn cost_cells(&self) -> &[f32] {
        &self.cost
    }

    pub(crate) fn solid_at(&self, i: usize) -> bool {
        self.solid[i]
    }

    pub(crate) fn cost_at(&self, i: usize) -> f32 {
        self.cost[i]
    }

    /// Overwrite one cell. Returns whether the cell changed; a change marks
    /// its section dirty and bumps the generation.
    pub(crate) fn write_cell(&mut self, i: usize, solid: bool, cost: f32) -> bool {
        if self.solid[i] == solid && self.cost[i].to_bits() == cost.to_bits() {
            return false;
        }
        self.solid[i] = solid;
        self.cost[i] = cost;
        let section = self.section_index(self.cell_of_index(i));
        self.dirty[section] = true;
        self.generation += 1;
        true
    }

    /// Recompute `min_cost` exactly from every non-solid cell. Keeps the old
    /// value when nothing is enterable.
    pub(crate) fn recompute_min_cost(&mut self) {
        let min = self
            .solid
            .iter()
            .zip(&self.cost)
            .filter(|(solid, _)| !**solid)
            .map(|(_, c)| *c)
            .fold(f32::INFINITY, f32::min);
        if min.is_finite() {
            self.min_cost = min;
        }
    }

    /// Lower `min_cost` to cover the non-solid cells of `rect`.
    pub(crate) fn lower_min_cost(&mut self, rect: CellRect) {
        let mut min = self.min_cost;
        for cell in rect.cells() {
            if let Some(i) = self.index(cell) {
                if !self.solid[i] {
                    min = min.min(self.cost[i]);
                }
            }
        }
        self.min_cost = min;
    }

    // -----------------------------------------------------------------------
    // Sections
    // -----------------------------------------------------------------------

    pub fn section_size(&self) -> u32 {
        self.section_size
    }

    pub fn section_cols(&self) -> u32 {
        self.section_cols
    }

    pub fn section_rows(&self) -> u32 {
        self.section_rows
    }

    pub fn section_count(&self) -> usize {
        self.dirty.len()
    }

    /// Section containing an in-bounds cell.
    pub fn section_of(&self, cell: CellCoord) -> SectionCoord {
        SectionCoord::new(
            cell.col as u32 / self.section_size,
            cell.row as u32 / self.section_size,
        )
    }

    pub fn section_index(&self, cell: CellCoord) -> usize {
        let s = self.section_of(cell);
        (s.sx + s.sy * self.section_cols) as usize
    }

    pub fn section_coord(&self, index: usize) -> SectionCoord {
        let cols = self.section_cols as usize;
        SectionCoord::new((index % cols) as u32, (index / cols) as u32)
    }

    /// Cells of a section, clipped to the grid edge.
    pub fn section_rect(&self, section: SectionCoord) -> CellRect {
        let size = self.section_size as i32;
        let min = CellCoord::new(section.sx as i32 * size, section.sy as i32 * size);
        let max = CellCoord::new(
            (min.col + size - 1).min(self.cols as i32 - 1),
            (min.row + size - 1).min(self.rows as i32 - 1),
        );
        CellRect::from_corners(min, max)
    }

    /// Section indices overlapping `rect`, in row-major order.
    pub fn sections_overlapping(&self, rect: CellRect) -> Vec<usize> {
        let Some(clipped) = rect.clip(self.cols, self.rows) else {
            return Vec::new();
        };
        let lo = self.section_of(clipped.min);
        let hi = self.section_of(clipped.max);
        let mut out = Vec::with_capacity(((hi.sx - lo.sx + 1) * (hi.sy - lo.sy + 1)) as usize);
        for sy in lo.sy..=hi.sy {
            for sx in lo.sx..=hi.sx {
                out.push((sx + sy * self.section_cols) as usize);
            }
        }
        out
    }

    pub fn is_section_dirty(&self, section: SectionCoord) -> bool {
        let i = (section.sx + section.sy * self.section_cols) as usize;
        self.dirty.get(i).copied().unwrap_or(false)
    }

    /// Dirty sections in row-major order, without clearing them.
    pub fn dirty_sections(&self) -> Vec<SectionCoord> {
        self.dirty
            .iter()
            .enumerate()
            .filter(|(_, d)| **d)
            .map(|(i, _)| self.section_coord(i))
            .collect()
    }

    /// Dirty sections in row-major order; clears every marker.
    pub fn take_dirty_sections(&mut self) -> Vec<SectionCoord> {
        let out = self.dirty_sections();
        self.dirty.iter_mut().for_each(|d| *d = false);
        out
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Closest passable cell to `origin` within `max_radius` rings (Chebyshev
    /// distance), preferring smaller Manhattan distance, then row-major order.
    /// Returns `origin` itself if it is passable.
    pub fn nearest_passable(&self, origin: CellCoord, max_radius: u32) -> Option<CellCoord> {
        if self.passable(origin) {
            return Some(origin);
        }
        // No ring past the farthest in-bounds cell can hit the grid.
        let reach = [
            i64::from(origin.col),
            i64::from(self.cols) - 1 - i64::from(origin.col),
            i64::from(origin.row),
            i64::from(self.rows) - 1 - i64::from(origin.row),
        ]
        .into_iter()
        .map(i64::abs)
        .max()
        .unwrap_or(0);
        let max_radius = i64::from(max_radius).min(reach) as i32;
        for r in 1..=max_radius {
            let best = ring_cells(origin, r)
                .filter(|c| self.passable(*c))
                .min_by_key(|c| c.manhattan_distance(origin));
            if best.is_some() {
                return best;
            }
        }
        None
    }
}

/// Perimeter cells of the Chebyshev ring at distance `r >= 1`, row-major.
fn ring_cells(origin: CellCoord, r: i32) -> impl Iterator<Item = CellCoord> {
    (-r..=r).flat_map(move |dr| {
        let edge = dr.abs() == r;
        let step = if edge { 1 } else { 2 * r as usize };
        (-r..=r).step_by(step).map(move |dc| origin.offset(dc, dr))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cols: u32, rows: u32, section_size: u32) -> NavGrid {
        NavGrid::new(&NavConfig {
            cols,
            rows,
            cell_size: 1.0,
            section_size,
            ..NavConfig::default()
        })
    }

    #[test]
    fn new_grid_is_open_unit_cost() {
        let g = grid(10, 6, 4);
        assert_eq!(g.len(), 60);
        assert!(g.passable(CellCoord::new(9, 5)));
        assert_eq!(g.cost(CellCoord::new(0, 0)), 1.0);
        assert_eq!(g.min_cost(), 1.0);
        assert_eq!(g.generation(), 0);
    }

    #[test]
    fn out_of_bounds_is_solid_and_impassable() {
        let g = grid(4, 4, 4);
        assert!(g.is_solid(CellCoord::new(4, 0)));
        assert!(g.is_solid(CellCoord::new(0, -1)));
        assert_eq!(g.cost(CellCoord::new(-1, -1)), IMPASSABLE_COST);
    }

    #[test]
    fn section_geometry_handles_ragged_edges() {
        let g = grid(10, 6, 4);
        assert_eq!(g.section_cols(), 3);
        assert_eq!(g.section_rows(), 2);
        let last = g.section_rect(SectionCoord::new(2, 1));
        assert_eq!(last.min, CellCoord::new(8, 4));
        assert_eq!(last.max, CellCoord::new(9, 5));
        let touched = g.sections_overlapping(CellRect::from_corners(
            CellCoord::new(3, 3),
            CellCoord::new(4, 4),
        ));
        assert_eq!(touched, vec![0, 1, 3, 4]);
    }

    #[test]
    fn write_cell_marks_only_changed_sections_dirty() {
        let mut g = grid(8, 8, 4);
        let i = g.index(CellCoord::new(5, 1)).unwrap();
        assert!(!g.write_cell(i, false, 1.0));
        assert!(g.dirty_sections().is_empty());
        assert!(g.write_cell(i, true, 1.0));
        assert_eq!(g.dirty_sections(), vec![SectionCoord::new(1, 0)]);
        assert_eq!(g.generation(), 1);
        assert_eq!(g.take_dirty_sections(), vec![SectionCoord::new(1, 0)]);
        assert!(g.dirty_sections().is_empty());
    }

    #[test]
    fn min_cost_recompute_and_lower() {
        let mut g = grid(4, 4, 4);
        let a = g.index(CellCoord::new(0, 0)).unwrap();
        let b = g.index(CellCoord::new(1, 0)).unwrap();
        g.write_cell(a, false, 0.5);
        g.write_cell(b, true, 0.1);
        g.recompute_min_cost();
        // The solid cell is never entered, so it does not bound the heuristic.
        assert_eq!(g.min_cost(), 0.5);
        g.write_cell(a, false, 2.0);
        g.lower_min_cost(CellRect::single(CellCoord::new(0, 0)));
        // Lowering never raises.
        assert_eq!(g.min_cost(), 0.5);
    }

    #[test]
    fn nearest_passable_searches_rings() {
        let mut g = grid(8, 8, 4);
        for cell in CellRect::from_corners(CellCoord::new(2, 2), CellCoord::new(4, 4)).cells() {
            let i = g.index(cell).unwrap();
            g.write_cell(i, true, 1.0);
        }
        let center = CellCoord::new(3, 3);
        assert_eq!(g.nearest_passable(center, 1), None);
        assert_eq!(g.nearest_passable(center, 2), Some(CellCoord::new(3, 1)));
        assert_eq!(g.nearest_passable(CellCoord::new(0, 0), 0), Some(CellCoord::new(0, 0)));
    }

    #[test]
    fn nearest_passable_clamps_huge_radius() {
        let mut g = grid(8, 8, 4);
        let center = CellCoord::new(3, 3);
        let i = g.index(center).unwrap();
        g.write_cell(i, true, 1.0);
        assert_eq!(g.nearest_passable(center, u32::MAX), Some(CellCoord::new(3, 2)));
    }

    #[test]
    fn nearest_passable_on_solid_grid_is_none() {
        let mut g = grid(8, 8, 4);
        for i in 0..g.len() {
            g.write_cell(i, true, 1.0);
        }
        assert_eq!(g.nearest_passable(CellCoord::new(3, 3), u32::MAX), None);
        assert_eq!(g.nearest_passable(CellCoord::new(-50, 4), 1_000), None);
    }

    #[test]
    fn nearest_passable_from_outside_the_grid() {
        let g = grid(8, 8, 4);
        assert_eq!(g.nearest_passable(CellCoord::new(-3, 0), 10), Some(CellCoord::new(0, 0)));
        assert_eq!(g.nearest_passable(CellCoord::new(-3, 0), 2), None);
    }

    #[test]
    fn ring_cells_walk_only_the_perimeter() {
        let cells: Vec<_> = ring_cells(CellCoord::new(0, 0), 1).collect();
        assert_eq!(cells.len(), 8);
        assert_eq!(cells[0], CellCoord::new(-1, -1));
        assert_eq!(cells[3], CellCoord::new(-1, 0));
        assert_eq!(cells[4], CellCoord::new(1, 0));
        assert_eq!(ring_cells(CellCoord::new(5, 5), 3).count(), 24);
    }
}
