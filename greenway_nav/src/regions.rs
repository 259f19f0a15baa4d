// Hierarchical connectivity: sections, regions, links and components.
//
// Each grid section is flood-filled (4-connected, within the section only)
// into regions: maximal sets of mutually reachable non-solid cells. Regions
// in adjacent sections that share an open edge get a `RegionLink` in both
// directions, carrying one representative cell pair (the first open pair in
// scan order along the boundary). Walking the region graph labels every
// region with a connected component, which makes "can A reach B at all?" an
// O(1) comparison instead of a failed full-grid A* search.
//
// Diagonal movement never connects anything 4-connectivity does not: a
// diagonal step is only legal when both orthogonal neighbours are open, and
// they form a 4-connected detour. So the same components serve both
// movement modes.
//
// Region ids are `section << 16 | ordinal`, where the ordinal comes from a
// row-major scan of the section. Links are kept sorted. Together these make
// the index a pure function of the grid's solidity: `rebuild_region()` over
// any box yields exactly what `rebuild_all()` would.
//
// See also: `nav_grid.rs` (solidity source, section geometry),
// `rebuild.rs` (drives recomputation), `pathfinding.rs` (reachability
// pre-check).
//
// **Critical constraint: determinism.** No hash-order iteration leaks into
// ids, link order or component labels; the FxHashSet below only dedups.

use crate::nav_grid::NavGrid;
use crate::types::{CellCoord, CellRect, RegionId, SectionCoord};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Component label for regions not yet reached by labelling.
const UNLABELLED: u32 = u32::MAX;

/// An edge between two regions across a section boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionLink {
    pub to: RegionId,
    /// Open cell on this region's side of the boundary.
    pub from_cell: CellCoord,
    /// Adjacent open cell in the linked region.
    pub to_cell: CellCoord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub cell_count: u32,
    pub bounds: CellRect,
    pub links: SmallVec<[RegionLink; 4]>,
    pub component: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityIndex {
    cols: u32,
    section_cols: u32,
    section_rows: u32,
    /// Per cell: `RegionId.0`, or `RegionId::NONE` for solid cells.
    region_of: Vec<u32>,
    /// Per section index: regions ordered by ordinal.
    sections: Vec<Vec<Region>>,
    component_count: u32,
}

impl ConnectivityIndex {
    /// An empty index sized for `grid`. Every cell reads as solid until
    /// `rebuild_all()` runs.
    pub fn new(grid: &NavGrid) -> Self {
        Self {
            cols: grid.cols(),
            section_cols: grid.section_cols(),
            section_rows: grid.section_rows(),
            region_of: vec![RegionId::NONE; grid.len()],
            sections: vec![Vec::new(); grid.section_count()],
            component_count: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Rebuilds
    // -----------------------------------------------------------------------

    pub fn rebuild_all(&mut self, grid: &NavGrid) {
        for s in 0..self.sections.len() {
            self.flood_section(grid, s);
        }
        for s in 0..self.sections.len() {
            if let Some(east) = self.east_of(s) {
                self.link_boundary(grid, s, east, true);
            }
            if let Some(south) = self.south_of(s) {
                self.link_boundary(grid, s, south, false);
            }
        }
        for regions in &mut self.sections {
            for region in regions {
                region.links.sort();
            }
        }
        self.label_components();
    }

    /// Recompute every section overlapping `rect`, re-link their boundaries
    /// and relabel components.
    pub fn rebuild_region(&mut self, grid: &NavGrid, rect: CellRect) {
        let affected = grid.sections_overlapping(rect);
        if affected.is_empty() {
            return;
        }
        let in_affected = |s: usize| affected.binary_search(&s).is_ok();

        // Outside neighbours forget links into the sections about to be
        // renumbered.
        let mut touched: Vec<usize> = Vec::new();
        for &s in &affected {
            for n in self.neighbors_of(s) {
                if !in_affected(n) {
                    touched.push(n);
                }
            }
        }
        touched.sort_unstable();
        touched.dedup();
        for &n in &touched {
            for region in &mut self.sections[n] {
                region
                    .links
                    .retain(|link| !in_affected(link.to.section() as usize));
            }
        }

        for &s in &affected {
            self.flood_section(grid, s);
        }
        for &s in &affected {
            if let Some(east) = self.east_of(s) {
                self.link_boundary(grid, s, east, true);
            }
            if let Some(south) = self.south_of(s) {
                self.link_boundary(grid, s, south, false);
            }
            if let Some(west) = self.west_of(s).filter(|w| !in_affected(*w)) {
                self.link_boundary(grid, west, s, true);
            }
            if let Some(north) = self.north_of(s).filter(|n| !in_affected(*n)) {
                self.link_boundary(grid, north, s, false);
            }
        }
        for &s in affected.iter().chain(&touched) {
            for region in &mut self.sections[s] {
                region.links.sort();
            }
        }
        self.label_components();
    }

    /// Replace the regions of one section with a fresh row-major flood fill.
    fn flood_section(&mut self, grid: &NavGrid, s: usize) {
        let rect = grid.section_rect(grid.section_coord(s));
        let cols = self.cols as usize;
        for cell in rect.cells() {
            self.region_of[cell.col as usize + cell.row as usize * cols] = RegionId::NONE;
        }

        let mut regions = Vec::new();
        let mut stack: Vec<CellCoord> = Vec::new();
        for seed in rect.cells() {
            let si = seed.col as usize + seed.row as usize * cols;
            if grid.solid_at(si) || self.region_of[si] != RegionId::NONE {
                continue;
            }
            let id = RegionId::new(s as u32, regions.len() as u16);
            let mut bounds = CellRect::single(seed);
            let mut count = 0u32;
            self.region_of[si] = id.0;
            stack.push(seed);
            while let Some(cell) = stack.pop() {
                count += 1;
                bounds = bounds.union(&CellRect::single(cell));
                for (dc, dr) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                    let next = cell.offset(dc, dr);
                    if !rect.contains(next) {
                        continue;
                    }
                    let ni = next.col as usize + next.row as usize * cols;
                    if !grid.solid_at(ni) && self.region_of[ni] == RegionId::NONE {
                        self.region_of[ni] = id.0;
                        stack.push(next);
                    }
                }
            }
            regions.push(Region {
                id,
                cell_count: count,
                bounds,
                links: SmallVec::new(),
                component: UNLABELLED,
            });
        }
        self.sections[s] = regions;
    }

    /// Link regions across the shared edge of section `a` and the section
    /// `b` directly east (`east == true`) or south of it.
    fn link_boundary(&mut self, grid: &NavGrid, a: usize, b: usize, east: bool) {
        let ra = grid.section_rect(grid.section_coord(a));
        let rb = grid.section_rect(grid.section_coord(b));
        let pairs: Vec<(CellCoord, CellCoord)> = if east {
            (ra.min.row..=ra.max.row)
                .map(|row| (CellCoord::new(ra.max.col, row), CellCoord::new(rb.min.col, row)))
                .collect()
        } else {
            (ra.min.col..=ra.max.col)
                .map(|col| (CellCoord::new(col, ra.max.row), CellCoord::new(col, rb.min.row)))
                .collect()
        };

        let mut seen: FxHashSet<(u32, u32)> = FxHashSet::default();
        for (ca, cb) in pairs {
            let (Some(ida), Some(idb)) = (self.region_at(ca), self.region_at(cb)) else {
                continue;
            };
            if !seen.insert((ida.0, idb.0)) {
                continue;
            }
            self.region_mut(ida).links.push(RegionLink {
                to: idb,
                from_cell: ca,
                to_cell: cb,
            });
            self.region_mut(idb).links.push(RegionLink {
                to: ida,
                from_cell: cb,
                to_cell: ca,
            });
        }
    }

    /// Flood the region graph, numbering components in region order.
    fn label_components(&mut self) {
        for regions in &mut self.sections {
            for region in regions {
                region.component = UNLABELLED;
            }
        }
        let mut next = 0u32;
        let mut stack: Vec<RegionId> = Vec::new();
        for s in 0..self.sections.len() {
            for local in 0..self.sections[s].len() {
                if self.sections[s][local].component != UNLABELLED {
                    continue;
                }
                self.sections[s][local].component = next;
                stack.push(self.sections[s][local].id);
                while let Some(id) = stack.pop() {
                    let links = self.region_mut(id).links.clone();
                    for link in links {
                        let other = self.region_mut(link.to);
                        if other.component == UNLABELLED {
                            other.component = next;
                            stack.push(link.to);
                        }
                    }
                }
                next += 1;
            }
        }
        self.component_count = next;
    }

    // -----------------------------------------------------------------------
    // Section neighbourhood
    // -----------------------------------------------------------------------

    fn east_of(&self, s: usize) -> Option<usize> {
        let sx = s as u32 % self.section_cols;
        (sx + 1 < self.section_cols).then_some(s + 1)
    }

    fn west_of(&self, s: usize) -> Option<usize> {
        let sx = s as u32 % self.section_cols;
        (sx > 0).then(|| s - 1)
    }

    fn south_of(&self, s: usize) -> Option<usize> {
        let sy = s as u32 / self.section_cols;
        (sy + 1 < self.section_rows).then(|| s + self.section_cols as usize)
    }

    fn north_of(&self, s: usize) -> Option<usize> {
        let sy = s as u32 / self.section_cols;
        (sy > 0).then(|| s - self.section_cols as usize)
    }

    fn neighbors_of(&self, s: usize) -> impl Iterator<Item = usize> + use<> {
        [self.east_of(s), self.west_of(s), self.south_of(s), self.north_of(s)]
            .into_iter()
            .flatten()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Region containing `cell`, or `None` for solid or out-of-bounds cells.
    pub fn region_at(&self, cell: CellCoord) -> Option<RegionId> {
        if cell.col < 0 || cell.row < 0 || cell.col as u32 >= self.cols {
            return None;
        }
        let i = cell.col as usize + cell.row as usize * self.cols as usize;
        match self.region_of.get(i) {
            Some(&id) if id != RegionId::NONE => Some(RegionId(id)),
            _ => None,
        }
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.sections
            .get(id.section() as usize)?
            .get(id.local() as usize)
    }

    // Only called with ids read from this index.
    fn region_mut(&mut self, id: RegionId) -> &mut Region {
        &mut self.sections[id.section() as usize][id.local() as usize]
    }

    /// Regions of one section, ordered by ordinal.
    pub fn section_regions(&self, section: SectionCoord) -> &[Region] {
        let s = (section.sx + section.sy * self.section_cols) as usize;
        self.sections.get(s).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.sections.iter().flatten()
    }

    pub fn region_count(&self) -> usize {
        self.sections.iter().map(Vec::len).sum()
    }

    pub fn component_count(&self) -> u32 {
        self.component_count
    }

    /// Per-cell region ids (`RegionId::NONE` for solid), for debug views.
    pub fn region_ids(&self) -> &[u32] {
        &self.region_of
    }

    /// Component of the region containing `cell`.
    pub fn component_of(&self, cell: CellCoord) -> Option<u32> {
        self.region_at(cell)
            .and_then(|id| self.region(id))
            .map(|r| r.component)
    }

    /// Components a search starting at `cell` can enter. An open cell has
    /// exactly its own; a solid cell (a unit standing where a wall just
    /// appeared) can step into any open orthogonal neighbour.
    pub fn start_components(&self, cell: CellCoord) -> SmallVec<[u32; 4]> {
        let mut out = SmallVec::new();
        if let Some(c) = self.component_of(cell) {
            out.push(c);
            return out;
        }
        for (dc, dr) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            match self.component_of(cell.offset(dc, dr)) {
                Some(c) if !out.contains(&c) => out.push(c),
                _ => {}
            }
        }
        out
    }

    /// Whether any path can lead from `start` to `goal`. The goal must be
    /// open; a solid start may escape through an open orthogonal neighbour.
    pub fn is_reachable(&self, grid: &NavGrid, start: CellCoord, goal: CellCoord) -> bool {
        if !grid.in_bounds(start) {
            return false;
        }
        let Some(goal_component) = self.component_of(goal) else {
            return false;
        };
        start == goal || self.start_components(start).contains(&goal_component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavConfig;
    use crate::obstacle::{BuildingKind, ObstacleSet};
    use crate::rebuild::{RebuildContext, full_rebuild, rebuild_cells};
    use crate::terrain::{TerrainLayer, TerrainType};
    use greenway_prng::WorldRng;

    fn config(cols: u32, rows: u32) -> NavConfig {
        NavConfig {
            cols,
            rows,
            cell_size: 1.0,
            section_size: 4,
            ..NavConfig::default()
        }
    }

    fn rect(c0: i32, r0: i32, c1: i32, r1: i32) -> CellRect {
        CellRect::from_corners(CellCoord::new(c0, r0), CellCoord::new(c1, r1))
    }

    fn built(
        config: &NavConfig,
        terrain: &TerrainLayer,
        obstacles: &ObstacleSet,
    ) -> (NavGrid, ConnectivityIndex) {
        let mut grid = NavGrid::new(config);
        let mut regions = ConnectivityIndex::new(&grid);
        full_rebuild(&mut RebuildContext {
            grid: &mut grid,
            regions: &mut regions,
            terrain,
            obstacles,
            costs: &config.costs,
        });
        (grid, regions)
    }

    #[test]
    fn open_grid_is_one_component() {
        let config = config(10, 10);
        let terrain = TerrainLayer::new(10, 10, &config.costs);
        let (grid, regions) = built(&config, &terrain, &ObstacleSet::new());
        // 3x3 sections, one region each.
        assert_eq!(regions.region_count(), 9);
        assert_eq!(regions.component_count(), 1);
        assert!(regions.is_reachable(&grid, CellCoord::new(0, 0), CellCoord::new(9, 9)));
    }

    #[test]
    fn wall_splits_components() {
        let config = config(12, 12);
        let mut terrain = TerrainLayer::new(12, 12, &config.costs);
        terrain.fill_terrain(rect(6, 0, 6, 11), TerrainType::Rock);
        let (grid, regions) = built(&config, &terrain, &ObstacleSet::new());
        assert_eq!(regions.component_count(), 2);
        assert!(!regions.is_reachable(&grid, CellCoord::new(0, 0), CellCoord::new(11, 0)));
        assert!(regions.is_reachable(&grid, CellCoord::new(0, 0), CellCoord::new(5, 11)));
    }

    #[test]
    fn regions_split_within_a_section() {
        let config = config(4, 4);
        let mut terrain = TerrainLayer::new(4, 4, &config.costs);
        terrain.fill_terrain(rect(0, 2, 3, 2), TerrainType::Lava);
        let (_, regions) = built(&config, &terrain, &ObstacleSet::new());
        let rs = regions.section_regions(SectionCoord::new(0, 0));
        assert_eq!(rs.len(), 2);
        assert_eq!(rs[0].cell_count, 8);
        assert_eq!(rs[0].bounds, rect(0, 0, 3, 1));
        assert_eq!(rs[1].bounds, rect(0, 3, 3, 3));
        assert_eq!(regions.region_at(CellCoord::new(1, 2)), None);
    }

    #[test]
    fn links_are_symmetric_with_adjacent_cells() {
        let config = config(8, 8);
        let terrain = TerrainLayer::new(8, 8, &config.costs);
        let (_, regions) = built(&config, &terrain, &ObstacleSet::new());
        for region in regions.regions() {
            for link in &region.links {
                assert_eq!(link.from_cell.manhattan_distance(link.to_cell), 1);
                let back = regions
                    .region(link.to)
                    .map(|r| r.links.iter().any(|l| l.to == region.id));
                assert_eq!(back, Some(true));
            }
        }
    }

    #[test]
    fn solid_start_escapes_to_open_neighbor() {
        let config = config(8, 8);
        let terrain = TerrainLayer::new(8, 8, &config.costs);
        let mut obstacles = ObstacleSet::new();
        obstacles.add_building(BuildingKind::Wall, CellRect::single(CellCoord::new(3, 3)), true);
        let (grid, regions) = built(&config, &terrain, &obstacles);
        assert!(grid.is_solid(CellCoord::new(3, 3)));
        assert!(regions.is_reachable(&grid, CellCoord::new(3, 3), CellCoord::new(7, 7)));
        // A solid goal is never reachable.
        assert!(!regions.is_reachable(&grid, CellCoord::new(0, 0), CellCoord::new(3, 3)));
    }

    #[test]
    fn partial_rebuild_equals_full_on_random_edits() {
        let config = config(20, 20);
        let mut rng = WorldRng::new(7);
        let mut terrain = TerrainLayer::new(20, 20, &config.costs);
        for cell in rect(0, 0, 19, 19).cells() {
            if rng.random_bool(0.3) {
                terrain.set_terrain(cell, TerrainType::Rock);
            }
        }
        let mut obstacles = ObstacleSet::new();
        let (mut grid, mut regions) = built(&config, &terrain, &obstacles);

        for _ in 0..25 {
            let col = rng.range_u64(0, 18) as i32;
            let row = rng.range_u64(0, 18) as i32;
            let bounds = rect(col, row, col + 1, row + 1);
            obstacles.add_building(BuildingKind::Wall, bounds, rng.random_bool(0.5));
            rebuild_cells(
                &mut RebuildContext {
                    grid: &mut grid,
                    regions: &mut regions,
                    terrain: &terrain,
                    obstacles: &obstacles,
                    costs: &config.costs,
                },
                bounds,
            );
            let (_, fresh) = built(&config, &terrain, &obstacles);
            assert_eq!(regions, fresh);
        }
    }
}
