// Grid maintenance: full and region-scoped rebuilds, and the scheduler that
// batches them to at most one consolidated pass per tick.
//
// Both rebuild styles share one contract: every cell in scope is
// reconstructed from the terrain layer plus the live obstacle registry, never
// reset to a hardcoded baseline (a flat reset wipes painted floor bonuses).
// Both go through `restamp()`, which for a rectangle:
//
//   1. resets cost and solidity from `TerrainLayer` (solid iff impassable),
//   2. stamps completed blocking buildings solid (planned or unfinished
//      buildings are skipped, they must stay walkable),
//   3. applies traversable overlays (roads, paths, completed doors): the
//      cheapest overlay covering a cell multiplies its cost, solidity is left
//      alone,
//   4. stamps natural obstacle footprints solid,
//   5. re-asserts `cost >= IMPASSABLE_COST => solid`.
//
// A region rebuild is the same computation clipped to a padded box, only
// considering obstacles whose bounds intersect it, so its output for those
// cells is identical to what a full rebuild would produce.
//
// Connectivity follows the grid: a full rebuild always relabels every
// section; a region rebuild recomputes the sections overlapping its box, and
// only if some cell's solidity actually changed.
//
// `RebuildScheduler` is the two-phase front door: `request_full()` /
// `request_region()` / `request_cells()` only enqueue, `drain()` executes.
// A pending full request subsumes all region requests. Region boxes that
// touch are merged, and if the merged area exceeds the configured fraction
// of the grid the drain escalates to one full rebuild. The scheduler has no
// hidden timers: whoever owns the tick calls `drain()` once, after edits and
// before queries.
//
// See also: `nav_grid.rs` (the written grid), `regions.rs` (connectivity),
// `world.rs` (the tick owner that calls `drain`).

use crate::config::{CostTable, IMPASSABLE_COST, NavConfig};
use crate::nav_grid::NavGrid;
use crate::obstacle::{ObstacleSet, StampEffect};
use crate::regions::ConnectivityIndex;
use crate::terrain::TerrainLayer;
use crate::types::{CellRect, WorldPos};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Mutable grid state plus the read-only sources it is rebuilt from.
pub struct RebuildContext<'a> {
    pub grid: &'a mut NavGrid,
    pub regions: &'a mut ConnectivityIndex,
    pub terrain: &'a TerrainLayer,
    pub obstacles: &'a ObstacleSet,
    pub costs: &'a CostTable,
}

/// What a rebuild pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildSummary {
    /// True if a full rebuild ran.
    pub full: bool,
    /// Rectangles that were restamped (the whole grid for a full rebuild).
    pub rects: Vec<CellRect>,
    /// Cells whose cost or solidity changed.
    pub cells_changed: usize,
    /// True if any cell's solidity changed.
    pub solidity_changed: bool,
}

impl RebuildSummary {
    pub fn is_noop(&self) -> bool {
        !self.full && self.rects.is_empty()
    }

    fn absorb(&mut self, other: RebuildSummary) {
        self.full |= other.full;
        self.rects.extend(other.rects);
        self.cells_changed += other.cells_changed;
        self.solidity_changed |= other.solidity_changed;
    }
}

// ---------------------------------------------------------------------------
// Rebuild operations
// ---------------------------------------------------------------------------

/// Recompute the whole grid and all connectivity.
pub fn full_rebuild(ctx: &mut RebuildContext<'_>) -> RebuildSummary {
    let rect = ctx.grid.bounds();
    let (cells_changed, solidity_changed) = restamp(ctx, rect);
    ctx.grid.recompute_min_cost();
    ctx.regions.rebuild_all(ctx.grid);
    info!(
        "full nav rebuild: {} cells ({} changed), {} regions, min_cost {}",
        ctx.grid.len(),
        cells_changed,
        ctx.regions.region_count(),
        ctx.grid.min_cost()
    );
    RebuildSummary {
        full: true,
        rects: vec![rect],
        cells_changed,
        solidity_changed,
    }
}

/// Recompute the cells around a world position. The box covers
/// `center ± radius` plus `padding` cells. A box entirely off-grid, or a
/// non-finite center or radius, is a no-op.
pub fn region_rebuild(
    ctx: &mut RebuildContext<'_>,
    center: WorldPos,
    radius: f32,
    padding: u32,
) -> RebuildSummary {
    match world_box(ctx.grid, center, radius, padding) {
        Some(rect) => rebuild_cells(ctx, rect),
        None => RebuildSummary::default(),
    }
}

/// Recompute a cell rectangle (clipped to the grid) and the connectivity of
/// the sections it overlaps.
pub fn rebuild_cells(ctx: &mut RebuildContext<'_>, rect: CellRect) -> RebuildSummary {
    let Some(rect) = rect.clip(ctx.grid.cols(), ctx.grid.rows()) else {
        return RebuildSummary::default();
    };
    let (cells_changed, solidity_changed) = restamp(ctx, rect);
    ctx.grid.lower_min_cost(rect);
    if solidity_changed {
        ctx.regions.rebuild_region(ctx.grid, rect);
    }
    debug!(
        "region nav rebuild {rect}: {cells_changed} cells changed, \
         solidity changed: {solidity_changed}"
    );
    RebuildSummary {
        full: false,
        rects: vec![rect],
        cells_changed,
        solidity_changed,
    }
}

/// Cell box for a world-space circle, padded and clipped.
fn world_box(grid: &NavGrid, center: WorldPos, radius: f32, padding: u32) -> Option<CellRect> {
    padded_circle_box(center, radius, grid.cell_size(), padding)?.clip(grid.cols(), grid.rows())
}

/// Unclipped cell box covering a world-space circle, grown by `padding`
/// cells. `None` for non-finite input or a negative radius.
fn padded_circle_box(
    center: WorldPos,
    radius: f32,
    cell_size: f32,
    padding: u32,
) -> Option<CellRect> {
    if !(center.x.is_finite() && center.y.is_finite() && radius.is_finite()) || radius < 0.0 {
        return None;
    }
    let lo = WorldPos::new(center.x - radius, center.y - radius).to_cell(cell_size);
    let hi = WorldPos::new(center.x + radius, center.y + radius).to_cell(cell_size);
    Some(CellRect::from_corners(lo, hi).expand(padding.min(i32::MAX as u32 / 4) as i32))
}

/// Reconstruct cost and solidity for every cell of an in-bounds `rect`.
/// Returns (cells changed, whether any solidity changed).
fn restamp(ctx: &mut RebuildContext<'_>, rect: CellRect) -> (usize, bool) {
    let width = rect.width() as usize;
    let area = rect.area();
    let local = |col: i32, row: i32| -> usize {
        (col - rect.min.col) as usize + (row - rect.min.row) as usize * width
    };

    // 1. Terrain baseline.
    let mut cost = Vec::with_capacity(area);
    let mut solid = Vec::with_capacity(area);
    for cell in rect.cells() {
        let c = ctx.grid.index(cell).map_or(IMPASSABLE_COST, |i| ctx.terrain.cost_at_index(i));
        cost.push(c);
        solid.push(c >= IMPASSABLE_COST);
    }

    // 2 + 3. Buildings: solid stamps, then the cheapest overlay per cell.
    let mut overlay = vec![1.0f32; area];
    for building in ctx.obstacles.buildings_in(rect) {
        let Some(effect) = building.active_stamp() else {
            continue;
        };
        let Some(cover) = building.bounds.intersection(&rect) else {
            continue;
        };
        match effect {
            StampEffect::Solid => {
                for cell in cover.cells() {
                    solid[local(cell.col, cell.row)] = true;
                }
            }
            StampEffect::Overlay => {
                let m = ctx.costs.overlay_multiplier(building.kind);
                for cell in cover.cells() {
                    let slot = &mut overlay[local(cell.col, cell.row)];
                    *slot = slot.min(m);
                }
            }
        }
    }
    for (c, m) in cost.iter_mut().zip(&overlay) {
        *c *= *m;
    }

    // 4. Natural obstacle footprints.
    let cell_size = ctx.grid.cell_size();
    for natural in ctx.obstacles.naturals_in(rect, cell_size) {
        let Some(cover) = natural.footprint_bounds(cell_size).intersection(&rect) else {
            continue;
        };
        for cell in cover.cells() {
            if natural.covers(cell, cell_size) {
                solid[local(cell.col, cell.row)] = true;
            }
        }
    }

    // 5. Write back, keeping impassable costs double-encoded as solid.
    let mut changed = 0;
    let mut solidity_changed = false;
    for (k, cell) in rect.cells().enumerate() {
        let Some(i) = ctx.grid.index(cell) else {
            continue;
        };
        let new_solid = solid[k] || cost[k] >= IMPASSABLE_COST;
        let was_solid = ctx.grid.solid_at(i);
        if ctx.grid.write_cell(i, new_solid, cost[k]) {
            changed += 1;
            solidity_changed |= was_solid != new_solid;
        }
    }
    (changed, solidity_changed)
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Collects rebuild requests during a tick and executes them in one pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RebuildScheduler {
    full_pending: bool,
    regions: Vec<CellRect>,
    cols: u32,
    rows: u32,
    cell_size: f32,
    padding: u32,
    full_area_threshold: usize,
}

impl RebuildScheduler {
    pub fn new(config: &NavConfig) -> Self {
        let threshold = (config.cell_count() as f64 * config.full_rebuild_area_fraction as f64)
            .ceil() as usize;
        Self {
            full_pending: false,
            regions: Vec::new(),
            cols: config.cols,
            rows: config.rows,
            cell_size: config.cell_size,
            padding: config.region_padding_cells,
            full_area_threshold: threshold.max(1),
        }
    }

    /// Queue a full rebuild. Subsumes every pending region request.
    pub fn request_full(&mut self) {
        if !self.full_pending {
            debug!("full rebuild requested, dropping {} region requests", self.regions.len());
        }
        self.full_pending = true;
        self.regions.clear();
    }

    /// Queue a rebuild of the cells within `radius` world units of
    /// `center`, plus the configured padding. Degenerate scopes are dropped.
    pub fn request_region(&mut self, center: WorldPos, radius: f32) {
        if let Some(padded) = padded_circle_box(center, radius, self.cell_size, self.padding) {
            self.request_cells(padded);
        }
    }

    /// Queue a rebuild of an exact cell rectangle (clipped to the grid).
    pub fn request_cells(&mut self, rect: CellRect) {
        if self.full_pending {
            return;
        }
        if let Some(clipped) = rect.clip(self.cols, self.rows) {
            self.regions.push(clipped);
        }
    }

    pub fn full_pending(&self) -> bool {
        self.full_pending
    }

    pub fn pending_regions(&self) -> &[CellRect] {
        &self.regions
    }

    pub fn is_idle(&self) -> bool {
        !self.full_pending && self.regions.is_empty()
    }

    /// Execute everything queued, then clear the queue. Runs at most one
    /// full rebuild, or one region rebuild per merged box.
    pub fn drain(&mut self, ctx: &mut RebuildContext<'_>) -> RebuildSummary {
        if self.full_pending {
            self.full_pending = false;
            self.regions.clear();
            return full_rebuild(ctx);
        }
        if self.regions.is_empty() {
            return RebuildSummary::default();
        }

        let requested = self.regions.len();
        let merged = merge_touching(std::mem::take(&mut self.regions));
        let area: usize = merged.iter().map(CellRect::area).sum();
        if area > self.full_area_threshold {
            debug!(
                "{requested} region requests cover {area} cells, escalating to a full rebuild"
            );
            return full_rebuild(ctx);
        }
        debug!("draining {requested} region requests as {} boxes", merged.len());

        let mut summary = RebuildSummary::default();
        for rect in merged {
            summary.absorb(rebuild_cells(ctx, rect));
        }
        summary
    }
}

/// Merge rectangles that overlap or share an edge until none do. Output is
/// sorted so the rebuild order is independent of request order.
fn merge_touching(mut rects: Vec<CellRect>) -> Vec<CellRect> {
    let mut merged = true;
    while merged {
        merged = false;
        'outer: for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                if rects[i].touches(&rects[j]) {
                    let other = rects.swap_remove(j);
                    rects[i] = rects[i].union(&other);
                    merged = true;
                    break 'outer;
                }
            }
        }
    }
    rects.sort();
    rects
}
