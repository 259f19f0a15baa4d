// `NavWorld`: the single owner of all navigation state and the tick loop
// that keeps it consistent.
//
// The world owns the terrain layer, the obstacle registry, the nav grid, the
// connectivity index, the rebuild scheduler, the path bridge and a cached
// snapshot. It is the only writer. A tick runs in a fixed order:
//
//   1. `apply_edit` for every edit: source data changes, rebuild scopes
//      are queued, nothing is rebuilt yet.
//   2. `drain_rebuilds`: the scheduler runs at most one consolidated pass
//      (grid cells, then connectivity for the same scope).
//   3. Path and reachability queries are answered against the now
//      consistent grid.
//
// `step()` does 1 and 2; queries made after it see every edit of the tick.
// Queries made while rebuilds are still queued see the last drained state.
//
// Off-thread requests go through `request_path_async`, which searches an
// `Arc<NavSnapshot>` of the current grid. The snapshot is rebuilt lazily,
// at most once per grid generation, so many async requests in one tick
// share one copy.
//
// See also: `edit.rs` (the input), `rebuild.rs` (the scheduler),
// `pathfinding.rs` (the search), `executor.rs` (the bridge).
//
// **Critical constraint: determinism.** Given the same config and the same
// sequence of edits, every grid, region id and path is identical.

use crate::config::NavConfig;
use crate::edit::{EditOutcome, WorldEdit};
use crate::error::ConfigError;
use crate::executor::{PathBridge, PendingPath};
use crate::nav_grid::NavGrid;
use crate::obstacle::ObstacleSet;
use crate::pathfinding::{
    self, DangerZone, Path, PathOptions, PathRequest, SearchReport,
};
use crate::rebuild::{RebuildContext, RebuildScheduler, RebuildSummary};
use crate::regions::ConnectivityIndex;
use crate::snapshot::NavSnapshot;
use crate::terrain::TerrainLayer;
use crate::types::{CellCoord, SectionCoord, WorldPos};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of one `step()`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub outcomes: Vec<EditOutcome>,
    pub rebuild: RebuildSummary,
    /// Grid generation after the tick.
    pub generation: u64,
}

/// Whether a previously computed path can still be followed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathCheck {
    Clear,
    /// The very next cell is now solid; recompute before stepping.
    NextBlocked,
    /// A later cell is now solid; the path is usable for now.
    BlockedAt(usize),
}

pub struct NavWorld {
    config: NavConfig,
    terrain: TerrainLayer,
    obstacles: ObstacleSet,
    grid: NavGrid,
    regions: ConnectivityIndex,
    scheduler: RebuildScheduler,
    bridge: PathBridge,
    snapshot: Option<Arc<NavSnapshot>>,
}

impl NavWorld {
    /// A world of default terrain with no obstacles, fully built, serving
    /// async requests synchronously.
    pub fn new(config: NavConfig) -> Result<Self, ConfigError> {
        Self::with_bridge(config, PathBridge::sync())
    }

    pub fn with_bridge(config: NavConfig, bridge: PathBridge) -> Result<Self, ConfigError> {
        config.validate()?;
        let terrain = TerrainLayer::new(config.cols, config.rows, &config.costs);
        let grid = NavGrid::new(&config);
        let regions = ConnectivityIndex::new(&grid);
        let mut scheduler = RebuildScheduler::new(&config);
        scheduler.request_full();
        let mut world = Self {
            config,
            terrain,
            obstacles: ObstacleSet::new(),
            grid,
            regions,
            scheduler,
            bridge,
            snapshot: None,
        };
        world.drain_rebuilds();
        Ok(world)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::new(NavConfig::from_json(json)?)
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn terrain(&self) -> &TerrainLayer {
        &self.terrain
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    pub fn grid(&self) -> &NavGrid {
        &self.grid
    }

    pub fn regions(&self) -> &ConnectivityIndex {
        &self.regions
    }

    pub fn scheduler(&self) -> &RebuildScheduler {
        &self.scheduler
    }

    // -----------------------------------------------------------------------
    // Edits and rebuilds
    // -----------------------------------------------------------------------

    /// Apply one edit to the source data and queue its rebuild scope.
    pub fn apply_edit(&mut self, edit: &WorldEdit) -> EditOutcome {
        match *edit {
            WorldEdit::SetTerrain { rect, terrain } => {
                match self.terrain.fill_terrain(rect, terrain) {
                    Some(changed) => {
                        self.scheduler.request_cells(changed);
                        EditOutcome::Applied
                    }
                    None => EditOutcome::Unchanged,
                }
            }
            WorldEdit::PaintFloor { rect, floor } => match self.terrain.paint_floor(rect, floor) {
                Some(changed) => {
                    self.scheduler.request_cells(changed);
                    EditOutcome::Applied
                }
                None => EditOutcome::Unchanged,
            },
            WorldEdit::PlaceBuilding {
                kind,
                bounds,
                completed,
            } => {
                let id = self.obstacles.add_building(kind, bounds, completed);
                self.scheduler.request_cells(bounds);
                EditOutcome::BuildingPlaced(id)
            }
            WorldEdit::CompleteBuilding { id } => match self.obstacles.set_completed(id, true) {
                Some(bounds) => {
                    self.scheduler.request_cells(bounds);
                    EditOutcome::Applied
                }
                None => EditOutcome::Unchanged,
            },
            WorldEdit::RemoveBuilding { id } => match self.obstacles.remove_building(id) {
                Some(building) => {
                    self.scheduler.request_cells(building.bounds);
                    EditOutcome::Applied
                }
                None => EditOutcome::Unchanged,
            },
            WorldEdit::SpawnObstacle {
                kind,
                center,
                radius,
            } => {
                if !(center.x.is_finite() && center.y.is_finite()) {
                    return EditOutcome::Unchanged;
                }
                let id = self.obstacles.add_natural(kind, center, radius);
                self.scheduler.request_region(center, footprint_radius(radius));
                EditOutcome::ObstacleSpawned(id)
            }
            WorldEdit::ClearObstacle { id } => match self.obstacles.remove_natural(id) {
                Some(natural) => {
                    self.scheduler
                        .request_region(natural.center, footprint_radius(natural.radius));
                    EditOutcome::Applied
                }
                None => EditOutcome::Unchanged,
            },
            WorldEdit::RequestFullRebuild => {
                self.scheduler.request_full();
                EditOutcome::Applied
            }
        }
    }

    /// One tick: apply every edit in order, then run the queued rebuilds.
    pub fn step(&mut self, edits: &[WorldEdit]) -> TickReport {
        let outcomes: Vec<EditOutcome> = edits.iter().map(|e| self.apply_edit(e)).collect();
        let rebuild = self.drain_rebuilds();
        if !edits.is_empty() {
            debug!(
                "tick: {} edits, {} rebuild boxes, generation {}",
                edits.len(),
                rebuild.rects.len(),
                self.grid.generation()
            );
        }
        TickReport {
            outcomes,
            rebuild,
            generation: self.grid.generation(),
        }
    }

    /// Execute everything the scheduler has queued.
    pub fn drain_rebuilds(&mut self) -> RebuildSummary {
        let mut ctx = RebuildContext {
            grid: &mut self.grid,
            regions: &mut self.regions,
            terrain: &self.terrain,
            obstacles: &self.obstacles,
            costs: &self.config.costs,
        };
        self.scheduler.drain(&mut ctx)
    }

    /// Queue a full rebuild for changes of unknown extent.
    pub fn notify_full_rebuild_needed(&mut self) {
        self.scheduler.request_full();
    }

    /// Queue a rebuild around a world position.
    pub fn notify_region_changed(&mut self, x: f32, y: f32, radius: f32) {
        self.scheduler.request_region(WorldPos::new(x, y), radius);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// A danger zone using the configured default penalty.
    pub fn danger_zone(&self, center: WorldPos, radius: f32) -> DangerZone {
        DangerZone::new(center, radius, self.config.default_danger_penalty)
    }

    pub fn request_path(
        &self,
        start: WorldPos,
        goal: WorldPos,
        options: PathOptions,
    ) -> Option<Path> {
        self.request_path_report(&PathRequest {
            start,
            goal,
            options,
        })
        .path
    }

    pub fn request_path_report(&self, request: &PathRequest) -> SearchReport {
        pathfinding::find_path_report(&self.grid, &self.regions, self.config.movement, request)
    }

    /// Independent requests, evaluated in parallel, results in request order.
    pub fn request_path_batch(&self, requests: &[PathRequest]) -> Vec<Option<Path>> {
        pathfinding::find_path_batch(&self.grid, &self.regions, self.config.movement, requests)
    }

    /// Dispatch a request through the bridge against a snapshot of the
    /// current grid.
    pub fn request_path_async(&mut self, request: PathRequest) -> PendingPath {
        let snapshot = self.snapshot();
        self.bridge.request(snapshot, request)
    }

    pub fn is_async(&self) -> bool {
        self.bridge.is_async()
    }

    /// Whether any path connects the cells under two world positions.
    pub fn is_reachable(&self, a: WorldPos, b: WorldPos) -> bool {
        let finite = |p: WorldPos| p.x.is_finite() && p.y.is_finite();
        if !finite(a) || !finite(b) {
            return false;
        }
        self.regions
            .is_reachable(&self.grid, self.grid.world_to_cell(a), self.grid.world_to_cell(b))
    }

    /// Check a path against the current grid.
    pub fn revalidate(&self, path: &Path) -> PathCheck {
        match path.first_blocked_index(&self.grid) {
            None => PathCheck::Clear,
            Some(0) => PathCheck::NextBlocked,
            Some(i) => PathCheck::BlockedAt(i),
        }
    }

    /// Center of the nearest open cell to `pos` within `max_radius` cells.
    pub fn nearest_passable(&self, pos: WorldPos, max_radius: u32) -> Option<WorldPos> {
        if !(pos.x.is_finite() && pos.y.is_finite()) {
            return None;
        }
        self.grid
            .nearest_passable(self.grid.world_to_cell(pos), max_radius)
            .map(|c| self.grid.cell_center(c))
    }

    pub fn cell_at(&self, pos: WorldPos) -> CellCoord {
        self.grid.world_to_cell(pos)
    }

    // -----------------------------------------------------------------------
    // Debug views
    // -----------------------------------------------------------------------

    pub fn solid(&self) -> &[bool] {
        self.grid.solid_cells()
    }

    pub fn cost(&self) -> &[f32] {
        self.grid.cost_cells()
    }

    pub fn region_ids(&self) -> &[u32] {
        self.regions.region_ids()
    }

    /// Sections whose cells changed since the last call.
    pub fn take_dirty_sections(&mut self) -> Vec<SectionCoord> {
        self.grid.take_dirty_sections()
    }

    /// Shared point-in-time copy, reused until the grid changes.
    pub fn snapshot(&mut self) -> Arc<NavSnapshot> {
        match &self.snapshot {
            Some(snap) if snap.generation() == self.grid.generation() => Arc::clone(snap),
            _ => {
                let snap = Arc::new(NavSnapshot::capture(
                    &self.grid,
                    &self.regions,
                    self.config.movement,
                ));
                self.snapshot = Some(Arc::clone(&snap));
                snap
            }
        }
    }
}

/// Radius used to scope a natural obstacle's rebuild: the footprint radius,
/// or zero (the center cell only) when unusable.
fn footprint_radius(radius: f32) -> f32 {
    if radius.is_finite() { radius.max(0.0) } else { 0.0 }
}
