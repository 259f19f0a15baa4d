// Point-in-time copy of everything a path search reads.
//
// A snapshot is plain data (flat arrays plus scalars, no references back
// into the live world), so it can be moved to a worker thread behind an
// `Arc`, serialized, or handed to a debug overlay. Searches against it
// produce exactly what the live grid would have produced at capture time.
// It never writes back; results may be a tick stale by the time they are
// consumed (see `Path::next_waypoint_blocked`).
//
// See also: `executor.rs` (ships snapshots to workers), `world.rs` (caches
// one per grid generation).

use crate::nav_grid::NavGrid;
use crate::pathfinding::{self, Path, PathRequest, SearchReport};
use crate::regions::ConnectivityIndex;
use crate::types::Movement;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavSnapshot {
    grid: NavGrid,
    regions: ConnectivityIndex,
    movement: Movement,
}

impl NavSnapshot {
    pub fn capture(grid: &NavGrid, regions: &ConnectivityIndex, movement: Movement) -> Self {
        Self {
            grid: grid.clone(),
            regions: regions.clone(),
            movement,
        }
    }

    /// Generation of the grid this snapshot was taken from.
    pub fn generation(&self) -> u64 {
        self.grid.generation()
    }

    pub fn grid(&self) -> &NavGrid {
        &self.grid
    }

    pub fn regions(&self) -> &ConnectivityIndex {
        &self.regions
    }

    pub fn movement(&self) -> Movement {
        self.movement
    }

    pub fn solid(&self) -> &[bool] {
        self.grid.solid_cells()
    }

    pub fn cost(&self) -> &[f32] {
        self.grid.cost_cells()
    }

    pub fn region_ids(&self) -> &[u32] {
        self.regions.region_ids()
    }

    pub fn find_path(&self, request: &PathRequest) -> Option<Path> {
        pathfinding::find_path(&self.grid, &self.regions, self.movement, request)
    }

    pub fn find_path_report(&self, request: &PathRequest) -> SearchReport {
        pathfinding::find_path_report(&self.grid, &self.regions, self.movement, request)
    }

    pub fn find_path_batch(&self, requests: &[PathRequest]) -> Vec<Option<Path>> {
        pathfinding::find_path_batch(&self.grid, &self.regions, self.movement, requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavConfig;
    use crate::obstacle::{BuildingKind, ObstacleSet};
    use crate::rebuild::{RebuildContext, full_rebuild};
    use crate::terrain::TerrainLayer;
    use crate::types::{CellCoord, CellRect, WorldPos};

    fn snapshot() -> NavSnapshot {
        let config = NavConfig {
            cols: 12,
            rows: 12,
            cell_size: 2.0,
            section_size: 4,
            ..NavConfig::default()
        };
        let terrain = TerrainLayer::new(12, 12, &config.costs);
        let mut obstacles = ObstacleSet::new();
        obstacles.add_building(
            BuildingKind::Wall,
            CellRect::from_corners(CellCoord::new(5, 0), CellCoord::new(5, 9)),
            true,
        );
        let mut grid = NavGrid::new(&config);
        let mut regions = ConnectivityIndex::new(&grid);
        full_rebuild(&mut RebuildContext {
            grid: &mut grid,
            regions: &mut regions,
            terrain: &terrain,
            obstacles: &obstacles,
            costs: &config.costs,
        });
        NavSnapshot::capture(&grid, &regions, Movement::Cardinal)
    }

    #[test]
    fn bincode_round_trip_preserves_search_results() {
        let snap = snapshot();
        let bytes = bincode::serialize(&snap).unwrap();
        let restored: NavSnapshot = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored, snap);

        let request = PathRequest::new(WorldPos::new(1.0, 1.0), WorldPos::new(22.0, 1.0));
        let a = snap.find_path(&request);
        assert!(a.is_some());
        assert_eq!(restored.find_path(&request), a);
    }

    #[test]
    fn json_round_trip() {
        let snap = snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let restored: NavSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.solid(), snap.solid());
        assert_eq!(restored.region_ids(), snap.region_ids());
    }
}
