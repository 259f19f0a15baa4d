// Typed mutations of the world data the nav grid is built from.
//
// All changes to terrain, floors and obstacles arrive as `WorldEdit`s and
// are applied by `NavWorld::apply_edit` (or in bulk by `NavWorld::step`),
// which updates the source data and queues the matching rebuild scope:
//
// - `SetTerrain`, `PaintFloor`: the cells that actually changed.
// - `PlaceBuilding`, `RemoveBuilding`, `CompleteBuilding`: the footprint.
// - `SpawnObstacle`, `ClearObstacle`: the obstacle's circle plus padding,
//   through the world-space region path.
// - `RequestFullRebuild`: everything, for edits of unknown extent.
//
// Nothing is rebuilt until the scheduler drains, so a burst of edits in
// one tick costs one consolidated pass.
//
// See also: `world.rs` for the dispatch, `rebuild.rs` for the scheduler.

use crate::obstacle::{BuildingKind, NaturalKind};
use crate::terrain::{FloorType, TerrainType};
use crate::types::{BuildingId, CellRect, ObstacleId, WorldPos};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WorldEdit {
    /// Replace the base terrain over a rectangle.
    SetTerrain { rect: CellRect, terrain: TerrainType },
    /// Lay (or with `FloorType::None`, strip) a floor over a rectangle.
    PaintFloor { rect: CellRect, floor: FloorType },
    /// Register a building. Unfinished blocking buildings stay walkable.
    PlaceBuilding {
        kind: BuildingKind,
        bounds: CellRect,
        completed: bool,
    },
    /// Mark construction finished.
    CompleteBuilding { id: BuildingId },
    RemoveBuilding { id: BuildingId },
    /// A tree grew, a rock or ore node appeared.
    SpawnObstacle {
        kind: NaturalKind,
        center: WorldPos,
        radius: f32,
    },
    /// A tree was felled, a rock mined out.
    ClearObstacle { id: ObstacleId },
    RequestFullRebuild,
}

/// What applying one edit did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOutcome {
    /// Source data changed and a rebuild was queued.
    Applied,
    BuildingPlaced(BuildingId),
    ObstacleSpawned(ObstacleId),
    /// Nothing changed (same values, unknown id, off-grid rectangle).
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellCoord;

    #[test]
    fn edits_serialize_as_tagged_json() {
        let edit = WorldEdit::PaintFloor {
            rect: CellRect::single(CellCoord::new(2, 3)),
            floor: FloorType::Road,
        };
        let json = serde_json::to_string(&edit).unwrap();
        assert!(json.contains("PaintFloor"));
        let back: WorldEdit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, edit);
    }
}
