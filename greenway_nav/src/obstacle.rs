// Obstacle sources stamped on top of the terrain: buildings and natural
// obstacles (vegetation and resource nodes).
//
// Obstacle kind is a closed tagged variant (`ObstacleKind`) and a single
// lookup (`ObstacleKind::rule`) maps each kind to its `StampRule`: what it
// does to the grid (`StampEffect::Solid` or `StampEffect::Overlay`) and when
// (`StampWhen::Always` or only once `Completed`). Rebuild code asks a
// building or natural obstacle for its effective stamp and never branches on
// kinds itself.
//
// The rules that matter:
// - Blocking buildings (walls, houses, workshops, storage) are solid only
//   when completed. Planned or under-construction buildings never block.
// - Roads and paths stamp a cost-reducing overlay whether finished or not;
//   doors stamp their overlay once completed. Overlays never clear solidity.
// - Vegetation and resource nodes are solid over their circular footprint
//   for as long as they exist.
//
// `ObstacleSet` is the registry the grid is rebuilt from. Both maps are
// `BTreeMap`s so full and region rebuilds stamp in the same order.
//
// See also: `rebuild.rs` which stamps these, `config.rs` for overlay
// multipliers, `edit.rs` for the edits that add and remove obstacles.

use crate::types::{BuildingId, CellCoord, CellRect, ObstacleId, WorldPos};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Kinds and rules
// ---------------------------------------------------------------------------

/// Building categories known to the navigation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingKind {
    Wall,
    House,
    Workshop,
    Storage,
    Door,
    Road,
    Path,
}

/// Natural obstacle categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NaturalKind {
    Tree,
    Bush,
    Rock,
    OreNode,
}

/// The closed set of things that can affect the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Building { kind: BuildingKind },
    Vegetation,
    Resource,
}

/// What a stamp does to the cells it covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StampEffect {
    /// Cells become solid.
    Solid,
    /// Cells keep their solidity; cost is multiplied by the kind's overlay
    /// multiplier.
    Overlay,
}

/// When a stamp applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StampWhen {
    Always,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampRule {
    pub effect: StampEffect,
    pub when: StampWhen,
}

impl ObstacleKind {
    /// The passability rule for this kind.
    pub const fn rule(self) -> StampRule {
        use StampEffect::*;
        use StampWhen::*;
        let (effect, when) = match self {
            ObstacleKind::Building { kind } => match kind {
                BuildingKind::Wall
                | BuildingKind::House
                | BuildingKind::Workshop
                | BuildingKind::Storage => (Solid, Completed),
                BuildingKind::Door => (Overlay, Completed),
                BuildingKind::Road | BuildingKind::Path => (Overlay, Always),
            },
            ObstacleKind::Vegetation | ObstacleKind::Resource => (Solid, Always),
        };
        StampRule { effect, when }
    }
}

impl NaturalKind {
    pub fn obstacle_kind(self) -> ObstacleKind {
        match self {
            NaturalKind::Tree | NaturalKind::Bush => ObstacleKind::Vegetation,
            NaturalKind::Rock | NaturalKind::OreNode => ObstacleKind::Resource,
        }
    }
}

// ---------------------------------------------------------------------------
// Obstacle records
// ---------------------------------------------------------------------------

/// A building occupying a grid-aligned rectangle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub kind: BuildingKind,
    pub bounds: CellRect,
    /// False while planned or under construction.
    pub completed: bool,
}

impl Building {
    pub fn obstacle_kind(&self) -> ObstacleKind {
        ObstacleKind::Building { kind: self.kind }
    }

    /// The stamp this building currently applies, if any.
    pub fn active_stamp(&self) -> Option<StampEffect> {
        let rule = self.obstacle_kind().rule();
        match rule.when {
            StampWhen::Always => Some(rule.effect),
            StampWhen::Completed if self.completed => Some(rule.effect),
            StampWhen::Completed => None,
        }
    }
}

/// A circular natural obstacle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NaturalObstacle {
    pub id: ObstacleId,
    pub kind: NaturalKind,
    pub center: WorldPos,
    /// World units. Negative or NaN radii cover only the center cell.
    pub radius: f32,
}

impl NaturalObstacle {
    fn effective_radius(&self) -> f32 {
        if self.radius.is_finite() && self.radius > 0.0 {
            self.radius
        } else {
            0.0
        }
    }

    /// Bounding rectangle of every cell this obstacle may cover.
    pub fn footprint_bounds(&self, cell_size: f32) -> CellRect {
        let r = self.effective_radius();
        let lo = WorldPos::new(self.center.x - r, self.center.y - r).to_cell(cell_size);
        let hi = WorldPos::new(self.center.x + r, self.center.y + r).to_cell(cell_size);
        CellRect::from_corners(lo, hi)
    }

    /// A cell is covered if it contains the center, or its center lies
    /// within the radius.
    pub fn covers(&self, cell: CellCoord, cell_size: f32) -> bool {
        if cell == self.center.to_cell(cell_size) {
            return true;
        }
        let r = self.effective_radius();
        cell.center(cell_size).distance_squared(self.center) <= r * r
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// All live obstacles. IDs are assigned sequentially and never reused.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSet {
    buildings: BTreeMap<BuildingId, Building>,
    naturals: BTreeMap<ObstacleId, NaturalObstacle>,
    next_building: u32,
    next_natural: u32,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_building(
        &mut self,
        kind: BuildingKind,
        bounds: CellRect,
        completed: bool,
    ) -> BuildingId {
        let id = BuildingId(self.next_building);
        self.next_building += 1;
        self.buildings.insert(
            id,
            Building {
                id,
                kind,
                bounds,
                completed,
            },
        );
        id
    }

    pub fn remove_building(&mut self, id: BuildingId) -> Option<Building> {
        self.buildings.remove(&id)
    }

    /// Mark a building complete (or not). Returns its bounds if the flag
    /// actually changed.
    pub fn set_completed(&mut self, id: BuildingId, completed: bool) -> Option<CellRect> {
        let building = self.buildings.get_mut(&id)?;
        if building.completed == completed {
            return None;
        }
        building.completed = completed;
        Some(building.bounds)
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    /// Buildings whose bounds intersect `rect`, in id order.
    pub fn buildings_in(&self, rect: CellRect) -> impl Iterator<Item = &Building> {
        self.buildings.values().filter(move |b| b.bounds.intersects(&rect))
    }

    pub fn add_natural(&mut self, kind: NaturalKind, center: WorldPos, radius: f32) -> ObstacleId {
        let id = ObstacleId(self.next_natural);
        self.next_natural += 1;
        self.naturals.insert(
            id,
            NaturalObstacle {
                id,
                kind,
                center,
                radius,
            },
        );
        id
    }

    pub fn remove_natural(&mut self, id: ObstacleId) -> Option<NaturalObstacle> {
        self.naturals.remove(&id)
    }

    pub fn natural(&self, id: ObstacleId) -> Option<&NaturalObstacle> {
        self.naturals.get(&id)
    }

    pub fn naturals(&self) -> impl Iterator<Item = &NaturalObstacle> {
        self.naturals.values()
    }

    /// Natural obstacles whose footprint bounds intersect `rect`, in id order.
    pub fn naturals_in(
        &self,
        rect: CellRect,
        cell_size: f32,
    ) -> impl Iterator<Item = &NaturalObstacle> {
        self.naturals
            .values()
            .filter(move |n| n.footprint_bounds(cell_size).intersects(&rect))
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn natural_count(&self) -> usize {
        self.naturals.len()
    }
}
