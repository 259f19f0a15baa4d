// Data-driven navigation configuration.
//
// All tunable parameters live in `NavConfig`, loaded from JSON at startup.
// The core never uses magic numbers for costs or geometry: terrain base costs,
// floor multipliers, overlay multipliers, section size, rebuild padding, and
// the movement mode all come from here. `validate()` rejects values that would
// break a grid invariant (most importantly, every cost must be positive so
// `NavGrid::min_cost` stays a usable, admissible heuristic scale).
//
// `#[serde(default)]` at struct level lets a config file override only the
// fields it cares about.
//
// See also: `terrain.rs` for the enums keyed here and the dense lookup table
// compiled from `CostTable`, `obstacle.rs` for the building kinds whose
// overlay multipliers live here, `world.rs` which owns the config.
//
// **Critical constraint: determinism.** Config feeds rebuild output directly.
// Two sessions with the same config and world edits produce bit-identical
// grids.

use crate::error::ConfigError;
use crate::obstacle::BuildingKind;
use crate::terrain::{FloorType, TerrainType};
use crate::types::Movement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cost at or above which a cell is impassable. Such cells are also flagged
/// solid, so a stale cost-only update can never reopen them.
pub const IMPASSABLE_COST: f32 = 100.0;

/// Traversal costs. Every variant of every keyed enum must be present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostTable {
    /// Base cost per terrain type. `>= IMPASSABLE_COST` means impassable.
    pub terrain: BTreeMap<TerrainType, f32>,
    /// Multiplier applied by a painted floor on top of the terrain cost.
    pub floor: BTreeMap<FloorType, f32>,
    /// Multiplier applied by traversable buildings (roads, paths, doors).
    pub overlay: BTreeMap<BuildingKind, f32>,
}

impl Default for CostTable {
    fn default() -> Self {
        let terrain = BTreeMap::from([
            (TerrainType::Grass, 1.0),
            (TerrainType::Dirt, 1.0),
            (TerrainType::Sand, 1.5),
            (TerrainType::Mud, 2.5),
            (TerrainType::ShallowWater, 3.0),
            (TerrainType::DeepWater, IMPASSABLE_COST),
            (TerrainType::Rock, IMPASSABLE_COST),
            (TerrainType::Lava, IMPASSABLE_COST),
        ]);
        let floor = BTreeMap::from([
            (FloorType::None, 1.0),
            (FloorType::BasicPath, 0.6),
            (FloorType::Road, 0.5),
            (FloorType::Planks, 0.8),
            (FloorType::Carpet, 0.9),
        ]);
        let overlay = BTreeMap::from([
            (BuildingKind::Road, 0.5),
            (BuildingKind::Path, 0.6),
            (BuildingKind::Door, 1.0),
        ]);
        Self {
            terrain,
            floor,
            overlay,
        }
    }
}

impl CostTable {
    /// Overlay multiplier for a building kind, 1.0 for kinds without one.
    pub fn overlay_multiplier(&self, kind: BuildingKind) -> f32 {
        self.overlay.get(&kind).copied().unwrap_or(1.0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for t in TerrainType::ALL {
            match self.terrain.get(&t) {
                Some(c) => check_positive("costs.terrain", *c)?,
                None => {
                    return Err(ConfigError::Invalid {
                        field: "costs.terrain",
                        reason: format!("missing entry for {t:?}"),
                    });
                }
            }
        }
        for f in FloorType::ALL {
            match self.floor.get(&f) {
                Some(m) => check_positive("costs.floor", *m)?,
                None => {
                    return Err(ConfigError::Invalid {
                        field: "costs.floor",
                        reason: format!("missing entry for {f:?}"),
                    });
                }
            }
        }
        for m in self.overlay.values() {
            check_positive("costs.overlay", *m)?;
        }
        Ok(())
    }
}

/// Top-level navigation configuration. Loaded once, never mutated at runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Grid width in cells. Fixed for the session.
    pub cols: u32,
    /// Grid height in cells. Fixed for the session.
    pub rows: u32,
    /// World units per cell edge.
    pub cell_size: f32,
    /// Cells per section edge. Sections are the unit of dirty tracking and of
    /// partial connectivity recomputation.
    pub section_size: u32,
    /// Cells of padding added around every region-rebuild box, so footprints
    /// straddling the edited area are restamped whole.
    pub region_padding_cells: u32,
    /// If queued region boxes cover more than this fraction of the grid after
    /// merging, the scheduler runs one full rebuild instead.
    pub full_rebuild_area_fraction: f32,
    /// 4- or 8-connected movement.
    pub movement: Movement,
    /// Penalty factor for danger zones created without an explicit factor.
    pub default_danger_penalty: f32,
    pub costs: CostTable,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            cols: 128,
            rows: 128,
            cell_size: 16.0,
            section_size: 16,
            region_padding_cells: 2,
            full_rebuild_area_fraction: 0.5,
            movement: Movement::Cardinal,
            default_danger_penalty: 5.0,
            costs: CostTable::default(),
        }
    }
}

impl NavConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would break grid invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cols == 0 || self.rows == 0 {
            return Err(ConfigError::Invalid {
                field: "cols/rows",
                reason: format!("grid must be non-empty, got {}x{}", self.cols, self.rows),
            });
        }
        if self.cols > i32::MAX as u32 / 2 || self.rows > i32::MAX as u32 / 2 {
            return Err(ConfigError::Invalid {
                field: "cols/rows",
                reason: "grid dimensions overflow cell addressing".into(),
            });
        }
        check_positive("cell_size", self.cell_size)?;
        if !(4..=256).contains(&self.section_size) {
            return Err(ConfigError::Invalid {
                field: "section_size",
                reason: format!("must be in 4..=256, got {}", self.section_size),
            });
        }
        let sections = self.cols.div_ceil(self.section_size) as u64
            * self.rows.div_ceil(self.section_size) as u64;
        if sections > u16::MAX as u64 {
            return Err(ConfigError::Invalid {
                field: "section_size",
                reason: format!("{sections} sections exceed the region id space"),
            });
        }
        if !(self.full_rebuild_area_fraction > 0.0 && self.full_rebuild_area_fraction <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "full_rebuild_area_fraction",
                reason: format!("must be in (0, 1], got {}", self.full_rebuild_area_fraction),
            });
        }
        if !(self.default_danger_penalty.is_finite() && self.default_danger_penalty >= 1.0) {
            return Err(ConfigError::Invalid {
                field: "default_danger_penalty",
                reason: format!("must be >= 1, got {}", self.default_danger_penalty),
            });
        }
        self.costs.validate()
    }

    pub fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }
}

fn check_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be finite and > 0, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_roundtrips() {
        let config = NavConfig::default();
        config.validate().unwrap();
        let json = config.to_json().unwrap();
        let restored = NavConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = NavConfig::from_json(r#"{ "cols": 40, "rows": 30, "movement": "Octile" }"#)
            .unwrap();
        assert_eq!(config.cols, 40);
        assert_eq!(config.rows, 30);
        assert_eq!(config.movement, Movement::Octile);
        assert_eq!(config.section_size, NavConfig::default().section_size);
        assert_eq!(config.costs, CostTable::default());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = NavConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_cost() {
        let mut config = NavConfig::default();
        config.costs.floor.insert(FloorType::Road, 0.0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "costs.floor", .. }));
    }

    #[test]
    fn rejects_missing_terrain_entry() {
        let mut config = NavConfig::default();
        config.costs.terrain.remove(&TerrainType::Mud);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_tiny_sections_and_empty_grid() {
        let config = NavConfig {
            section_size: 2,
            ..NavConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NavConfig {
            cols: 0,
            ..NavConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn costs_load_from_json_map() {
        let json = r#"{
            "costs": {
                "terrain": {
                    "Grass": 1.0, "Dirt": 1.2, "Sand": 1.5, "Mud": 4.0,
                    "ShallowWater": 3.0, "DeepWater": 100.0, "Rock": 100.0, "Lava": 250.0
                },
                "floor": {
                    "None": 1.0, "BasicPath": 0.7, "Road": 0.4, "Planks": 0.8, "Carpet": 0.9
                },
                "overlay": { "Road": 0.4 }
            }
        }"#;
        let config = NavConfig::from_json(json).unwrap();
        assert_eq!(config.costs.terrain[&TerrainType::Mud], 4.0);
        assert_eq!(config.costs.overlay_multiplier(BuildingKind::Road), 0.4);
        assert_eq!(config.costs.overlay_multiplier(BuildingKind::Path), 1.0);
    }
}
