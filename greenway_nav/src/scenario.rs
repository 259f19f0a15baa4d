// Ready-made worlds for tests and benches.
//
// Hand-built layouts (open field, wall with a gap, twin-lane corridor) use
// one world unit per cell so cell (c, r) has its center at (c + 0.5, r + 0.5).
// `random_world` and `random_edits` draw everything from a seeded
// `WorldRng`, so a seed always reproduces the same map and edit stream.
// Builders return the config error rather than panicking, though the
// fixture configs are always valid.
//
// See also: `tests/nav_pipeline.rs` and `benches/pathfinding.rs`, the main
// consumers.

use crate::config::NavConfig;
use crate::edit::WorldEdit;
use crate::error::ConfigError;
use crate::obstacle::{BuildingKind, NaturalKind};
use crate::terrain::{FloorType, TerrainType};
use crate::types::{BuildingId, CellCoord, CellRect, Movement, ObstacleId, WorldPos};
use crate::world::NavWorld;
use greenway_prng::WorldRng;

/// Config with unit cells and small sections, sized for fixtures.
pub fn fixture_config(cols: u32, rows: u32) -> NavConfig {
    NavConfig {
        cols,
        rows,
        cell_size: 1.0,
        section_size: 4,
        ..NavConfig::default()
    }
}

/// World position of a cell center in a fixture world.
pub fn at(col: i32, row: i32) -> WorldPos {
    CellCoord::new(col, row).center(1.0)
}

fn build(config: NavConfig, edits: &[WorldEdit]) -> Result<NavWorld, ConfigError> {
    let mut world = NavWorld::new(config)?;
    world.step(edits);
    Ok(world)
}

/// Open grass field.
pub fn open_field(cols: u32, rows: u32, movement: Movement) -> Result<NavWorld, ConfigError> {
    build(
        NavConfig {
            movement,
            ..fixture_config(cols, rows)
        },
        &[],
    )
}

/// A completed wall down column `cols / 2`, spanning every row except
/// `gap_row` (or every row if `None`).
pub fn wall_with_gap(cols: u32, rows: u32, gap_row: Option<i32>) -> Result<NavWorld, ConfigError> {
    let col = (cols / 2) as i32;
    let last = rows as i32 - 1;
    let segments: Vec<(i32, i32)> = match gap_row {
        Some(g) => vec![(0, g - 1), (g + 1, last)],
        None => vec![(0, last)],
    };
    let edits: Vec<WorldEdit> = segments
        .into_iter()
        .filter(|(lo, hi)| lo <= hi)
        .map(|(lo, hi)| WorldEdit::PlaceBuilding {
            kind: BuildingKind::Wall,
            bounds: CellRect::from_corners(CellCoord::new(col, lo), CellCoord::new(col, hi)),
            completed: true,
        })
        .collect();
    build(fixture_config(cols, rows), &edits)
}

/// Two lanes of equal length joined at both ends, separated by rock:
/// row 0 carries a road floor (cost 0.5), row 2 is bare grass (cost 1.0).
/// Start at `at(0, 1)`, goal at `at(length - 1, 1)`.
pub fn twin_corridor(length: u32) -> Result<NavWorld, ConfigError> {
    let last = length as i32 - 1;
    let edits = [
        WorldEdit::SetTerrain {
            rect: CellRect::from_corners(CellCoord::new(1, 1), CellCoord::new(last - 1, 1)),
            terrain: TerrainType::Rock,
        },
        WorldEdit::PaintFloor {
            rect: CellRect::from_corners(CellCoord::new(0, 0), CellCoord::new(last, 0)),
            floor: FloorType::Road,
        },
    ];
    build(fixture_config(length, 3), &edits)
}

// ---------------------------------------------------------------------------
// Seeded random content
// ---------------------------------------------------------------------------

const TERRAIN_WEIGHTS: [(TerrainType, u64); 8] = [
    (TerrainType::Grass, 40),
    (TerrainType::Dirt, 15),
    (TerrainType::Sand, 10),
    (TerrainType::Mud, 10),
    (TerrainType::ShallowWater, 8),
    (TerrainType::DeepWater, 6),
    (TerrainType::Rock, 8),
    (TerrainType::Lava, 3),
];

fn random_terrain(rng: &mut WorldRng) -> TerrainType {
    let total: u64 = TERRAIN_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.range_u64(0, total);
    for (terrain, weight) in TERRAIN_WEIGHTS {
        if roll < weight {
            return terrain;
        }
        roll -= weight;
    }
    TerrainType::Grass
}

fn random_rect(rng: &mut WorldRng, cols: u32, rows: u32, max_side: u32) -> CellRect {
    let w = rng.range_u64(1, max_side as u64 + 1) as i32;
    let h = rng.range_u64(1, max_side as u64 + 1) as i32;
    let col = rng.range_u64(0, cols as u64) as i32;
    let row = rng.range_u64(0, rows as u64) as i32;
    CellRect::from_corners(CellCoord::new(col, row), CellCoord::new(col + w - 1, row + h - 1))
}

/// Random terrain patches, floors, buildings and trees. `density` in
/// `[0, 1]` scales how much gets placed.
pub fn random_world(
    seed: u64,
    cols: u32,
    rows: u32,
    density: f64,
) -> Result<NavWorld, ConfigError> {
    let mut rng = WorldRng::new(seed);
    let mut terrain_rng = rng.fork(1);
    let mut obstacle_rng = rng.fork(2);
    let patches = patch_count(cols, rows, density);
    let mut edits = terrain_edits(&mut terrain_rng, cols, rows, patches);
    edits.extend(obstacle_edits(&mut obstacle_rng, cols, rows, patches));
    build(fixture_config(cols, rows), &edits)
}

fn patch_count(cols: u32, rows: u32, density: f64) -> usize {
    let cells = cols as f64 * rows as f64;
    (cells * density / 12.0).ceil() as usize
}

/// Terrain patches and painted floors.
fn terrain_edits(rng: &mut WorldRng, cols: u32, rows: u32, patches: usize) -> Vec<WorldEdit> {
    let mut edits = Vec::new();
    for _ in 0..patches {
        edits.push(WorldEdit::SetTerrain {
            rect: random_rect(rng, cols, rows, 3),
            terrain: random_terrain(rng),
        });
    }
    for _ in 0..patches / 3 {
        let floor = rng.pick(&FloorType::ALL[1..]).copied().unwrap_or(FloorType::Road);
        edits.push(WorldEdit::PaintFloor {
            rect: random_rect(rng, cols, rows, 4),
            floor,
        });
    }
    edits
}

/// Buildings and trees.
fn obstacle_edits(rng: &mut WorldRng, cols: u32, rows: u32, patches: usize) -> Vec<WorldEdit> {
    let kinds = [
        BuildingKind::Wall,
        BuildingKind::House,
        BuildingKind::Workshop,
        BuildingKind::Road,
        BuildingKind::Door,
    ];
    let mut edits = Vec::new();
    for _ in 0..patches / 3 {
        let kind = rng.pick(&kinds).copied().unwrap_or(BuildingKind::Wall);
        edits.push(WorldEdit::PlaceBuilding {
            kind,
            bounds: random_rect(rng, cols, rows, 3),
            completed: rng.random_bool(0.6),
        });
    }
    for _ in 0..patches / 4 {
        edits.push(WorldEdit::SpawnObstacle {
            kind: NaturalKind::Tree,
            center: WorldPos::new(
                rng.range_f32(0.0, cols as f32),
                rng.range_f32(0.0, rows as f32),
            ),
            radius: rng.range_f32(0.3, 1.8),
        });
    }
    edits
}

/// A stream of plausible edits against an existing world: new buildings,
/// completions and removals of known ones, felled and new trees, repaints.
pub fn random_edits(rng: &mut WorldRng, world: &NavWorld, count: usize) -> Vec<WorldEdit> {
    let cols = world.config().cols;
    let rows = world.config().rows;
    let buildings: Vec<BuildingId> = world.obstacles().buildings().map(|b| b.id).collect();
    let naturals: Vec<ObstacleId> = world.obstacles().naturals().map(|n| n.id).collect();
    (0..count)
        .map(|_| match rng.range_u64(0, 6) {
            0 => WorldEdit::PlaceBuilding {
                kind: BuildingKind::Wall,
                bounds: random_rect(rng, cols, rows, 2),
                completed: rng.random_bool(0.5),
            },
            1 => match rng.pick(&buildings) {
                Some(&id) => WorldEdit::CompleteBuilding { id },
                None => WorldEdit::RequestFullRebuild,
            },
            2 => match rng.pick(&buildings) {
                Some(&id) => WorldEdit::RemoveBuilding { id },
                None => WorldEdit::RequestFullRebuild,
            },
            3 => match rng.pick(&naturals) {
                Some(&id) => WorldEdit::ClearObstacle { id },
                None => WorldEdit::SpawnObstacle {
                    kind: NaturalKind::Rock,
                    center: WorldPos::new(cols as f32 / 2.0, rows as f32 / 2.0),
                    radius: 1.0,
                },
            },
            4 => WorldEdit::PaintFloor {
                rect: random_rect(rng, cols, rows, 3),
                floor: rng.pick(&FloorType::ALL).copied().unwrap_or(FloorType::None),
            },
            _ => WorldEdit::SetTerrain {
                rect: random_rect(rng, cols, rows, 2),
                terrain: random_terrain(rng),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_world_is_reproducible() {
        let a = random_world(99, 24, 24, 0.6).unwrap();
        let b = random_world(99, 24, 24, 0.6).unwrap();
        assert_eq!(a.solid(), b.solid());
        assert_eq!(a.cost(), b.cost());
        let c = random_world(100, 24, 24, 0.6).unwrap();
        assert_ne!(a.cost(), c.cost());
    }

    #[test]
    fn random_world_terrain_ignores_obstacle_stream() {
        let world = random_world(99, 24, 24, 0.6).unwrap();
        let mut terrain_rng = WorldRng::new(99).fork(1);
        let patches = patch_count(24, 24, 0.6);
        let bare = build(
            fixture_config(24, 24),
            &terrain_edits(&mut terrain_rng, 24, 24, patches),
        )
        .unwrap();
        assert_eq!(world.terrain(), bare.terrain());
    }

    #[test]
    fn wall_fixture_shape() {
        let w = wall_with_gap(10, 10, Some(7)).unwrap();
        assert!(w.grid().is_solid(CellCoord::new(5, 0)));
        assert!(w.grid().passable(CellCoord::new(5, 7)));
        let closed = wall_with_gap(10, 10, None).unwrap();
        assert!((0..10).all(|r| closed.grid().is_solid(CellCoord::new(5, r))));
    }
}
