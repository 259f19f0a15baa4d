// greenway_nav — incremental navigation grid for many-agent 2D worlds.
//
// Agents walk a large tile world that changes under them: buildings go up
// and come down, trees are felled, floors are painted. This crate keeps a
// cost/solidity grid in step with those changes without rescanning the map
// per edit, answers A* path queries against it, and makes "is this even
// reachable" a cheap region-graph lookup.
//
// Module overview:
// - `types.rs`:       CellCoord, WorldPos, CellRect, SectionCoord, ids, Movement.
// - `config.rs`:      NavConfig + CostTable — every tunable, loaded from JSON.
// - `error.rs`:       ConfigError, BridgeError.
// - `terrain.rs`:     TerrainLayer — base terrain and floor per cell, fused cost.
// - `obstacle.rs`:    Buildings and natural obstacles, kind → stamp rule table.
// - `nav_grid.rs`:    NavGrid — solid/cost arrays, min_cost, dirty sections.
// - `rebuild.rs`:     Full and region rebuilds, RebuildScheduler.
// - `regions.rs`:     ConnectivityIndex — per-section regions, links, components.
// - `pathfinding.rs`: A* with danger zones, batch search.
// - `snapshot.rs`:    NavSnapshot — plain-data copy for off-thread search.
// - `executor.rs`:    PathExecutor (sync / worker thread), PathBridge.
// - `edit.rs`:        WorldEdit — typed mutations of the source data.
// - `world.rs`:       NavWorld — the single owner and its tick loop.
// - `scenario.rs`:    Fixture and seeded random worlds for tests and benches.
// - `prng`:           Re-exported from `greenway_prng`.
//
// **Critical constraint: determinism.** Grid contents, region ids and paths
// are pure functions of config plus the edit sequence. No `HashMap`
// iteration order, no system time, no OS entropy.

pub mod config;
pub mod edit;
pub mod error;
pub mod executor;
pub mod nav_grid;
pub mod obstacle;
pub mod pathfinding;
pub use greenway_prng as prng;
pub mod rebuild;
pub mod regions;
pub mod scenario;
pub mod snapshot;
pub mod terrain;
pub mod types;
pub mod world;
