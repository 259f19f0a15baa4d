// A* search over the nav grid.
//
// Step cost from cell A to neighbour B is `cost[B]`, times sqrt(2) for a
// diagonal step, times the danger factor of B (the largest penalty among
// zones containing B's center, 1.0 outside all zones). The heuristic is
// grid distance to the goal (Manhattan for `Movement::Cardinal`, octile for
// `Movement::Octile`) times the grid's `min_cost`. Every step costs at least
// `min_cost` per unit of distance and danger factors are >= 1, so the
// heuristic never overestimates.
//
// Before touching the open set the planner checks, in order: both endpoints
// in bounds, goal cell not solid, start and goal in the same cell, and the
// connectivity index agreeing the goal is reachable. Any failing check
// returns with zero expansions. The search itself stops on reaching the
// goal, on an empty open set, or after `max_expansions` closed nodes
// (default: the grid's cell count).
//
// A start cell that is solid (a wall finished under someone's feet) is
// still expanded, so the agent can step off it into an open neighbour.
// Solid cells are never entered.
//
// Paths hold cell centers from the start cell (exclusive) to the goal cell
// (inclusive). Results computed against a snapshot may be a tick stale, so
// consumers check `next_waypoint_blocked` before stepping.
//
// The open set uses the same reversed-`Ord` min-heap entry as the rest of
// the codebase: `total_cmp` on f-score, node index as tiebreak, so equal-cost
// alternatives always resolve the same way.
//
// See also: `regions.rs` (reachability pre-check), `executor.rs` (sync and
// threaded dispatch), `snapshot.rs` (the data off-thread searches run on).
//
// **Critical constraint: determinism.** No hash maps, no randomness, no
// thread-dependent ordering; `find_path_batch` returns results in request
// order regardless of which worker computed them.

use crate::nav_grid::NavGrid;
use crate::regions::ConnectivityIndex;
use crate::types::{CellCoord, Movement, WorldPos};
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

const NO_PARENT: u32 = u32::MAX;

const CARDINAL_STEPS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL_STEPS: [(i32, i32); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];

// ---------------------------------------------------------------------------
// Requests and results
// ---------------------------------------------------------------------------

/// A circular area agents should avoid. Entering a cell whose center lies
/// inside multiplies the step cost by `penalty_factor`; it never blocks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DangerZone {
    pub center: WorldPos,
    pub radius: f32,
    pub penalty_factor: f32,
}

impl DangerZone {
    pub fn new(center: WorldPos, radius: f32, penalty_factor: f32) -> Self {
        Self {
            center,
            radius,
            penalty_factor,
        }
    }

    /// `None` if the zone can have no influence: a negative or non-finite
    /// radius, a factor below 1 or non-finite, or a non-finite center.
    pub fn sanitized(self) -> Option<Self> {
        let valid = self.center.x.is_finite()
            && self.center.y.is_finite()
            && self.radius.is_finite()
            && self.radius >= 0.0
            && self.penalty_factor.is_finite()
            && self.penalty_factor >= 1.0;
        valid.then_some(self)
    }

    pub fn contains(&self, pos: WorldPos) -> bool {
        self.center.distance_squared(pos) <= self.radius * self.radius
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathOptions {
    pub danger_zones: Vec<DangerZone>,
    /// Closed-node budget. `None` means the grid's cell count.
    pub max_expansions: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathRequest {
    pub start: WorldPos,
    pub goal: WorldPos,
    pub options: PathOptions,
}

impl PathRequest {
    pub fn new(start: WorldPos, goal: WorldPos) -> Self {
        Self {
            start,
            goal,
            options: PathOptions::default(),
        }
    }

    pub fn with_danger(mut self, zone: DangerZone) -> Self {
        self.options.danger_zones.push(zone);
        self
    }
}

/// A found route. `cells[i]` is the cell whose center is `waypoints[i]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub waypoints: Vec<WorldPos>,
    pub cells: Vec<CellCoord>,
    /// Sum of step costs, danger penalties included.
    pub total_cost: f32,
}

impl Path {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether the next cell to step into has become solid since the path
    /// was computed. An empty path is never blocked.
    pub fn next_waypoint_blocked(&self, grid: &NavGrid) -> bool {
        self.cells.first().is_some_and(|c| grid.is_solid(*c))
    }

    /// Index of the first waypoint that is now solid.
    pub fn first_blocked_index(&self, grid: &NavGrid) -> Option<usize> {
        self.cells.iter().position(|c| grid.is_solid(*c))
    }
}

/// Why a search ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchOutcome {
    Found,
    /// Start and goal share a cell; the path is empty.
    SameCell,
    OutOfBounds,
    GoalSolid,
    /// The connectivity index ruled the goal out before searching.
    Unreachable,
    /// The open set emptied.
    Exhausted,
    ExpansionCap,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub path: Option<Path>,
    /// Nodes closed by the search.
    pub expanded: usize,
    pub outcome: SearchOutcome,
}

impl SearchReport {
    fn failed(outcome: SearchOutcome, expanded: usize) -> Self {
        Self {
            path: None,
            expanded,
            outcome,
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Min-heap entry (reversed ordering on f-score).
#[derive(Clone, Copy)]
struct OpenEntry {
    node: u32,
    f_score: f32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f_score.total_cmp(&other.f_score) == Ordering::Equal && self.node == other.node
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f_score is "greatest".
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Shortest path for one request, or `None`.
pub fn find_path(
    grid: &NavGrid,
    regions: &ConnectivityIndex,
    movement: Movement,
    request: &PathRequest,
) -> Option<Path> {
    find_path_report(grid, regions, movement, request).path
}

/// Evaluate independent requests in parallel. Results are in request order.
pub fn find_path_batch(
    grid: &NavGrid,
    regions: &ConnectivityIndex,
    movement: Movement,
    requests: &[PathRequest],
) -> Vec<Option<Path>> {
    requests
        .par_iter()
        .map(|request| find_path(grid, regions, movement, request))
        .collect()
}

/// Run a search and report how it ended and how much work it did.
pub fn find_path_report(
    grid: &NavGrid,
    regions: &ConnectivityIndex,
    movement: Movement,
    request: &PathRequest,
) -> SearchReport {
    let finite = |p: WorldPos| p.x.is_finite() && p.y.is_finite();
    if !finite(request.start) || !finite(request.goal) {
        return SearchReport::failed(SearchOutcome::OutOfBounds, 0);
    }
    let start = grid.world_to_cell(request.start);
    let goal = grid.world_to_cell(request.goal);
    let (Some(si), Some(gi)) = (grid.index(start), grid.index(goal)) else {
        debug!("path {start} -> {goal}: endpoint out of bounds");
        return SearchReport::failed(SearchOutcome::OutOfBounds, 0);
    };
    if grid.solid_at(gi) {
        debug!("path {start} -> {goal}: goal is solid");
        return SearchReport::failed(SearchOutcome::GoalSolid, 0);
    }
    if si == gi {
        return SearchReport {
            path: Some(Path {
                waypoints: Vec::new(),
                cells: Vec::new(),
                total_cost: 0.0,
            }),
            expanded: 0,
            outcome: SearchOutcome::SameCell,
        };
    }
    if !regions.is_reachable(grid, start, goal) {
        debug!("path {start} -> {goal}: no connecting regions");
        return SearchReport::failed(SearchOutcome::Unreachable, 0);
    }

    let zones: Vec<DangerZone> = request
        .options
        .danger_zones
        .iter()
        .filter_map(|z| z.sanitized())
        .filter(|z| z.penalty_factor > 1.0)
        .collect();
    let cap = request.options.max_expansions.unwrap_or(grid.len());

    astar(grid, movement, &zones, si, gi, cap)
}

fn astar(
    grid: &NavGrid,
    movement: Movement,
    zones: &[DangerZone],
    si: usize,
    gi: usize,
    cap: usize,
) -> SearchReport {
    let n = grid.len();
    let goal = grid.cell_of_index(gi);
    let min_cost = grid.min_cost();
    let heuristic = |cell: CellCoord| -> f32 {
        let distance = match movement {
            Movement::Cardinal => cell.manhattan_distance(goal) as f32,
            Movement::Octile => cell.octile_distance(goal),
        };
        distance * min_cost
    };
    let danger = |cell: CellCoord| -> f32 {
        if zones.is_empty() {
            return 1.0;
        }
        let center = grid.cell_center(cell);
        zones
            .iter()
            .filter(|z| z.contains(center))
            .map(|z| z.penalty_factor)
            .fold(1.0, f32::max)
    };

    let mut g_score = vec![f32::INFINITY; n];
    let mut came_from = vec![NO_PARENT; n];
    let mut closed = vec![false; n];
    let mut open = BinaryHeap::new();
    let mut expanded = 0usize;

    g_score[si] = 0.0;
    open.push(OpenEntry {
        node: si as u32,
        f_score: heuristic(grid.cell_of_index(si)),
    });

    while let Some(current) = open.pop() {
        let ci = current.node as usize;
        if ci == gi {
            return SearchReport {
                path: Some(reconstruct_path(grid, &came_from, si, gi, g_score[gi])),
                expanded,
                outcome: SearchOutcome::Found,
            };
        }
        if closed[ci] {
            continue;
        }
        if expanded >= cap {
            warn!(
                "path {} -> {}: expansion cap {cap} reached",
                grid.cell_of_index(si),
                goal
            );
            return SearchReport::failed(SearchOutcome::ExpansionCap, expanded);
        }
        closed[ci] = true;
        expanded += 1;

        let cell = grid.cell_of_index(ci);
        let current_g = g_score[ci];
        let mut relax = |next: CellCoord, step: f32| {
            let Some(ni) = grid.index(next) else {
                return;
            };
            if closed[ni] || grid.solid_at(ni) {
                return;
            }
            let tentative = current_g + grid.cost_at(ni) * step * danger(next);
            if tentative < g_score[ni] {
                g_score[ni] = tentative;
                came_from[ni] = ci as u32;
                open.push(OpenEntry {
                    node: ni as u32,
                    f_score: tentative + heuristic(next),
                });
            }
        };

        for (dc, dr) in CARDINAL_STEPS {
            relax(cell.offset(dc, dr), 1.0);
        }
        if movement == Movement::Octile {
            for (dc, dr) in DIAGONAL_STEPS {
                // No corner cutting: both orthogonal cells must be open.
                if grid.passable(cell.offset(dc, 0)) && grid.passable(cell.offset(0, dr)) {
                    relax(cell.offset(dc, dr), std::f32::consts::SQRT_2);
                }
            }
        }
    }

    debug!(
        "path {} -> {}: open set exhausted after {expanded} expansions",
        grid.cell_of_index(si),
        goal
    );
    SearchReport::failed(SearchOutcome::Exhausted, expanded)
}

fn reconstruct_path(
    grid: &NavGrid,
    came_from: &[u32],
    si: usize,
    gi: usize,
    total_cost: f32,
) -> Path {
    let mut cells = Vec::new();
    let mut current = gi;
    while current != si {
        cells.push(grid.cell_of_index(current));
        current = came_from[current] as usize;
    }
    cells.reverse();
    let waypoints = cells.iter().map(|c| grid.cell_center(*c)).collect();
    Path {
        waypoints,
        cells,
        total_cost,
    }
}
