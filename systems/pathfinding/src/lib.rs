#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Height-aware A* pathfinder over the tile grid.
//!
//! Agents walk on footing, step up or drop down by at most two tiles while
//! moving sideways, and climb straight up or down only along ladders. Every
//! tile the search visits satisfies [`TerrainView::can_stand_at`], which is
//! the same predicate the reachability cache stores.

use std::{cmp::Ordering, collections::BinaryHeap};

use delve_core::{TerrainView, TileCoord, AGENT_HEIGHT};
use serde::Deserialize;
use tracing::warn;

const DEFAULT_MAX_ITERATIONS: u32 = 4096;

/// Vertical offsets tried for every sideways step, in preference order.
const SIDEWAYS_RISES: [i32; 5] = [0, 1, 2, -1, -2];

/// Tunables for the pathfinder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Maximum number of nodes expanded before a search gives up.
    pub max_iterations: u32,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Sequence of foot positions from a start tile to a goal tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePath {
    tiles: Vec<TileCoord>,
    cost: f32,
}

impl TilePath {
    /// Foot positions visited by the path, including start and goal.
    #[must_use]
    pub fn tiles(&self) -> &[TileCoord] {
        &self.tiles
    }

    /// Accumulated traversal cost, in units of elapsed walking time.
    #[must_use]
    pub const fn cost(&self) -> f32 {
        self.cost
    }

    /// Number of steps taken along the path.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.tiles.len().saturating_sub(1)
    }

    /// Reports whether the path climbs or descends a ladder at any point.
    #[must_use]
    pub fn requires_vertical_transition(&self) -> bool {
        self.tiles
            .windows(2)
            .any(|pair| pair[0].x() == pair[1].x() && pair[0].y() != pair[1].y())
    }

    /// Consumes the path, yielding the foot positions.
    #[must_use]
    pub fn into_tiles(self) -> Vec<TileCoord> {
        self.tiles
    }
}

/// A* pathfinder that reuses its search buffers between queries.
#[derive(Debug, Default)]
pub struct Pathfinder {
    config: PathfinderConfig,
    workspace: SearchWorkspace,
}

impl Pathfinder {
    /// Creates a new pathfinder with empty search buffers.
    #[must_use]
    pub fn new(config: PathfinderConfig) -> Self {
        Self {
            config,
            workspace: SearchWorkspace::default(),
        }
    }

    /// Configuration the pathfinder was created with.
    #[must_use]
    pub const fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    /// Searches for the cheapest sequence of foot positions from `start` to `goal`.
    ///
    /// Returns `None` when the goal is not standable, when no route exists, or
    /// when the search exceeds its iteration budget.
    pub fn find_path(
        &mut self,
        terrain: TerrainView<'_>,
        start: TileCoord,
        goal: TileCoord,
    ) -> Option<TilePath> {
        if !terrain.in_bounds(start) || !terrain.can_stand_at(goal) {
            return None;
        }

        if start == goal {
            return Some(TilePath {
                tiles: vec![start],
                cost: 0.0,
            });
        }

        let (width, height) = terrain.dimensions();
        self.workspace.begin(width, height);
        let start_index = self.workspace.index(start)?;
        self.workspace.relax(start_index, 0.0, None);

        let mut open = BinaryHeap::new();
        let mut insertion = 0u64;
        open.push(OpenNode {
            coord: start,
            f_cost: heuristic(start, goal),
            h_cost: heuristic(start, goal),
            insertion,
        });

        let mut expanded = 0u32;
        while let Some(current) = open.pop() {
            let Some(current_index) = self.workspace.index(current.coord) else {
                continue;
            };
            if !self.workspace.close(current_index) {
                continue;
            }

            if current.coord == goal {
                let cost = self.workspace.g_cost(current_index);
                let tiles = self.workspace.reconstruct(current_index)?;
                return Some(TilePath { tiles, cost });
            }

            expanded = expanded.saturating_add(1);
            if expanded > self.config.max_iterations {
                warn!(
                    ?start,
                    ?goal,
                    max_iterations = self.config.max_iterations,
                    "path search exceeded iteration budget"
                );
                return None;
            }

            let current_g = self.workspace.g_cost(current_index);
            for neighbor in neighbors(terrain, current.coord) {
                let Some(neighbor_index) = self.workspace.index(neighbor) else {
                    continue;
                };
                if self.workspace.is_closed(neighbor_index) {
                    continue;
                }

                let tentative = current_g + step_cost(terrain, current.coord, neighbor);
                if tentative >= self.workspace.g_cost(neighbor_index) {
                    continue;
                }

                self.workspace
                    .relax(neighbor_index, tentative, Some(current_index));
                insertion = insertion.saturating_add(1);
                let h_cost = heuristic(neighbor, goal);
                open.push(OpenNode {
                    coord: neighbor,
                    f_cost: tentative + h_cost,
                    h_cost,
                    insertion,
                });
            }
        }

        None
    }

    /// Reports whether any route connects `start` and `goal`.
    pub fn path_exists(
        &mut self,
        terrain: TerrainView<'_>,
        start: TileCoord,
        goal: TileCoord,
    ) -> bool {
        self.find_path(terrain, start, goal).is_some()
    }
}

/// Enumerates the foot positions reachable from `from` in a single move.
pub fn neighbors(
    terrain: TerrainView<'_>,
    from: TileCoord,
) -> impl Iterator<Item = TileCoord> + '_ {
    let sideways = [-1, 1].into_iter().flat_map(move |dx| {
        SIDEWAYS_RISES
            .into_iter()
            .map(move |dy| from.offset(dx, dy))
    });
    let vertical = [1, -1].into_iter().map(move |dy| from.offset(0, dy));

    sideways
        .chain(vertical)
        .filter(move |to| can_traverse(terrain, from, *to))
}

/// Reports whether an agent standing at `from` can move directly to `to`.
#[must_use]
pub fn can_traverse(terrain: TerrainView<'_>, from: TileCoord, to: TileCoord) -> bool {
    if !terrain.can_stand_at(to) {
        return false;
    }

    let dx = to.x() - from.x();
    let dy = to.y() - from.y();

    match (dx.abs(), dy) {
        (0, 1 | -1) => terrain.is_ladder(from) || terrain.is_ladder(to),
        (1, 0) => true,
        (1, 1..=2) => {
            (0..dy).all(|rise| terrain.is_clear(from.offset(0, AGENT_HEIGHT + rise)))
        }
        (1, -2..=-1) => {
            (0..-dy).all(|drop| terrain.is_clear(to.offset(0, AGENT_HEIGHT + drop)))
        }
        _ => false,
    }
}

/// Cost of moving from `from` to the adjacent foot position `to`.
///
/// Each tile of height change adds one unit; the sum is scaled by the speed
/// multiplier of the destination's overlay.
#[must_use]
pub fn step_cost(terrain: TerrainView<'_>, from: TileCoord, to: TileCoord) -> f32 {
    let rise = to.y().abs_diff(from.y()) as f32;
    (1.0 + rise) / terrain.speed_multiplier(to)
}

fn heuristic(from: TileCoord, goal: TileCoord) -> f32 {
    from.manhattan_distance(goal) as f32
}

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    coord: TileCoord,
    f_cost: f32,
    h_cost: f32,
    insertion: u64,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    // Reversed so the max-heap yields the lowest f, then lowest h, then oldest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .total_cmp(&self.f_cost)
            .then_with(|| other.h_cost.total_cmp(&self.h_cost))
            .then_with(|| other.insertion.cmp(&self.insertion))
    }
}

/// Dense per-tile search state, invalidated by bumping a generation stamp
/// instead of clearing the buffers.
#[derive(Debug, Default)]
struct SearchWorkspace {
    width: u32,
    height: u32,
    generation: u32,
    stamps: Vec<u32>,
    g_costs: Vec<f32>,
    parents: Vec<Option<usize>>,
    closed: Vec<bool>,
}

impl SearchWorkspace {
    fn begin(&mut self, width: u32, height: u32) {
        let node_count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        if self.width != width || self.height != height || self.stamps.len() != node_count {
            self.width = width;
            self.height = height;
            self.generation = 0;
            self.stamps = vec![0; node_count];
            self.g_costs = vec![f32::INFINITY; node_count];
            self.parents = vec![None; node_count];
            self.closed = vec![false; node_count];
        }

        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamps.fill(0);
            self.generation = 1;
        }
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        let x = u32::try_from(coord.x()).ok()?;
        let y = u32::try_from(coord.y()).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        usize::try_from(y)
            .ok()?
            .checked_mul(width)?
            .checked_add(usize::try_from(x).ok()?)
    }

    fn touch(&mut self, index: usize) {
        if self.stamps[index] != self.generation {
            self.stamps[index] = self.generation;
            self.g_costs[index] = f32::INFINITY;
            self.parents[index] = None;
            self.closed[index] = false;
        }
    }

    fn g_cost(&self, index: usize) -> f32 {
        if self.stamps[index] == self.generation {
            self.g_costs[index]
        } else {
            f32::INFINITY
        }
    }

    fn is_closed(&self, index: usize) -> bool {
        self.stamps[index] == self.generation && self.closed[index]
    }

    fn relax(&mut self, index: usize, g_cost: f32, parent: Option<usize>) {
        self.touch(index);
        self.g_costs[index] = g_cost;
        self.parents[index] = parent;
    }

    /// Marks the node closed, returning `false` if it already was.
    fn close(&mut self, index: usize) -> bool {
        self.touch(index);
        if self.closed[index] {
            return false;
        }
        self.closed[index] = true;
        true
    }

    fn coord_of(&self, index: usize) -> Option<TileCoord> {
        let width = usize::try_from(self.width).ok()?;
        if width == 0 {
            return None;
        }
        let x = i32::try_from(index % width).ok()?;
        let y = i32::try_from(index / width).ok()?;
        Some(TileCoord::new(x, y))
    }

    fn reconstruct(&self, goal_index: usize) -> Option<Vec<TileCoord>> {
        let mut tiles = Vec::new();
        let mut cursor = Some(goal_index);
        while let Some(index) = cursor {
            tiles.push(self.coord_of(index)?);
            cursor = self.parents[index];
            if tiles.len() > self.stamps.len() {
                return None;
            }
        }
        tiles.reverse();
        Some(tiles)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use delve_core::{FloorOverlay, TileType};

    use super::*;

    struct Grid {
        width: u32,
        height: u32,
        tiles: Vec<TileType>,
        overlays: BTreeMap<TileCoord, FloorOverlay>,
    }

    impl Grid {
        fn with_floor(width: u32, height: u32) -> Self {
            let mut tiles = vec![TileType::AIR; (width * height) as usize];
            for x in 0..width {
                tiles[x as usize] = TileType::ROCK;
            }
            Self {
                width,
                height,
                tiles,
                overlays: BTreeMap::new(),
            }
        }

        fn rock(&mut self, x: i32, y: i32) {
            self.tiles[(y as u32 * self.width + x as u32) as usize] = TileType::ROCK;
        }

        fn view(&self) -> TerrainView<'_> {
            TerrainView::new(&self.tiles, &self.overlays, self.width, self.height)
        }
    }

    #[test]
    fn walks_along_flat_floor() {
        let grid = Grid::with_floor(6, 4);
        let mut pathfinder = Pathfinder::default();

        let path = pathfinder
            .find_path(grid.view(), TileCoord::new(0, 1), TileCoord::new(5, 1))
            .expect("flat path");

        assert_eq!(path.steps(), 5);
        assert!((path.cost() - 5.0).abs() < f32::EPSILON);
        assert!(!path.requires_vertical_transition());
    }

    #[test]
    fn step_up_two_costs_three() {
        let mut grid = Grid::with_floor(4, 6);
        grid.rock(2, 1);
        grid.rock(2, 2);
        let view = grid.view();

        assert!(can_traverse(view, TileCoord::new(1, 1), TileCoord::new(2, 3)));
        let climb = step_cost(view, TileCoord::new(1, 1), TileCoord::new(2, 3));
        assert!((climb - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn climbing_needs_headroom_above_origin() {
        let mut grid = Grid::with_floor(4, 6);
        grid.rock(2, 1);
        grid.rock(2, 2);
        grid.rock(1, 3);
        let view = grid.view();

        assert!(!can_traverse(view, TileCoord::new(1, 1), TileCoord::new(2, 3)));
    }

    #[test]
    fn dropping_needs_clear_destination_column() {
        let mut grid = Grid::with_floor(4, 6);
        grid.rock(1, 1);
        grid.rock(1, 2);
        grid.rock(2, 4);
        let view = grid.view();

        assert!(view.can_stand_at(TileCoord::new(1, 3)));
        assert!(view.can_stand_at(TileCoord::new(2, 1)));
        assert!(!can_traverse(view, TileCoord::new(1, 3), TileCoord::new(2, 1)));
    }

    #[test]
    fn vertical_moves_require_a_ladder() {
        let mut grid = Grid::with_floor(3, 6);
        let view = grid.view();
        assert!(!can_traverse(view, TileCoord::new(1, 1), TileCoord::new(1, 2)));

        let _ = grid
            .overlays
            .insert(TileCoord::new(1, 1), FloorOverlay::ladder());
        let view = grid.view();
        assert!(can_traverse(view, TileCoord::new(1, 1), TileCoord::new(1, 2)));
        assert!(can_traverse(view, TileCoord::new(1, 2), TileCoord::new(1, 1)));
    }

    #[test]
    fn speed_multiplier_scales_step_cost() {
        let mut grid = Grid::with_floor(3, 3);
        let _ = grid.overlays.insert(
            TileCoord::new(1, 1),
            FloorOverlay::platform().with_speed_multiplier(2.0),
        );
        let cost = step_cost(grid.view(), TileCoord::new(0, 1), TileCoord::new(1, 1));
        assert!((cost - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn unstandable_goal_fails_without_search() {
        let grid = Grid::with_floor(4, 4);
        let mut pathfinder = Pathfinder::default();
        assert!(pathfinder
            .find_path(grid.view(), TileCoord::new(0, 1), TileCoord::new(2, 2))
            .is_none());
    }

    #[test]
    fn iteration_budget_turns_long_search_into_failure() {
        let grid = Grid::with_floor(40, 3);
        let mut pathfinder = Pathfinder::new(PathfinderConfig { max_iterations: 5 });
        assert!(pathfinder
            .find_path(grid.view(), TileCoord::new(0, 1), TileCoord::new(39, 1))
            .is_none());

        let mut unbounded = Pathfinder::default();
        assert!(unbounded.path_exists(grid.view(), TileCoord::new(0, 1), TileCoord::new(39, 1)));
    }

    #[test]
    fn workspace_is_reused_across_queries() {
        let grid = Grid::with_floor(8, 3);
        let mut pathfinder = Pathfinder::default();
        let first = pathfinder
            .find_path(grid.view(), TileCoord::new(0, 1), TileCoord::new(7, 1))
            .expect("first");
        let second = pathfinder
            .find_path(grid.view(), TileCoord::new(0, 1), TileCoord::new(7, 1))
            .expect("second");
        assert_eq!(first, second);
    }
}
