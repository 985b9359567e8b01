#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Chunked standability cache with incremental invalidation.
//!
//! The grid is partitioned into [`CHUNK_SIZE`]-square chunks. Each chunk
//! stores whether an agent could stand at every foot position it covers.
//! Terrain edits only mark chunks dirty; dirty chunks are rebuilt wholesale in
//! a batch, so a clean chunk always mirrors the terrain it was built from.
//! Every rebuild is announced with [`Event::ChunkInvalidated`].

use std::collections::BTreeSet;

use delve_core::{ChunkCoord, Event, TerrainView, TileCoord, CHUNK_SIZE};
use serde::Deserialize;
use tracing::debug;

const CHUNK_AREA: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Tunables for the reachability cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReachabilityConfig {
    /// Maximum number of chunks rebuilt by one [`ReachabilityMap::update_dirty_chunks`]
    /// call; zero rebuilds every dirty chunk.
    pub rebuild_budget: usize,
}

#[derive(Clone, Debug)]
struct Chunk {
    standable: Vec<bool>,
    rebuilds: u64,
}

impl Chunk {
    fn empty() -> Self {
        Self {
            standable: vec![false; CHUNK_AREA],
            rebuilds: 0,
        }
    }

    fn rebuild(&mut self, coord: ChunkCoord, terrain: &TerrainView<'_>) {
        let origin = coord.origin();
        for local_y in 0..CHUNK_SIZE {
            for local_x in 0..CHUNK_SIZE {
                let pos = origin.offset(local_x, local_y);
                self.standable[local_index(local_x, local_y)] = terrain.can_stand_at(pos);
            }
        }
        self.rebuilds = self.rebuilds.saturating_add(1);
    }

    fn can_stand_at(&self, pos: TileCoord) -> bool {
        let local_x = pos.x().rem_euclid(CHUNK_SIZE);
        let local_y = pos.y().rem_euclid(CHUNK_SIZE);
        self.standable[local_index(local_x, local_y)]
    }
}

/// Cache of standable foot positions, partitioned into chunks.
#[derive(Clone, Debug)]
pub struct ReachabilityMap {
    config: ReachabilityConfig,
    width: u32,
    height: u32,
    chunk_columns: i32,
    chunk_rows: i32,
    chunks: Vec<Chunk>,
    dirty: BTreeSet<ChunkCoord>,
}

impl ReachabilityMap {
    /// Creates a cache covering a `width` × `height` grid with every chunk dirty.
    #[must_use]
    pub fn new(config: ReachabilityConfig, width: u32, height: u32) -> Self {
        let mut map = Self {
            config,
            width: 0,
            height: 0,
            chunk_columns: 0,
            chunk_rows: 0,
            chunks: Vec::new(),
            dirty: BTreeSet::new(),
        };
        map.reset(width, height);
        map
    }

    /// Discards every cached chunk and resizes the cache, marking it all dirty.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.chunk_columns = chunk_span(width);
        self.chunk_rows = chunk_span(height);
        let count = usize::try_from(self.chunk_columns.max(0)).unwrap_or(0)
            * usize::try_from(self.chunk_rows.max(0)).unwrap_or(0);
        self.chunks = vec![Chunk::empty(); count];
        self.mark_all_dirty();
    }

    /// Number of chunk columns and rows covering the grid.
    #[must_use]
    pub const fn chunk_dimensions(&self) -> (i32, i32) {
        (self.chunk_columns, self.chunk_rows)
    }

    /// Marks the chunks containing each coordinate, and their eight
    /// neighbours, for rebuilding.
    pub fn on_tiles_changed(&mut self, coords: &[TileCoord]) {
        for coord in coords {
            let center = coord.chunk();
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let chunk = ChunkCoord::new(center.x() + dx, center.y() + dy);
                    if self.chunk_index(chunk).is_some() {
                        let _ = self.dirty.insert(chunk);
                    }
                }
            }
        }
    }

    /// Marks every chunk for rebuilding.
    pub fn mark_all_dirty(&mut self) {
        for y in 0..self.chunk_rows {
            for x in 0..self.chunk_columns {
                let _ = self.dirty.insert(ChunkCoord::new(x, y));
            }
        }
    }

    /// Rebuilds dirty chunks within the configured per-call budget.
    ///
    /// Chunks are processed in ascending order; anything beyond the budget
    /// stays dirty for the next call. Returns the number of chunks rebuilt.
    pub fn update_dirty_chunks(&mut self, terrain: TerrainView<'_>, out: &mut Vec<Event>) -> usize {
        let budget = match self.config.rebuild_budget {
            0 => usize::MAX,
            limit => limit,
        };
        self.rebuild_dirty(terrain, budget, out)
    }

    /// Rebuilds every dirty chunk immediately, ignoring the budget.
    ///
    /// Call before any query that must not observe stale standability.
    pub fn force_update(&mut self, terrain: TerrainView<'_>, out: &mut Vec<Event>) -> usize {
        self.rebuild_dirty(terrain, usize::MAX, out)
    }

    /// Marks everything dirty and rebuilds the whole cache.
    pub fn rebuild_all(&mut self, terrain: TerrainView<'_>, out: &mut Vec<Event>) -> usize {
        self.mark_all_dirty();
        self.force_update(terrain, out)
    }

    fn rebuild_dirty(
        &mut self,
        terrain: TerrainView<'_>,
        budget: usize,
        out: &mut Vec<Event>,
    ) -> usize {
        if terrain.dimensions() != (self.width, self.height) {
            let (width, height) = terrain.dimensions();
            debug!(width, height, "terrain dimensions changed; resetting reachability cache");
            self.reset(width, height);
        }

        let selected: Vec<ChunkCoord> = self.dirty.iter().copied().take(budget).collect();
        for coord in &selected {
            let _ = self.dirty.remove(coord);
            let Some(index) = self.chunk_index(*coord) else {
                continue;
            };
            self.chunks[index].rebuild(*coord, &terrain);
            out.push(Event::ChunkInvalidated { chunk: *coord });
        }

        if !selected.is_empty() {
            debug!(
                rebuilt = selected.len(),
                remaining = self.dirty.len(),
                "rebuilt reachability chunks"
            );
        }
        selected.len()
    }

    /// Reports whether an agent could stand at `pos` according to the cache.
    ///
    /// Dirty chunks answer with their last built state until rebuilt.
    #[must_use]
    pub fn can_stand_at(&self, pos: TileCoord) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        self.chunk_index(pos.chunk())
            .map_or(false, |index| self.chunks[index].can_stand_at(pos))
    }

    /// Cheap pre-filter confirming both endpoints are standable.
    ///
    /// A `true` answer does not guarantee a path; the pathfinder decides that.
    #[must_use]
    pub fn is_reachable(&self, from: TileCoord, to: TileCoord) -> bool {
        self.can_stand_at(from) && self.can_stand_at(to)
    }

    /// Reports whether the chunk awaits a rebuild.
    #[must_use]
    pub fn is_dirty(&self, chunk: ChunkCoord) -> bool {
        self.dirty.contains(&chunk)
    }

    /// Number of chunks awaiting a rebuild.
    #[must_use]
    pub fn dirty_chunk_count(&self) -> usize {
        self.dirty.len()
    }

    /// Dirty chunks in rebuild order.
    pub fn dirty_chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.dirty.iter().copied()
    }

    /// Number of times the chunk has been rebuilt, if it lies inside the grid.
    #[must_use]
    pub fn rebuild_count(&self, chunk: ChunkCoord) -> Option<u64> {
        self.chunk_index(chunk).map(|index| self.chunks[index].rebuilds)
    }

    fn in_bounds(&self, pos: TileCoord) -> bool {
        u32::try_from(pos.x()).is_ok_and(|x| x < self.width)
            && u32::try_from(pos.y()).is_ok_and(|y| y < self.height)
    }

    fn chunk_index(&self, chunk: ChunkCoord) -> Option<usize> {
        if chunk.x() < 0
            || chunk.y() < 0
            || chunk.x() >= self.chunk_columns
            || chunk.y() >= self.chunk_rows
        {
            return None;
        }
        let row = usize::try_from(chunk.y()).ok()?;
        let column = usize::try_from(chunk.x()).ok()?;
        let columns = usize::try_from(self.chunk_columns).ok()?;
        Some(row * columns + column)
    }
}

fn chunk_span(tiles: u32) -> i32 {
    let size = CHUNK_SIZE.unsigned_abs();
    i32::try_from(tiles.div_ceil(size)).unwrap_or(i32::MAX)
}

fn local_index(local_x: i32, local_y: i32) -> usize {
    usize::try_from(local_y * CHUNK_SIZE + local_x).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use delve_core::{FloorOverlay, TileType};

    use super::*;

    fn floor_tiles(width: u32, height: u32) -> Vec<TileType> {
        let mut tiles = vec![TileType::AIR; (width * height) as usize];
        for x in 0..width {
            tiles[x as usize] = TileType::ROCK;
        }
        tiles
    }

    #[test]
    fn edit_marks_owning_chunk_and_neighbours() {
        let mut map = ReachabilityMap::new(ReachabilityConfig::default(), 64, 64);
        let tiles = floor_tiles(64, 64);
        let overlays = BTreeMap::new();
        let mut events = Vec::new();
        let _ = map.force_update(TerrainView::new(&tiles, &overlays, 64, 64), &mut events);
        assert_eq!(events.len(), 16);

        map.on_tiles_changed(&[TileCoord::new(20, 20)]);
        assert_eq!(map.dirty_chunk_count(), 9);
        assert!(map.is_dirty(ChunkCoord::new(0, 0)));
        assert!(map.is_dirty(ChunkCoord::new(2, 2)));
        assert!(!map.is_dirty(ChunkCoord::new(3, 1)));
    }

    #[test]
    fn corner_edit_clamps_neighbourhood_to_grid() {
        let mut map = ReachabilityMap::new(ReachabilityConfig::default(), 48, 48);
        let tiles = floor_tiles(48, 48);
        let overlays = BTreeMap::new();
        let mut events = Vec::new();
        let _ = map.force_update(TerrainView::new(&tiles, &overlays, 48, 48), &mut events);

        map.on_tiles_changed(&[TileCoord::new(0, 0)]);
        let dirty: Vec<_> = map.dirty_chunks().collect();
        assert_eq!(
            dirty,
            vec![
                ChunkCoord::new(0, 0),
                ChunkCoord::new(0, 1),
                ChunkCoord::new(1, 0),
                ChunkCoord::new(1, 1),
            ]
        );
    }

    #[test]
    fn budget_spreads_rebuilds_across_calls() {
        let config = ReachabilityConfig { rebuild_budget: 3 };
        let mut map = ReachabilityMap::new(config, 64, 32);
        let tiles = floor_tiles(64, 32);
        let overlays = BTreeMap::new();
        let view = TerrainView::new(&tiles, &overlays, 64, 32);
        let mut events = Vec::new();

        assert_eq!(map.update_dirty_chunks(view, &mut events), 3);
        assert_eq!(map.dirty_chunk_count(), 5);
        assert_eq!(map.force_update(view, &mut events), 5);
        assert_eq!(map.dirty_chunk_count(), 0);
        assert_eq!(events.len(), 8);
    }

    #[test]
    fn cache_matches_terrain_predicate() {
        let mut tiles = floor_tiles(20, 20);
        tiles[(3 * 20 + 5) as usize] = TileType::ROCK;
        let mut overlays = BTreeMap::new();
        let _ = overlays.insert(TileCoord::new(17, 4), FloorOverlay::ladder());
        let view = TerrainView::new(&tiles, &overlays, 20, 20);
        let mut map = ReachabilityMap::new(ReachabilityConfig::default(), 20, 20);
        let mut events = Vec::new();
        let _ = map.rebuild_all(view, &mut events);

        for y in -1..21 {
            for x in -1..21 {
                let pos = TileCoord::new(x, y);
                assert_eq!(map.can_stand_at(pos), view.can_stand_at(pos), "mismatch at {pos:?}");
            }
        }
        assert!(map.is_reachable(TileCoord::new(0, 1), TileCoord::new(5, 4)));
        assert!(!map.is_reachable(TileCoord::new(0, 1), TileCoord::new(5, 3)));
    }
}
