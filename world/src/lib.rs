#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid world state for Delve.
//!
//! The world owns the tile array and the floor-overlay map. It is the only
//! place terrain is written; every accepted edit is broadcast as an
//! [`Event::TilesChanged`] batch so the scheduling systems can invalidate
//! their caches.

mod layout;

use std::collections::{BTreeMap, BTreeSet};

use delve_core::{Command, EditError, Event, FloorOverlay, TileCoord, TileType};
use tracing::debug;

pub use layout::{parse_layout, Layout, LayoutError};

const DEFAULT_GRID_WIDTH: u32 = 32;
const DEFAULT_GRID_HEIGHT: u32 = 32;

/// Represents the authoritative Delve terrain.
#[derive(Clone, Debug)]
pub struct World {
    width: u32,
    height: u32,
    tiles: Vec<TileType>,
    overlays: BTreeMap<TileCoord, FloorOverlay>,
    revision: u64,
}

impl World {
    /// Creates a world filled with air using the default dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_GRID_WIDTH, DEFAULT_GRID_HEIGHT)
    }

    /// Creates a world filled with air using explicit dimensions.
    #[must_use]
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        let cell_count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            tiles: vec![TileType::AIR; cell_count],
            overlays: BTreeMap::new(),
            revision: 0,
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

    fn write_tile(&mut self, coord: TileCoord, tile: TileType) -> Result<bool, EditError> {
        let index = self.index(coord).ok_or(EditError::OutOfBounds)?;
        let slot = &mut self.tiles[index];
        if *slot == tile {
            return Ok(false);
        }
        *slot = tile;
        Ok(true)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { width, height } => {
            *world = World::with_dimensions(width, height);
            out_events.push(Event::GridConfigured { width, height });
        }
        Command::SetTile { coord, tile } => match world.write_tile(coord, tile) {
            Ok(true) => {
                world.revision = world.revision.saturating_add(1);
                out_events.push(Event::TilesChanged {
                    coords: vec![coord],
                });
            }
            Ok(false) => {}
            Err(reason) => reject(coord, reason, out_events),
        },
        Command::SetTiles { edits } => {
            let mut changed = BTreeSet::new();
            for (coord, tile) in edits {
                match world.write_tile(coord, tile) {
                    Ok(true) => {
                        let _ = changed.insert(coord);
                    }
                    Ok(false) => {}
                    Err(reason) => reject(coord, reason, out_events),
                }
            }
            if !changed.is_empty() {
                world.revision = world.revision.saturating_add(1);
                out_events.push(Event::TilesChanged {
                    coords: changed.into_iter().collect(),
                });
            }
        }
        Command::InstallOverlay { coord, overlay } => {
            if world.index(coord).is_none() {
                reject(coord, EditError::OutOfBounds, out_events);
                return;
            }
            if world.overlays.insert(coord, overlay) == Some(overlay) {
                return;
            }
            world.revision = world.revision.saturating_add(1);
            out_events.push(Event::TilesChanged {
                coords: vec![coord],
            });
        }
        Command::RemoveOverlay { coord } => {
            if world.overlays.remove(&coord).is_some() {
                world.revision = world.revision.saturating_add(1);
                out_events.push(Event::TilesChanged {
                    coords: vec![coord],
                });
            }
        }
    }
}

fn reject(coord: TileCoord, reason: EditError, out_events: &mut Vec<Event>) {
    debug!(?coord, ?reason, "terrain edit rejected");
    out_events.push(Event::EditRejected { coord, reason });
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use delve_core::{FloorOverlay, TerrainView, TileCoord, TileType};

    use super::World;

    /// Captures a read-only view of the terrain for the scheduling systems.
    #[must_use]
    pub fn terrain_view(world: &World) -> TerrainView<'_> {
        TerrainView::new(&world.tiles, &world.overlays, world.width, world.height)
    }

    /// Provides the dimensions of the grid as `(width, height)`.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        (world.width, world.height)
    }

    /// Tile type stored at the coordinate, if it lies inside the grid.
    #[must_use]
    pub fn tile_at(world: &World, coord: TileCoord) -> Option<TileType> {
        world.index(coord).map(|index| world.tiles[index])
    }

    /// Floor overlay installed at the coordinate, if any.
    #[must_use]
    pub fn overlay_at(world: &World, coord: TileCoord) -> Option<FloorOverlay> {
        world.overlays.get(&coord).copied()
    }

    /// Number of accepted edit batches applied since the grid was configured.
    #[must_use]
    pub fn revision(world: &World) -> u64 {
        world.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_configures_grid() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::ConfigureGrid {
                width: 12,
                height: 8,
            },
            &mut events,
        );

        assert_eq!(query::dimensions(&world), (12, 8));
        assert_eq!(
            events,
            vec![Event::GridConfigured {
                width: 12,
                height: 8
            }]
        );
        assert_eq!(query::tile_at(&world, TileCoord::new(11, 7)), Some(TileType::AIR));
        assert_eq!(query::tile_at(&world, TileCoord::new(12, 7)), None);
    }

    #[test]
    fn unchanged_tile_emits_nothing() {
        let mut world = World::with_dimensions(4, 4);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SetTile {
                coord: TileCoord::new(1, 1),
                tile: TileType::AIR,
            },
            &mut events,
        );

        assert!(events.is_empty());
        assert_eq!(query::revision(&world), 0);
    }

    #[test]
    fn batched_edits_report_one_sorted_change_set() {
        let mut world = World::with_dimensions(4, 4);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SetTiles {
                edits: vec![
                    (TileCoord::new(3, 0), TileType::ROCK),
                    (TileCoord::new(0, 0), TileType::ROCK),
                    (TileCoord::new(9, 0), TileType::ROCK),
                    (TileCoord::new(3, 0), TileType::ROCK),
                ],
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::EditRejected {
                    coord: TileCoord::new(9, 0),
                    reason: EditError::OutOfBounds,
                },
                Event::TilesChanged {
                    coords: vec![TileCoord::new(0, 0), TileCoord::new(3, 0)],
                },
            ]
        );
        assert_eq!(query::revision(&world), 1);
    }

    #[test]
    fn overlays_are_installed_and_removed() {
        let mut world = World::with_dimensions(4, 4);
        let mut events = Vec::new();
        let coord = TileCoord::new(2, 1);

        apply(
            &mut world,
            Command::InstallOverlay {
                coord,
                overlay: FloorOverlay::ladder(),
            },
            &mut events,
        );
        assert_eq!(query::overlay_at(&world, coord), Some(FloorOverlay::ladder()));
        assert!(query::terrain_view(&world).is_ladder(coord));

        apply(&mut world, Command::RemoveOverlay { coord }, &mut events);
        apply(&mut world, Command::RemoveOverlay { coord }, &mut events);

        assert_eq!(query::overlay_at(&world, coord), None);
        assert_eq!(
            events,
            vec![
                Event::TilesChanged {
                    coords: vec![coord]
                },
                Event::TilesChanged {
                    coords: vec![coord]
                },
            ]
        );
    }

    #[test]
    fn overlay_outside_grid_is_rejected() {
        let mut world = World::with_dimensions(2, 2);
        let mut events = Vec::new();
        let coord = TileCoord::new(-1, 0);

        apply(
            &mut world,
            Command::InstallOverlay {
                coord,
                overlay: FloorOverlay::platform(),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::EditRejected {
                coord,
                reason: EditError::OutOfBounds,
            }]
        );
        assert_eq!(query::overlay_at(&world, coord), None);
    }
}
