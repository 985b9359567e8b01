//! Read-only terrain access shared by every scheduling system.

use std::collections::BTreeMap;

use crate::{FloorOverlay, TileCoord, TileType, AGENT_HEIGHT};

/// Read-only view into the tile array and floor-overlay map.
///
/// Coordinates outside the grid read as solid rock: they never count as clear
/// space, but the bottom edge of the world still provides footing.
#[derive(Clone, Copy, Debug)]
pub struct TerrainView<'a> {
    tiles: &'a [TileType],
    overlays: &'a BTreeMap<TileCoord, FloorOverlay>,
    width: u32,
    height: u32,
}

impl<'a> TerrainView<'a> {
    /// Captures a new terrain view backed by row-major tiles and an overlay map.
    #[must_use]
    pub fn new(
        tiles: &'a [TileType],
        overlays: &'a BTreeMap<TileCoord, FloorOverlay>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            tiles,
            overlays,
            width,
            height,
        }
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, pos: TileCoord) -> bool {
        self.index(pos).is_some()
    }

    /// Tile type stored at the coordinate, if it lies inside the grid.
    #[must_use]
    pub fn tile_at(&self, pos: TileCoord) -> Option<TileType> {
        self.index(pos)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Floor overlay installed at the coordinate, if any.
    #[must_use]
    pub fn overlay_at(&self, pos: TileCoord) -> Option<FloorOverlay> {
        self.overlays.get(&pos).copied()
    }

    /// Reports whether the tile is solid; coordinates outside the grid are solid.
    #[must_use]
    pub fn is_solid(&self, pos: TileCoord) -> bool {
        self.tile_at(pos).map_or(true, |tile| tile.is_solid())
    }

    /// Reports whether an agent body may occupy the tile.
    #[must_use]
    pub fn is_clear(&self, pos: TileCoord) -> bool {
        let Some(tile) = self.tile_at(pos) else {
            return false;
        };
        !tile.is_solid() || self.overlay_at(pos).is_some_and(|overlay| overlay.passable())
    }

    /// Reports whether the whole agent column anchored at `pos` is clear.
    #[must_use]
    pub fn footprint_clear(&self, pos: TileCoord) -> bool {
        (0..AGENT_HEIGHT).all(|offset| self.is_clear(pos.offset(0, offset)))
    }

    /// Reports whether the tile beneath `pos` is solid or carries an overlay.
    #[must_use]
    pub fn has_footing(&self, pos: TileCoord) -> bool {
        let below = pos.below();
        self.is_solid(below) || self.overlay_at(below).is_some()
    }

    /// Reports whether the tile carries an overlay that supports climbing.
    #[must_use]
    pub fn is_ladder(&self, pos: TileCoord) -> bool {
        self.overlay_at(pos)
            .is_some_and(|overlay| overlay.allows_vertical())
    }

    /// Reports whether an agent can stand with its foot at `pos`.
    ///
    /// The footprint must be clear and the agent must either have footing
    /// beneath it or be holding on to a ladder.
    #[must_use]
    pub fn can_stand_at(&self, pos: TileCoord) -> bool {
        self.footprint_clear(pos) && (self.has_footing(pos) || self.is_ladder(pos))
    }

    /// Movement speed factor applied when entering the tile.
    #[must_use]
    pub fn speed_multiplier(&self, pos: TileCoord) -> f32 {
        match self.overlay_at(pos) {
            Some(overlay) if overlay.speed_multiplier() > 0.0 => overlay.speed_multiplier(),
            _ => 1.0,
        }
    }

    fn index(&self, pos: TileCoord) -> Option<usize> {
        let x = u32::try_from(pos.x()).ok()?;
        let y = u32::try_from(pos.y()).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let row = usize::try_from(y).ok()?;
        let column = usize::try_from(x).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: u32, height: u32, solid: &[(i32, i32)]) -> Vec<TileType> {
        let mut tiles = vec![TileType::AIR; (width * height) as usize];
        for &(x, y) in solid {
            tiles[(y as u32 * width + x as u32) as usize] = TileType::ROCK;
        }
        tiles
    }

    #[test]
    fn agent_stands_on_solid_ground_with_clear_headroom() {
        let tiles = grid(4, 4, &[(0, 0), (1, 0), (2, 0), (3, 0), (1, 2)]);
        let overlays = BTreeMap::new();
        let view = TerrainView::new(&tiles, &overlays, 4, 4);

        assert!(view.can_stand_at(TileCoord::new(0, 1)));
        assert!(!view.can_stand_at(TileCoord::new(1, 1)), "head blocked");
        assert!(!view.can_stand_at(TileCoord::new(0, 2)), "no footing");
        assert!(!view.can_stand_at(TileCoord::new(0, 3)), "head leaves grid");
    }

    #[test]
    fn bottom_edge_provides_footing() {
        let tiles = grid(2, 3, &[]);
        let overlays = BTreeMap::new();
        let view = TerrainView::new(&tiles, &overlays, 2, 3);

        assert!(view.is_solid(TileCoord::new(0, -1)));
        assert!(view.can_stand_at(TileCoord::new(0, 0)));
    }

    #[test]
    fn ladder_lets_agent_hang_without_footing() {
        let tiles = grid(3, 6, &[(0, 0), (1, 0), (2, 0)]);
        let mut overlays = BTreeMap::new();
        let _ = overlays.insert(TileCoord::new(1, 1), FloorOverlay::ladder());
        let _ = overlays.insert(TileCoord::new(1, 2), FloorOverlay::ladder());
        let view = TerrainView::new(&tiles, &overlays, 3, 6);

        assert!(view.can_stand_at(TileCoord::new(1, 2)));
        assert!(view.can_stand_at(TileCoord::new(1, 3)), "ladder top gives footing");
        assert!(!view.can_stand_at(TileCoord::new(1, 4)));
    }

    #[test]
    fn passable_overlay_clears_solid_tile() {
        let tiles = grid(2, 2, &[(0, 1)]);
        let mut overlays = BTreeMap::new();
        let _ = overlays.insert(
            TileCoord::new(0, 1),
            FloorOverlay::platform().with_speed_multiplier(2.0),
        );
        let view = TerrainView::new(&tiles, &overlays, 2, 2);

        assert!(view.is_clear(TileCoord::new(0, 1)));
        assert!((view.speed_multiplier(TileCoord::new(0, 1)) - 2.0).abs() < f32::EPSILON);
        assert!((view.speed_multiplier(TileCoord::new(1, 1)) - 1.0).abs() < f32::EPSILON);
    }
}
