//! Concrete work targets issued by players.

use std::time::Duration;

use delve_core::{
    AgentId, Command, FloorOverlay, TerrainView, TileCoord, TileType, WorkTarget, WorkType,
};
use tracing::trace;

const MINE_TIME: Duration = Duration::from_millis(1_500);
const HARVEST_TIME: Duration = Duration::from_millis(2_000);
const DEMOLISH_TIME: Duration = Duration::from_millis(2_500);
const CONSTRUCT_TIME: Duration = Duration::from_millis(4_000);

/// Solid tile that should be dug out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MiningCell {
    position: TileCoord,
    mined: bool,
}

impl MiningCell {
    /// Creates a mining target for the tile at `position`.
    #[must_use]
    pub const fn new(position: TileCoord) -> Self {
        Self {
            position,
            mined: false,
        }
    }
}

impl WorkTarget for MiningCell {
    fn work_position(&self) -> TileCoord {
        self.position
    }

    fn work_type(&self) -> WorkType {
        WorkType::Mine
    }

    fn work_time(&self) -> Duration {
        MINE_TIME
    }

    fn is_work_available(&self, terrain: TerrainView<'_>) -> bool {
        !self.mined && terrain.in_bounds(self.position) && terrain.is_solid(self.position)
    }

    fn complete_work(&mut self, agent: AgentId, out: &mut Vec<Command>) {
        trace!(?agent, position = ?self.position, "tile mined");
        self.mined = true;
        out.push(Command::SetTile {
            coord: self.position,
            tile: TileType::AIR,
        });
    }

    fn cancel_work(&mut self, agent: AgentId) {
        trace!(?agent, position = ?self.position, "mining abandoned");
    }
}

/// Harvestable object that yields a fixed number of loads.
///
/// Each completion consumes one load; the node stays in the terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HarvestNode {
    position: TileCoord,
    remaining: u32,
}

impl HarvestNode {
    /// Creates a harvest node holding `loads` harvests.
    #[must_use]
    pub const fn new(position: TileCoord, loads: u32) -> Self {
        Self {
            position,
            remaining: loads,
        }
    }

    /// Loads still available.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl WorkTarget for HarvestNode {
    fn work_position(&self) -> TileCoord {
        self.position
    }

    fn work_type(&self) -> WorkType {
        WorkType::Harvest
    }

    fn work_time(&self) -> Duration {
        HARVEST_TIME
    }

    fn is_work_available(&self, terrain: TerrainView<'_>) -> bool {
        self.remaining > 0 && terrain.in_bounds(self.position)
    }

    fn complete_work(&mut self, agent: AgentId, _out: &mut Vec<Command>) {
        self.remaining = self.remaining.saturating_sub(1);
        trace!(?agent, remaining = self.remaining, "harvested");
    }

    fn cancel_work(&mut self, agent: AgentId) {
        trace!(?agent, position = ?self.position, "harvest abandoned");
    }
}

/// Installed floor overlay that should be torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DemolishStructure {
    position: TileCoord,
}

impl DemolishStructure {
    /// Creates a demolition target for the overlay at `position`.
    #[must_use]
    pub const fn new(position: TileCoord) -> Self {
        Self { position }
    }
}

impl WorkTarget for DemolishStructure {
    fn work_position(&self) -> TileCoord {
        self.position
    }

    fn work_type(&self) -> WorkType {
        WorkType::Demolish
    }

    fn work_time(&self) -> Duration {
        DEMOLISH_TIME
    }

    fn is_work_available(&self, terrain: TerrainView<'_>) -> bool {
        terrain.overlay_at(self.position).is_some()
    }

    fn complete_work(&mut self, agent: AgentId, out: &mut Vec<Command>) {
        trace!(?agent, position = ?self.position, "structure demolished");
        out.push(Command::RemoveOverlay {
            coord: self.position,
        });
    }

    fn cancel_work(&mut self, agent: AgentId) {
        trace!(?agent, position = ?self.position, "demolition abandoned");
    }
}

/// Empty tile awaiting a floor overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstructionSite {
    position: TileCoord,
    overlay: FloorOverlay,
    built: bool,
}

impl ConstructionSite {
    /// Creates a site that installs `overlay` at `position` once finished.
    #[must_use]
    pub const fn new(position: TileCoord, overlay: FloorOverlay) -> Self {
        Self {
            position,
            overlay,
            built: false,
        }
    }
}

impl WorkTarget for ConstructionSite {
    fn work_position(&self) -> TileCoord {
        self.position
    }

    fn work_type(&self) -> WorkType {
        WorkType::Construct
    }

    fn work_time(&self) -> Duration {
        CONSTRUCT_TIME
    }

    fn is_work_available(&self, terrain: TerrainView<'_>) -> bool {
        !self.built
            && terrain.in_bounds(self.position)
            && !terrain.is_solid(self.position)
            && terrain.overlay_at(self.position).is_none()
    }

    fn complete_work(&mut self, agent: AgentId, out: &mut Vec<Command>) {
        trace!(?agent, position = ?self.position, "construction finished");
        self.built = true;
        out.push(Command::InstallOverlay {
            coord: self.position,
            overlay: self.overlay,
        });
    }

    fn cancel_work(&mut self, agent: AgentId) {
        trace!(?agent, position = ?self.position, "construction abandoned");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn mining_cell_emits_dig_command_and_becomes_unavailable() {
        let tiles = vec![TileType::ROCK; 4];
        let overlays = BTreeMap::new();
        let view = TerrainView::new(&tiles, &overlays, 2, 2);
        let mut cell = MiningCell::new(TileCoord::new(1, 1));
        assert!(cell.is_work_available(view));

        let mut out = Vec::new();
        cell.complete_work(AgentId::new(1), &mut out);
        assert_eq!(
            out,
            vec![Command::SetTile {
                coord: TileCoord::new(1, 1),
                tile: TileType::AIR,
            }]
        );
        assert!(!cell.is_work_available(view));
    }

    #[test]
    fn mining_cell_requires_solid_tile() {
        let tiles = vec![TileType::AIR; 4];
        let overlays = BTreeMap::new();
        let view = TerrainView::new(&tiles, &overlays, 2, 2);
        assert!(!MiningCell::new(TileCoord::new(0, 0)).is_work_available(view));
        assert!(!MiningCell::new(TileCoord::new(5, 0)).is_work_available(view));
    }

    #[test]
    fn harvest_node_runs_dry() {
        let tiles = vec![TileType::AIR; 4];
        let overlays = BTreeMap::new();
        let view = TerrainView::new(&tiles, &overlays, 2, 2);
        let mut node = HarvestNode::new(TileCoord::new(0, 1), 2);
        let mut out = Vec::new();
        node.complete_work(AgentId::new(1), &mut out);
        assert!(node.is_work_available(view));
        node.complete_work(AgentId::new(1), &mut out);
        assert!(!node.is_work_available(view));
        assert!(out.is_empty());
    }

    #[test]
    fn demolition_and_construction_track_overlays() {
        let tiles = vec![TileType::AIR; 4];
        let mut overlays = BTreeMap::new();
        let spot = TileCoord::new(1, 0);

        let mut site = ConstructionSite::new(spot, FloorOverlay::ladder());
        let demolish = DemolishStructure::new(spot);
        {
            let view = TerrainView::new(&tiles, &overlays, 2, 2);
            assert!(site.is_work_available(view));
            assert!(!demolish.is_work_available(view));
        }

        let mut out = Vec::new();
        site.complete_work(AgentId::new(2), &mut out);
        assert_eq!(
            out,
            vec![Command::InstallOverlay {
                coord: spot,
                overlay: FloorOverlay::ladder(),
            }]
        );
        let _ = overlays.insert(spot, FloorOverlay::ladder());
        let view = TerrainView::new(&tiles, &overlays, 2, 2);
        assert!(!site.is_work_available(view));
        assert!(demolish.is_work_available(view));
    }
}
