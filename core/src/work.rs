//! Capability contract implemented by every kind of work target.

use std::{fmt, time::Duration};

use crate::{AgentId, Command, TerrainView, TileCoord, WorkType};

/// Something an agent can be sent to work on.
///
/// Schedulers never inspect the concrete target kind; they only read the
/// position and availability and forward lifecycle notifications. Completion
/// hooks describe their effect on the terrain as [`Command`]s rather than
/// mutating the world directly.
pub trait WorkTarget: fmt::Debug {
    /// Tile the agent must be in range of to perform the work.
    fn work_position(&self) -> TileCoord;

    /// Category of work performed on the target.
    fn work_type(&self) -> WorkType;

    /// Time an agent spends working before the target completes.
    fn work_time(&self) -> Duration;

    /// Reports whether the target can still be worked given current terrain.
    fn is_work_available(&self, terrain: TerrainView<'_>) -> bool;

    /// Finishes the work on behalf of `agent`, emitting any terrain edits.
    fn complete_work(&mut self, agent: AgentId, out: &mut Vec<Command>);

    /// Releases any work-in-progress state held for `agent`.
    fn cancel_work(&mut self, agent: AgentId);
}
