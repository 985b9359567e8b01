#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Delve work scheduler.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative grid world, and pure systems. Adapters submit [`Command`]
//! values describing terrain mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems read the terrain exclusively through
//! [`TerrainView`] and report their own outcomes as further events.

mod terrain;
mod work;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use terrain::TerrainView;
pub use work::WorkTarget;

/// Number of tiles an agent occupies, measured upward from its foot tile.
pub const AGENT_HEIGHT: i32 = 2;

/// Side length of a reachability chunk measured in tiles.
pub const CHUNK_SIZE: i32 = 16;

/// Commands that express all permissible terrain mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the grid with an empty one of the provided dimensions.
    ConfigureGrid {
        /// Number of tile columns in the grid.
        width: u32,
        /// Number of tile rows in the grid.
        height: u32,
    },
    /// Overwrites the tile type stored at a single coordinate.
    SetTile {
        /// Coordinate of the edited tile.
        coord: TileCoord,
        /// Tile type written to the coordinate.
        tile: TileType,
    },
    /// Overwrites several tiles and reports them as one change batch.
    SetTiles {
        /// Coordinate and tile type pairs applied in order.
        edits: Vec<(TileCoord, TileType)>,
    },
    /// Installs a floor overlay, replacing any overlay already present.
    InstallOverlay {
        /// Coordinate receiving the overlay.
        coord: TileCoord,
        /// Overlay flags applied to the coordinate.
        overlay: FloorOverlay,
    },
    /// Removes the floor overlay stored at a coordinate, if any.
    RemoveOverlay {
        /// Coordinate whose overlay should be removed.
        coord: TileCoord,
    },
}

/// Events broadcast by the world and the scheduling systems.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces that the grid was replaced with new dimensions.
    GridConfigured {
        /// Number of tile columns in the new grid.
        width: u32,
        /// Number of tile rows in the new grid.
        height: u32,
    },
    /// Reports a batch of coordinates whose tile type or overlay changed.
    TilesChanged {
        /// Coordinates touched by the batch, sorted and deduplicated.
        coords: Vec<TileCoord>,
    },
    /// Reports that a terrain edit was rejected by the world.
    EditRejected {
        /// Coordinate targeted by the rejected edit.
        coord: TileCoord,
        /// Specific reason the edit failed.
        reason: EditError,
    },
    /// Announces that a reachability chunk was rebuilt from current terrain.
    ChunkInvalidated {
        /// Chunk whose standability cache was rebuilt.
        chunk: ChunkCoord,
    },
    /// Confirms that an agent finished a task.
    TaskCompleted {
        /// Order that owns the task.
        order: OrderId,
        /// Task that transitioned to completed.
        task: TaskId,
        /// Agent credited with the completion.
        agent: AgentId,
    },
    /// Confirms that a task was cancelled and will never be worked.
    TaskCancelled {
        /// Order that owned the task.
        order: OrderId,
        /// Task that transitioned to cancelled.
        task: TaskId,
    },
    /// Announces that an order has no pending or assigned tasks left.
    AllTasksCompleted {
        /// Order that finished.
        order: OrderId,
    },
    /// Reports that the task bound to an agent changed.
    JobChanged {
        /// Agent whose binding changed.
        agent: AgentId,
        /// Task the agent held before the change, if any.
        previous: Option<TaskId>,
        /// Task the agent holds after the change, if any.
        current: Option<TaskId>,
    },
}

/// Location of a single tile expressed as column and row, with rows growing upward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    x: i32,
    y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the tile.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the tile; larger values are higher up.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the coordinate displaced by the provided offsets.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Tile directly beneath this one.
    #[must_use]
    pub const fn below(self) -> Self {
        self.offset(0, -1)
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Computes the Chebyshev (king-move) distance between two tile coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Chunk that contains the tile.
    #[must_use]
    pub const fn chunk(self) -> ChunkCoord {
        ChunkCoord::new(
            self.x.div_euclid(CHUNK_SIZE),
            self.y.div_euclid(CHUNK_SIZE),
        )
    }
}

/// Location of a reachability chunk measured in whole chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    x: i32,
    y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk column.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Chunk row.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Lower-left tile covered by the chunk.
    #[must_use]
    pub const fn origin(&self) -> TileCoord {
        TileCoord::new(self.x * CHUNK_SIZE, self.y * CHUNK_SIZE)
    }

    /// Reports whether the chunk covers the provided tile.
    #[must_use]
    pub fn contains(&self, tile: TileCoord) -> bool {
        tile.chunk() == *self
    }
}

/// Integer tile type code; zero is air and every other value is solid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileType(u16);

impl TileType {
    /// Empty tile that agents can occupy.
    pub const AIR: Self = Self(0);
    /// Generic diggable rock.
    pub const ROCK: Self = Self(1);

    /// Creates a tile type from its raw code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Raw tile code.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }

    /// Reports whether the tile blocks movement on its own.
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        self.0 != 0
    }
}

/// Installed floor element such as a ladder or platform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloorOverlay {
    passable: bool,
    allows_vertical: bool,
    speed_multiplier: f32,
}

impl FloorOverlay {
    /// Creates an overlay from explicit flags.
    #[must_use]
    pub const fn new(passable: bool, allows_vertical: bool, speed_multiplier: f32) -> Self {
        Self {
            passable,
            allows_vertical,
            speed_multiplier,
        }
    }

    /// Walkable platform that provides footing but no climbing.
    #[must_use]
    pub const fn platform() -> Self {
        Self::new(true, false, 1.0)
    }

    /// Ladder that provides footing and allows single-tile vertical moves.
    #[must_use]
    pub const fn ladder() -> Self {
        Self::new(true, true, 1.0)
    }

    /// Returns a copy of the overlay with a different speed multiplier.
    #[must_use]
    pub const fn with_speed_multiplier(self, speed_multiplier: f32) -> Self {
        Self {
            speed_multiplier,
            ..self
        }
    }

    /// Whether agents can occupy the overlay's tile.
    #[must_use]
    pub const fn passable(&self) -> bool {
        self.passable
    }

    /// Whether the overlay supports pure vertical moves.
    #[must_use]
    pub const fn allows_vertical(&self) -> bool {
        self.allows_vertical
    }

    /// Movement speed factor applied when entering the overlay's tile.
    #[must_use]
    pub const fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }
}

/// Unique identifier assigned to an agent by its owning collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a work order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(u32);

impl OrderId {
    /// Creates a new order identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a task, scoped to the order that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId {
    order: OrderId,
    sequence: u32,
}

impl TaskId {
    /// Creates a task identifier from its owning order and sequence number.
    #[must_use]
    pub const fn new(order: OrderId, sequence: u32) -> Self {
        Self { order, sequence }
    }

    /// Order that owns the task.
    #[must_use]
    pub const fn order(&self) -> OrderId {
        self.order
    }

    /// Position of the task in its order's creation sequence.
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }
}

/// Kinds of work an order can ask agents to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkType {
    /// Dig out a solid tile.
    Mine,
    /// Gather from a harvestable object.
    Harvest,
    /// Tear down an installed structure.
    Demolish,
    /// Finish a construction site.
    Construct,
}

/// Lifecycle state of a single task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Waiting in the queue for an agent.
    Pending,
    /// Bound to an agent that has not started working yet.
    Assigned,
    /// Being worked by its agent.
    InProgress,
    /// Finished; the target's completion hook has run.
    Completed,
    /// Abandoned permanently.
    Cancelled,
}

/// Reasons a terrain edit may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditError {
    /// The coordinate lies outside the configured grid.
    OutOfBounds,
}

/// Reasons an agent cannot be bound to an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum AssignmentError {
    /// No order with the provided identifier exists.
    #[error("order {0:?} does not exist")]
    UnknownOrder(OrderId),
    /// The order was cancelled or finished.
    #[error("order {0:?} is no longer active")]
    OrderInactive(OrderId),
    /// The order is paused and accepts no workers.
    #[error("order {0:?} is paused")]
    OrderPaused(OrderId),
    /// The order already employs its maximum number of agents.
    #[error("order {0:?} already employs its maximum number of agents")]
    OrderAtCapacity(OrderId),
    /// The agent never reported a foot position.
    #[error("agent {0:?} has not reported a position")]
    UnknownAgentPosition(AgentId),
}

#[cfg(test)]
mod tests {
    use super::{AgentId, ChunkCoord, FloorOverlay, OrderId, TaskId, TileCoord, TileType};
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = TileCoord::new(1, 1);
        let destination = TileCoord::new(4, -1);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
        assert_eq!(origin.chebyshev_distance(destination), 3);
    }

    #[test]
    fn chunk_of_tile_uses_floor_division() {
        assert_eq!(TileCoord::new(0, 0).chunk(), ChunkCoord::new(0, 0));
        assert_eq!(TileCoord::new(15, 16).chunk(), ChunkCoord::new(0, 1));
        assert_eq!(TileCoord::new(-1, 31).chunk(), ChunkCoord::new(-1, 1));
        assert!(ChunkCoord::new(2, 3).contains(TileCoord::new(40, 63)));
        assert_eq!(ChunkCoord::new(2, 3).origin(), TileCoord::new(32, 48));
    }

    #[test]
    fn only_air_is_not_solid() {
        assert!(!TileType::AIR.is_solid());
        assert!(TileType::ROCK.is_solid());
        assert!(TileType::new(7).is_solid());
    }

    #[test]
    fn ladder_allows_vertical_moves_but_platform_does_not() {
        assert!(FloorOverlay::ladder().allows_vertical());
        assert!(!FloorOverlay::platform().allows_vertical());
        let slow = FloorOverlay::platform().with_speed_multiplier(0.5);
        assert!((slow.speed_multiplier() - 0.5).abs() < f32::EPSILON);
        assert!(slow.passable());
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn identifiers_round_trip_through_bincode() {
        assert_round_trip(&AgentId::new(3));
        assert_round_trip(&TaskId::new(OrderId::new(4), 9));
        assert_round_trip(&TileCoord::new(-2, 40));
    }
}
