//! Task lifecycle guarded by explicit state transitions.

use std::time::Duration;

use delve_core::{AgentId, Command, TaskId, TaskState, TerrainView, TileCoord, WorkTarget, WorkType};
use tracing::debug;

/// Unit of work bound to a single target.
///
/// Every transition returns `false` without touching state when its
/// precondition does not hold.
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    target: Box<dyn WorkTarget>,
    state: TaskState,
    agent: Option<AgentId>,
    priority: u8,
    created_tick: u64,
}

impl Task {
    /// Creates a pending task for `target`.
    #[must_use]
    pub fn new(id: TaskId, target: Box<dyn WorkTarget>, priority: u8, created_tick: u64) -> Self {
        Self {
            id,
            target,
            state: TaskState::Pending,
            agent: None,
            priority,
            created_tick,
        }
    }

    /// Identifier of the task.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Agent bound to the task, if any.
    #[must_use]
    pub const fn assigned_agent(&self) -> Option<AgentId> {
        self.agent
    }

    /// Numeric priority; lower values are more urgent.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        self.priority
    }

    /// Scheduler tick at which the task was created.
    #[must_use]
    pub const fn created_tick(&self) -> u64 {
        self.created_tick
    }

    /// Tile the work is performed on.
    #[must_use]
    pub fn work_position(&self) -> TileCoord {
        self.target.work_position()
    }

    /// Category of work performed.
    #[must_use]
    pub fn work_type(&self) -> WorkType {
        self.target.work_type()
    }

    /// Time the work takes once started.
    #[must_use]
    pub fn work_time(&self) -> Duration {
        self.target.work_time()
    }

    /// Reports whether the task is live and its target can still be worked.
    #[must_use]
    pub fn is_valid(&self, terrain: TerrainView<'_>) -> bool {
        !matches!(self.state, TaskState::Completed | TaskState::Cancelled)
            && self.target.is_work_available(terrain)
    }

    /// Binds `agent` to a pending task.
    pub fn assign(&mut self, agent: AgentId) -> bool {
        if self.state != TaskState::Pending {
            debug!(task = ?self.id, state = ?self.state, ?agent, "assign rejected");
            return false;
        }
        self.state = TaskState::Assigned;
        self.agent = Some(agent);
        true
    }

    /// Marks an assigned task as being worked.
    pub fn start(&mut self) -> bool {
        if self.state != TaskState::Assigned {
            debug!(task = ?self.id, state = ?self.state, "start rejected");
            return false;
        }
        self.state = TaskState::InProgress;
        true
    }

    /// Finishes an in-progress task, running the target's completion hook.
    pub fn complete(&mut self, out: &mut Vec<Command>) -> bool {
        let (TaskState::InProgress, Some(agent)) = (self.state, self.agent) else {
            debug!(task = ?self.id, state = ?self.state, "complete rejected");
            return false;
        };
        self.target.complete_work(agent, out);
        self.state = TaskState::Completed;
        self.agent = None;
        true
    }

    /// Abandons the task permanently.
    pub fn cancel(&mut self) -> bool {
        if matches!(self.state, TaskState::Completed | TaskState::Cancelled) {
            debug!(task = ?self.id, state = ?self.state, "cancel rejected");
            return false;
        }
        if let Some(agent) = self.agent.take() {
            self.target.cancel_work(agent);
        }
        self.state = TaskState::Cancelled;
        true
    }

    /// Returns an assigned or in-progress task to the pending state.
    pub fn unassign(&mut self) -> bool {
        if !matches!(self.state, TaskState::Assigned | TaskState::InProgress) {
            debug!(task = ?self.id, state = ?self.state, "unassign rejected");
            return false;
        }
        if let Some(agent) = self.agent.take() {
            self.target.cancel_work(agent);
        }
        self.state = TaskState::Pending;
        true
    }
}
