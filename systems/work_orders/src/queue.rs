//! Pending/assigned/completed task lists and the nearest-work assignment rule.

use delve_core::{AgentId, Command, TaskId, TerrainView};
use delve_system_pathfinding::Pathfinder;
use delve_system_reachability::ReachabilityMap;
use delve_system_task_selector::{is_standing_on, Access, AgentContext, TaskCandidate, TaskSelector};
use tracing::debug;

use crate::Task;

/// Read access to the terrain caches plus the search scratch space used
/// while matching agents to tasks.
#[derive(Debug)]
pub struct WorkContext<'a> {
    /// Current terrain.
    pub terrain: TerrainView<'a>,
    /// Standability cache built from `terrain`.
    pub reachability: &'a ReachabilityMap,
    /// Pathfinder used to confirm a work position can be walked to.
    pub pathfinder: &'a mut Pathfinder,
    /// Scoring policy providing work-position probing.
    pub selector: &'a TaskSelector,
}

impl WorkContext<'_> {
    fn access(&mut self, agent: &AgentContext, task: &Task) -> Access {
        self.selector.probe_access(
            self.terrain,
            self.reachability,
            self.pathfinder,
            agent,
            task.work_position(),
        )
    }
}

/// Ordering key for queue assignment; smaller keys win.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Rank {
    standing_on_target: bool,
    must_move: bool,
    priority: u8,
    distance: u32,
    task: TaskId,
}

/// Task lists of a single work order.
///
/// Pending tasks are kept sorted by identifier so iteration order is stable.
#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: Vec<Task>,
    assigned: Vec<Task>,
    completed: Vec<Task>,
}

impl TaskQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly created pending task.
    pub fn push(&mut self, task: Task) {
        self.insert_pending(task);
    }

    /// Number of tasks waiting for an agent.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of tasks bound to an agent.
    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }

    /// Number of finished tasks.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Pending tasks in identifier order.
    pub fn pending(&self) -> impl Iterator<Item = &Task> + '_ {
        self.pending.iter()
    }

    /// Tasks currently bound to agents.
    pub fn assigned(&self) -> impl Iterator<Item = &Task> + '_ {
        self.assigned.iter()
    }

    /// Looks up a task in any list.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.pending
            .iter()
            .chain(&self.assigned)
            .chain(&self.completed)
            .find(|task| task.id() == id)
    }

    /// Task currently bound to `agent`, if any.
    #[must_use]
    pub fn task_for_agent(&self, agent: AgentId) -> Option<&Task> {
        self.assigned
            .iter()
            .find(|task| task.assigned_agent() == Some(agent))
    }

    /// Reports whether any pending task can still be worked.
    #[must_use]
    pub fn has_available(&self, terrain: TerrainView<'_>) -> bool {
        self.pending.iter().any(|task| task.is_valid(terrain))
    }

    /// Scoring inputs for every valid pending task.
    #[must_use]
    pub fn candidates(&self, terrain: TerrainView<'_>) -> Vec<TaskCandidate> {
        self.pending
            .iter()
            .filter(|task| task.is_valid(terrain))
            .map(|task| TaskCandidate {
                task: task.id(),
                target: task.work_position(),
                priority: task.priority(),
            })
            .collect()
    }

    /// Assigns the most suitable pending task to `agent`.
    ///
    /// Tasks the agent can neither work in place nor walk to stay pending.
    /// Among the rest, tasks that would dig out the agent's footing go last,
    /// then in-place work beats walking, then lower priority values, shorter
    /// distances and lower identifiers win.
    pub fn assign_next_task(
        &mut self,
        agent: &AgentContext,
        context: &mut WorkContext<'_>,
    ) -> Option<TaskId> {
        let mut best: Option<Rank> = None;
        for task in &self.pending {
            if !task.is_valid(context.terrain) {
                continue;
            }
            let target = task.work_position();
            let must_move = match context.access(agent, task) {
                Access::Here => false,
                Access::Reachable { .. } => true,
                Access::Unreachable => continue,
            };
            let rank = Rank {
                standing_on_target: is_standing_on(agent.foot, target),
                must_move,
                priority: task.priority(),
                distance: agent.foot.manhattan_distance(target),
                task: task.id(),
            };
            if best.map_or(true, |current| rank < current) {
                best = Some(rank);
            }
        }

        let chosen = best?.task;
        if self.assign_task(agent.agent, chosen) {
            Some(chosen)
        } else {
            None
        }
    }

    /// Assigns a specific pending task to `agent`.
    pub fn assign_task(&mut self, agent: AgentId, id: TaskId) -> bool {
        let Some(index) = self.pending.iter().position(|task| task.id() == id) else {
            debug!(task = ?id, ?agent, "task is not pending");
            return false;
        };
        if !self.pending[index].assign(agent) {
            return false;
        }
        let task = self.pending.remove(index);
        self.assigned.push(task);
        true
    }

    /// Marks an assigned task as being worked.
    pub fn start(&mut self, id: TaskId) -> bool {
        self.assigned
            .iter_mut()
            .find(|task| task.id() == id)
            .map_or(false, Task::start)
    }

    /// Completes an in-progress task and moves it to the completed list.
    pub fn complete(&mut self, id: TaskId, out: &mut Vec<Command>) -> bool {
        let Some(index) = self.assigned.iter().position(|task| task.id() == id) else {
            debug!(task = ?id, "task is not assigned");
            return false;
        };
        if !self.assigned[index].complete(out) {
            return false;
        }
        let task = self.assigned.remove(index);
        self.completed.push(task);
        true
    }

    /// Returns an assigned task to the pending list.
    pub fn unassign(&mut self, id: TaskId) -> bool {
        let Some(index) = self.assigned.iter().position(|task| task.id() == id) else {
            debug!(task = ?id, "task is not assigned");
            return false;
        };
        if !self.assigned[index].unassign() {
            return false;
        }
        let task = self.assigned.remove(index);
        self.insert_pending(task);
        true
    }

    /// Returns every assigned task to the pending list, reporting the agents
    /// that were released.
    pub fn unassign_all(&mut self) -> Vec<(AgentId, TaskId)> {
        let mut released = Vec::new();
        for mut task in std::mem::take(&mut self.assigned) {
            let agent = task.assigned_agent();
            if task.unassign() {
                if let Some(agent) = agent {
                    released.push((agent, task.id()));
                }
            }
            self.insert_pending(task);
        }
        released
    }

    /// Cancels and drops pending tasks whose targets can no longer be worked.
    pub fn cleanup_invalid(&mut self, terrain: TerrainView<'_>) -> Vec<TaskId> {
        let mut removed = Vec::new();
        self.pending.retain_mut(|task| {
            if task.is_valid(terrain) {
                return true;
            }
            if task.cancel() {
                removed.push(task.id());
            }
            false
        });
        removed
    }

    fn insert_pending(&mut self, task: Task) {
        let index = self
            .pending
            .partition_point(|existing| existing.id() < task.id());
        self.pending.insert(index, task);
    }
}
