//! Work orders and the book that allocates their identifiers.

use std::collections::{BTreeMap, BTreeSet};

use delve_core::{
    AgentId, AssignmentError, Command, OrderId, TaskId, TerrainView, WorkTarget, WorkType,
};
use delve_system_task_selector::{AgentContext, TaskCandidate};
use tracing::{debug, info};

use crate::{Task, TaskQueue, WorkContext};

/// Player-issued batch of tasks sharing a work type and worker limit.
///
/// Agents become employees of an order through [`WorkOrder::employ`]; an
/// employee holds at most one of the order's tasks at a time.
#[derive(Debug)]
pub struct WorkOrder {
    id: OrderId,
    name: String,
    work_type: WorkType,
    priority: u8,
    max_concurrent_agents: usize,
    queue: TaskQueue,
    employees: BTreeSet<AgentId>,
    active: bool,
    paused: bool,
    next_sequence: u32,
}

impl WorkOrder {
    /// Creates an empty, active order.
    #[must_use]
    pub fn new(
        id: OrderId,
        name: impl Into<String>,
        work_type: WorkType,
        max_concurrent_agents: usize,
        priority: u8,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            work_type,
            priority,
            max_concurrent_agents,
            queue: TaskQueue::new(),
            employees: BTreeSet::new(),
            active: true,
            paused: false,
            next_sequence: 0,
        }
    }

    /// Identifier of the order.
    #[must_use]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Display name given by the issuer.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of work the order performs.
    #[must_use]
    pub const fn work_type(&self) -> WorkType {
        self.work_type
    }

    /// Priority inherited by tasks added without an explicit one.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        self.priority
    }

    /// Maximum number of employees.
    #[must_use]
    pub const fn max_concurrent_agents(&self) -> usize {
        self.max_concurrent_agents
    }

    /// Reports whether the order has not been cancelled.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Reports whether the order is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Task lists of the order.
    #[must_use]
    pub const fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Agents currently employed by the order.
    pub fn employees(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.employees.iter().copied()
    }

    /// Reports whether `agent` is employed by the order.
    #[must_use]
    pub fn employs(&self, agent: AgentId) -> bool {
        self.employees.contains(&agent)
    }

    /// Looks up a task owned by the order.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.queue.task(id)
    }

    /// Number of tasks waiting for an agent.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.pending_count()
    }

    /// Number of tasks bound to an agent.
    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.queue.assigned_count()
    }

    /// Number of finished tasks.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.queue.completed_count()
    }

    /// Adds a task for `target` at the order's priority.
    pub fn add_target(&mut self, target: Box<dyn WorkTarget>, created_tick: u64) -> Option<TaskId> {
        self.add_target_with_priority(target, self.priority, created_tick)
    }

    /// Adds a task for `target` with an explicit priority.
    ///
    /// Cancelled orders accept no further targets.
    pub fn add_target_with_priority(
        &mut self,
        target: Box<dyn WorkTarget>,
        priority: u8,
        created_tick: u64,
    ) -> Option<TaskId> {
        if !self.active {
            debug!(order = ?self.id, "target rejected by inactive order");
            return None;
        }
        let id = TaskId::new(self.id, self.next_sequence);
        self.next_sequence += 1;
        self.queue.push(Task::new(id, target, priority, created_tick));
        Some(id)
    }

    /// Reports whether one more agent could join and find work.
    #[must_use]
    pub fn can_assign_worker(&self, terrain: TerrainView<'_>) -> bool {
        self.active
            && !self.paused
            && self.employees.len() < self.max_concurrent_agents
            && self.queue.has_available(terrain)
    }

    /// Checks whether `agent` may join without changing any state.
    pub fn check_admission(&self, agent: AgentId) -> Result<(), AssignmentError> {
        if !self.active {
            return Err(AssignmentError::OrderInactive(self.id));
        }
        if self.paused {
            return Err(AssignmentError::OrderPaused(self.id));
        }
        if !self.employs(agent) && self.employees.len() >= self.max_concurrent_agents {
            return Err(AssignmentError::OrderAtCapacity(self.id));
        }
        Ok(())
    }

    /// Adds `agent` to the order's employees.
    pub fn employ(&mut self, agent: AgentId) -> Result<(), AssignmentError> {
        self.check_admission(agent)?;
        let _ = self.employees.insert(agent);
        Ok(())
    }

    /// Removes `agent` from the employees, returning its task to the queue.
    pub fn release(&mut self, agent: AgentId) -> Option<TaskId> {
        let _ = self.employees.remove(&agent);
        let task = self.queue.task_for_agent(agent).map(Task::id)?;
        if self.queue.unassign(task) {
            Some(task)
        } else {
            None
        }
    }

    /// Assigns the queue's preferred task to an idle employee.
    pub fn assign_next_task(
        &mut self,
        agent: &AgentContext,
        context: &mut WorkContext<'_>,
    ) -> Option<TaskId> {
        if !self.accepts_work(agent.agent) {
            return None;
        }
        self.queue.assign_next_task(agent, context)
    }

    /// Assigns a specific pending task to an idle employee.
    pub fn assign_task(&mut self, agent: AgentId, task: TaskId) -> bool {
        self.accepts_work(agent) && self.queue.assign_task(agent, task)
    }

    /// Marks an assigned task as being worked.
    pub fn start_task(&mut self, task: TaskId) -> bool {
        self.queue.start(task)
    }

    /// Completes an in-progress task, collecting the target's terrain edits.
    pub fn complete_task(&mut self, task: TaskId, out: &mut Vec<Command>) -> bool {
        self.queue.complete(task, out)
    }

    /// Returns an assigned task to the pending list.
    pub fn unassign_task(&mut self, task: TaskId) -> bool {
        self.queue.unassign(task)
    }

    /// Unassigns every employee's task without cancelling anything.
    ///
    /// Employees stay with the order and pick work up again after
    /// [`WorkOrder::resume`].
    pub fn pause(&mut self) -> Vec<(AgentId, TaskId)> {
        if !self.active || self.paused {
            return Vec::new();
        }
        self.paused = true;
        debug!(order = ?self.id, "order paused");
        self.queue.unassign_all()
    }

    /// Lifts a pause.
    pub fn resume(&mut self) -> bool {
        if !self.active || !self.paused {
            return false;
        }
        self.paused = false;
        debug!(order = ?self.id, "order resumed");
        true
    }

    /// Deactivates the order, unassigning every task and dismissing every
    /// employee. Returns the dismissed agents with the task each was holding.
    pub fn cancel(&mut self) -> Vec<(AgentId, Option<TaskId>)> {
        if !self.active {
            return Vec::new();
        }
        self.active = false;
        let released: BTreeMap<AgentId, TaskId> = self.queue.unassign_all().into_iter().collect();
        let dismissed = std::mem::take(&mut self.employees)
            .into_iter()
            .map(|agent| (agent, released.get(&agent).copied()))
            .collect();
        info!(order = ?self.id, name = %self.name, "order cancelled");
        dismissed
    }

    /// Reports whether every task added to the order has been finished or
    /// discarded.
    #[must_use]
    pub fn is_fully_completed(&self) -> bool {
        self.next_sequence > 0
            && self.queue.pending_count() == 0
            && self.queue.assigned_count() == 0
    }

    /// Cancels pending tasks whose targets can no longer be worked.
    pub fn cleanup_invalid_tasks(&mut self, terrain: TerrainView<'_>) -> Vec<TaskId> {
        let removed = self.queue.cleanup_invalid(terrain);
        if !removed.is_empty() {
            debug!(order = ?self.id, removed = removed.len(), "discarded stale tasks");
        }
        removed
    }

    /// Scoring inputs for every valid pending task.
    #[must_use]
    pub fn candidates(&self, terrain: TerrainView<'_>) -> Vec<TaskCandidate> {
        self.queue.candidates(terrain)
    }

    fn accepts_work(&self, agent: AgentId) -> bool {
        if !self.active || self.paused || !self.employs(agent) {
            debug!(order = ?self.id, ?agent, "order does not accept work from agent");
            return false;
        }
        if self.queue.task_for_agent(agent).is_some() {
            debug!(order = ?self.id, ?agent, "agent already holds a task");
            return false;
        }
        true
    }
}

/// Owner of every live work order.
///
/// Identifiers are never reused, even after an order is removed.
#[derive(Debug, Default)]
pub struct OrderBook {
    orders: BTreeMap<OrderId, WorkOrder>,
    next_id: u32,
}

impl OrderBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new order and returns its identifier.
    pub fn create_order(
        &mut self,
        name: impl Into<String>,
        work_type: WorkType,
        max_concurrent_agents: usize,
        priority: u8,
    ) -> OrderId {
        let id = OrderId::new(self.next_id);
        self.next_id += 1;
        let order = WorkOrder::new(id, name, work_type, max_concurrent_agents, priority);
        info!(order = ?id, name = %order.name(), ?work_type, "order created");
        let _ = self.orders.insert(id, order);
        id
    }

    /// Looks up a live order.
    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<&WorkOrder> {
        self.orders.get(&id)
    }

    /// Looks up a live order for mutation.
    pub fn get_mut(&mut self, id: OrderId) -> Option<&mut WorkOrder> {
        self.orders.get_mut(&id)
    }

    /// Removes an order from the book.
    pub fn remove(&mut self, id: OrderId) -> Option<WorkOrder> {
        self.orders.remove(&id)
    }

    /// Live orders in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkOrder> + '_ {
        self.orders.values()
    }

    /// Live orders in identifier order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WorkOrder> + '_ {
        self.orders.values_mut()
    }

    /// Order employing `agent`, if any.
    #[must_use]
    pub fn order_of(&self, agent: AgentId) -> Option<OrderId> {
        self.orders
            .values()
            .find(|order| order.employs(agent))
            .map(WorkOrder::id)
    }

    /// Number of live orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Reports whether no orders are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use delve_core::{TaskState, TileCoord, TileType};

    use super::*;
    use crate::MiningCell;

    fn rock_view<'a>(
        tiles: &'a [TileType],
        overlays: &'a BTreeMap<TileCoord, delve_core::FloorOverlay>,
    ) -> TerrainView<'a> {
        TerrainView::new(tiles, overlays, 4, 4)
    }

    #[test]
    fn capacity_pause_and_cancel_gate_admission() {
        let mut order = WorkOrder::new(OrderId::new(3), "quarry", WorkType::Mine, 1, 5);
        assert_eq!(order.employ(AgentId::new(1)), Ok(()));
        assert_eq!(order.employ(AgentId::new(1)), Ok(()));
        assert_eq!(
            order.employ(AgentId::new(2)),
            Err(AssignmentError::OrderAtCapacity(OrderId::new(3)))
        );

        let _ = order.pause();
        assert_eq!(
            order.check_admission(AgentId::new(1)),
            Err(AssignmentError::OrderPaused(OrderId::new(3)))
        );
        assert!(order.resume());
        assert!(!order.resume());

        let dismissed = order.cancel();
        assert_eq!(dismissed, vec![(AgentId::new(1), None)]);
        assert_eq!(
            order.employ(AgentId::new(1)),
            Err(AssignmentError::OrderInactive(OrderId::new(3)))
        );
        assert!(order.add_target(Box::new(MiningCell::new(TileCoord::new(0, 0))), 0).is_none());
    }

    #[test]
    fn completion_requires_empty_pending_and_assigned_lists() {
        let tiles = vec![TileType::ROCK; 16];
        let overlays = BTreeMap::new();
        let terrain = rock_view(&tiles, &overlays);
        let mut order = WorkOrder::new(OrderId::new(0), "shaft", WorkType::Mine, 2, 5);
        assert!(!order.is_fully_completed());

        let agent = AgentId::new(9);
        order.employ(agent).expect("room for agent");
        let task = order
            .add_target(Box::new(MiningCell::new(TileCoord::new(1, 1))), 0)
            .expect("active order");
        assert!(order.can_assign_worker(terrain));
        assert!(!order.is_fully_completed());

        assert!(order.assign_task(agent, task));
        assert!(!order.assign_task(agent, task));
        assert!(!order.is_fully_completed());
        assert!(order.start_task(task));

        let mut commands = Vec::new();
        assert!(order.complete_task(task, &mut commands));
        assert_eq!(commands.len(), 1);
        assert!(order.is_fully_completed());
        assert_eq!(order.completed_count(), 1);
    }

    #[test]
    fn pause_returns_tasks_to_pending_but_keeps_employees() {
        let mut order = WorkOrder::new(OrderId::new(0), "shaft", WorkType::Mine, 2, 5);
        let agent = AgentId::new(4);
        order.employ(agent).expect("room for agent");
        let task = order
            .add_target(Box::new(MiningCell::new(TileCoord::new(1, 1))), 0)
            .expect("active order");
        assert!(order.assign_task(agent, task));

        assert_eq!(order.pause(), vec![(agent, task)]);
        assert!(order.employs(agent));
        assert_eq!(order.task(task).map(Task::state), Some(TaskState::Pending));
        assert!(!order.assign_task(agent, task));
    }

    #[test]
    fn book_never_reuses_identifiers() {
        let mut book = OrderBook::new();
        let first = book.create_order("a", WorkType::Mine, 1, 5);
        let _ = book.remove(first);
        let second = book.create_order("b", WorkType::Mine, 1, 5);
        assert_ne!(first, second);
        assert_eq!(book.len(), 1);
    }
}
