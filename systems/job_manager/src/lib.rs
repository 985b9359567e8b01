#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Orchestration loop binding agents to work orders.
//!
//! The manager owns the order book, the reachability cache, the pathfinder
//! and the scoring policy. Terrain edits arrive as coordinates, are buffered
//! until the next [`JobManager::tick`], and drive a bounded re-evaluation
//! queue of agents whose work might be affected. Within a tick the order of
//! work is fixed: buffered edits reach the cache, dirty chunks are rebuilt,
//! queued agents are re-scored, and only then are idle agents given new work.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use delve_core::{
    AgentId, AssignmentError, Command, Event, OrderId, TaskId, TaskState, TerrainView, TileCoord,
    WorkTarget, WorkType,
};
use delve_system_pathfinding::{Pathfinder, PathfinderConfig, TilePath};
use delve_system_reachability::{ReachabilityConfig, ReachabilityMap};
use delve_system_task_selector::{
    Access, AgentContext, SelectorWeights, TaskCandidate, TaskSelector,
};
use delve_system_work_orders::{OrderBook, WorkContext, WorkOrder};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Tunables for the orchestration loop and the systems it owns.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct JobManagerConfig {
    /// Chebyshev distance within which a terrain edit triggers re-evaluation
    /// of an agent or its task target.
    pub reevaluation_radius: u32,
    /// Factor by which a competing task must outscore the current one before
    /// an agent switches.
    pub hysteresis_margin: f32,
    /// Minimum number of ticks between re-evaluation dispatches.
    pub reevaluation_interval_ticks: u64,
    /// Maximum number of agents re-evaluated per dispatch.
    pub max_reevaluations_per_tick: usize,
    /// Number of buffered edit coordinates before the buffer collapses into
    /// a full-map invalidation.
    pub max_buffered_changes: usize,
    /// Interval between idle-agent retries; zero disables retries.
    pub idle_retry_ticks: u64,
    /// Interval between stale-task cleanups; zero disables cleanup.
    pub cleanup_interval_ticks: u64,
    /// Pathfinder settings.
    pub pathfinding: PathfinderConfig,
    /// Reachability cache settings.
    pub reachability: ReachabilityConfig,
    /// Scoring weights.
    pub selector: SelectorWeights,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            reevaluation_radius: 5,
            hysteresis_margin: 1.2,
            reevaluation_interval_ticks: 1,
            max_reevaluations_per_tick: 4,
            max_buffered_changes: 1024,
            idle_retry_ticks: 10,
            cleanup_interval_ticks: 30,
            pathfinding: PathfinderConfig::default(),
            reachability: ReachabilityConfig::default(),
            selector: SelectorWeights::default(),
        }
    }
}

/// Progress of an agent within its order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    /// Employed but holding no task.
    Idle,
    /// Holding a task it has not started.
    Assigned,
    /// Working its task.
    Working,
}

/// Association between an agent and the order employing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobBinding {
    /// Order employing the agent.
    pub order: OrderId,
    /// Task the agent holds, if any.
    pub task: Option<TaskId>,
    /// Progress on the task.
    pub state: JobState,
}

/// Scheduler coordinating orders, agents and terrain caches.
#[derive(Debug)]
pub struct JobManager {
    config: JobManagerConfig,
    book: OrderBook,
    reachability: ReachabilityMap,
    pathfinder: Pathfinder,
    selector: TaskSelector,
    bindings: BTreeMap<AgentId, JobBinding>,
    positions: BTreeMap<AgentId, TileCoord>,
    changes: Vec<TileCoord>,
    changes_overflowed: bool,
    reevaluation_queue: VecDeque<AgentId>,
    queued: BTreeSet<AgentId>,
    /// Agents handed a task against terrain that predates their own finished
    /// work; their next re-evaluation ignores the hysteresis margin.
    settling: BTreeSet<AgentId>,
    tick: u64,
    last_dispatch: u64,
}

impl JobManager {
    /// Creates a manager for a `width` × `height` grid.
    #[must_use]
    pub fn new(config: JobManagerConfig, width: u32, height: u32) -> Self {
        Self {
            config,
            book: OrderBook::new(),
            reachability: ReachabilityMap::new(config.reachability, width, height),
            pathfinder: Pathfinder::new(config.pathfinding),
            selector: TaskSelector::new(config.selector),
            bindings: BTreeMap::new(),
            positions: BTreeMap::new(),
            changes: Vec::new(),
            changes_overflowed: false,
            reevaluation_queue: VecDeque::new(),
            queued: BTreeSet::new(),
            settling: BTreeSet::new(),
            tick: 0,
            last_dispatch: 0,
        }
    }

    /// Configuration the manager was created with.
    #[must_use]
    pub const fn config(&self) -> &JobManagerConfig {
        &self.config
    }

    /// Live work orders.
    #[must_use]
    pub const fn orders(&self) -> &OrderBook {
        &self.book
    }

    /// Looks up a live order.
    #[must_use]
    pub fn order(&self, id: OrderId) -> Option<&WorkOrder> {
        self.book.get(id)
    }

    /// Standability cache maintained by the manager.
    #[must_use]
    pub const fn reachability(&self) -> &ReachabilityMap {
        &self.reachability
    }

    /// Binding of `agent`, if it is employed.
    #[must_use]
    pub fn binding(&self, agent: AgentId) -> Option<&JobBinding> {
        self.bindings.get(&agent)
    }

    /// Task held by `agent`, if any.
    #[must_use]
    pub fn current_task(&self, agent: AgentId) -> Option<TaskId> {
        self.bindings.get(&agent).and_then(|binding| binding.task)
    }

    /// Last reported foot position of `agent`.
    #[must_use]
    pub fn agent_position(&self, agent: AgentId) -> Option<TileCoord> {
        self.positions.get(&agent).copied()
    }

    /// Number of agents waiting for re-evaluation.
    #[must_use]
    pub fn pending_reevaluations(&self) -> usize {
        self.reevaluation_queue.len()
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Consumes world events relevant to scheduling.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::TilesChanged { coords } => self.notify_tiles_changed(coords),
                Event::GridConfigured { width, height } => {
                    self.reachability.reset(*width, *height);
                    self.changes.clear();
                    self.changes_overflowed = false;
                    self.enqueue_all_bound();
                }
                _ => {}
            }
        }
    }

    /// Buffers a single edited coordinate until the next tick.
    pub fn notify_tile_changed(&mut self, coord: TileCoord) {
        self.notify_tiles_changed(&[coord]);
    }

    /// Buffers a batch of edited coordinates until the next tick.
    ///
    /// When the buffer would exceed its capacity it is discarded and the next
    /// tick invalidates the whole map instead.
    pub fn notify_tiles_changed(&mut self, coords: &[TileCoord]) {
        if self.changes_overflowed || coords.is_empty() {
            return;
        }
        if self.changes.len() + coords.len() > self.config.max_buffered_changes {
            warn!(
                buffered = self.changes.len(),
                incoming = coords.len(),
                "tile change buffer overflowed; invalidating the whole map"
            );
            self.changes.clear();
            self.changes_overflowed = true;
            return;
        }
        self.changes.extend_from_slice(coords);
    }

    /// Advances the scheduler by one tick.
    pub fn tick(&mut self, terrain: TerrainView<'_>, out: &mut Vec<Event>) {
        self.tick += 1;

        self.flush_changes();
        let _ = self.reachability.update_dirty_chunks(terrain, out);

        let interval = self.config.reevaluation_interval_ticks.max(1);
        if !self.reevaluation_queue.is_empty() && self.tick - self.last_dispatch >= interval {
            self.last_dispatch = self.tick;
            self.refresh(terrain, out);
            self.dispatch_reevaluations(terrain, out);
        }

        if is_due(self.tick, self.config.cleanup_interval_ticks) {
            self.cleanup(terrain, out);
        }
        if is_due(self.tick, self.config.idle_retry_ticks) {
            self.retry_idle(terrain, out);
        }
    }

    /// Opens a new work order.
    pub fn create_order(
        &mut self,
        name: impl Into<String>,
        work_type: WorkType,
        max_concurrent_agents: usize,
        priority: u8,
    ) -> OrderId {
        self.book
            .create_order(name, work_type, max_concurrent_agents, priority)
    }

    /// Adds a target to an order at the order's priority.
    pub fn add_target(&mut self, order: OrderId, target: Box<dyn WorkTarget>) -> Option<TaskId> {
        let priority = self.book.get(order)?.priority();
        self.add_target_with_priority(order, target, priority)
    }

    /// Adds a target to an order with an explicit priority.
    ///
    /// Idle employees of the order are queued for re-evaluation.
    pub fn add_target_with_priority(
        &mut self,
        order: OrderId,
        target: Box<dyn WorkTarget>,
        priority: u8,
    ) -> Option<TaskId> {
        let task = self
            .book
            .get_mut(order)?
            .add_target_with_priority(target, priority, self.tick)?;
        let idle: Vec<AgentId> = self
            .bindings
            .iter()
            .filter(|(_, binding)| binding.order == order && binding.task.is_none())
            .map(|(agent, _)| *agent)
            .collect();
        for agent in idle {
            self.enqueue(agent);
        }
        Some(task)
    }

    /// Cancels an order, dismissing its employees and returning the removed
    /// order with its tasks back in the pending state.
    pub fn cancel_order(&mut self, order: OrderId, out: &mut Vec<Event>) -> Option<WorkOrder> {
        let mut removed = self.book.remove(order)?;
        for (agent, _) in removed.cancel() {
            if let Some(binding) = self.bindings.remove(&agent) {
                if let Some(previous) = binding.task {
                    out.push(Event::JobChanged {
                        agent,
                        previous: Some(previous),
                        current: None,
                    });
                }
            }
        }
        Some(removed)
    }

    /// Pauses an order, returning every held task to its queue.
    pub fn pause_order(&mut self, order: OrderId, out: &mut Vec<Event>) -> bool {
        let Some(entry) = self.book.get_mut(order) else {
            return false;
        };
        if !entry.is_active() || entry.is_paused() {
            return false;
        }
        for (agent, _) in entry.pause() {
            self.set_task(agent, None, out);
        }
        true
    }

    /// Resumes a paused order and queues its employees for new work.
    pub fn resume_order(&mut self, order: OrderId) -> bool {
        let Some(entry) = self.book.get_mut(order) else {
            return false;
        };
        if !entry.resume() {
            return false;
        }
        let employees: Vec<AgentId> = entry.employees().collect();
        for agent in employees {
            self.enqueue(agent);
        }
        true
    }

    /// Employs `agent` in `order` and hands it the queue's preferred task.
    ///
    /// Buffered edits are applied and the reachability cache is brought fully
    /// up to date before matching.
    /// An agent employed elsewhere leaves its previous order first. Returns
    /// the assigned task, or `None` when the agent joins idle.
    pub fn assign_employee_to_order(
        &mut self,
        agent: AgentId,
        order: OrderId,
        terrain: TerrainView<'_>,
        out: &mut Vec<Event>,
    ) -> Result<Option<TaskId>, AssignmentError> {
        let foot = self
            .agent_position(agent)
            .ok_or(AssignmentError::UnknownAgentPosition(agent))?;
        self.book
            .get(order)
            .ok_or(AssignmentError::UnknownOrder(order))?
            .check_admission(agent)?;

        match self.bindings.get(&agent).copied() {
            Some(binding) if binding.order == order => {
                if binding.task.is_some() {
                    return Ok(binding.task);
                }
            }
            Some(_) => self.leave_order(agent, out),
            None => {}
        }

        self.refresh(terrain, out);
        let entry = self
            .book
            .get_mut(order)
            .ok_or(AssignmentError::UnknownOrder(order))?;
        entry.employ(agent)?;
        let mut context = WorkContext {
            terrain,
            reachability: &self.reachability,
            pathfinder: &mut self.pathfinder,
            selector: &self.selector,
        };
        let task = entry.assign_next_task(&AgentContext { agent, foot }, &mut context);

        let _ = self.bindings.entry(agent).or_insert(JobBinding {
            order,
            task: None,
            state: JobState::Idle,
        });
        self.set_task(agent, task, out);
        debug!(?agent, ?order, ?task, "agent employed");
        Ok(task)
    }

    /// Records the foot position of an agent.
    pub fn update_agent_position(&mut self, agent: AgentId, foot: TileCoord) {
        let _ = self.positions.insert(agent, foot);
    }

    /// Marks the agent's task as being worked.
    pub fn start_job(&mut self, agent: AgentId) -> bool {
        let Some(binding) = self.bindings.get_mut(&agent) else {
            return false;
        };
        let Some(task) = binding.task else {
            return false;
        };
        let started = self
            .book
            .get_mut(binding.order)
            .map_or(false, |order| order.start_task(task));
        if started {
            binding.state = JobState::Working;
        }
        started
    }

    /// Completes the agent's task and hands it the next one.
    ///
    /// Terrain edits produced by the target are appended to `commands`; the
    /// caller applies them to the world. The next task is matched against
    /// `terrain` as it was before those edits, so when the target changed the
    /// terrain the agent is re-evaluated on the next tick without the
    /// hysteresis margin. When the order runs out of work it is removed and
    /// its employees are released.
    pub fn on_task_completed(
        &mut self,
        agent: AgentId,
        terrain: TerrainView<'_>,
        commands: &mut Vec<Command>,
        out: &mut Vec<Event>,
    ) -> Option<TaskId> {
        let binding = self.bindings.get(&agent).copied()?;
        let task = binding.task?;
        let order = self.book.get_mut(binding.order)?;
        let issued = commands.len();
        if !order.complete_task(task, commands) {
            return None;
        }
        let reshaped = commands.len() > issued;
        out.push(Event::TaskCompleted {
            order: binding.order,
            task,
            agent,
        });

        if order.is_fully_completed() {
            self.set_task(agent, None, out);
            self.retire_order(binding.order, out);
            return None;
        }

        let next = self.assign_from_queue(agent, binding.order, terrain, out);
        self.set_task(agent, next, out);
        if reshaped {
            let _ = self.settling.insert(agent);
            self.enqueue(agent);
        }
        next
    }

    /// Returns the agent's task to the queue after the worker abandoned it.
    ///
    /// The agent stays employed and idle until it is retried.
    pub fn interrupt_job(&mut self, agent: AgentId, out: &mut Vec<Event>) -> bool {
        let Some(binding) = self.bindings.get(&agent).copied() else {
            return false;
        };
        let Some(task) = binding.task else {
            return false;
        };
        let released = self
            .book
            .get_mut(binding.order)
            .map_or(false, |order| order.unassign_task(task));
        if released {
            self.set_task(agent, None, out);
        }
        released
    }

    /// Forgets an agent that no longer exists.
    pub fn cancel_job(&mut self, agent: AgentId, out: &mut Vec<Event>) -> bool {
        let _ = self.positions.remove(&agent);
        if self.queued.remove(&agent) {
            self.reevaluation_queue.retain(|queued| *queued != agent);
        }
        if !self.bindings.contains_key(&agent) {
            return false;
        }
        self.leave_order(agent, out);
        true
    }

    /// Plans the walk from the agent's position to a tile it can work its
    /// task from. A single-tile route means the agent is already in place.
    pub fn plan_route(
        &mut self,
        agent: AgentId,
        terrain: TerrainView<'_>,
    ) -> Option<Vec<TileCoord>> {
        let binding = self.bindings.get(&agent).copied()?;
        let foot = self.agent_position(agent)?;
        let target = self
            .book
            .get(binding.order)?
            .task(binding.task?)?
            .work_position();
        let context = AgentContext { agent, foot };
        match self.selector.probe_access(
            terrain,
            &self.reachability,
            &mut self.pathfinder,
            &context,
            target,
        ) {
            Access::Here => Some(vec![foot]),
            Access::Reachable { stand, .. } => self
                .pathfinder
                .find_path(terrain, foot, stand)
                .map(TilePath::into_tiles),
            Access::Unreachable => None,
        }
    }

    /// Moves buffered edits into the reachability cache and queues the agents
    /// they may affect.
    fn flush_changes(&mut self) {
        let changes = std::mem::take(&mut self.changes);
        if std::mem::replace(&mut self.changes_overflowed, false) {
            self.reachability.mark_all_dirty();
            self.enqueue_all_bound();
        } else if !changes.is_empty() {
            self.reachability.on_tiles_changed(&changes);
            self.enqueue_affected(&changes);
        }
    }

    /// Brings the cache up to date with every edit reported so far.
    fn refresh(&mut self, terrain: TerrainView<'_>, out: &mut Vec<Event>) {
        self.flush_changes();
        let _ = self.reachability.force_update(terrain, out);
    }

    fn enqueue(&mut self, agent: AgentId) {
        if self.queued.insert(agent) {
            self.reevaluation_queue.push_back(agent);
        }
    }

    fn enqueue_all_bound(&mut self) {
        let agents: Vec<AgentId> = self.bindings.keys().copied().collect();
        for agent in agents {
            self.enqueue(agent);
        }
    }

    fn enqueue_affected(&mut self, changes: &[TileCoord]) {
        let radius = self.config.reevaluation_radius;
        let near = |pos: TileCoord| {
            changes
                .iter()
                .any(|change| change.chebyshev_distance(pos) <= radius)
        };

        let mut affected = Vec::new();
        for (agent, binding) in &self.bindings {
            let position_near = self.positions.get(agent).is_some_and(|pos| near(*pos));
            let target_near = binding
                .task
                .and_then(|task| self.book.get(binding.order)?.task(task))
                .is_some_and(|task| near(task.work_position()));
            if position_near || target_near {
                affected.push(*agent);
            }
        }
        for agent in affected {
            self.enqueue(agent);
        }
    }

    fn dispatch_reevaluations(&mut self, terrain: TerrainView<'_>, out: &mut Vec<Event>) {
        for _ in 0..self.config.max_reevaluations_per_tick {
            let Some(agent) = self.reevaluation_queue.pop_front() else {
                break;
            };
            let _ = self.queued.remove(&agent);
            self.reevaluate(agent, terrain, out);
        }
    }

    fn reevaluate(&mut self, agent: AgentId, terrain: TerrainView<'_>, out: &mut Vec<Event>) {
        let margin = if self.settling.remove(&agent) {
            1.0
        } else {
            self.config.hysteresis_margin
        };
        let Some(binding) = self.bindings.get(&agent).copied() else {
            return;
        };
        let Some(foot) = self.agent_position(agent) else {
            return;
        };
        let Some(order) = self.book.get_mut(binding.order) else {
            return;
        };
        if !order.is_active() || order.is_paused() {
            return;
        }
        let context = AgentContext { agent, foot };

        let Some(current) = binding.task else {
            let mut work = WorkContext {
                terrain,
                reachability: &self.reachability,
                pathfinder: &mut self.pathfinder,
                selector: &self.selector,
            };
            let next = order.assign_next_task(&context, &mut work);
            if next.is_some() {
                self.set_task(agent, next, out);
            }
            return;
        };

        let Some(task) = order.task(current) else {
            self.set_task(agent, None, out);
            return;
        };

        if task.is_valid(terrain) {
            if task.state() == TaskState::InProgress {
                return;
            }
            let held = TaskCandidate {
                task: current,
                target: task.work_position(),
                priority: task.priority(),
            };
            let held_score = self
                .selector
                .score_candidate(terrain, &self.reachability, &mut self.pathfinder, &context, held)
                .score;
            let Some(best) = self.selector.select_best_task(
                terrain,
                &self.reachability,
                &mut self.pathfinder,
                &context,
                order.candidates(terrain),
            ) else {
                return;
            };
            if best.score <= held_score * margin {
                return;
            }
            let switched =
                order.unassign_task(current) && order.assign_task(agent, best.candidate.task);
            debug!(
                ?agent,
                from = ?current,
                to = ?best.candidate.task,
                held_score,
                best_score = best.score,
                "switching task"
            );
            self.set_task(agent, switched.then_some(best.candidate.task), out);
            return;
        }

        let _ = order.unassign_task(current);
        let replacement = self
            .selector
            .select_best_task(
                terrain,
                &self.reachability,
                &mut self.pathfinder,
                &context,
                order.candidates(terrain),
            )
            .map(|best| best.candidate.task)
            .filter(|task| order.assign_task(agent, *task));
        debug!(?agent, stale = ?current, ?replacement, "held task became unavailable");
        self.set_task(agent, replacement, out);
    }

    fn retry_idle(&mut self, terrain: TerrainView<'_>, out: &mut Vec<Event>) {
        let idle: Vec<(AgentId, OrderId)> = self
            .bindings
            .iter()
            .filter(|(_, binding)| binding.task.is_none())
            .map(|(agent, binding)| (*agent, binding.order))
            .collect();
        if idle.is_empty() {
            return;
        }
        self.refresh(terrain, out);
        for (agent, order) in idle {
            let next = self.assign_from_queue(agent, order, terrain, out);
            if next.is_some() {
                self.set_task(agent, next, out);
            }
        }
    }

    fn cleanup(&mut self, terrain: TerrainView<'_>, out: &mut Vec<Event>) {
        for order in self.book.iter_mut() {
            let id = order.id();
            for task in order.cleanup_invalid_tasks(terrain) {
                out.push(Event::TaskCancelled { order: id, task });
            }
        }
        let finished: Vec<OrderId> = self
            .book
            .iter()
            .filter(|order| order.is_fully_completed())
            .map(WorkOrder::id)
            .collect();
        for order in finished {
            self.retire_order(order, out);
        }
    }

    fn assign_from_queue(
        &mut self,
        agent: AgentId,
        order: OrderId,
        terrain: TerrainView<'_>,
        out: &mut Vec<Event>,
    ) -> Option<TaskId> {
        let foot = self.agent_position(agent)?;
        self.refresh(terrain, out);
        let entry = self.book.get_mut(order)?;
        if !entry.is_active() || entry.is_paused() {
            return None;
        }
        let mut context = WorkContext {
            terrain,
            reachability: &self.reachability,
            pathfinder: &mut self.pathfinder,
            selector: &self.selector,
        };
        entry.assign_next_task(&AgentContext { agent, foot }, &mut context)
    }

    fn retire_order(&mut self, order: OrderId, out: &mut Vec<Event>) {
        let Some(finished) = self.book.remove(order) else {
            return;
        };
        for agent in finished.employees() {
            let _ = self.bindings.remove(&agent);
            let _ = self.settling.remove(&agent);
        }
        info!(?order, completed = finished.completed_count(), "order finished");
        out.push(Event::AllTasksCompleted { order });
    }

    fn leave_order(&mut self, agent: AgentId, out: &mut Vec<Event>) {
        let _ = self.settling.remove(&agent);
        let Some(binding) = self.bindings.remove(&agent) else {
            return;
        };
        if let Some(order) = self.book.get_mut(binding.order) {
            let _ = order.release(agent);
        }
        if let Some(previous) = binding.task {
            out.push(Event::JobChanged {
                agent,
                previous: Some(previous),
                current: None,
            });
        }
    }

    fn set_task(&mut self, agent: AgentId, task: Option<TaskId>, out: &mut Vec<Event>) {
        let Some(binding) = self.bindings.get_mut(&agent) else {
            return;
        };
        let previous = binding.task;
        binding.task = task;
        binding.state = if task.is_some() {
            JobState::Assigned
        } else {
            JobState::Idle
        };
        if previous != task {
            out.push(Event::JobChanged {
                agent,
                previous,
                current: task,
            });
        }
    }
}

fn is_due(tick: u64, interval: u64) -> bool {
    interval != 0 && tick % interval == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflowing_buffer_collapses_into_full_invalidation() {
        let config = JobManagerConfig {
            max_buffered_changes: 2,
            ..JobManagerConfig::default()
        };
        let mut manager = JobManager::new(config, 8, 8);
        manager.notify_tiles_changed(&[TileCoord::new(0, 0), TileCoord::new(1, 0)]);
        assert!(!manager.changes_overflowed);
        manager.notify_tile_changed(TileCoord::new(2, 0));
        assert!(manager.changes_overflowed);
        assert!(manager.changes.is_empty());
        manager.notify_tile_changed(TileCoord::new(3, 0));
        assert!(manager.changes.is_empty());
    }

    #[test]
    fn periodic_work_runs_on_its_interval() {
        assert!(!is_due(3, 0));
        assert!(is_due(10, 5));
        assert!(!is_due(11, 5));
    }

    #[test]
    fn employing_requires_a_known_position() {
        let mut manager = JobManager::new(JobManagerConfig::default(), 8, 8);
        let order = manager.create_order("dig", WorkType::Mine, 1, 5);
        let tiles = vec![delve_core::TileType::AIR; 64];
        let overlays = BTreeMap::new();
        let terrain = TerrainView::new(&tiles, &overlays, 8, 8);
        let mut events = Vec::new();

        assert_eq!(
            manager.assign_employee_to_order(AgentId::new(1), order, terrain, &mut events),
            Err(AssignmentError::UnknownAgentPosition(AgentId::new(1)))
        );
        manager.update_agent_position(AgentId::new(1), TileCoord::new(1, 1));
        assert_eq!(
            manager.assign_employee_to_order(
                AgentId::new(1),
                OrderId::new(9),
                terrain,
                &mut events,
            ),
            Err(AssignmentError::UnknownOrder(OrderId::new(9)))
        );
        assert!(manager.binding(AgentId::new(1)).is_none());
    }
}
