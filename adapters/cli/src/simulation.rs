//! Scripted dig run with a minimal stand-in for agent locomotion.
//!
//! Workers walk one tile per tick along the routes the scheduler plans,
//! work for the target's work time and then report completion. Terrain edits
//! produced by completed work are applied to the world and fed back into the
//! scheduler as tile changes.

use std::collections::VecDeque;

use delve_core::{AgentId, Command, Event, OrderId, TaskId, TerrainView, TileCoord, WorkType};
use delve_system_job_manager::JobManager;
use delve_system_work_orders::MiningCell;
use delve_world::{self as world, query, Layout, World};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;

#[derive(Debug)]
enum Activity {
    Idle,
    Walking(VecDeque<TileCoord>),
    Working { remaining: u64 },
}

#[derive(Debug)]
struct Worker {
    id: AgentId,
    foot: TileCoord,
    activity: Activity,
}

/// Totals reported once the run stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SimulationReport {
    /// Ticks simulated.
    pub(crate) ticks: u64,
    /// Tasks finished by workers.
    pub(crate) tasks_completed: usize,
    /// Dig sites that are still solid.
    pub(crate) sites_remaining: usize,
    /// Whether the order ran out of work.
    pub(crate) order_finished: bool,
}

/// World, scheduler and workers of one run.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    manager: JobManager,
    workers: Vec<Worker>,
    order: OrderId,
    dig_sites: Vec<TileCoord>,
    tick_millis: u64,
    report: SimulationReport,
}

impl Simulation {
    /// Creates an order for every dig site and employs an agent per spawn
    /// while the order has room and open work.
    pub(crate) fn new(layout: Layout, config: &SimulationConfig) -> Self {
        let Layout {
            world,
            dig_sites,
            agent_spawns,
        } = layout;
        let (width, height) = query::dimensions(&world);
        let mut manager = JobManager::new(config.scheduler, width, height);
        let order = manager.create_order(
            config.run.order_name.clone(),
            WorkType::Mine,
            config.run.max_agents,
            config.run.priority,
        );
        for site in &dig_sites {
            let _ = manager.add_target(order, Box::new(MiningCell::new(*site)));
        }

        let mut workers = Vec::new();
        let mut events = Vec::new();
        for (index, spawn) in agent_spawns.into_iter().enumerate() {
            let id = AgentId::new(u32::try_from(index).unwrap_or(u32::MAX));
            manager.update_agent_position(id, spawn);
            let terrain = query::terrain_view(&world);
            let hiring = manager
                .order(order)
                .is_some_and(|entry| entry.can_assign_worker(terrain));
            if hiring {
                match manager.assign_employee_to_order(id, order, terrain, &mut events) {
                    Ok(task) => debug!(agent = ?id, ?task, "worker hired"),
                    Err(error) => warn!(agent = ?id, %error, "worker could not be hired"),
                }
            } else {
                debug!(agent = ?id, "order takes no more workers");
            }
            workers.push(Worker {
                id,
                foot: spawn,
                activity: Activity::Idle,
            });
        }

        Self {
            world,
            manager,
            workers,
            order,
            dig_sites,
            tick_millis: config.run.tick_millis.max(1),
            report: SimulationReport::default(),
        }
    }

    /// Runs until the order finishes or `max_ticks` elapse.
    pub(crate) fn run(&mut self, max_ticks: u64) -> SimulationReport {
        while self.report.ticks < max_ticks && !self.report.order_finished {
            self.step();
        }
        self.report.sites_remaining = self
            .dig_sites
            .iter()
            .filter(|site| query::tile_at(&self.world, **site).is_some_and(|tile| tile.is_solid()))
            .count();
        info!(
            ticks = self.report.ticks,
            completed = self.report.tasks_completed,
            remaining = self.report.sites_remaining,
            "simulation stopped"
        );
        self.report
    }

    /// World as it stands after the steps run so far.
    #[cfg(test)]
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    fn step(&mut self) {
        self.report.ticks += 1;
        let mut events = Vec::new();
        self.manager.tick(query::terrain_view(&self.world), &mut events);
        self.observe(&events);

        for index in 0..self.workers.len() {
            let mut commands = Vec::new();
            let mut events = Vec::new();
            self.advance(index, &mut commands, &mut events);
            self.observe(&events);
            if !commands.is_empty() {
                self.apply(commands);
            }
        }
    }

    fn advance(&mut self, index: usize, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
        let terrain = query::terrain_view(&self.world);
        let manager = &mut self.manager;
        let worker = &mut self.workers[index];

        if let Some(landing) = fall_target(terrain, worker.foot) {
            debug!(agent = ?worker.id, from = ?worker.foot, to = ?landing, "worker fell");
            worker.foot = landing;
            manager.update_agent_position(worker.id, landing);
            if !matches!(worker.activity, Activity::Idle) {
                let _ = manager.interrupt_job(worker.id, events);
                worker.activity = Activity::Idle;
            }
            return;
        }

        match &mut worker.activity {
            Activity::Idle => {
                if manager.current_task(worker.id).is_none() {
                    return;
                }
                match manager.plan_route(worker.id, terrain) {
                    Some(route) => {
                        worker.activity = Activity::Walking(route.into_iter().skip(1).collect());
                    }
                    None => {
                        debug!(agent = ?worker.id, "no route to task");
                        let _ = manager.interrupt_job(worker.id, events);
                    }
                }
            }
            Activity::Walking(route) => {
                if let Some(next) = route.pop_front() {
                    worker.foot = next;
                    manager.update_agent_position(worker.id, next);
                    return;
                }
                let work_time = manager
                    .current_task(worker.id)
                    .and_then(|task| work_millis(manager, self.order, task));
                worker.activity = match work_time {
                    Some(millis) if manager.start_job(worker.id) => Activity::Working {
                        remaining: millis.div_ceil(self.tick_millis).max(1),
                    },
                    _ => Activity::Idle,
                };
            }
            Activity::Working { remaining } => {
                if *remaining > 1 {
                    *remaining -= 1;
                    return;
                }
                worker.activity = Activity::Idle;
                let _ = manager.on_task_completed(worker.id, terrain, commands, events);
            }
        }
    }

    fn apply(&mut self, commands: Vec<Command>) {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        self.manager.handle(&events);
    }

    fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::JobChanged { agent, .. } => {
                    if let Some(worker) = self.workers.iter_mut().find(|worker| worker.id == *agent)
                    {
                        worker.activity = Activity::Idle;
                    }
                }
                Event::TaskCompleted { .. } => self.report.tasks_completed += 1,
                Event::AllTasksCompleted { order } if *order == self.order => {
                    self.report.order_finished = true;
                }
                _ => {}
            }
        }
    }
}

fn work_millis(manager: &JobManager, order: OrderId, task: TaskId) -> Option<u64> {
    let time = manager.order(order)?.task(task)?.work_time();
    Some(u64::try_from(time.as_millis()).unwrap_or(u64::MAX))
}

/// Foot tile a worker drops to when it has lost its footing.
fn fall_target(terrain: TerrainView<'_>, foot: TileCoord) -> Option<TileCoord> {
    if terrain.can_stand_at(foot) {
        return None;
    }
    let mut landing = foot;
    while landing.y() > 0 && !terrain.can_stand_at(landing) {
        landing = landing.below();
    }
    (landing != foot).then_some(landing)
}
