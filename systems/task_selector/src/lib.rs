#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted scoring policy that ranks tasks for a single agent.
//!
//! Scores prefer nearby, high-priority work that can be done without moving,
//! favour digging from the top down and diagonally below, and discourage an
//! agent from undermining its own footing. Tasks the agent can neither work
//! from where it stands nor walk to score negative infinity.

mod geometry;

use delve_core::{AgentId, TaskId, TerrainView, TileCoord, AGENT_HEIGHT};
use delve_system_pathfinding::Pathfinder;
use delve_system_reachability::ReachabilityMap;
use serde::Deserialize;
use tracing::trace;

pub use geometry::{can_work_from, has_line_of_sight, in_range, is_standing_on, work_positions};

/// Tunable constants of the scoring formula.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectorWeights {
    /// Multiplier applied to the Manhattan distance to the target.
    pub distance_weight: f32,
    /// Multiplier applied to the access cost of walking to a work position.
    pub access_weight: f32,
    /// Bonus per row the target sits above the agent's head.
    pub height_weight: f32,
    /// Lower bound for the height bonus on deep targets.
    pub min_height_bonus: f32,
    /// Bonus for targets diagonally below and to the side.
    pub diagonal_bonus: f32,
    /// Bonus for targets workable without moving.
    pub in_range_bonus: f32,
    /// Penalty for digging the tile the agent stands on.
    pub standing_on_target_penalty: f32,
    /// Penalty for any target below the agent's feet.
    pub below_foot_penalty: f32,
    /// Access cost added when the route needs a ladder.
    pub ladder_access_cost: f32,
    /// Access cost per unit of path length beyond the straight-line distance.
    pub detour_weight: f32,
    /// Keeps the denominator positive.
    pub epsilon: f32,
}

impl Default for SelectorWeights {
    fn default() -> Self {
        Self {
            distance_weight: 1.0,
            access_weight: 1.0,
            height_weight: 0.15,
            min_height_bonus: 0.1,
            diagonal_bonus: 1.5,
            in_range_bonus: 4.0,
            standing_on_target_penalty: 50.0,
            below_foot_penalty: 4.0,
            ladder_access_cost: 3.0,
            detour_weight: 2.0,
            epsilon: 0.001,
        }
    }
}

/// Agent state the scorer reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentContext {
    /// Agent being scored for.
    pub agent: AgentId,
    /// Current foot tile of the agent.
    pub foot: TileCoord,
}

/// Task facts the scorer reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskCandidate {
    /// Task being scored.
    pub task: TaskId,
    /// Tile the work is performed on.
    pub target: TileCoord,
    /// Numeric priority; lower values are more urgent.
    pub priority: u8,
}

/// How an agent would get to work on a target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Access {
    /// The target is workable from the agent's current foot tile.
    Here,
    /// The agent must walk to another foot tile first.
    Reachable {
        /// Foot tile the agent would work from.
        stand: TileCoord,
        /// Traversal cost of the route.
        path_cost: f32,
        /// Number of steps in the route.
        path_steps: usize,
        /// Whether the route climbs a ladder.
        needs_ladder: bool,
    },
    /// No work position could be reached.
    Unreachable,
}

impl Access {
    /// Reports whether the agent can work the target at all.
    #[must_use]
    pub const fn is_workable(&self) -> bool {
        !matches!(self, Self::Unreachable)
    }
}

/// Candidate paired with its score and access route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredTask {
    /// Candidate that was scored.
    pub candidate: TaskCandidate,
    /// Score; higher is better and negative infinity means excluded.
    pub score: f32,
    /// Access route used to compute the score.
    pub access: Access,
}

/// Stateless scorer configured with [`SelectorWeights`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskSelector {
    weights: SelectorWeights,
}

impl TaskSelector {
    /// Creates a scorer with the provided weights.
    #[must_use]
    pub const fn new(weights: SelectorWeights) -> Self {
        Self { weights }
    }

    /// Weights the scorer was created with.
    #[must_use]
    pub const fn weights(&self) -> &SelectorWeights {
        &self.weights
    }

    /// Determines whether and how `agent` could get to work on `target`.
    ///
    /// Every work position is tried, nearest first; each must pass the
    /// reachability pre-filter before the pathfinder is consulted.
    pub fn probe_access(
        &self,
        terrain: TerrainView<'_>,
        reachability: &ReachabilityMap,
        pathfinder: &mut Pathfinder,
        agent: &AgentContext,
        target: TileCoord,
    ) -> Access {
        if can_work_from(terrain, agent.foot, target) {
            return Access::Here;
        }

        let mut positions = work_positions(reachability, terrain, target);
        positions.sort_by_key(|pos| (pos.manhattan_distance(agent.foot), pos.y(), pos.x()));

        for stand in positions
            .into_iter()
            .filter(|stand| reachability.is_reachable(agent.foot, *stand))
        {
            if let Some(path) = pathfinder.find_path(terrain, agent.foot, stand) {
                return Access::Reachable {
                    stand,
                    path_cost: path.cost(),
                    path_steps: path.steps(),
                    needs_ladder: path.requires_vertical_transition(),
                };
            }
        }

        Access::Unreachable
    }

    /// Scores a candidate for an agent given a previously probed access route.
    #[must_use]
    pub fn calculate_task_score(
        &self,
        candidate: &TaskCandidate,
        agent: &AgentContext,
        access: &Access,
    ) -> f32 {
        let weights = &self.weights;
        let foot = agent.foot;
        let target = candidate.target;

        let can_work_here = match access {
            Access::Unreachable => return f32::NEG_INFINITY,
            Access::Here => true,
            Access::Reachable { .. } => false,
        };

        let mut penalties = 0.0;
        if is_standing_on(foot, target) {
            penalties += weights.standing_on_target_penalty;
        }
        if target.y() < foot.y() {
            penalties += weights.below_foot_penalty;
        }

        let priority_factor = (10.0 - f32::from(candidate.priority)).max(1.0);
        let height_bonus = (1.0
            + (target.y() - (foot.y() + AGENT_HEIGHT)) as f32 * weights.height_weight)
            .max(weights.min_height_bonus);
        let diagonal_bonus = if target.x() != foot.x() && target.y() < foot.y() {
            weights.diagonal_bonus
        } else {
            1.0
        };
        let in_range_bonus = if can_work_here {
            weights.in_range_bonus
        } else {
            1.0
        };

        let distance = foot.manhattan_distance(target) as f32;
        let access_cost = self.access_cost(foot, access);

        let numerator = priority_factor * height_bonus * diagonal_bonus * in_range_bonus;
        let denominator = distance * weights.distance_weight
            + access_cost * weights.access_weight
            + penalties
            + weights.epsilon;
        numerator / denominator
    }

    /// Probes access for a candidate and scores it.
    pub fn score_candidate(
        &self,
        terrain: TerrainView<'_>,
        reachability: &ReachabilityMap,
        pathfinder: &mut Pathfinder,
        agent: &AgentContext,
        candidate: TaskCandidate,
    ) -> ScoredTask {
        let access = self.probe_access(terrain, reachability, pathfinder, agent, candidate.target);
        ScoredTask {
            candidate,
            score: self.calculate_task_score(&candidate, agent, &access),
            access,
        }
    }

    /// Returns the highest-scoring workable candidate, if any.
    ///
    /// Equal scores resolve to the lowest task identifier.
    pub fn select_best_task<I>(
        &self,
        terrain: TerrainView<'_>,
        reachability: &ReachabilityMap,
        pathfinder: &mut Pathfinder,
        agent: &AgentContext,
        candidates: I,
    ) -> Option<ScoredTask>
    where
        I: IntoIterator<Item = TaskCandidate>,
    {
        let mut best: Option<ScoredTask> = None;
        for candidate in candidates {
            let scored = self.score_candidate(terrain, reachability, pathfinder, agent, candidate);
            if scored.score == f32::NEG_INFINITY {
                trace!(
                    agent = ?agent.agent,
                    task = ?scored.candidate.task,
                    "candidate not workable"
                );
                continue;
            }
            let better = match &best {
                None => true,
                Some(current) => {
                    scored.score > current.score
                        || (scored.score == current.score
                            && scored.candidate.task < current.candidate.task)
                }
            };
            if better {
                best = Some(scored);
            }
        }
        best
    }

    fn access_cost(&self, foot: TileCoord, access: &Access) -> f32 {
        let Access::Reachable {
            stand,
            path_cost,
            needs_ladder,
            ..
        } = *access
        else {
            return 0.0;
        };

        let mut cost = 0.0;
        if needs_ladder {
            cost += self.weights.ladder_access_cost;
        }
        let beeline = (foot.manhattan_distance(stand) as f32).max(1.0);
        cost += (path_cost / beeline - 1.0).max(0.0) * self.weights.detour_weight;
        cost
    }
}

#[cfg(test)]
mod tests {
    use delve_core::OrderId;

    use super::*;

    fn candidate(sequence: u32, x: i32, y: i32, priority: u8) -> TaskCandidate {
        TaskCandidate {
            task: TaskId::new(OrderId::new(1), sequence),
            target: TileCoord::new(x, y),
            priority,
        }
    }

    fn agent_at(x: i32, y: i32) -> AgentContext {
        AgentContext {
            agent: AgentId::new(1),
            foot: TileCoord::new(x, y),
        }
    }

    #[test]
    fn unreachable_tasks_are_excluded() {
        let selector = TaskSelector::default();
        let score = selector.calculate_task_score(
            &candidate(0, 3, 3, 5),
            &agent_at(0, 0),
            &Access::Unreachable,
        );
        assert_eq!(score, f32::NEG_INFINITY);
    }

    #[test]
    fn diagonal_below_beats_standing_on_target() {
        let selector = TaskSelector::default();
        let agent = agent_at(10, 51);
        let under_feet =
            selector.calculate_task_score(&candidate(0, 10, 50, 5), &agent, &Access::Here);
        let diagonal =
            selector.calculate_task_score(&candidate(1, 11, 50, 5), &agent, &Access::Here);
        assert!(diagonal > under_feet);
        assert!(under_feet > 0.0, "standing penalty is large but finite");
    }

    #[test]
    fn higher_targets_outrank_lower_ones() {
        let selector = TaskSelector::default();
        let agent = agent_at(10, 10);
        let above = selector.calculate_task_score(&candidate(0, 10, 12, 5), &agent, &Access::Here);
        let beside = selector.calculate_task_score(&candidate(1, 12, 10, 5), &agent, &Access::Here);
        assert!(beside > 0.0);
        assert!(above > beside);
    }

    #[test]
    fn urgent_priority_raises_score() {
        let selector = TaskSelector::default();
        let agent = agent_at(5, 5);
        let urgent = selector.calculate_task_score(&candidate(0, 6, 6, 1), &agent, &Access::Here);
        let relaxed = selector.calculate_task_score(&candidate(1, 6, 6, 8), &agent, &Access::Here);
        assert!(urgent > relaxed);
    }

    #[test]
    fn working_in_place_beats_walking() {
        let selector = TaskSelector::default();
        let agent = agent_at(5, 5);
        let here = selector.calculate_task_score(&candidate(0, 6, 6, 5), &agent, &Access::Here);
        let walk = selector.calculate_task_score(
            &candidate(1, 6, 6, 5),
            &agent,
            &Access::Reachable {
                stand: TileCoord::new(6, 5),
                path_cost: 1.0,
                path_steps: 1,
                needs_ladder: false,
            },
        );
        assert!(here > walk);
    }

    #[test]
    fn ladder_routes_cost_more_than_flat_routes() {
        let selector = TaskSelector::default();
        let agent = agent_at(0, 1);
        let flat = Access::Reachable {
            stand: TileCoord::new(6, 1),
            path_cost: 6.0,
            path_steps: 6,
            needs_ladder: false,
        };
        let climb = Access::Reachable {
            stand: TileCoord::new(6, 1),
            path_cost: 9.0,
            path_steps: 8,
            needs_ladder: true,
        };
        let task = candidate(0, 7, 2, 5);
        assert!(
            selector.calculate_task_score(&task, &agent, &flat)
                > selector.calculate_task_score(&task, &agent, &climb)
        );
    }
}
