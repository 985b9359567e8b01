//! TOML configuration for the dig simulation.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use delve_system_job_manager::JobManagerConfig;
use serde::Deserialize;

/// Complete simulation settings; every section is optional in the file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SimulationConfig {
    /// Scheduler, pathfinder, cache and scoring settings.
    pub(crate) scheduler: JobManagerConfig,
    /// Settings of the scripted run itself.
    pub(crate) run: RunConfig,
}

/// Settings of the scripted run driven by the CLI.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct RunConfig {
    /// Simulated milliseconds per tick, used to convert work times to ticks.
    pub(crate) tick_millis: u64,
    /// Name of the order created for the map's dig sites.
    pub(crate) order_name: String,
    /// Maximum number of agents employed by the order.
    pub(crate) max_agents: usize,
    /// Priority of the order's tasks.
    pub(crate) priority: u8,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_millis: 250,
            order_name: String::from("excavation"),
            max_agents: 4,
            priority: 5,
        }
    }
}

/// Loads the configuration at `path`, or the defaults when no path is given.
pub(crate) fn load(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read simulation config at {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid simulation config {}", path.display()))
}

fn parse(contents: &str) -> Result<SimulationConfig> {
    toml::from_str(contents).context("failed to parse simulation config toml contents")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = parse(
            r#"
            [scheduler]
            hysteresis_margin = 1.5

            [scheduler.selector]
            standing_on_target_penalty = 80.0

            [run]
            max_agents = 2
            "#,
        )
        .expect("valid config");

        assert!((config.scheduler.hysteresis_margin - 1.5).abs() < f32::EPSILON);
        assert_eq!(config.scheduler.reevaluation_radius, 5);
        assert!((config.scheduler.selector.standing_on_target_penalty - 80.0).abs() < f32::EPSILON);
        assert_eq!(config.scheduler.pathfinding.max_iterations, 4096);
        assert_eq!(config.run.max_agents, 2);
        assert_eq!(config.run.tick_millis, 250);
    }

    #[test]
    fn unknown_types_are_reported() {
        let error = parse("[run]\nmax_agents = \"many\"").expect_err("type mismatch");
        assert!(format!("{error:#}").contains("failed to parse"));
    }

    #[test]
    fn absent_path_yields_defaults() {
        let config = load(None).expect("defaults");
        assert_eq!(config.run.order_name, "excavation");
        assert_eq!(config.scheduler.reachability.rebuild_budget, 0);
    }
}
