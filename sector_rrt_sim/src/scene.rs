//! Scene configuration loaded from YAML.
//!
//! Mirrors the layout of a planning scene file: environment, RRT parameters,
//! advisor selection and output settings.

use std::path::Path;
use std::time::Duration;

use sector_rrt_algo::path_planning::{
    Bounds, CircleObstacle, GoalBearingAdvisor, NoAdvice, SectorAdvisor, SectorRrtConfig,
    TimeoutAdvisor,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::history::DEFAULT_HISTORY_LEN;

/// A 2D point as written in scene files
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSpec {
    pub x: f64,
    pub y: f64,
}

/// Obstacles may be written as `[x, y, radius]` or `{x, y, radius}`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObstacleSpec {
    Triple([f64; 3]),
    Circle(CircleObstacle),
}

impl From<ObstacleSpec> for CircleObstacle {
    fn from(spec: ObstacleSpec) -> Self {
        match spec {
            ObstacleSpec::Triple([x, y, radius]) => CircleObstacle::new(x, y, radius),
            ObstacleSpec::Circle(c) => c,
        }
    }
}

/// Environment section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentSection {
    pub bounds: Bounds,
    pub start_point: PointSpec,
    pub goal_point: PointSpec,
    #[serde(default)]
    pub obstacles: Vec<ObstacleSpec>,
}

/// RRT parameter section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RrtParamsSection {
    #[serde(default = "defaults::step_size")]
    pub step_size: f64,

    #[serde(default = "defaults::max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "defaults::collision_samples")]
    pub collision_samples: usize,

    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub sector_retry_limit: Option<usize>,
}

impl Default for RrtParamsSection {
    fn default() -> Self {
        Self {
            step_size: defaults::step_size(),
            max_iterations: defaults::max_iterations(),
            collision_samples: defaults::collision_samples(),
            seed: None,
            sector_retry_limit: None,
        }
    }
}

/// Which advisor proposes sectors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorKind {
    /// No sectors; pure uniform RRT
    None,
    /// Straight-line heuristic toward the goal
    #[default]
    #[serde(alias = "heuristic")]
    #[value(alias = "heuristic")]
    GoalBearing,
}

/// Advisor section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvisorSection {
    #[serde(default)]
    pub kind: AdvisorKind,

    /// Opening of proposed sectors (degrees)
    #[serde(default = "defaults::span_angle")]
    pub span_angle: f64,

    /// Per-call deadline; None calls the advisor inline
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for AdvisorSection {
    fn default() -> Self {
        Self {
            kind: AdvisorKind::default(),
            span_angle: defaults::span_angle(),
            timeout_ms: None,
        }
    }
}

impl AdvisorSection {
    /// Instantiate the configured advisor
    pub fn build(&self) -> Box<dyn SectorAdvisor> {
        let timeout = self.timeout_ms.map(Duration::from_millis);
        match (self.kind, timeout) {
            (AdvisorKind::None, _) => Box::new(NoAdvice),
            (AdvisorKind::GoalBearing, None) => Box::new(GoalBearingAdvisor::new(self.span_angle)),
            (AdvisorKind::GoalBearing, Some(timeout)) => Box::new(TimeoutAdvisor::new(
                GoalBearingAdvisor::new(self.span_angle),
                timeout,
            )),
        }
    }
}

/// Output section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OutputSection {
    /// Where to write the JSON report (none = don't write)
    #[serde(default)]
    pub report_path: Option<String>,

    /// Iteration records kept for the report
    #[serde(default = "defaults::history_len")]
    pub history_len: usize,
}

/// Full scene configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneConfig {
    pub environment: EnvironmentSection,

    #[serde(default)]
    pub rrt_params: RrtParamsSection,

    #[serde(default)]
    pub advisor: AdvisorSection,

    #[serde(default)]
    pub output: OutputSection,
}

impl SceneConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(SimError::from)
    }

    /// Planner configuration for this scene
    pub fn planner_config(&self) -> SectorRrtConfig {
        let env = &self.environment;
        let params = &self.rrt_params;
        SectorRrtConfig {
            start: [env.start_point.x, env.start_point.y],
            goal: [env.goal_point.x, env.goal_point.y],
            bounds: env.bounds,
            obstacles: env.obstacles.iter().copied().map(CircleObstacle::from).collect(),
            step_size: params.step_size,
            max_iterations: params.max_iterations,
            collision_samples: params.collision_samples,
            seed: params.seed,
            sector_retry_limit: params.sector_retry_limit,
        }
    }
}

mod defaults {
    use super::DEFAULT_HISTORY_LEN;

    pub fn step_size() -> f64 {
        0.5
    }

    pub fn max_iterations() -> usize {
        5000
    }

    pub fn collision_samples() -> usize {
        10
    }

    pub fn span_angle() -> f64 {
        45.0
    }

    pub fn history_len() -> usize {
        DEFAULT_HISTORY_LEN
    }
}
