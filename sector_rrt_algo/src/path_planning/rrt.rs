//! Sector-biased RRT (Rapidly-exploring Random Tree) path planning
//!
//! Works in a bounded continuous plane with circular obstacles. After every
//! successful extension an external [`SectorAdvisor`] proposes angular
//! sectors around the newest node; the next sample is drawn inside one of
//! them, or uniformly over the bounds when no sector is active.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::error::{PlanningError, Result};
use super::feedback::{default_sector, validate_proposals, FeedbackContext, SectorAdvisor};
use super::geometry::{
    point_in_obstacle, segment_collides, Bounds, CircleObstacle, Point, DEFAULT_COLLISION_SAMPLES,
};
use super::sampler::{Sector, SectorSampler};
use super::tree::{RrtNode, RrtTree};

/// Configuration for the sector RRT planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorRrtConfig {
    pub start: [f64; 2],
    pub goal: [f64; 2],
    pub bounds: Bounds,
    pub obstacles: Vec<CircleObstacle>,
    /// Radius of sector sampling around the frontier node
    pub step_size: f64,
    /// Maximum iterations
    pub max_iterations: usize,
    /// Points checked per segment, endpoints included
    pub collision_samples: usize,
    /// Random seed (None for random)
    pub seed: Option<u64>,
    /// Out-of-bounds sector draws tolerated before falling back to a uniform
    /// draw (None retries forever)
    pub sector_retry_limit: Option<usize>,
}

impl Default for SectorRrtConfig {
    fn default() -> Self {
        Self {
            start: [0.0, 0.0],
            goal: [10.0, 10.0],
            bounds: Bounds::default(),
            obstacles: Vec::new(),
            step_size: 0.5,
            max_iterations: 5000,
            collision_samples: DEFAULT_COLLISION_SAMPLES,
            seed: None,
            sector_retry_limit: None,
        }
    }
}

impl SectorRrtConfig {
    pub fn start_point(&self) -> Point {
        Point::new(self.start[0], self.start[1])
    }

    pub fn goal_point(&self) -> Point {
        Point::new(self.goal[0], self.goal[1])
    }

    /// Reject parameters the planner cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PlanningError::InvalidConfiguration(msg));

        if !self.bounds.is_valid() {
            return invalid(format!("degenerate bounds {:?}", self.bounds));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return invalid(format!("step_size must be positive, got {}", self.step_size));
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1".to_string());
        }
        if self.collision_samples < 2 {
            return invalid(format!(
                "collision_samples must be at least 2, got {}",
                self.collision_samples
            ));
        }
        for (name, p) in [("start", self.start), ("goal", self.goal)] {
            let point = Point::new(p[0], p[1]);
            if !(p[0].is_finite() && p[1].is_finite()) || !self.bounds.contains(&point) {
                return invalid(format!("{name} ({}, {}) lies outside bounds", p[0], p[1]));
            }
        }
        for (i, obs) in self.obstacles.iter().enumerate() {
            if !(obs.x.is_finite() && obs.y.is_finite() && obs.radius.is_finite()) {
                return invalid(format!("obstacle {i} has a non-finite field"));
            }
            if obs.radius < 0.0 {
                return invalid(format!("obstacle {i} has negative radius {}", obs.radius));
            }
        }
        Ok(())
    }
}

/// Planner state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerState {
    Running,
    Succeeded,
    Exhausted,
}

/// Shared stop signal, checked at the top of every iteration
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Borrowed view of the planner after an iteration
#[derive(Debug, Clone, Copy)]
pub struct PlannerSnapshot<'a> {
    pub iteration: usize,
    pub state: PlannerState,
    pub nodes: &'a [RrtNode],
    pub sectors: &'a [Sector],
}

/// Owned copy of the planner's observable state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub nodes: Vec<RrtNode>,
    pub sectors: Vec<Sector>,
    pub path: Option<Vec<RrtNode>>,
}

/// Receives a snapshot after every iteration (e.g. for visualization)
pub trait PlanObserver {
    fn on_iteration(&mut self, snapshot: &PlannerSnapshot<'_>);
}

impl<F> PlanObserver for F
where
    F: FnMut(&PlannerSnapshot<'_>),
{
    fn on_iteration(&mut self, snapshot: &PlannerSnapshot<'_>) {
        self(snapshot)
    }
}

/// Result of sector RRT path planning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RrtResult {
    /// Path from start to goal (empty when no path was found)
    pub path: Vec<RrtNode>,
    /// All nodes in the tree (for visualization)
    pub tree: Vec<RrtNode>,
    /// Whether a path was found
    pub success: bool,
    /// Number of iterations (main loop iterations)
    pub iterations: usize,
    /// Terminal state
    pub state: PlannerState,
    /// Whether the run stopped on a cancel request
    pub cancelled: bool,
    /// Advisor calls that failed and fell back to the goal bearing
    pub feedback_failures: usize,
}

/// Sector-biased RRT planner for one planning session
pub struct SectorRrtPlanner<A> {
    config: SectorRrtConfig,
    start: Point,
    goal: Point,
    tree: RrtTree,
    sectors: Vec<Sector>,
    sampler: SectorSampler,
    advisor: A,
    state: PlannerState,
    iterations: usize,
    cancel: Option<CancelToken>,
    cancelled: bool,
    feedback_failures: usize,
}

impl<A: SectorAdvisor> SectorRrtPlanner<A> {
    /// Create a planner; fails on invalid configuration before any work
    pub fn new(config: SectorRrtConfig, advisor: A) -> Result<Self> {
        config.validate()?;

        let start = config.start_point();
        let goal = config.goal_point();
        for (name, p) in [("start", &start), ("goal", &goal)] {
            if let Some(i) = point_in_obstacle(p, &config.obstacles) {
                warn!("{name} ({:.3}, {:.3}) lies inside obstacle {i}", p.x, p.y);
            }
        }
        debug!(
            "Sector RRT: {} obstacles, step {}, max {} iterations",
            config.obstacles.len(),
            config.step_size,
            config.max_iterations
        );

        let capacity = config.max_iterations.saturating_add(2).min(1 << 16);
        Ok(Self {
            tree: RrtTree::with_capacity(start, capacity),
            sampler: SectorSampler::new(config.bounds, config.seed),
            start,
            goal,
            sectors: Vec::new(),
            advisor,
            state: PlannerState::Running,
            iterations: 0,
            cancel: None,
            cancelled: false,
            feedback_failures: 0,
            config,
        })
    }

    /// Honor `token` at the top of each iteration
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &SectorRrtConfig {
        &self.config
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn tree(&self) -> &RrtTree {
        &self.tree
    }

    /// Currently active sector set (empty means uniform sampling)
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn advisor(&self) -> &A {
        &self.advisor
    }

    pub fn snapshot_view(&self) -> PlannerSnapshot<'_> {
        PlannerSnapshot {
            iteration: self.iterations,
            state: self.state,
            nodes: self.tree.nodes(),
            sectors: &self.sectors,
        }
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            nodes: self.tree.nodes().to_vec(),
            sectors: self.sectors.clone(),
            path: self.path(),
        }
    }

    /// Path from start to goal, only once the planner has succeeded
    pub fn path(&self) -> Option<Vec<RrtNode>> {
        (self.state == PlannerState::Succeeded).then(|| self.tree.extract_path())
    }

    /// Path from start to goal.
    ///
    /// Panics unless the planner has succeeded.
    pub fn extract_path(&self) -> Vec<RrtNode> {
        assert_eq!(
            self.state,
            PlannerState::Succeeded,
            "path extraction requires a succeeded planner"
        );
        self.tree.extract_path()
    }

    /// Run a single iteration and return the resulting state
    pub fn step(&mut self) -> PlannerState {
        if self.state != PlannerState::Running {
            return self.state;
        }
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            warn!("Planning cancelled after {} iterations", self.iterations);
            self.cancelled = true;
            self.state = PlannerState::Exhausted;
            return self.state;
        }

        self.iterations += 1;
        let sample = self.sample_point();

        // Extend from the nearest node straight to the sample
        let (nearest_idx, nearest) = self.tree.nearest(&sample);
        let nearest_pos = nearest.position();
        if segment_collides(
            &nearest_pos,
            &sample,
            &self.config.obstacles,
            self.config.collision_samples,
        ) {
            trace!(
                "iter {}: extension from node {} to ({:.3}, {:.3}) blocked",
                self.iterations,
                nearest_idx,
                sample.x,
                sample.y
            );
            return self.check_budget();
        }
        let new_idx = self.tree.push(sample, nearest_idx);
        trace!(
            "iter {}: node {} at ({:.3}, {:.3}) under {}",
            self.iterations,
            new_idx,
            sample.x,
            sample.y,
            nearest_idx
        );

        if !segment_collides(
            &sample,
            &self.goal,
            &self.config.obstacles,
            self.config.collision_samples,
        ) {
            self.tree.push(self.goal, new_idx);
            self.state = PlannerState::Succeeded;
            debug!(
                "Goal connected after {} iterations, tree of {} nodes",
                self.iterations,
                self.tree.len()
            );
            return self.state;
        }

        self.refresh_sectors(new_idx);
        self.check_budget()
    }

    /// Run to completion
    pub fn plan(self) -> RrtResult {
        self.plan_with_observer(&mut |_: &PlannerSnapshot<'_>| {})
    }

    /// Run to completion, reporting to `observer` after every iteration
    pub fn plan_with_observer(mut self, observer: &mut dyn PlanObserver) -> RrtResult {
        while self.state == PlannerState::Running {
            self.step();
            observer.on_iteration(&self.snapshot_view());
        }
        self.into_result()
    }

    /// Finish the session and hand over the tree
    pub fn into_result(self) -> RrtResult {
        let path = self.path().unwrap_or_default();
        let success = self.state == PlannerState::Succeeded;
        if !success {
            debug!(
                "No path after {} iterations ({} nodes)",
                self.iterations,
                self.tree.len()
            );
        }
        RrtResult {
            path,
            tree: self.tree.into_nodes(),
            success,
            iterations: self.iterations,
            state: self.state,
            cancelled: self.cancelled,
            feedback_failures: self.feedback_failures,
        }
    }

    fn check_budget(&mut self) -> PlannerState {
        if self.state == PlannerState::Running && self.iterations >= self.config.max_iterations {
            self.state = PlannerState::Exhausted;
        }
        self.state
    }

    /// Sample inside a chosen sector around the frontier, or uniformly
    fn sample_point(&mut self) -> Point {
        let Some(sector) = self.sampler.select_sector(&self.sectors).copied() else {
            return self.sampler.sample_uniform();
        };
        let frontier = self.tree.frontier().1.position();
        let radius = self.config.step_size;

        match self.config.sector_retry_limit {
            None => self.sampler.sample_in_sector(&frontier, &sector, radius),
            Some(limit) => self
                .sampler
                .try_sample_in_sector(&frontier, &sector, radius, limit)
                .unwrap_or_else(|| {
                    trace!("sector {:?} out of bounds {} times, sampling uniformly", sector, limit);
                    self.sampler.sample_uniform()
                }),
        }
    }

    /// Replace the sector set with the advisor's view from node `origin_idx`
    fn refresh_sectors(&mut self, origin_idx: usize) {
        let nodes = self.tree.nodes();
        let origin = &nodes[origin_idx];
        let ctx = FeedbackContext {
            origin_index: origin_idx,
            origin,
            goal: self.goal,
            nodes,
            obstacles: &self.config.obstacles,
            bounds: &self.config.bounds,
        };

        match self
            .advisor
            .propose(&ctx)
            .and_then(|proposals| validate_proposals(&proposals))
        {
            Ok(sectors) => {
                trace!("advisor proposed {} sectors", sectors.len());
                self.sectors = sectors;
            }
            Err(e) => {
                self.feedback_failures += 1;
                warn!("{e}; falling back to goal bearing");
                self.sectors = vec![default_sector(&origin.position(), &self.goal)];
            }
        }
    }

    /// Configured start position
    pub fn start(&self) -> Point {
        self.start
    }

    /// Configured goal position
    pub fn goal(&self) -> Point {
        self.goal
    }
}
