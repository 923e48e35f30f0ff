//! Runs a scene through the sector RRT planner and produces a report.

use std::path::Path;
use std::time::Instant;

use sector_rrt_algo::path_planning::{CancelToken, SectorRrtPlanner};
use tracing::{info, warn};

use crate::error::Result;
use crate::history::IterationHistory;
use crate::report::PlanningReport;
use crate::scene::SceneConfig;

/// Drives one planning session for a scene
pub struct SceneRunner {
    scene: SceneConfig,
    cancel: CancelToken,
}

impl SceneRunner {
    pub fn new(scene: SceneConfig) -> Self {
        Self {
            scene,
            cancel: CancelToken::new(),
        }
    }

    /// Token that stops the run at the next iteration boundary
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn scene(&self) -> &SceneConfig {
        &self.scene
    }

    /// Plan the scene; the report is also written if the scene names a path
    pub fn run(&self) -> Result<PlanningReport> {
        let config = self.scene.planner_config();
        let start = config.start_point();
        let goal = config.goal_point();

        let planner = SectorRrtPlanner::new(config, self.scene.advisor.build())?
            .with_cancel_token(self.cancel.clone());
        let mut history = IterationHistory::new(self.scene.output.history_len);

        info!(
            "Planning ({:.2}, {:.2}) -> ({:.2}, {:.2}) with {:?} advisor",
            start.x, start.y, goal.x, goal.y, self.scene.advisor.kind
        );
        let started = Instant::now();
        let result = planner.plan_with_observer(&mut history);
        let elapsed = started.elapsed();

        let report = PlanningReport::new(result, start, goal, elapsed, history);
        if report.success {
            info!(
                "Path found in {:.2} s: {} waypoints, length {:.3} (straight line {:.3}), {} iterations",
                elapsed.as_secs_f64(),
                report.path.len(),
                report.path_length,
                report.euclidean_distance,
                report.iterations
            );
        } else if report.cancelled {
            warn!("Planning cancelled after {} iterations", report.iterations);
        } else {
            info!("No path found after {} iterations", report.iterations);
        }
        if report.feedback_failures > 0 {
            warn!(
                "{} advisor calls failed and fell back to the goal bearing",
                report.feedback_failures
            );
        }

        if let Some(path) = &self.scene.output.report_path {
            report.write_json(Path::new(path))?;
            info!("Report written to {}", path);
        }
        Ok(report)
    }
}
