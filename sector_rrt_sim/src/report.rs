//! Run report written after a scene has been planned.

use std::path::Path;
use std::time::Duration;

use sector_rrt_algo::nalgebra;
use sector_rrt_algo::path_planning::{PlannerState, Point, RrtNode, RrtResult};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::history::{IterationHistory, IterationRecord};

/// Outcome of one planning session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningReport {
    pub success: bool,
    pub state: PlannerState,
    pub cancelled: bool,
    /// Number of iterations (main loop iterations)
    pub iterations: usize,
    pub feedback_failures: usize,
    /// Path in world coordinates, start to goal
    pub path: Vec<[f64; 2]>,
    /// Path length in world units
    pub path_length: f64,
    /// Euclidean distance from start to goal (for optimality ratio)
    pub euclidean_distance: f64,
    pub elapsed_ms: f64,
    /// All tree nodes
    pub tree: Vec<RrtNode>,
    /// Most recent iteration records
    pub history: Vec<IterationRecord>,
}

impl PlanningReport {
    pub fn new(
        result: RrtResult,
        start: Point,
        goal: Point,
        elapsed: Duration,
        history: IterationHistory,
    ) -> Self {
        Self {
            success: result.success,
            state: result.state,
            cancelled: result.cancelled,
            iterations: result.iterations,
            feedback_failures: result.feedback_failures,
            path_length: compute_path_length(&result.path),
            path: result.path.iter().map(|n| [n.x, n.y]).collect(),
            euclidean_distance: nalgebra::distance(&start, &goal),
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            tree: result.tree,
            history: history.into_records(),
        }
    }

    /// Path length over straight-line distance; None without a path
    pub fn optimality_ratio(&self) -> Option<f64> {
        (self.success && self.euclidean_distance > 0.0)
            .then(|| self.path_length / self.euclidean_distance)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Compute total path length in world units
pub fn compute_path_length(path: &[RrtNode]) -> f64 {
    if path.len() < 2 {
        return 0.0;
    }
    path.windows(2)
        .map(|w| nalgebra::distance(&w[0].position(), &w[1].position()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn result_with_path(path: Vec<RrtNode>) -> RrtResult {
        RrtResult {
            success: !path.is_empty(),
            state: if path.is_empty() {
                PlannerState::Exhausted
            } else {
                PlannerState::Succeeded
            },
            tree: path.clone(),
            path,
            iterations: 4,
            cancelled: false,
            feedback_failures: 1,
        }
    }

    #[test]
    fn test_path_length() {
        let path = vec![
            RrtNode::new(0.0, 0.0),
            RrtNode::with_parent(3.0, 4.0, 0),
            RrtNode::with_parent(3.0, 10.0, 1),
        ];
        assert_relative_eq!(compute_path_length(&path), 11.0);
        assert_eq!(compute_path_length(&path[..1]), 0.0);
        assert_eq!(compute_path_length(&[]), 0.0);
    }

    #[test]
    fn test_report_metrics() {
        let path = vec![
            RrtNode::new(0.0, 0.0),
            RrtNode::with_parent(3.0, 4.0, 0),
            RrtNode::with_parent(6.0, 0.0, 1),
        ];
        let report = PlanningReport::new(
            result_with_path(path),
            Point::new(0.0, 0.0),
            Point::new(6.0, 0.0),
            Duration::from_millis(12),
            IterationHistory::new(4),
        );
        assert!(report.success);
        assert_relative_eq!(report.path_length, 10.0);
        assert_relative_eq!(report.euclidean_distance, 6.0);
        assert_relative_eq!(report.optimality_ratio().unwrap(), 10.0 / 6.0);
        assert_relative_eq!(report.elapsed_ms, 12.0, epsilon = 1e-9);
        assert_eq!(report.path[1], [3.0, 4.0]);
    }

    #[test]
    fn test_failed_report_has_no_ratio() {
        let report = PlanningReport::new(
            result_with_path(Vec::new()),
            Point::new(0.0, 0.0),
            Point::new(6.0, 0.0),
            Duration::ZERO,
            IterationHistory::new(4),
        );
        assert!(report.optimality_ratio().is_none());
    }

    #[test]
    fn test_write_json_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let report = PlanningReport::new(
            result_with_path(vec![RrtNode::new(1.0, 1.0), RrtNode::with_parent(2.0, 2.0, 0)]),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Duration::from_millis(1),
            IterationHistory::new(4),
        );
        report.write_json(&path).unwrap();

        let parsed: PlanningReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.path, report.path);
        assert_eq!(parsed.state, PlannerState::Succeeded);
    }
}
