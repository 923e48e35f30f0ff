//! Iteration history with a circular buffer, recorded as the planner runs.

use std::collections::VecDeque;

use sector_rrt_algo::path_planning::{PlanObserver, PlannerSnapshot, PlannerState};
use serde::{Deserialize, Serialize};

/// Default maximum number of iteration records kept
pub const DEFAULT_HISTORY_LEN: usize = 1000;

/// Summary of the planner after one iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub state: PlannerState,
    pub tree_len: usize,
    pub sector_count: usize,
    /// Most recently appended node
    pub frontier: [f64; 2],
}

/// Keeps the most recent iteration records.
///
/// Older records are dropped once `max_len` is exceeded; `step_count` keeps
/// counting so the window can be placed on the full run.
#[derive(Debug, Clone)]
pub struct IterationHistory {
    records: VecDeque<IterationRecord>,
    max_len: usize,
    step_count: usize,
    /// Iterations whose extension added a node
    extensions: usize,
}

impl IterationHistory {
    /// Create a history with the specified maximum length.
    pub fn new(max_len: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_len.min(DEFAULT_HISTORY_LEN)),
            max_len,
            step_count: 0,
            extensions: 0,
        }
    }

    /// Push a record and increment the step count.
    pub fn push(&mut self, record: IterationRecord) {
        if let Some(prev) = self.records.back() {
            if record.tree_len > prev.tree_len {
                self.extensions += 1;
            }
        } else if record.tree_len > 1 {
            self.extensions += 1;
        }
        self.records.push_back(record);
        self.step_count += 1;

        // Maintain circular buffer behavior
        if self.records.len() > self.max_len {
            self.records.pop_front();
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &IterationRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.back()
    }

    /// Total number of records pushed, including dropped ones.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Number of iterations that grew the tree.
    pub fn extensions(&self) -> usize {
        self.extensions
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<IterationRecord> {
        self.records.into()
    }
}

impl PlanObserver for IterationHistory {
    fn on_iteration(&mut self, snapshot: &PlannerSnapshot<'_>) {
        let frontier = snapshot
            .nodes
            .last()
            .map(|n| [n.x, n.y])
            .unwrap_or_default();
        self.push(IterationRecord {
            iteration: snapshot.iteration,
            state: snapshot.state,
            tree_len: snapshot.nodes.len(),
            sector_count: snapshot.sectors.len(),
            frontier,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(iteration: usize, tree_len: usize) -> IterationRecord {
        IterationRecord {
            iteration,
            state: PlannerState::Running,
            tree_len,
            sector_count: 0,
            frontier: [0.0, 0.0],
        }
    }

    #[test]
    fn test_circular_buffer_drops_oldest() {
        let mut history = IterationHistory::new(3);
        assert!(history.is_empty());
        for i in 1..=5 {
            history.push(record(i, 1));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.step_count(), 5);
        assert_eq!(history.records().next().unwrap().iteration, 3);
        assert_eq!(history.last().unwrap().iteration, 5);
    }

    #[test]
    fn test_counts_extensions() {
        let mut history = IterationHistory::new(10);
        history.push(record(1, 2));
        history.push(record(2, 2));
        history.push(record(3, 3));
        history.push(record(4, 4));
        assert_eq!(history.extensions(), 3);
    }

    #[test]
    fn test_observes_planner() {
        use sector_rrt_algo::path_planning::{Bounds, NoAdvice, SectorRrtConfig, SectorRrtPlanner};

        let config = SectorRrtConfig {
            bounds: Bounds::new(0.0, 0.0, 10.0, 10.0),
            start: [0.0, 0.0],
            goal: [10.0, 10.0],
            seed: Some(1),
            ..Default::default()
        };
        let mut history = IterationHistory::new(8);
        let result = SectorRrtPlanner::new(config, NoAdvice)
            .unwrap()
            .plan_with_observer(&mut history);
        assert!(result.success);
        assert_eq!(history.step_count(), result.iterations);
        let last = history.last().unwrap();
        assert_eq!(last.state, PlannerState::Succeeded);
        assert_eq!(last.frontier, [10.0, 10.0]);
        assert_eq!(last.tree_len, result.tree.len());
    }
}
