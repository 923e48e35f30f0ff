//! Path planning algorithms
//!
//! This module provides a sector-biased RRT for a bounded 2D plane with
//! circular obstacles:
//! - geometry: bounds, obstacles, discretized segment collision checks
//! - tree: append-only node arena with nearest-neighbor lookup
//! - sampler: uniform and sector-biased sampling
//! - feedback: the external sector advisor boundary
//! - rrt: the planner state machine

pub mod error;
pub mod feedback;
pub mod geometry;
pub mod rrt;
pub mod sampler;
pub mod tree;

pub use error::{FeedbackError, PlanningError};
pub use feedback::{
    default_sector, from_fn, parse_advisory_payload, validate_proposals, AdvisoryResponse,
    FeedbackContext, FnAdvisor, GoalBearingAdvisor, NoAdvice, PayloadAdvisor, SectorAdvisor,
    SectorProposal, TimeoutAdvisor,
};
pub use geometry::{is_collision_free, segment_collides, Bounds, CircleObstacle, Point};
pub use rrt::{
    CancelToken, PlanObserver, PlannerSnapshot, PlannerState, RrtResult, SectorRrtConfig,
    SectorRrtPlanner, TreeSnapshot,
};
pub use sampler::{Sector, SectorSampler};
pub use tree::{RrtNode, RrtTree};
