//! Error types for sector RRT planning

use std::time::Duration;

use thiserror::Error;

/// Planner construction error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Failure of the external sector advisor.
///
/// The planner never surfaces these; it logs them and substitutes a
/// default sector pointing at the goal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedbackError {
    #[error("Feedback unavailable: {0}")]
    Unavailable(String),

    #[error("Feedback timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed feedback: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for FeedbackError {
    fn from(e: serde_json::Error) -> Self {
        FeedbackError::Malformed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlanningError>;
