//! Error types for the scene runner

use sector_rrt_algo::path_planning::PlanningError;
use thiserror::Error;

/// Scene runner error type
#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_json::Error),
}

impl From<serde_yaml::Error> for SimError {
    fn from(e: serde_yaml::Error) -> Self {
        SimError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
