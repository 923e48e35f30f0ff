#![warn(clippy::all, rust_2018_idioms)]

pub mod error;
pub mod history;
pub mod report;
pub mod runner;
pub mod scene;

pub use error::{Result, SimError};
pub use runner::SceneRunner;
pub use scene::SceneConfig;

pub mod prelude {
    pub use crate::history::{IterationHistory, IterationRecord};
    pub use crate::report::{compute_path_length, PlanningReport};
    pub use crate::runner::SceneRunner;
    pub use crate::scene::{AdvisorKind, SceneConfig};
}
