pub mod path_planning;

pub mod prelude {
    pub use crate::path_planning;
    pub use path_planning::{
        Bounds, CancelToken, CircleObstacle, FeedbackContext, FeedbackError, GoalBearingAdvisor,
        NoAdvice, PlanObserver, PlannerSnapshot, PlannerState, PlanningError, Point, RrtNode,
        RrtResult, Sector, SectorAdvisor, SectorProposal, SectorRrtConfig, SectorRrtPlanner,
        TimeoutAdvisor,
    };
    pub use nalgebra;
}

pub use prelude::*;
