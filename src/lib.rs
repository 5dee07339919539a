pub mod density;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod planner;
pub mod sensing;
pub mod system;

pub use error::PlannerError;
pub use planner::{PlannerConfig, PlannerContext, PlannerVolumes, Rejection, ViewpointPlanner};
