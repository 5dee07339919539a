//! Sampling engine and acceptance filter.
//!
//! This module contains:
//! - [`PlannerConfig`] - recognized options and their defaults
//! - [`ExplorationFrontier`] - entries pending axis-aligned expansion
//! - [`ExplorationStep`] - adaptive spacing for frontier expansion
//! - [`Rejection`] - why a candidate was not committed
//! - [`ViewpointPlanner`] - the strategies and the recovery policy

pub mod acceptance;
pub mod config;
pub mod exploration;
pub mod frontier;
pub mod result;
mod viewpoint_planner;

pub use config::PlannerConfig;
pub use exploration::ExplorationStep;
pub use frontier::ExplorationFrontier;
pub use result::Rejection;
pub use viewpoint_planner::{PlannerContext, PlannerVolumes, ViewpointPlanner};
