//! Library error types.

use thiserror::Error;

/// Errors surfaced while building or configuring a planner.
///
/// Sampling and acceptance outcomes are not errors; see
/// [`crate::planner::Rejection`].
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid planner configuration: {0}")]
    Config(String),

    #[error("failed to read planner configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse planner configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
