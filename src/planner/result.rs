//! Outcome of a single candidate attempt.

use std::fmt;

/// Why a candidate viewpoint was not committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// No pose could be produced by the sampling strategy.
    SampleNotFound,
    TooCloseToRealViewpoint,
    TooManyCloseViewpoints,
    /// Near an existing entry in both position and orientation.
    DuplicateOrientation,
    InvalidPosition,
    TooFewVoxels,
    InsufficientInformation,
    TooManyCloseVoxels,
    RaycastFailed,
    RejectedByCountGrid,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::SampleNotFound => "could not sample a pose",
            Rejection::TooCloseToRealViewpoint => "too close to a real viewpoint",
            Rejection::TooManyCloseViewpoints => "too many close viewpoints",
            Rejection::DuplicateOrientation => "duplicate of a nearby viewpoint",
            Rejection::InvalidPosition => "invalid position",
            Rejection::TooFewVoxels => "too few observed voxels",
            Rejection::InsufficientInformation => "insufficient information",
            Rejection::TooManyCloseVoxels => "too many voxels close to the camera",
            Rejection::RaycastFailed => "raycast failed",
            Rejection::RejectedByCountGrid => "rejected by viewpoint count grid",
        };
        f.write_str(reason)
    }
}
