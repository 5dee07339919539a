//! Raycast oracle contract.
//!
//! The occupancy map scores a viewpoint by casting rays through it and
//! returning the voxels it observes together with their information. Invalid
//! queries (e.g. a camera outside the map) are reported as a typed error so
//! the planner can reject the candidate and continue.

use thiserror::Error;

use super::camera::Viewpoint;
use super::voxel::VoxelWithInformationSet;

/// Observed voxels and their summed information for one viewpoint.
#[derive(Debug, Clone, Default)]
pub struct RaycastResult {
    pub voxels: VoxelWithInformationSet,
    pub total_information: f64,
}

impl RaycastResult {
    /// Build a result whose total is the sum over `voxels`.
    pub fn from_voxels(voxels: VoxelWithInformationSet) -> Self {
        let total_information = voxels.total_information();
        Self {
            voxels,
            total_information,
        }
    }
}

/// Recoverable raycast failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RaycastError {
    #[error("invalid raycast query: {0}")]
    InvalidQuery(String),
    #[error("raycast origin ({x:.2}, {y:.2}, {z:.2}) lies outside the occupancy map")]
    OutOfBounds { x: f64, y: f64, z: f64 },
}

/// Occupancy-map raycaster.
///
/// Called concurrently from planner workers; implementations must not rely
/// on shared mutable scratch storage.
pub trait RaycastOracle: Send + Sync {
    /// Score `viewpoint`. With `ignore_zero_information`, voxels whose
    /// individual information is zero are left out of the returned set.
    fn score(
        &self,
        viewpoint: &Viewpoint,
        ignore_zero_information: bool,
    ) -> Result<RaycastResult, RaycastError>;
}
