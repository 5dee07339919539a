//! Acceptance filter stages.
//!
//! Each check returns `Ok` to pass the candidate on to the next stage or the
//! [`Rejection`] that stopped it. None of them touch shared state; the caller
//! decides which lock (if any) the inputs were read under.

use nalgebra::Vector3;
use tracing::warn;

use crate::geometry::Pose;
use crate::graph::{EntryStore, Neighbor, ViewpointEntry};
use crate::sensing::{RaycastOracle, RaycastResult, Viewpoint, VoxelWithInformationSet};

use super::exploration::ExplorationStep;
use super::{PlannerConfig, Rejection};

/// Relative squared step below which an expansion candidate duplicates a
/// neighbour.
const DUPLICATE_STEP_FACTOR: f64 = 0.6;

/// Closeness rejection over the `k` nearest committed entries.
///
/// A real viewpoint inside the real-exclusion radius rejects immediately.
/// Otherwise the candidate is rejected once more than
/// `discard_dist_count_thres` neighbours lie inside the general radius.
pub fn check_closeness(
    neighbors: &[Neighbor],
    num_real_viewpoints: usize,
    config: &PlannerConfig,
) -> Result<(), Rejection> {
    let mut too_close_count = 0;
    for neighbor in neighbors {
        if neighbor.index.0 < num_real_viewpoints
            && neighbor.squared_distance < config.discard_dist_real_thres_square
        {
            return Err(Rejection::TooCloseToRealViewpoint);
        }
        if neighbor.squared_distance < config.discard_dist_thres_square {
            too_close_count += 1;
            if too_close_count > config.discard_dist_count_thres {
                break;
            }
        }
    }
    if too_close_count > config.discard_dist_count_thres {
        return Err(Rejection::TooManyCloseViewpoints);
    }
    Ok(())
}

/// Duplicate test for frontier expansion.
///
/// The spacing used is the smallest exploration step among the candidate
/// and the neighbours inspected so far; a neighbour closer than that in
/// position and within `angular_threshold` in orientation is a duplicate.
pub fn check_exploration_duplicate(
    pose: &Pose,
    neighbors: &[Neighbor],
    store: &EntryStore,
    exploration: &ExplorationStep,
    angular_threshold: f64,
) -> Result<(), Rejection> {
    let mut step = exploration.step_at(&pose.translation);
    for neighbor in neighbors {
        let Some(other) = store.entry(neighbor.index) else {
            continue;
        };
        let other_pose = other.pose();
        step = step.min(exploration.step_at(&other_pose.translation));
        let squared_threshold = DUPLICATE_STEP_FACTOR * step * step;
        if neighbor.squared_distance < squared_threshold
            && pose.angular_distance_to(other_pose) < angular_threshold
        {
            return Err(Rejection::DuplicateOrientation);
        }
    }
    Ok(())
}

/// Fraction of `voxels` whose center lies within the squared distance
/// `threshold` of `position`. Zero for an empty set.
pub fn too_close_voxel_ratio(
    position: &Vector3<f64>,
    voxels: &VoxelWithInformationSet,
    threshold: f64,
) -> f64 {
    if voxels.is_empty() {
        return 0.0;
    }
    let too_close = voxels
        .iter()
        .filter(|v| (position - v.voxel.bbox.center()).norm_squared() < threshold)
        .count();
    too_close as f64 / voxels.len() as f64
}

/// Raycast `viewpoint` and apply the voxel count, information and
/// camera-proximity stages.
pub fn evaluate_raycast(
    oracle: &dyn RaycastOracle,
    viewpoint: &Viewpoint,
    config: &PlannerConfig,
) -> Result<RaycastResult, Rejection> {
    let result = oracle.score(viewpoint, true).map_err(|err| {
        warn!(error = %err, "Raycast failed");
        Rejection::RaycastFailed
    })?;

    if result.voxels.len() < config.min_voxel_count {
        return Err(Rejection::TooFewVoxels);
    }
    if result.total_information < config.min_information {
        return Err(Rejection::InsufficientInformation);
    }

    let ratio = too_close_voxel_ratio(
        &viewpoint.pose().translation,
        &result.voxels,
        config.voxel_distance_threshold,
    );
    if ratio >= config.max_too_close_voxel_ratio {
        warn!(
            ratio,
            max_ratio = config.max_too_close_voxel_ratio,
            enforced = config.enforce_too_close_voxel_ratio,
            "Too many observed voxels close to the camera"
        );
        if config.enforce_too_close_voxel_ratio {
            return Err(Rejection::TooManyCloseVoxels);
        }
    }
    Ok(result)
}

/// Build the entry for an accepted candidate.
pub fn make_entry(viewpoint: Viewpoint, result: RaycastResult) -> ViewpointEntry {
    ViewpointEntry::new(viewpoint, result.total_information, result.voxels)
}
