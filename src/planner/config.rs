//! Planner configuration.

use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Options recognized by the viewpoint planner.
///
/// Every field has a default, so a JSON file only needs to list the options
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Minimum number of observed voxels with non-zero information.
    pub min_voxel_count: usize,
    /// Minimum total information of an accepted viewpoint.
    pub min_information: f64,

    /// Squared camera-to-voxel distance below which a voxel counts as too close.
    pub voxel_distance_threshold: f64,
    /// Fraction of too-close voxels that flags a candidate.
    pub max_too_close_voxel_ratio: f64,
    /// Reject flagged candidates instead of only logging them.
    pub enforce_too_close_voxel_ratio: bool,

    /// Number of neighbours inspected by closeness rejection.
    pub discard_dist_knn: usize,
    /// Squared distance below which a neighbour counts as close.
    pub discard_dist_thres_square: f64,
    /// Maximum number of close neighbours before a candidate is rejected.
    pub discard_dist_count_thres: usize,
    /// Squared distance to a real viewpoint below which a candidate is rejected.
    pub discard_dist_real_thres_square: f64,

    /// Probability of sampling uniformly instead of around a reference.
    pub sample_without_reference_probability: f64,

    pub exploration_step: f64,
    pub exploration_step_max: f64,
    /// Distance outside the exploration bbox at which step dilation starts.
    pub exploration_dilation_start_bbox_distance: f64,
    pub exploration_dilation_speed: f64,
    /// Grow the step quadratically instead of linearly with distance.
    pub exploration_dilation_squared: bool,
    pub exploration_angular_dist_threshold_degrees: f64,
    /// Orientation samples tried per expansion direction.
    pub exploration_num_orientations: usize,

    /// Skip raycasting; closeness is then the only acceptance test.
    pub no_raycast: bool,
    /// Fixed position to bootstrap sampling around.
    pub start_position: Option<[f64; 3]>,

    pub count_grid_enable: bool,
    pub count_grid_dimensions: [usize; 3],
    pub distribution_exp_factor: f64,
    pub grid_exp_factor: f64,

    /// Failures tolerated while only one virtual viewpoint exists before the
    /// graph is reset.
    pub max_failed_second_viewpoint_samples: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_voxel_count: 100,
            min_information: 0.0,
            voxel_distance_threshold: 1.0,
            max_too_close_voxel_ratio: 0.3,
            enforce_too_close_voxel_ratio: false,
            discard_dist_knn: 10,
            discard_dist_thres_square: 4.0,
            discard_dist_count_thres: 3,
            discard_dist_real_thres_square: 4.0,
            sample_without_reference_probability: 0.2,
            exploration_step: 2.0,
            exploration_step_max: 10.0,
            exploration_dilation_start_bbox_distance: 0.0,
            exploration_dilation_speed: 0.1,
            exploration_dilation_squared: false,
            exploration_angular_dist_threshold_degrees: 45.0,
            exploration_num_orientations: 1,
            no_raycast: false,
            start_position: None,
            count_grid_enable: true,
            count_grid_dimensions: [10, 10, 10],
            distribution_exp_factor: 1.0,
            grid_exp_factor: 2.0,
            max_failed_second_viewpoint_samples: 50,
        }
    }
}

impl PlannerConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.sample_without_reference_probability) {
            return Err(PlannerError::Config(format!(
                "sample_without_reference_probability must be in [0, 1], got {}",
                self.sample_without_reference_probability
            )));
        }
        if self.exploration_step <= 0.0 {
            return Err(PlannerError::Config(format!(
                "exploration_step must be positive, got {}",
                self.exploration_step
            )));
        }
        if self.exploration_step_max < self.exploration_step {
            return Err(PlannerError::Config(format!(
                "exploration_step_max ({}) is smaller than exploration_step ({})",
                self.exploration_step_max, self.exploration_step
            )));
        }
        if self.count_grid_dimensions.iter().any(|&d| d == 0) {
            return Err(PlannerError::Config(
                "count_grid_dimensions must have at least one cell per axis".to_string(),
            ));
        }
        let non_negative = [
            ("voxel_distance_threshold", self.voxel_distance_threshold),
            ("discard_dist_thres_square", self.discard_dist_thres_square),
            ("discard_dist_real_thres_square", self.discard_dist_real_thres_square),
            ("exploration_dilation_speed", self.exploration_dilation_speed),
            ("exploration_angular_dist_threshold_degrees", self.exploration_angular_dist_threshold_degrees),
            ("distribution_exp_factor", self.distribution_exp_factor),
            ("grid_exp_factor", self.grid_exp_factor),
        ];
        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(PlannerError::Config(format!("{name} must be non-negative, got {value}")));
            }
        }
        Ok(())
    }

    pub fn start_position(&self) -> Option<Vector3<f64>> {
        self.start_position.map(Vector3::from)
    }

    pub fn exploration_angular_dist_threshold(&self) -> f64 {
        self.exploration_angular_dist_threshold_degrees.to_radians()
    }
}
