//! Adaptive spacing for frontier expansion.

use nalgebra::Vector3;

use crate::geometry::BoundingBox;

use super::PlannerConfig;

/// Expansion step that widens once a position leaves the exploration volume.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationStep {
    pub bbox: BoundingBox,
    pub base: f64,
    pub max: f64,
    /// Distance outside `bbox` where dilation begins.
    pub dilation_start: f64,
    pub dilation_speed: f64,
    pub squared: bool,
}

impl ExplorationStep {
    pub fn from_config(config: &PlannerConfig, bbox: BoundingBox) -> Self {
        Self {
            bbox,
            base: config.exploration_step,
            max: config.exploration_step_max,
            dilation_start: config.exploration_dilation_start_bbox_distance,
            dilation_speed: config.exploration_dilation_speed,
            squared: config.exploration_dilation_squared,
        }
    }

    /// Step size at `position`, capped at `max`.
    pub fn step_at(&self, position: &Vector3<f64>) -> f64 {
        let mut step = self.base;
        if self.bbox.is_outside(position) {
            let dilation = self.bbox.distance_to(position) - self.dilation_start;
            if dilation > 0.0 {
                step += if self.squared {
                    self.dilation_speed * dilation * dilation
                } else {
                    self.dilation_speed * dilation
                };
            }
        }
        step.min(self.max)
    }
}
