//! Pose sampling: uniform, surrounding (jittered) and ROI-biased orientations.
//!
//! The planner core only depends on the `PoseSampler` trait. `BoxPoseSampler`
//! is a volume-based implementation: positions are drawn inside the pose
//! sampling box and kept only if the drone's own box fits around them;
//! orientations look toward a random point of the region of interest with a
//! small Gaussian perturbation.

use nalgebra::{UnitQuaternion, Vector3};

use crate::geometry::{BoundingBox, Pose};

use super::random::RandomSource;

/// Default number of position draws before a sample counts as not found.
const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// Below this length a look-at direction is treated as degenerate.
const MIN_DIRECTION_NORM: f64 = 1e-9;

pub trait PoseSampler: Send + Sync {
    /// Pose drawn uniformly inside the sampling volume.
    fn sample_uniform_pose(&self, rng: &mut dyn RandomSource) -> Option<Pose>;

    /// Pose drawn in the neighborhood of `reference`.
    fn sample_surrounding_pose(&self, reference: &Pose, rng: &mut dyn RandomSource) -> Option<Pose>;

    /// Orientation at `position` biased toward the region of interest.
    fn sample_biased_orientation(
        &self,
        position: &Vector3<f64>,
        rng: &mut dyn RandomSource,
    ) -> UnitQuaternion<f64>;

    /// Whether the drone can be placed at `position`.
    fn is_valid_position(&self, position: &Vector3<f64>) -> bool;
}

/// Volume-based pose sampler.
#[derive(Debug, Clone)]
pub struct BoxPoseSampler {
    /// Volume in which camera positions are sampled.
    pub sample_bbox: BoundingBox,
    /// Target volume that orientations are biased toward.
    pub roi_bbox: BoundingBox,
    /// Drone footprint, centered at the origin.
    pub drone_bbox: BoundingBox,
    /// Half side length of the cube used for surrounding samples.
    pub surrounding_radius: f64,
    /// Standard deviation (radians) of the look-at perturbation.
    pub orientation_stddev: f64,
    /// Position draws per call before giving up.
    pub max_attempts: usize,
}

impl BoxPoseSampler {
    pub fn new(sample_bbox: BoundingBox, roi_bbox: BoundingBox, drone_bbox: BoundingBox) -> Self {
        Self {
            sample_bbox,
            roi_bbox,
            drone_bbox,
            surrounding_radius: 2.0,
            orientation_stddev: 0.1,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    fn uniform_in_box(bbox: &BoundingBox, rng: &mut dyn RandomSource) -> Vector3<f64> {
        Vector3::new(
            rng.uniform_range(bbox.min.x, bbox.max.x),
            rng.uniform_range(bbox.min.y, bbox.max.y),
            rng.uniform_range(bbox.min.z, bbox.max.z),
        )
    }

    fn pose_at(&self, position: Vector3<f64>, rng: &mut dyn RandomSource) -> Pose {
        let rotation = self.sample_biased_orientation(&position, rng);
        Pose::new(position, rotation)
    }
}

impl PoseSampler for BoxPoseSampler {
    fn sample_uniform_pose(&self, rng: &mut dyn RandomSource) -> Option<Pose> {
        for _ in 0..self.max_attempts {
            let position = Self::uniform_in_box(&self.sample_bbox, rng);
            if self.is_valid_position(&position) {
                return Some(self.pose_at(position, rng));
            }
        }
        None
    }

    fn sample_surrounding_pose(&self, reference: &Pose, rng: &mut dyn RandomSource) -> Option<Pose> {
        let r = self.surrounding_radius;
        for _ in 0..self.max_attempts {
            let offset = Vector3::new(
                rng.uniform_range(-r, r),
                rng.uniform_range(-r, r),
                rng.uniform_range(-r, r),
            );
            let position = reference.translation + offset;
            if self.is_valid_position(&position) {
                return Some(self.pose_at(position, rng));
            }
        }
        None
    }

    fn sample_biased_orientation(
        &self,
        position: &Vector3<f64>,
        rng: &mut dyn RandomSource,
    ) -> UnitQuaternion<f64> {
        let target = Self::uniform_in_box(&self.roi_bbox, rng);
        let mut direction = target - position;
        if direction.norm() < MIN_DIRECTION_NORM {
            direction = Vector3::new(rng.standard_normal(), rng.standard_normal(), rng.standard_normal());
            if direction.norm() < MIN_DIRECTION_NORM {
                return UnitQuaternion::identity();
            }
        }
        let direction = direction.normalize();

        // Perturb the optical axis; the camera looks along +Z.
        let noise = Vector3::new(rng.standard_normal(), rng.standard_normal(), rng.standard_normal())
            * self.orientation_stddev;
        let mut axis = direction + noise;
        if axis.norm() < MIN_DIRECTION_NORM {
            axis = direction;
        }

        let up = if axis.cross(&Vector3::z()).norm() < 1e-6 * axis.norm() {
            Vector3::x()
        } else {
            Vector3::z()
        };
        UnitQuaternion::face_towards(&axis, &up)
    }

    fn is_valid_position(&self, position: &Vector3<f64>) -> bool {
        let footprint = BoundingBox::new(position + self.drone_bbox.min, position + self.drone_bbox.max);
        self.sample_bbox.contains(&footprint.min) && self.sample_bbox.contains(&footprint.max)
    }
}
