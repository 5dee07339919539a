//! Camera pose in the shared world frame.
//!
//! A `Pose` is the image-to-world transformation of a viewpoint: the camera
//! center in world coordinates plus the camera orientation as a unit
//! quaternion. Poses are small `Copy` values and are passed around freely.

use nalgebra::{UnitQuaternion, Vector3};

/// Camera pose (T_wc: camera to world).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Camera center in world coordinates.
    pub translation: Vector3<f64>,
    /// Camera orientation (camera to world rotation).
    pub rotation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Pose at `position` with identity orientation.
    pub fn from_position(position: Vector3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    pub fn identity() -> Self {
        Self::from_position(Vector3::zeros())
    }

    /// Angle in radians of the rotation taking this orientation to `other`'s.
    pub fn angular_distance_to(&self, other: &Pose) -> f64 {
        self.rotation.angle_to(&other.rotation)
    }

    /// Squared Euclidean distance between the two camera centers.
    pub fn squared_distance_to(&self, other: &Pose) -> f64 {
        (self.translation - other.translation).norm_squared()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_angular_distance_identity() {
        let a = Pose::from_position(Vector3::new(1.0, 2.0, 3.0));
        let b = Pose::identity();
        assert_relative_eq!(a.angular_distance_to(&b), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_angular_distance_quarter_turn() {
        let a = Pose::identity();
        let b = Pose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        assert_relative_eq!(a.angular_distance_to(&b), FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(b.angular_distance_to(&a), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_squared_distance() {
        let a = Pose::from_position(Vector3::new(1.0, 0.0, 0.0));
        let b = Pose::from_position(Vector3::new(1.0, 3.0, 4.0));
        assert_relative_eq!(a.squared_distance_to(&b), 25.0);
    }
}
