//! Axis-aligned bounding boxes.
//!
//! Used for the pose sampling volume, the exploration volume, the region of
//! interest and the visitation grid extent. Boxes are closed: points on the
//! boundary are inside.

use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl BoundingBox {
    /// Create a box from its two corners.
    ///
    /// Panics if `min` exceeds `max` on any axis.
    pub fn new(min: Vector3<f64>, max: Vector3<f64>) -> Self {
        assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "bounding box min corner must not exceed max corner"
        );
        Self { min, max }
    }

    /// Box centered at `center` with full side lengths `extent`.
    pub fn from_center_extent(center: Vector3<f64>, extent: Vector3<f64>) -> Self {
        let half = extent.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vector3<f64> {
        (self.min + self.max) * 0.5
    }

    /// Side lengths along x, y and z.
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    pub fn is_outside(&self, point: &Vector3<f64>) -> bool {
        !self.contains(point)
    }

    /// Euclidean distance from `point` to the closest point of the box.
    ///
    /// Zero for points inside the box.
    pub fn distance_to(&self, point: &Vector3<f64>) -> f64 {
        let mut sq = 0.0;
        for i in 0..3 {
            let d = if point[i] < self.min[i] {
                self.min[i] - point[i]
            } else if point[i] > self.max[i] {
                point[i] - self.max[i]
            } else {
                0.0
            };
            sq += d * d;
        }
        sq.sqrt()
    }
}
