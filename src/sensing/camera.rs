//! Virtual camera model and viewpoints.

use std::sync::Arc;

use crate::geometry::Pose;

/// Pinhole camera intrinsics shared by every virtual viewpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// Maximum raycast range in meters.
    pub max_range: f64,
}

impl CameraModel {
    /// Square-pixel camera with the principal point at the image center.
    pub fn with_focal_length(width: u32, height: u32, focal_length: f64, max_range: f64) -> Self {
        Self {
            width,
            height,
            fx: focal_length,
            fy: focal_length,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
            max_range,
        }
    }

    /// Horizontal field of view in radians.
    pub fn horizontal_fov(&self) -> f64 {
        2.0 * (self.width as f64 / (2.0 * self.fx)).atan()
    }
}

/// A camera bound to a pose. Only used to query the raycast oracle.
#[derive(Debug, Clone)]
pub struct Viewpoint {
    camera: Arc<CameraModel>,
    pose: Pose,
}

impl Viewpoint {
    pub fn new(camera: Arc<CameraModel>, pose: Pose) -> Self {
        Self { camera, pose }
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }
}

/// Builds viewpoints from sampled poses.
pub trait ViewpointFactory: Send + Sync {
    fn make_viewpoint(&self, pose: Pose) -> Viewpoint;
}

/// Factory handing out viewpoints that share one camera model.
#[derive(Debug, Clone)]
pub struct VirtualCamera {
    model: Arc<CameraModel>,
}

impl VirtualCamera {
    pub fn new(model: CameraModel) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    pub fn model(&self) -> &CameraModel {
        &self.model
    }
}

impl ViewpointFactory for VirtualCamera {
    fn make_viewpoint(&self, pose: Pose) -> Viewpoint {
        Viewpoint::new(Arc::clone(&self.model), pose)
    }
}
