//! Geometry utilities: camera poses and axis-aligned bounding boxes.

pub mod bbox;
pub mod pose;

pub use bbox::BoundingBox;
pub use pose::Pose;
