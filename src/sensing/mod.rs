//! Contracts for the collaborators the planner consumes.
//!
//! The occupancy-map raycaster, the camera model, pose sampling and the
//! random source all live outside the graph-construction core. This module
//! defines the interfaces the core talks to, plus small default
//! implementations of the camera factory, the pose sampler and the random
//! source that are sufficient to drive the planner.

pub mod camera;
pub mod pose_sampler;
pub mod random;
pub mod raycast;
pub mod voxel;

pub use camera::{CameraModel, Viewpoint, ViewpointFactory, VirtualCamera};
pub use pose_sampler::{BoxPoseSampler, PoseSampler};
pub use random::RandomSource;
pub use raycast::{RaycastError, RaycastOracle, RaycastResult};
pub use voxel::{VoxelKey, VoxelRef, VoxelWithInformation, VoxelWithInformationSet};
