//! Voxel handles returned by raycast queries.
//!
//! Voxels are owned by the occupancy map. The planner only ever holds
//! lightweight handles (`VoxelRef`) carrying the voxel's identity and its
//! bounding box, paired with the information score the raycast assigned.

use std::collections::HashMap;

use crate::geometry::BoundingBox;

/// Identity of an occupancy-map leaf cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoxelKey(pub u64);

impl std::fmt::Display for VoxelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "V{}", self.0)
    }
}

/// Handle to an occupancy-map leaf cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelRef {
    pub key: VoxelKey,
    pub bbox: BoundingBox,
}

/// A voxel together with the information it contributes to one viewpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelWithInformation {
    pub voxel: VoxelRef,
    pub information: f64,
}

/// Set of observed voxels, unique by voxel identity.
///
/// Inserting a voxel that is already present replaces its information
/// score rather than adding a second entry.
#[derive(Debug, Clone, Default)]
pub struct VoxelWithInformationSet {
    voxels: HashMap<VoxelKey, VoxelWithInformation>,
}

impl VoxelWithInformationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a voxel. Returns `true` if the voxel was not yet present.
    pub fn insert(&mut self, item: VoxelWithInformation) -> bool {
        self.voxels.insert(item.voxel.key, item).is_none()
    }

    pub fn contains(&self, key: VoxelKey) -> bool {
        self.voxels.contains_key(&key)
    }

    pub fn get(&self, key: VoxelKey) -> Option<&VoxelWithInformation> {
        self.voxels.get(&key)
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoxelWithInformation> {
        self.voxels.values()
    }

    /// Sum of the information of all voxels in the set.
    pub fn total_information(&self) -> f64 {
        self.voxels.values().map(|v| v.information).sum()
    }
}

impl FromIterator<VoxelWithInformation> for VoxelWithInformationSet {
    fn from_iter<I: IntoIterator<Item = VoxelWithInformation>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}
