//! Committed viewpoint entries and their per-entry metadata.

use crate::geometry::Pose;
use crate::sensing::{Viewpoint, VoxelWithInformationSet};

use super::types::ViewpointEntryIndex;

/// A committed viewpoint.
///
/// Entries are immutable once committed; the store only ever moves them.
#[derive(Debug, Clone)]
pub struct ViewpointEntry {
    pub viewpoint: Viewpoint,
    pub total_information: f64,
    pub voxel_set: VoxelWithInformationSet,
}

impl ViewpointEntry {
    pub fn new(viewpoint: Viewpoint, total_information: f64, voxel_set: VoxelWithInformationSet) -> Self {
        Self {
            viewpoint,
            total_information,
            voxel_set,
        }
    }

    /// Entry for a viewpoint that was committed without raycasting.
    pub fn without_observations(viewpoint: Viewpoint) -> Self {
        Self::new(viewpoint, 0.0, VoxelWithInformationSet::new())
    }

    #[inline]
    pub fn pose(&self) -> &Pose {
        self.viewpoint.pose()
    }
}

/// Auxiliary per-entry bookkeeping, stored parallel to the entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryMeta {
    /// Stereo partner chosen by the stereo collaborator, if any.
    pub stereo_partner: Option<ViewpointEntryIndex>,
    /// Whether the stereo collaborator has processed this entry.
    pub stereo_computed: bool,
    /// Visitation-grid cell this entry was counted in.
    pub grid_cell: Option<usize>,
}
