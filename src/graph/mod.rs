//! Viewpoint graph module - the committed-viewpoint repository.
//!
//! This module contains:
//! - [`ViewpointEntryIndex`] - stable handle into the entry store
//! - [`ViewpointEntry`] - a committed viewpoint with its observed voxels
//! - [`SpatialIndex`] - incremental nearest-neighbor index over positions
//! - [`ViewpointGraph`] - node set over entry indices with cached components
//! - [`EntryStore`] - append-only store keeping all of the above in lockstep
//!
//! # Parallel arrays
//!
//! Every committed entry occupies the same slot in the entry array, the
//! per-entry metadata array, the spatial index and the graph node set. The
//! store is the only place indices are assigned, so these lengths are equal
//! after every commit.

pub mod entry;
pub mod spatial_index;
pub mod store;
pub mod types;
pub mod viewpoint_graph;

pub use entry::{EntryMeta, ViewpointEntry};
pub use spatial_index::{Neighbor, RTreeSpatialIndex, SpatialIndex};
pub use store::{DensitySettings, EntryStore};
pub use types::ViewpointEntryIndex;
pub use viewpoint_graph::{ConnectedComponents, ViewpointGraph};
