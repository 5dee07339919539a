//! Incremental nearest-neighbor index over committed viewpoint positions.

use nalgebra::Vector3;
use rstar::primitives::GeomWithData;
use rstar::RTree;

use super::types::ViewpointEntryIndex;

/// One result of a k-nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: ViewpointEntryIndex,
    pub squared_distance: f64,
}

/// Nearest-neighbor index grown one point per committed entry.
///
/// The n-th added point carries index n. Queries may be approximate but must
/// return neighbors ordered by increasing distance.
pub trait SpatialIndex: Send + Sync {
    /// Add a point and return the index assigned to it.
    fn add_point(&mut self, position: Vector3<f64>) -> ViewpointEntryIndex;

    /// Up to `k` nearest points to `position`, closest first.
    fn knn(&self, position: &Vector3<f64>, k: usize) -> Vec<Neighbor>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// R*-tree backed spatial index. Queries are exact.
pub struct RTreeSpatialIndex {
    tree: RTree<IndexedPoint>,
    len: usize,
}

impl RTreeSpatialIndex {
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            len: 0,
        }
    }
}

impl Default for RTreeSpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RTreeSpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RTreeSpatialIndex")
            .field("len", &self.len)
            .finish()
    }
}

impl SpatialIndex for RTreeSpatialIndex {
    fn add_point(&mut self, position: Vector3<f64>) -> ViewpointEntryIndex {
        let index = self.len;
        self.tree
            .insert(GeomWithData::new([position.x, position.y, position.z], index));
        self.len += 1;
        ViewpointEntryIndex(index)
    }

    fn knn(&self, position: &Vector3<f64>, k: usize) -> Vec<Neighbor> {
        self.tree
            .nearest_neighbor_iter_with_distance_2(&[position.x, position.y, position.z])
            .take(k)
            .map(|(point, squared_distance)| Neighbor {
                index: ViewpointEntryIndex(point.data),
                squared_distance,
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.tree = RTree::new();
        self.len = 0;
    }
}
