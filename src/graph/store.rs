//! Entry store - the single authority for viewpoint index assignment.
//!
//! A commit appends the entry, grows the spatial index and the graph by one,
//! and updates the visitation grid and sampling distribution. The store is
//! not synchronized itself; `SharedState` wraps it in a lock so that each
//! commit is observed atomically by concurrent readers.

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::density::{SamplingDistribution, VisitationGrid};
use crate::planner::PlannerConfig;

use super::entry::{EntryMeta, ViewpointEntry};
use super::spatial_index::{Neighbor, RTreeSpatialIndex, SpatialIndex};
use super::types::ViewpointEntryIndex;
use super::viewpoint_graph::ViewpointGraph;

/// Growth factor applied to the entry arrays when their capacity runs out.
const CAPACITY_GROWTH_FACTOR: f64 = 1.25;

/// Relative growth of the store since the last refresh that triggers a new
/// sampling distribution.
const DISTRIBUTION_REFRESH_RELATIVE_GROWTH: f64 = 0.05;

/// Density bookkeeping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensitySettings {
    pub enabled: bool,
    /// Falloff of the reference-sampling distribution.
    pub distribution_exp_factor: f64,
    /// Falloff of the per-cell acceptance probabilities.
    pub grid_exp_factor: f64,
}

impl Default for DensitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            distribution_exp_factor: 1.0,
            grid_exp_factor: 2.0,
        }
    }
}

impl From<&PlannerConfig> for DensitySettings {
    fn from(config: &PlannerConfig) -> Self {
        Self {
            enabled: config.count_grid_enable,
            distribution_exp_factor: config.distribution_exp_factor,
            grid_exp_factor: config.grid_exp_factor,
        }
    }
}

/// Append-only collection of committed viewpoint entries.
pub struct EntryStore {
    entries: Vec<ViewpointEntry>,
    meta: Vec<EntryMeta>,
    spatial_index: Box<dyn SpatialIndex>,
    graph: ViewpointGraph,
    /// Length of the fixed prefix of real viewpoints.
    num_real_viewpoints: usize,
    grid: VisitationGrid,
    distribution: SamplingDistribution,
    /// Store size at the last distribution refresh.
    distribution_update_size: usize,
    density: DensitySettings,
}

impl EntryStore {
    /// Create a store whose first entries are the given real viewpoints.
    pub fn new(
        real_entries: Vec<ViewpointEntry>,
        grid: VisitationGrid,
        density: DensitySettings,
    ) -> Self {
        Self::with_spatial_index(real_entries, grid, density, Box::new(RTreeSpatialIndex::new()))
    }

    /// Like [`EntryStore::new`] but with a caller-provided (empty) spatial index.
    pub fn with_spatial_index(
        real_entries: Vec<ViewpointEntry>,
        grid: VisitationGrid,
        density: DensitySettings,
        spatial_index: Box<dyn SpatialIndex>,
    ) -> Self {
        assert!(spatial_index.is_empty(), "spatial index must start empty");
        let num_real_viewpoints = real_entries.len();
        let mut store = Self {
            entries: Vec::with_capacity(num_real_viewpoints),
            meta: Vec::with_capacity(num_real_viewpoints),
            spatial_index,
            graph: ViewpointGraph::new(),
            num_real_viewpoints: 0,
            grid,
            distribution: SamplingDistribution::empty(num_real_viewpoints),
            distribution_update_size: num_real_viewpoints,
            density,
        };
        for entry in real_entries {
            store.commit(entry, false);
        }
        store.num_real_viewpoints = num_real_viewpoints;
        store
    }

    /// Append an entry and return its index.
    ///
    /// With `count_in_grid`, a virtual entry inside the grid bounds is
    /// counted in its visitation cell and the sampling distribution is
    /// refreshed when the store has grown enough since the last refresh.
    /// With density bookkeeping disabled nothing is counted, but the
    /// distribution still follows the same refresh rule.
    pub fn commit(&mut self, entry: ViewpointEntry, count_in_grid: bool) -> ViewpointEntryIndex {
        let index = ViewpointEntryIndex(self.entries.len());
        let position = entry.pose().translation;

        let spatial_id = self.spatial_index.add_point(position);
        assert_eq!(spatial_id, index, "spatial index out of step with entry store");

        if self.entries.len() == self.entries.capacity() {
            let len = self.entries.len();
            let new_capacity = ((CAPACITY_GROWTH_FACTOR * len as f64).ceil() as usize).max(len + 1);
            info!(len, new_capacity, "Increasing capacity for viewpoint entries");
            self.entries.reserve_exact(new_capacity - len);
            self.meta.reserve_exact(new_capacity - len);
        }
        self.entries.push(entry);
        self.meta.push(EntryMeta::default());
        self.graph.add_node(index);

        if count_in_grid {
            self.update_density(index, &position);
        }

        self.assert_parallel_arrays();
        index
    }

    fn update_density(&mut self, index: ViewpointEntryIndex, position: &Vector3<f64>) {
        if self.density.enabled {
            let Some(cell) = self.grid.cell_index(position) else {
                return;
            };
            if index.0 >= self.num_real_viewpoints {
                self.grid.increment(cell);
                self.meta[index.0].grid_cell = Some(cell);
            }
        }

        let size = self.entries.len();
        let growth = size.saturating_sub(self.distribution_update_size);
        let relative_growth = growth as f64 / size as f64;
        if size == self.num_real_viewpoints + 1
            || (size > self.num_real_viewpoints
                && relative_growth >= DISTRIBUTION_REFRESH_RELATIVE_GROWTH)
        {
            info!(size, "Updating viewpoint sampling distribution");
            self.refresh_distribution();
            self.distribution_update_size = size;
        }
    }

    /// Recompute the sampling distribution and the grid cell probabilities
    /// from the current visit counts.
    ///
    /// With density bookkeeping disabled every virtual entry is equally
    /// likely and the cell probabilities are left untouched.
    pub fn refresh_distribution(&mut self) {
        if !self.density.enabled {
            let weights = vec![1.0; self.num_virtual_viewpoints()];
            self.distribution = SamplingDistribution::from_weights(self.num_real_viewpoints, weights);
            return;
        }
        let counts: Vec<Option<u32>> = self.meta[self.num_real_viewpoints..]
            .iter()
            .map(|meta| meta.grid_cell.map(|cell| self.grid.count(cell)))
            .collect();
        let max_count = counts.iter().flatten().copied().max().unwrap_or(0);
        self.distribution = SamplingDistribution::from_grid_counts(
            self.num_real_viewpoints,
            &counts,
            self.density.distribution_exp_factor,
        );
        self.refresh_cell_probabilities(max_count);
    }

    /// Recompute per-cell acceptance probabilities against `max_count`.
    pub fn refresh_cell_probabilities(&mut self, max_count: u32) {
        let num_virtual = self.num_virtual_viewpoints();
        self.grid
            .refresh_cell_probabilities(num_virtual, max_count, self.density.grid_exp_factor);
    }

    /// Drop every virtual entry and return to the bootstrap state.
    ///
    /// Real viewpoints keep their indices; the spatial index and graph are
    /// rebuilt from them and all density bookkeeping is cleared. Stereo
    /// pairings with a dropped entry are forgotten.
    pub fn reset(&mut self) {
        let num_real = self.num_real_viewpoints;
        self.entries.truncate(num_real);
        self.meta.truncate(num_real);
        for meta in &mut self.meta {
            meta.grid_cell = None;
            if meta.stereo_partner.is_some_and(|partner| partner.0 >= num_real) {
                meta.stereo_partner = None;
                meta.stereo_computed = false;
            }
        }

        self.spatial_index.clear();
        self.graph.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            let id = self.spatial_index.add_point(entry.pose().translation);
            assert_eq!(id.0, i, "spatial index out of step with entry store");
            self.graph.add_node(ViewpointEntryIndex(i));
        }

        self.grid.clear();
        self.distribution = SamplingDistribution::empty(num_real);
        self.distribution_update_size = num_real;
        self.assert_parallel_arrays();
        debug!(num_real, "Entry store reset to real viewpoints");
    }

    /// Up to `k` committed entries nearest to `position`, closest first.
    pub fn knn(&self, position: &Vector3<f64>, k: usize) -> Vec<Neighbor> {
        self.spatial_index.knn(position, k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_real_viewpoints(&self) -> usize {
        self.num_real_viewpoints
    }

    pub fn num_virtual_viewpoints(&self) -> usize {
        self.entries.len() - self.num_real_viewpoints
    }

    pub fn is_real(&self, index: ViewpointEntryIndex) -> bool {
        index.0 < self.num_real_viewpoints
    }

    pub fn entry(&self, index: ViewpointEntryIndex) -> Option<&ViewpointEntry> {
        self.entries.get(index.0)
    }

    pub fn entries(&self) -> &[ViewpointEntry] {
        &self.entries
    }

    pub fn meta(&self, index: ViewpointEntryIndex) -> Option<&EntryMeta> {
        self.meta.get(index.0)
    }

    /// Record the stereo partner chosen for `index` by the stereo collaborator.
    pub fn set_stereo_partner(&mut self, index: ViewpointEntryIndex, partner: Option<ViewpointEntryIndex>) {
        if let Some(meta) = self.meta.get_mut(index.0) {
            meta.stereo_partner = partner;
            meta.stereo_computed = true;
        }
    }

    pub fn spatial_index(&self) -> &dyn SpatialIndex {
        self.spatial_index.as_ref()
    }

    pub fn graph(&self) -> &ViewpointGraph {
        &self.graph
    }

    /// Mutable graph access for the motion-linking collaborator.
    pub fn graph_mut(&mut self) -> &mut ViewpointGraph {
        &mut self.graph
    }

    pub fn grid(&self) -> &VisitationGrid {
        &self.grid
    }

    pub fn distribution(&self) -> &SamplingDistribution {
        &self.distribution
    }

    pub fn density_settings(&self) -> &DensitySettings {
        &self.density
    }

    /// Whether all parallel arrays have the same length.
    pub fn check_invariants(&self) -> bool {
        let n = self.entries.len();
        self.meta.len() == n && self.spatial_index.len() == n && self.graph.num_nodes() == n
    }

    fn assert_parallel_arrays(&self) {
        assert!(
            self.check_invariants(),
            "parallel-array invariant violated: entries={}, meta={}, spatial_index={}, graph={}",
            self.entries.len(),
            self.meta.len(),
            self.spatial_index.len(),
            self.graph.num_nodes()
        );
    }
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore")
            .field("num_entries", &self.entries.len())
            .field("num_real_viewpoints", &self.num_real_viewpoints)
            .field("distribution_update_size", &self.distribution_update_size)
            .finish()
    }
}
