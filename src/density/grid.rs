//! Visitation grid over the pose sampling volume.

use nalgebra::Vector3;
use tracing::debug;

use crate::geometry::BoundingBox;

use super::distribution::density_weight;

/// Virtual population below which every cell accepts unconditionally.
pub const MIN_VIRTUAL_VIEWPOINTS_FOR_CELL_PROBABILITIES: usize = 100;

/// Regular grid of visit counts with a parallel array of acceptance
/// probabilities.
#[derive(Debug, Clone)]
pub struct VisitationGrid {
    bbox: BoundingBox,
    dims: [usize; 3],
    cell_size: Vector3<f64>,
    counts: Vec<u32>,
    probabilities: Vec<f64>,
}

impl VisitationGrid {
    /// Grid spanning `bbox` with `dims` cells along x, y and z.
    ///
    /// Panics if any dimension is zero.
    pub fn new(bbox: BoundingBox, dims: [usize; 3]) -> Self {
        assert!(
            dims.iter().all(|&d| d > 0),
            "visitation grid needs at least one cell per axis"
        );
        let extent = bbox.extent();
        let cell_size = Vector3::new(
            extent.x / dims[0] as f64,
            extent.y / dims[1] as f64,
            extent.z / dims[2] as f64,
        );
        let num_cells = dims[0] * dims[1] * dims[2];
        Self {
            bbox,
            dims,
            cell_size,
            counts: vec![0; num_cells],
            probabilities: vec![1.0; num_cells],
        }
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn num_cells(&self) -> usize {
        self.counts.len()
    }

    pub fn is_inside(&self, position: &Vector3<f64>) -> bool {
        self.bbox.contains(position)
    }

    /// Integer cell coordinates of `position`, or `None` outside the grid.
    ///
    /// Points on the upper boundary belong to the last cell.
    pub fn cell_coords(&self, position: &Vector3<f64>) -> Option<[usize; 3]> {
        if !self.is_inside(position) {
            return None;
        }
        let mut coords = [0usize; 3];
        for axis in 0..3 {
            let size = self.cell_size[axis];
            let c = if size > 0.0 {
                ((position[axis] - self.bbox.min[axis]) / size).floor() as usize
            } else {
                0
            };
            coords[axis] = c.min(self.dims[axis] - 1);
        }
        Some(coords)
    }

    /// Flat index of cell `(ix, iy, iz)`.
    #[inline]
    pub fn index_of(&self, coords: [usize; 3]) -> usize {
        (coords[0] * self.dims[1] + coords[1]) * self.dims[2] + coords[2]
    }

    /// Flat cell index of `position`, or `None` outside the grid.
    pub fn cell_index(&self, position: &Vector3<f64>) -> Option<usize> {
        self.cell_coords(position).map(|c| self.index_of(c))
    }

    pub fn increment(&mut self, cell: usize) {
        self.counts[cell] += 1;
    }

    pub fn count(&self, cell: usize) -> u32 {
        self.counts[cell]
    }

    /// Visit count at `position`; zero outside the grid.
    pub fn count_at(&self, position: &Vector3<f64>) -> u32 {
        self.cell_index(position).map_or(0, |cell| self.counts[cell])
    }

    pub fn total_count(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn probability(&self, cell: usize) -> f64 {
        self.probabilities[cell]
    }

    /// Acceptance probability at `position`.
    ///
    /// Positions outside the grid are not density-tracked and always accept.
    pub fn probability_at(&self, position: &Vector3<f64>) -> f64 {
        self.cell_index(position)
            .map_or(1.0, |cell| self.probabilities[cell])
    }

    /// Recompute per-cell acceptance probabilities.
    ///
    /// With fewer than [`MIN_VIRTUAL_VIEWPOINTS_FOR_CELL_PROBABILITIES`]
    /// virtual viewpoints the density estimate is not meaningful yet and all
    /// cells accept with probability one.
    pub fn refresh_cell_probabilities(&mut self, num_virtual: usize, max_count: u32, exp_factor: f64) {
        if num_virtual < MIN_VIRTUAL_VIEWPOINTS_FOR_CELL_PROBABILITIES || max_count == 0 {
            self.probabilities.fill(1.0);
            return;
        }
        for (probability, &count) in self.probabilities.iter_mut().zip(&self.counts) {
            *probability = density_weight(count, max_count, exp_factor);
        }
        debug!(
            num_virtual,
            max_count,
            occupied_cells = self.counts.iter().filter(|&&c| c > 0).count(),
            "Refreshed grid cell probabilities"
        );
    }

    /// Zero all counts and reset probabilities to one.
    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.probabilities.fill(1.0);
    }
}
