//! Density model biasing future proposals toward under-explored regions.
//!
//! - [`VisitationGrid`] - histogram of committed virtual viewpoints over a
//!   regular 3D grid, plus a per-cell acceptance probability
//! - [`SamplingDistribution`] - discrete distribution over the virtual
//!   entries used to choose a reference viewpoint to resample around
//!
//! Both use the same exponential falloff, `exp(-count * factor / max_count)`:
//! rarely visited regions get weights close to one, the most visited region
//! gets `exp(-factor)`.

pub mod distribution;
pub mod grid;

pub use distribution::{density_weight, SamplingDistribution};
pub use grid::{VisitationGrid, MIN_VIRTUAL_VIEWPOINTS_FOR_CELL_PROBABILITIES};
