//! Sampling distribution over the virtual viewpoint entries.

use rand::distributions::WeightedIndex;

use crate::graph::ViewpointEntryIndex;
use crate::sensing::RandomSource;

/// Exponential density falloff `exp(-count * exp_factor / max_count)`.
#[inline]
pub fn density_weight(count: u32, max_count: u32, exp_factor: f64) -> f64 {
    (-(count as f64) * exp_factor / max_count as f64).exp()
}

/// Discrete distribution over the virtual index range `offset..offset + len`.
///
/// Entries that are not tracked by the visitation grid have weight zero and
/// are never drawn. If no entry has positive weight the distribution is
/// empty and every draw fails.
#[derive(Debug, Clone, Default)]
pub struct SamplingDistribution {
    offset: usize,
    weights: Vec<f64>,
    index: Option<WeightedIndex<f64>>,
}

impl SamplingDistribution {
    /// Distribution with no entries.
    pub fn empty(offset: usize) -> Self {
        Self {
            offset,
            weights: Vec::new(),
            index: None,
        }
    }

    /// Build from per-entry grid counts (`None` for untracked entries).
    ///
    /// Panics if a tracked entry has a zero count: an entry counted in a cell
    /// implies that cell has been visited at least once.
    pub fn from_grid_counts(offset: usize, counts: &[Option<u32>], exp_factor: f64) -> Self {
        let max_count = counts.iter().flatten().copied().max().unwrap_or(0);
        let weights: Vec<f64> = counts
            .iter()
            .map(|count| match *count {
                Some(count) => {
                    assert!(
                        count > 0,
                        "virtual viewpoint tracked in a grid cell with zero visits"
                    );
                    density_weight(count, max_count, exp_factor)
                }
                None => 0.0,
            })
            .collect();
        Self::from_weights(offset, weights)
    }

    pub fn from_weights(offset: usize, weights: Vec<f64>) -> Self {
        // Fails for empty or all-zero weights; such a distribution can't be drawn from.
        let index = WeightedIndex::new(&weights).ok();
        Self {
            offset,
            weights,
            index,
        }
    }

    /// Draw a reference entry.
    pub fn sample(&self, rng: &mut dyn RandomSource) -> Option<ViewpointEntryIndex> {
        let index = self.index.as_ref()?;
        Some(ViewpointEntryIndex(self.offset + rng.sample_discrete(index)))
    }

    /// Unnormalized weight of `index`, if it lies in the covered range.
    pub fn weight(&self, index: ViewpointEntryIndex) -> Option<f64> {
        index
            .0
            .checked_sub(self.offset)
            .and_then(|i| self.weights.get(i))
            .copied()
    }

    /// Number of entries covered (including zero-weight ones).
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_less_visited_entry_has_larger_weight() {
        let dist = SamplingDistribution::from_grid_counts(3, &[Some(2), Some(8), Some(5)], 1.0);
        let w_low = dist.weight(ViewpointEntryIndex(3)).unwrap();
        let w_high = dist.weight(ViewpointEntryIndex(4)).unwrap();
        assert!(w_low > w_high);
        assert_relative_eq!(w_high, (-1.0f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(w_low, (-0.25f64).exp(), epsilon = 1e-12);
        assert_eq!(dist.weight(ViewpointEntryIndex(2)), None);
        assert_eq!(dist.weight(ViewpointEntryIndex(6)), None);
    }

    #[test]
    fn test_sample_stays_in_virtual_range() {
        let dist = SamplingDistribution::from_grid_counts(10, &[Some(1), None, Some(4)], 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let idx = dist.sample(&mut rng).unwrap();
            assert!(idx == ViewpointEntryIndex(10) || idx == ViewpointEntryIndex(12));
        }
    }

    #[test]
    fn test_untracked_only_is_empty() {
        let dist = SamplingDistribution::from_grid_counts(1, &[None, None], 1.0);
        let mut rng = StdRng::seed_from_u64(6);
        assert!(dist.is_empty());
        assert_eq!(dist.len(), 2);
        assert_eq!(dist.sample(&mut rng), None);
        assert!(SamplingDistribution::empty(0).sample(&mut rng).is_none());
    }

    #[test]
    #[should_panic(expected = "zero visits")]
    fn test_zero_count_is_invariant_violation() {
        let _ = SamplingDistribution::from_grid_counts(0, &[Some(3), Some(0)], 1.0);
    }
}
