//! Random source used by the sampling strategies.
//!
//! Any `rand::Rng` is a `RandomSource`. Each planner worker owns its own
//! generator and passes it into every call, so no generator state is shared
//! between concurrent callers.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_distr::StandardNormal;

pub trait RandomSource {
    /// Uniform integer in `0..n`. Panics if `n == 0`.
    fn uniform_index(&mut self, n: usize) -> usize;

    /// `true` with probability `p` (clamped to `[0, 1]`).
    fn bernoulli(&mut self, p: f64) -> bool;

    /// Uniform draw from `[0, 1)`.
    fn uniform_unit(&mut self) -> f64;

    /// Uniform draw from `[low, high)`; returns `low` for an empty range.
    fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.uniform_unit()
    }

    /// Draw from the standard normal distribution.
    fn standard_normal(&mut self) -> f64;

    /// Draw an index from a discrete weighted distribution.
    fn sample_discrete(&mut self, distribution: &WeightedIndex<f64>) -> usize;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn uniform_index(&mut self, n: usize) -> usize {
        assert!(n > 0, "cannot draw a uniform index from an empty range");
        self.gen_range(0..n)
    }

    fn bernoulli(&mut self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self.gen_bool(p)
    }

    fn uniform_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn standard_normal(&mut self) -> f64 {
        self.sample(StandardNormal)
    }

    fn sample_discrete(&mut self, distribution: &WeightedIndex<f64>) -> usize {
        distribution.sample(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[test]
    fn test_bernoulli_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(!rng.bernoulli(0.0));
            assert!(rng.bernoulli(1.0));
            assert!(rng.bernoulli(2.0));
        }
    }

    #[test]
    fn test_uniform_range_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let x = rng.uniform_range(-2.0, 3.0);
            assert!((-2.0..3.0).contains(&x));
        }
        assert_eq!(rng.uniform_range(1.5, 1.5), 1.5);
    }

    #[test]
    fn test_sample_discrete_skips_zero_weight() {
        let mut rng = StdRng::seed_from_u64(3);
        let dist = WeightedIndex::new([0.0, 1.0, 0.0]).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.sample_discrete(&dist), 1);
        }
    }

    #[test]
    #[should_panic(expected = "empty range")]
    fn test_uniform_index_empty_panics() {
        let mut rng = StdRng::seed_from_u64(0);
        rng.uniform_index(0);
    }
}
