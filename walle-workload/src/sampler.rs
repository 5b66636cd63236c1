//! Discrete weighted choice

use crate::error::{WorkloadError, WorkloadResult};
use rand::Rng;

/// Weighted sampler over an explicit list of `(item, weight)` pairs
///
/// Draws a point in `[0, total)` and binary-searches the cumulative weights.
/// Zero-weight items are kept but never selected.
#[derive(Debug, Clone)]
pub struct WeightedSampler<T> {
    items: Vec<T>,
    weights: Vec<f64>,
    cumulative: Vec<f64>,
    last_selectable: usize,
}

impl<T> WeightedSampler<T> {
    pub fn new(entries: Vec<(T, f64)>) -> WorkloadResult<Self> {
        if entries.is_empty() {
            return Err(WorkloadError::InvalidWeights(
                "at least one entry is required".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(entries.len());
        let mut weights = Vec::with_capacity(entries.len());
        let mut cumulative = Vec::with_capacity(entries.len());
        let mut total = 0.0;
        let mut last_selectable = None;

        for (index, (item, weight)) in entries.into_iter().enumerate() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(WorkloadError::InvalidWeights(format!(
                    "weight at position {} must be a finite non-negative number, got {}",
                    index, weight
                )));
            }
            if weight > 0.0 {
                last_selectable = Some(index);
            }
            total += weight;
            items.push(item);
            weights.push(weight);
            cumulative.push(total);
        }

        let last_selectable = last_selectable.ok_or_else(|| {
            WorkloadError::InvalidWeights("all weights are zero".to_string())
        })?;

        Ok(Self {
            items,
            weights,
            cumulative,
            last_selectable,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        &self.items[self.sample_index(rng)]
    }

    pub fn sample_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let point = rng.random_range(0.0..self.total_weight());
        self.cumulative
            .partition_point(|&bound| bound <= point)
            .min(self.last_selectable)
    }

    pub fn total_weight(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, f64)> {
        self.items.iter().zip(self.weights.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_selection_follows_weights() {
        let sampler = WeightedSampler::new(vec![("a", 3.0), ("b", 2.0), ("c", 1.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 3];

        for _ in 0..60_000 {
            counts[sampler.sample_index(&mut rng)] += 1;
        }

        let share = |n: usize| n as f64 / 60_000.0;
        assert!((share(counts[0]) - 0.5).abs() < 0.02);
        assert!((share(counts[1]) - 1.0 / 3.0).abs() < 0.02);
        assert!((share(counts[2]) - 1.0 / 6.0).abs() < 0.02);
    }

    #[test]
    fn test_zero_weight_never_selected() {
        let sampler =
            WeightedSampler::new(vec![("never", 0.0), ("always", 1.0), ("tail", 0.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..10_000 {
            assert_eq!(*sampler.sample(&mut rng), "always");
        }
    }

    #[test]
    fn test_invalid_weights_rejected() {
        assert!(WeightedSampler::<u8>::new(vec![]).is_err());
        assert!(WeightedSampler::new(vec![(1, 0.0), (2, 0.0)]).is_err());
        assert!(WeightedSampler::new(vec![(1, -1.0), (2, 3.0)]).is_err());
        assert!(WeightedSampler::new(vec![(1, f64::NAN)]).is_err());
        assert!(WeightedSampler::new(vec![(1, f64::INFINITY)]).is_err());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let sampler = WeightedSampler::new(vec![(0, 1.0), (1, 1.0), (2, 5.0)]).unwrap();
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let first: Vec<_> = (0..50).map(|_| sampler.sample_index(&mut a)).collect();
        let second: Vec<_> = (0..50).map(|_| sampler.sample_index(&mut b)).collect();
        assert_eq!(first, second);
    }
}
