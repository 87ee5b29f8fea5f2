//! Bottom-k sampling sketch.

use serde::{Deserialize, Serialize};

/// One retained observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Sampling key; smaller keys are retained.
    pub key: u64,
    /// Observed value.
    pub value: f64,
    /// Aggregation weight.
    pub weight: f64,
}

/// Keeps the `capacity` observations with the smallest keys.
///
/// Keys come from a hash of the scenario identity, so the retained set is a
/// uniform sample that does not depend on insertion order, and two sketches
/// merge into exactly the sketch of the combined stream. While fewer than
/// `capacity` observations have been seen the sketch is exact.
///
/// # Examples
/// ```
/// use tranche_risk::aggregator::BottomKSketch;
///
/// let mut a = BottomKSketch::new(2);
/// a.insert(30, 3.0, 1.0);
/// a.insert(10, 1.0, 1.0);
/// let mut b = BottomKSketch::new(2);
/// b.insert(20, 2.0, 1.0);
/// a.merge(b);
///
/// let kept: Vec<f64> = a.samples().iter().map(|s| s.value).collect();
/// assert_eq!(kept, vec![1.0, 2.0]);
/// assert_eq!(a.seen(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BottomKSketch {
    capacity: usize,
    seen: u64,
    samples: Vec<Sample>,
}

impl BottomKSketch {
    /// Empty sketch retaining at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: 0,
            samples: Vec::new(),
        }
    }

    /// Observe a value.
    pub fn insert(&mut self, key: u64, value: f64, weight: f64) {
        self.seen += 1;
        self.samples.push(Sample { key, value, weight });
        if self.samples.len() >= 2 * self.capacity {
            self.compact();
        }
    }

    /// Absorb another sketch.
    pub fn merge(&mut self, other: BottomKSketch) {
        self.seen += other.seen;
        self.samples.extend(other.samples);
        if self.samples.len() > self.capacity {
            self.compact();
        }
    }

    /// Observations seen, retained or not.
    #[inline]
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Whether every observation is retained.
    #[inline]
    pub fn is_exact(&self) -> bool {
        self.seen as usize <= self.capacity
    }

    /// Retained samples ordered by key.
    pub fn samples(&mut self) -> &[Sample] {
        self.compact();
        &self.samples
    }

    /// Retained samples ordered by value, ties broken by key.
    pub fn into_sorted_values(mut self) -> Vec<Sample> {
        self.compact();
        let mut samples = self.samples;
        samples.sort_by(|a, b| a.value.total_cmp(&b.value).then(a.key.cmp(&b.key)));
        samples
    }

    fn compact(&mut self) {
        self.samples.sort_unstable_by_key(|s| s.key);
        self.samples.truncate(self.capacity);
    }
}

/// Weighted nearest-rank quantile of samples sorted by value.
///
/// Returns the smallest value whose cumulative weight reaches `q` of the
/// total, or `None` for an empty or weightless sample.
pub fn weighted_quantile(sorted: &[Sample], q: f64) -> Option<f64> {
    let total: f64 = sorted.iter().map(|s| s.weight).sum();
    if sorted.is_empty() || total <= 0.0 {
        return None;
    }
    let target = q.clamp(0.0, 1.0) * total;
    let mut cumulative = 0.0;
    for s in sorted {
        cumulative += s.weight;
        if cumulative >= target && s.weight > 0.0 {
            return Some(s.value);
        }
    }
    sorted.iter().rev().find(|s| s.weight > 0.0).map(|s| s.value)
}

/// Weighted mean of the upper `1 − confidence` tail of samples sorted by value.
///
/// The boundary sample contributes only the part of its weight that falls
/// inside the tail, so the result is never below the matching quantile.
pub fn weighted_tail_mean(sorted: &[Sample], confidence: f64) -> Option<f64> {
    let total: f64 = sorted.iter().map(|s| s.weight).sum();
    if sorted.is_empty() || total <= 0.0 {
        return None;
    }
    let tail_mass = (1.0 - confidence.clamp(0.0, 1.0)) * total;
    if tail_mass <= 0.0 {
        return sorted.iter().rev().find(|s| s.weight > 0.0).map(|s| s.value);
    }
    let mut remaining = tail_mass;
    let mut acc = 0.0;
    for s in sorted.iter().rev() {
        if remaining <= 0.0 {
            break;
        }
        let w = s.weight.min(remaining);
        acc += w * s.value;
        remaining -= w;
    }
    Some(acc / (tail_mass - remaining.max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn uniform(values: &[f64]) -> Vec<Sample> {
        let mut s: Vec<Sample> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample {
                key: i as u64,
                value: v,
                weight: 1.0,
            })
            .collect();
        s.sort_by(|a, b| a.value.total_cmp(&b.value));
        s
    }

    #[test]
    fn test_nearest_rank_quantiles() {
        let s = uniform(&(1..=100).map(f64::from).collect::<Vec<_>>());
        assert_eq!(weighted_quantile(&s, 0.05), Some(5.0));
        assert_eq!(weighted_quantile(&s, 0.5), Some(50.0));
        assert_eq!(weighted_quantile(&s, 0.95), Some(95.0));
        assert_eq!(weighted_quantile(&s, 1.0), Some(100.0));
        assert_eq!(weighted_quantile(&[], 0.5), None);
    }

    #[test]
    fn test_weights_shift_quantile() {
        let mut s = uniform(&[1.0, 2.0, 3.0]);
        s[2].weight = 8.0;
        assert_eq!(weighted_quantile(&s, 0.5), Some(3.0));
    }

    #[test]
    fn test_tail_mean() {
        let s = uniform(&(1..=100).map(f64::from).collect::<Vec<_>>());
        // Top five: 96..=100.
        assert_relative_eq!(weighted_tail_mean(&s, 0.95).unwrap(), 98.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tail_mean_partial_boundary() {
        let s = uniform(&[0.0, 10.0]);
        // Tail mass 0.5 lies entirely in the top sample.
        assert_relative_eq!(weighted_tail_mean(&s, 0.75).unwrap(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sketch_exact_below_capacity() {
        let mut sk = BottomKSketch::new(10);
        for k in 0..5u64 {
            sk.insert(k, k as f64, 1.0);
        }
        assert!(sk.is_exact());
        assert_eq!(sk.samples().len(), 5);
    }

    proptest! {
        #[test]
        fn prop_merge_matches_single_stream(
            keys in proptest::collection::hash_set(any::<u64>(), 1..300),
            split in 0usize..300,
            capacity in 1usize..64,
        ) {
            let keys: Vec<u64> = keys.into_iter().collect();
            let split = split.min(keys.len());

            let mut whole = BottomKSketch::new(capacity);
            for &k in &keys {
                whole.insert(k, k as f64, 1.0);
            }

            let mut left = BottomKSketch::new(capacity);
            let mut right = BottomKSketch::new(capacity);
            for &k in &keys[..split] {
                left.insert(k, k as f64, 1.0);
            }
            for &k in keys[split..].iter().rev() {
                right.insert(k, k as f64, 1.0);
            }
            right.merge(left);

            prop_assert_eq!(whole.seen(), right.seen());
            prop_assert_eq!(whole.samples().to_vec(), right.samples().to_vec());
        }

        #[test]
        fn prop_tail_mean_not_below_quantile(
            values in proptest::collection::vec(-1e6f64..1e6, 1..200),
            confidence in 0.5f64..0.99,
        ) {
            let s = uniform(&values);
            let var = weighted_quantile(&s, confidence).unwrap();
            let cvar = weighted_tail_mean(&s, confidence).unwrap();
            prop_assert!(cvar >= var - 1e-6 * var.abs().max(1.0));
        }
    }
}
