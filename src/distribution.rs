//! Distribution
//!
//! Discrete distributions on a contiguous integer support, stored as an offset
//! and a dense probability vector. Used both for a single stratum's conditional
//! distribution and for the pooled statistic after convolution.
use crate::alternative::Alternative;
use crate::errors::GasteError;
use rayon::prelude::*;
use serde::Serialize;

/// Probability mass over `offset ..= offset + probabilities.len() - 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscreteDistribution {
    offset: u64,
    probabilities: Vec<f64>,
}

impl DiscreteDistribution {
    /// Create a distribution from its smallest value and the mass of each
    /// consecutive value.
    pub fn new(offset: u64, probabilities: Vec<f64>) -> Result<Self, GasteError> {
        if probabilities.is_empty() {
            return Err(GasteError::Shape("a distribution needs at least one value".to_string()));
        }
        Ok(DiscreteDistribution::from_parts(offset, probabilities))
    }

    /// Callers guarantee a non-empty probability vector.
    pub(crate) fn from_parts(offset: u64, probabilities: Vec<f64>) -> Self {
        DiscreteDistribution { offset, probabilities }
    }

    /// All the mass on a single value.
    pub fn point_mass(value: u64) -> Self {
        DiscreteDistribution::from_parts(value, vec![1.0])
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn min_value(&self) -> u64 {
        self.offset
    }

    pub fn max_value(&self) -> u64 {
        self.offset + self.probabilities.len() as u64 - 1
    }

    pub fn support_size(&self) -> usize {
        self.probabilities.len()
    }

    /// Mass at `value`, zero outside the support.
    pub fn probability(&self, value: u64) -> f64 {
        if value < self.offset {
            return 0.0;
        }
        self.probabilities
            .get((value - self.offset) as usize)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total_mass(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        self.probabilities
            .iter()
            .enumerate()
            .map(|(i, p)| (self.offset + i as u64) as f64 * p)
            .sum()
    }

    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.probabilities
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let d = (self.offset + i as u64) as f64 - mean;
                d * d * p
            })
            .sum()
    }

    /// Distribution of the sum of two independent variables.
    ///
    /// Each output value is an independent dot product, so the outputs are
    /// computed in parallel.
    pub fn convolve(&self, other: &DiscreteDistribution) -> DiscreteDistribution {
        let a = &self.probabilities;
        let b = &other.probabilities;
        let n = a.len() + b.len() - 1;
        let probabilities: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|k| {
                let j_lo = k.saturating_sub(a.len() - 1);
                let j_hi = k.min(b.len() - 1);
                (j_lo..=j_hi).map(|j| a[k - j] * b[j]).sum()
            })
            .collect();
        DiscreteDistribution::from_parts(self.offset + other.offset, probabilities)
    }

    /// `P(X <= value)`.
    pub fn lower_tail(&self, value: u64) -> f64 {
        if value < self.offset {
            return 0.0;
        }
        let end = ((value - self.offset) as usize).min(self.probabilities.len() - 1);
        self.probabilities[..=end].iter().sum()
    }

    /// `P(X >= value)`.
    pub fn upper_tail(&self, value: u64) -> f64 {
        if value > self.max_value() {
            return 0.0;
        }
        let start = value.saturating_sub(self.offset) as usize;
        self.probabilities[start..].iter().sum()
    }

    /// p-value of `observed` in the direction of `alternative`. The mass at
    /// the observed value belongs to both tails.
    pub fn pvalue(&self, observed: u64, alternative: Alternative) -> f64 {
        alternative.pvalue_from_tails(self.lower_tail(observed), self.upper_tail(observed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin() -> DiscreteDistribution {
        DiscreteDistribution::new(0, vec![0.5, 0.5]).unwrap()
    }

    #[test]
    fn test_empty_distribution_rejected() {
        assert!(matches!(DiscreteDistribution::new(3, vec![]), Err(GasteError::Shape(_))));
    }

    #[test]
    fn test_point_mass() {
        let d = DiscreteDistribution::point_mass(3);
        assert_eq!(d.min_value(), 3);
        assert_eq!(d.max_value(), 3);
        assert_eq!(d.probability(3), 1.0);
        assert_eq!(d.probability(2), 0.0);
        assert_eq!(d.variance(), 0.0);
    }

    #[test]
    fn test_convolve_binomial() {
        // Three fair coins give Binomial(3, 0.5).
        let d = coin().convolve(&coin()).convolve(&coin());
        assert_eq!(d.min_value(), 0);
        assert_eq!(d.max_value(), 3);
        let expected = [0.125, 0.375, 0.375, 0.125];
        for (p, e) in d.probabilities().iter().zip(expected.iter()) {
            assert!((p - e).abs() < 1e-15);
        }
        assert!((d.mean() - 1.5).abs() < 1e-12);
        assert!((d.variance() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_convolve_offsets_add() {
        let a = DiscreteDistribution::new(2, vec![0.25, 0.75]).unwrap();
        let b = DiscreteDistribution::new(5, vec![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]).unwrap();
        let c = a.convolve(&b);
        assert_eq!(c.min_value(), 7);
        assert_eq!(c.max_value(), 10);
        assert!((c.total_mass() - 1.0).abs() < 1e-12);
        assert!((c.mean() - (a.mean() + b.mean())).abs() < 1e-12);
    }

    #[test]
    fn test_tails() {
        let d = coin().convolve(&coin());
        assert_eq!(d.lower_tail(0), 0.25);
        assert_eq!(d.lower_tail(1), 0.75);
        assert_eq!(d.upper_tail(1), 0.75);
        assert_eq!(d.upper_tail(3), 0.0);
        assert_eq!(d.lower_tail(10), 1.0);

        let shifted = DiscreteDistribution::new(4, vec![0.5, 0.5]).unwrap();
        assert_eq!(shifted.lower_tail(3), 0.0);
        assert_eq!(shifted.upper_tail(3), 1.0);
    }

    #[test]
    fn test_pvalue_includes_observed_mass() {
        let d = coin().convolve(&coin());
        let less = d.pvalue(1, Alternative::Less);
        let greater = d.pvalue(1, Alternative::Greater);
        assert!((less + greater - (1.0 + d.probability(1))).abs() < 1e-12);
        assert_eq!(d.pvalue(1, Alternative::TwoSided), 1.0);
        assert!((d.pvalue(0, Alternative::TwoSided) - 0.5).abs() < 1e-12);
    }
}
