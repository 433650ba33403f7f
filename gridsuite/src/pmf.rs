use rand::Rng;
use rv::traits::Sampleable;
use serde::{Deserialize, Serialize};

use crate::cdf::Cdf;
use crate::error::{Result, SuiteError};

/// A one-dimensional discrete distribution over real values.
///
/// Values are kept sorted and unique. Weights need not be normalized, but
/// they are finite, non-negative and sum to a positive total, so every
/// summary below is well defined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPmf")]
pub struct Pmf {
    values: Vec<f64>,
    probs: Vec<f64>,
}

#[derive(Deserialize)]
struct RawPmf {
    values: Vec<f64>,
    probs: Vec<f64>,
}

impl TryFrom<RawPmf> for Pmf {
    type Error = SuiteError;

    fn try_from(raw: RawPmf) -> Result<Self> {
        if raw.values.len() != raw.probs.len() {
            return Err(SuiteError::InvalidParameter {
                name: "probs",
                value: format!("{} probs for {} values", raw.probs.len(), raw.values.len()),
            });
        }
        Self::new(raw.values.into_iter().zip(raw.probs))
    }
}

impl Pmf {
    /// Build a distribution from `(value, weight)` pairs. Weights of repeated
    /// values are summed.
    ///
    /// # Errors
    /// - [`SuiteError::EmptyDistribution`] if there are no pairs.
    /// - [`SuiteError::InvalidParameter`] for a non-finite value, or a
    ///   negative or non-finite weight.
    /// - [`SuiteError::ZeroMass`] if every weight is zero.
    pub fn new<I: IntoIterator<Item = (f64, f64)>>(pairs: I) -> Result<Self> {
        let mut pairs: Vec<(f64, f64)> = pairs.into_iter().collect();
        if pairs.is_empty() {
            return Err(SuiteError::EmptyDistribution);
        }

        for &(x, w) in &pairs {
            if !x.is_finite() {
                return Err(SuiteError::InvalidParameter {
                    name: "value",
                    value: x.to_string(),
                });
            }
            if !(w.is_finite() && w >= 0.0) {
                return Err(SuiteError::InvalidParameter {
                    name: "weight",
                    value: w.to_string(),
                });
            }
        }

        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        let mut probs: Vec<f64> = Vec::with_capacity(pairs.len());
        for (x, w) in pairs {
            let x = x + 0.0;
            if values.last() == Some(&x) {
                if let Some(p) = probs.last_mut() {
                    *p += w;
                }
            } else {
                values.push(x);
                probs.push(w);
            }
        }

        if probs.iter().sum::<f64>() <= 0.0 {
            return Err(SuiteError::ZeroMass);
        }

        Ok(Self { values, probs })
    }

    /// Equal weight on every value.
    ///
    /// # Errors
    /// As [`Pmf::new`].
    pub fn uniform<I: IntoIterator<Item = f64>>(values: I) -> Result<Self> {
        let mut pmf = Self::new(values.into_iter().map(|x| (x, 1.0)))?;
        pmf.normalize();
        Ok(pmf)
    }

    /// Mix component distributions. Each component is normalized and then
    /// scaled by its weight.
    ///
    /// # Errors
    /// As [`Pmf::new`], applied to the mixture weights and to the result.
    pub fn mixture<'a, I>(components: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, &'a Pmf)>,
    {
        let mut pairs: Vec<(f64, f64)> = Vec::new();
        for (weight, pmf) in components {
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(SuiteError::InvalidParameter {
                    name: "mixture weight",
                    value: weight.to_string(),
                });
            }
            let total = pmf.total();
            pairs.extend(pmf.iter().map(|(x, p)| (x, weight * p / total)));
        }
        let mut mix = Self::new(pairs)?;
        mix.normalize();
        Ok(mix)
    }

    /// Scale weights to sum to one and return the previous total.
    pub fn normalize(&mut self) -> f64 {
        let total = self.total();
        self.probs.iter_mut().for_each(|p| *p /= total);
        total
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.probs.iter().sum()
    }

    /// Weight of `x`, zero if `x` is not a value of this distribution.
    #[must_use]
    pub fn prob(&self, x: f64) -> f64 {
        self.values
            .binary_search_by(|v| v.total_cmp(&(x + 0.0)))
            .map_or(0.0, |i| self.probs[i])
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; construction rejects empty distributions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(value, weight)` pairs in ascending order of value.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.values.iter().copied().zip(self.probs.iter().copied())
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        self.iter().map(|(x, p)| x * p).sum::<f64>() / self.total()
    }

    #[must_use]
    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.iter()
            .map(|(x, p)| p * (x - mean).powi(2))
            .sum::<f64>()
            / self.total()
    }

    #[must_use]
    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    /// The most probable value; ties go to the smallest value.
    #[must_use]
    pub fn max_likelihood(&self) -> f64 {
        self.iter()
            .fold((self.values[0], f64::NEG_INFINITY), |best, (x, p)| {
                if p > best.1 { (x, p) } else { best }
            })
            .0
    }

    #[must_use]
    pub fn make_cdf(&self) -> Cdf {
        Cdf::from(self)
    }

    /// Value below which `percentage` percent of the mass lies.
    ///
    /// # Errors
    /// [`SuiteError::InvalidPercentage`] outside `[0, 100]`.
    pub fn percentile(&self, percentage: f64) -> Result<f64> {
        self.make_cdf().percentile(percentage)
    }

    /// Central interval holding `percentage` percent of the mass.
    ///
    /// # Errors
    /// [`SuiteError::InvalidPercentage`] outside `[0, 100]`.
    pub fn credible_interval(&self, percentage: f64) -> Result<(f64, f64)> {
        self.make_cdf().credible_interval(percentage)
    }
}

impl Sampleable<f64> for Pmf {
    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let target = rng.random::<f64>() * self.total();
        let mut acc = 0.0;
        for (x, p) in self.iter() {
            acc += p;
            if target < acc {
                return x;
            }
        }
        self.values[self.values.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn deserializing_goes_through_new() {
        let pmf: Pmf =
            serde_json::from_str(r#"{"values": [3.0, 1.0, 3.0], "probs": [1.0, 2.0, 1.0]}"#)
                .unwrap();
        assert_eq!(pmf.values(), &[1.0, 3.0]);
        assert_eq!(pmf.probs(), &[2.0, 2.0]);

        for bad in [
            r#"{"values": [1.0, 2.0], "probs": [1.0]}"#,
            r#"{"values": [1.0], "probs": [-1.0]}"#,
            r#"{"values": [1.0], "probs": [0.0]}"#,
            r#"{"values": [], "probs": []}"#,
        ] {
            assert!(serde_json::from_str::<Pmf>(bad).is_err(), "{bad}");
        }
    }

    fn five_uniform() -> Pmf {
        Pmf::new([1.0, 2.0, 3.0, 4.0, 5.0].map(|x| (x, 0.2))).unwrap()
    }

    #[test]
    fn central_half_of_uniform_five() {
        assert_eq!(five_uniform().credible_interval(50.0).unwrap(), (2.0, 4.0));
    }

    #[test]
    fn repeated_values_are_merged_and_sorted() {
        let pmf = Pmf::new([(3.0, 1.0), (1.0, 1.0), (3.0, 2.0)]).unwrap();
        assert_eq!(pmf.values(), &[1.0, 3.0]);
        assert_eq!(pmf.probs(), &[1.0, 3.0]);
        assert::close(pmf.total(), 4.0, 1e-12);
        assert::close(pmf.prob(3.0), 3.0, 1e-12);
        assert::close(pmf.prob(2.0), 0.0, 1e-12);
    }

    #[test]
    fn rejects_bad_weights() {
        assert!(matches!(
            Pmf::new(Vec::<(f64, f64)>::new()),
            Err(SuiteError::EmptyDistribution)
        ));
        assert!(matches!(
            Pmf::new([(1.0, -0.5)]),
            Err(SuiteError::InvalidParameter { name: "weight", .. })
        ));
        assert!(matches!(
            Pmf::new([(1.0, f64::NAN)]),
            Err(SuiteError::InvalidParameter { name: "weight", .. })
        ));
        assert!(matches!(
            Pmf::new([(f64::INFINITY, 1.0)]),
            Err(SuiteError::InvalidParameter { name: "value", .. })
        ));
        assert!(matches!(
            Pmf::new([(1.0, 0.0), (2.0, 0.0)]),
            Err(SuiteError::ZeroMass)
        ));
    }

    #[test]
    fn summaries_of_unnormalized_weights() {
        let pmf = Pmf::new([(0.0, 1.0), (10.0, 3.0)]).unwrap();
        assert::close(pmf.mean(), 7.5, 1e-12);
        assert::close(pmf.variance(), 18.75, 1e-12);
        assert::close(pmf.std(), 18.75_f64.sqrt(), 1e-12);
        assert_eq!(pmf.max_likelihood(), 10.0);
    }

    #[test]
    fn normalize_returns_previous_total() {
        let mut pmf = Pmf::new([(1.0, 2.0), (2.0, 6.0)]).unwrap();
        assert::close(pmf.normalize(), 8.0, 1e-12);
        assert::close(pmf.probs().to_vec(), vec![0.25, 0.75], 1e-12);
    }

    #[test]
    fn median_and_extreme_percentiles() {
        let pmf = five_uniform();
        assert_eq!(pmf.percentile(50.0).unwrap(), 3.0);
        assert_eq!(pmf.percentile(0.0).unwrap(), 1.0);
        assert_eq!(pmf.percentile(100.0).unwrap(), 5.0);
        assert!(matches!(
            pmf.percentile(101.0),
            Err(SuiteError::InvalidPercentage(_))
        ));
    }

    #[test]
    fn mixture_weights_components() {
        let a = Pmf::uniform([0.0, 1.0]).unwrap();
        let b = Pmf::new([(1.0, 5.0), (2.0, 5.0)]).unwrap();
        let mix = Pmf::mixture([(0.5, &a), (0.5, &b)]).unwrap();
        assert_eq!(mix.values(), &[0.0, 1.0, 2.0]);
        assert::close(mix.probs().to_vec(), vec![0.25, 0.5, 0.25], 1e-12);
    }

    #[test]
    fn draws_follow_weights() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let pmf = Pmf::new([(0.0, 1.0), (1.0, 3.0)]).unwrap();
        let n = 20_000;
        let ones = pmf
            .sample(n, &mut rng)
            .into_iter()
            .filter(|x| *x == 1.0)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let frac = ones as f64 / n as f64;
        assert!((frac - 0.75).abs() < 0.02, "fraction of ones = {frac}");
    }

    proptest! {
        #[test]
        fn credible_interval_brackets_the_median(
            weights in prop::collection::vec(0.01..10.0_f64, 1..50),
            pct in 0.0..=100.0_f64,
        ) {
            #[allow(clippy::cast_precision_loss)]
            let pmf = Pmf::new(weights.iter().enumerate().map(|(i, w)| (i as f64, *w))).unwrap();
            let (low, high) = pmf.credible_interval(pct).unwrap();
            let median = pmf.percentile(50.0).unwrap();
            prop_assert!(low <= median);
            prop_assert!(median <= high);
        }
    }
}
