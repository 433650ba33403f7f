use rv::dist::Gaussian;
use rv::traits::HasDensity;
use serde::{Deserialize, Serialize};

use super::Likelihood;
use crate::error::{Result, SuiteError};
use crate::space::Hypothesis;
use crate::utils::MeanAndVariance;

/// Gaussian observation model with the mean and standard deviation taken
/// from the hypothesis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalModel {
    mu_dim: usize,
    sigma_dim: usize,
}

impl Default for NormalModel {
    fn default() -> Self {
        Self {
            mu_dim: 0,
            sigma_dim: 1,
        }
    }
}

impl NormalModel {
    /// Hypotheses of the form `(mu, sigma)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the mean and standard deviation from other hypothesis dimensions.
    #[must_use]
    pub const fn with_dims(mu_dim: usize, sigma_dim: usize) -> Self {
        Self { mu_dim, sigma_dim }
    }

    /// The Gaussian named by `hypo`, or `None` when its parameters are out of
    /// domain (missing dimension, non-finite mean, non-positive scale).
    #[must_use]
    pub fn gaussian(&self, hypo: &Hypothesis) -> Option<Gaussian> {
        let mu = hypo.get(self.mu_dim)?;
        let sigma = hypo.get(self.sigma_dim)?;
        Gaussian::new(mu, sigma).ok()
    }
}

impl Likelihood<f64> for NormalModel {
    fn likelihood(&self, datum: &f64, hypo: &Hypothesis) -> f64 {
        self.gaussian(hypo).map_or(0.0, |g| g.f(datum))
    }

    fn ln_likelihood(&self, datum: &f64, hypo: &Hypothesis) -> f64 {
        self.gaussian(hypo)
            .map_or(f64::NEG_INFINITY, |g| g.ln_f(datum))
    }
}

/// Independent draws: the likelihood is the product of per-value densities.
impl Likelihood<Vec<f64>> for NormalModel {
    fn likelihood(&self, datum: &Vec<f64>, hypo: &Hypothesis) -> f64 {
        self.ln_likelihood(datum, hypo).exp()
    }

    fn ln_likelihood(&self, datum: &Vec<f64>, hypo: &Hypothesis) -> f64 {
        self.gaussian(hypo).map_or(f64::NEG_INFINITY, |g| {
            datum.iter().map(|x| g.ln_f(x)).sum()
        })
    }
}

/// Size, mean and standard deviation of a sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSummary")]
pub struct SampleSummary {
    n: usize,
    mean: f64,
    std: f64,
}

#[derive(Deserialize)]
struct RawSummary {
    n: usize,
    mean: f64,
    std: f64,
}

impl TryFrom<RawSummary> for SampleSummary {
    type Error = SuiteError;

    fn try_from(raw: RawSummary) -> Result<Self> {
        Self::new(raw.n, raw.mean, raw.std)
    }
}

impl SampleSummary {
    /// # Errors
    /// [`SuiteError::InvalidParameter`] if `n < 2`, the mean is not finite, or
    /// the standard deviation is negative or not finite.
    pub fn new(n: usize, mean: f64, std: f64) -> Result<Self> {
        if n < 2 {
            return Err(SuiteError::InvalidParameter {
                name: "n",
                value: n.to_string(),
            });
        }
        if !mean.is_finite() {
            return Err(SuiteError::InvalidParameter {
                name: "mean",
                value: mean.to_string(),
            });
        }
        if !(std.is_finite() && std >= 0.0) {
            return Err(SuiteError::InvalidParameter {
                name: "std",
                value: std.to_string(),
            });
        }
        Ok(Self { n, mean, std })
    }

    /// Summarize a sample; the standard deviation uses `n - 1` degrees of freedom.
    ///
    /// # Errors
    /// As [`SampleSummary::new`].
    pub fn from_sample(sample: &[f64]) -> Result<Self> {
        let mv: MeanAndVariance = sample.iter().copied().collect();
        Self::new(mv.count(), mv.mean(), mv.sample_variance().sqrt())
    }

    #[must_use]
    pub const fn n(&self) -> usize {
        self.n
    }

    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    #[must_use]
    pub const fn std(&self) -> f64 {
        self.std
    }
}

/// Likelihood of a sample through its summary statistics: the sample mean is
/// distributed `N(mu, sigma / sqrt(n))` and the sample standard deviation
/// approximately `N(sigma, sigma / sqrt(2 (n - 1)))`.
impl Likelihood<SampleSummary> for NormalModel {
    fn likelihood(&self, datum: &SampleSummary, hypo: &Hypothesis) -> f64 {
        self.ln_likelihood(datum, hypo).exp()
    }

    #[allow(clippy::cast_precision_loss)]
    fn ln_likelihood(&self, datum: &SampleSummary, hypo: &Hypothesis) -> f64 {
        let Some(g) = self.gaussian(hypo) else {
            return f64::NEG_INFINITY;
        };
        let n = datum.n as f64;
        let sigma = g.sigma();

        let mean_dist = Gaussian::new(g.mu(), sigma / n.sqrt());
        let std_dist = Gaussian::new(sigma, sigma / (2.0 * (n - 1.0)).sqrt());

        match (mean_dist, std_dist) {
            (Ok(m), Ok(s)) => m.ln_f(&datum.mean) + s.ln_f(&datum.std),
            _ => f64::NEG_INFINITY,
        }
    }
}
