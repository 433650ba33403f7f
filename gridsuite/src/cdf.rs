use rand::Rng;
use rv::traits::Sampleable;
use serde::Serialize;

use crate::error::{Result, SuiteError};
use crate::pmf::Pmf;

/// Cumulative form of a [`Pmf`]: sorted values and their cumulative probabilities.
///
/// Only built from a [`Pmf`]; deserialize the [`Pmf`] instead.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cdf {
    values: Vec<f64>,
    ps: Vec<f64>,
}

impl From<&Pmf> for Cdf {
    fn from(pmf: &Pmf) -> Self {
        let total = pmf.total();
        let ps = pmf
            .probs()
            .iter()
            .scan(0.0, |acc, p| {
                *acc += p;
                Some(*acc / total)
            })
            .collect();
        Self {
            values: pmf.values().to_vec(),
            ps,
        }
    }
}

impl Cdf {
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn ps(&self) -> &[f64] {
        &self.ps
    }

    /// Cumulative probability `P(X <= x)`.
    #[must_use]
    pub fn prob(&self, x: f64) -> f64 {
        match self.values.partition_point(|v| *v <= x) {
            0 => 0.0,
            i => self.ps[i - 1],
        }
    }

    /// Smallest value whose cumulative probability is at least `p`.
    ///
    /// # Errors
    /// [`SuiteError::InvalidParameter`] if `p` is outside `[0, 1]`.
    pub fn value(&self, p: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&p) {
            return Err(SuiteError::InvalidParameter {
                name: "probability",
                value: p.to_string(),
            });
        }
        let i = self.ps.partition_point(|q| *q < p);
        Ok(self.values[i.min(self.values.len() - 1)])
    }

    /// # Errors
    /// [`SuiteError::InvalidPercentage`] outside `[0, 100]`.
    pub fn percentile(&self, percentage: f64) -> Result<f64> {
        self.value(check_percentage(percentage)? / 100.0)
    }

    /// Central interval holding `percentage` percent of the mass: cuts
    /// `(100 - percentage) / 2` percent from each tail.
    ///
    /// # Errors
    /// [`SuiteError::InvalidPercentage`] outside `[0, 100]`.
    pub fn credible_interval(&self, percentage: f64) -> Result<(f64, f64)> {
        let tail = (1.0 - check_percentage(percentage)? / 100.0) / 2.0;
        Ok((self.value(tail)?, self.value(1.0 - tail)?))
    }
}

impl Sampleable<f64> for Cdf {
    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.random();
        let i = self.ps.partition_point(|q| *q < u);
        self.values[i.min(self.values.len() - 1)]
    }
}

fn check_percentage(percentage: f64) -> Result<f64> {
    if (0.0..=100.0).contains(&percentage) {
        Ok(percentage)
    } else {
        Err(SuiteError::InvalidPercentage(percentage))
    }
}
